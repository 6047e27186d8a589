//! Minimal SPIR-V modules for tests
//!
//! Emits just enough of a module for introspection: types, decorated
//! interface variables, and an empty entry point. Uniform members are laid out
//! with std140 rules, the same way glslang lays out uniform blocks.

use crate::introspect::ShaderStage;
use rspirv::binary::Assemble;
use rspirv::dr::{Builder, Operand};
use rspirv::spirv::{AddressingModel, Capability, Decoration, Dim, ExecutionMode, ExecutionModel, FunctionControl, ImageFormat, MemoryModel, StorageClass, Word};
use std::collections::HashMap;

const NO_OPERANDS: [Operand; 0] = [];

/// Type of a block member
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Float,
    Vec3,
    Vec4,
    Mat4,
    /// `vec4[n]`
    Vec4Array(u32),
}

impl MemberKind {
    /// std140 (size, alignment) in bytes
    fn layout(self) -> (u32, u32) {
        match self {
            Self::Float => (4, 4),
            Self::Vec3 => (12, 16),
            Self::Vec4 => (16, 16),
            Self::Mat4 => (64, 16),
            Self::Vec4Array(count) => (16 * count, 16),
        }
    }
}

/// Assigns std140 offsets to block members in declaration order
fn std140_offsets(members: &[(String, MemberKind)]) -> Vec<u32> {
    let mut offset: u32 = 0;
    members
        .iter()
        .map(|(_, kind)| {
            let (size, align) = kind.layout();
            let member_offset = offset.next_multiple_of(align);
            offset = member_offset + size;
            member_offset
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Uniform,
    Storage,
    PushConstant,
}

#[derive(Debug, Clone)]
struct Block {
    name: String,
    kind: BlockKind,
    set_binding: Option<(u32, u32)>,
    members: Vec<(String, MemberKind)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ImageKind {
    /// Combined `sampler2D`
    Sampled,
    /// `rgba8` `image2D`
    Storage,
    /// `subpassInput` with its input attachment index
    Subpass(u32),
}

#[derive(Debug, Clone)]
struct Handle {
    name: String,
    set: u32,
    binding: u32,
}

/// Describes a shader stage and assembles it into SPIR-V words
#[derive(Debug, Clone)]
pub struct ShaderBuilder {
    stage: ShaderStage,
    inputs: Vec<(String, u32)>,
    blocks: Vec<Block>,
    images: Vec<(Handle, ImageKind)>,
    atomic_counters: Vec<Handle>,
}

impl ShaderBuilder {
    pub fn vertex() -> Self {
        Self::new(ShaderStage::Vertex)
    }

    pub fn fragment() -> Self {
        Self::new(ShaderStage::Fragment)
    }

    fn new(stage: ShaderStage) -> Self {
        Self {
            stage,
            inputs: Vec::new(),
            blocks: Vec::new(),
            images: Vec::new(),
            atomic_counters: Vec::new(),
        }
    }

    /// Adds a `vec4` stage input
    pub fn input(mut self, name: &str, location: u32) -> Self {
        self.inputs.push((name.to_string(), location));
        self
    }

    pub fn uniform_block(self, name: &str, set: u32, binding: u32, members: &[(&str, MemberKind)]) -> Self {
        self.block(name, BlockKind::Uniform, Some((set, binding)), members)
    }

    pub fn storage_block(self, name: &str, set: u32, binding: u32, members: &[(&str, MemberKind)]) -> Self {
        self.block(name, BlockKind::Storage, Some((set, binding)), members)
    }

    pub fn push_constant_block(self, name: &str, members: &[(&str, MemberKind)]) -> Self {
        self.block(name, BlockKind::PushConstant, None, members)
    }

    /// Adds a combined `sampler2D`
    pub fn texture(self, name: &str, set: u32, binding: u32) -> Self {
        self.image(name, set, binding, ImageKind::Sampled)
    }

    /// Adds an `rgba8` `image2D`
    pub fn storage_image(self, name: &str, set: u32, binding: u32) -> Self {
        self.image(name, set, binding, ImageKind::Storage)
    }

    pub fn subpass_input(self, name: &str, set: u32, binding: u32, attachment_index: u32) -> Self {
        self.image(name, set, binding, ImageKind::Subpass(attachment_index))
    }

    /// Adds an `atomic_uint`
    pub fn atomic_counter(mut self, name: &str, set: u32, binding: u32) -> Self {
        self.atomic_counters.push(Handle {
            name: name.to_string(),
            set,
            binding,
        });
        self
    }

    fn block(mut self, name: &str, kind: BlockKind, set_binding: Option<(u32, u32)>, members: &[(&str, MemberKind)]) -> Self {
        self.blocks.push(Block {
            name: name.to_string(),
            kind,
            set_binding,
            members: members.iter().map(|(name, kind)| (name.to_string(), *kind)).collect(),
        });
        self
    }

    fn image(mut self, name: &str, set: u32, binding: u32, kind: ImageKind) -> Self {
        let handle = Handle {
            name: name.to_string(),
            set,
            binding,
        };
        self.images.push((handle, kind));
        self
    }

    /// Assembles the module
    pub fn build(&self) -> Vec<u32> {
        let mut b = Builder::new();
        b.set_version(1, 0);
        b.capability(Capability::Shader);
        if self.images.iter().any(|(_, kind)| matches!(kind, ImageKind::Subpass(_))) {
            b.capability(Capability::InputAttachment);
        }
        if !self.atomic_counters.is_empty() {
            b.capability(Capability::AtomicStorage);
        }
        b.memory_model(AddressingModel::Logical, MemoryModel::GLSL450);

        let void = b.type_void();
        let function_type = b.type_function(void, Vec::<Word>::new());
        let float = b.type_float(32);
        let uint = b.type_int(32, 0);
        let vec3 = b.type_vector(float, 3);
        let vec4 = b.type_vector(float, 4);
        let mat4 = b.type_matrix(vec4, 4);

        let mut interface = Vec::new();
        if !self.inputs.is_empty() {
            let pointer = b.type_pointer(None, StorageClass::Input, vec4);
            for (name, location) in &self.inputs {
                let variable = b.variable(pointer, None, StorageClass::Input, None);
                b.name(variable, name.as_str());
                b.decorate(variable, Decoration::Location, [Operand::LiteralBit32(*location)]);
                interface.push(variable);
            }
        }

        // Array types are shared between blocks, so each is decorated once
        let mut vec4_arrays: HashMap<u32, Word> = HashMap::new();
        for block in &self.blocks {
            let member_types: Vec<Word> = block
                .members
                .iter()
                .map(|(_, kind)| match kind {
                    MemberKind::Float => float,
                    MemberKind::Vec3 => vec3,
                    MemberKind::Vec4 => vec4,
                    MemberKind::Mat4 => mat4,
                    MemberKind::Vec4Array(count) => *vec4_arrays.entry(*count).or_insert_with(|| {
                        let length = b.constant_bit32(uint, *count);
                        let array = b.type_array(vec4, length);
                        b.decorate(array, Decoration::ArrayStride, [Operand::LiteralBit32(16)]);
                        array
                    }),
                })
                .collect();

            let structure = b.type_struct(member_types);
            b.name(structure, block.name.as_str());
            let block_decoration = match block.kind {
                BlockKind::Storage => Decoration::BufferBlock,
                BlockKind::Uniform | BlockKind::PushConstant => Decoration::Block,
            };
            b.decorate(structure, block_decoration, NO_OPERANDS);

            let offsets = std140_offsets(&block.members);
            for (index, ((name, kind), offset)) in block.members.iter().zip(offsets).enumerate() {
                let index = index as u32;
                b.member_name(structure, index, name.as_str());
                b.member_decorate(structure, index, Decoration::Offset, [Operand::LiteralBit32(offset)]);
                if *kind == MemberKind::Mat4 {
                    b.member_decorate(structure, index, Decoration::ColMajor, NO_OPERANDS);
                    b.member_decorate(structure, index, Decoration::MatrixStride, [Operand::LiteralBit32(16)]);
                }
            }

            let class = match block.kind {
                BlockKind::Uniform | BlockKind::Storage => StorageClass::Uniform,
                BlockKind::PushConstant => StorageClass::PushConstant,
            };
            let pointer = b.type_pointer(None, class, structure);
            let variable = b.variable(pointer, None, class, None);
            b.name(variable, block.name.as_str());
            if let Some((set, binding)) = block.set_binding {
                decorate_binding(&mut b, variable, set, binding);
            }
        }

        for (handle, kind) in &self.images {
            let pointee = match kind {
                ImageKind::Sampled => {
                    let image = b.type_image(float, Dim::Dim2D, 0, 0, 0, 1, ImageFormat::Unknown, None);
                    b.type_sampled_image(image)
                }
                ImageKind::Storage => b.type_image(float, Dim::Dim2D, 0, 0, 0, 2, ImageFormat::Rgba8, None),
                ImageKind::Subpass(_) => b.type_image(float, Dim::DimSubpassData, 0, 0, 0, 2, ImageFormat::Unknown, None),
            };
            let pointer = b.type_pointer(None, StorageClass::UniformConstant, pointee);
            let variable = b.variable(pointer, None, StorageClass::UniformConstant, None);
            b.name(variable, handle.name.as_str());
            decorate_binding(&mut b, variable, handle.set, handle.binding);
            if let ImageKind::Subpass(attachment_index) = kind {
                b.decorate(variable, Decoration::InputAttachmentIndex, [Operand::LiteralBit32(*attachment_index)]);
            }
        }

        for counter in &self.atomic_counters {
            let pointer = b.type_pointer(None, StorageClass::AtomicCounter, uint);
            let variable = b.variable(pointer, None, StorageClass::AtomicCounter, None);
            b.name(variable, counter.name.as_str());
            decorate_binding(&mut b, variable, counter.set, counter.binding);
        }

        let main = b.id();
        let execution_model = match self.stage {
            ShaderStage::Vertex => ExecutionModel::Vertex,
            ShaderStage::Fragment => ExecutionModel::Fragment,
        };
        b.entry_point(execution_model, main, "main", interface);
        if self.stage == ShaderStage::Fragment {
            b.execution_mode(main, ExecutionMode::OriginUpperLeft, Vec::<u32>::new());
        }

        // An empty body; these calls only fail when a function is already open
        let body = b
            .begin_function(void, Some(main), FunctionControl::NONE, function_type)
            .and_then(|_| b.begin_block(None))
            .and_then(|_| b.ret())
            .and_then(|_| b.end_function());
        assert!(body.is_ok(), "failed to emit entry point body: {body:?}");

        b.module().assemble()
    }
}

fn decorate_binding(b: &mut Builder, variable: Word, set: u32, binding: u32) {
    b.decorate(variable, Decoration::DescriptorSet, [Operand::LiteralBit32(set)]);
    b.decorate(variable, Decoration::Binding, [Operand::LiteralBit32(binding)]);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn members(kinds: &[MemberKind]) -> Vec<(String, MemberKind)> {
        kinds.iter().map(|kind| (String::new(), *kind)).collect()
    }

    #[test]
    fn test_std140_offsets() {
        let offsets = std140_offsets(&members(&[MemberKind::Mat4, MemberKind::Float, MemberKind::Vec3, MemberKind::Vec4Array(4)]));
        assert_eq!(offsets, vec![0, 64, 80, 96]);

        let offsets = std140_offsets(&members(&[MemberKind::Float, MemberKind::Float, MemberKind::Vec4]));
        assert_eq!(offsets, vec![0, 4, 16]);
    }

    #[test]
    fn test_header() {
        let words = ShaderBuilder::vertex().input("Position", 0).build();
        assert_eq!(words[0], rspirv::spirv::MAGIC_NUMBER);
        assert_eq!(words[1], 0x0001_0000);
        // Bound is one past the largest id
        assert!(words[3] > 1);
    }
}
