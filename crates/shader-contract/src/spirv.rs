//! SPIR-V introspection backed by naga
//!
//! [`SpirvModule`] parses one shader stage with naga's SPIR-V front end and
//! answers the [`ShaderIntrospector`] queries from the resulting module.
//! Shader bytecode may come from third-party content, so every parse failure,
//! including a panic inside the parser, is turned into
//! [`ValidationError::MalformedBytecode`] here instead of escaping.

use crate::error::ValidationError;
use crate::introspect::{BaseType, MemberType, ResourceCategory, ResourceDescriptor, ResourceId, ShaderIntrospector, ShaderResources, ShaderStage, TypeId};
use crate::reflection::Reflection;
use crate::validator;
use naga::{AddressSpace, Binding, Handle, ImageClass, ScalarKind, Type, TypeInner};
use rspirv::dr::Operand;
use rspirv::spirv::{Dim, Op, StorageClass};
use std::collections::HashSet;
use std::panic;

/// Decorations recorded for one reported resource
#[derive(Debug, Clone, Copy, Default)]
struct Decorations {
    descriptor_set: u32,
    binding: u32,
    location: u32,
}

/// One parsed shader stage
#[derive(Debug)]
pub struct SpirvModule {
    module: naga::Module,
    /// Type handles indexed by [`TypeId`]
    types: Vec<Handle<Type>>,
    resources: ShaderResources,
    /// Decorations indexed by [`ResourceId`]
    decorations: Vec<Decorations>,
}

impl SpirvModule {
    /// Parses a stage from SPIR-V words
    pub fn from_words(words: &[u32], stage: ShaderStage) -> Result<Self, ValidationError> {
        let bytes: Vec<u8> = words.iter().flat_map(|word| word.to_le_bytes()).collect();
        Self::from_bytes(&bytes, stage)
    }

    /// Parses a stage from little-endian SPIR-V bytes, e.g. a `.spv` file
    ///
    /// # Errors
    /// `MalformedBytecode` if the bytes are not valid SPIR-V or contain no
    /// entry point for `stage`
    pub fn from_bytes(bytes: &[u8], stage: ShaderStage) -> Result<Self, ValidationError> {
        if bytes.len() % 4 != 0 {
            return Err(malformed(stage, format!("bytecode length {} is not a multiple of 4", bytes.len())));
        }

        // naga rejects these categories outright, so look for them before parsing
        if let Some(category) = unparsed_category(bytes) {
            let error = ValidationError::UnsupportedResourceUsage { stage, category };
            tracing::error!("{error}");
            return Err(error);
        }

        let parsed = panic::catch_unwind(|| naga::front::spv::parse_u8_slice(bytes, &naga::front::spv::Options::default()));
        let module = match parsed {
            Ok(Ok(module)) => module,
            Ok(Err(error)) => return Err(malformed(stage, error.to_string())),
            Err(payload) => return Err(malformed(stage, format!("parser panicked: {}", panic_message(payload.as_ref())))),
        };

        Self::from_module(module, stage)
    }

    /// Collects the resources of a parsed module for one stage
    fn from_module(module: naga::Module, stage: ShaderStage) -> Result<Self, ValidationError> {
        let naga_stage = match stage {
            ShaderStage::Vertex => naga::ShaderStage::Vertex,
            ShaderStage::Fragment => naga::ShaderStage::Fragment,
        };
        let Some(entry_point) = module.entry_points.iter().find(|entry_point| entry_point.stage == naga_stage) else {
            return Err(malformed(stage, format!("no {stage} entry point")));
        };

        let types = module.types.iter().map(|(handle, _)| handle).collect();
        let mut resources = ShaderResources::default();
        let mut decorations = Vec::new();
        let mut report = |category: ResourceCategory, name: Option<&String>, ty: Handle<Type>, decoration: Decorations| {
            let id = ResourceId(decorations.len() as u32);
            decorations.push(decoration);
            resources.category_mut(category).push(ResourceDescriptor {
                id,
                name: name.cloned().unwrap_or_default(),
                type_id: TypeId(ty.index() as u32),
            });
        };

        for argument in &entry_point.function.arguments {
            match &argument.binding {
                Some(Binding::Location { location, .. }) => {
                    let decoration = Decorations {
                        location: *location,
                        ..Default::default()
                    };
                    report(ResourceCategory::StageInput, argument.name.as_ref(), argument.ty, decoration);
                }
                Some(Binding::BuiltIn(_)) => {}
                // Inputs gathered into a struct carry their bindings on the members
                None => {
                    if let TypeInner::Struct { members, .. } = &module.types[argument.ty].inner {
                        for member in members {
                            if let Some(Binding::Location { location, .. }) = &member.binding {
                                let decoration = Decorations {
                                    location: *location,
                                    ..Default::default()
                                };
                                report(ResourceCategory::StageInput, member.name.as_ref(), member.ty, decoration);
                            }
                        }
                    }
                }
            }
        }

        for (_, variable) in module.global_variables.iter() {
            let Some(category) = categorize(&module, variable) else {
                continue;
            };
            let decoration = variable
                .binding
                .as_ref()
                .map(|binding| Decorations {
                    descriptor_set: binding.group,
                    binding: binding.binding,
                    ..Default::default()
                })
                .unwrap_or_default();
            report(category, variable.name.as_ref(), variable.ty, decoration);
        }

        tracing::debug!(
            %stage,
            stage_inputs = resources.stage_inputs.len(),
            uniform_buffers = resources.uniform_buffers.len(),
            sampled_images = resources.sampled_images.len(),
            "Introspected SPIR-V module"
        );

        Ok(Self {
            module,
            types,
            resources,
            decorations,
        })
    }

    fn decorations(&self, id: ResourceId) -> Decorations {
        self.decorations.get(id.0 as usize).copied().unwrap_or_default()
    }

    fn type_inner(&self, ty: TypeId) -> Option<&TypeInner> {
        self.types.get(ty.0 as usize).map(|&handle| &self.module.types[handle].inner)
    }

    fn member(&self, ty: TypeId, index: usize) -> Option<&naga::StructMember> {
        match self.type_inner(ty)? {
            TypeInner::Struct { members, .. } => members.get(index),
            _ => None,
        }
    }

    /// Describes the shape of a type the way the contract inspects members
    fn member_shape(&self, ty: Handle<Type>) -> MemberType {
        let scalar_shape = |kind: ScalarKind, width: u8, vector_size: u32, column_count: u32| MemberType {
            base_type: base_type(kind, width),
            vector_size,
            column_count,
            is_array: false,
        };

        match &self.module.types[ty].inner {
            TypeInner::Scalar(scalar) => scalar_shape(scalar.kind, scalar.width, 1, 1),
            TypeInner::Vector { size, scalar } => scalar_shape(scalar.kind, scalar.width, *size as u32, 1),
            TypeInner::Matrix { columns, rows, scalar } => scalar_shape(scalar.kind, scalar.width, *rows as u32, *columns as u32),
            TypeInner::Array { base, .. } => MemberType {
                is_array: true,
                ..self.member_shape(*base)
            },
            TypeInner::Struct { .. } => MemberType {
                base_type: BaseType::Struct,
                vector_size: 1,
                column_count: 1,
                is_array: false,
            },
            _ => MemberType {
                base_type: BaseType::Other,
                vector_size: 1,
                column_count: 1,
                is_array: false,
            },
        }
    }
}

impl ShaderIntrospector for SpirvModule {
    fn shader_resources(&self) -> ShaderResources {
        self.resources.clone()
    }

    fn descriptor_set(&self, id: ResourceId) -> u32 {
        self.decorations(id).descriptor_set
    }

    fn binding(&self, id: ResourceId) -> u32 {
        self.decorations(id).binding
    }

    fn location(&self, id: ResourceId) -> u32 {
        self.decorations(id).location
    }

    fn member_count(&self, ty: TypeId) -> usize {
        match self.type_inner(ty) {
            Some(TypeInner::Struct { members, .. }) => members.len(),
            _ => 0,
        }
    }

    fn member_name(&self, ty: TypeId, index: usize) -> Option<&str> {
        self.member(ty, index)?.name.as_deref()
    }

    fn member_offset(&self, ty: TypeId, index: usize) -> u32 {
        self.member(ty, index).map_or(0, |member| member.offset)
    }

    fn member_type(&self, ty: TypeId, index: usize) -> Option<MemberType> {
        self.member(ty, index).map(|member| self.member_shape(member.ty))
    }

    fn declared_struct_size(&self, ty: TypeId) -> u32 {
        match self.type_inner(ty) {
            // End of the last member, without the trailing padding naga adds to `span`
            Some(TypeInner::Struct { members, .. }) => members
                .iter()
                .map(|member| match &self.module.types[member.ty].inner {
                    TypeInner::Array {
                        size: naga::ArraySize::Dynamic,
                        ..
                    } => member.offset,
                    inner => member.offset + inner.size(self.module.to_ctx()),
                })
                .max()
                .unwrap_or(0),
            Some(inner) => inner.size(self.module.to_ctx()),
            None => 0,
        }
    }
}

/// Maps a global variable to the resource category it is reported under
///
/// Samplers and private globals are not resources of the contract and are
/// skipped. Subpass inputs and atomic counters never get this far; see
/// [`unparsed_category`].
fn categorize(module: &naga::Module, variable: &naga::GlobalVariable) -> Option<ResourceCategory> {
    match variable.space {
        AddressSpace::Uniform => Some(ResourceCategory::UniformBuffer),
        AddressSpace::Storage { .. } => Some(ResourceCategory::StorageBuffer),
        AddressSpace::PushConstant => Some(ResourceCategory::PushConstantBuffer),
        AddressSpace::Handle => match image_class(module, variable.ty)? {
            ImageClass::Sampled { .. } | ImageClass::Depth { .. } => Some(ResourceCategory::SampledImage),
            ImageClass::Storage { .. } => Some(ResourceCategory::StorageImage),
            #[allow(unreachable_patterns)]
            _ => None,
        },
        _ => None,
    }
}

/// Returns the image class of an image type, looking through binding arrays
fn image_class(module: &naga::Module, ty: Handle<Type>) -> Option<&ImageClass> {
    match &module.types[ty].inner {
        TypeInner::Image { class, .. } => Some(class),
        TypeInner::BindingArray { base, .. } => image_class(module, *base),
        _ => None,
    }
}

/// Finds resources of the categories naga cannot parse
///
/// Subpass inputs are `UniformConstant` variables of a `SubpassData` image;
/// atomic counters live in their own storage class. Bytes rspirv cannot load
/// are left for naga to report.
fn unparsed_category(bytes: &[u8]) -> Option<ResourceCategory> {
    let module = rspirv::dr::load_bytes(bytes).ok()?;

    let mut subpass_images = HashSet::new();
    let mut subpass_pointers = HashSet::new();
    let mut has_subpass_input = false;
    let mut has_atomic_counter = false;
    // Types are declared before use, so one pass in order suffices
    for inst in &module.types_global_values {
        match (inst.class.opcode, inst.operands.as_slice()) {
            (Op::TypeImage, [_, Operand::Dim(Dim::DimSubpassData), ..]) => subpass_images.extend(inst.result_id),
            (Op::TypePointer, [_, Operand::IdRef(pointee)]) if subpass_images.contains(pointee) => subpass_pointers.extend(inst.result_id),
            (Op::Variable, [Operand::StorageClass(StorageClass::AtomicCounter), ..]) => has_atomic_counter = true,
            (Op::Variable, _) if inst.result_type.is_some_and(|ty| subpass_pointers.contains(&ty)) => has_subpass_input = true,
            _ => {}
        }
    }

    if has_subpass_input {
        Some(ResourceCategory::SubpassInput)
    } else if has_atomic_counter {
        Some(ResourceCategory::AtomicCounter)
    } else {
        None
    }
}

fn base_type(kind: ScalarKind, width: u8) -> BaseType {
    match (kind, width) {
        (ScalarKind::Bool, _) => BaseType::Bool,
        (ScalarKind::Sint, _) => BaseType::Int,
        (ScalarKind::Uint, _) => BaseType::UInt,
        (ScalarKind::Float, 4) => BaseType::Float,
        (ScalarKind::Float, 8) => BaseType::Double,
        _ => BaseType::Other,
    }
}

fn malformed(stage: ShaderStage, reason: String) -> ValidationError {
    let error = ValidationError::MalformedBytecode { stage, reason };
    tracing::error!("{error}");
    error
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

/// Reflects a vertex/fragment pair of SPIR-V word buffers
///
/// Parses both stages and validates them against the binding contract.
///
/// # Arguments
/// * `vertex` - SPIR-V words of the vertex stage
/// * `fragment` - SPIR-V words of the fragment stage
///
/// # Returns
/// The reflection of the pair, or why it was rejected
pub fn reflect_spirv(vertex: &[u32], fragment: &[u32]) -> Result<Reflection, ValidationError> {
    let vertex = SpirvModule::from_words(vertex, ShaderStage::Vertex)?;
    let fragment = SpirvModule::from_words(fragment, ShaderStage::Fragment)?;
    reflect_modules(&vertex, &fragment)
}

/// Reflects a vertex/fragment pair of SPIR-V byte buffers, e.g. read from `.spv` files
pub fn reflect_spirv_bytes(vertex: &[u8], fragment: &[u8]) -> Result<Reflection, ValidationError> {
    let vertex = SpirvModule::from_bytes(vertex, ShaderStage::Vertex)?;
    let fragment = SpirvModule::from_bytes(fragment, ShaderStage::Fragment)?;
    reflect_modules(&vertex, &fragment)
}

fn reflect_modules(vertex: &SpirvModule, fragment: &SpirvModule) -> Result<Reflection, ValidationError> {
    validator::validate_modules(vertex, fragment).inspect_err(|_| {
        tracing::error!("Failed to reflect SPIR-V. Resource usage is inconsistent with expectations.");
    })
}
