//! Read-only view of an introspected shader module
//!
//! The contract validator never touches bytecode directly. It only asks the
//! questions listed on [`ShaderIntrospector`], which keeps it independent of
//! the parser and lets tests drive it with synthetic modules.

use serde::Serialize;
use std::fmt;

/// Pipeline stage a shader module was compiled for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vertex => write!(f, "vertex"),
            Self::Fragment => write!(f, "fragment"),
        }
    }
}

/// Opaque handle to a resource, meaningful only to the introspector that issued it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceId(pub u32);

/// Opaque handle to a type, meaningful only to the introspector that issued it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(pub u32);

/// A declared shader resource (attribute, uniform block, or texture)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDescriptor {
    /// Handle used for decoration queries
    pub id: ResourceId,
    /// Name as declared in the shader source
    pub name: String,
    /// Handle used for type and member queries
    pub type_id: TypeId,
}

/// Categories of resources an introspector reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ResourceCategory {
    StageInput,
    UniformBuffer,
    SampledImage,
    StorageBuffer,
    SubpassInput,
    StorageImage,
    AtomicCounter,
    PushConstantBuffer,
}

impl fmt::Display for ResourceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::StageInput => "stage input",
            Self::UniformBuffer => "uniform buffer",
            Self::SampledImage => "sampled image",
            Self::StorageBuffer => "storage buffer",
            Self::SubpassInput => "subpass input",
            Self::StorageImage => "storage image",
            Self::AtomicCounter => "atomic counter",
            Self::PushConstantBuffer => "push constant buffer",
        };
        f.write_str(name)
    }
}

/// Resources of one shader module, grouped by category in report order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderResources {
    pub stage_inputs: Vec<ResourceDescriptor>,
    pub uniform_buffers: Vec<ResourceDescriptor>,
    pub sampled_images: Vec<ResourceDescriptor>,
    pub storage_buffers: Vec<ResourceDescriptor>,
    pub subpass_inputs: Vec<ResourceDescriptor>,
    pub storage_images: Vec<ResourceDescriptor>,
    pub atomic_counters: Vec<ResourceDescriptor>,
    pub push_constant_buffers: Vec<ResourceDescriptor>,
}

impl ShaderResources {
    /// Returns the resources reported for a category
    pub fn category(&self, category: ResourceCategory) -> &[ResourceDescriptor] {
        match category {
            ResourceCategory::StageInput => &self.stage_inputs,
            ResourceCategory::UniformBuffer => &self.uniform_buffers,
            ResourceCategory::SampledImage => &self.sampled_images,
            ResourceCategory::StorageBuffer => &self.storage_buffers,
            ResourceCategory::SubpassInput => &self.subpass_inputs,
            ResourceCategory::StorageImage => &self.storage_images,
            ResourceCategory::AtomicCounter => &self.atomic_counters,
            ResourceCategory::PushConstantBuffer => &self.push_constant_buffers,
        }
    }

    /// Returns the list for a category, for introspectors filling in results
    pub fn category_mut(&mut self, category: ResourceCategory) -> &mut Vec<ResourceDescriptor> {
        match category {
            ResourceCategory::StageInput => &mut self.stage_inputs,
            ResourceCategory::UniformBuffer => &mut self.uniform_buffers,
            ResourceCategory::SampledImage => &mut self.sampled_images,
            ResourceCategory::StorageBuffer => &mut self.storage_buffers,
            ResourceCategory::SubpassInput => &mut self.subpass_inputs,
            ResourceCategory::StorageImage => &mut self.storage_images,
            ResourceCategory::AtomicCounter => &mut self.atomic_counters,
            ResourceCategory::PushConstantBuffer => &mut self.push_constant_buffers,
        }
    }
}

/// Scalar kind underlying a member type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BaseType {
    Bool,
    Int,
    UInt,
    Float,
    Double,
    Struct,
    Other,
}

/// Shape of a struct member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct MemberType {
    pub base_type: BaseType,
    /// Components per column (1 for scalars)
    pub vector_size: u32,
    /// Columns (1 for scalars and vectors)
    pub column_count: u32,
    /// Whether the member has an array dimension
    pub is_array: bool,
}

impl MemberType {
    /// A 4-component float vector, the only accepted shape for size uniforms
    pub const VEC4: MemberType = MemberType {
        base_type: BaseType::Float,
        vector_size: 4,
        column_count: 1,
        is_array: false,
    };

    pub fn is_vec4(&self) -> bool {
        *self == Self::VEC4
    }
}

impl fmt::Display for MemberType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.base_type)?;
        if self.column_count > 1 {
            write!(f, " mat{}x{}", self.column_count, self.vector_size)?;
        } else if self.vector_size > 1 {
            write!(f, " vec{}", self.vector_size)?;
        }
        if self.is_array {
            write!(f, "[]")?;
        }
        Ok(())
    }
}

/// Queries against one introspected shader module
///
/// Decoration queries return 0 for resources that do not carry the decoration,
/// matching SPIR-V defaults. Member queries take the zero-based member index.
pub trait ShaderIntrospector {
    /// Returns the categorized resource lists of the module
    fn shader_resources(&self) -> ShaderResources;

    fn descriptor_set(&self, id: ResourceId) -> u32;

    fn binding(&self, id: ResourceId) -> u32;

    /// Returns the input location of a stage input
    fn location(&self, id: ResourceId) -> u32;

    /// Returns the number of members of a struct type, 0 for non-struct types
    fn member_count(&self, ty: TypeId) -> usize;

    fn member_name(&self, ty: TypeId, index: usize) -> Option<&str>;

    /// Returns the byte offset of a member within its struct
    fn member_offset(&self, ty: TypeId, index: usize) -> u32;

    fn member_type(&self, ty: TypeId, index: usize) -> Option<MemberType>;

    /// Returns the declared size of a struct type in bytes
    fn declared_struct_size(&self, ty: TypeId) -> u32;
}
