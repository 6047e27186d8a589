//! Synthetic shader modules for tests
//!
//! Builds the answers an introspector would give without any bytecode, so the
//! contract rules can be exercised one decoration at a time.

use crate::introspect::{BaseType, MemberType, ResourceCategory, ResourceDescriptor, ResourceId, ShaderIntrospector, ShaderResources, TypeId};

#[derive(Debug, Clone, Copy, Default)]
struct Decorations {
    descriptor_set: u32,
    binding: u32,
    location: u32,
}

/// A named member of a synthetic struct
#[derive(Debug, Clone)]
pub struct Member {
    name: String,
    offset: u32,
    ty: MemberType,
}

/// Layout of a synthetic struct type
#[derive(Debug, Clone, Default)]
pub struct StructLayout {
    members: Vec<Member>,
    size: u32,
}

impl StructLayout {
    pub fn new(size: u32) -> Self {
        Self { members: Vec::new(), size }
    }

    pub fn member(mut self, member: Member) -> Self {
        self.members.push(member);
        self
    }
}

pub fn member(name: &str, offset: u32, ty: MemberType) -> Member {
    Member {
        name: name.to_string(),
        offset,
        ty,
    }
}

pub fn vec4(name: &str, offset: u32) -> Member {
    member(name, offset, MemberType::VEC4)
}

pub fn mat4(name: &str, offset: u32) -> Member {
    member(
        name,
        offset,
        MemberType {
            base_type: BaseType::Float,
            vector_size: 4,
            column_count: 4,
            is_array: false,
        },
    )
}

/// Shader module assembled resource by resource
#[derive(Debug, Clone, Default)]
pub struct SyntheticModule {
    resources: ShaderResources,
    decorations: Vec<Decorations>,
    types: Vec<StructLayout>,
}

impl SyntheticModule {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, category: ResourceCategory, name: &str, decorations: Decorations, layout: StructLayout) -> Self {
        let id = ResourceId(self.decorations.len() as u32);
        let type_id = TypeId(self.types.len() as u32);
        self.decorations.push(decorations);
        self.types.push(layout);
        self.resources.category_mut(category).push(ResourceDescriptor {
            id,
            name: name.to_string(),
            type_id,
        });
        self
    }

    pub fn stage_input(self, name: &str, location: u32) -> Self {
        let decorations = Decorations { location, ..Default::default() };
        self.push(ResourceCategory::StageInput, name, decorations, StructLayout::default())
    }

    pub fn uniform_buffer(self, name: &str, descriptor_set: u32, binding: u32, layout: StructLayout) -> Self {
        let decorations = Decorations {
            descriptor_set,
            binding,
            ..Default::default()
        };
        self.push(ResourceCategory::UniformBuffer, name, decorations, layout)
    }

    pub fn sampled_image(self, name: &str, descriptor_set: u32, binding: u32) -> Self {
        let decorations = Decorations {
            descriptor_set,
            binding,
            ..Default::default()
        };
        self.push(ResourceCategory::SampledImage, name, decorations, StructLayout::default())
    }

    /// Adds an undecorated resource of any category
    pub fn resource(self, category: ResourceCategory, name: &str) -> Self {
        self.push(category, name, Decorations::default(), StructLayout::default())
    }

    fn decorations(&self, id: ResourceId) -> Decorations {
        self.decorations.get(id.0 as usize).copied().unwrap_or_default()
    }

    fn member_at(&self, ty: TypeId, index: usize) -> Option<&Member> {
        self.types.get(ty.0 as usize)?.members.get(index)
    }
}

impl ShaderIntrospector for SyntheticModule {
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
        self.types.get(ty.0 as usize).map_or(0, |layout| layout.members.len())
    }

    fn member_name(&self, ty: TypeId, index: usize) -> Option<&str> {
        self.member_at(ty, index).map(|member| member.name.as_str())
    }

    fn member_offset(&self, ty: TypeId, index: usize) -> u32 {
        self.member_at(ty, index).map_or(0, |member| member.offset)
    }

    fn member_type(&self, ty: TypeId, index: usize) -> Option<MemberType> {
        self.member_at(ty, index).map(|member| member.ty)
    }

    fn declared_struct_size(&self, ty: TypeId) -> u32 {
        self.types.get(ty.0 as usize).map_or(0, |layout| layout.size)
    }
}
