//! Binding contract validation
//!
//! The render pipeline binds every shader pair with static indices, so a pair
//! is only accepted when its resources follow one fixed layout:
//!
//! - vertex: two attributes at locations 0 and 1, one uniform buffer holding `MVP`
//! - fragment: at most one uniform buffer on the vertex binding, plus sampled
//!   textures named after a [`TextureSemantic`]
//! - everything in descriptor set 0, every binding below [`MAX_BINDINGS`] and
//!   used once
//!
//! Validation stops at the first violation. Each violation is logged once and
//! returned; no partial [`Reflection`] ever escapes.

use crate::error::{ArityViolation, LayoutViolation, ValidationError};
use crate::introspect::{BaseType, MemberType, ResourceCategory, ShaderIntrospector, ShaderResources, ShaderStage, TypeId};
use crate::reflection::{MAX_BINDINGS, Reflection, StageMask};
use crate::semantics::{self, TextureSemantic};

/// Name of the model-view-projection matrix in the vertex uniform buffer
pub const MVP_UNIFORM: &str = "MVP";

/// Suffix appended to a texture name to form its size uniform name
pub const SIZE_UNIFORM_SUFFIX: &str = "Size";

/// Categories the vertex stage may not declare, in check order
const VERTEX_FORBIDDEN: [ResourceCategory; 6] = [
    ResourceCategory::SampledImage,
    ResourceCategory::StorageBuffer,
    ResourceCategory::SubpassInput,
    ResourceCategory::StorageImage,
    ResourceCategory::AtomicCounter,
    ResourceCategory::PushConstantBuffer,
];

/// Categories the fragment stage may not declare, in check order
const FRAGMENT_FORBIDDEN: [ResourceCategory; 5] = [
    ResourceCategory::StorageBuffer,
    ResourceCategory::SubpassInput,
    ResourceCategory::StorageImage,
    ResourceCategory::AtomicCounter,
    ResourceCategory::PushConstantBuffer,
];

/// Location mask of exactly {0, 1}
const ATTRIBUTE_LOCATION_MASK: u32 = 0b11;

/// Logs a violation and converts it into a [`ValidationError`]
fn reject(error: impl Into<ValidationError>) -> ValidationError {
    let error = error.into();
    tracing::error!("{error}");
    error
}

/// Finds a struct member by exact name
///
/// # Returns
/// The member index and byte offset of the first member with that name
pub fn find_member<I: ShaderIntrospector + ?Sized>(introspector: &I, ty: TypeId, name: &str) -> Option<(usize, u32)> {
    (0..introspector.member_count(ty))
        .find(|&index| introspector.member_name(ty, index) == Some(name))
        .map(|index| (index, introspector.member_offset(ty, index)))
}

/// Validates a shader pair, taking each stage's resources from its introspector
pub fn validate_modules<V, F>(vertex: &V, fragment: &F) -> Result<Reflection, ValidationError>
where
    V: ShaderIntrospector + ?Sized,
    F: ShaderIntrospector + ?Sized,
{
    validate(&vertex.shader_resources(), &fragment.shader_resources(), vertex, fragment)
}

/// Validates a vertex/fragment pair against the binding contract
///
/// # Arguments
/// * `vertex` - Resources reported for the vertex stage
/// * `fragment` - Resources reported for the fragment stage
/// * `vertex_introspector` - Decoration and type queries for the vertex module
/// * `fragment_introspector` - Decoration and type queries for the fragment module
///
/// # Returns
/// The reflection of the pair, or the first contract violation found
pub fn validate<V, F>(vertex: &ShaderResources, fragment: &ShaderResources, vertex_introspector: &V, fragment_introspector: &F) -> Result<Reflection, ValidationError>
where
    V: ShaderIntrospector + ?Sized,
    F: ShaderIntrospector + ?Sized,
{
    check_forbidden_categories(vertex, fragment)?;
    check_vertex_attributes(vertex, vertex_introspector)?;

    // Uniform buffer arity
    if vertex.uniform_buffers.len() != 1 {
        return Err(reject(ArityViolation::VertexUniformBuffers {
            found: vertex.uniform_buffers.len(),
        }));
    }
    if fragment.uniform_buffers.len() > 1 {
        return Err(reject(ArityViolation::FragmentUniformBuffers {
            found: fragment.uniform_buffers.len(),
        }));
    }
    let vertex_ubo = &vertex.uniform_buffers[0];
    let fragment_ubo = fragment.uniform_buffers.first();

    // Descriptor set uniformity
    let set = vertex_introspector.descriptor_set(vertex_ubo.id);
    if set != 0 {
        return Err(reject(LayoutViolation::DescriptorSet {
            stage: ShaderStage::Vertex,
            resource: vertex_ubo.name.clone(),
            set,
        }));
    }
    if let Some(ubo) = fragment_ubo {
        let set = fragment_introspector.descriptor_set(ubo.id);
        if set != 0 {
            return Err(reject(LayoutViolation::DescriptorSet {
                stage: ShaderStage::Fragment,
                resource: ubo.name.clone(),
                set,
            }));
        }
    }

    // Binding agreement
    let ubo_binding = vertex_introspector.binding(vertex_ubo.id);
    if let Some(ubo) = fragment_ubo {
        let fragment_binding = fragment_introspector.binding(ubo.id);
        if fragment_binding != ubo_binding {
            return Err(reject(LayoutViolation::UniformBindingMismatch {
                vertex: ubo_binding,
                fragment: fragment_binding,
            }));
        }
    }
    if ubo_binding >= MAX_BINDINGS {
        return Err(reject(LayoutViolation::BindingOutOfRange { binding: ubo_binding }));
    }

    // Both stages may view the same buffer with different sizes; allocate the larger
    let mut ubo_stage_mask = StageMask::VERTEX;
    let mut ubo_size = vertex_introspector.declared_struct_size(vertex_ubo.type_id);
    if let Some(ubo) = fragment_ubo {
        ubo_stage_mask |= StageMask::FRAGMENT;
        ubo_size = ubo_size.max(fragment_introspector.declared_struct_size(ubo.type_id));
    }

    let Some((_, mvp_offset)) = find_member(vertex_introspector, vertex_ubo.type_id, MVP_UNIFORM) else {
        return Err(reject(ValidationError::MissingRequiredUniform { name: MVP_UNIFORM }));
    };

    let mut reflection = Reflection::new(ubo_stage_mask, ubo_binding, ubo_size, mvp_offset);
    let mut binding_mask: u32 = 1 << ubo_binding;

    for texture in &fragment.sampled_images {
        let set = fragment_introspector.descriptor_set(texture.id);
        let binding = fragment_introspector.binding(texture.id);

        if set != 0 {
            return Err(reject(LayoutViolation::DescriptorSet {
                stage: ShaderStage::Fragment,
                resource: texture.name.clone(),
                set,
            }));
        }

        if binding >= MAX_BINDINGS {
            return Err(reject(LayoutViolation::BindingOutOfRange { binding }));
        }

        if binding_mask & (1 << binding) != 0 {
            return Err(reject(LayoutViolation::BindingInUse { binding }));
        }
        binding_mask |= 1 << binding;

        let semantic = semantics::resolve(&texture.name);
        if semantic == TextureSemantic::Invalid {
            return Err(reject(ValidationError::UnknownTextureSemantic { name: texture.name.clone() }));
        }

        reflection.set_semantic_texture(semantic, binding, StageMask::FRAGMENT);

        // The size uniform is optional, but a wrongly shaped one would be read as garbage
        let Some(ubo) = fragment_ubo else {
            continue;
        };
        let uniform = format!("{}{SIZE_UNIFORM_SUFFIX}", texture.name);
        if let Some((index, offset)) = find_member(fragment_introspector, ubo.type_id, &uniform) {
            let found = fragment_introspector.member_type(ubo.type_id, index).unwrap_or(MemberType {
                base_type: BaseType::Other,
                vector_size: 0,
                column_count: 0,
                is_array: false,
            });
            if !found.is_vec4() {
                return Err(reject(ValidationError::TypeMismatch { uniform, found }));
            }
            reflection.set_semantic_texture_ubo_offset(semantic, offset);
        }
    }

    tracing::debug!(
        ubo_binding,
        ubo_size,
        mvp_offset,
        semantic_texture_mask = reflection.semantic_texture_mask(),
        semantic_texture_ubo_mask = reflection.semantic_texture_ubo_mask(),
        "Reflected shader pair"
    );

    Ok(reflection)
}

/// Rejects resource categories outside the contract, vertex stage first
fn check_forbidden_categories(vertex: &ShaderResources, fragment: &ShaderResources) -> Result<(), ValidationError> {
    let checks = VERTEX_FORBIDDEN
        .iter()
        .map(|&category| (ShaderStage::Vertex, vertex, category))
        .chain(FRAGMENT_FORBIDDEN.iter().map(|&category| (ShaderStage::Fragment, fragment, category)));

    for (stage, resources, category) in checks {
        if !resources.category(category).is_empty() {
            return Err(reject(ValidationError::UnsupportedResourceUsage { stage, category }));
        }
    }
    Ok(())
}

/// Requires exactly two vertex attributes at locations 0 and 1
fn check_vertex_attributes<V: ShaderIntrospector + ?Sized>(vertex: &ShaderResources, introspector: &V) -> Result<(), ValidationError> {
    if vertex.stage_inputs.len() != 2 {
        return Err(reject(ArityViolation::VertexAttributes {
            found: vertex.stage_inputs.len(),
        }));
    }

    let mut location_mask = 0u32;
    for input in &vertex.stage_inputs {
        let location = introspector.location(input.id);
        let bit = 1u32
            .checked_shl(location)
            .ok_or_else(|| reject(LayoutViolation::AttributeLocationOutOfRange { location }))?;
        location_mask |= bit;
    }

    if location_mask != ATTRIBUTE_LOCATION_MASK {
        return Err(reject(LayoutViolation::AttributeLocations { location_mask }));
    }
    Ok(())
}
