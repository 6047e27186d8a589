//! Validation failures
//!
//! Every rule of the binding contract fails with its own variant so callers can
//! report exactly why a shader pair was rejected. A failure is permanent for
//! that pair; nothing here is transient or retryable.

use crate::introspect::{MemberType, ResourceCategory, ShaderStage};
use thiserror::Error;

/// Reasons a vertex/fragment pair is rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The bytecode of a stage could not be introspected at all
    #[error("failed to introspect {stage} shader bytecode: {reason}")]
    MalformedBytecode { stage: ShaderStage, reason: String },

    /// A stage declares a resource category the contract forbids
    #[error("invalid resource type detected: {stage} stage declares a {category}")]
    UnsupportedResourceUsage { stage: ShaderStage, category: ResourceCategory },

    /// Wrong number of attributes or uniform buffers
    #[error(transparent)]
    ArityViolation(#[from] ArityViolation),

    /// Wrong locations, descriptor sets, or bindings
    #[error(transparent)]
    LayoutViolation(#[from] LayoutViolation),

    /// A member the vertex uniform buffer must declare is missing
    #[error("could not find offset for {name} in the vertex uniform buffer")]
    MissingRequiredUniform { name: &'static str },

    /// A fragment texture name is not part of the semantic vocabulary
    #[error("non-semantic texture '{name}' is not supported")]
    UnknownTextureSemantic { name: String },

    /// A texture size uniform exists with a shape other than vec4
    #[error("semantic uniform '{uniform}' is {found}, expected Float vec4")]
    TypeMismatch { uniform: String, found: MemberType },
}

/// Resource counts outside the contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ArityViolation {
    #[error("vertex must have two attributes, found {found}")]
    VertexAttributes { found: usize },

    #[error("vertex must use exactly one uniform buffer, found {found}")]
    VertexUniformBuffers { found: usize },

    #[error("fragment must use zero or one uniform buffer, found {found}")]
    FragmentUniformBuffers { found: usize },
}

/// Decorations outside the contract
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutViolation {
    /// The attribute locations do not form exactly {0, 1}
    #[error("the two vertex attributes do not use location = 0 and location = 1 (location mask {location_mask:#x})")]
    AttributeLocations { location_mask: u32 },

    #[error("vertex attribute location {location} is out of range")]
    AttributeLocationOutOfRange { location: u32 },

    #[error("{stage} resource '{resource}' uses descriptor set #{set}, resources must use descriptor set #0")]
    DescriptorSet { stage: ShaderStage, resource: String, set: u32 },

    #[error("binding {binding} is out of range")]
    BindingOutOfRange { binding: u32 },

    #[error("binding {binding} is already in use")]
    BindingInUse { binding: u32 },

    #[error("vertex and fragment uniform buffer must have same binding (vertex {vertex}, fragment {fragment})")]
    UniformBindingMismatch { vertex: u32, fragment: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::introspect::BaseType;

    #[test]
    fn test_messages_name_the_offending_value() {
        let error = ValidationError::from(LayoutViolation::BindingInUse { binding: 3 });
        assert_eq!(error.to_string(), "binding 3 is already in use");

        let error = ValidationError::from(ArityViolation::VertexAttributes { found: 3 });
        assert_eq!(error.to_string(), "vertex must have two attributes, found 3");

        let error = ValidationError::TypeMismatch {
            uniform: "OriginalSize".to_string(),
            found: MemberType {
                base_type: BaseType::Float,
                vector_size: 3,
                column_count: 1,
                is_array: false,
            },
        };
        assert_eq!(error.to_string(), "semantic uniform 'OriginalSize' is Float vec3, expected Float vec4");
    }

    #[test]
    fn test_unsupported_usage_message() {
        let error = ValidationError::UnsupportedResourceUsage {
            stage: ShaderStage::Fragment,
            category: ResourceCategory::StorageBuffer,
        };
        assert_eq!(error.to_string(), "invalid resource type detected: fragment stage declares a storage buffer");
    }
}
