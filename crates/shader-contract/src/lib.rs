//! Binding contract validation and reflection for filter shader passes
//!
//! A filter pass is a vertex/fragment shader pair bound with static indices: a
//! single uniform buffer holding the model-view-projection matrix, plus sampled
//! textures identified by name. This crate checks that a compiled pair follows
//! that contract and produces a [`Reflection`] describing where everything is
//! bound, which the render pipeline caches for the lifetime of the program.

pub mod error;
pub mod introspect;
pub mod layout;
pub mod reflection;
pub mod semantics;
pub mod spirv;
pub mod uniforms;
pub mod validator;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::{ArityViolation, LayoutViolation, ValidationError};
pub use introspect::{ShaderIntrospector, ShaderResources, ShaderStage};
pub use layout::bind_group_layout_entries;
pub use reflection::{MAX_BINDINGS, Reflection, SemanticTextureEntry, StageMask};
pub use semantics::TextureSemantic;
pub use spirv::{SpirvModule, reflect_spirv, reflect_spirv_bytes};
pub use uniforms::UniformBlock;
pub use validator::{validate, validate_modules};
