//! Texture semantic vocabulary
//!
//! Fragment textures are only accepted when their declared name maps to one of
//! a closed set of roles. The render pipeline binds each role from a fixed
//! source, so adding a role is a code change rather than configuration.

use serde::Serialize;
use std::fmt;

/// Role of a fragment texture, identified by its declared name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TextureSemantic {
    /// The unprocessed input frame
    Original,
    /// The output of the previous pass
    Source,
    /// Sentinel for names outside the vocabulary, never stored in a reflection
    Invalid,
}

impl TextureSemantic {
    /// Number of valid semantics, i.e. the size of the semantic texture table
    pub const COUNT: usize = 2;

    /// All valid semantics in slot order
    pub const ALL: [TextureSemantic; Self::COUNT] = [TextureSemantic::Original, TextureSemantic::Source];

    /// Returns the slot of this semantic in the semantic texture table
    ///
    /// # Returns
    /// The slot index, or None for `Invalid`
    pub fn index(self) -> Option<usize> {
        match self {
            Self::Original => Some(0),
            Self::Source => Some(1),
            Self::Invalid => None,
        }
    }

    /// Returns the bit of this semantic in the semantic masks
    pub fn mask(self) -> u32 {
        self.index().map_or(0, |index| 1 << index)
    }

    /// Returns the name a texture must be declared with to take this role
    pub fn name(self) -> &'static str {
        match self {
            Self::Original => "Original",
            Self::Source => "Source",
            Self::Invalid => "<invalid>",
        }
    }
}

impl fmt::Display for TextureSemantic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Maps a declared texture name to its semantic
///
/// Matching is exact: case-sensitive and without trimming.
///
/// # Arguments
/// * `name` - The texture name as declared in the shader
///
/// # Returns
/// The matching semantic, or `TextureSemantic::Invalid`
pub fn resolve(name: &str) -> TextureSemantic {
    match name {
        "Original" => TextureSemantic::Original,
        "Source" => TextureSemantic::Source,
        _ => TextureSemantic::Invalid,
    }
}
