//! Reflection descriptor handed to the render pipeline
//!
//! A [`Reflection`] is produced once per validated shader pair and never
//! changes afterwards. It carries everything needed to bind the pair's
//! resources with static indices: the uniform buffer slot and size, where the
//! model-view-projection matrix lives, and where each semantic texture and its
//! optional size uniform go.

use crate::semantics::TextureSemantic;
use bitflags::bitflags;
use serde::Serialize;

/// Number of binding slots the render pipeline supports
pub const MAX_BINDINGS: u32 = 16;

bitflags! {
    /// Shader stages a resource is visible to
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
    pub struct StageMask: u32 {
        const VERTEX = 1 << 0;
        const FRAGMENT = 1 << 1;
    }
}

/// Binding information for one semantic texture
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SemanticTextureEntry {
    /// Shader binding point index
    pub binding: u32,
    /// Stages sampling the texture
    pub stage_mask: StageMask,
    /// Offset of the `<Name>Size` uniform in the uniform buffer, if declared
    pub ubo_offset: Option<u32>,
}

/// Validated binding layout of a vertex/fragment shader pair
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Reflection {
    ubo_stage_mask: StageMask,
    ubo_binding: u32,
    ubo_size: u32,
    mvp_offset: u32,
    semantic_textures: [SemanticTextureEntry; TextureSemantic::COUNT],
    semantic_texture_mask: u32,
    semantic_texture_ubo_mask: u32,
}

impl Reflection {
    /// Starts a reflection from the validated uniform buffer layout
    pub(crate) fn new(ubo_stage_mask: StageMask, ubo_binding: u32, ubo_size: u32, mvp_offset: u32) -> Self {
        Self {
            ubo_stage_mask,
            ubo_binding,
            ubo_size,
            mvp_offset,
            ..Default::default()
        }
    }

    /// Records a validated semantic texture
    ///
    /// `Invalid` has no slot and is ignored; the validator rejects it before
    /// getting here.
    pub(crate) fn set_semantic_texture(&mut self, semantic: TextureSemantic, binding: u32, stage_mask: StageMask) {
        if let Some(index) = semantic.index() {
            self.semantic_textures[index] = SemanticTextureEntry {
                binding,
                stage_mask,
                ubo_offset: None,
            };
            self.semantic_texture_mask |= semantic.mask();
        }
    }

    /// Records the size uniform offset of an already recorded semantic texture
    pub(crate) fn set_semantic_texture_ubo_offset(&mut self, semantic: TextureSemantic, offset: u32) {
        if let Some(index) = semantic.index() {
            if self.semantic_texture_mask & semantic.mask() != 0 {
                self.semantic_textures[index].ubo_offset = Some(offset);
                self.semantic_texture_ubo_mask |= semantic.mask();
            }
        }
    }

    /// Stages that read the uniform buffer
    pub fn ubo_stage_mask(&self) -> StageMask {
        self.ubo_stage_mask
    }

    /// Binding slot shared by the vertex and fragment uniform buffers
    pub fn ubo_binding(&self) -> u32 {
        self.ubo_binding
    }

    /// Bytes to allocate for the uniform buffer, the larger of the two stage views
    pub fn ubo_size(&self) -> u32 {
        self.ubo_size
    }

    /// Byte offset of the `MVP` matrix in the uniform buffer
    pub fn mvp_offset(&self) -> u32 {
        self.mvp_offset
    }

    /// Raw semantic texture table, indexed by [`TextureSemantic::index`]
    ///
    /// Only slots whose bit is set in [`Self::semantic_texture_mask`] hold
    /// meaningful entries.
    pub fn semantic_textures(&self) -> &[SemanticTextureEntry; TextureSemantic::COUNT] {
        &self.semantic_textures
    }

    /// Bit per semantic texture the fragment stage declares
    pub fn semantic_texture_mask(&self) -> u32 {
        self.semantic_texture_mask
    }

    /// Bit per semantic texture whose size uniform is declared
    pub fn semantic_texture_ubo_mask(&self) -> u32 {
        self.semantic_texture_ubo_mask
    }

    /// Returns the entry of a semantic texture, if the shader declares it
    pub fn semantic_texture(&self, semantic: TextureSemantic) -> Option<&SemanticTextureEntry> {
        let index = semantic.index()?;
        (self.semantic_texture_mask & semantic.mask() != 0).then(|| &self.semantic_textures[index])
    }

    /// Returns the size uniform offset of a semantic texture, if declared
    pub fn semantic_texture_ubo_offset(&self, semantic: TextureSemantic) -> Option<u32> {
        if self.semantic_texture_ubo_mask & semantic.mask() == 0 {
            return None;
        }
        self.semantic_texture(semantic).and_then(|entry| entry.ubo_offset)
    }

    /// Iterates over the declared semantic textures in slot order
    pub fn declared_semantic_textures(&self) -> impl Iterator<Item = (TextureSemantic, &SemanticTextureEntry)> + '_ {
        TextureSemantic::ALL
            .into_iter()
            .filter_map(|semantic| self.semantic_texture(semantic).map(|entry| (semantic, entry)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masks_follow_recorded_entries() {
        let mut reflection = Reflection::new(StageMask::VERTEX, 0, 80, 0);
        assert_eq!(reflection.semantic_texture_mask(), 0);
        assert!(reflection.semantic_texture(TextureSemantic::Original).is_none());

        reflection.set_semantic_texture(TextureSemantic::Source, 2, StageMask::FRAGMENT);
        assert_eq!(reflection.semantic_texture_mask(), TextureSemantic::Source.mask());
        assert_eq!(reflection.semantic_texture_ubo_mask(), 0);

        let entry = reflection.semantic_texture(TextureSemantic::Source).unwrap();
        assert_eq!(entry.binding, 2);
        assert_eq!(entry.stage_mask, StageMask::FRAGMENT);
        assert_eq!(entry.ubo_offset, None);
    }

    #[test]
    fn test_ubo_offset_requires_recorded_texture() {
        let mut reflection = Reflection::new(StageMask::VERTEX, 0, 80, 0);

        // Ignored: Original was never recorded
        reflection.set_semantic_texture_ubo_offset(TextureSemantic::Original, 64);
        assert_eq!(reflection.semantic_texture_ubo_mask(), 0);

        reflection.set_semantic_texture(TextureSemantic::Original, 1, StageMask::FRAGMENT);
        reflection.set_semantic_texture_ubo_offset(TextureSemantic::Original, 64);
        assert_eq!(reflection.semantic_texture_ubo_mask(), TextureSemantic::Original.mask());
        assert_eq!(reflection.semantic_texture_ubo_offset(TextureSemantic::Original), Some(64));
        assert_eq!(reflection.semantic_texture_ubo_offset(TextureSemantic::Source), None);
    }

    #[test]
    fn test_invalid_semantic_is_never_stored() {
        let mut reflection = Reflection::new(StageMask::VERTEX, 0, 80, 0);
        reflection.set_semantic_texture(TextureSemantic::Invalid, 1, StageMask::FRAGMENT);
        assert_eq!(reflection, Reflection::new(StageMask::VERTEX, 0, 80, 0));
    }

    #[test]
    fn test_declared_semantic_textures_in_slot_order() {
        let mut reflection = Reflection::new(StageMask::VERTEX | StageMask::FRAGMENT, 0, 96, 0);
        reflection.set_semantic_texture(TextureSemantic::Source, 1, StageMask::FRAGMENT);
        reflection.set_semantic_texture(TextureSemantic::Original, 3, StageMask::FRAGMENT);

        let declared: Vec<_> = reflection.declared_semantic_textures().map(|(semantic, entry)| (semantic, entry.binding)).collect();
        assert_eq!(declared, vec![(TextureSemantic::Original, 3), (TextureSemantic::Source, 1)]);
    }

    #[test]
    fn test_serialize() {
        let mut reflection = Reflection::new(StageMask::VERTEX | StageMask::FRAGMENT, 0, 80, 0);
        reflection.set_semantic_texture(TextureSemantic::Original, 1, StageMask::FRAGMENT);
        reflection.set_semantic_texture_ubo_offset(TextureSemantic::Original, 64);

        let json = serde_json::to_value(reflection).unwrap();
        assert_eq!(json["ubo_size"], 80);
        assert_eq!(json["semantic_texture_mask"], 1);
        assert_eq!(json["semantic_textures"][0]["binding"], 1);
        assert_eq!(json["semantic_textures"][0]["ubo_offset"], 64);
        assert!(json["semantic_textures"][1]["ubo_offset"].is_null());
    }
}
