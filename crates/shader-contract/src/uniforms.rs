//! CPU-side contents of a pass's uniform buffer

use crate::reflection::Reflection;
use crate::semantics::TextureSemantic;

/// Size uniform of a texture, laid out as the shader's `vec4`
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Zeroable, bytemuck::Pod)]
#[repr(C)]
pub struct TextureSize {
    /// Width and height in texels
    pub size: [f32; 2],
    /// Reciprocal width and height
    pub inverse_size: [f32; 2],
}

impl TextureSize {
    pub fn new(width: u32, height: u32) -> Self {
        let (width, height) = (width as f32, height as f32);
        Self {
            size: [width, height],
            inverse_size: [1.0 / width, 1.0 / height],
        }
    }
}

/// Uniform buffer contents laid out by a [`Reflection`]
///
/// Upload [`Self::as_bytes`] to a buffer of the same size bound at
/// [`Reflection::ubo_binding`].
#[derive(Debug, Clone, PartialEq)]
pub struct UniformBlock {
    reflection: Reflection,
    data: Vec<u8>,
}

impl UniformBlock {
    /// Allocates a zeroed block of `ubo_size` bytes
    pub fn new(reflection: &Reflection) -> Self {
        Self {
            reflection: *reflection,
            data: vec![0; reflection.ubo_size() as usize],
        }
    }

    /// Writes the model-view-projection matrix, column-major
    pub fn write_mvp(&mut self, mvp: &[f32; 16]) {
        self.write(self.reflection.mvp_offset(), bytemuck::cast_slice(mvp));
    }

    /// Writes the size uniform of a semantic texture
    ///
    /// # Returns
    /// `false` without writing anything when the shader does not declare the
    /// texture's size uniform
    pub fn write_texture_size(&mut self, semantic: TextureSemantic, width: u32, height: u32) -> bool {
        let Some(offset) = self.reflection.semantic_texture_ubo_offset(semantic) else {
            return false;
        };
        self.write(offset, bytemuck::bytes_of(&TextureSize::new(width, height)))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Copies `bytes` to `offset`, refusing writes that would not fit
    fn write(&mut self, offset: u32, bytes: &[u8]) -> bool {
        let start = offset as usize;
        match self.data.get_mut(start..start + bytes.len()) {
            Some(target) => {
                target.copy_from_slice(bytes);
                true
            }
            None => {
                tracing::warn!(offset, len = bytes.len(), size = self.data.len(), "Uniform write out of bounds");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflection::StageMask;

    fn floats(bytes: &[u8]) -> Vec<f32> {
        bytes.chunks_exact(4).map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]])).collect()
    }

    fn reflection() -> Reflection {
        let mut reflection = Reflection::new(StageMask::VERTEX | StageMask::FRAGMENT, 0, 96, 16);
        reflection.set_semantic_texture(TextureSemantic::Original, 1, StageMask::FRAGMENT);
        reflection.set_semantic_texture(TextureSemantic::Source, 2, StageMask::FRAGMENT);
        reflection.set_semantic_texture_ubo_offset(TextureSemantic::Original, 80);
        reflection
    }

    #[test]
    fn test_new_block_is_zeroed() {
        let block = UniformBlock::new(&reflection());
        assert_eq!(block.as_bytes().len(), 96);
        assert!(block.as_bytes().iter().all(|&byte| byte == 0));
    }

    #[test]
    fn test_write_mvp_at_offset() {
        let mut block = UniformBlock::new(&reflection());
        let mvp: [f32; 16] = std::array::from_fn(|index| index as f32 + 1.0);
        block.write_mvp(&mvp);

        let values = floats(block.as_bytes());
        assert_eq!(&values[..4], &[0.0; 4]);
        assert_eq!(&values[4..20], &mvp);
        assert_eq!(&values[20..], &[0.0; 4]);
    }

    #[test]
    fn test_write_texture_size() {
        let mut block = UniformBlock::new(&reflection());
        assert!(block.write_texture_size(TextureSemantic::Original, 1920, 1080));

        let values = floats(block.as_bytes());
        assert_eq!(&values[20..24], &[1920.0, 1080.0, 1.0 / 1920.0, 1.0 / 1080.0]);
    }

    #[test]
    fn test_undeclared_size_uniform_is_skipped() {
        let mut block = UniformBlock::new(&reflection());
        assert!(!block.write_texture_size(TextureSemantic::Source, 640, 480));
        assert!(!block.write_texture_size(TextureSemantic::Invalid, 640, 480));
        assert!(block.as_bytes().iter().all(|&byte| byte == 0));
    }

    #[test]
    fn test_out_of_bounds_write_is_refused() {
        let mut block = UniformBlock::new(&Reflection::new(StageMask::VERTEX, 0, 32, 0));
        block.write_mvp(&[1.0; 16]);
        assert!(block.as_bytes().iter().all(|&byte| byte == 0));
    }
}
