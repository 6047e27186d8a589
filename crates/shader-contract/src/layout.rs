//! wgpu bind group layout for a reflected shader pair

use crate::reflection::{Reflection, StageMask};

fn shader_stages(mask: StageMask) -> wgpu::ShaderStages {
    let mut stages = wgpu::ShaderStages::NONE;
    if mask.contains(StageMask::VERTEX) {
        stages |= wgpu::ShaderStages::VERTEX;
    }
    if mask.contains(StageMask::FRAGMENT) {
        stages |= wgpu::ShaderStages::FRAGMENT;
    }
    stages
}

/// Builds the bind group layout entries a reflected pair is bound with
///
/// The uniform buffer comes first, followed by one sampled texture per
/// declared semantic. Entries are sorted by binding.
pub fn bind_group_layout_entries(reflection: &Reflection) -> Vec<wgpu::BindGroupLayoutEntry> {
    let mut entries = vec![wgpu::BindGroupLayoutEntry {
        binding: reflection.ubo_binding(),
        visibility: shader_stages(reflection.ubo_stage_mask()),
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: wgpu::BufferSize::new(reflection.ubo_size() as u64),
        },
        count: None,
    }];

    for (_, texture) in reflection.declared_semantic_textures() {
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: texture.binding,
            visibility: shader_stages(texture.stage_mask),
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        });
    }

    entries.sort_by_key(|entry| entry.binding);
    entries
}
