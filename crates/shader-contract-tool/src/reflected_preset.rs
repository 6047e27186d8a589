//! Preset reflection
//!
//! Loads every pass of a [`PresetSpec`] and validates it against the binding
//! contract. The result holds one [`Reflection`] per pass, ready to be cached
//! by a renderer or dumped for inspection.

use crate::PresetError;
use crate::manifest::PresetSpec;
use serde::Serialize;
use shader_contract::{Reflection, reflect_spirv_bytes};

/// A validated pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReflectedPass {
    /// Pass identifier from the manifest
    pub id: String,
    pub reflection: Reflection,
}

/// A preset whose passes all follow the binding contract
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReflectedPreset {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Passes in execution order
    pub passes: Vec<ReflectedPass>,
}

impl ReflectedPreset {
    /// Reflects a parsed preset specification
    ///
    /// # Arguments
    /// * `raw` - The preset specification
    /// * `load_file` - Function returning the bytes of a shader file named in the manifest
    ///
    /// # Returns
    /// The reflected preset, or the first failure
    pub fn from_raw(raw: PresetSpec, load_file: impl Fn(&str) -> Result<Vec<u8>, std::io::Error>) -> Result<Self, PresetError> {
        raw.validate()?;

        let mut passes = Vec::with_capacity(raw.passes.len());
        for pass in raw.passes {
            let load = |file: &str| {
                load_file(file).map_err(|source| PresetError::Load {
                    pass: pass.id.clone(),
                    file: file.to_string(),
                    source,
                })
            };
            let vertex = load(&pass.vertex)?;
            let fragment = load(&pass.fragment)?;

            let reflection = reflect_spirv_bytes(&vertex, &fragment).map_err(|source| PresetError::Pass { pass: pass.id.clone(), source })?;
            tracing::debug!(pass = %pass.id, ubo_size = reflection.ubo_size(), "Reflected pass");

            passes.push(ReflectedPass { id: pass.id, reflection });
        }

        tracing::info!(preset = %raw.id, passes = passes.len(), "Reflected preset");

        Ok(Self {
            id: raw.id,
            name: raw.name,
            description: raw.description,
            passes,
        })
    }

    /// Reflects a preset from YAML content
    ///
    /// # Arguments
    /// * `yaml_content` - YAML preset manifest content
    /// * `load_file` - Function returning the bytes of a shader file named in the manifest
    pub fn from_yaml(yaml_content: &str, load_file: impl Fn(&str) -> Result<Vec<u8>, std::io::Error>) -> Result<Self, PresetError> {
        let raw = PresetSpec::from_yaml(yaml_content)?;
        Self::from_raw(raw, load_file)
    }

    /// Reflects a preset from a YAML file
    ///
    /// # Arguments
    /// * `path` - Path to the YAML manifest file
    /// * `load_file` - Function returning the bytes of a shader file named in the manifest
    pub fn from_file<P: AsRef<std::path::Path>>(path: P, load_file: impl Fn(&str) -> Result<Vec<u8>, std::io::Error>) -> Result<Self, PresetError> {
        let raw = PresetSpec::from_file(path)?;
        Self::from_raw(raw, load_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::PresetValidationError;
    use shader_contract::testing::spirv::{MemberKind, ShaderBuilder};
    use shader_contract::{LayoutViolation, TextureSemantic, ValidationError};
    use std::collections::HashMap;

    const YAML: &str = r#"
id: blend
name: Blend
passes:
  - id: first
    vertex: pass.vert.spv
    fragment: first.frag.spv
  - id: second
    vertex: pass.vert.spv
    fragment: second.frag.spv
"#;

    fn bytes(words: Vec<u32>) -> Vec<u8> {
        words.into_iter().flat_map(u32::to_le_bytes).collect()
    }

    /// Shader files keyed by manifest name
    fn files() -> HashMap<String, Vec<u8>> {
        let vertex = ShaderBuilder::vertex()
            .input("Position", 0)
            .input("TexCoord", 1)
            .uniform_block("UBO", 0, 0, &[("MVP", MemberKind::Mat4)]);
        let first = ShaderBuilder::fragment().texture("Source", 0, 1);
        let second = ShaderBuilder::fragment()
            .uniform_block("UBO", 0, 0, &[("MVP", MemberKind::Mat4), ("OriginalSize", MemberKind::Vec4)])
            .texture("Original", 0, 1)
            .texture("Source", 0, 2);

        HashMap::from([
            ("pass.vert.spv".to_string(), bytes(vertex.build())),
            ("first.frag.spv".to_string(), bytes(first.build())),
            ("second.frag.spv".to_string(), bytes(second.build())),
        ])
    }

    fn loader(files: HashMap<String, Vec<u8>>) -> impl Fn(&str) -> Result<Vec<u8>, std::io::Error> {
        move |file: &str| {
            files
                .get(file)
                .cloned()
                .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, format!("File not found: {file}")))
        }
    }

    #[test]
    fn test_reflect_preset() {
        let preset = ReflectedPreset::from_yaml(YAML, loader(files())).unwrap();
        assert_eq!(preset.id, "blend");
        assert_eq!(preset.name, "Blend");
        assert_eq!(preset.passes.len(), 2);

        let first = &preset.passes[0];
        assert_eq!(first.id, "first");
        assert_eq!(first.reflection.ubo_size(), 64);
        assert_eq!(first.reflection.semantic_texture_mask(), TextureSemantic::Source.mask());

        let second = &preset.passes[1];
        assert_eq!(second.reflection.ubo_size(), 80);
        assert_eq!(second.reflection.semantic_texture_ubo_offset(TextureSemantic::Original), Some(64));

        let json = serde_json::to_value(&preset).unwrap();
        assert_eq!(json["passes"][1]["id"], "second");
        assert!(json.get("description").is_none());
    }

    #[test]
    fn test_first_failing_pass_is_reported() {
        let mut files = files();
        files.insert("first.frag.spv".to_string(), bytes(ShaderBuilder::fragment().texture("Source", 0, 0).build()));

        let error = ReflectedPreset::from_yaml(YAML, loader(files)).unwrap_err();
        match error {
            PresetError::Pass { pass, source } => {
                assert_eq!(pass, "first");
                assert_eq!(source, ValidationError::LayoutViolation(LayoutViolation::BindingInUse { binding: 0 }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_file() {
        let mut files = files();
        files.remove("second.frag.spv");

        let error = ReflectedPreset::from_yaml(YAML, loader(files)).unwrap_err();
        assert!(matches!(error, PresetError::Load { ref pass, ref file, .. } if pass == "second" && file == "second.frag.spv"));
    }

    #[test]
    fn test_invalid_manifest_is_rejected_before_loading() {
        let yaml = YAML.replace("id: second", "id: first");
        let error = ReflectedPreset::from_yaml(&yaml, |_: &str| -> Result<Vec<u8>, std::io::Error> { panic!("loader called") }).unwrap_err();
        assert!(matches!(error, PresetError::Manifest(PresetValidationError::DuplicatePassId(1, _))));
    }

    #[test]
    fn test_yaml_error() {
        let error = ReflectedPreset::from_yaml("passes: [", loader(files())).unwrap_err();
        assert!(matches!(error, PresetError::Yaml(_)));
    }
}
