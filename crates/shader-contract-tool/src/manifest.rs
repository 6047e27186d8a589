//! Preset Manifest Parser
//!
//! A preset is an ordered list of filter passes, each a compiled vertex and
//! fragment shader. Manifests are YAML files; shader paths are relative to the
//! manifest.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// A single filter pass in the preset
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PassSpec {
    /// Unique identifier for this pass
    pub id: String,
    /// Vertex shader SPIR-V file, relative to the manifest
    pub vertex: String,
    /// Fragment shader SPIR-V file, relative to the manifest
    pub fragment: String,
}

/// Raw preset manifest as parsed from YAML
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PresetSpec {
    /// Unique preset identifier
    pub id: String,
    /// Human-readable preset name
    pub name: String,
    /// Optional description
    #[serde(default)]
    pub description: Option<String>,
    /// Passes in execution order
    pub passes: Vec<PassSpec>,
}

impl PresetSpec {
    /// Parses a raw preset manifest from YAML content
    ///
    /// # Arguments
    /// * `yaml_content` - YAML string containing the manifest
    pub fn from_yaml(yaml_content: &str) -> Result<Self, serde_norway::Error> {
        serde_norway::from_str(yaml_content)
    }

    /// Parses a raw preset manifest from a YAML file
    ///
    /// # Arguments
    /// * `path` - Path to the YAML manifest file
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, crate::PresetError> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_yaml(&content)?)
    }

    /// Validates the manifest structure
    ///
    /// Shader contents are not looked at here; that happens when the preset
    /// is reflected.
    ///
    /// # Returns
    /// Ok(()) if valid, or the first problem found
    pub fn validate(&self) -> Result<(), PresetValidationError> {
        if self.id.is_empty() {
            return Err(PresetValidationError::EmptyId);
        }

        if self.name.is_empty() {
            return Err(PresetValidationError::EmptyName);
        }

        if self.passes.is_empty() {
            return Err(PresetValidationError::NoPasses);
        }

        let mut pass_ids = HashSet::new();
        for (i, pass) in self.passes.iter().enumerate() {
            if !pass_ids.insert(pass.id.as_str()) {
                return Err(PresetValidationError::DuplicatePassId(i, pass.id.clone()));
            }
            if pass.vertex == pass.fragment {
                return Err(PresetValidationError::SameShaderFile(i, pass.vertex.clone()));
            }
        }

        Ok(())
    }
}

/// Preset manifest validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresetValidationError {
    /// Preset ID field is empty
    EmptyId,
    /// Preset name field is empty
    EmptyName,
    /// Preset contains no passes
    NoPasses,
    /// Two passes share an ID (pass index, pass ID)
    DuplicatePassId(usize, String),
    /// A pass uses one file for both stages (pass index, file)
    SameShaderFile(usize, String),
}

impl fmt::Display for PresetValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyId => write!(f, "Preset ID cannot be empty"),
            Self::EmptyName => write!(f, "Preset name cannot be empty"),
            Self::NoPasses => write!(f, "Preset must have at least one pass"),
            Self::DuplicatePassId(pass, id) => write!(f, "Pass ID '{id}' of pass {pass} is already used"),
            Self::SameShaderFile(pass, file) => {
                write!(f, "Pass {pass} uses '{file}' as both vertex and fragment shader")
            }
        }
    }
}

impl std::error::Error for PresetValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
id: crt
name: CRT
description: Scanlines over a sharpened source
passes:
  - id: sharpen
    vertex: sharpen.vert.spv
    fragment: sharpen.frag.spv
  - id: scanlines
    vertex: scanlines.vert.spv
    fragment: scanlines.frag.spv
"#;

    #[test]
    fn test_preset_parsing() {
        let preset = PresetSpec::from_yaml(YAML).unwrap();
        assert_eq!(preset.id, "crt");
        assert_eq!(preset.name, "CRT");
        assert_eq!(preset.description.as_deref(), Some("Scanlines over a sharpened source"));
        assert_eq!(preset.passes.len(), 2);

        let pass = &preset.passes[1];
        assert_eq!(pass.id, "scanlines");
        assert_eq!(pass.vertex, "scanlines.vert.spv");
        assert_eq!(pass.fragment, "scanlines.frag.spv");

        assert!(preset.validate().is_ok());
    }

    #[test]
    fn test_description_is_optional() {
        let yaml = "id: a\nname: A\npasses: []\n";
        let preset = PresetSpec::from_yaml(yaml).unwrap();
        assert_eq!(preset.description, None);
    }

    #[test]
    fn test_missing_field_fails_to_parse() {
        let yaml = "id: a\nname: A\npasses:\n  - id: p\n    vertex: p.vert.spv\n";
        assert!(PresetSpec::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_validation_errors() {
        let valid = PresetSpec::from_yaml(YAML).unwrap();

        let mut preset = valid.clone();
        preset.id.clear();
        assert_eq!(preset.validate(), Err(PresetValidationError::EmptyId));

        let mut preset = valid.clone();
        preset.name.clear();
        assert_eq!(preset.validate(), Err(PresetValidationError::EmptyName));

        let mut preset = valid.clone();
        preset.passes.clear();
        assert_eq!(preset.validate(), Err(PresetValidationError::NoPasses));

        let mut preset = valid.clone();
        preset.passes[1].id = "sharpen".to_string();
        assert_eq!(preset.validate(), Err(PresetValidationError::DuplicatePassId(1, "sharpen".to_string())));

        let mut preset = valid;
        preset.passes[0].fragment = preset.passes[0].vertex.clone();
        let error = preset.validate().unwrap_err();
        assert_eq!(error.to_string(), "Pass 0 uses 'sharpen.vert.spv' as both vertex and fragment shader");
    }
}
