//! manifest
//!
//! Versioned manifest (`Modfile.yml`) decoding and generation.
//!
//! # Design
//!
//! A manifest is self-describing: its `modfileVersion` key names the schema
//! version. The [`ManifestRegistry`] parses the document once, reads that
//! key from the envelope and dispatches to the decoder registered for the
//! version. Decoders and generators live in open tables keyed by version, so
//! a new schema is supported by registering it; dispatch never changes.
//!
//! # Modules
//!
//! - [`v1`]: flat schema with configs keyed by name
//! - [`v2`]: grouped identity, ordered configs with nested constraints
//!
//! # Example
//!
//! ```
//! use modsync::manifest::ManifestRegistry;
//!
//! let registry = ManifestRegistry::default();
//! let yaml = r#"
//! modfileVersion: v1
//! id: github.com/acme/sensor
//! name: Sensor
//! version: 1.2.0
//! configs:
//!   interval:
//!     dataType: int
//!     type: number
//!     value: 30
//!     typeOpt:
//!       min: 1
//! "#;
//!
//! let module = registry.decode(yaml.as_bytes()).unwrap();
//! assert_eq!(module.name, "Sensor");
//! assert_eq!(module.configs.len(), 1);
//!
//! // Regenerate in the newer schema
//! let v2 = registry.generate(&module, "v2").unwrap();
//! assert_eq!(registry.decode(v2.as_bytes()).unwrap(), module);
//! ```

pub mod v1;
pub mod v2;

use std::collections::HashMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

use crate::core::module::ModuleDefinition;
use crate::sync::ErrorKind;

/// Accepted manifest file names, matched case-sensitively at the module root.
pub const MANIFEST_NAMES: [&str; 2] = ["Modfile.yml", "Modfile.yaml"];

/// Errors from manifest operations.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("no manifest ({}) found in {}", MANIFEST_NAMES.join(" or "), .0.display())]
    NotFound(PathBuf),

    #[error("ambiguous manifest: found {}", .0.join(" and "))]
    Ambiguous(Vec<String>),

    #[error("failed to parse manifest: {0}")]
    Parse(String),

    #[error("manifest does not declare modfileVersion")]
    MissingVersion,

    #[error("unsupported manifest version '{0}'")]
    UnsupportedVersion(String),

    #[error("invalid manifest: {0}")]
    Invalid(String),

    #[error("failed to generate manifest: {0}")]
    Generate(String),

    #[error("failed to read manifest: {0}")]
    Io(#[from] std::io::Error),
}

impl ManifestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ManifestError::NotFound(_) => ErrorKind::NotFound,
            ManifestError::Io(_) => ErrorKind::Io,
            _ => ErrorKind::Decode,
        }
    }
}

/// Decodes one schema version into the canonical definition.
pub trait ManifestDecoder: Send + Sync {
    fn decode(&self, document: serde_yaml::Value) -> Result<ModuleDefinition, ManifestError>;
}

/// Renders the canonical definition in one schema version.
pub trait ManifestGenerator: Send + Sync {
    fn generate(&self, module: &ModuleDefinition) -> Result<String, ManifestError>;
}

/// Envelope for version dispatch before full parsing.
#[derive(Debug, Deserialize)]
struct ManifestEnvelope {
    #[serde(rename = "modfileVersion")]
    version: Option<String>,
}

/// Version-keyed decoder and generator tables.
#[derive(Clone)]
pub struct ManifestRegistry {
    decoders: HashMap<String, Arc<dyn ManifestDecoder>>,
    generators: HashMap<String, Arc<dyn ManifestGenerator>>,
}

impl std::fmt::Debug for ManifestRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManifestRegistry")
            .field("decoders", &self.decoder_versions())
            .finish()
    }
}

impl Default for ManifestRegistry {
    /// Registry with every built-in schema version.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register_decoder(v1::VERSION, v1::DecoderV1);
        registry.register_generator(v1::VERSION, v1::GeneratorV1);
        registry.register_decoder(v2::VERSION, v2::DecoderV2);
        registry.register_generator(v2::VERSION, v2::GeneratorV2);
        registry
    }
}

impl ManifestRegistry {
    pub fn empty() -> Self {
        Self {
            decoders: HashMap::new(),
            generators: HashMap::new(),
        }
    }

    pub fn register_decoder(
        &mut self,
        version: impl Into<String>,
        decoder: impl ManifestDecoder + 'static,
    ) {
        self.decoders.insert(version.into(), Arc::new(decoder));
    }

    pub fn register_generator(
        &mut self,
        version: impl Into<String>,
        generator: impl ManifestGenerator + 'static,
    ) {
        self.generators.insert(version.into(), Arc::new(generator));
    }

    /// Versions with a registered decoder, sorted.
    pub fn decoder_versions(&self) -> Vec<&str> {
        let mut versions: Vec<_> = self.decoders.keys().map(String::as_str).collect();
        versions.sort_unstable();
        versions
    }

    /// Decode a manifest read from `reader`.
    ///
    /// # Errors
    ///
    /// - `Parse` for malformed YAML
    /// - `MissingVersion` / `UnsupportedVersion` when dispatch fails
    /// - whatever the selected decoder reports
    pub fn decode<R: Read>(&self, mut reader: R) -> Result<ModuleDefinition, ManifestError> {
        let mut content = String::new();
        reader.read_to_string(&mut content)?;

        let document: serde_yaml::Value =
            serde_yaml::from_str(&content).map_err(|e| ManifestError::Parse(e.to_string()))?;
        let envelope: ManifestEnvelope = serde_yaml::from_value(document.clone())
            .map_err(|e| ManifestError::Parse(e.to_string()))?;
        let version = envelope.version.ok_or(ManifestError::MissingVersion)?;

        let decoder = self
            .decoders
            .get(&version)
            .ok_or_else(|| ManifestError::UnsupportedVersion(version.clone()))?;
        decoder.decode(document)
    }

    /// Locate the manifest at `root` and decode it.
    pub fn decode_dir(&self, root: &Path) -> Result<ModuleDefinition, ManifestError> {
        let path = locate_manifest(root)?;
        let file = fs::File::open(&path)?;
        self.decode(file)
    }

    /// Render `module` in schema `version`.
    pub fn generate(
        &self,
        module: &ModuleDefinition,
        version: &str,
    ) -> Result<String, ManifestError> {
        let generator = self
            .generators
            .get(version)
            .ok_or_else(|| ManifestError::UnsupportedVersion(version.to_string()))?;
        generator.generate(module)
    }
}

/// Find the single manifest file at the root of a module tree.
///
/// # Errors
///
/// - `NotFound` if neither accepted name exists
/// - `Ambiguous` if both exist
pub fn locate_manifest(root: &Path) -> Result<PathBuf, ManifestError> {
    let mut found = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if MANIFEST_NAMES.contains(&name) && entry.file_type()?.is_file() {
            found.push(name.to_string());
        }
    }
    found.sort();

    match found.len() {
        0 => Err(ManifestError::NotFound(root.to_path_buf())),
        1 => Ok(root.join(&found[0])),
        _ => Err(ManifestError::Ambiguous(found)),
    }
}

/// Identity checks shared by all decoders.
pub(crate) fn check_identity(module: &ModuleDefinition) -> Result<(), ManifestError> {
    for (field, value) in [
        ("id", &module.id),
        ("name", &module.name),
        ("version", &module.version),
    ] {
        if value.trim().is_empty() {
            return Err(ManifestError::Invalid(format!("'{}' must not be empty", field)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const V1: &str = r#"
modfileVersion: v1
id: github.com/acme/sensor
name: Sensor
description: Reads a sensor
version: 1.2.0
license: MIT
tags: [iot]
architectures: [amd64, arm64]
dependencies:
  github.com/acme/broker: ">=1.0.0"
configs:
  interval:
    dataType: int
    type: number
    value: 30
    typeOpt:
      min: 1
  mode:
    dataType: string
    type: text
    options: [fast, slow]
    value: fast
"#;

    mod dispatch {
        use super::*;

        #[test]
        fn decodes_registered_version() {
            let module = ManifestRegistry::default().decode(V1.as_bytes()).unwrap();
            assert_eq!(module.id, "github.com/acme/sensor");
            assert_eq!(module.version, "1.2.0");
            assert_eq!(module.architectures, vec!["amd64", "arm64"]);
            assert_eq!(module.dependencies["github.com/acme/broker"], ">=1.0.0");
            let keys: Vec<_> = module.configs.iter().map(|c| c.key.as_str()).collect();
            assert_eq!(keys, vec!["interval", "mode"]);
        }

        #[test]
        fn unsupported_version() {
            let err = ManifestRegistry::default()
                .decode("modfileVersion: v9\nid: x\n".as_bytes())
                .unwrap_err();
            assert!(matches!(err, ManifestError::UnsupportedVersion(ref v) if v == "v9"));
            assert_eq!(err.kind(), ErrorKind::Decode);
        }

        #[test]
        fn missing_version() {
            let err = ManifestRegistry::default()
                .decode("id: x\nname: y\n".as_bytes())
                .unwrap_err();
            assert!(matches!(err, ManifestError::MissingVersion));
        }

        #[test]
        fn malformed_yaml() {
            let err = ManifestRegistry::default()
                .decode("modfileVersion: [v1\n".as_bytes())
                .unwrap_err();
            assert!(matches!(err, ManifestError::Parse(_)));
        }

        #[test]
        fn new_versions_plug_in_without_dispatch_changes() {
            struct Fixed;
            impl ManifestDecoder for Fixed {
                fn decode(
                    &self,
                    _document: serde_yaml::Value,
                ) -> Result<ModuleDefinition, ManifestError> {
                    ManifestRegistry::default().decode(V1.as_bytes())
                }
            }

            let mut registry = ManifestRegistry::default();
            registry.register_decoder("experimental", Fixed);
            let module = registry
                .decode("modfileVersion: experimental\n".as_bytes())
                .unwrap();
            assert_eq!(module.name, "Sensor");
            assert_eq!(registry.decoder_versions(), vec!["experimental", "v1", "v2"]);
        }

        #[test]
        fn generate_unknown_version() {
            let module = ManifestRegistry::default().decode(V1.as_bytes()).unwrap();
            assert!(matches!(
                ManifestRegistry::default().generate(&module, "v0"),
                Err(ManifestError::UnsupportedVersion(_))
            ));
        }

        #[test]
        fn cross_version_regeneration() {
            let registry = ManifestRegistry::default();
            let module = registry.decode(V1.as_bytes()).unwrap();
            let v2 = registry.generate(&module, "v2").unwrap();
            assert!(v2.contains("modfileVersion: v2"));
            assert_eq!(registry.decode(v2.as_bytes()).unwrap(), module);
        }
    }

    mod ordering {
        use super::*;

        const V2_UNSORTED: &str = r#"
modfileVersion: v2
module:
  id: acme/sensor
  name: Sensor
  version: 2.0.0
configs:
  - key: zeta
    dataType: int
    default: 3
    constraint:
      type: number
      options:
        min: 1
  - key: alpha
    dataType: string
    constraint:
      type: text
"#;

        #[test]
        fn v2_to_v1_regeneration_keeps_configs() {
            let registry = ManifestRegistry::default();
            let module = registry.decode(V2_UNSORTED.as_bytes()).unwrap();
            let v1 = registry.generate(&module, "v1").unwrap();
            assert!(v1.contains("modfileVersion: v1"));

            let back = registry.decode(v1.as_bytes()).unwrap();
            let keys: Vec<_> = back.configs.iter().map(|c| c.key.as_str()).collect();
            assert_eq!(keys, vec!["zeta", "alpha"]);
            assert_eq!(back, module);
        }
    }

    mod numbers {
        use super::*;
        use crate::validation::ConfigValidator;

        #[test]
        fn whole_numbers_on_float_config_validate() {
            let yaml = r#"
modfileVersion: v2
module:
  id: acme/sensor
  name: Sensor
  version: 2.0.0
configs:
  - key: ratio
    dataType: float
    default: 5
    constraint:
      type: number
      options:
        min: 1
        max: 10.5
"#;
            let module = ManifestRegistry::default().decode(yaml.as_bytes()).unwrap();
            ConfigValidator::default().validate_module(&module).unwrap();
        }
    }

    mod locate {
        use super::*;

        #[test]
        fn finds_yml() {
            let dir = tempfile::tempdir().unwrap();
            fs::write(dir.path().join("Modfile.yml"), V1).unwrap();
            assert_eq!(
                locate_manifest(dir.path()).unwrap(),
                dir.path().join("Modfile.yml")
            );
        }

        #[test]
        fn finds_yaml() {
            let dir = tempfile::tempdir().unwrap();
            fs::write(dir.path().join("Modfile.yaml"), V1).unwrap();
            assert!(locate_manifest(dir.path()).is_ok());
        }

        #[test]
        fn case_sensitive() {
            let dir = tempfile::tempdir().unwrap();
            fs::write(dir.path().join("modfile.yml"), V1).unwrap();
            let err = locate_manifest(dir.path()).unwrap_err();
            assert!(matches!(err, ManifestError::NotFound(_)));
            assert_eq!(err.kind(), ErrorKind::NotFound);
        }

        #[test]
        fn nested_manifest_is_not_the_root_manifest() {
            let dir = tempfile::tempdir().unwrap();
            fs::create_dir(dir.path().join("sub")).unwrap();
            fs::write(dir.path().join("sub/Modfile.yml"), V1).unwrap();
            assert!(matches!(
                locate_manifest(dir.path()),
                Err(ManifestError::NotFound(_))
            ));
        }

        #[test]
        fn both_names_are_ambiguous() {
            let dir = tempfile::tempdir().unwrap();
            fs::write(dir.path().join("Modfile.yml"), V1).unwrap();
            fs::write(dir.path().join("Modfile.yaml"), V1).unwrap();
            let err = locate_manifest(dir.path()).unwrap_err();
            assert!(matches!(err, ManifestError::Ambiguous(ref names) if names.len() == 2));
            assert_eq!(err.kind(), ErrorKind::Decode);
        }

        #[test]
        fn decode_dir_reads_located_file() {
            let dir = tempfile::tempdir().unwrap();
            fs::write(dir.path().join("Modfile.yaml"), V1).unwrap();
            let module = ManifestRegistry::default().decode_dir(dir.path()).unwrap();
            assert_eq!(module.name, "Sensor");
        }
    }
}
