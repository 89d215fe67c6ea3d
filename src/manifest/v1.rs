//! manifest::v1
//!
//! Flat schema. Configs are a map keyed by config key; decoding and
//! generation both keep the document order of that map.
//!
//! ```yaml
//! modfileVersion: v1
//! id: github.com/acme/sensor
//! name: Sensor
//! version: 1.2.0
//! configs:
//!   interval:
//!     dataType: int
//!     type: number
//!     value: 30
//!     typeOpt: { min: 1 }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use super::{check_identity, ManifestDecoder, ManifestError, ManifestGenerator};
use crate::core::module::{ConfigOption, ConfigValue, DataType, ModuleDefinition};
use crate::validation::params::ParamValue;

pub const VERSION: &str = "v1";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModfileV1 {
    modfile_version: String,
    id: String,
    name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    description: String,
    version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    license: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    author: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    architectures: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    dependencies: BTreeMap<String, String>,
    /// Config key to [`ConfigV1`], in document order.
    #[serde(default, skip_serializing_if = "Mapping::is_empty")]
    configs: Mapping,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigV1 {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    data_type: DataType,
    #[serde(rename = "type")]
    type_id: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    type_opt: BTreeMap<String, ParamValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<ConfigValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    options: Vec<ParamValue>,
    #[serde(default, skip_serializing_if = "is_false")]
    options_ext: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    required: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    is_list: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    delimiter: Option<String>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

pub struct DecoderV1;

impl ManifestDecoder for DecoderV1 {
    fn decode(&self, document: serde_yaml::Value) -> Result<ModuleDefinition, ManifestError> {
        let file: ModfileV1 =
            serde_yaml::from_value(document).map_err(|e| ManifestError::Parse(e.to_string()))?;

        let mut configs = Vec::with_capacity(file.configs.len());
        for (key, value) in file.configs {
            let key = match key {
                Value::String(key) => key,
                other => {
                    return Err(ManifestError::Parse(format!(
                        "config keys must be strings, got {:?}",
                        other
                    )))
                }
            };
            let c: ConfigV1 = serde_yaml::from_value(value)
                .map_err(|e| ManifestError::Parse(format!("config '{}': {}", key, e)))?;
            configs.push(ConfigOption {
                key,
                name: c.name,
                description: c.description,
                data_type: c.data_type,
                type_id: c.type_id,
                type_options: c.type_opt,
                default: c.value,
                options: c.options,
                options_ext: c.options_ext,
                required: c.required,
                is_list: c.is_list,
                delimiter: c.delimiter,
            });
        }

        let module = ModuleDefinition {
            id: file.id,
            name: file.name,
            description: file.description,
            version: file.version,
            license: file.license,
            author: file.author,
            tags: file.tags,
            architectures: file.architectures,
            dependencies: file.dependencies,
            configs,
        };
        check_identity(&module)?;
        Ok(module)
    }
}

pub struct GeneratorV1;

impl ManifestGenerator for GeneratorV1 {
    fn generate(&self, module: &ModuleDefinition) -> Result<String, ManifestError> {
        let mut configs = Mapping::new();
        for c in &module.configs {
            let key = Value::String(c.key.clone());
            if configs.contains_key(&key) {
                return Err(ManifestError::Generate(format!(
                    "duplicate config '{}' cannot be keyed in {}",
                    c.key, VERSION
                )));
            }
            let entry = ConfigV1 {
                name: c.name.clone(),
                description: c.description.clone(),
                data_type: c.data_type,
                type_id: c.type_id.clone(),
                type_opt: c.type_options.clone(),
                value: c.default.clone(),
                options: c.options.clone(),
                options_ext: c.options_ext,
                required: c.required,
                is_list: c.is_list,
                delimiter: c.delimiter.clone(),
            };
            let entry =
                serde_yaml::to_value(entry).map_err(|e| ManifestError::Generate(e.to_string()))?;
            configs.insert(key, entry);
        }

        let file = ModfileV1 {
            modfile_version: VERSION.to_string(),
            id: module.id.clone(),
            name: module.name.clone(),
            description: module.description.clone(),
            version: module.version.clone(),
            license: module.license.clone(),
            author: module.author.clone(),
            tags: module.tags.clone(),
            architectures: module.architectures.clone(),
            dependencies: module.dependencies.clone(),
            configs,
        };
        serde_yaml::to_string(&file).map_err(|e| ManifestError::Generate(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::ManifestRegistry;

    #[test]
    fn decodes_config_fields() {
        let yaml = r#"
modfileVersion: v1
id: acme/logger
name: Logger
version: 0.3.0
configs:
  targets:
    dataType: string
    type: text
    isList: true
    delimiter: ","
    value: [stdout, file]
    options: [stdout, file, syslog]
    optionsExt: true
    required: true
    typeOpt:
      max_len: 16
"#;
        let module = ManifestRegistry::default().decode(yaml.as_bytes()).unwrap();
        let targets = module.config("targets").unwrap();
        assert_eq!(targets.data_type, DataType::String);
        assert!(targets.is_list && targets.required && targets.options_ext);
        assert_eq!(targets.delimiter.as_deref(), Some(","));
        assert_eq!(targets.options.len(), 3);
        assert_eq!(targets.type_options["max_len"], ParamValue::Int64(16));
        assert!(matches!(targets.default, Some(ConfigValue::List(ref v)) if v.len() == 2));
    }

    #[test]
    fn ignores_unmodelled_sections() {
        let yaml = "modfileVersion: v1\nid: a\nname: A\nversion: '1'\nservices:\n  app: {}\n";
        assert!(ManifestRegistry::default().decode(yaml.as_bytes()).is_ok());
    }

    #[test]
    fn empty_identity_is_invalid() {
        let yaml = "modfileVersion: v1\nid: ''\nname: A\nversion: '1'\n";
        let err = ManifestRegistry::default().decode(yaml.as_bytes()).unwrap_err();
        assert!(matches!(err, ManifestError::Invalid(_)));
    }

    #[test]
    fn missing_name_is_parse_error() {
        let yaml = "modfileVersion: v1\nid: a\nversion: '1'\n";
        let err = ManifestRegistry::default().decode(yaml.as_bytes()).unwrap_err();
        assert!(matches!(err, ManifestError::Parse(_)));
    }

    #[test]
    fn unknown_data_type_is_parse_error() {
        let yaml = r#"
modfileVersion: v1
id: a
name: A
version: '1'
configs:
  x:
    dataType: complex
    type: text
"#;
        assert!(matches!(
            ManifestRegistry::default().decode(yaml.as_bytes()),
            Err(ManifestError::Parse(_))
        ));
    }

    #[test]
    fn generate_round_trips() {
        let registry = ManifestRegistry::default();
        let mut module = ModuleDefinition {
            id: "acme/m".into(),
            name: "M".into(),
            description: "desc".into(),
            version: "1.0.0".into(),
            license: None,
            author: Some("acme".into()),
            tags: vec!["a".into()],
            architectures: vec![],
            dependencies: BTreeMap::new(),
            configs: vec![
                ConfigOption::new("a", DataType::Bool, "bool"),
                ConfigOption::new("b", DataType::Int64, "number"),
            ],
        };
        module.configs[1].default = Some(ConfigValue::Single(ParamValue::Int64(4)));

        let yaml = GeneratorV1.generate(&module).unwrap();
        assert!(yaml.contains("modfileVersion: v1"));
        assert_eq!(registry.decode(yaml.as_bytes()).unwrap(), module);
    }

    #[test]
    fn keeps_document_order_of_configs() {
        let yaml = r#"
modfileVersion: v1
id: a
name: A
version: '1'
configs:
  zeta:
    dataType: bool
    type: bool
  alpha:
    dataType: bool
    type: bool
"#;
        let module = ManifestRegistry::default().decode(yaml.as_bytes()).unwrap();
        let keys: Vec<_> = module.configs.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);

        let regenerated = GeneratorV1.generate(&module).unwrap();
        assert!(regenerated.find("zeta:").unwrap() < regenerated.find("alpha:").unwrap());
    }

    #[test]
    fn non_string_config_key_is_parse_error() {
        let yaml = "modfileVersion: v1\nid: a\nname: A\nversion: '1'\nconfigs:\n  7:\n    dataType: bool\n    type: bool\n";
        assert!(matches!(
            ManifestRegistry::default().decode(yaml.as_bytes()),
            Err(ManifestError::Parse(_))
        ));
    }

    #[test]
    fn generate_rejects_duplicate_keys() {
        let module = ModuleDefinition {
            id: "a".into(),
            name: "A".into(),
            description: String::new(),
            version: "1".into(),
            license: None,
            author: None,
            tags: vec![],
            architectures: vec![],
            dependencies: BTreeMap::new(),
            configs: vec![
                ConfigOption::new("x", DataType::Bool, "bool"),
                ConfigOption::new("x", DataType::Bool, "bool"),
            ],
        };
        assert!(matches!(
            GeneratorV1.generate(&module),
            Err(ManifestError::Generate(_))
        ));
    }
}
