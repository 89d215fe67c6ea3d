//! manifest::v2
//!
//! Identity grouped under `module`; configs as an ordered list with a nested
//! constraint block.
//!
//! ```yaml
//! modfileVersion: v2
//! module:
//!   id: github.com/acme/sensor
//!   name: Sensor
//!   version: 1.2.0
//! platforms: [amd64]
//! requires:
//!   github.com/acme/broker: ">=1.0.0"
//! configs:
//!   - key: interval
//!     dataType: int
//!     default: 30
//!     constraint:
//!       type: number
//!       options: { min: 1 }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{check_identity, ManifestDecoder, ManifestError, ManifestGenerator};
use crate::core::module::{ConfigOption, ConfigValue, DataType, ModuleDefinition};
use crate::validation::params::ParamValue;

pub const VERSION: &str = "v2";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModfileV2 {
    modfile_version: String,
    module: Identity,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    platforms: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    requires: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    configs: Vec<ConfigV2>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Identity {
    id: String,
    name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    description: String,
    version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    license: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    author: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigV2 {
    key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    data_type: DataType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default: Option<ConfigValue>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    required: bool,
    /// Present when the config holds a list of values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    list: Option<ListSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    options: Option<OptionsSpec>,
    constraint: Constraint,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ListSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    delimiter: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OptionsSpec {
    values: Vec<ParamValue>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    extensible: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct Constraint {
    #[serde(rename = "type")]
    type_id: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    options: BTreeMap<String, ParamValue>,
}

pub struct DecoderV2;

impl ManifestDecoder for DecoderV2 {
    fn decode(&self, document: serde_yaml::Value) -> Result<ModuleDefinition, ManifestError> {
        let file: ModfileV2 =
            serde_yaml::from_value(document).map_err(|e| ManifestError::Parse(e.to_string()))?;

        let configs = file
            .configs
            .into_iter()
            .map(|c| {
                let (options, options_ext) = match c.options {
                    Some(spec) => (spec.values, spec.extensible),
                    None => (Vec::new(), false),
                };
                ConfigOption {
                    key: c.key,
                    name: c.name,
                    description: c.description,
                    data_type: c.data_type,
                    type_id: c.constraint.type_id,
                    type_options: c.constraint.options,
                    default: c.default,
                    options,
                    options_ext,
                    required: c.required,
                    is_list: c.list.is_some(),
                    delimiter: c.list.and_then(|l| l.delimiter),
                }
            })
            .collect();

        let module = ModuleDefinition {
            id: file.module.id,
            name: file.module.name,
            description: file.module.description,
            version: file.module.version,
            license: file.module.license,
            author: file.module.author,
            tags: file.tags,
            architectures: file.platforms,
            dependencies: file.requires,
            configs,
        };
        check_identity(&module)?;
        Ok(module)
    }
}

pub struct GeneratorV2;

impl ManifestGenerator for GeneratorV2 {
    fn generate(&self, module: &ModuleDefinition) -> Result<String, ManifestError> {
        let configs = module
            .configs
            .iter()
            .map(|c| {
                // A delimiter without the list flag has no v2 representation.
                if !c.is_list && c.delimiter.is_some() {
                    return Err(ManifestError::Generate(format!(
                        "config '{}' has a delimiter but is not a list",
                        c.key
                    )));
                }
                Ok(ConfigV2 {
                    key: c.key.clone(),
                    name: c.name.clone(),
                    description: c.description.clone(),
                    data_type: c.data_type,
                    default: c.default.clone(),
                    required: c.required,
                    list: c.is_list.then(|| ListSpec {
                        delimiter: c.delimiter.clone(),
                    }),
                    options: (!c.options.is_empty() || c.options_ext).then(|| OptionsSpec {
                        values: c.options.clone(),
                        extensible: c.options_ext,
                    }),
                    constraint: Constraint {
                        type_id: c.type_id.clone(),
                        options: c.type_options.clone(),
                    },
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let file = ModfileV2 {
            modfile_version: VERSION.to_string(),
            module: Identity {
                id: module.id.clone(),
                name: module.name.clone(),
                description: module.description.clone(),
                version: module.version.clone(),
                license: module.license.clone(),
                author: module.author.clone(),
            },
            tags: module.tags.clone(),
            platforms: module.architectures.clone(),
            requires: module.dependencies.clone(),
            configs,
        };
        serde_yaml::to_string(&file).map_err(|e| ManifestError::Generate(e.to_string()))
    }
}
