//! core::module
//!
//! Canonical module representation.
//!
//! Every manifest schema version decodes into a [`ModuleDefinition`]. The
//! synchronization pipeline then attaches provenance (source, channel,
//! revision, timestamps) to produce a [`Module`] ready for the store.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::{ModuleId, RevisionMarker};
use crate::validation::params::ParamValue;

/// Base data type of a configuration option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    #[serde(rename = "string")]
    String,
    #[serde(rename = "bool")]
    Bool,
    #[serde(rename = "int")]
    Int64,
    #[serde(rename = "float")]
    Float64,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::String => "string",
            DataType::Bool => "bool",
            DataType::Int64 => "int",
            DataType::Float64 => "float",
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configuration value: a single scalar or a list of scalars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    List(Vec<ParamValue>),
    Single(ParamValue),
}

impl ConfigValue {
    /// Iterate the scalar values regardless of shape.
    pub fn values(&self) -> impl Iterator<Item = &ParamValue> {
        match self {
            ConfigValue::List(items) => items.iter(),
            ConfigValue::Single(value) => std::slice::from_ref(value).iter(),
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, ConfigValue::List(_))
    }
}

/// A declared configuration option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigOption {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub data_type: DataType,
    /// Config type id, resolved through the config type registry.
    pub type_id: String,
    /// Constraint parameters of the config type (e.g. `min_len`).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub type_options: BTreeMap<String, ParamValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<ConfigValue>,
    /// Enumerated allowed values.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<ParamValue>,
    /// Whether values outside `options` are accepted.
    #[serde(default)]
    pub options_ext: bool,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub is_list: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<String>,
}

impl ConfigOption {
    /// A minimal option; used by decoders and tests.
    pub fn new(key: impl Into<String>, data_type: DataType, type_id: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: None,
            description: None,
            data_type,
            type_id: type_id.into(),
            type_options: BTreeMap::new(),
            default: None,
            options: Vec::new(),
            options_ext: false,
            required: false,
            is_list: false,
            delimiter: None,
        }
    }

    /// Whether values are restricted to the enumerated options.
    pub fn options_closed(&self) -> bool {
        !self.options.is_empty() && !self.options_ext
    }
}

/// Schema-independent module definition as declared by a manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleDefinition {
    /// Identity declared by the manifest (e.g. `github.com/acme/sensor`).
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub architectures: Vec<String>,
    /// Declared dependencies: module id to version requirement. Not resolved.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub configs: Vec<ConfigOption>,
}

impl ModuleDefinition {
    pub fn config(&self, key: &str) -> Option<&ConfigOption> {
        self.configs.iter().find(|c| c.key == key)
    }
}

/// A decoded module with provenance, as handed to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub id: ModuleId,
    pub definition: ModuleDefinition,
    pub source: String,
    pub channel: String,
    pub revision: RevisionMarker,
    pub added: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl Module {
    /// Attach provenance to a decoded definition.
    ///
    /// The id is derived from the source, channel and declared identity.
    pub fn new(
        definition: ModuleDefinition,
        source: impl Into<String>,
        channel: impl Into<String>,
        revision: RevisionMarker,
        now: DateTime<Utc>,
    ) -> Self {
        let source = source.into();
        let channel = channel.into();
        let id = ModuleId::derive(&source, &channel, &definition.id);
        Self {
            id,
            definition,
            source,
            channel,
            revision,
            added: now,
            updated: now,
        }
    }

    /// Carry over the original `added` timestamp from a stored record.
    pub fn merge_previous(mut self, previous: Option<&Module>) -> Self {
        if let Some(prev) = previous {
            self.added = prev.added;
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn version(&self) -> &str {
        &self.definition.version
    }
}
