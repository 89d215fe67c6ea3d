//! validation::types
//!
//! Config type definitions.
//!
//! A config option declares a type id (`text`, `number`, `bool`). The type
//! definition says which base data types it accepts, which constraint
//! options (`typeOpt` in a manifest) it understands, and which validators to
//! run. Rules bind validator parameters from the checked value, from a type
//! option, or from a constant. A rule whose type option is not set does not
//! apply.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::params::{ParamValue, Params};
use super::validators::{NUMBER_COMPARE, REGEX, REGEX_SYNTAX, TEXT_LEN_COMPARE};
use crate::core::module::DataType;

/// Built-in text type id.
pub const TEXT: &str = "text";
/// Built-in number type id.
pub const NUMBER: &str = "number";
/// Built-in bool type id.
pub const BOOL: &str = "bool";

/// Where a validator parameter comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamSource {
    /// The value being validated.
    Value,
    /// A constraint option of the config type.
    TypeOption(String),
    /// A fixed value.
    Const(ParamValue),
}

/// A validator invocation with its parameter bindings.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationRule {
    pub validator: String,
    pub params: Vec<(String, ParamSource)>,
}

impl ValidationRule {
    pub fn new(validator: impl Into<String>) -> Self {
        Self {
            validator: validator.into(),
            params: Vec::new(),
        }
    }

    /// Builder-style parameter binding.
    pub fn bind(mut self, name: impl Into<String>, source: ParamSource) -> Self {
        self.params.push((name.into(), source));
        self
    }

    /// Resolve the bindings into a parameter map.
    ///
    /// Returns `None` when the rule does not apply: a referenced type option
    /// is unset, or the rule needs a value and none is given.
    pub fn resolve(&self, value: Option<&ParamValue>, type_options: &Params) -> Option<Params> {
        let mut params = Params::new();
        for (name, source) in &self.params {
            let resolved = match source {
                ParamSource::Value => value?.clone(),
                ParamSource::TypeOption(key) => type_options.get(key)?.clone(),
                ParamSource::Const(v) => v.clone(),
            };
            params.insert(name.clone(), resolved);
        }
        Some(params)
    }
}

/// Expected kind of a type option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    /// A fixed data type.
    Exact(DataType),
    /// Same data type as the config option it constrains.
    SameAsData,
}

impl OptionKind {
    /// The concrete data type for an option declared as `data_type`.
    pub fn resolve(self, data_type: DataType) -> DataType {
        match self {
            OptionKind::Exact(exact) => exact,
            OptionKind::SameAsData => data_type,
        }
    }
}

/// Declaration of one type option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeOptionSpec {
    pub kind: OptionKind,
    pub required: bool,
}

impl TypeOptionSpec {
    pub fn optional(kind: OptionKind) -> Self {
        Self {
            kind,
            required: false,
        }
    }
}

/// A config type: accepted data types, known options and rules.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigTypeDefinition {
    pub id: String,
    pub data_types: Vec<DataType>,
    pub options: BTreeMap<String, TypeOptionSpec>,
    /// Rules over the type options alone, checked when an option is declared.
    pub option_rules: Vec<ValidationRule>,
    /// Rules over an assigned value.
    pub value_rules: Vec<ValidationRule>,
}

impl ConfigTypeDefinition {
    pub fn accepts(&self, data_type: DataType) -> bool {
        self.data_types.contains(&data_type)
    }

    /// Free-form text with optional pattern and length bounds.
    pub fn text() -> Self {
        let mut options = BTreeMap::new();
        options.insert(
            "regex".to_string(),
            TypeOptionSpec::optional(OptionKind::Exact(DataType::String)),
        );
        options.insert(
            "min_len".to_string(),
            TypeOptionSpec::optional(OptionKind::Exact(DataType::Int64)),
        );
        options.insert(
            "max_len".to_string(),
            TypeOptionSpec::optional(OptionKind::Exact(DataType::Int64)),
        );

        let opt = |k: &str| ParamSource::TypeOption(k.to_string());
        let op = |s: &str| ParamSource::Const(ParamValue::String(s.to_string()));

        Self {
            id: TEXT.to_string(),
            data_types: vec![DataType::String],
            options,
            option_rules: vec![
                ValidationRule::new(REGEX_SYNTAX).bind("pattern", opt("regex")),
                ValidationRule::new(NUMBER_COMPARE)
                    .bind("a", opt("min_len"))
                    .bind("b", ParamSource::Const(ParamValue::Int64(0)))
                    .bind("operator", op(">=")),
                ValidationRule::new(NUMBER_COMPARE)
                    .bind("a", opt("min_len"))
                    .bind("b", opt("max_len"))
                    .bind("operator", op("<=")),
            ],
            value_rules: vec![
                ValidationRule::new(REGEX)
                    .bind("string", ParamSource::Value)
                    .bind("pattern", opt("regex")),
                ValidationRule::new(TEXT_LEN_COMPARE)
                    .bind("string", ParamSource::Value)
                    .bind("length", opt("min_len"))
                    .bind("operator", op(">=")),
                ValidationRule::new(TEXT_LEN_COMPARE)
                    .bind("string", ParamSource::Value)
                    .bind("length", opt("max_len"))
                    .bind("operator", op("<=")),
            ],
        }
    }

    /// Integer or float with optional inclusive/exclusive bounds.
    pub fn number() -> Self {
        let bounds = [("min", ">="), ("max", "<="), ("min_excl", ">"), ("max_excl", "<")];

        let options = bounds
            .iter()
            .map(|(k, _)| (k.to_string(), TypeOptionSpec::optional(OptionKind::SameAsData)))
            .collect();

        let value_rules = bounds
            .iter()
            .map(|(k, operator)| {
                ValidationRule::new(NUMBER_COMPARE)
                    .bind("a", ParamSource::Value)
                    .bind("b", ParamSource::TypeOption(k.to_string()))
                    .bind("operator", ParamSource::Const(ParamValue::from(*operator)))
            })
            .collect();

        Self {
            id: NUMBER.to_string(),
            data_types: vec![DataType::Int64, DataType::Float64],
            options,
            option_rules: vec![ValidationRule::new(NUMBER_COMPARE)
                .bind("a", ParamSource::TypeOption("min".into()))
                .bind("b", ParamSource::TypeOption("max".into()))
                .bind("operator", ParamSource::Const("<=".into()))],
            value_rules,
        }
    }

    /// Plain boolean switch.
    pub fn boolean() -> Self {
        Self {
            id: BOOL.to_string(),
            data_types: vec![DataType::Bool],
            options: BTreeMap::new(),
            option_rules: Vec::new(),
            value_rules: Vec::new(),
        }
    }
}

/// Capability-keyed table of config types.
#[derive(Debug, Clone)]
pub struct ConfigTypeRegistry {
    types: HashMap<String, Arc<ConfigTypeDefinition>>,
}

impl Default for ConfigTypeRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(ConfigTypeDefinition::text());
        registry.register(ConfigTypeDefinition::number());
        registry.register(ConfigTypeDefinition::boolean());
        registry
    }
}

impl ConfigTypeRegistry {
    pub fn empty() -> Self {
        Self {
            types: HashMap::new(),
        }
    }

    pub fn register(&mut self, definition: ConfigTypeDefinition) {
        self.types
            .insert(definition.id.clone(), Arc::new(definition));
    }

    pub fn get(&self, id: &str) -> Option<&ConfigTypeDefinition> {
        self.types.get(id).map(|d| d.as_ref())
    }
}
