//! validation
//!
//! Validation of a module's declared configuration surface.
//!
//! # Architecture
//!
//! - [`params`]: parameter values and the typed accessor shared by validators
//! - [`validators`]: named validators (`regex`, `text_len_compare`,
//!   `number_compare`) behind a capability-keyed registry
//! - [`types`]: config type definitions binding validators to options
//! - [`checker`]: the three validation passes over a config option
//!
//! # Passes
//!
//! 1. Base: the option's data type suits its config type and its default and
//!    enumerated values are well formed.
//! 2. Options: the config type's constraint parameters are known, correctly
//!    typed and consistent.
//! 3. Value: an assigned value satisfies the option's constraints.
//!
//! Each pass is callable on its own. A later pass assumes the earlier ones
//! succeeded.

pub mod checker;
pub mod params;
pub mod types;
pub mod validators;

pub use checker::ConfigValidator;
pub use params::{get_param, FromParam, ParamValue, Params};
pub use types::{ConfigTypeDefinition, ConfigTypeRegistry, ParamSource, ValidationRule};
pub use validators::{Operator, Validator, ValidatorRegistry};

use thiserror::Error;

use crate::core::module::DataType;
use crate::sync::ErrorKind;

/// Errors from configuration validation.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("missing parameter '{0}'")]
    MissingParameter(String),

    #[error("parameter '{name}' must be {expected}, found {found}")]
    ParameterType {
        name: String,
        expected: &'static str,
        found: DataType,
    },

    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("'{string}' does not match pattern '{pattern}'")]
    PatternMismatch { string: String, pattern: String },

    #[error("comparison failed: {actual} {operator} {expected} does not hold")]
    ComparisonFailed {
        actual: String,
        operator: &'static str,
        expected: String,
    },

    #[error("invalid operator '{0}'")]
    InvalidOperator(String),

    #[error("type mismatch: cannot compare {left} with {right}")]
    TypeMismatch { left: DataType, right: DataType },

    #[error("unknown validator '{0}'")]
    UnknownValidator(String),

    #[error("unknown config type '{0}'")]
    UnknownConfigType(String),

    #[error("config type '{type_id}' does not support data type {data_type}")]
    UnsupportedDataType { type_id: String, data_type: DataType },

    #[error("invalid declaration: {0}")]
    InvalidDeclaration(String),

    #[error("value of type {found} where {expected} is expected")]
    ValueType { expected: DataType, found: DataType },

    #[error("value shape does not match declaration (list expected: {expected_list})")]
    ListShape { expected_list: bool },

    #[error("value {0} is not one of the allowed options")]
    NotInOptions(String),

    #[error("config type '{type_id}' has no option '{option}'")]
    UnknownTypeOption { type_id: String, option: String },

    #[error("config type '{type_id}' requires option '{option}'")]
    MissingTypeOption { type_id: String, option: String },

    #[error("type option '{option}' must be {expected}, found {found}")]
    TypeOptionKind {
        option: String,
        expected: DataType,
        found: DataType,
    },

    #[error("duplicate config '{0}'")]
    DuplicateConfig(String),

    #[error("config '{key}': {source}")]
    Config {
        key: String,
        source: Box<ValidationError>,
    },

    #[error("{0}")]
    Custom(String),
}

impl ValidationError {
    /// Classify for batch reporting.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ValidationError::InvalidPattern { .. } => ErrorKind::Decode,
            ValidationError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            ValidationError::Config { source, .. } => source.kind(),
            _ => ErrorKind::Validation,
        }
    }

    /// Tag an error with the config key it concerns.
    pub fn for_config(self, key: impl Into<String>) -> Self {
        ValidationError::Config {
            key: key.into(),
            source: Box::new(self),
        }
    }
}
