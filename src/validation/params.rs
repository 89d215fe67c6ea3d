//! validation::params
//!
//! Parameter values and typed parameter extraction.
//!
//! Validators receive their inputs as a name-to-value map. Fetching a
//! parameter goes through [`get_param`], which checks both presence and kind,
//! so individual validators never repeat the type switch.
//!
//! # Example
//!
//! ```
//! use modsync::validation::params::{get_param, ParamValue, Params};
//!
//! let mut params = Params::new();
//! params.insert("length".into(), ParamValue::Int64(5));
//!
//! let length: i64 = get_param(&params, "length").unwrap();
//! assert_eq!(length, 5);
//!
//! // Wrong kind is a descriptive error, not a panic
//! assert!(get_param::<String>(&params, "length").is_err());
//! assert!(get_param::<i64>(&params, "missing").is_err());
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ValidationError;
use crate::core::module::DataType;

/// Parameter map handed to a validator.
pub type Params = BTreeMap<String, ParamValue>;

/// A scalar parameter or configuration value.
///
/// Deserialization tries the variants in declaration order, so YAML `5`
/// becomes `Int64` and `5.0` becomes `Float64`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int64(i64),
    Float64(f64),
    String(String),
}

impl ParamValue {
    /// The data type this value carries.
    pub fn kind(&self) -> DataType {
        match self {
            ParamValue::Bool(_) => DataType::Bool,
            ParamValue::Int64(_) => DataType::Int64,
            ParamValue::Float64(_) => DataType::Float64,
            ParamValue::String(_) => DataType::String,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ParamValue::Int64(_) | ParamValue::Float64(_))
    }

    /// Whether this value widens to `data_type`: an integer where a float is
    /// expected.
    pub fn widens_to(&self, data_type: DataType) -> bool {
        matches!((self, data_type), (ParamValue::Int64(_), DataType::Float64))
    }

    /// Convert in place when [`widens_to`](Self::widens_to) holds.
    pub fn widen_to(&mut self, data_type: DataType) {
        if let (ParamValue::Int64(v), DataType::Float64) = (&*self, data_type) {
            *self = ParamValue::Float64(*v as f64);
        }
    }
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamValue::Bool(v) => write!(f, "{}", v),
            ParamValue::Int64(v) => write!(f, "{}", v),
            ParamValue::Float64(v) => write!(f, "{}", v),
            ParamValue::String(v) => write!(f, "{:?}", v),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::String(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::String(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int64(value)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float64(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

/// Types that can be extracted from a [`ParamValue`].
pub trait FromParam: Sized {
    /// Name used in error messages.
    const EXPECTED: &'static str;

    fn from_param(value: &ParamValue) -> Option<Self>;
}

impl FromParam for String {
    const EXPECTED: &'static str = "string";

    fn from_param(value: &ParamValue) -> Option<Self> {
        match value {
            ParamValue::String(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl FromParam for i64 {
    const EXPECTED: &'static str = "int";

    fn from_param(value: &ParamValue) -> Option<Self> {
        match value {
            ParamValue::Int64(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromParam for f64 {
    const EXPECTED: &'static str = "float";

    fn from_param(value: &ParamValue) -> Option<Self> {
        match value {
            ParamValue::Float64(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromParam for bool {
    const EXPECTED: &'static str = "bool";

    fn from_param(value: &ParamValue) -> Option<Self> {
        match value {
            ParamValue::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromParam for ParamValue {
    const EXPECTED: &'static str = "any";

    fn from_param(value: &ParamValue) -> Option<Self> {
        Some(value.clone())
    }
}

/// Fetch a parameter by name as the requested type.
///
/// # Errors
///
/// - `MissingParameter` if `key` is absent
/// - `ParameterType` if the value is not of the requested kind
pub fn get_param<T: FromParam>(params: &Params, key: &str) -> Result<T, ValidationError> {
    let value = params
        .get(key)
        .ok_or_else(|| ValidationError::MissingParameter(key.to_string()))?;
    T::from_param(value).ok_or_else(|| ValidationError::ParameterType {
        name: key.to_string(),
        expected: T::EXPECTED,
        found: value.kind(),
    })
}
