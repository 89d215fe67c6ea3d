//! validation::validators
//!
//! Named validators resolved by capability.
//!
//! A validator is a pure function over a parameter map. The registry maps a
//! capability name (`regex`, `text_len_compare`, `number_compare`) to the
//! implementation, so config types refer to validators by name only and new
//! validators can be registered without touching the callers.

use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;

use super::params::{get_param, ParamValue, Params};
use super::ValidationError;

/// Capability name of the regular expression validator.
pub const REGEX: &str = "regex";
/// Capability name of the text length validator.
pub const TEXT_LEN_COMPARE: &str = "text_len_compare";
/// Capability name of the numeric comparison validator.
pub const NUMBER_COMPARE: &str = "number_compare";
/// Capability name of the pattern syntax check.
pub const REGEX_SYNTAX: &str = "regex_syntax";

/// A named, pure check over a parameter map.
pub trait Validator: Send + Sync {
    fn validate(&self, params: &Params) -> Result<(), ValidationError>;
}

impl<F> Validator for F
where
    F: Fn(&Params) -> Result<(), ValidationError> + Send + Sync,
{
    fn validate(&self, params: &Params) -> Result<(), ValidationError> {
        self(params)
    }
}

/// Comparison operators shared by the compare validators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Less,
    Greater,
    LessEq,
    GreaterEq,
    Equal,
}

impl Operator {
    /// Parse an operator symbol.
    ///
    /// # Errors
    ///
    /// `InvalidOperator` for anything but `<`, `>`, `<=`, `>=`, `=`.
    pub fn parse(symbol: &str) -> Result<Self, ValidationError> {
        match symbol {
            "<" => Ok(Operator::Less),
            ">" => Ok(Operator::Greater),
            "<=" => Ok(Operator::LessEq),
            ">=" => Ok(Operator::GreaterEq),
            "=" => Ok(Operator::Equal),
            other => Err(ValidationError::InvalidOperator(other.to_string())),
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Less => "<",
            Operator::Greater => ">",
            Operator::LessEq => "<=",
            Operator::GreaterEq => ">=",
            Operator::Equal => "=",
        }
    }

    fn holds<T: PartialOrd>(&self, a: T, b: T) -> bool {
        match self {
            Operator::Less => a < b,
            Operator::Greater => a > b,
            Operator::LessEq => a <= b,
            Operator::GreaterEq => a >= b,
            Operator::Equal => a == b,
        }
    }
}

/// `string` must match `pattern`.
pub fn regex_validator(params: &Params) -> Result<(), ValidationError> {
    let string: String = get_param(params, "string")?;
    let pattern: String = get_param(params, "pattern")?;
    let re = Regex::new(&pattern).map_err(|e| ValidationError::InvalidPattern {
        pattern: pattern.clone(),
        reason: e.to_string(),
    })?;
    if re.is_match(&string) {
        Ok(())
    } else {
        Err(ValidationError::PatternMismatch { string, pattern })
    }
}

/// `pattern` must compile as a regular expression.
pub fn regex_syntax_validator(params: &Params) -> Result<(), ValidationError> {
    let pattern: String = get_param(params, "pattern")?;
    Regex::new(&pattern)
        .map(|_| ())
        .map_err(|e| ValidationError::InvalidPattern {
            pattern,
            reason: e.to_string(),
        })
}

/// Length of `string` in code points compared against `length`.
pub fn text_len_compare_validator(params: &Params) -> Result<(), ValidationError> {
    let string: String = get_param(params, "string")?;
    let length: i64 = get_param(params, "length")?;
    let operator: String = get_param(params, "operator")?;
    let op = Operator::parse(&operator)?;

    let actual = string.chars().count() as i64;
    if op.holds(actual, length) {
        Ok(())
    } else {
        Err(ValidationError::ComparisonFailed {
            actual: format!("length {}", actual),
            operator: op.symbol(),
            expected: length.to_string(),
        })
    }
}

/// Numeric `a` compared against bound `b`; both must share a numeric kind.
pub fn number_compare_validator(params: &Params) -> Result<(), ValidationError> {
    let a: ParamValue = get_param(params, "a")?;
    let b: ParamValue = get_param(params, "b")?;
    let operator: String = get_param(params, "operator")?;
    let op = Operator::parse(&operator)?;

    let holds = match (&a, &b) {
        (ParamValue::Int64(x), ParamValue::Int64(y)) => op.holds(x, y),
        (ParamValue::Float64(x), ParamValue::Float64(y)) => op.holds(x, y),
        _ => {
            return Err(ValidationError::TypeMismatch {
                left: a.kind(),
                right: b.kind(),
            })
        }
    };

    if holds {
        Ok(())
    } else {
        Err(ValidationError::ComparisonFailed {
            actual: a.to_string(),
            operator: op.symbol(),
            expected: b.to_string(),
        })
    }
}

/// Capability-keyed table of validators.
#[derive(Clone)]
pub struct ValidatorRegistry {
    validators: HashMap<String, Arc<dyn Validator>>,
}

impl std::fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.validators.keys().collect();
        names.sort();
        f.debug_struct("ValidatorRegistry")
            .field("validators", &names)
            .finish()
    }
}

impl Default for ValidatorRegistry {
    /// Registry with the built-in validators.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(REGEX, regex_validator);
        registry.register(REGEX_SYNTAX, regex_syntax_validator);
        registry.register(TEXT_LEN_COMPARE, text_len_compare_validator);
        registry.register(NUMBER_COMPARE, number_compare_validator);
        registry
    }
}

impl ValidatorRegistry {
    /// Registry without any validators.
    pub fn empty() -> Self {
        Self {
            validators: HashMap::new(),
        }
    }

    /// Register (or replace) a validator under `name`.
    pub fn register(&mut self, name: impl Into<String>, validator: impl Validator + 'static) {
        self.validators.insert(name.into(), Arc::new(validator));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.validators.contains_key(name)
    }

    /// Resolve `name` and run it against `params`.
    pub fn validate(&self, name: &str, params: &Params) -> Result<(), ValidationError> {
        let validator = self
            .validators
            .get(name)
            .ok_or_else(|| ValidationError::UnknownValidator(name.to_string()))?;
        validator.validate(params)
    }
}
