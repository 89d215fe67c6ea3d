//! validation::checker
//!
//! The three configuration validation passes.
//!
//! Integer literals stand in for floats wherever a float is expected, since
//! YAML writes `5` for a whole number. Each pass widens them first, so the
//! kind checks and validators only ever see matching kinds.
//!
//! # Example
//!
//! ```
//! use modsync::core::module::{ConfigOption, ConfigValue, DataType};
//! use modsync::validation::{ConfigValidator, ParamValue};
//!
//! let validator = ConfigValidator::default();
//!
//! let mut port = ConfigOption::new("port", DataType::Int64, "number");
//! port.type_options.insert("min".into(), ParamValue::Int64(1));
//! port.type_options.insert("max".into(), ParamValue::Int64(65535));
//!
//! validator.validate_base(&port).unwrap();
//! validator.validate_options(&port).unwrap();
//! validator
//!     .validate_value(&port, &ConfigValue::Single(ParamValue::Int64(8080)))
//!     .unwrap();
//! assert!(validator
//!     .validate_value(&port, &ConfigValue::Single(ParamValue::Int64(0)))
//!     .is_err());
//! ```

use std::borrow::Cow;
use std::collections::HashSet;

use super::params::ParamValue;
use super::types::{ConfigTypeDefinition, ConfigTypeRegistry};
use super::validators::ValidatorRegistry;
use super::ValidationError;
use crate::core::module::{ConfigOption, ConfigValue, DataType, ModuleDefinition};

/// Runs the validation passes against the registered validators and types.
#[derive(Debug, Clone, Default)]
pub struct ConfigValidator {
    validators: ValidatorRegistry,
    types: ConfigTypeRegistry,
}

impl ConfigValidator {
    pub fn new(validators: ValidatorRegistry, types: ConfigTypeRegistry) -> Self {
        Self { validators, types }
    }

    pub fn validators(&self) -> &ValidatorRegistry {
        &self.validators
    }

    pub fn types(&self) -> &ConfigTypeRegistry {
        &self.types
    }

    fn type_definition(&self, option: &ConfigOption) -> Result<&ConfigTypeDefinition, ValidationError> {
        self.types
            .get(&option.type_id)
            .ok_or_else(|| ValidationError::UnknownConfigType(option.type_id.clone()))
    }

    /// Pass 1: base type validity of a declared option.
    pub fn validate_base(&self, option: &ConfigOption) -> Result<(), ValidationError> {
        let definition = self.type_definition(option)?;
        let option = widen_option(definition, option);
        if !definition.accepts(option.data_type) {
            return Err(ValidationError::UnsupportedDataType {
                type_id: definition.id.clone(),
                data_type: option.data_type,
            });
        }

        if option.delimiter.is_some() && !option.is_list {
            return Err(ValidationError::InvalidDeclaration(
                "delimiter is only valid for list options".into(),
            ));
        }
        if option.options_ext && option.options.is_empty() {
            return Err(ValidationError::InvalidDeclaration(
                "optionsExt set without options".into(),
            ));
        }

        for value in &option.options {
            check_kind(option.data_type, value)?;
        }

        if let Some(default) = &option.default {
            check_shape(&option, default)?;
            for value in default.values() {
                check_kind(option.data_type, value)?;
                check_membership(&option, value)?;
            }
        }

        Ok(())
    }

    /// Pass 2: validity of the config type's constraint options.
    pub fn validate_options(&self, option: &ConfigOption) -> Result<(), ValidationError> {
        let definition = self.type_definition(option)?;
        let option = widen_option(definition, option);

        for (name, value) in &option.type_options {
            let spec = definition
                .options
                .get(name)
                .ok_or_else(|| ValidationError::UnknownTypeOption {
                    type_id: definition.id.clone(),
                    option: name.clone(),
                })?;
            let expected = spec.kind.resolve(option.data_type);
            if value.kind() != expected {
                return Err(ValidationError::TypeOptionKind {
                    option: name.clone(),
                    expected,
                    found: value.kind(),
                });
            }
        }

        for (name, spec) in &definition.options {
            if spec.required && !option.type_options.contains_key(name) {
                return Err(ValidationError::MissingTypeOption {
                    type_id: definition.id.clone(),
                    option: name.clone(),
                });
            }
        }

        for rule in &definition.option_rules {
            if let Some(params) = rule.resolve(None, &option.type_options) {
                self.validators.validate(&rule.validator, &params)?;
            }
        }

        Ok(())
    }

    /// Pass 3: an assigned value against the option's constraints.
    pub fn validate_value(
        &self,
        option: &ConfigOption,
        value: &ConfigValue,
    ) -> Result<(), ValidationError> {
        let definition = self.type_definition(option)?;
        let option = widen_option(definition, option);
        check_shape(&option, value)?;
        for item in value.values() {
            self.validate_scalar(definition, &option, item)?;
        }
        Ok(())
    }

    fn validate_scalar(
        &self,
        definition: &ConfigTypeDefinition,
        option: &ConfigOption,
        value: &ParamValue,
    ) -> Result<(), ValidationError> {
        let mut value = Cow::Borrowed(value);
        if value.widens_to(option.data_type) {
            value.to_mut().widen_to(option.data_type);
        }
        check_kind(option.data_type, &value)?;
        check_membership(option, &value)?;
        for rule in &definition.value_rules {
            if let Some(params) = rule.resolve(Some(&*value), &option.type_options) {
                self.validators.validate(&rule.validator, &params)?;
            }
        }
        Ok(())
    }

    /// Run all passes over every option of a decoded module.
    ///
    /// Pass 3 is applied to the default value and to each enumerated option,
    /// since both are values a deployment may end up with. Errors carry the
    /// config key.
    pub fn validate_module(&self, module: &ModuleDefinition) -> Result<(), ValidationError> {
        let mut seen = HashSet::new();
        for option in &module.configs {
            if !seen.insert(option.key.as_str()) {
                return Err(ValidationError::DuplicateConfig(option.key.clone()));
            }
            self.validate_option(option)
                .map_err(|e| e.for_config(&option.key))?;
        }
        Ok(())
    }

    fn validate_option(&self, option: &ConfigOption) -> Result<(), ValidationError> {
        let definition = self.type_definition(option)?;
        let option = widen_option(definition, option);
        self.validate_base(&option)?;
        self.validate_options(&option)?;

        for value in &option.options {
            self.validate_scalar(definition, &option, value)?;
        }
        if let Some(default) = &option.default {
            self.validate_value(&option, default)?;
        }
        Ok(())
    }
}

/// `option` with integer literals widened to floats where its data type or
/// a type option's kind is a float. Borrowed when nothing needs widening.
fn widen_option<'a>(
    definition: &ConfigTypeDefinition,
    option: &'a ConfigOption,
) -> Cow<'a, ConfigOption> {
    let data_type = option.data_type;
    let option_type =
        |name: &str| definition.options.get(name).map(|spec| spec.kind.resolve(data_type));

    let values_widen = option
        .options
        .iter()
        .chain(option.default.iter().flat_map(ConfigValue::values))
        .any(|value| value.widens_to(data_type));
    let type_options_widen = option.type_options.iter().any(|(name, value)| {
        option_type(name.as_str()).map_or(false, |kind| value.widens_to(kind))
    });
    if !values_widen && !type_options_widen {
        return Cow::Borrowed(option);
    }

    let mut widened = option.clone();
    for value in &mut widened.options {
        value.widen_to(data_type);
    }
    match &mut widened.default {
        Some(ConfigValue::Single(value)) => value.widen_to(data_type),
        Some(ConfigValue::List(items)) => items.iter_mut().for_each(|v| v.widen_to(data_type)),
        None => {}
    }
    for (name, value) in &mut widened.type_options {
        if let Some(kind) = option_type(name.as_str()) {
            value.widen_to(kind);
        }
    }
    Cow::Owned(widened)
}

fn check_kind(expected: DataType, value: &ParamValue) -> Result<(), ValidationError> {
    if value.kind() == expected {
        Ok(())
    } else {
        Err(ValidationError::ValueType {
            expected,
            found: value.kind(),
        })
    }
}

fn check_shape(option: &ConfigOption, value: &ConfigValue) -> Result<(), ValidationError> {
    if value.is_list() == option.is_list {
        Ok(())
    } else {
        Err(ValidationError::ListShape {
            expected_list: option.is_list,
        })
    }
}

fn check_membership(option: &ConfigOption, value: &ParamValue) -> Result<(), ValidationError> {
    if option.options_closed() && !option.options.contains(value) {
        return Err(ValidationError::NotInOptions(value.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::ErrorKind;
    use std::collections::BTreeMap;

    fn text(key: &str) -> ConfigOption {
        ConfigOption::new(key, DataType::String, "text")
    }

    fn number(key: &str, data_type: DataType) -> ConfigOption {
        ConfigOption::new(key, data_type, "number")
    }

    fn single(v: impl Into<ParamValue>) -> ConfigValue {
        ConfigValue::Single(v.into())
    }

    mod base {
        use super::*;

        #[test]
        fn unknown_config_type() {
            let opt = ConfigOption::new("x", DataType::String, "color");
            assert_eq!(
                ConfigValidator::default().validate_base(&opt).unwrap_err(),
                ValidationError::UnknownConfigType("color".into())
            );
        }

        #[test]
        fn data_type_must_suit_type() {
            let opt = ConfigOption::new("x", DataType::Bool, "text");
            assert!(matches!(
                ConfigValidator::default().validate_base(&opt),
                Err(ValidationError::UnsupportedDataType { .. })
            ));
        }

        #[test]
        fn default_kind_checked() {
            let mut opt = number("n", DataType::Int64);
            opt.default = Some(single(1.5f64));
            assert_eq!(
                ConfigValidator::default().validate_base(&opt).unwrap_err(),
                ValidationError::ValueType {
                    expected: DataType::Int64,
                    found: DataType::Float64,
                }
            );
        }

        #[test]
        fn default_must_be_listed_when_options_closed() {
            let mut opt = text("mode");
            opt.options = vec!["fast".into(), "slow".into()];
            opt.default = Some(single("medium"));
            assert!(matches!(
                ConfigValidator::default().validate_base(&opt),
                Err(ValidationError::NotInOptions(_))
            ));

            opt.options_ext = true;
            assert!(ConfigValidator::default().validate_base(&opt).is_ok());
        }

        #[test]
        fn delimiter_requires_list() {
            let mut opt = text("hosts");
            opt.delimiter = Some(",".into());
            assert!(matches!(
                ConfigValidator::default().validate_base(&opt),
                Err(ValidationError::InvalidDeclaration(_))
            ));
            opt.is_list = true;
            assert!(ConfigValidator::default().validate_base(&opt).is_ok());
        }

        #[test]
        fn list_default_shape() {
            let mut opt = text("hosts");
            opt.is_list = true;
            opt.default = Some(single("a"));
            assert_eq!(
                ConfigValidator::default().validate_base(&opt).unwrap_err(),
                ValidationError::ListShape { expected_list: true }
            );
        }
    }

    mod options {
        use super::*;

        #[test]
        fn unknown_type_option() {
            let mut opt = text("name");
            opt.type_options.insert("min".into(), 1i64.into());
            assert!(matches!(
                ConfigValidator::default().validate_options(&opt),
                Err(ValidationError::UnknownTypeOption { .. })
            ));
        }

        #[test]
        fn number_bounds_follow_data_type() {
            let mut opt = number("count", DataType::Int64);
            opt.type_options.insert("min".into(), 0.5f64.into());
            assert_eq!(
                ConfigValidator::default().validate_options(&opt).unwrap_err(),
                ValidationError::TypeOptionKind {
                    option: "min".into(),
                    expected: DataType::Int64,
                    found: DataType::Float64,
                }
            );
        }

        #[test]
        fn integer_bounds_widen_for_float_options() {
            let mut opt = number("ratio", DataType::Float64);
            opt.type_options.insert("min".into(), 1i64.into());
            opt.type_options.insert("max".into(), 2.5f64.into());
            assert!(ConfigValidator::default().validate_options(&opt).is_ok());

            opt.type_options.insert("max".into(), 0i64.into());
            assert!(matches!(
                ConfigValidator::default().validate_options(&opt),
                Err(ValidationError::ComparisonFailed { .. })
            ));
        }

        #[test]
        fn invalid_regex_option_is_rejected_early() {
            let mut opt = text("name");
            opt.type_options.insert("regex".into(), "[a-".into());
            let err = ConfigValidator::default().validate_options(&opt).unwrap_err();
            assert!(matches!(err, ValidationError::InvalidPattern { .. }));
        }

        #[test]
        fn min_len_not_above_max_len() {
            let mut opt = text("name");
            opt.type_options.insert("min_len".into(), 5i64.into());
            opt.type_options.insert("max_len".into(), 2i64.into());
            assert!(matches!(
                ConfigValidator::default().validate_options(&opt),
                Err(ValidationError::ComparisonFailed { .. })
            ));
        }

        #[test]
        fn negative_min_len() {
            let mut opt = text("name");
            opt.type_options.insert("min_len".into(), (-1i64).into());
            assert!(ConfigValidator::default().validate_options(&opt).is_err());
        }

        #[test]
        fn required_type_option() {
            let mut types = ConfigTypeRegistry::default();
            let mut def = ConfigTypeDefinition::text();
            def.id = "slug".into();
            if let Some(spec) = def.options.get_mut("regex") {
                spec.required = true;
            }
            types.register(def);
            let validator = ConfigValidator::new(ValidatorRegistry::default(), types);

            let opt = ConfigOption::new("s", DataType::String, "slug");
            assert!(matches!(
                validator.validate_options(&opt),
                Err(ValidationError::MissingTypeOption { .. })
            ));
        }
    }

    mod value {
        use super::*;

        #[test]
        fn text_constraints() {
            let mut opt = text("name");
            opt.type_options.insert("regex".into(), "^[a-z]+$".into());
            opt.type_options.insert("max_len".into(), 4i64.into());
            let v = ConfigValidator::default();

            assert!(v.validate_value(&opt, &single("abc")).is_ok());
            assert!(matches!(
                v.validate_value(&opt, &single("ABC")),
                Err(ValidationError::PatternMismatch { .. })
            ));
            assert!(matches!(
                v.validate_value(&opt, &single("abcdef")),
                Err(ValidationError::ComparisonFailed { .. })
            ));
        }

        #[test]
        fn number_exclusive_bounds() {
            let mut opt = number("ratio", DataType::Float64);
            opt.type_options.insert("min_excl".into(), 0.0f64.into());
            opt.type_options.insert("max".into(), 1.0f64.into());
            let v = ConfigValidator::default();

            assert!(v.validate_value(&opt, &single(1.0f64)).is_ok());
            assert!(v.validate_value(&opt, &single(0.0f64)).is_err());
        }

        #[test]
        fn integer_value_widens_for_float_option() {
            let mut opt = number("ratio", DataType::Float64);
            opt.type_options.insert("min".into(), 1i64.into());
            let v = ConfigValidator::default();

            assert!(v.validate_value(&opt, &single(5i64)).is_ok());
            assert!(matches!(
                v.validate_value(&opt, &single(0i64)),
                Err(ValidationError::ComparisonFailed { .. })
            ));
        }

        #[test]
        fn float_value_not_narrowed_for_int_option() {
            let opt = number("n", DataType::Int64);
            assert_eq!(
                ConfigValidator::default()
                    .validate_value(&opt, &single(5.0f64))
                    .unwrap_err(),
                ValidationError::ValueType {
                    expected: DataType::Int64,
                    found: DataType::Float64,
                }
            );
        }

        #[test]
        fn kind_mismatch_on_value() {
            let opt = number("n", DataType::Int64);
            let err = ConfigValidator::default()
                .validate_value(&opt, &single("five"))
                .unwrap_err();
            assert!(matches!(err, ValidationError::ValueType { .. }));
        }

        #[test]
        fn list_values_checked_individually() {
            let mut opt = text("hosts");
            opt.is_list = true;
            opt.type_options.insert("min_len".into(), 1i64.into());
            let list = ConfigValue::List(vec!["a".into(), "".into()]);
            assert!(ConfigValidator::default().validate_value(&opt, &list).is_err());
        }

        #[test]
        fn bool_has_no_constraints() {
            let opt = ConfigOption::new("debug", DataType::Bool, "bool");
            assert!(ConfigValidator::default()
                .validate_value(&opt, &single(true))
                .is_ok());
        }
    }

    mod module {
        use super::*;

        fn module(configs: Vec<ConfigOption>) -> ModuleDefinition {
            ModuleDefinition {
                id: "acme/m".into(),
                name: "m".into(),
                description: String::new(),
                version: "1".into(),
                license: None,
                author: None,
                tags: vec![],
                architectures: vec![],
                dependencies: BTreeMap::new(),
                configs,
            }
        }

        #[test]
        fn errors_carry_config_key() {
            let mut port = number("port", DataType::Int64);
            port.type_options.insert("max".into(), 10i64.into());
            port.default = Some(single(20i64));

            let err = ConfigValidator::default()
                .validate_module(&module(vec![port]))
                .unwrap_err();
            match &err {
                ValidationError::Config { key, .. } => assert_eq!(key, "port"),
                other => panic!("unexpected {:?}", other),
            }
            assert_eq!(err.kind(), ErrorKind::Validation);
        }

        #[test]
        fn enumerated_options_are_validated() {
            let mut level = number("level", DataType::Int64);
            level.type_options.insert("min".into(), 1i64.into());
            level.options = vec![1i64.into(), 0i64.into()];
            assert!(ConfigValidator::default()
                .validate_module(&module(vec![level]))
                .is_err());
        }

        #[test]
        fn float_option_written_with_integer_literals() {
            let mut ratio = number("ratio", DataType::Float64);
            ratio.type_options.insert("min".into(), 1i64.into());
            ratio.options = vec![1i64.into(), 2.5f64.into()];
            ratio.default = Some(single(1i64));
            assert!(ConfigValidator::default()
                .validate_module(&module(vec![ratio]))
                .is_ok());
        }

        #[test]
        fn duplicate_keys_rejected() {
            let err = ConfigValidator::default()
                .validate_module(&module(vec![text("a"), text("a")]))
                .unwrap_err();
            assert_eq!(err, ValidationError::DuplicateConfig("a".into()));
        }

        #[test]
        fn valid_module_passes() {
            let mut name = text("name");
            name.type_options.insert("min_len".into(), 1i64.into());
            name.default = Some(single("edge"));
            let mut debug = ConfigOption::new("debug", DataType::Bool, "bool");
            debug.default = Some(single(false));
            assert!(ConfigValidator::default()
                .validate_module(&module(vec![name, debug]))
                .is_ok());
        }
    }
}
