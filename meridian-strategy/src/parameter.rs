//! Strategy parameter schema, per spec.md §4.2 "parameter_schema" and §9's
//! redesign note: "Dynamic parameter mapping ... becomes a tagged union per
//! strategy with a schema-typed constructor, or a generic `mapping
//! name→scalar variant` validated once at activation." This module takes
//! the latter route: a generic scalar-variant map, validated once against
//! a declared schema.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub enum ParamType {
    Integer,
    Float,
    Bool,
    String,
}

/// A bounded scalar parameter value. Numeric ranges use `f64` for
/// simplicity of `min`/`max` comparison across integer and float params.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum ParamValue {
    Integer(i64),
    Float(f64),
    Bool(bool),
    String(String),
}

impl ParamValue {
    fn type_of(&self) -> ParamType {
        match self {
            ParamValue::Integer(_) => ParamType::Integer,
            ParamValue::Float(_) => ParamType::Float,
            ParamValue::Bool(_) => ParamType::Bool,
            ParamValue::String(_) => ParamType::String,
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Integer(i) => Some(*i as f64),
            ParamValue::Float(f) => Some(*f),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ParameterSpec {
    pub ty: ParamType,
    pub default: Option<ParamValue>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl ParameterSpec {
    pub fn new(ty: ParamType) -> Self {
        Self {
            ty,
            default: None,
            min: None,
            max: None,
        }
    }

    pub fn with_default(mut self, default: ParamValue) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParameterError {
    #[error("unknown parameter {0:?}")]
    Unknown(String),
    #[error("parameter {name:?} expected type {expected:?}, got {actual:?}")]
    TypeMismatch {
        name: String,
        expected: ParamType,
        actual: ParamType,
    },
    #[error("parameter {name:?} value {value} out of range [{min}, {max}]")]
    OutOfRange {
        name: String,
        value: f64,
        min: f64,
        max: f64,
    },
}

/// Validates `values` against `schema`: every key must be declared, and its
/// type and (if declared) numeric range must match, per spec.md §4.2
/// "validate parameters against the schema (type + range)".
pub fn validate(
    schema: &HashMap<String, ParameterSpec>,
    values: &HashMap<String, ParamValue>,
) -> Result<(), ParameterError> {
    for (name, value) in values {
        let spec = schema
            .get(name)
            .ok_or_else(|| ParameterError::Unknown(name.clone()))?;

        if value.type_of() != spec.ty {
            return Err(ParameterError::TypeMismatch {
                name: name.clone(),
                expected: spec.ty,
                actual: value.type_of(),
            });
        }

        if let (Some(min), Some(max)) = (spec.min, spec.max) {
            if let Some(numeric) = value.as_f64() {
                if numeric < min || numeric > max {
                    return Err(ParameterError::OutOfRange {
                        name: name.clone(),
                        value: numeric,
                        min,
                        max,
                    });
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_value_outside_declared_range() {
        let mut schema = HashMap::new();
        schema.insert(
            "ma_period".to_string(),
            ParameterSpec::new(ParamType::Integer).with_range(2.0, 20.0),
        );
        let mut values = HashMap::new();
        values.insert("ma_period".to_string(), ParamValue::Integer(50));

        assert!(matches!(
            validate(&schema, &values),
            Err(ParameterError::OutOfRange { .. })
        ));
    }

    #[test]
    fn rejects_unknown_parameter() {
        let schema = HashMap::new();
        let mut values = HashMap::new();
        values.insert("bogus".to_string(), ParamValue::Bool(true));
        assert!(matches!(validate(&schema, &values), Err(ParameterError::Unknown(_))));
    }
}
