//! Parameter values and parameter types recorded alongside the query trace.
//!
//! These mirror what the engine needs to re-bind a prepared statement; they
//! are deliberately tiny and carry no execution semantics.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Declared type of one statement parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub enum ParamType {
    Boolean,
    Integer,
    BigInt,
    Decimal,
    Varchar,
    Date,
    /// Matches any non-empty argument list during function lookup.
    Variadic,
}

impl FromStr for ParamType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "boolean" | "bool" => Ok(ParamType::Boolean),
            "integer" | "int" | "int4" => Ok(ParamType::Integer),
            "bigint" | "int8" => Ok(ParamType::BigInt),
            "decimal" | "real" | "float" | "double" => Ok(ParamType::Decimal),
            "varchar" | "text" | "string" => Ok(ParamType::Varchar),
            "date" => Ok(ParamType::Date),
            "variadic" => Ok(ParamType::Variadic),
            other => Err(Error::TypeMismatch(format!("unknown parameter type '{other}'"))),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ParamType::Boolean => "boolean",
            ParamType::Integer => "integer",
            ParamType::BigInt => "bigint",
            ParamType::Decimal => "decimal",
            ParamType::Varchar => "varchar",
            ParamType::Date => "date",
            ParamType::Variadic => "variadic",
        };
        f.write_str(s)
    }
}

/// A bound parameter value. Serialized untagged so trace files can carry plain
/// JSON scalars (`[1, "abc", null, true]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Null,
    Bool(bool),
    Int(i64),
    Decimal(f64),
    Str(String),
}

impl ParamValue {
    /// Whether this value can be bound to a parameter of type `ty`.
    pub fn fits(&self, ty: ParamType) -> bool {
        match (self, ty) {
            (ParamValue::Null, _) => true,
            (ParamValue::Bool(_), ParamType::Boolean) => true,
            (ParamValue::Int(_), ParamType::Integer | ParamType::BigInt | ParamType::Decimal) => {
                true
            }
            (ParamValue::Decimal(_), ParamType::Decimal) => true,
            (ParamValue::Str(_), ParamType::Varchar | ParamType::Date) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn param_values_read_plain_json() {
        let vals: Vec<ParamValue> = serde_json::from_str(r#"[1, 2.5, "x", null, true]"#).unwrap();
        assert_eq!(
            vals,
            vec![
                ParamValue::Int(1),
                ParamValue::Decimal(2.5),
                ParamValue::Str("x".into()),
                ParamValue::Null,
                ParamValue::Bool(true),
            ]
        );
    }

    #[test]
    fn param_type_parsing() {
        assert_eq!("INT".parse::<ParamType>().unwrap(), ParamType::Integer);
        assert_eq!("varchar".parse::<ParamType>().unwrap(), ParamType::Varchar);
        assert!("blob".parse::<ParamType>().is_err());
    }

    #[test]
    fn fits_checks_binding_compatibility() {
        assert!(ParamValue::Int(3).fits(ParamType::BigInt));
        assert!(ParamValue::Null.fits(ParamType::Date));
        assert!(!ParamValue::Str("a".into()).fits(ParamType::Integer));
    }
}
