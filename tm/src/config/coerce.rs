//! Lenient conversions from untyped TOML values into primitives.
//!
//! A missing value always yields the zero value of the target type.

use error_stack::{bail, Report, Result, ResultExt};
use thiserror::Error;
use toml::Value;

#[derive(Error, Debug, PartialEq)]
pub enum Error {
    #[error("expected {expected}, found {found}")]
    UnexpectedType {
        expected: &'static str,
        found: &'static str,
    },
    #[error("stringified boolean value invalid {0}")]
    InvalidBool(String),
    #[error("negative values not accepted {0}")]
    Negative(String),
    #[error("value out of bounds {0}")]
    OutOfBounds(String),
    #[error("invalid number {0}")]
    InvalidNumber(String),
}

fn unexpected(expected: &'static str, value: &Value) -> Report<Error> {
    Report::new(Error::UnexpectedType {
        expected,
        found: value.type_str(),
    })
}

pub fn extract_bool(value: Option<&Value>) -> Result<bool, Error> {
    match value {
        None => Ok(false),
        Some(Value::Boolean(b)) => Ok(*b),
        Some(Value::String(s)) => match s.trim().to_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => bail!(Error::InvalidBool(s.clone())),
        },
        Some(other) => Err(unexpected("boolean", other)),
    }
}

pub fn extract_uint(value: Option<&Value>) -> Result<u64, Error> {
    match value {
        None => Ok(0),
        Some(Value::Integer(i)) => {
            u64::try_from(*i).change_context_lazy(|| Error::Negative(i.to_string()))
        }
        Some(Value::Float(f)) => float_to_uint(*f),
        Some(Value::String(s)) => {
            let s = s.trim();
            if s.starts_with('-') {
                bail!(Error::Negative(s.to_string()));
            }
            s.parse::<u64>()
                .change_context_lazy(|| Error::InvalidNumber(s.to_string()))
        }
        Some(other) => Err(unexpected("unsigned integer", other)),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn float_to_uint(f: f64) -> Result<u64, Error> {
    if f.is_nan() {
        bail!(Error::InvalidNumber(f.to_string()));
    }
    if f < 0.0 {
        bail!(Error::Negative(f.to_string()));
    }
    if f >= u64::MAX as f64 {
        bail!(Error::OutOfBounds(f.to_string()));
    }

    // truncation towards zero is intended
    Ok(f.trunc() as u64)
}

pub fn extract_string(value: Option<&Value>) -> Result<String, Error> {
    match value {
        None => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(unexpected("string", other)),
    }
}

pub fn extract_string_list(value: Option<&Value>) -> Result<Vec<String>, Error> {
    match value {
        None => Ok(vec![]),
        Some(Value::String(s)) => Ok(vec![s.trim().to_string()]),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.trim().to_string()),
                other => Err(unexpected("string", other)),
            })
            .collect(),
        Some(other) => Err(unexpected("string or list of strings", other)),
    }
}
