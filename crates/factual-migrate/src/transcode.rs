//! Legacy pickled values to JSON.
//!
//! The application stored thumbnails and related-post lists as Python
//! pickles in `BYTEA` columns. Only plain data ever went in: lists, tuples,
//! dicts, strings, numbers, booleans and `None`. Those map onto JSON the way
//! Python's `json.dumps` maps them; anything else is rejected.

use serde_json::{Map, Number, Value as Json};
use serde_pickle::{DeOptions, HashableValue, Value};

use crate::error::TranscodeError;

/// Unpickle `bytes` and convert the result to JSON.
///
/// Python 2 byte strings are decoded as UTF-8, so pickles written by either
/// interpreter come out as JSON strings.
pub fn decode_legacy(bytes: &[u8]) -> Result<Json, TranscodeError> {
    let value = serde_pickle::value_from_slice(bytes, DeOptions::new().decode_strings())?;
    to_json(value)
}

fn to_json(value: Value) -> Result<Json, TranscodeError> {
    Ok(match value {
        Value::None => Json::Null,
        Value::Bool(b) => Json::Bool(b),
        Value::I64(i) => Json::Number(i.into()),
        Value::Int(big) => Json::Number(big_number(big.to_string())?),
        Value::F64(f) => Json::Number(Number::from_f64(f).ok_or(TranscodeError::NonFiniteFloat)?),
        Value::String(s) => Json::String(s),
        Value::List(items) | Value::Tuple(items) => Json::Array(
            items
                .into_iter()
                .map(to_json)
                .collect::<Result<_, _>>()?,
        ),
        Value::Dict(entries) => {
            let mut map = Map::with_capacity(entries.len());
            for (key, value) in entries {
                map.insert(key_to_string(key)?, to_json(value)?);
            }
            Json::Object(map)
        }
        Value::Bytes(_) => return Err(TranscodeError::Unsupported { kind: "bytes" }),
        Value::Set(_) => return Err(TranscodeError::Unsupported { kind: "set" }),
        Value::FrozenSet(_) => return Err(TranscodeError::Unsupported { kind: "frozenset" }),
    })
}

/// Integers past `i64` keep every digit; JSONB stores them as `numeric`.
fn big_number(digits: String) -> Result<Number, TranscodeError> {
    serde_json::from_str::<Number>(&digits).map_err(|_| TranscodeError::IntegerOutOfRange { value: digits })
}

/// `json.dumps` coerces scalar keys to strings; everything else is an error.
fn key_to_string(key: HashableValue) -> Result<String, TranscodeError> {
    match key {
        HashableValue::String(s) => Ok(s),
        HashableValue::I64(i) => Ok(i.to_string()),
        HashableValue::Int(big) => Ok(big.to_string()),
        HashableValue::Bool(true) => Ok("true".to_owned()),
        HashableValue::Bool(false) => Ok("false".to_owned()),
        HashableValue::None => Ok("null".to_owned()),
        HashableValue::F64(f) if f.is_finite() => Ok(float_key(f)),
        HashableValue::F64(_) => Err(TranscodeError::NonFiniteFloat),
        HashableValue::Bytes(_) => Err(TranscodeError::UnsupportedKey { kind: "bytes" }),
        HashableValue::Tuple(_) => Err(TranscodeError::UnsupportedKey { kind: "tuple" }),
        HashableValue::FrozenSet(_) => Err(TranscodeError::UnsupportedKey { kind: "frozenset" }),
    }
}

/// Python's `repr(float)`: shortest round-trip digits, scientific notation
/// outside `1e-4 <= |f| < 1e16` with a signed, two-digit exponent.
fn float_key(f: f64) -> String {
    let scientific = format!("{f:e}");
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return format!("{f:?}");
    };
    match exponent.parse::<i32>() {
        Ok(exponent) if !(-4..16).contains(&exponent) => {
            let sign = if exponent < 0 { '-' } else { '+' };
            format!("{mantissa}e{sign}{:02}", exponent.unsigned_abs())
        }
        _ => format!("{f:?}"),
    }
}

#[cfg(test)]
mod tests;
