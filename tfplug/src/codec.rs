//! Wire encoding of dynamic values
//!
//! The host sends values as msgpack (or, for stored state, JSON). Neither
//! format carries enough type information on its own, so decoding is driven
//! by the schema's `AttributeType`. Unknown values travel as msgpack
//! extension type 0.

use crate::attribute_type::AttributeType;
use crate::error::{Result, TfplugError};
use crate::types::{AttributePath, Value};
use rmpv::Value as Msgpack;
use std::collections::BTreeMap;

const UNKNOWN_EXT_TYPE: i8 = 0;

/// Decode a msgpack payload; an empty payload is null
pub fn decode_msgpack(data: &[u8], ty: &AttributeType) -> Result<Value> {
    if data.is_empty() {
        return Ok(Value::Null);
    }
    let mut reader = data;
    let raw = rmpv::decode::read_value(&mut reader)
        .map_err(|e| TfplugError::DecodingError(format!("msgpack decoding failed: {}", e)))?;
    from_msgpack(&raw, ty, &AttributePath::root())
}

pub fn encode_msgpack(value: &Value, ty: &AttributeType) -> Result<Vec<u8>> {
    let raw = to_msgpack(value, ty, &AttributePath::root())?;
    let mut buf = Vec::new();
    rmpv::encode::write_value(&mut buf, &raw)
        .map_err(|e| TfplugError::EncodingError(format!("msgpack encoding failed: {}", e)))?;
    Ok(buf)
}

/// Decode a JSON payload leniently: unknown object keys are dropped and
/// missing ones read as null
pub fn decode_json(data: &[u8], ty: &AttributeType) -> Result<Value> {
    if data.is_empty() {
        return Ok(Value::Null);
    }
    let raw: serde_json::Value = serde_json::from_slice(data)
        .map_err(|e| TfplugError::DecodingError(format!("json decoding failed: {}", e)))?;
    from_json(&raw, ty, &AttributePath::root())
}

/// Decode stored JSON state without a schema; used before state upgrades
pub fn decode_json_untyped(data: &[u8]) -> Result<Value> {
    if data.is_empty() {
        return Ok(Value::Null);
    }
    let raw: serde_json::Value = serde_json::from_slice(data)
        .map_err(|e| TfplugError::DecodingError(format!("json decoding failed: {}", e)))?;
    Ok(untyped_from_json(&raw))
}

/// Reshape a loosely typed tree so it matches `ty` exactly
pub fn conform(value: &Value, ty: &AttributeType) -> Result<Value> {
    from_json(&to_json(value), ty, &AttributePath::root())
}

/// Plain JSON rendition of a value; unknown renders as null
pub fn to_json(value: &Value) -> serde_json::Value {
    use serde_json::Value as Json;

    match value {
        Value::Null | Value::Unknown => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Int(i) => Json::from(*i),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(Json::Number)
            .unwrap_or(Json::Null),
        Value::String(s) => Json::String(s.clone()),
        Value::List(items) | Value::Set(items) => Json::Array(items.iter().map(to_json).collect()),
        Value::Map(fields) | Value::Object(fields) => Json::Object(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), to_json(v)))
                .collect(),
        ),
    }
}

fn untyped_from_json(raw: &serde_json::Value) -> Value {
    use serde_json::Value as Json;

    match raw {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Float(n.as_f64().unwrap_or_default()),
        },
        Json::String(s) => Value::String(s.clone()),
        Json::Array(items) => Value::List(items.iter().map(untyped_from_json).collect()),
        Json::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), untyped_from_json(v)))
                .collect(),
        ),
    }
}

fn mismatch(
    path: &AttributePath,
    expected: &AttributeType,
    actual: impl Into<String>,
) -> TfplugError {
    TfplugError::TypeMismatch {
        path: path.to_string(),
        expected: expected.name().to_string(),
        actual: actual.into(),
    }
}

fn from_msgpack(raw: &Msgpack, ty: &AttributeType, path: &AttributePath) -> Result<Value> {
    match raw {
        Msgpack::Nil => return Ok(Value::Null),
        Msgpack::Ext(UNKNOWN_EXT_TYPE, _) => return Ok(Value::Unknown),
        _ => {}
    }

    match ty {
        AttributeType::String => match raw {
            Msgpack::String(s) => s
                .as_str()
                .map(|s| Value::String(s.to_string()))
                .ok_or_else(|| mismatch(path, ty, "invalid utf-8")),
            other => Err(mismatch(path, ty, format!("{}", other))),
        },
        AttributeType::Bool => raw
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| mismatch(path, ty, format!("{}", raw))),
        AttributeType::Int => match raw {
            Msgpack::Integer(i) => i
                .as_i64()
                .map(Value::Int)
                .ok_or_else(|| mismatch(path, ty, "integer out of range")),
            Msgpack::F32(_) | Msgpack::F64(_) => {
                let f = raw.as_f64().unwrap_or_default();
                if f.fract() == 0.0 {
                    Ok(Value::Int(f as i64))
                } else {
                    Err(mismatch(path, ty, f.to_string()))
                }
            }
            // large numbers are sent as their decimal string
            Msgpack::String(s) => s
                .as_str()
                .and_then(|s| s.parse::<i64>().ok())
                .map(Value::Int)
                .ok_or_else(|| mismatch(path, ty, "non-integer number")),
            other => Err(mismatch(path, ty, format!("{}", other))),
        },
        AttributeType::Float => match raw {
            Msgpack::Integer(i) => i
                .as_f64()
                .map(Value::Float)
                .ok_or_else(|| mismatch(path, ty, "number out of range")),
            Msgpack::F32(_) | Msgpack::F64(_) => Ok(Value::Float(raw.as_f64().unwrap_or_default())),
            Msgpack::String(s) => s
                .as_str()
                .and_then(|s| s.parse::<f64>().ok())
                .map(Value::Float)
                .ok_or_else(|| mismatch(path, ty, "invalid number")),
            other => Err(mismatch(path, ty, format!("{}", other))),
        },
        AttributeType::List(elem) | AttributeType::Set(elem) => {
            let items = raw
                .as_array()
                .ok_or_else(|| mismatch(path, ty, format!("{}", raw)))?;
            let values = items
                .iter()
                .enumerate()
                .map(|(idx, item)| from_msgpack(item, elem, &path.clone().index(idx as i64)))
                .collect::<Result<Vec<_>>>()?;
            Ok(match ty {
                AttributeType::Set(_) => Value::Set(values),
                _ => Value::List(values),
            })
        }
        AttributeType::Map(elem) => {
            let entries = raw
                .as_map()
                .ok_or_else(|| mismatch(path, ty, format!("{}", raw)))?;
            let mut out = BTreeMap::new();
            for (key, item) in entries {
                let key = key
                    .as_str()
                    .ok_or_else(|| mismatch(path, ty, "non-string map key"))?;
                out.insert(
                    key.to_string(),
                    from_msgpack(item, elem, &path.clone().key(key))?,
                );
            }
            Ok(Value::Map(out))
        }
        AttributeType::Object(fields) => {
            let entries = raw
                .as_map()
                .ok_or_else(|| mismatch(path, ty, format!("{}", raw)))?;
            let mut out: BTreeMap<String, Value> =
                fields.keys().map(|k| (k.clone(), Value::Null)).collect();
            for (key, item) in entries {
                let Some(key) = key.as_str() else {
                    continue;
                };
                if let Some(field_ty) = fields.get(key) {
                    out.insert(
                        key.to_string(),
                        from_msgpack(item, field_ty, &path.clone().attribute(key))?,
                    );
                }
            }
            Ok(Value::Object(out))
        }
    }
}

fn to_msgpack(value: &Value, ty: &AttributeType, path: &AttributePath) -> Result<Msgpack> {
    match (value, ty) {
        (Value::Null, _) => Ok(Msgpack::Nil),
        (Value::Unknown, _) => Ok(Msgpack::Ext(UNKNOWN_EXT_TYPE, vec![0])),
        (Value::String(s), AttributeType::String) => Ok(Msgpack::from(s.as_str())),
        (Value::Bool(b), AttributeType::Bool) => Ok(Msgpack::Boolean(*b)),
        (Value::Int(i), AttributeType::Int | AttributeType::Float) => Ok(Msgpack::from(*i)),
        (Value::Float(f), AttributeType::Int | AttributeType::Float) => {
            if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                Ok(Msgpack::from(*f as i64))
            } else {
                Ok(Msgpack::F64(*f))
            }
        }
        (
            Value::List(items) | Value::Set(items),
            AttributeType::List(elem) | AttributeType::Set(elem),
        ) => {
            let encoded = items
                .iter()
                .enumerate()
                .map(|(idx, item)| to_msgpack(item, elem, &path.clone().index(idx as i64)))
                .collect::<Result<Vec<_>>>()?;
            Ok(Msgpack::Array(encoded))
        }
        (Value::Map(entries) | Value::Object(entries), AttributeType::Map(elem)) => {
            let encoded = entries
                .iter()
                .map(|(k, v)| {
                    Ok((
                        Msgpack::from(k.as_str()),
                        to_msgpack(v, elem, &path.clone().key(k))?,
                    ))
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(Msgpack::Map(encoded))
        }
        (Value::Object(entries) | Value::Map(entries), AttributeType::Object(fields)) => {
            // every attribute of the type is written, absent ones as nil
            let encoded = fields
                .iter()
                .map(|(name, field_ty)| {
                    let field = entries.get(name).unwrap_or(&Value::Null);
                    Ok((
                        Msgpack::from(name.as_str()),
                        to_msgpack(field, field_ty, &path.clone().attribute(name))?,
                    ))
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(Msgpack::Map(encoded))
        }
        (other, _) => Err(TfplugError::TypeMismatch {
            path: path.to_string(),
            expected: ty.name().to_string(),
            actual: other.type_name().to_string(),
        }),
    }
}

fn from_json(raw: &serde_json::Value, ty: &AttributeType, path: &AttributePath) -> Result<Value> {
    use serde_json::Value as Json;

    if raw.is_null() {
        return Ok(Value::Null);
    }

    match ty {
        AttributeType::String => match raw {
            Json::String(s) => Ok(Value::String(s.clone())),
            Json::Number(n) => Ok(Value::String(n.to_string())),
            Json::Bool(b) => Ok(Value::String(b.to_string())),
            other => Err(mismatch(path, ty, other.to_string())),
        },
        AttributeType::Bool => match raw {
            Json::Bool(b) => Ok(Value::Bool(*b)),
            Json::String(s) => s
                .parse::<bool>()
                .map(Value::Bool)
                .map_err(|_| mismatch(path, ty, s.clone())),
            other => Err(mismatch(path, ty, other.to_string())),
        },
        AttributeType::Int => match raw {
            Json::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
                .map(Value::Int)
                .ok_or_else(|| mismatch(path, ty, n.to_string())),
            Json::String(s) => s
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| mismatch(path, ty, s.clone())),
            other => Err(mismatch(path, ty, other.to_string())),
        },
        AttributeType::Float => match raw {
            Json::Number(n) => n
                .as_f64()
                .map(Value::Float)
                .ok_or_else(|| mismatch(path, ty, n.to_string())),
            Json::String(s) => s
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| mismatch(path, ty, s.clone())),
            other => Err(mismatch(path, ty, other.to_string())),
        },
        AttributeType::List(elem) | AttributeType::Set(elem) => {
            let items = raw
                .as_array()
                .ok_or_else(|| mismatch(path, ty, raw.to_string()))?;
            let values = items
                .iter()
                .enumerate()
                .map(|(idx, item)| from_json(item, elem, &path.clone().index(idx as i64)))
                .collect::<Result<Vec<_>>>()?;
            Ok(match ty {
                AttributeType::Set(_) => Value::Set(values),
                _ => Value::List(values),
            })
        }
        AttributeType::Map(elem) => {
            let entries = raw
                .as_object()
                .ok_or_else(|| mismatch(path, ty, raw.to_string()))?;
            let mut out = BTreeMap::new();
            for (key, item) in entries {
                out.insert(key.clone(), from_json(item, elem, &path.clone().key(key))?);
            }
            Ok(Value::Map(out))
        }
        AttributeType::Object(fields) => {
            let entries = raw
                .as_object()
                .ok_or_else(|| mismatch(path, ty, raw.to_string()))?;
            let mut out = BTreeMap::new();
            for (name, field_ty) in fields {
                let value = match entries.get(name) {
                    Some(item) => from_json(item, field_ty, &path.clone().attribute(name))?,
                    None => Value::Null,
                };
                out.insert(name.clone(), value);
            }
            Ok(Value::Object(out))
        }
    }
}
