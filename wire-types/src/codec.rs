//! Bidirectional value codec between in-memory values and their JSON
//! wire representation.
//!
//! The wire format is plain JSON for everything that JSON can carry
//! natively. Binary payloads are wrapped in a tagged envelope
//! `{"type": "<kind>", "str_base64": "<base64>"}`; any object carrying
//! exactly that shape on decode is interpreted as an envelope, and an
//! unknown kind tag is a hard error rather than a silent pass-through.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Kind tag for in-memory images on the wire.
pub const IMAGE_KIND: &str = "image";

const ENVELOPE_TYPE_KEY: &str = "type";
const ENVELOPE_DATA_KEY: &str = "str_base64";

/// Closed union of every value kind the wire supports.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    /// Raw encoded image bytes (PNG/JPEG), carried base64-tagged.
    Image(Vec<u8>),
}

impl Value {
    /// Human-readable kind name, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Image(_) => IMAGE_KIND,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

/// Codec failures. Both directions fail hard: encode rejects values the
/// wire cannot carry, decode rejects envelopes it does not recognize.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("unsupported value kind: {0}")]
    UnsupportedKind(String),
    #[error("invalid {kind} payload: {reason}")]
    InvalidPayload { kind: String, reason: String },
}

/// Encode a value into its JSON wire representation.
///
/// Recurses into lists and maps preserving shape and order.
///
/// The envelope keys are reserved on the wire: a map whose entries
/// include string-valued `type` and `str_base64` keys encodes to the
/// same shape as a binary envelope and decodes as one, not as a map.
pub fn encode(value: &Value) -> Result<serde_json::Value, CodecError> {
    match value {
        Value::Null => Ok(serde_json::Value::Null),
        Value::Bool(b) => Ok(serde_json::Value::Bool(*b)),
        Value::Int(n) => Ok(serde_json::Value::from(*n)),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .ok_or_else(|| CodecError::UnsupportedKind(format!("non-finite float {f}"))),
        Value::Text(s) => Ok(serde_json::Value::String(s.clone())),
        Value::List(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(encode(item)?);
            }
            Ok(serde_json::Value::Array(out))
        }
        Value::Map(entries) => {
            let mut out = serde_json::Map::with_capacity(entries.len());
            for (key, item) in entries {
                out.insert(key.clone(), encode(item)?);
            }
            Ok(serde_json::Value::Object(out))
        }
        Value::Image(bytes) => Ok(serde_json::json!({
            ENVELOPE_TYPE_KEY: IMAGE_KIND,
            ENVELOPE_DATA_KEY: BASE64.encode(bytes),
        })),
    }
}

/// Decode a JSON wire value back into a [`Value`].
///
/// Any object carrying both a string `type` and a string `str_base64`
/// field is treated as a binary envelope; everything else is recursed
/// into structurally.
pub fn decode(wire: &serde_json::Value) -> Result<Value, CodecError> {
    match wire {
        serde_json::Value::Null => Ok(Value::Null),
        serde_json::Value::Bool(b) => Ok(Value::Bool(*b)),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Int(i))
            } else if let Some(f) = n.as_f64() {
                Ok(Value::Float(f))
            } else {
                Err(CodecError::UnsupportedKind(format!("number {n}")))
            }
        }
        serde_json::Value::String(s) => Ok(Value::Text(s.clone())),
        serde_json::Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(decode(item)?);
            }
            Ok(Value::List(out))
        }
        serde_json::Value::Object(obj) => {
            if let Some((tag, data)) = envelope_fields(obj) {
                return decode_envelope(tag, data);
            }
            let mut out = BTreeMap::new();
            for (key, item) in obj {
                out.insert(key.clone(), decode(item)?);
            }
            Ok(Value::Map(out))
        }
    }
}

fn envelope_fields(obj: &serde_json::Map<String, serde_json::Value>) -> Option<(&str, &str)> {
    let tag = obj.get(ENVELOPE_TYPE_KEY)?.as_str()?;
    let data = obj.get(ENVELOPE_DATA_KEY)?.as_str()?;
    Some((tag, data))
}

fn decode_envelope(tag: &str, data: &str) -> Result<Value, CodecError> {
    match tag {
        IMAGE_KIND => {
            let bytes = BASE64
                .decode(data)
                .map_err(|e| CodecError::InvalidPayload {
                    kind: IMAGE_KIND.to_string(),
                    reason: e.to_string(),
                })?;
            Ok(Value::Image(bytes))
        }
        other => Err(CodecError::UnsupportedKind(other.to_string())),
    }
}

// Serde passes through the codec so DTOs holding `Value` fields can
// derive Serialize/Deserialize plainly.

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let wire = encode(self).map_err(serde::ser::Error::custom)?;
        wire.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let wire = serde_json::Value::deserialize(deserializer)?;
        decode(&wire).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn roundtrip(value: Value) {
        let wire = encode(&value).unwrap();
        let back = decode(&wire).unwrap();
        assert_eq!(value, back);
    }

    #[test]
    fn primitives_roundtrip() {
        roundtrip(Value::Null);
        roundtrip(Value::Bool(true));
        roundtrip(Value::Int(-42));
        roundtrip(Value::Float(1.5));
        roundtrip(Value::Text("hello".into()));
    }

    #[test]
    fn nested_containers_roundtrip() {
        let mut map = BTreeMap::new();
        map.insert("bbox".to_string(), Value::List(vec![
            Value::Int(0),
            Value::Int(0),
            Value::Int(20),
            Value::Int(100),
        ]));
        map.insert("label".to_string(), Value::Text("belt".into()));
        roundtrip(Value::List(vec![Value::Map(map), Value::Null]));
    }

    #[test]
    fn image_roundtrip() {
        roundtrip(Value::Image(vec![0x89, 0x50, 0x4e, 0x47, 0x00, 0xff]));
    }

    #[test]
    fn image_encodes_as_envelope() {
        let wire = encode(&Value::Image(vec![1, 2, 3])).unwrap();
        assert_eq!(wire["type"], IMAGE_KIND);
        assert_eq!(wire["str_base64"], BASE64.encode([1u8, 2, 3]));
    }

    #[test]
    fn wire_roundtrip_is_identity() {
        // encode(decode(w)) == w for well-formed wire values.
        let wire = json!({
            "result": [1, 2.5, "x", null, {"nested": true}],
            "img": {"type": "image", "str_base64": BASE64.encode([7u8, 8])},
        });
        let decoded = decode(&wire).unwrap();
        assert_eq!(encode(&decoded).unwrap(), wire);
    }

    #[test]
    fn unknown_envelope_tag_is_rejected() {
        let wire = json!({"type": "numpy.ndarray", "str_base64": "AAAA"});
        let err = decode(&wire).unwrap_err();
        assert!(matches!(err, CodecError::UnsupportedKind(tag) if tag == "numpy.ndarray"));
    }

    #[test]
    fn malformed_base64_is_rejected() {
        let wire = json!({"type": "image", "str_base64": "!!not-base64!!"});
        assert!(matches!(
            decode(&wire),
            Err(CodecError::InvalidPayload { .. })
        ));
    }

    #[test]
    fn envelope_keys_in_a_map_are_reserved() {
        let mut map = BTreeMap::new();
        map.insert("type".to_string(), Value::Text(IMAGE_KIND.to_string()));
        map.insert(
            "str_base64".to_string(),
            Value::Text(BASE64.encode([1u8])),
        );

        let wire = encode(&Value::Map(map)).unwrap();
        assert_eq!(decode(&wire).unwrap(), Value::Image(vec![1]));
    }

    #[test]
    fn envelope_requires_both_fields() {
        // An object with only one of the two keys is a plain map.
        let wire = json!({"type": "image"});
        let decoded = decode(&wire).unwrap();
        assert!(matches!(decoded, Value::Map(_)));
    }

    #[test]
    fn non_finite_float_is_rejected_on_encode() {
        assert!(matches!(
            encode(&Value::Float(f64::NAN)),
            Err(CodecError::UnsupportedKind(_))
        ));
        assert!(matches!(
            encode(&Value::Float(f64::INFINITY)),
            Err(CodecError::UnsupportedKind(_))
        ));
    }

    #[test]
    fn integral_and_float_numbers_stay_distinct() {
        assert_eq!(decode(&json!(5)).unwrap(), Value::Int(5));
        assert_eq!(decode(&json!(5.0)).unwrap(), Value::Float(5.0));
    }

    #[test]
    fn serde_delegates_to_codec() {
        let value = Value::Map(BTreeMap::from([(
            "img".to_string(),
            Value::Image(vec![9, 9]),
        )]));
        let json = serde_json::to_string(&value).unwrap();
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value, back);
    }
}
