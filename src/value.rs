//! Conversion between application values and the bytes a backend stores.
//!
//! Every stored value starts with a one-byte tag naming its shape, followed
//! by the payload:
//!
//! | tag    | payload                         |
//! |--------|---------------------------------|
//! | `0x01` | UTF-8 text                      |
//! | `0x02` | raw bytes                       |
//! | `0x03` | JSON document                   |
//!
//! A zero-length byte sequence is the absence marker and decodes to `None`.
//! Empty text, JSON `null` and empty objects all carry a tag, so they always
//! decode to a present value.

use crate::error::Error;
use crate::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;

const TAG_TEXT: u8 = 0x01;
const TAG_BYTES: u8 = 0x02;
const TAG_STRUCTURED: u8 = 0x03;

/// A value carried through a driver.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Bytes(Vec<u8>),
    Structured(serde_json::Value),
}

impl Value {
    /// Serializes any `Serialize` type into a structured value.
    pub fn structured<T: Serialize + ?Sized>(value: &T) -> Result<Value> {
        serde_json::to_value(value)
            .map(Value::Structured)
            .map_err(Error::Encoding)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_structured(&self) -> Option<&serde_json::Value> {
        match self {
            Value::Structured(v) => Some(v),
            _ => None,
        }
    }

    /// Views the value as a JSON document: text becomes a JSON string and
    /// bytes an array of numbers.
    pub fn into_json(self) -> serde_json::Value {
        match self {
            Value::Text(s) => serde_json::Value::String(s),
            Value::Bytes(b) => serde_json::Value::Array(b.into_iter().map(Into::into).collect()),
            Value::Structured(v) => v,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Value::Bytes(b.to_vec())
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Structured(v)
    }
}

/// Encodes a value into its tagged byte form.
pub fn encode(value: &Value) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    match value {
        Value::Text(s) => {
            out.reserve(s.len() + 1);
            out.push(TAG_TEXT);
            out.extend_from_slice(s.as_bytes());
        }
        Value::Bytes(b) => {
            out.reserve(b.len() + 1);
            out.push(TAG_BYTES);
            out.extend_from_slice(b);
        }
        Value::Structured(v) => {
            out.push(TAG_STRUCTURED);
            serde_json::to_writer(&mut out, v).map_err(Error::Encoding)?;
        }
    }
    Ok(out)
}

/// Decodes stored bytes. Zero-length input is absence, not an error.
pub fn decode(bytes: &[u8]) -> Result<Option<Value>> {
    let (tag, payload) = match bytes.split_first() {
        Some(split) => split,
        None => return Ok(None),
    };

    let value = match *tag {
        TAG_TEXT => Value::Text(
            std::str::from_utf8(payload)
                .map_err(Error::InvalidText)?
                .to_owned(),
        ),
        TAG_BYTES => Value::Bytes(payload.to_vec()),
        TAG_STRUCTURED => {
            Value::Structured(serde_json::from_slice(payload).map_err(Error::Decoding)?)
        }
        other => return Err(Error::UnknownTag(other)),
    };
    Ok(Some(value))
}

/// Decodes stored bytes straight into a caller-owned destination.
///
/// Returns `false` and leaves `dest` untouched when the bytes are the absence
/// marker. A present value that does not fit `T` is a decoding error.
pub fn decode_into<T: DeserializeOwned>(bytes: &[u8], dest: &mut T) -> Result<bool> {
    match decode(bytes)? {
        Some(value) => {
            populate(value, dest)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

pub(crate) fn populate<T: DeserializeOwned>(value: Value, dest: &mut T) -> Result<()> {
    *dest = serde_json::from_value(value.into_json()).map_err(Error::Decoding)?;
    Ok(())
}
