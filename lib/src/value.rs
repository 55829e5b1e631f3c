//! Attribute values and their conversion to and from the raw octet strings the directory
//! protocol carries.

use std::fmt;

use crate::prelude::*;

/// A single attribute value. Values that are valid UTF-8 are held as text, anything else is
/// kept as the raw bytes the server sent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Text(String),
    Binary(Vec<u8>),
}

impl Value {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Value::Text(s) => s.as_bytes(),
            Value::Binary(b) => b.as_slice(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            Value::Binary(_) => None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Value::Text(_))
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => f.write_str(s),
            Value::Binary(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::Text(s.clone())
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Binary(b)
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Value::Binary(b.to_vec())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Text(i.to_string())
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Text(i.to_string())
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Text(i.to_string())
    }
}

impl From<u64> for Value {
    fn from(i: u64) -> Self {
        Value::Text(i.to_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        if b {
            Value::Text(LDAP_TRUE.to_string())
        } else {
            Value::Text(LDAP_FALSE.to_string())
        }
    }
}

/// Converts between [`Value`]s and protocol octet strings.
#[derive(Debug, Clone, Default)]
pub struct ValueCodec {
    max_value_len: Option<usize>,
}

impl ValueCodec {
    pub fn new(max_value_len: Option<usize>) -> Self {
        ValueCodec { max_value_len }
    }

    pub fn max_value_len(&self) -> Option<usize> {
        self.max_value_len
    }

    fn check_len(&self, len: usize) -> Result<(), OperationError> {
        match self.max_value_len {
            Some(max) if len > max => Err(OperationError::EncodingFailure(format!(
                "value of {len} bytes exceeds the limit of {max} bytes"
            ))),
            _ => Ok(()),
        }
    }

    /// Decode a raw value, preferring text and falling back to the raw bytes.
    pub fn decode(&self, raw: Vec<u8>) -> Result<Value, OperationError> {
        self.check_len(raw.len())?;
        Ok(match String::from_utf8(raw) {
            Ok(s) => Value::Text(s),
            Err(e) => Value::Binary(e.into_bytes()),
        })
    }

    pub fn encode(&self, value: &Value) -> Result<Vec<u8>, OperationError> {
        self.check_len(value.len())?;
        Ok(value.as_bytes().to_vec())
    }

    pub fn encode_all(&self, values: &[Value]) -> Result<Vec<Vec<u8>>, OperationError> {
        values.iter().map(|v| self.encode(v)).collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    #[test]
    fn test_value_scalar_coercion() {
        assert_eq!(Value::from("alice"), Value::Text("alice".to_string()));
        assert_eq!(Value::from(1000_i64), Value::Text("1000".to_string()));
        assert_eq!(Value::from(true), Value::Text("TRUE".to_string()));
        assert_eq!(Value::from(false), Value::Text("FALSE".to_string()));
        assert_eq!(Value::from(vec![0xde_u8, 0xad]), Value::Binary(vec![0xde, 0xad]));
    }

    #[test]
    fn test_codec_decode_text_with_binary_fallback() {
        let codec = ValueCodec::default();
        let v = codec
            .decode("Ünïcode".as_bytes().to_vec())
            .expect("decode failed");
        assert_eq!(v.as_str(), Some("Ünïcode"));

        // Not valid utf-8, so the bytes are kept as they are.
        let v = codec.decode(vec![0xff, 0xfe, 0x00]).expect("decode failed");
        assert_eq!(v, Value::Binary(vec![0xff, 0xfe, 0x00]));
        assert!(!v.is_text());
    }

    #[test]
    fn test_codec_value_limit() {
        let codec = ValueCodec::new(Some(4));
        assert!(codec.decode(b"abcd".to_vec()).is_ok());
        assert_eq!(
            codec.decode(b"abcde".to_vec()),
            Err(OperationError::EncodingFailure(String::new()))
        );
        assert_eq!(
            codec.encode(&Value::from("too long")),
            Err(OperationError::EncodingFailure(String::new()))
        );
        assert_eq!(
            codec.encode(&Value::from("ok")).expect("encode failed"),
            b"ok".to_vec()
        );
    }
}
