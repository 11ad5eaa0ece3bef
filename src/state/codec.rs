//! Conversion between the HTTP body and the stored representation.
//!
//! Two strategies, chosen at configuration time:
//!
//! | Strategy | Stored document |
//! |---|---|
//! | [`StateCodec::TextSafe`] | `{"data": {"data": "<base64>"}}` |
//! | [`StateCodec::BinaryDirect`] | the raw bytes |
//!
//! The doubled `data` key follows the KV v2 logical layout: the outer object
//! is Vault's wrapper, the inner one is the secret content.

use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD, Engine};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::secrets::SecretValue;

/// Storage layout for the state blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StateCodec {
    /// Base64 text nested under `data.data`, safe for JSON-only stores.
    #[default]
    #[serde(rename = "text", alias = "base64")]
    TextSafe,
    /// Raw bytes, for stores that accept binary values.
    #[serde(rename = "binary", alias = "raw")]
    BinaryDirect,
}

/// Why a stored entry could not be turned back into a state blob.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("stored document has no '{0}' field")]
    MissingField(&'static str),

    #[error("'{0}' field is not a {1}")]
    WrongType(&'static str, &'static str),

    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("expected a JSON document, found binary value")]
    UnexpectedBinary,

    #[error("expected a binary value, found JSON document")]
    UnexpectedJson,
}

/// Outcome of reading the state entry.
///
/// "Nothing stored yet" and "stored but unreadable" are distinct: the first
/// is a normal empty state, the second is a server error.
#[derive(Debug, PartialEq, Eq)]
pub enum DecodedState {
    Absent,
    Present(Bytes),
    Malformed(DecodeError),
}

impl StateCodec {
    /// Wrap a state blob for storage.
    pub fn encode(&self, blob: &[u8]) -> SecretValue {
        match self {
            StateCodec::TextSafe => {
                SecretValue::Json(json!({ "data": { "data": STANDARD.encode(blob) } }))
            }
            StateCodec::BinaryDirect => SecretValue::Binary(Bytes::copy_from_slice(blob)),
        }
    }

    /// Recover the state blob from what the store returned.
    pub fn decode(&self, stored: Option<SecretValue>) -> DecodedState {
        let Some(stored) = stored else {
            return DecodedState::Absent;
        };

        let result = match (self, stored) {
            (StateCodec::TextSafe, SecretValue::Json(document)) => decode_text(&document),
            (StateCodec::TextSafe, SecretValue::Binary(_)) => Err(DecodeError::UnexpectedBinary),
            (StateCodec::BinaryDirect, SecretValue::Binary(blob)) => Ok(blob),
            (StateCodec::BinaryDirect, SecretValue::Json(_)) => Err(DecodeError::UnexpectedJson),
        };

        match result {
            Ok(blob) => DecodedState::Present(blob),
            Err(e) => DecodedState::Malformed(e),
        }
    }
}

fn decode_text(document: &Value) -> Result<Bytes, DecodeError> {
    let wrapper = document.get("data").ok_or(DecodeError::MissingField("data"))?;
    let wrapper = wrapper.as_object().ok_or(DecodeError::WrongType("data", "object"))?;
    let encoded = wrapper.get("data").ok_or(DecodeError::MissingField("data.data"))?;
    let encoded = encoded.as_str().ok_or(DecodeError::WrongType("data.data", "string"))?;

    Ok(Bytes::from(STANDARD.decode(encoded)?))
}

impl fmt::Display for StateCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateCodec::TextSafe => write!(f, "text"),
            StateCodec::BinaryDirect => write!(f, "binary"),
        }
    }
}

impl FromStr for StateCodec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "base64" => Ok(StateCodec::TextSafe),
            "binary" | "raw" => Ok(StateCodec::BinaryDirect),
            other => Err(format!("unknown codec '{}', expected 'text' or 'binary'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_text_layout_is_double_wrapped_base64() {
        let encoded = StateCodec::TextSafe.encode(b"hello-state");
        assert_eq!(
            encoded,
            SecretValue::Json(json!({ "data": { "data": "aGVsbG8tc3RhdGU=" } }))
        );
    }

    #[test]
    fn test_binary_layout_is_raw() {
        let encoded = StateCodec::BinaryDirect.encode(&[0, 159, 255]);
        assert_eq!(encoded, SecretValue::Binary(Bytes::from_static(&[0, 159, 255])));
    }

    #[test]
    fn test_absent_entry() {
        assert_eq!(StateCodec::TextSafe.decode(None), DecodedState::Absent);
        assert_eq!(StateCodec::BinaryDirect.decode(None), DecodedState::Absent);
    }

    #[test]
    fn test_empty_blob_is_present_not_absent() {
        let codec = StateCodec::TextSafe;
        assert_eq!(codec.decode(Some(codec.encode(b""))), DecodedState::Present(Bytes::new()));
    }

    #[test]
    fn test_missing_inner_key_is_malformed() {
        let stored = SecretValue::Json(json!({ "data": { "value": "aGk=" } }));
        assert_eq!(
            StateCodec::TextSafe.decode(Some(stored)),
            DecodedState::Malformed(DecodeError::MissingField("data.data"))
        );
    }

    #[test]
    fn test_missing_outer_key_is_malformed() {
        let stored = SecretValue::Json(json!({ "metadata": {} }));
        assert_eq!(
            StateCodec::TextSafe.decode(Some(stored)),
            DecodedState::Malformed(DecodeError::MissingField("data"))
        );
    }

    #[test]
    fn test_wrong_types_are_malformed() {
        let flat = SecretValue::Json(json!({ "data": "aGk=" }));
        assert_eq!(
            StateCodec::TextSafe.decode(Some(flat)),
            DecodedState::Malformed(DecodeError::WrongType("data", "object"))
        );

        let numeric = SecretValue::Json(json!({ "data": { "data": 42 } }));
        assert_eq!(
            StateCodec::TextSafe.decode(Some(numeric)),
            DecodedState::Malformed(DecodeError::WrongType("data.data", "string"))
        );
    }

    #[test]
    fn test_invalid_base64_is_malformed() {
        let stored = SecretValue::Json(json!({ "data": { "data": "not base64!" } }));
        assert!(matches!(
            StateCodec::TextSafe.decode(Some(stored)),
            DecodedState::Malformed(DecodeError::Base64(_))
        ));
    }

    #[test]
    fn test_mismatched_value_kinds_are_malformed() {
        let binary = SecretValue::Binary(Bytes::from_static(b"raw"));
        assert_eq!(
            StateCodec::TextSafe.decode(Some(binary)),
            DecodedState::Malformed(DecodeError::UnexpectedBinary)
        );

        let json = StateCodec::TextSafe.encode(b"raw");
        assert_eq!(
            StateCodec::BinaryDirect.decode(Some(json)),
            DecodedState::Malformed(DecodeError::UnexpectedJson)
        );
    }

    #[test]
    fn test_parse_codec_names() {
        assert_eq!("text".parse::<StateCodec>().unwrap(), StateCodec::TextSafe);
        assert_eq!("BASE64".parse::<StateCodec>().unwrap(), StateCodec::TextSafe);
        assert_eq!(" binary ".parse::<StateCodec>().unwrap(), StateCodec::BinaryDirect);
        assert_eq!("raw".parse::<StateCodec>().unwrap(), StateCodec::BinaryDirect);
        assert!("gzip".parse::<StateCodec>().is_err());
        assert_eq!(StateCodec::default(), StateCodec::TextSafe);
        assert_eq!(StateCodec::BinaryDirect.to_string(), "binary");
    }

    proptest! {
        #[test]
        fn prop_text_round_trip(blob in proptest::collection::vec(any::<u8>(), 0..4096)) {
            let codec = StateCodec::TextSafe;
            prop_assert_eq!(
                codec.decode(Some(codec.encode(&blob))),
                DecodedState::Present(Bytes::from(blob))
            );
        }

        #[test]
        fn prop_binary_round_trip(blob in proptest::collection::vec(any::<u8>(), 0..4096)) {
            let codec = StateCodec::BinaryDirect;
            prop_assert_eq!(
                codec.decode(Some(codec.encode(&blob))),
                DecodedState::Present(Bytes::from(blob))
            );
        }
    }
}
