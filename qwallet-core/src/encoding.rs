//! Text encodings for binary fields.
//!
//! Wallet records are stored as JSON, so every byte field is base64 encoded
//! before it reaches the serializer.

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::{Result, WalletError};

/// Encodes bytes as standard base64.
pub fn to_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decodes standard base64.
pub fn from_base64(s: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(s)
        .map_err(|e| WalletError::invalid(format!("invalid base64: {e}")))
}

/// Serde adapter for `Vec<u8>` fields stored as base64 strings.
pub mod base64_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serializes bytes as base64.
    pub fn serialize<S>(bytes: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::to_base64(bytes))
    }

    /// Deserializes bytes from base64.
    pub fn deserialize<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        super::from_base64(&s).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for `Option<Vec<u8>>` fields stored as base64 strings.
pub mod base64_opt {
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serializes optional bytes as an optional base64 string.
    pub fn serialize<S>(bytes: &Option<Vec<u8>>, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match bytes {
            Some(b) => serializer.serialize_some(&super::to_base64(b)),
            None => serializer.serialize_none(),
        }
    }

    /// Deserializes optional bytes from an optional base64 string.
    pub fn deserialize<'de, D>(deserializer: D) -> std::result::Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = Option::<String>::deserialize(deserializer)?;
        s.map(|s| super::from_base64(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Holder {
        #[serde(with = "base64_bytes")]
        data: Vec<u8>,
        #[serde(with = "base64_opt", default)]
        extra: Option<Vec<u8>>,
    }

    #[test]
    fn test_bytes_are_stored_as_text() {
        let holder = Holder {
            data: vec![0, 1, 2, 255],
            extra: None,
        };
        let json = serde_json::to_string(&holder).unwrap();
        assert_eq!(json, r#"{"data":"AAEC/w==","extra":null}"#);

        let back: Holder = serde_json::from_str(&json).unwrap();
        assert_eq!(back, holder);
    }

    #[test]
    fn test_invalid_base64_rejected() {
        assert!(from_base64("not base64!!").is_err());
        let res: std::result::Result<Holder, _> = serde_json::from_str(r#"{"data":"%%%"}"#);
        assert!(res.is_err());
    }
}
