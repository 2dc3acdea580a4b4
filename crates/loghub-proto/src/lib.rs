//! Wire types for the `logs.v1` ingress protocol.
//!
//! This crate carries the generated protobuf models and the tonic client and
//! server for `IngressService`. The generated output is vendored under
//! `src/generated/` (regenerate with the tool in `gen/`), so builds do not
//! need `protoc`. All message types derive `serde` serialization to support
//! the JSON-lines representation of log entries; `bytes` fields are bridged
//! as base64 strings.

// Base64 serialization for Vec<u8> fields
pub(crate) mod serde_base64 {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let encoded = base64::engine::general_purpose::STANDARD.encode(value);
        serializer.serialize_str(&encoded)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        base64::engine::general_purpose::STANDARD
            .decode(s.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

pub mod v1 {
    include!("generated/logs.v1.rs");
}
