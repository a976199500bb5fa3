//! Data models for chat entities and wire payloads

mod attachment;
mod chat;
mod message;
mod session;

pub use attachment::*;
pub use chat::*;
pub use message::*;
pub use session::*;

use serde::de;

/// Accept an identifier sent either as a JSON string or as a number.
///
/// Some endpoints emit numeric ids, others stringify them.
pub(crate) fn string_or_number<'de, D: de::Deserializer<'de>>(
    d: D,
) -> std::result::Result<String, D::Error> {
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = String;
        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            f.write_str("string or integer id")
        }
        fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<String, E> {
            Ok(v.to_string())
        }
        fn visit_string<E: de::Error>(self, v: String) -> std::result::Result<String, E> {
            Ok(v)
        }
        fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<String, E> {
            Ok(v.to_string())
        }
        fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<String, E> {
            Ok(v.to_string())
        }
    }
    d.deserialize_any(Visitor)
}

/// Unwrap `{"<key>": {...}}` envelopes; bare payloads pass through.
pub(crate) fn unwrap_envelope(payload: serde_json::Value, key: &str) -> serde_json::Value {
    match payload {
        serde_json::Value::Object(mut map) if map.get(key).is_some_and(|v| v.is_object()) => {
            map.remove(key).unwrap_or_default()
        }
        other => other,
    }
}
