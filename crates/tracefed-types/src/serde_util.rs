//! Lenient protobuf-JSON field adapters.
//!
//! Backends marshal their JSON with different generations of protobuf-JSON
//! tooling. These `serde(with = ...)` modules absorb the differences on
//! decode and pin the output to the jsonpb conventions.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serializer};
use std::fmt;

/// Decode a trace or span identifier from its JSON string form.
///
/// jsonpb emits byte fields as padded base64 (8-byte span id -> 12 chars,
/// 16-byte trace id -> 24 chars); OTLP/JSON emits lowercase hex (16 / 32
/// chars). A hex identifier of canonical length is also a syntactically valid
/// base64 string, so hex is matched first at those lengths.
pub fn decode_id(s: &str) -> Result<Vec<u8>, String> {
    if s.is_empty() {
        return Ok(Vec::new());
    }
    if (s.len() == 16 || s.len() == 32) && s.bytes().all(|b| b.is_ascii_hexdigit()) {
        return hex::decode(s).map_err(|e| format!("invalid hex id {s:?}: {e}"));
    }
    BASE64
        .decode(s)
        .or_else(|_| hex::decode(s))
        .map_err(|e| format!("invalid id {s:?}: {e}"))
}

/// Byte fields (trace id, span id) as base64 out, base64-or-hex in.
pub mod bytes_b64 {
    use super::*;

    pub fn serialize<S: Serializer>(v: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64.encode(v))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        decode_id(&s).map_err(de::Error::custom)
    }
}

/// 64-bit unsigned fields as decimal strings out, string-or-number in.
pub mod u64_string {
    use super::*;

    pub fn serialize<S: Serializer>(v: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&v.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        deserializer.deserialize_any(U64Visitor)
    }

    struct U64Visitor;

    impl Visitor<'_> for U64Visitor {
        type Value = u64;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("an unsigned 64-bit integer or its decimal string form")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<u64, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<u64, E> {
            u64::try_from(v).map_err(|_| E::custom(format!("negative value {v} for u64 field")))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<u64, E> {
            if v >= 0.0 && v.fract() == 0.0 && v <= u64::MAX as f64 {
                Ok(v as u64)
            } else {
                Err(E::custom(format!("non-integral value {v} for u64 field")))
            }
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<u64, E> {
            v.parse::<u64>()
                .map_err(|e| E::custom(format!("invalid u64 string {v:?}: {e}")))
        }
    }
}

/// Deserialize a protobuf enum value given as a name or a number.
pub fn enum_from_json<'de, D, F>(
    deserializer: D,
    kind: &'static str,
    from_name: F,
) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
    F: Fn(&str) -> Option<i32>,
{
    struct EnumVisitor<F> {
        kind: &'static str,
        from_name: F,
    }

    impl<F: Fn(&str) -> Option<i32>> Visitor<'_> for EnumVisitor<F> {
        type Value = i32;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "a {} enum name or number", self.kind)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<i32, E> {
            i32::try_from(v).map_err(|_| E::custom(format!("{} value {v} out of range", self.kind)))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<i32, E> {
            i32::try_from(v).map_err(|_| E::custom(format!("{} value {v} out of range", self.kind)))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<i32, E> {
            (self.from_name)(v)
                .ok_or_else(|| E::custom(format!("unknown {} name {v:?}", self.kind)))
        }
    }

    deserializer.deserialize_any(EnumVisitor { kind, from_name })
}

pub fn is_zero_u32(v: &u32) -> bool {
    *v == 0
}

pub fn is_zero_u64(v: &u64) -> bool {
    *v == 0
}

pub fn is_zero_i32(v: &i32) -> bool {
    *v == 0
}
