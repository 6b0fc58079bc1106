//! Trace-by-id model: resource groups, scope groups, spans.
//!
//! Field numbers follow the OTLP trace proto so binary output interoperates
//! with native clients. The JSON mapping follows jsonpb (camelCase keys,
//! base64 identifiers, stringified 64-bit timestamps, enum names).

use crate::serde_util::{self, bytes_b64, u64_string};
use serde::{Deserialize, Serialize};

/// A full trace: one resource group per contributing resource.
///
/// The wire name for the resource group list is `batches`.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct Trace {
    #[prost(message, repeated, tag = "1")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub batches: Vec<ResourceSpans>,
}

impl Trace {
    /// A trace with no resource groups is the "not found" shape some
    /// backends return with HTTP 200.
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    pub fn span_count(&self) -> usize {
        self.batches
            .iter()
            .flat_map(|b| &b.scope_spans)
            .map(|ss| ss.spans.len())
            .sum()
    }
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourceSpans {
    #[prost(message, optional, tag = "1")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<Resource>,
    #[prost(message, repeated, tag = "2")]
    #[serde(alias = "instrumentationLibrarySpans", skip_serializing_if = "Vec::is_empty")]
    pub scope_spans: Vec<ScopeSpans>,
    #[prost(string, tag = "3")]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub schema_url: String,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Resource {
    #[prost(message, repeated, tag = "1")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<KeyValue>,
    #[prost(uint32, tag = "2")]
    #[serde(skip_serializing_if = "serde_util::is_zero_u32")]
    pub dropped_attributes_count: u32,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScopeSpans {
    #[prost(message, optional, tag = "1")]
    #[serde(alias = "instrumentationLibrary", skip_serializing_if = "Option::is_none")]
    pub scope: Option<InstrumentationScope>,
    #[prost(message, repeated, tag = "2")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub spans: Vec<Span>,
    #[prost(string, tag = "3")]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub schema_url: String,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InstrumentationScope {
    #[prost(string, tag = "1")]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[prost(string, tag = "2")]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[prost(message, repeated, tag = "3")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<KeyValue>,
    #[prost(uint32, tag = "4")]
    #[serde(skip_serializing_if = "serde_util::is_zero_u32")]
    pub dropped_attributes_count: u32,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Span {
    #[prost(bytes = "vec", tag = "1")]
    #[serde(with = "bytes_b64", skip_serializing_if = "Vec::is_empty")]
    pub trace_id: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    #[serde(with = "bytes_b64", skip_serializing_if = "Vec::is_empty")]
    pub span_id: Vec<u8>,
    #[prost(string, tag = "3")]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub trace_state: String,
    #[prost(bytes = "vec", tag = "4")]
    #[serde(with = "bytes_b64", skip_serializing_if = "Vec::is_empty")]
    pub parent_span_id: Vec<u8>,
    #[prost(string, tag = "5")]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[prost(enumeration = "SpanKind", tag = "6")]
    #[serde(with = "span_kind")]
    pub kind: i32,
    #[prost(fixed64, tag = "7")]
    #[serde(with = "u64_string", skip_serializing_if = "serde_util::is_zero_u64")]
    pub start_time_unix_nano: u64,
    #[prost(fixed64, tag = "8")]
    #[serde(with = "u64_string", skip_serializing_if = "serde_util::is_zero_u64")]
    pub end_time_unix_nano: u64,
    #[prost(message, repeated, tag = "9")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<KeyValue>,
    #[prost(uint32, tag = "10")]
    #[serde(skip_serializing_if = "serde_util::is_zero_u32")]
    pub dropped_attributes_count: u32,
    #[prost(message, repeated, tag = "11")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<SpanEvent>,
    #[prost(uint32, tag = "12")]
    #[serde(skip_serializing_if = "serde_util::is_zero_u32")]
    pub dropped_events_count: u32,
    #[prost(message, repeated, tag = "13")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<SpanLink>,
    #[prost(uint32, tag = "14")]
    #[serde(skip_serializing_if = "serde_util::is_zero_u32")]
    pub dropped_links_count: u32,
    #[prost(message, optional, tag = "15")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<SpanStatus>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum SpanKind {
    Unspecified = 0,
    Internal = 1,
    Server = 2,
    Client = 3,
    Producer = 4,
    Consumer = 5,
}

impl SpanKind {
    pub fn as_str_name(self) -> &'static str {
        match self {
            SpanKind::Unspecified => "SPAN_KIND_UNSPECIFIED",
            SpanKind::Internal => "SPAN_KIND_INTERNAL",
            SpanKind::Server => "SPAN_KIND_SERVER",
            SpanKind::Client => "SPAN_KIND_CLIENT",
            SpanKind::Producer => "SPAN_KIND_PRODUCER",
            SpanKind::Consumer => "SPAN_KIND_CONSUMER",
        }
    }

    pub fn from_str_name(name: &str) -> Option<i32> {
        match name {
            "SPAN_KIND_UNSPECIFIED" => Some(0),
            "SPAN_KIND_INTERNAL" => Some(1),
            "SPAN_KIND_SERVER" => Some(2),
            "SPAN_KIND_CLIENT" => Some(3),
            "SPAN_KIND_PRODUCER" => Some(4),
            "SPAN_KIND_CONSUMER" => Some(5),
            _ => None,
        }
    }
}

mod span_kind {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &i32, serializer: S) -> Result<S::Ok, S::Error> {
        match SpanKind::try_from(*v) {
            Ok(kind) => serializer.serialize_str(kind.as_str_name()),
            Err(_) => serializer.serialize_i32(*v),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i32, D::Error> {
        serde_util::enum_from_json(deserializer, "SpanKind", SpanKind::from_str_name)
    }
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpanEvent {
    #[prost(fixed64, tag = "1")]
    #[serde(with = "u64_string", skip_serializing_if = "serde_util::is_zero_u64")]
    pub time_unix_nano: u64,
    #[prost(string, tag = "2")]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[prost(message, repeated, tag = "3")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<KeyValue>,
    #[prost(uint32, tag = "4")]
    #[serde(skip_serializing_if = "serde_util::is_zero_u32")]
    pub dropped_attributes_count: u32,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpanLink {
    #[prost(bytes = "vec", tag = "1")]
    #[serde(with = "bytes_b64", skip_serializing_if = "Vec::is_empty")]
    pub trace_id: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    #[serde(with = "bytes_b64", skip_serializing_if = "Vec::is_empty")]
    pub span_id: Vec<u8>,
    #[prost(string, tag = "3")]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub trace_state: String,
    #[prost(message, repeated, tag = "4")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<KeyValue>,
    #[prost(uint32, tag = "5")]
    #[serde(skip_serializing_if = "serde_util::is_zero_u32")]
    pub dropped_attributes_count: u32,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpanStatus {
    #[prost(string, tag = "2")]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[prost(enumeration = "StatusCode", tag = "3")]
    #[serde(with = "status_code", skip_serializing_if = "serde_util::is_zero_i32")]
    pub code: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ::prost::Enumeration)]
#[repr(i32)]
pub enum StatusCode {
    Unset = 0,
    Ok = 1,
    Error = 2,
}

impl StatusCode {
    pub fn as_str_name(self) -> &'static str {
        match self {
            StatusCode::Unset => "STATUS_CODE_UNSET",
            StatusCode::Ok => "STATUS_CODE_OK",
            StatusCode::Error => "STATUS_CODE_ERROR",
        }
    }

    pub fn from_str_name(name: &str) -> Option<i32> {
        match name {
            "STATUS_CODE_UNSET" => Some(0),
            "STATUS_CODE_OK" => Some(1),
            "STATUS_CODE_ERROR" => Some(2),
            _ => None,
        }
    }
}

mod status_code {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &i32, serializer: S) -> Result<S::Ok, S::Error> {
        match StatusCode::try_from(*v) {
            Ok(code) => serializer.serialize_str(code.as_str_name()),
            Err(_) => serializer.serialize_i32(*v),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i32, D::Error> {
        serde_util::enum_from_json(deserializer, "StatusCode", StatusCode::from_str_name)
    }
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KeyValue {
    #[prost(string, tag = "1")]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub key: String,
    #[prost(message, optional, tag = "2")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<AnyValue>,
}

impl KeyValue {
    pub fn string(key: impl Into<String>, value: impl Into<String>) -> Self {
        KeyValue {
            key: key.into(),
            value: Some(AnyValue::string(value)),
        }
    }
}

/// A dynamically typed attribute value.
///
/// Serde is hand-written: the JSON form is a single-key object naming the
/// variant (`{"stringValue": "db"}`), with int64 payloads as strings and
/// bytes payloads as base64, per the protobuf-JSON mapping.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AnyValue {
    #[prost(oneof = "any_value::Value", tags = "1, 2, 3, 4, 5, 6, 7")]
    pub value: Option<any_value::Value>,
}

pub mod any_value {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Value {
        #[prost(string, tag = "1")]
        StringValue(String),
        #[prost(bool, tag = "2")]
        BoolValue(bool),
        #[prost(int64, tag = "3")]
        IntValue(i64),
        #[prost(double, tag = "4")]
        DoubleValue(f64),
        #[prost(message, tag = "5")]
        ArrayValue(super::ArrayValue),
        #[prost(message, tag = "6")]
        KvlistValue(super::KeyValueList),
        #[prost(bytes, tag = "7")]
        BytesValue(Vec<u8>),
    }
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct ArrayValue {
    #[prost(message, repeated, tag = "1")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<AnyValue>,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyValueList {
    #[prost(message, repeated, tag = "1")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<KeyValue>,
}

impl AnyValue {
    pub fn string(v: impl Into<String>) -> Self {
        AnyValue {
            value: Some(any_value::Value::StringValue(v.into())),
        }
    }

    pub fn int(v: i64) -> Self {
        AnyValue {
            value: Some(any_value::Value::IntValue(v)),
        }
    }
}

impl Serialize for AnyValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use base64::engine::general_purpose::STANDARD as BASE64;
        use base64::Engine;
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(if self.value.is_some() { 1 } else { 0 }))?;
        match &self.value {
            Some(any_value::Value::StringValue(s)) => map.serialize_entry("stringValue", s)?,
            Some(any_value::Value::BoolValue(b)) => map.serialize_entry("boolValue", b)?,
            Some(any_value::Value::IntValue(i)) => {
                map.serialize_entry("intValue", &i.to_string())?
            }
            Some(any_value::Value::DoubleValue(d)) => map.serialize_entry("doubleValue", d)?,
            Some(any_value::Value::ArrayValue(a)) => map.serialize_entry("arrayValue", a)?,
            Some(any_value::Value::KvlistValue(kv)) => map.serialize_entry("kvlistValue", kv)?,
            Some(any_value::Value::BytesValue(b)) => {
                map.serialize_entry("bytesValue", &BASE64.encode(b))?
            }
            None => {}
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for AnyValue {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        AnyValue::from_json(&raw).map_err(serde::de::Error::custom)
    }
}

impl AnyValue {
    fn from_json(raw: &serde_json::Value) -> Result<Self, String> {
        use base64::engine::general_purpose::STANDARD as BASE64;
        use base64::Engine;

        let obj = match raw {
            serde_json::Value::Object(obj) => obj,
            other => return Err(format!("attribute value must be an object, got {other}")),
        };
        let value = if let Some(v) = obj.get("stringValue") {
            let s = v.as_str().ok_or("stringValue must be a string")?;
            Some(any_value::Value::StringValue(s.to_owned()))
        } else if let Some(v) = obj.get("boolValue") {
            let b = v.as_bool().ok_or("boolValue must be a boolean")?;
            Some(any_value::Value::BoolValue(b))
        } else if let Some(v) = obj.get("intValue") {
            let i = match v {
                serde_json::Value::String(s) => {
                    s.parse::<i64>().map_err(|e| format!("invalid intValue {s:?}: {e}"))?
                }
                serde_json::Value::Number(n) => {
                    n.as_i64().ok_or_else(|| format!("non-integral intValue {n}"))?
                }
                other => return Err(format!("intValue must be a string or number, got {other}")),
            };
            Some(any_value::Value::IntValue(i))
        } else if let Some(v) = obj.get("doubleValue") {
            let d = match v {
                serde_json::Value::String(s) => {
                    s.parse::<f64>().map_err(|e| format!("invalid doubleValue {s:?}: {e}"))?
                }
                serde_json::Value::Number(n) => {
                    n.as_f64().ok_or_else(|| format!("invalid doubleValue {n}"))?
                }
                other => return Err(format!("doubleValue must be a string or number, got {other}")),
            };
            Some(any_value::Value::DoubleValue(d))
        } else if let Some(v) = obj.get("arrayValue") {
            let a: ArrayValue =
                serde_json::from_value(v.clone()).map_err(|e| format!("invalid arrayValue: {e}"))?;
            Some(any_value::Value::ArrayValue(a))
        } else if let Some(v) = obj.get("kvlistValue") {
            let kv: KeyValueList =
                serde_json::from_value(v.clone()).map_err(|e| format!("invalid kvlistValue: {e}"))?;
            Some(any_value::Value::KvlistValue(kv))
        } else if let Some(v) = obj.get("bytesValue") {
            let s = v.as_str().ok_or("bytesValue must be a base64 string")?;
            let b = BASE64
                .decode(s)
                .map_err(|e| format!("invalid bytesValue: {e}"))?;
            Some(any_value::Value::BytesValue(b))
        } else {
            None
        };
        Ok(AnyValue { value })
    }
}

/// Trace-by-id response wrapper: the v1 output shape, and the shape v2
/// backends wrap their trace document in.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TraceByIdResponse {
    #[prost(message, optional, tag = "1")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<Trace>,
    #[prost(message, optional, tag = "2")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<TraceByIdMetrics>,
}

/// The v2 output shape: wrapper plus in-band completeness status.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TraceByIdResponseV2 {
    #[prost(message, optional, tag = "1")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<Trace>,
    #[prost(message, optional, tag = "2")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<TraceByIdMetrics>,
    #[prost(enumeration = "PartialStatus", tag = "3")]
    #[serde(with = "partial_status")]
    pub status: i32,
    #[prost(string, tag = "4")]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message: String,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TraceByIdMetrics {
    #[prost(uint64, tag = "1")]
    #[serde(with = "u64_string", skip_serializing_if = "serde_util::is_zero_u64")]
    pub inspected_bytes: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ::prost::Enumeration)]
#[repr(i32)]
pub enum PartialStatus {
    Complete = 0,
    Partial = 1,
}

impl PartialStatus {
    pub fn as_str_name(self) -> &'static str {
        match self {
            PartialStatus::Complete => "COMPLETE",
            PartialStatus::Partial => "PARTIAL",
        }
    }

    pub fn from_str_name(name: &str) -> Option<i32> {
        match name {
            "COMPLETE" => Some(0),
            "PARTIAL" => Some(1),
            _ => None,
        }
    }
}

mod partial_status {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &i32, serializer: S) -> Result<S::Ok, S::Error> {
        match PartialStatus::try_from(*v) {
            Ok(status) => serializer.serialize_str(status.as_str_name()),
            Err(_) => serializer.serialize_i32(*v),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i32, D::Error> {
        serde_util::enum_from_json(deserializer, "PartialStatus", PartialStatus::from_str_name)
    }
}

/// Convenience constructor for a single-span trace, shared by tests across
/// the workspace.
pub fn single_span_trace(service_name: &str, span: Span) -> Trace {
    Trace {
        batches: vec![ResourceSpans {
            resource: Some(Resource {
                attributes: vec![KeyValue::string("service.name", service_name)],
                dropped_attributes_count: 0,
            }),
            scope_spans: vec![ScopeSpans {
                scope: Some(InstrumentationScope::default()),
                spans: vec![span],
                schema_url: String::new(),
            }],
            schema_url: String::new(),
        }],
    }
}
