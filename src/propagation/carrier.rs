//! Trace carrier carried in the MCP `_meta` field
//!
//! A carrier is a flat string map holding at most the three W3C keys.
//! It is built fresh for every call and dropped afterwards.

use std::collections::BTreeMap;

use opentelemetry::propagation::{Extractor, Injector};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// JSON object used for tool arguments and `_meta` payloads
pub type JsonObject = Map<String, Value>;

/// Argument key under which trace context travels
pub const META_KEY: &str = "_meta";

/// W3C Trace Context parent header
pub const TRACEPARENT: &str = "traceparent";

/// W3C Trace Context vendor state header
pub const TRACESTATE: &str = "tracestate";

/// W3C Baggage header
pub const BAGGAGE: &str = "baggage";

/// The only keys a carrier ever reads from `_meta`
pub const CARRIER_KEYS: [&str; 3] = [TRACEPARENT, TRACESTATE, BAGGAGE];

/// Text-map carrier for trace context
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraceCarrier {
    fields: BTreeMap<String, String>,
}

impl TraceCarrier {
    /// Create an empty carrier
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a carrier from a `_meta` object
    ///
    /// Only `traceparent`, `tracestate` and `baggage` are copied, and only when
    /// their value is a JSON string. Everything else in `meta` is ignored.
    pub fn from_meta(meta: &JsonObject) -> Self {
        let fields = CARRIER_KEYS
            .iter()
            .filter_map(|key| {
                meta.get(*key)
                    .and_then(Value::as_str)
                    .map(|value| (key.to_string(), value.to_string()))
            })
            .collect();

        Self { fields }
    }

    /// Look up a carrier field
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Number of fields present
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether no field is present
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate over `(key, value)` pairs in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Convert into a JSON object suitable for an outbound `_meta` field
    pub fn into_meta(self) -> JsonObject {
        self.fields
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect()
    }
}

impl Extractor for TraceCarrier {
    fn get(&self, key: &str) -> Option<&str> {
        TraceCarrier::get(self, key)
    }

    fn keys(&self) -> Vec<&str> {
        self.fields.keys().map(String::as_str).collect()
    }
}

impl Injector for TraceCarrier {
    fn set(&mut self, key: &str, value: String) {
        // An empty tracestate is written by the propagator for every valid span
        if value.is_empty() {
            return;
        }
        self.fields.insert(key.to_string(), value);
    }
}

impl From<TraceCarrier> for JsonObject {
    fn from(carrier: TraceCarrier) -> Self {
        carrier.into_meta()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> JsonObject {
        match value {
            Value::Object(map) => map,
            _ => panic!("Expected JSON object"),
        }
    }

    #[test]
    fn test_from_meta_keeps_only_known_keys() {
        let meta = object(json!({
            "traceparent": "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01",
            "baggage": "user=alice",
            "progressToken": 7,
            "other": "ignored"
        }));

        let carrier = TraceCarrier::from_meta(&meta);
        assert_eq!(carrier.len(), 2);
        assert_eq!(
            carrier.get(TRACEPARENT),
            Some("00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01")
        );
        assert_eq!(carrier.get(BAGGAGE), Some("user=alice"));
        assert_eq!(carrier.get(TRACESTATE), None);
        assert_eq!(carrier.get("other"), None);
    }

    #[test]
    fn test_from_meta_skips_non_string_values() {
        let meta = object(json!({ "traceparent": 42, "tracestate": null }));
        assert!(TraceCarrier::from_meta(&meta).is_empty());
    }

    #[test]
    fn test_injector_skips_empty_values() {
        let mut carrier = TraceCarrier::new();
        carrier.set(TRACESTATE, String::new());
        carrier.set(TRACEPARENT, "00-abc".to_string());

        assert_eq!(carrier.len(), 1);
        assert_eq!(Extractor::keys(&carrier), vec![TRACEPARENT]);
    }

    #[test]
    fn test_into_meta() {
        let mut carrier = TraceCarrier::new();
        carrier.set(BAGGAGE, "k=v".to_string());

        let meta = carrier.into_meta();
        assert_eq!(meta.get(BAGGAGE), Some(&json!("k=v")));
        assert_eq!(meta.len(), 1);
    }
}
