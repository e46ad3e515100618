//! Extraction and injection of trace context through `_meta`

use std::fmt;
use std::sync::Arc;

use opentelemetry::global;
use opentelemetry::propagation::{TextMapCompositePropagator, TextMapPropagator};
use opentelemetry::Context;
use opentelemetry_sdk::propagation::{BaggagePropagator, TraceContextPropagator};

use super::ambient;
use super::carrier::{JsonObject, TraceCarrier};

type SharedPropagator = Arc<dyn TextMapPropagator + Send + Sync>;

/// Build the W3C Trace Context + Baggage propagator used for `_meta`
pub fn w3c_propagator() -> TextMapCompositePropagator {
    TextMapCompositePropagator::new(vec![
        Box::new(TraceContextPropagator::new()),
        Box::new(BaggagePropagator::new()),
    ])
}

/// Moves trace context between `_meta` objects and [`Context`] values
///
/// A `MetaPropagator` either owns an explicit propagation format or defers to
/// the process-global text-map propagator (see
/// [`install_propagator`](crate::telemetry::install_propagator)).
#[derive(Clone, Default)]
pub struct MetaPropagator {
    propagator: Option<SharedPropagator>,
}

impl MetaPropagator {
    /// Use the process-global propagator
    pub fn global() -> Self {
        Self { propagator: None }
    }

    /// Use W3C Trace Context + Baggage regardless of global configuration
    pub fn w3c() -> Self {
        Self::with_propagator(w3c_propagator())
    }

    /// Use an explicit propagation format
    pub fn with_propagator<P>(propagator: P) -> Self
    where
        P: TextMapPropagator + Send + Sync + 'static,
    {
        Self {
            propagator: Some(Arc::new(propagator)),
        }
    }

    /// Extract a context from an optional `_meta` object
    ///
    /// Absent or empty metadata, or metadata without any trace key, returns the
    /// current ambient context. Malformed values are handled by the propagation
    /// format, which falls back to the current context instead of failing.
    pub fn extract(&self, meta: Option<&JsonObject>) -> Context {
        self.extract_with_context(&ambient::current(), meta)
    }

    /// Like [`extract`](Self::extract) but relative to an explicit parent
    pub fn extract_with_context(&self, parent: &Context, meta: Option<&JsonObject>) -> Context {
        let meta = match meta {
            Some(meta) if !meta.is_empty() => meta,
            _ => return parent.clone(),
        };

        let carrier = TraceCarrier::from_meta(meta);
        if carrier.is_empty() {
            return parent.clone();
        }

        tracing::trace!(
            "[MetaPropagator] Extracting context from _meta keys {:?}",
            carrier.iter().map(|(k, _)| k).collect::<Vec<_>>()
        );

        match &self.propagator {
            Some(propagator) => propagator.extract_with_context(parent, &carrier),
            None => global::get_text_map_propagator(|propagator| {
                propagator.extract_with_context(parent, &carrier)
            }),
        }
    }

    /// Serialize the current ambient context into a fresh carrier
    pub fn inject(&self) -> TraceCarrier {
        self.inject_context(&ambient::current())
    }

    /// Serialize an explicit context into a fresh carrier
    pub fn inject_context(&self, cx: &Context) -> TraceCarrier {
        let mut carrier = TraceCarrier::new();
        match &self.propagator {
            Some(propagator) => propagator.inject_context(cx, &mut carrier),
            None => global::get_text_map_propagator(|propagator| {
                propagator.inject_context(cx, &mut carrier)
            }),
        }
        carrier
    }

    /// Serialize the current ambient context as a `_meta` object
    pub fn inject_meta(&self) -> JsonObject {
        self.inject().into_meta()
    }
}

impl fmt::Debug for MetaPropagator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.propagator {
            Some(propagator) => f
                .debug_struct("MetaPropagator")
                .field("propagator", propagator)
                .finish(),
            None => f.write_str("MetaPropagator(global)"),
        }
    }
}

/// Extract a context from `_meta` using the global propagator
pub fn extract_context_from_meta(meta: Option<&JsonObject>) -> Context {
    MetaPropagator::global().extract(meta)
}

/// Inject the current context into a `_meta` object using the global propagator
pub fn inject_context_to_meta() -> JsonObject {
    MetaPropagator::global().inject_meta()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::propagation::carrier::{BAGGAGE, TRACEPARENT};
    use opentelemetry::baggage::BaggageExt;
    use opentelemetry::trace::TraceContextExt;
    use serde_json::json;

    const PARENT: &str = "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01";

    fn meta(value: serde_json::Value) -> JsonObject {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_extract_none_is_identity() {
        let propagator = MetaPropagator::w3c();
        let cx = propagator.extract(None);
        assert!(!cx.span().span_context().is_valid());

        let cx = propagator.extract(Some(&JsonObject::new()));
        assert!(!cx.span().span_context().is_valid());
    }

    #[test]
    fn test_extract_ignores_unrelated_keys() {
        let propagator = MetaPropagator::w3c();
        let cx = propagator.extract(Some(&meta(json!({ "progressToken": "abc" }))));
        assert!(!cx.span().span_context().is_valid());
    }

    #[test]
    fn test_extract_traceparent() {
        let propagator = MetaPropagator::w3c();
        let cx = propagator.extract(Some(&meta(json!({ "traceparent": PARENT }))));

        let span = cx.span();
        let sc = span.span_context();
        assert!(sc.is_valid());
        assert!(sc.is_remote());
        assert_eq!(sc.trace_id().to_string(), "4bf92f3577b34da6a3ce929d0e0e4736");
        assert_eq!(sc.span_id().to_string(), "00f067aa0ba902b7");
    }

    #[test]
    fn test_extract_garbage_falls_back() {
        let propagator = MetaPropagator::w3c();
        for bad in ["", "garbage", "00-zz-yy-01", "00-00000000000000000000000000000000-00f067aa0ba902b7-01"] {
            let cx = propagator.extract(Some(&meta(json!({ "traceparent": bad }))));
            assert!(!cx.span().span_context().is_valid(), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_extract_baggage() {
        let propagator = MetaPropagator::w3c();
        let cx = propagator.extract(Some(&meta(json!({ "baggage": "user=alice" }))));
        assert_eq!(cx.baggage().get("user").map(|v| v.as_str().to_string()), Some("alice".to_string()));
    }

    #[test]
    fn test_inject_without_context_is_empty() {
        let propagator = MetaPropagator::w3c();
        assert!(propagator.inject_meta().is_empty());
    }

    #[test]
    fn test_round_trip_traceparent() {
        let propagator = MetaPropagator::w3c();
        let cx = propagator.extract(Some(&meta(json!({
            "traceparent": PARENT,
            "baggage": "user=alice"
        }))));

        let carrier = propagator.inject_context(&cx);
        assert_eq!(carrier.get(TRACEPARENT), Some(PARENT));
        assert_eq!(carrier.get(BAGGAGE), Some("user=alice"));
    }
}
