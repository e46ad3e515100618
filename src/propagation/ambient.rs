//! Ambient trace context boundary
//!
//! This is the only module that reads or mutates the implicit, thread-local
//! OpenTelemetry context. Everything else in the crate passes [`Context`]
//! values explicitly and goes through these functions when the ambient
//! context has to change.
//!
//! Attach returns a [`ContextToken`]; detaching (explicitly or by dropping the
//! token) restores the context that was current before the attach. Tokens
//! must be released in reverse order of acquisition, which scoped usage
//! guarantees.

use opentelemetry::trace::TraceContextExt;
use opentelemetry::{Context, ContextGuard};

/// Restore point returned by [`attach`]
#[must_use = "dropping the token immediately detaches the context"]
pub struct ContextToken {
    _guard: ContextGuard,
}

impl std::fmt::Debug for ContextToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextToken").finish_non_exhaustive()
    }
}

/// Get the current ambient context
pub fn current() -> Context {
    Context::current()
}

/// Make `cx` the ambient context until the returned token is detached
pub fn attach(cx: Context) -> ContextToken {
    ContextToken {
        _guard: cx.attach(),
    }
}

/// Restore the context that was active before the matching [`attach`]
pub fn detach(token: ContextToken) {
    drop(token);
}

/// Whether the ambient context carries a valid span context
pub fn has_valid_span() -> bool {
    Context::current().span().span_context().is_valid()
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::trace::{SpanContext, SpanId, TraceFlags, TraceId, TraceState};

    fn remote(trace: u128, span: u64) -> Context {
        Context::new().with_remote_span_context(SpanContext::new(
            TraceId::from_bytes(trace.to_be_bytes()),
            SpanId::from_bytes(span.to_be_bytes()),
            TraceFlags::SAMPLED,
            true,
            TraceState::default(),
        ))
    }

    fn current_trace_id() -> TraceId {
        current().span().span_context().trace_id()
    }

    #[test]
    fn test_attach_detach_restores() {
        assert!(!has_valid_span());

        let token = attach(remote(1, 1));
        assert_eq!(current_trace_id(), TraceId::from_bytes(1u128.to_be_bytes()));
        detach(token);

        assert!(!has_valid_span());
    }

    #[test]
    fn test_nested_attach_is_lifo() {
        let outer = attach(remote(1, 1));
        let inner = attach(remote(2, 2));
        assert_eq!(current_trace_id(), TraceId::from_bytes(2u128.to_be_bytes()));

        detach(inner);
        assert_eq!(current_trace_id(), TraceId::from_bytes(1u128.to_be_bytes()));

        detach(outer);
        assert!(!has_valid_span());
    }
}
