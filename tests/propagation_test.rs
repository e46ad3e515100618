// Tests for `_meta` context extraction, injection and scoped execution
//
// Run with: cargo test --test propagation_test

#[cfg(test)]
mod tests {
    use anyhow::{anyhow, Result};
    use mcp_otel::propagation::{
        ambient, extract_context_from_meta, in_meta_scope, inject_context_to_meta, with_otel_context_from_meta,
        with_otel_context_from_meta_async, JsonObject, MetaPropagator, ScopedAsyncFn, ScopedFn, TRACEPARENT,
    };
    use opentelemetry::trace::{SpanContext, TraceContextExt};
    use serde_json::{json, Value};
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    const OUTER: &str = "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01";
    const INNER: &str = "00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01";
    const BASE: &str = "00-11111111111111111111111111111111-2222222222222222-01";

    fn object(value: Value) -> JsonObject {
        value.as_object().cloned().unwrap_or_default()
    }

    fn with_meta(traceparent: &str) -> JsonObject {
        object(json!({ "query": "x", "_meta": { "traceparent": traceparent } }))
    }

    fn current_span_context() -> SpanContext {
        ambient::current().span().span_context().clone()
    }

    fn current_traceparent() -> Option<String> {
        MetaPropagator::w3c()
            .inject()
            .get(TRACEPARENT)
            .map(str::to_string)
    }

    /// Attach a known base context so restoration is checked against something non-empty
    fn attach_base() -> ambient::ContextToken {
        let cx = MetaPropagator::w3c().extract(Some(&object(json!({ "traceparent": BASE }))));
        ambient::attach(cx)
    }

    #[test]
    fn test_round_trip_preserves_traceparent() {
        let propagator = MetaPropagator::w3c();
        for traceparent in [OUTER, INNER, BASE] {
            let cx = propagator.extract(Some(&object(json!({ "traceparent": traceparent }))));
            let token = ambient::attach(cx);
            assert_eq!(current_traceparent().as_deref(), Some(traceparent));
            ambient::detach(token);
        }
    }

    #[test]
    fn test_extract_without_meta_is_noop() {
        let _base = attach_base();
        let before = current_span_context();
        let propagator = MetaPropagator::w3c();

        let empty = JsonObject::new();
        for meta in [None, Some(&empty)] {
            let cx = propagator.extract(meta);
            assert_eq!(cx.span().span_context(), &before);
            assert_eq!(current_span_context(), before);
        }
    }

    #[test]
    fn test_inject_without_context_is_empty() {
        assert!(MetaPropagator::w3c().inject_meta().is_empty());
    }

    #[test]
    fn test_sync_error_restores_context_and_propagates() {
        let _base = attach_base();
        let before = current_span_context();

        let scoped = ScopedFn::with_propagator(
            |_args: JsonObject| -> Result<Value> {
                assert_eq!(current_traceparent().as_deref(), Some(OUTER));
                Err(anyhow!("search backend unavailable"))
            },
            MetaPropagator::w3c(),
        );

        let err = scoped.call(with_meta(OUTER)).unwrap_err();
        assert_eq!(err.to_string(), "search backend unavailable");
        assert_eq!(current_span_context(), before);
    }

    #[test]
    fn test_sync_panic_restores_context() {
        let _base = attach_base();
        let before = current_span_context();

        let scoped = ScopedFn::with_propagator(
            |_args: JsonObject| -> () { panic!("tool crashed") },
            MetaPropagator::w3c(),
        );

        let result = catch_unwind(AssertUnwindSafe(|| scoped.call(with_meta(OUTER))));
        assert!(result.is_err());
        assert_eq!(current_span_context(), before);
    }

    #[test]
    fn test_nested_calls_restore_in_lifo_order() {
        let _base = attach_base();
        let before = current_span_context();
        let propagator = MetaPropagator::w3c();

        let seen = in_meta_scope(&propagator, with_meta(OUTER), |_| {
            let mut seen = vec![current_traceparent()];
            seen.push(in_meta_scope(&propagator, with_meta(INNER), |_| current_traceparent()));
            seen.push(current_traceparent());
            seen
        });

        assert_eq!(
            seen,
            vec![
                Some(OUTER.to_string()),
                Some(INNER.to_string()),
                Some(OUTER.to_string())
            ]
        );
        assert_eq!(current_span_context(), before);
    }

    #[tokio::test]
    async fn test_async_error_restores_context() {
        let _base = attach_base();
        let before = current_span_context();

        let scoped = ScopedAsyncFn::with_propagator(
            |_args: JsonObject| async {
                tokio::task::yield_now().await;
                Err::<Value, _>(anyhow!("boom"))
            },
            MetaPropagator::w3c(),
        );

        let err = scoped.call(with_meta(OUTER)).await.unwrap_err();
        assert_eq!(err.to_string(), "boom");
        assert_eq!(current_span_context(), before);
    }

    #[tokio::test]
    async fn test_async_cancellation_restores_context() {
        let _base = attach_base();
        let before = current_span_context();
        let entered = Arc::new(AtomicBool::new(false));
        let flag = entered.clone();

        let scoped = ScopedAsyncFn::with_propagator(
            move |_args: JsonObject| {
                let flag = flag.clone();
                async move {
                    assert_eq!(current_traceparent().as_deref(), Some(OUTER));
                    flag.store(true, Ordering::SeqCst);
                    std::future::pending::<()>().await;
                }
            },
            MetaPropagator::w3c(),
        );

        let result = tokio::time::timeout(Duration::from_millis(20), scoped.call(with_meta(OUTER))).await;

        assert!(result.is_err(), "pending call should have been cancelled");
        assert!(entered.load(Ordering::SeqCst));
        assert_eq!(current_span_context(), before);
    }

    #[tokio::test]
    async fn test_nested_async_calls_restore_in_lifo_order() {
        let _base = attach_base();
        let before = current_span_context();

        let inner = Arc::new(ScopedAsyncFn::with_propagator(
            |_args: JsonObject| async {
                tokio::task::yield_now().await;
                current_traceparent()
            },
            MetaPropagator::w3c(),
        ));

        let outer = ScopedAsyncFn::with_propagator(
            move |_args: JsonObject| {
                let inner = inner.clone();
                async move {
                    let mut seen = vec![current_traceparent()];
                    seen.push(inner.call(with_meta(INNER)).await);
                    tokio::task::yield_now().await;
                    seen.push(current_traceparent());
                    seen
                }
            },
            MetaPropagator::w3c(),
        );

        let seen = outer.call(with_meta(OUTER)).await;

        assert_eq!(
            seen,
            vec![
                Some(OUTER.to_string()),
                Some(INNER.to_string()),
                Some(OUTER.to_string())
            ]
        );
        assert_eq!(current_span_context(), before);
    }

    #[tokio::test]
    async fn test_concurrent_tasks_see_their_own_context() {
        let scoped = ScopedAsyncFn::with_propagator(
            |args: JsonObject| async move {
                let expected = args["_meta"][TRACEPARENT].as_str().map(str::to_string);
                for _ in 0..5 {
                    assert_eq!(current_traceparent(), expected);
                    tokio::task::yield_now().await;
                }
                expected
            },
            MetaPropagator::w3c(),
        );

        // Both futures interleave on the same thread
        let (a, b) = tokio::join!(scoped.call(with_meta(OUTER)), scoped.call(with_meta(INNER)));

        assert_eq!(a.as_deref(), Some(OUTER));
        assert_eq!(b.as_deref(), Some(INNER));
        assert!(!ambient::has_valid_span());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_spawned_tasks_see_their_own_context() {
        let scoped = ScopedAsyncFn::with_propagator(
            |args: JsonObject| async move {
                let expected = args["_meta"][TRACEPARENT].as_str().map(str::to_string);
                for _ in 0..5 {
                    tokio::time::sleep(Duration::from_millis(1)).await;
                    assert_eq!(current_traceparent(), expected);
                }
            },
            MetaPropagator::w3c(),
        );

        let handles: Vec<_> = [OUTER, INNER, BASE]
            .into_iter()
            .map(|traceparent| tokio::spawn(scoped.call(with_meta(traceparent))))
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_global_propagator_entry_points() {
        mcp_otel::telemetry::install_propagator();

        let cx = extract_context_from_meta(Some(&object(json!({ "traceparent": OUTER }))));
        let token = ambient::attach(cx);
        assert_eq!(
            inject_context_to_meta().get(TRACEPARENT),
            Some(&json!(OUTER))
        );
        ambient::detach(token);
        assert!(inject_context_to_meta().is_empty());

        let search = with_otel_context_from_meta(|_args: JsonObject| current_traceparent());
        assert_eq!(search.call(with_meta(INNER)).as_deref(), Some(INNER));

        let search_async = with_otel_context_from_meta_async(|_args: JsonObject| async { current_traceparent() });
        assert_eq!(search_async.call(with_meta(OUTER)).await.as_deref(), Some(OUTER));
        assert!(!ambient::has_valid_span());
    }
}
