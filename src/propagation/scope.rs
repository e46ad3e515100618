//! Context-scoped execution of tool callables
//!
//! Wrapping a callable makes every invocation run with the trace context
//! found in its `_meta` argument as the ambient context. The previous
//! context is restored on every exit path:
//!
//! - blocking callables hold an attach guard for the duration of the call,
//!   so return, error and unwinding all restore it;
//! - asynchronous callables have the context attached around each poll of
//!   their future only, so completion, error and cancellation (dropping the
//!   future) leave nothing attached, and concurrent tasks never observe each
//!   other's context.
//!
//! The arguments are handed to the wrapped callable unchanged, `_meta`
//! included.

use std::future::Future;

use opentelemetry::trace::{FutureExt, WithContext};
use opentelemetry::Context;
use serde_json::Value;

use super::ambient;
use super::carrier::{JsonObject, META_KEY};
use super::meta::MetaPropagator;

/// Call arguments that may carry a `_meta` side channel
pub trait MetaSource {
    /// The `_meta` object, if present and an object
    fn meta(&self) -> Option<&JsonObject>;
}

impl MetaSource for JsonObject {
    fn meta(&self) -> Option<&JsonObject> {
        self.get(META_KEY).and_then(Value::as_object)
    }
}

impl MetaSource for Value {
    fn meta(&self) -> Option<&JsonObject> {
        self.as_object().and_then(MetaSource::meta)
    }
}

impl<T: MetaSource> MetaSource for Option<T> {
    fn meta(&self) -> Option<&JsonObject> {
        self.as_ref().and_then(MetaSource::meta)
    }
}

impl<T: MetaSource + ?Sized> MetaSource for &T {
    fn meta(&self) -> Option<&JsonObject> {
        (**self).meta()
    }
}

/// Run `f(args)` with the context from `args`' `_meta` attached
pub fn in_meta_scope<A, T, F>(propagator: &MetaPropagator, args: A, f: F) -> T
where
    A: MetaSource,
    F: FnOnce(A) -> T,
{
    let cx = propagator.extract(args.meta());
    in_context(cx, move || f(args))
}

/// Build the future returned by `f(args)` so that it is polled inside the
/// context from `args`' `_meta`
///
/// The future is also created with that context attached, so any work `f`
/// does before its first suspension point sees it too.
pub fn in_meta_scope_async<A, Fut, F>(propagator: &MetaPropagator, args: A, f: F) -> WithContext<Fut>
where
    A: MetaSource,
    F: FnOnce(A) -> Fut,
    Fut: Future,
{
    let cx = propagator.extract(args.meta());
    in_context_async(cx, move || f(args))
}

/// Run `f` with `cx` as the ambient context, restoring the previous one after
pub fn in_context<T, F>(cx: Context, f: F) -> T
where
    F: FnOnce() -> T,
{
    let _token = ambient::attach(cx);
    f()
}

/// Create the future from `f` and bind it to `cx` for every poll
pub fn in_context_async<Fut, F>(cx: Context, f: F) -> WithContext<Fut>
where
    F: FnOnce() -> Fut,
    Fut: Future,
{
    let fut = {
        let _token = ambient::attach(cx.clone());
        f()
    };
    fut.with_context(cx)
}

/// A blocking callable wrapped with `_meta` context scoping
#[derive(Debug, Clone)]
pub struct ScopedFn<F> {
    inner: F,
    propagator: MetaPropagator,
}

impl<F> ScopedFn<F> {
    /// Wrap `inner` using the global propagator
    pub fn new(inner: F) -> Self {
        Self::with_propagator(inner, MetaPropagator::global())
    }

    /// Wrap `inner` using an explicit propagator
    pub fn with_propagator(inner: F, propagator: MetaPropagator) -> Self {
        Self { inner, propagator }
    }

    /// Invoke the wrapped callable
    pub fn call<A, T>(&self, args: A) -> T
    where
        A: MetaSource,
        F: Fn(A) -> T,
    {
        in_meta_scope(&self.propagator, args, &self.inner)
    }

    /// Unwrap the callable
    pub fn into_inner(self) -> F {
        self.inner
    }
}

/// An asynchronous callable wrapped with `_meta` context scoping
#[derive(Debug, Clone)]
pub struct ScopedAsyncFn<F> {
    inner: F,
    propagator: MetaPropagator,
}

impl<F> ScopedAsyncFn<F> {
    /// Wrap `inner` using the global propagator
    pub fn new(inner: F) -> Self {
        Self::with_propagator(inner, MetaPropagator::global())
    }

    /// Wrap `inner` using an explicit propagator
    pub fn with_propagator(inner: F, propagator: MetaPropagator) -> Self {
        Self { inner, propagator }
    }

    /// Invoke the wrapped callable; the returned future must be awaited
    pub fn call<A, Fut>(&self, args: A) -> WithContext<Fut>
    where
        A: MetaSource,
        F: Fn(A) -> Fut,
        Fut: Future,
    {
        in_meta_scope_async(&self.propagator, args, &self.inner)
    }

    /// Unwrap the callable
    pub fn into_inner(self) -> F {
        self.inner
    }
}

/// Wrap a blocking callable so it runs inside the context from `_meta`
pub fn with_otel_context_from_meta<F>(f: F) -> ScopedFn<F> {
    ScopedFn::new(f)
}

/// Wrap an asynchronous callable so its future runs inside the context from `_meta`
pub fn with_otel_context_from_meta_async<F>(f: F) -> ScopedAsyncFn<F> {
    ScopedAsyncFn::new(f)
}

/// Context a call with these arguments would run under
pub fn context_for(propagator: &MetaPropagator, args: &impl MetaSource) -> Context {
    propagator.extract(args.meta())
}
