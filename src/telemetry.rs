//! OpenTelemetry setup
//!
//! Installs the W3C propagator used for `_meta`, builds the tracer provider
//! (exporting over OTLP gRPC when an endpoint is configured) and wires
//! `tracing` spans into it.

use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::{self, TracerProvider};
use opentelemetry_sdk::Resource;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{LoggingConfig, TelemetryConfig};
use crate::error::{McpOtelError, Result};
use crate::logging;
use crate::propagation::w3c_propagator;

/// Install W3C Trace Context + Baggage as the global text-map propagator
///
/// The OpenTelemetry default is a no-op propagator, which would make every
/// `_meta` extraction and injection empty.
pub fn install_propagator() {
    global::set_text_map_propagator(w3c_propagator());
}

/// Build a tracer provider for `config`
///
/// With the SDK disabled or no endpoint configured the provider has no
/// exporter: spans still get valid IDs, so context propagates, but nothing
/// leaves the process.
pub fn build_tracer_provider(config: &TelemetryConfig) -> Result<TracerProvider> {
    let resource = Resource::new(vec![
        KeyValue::new("service.name", config.service_name.clone()),
        KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
    ]);

    match config.otlp_endpoint.as_deref() {
        Some(endpoint) if !config.sdk_disabled => opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(
                opentelemetry_otlp::new_exporter()
                    .tonic()
                    .with_endpoint(endpoint),
            )
            .with_trace_config(trace::Config::default().with_resource(resource))
            .install_batch(opentelemetry_sdk::runtime::Tokio)
            .map_err(|e| McpOtelError::Telemetry(e.to_string())),
        _ => Ok(TracerProvider::builder()
            .with_config(trace::Config::default().with_resource(resource))
            .build()),
    }
}

/// Handle that flushes and shuts down tracing on drop
pub struct TelemetryGuard {
    provider: TracerProvider,
}

impl TelemetryGuard {
    /// The installed tracer provider
    pub fn provider(&self) -> &TracerProvider {
        &self.provider
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        for result in self.provider.force_flush() {
            if let Err(e) = result {
                tracing::warn!("[telemetry] Flush failed: {}", e);
            }
        }
        global::shutdown_tracer_provider();
    }
}

/// Initialize propagation, tracing export and file logging
///
/// Must be called from within a Tokio runtime when an OTLP endpoint is set.
pub fn init_telemetry(telemetry: &TelemetryConfig, logging_config: &LoggingConfig) -> Result<TelemetryGuard> {
    install_propagator();

    let provider = build_tracer_provider(telemetry)?;
    global::set_tracer_provider(provider.clone());

    let tracer = provider.tracer(telemetry.service_name.clone());
    let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);

    let file_layer =
        logging::file_layer(logging_config).map_err(|e| McpOtelError::Telemetry(e.to_string()))?;

    tracing_subscriber::registry()
        .with(logging::env_filter(logging_config))
        .with(file_layer)
        .with(otel_layer)
        .try_init()
        .map_err(|e| McpOtelError::Telemetry(e.to_string()))?;

    tracing::info!(
        "[telemetry] Initialized for service '{}' (export: {})",
        telemetry.service_name,
        telemetry
            .otlp_endpoint
            .as_deref()
            .filter(|_| !telemetry.sdk_disabled)
            .unwrap_or("none")
    );

    Ok(TelemetryGuard { provider })
}
