use anyhow::{Context, Result};
use opentelemetry::{trace::TracerProvider, KeyValue};
use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_otlp::{LogExporter, SpanExporter, WithExportConfig};
use opentelemetry_sdk::{
    logs::LoggerProvider,
    propagation::TraceContextPropagator,
    runtime,
    trace::{RandomIdGenerator, Sampler, TracerProvider as SdkTracerProvider},
    Resource,
};
use opentelemetry_semantic_conventions::resource::{SERVICE_NAME, SERVICE_VERSION};
use tracing_subscriber::{
    layer::SubscriberExt, registry::LookupSpan, util::SubscriberInitExt, EnvFilter, Layer,
};

use super::{TelemetryConfig, TelemetryProviders};

/// Instrumentation scope of every span the harness exports
const TRACER_NAME: &str = "blobfleet";

/// Initialize JSON logging, plus OTLP export of traces and logs when enabled.
///
/// `RUST_LOG` takes precedence over the configured log level.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<Option<TelemetryProviders>> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if !config.otel_enabled {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(json_fmt_layer())
            .init();
        return Ok(None);
    }

    opentelemetry::global::set_text_map_propagator(TraceContextPropagator::new());

    let resource = build_resource(config);
    let providers = build_providers(&config.otel_endpoint, resource)?;

    let tracer = providers.tracer_provider.tracer(TRACER_NAME);
    let otel_trace_layer = tracing_opentelemetry::layer().with_tracer(tracer);
    let otel_log_layer = OpenTelemetryTracingBridge::new(&providers.logger_provider);

    // otel_trace_layer must precede otel_log_layer so log records see the span context
    tracing_subscriber::registry()
        .with(env_filter)
        .with(otel_trace_layer)
        .with(otel_log_layer)
        .with(json_fmt_layer())
        .init();

    Ok(Some(providers))
}

/// JSON fmt layer, generic over the subscriber it is stacked on.
fn json_fmt_layer<S>() -> impl Layer<S>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    // Span list puts device_id on per-blob events
    tracing_subscriber::fmt::layer()
        .json()
        .with_span_list(true)
        .with_current_span(true)
}

/// Resource shared by traces and logs: service identity plus the run attributes.
fn build_resource(config: &TelemetryConfig) -> Resource {
    let mut attributes = vec![
        KeyValue::new(SERVICE_NAME, config.service_name.clone()),
        KeyValue::new(SERVICE_VERSION, env!("CARGO_PKG_VERSION")),
    ];
    attributes.extend(
        config
            .run_attributes
            .iter()
            .map(|(key, value)| KeyValue::new(key.clone(), value.clone())),
    );
    Resource::new(attributes)
}

fn build_providers(endpoint: &str, resource: Resource) -> Result<TelemetryProviders> {
    let trace_exporter = SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .with_context(|| format!("failed to build OTLP span exporter for {}", endpoint))?;

    let tracer_provider = SdkTracerProvider::builder()
        .with_batch_exporter(trace_exporter, runtime::Tokio)
        .with_sampler(Sampler::AlwaysOn)
        .with_id_generator(RandomIdGenerator::default())
        .with_resource(resource.clone())
        .build();

    let log_exporter = LogExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .with_context(|| format!("failed to build OTLP log exporter for {}", endpoint))?;

    let logger_provider = LoggerProvider::builder()
        .with_batch_exporter(log_exporter, runtime::Tokio)
        .with_resource(resource)
        .build();

    Ok(TelemetryProviders {
        tracer_provider,
        logger_provider,
    })
}

/// Flush and stop the OTLP providers, if any were started.
///
/// Runs as the last runner closer, so errors go to stderr rather than to tracing.
pub fn shutdown_telemetry(providers: Option<TelemetryProviders>) {
    let Some(providers) = providers else {
        return;
    };
    if let Err(e) = providers.tracer_provider.shutdown() {
        eprintln!("Error shutting down tracer provider: {:?}", e);
    }
    if let Err(e) = providers.logger_provider.shutdown() {
        eprintln!("Error shutting down logger provider: {:?}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::{Key, Value};

    #[test]
    fn test_telemetry_config_default() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "blobfleet");
        assert_eq!(config.otel_endpoint, "http://localhost:4317");
        assert!(!config.otel_enabled);
        assert_eq!(config.log_level, "info");
        assert!(config.run_attributes.is_empty());
    }

    #[test]
    fn test_run_attributes_are_prefixed() {
        let config = TelemetryConfig::default()
            .with_run_attribute("fleet_size", 25)
            .with_run_attribute("storage_backend", "memory");

        assert_eq!(
            config.run_attributes,
            vec![
                ("blobfleet.run.fleet_size".to_string(), "25".to_string()),
                ("blobfleet.run.storage_backend".to_string(), "memory".to_string()),
            ]
        );
    }

    #[test]
    fn test_resource_carries_service_and_run_attributes() {
        let config = TelemetryConfig {
            service_name: "blobfleet-ci".to_string(),
            ..Default::default()
        }
        .with_run_attribute("lookback_days", 1825);

        let resource = build_resource(&config);
        assert_eq!(
            resource.get(Key::new(SERVICE_NAME)),
            Some(Value::from("blobfleet-ci"))
        );
        assert_eq!(
            resource.get(Key::new("blobfleet.run.lookback_days")),
            Some(Value::from("1825"))
        );
        assert!(resource.get(Key::new(SERVICE_VERSION)).is_some());
    }

    #[test]
    fn test_shutdown_without_providers_is_noop() {
        shutdown_telemetry(None);
    }
}
