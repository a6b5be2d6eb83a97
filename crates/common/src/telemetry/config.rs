use opentelemetry_sdk::{logs::LoggerProvider, trace::TracerProvider as SdkTracerProvider};

/// Prefix for run attributes attached to the exported resource
pub const RUN_ATTRIBUTE_PREFIX: &str = "blobfleet.run.";

/// Configuration for telemetry initialization
#[derive(Clone, Debug)]
pub struct TelemetryConfig {
    pub service_name: String,
    pub otel_endpoint: String,
    pub otel_enabled: bool,
    pub log_level: String,
    /// Shape of this run (fleet size, lookback, backend), exported as
    /// `blobfleet.run.<name>` resource attributes so traces of different runs can be told apart
    pub run_attributes: Vec<(String, String)>,
}

impl TelemetryConfig {
    pub fn with_run_attribute(mut self, name: &str, value: impl ToString) -> Self {
        self.run_attributes
            .push((format!("{}{}", RUN_ATTRIBUTE_PREFIX, name), value.to_string()));
        self
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "blobfleet".to_string(),
            otel_endpoint: "http://localhost:4317".to_string(),
            otel_enabled: false,
            log_level: "info".to_string(),
            run_attributes: Vec::new(),
        }
    }
}

/// OTLP providers kept alive until shutdown flushes them
pub struct TelemetryProviders {
    pub tracer_provider: SdkTracerProvider,
    pub logger_provider: LoggerProvider,
}
