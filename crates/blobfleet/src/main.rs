mod config;

use blobfleet_runner::Runner;
use common::domain::{InMemoryNamespaceStore, NamespaceStore};
use common::nats::NatsClient;
use common::telemetry::{init_telemetry, shutdown_telemetry, TelemetryConfig, TelemetryProviders};
use config::{ServiceConfig, StorageBackend};
use fleet_seeder::{FleetSeeder, FleetSeederConfig};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match ServiceConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Initialize telemetry (tracing + OpenTelemetry for traces and logs)
    let telemetry_config = TelemetryConfig {
        service_name: config.otel_service_name.clone(),
        otel_endpoint: config.otel_endpoint.clone(),
        otel_enabled: config.otel_enabled,
        log_level: config.log_level.clone(),
        run_attributes: Vec::new(),
    }
    .with_run_attribute("storage_backend", config.storage_backend)
    .with_run_attribute("fleet_size", config.fleet_size)
    .with_run_attribute("lookback_days", config.lookback_days)
    .with_run_attribute("parameters", &config.parameters);

    let telemetry_providers: Option<TelemetryProviders> = match init_telemetry(&telemetry_config) {
        Ok(providers) => providers,
        Err(e) => {
            eprintln!("Failed to initialize telemetry: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!(
        storage_backend = ?config.storage_backend,
        fleet_size = config.fleet_size,
        lookback_days = config.lookback_days,
        otel_enabled = config.otel_enabled,
        "Starting blobfleet"
    );
    debug!("Configuration: {:?}", config);

    let (store, nats_client) = match initialize_store(&config).await {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to initialize storage: {:#}", e);
            shutdown_telemetry(telemetry_providers);
            return ExitCode::FAILURE;
        }
    };

    let seeder = match FleetSeeder::new(
        store,
        FleetSeederConfig {
            fleet_size: config.fleet_size,
            lookback_days: config.lookback_days,
            parameters: config.parameter_names(),
            max_concurrent_devices: config.concurrency_limit(),
        },
    ) {
        Ok(seeder) => seeder,
        Err(e) => {
            error!("Invalid fleet configuration: {}", e);
            shutdown_telemetry(telemetry_providers);
            return ExitCode::FAILURE;
        }
    };

    let mut runner = Runner::new()
        .with_job("fleet_seeder", seeder.into_runner_process())
        .with_closer_timeout(Duration::from_secs(config.closer_timeout_secs));

    if let Some(client) = nats_client {
        runner = runner.with_closer(move || async move { client.close().await });
    }

    runner
        .with_closer(move || async move {
            info!("Flushing telemetry");
            shutdown_telemetry(telemetry_providers);
            Ok(())
        })
        .run()
        .await
}

async fn initialize_store(
    config: &ServiceConfig,
) -> anyhow::Result<(Arc<dyn NamespaceStore>, Option<NatsClient>)> {
    match config.storage_backend {
        StorageBackend::Nats => {
            let client = NatsClient::connect(
                &config.nats_url,
                Duration::from_secs(config.startup_timeout_secs),
                config.nats_credentials_path.as_deref(),
            )
            .await?;
            let store = client.create_namespace_store();
            Ok((store, Some(client)))
        }
        StorageBackend::Memory => {
            info!("Using in-memory storage, nothing will persist after exit");
            Ok((Arc::new(InMemoryNamespaceStore::new()), None))
        }
    }
}
