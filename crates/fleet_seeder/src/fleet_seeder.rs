use crate::domain::{FleetProvisioner, FleetProvisionerConfig, FleetReport};
use chrono::Utc;
use common::domain::{DomainError, DomainResult, NamespaceStore, Parameter};
use futures::future::BoxFuture;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub struct FleetSeederConfig {
    pub fleet_size: usize,
    pub lookback_days: u32,
    pub parameters: Vec<String>,
    /// `None` keeps the fan-out unbounded
    pub max_concurrent_devices: Option<usize>,
}

impl FleetSeederConfig {
    fn into_provisioner_config(self) -> DomainResult<FleetProvisionerConfig> {
        let parameters: Vec<Parameter> = self
            .parameters
            .iter()
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
            .map(Parameter::new)
            .collect();

        if parameters.is_empty() {
            return Err(DomainError::InvalidConfig(
                "at least one parameter name is required".to_string(),
            ));
        }

        Ok(FleetProvisionerConfig {
            fleet_size: self.fleet_size,
            lookback_days: self.lookback_days,
            parameters,
            max_concurrent_devices: self.max_concurrent_devices,
            seed: None,
        })
    }
}

/// Seeds a fleet of edge-device namespaces with synthetic history.
pub struct FleetSeeder {
    provisioner: FleetProvisioner,
}

impl FleetSeeder {
    pub fn new(store: Arc<dyn NamespaceStore>, config: FleetSeederConfig) -> DomainResult<Self> {
        info!(
            fleet_size = config.fleet_size,
            lookback_days = config.lookback_days,
            "Initializing fleet seeder"
        );

        let provisioner = FleetProvisioner::new(store, config.into_provisioner_config()?)?;
        Ok(Self { provisioner })
    }

    /// Run cleanup, creation and population with history ending now.
    pub async fn run(&self) -> DomainResult<FleetReport> {
        self.provisioner.run(Utc::now()).await
    }

    /// Runner job: seeds the fleet, prints the timing report, and fails if any device did.
    ///
    /// Cancellation abandons the run; device workflows are not told to stop early.
    pub fn into_runner_process(
        self,
    ) -> impl FnOnce(CancellationToken) -> BoxFuture<'static, anyhow::Result<()>> + Send + 'static
    {
        move |ctx| {
            Box::pin(async move {
                let report = tokio::select! {
                    report = self.run() => report?,
                    _ = ctx.cancelled() => {
                        warn!("Fleet seeding interrupted");
                        return Ok(());
                    }
                };

                println!("{}", report);
                report.ensure_success()?;
                Ok(())
            })
        }
    }
}
