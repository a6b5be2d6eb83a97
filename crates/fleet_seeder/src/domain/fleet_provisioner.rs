use crate::domain::{
    DeviceFailure, DeviceWorkflow, FleetReport, Phase, PhaseTiming, PopulationReport, RunReporter,
};
use anyhow::Context;
use chrono::{DateTime, Utc};
use common::domain::{DeviceIdentity, DomainError, DomainResult, NamespaceStore, Parameter};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, instrument, warn};

/// Default number of simulated edge devices
pub const DEFAULT_FLEET_SIZE: usize = 1000;

/// Default history depth: five 365-day years
pub const DEFAULT_LOOKBACK_DAYS: u32 = 5 * 365;

#[derive(Debug, Clone)]
pub struct FleetProvisionerConfig {
    pub fleet_size: usize,
    pub lookback_days: u32,
    pub parameters: Vec<Parameter>,
    /// Cap on device workflows in flight; `None` launches every device at once
    pub max_concurrent_devices: Option<usize>,
    /// Seed for per-device random sources; `None` draws each from OS entropy
    pub seed: Option<u64>,
}

impl Default for FleetProvisionerConfig {
    fn default() -> Self {
        Self {
            fleet_size: DEFAULT_FLEET_SIZE,
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            parameters: vec![Parameter::default()],
            max_concurrent_devices: None,
            seed: None,
        }
    }
}

/// Orchestrates a fleet run: cleanup, creation, then population.
///
/// Cleanup and creation stop at the first storage error. Population launches one
/// [`DeviceWorkflow`] per device, waits for all of them whatever their outcome, and
/// reports failures per device.
pub struct FleetProvisioner {
    store: Arc<dyn NamespaceStore>,
    workflow: Arc<DeviceWorkflow>,
    config: FleetProvisionerConfig,
}

impl FleetProvisioner {
    pub fn new(
        store: Arc<dyn NamespaceStore>,
        config: FleetProvisionerConfig,
    ) -> DomainResult<Self> {
        if config.lookback_days == 0 {
            return Err(DomainError::InvalidConfig(
                "lookback_days must be greater than zero".to_string(),
            ));
        }
        if config.max_concurrent_devices == Some(0) {
            return Err(DomainError::InvalidConfig(
                "max_concurrent_devices must be greater than zero when set".to_string(),
            ));
        }

        let workflow = Arc::new(DeviceWorkflow::new(
            store.clone(),
            config.lookback_days,
            config.parameters.clone(),
        )?);

        Ok(Self {
            store,
            workflow,
            config,
        })
    }

    /// Run all three phases with history anchored at `now`.
    #[instrument(skip(self), fields(fleet_size = self.config.fleet_size))]
    pub async fn run(&self, now: DateTime<Utc>) -> DomainResult<FleetReport> {
        let (deleted, cleanup) = self.cleanup().await?;
        let (devices, creation) = self.create(&deleted).await?;
        let (population_report, population) = self.populate(&devices, now).await;

        Ok(FleetReport {
            cleanup,
            creation,
            population,
            devices: population_report,
        })
    }

    /// Delete every existing namespace, returning the deleted names.
    pub async fn cleanup(&self) -> DomainResult<(HashSet<String>, PhaseTiming)> {
        let reporter = RunReporter::start();
        info!("cleaning up existing namespaces");

        let namespaces = self
            .store
            .list_namespaces()
            .await
            .context("failed to list namespaces")?;

        let mut deleted = HashSet::with_capacity(namespaces.len());
        for namespace in namespaces {
            self.store
                .delete_namespace(&namespace.name)
                .await
                .with_context(|| format!("failed to delete namespace {}", namespace.name))?;
            debug!(namespace = %namespace.name, "deleted namespace");
            deleted.insert(namespace.name);
        }

        let timing = reporter.finish(Phase::Cleanup, deleted.len());
        Ok((deleted, timing))
    }

    /// Generate the fleet's identities and create one namespace per device, one at a time.
    ///
    /// Identities never repeat within the run and never reuse a name in `taken`.
    pub async fn create(
        &self,
        taken: &HashSet<String>,
    ) -> DomainResult<(Vec<DeviceIdentity>, PhaseTiming)> {
        let reporter = RunReporter::start();
        info!(fleet_size = self.config.fleet_size, "creating namespaces");

        let devices = generate_identities(self.config.fleet_size, taken);
        for device in &devices {
            self.store
                .create_namespace(device.as_str())
                .await
                .with_context(|| format!("failed to create namespace {}", device))?;
            debug!(device_id = %device, "created namespace");
        }

        let timing = reporter.finish(Phase::Creation, devices.len());
        Ok((devices, timing))
    }

    /// Launch one workflow per device and wait for every one to finish.
    pub async fn populate(
        &self,
        devices: &[DeviceIdentity],
        now: DateTime<Utc>,
    ) -> (PopulationReport, PhaseTiming) {
        let reporter = RunReporter::start();
        info!(
            devices = devices.len(),
            max_concurrent_devices = ?self.config.max_concurrent_devices,
            "populating device history"
        );

        let semaphore = self
            .config
            .max_concurrent_devices
            .map(|limit| Arc::new(Semaphore::new(limit)));

        let mut join_set = JoinSet::new();
        let mut devices_by_task = HashMap::with_capacity(devices.len());
        for (index, device) in devices.iter().enumerate() {
            let workflow = Arc::clone(&self.workflow);
            let semaphore = semaphore.clone();
            let mut rng = self.device_rng(index);
            let task_device = device.clone();

            let handle = join_set.spawn(async move {
                // The semaphore is never closed
                let _permit = match semaphore {
                    Some(semaphore) => semaphore.acquire_owned().await.ok(),
                    None => None,
                };
                workflow.run(&task_device, now, &mut rng).await
            });
            devices_by_task.insert(handle.id(), device.clone());
        }

        let mut report = PopulationReport::default();
        while let Some(joined) = join_set.join_next_with_id().await {
            let (task_id, result) = match joined {
                Ok((task_id, result)) => (task_id, result),
                Err(join_err) => (join_err.id(), Err(join_error_to_domain(join_err))),
            };

            match (devices_by_task.remove(&task_id), result) {
                (_, Ok(outcome)) => report.succeeded.push(outcome),
                (Some(device), Err(err)) => {
                    warn!(device_id = %device, error = %err, "device workflow failed");
                    report.failed.push(DeviceFailure { device, error: err });
                }
                (None, Err(err)) => {
                    error!(error = %err, "finished task does not belong to any device");
                }
            }
        }

        if !report.failed.is_empty() {
            warn!(
                failed = report.failed.len(),
                succeeded = report.succeeded.len(),
                "population finished with failures"
            );
        }

        let timing = reporter.finish(Phase::Population, devices.len());
        (report, timing)
    }

    fn device_rng(&self, index: usize) -> StdRng {
        match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(index as u64)),
            None => StdRng::from_entropy(),
        }
    }
}

fn join_error_to_domain(join_err: JoinError) -> DomainError {
    if join_err.is_panic() {
        DomainError::WorkflowPanicked(panic_message(join_err.into_panic().as_ref()))
    } else {
        DomainError::WorkflowAborted(join_err.to_string())
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn generate_identities(count: usize, taken: &HashSet<String>) -> Vec<DeviceIdentity> {
    let mut seen = HashSet::with_capacity(count);
    let mut devices = Vec::with_capacity(count);
    while devices.len() < count {
        let device = DeviceIdentity::generate();
        if taken.contains(device.as_str()) || !seen.insert(device.clone()) {
            continue;
        }
        devices.push(device);
    }
    devices
}
