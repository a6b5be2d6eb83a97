use crate::domain::{DayPartitionPlanner, TimeSeriesEncoder};
use anyhow::Context;
use chrono::{DateTime, Utc};
use common::domain::{
    BlobKey, DeviceIdentity, DomainError, DomainResult, NamespaceStore, Parameter, SensorLocation,
};
use rand::seq::SliceRandom;
use rand::Rng;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Result of one device's completed history synthesis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceOutcome {
    pub device: DeviceIdentity,
    pub location: SensorLocation,
    pub parameter: Parameter,
    pub blobs_written: usize,
}

/// Per-device orchestration: one sensor, one parameter, one blob per day.
///
/// Flow:
/// 1. Draw a SensorLocation and pick a Parameter
/// 2. Plan the day windows of the lookback period ending at `now`
/// 3. For each day, in order: encode the day and overwrite its blob
///
/// The first failed write ends the workflow with that error; there is no retry.
pub struct DeviceWorkflow {
    store: Arc<dyn NamespaceStore>,
    encoder: TimeSeriesEncoder,
    lookback_days: u32,
    parameters: Vec<Parameter>,
}

impl DeviceWorkflow {
    pub fn new(
        store: Arc<dyn NamespaceStore>,
        lookback_days: u32,
        parameters: Vec<Parameter>,
    ) -> DomainResult<Self> {
        if parameters.is_empty() {
            return Err(DomainError::InvalidConfig(
                "at least one parameter is required".to_string(),
            ));
        }

        Ok(Self {
            store,
            encoder: TimeSeriesEncoder::new(),
            lookback_days,
            parameters,
        })
    }

    /// Populate the namespace of `device` with its synthetic history.
    ///
    /// `rng` is the workflow's own entropy source; it is never shared with other devices.
    #[instrument(skip(self, rng), fields(device_id = %device))]
    pub async fn run<R: Rng + Send + ?Sized>(
        &self,
        device: &DeviceIdentity,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> DomainResult<DeviceOutcome> {
        let location = SensorLocation::generate(rng);
        let parameter = self
            .parameters
            .choose(rng)
            .cloned()
            .unwrap_or_default();

        let planner = DayPartitionPlanner::for_lookback(now, self.lookback_days);
        debug!(
            location = %location,
            parameter = %parameter,
            days = planner.len(),
            "generating device history"
        );

        let mut blobs_written = 0;
        for day in planner.days() {
            let key = BlobKey::new(&location, &parameter, day.day()).to_string();
            let payload = self.encoder.encode(day.start, day.end, rng);
            let size_bytes = payload.len();

            self.store
                .write_blob(device.as_str(), &key, payload)
                .await
                .with_context(|| format!("failed to write blob {}", key))?;

            blobs_written += 1;
            debug!(key = %key, size_bytes, "wrote day blob");
        }

        info!(blobs_written, "device history complete");

        Ok(DeviceOutcome {
            device: device.clone(),
            location,
            parameter,
            blobs_written,
        })
    }
}
