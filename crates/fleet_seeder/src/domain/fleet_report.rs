use crate::domain::{DeviceOutcome, PhaseTiming};
use common::domain::{DeviceIdentity, DomainError, DomainResult};
use std::fmt;

/// A device whose workflow ended in an error or a panic.
#[derive(Debug)]
pub struct DeviceFailure {
    pub device: DeviceIdentity,
    pub error: DomainError,
}

/// Per-device results of the population phase.
#[derive(Debug, Default)]
pub struct PopulationReport {
    pub succeeded: Vec<DeviceOutcome>,
    pub failed: Vec<DeviceFailure>,
}

impl PopulationReport {
    pub fn blobs_written(&self) -> usize {
        self.succeeded.iter().map(|o| o.blobs_written).sum()
    }

    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

/// Everything a fleet run produced, in the order the phases ran.
#[derive(Debug)]
pub struct FleetReport {
    pub cleanup: PhaseTiming,
    pub creation: PhaseTiming,
    pub population: PhaseTiming,
    pub devices: PopulationReport,
}

impl FleetReport {
    pub fn namespaces_deleted(&self) -> usize {
        self.cleanup.count
    }

    pub fn namespaces_created(&self) -> usize {
        self.creation.count
    }

    pub fn blobs_written(&self) -> usize {
        self.devices.blobs_written()
    }

    pub fn is_success(&self) -> bool {
        self.devices.failed.is_empty()
    }

    /// `Err(PopulationFailed)` when any device workflow failed.
    pub fn ensure_success(&self) -> DomainResult<()> {
        if self.is_success() {
            Ok(())
        } else {
            Err(DomainError::PopulationFailed {
                failed: self.devices.failed.len(),
                total: self.devices.total(),
            })
        }
    }
}

impl fmt::Display for FleetReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.cleanup)?;
        writeln!(f, "{}", self.creation)?;
        writeln!(f, "{}", self.population)?;
        write!(
            f,
            "Population summary: {} succeeded, {} failed, {} blobs written",
            self.devices.succeeded.len(),
            self.devices.failed.len(),
            self.blobs_written()
        )?;
        for failure in &self.devices.failed {
            write!(f, "\n  failed device {}: {}", failure.device, failure.error)?;
        }
        Ok(())
    }
}
