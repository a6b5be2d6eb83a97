use std::fmt;
use std::time::{Duration, Instant};
use tracing::info;

/// The three phases of a fleet run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Cleanup,
    Creation,
    Population,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Cleanup => "cleanup",
            Phase::Creation => "creation",
            Phase::Population => "population",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Elapsed wall-clock time of one completed phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTiming {
    pub phase: Phase,
    /// Namespaces deleted, namespaces created, or devices populated
    pub count: usize,
    pub elapsed: Duration,
}

impl fmt::Display for PhaseTiming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.phase {
            Phase::Cleanup => write!(
                f,
                "Cleanup of {} edge devices took {:?}",
                self.count, self.elapsed
            ),
            Phase::Creation => write!(
                f,
                "Creation of {} edge devices took {:?}",
                self.count, self.elapsed
            ),
            Phase::Population => write!(
                f,
                "Creation of {} edge devices data took {:?}",
                self.count, self.elapsed
            ),
        }
    }
}

/// Monotonic stopwatch for phase timing.
///
/// Each phase starts its own reporter and hands back a [`PhaseTiming`] when done;
/// no clock is shared between phases.
#[derive(Debug, Clone, Copy)]
pub struct RunReporter {
    started: Instant,
}

impl RunReporter {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Reset the stopwatch, returning the time elapsed before the reset.
    pub fn restart(&mut self) -> Duration {
        let now = Instant::now();
        let elapsed = now.duration_since(self.started);
        self.started = now;
        elapsed
    }

    /// Read the elapsed time for a finished phase and log it.
    pub fn finish(&self, phase: Phase, count: usize) -> PhaseTiming {
        let timing = PhaseTiming {
            phase,
            count,
            elapsed: self.elapsed(),
        };
        info!(
            phase = %phase,
            count,
            elapsed_ms = timing.elapsed.as_millis() as u64,
            "phase complete"
        );
        timing
    }
}
