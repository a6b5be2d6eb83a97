//! A one-shot application runner: executes named jobs to completion, then runs cleanup.
//!
//! The runner provides:
//! - Concurrent execution of every registered job, waiting for all of them
//! - Interruption on SIGTERM/SIGINT (remaining jobs are aborted)
//! - Configurable cleanup timeout
//! - Automatic cleanup execution regardless of job outcome
//! - A process exit code reflecting the outcome
//!
//! # Example
//!
//! ```no_run
//! use blobfleet_runner::Runner;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> std::process::ExitCode {
//!     Runner::new()
//!         .with_job("seed", |_ctx| async move {
//!             tracing::info!("Seeding...");
//!             Ok(())
//!         })
//!         .with_closer(|| async move {
//!             tracing::info!("Flushing telemetry");
//!             Ok(())
//!         })
//!         .with_closer_timeout(Duration::from_secs(5))
//!         .run()
//!         .await
//! }
//! ```

use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::process::ExitCode;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Exit status used when the run was interrupted by a signal.
const INTERRUPTED_EXIT_CODE: u8 = 130;

/// Type alias for a job function.
/// Takes a cancellation token and returns a future that resolves to Result<(), anyhow::Error>
pub type Job = Box<
    dyn FnOnce(CancellationToken) -> Pin<Box<dyn Future<Output = Result<(), anyhow::Error>> + Send>>
        + Send,
>;

/// Type alias for a closer function.
/// Returns a future that resolves to Result<(), anyhow::Error>
pub type Closer =
    Box<dyn FnOnce() -> Pin<Box<dyn Future<Output = Result<(), anyhow::Error>> + Send>> + Send>;

/// What happened to the jobs of one run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    /// Names of jobs that returned an error or panicked
    pub failed_jobs: Vec<String>,
    /// Whether the run was cut short by a shutdown signal or cancellation
    pub interrupted: bool,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        self.failed_jobs.is_empty() && !self.interrupted
    }

    /// Numeric process status: 0 on success, 1 on job failure, 130 when interrupted
    pub fn exit_status(&self) -> u8 {
        if self.interrupted {
            INTERRUPTED_EXIT_CODE
        } else if self.failed_jobs.is_empty() {
            0
        } else {
            1
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.exit_status())
    }
}

/// A one-shot runner for jobs that run to completion.
///
/// Unlike a service supervisor, a failing job does not stop the others: every job is
/// awaited, and the combined outcome decides the exit code. Only a shutdown signal (or
/// cancelling the runner's token) aborts jobs still in flight.
pub struct Runner {
    jobs: Vec<(String, Job)>,
    closers: Vec<Closer>,
    closer_timeout: Duration,
    cancellation_token: CancellationToken,
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}

impl Runner {
    /// Creates a new Runner with default configuration.
    ///
    /// Default settings:
    /// - Closer timeout: 10 seconds
    /// - No jobs or closers
    pub fn new() -> Self {
        Self {
            jobs: Vec::new(),
            closers: Vec::new(),
            closer_timeout: Duration::from_secs(10),
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Adds a named job to the runner.
    ///
    /// The job receives the runner's cancellation token, which fires when a shutdown
    /// signal arrives.
    pub fn with_job<F, Fut>(mut self, name: impl Into<String>, job: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), anyhow::Error>> + Send + 'static,
    {
        self.jobs
            .push((name.into(), Box::new(|token| Box::pin(job(token)))));
        self
    }

    /// Adds a closer to the runner.
    ///
    /// Closers are executed after all jobs have stopped, regardless of outcome.
    /// All closers will attempt to execute even if some fail.
    pub fn with_closer<F, Fut>(mut self, closer: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), anyhow::Error>> + Send + 'static,
    {
        self.closers.push(Box::new(|| Box::pin(closer())));
        self
    }

    /// Sets the timeout for executing closers. Default is 10 seconds.
    pub fn with_closer_timeout(mut self, timeout: Duration) -> Self {
        self.closer_timeout = timeout;
        self
    }

    /// Sets a custom cancellation token, allowing external interruption of the run.
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = token;
        self
    }

    /// Runs all jobs and closers, returning the exit code for the process.
    pub async fn run(self) -> ExitCode {
        let outcome = self.execute().await;

        if outcome.interrupted {
            tracing::warn!("Application interrupted before jobs completed");
        } else if outcome.is_success() {
            tracing::info!("Application exiting normally");
        } else {
            tracing::error!(
                failed_jobs = ?outcome.failed_jobs,
                "Application exiting with error"
            );
        }

        outcome.exit_code()
    }

    /// Runs all jobs to completion (or interruption), then the closers.
    ///
    /// This method:
    /// 1. Spawns all jobs concurrently
    /// 2. Monitors for SIGTERM/SIGINT signals
    /// 3. Waits for every job, recording failures without cancelling the others
    /// 4. On interruption, aborts the jobs still running
    /// 5. Executes all closers with the configured timeout
    pub async fn execute(self) -> RunOutcome {
        let token = self.cancellation_token;
        let closer_timeout = self.closer_timeout;
        let closers = self.closers;
        let mut outcome = RunOutcome::default();

        Self::spawn_signal_handlers(&token);

        let mut join_set = JoinSet::new();
        for (name, job) in self.jobs {
            let job_token = token.clone();
            join_set.spawn(async move {
                let result = AssertUnwindSafe(job(job_token)).catch_unwind().await;
                (name, result)
            });
        }

        loop {
            tokio::select! {
                // Cancellation wins over jobs that finish because they saw it
                biased;
                _ = token.cancelled() => {
                    outcome.interrupted = true;
                    break;
                }
                joined = join_set.join_next() => match joined {
                    None => break,
                    Some(Ok((name, Ok(Ok(()))))) => {
                        tracing::debug!(job = %name, "Job completed successfully");
                    }
                    Some(Ok((name, Ok(Err(err))))) => {
                        tracing::error!(job = %name, "Job failed: {:#}", err);
                        outcome.failed_jobs.push(name);
                    }
                    Some(Ok((name, Err(_)))) => {
                        tracing::error!(job = %name, "Job panicked");
                        outcome.failed_jobs.push(name);
                    }
                    Some(Err(err)) => {
                        tracing::error!("Job task could not be joined: {}", err);
                        outcome.failed_jobs.push("unknown".to_string());
                    }
                },
            }
        }

        // A job may observe the token and finish before the loop does
        if token.is_cancelled() {
            outcome.interrupted = true;
        }

        // Abort whatever is still running after an interruption
        join_set.shutdown().await;

        if !closers.is_empty() {
            tracing::info!("Running closers with timeout of {:?}", closer_timeout);

            match tokio::time::timeout(closer_timeout, Self::run_closers(closers)).await {
                Ok(()) => tracing::info!("All closers completed"),
                Err(_) => tracing::error!("Closers timed out after {:?}", closer_timeout),
            }
        }

        outcome
    }

    fn spawn_signal_handlers(token: &CancellationToken) {
        let signal_token = token.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("Received shutdown signal");
                    signal_token.cancel();
                }
                Err(err) => {
                    tracing::error!("Error setting up signal handler: {}", err);
                }
            }
        });

        #[cfg(unix)]
        {
            let sigterm_token = token.clone();
            tokio::spawn(async move {
                use tokio::signal::unix::{signal, SignalKind};
                match signal(SignalKind::terminate()) {
                    Ok(mut sigterm) => {
                        sigterm.recv().await;
                        tracing::info!("Received SIGTERM signal");
                        sigterm_token.cancel();
                    }
                    Err(err) => {
                        tracing::error!("Error setting up SIGTERM handler: {}", err);
                    }
                }
            });
        }
    }

    /// Runs all closers concurrently.
    async fn run_closers(closers: Vec<Closer>) {
        let mut closer_set = JoinSet::new();

        for closer in closers {
            closer_set.spawn(closer());
        }

        while let Some(result) = closer_set.join_next().await {
            match result {
                Ok(Ok(())) => {
                    tracing::debug!("Closer completed successfully");
                }
                Ok(Err(err)) => {
                    tracing::error!("Closer error: {:#}", err);
                }
                Err(err) => {
                    tracing::error!("Closer panicked: {}", err);
                }
            }
        }
    }
}
