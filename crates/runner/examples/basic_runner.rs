//! Basic example of using the blobfleet runner
//!
//! This example demonstrates:
//! - Running two jobs to completion, one of which fails
//! - Interruption on SIGTERM/SIGINT (Ctrl+C)
//! - Cleanup with closers and a non-zero exit code
//!
//! Run with: cargo run --example basic_runner

use blobfleet_runner::Runner;
use std::process::ExitCode;
use std::time::Duration;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting runner example");

    Runner::new()
        // Counts to five, checking for interruption between steps
        .with_job("counter", |ctx| async move {
            for counter in 1..=5 {
                tokio::select! {
                    _ = ctx.cancelled() => {
                        tracing::info!("Counter interrupted at {}", counter);
                        return Ok(());
                    }
                    _ = tokio::time::sleep(Duration::from_millis(500)) => {
                        tracing::info!("Counter: {}", counter);
                    }
                }
            }
            Ok(())
        })
        // Fails after one second without affecting the counter
        .with_job("failing", |_ctx| async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Err(anyhow::anyhow!("Simulated failure"))
        })
        .with_closer(|| async move {
            tracing::info!("Closer: flushing buffers...");
            tokio::time::sleep(Duration::from_millis(300)).await;
            tracing::info!("Closer: done");
            Ok(())
        })
        .with_closer_timeout(Duration::from_secs(5))
        .run()
        .await
}
