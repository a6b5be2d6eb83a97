use crate::domain::NamespaceStore;
use crate::nats::NatsNamespaceStore;
use anyhow::{Context, Result};
use async_nats::jetstream;
use std::sync::Arc;
use tracing::info;

pub struct NatsClient {
    client: async_nats::Client,
    jetstream: jetstream::Context,
}

impl NatsClient {
    /// Connect to NATS, optionally authenticating with a credentials file
    pub async fn connect(
        url: &str,
        timeout: std::time::Duration,
        credentials_path: Option<&str>,
    ) -> Result<Self> {
        info!(url = %url, timeout_ms = timeout.as_millis(), "Connecting to NATS");

        let options = match credentials_path {
            Some(path) => async_nats::ConnectOptions::with_credentials_file(path)
                .await
                .with_context(|| format!("Failed to load NATS credentials from {}", path))?,
            None => async_nats::ConnectOptions::new(),
        };

        // Configure connection timeout for establishing the TCP connection
        let client = options
            .connection_timeout(timeout)
            .connect(url)
            .await
            .context("Failed to connect to NATS")?;

        let jetstream = jetstream::new(client.clone());

        info!("Successfully connected to NATS");
        Ok(Self { client, jetstream })
    }

    pub fn jetstream(&self) -> &jetstream::Context {
        &self.jetstream
    }

    /// Create a NamespaceStore trait object backed by JetStream object stores
    pub fn create_namespace_store(&self) -> Arc<dyn NamespaceStore> {
        Arc::new(NatsNamespaceStore::new(self.jetstream.clone()))
    }

    /// Flush pending writes before the connection is dropped
    pub async fn close(self) -> Result<()> {
        info!("Closing NATS connection");
        self.client
            .flush()
            .await
            .context("Failed to flush NATS connection")?;
        Ok(())
    }
}
