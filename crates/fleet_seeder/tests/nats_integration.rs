#![cfg(feature = "integration-tests")]

use anyhow::Result;
use chrono::{TimeZone, Utc};
use common::domain::{NamespaceStore, MINUTES_PER_DAY};
use common::nats::NatsClient;
use fleet_seeder::{FleetProvisioner, FleetProvisionerConfig, TimeSeriesEncoder, RECORD_SIZE};
use std::time::Duration;
use testcontainers::core::{ContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, Image};

/// NATS image with JetStream enabled
#[derive(Debug, Clone)]
struct NatsWithJetStream {
    ports: Vec<ContainerPort>,
}

impl Default for NatsWithJetStream {
    fn default() -> Self {
        Self {
            ports: vec![ContainerPort::Tcp(4222)],
        }
    }
}

impl Image for NatsWithJetStream {
    fn name(&self) -> &str {
        "nats"
    }

    fn tag(&self) -> &str {
        "latest"
    }

    fn ready_conditions(&self) -> Vec<WaitFor> {
        vec![WaitFor::seconds(3)]
    }

    fn cmd(&self) -> impl IntoIterator<Item = impl Into<std::borrow::Cow<'_, str>>> {
        vec!["--js"]
    }

    fn expose_ports(&self) -> &[ContainerPort] {
        &self.ports
    }
}

async fn start_nats() -> Result<(ContainerAsync<NatsWithJetStream>, NatsClient)> {
    let container = NatsWithJetStream::default().start().await?;
    let host = container.get_host().await?;
    let port = container.get_host_port_ipv4(4222).await?;
    let url = format!("nats://{}:{}", host, port);

    let client = NatsClient::connect(&url, Duration::from_secs(30), None).await?;
    Ok((container, client))
}

#[tokio::test]
async fn test_namespace_lifecycle_against_jetstream() -> Result<()> {
    let (_container, client) = start_nats().await?;
    let store = client.create_namespace_store();

    store.create_namespace("device-a").await?;
    store.create_namespace("device-b").await?;

    let mut names: Vec<String> = store
        .list_namespaces()
        .await?
        .into_iter()
        .map(|ns| ns.name)
        .collect();
    names.sort();
    assert_eq!(names, vec!["device-a".to_string(), "device-b".to_string()]);

    store
        .write_blob("device-a", "Fa.Hb#temp#2024-01-01", vec![1u8; 16].into())
        .await?;
    store
        .write_blob("device-a", "Fa.Hb#temp#2024-01-01", vec![2u8; 32].into())
        .await?;
    let payload = store.read_blob("device-a", "Fa.Hb#temp#2024-01-01").await?;
    assert_eq!(payload.map(|p| p.len()), Some(32));
    assert!(store.read_blob("device-a", "missing").await?.is_none());

    store.delete_namespace("device-a").await?;
    let remaining = store.list_namespaces().await?;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].name, "device-b");

    client.close().await?;
    Ok(())
}

#[tokio::test]
async fn test_fleet_run_against_jetstream() -> Result<()> {
    let (_container, client) = start_nats().await?;
    let store = client.create_namespace_store();
    store.create_namespace("stale-device").await?;

    let provisioner = FleetProvisioner::new(
        store.clone(),
        FleetProvisionerConfig {
            fleet_size: 2,
            lookback_days: 2,
            seed: Some(7),
            ..Default::default()
        },
    )?;
    let now = Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap();
    let report = provisioner.run(now).await?;

    assert!(report.is_success());
    assert_eq!(report.namespaces_deleted(), 1);
    assert_eq!(report.blobs_written(), 4);
    assert_eq!(store.list_namespaces().await?.len(), 2);

    let outcome = &report.devices.succeeded[0];
    let key = format!("{}#{}#2024-01-02", outcome.location, outcome.parameter);
    let payload = store
        .read_blob(outcome.device.as_str(), &key)
        .await?
        .expect("day blob should exist");
    assert_eq!(payload.len(), MINUTES_PER_DAY * RECORD_SIZE);
    assert_eq!(
        TimeSeriesEncoder::new().decode(&payload)?.len(),
        MINUTES_PER_DAY
    );

    client.close().await?;
    Ok(())
}
