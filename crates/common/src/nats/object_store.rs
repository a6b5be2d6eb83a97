use crate::domain::{NamespaceInfo, NamespaceStore};
use anyhow::{Context, Result};
use async_nats::jetstream;
use async_nats::jetstream::object_store::{GetErrorKind, ObjectStore};
use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use std::collections::HashMap;
use tokio::io::AsyncReadExt;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// JetStream backs every object store bucket with a stream named `OBJ_<bucket>`.
const OBJECT_STORE_STREAM_PREFIX: &str = "OBJ_";

/// NamespaceStore over NATS JetStream: one object store bucket per namespace.
pub struct NatsNamespaceStore {
    jetstream: jetstream::Context,
    buckets: RwLock<HashMap<String, ObjectStore>>,
}

impl NatsNamespaceStore {
    pub fn new(jetstream: jetstream::Context) -> Self {
        Self {
            jetstream,
            buckets: RwLock::new(HashMap::new()),
        }
    }

    async fn bucket(&self, namespace: &str) -> Result<ObjectStore> {
        if let Some(store) = self.buckets.read().await.get(namespace) {
            return Ok(store.clone());
        }

        debug!(bucket = %namespace, "opening object store bucket");
        let store = self
            .jetstream
            .get_object_store(namespace)
            .await
            .with_context(|| format!("failed to open object store bucket {}", namespace))?;

        self.buckets
            .write()
            .await
            .insert(namespace.to_string(), store.clone());
        Ok(store)
    }
}

#[async_trait]
impl NamespaceStore for NatsNamespaceStore {
    async fn list_namespaces(&self) -> Result<Vec<NamespaceInfo>> {
        let stream_names: Vec<String> = self
            .jetstream
            .stream_names()
            .try_collect()
            .await
            .context("failed to list JetStream streams")?;

        Ok(stream_names
            .into_iter()
            .filter_map(|stream| {
                stream
                    .strip_prefix(OBJECT_STORE_STREAM_PREFIX)
                    .map(|bucket| NamespaceInfo {
                        name: bucket.to_string(),
                    })
            })
            .collect())
    }

    #[instrument(skip(self))]
    async fn delete_namespace(&self, name: &str) -> Result<()> {
        self.buckets.write().await.remove(name);
        self.jetstream
            .delete_object_store(name)
            .await
            .with_context(|| format!("failed to delete object store bucket {}", name))?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn create_namespace(&self, name: &str) -> Result<()> {
        let store = self
            .jetstream
            .create_object_store(jetstream::object_store::Config {
                bucket: name.to_string(),
                ..Default::default()
            })
            .await
            .with_context(|| format!("failed to create object store bucket {}", name))?;

        self.buckets.write().await.insert(name.to_string(), store);
        Ok(())
    }

    async fn write_blob(&self, namespace: &str, key: &str, payload: Bytes) -> Result<()> {
        let store = self.bucket(namespace).await?;
        let mut reader = &payload[..];
        store
            .put(key, &mut reader)
            .await
            .with_context(|| format!("failed to upload object {} to {}", key, namespace))?;
        Ok(())
    }

    async fn read_blob(&self, namespace: &str, key: &str) -> Result<Option<Bytes>> {
        let store = self.bucket(namespace).await?;
        let mut object = match store.get(key).await {
            Ok(object) => object,
            Err(err) if err.kind() == GetErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err).context("failed to get object"),
        };

        let mut buf = Vec::new();
        object
            .read_to_end(&mut buf)
            .await
            .context("failed to read object content")?;

        Ok(Some(Bytes::from(buf)))
    }
}
