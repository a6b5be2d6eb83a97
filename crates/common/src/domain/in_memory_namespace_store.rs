use super::{NamespaceInfo, NamespaceStore};
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct StoreState {
    namespaces: HashMap<String, HashMap<String, Bytes>>,
    writes: HashMap<String, usize>,
    failing_writes: HashMap<String, usize>,
}

/// In-memory implementation of NamespaceStore using nested HashMaps.
///
/// Backs dry runs and tests. Writes to a namespace can be made to fail at a chosen
/// ordinal with [`InMemoryNamespaceStore::fail_write`].
pub struct InMemoryNamespaceStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryNamespaceStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(StoreState::default())),
        }
    }

    /// Make the `ordinal`-th write (1-based) to `namespace` fail.
    pub async fn fail_write(&self, namespace: &str, ordinal: usize) {
        let mut state = self.state.write().await;
        state.failing_writes.insert(namespace.to_string(), ordinal);
    }

    pub async fn namespace_names(&self) -> Vec<String> {
        let state = self.state.read().await;
        let mut names: Vec<String> = state.namespaces.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn blob_keys(&self, namespace: &str) -> Vec<String> {
        let state = self.state.read().await;
        let mut keys: Vec<String> = state
            .namespaces
            .get(namespace)
            .map(|blobs| blobs.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    pub async fn blob_count(&self) -> usize {
        let state = self.state.read().await;
        state.namespaces.values().map(HashMap::len).sum()
    }
}

impl Default for InMemoryNamespaceStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NamespaceStore for InMemoryNamespaceStore {
    async fn list_namespaces(&self) -> Result<Vec<NamespaceInfo>> {
        Ok(self
            .namespace_names()
            .await
            .into_iter()
            .map(|name| NamespaceInfo { name })
            .collect())
    }

    async fn delete_namespace(&self, name: &str) -> Result<()> {
        let mut state = self.state.write().await;
        if state.namespaces.remove(name).is_none() {
            bail!("namespace not found: {}", name);
        }
        state.writes.remove(name);
        Ok(())
    }

    async fn create_namespace(&self, name: &str) -> Result<()> {
        let mut state = self.state.write().await;
        if state.namespaces.contains_key(name) {
            bail!("namespace already exists: {}", name);
        }
        state.namespaces.insert(name.to_string(), HashMap::new());
        Ok(())
    }

    async fn write_blob(&self, namespace: &str, key: &str, payload: Bytes) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.namespaces.contains_key(namespace) {
            bail!("namespace not found: {}", namespace);
        }

        let ordinal = {
            let count = state.writes.entry(namespace.to_string()).or_insert(0);
            *count += 1;
            *count
        };
        if state.failing_writes.get(namespace) == Some(&ordinal) {
            return Err(anyhow!(
                "injected write failure for {} (write #{})",
                namespace,
                ordinal
            ));
        }

        state
            .namespaces
            .get_mut(namespace)
            .ok_or_else(|| anyhow!("namespace not found: {}", namespace))?
            .insert(key.to_string(), payload);
        Ok(())
    }

    async fn read_blob(&self, namespace: &str, key: &str) -> Result<Option<Bytes>> {
        let state = self.state.read().await;
        let blobs = state
            .namespaces
            .get(namespace)
            .ok_or_else(|| anyhow!("namespace not found: {}", namespace))?;
        Ok(blobs.get(key).cloned())
    }
}
