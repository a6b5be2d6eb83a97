use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;

/// Summary of one existing storage namespace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceInfo {
    pub name: String,
}

/// Trait for the remote storage service holding one namespace per edge device.
///
/// Implementations are shared read-only across all concurrent device workflows.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait NamespaceStore: Send + Sync {
    /// Enumerate every namespace currently present
    async fn list_namespaces(&self) -> Result<Vec<NamespaceInfo>>;

    /// Delete a namespace and everything in it; fails if it does not exist
    async fn delete_namespace(&self, name: &str) -> Result<()>;

    /// Create an empty namespace; fails if it already exists
    async fn create_namespace(&self, name: &str) -> Result<()>;

    /// Write a blob, fully replacing any content already stored under the key
    async fn write_blob(&self, namespace: &str, key: &str, payload: Bytes) -> Result<()>;

    /// Read a blob back, `None` when the key is absent
    async fn read_blob(&self, namespace: &str, key: &str) -> Result<Option<Bytes>>;
}
