//! Object store contract.
//!
//! Durability, locking and on-disk layout are the store's business. The
//! routing engine only addresses records through [`ObjectKey`]s produced by
//! [`identity`](crate::identity) and treats every call as potentially
//! blocking; no atomicity is assumed across calls.

use async_trait::async_trait;
use thiserror::Error;

use crate::identity::{KindKey, ObjectKey};
use crate::meta::Object;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} already exists")]
    AlreadyExists(String),

    /// The patch payload could not be applied to the stored record.
    #[error("invalid patch: {0}")]
    InvalidPatch(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Narrowing applied to [`ObjectStore::list`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ListFilter {
    /// Match `metadata.namespace` exactly.
    Namespace(String),
}

impl ListFilter {
    pub fn matches(&self, obj: &Object) -> bool {
        match self {
            ListFilter::Namespace(ns) => obj.namespace() == Some(ns.as_str()),
        }
    }
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get(&self, key: &ObjectKey) -> StoreResult<Object>;

    /// All objects of `kind` matching every filter.
    async fn list(&self, kind: &KindKey, filters: &[ListFilter]) -> StoreResult<Vec<Object>>;

    /// Fails with [`StoreError::AlreadyExists`] without touching the
    /// existing record.
    async fn create(&self, key: &ObjectKey, obj: &Object) -> StoreResult<()>;

    /// Full replace of an existing record.
    async fn update(&self, key: &ObjectKey, obj: &Object) -> StoreResult<()>;

    async fn delete(&self, key: &ObjectKey) -> StoreResult<()>;

    /// Merge the raw `patch` bytes into the record at `key`.
    async fn patch(&self, key: &ObjectKey, patch: &[u8]) -> StoreResult<()>;
}
