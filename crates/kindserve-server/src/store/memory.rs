//! In-memory [`ObjectStore`] implementation.

use async_trait::async_trait;
use kindserve_kernel::{
    ListFilter, Object, ObjectKey, ObjectStore, StoreError, StoreResult, TypeMeta,
    identity::KindKey,
};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// [`ObjectStore`] backed by a `HashMap` behind an async `RwLock`.
///
/// Suitable for single-node deployments and tests. Nothing survives a
/// restart.
#[derive(Default)]
pub struct InMemoryStore {
    objects: RwLock<HashMap<ObjectKey, Object>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

/// Overwrite the identity fields of `doc` with the ones `key` implies.
fn stamp_identity(doc: &mut Map<String, Value>, key: &ObjectKey) {
    doc.insert("apiVersion".into(), Value::String(key.kind.api_version()));
    doc.insert("kind".into(), Value::String(key.kind.kind.clone()));

    let metadata = doc
        .entry("metadata")
        .or_insert_with(|| Value::Object(Map::new()));
    if !metadata.is_object() {
        *metadata = Value::Object(Map::new());
    }
    if let Value::Object(metadata) = metadata {
        match key.identifier.name() {
            Some(name) => metadata.insert("name".into(), Value::String(name.to_string())),
            None => metadata.remove("name"),
        };
        match key.identifier.namespace() {
            Some(ns) => metadata.insert("namespace".into(), Value::String(ns.to_string())),
            None => metadata.remove("namespace"),
        };
    }
}

/// Apply a JSON merge patch (RFC 7386) to `current` and re-stamp identity
/// from `key`.
///
/// A missing singleton starts from a bare `{apiVersion, kind}` document;
/// any other missing record is `NotFound`.
pub fn merge_patch(current: Option<&Object>, key: &ObjectKey, patch: &[u8]) -> StoreResult<Object> {
    let patch: Value =
        serde_json::from_slice(patch).map_err(|e| StoreError::InvalidPatch(e.to_string()))?;
    if !patch.is_object() {
        return Err(StoreError::InvalidPatch("patch must be a JSON object".into()));
    }

    let mut doc = match current {
        Some(existing) => {
            serde_json::to_value(existing).map_err(|e| StoreError::Backend(e.to_string()))?
        }
        None if key.identifier.is_singleton() => serde_json::to_value(Object {
            types: TypeMeta::from(&key.kind),
            ..Default::default()
        })
        .map_err(|e| StoreError::Backend(e.to_string()))?,
        None => return Err(StoreError::NotFound(key.to_string())),
    };

    json_patch::merge(&mut doc, &patch);
    if let Value::Object(map) = &mut doc {
        stamp_identity(map, key);
    }
    serde_json::from_value(doc).map_err(|e| StoreError::InvalidPatch(e.to_string()))
}

#[async_trait]
impl ObjectStore for InMemoryStore {
    async fn get(&self, key: &ObjectKey) -> StoreResult<Object> {
        self.objects
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn list(&self, kind: &KindKey, filters: &[ListFilter]) -> StoreResult<Vec<Object>> {
        let objects = self.objects.read().await;
        let mut matched: Vec<(String, Object)> = objects
            .iter()
            .filter(|(key, obj)| key.kind == *kind && filters.iter().all(|f| f.matches(obj)))
            .map(|(key, obj)| (key.identifier.to_string(), obj.clone()))
            .collect();
        matched.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(matched.into_iter().map(|(_, obj)| obj).collect())
    }

    async fn create(&self, key: &ObjectKey, obj: &Object) -> StoreResult<()> {
        let mut objects = self.objects.write().await;
        if objects.contains_key(key) {
            return Err(StoreError::AlreadyExists(key.to_string()));
        }
        objects.insert(key.clone(), obj.clone());
        Ok(())
    }

    async fn update(&self, key: &ObjectKey, obj: &Object) -> StoreResult<()> {
        self.objects
            .write()
            .await
            .get_mut(key)
            .map(|existing| *existing = obj.clone())
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn delete(&self, key: &ObjectKey) -> StoreResult<()> {
        self.objects
            .write()
            .await
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    /// JSON merge patch (RFC 7386), see [`merge_patch`].
    async fn patch(&self, key: &ObjectKey, patch: &[u8]) -> StoreResult<()> {
        let mut objects = self.objects.write().await;
        let merged = merge_patch(objects.get(key), key, patch)?;
        objects.insert(key.clone(), merged);
        Ok(())
    }
}
