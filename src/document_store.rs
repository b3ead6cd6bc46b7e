//! Document Store Module
//!
//! Narrow seam over the key-value document collections the registry persists
//! into. The registry only ever needs insert / get / list / update / delete
//! over schemaless JSON documents, so that is all the trait exposes. The
//! in-memory implementation doubles as the mock-data mode and the test double;
//! the Firestore REST backend lives in [`crate::firestore`].

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::error::{RegistryError, Result};

/// Collection holding certificate records
pub const CERTIFICATES: &str = "certificates";
/// Collection holding course records
pub const COURSES: &str = "courses";
/// Collection holding role assignments, keyed logically by wallet address
pub const ROLE_ASSIGNMENTS: &str = "role_assignments";
/// Auxiliary collection holding issuing organizations
pub const ORGANIZATIONS: &str = "organizations";

/// A stored document: the storage-assigned id plus the JSON payload
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

/// Query options for [`DocumentStore::list`]
///
/// Ordering and filtering are both optional; a default query returns the
/// whole collection in whatever order the backend keeps it.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    /// Field to sort by, descending, when set
    pub order_desc: Option<String>,
    /// Equality filter on a top-level field, when set
    pub filter_eq: Option<(String, Value)>,
}

impl ListQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn order_desc(mut self, field: &str) -> Self {
        self.order_desc = Some(field.to_string());
        self
    }

    pub fn filter_eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filter_eq = Some((field.to_string(), value.into()));
        self
    }
}

/// Async document collection collaborator.
///
/// Calls are sequential read-then-write with no compare-and-set; concurrent
/// writers against the same document race and the last write wins.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a record, returning the storage-assigned document id
    async fn insert(&self, collection: &str, record: Value) -> Result<String>;

    /// Fetch one document by id; `Ok(None)` when the id is unknown
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    /// List documents, honoring the query's ordering and filter
    async fn list(&self, collection: &str, query: ListQuery) -> Result<Vec<Document>>;

    /// Merge a partial record into an existing document
    async fn update(&self, collection: &str, id: &str, patch: Value) -> Result<()>;

    /// Physically remove a document
    async fn delete(&self, collection: &str, id: &str) -> Result<()>;
}

/// In-process document store backed by a mutex-guarded map.
///
/// Insertion order within a collection is stable for the lifetime of the
/// instance. An explicit instance is injected into every component that
/// persists state; there is no process-wide singleton.
#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, Vec<Document>>>,
    next_id: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn assign_id(&self) -> String {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        format!("doc_{:08}", n)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert(&self, collection: &str, record: Value) -> Result<String> {
        let id = self.assign_id();
        let mut collections = self
            .collections
            .lock()
            .map_err(|_| RegistryError::Collaborator("memory store poisoned".to_string()))?;
        collections
            .entry(collection.to_string())
            .or_default()
            .push(Document {
                id: id.clone(),
                data: record,
            });
        Ok(id)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let collections = self
            .collections
            .lock()
            .map_err(|_| RegistryError::Collaborator("memory store poisoned".to_string()))?;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| d.id == id))
            .cloned())
    }

    async fn list(&self, collection: &str, query: ListQuery) -> Result<Vec<Document>> {
        let collections = self
            .collections
            .lock()
            .map_err(|_| RegistryError::Collaborator("memory store poisoned".to_string()))?;
        let docs: Vec<Document> = collections.get(collection).cloned().unwrap_or_default();
        Ok(apply_query(docs, &query))
    }

    async fn update(&self, collection: &str, id: &str, patch: Value) -> Result<()> {
        let mut collections = self
            .collections
            .lock()
            .map_err(|_| RegistryError::Collaborator("memory store poisoned".to_string()))?;
        let doc = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| d.id == id))
            .ok_or_else(|| RegistryError::NotFound(format!("{}/{}", collection, id)))?;
        merge_patch(&mut doc.data, &patch);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let mut collections = self
            .collections
            .lock()
            .map_err(|_| RegistryError::Collaborator("memory store poisoned".to_string()))?;
        let docs = collections
            .get_mut(collection)
            .ok_or_else(|| RegistryError::NotFound(format!("{}/{}", collection, id)))?;
        let before = docs.len();
        docs.retain(|d| d.id != id);
        if docs.len() == before {
            return Err(RegistryError::NotFound(format!("{}/{}", collection, id)));
        }
        Ok(())
    }
}

/// Apply a query's filter and ordering to an already-fetched document list.
/// Shared by backends that filter and sort client-side.
pub(crate) fn apply_query(mut docs: Vec<Document>, query: &ListQuery) -> Vec<Document> {
    if let Some((field, value)) = &query.filter_eq {
        docs.retain(|d| d.data.get(field) == Some(value));
    }
    if let Some(field) = &query.order_desc {
        // RFC 3339 timestamps sort correctly as strings
        docs.sort_by(|a, b| {
            let ka = a.data.get(field).and_then(Value::as_str).unwrap_or("");
            let kb = b.data.get(field).and_then(Value::as_str).unwrap_or("");
            kb.cmp(ka)
        });
    }
    docs
}

/// Merge top-level keys of `patch` into `target`
pub(crate) fn merge_patch(target: &mut Value, patch: &Value) {
    if let (Some(target_map), Some(patch_map)) = (target.as_object_mut(), patch.as_object()) {
        for (key, value) in patch_map {
            target_map.insert(key.clone(), value.clone());
        }
    }
}

/// Document store whose every call fails, for exercising the registry's
/// storage-outage behavior
#[cfg(test)]
pub struct FailingStore;

#[cfg(test)]
#[async_trait]
impl DocumentStore for FailingStore {
    async fn insert(&self, _collection: &str, _record: Value) -> Result<String> {
        Err(RegistryError::Collaborator("store unavailable".to_string()))
    }

    async fn get(&self, _collection: &str, _id: &str) -> Result<Option<Document>> {
        Err(RegistryError::Collaborator("store unavailable".to_string()))
    }

    async fn list(&self, _collection: &str, _query: ListQuery) -> Result<Vec<Document>> {
        Err(RegistryError::Collaborator("store unavailable".to_string()))
    }

    async fn update(&self, _collection: &str, _id: &str, _patch: Value) -> Result<()> {
        Err(RegistryError::Collaborator("store unavailable".to_string()))
    }

    async fn delete(&self, _collection: &str, _id: &str) -> Result<()> {
        Err(RegistryError::Collaborator("store unavailable".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_insert_assigns_distinct_ids() {
        let store = MemoryStore::new();
        let a = store.insert(CERTIFICATES, json!({"n": 1})).await.unwrap();
        let b = store.insert(CERTIFICATES, json!({"n": 2})).await.unwrap();
        assert_ne!(a, b);

        let doc = store.get(CERTIFICATES, &a).await.unwrap().unwrap();
        assert_eq!(doc.data["n"], 1);
    }

    #[tokio::test]
    async fn test_list_orders_descending_by_field() {
        let store = MemoryStore::new();
        store
            .insert(COURSES, json!({"createdAt": "2024-01-01T00:00:00Z"}))
            .await
            .unwrap();
        store
            .insert(COURSES, json!({"createdAt": "2024-03-01T00:00:00Z"}))
            .await
            .unwrap();
        store
            .insert(COURSES, json!({"createdAt": "2024-02-01T00:00:00Z"}))
            .await
            .unwrap();

        let docs = store
            .list(COURSES, ListQuery::all().order_desc("createdAt"))
            .await
            .unwrap();
        let stamps: Vec<&str> = docs
            .iter()
            .map(|d| d.data["createdAt"].as_str().unwrap())
            .collect();
        assert_eq!(
            stamps,
            vec![
                "2024-03-01T00:00:00Z",
                "2024-02-01T00:00:00Z",
                "2024-01-01T00:00:00Z"
            ]
        );
    }

    #[tokio::test]
    async fn test_list_filters_on_equality() {
        let store = MemoryStore::new();
        store
            .insert(CERTIFICATES, json!({"courseId": "A"}))
            .await
            .unwrap();
        store
            .insert(CERTIFICATES, json!({"courseId": "B"}))
            .await
            .unwrap();
        store
            .insert(CERTIFICATES, json!({"courseId": "A"}))
            .await
            .unwrap();

        let docs = store
            .list(CERTIFICATES, ListQuery::all().filter_eq("courseId", "A"))
            .await
            .unwrap();
        assert_eq!(docs.len(), 2);
    }

    #[tokio::test]
    async fn test_update_merges_and_preserves_other_fields() {
        let store = MemoryStore::new();
        let id = store
            .insert(CERTIFICATES, json!({"grade": "B", "title": "Intro"}))
            .await
            .unwrap();
        store
            .update(CERTIFICATES, &id, json!({"grade": "A"}))
            .await
            .unwrap();

        let doc = store.get(CERTIFICATES, &id).await.unwrap().unwrap();
        assert_eq!(doc.data["grade"], "A");
        assert_eq!(doc.data["title"], "Intro");
    }

    #[tokio::test]
    async fn test_update_unknown_id_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .update(CERTIFICATES, "missing", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_removes_document() {
        let store = MemoryStore::new();
        let id = store.insert(COURSES, json!({"t": 1})).await.unwrap();
        store.delete(COURSES, &id).await.unwrap();
        assert!(store.get(COURSES, &id).await.unwrap().is_none());
    }
}
