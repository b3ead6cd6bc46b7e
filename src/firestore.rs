//! Firestore REST Backend
//!
//! [`DocumentStore`] implementation over the Firestore REST API. Documents
//! are schemaless JSON on our side; this module owns the round-trip between
//! plain JSON and Firestore's typed value encoding.
//!
//! Filtering and ordering happen client-side after fetching the collection —
//! the collections here are small and it keeps the wire surface to the four
//! plain CRUD endpoints.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::configs::StoreConfig;
use crate::document_store::{apply_query, Document, DocumentStore, ListQuery};
use crate::error::{RegistryError, Result};

const PAGE_SIZE: &str = "300";

#[derive(Debug)]
pub struct FirestoreStore {
    http: reqwest::Client,
    base_url: String,
    api_key: SecretString,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    documents: Vec<Value>,
    #[serde(default)]
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

impl FirestoreStore {
    pub fn new(config: &StoreConfig) -> Result<Self> {
        if config.project_id.trim().is_empty() {
            return Err(RegistryError::Validation(
                "firestore backend requires store.project_id".to_string(),
            ));
        }
        Ok(Self {
            http: reqwest::Client::new(),
            base_url: format!(
                "https://firestore.googleapis.com/v1/projects/{}/databases/(default)/documents",
                config.project_id
            ),
            api_key: config.api_key.clone(),
        })
    }

    /// Point the client at a different endpoint, e.g. the Firestore emulator
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/{}", self.base_url, collection)
    }

    fn document_url(&self, collection: &str, id: &str) -> String {
        format!("{}/{}/{}", self.base_url, collection, id)
    }

    fn key_params(&self) -> Vec<(String, String)> {
        let key = self.api_key.expose_secret();
        if key.is_empty() {
            Vec::new()
        } else {
            vec![("key".to_string(), key.clone())]
        }
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn insert(&self, collection: &str, record: Value) -> Result<String> {
        let body = json!({ "fields": encode_fields(&record)? });
        let response = self
            .http
            .post(self.collection_url(collection))
            .query(&self.key_params())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(RegistryError::Collaborator(format!(
                "firestore insert failed ({}): {}",
                status, detail
            )));
        }
        let resource: Value = response.json().await?;
        let document = decode_document(&resource)?;
        Ok(document.id)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let response = self
            .http
            .get(self.document_url(collection, id))
            .query(&self.key_params())
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(RegistryError::Collaborator(format!(
                "firestore get failed ({}): {}",
                status, detail
            )));
        }
        let resource: Value = response.json().await?;
        Ok(Some(decode_document(&resource)?))
    }

    async fn list(&self, collection: &str, query: ListQuery) -> Result<Vec<Document>> {
        let mut docs = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut params = self.key_params();
            params.push(("pageSize".to_string(), PAGE_SIZE.to_string()));
            if let Some(token) = &page_token {
                params.push(("pageToken".to_string(), token.clone()));
            }

            let response = self
                .http
                .get(self.collection_url(collection))
                .query(&params)
                .send()
                .await?;
            let status = response.status();
            if !status.is_success() {
                let detail = response.text().await.unwrap_or_default();
                return Err(RegistryError::Collaborator(format!(
                    "firestore list failed ({}): {}",
                    status, detail
                )));
            }

            let page: ListResponse = response.json().await?;
            for resource in &page.documents {
                docs.push(decode_document(resource)?);
            }
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }
        Ok(apply_query(docs, &query))
    }

    async fn update(&self, collection: &str, id: &str, patch: Value) -> Result<()> {
        let Some(patch_map) = patch.as_object() else {
            return Err(RegistryError::Validation(
                "patch must be a JSON object".to_string(),
            ));
        };

        let mut params = self.key_params();
        params.push(("currentDocument.exists".to_string(), "true".to_string()));
        for field in patch_map.keys() {
            params.push(("updateMask.fieldPaths".to_string(), field.clone()));
        }

        let body = json!({ "fields": encode_fields(&patch)? });
        let response = self
            .http
            .patch(self.document_url(collection, id))
            .query(&params)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(RegistryError::NotFound(format!("{}/{}", collection, id)));
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(RegistryError::Collaborator(format!(
                "firestore update failed ({}): {}",
                status, detail
            )));
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let mut params = self.key_params();
        params.push(("currentDocument.exists".to_string(), "true".to_string()));

        let response = self
            .http
            .delete(self.document_url(collection, id))
            .query(&params)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(RegistryError::NotFound(format!("{}/{}", collection, id)));
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(RegistryError::Collaborator(format!(
                "firestore delete failed ({}): {}",
                status, detail
            )));
        }
        Ok(())
    }
}

/// Encode a plain JSON object into Firestore's `fields` map
fn encode_fields(record: &Value) -> Result<Value> {
    let Some(map) = record.as_object() else {
        return Err(RegistryError::Collaborator(
            "firestore documents must be JSON objects".to_string(),
        ));
    };
    let mut fields = Map::new();
    for (key, value) in map {
        fields.insert(key.clone(), encode_value(value));
    }
    Ok(Value::Object(fields))
}

fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                // integerValue is string-encoded on the wire
                json!({ "integerValue": i.to_string() })
            } else {
                json!({ "doubleValue": n.as_f64() })
            }
        }
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            let values: Vec<Value> = items.iter().map(encode_value).collect();
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(map) => {
            let mut fields = Map::new();
            for (key, inner) in map {
                fields.insert(key.clone(), encode_value(inner));
            }
            json!({ "mapValue": { "fields": fields } })
        }
    }
}

/// Decode a Firestore document resource into id + plain JSON
fn decode_document(resource: &Value) -> Result<Document> {
    let name = resource
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| RegistryError::Collaborator("firestore document has no name".to_string()))?;
    let id = name
        .rsplit('/')
        .next()
        .unwrap_or(name)
        .to_string();

    let mut data = Map::new();
    if let Some(fields) = resource.get("fields").and_then(Value::as_object) {
        for (key, value) in fields {
            data.insert(key.clone(), decode_value(value));
        }
    }
    Ok(Document {
        id,
        data: Value::Object(data),
    })
}

fn decode_value(value: &Value) -> Value {
    if let Some(s) = value.get("stringValue") {
        return s.clone();
    }
    if let Some(b) = value.get("booleanValue") {
        return b.clone();
    }
    if let Some(i) = value.get("integerValue") {
        return i
            .as_str()
            .and_then(|s| s.parse::<i64>().ok())
            .map(Value::from)
            .unwrap_or(Value::Null);
    }
    if let Some(d) = value.get("doubleValue") {
        return d.clone();
    }
    if let Some(t) = value.get("timestampValue") {
        return t.clone();
    }
    if value.get("nullValue").is_some() {
        return Value::Null;
    }
    if let Some(array) = value.get("arrayValue") {
        let items = array
            .get("values")
            .and_then(Value::as_array)
            .map(|values| values.iter().map(decode_value).collect())
            .unwrap_or_default();
        return Value::Array(items);
    }
    if let Some(map) = value.get("mapValue") {
        let mut fields = Map::new();
        if let Some(inner) = map.get("fields").and_then(Value::as_object) {
            for (key, nested) in inner {
                fields.insert(key.clone(), decode_value(nested));
            }
        }
        return Value::Object(fields);
    }
    Value::Null
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_encoding_roundtrip() {
        let original = json!({
            "title": "Intro to Blockchain",
            "verified": true,
            "copies": 3,
            "price": 4.5,
            "skills": ["blockchain", "defi"],
            "nested": { "grade": "A" },
            "missing": null,
        });
        let encoded = encode_fields(&original).unwrap();
        assert_eq!(encoded["title"]["stringValue"], "Intro to Blockchain");
        assert_eq!(encoded["copies"]["integerValue"], "3");
        assert_eq!(
            encoded["skills"]["arrayValue"]["values"][0]["stringValue"],
            "blockchain"
        );

        let resource = json!({
            "name": "projects/demo/databases/(default)/documents/certificates/abc123",
            "fields": encoded,
        });
        let document = decode_document(&resource).unwrap();
        assert_eq!(document.id, "abc123");
        assert_eq!(document.data, original);
    }

    #[test]
    fn test_empty_array_and_map_decode() {
        let resource = json!({
            "name": "projects/demo/databases/(default)/documents/courses/c1",
            "fields": {
                "skills": { "arrayValue": {} },
                "extra": { "mapValue": {} },
            },
        });
        let document = decode_document(&resource).unwrap();
        assert_eq!(document.data["skills"], json!([]));
        assert_eq!(document.data["extra"], json!({}));
    }

    #[test]
    fn test_new_requires_project_id() {
        let config = StoreConfig::default();
        assert!(matches!(
            FirestoreStore::new(&config).unwrap_err(),
            RegistryError::Validation(_)
        ));
    }
}
