//! Course Catalog Module
//!
//! Supporting entities around the certificate lifecycle: the courses
//! certificates are issued for, and the organizations that issue them.
//! Mutations are gated by the role authority at the protocol layer —
//! organization-role identities create and update courses, everyone reads.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::document_store::{
    merge_patch, Document, DocumentStore, ListQuery, COURSES, ORGANIZATIONS,
};
use crate::error::{RegistryError, Result};

/// A purchasable course, priced in both NEAR and USD
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    /// Storage-assigned document id; empty until persisted
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "priceNEAR")]
    pub price_near: String,
    #[serde(rename = "priceUSD")]
    pub price_usd: String,
    pub category: String,
    pub instructor: String,
    pub duration: String,
    pub level: String,
    pub skills: Vec<String>,
    /// Wallet of the owning organization; legacy key kept on the wire
    #[serde(rename = "organization_wallet")]
    pub organization_wallet: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Caller-supplied fields for creating a course
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseInput {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "priceNEAR")]
    pub price_near: Option<String>,
    #[serde(default, rename = "priceUSD")]
    pub price_usd: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub instructor: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub skills: Option<Vec<String>>,
    #[serde(default, rename = "organization_wallet")]
    pub organization_wallet: Option<String>,
}

impl CourseInput {
    fn normalize(self) -> Result<Course> {
        let title = self
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| RegistryError::Validation("course title must not be empty".to_string()))?
            .to_string();
        let organization_wallet = self
            .organization_wallet
            .as_deref()
            .map(str::trim)
            .filter(|w| !w.is_empty())
            .ok_or_else(|| {
                RegistryError::Validation(
                    "course organization wallet must be a non-empty address".to_string(),
                )
            })?
            .to_string();

        let now = Utc::now().to_rfc3339();
        Ok(Course {
            id: String::new(),
            title,
            description: self.description.unwrap_or_default(),
            price_near: self.price_near.unwrap_or_else(|| "0".to_string()),
            price_usd: self.price_usd.unwrap_or_else(|| "0".to_string()),
            category: self.category.unwrap_or_default(),
            instructor: self.instructor.unwrap_or_default(),
            duration: self.duration.unwrap_or_default(),
            level: self.level.unwrap_or_else(|| "Beginner".to_string()),
            skills: self.skills.unwrap_or_default(),
            organization_wallet,
            created_at: now.clone(),
            updated_at: now,
        })
    }
}

pub struct CourseCatalog {
    store: Arc<dyn DocumentStore>,
}

impl CourseCatalog {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, input: CourseInput) -> Result<Course> {
        let mut course = input.normalize()?;
        let record = serde_json::to_value(&course)?;
        course.id = self.store.insert(COURSES, record).await?;
        Ok(course)
    }

    /// All courses, most recently created first
    pub async fn list(&self) -> Result<Vec<Course>> {
        let docs = self
            .store
            .list(COURSES, ListQuery::all().order_desc("createdAt"))
            .await?;
        docs.into_iter().map(decode_course).collect()
    }

    pub async fn get(&self, id: &str) -> Result<Option<Course>> {
        match self.store.get(COURSES, id).await? {
            Some(doc) => Ok(Some(decode_course(doc)?)),
            None => Ok(None),
        }
    }

    pub async fn update(&self, id: &str, patch: Value) -> Result<Course> {
        let Some(_) = patch.as_object() else {
            return Err(RegistryError::Validation(
                "course patch must be a JSON object".to_string(),
            ));
        };
        let existing = self
            .get(id)
            .await?
            .ok_or_else(|| RegistryError::NotFound(format!("course {}", id)))?;

        let mut patch = patch;
        if let Some(map) = patch.as_object_mut() {
            map.remove("id");
            map.insert(
                "updatedAt".to_string(),
                Value::String(Utc::now().to_rfc3339()),
            );
        }
        self.store.update(COURSES, id, patch.clone()).await?;

        let mut merged_value = serde_json::to_value(&existing)?;
        merge_patch(&mut merged_value, &patch);
        let mut merged: Course = serde_json::from_value(merged_value)?;
        merged.id = existing.id;
        Ok(merged)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.store.delete(COURSES, id).await
    }
}

fn decode_course(doc: Document) -> Result<Course> {
    let mut course: Course = serde_json::from_value(doc.data)?;
    course.id = doc.id;
    Ok(course)
}

/// An issuing organization. Auxiliary collection, original wire keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub wallet_address: String,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub created_at: String,
}

pub struct OrganizationDirectory {
    store: Arc<dyn DocumentStore>,
}

impl OrganizationDirectory {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, mut organization: Organization) -> Result<Organization> {
        if organization.wallet_address.trim().is_empty() {
            return Err(RegistryError::Validation(
                "organization wallet must be a non-empty address".to_string(),
            ));
        }
        if organization.created_at.is_empty() {
            organization.created_at = Utc::now().to_rfc3339();
        }
        organization.id = String::new();
        let record = serde_json::to_value(&organization)?;
        organization.id = self.store.insert(ORGANIZATIONS, record).await?;
        Ok(organization)
    }

    pub async fn list(&self) -> Result<Vec<Organization>> {
        let docs = self.store.list(ORGANIZATIONS, ListQuery::all()).await?;
        docs.into_iter()
            .map(|doc| {
                let mut organization: Organization = serde_json::from_value(doc.data)?;
                organization.id = doc.id;
                Ok(organization)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document_store::MemoryStore;

    fn catalog() -> CourseCatalog {
        CourseCatalog::new(Arc::new(MemoryStore::new()))
    }

    fn course_input() -> CourseInput {
        CourseInput {
            title: Some("Introduction to Blockchain".to_string()),
            organization_wallet: Some("achievo-org.testnet".to_string()),
            price_near: Some("5".to_string()),
            skills: Some(vec!["blockchain".to_string()]),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_applies_defaults() {
        let catalog = catalog();
        let course = catalog.create(course_input()).await.unwrap();
        assert!(!course.id.is_empty());
        assert_eq!(course.level, "Beginner");
        assert_eq!(course.price_usd, "0");
        assert_eq!(course.organization_wallet, "achievo-org.testnet");
    }

    #[tokio::test]
    async fn test_create_requires_title_and_wallet() {
        let catalog = catalog();
        let mut input = course_input();
        input.title = None;
        assert!(matches!(
            catalog.create(input).await.unwrap_err(),
            RegistryError::Validation(_)
        ));

        let mut input = course_input();
        input.organization_wallet = Some("  ".to_string());
        assert!(matches!(
            catalog.create(input).await.unwrap_err(),
            RegistryError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn test_update_merges_patch() {
        let catalog = catalog();
        let course = catalog.create(course_input()).await.unwrap();
        let updated = catalog
            .update(&course.id, serde_json::json!({"priceNEAR": "7"}))
            .await
            .unwrap();
        assert_eq!(updated.price_near, "7");
        assert_eq!(updated.title, "Introduction to Blockchain");
    }

    #[tokio::test]
    async fn test_delete_removes_course() {
        let catalog = catalog();
        let course = catalog.create(course_input()).await.unwrap();
        catalog.delete(&course.id).await.unwrap();
        assert!(catalog.get(&course.id).await.unwrap().is_none());
        assert!(catalog.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_course_wire_keys() {
        let course = course_input().normalize().unwrap();
        let value = serde_json::to_value(&course).unwrap();
        assert!(value.get("priceNEAR").is_some());
        assert!(value.get("priceUSD").is_some());
        assert!(value.get("organization_wallet").is_some());
    }

    #[tokio::test]
    async fn test_organizations_roundtrip() {
        let directory = OrganizationDirectory::new(Arc::new(MemoryStore::new()));
        let organization = directory
            .create(Organization {
                id: String::new(),
                name: "Achievo Education Institute".to_string(),
                email: "contact@achievo-edu.org".to_string(),
                wallet_address: "achievo-org.testnet".to_string(),
                verified: true,
                description: String::new(),
                website: String::new(),
                created_at: String::new(),
            })
            .await
            .unwrap();
        assert!(!organization.id.is_empty());

        let listed = directory.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "Achievo Education Institute");
    }
}
