//! Certificate Store Module
//!
//! Canonical create / read / update / validate / revoke operations over
//! certificate records, plus orchestration of best-effort content anchoring.
//! The store owns no policy about who may call it — callers are expected to
//! clear mutations through [`crate::roles::RoleAuthority`] first (the
//! protocol layer does exactly that).
//!
//! Revocation flips the status flag and never deletes the record, so the
//! audit trail survives and re-validating a revoked certificate keeps
//! answering `isValid: false`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

use crate::certificate::{
    Certificate, CertificateInput, CertificateStatus, CertificateSummary, MUTABLE_FIELDS,
};
use crate::document_store::{merge_patch, Document, DocumentStore, ListQuery, CERTIFICATES};
use crate::error::{RegistryError, Result};
use crate::pinning::ContentPinner;

/// Result of an anchoring attempt.
///
/// Anchoring is best-effort: a certificate is complete with or without an
/// anchor, and callers can see which one they got without digging through
/// optional fields.
#[derive(Debug)]
pub enum AnchorOutcome {
    /// Content and metadata pinned; anchoring fields are populated
    Anchored(Certificate),
    /// Pinning failed or was unavailable; the certificate is unanchored
    Skipped {
        certificate: Certificate,
        reason: String,
    },
}

impl AnchorOutcome {
    pub fn is_anchored(&self) -> bool {
        matches!(self, Self::Anchored(_))
    }

    pub fn certificate(&self) -> &Certificate {
        match self {
            Self::Anchored(certificate) => certificate,
            Self::Skipped { certificate, .. } => certificate,
        }
    }

    pub fn into_certificate(self) -> Certificate {
        match self {
            Self::Anchored(certificate) => certificate,
            Self::Skipped { certificate, .. } => certificate,
        }
    }
}

/// Answer to a validation lookup — a pure projection, never a mutation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate: Option<CertificateSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

pub struct CertificateStore {
    store: Arc<dyn DocumentStore>,
    pinner: Arc<dyn ContentPinner>,
}

impl CertificateStore {
    pub fn new(store: Arc<dyn DocumentStore>, pinner: Arc<dyn ContentPinner>) -> Self {
        Self { store, pinner }
    }

    /// Normalize the input, persist the record, and return it with its
    /// storage-assigned id
    pub async fn create(&self, input: CertificateInput) -> Result<Certificate> {
        let certificate = input.normalize()?;
        self.persist(certificate).await
    }

    /// Create with an anchoring attempt first, so the anchoring fields land
    /// in the initial persisted record. Pin failures degrade to an
    /// unanchored create.
    pub async fn create_anchored(&self, input: CertificateInput) -> Result<AnchorOutcome> {
        let certificate = input.normalize()?;
        match self.anchor(certificate).await {
            AnchorOutcome::Anchored(certificate) => {
                Ok(AnchorOutcome::Anchored(self.persist(certificate).await?))
            }
            AnchorOutcome::Skipped {
                certificate,
                reason,
            } => Ok(AnchorOutcome::Skipped {
                certificate: self.persist(certificate).await?,
                reason,
            }),
        }
    }

    /// Pin the certificate's text rendition, then the metadata document that
    /// embeds the rendition's address. Sequential on purpose: the metadata
    /// cannot be built before the content address exists.
    ///
    /// Never fails — a pin error is logged and the certificate comes back
    /// unanchored.
    pub async fn anchor(&self, mut certificate: Certificate) -> AnchorOutcome {
        let content_name = format!("Certificate_{}.txt", certificate.certificate_id);
        let content = certificate.render_text();
        let content_receipt = match self.pinner.pin_bytes(content.into_bytes(), &content_name).await
        {
            Ok(receipt) => receipt,
            Err(e) => {
                warn!(
                    certificate_id = %certificate.certificate_id,
                    error = %e,
                    "content pin failed, proceeding without anchor"
                );
                return AnchorOutcome::Skipped {
                    certificate,
                    reason: e.to_string(),
                };
            }
        };

        let metadata =
            certificate.metadata_document(&content_receipt.retrieval_url, &content_receipt.content_id);
        let metadata_name = format!("Certificate_{}_metadata.json", certificate.certificate_id);
        match self.pinner.pin_json(&metadata, &metadata_name).await {
            Ok(metadata_receipt) => {
                certificate.content_hash = Some(content_receipt.content_id);
                certificate.content_url = Some(content_receipt.retrieval_url);
                certificate.blockchain_hash = metadata_receipt.content_id.clone();
                certificate.metadata_hash = Some(metadata_receipt.content_id);
                certificate.metadata_url = Some(metadata_receipt.retrieval_url);
                AnchorOutcome::Anchored(certificate)
            }
            Err(e) => {
                warn!(
                    certificate_id = %certificate.certificate_id,
                    error = %e,
                    "metadata pin failed, proceeding without anchor"
                );
                AnchorOutcome::Skipped {
                    certificate,
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Anchor an already-persisted certificate and save the anchoring fields
    pub async fn anchor_existing(&self, key: &str) -> Result<AnchorOutcome> {
        let certificate = self
            .find_any(key)
            .await?
            .ok_or_else(|| RegistryError::NotFound(format!("certificate {}", key)))?;

        match self.anchor(certificate).await {
            AnchorOutcome::Anchored(mut certificate) => {
                certificate.updated_at = chrono::Utc::now().to_rfc3339();
                self.store
                    .update(
                        CERTIFICATES,
                        &certificate.id,
                        json!({
                            "contentHash": certificate.content_hash,
                            "contentUrl": certificate.content_url,
                            "metadataHash": certificate.metadata_hash,
                            "metadataUrl": certificate.metadata_url,
                            "blockchainHash": certificate.blockchain_hash,
                            "updatedAt": certificate.updated_at,
                        }),
                    )
                    .await?;
                Ok(AnchorOutcome::Anchored(certificate))
            }
            skipped => Ok(skipped),
        }
    }

    /// All certificates, most recently created first
    pub async fn list(&self) -> Result<Vec<Certificate>> {
        let docs = self
            .store
            .list(CERTIFICATES, ListQuery::all().order_desc("createdAt"))
            .await?;
        docs.into_iter().map(decode).collect()
    }

    /// Certificates issued for one course
    pub async fn by_course(&self, course_id: &str) -> Result<Vec<Certificate>> {
        let docs = self
            .store
            .list(CERTIFICATES, ListQuery::all().filter_eq("courseId", course_id))
            .await?;
        docs.into_iter().map(decode).collect()
    }

    /// Apply a patch to the mutable fields of a certificate.
    ///
    /// Identity fields are immutable after creation and revocation is
    /// terminal; patches violating either are rejected with a policy error.
    pub async fn update(&self, key: &str, patch: Value) -> Result<Certificate> {
        let Some(patch_map) = patch.as_object() else {
            return Err(RegistryError::Validation(
                "certificate patch must be a JSON object".to_string(),
            ));
        };
        for field in patch_map.keys() {
            if !MUTABLE_FIELDS.contains(&field.as_str()) {
                return Err(RegistryError::Policy(format!(
                    "field {} is immutable after creation",
                    field
                )));
            }
        }

        let existing = self
            .find_any(key)
            .await?
            .ok_or_else(|| RegistryError::NotFound(format!("certificate {}", key)))?;

        if let Some(status_value) = patch_map.get("status") {
            let new_status: CertificateStatus = serde_json::from_value(status_value.clone())
                .map_err(|_| {
                    RegistryError::Validation(format!("unknown status: {}", status_value))
                })?;
            if existing.status == CertificateStatus::Revoked
                && new_status == CertificateStatus::Verified
            {
                return Err(RegistryError::Policy(
                    "revocation is terminal: a revoked certificate cannot return to verified"
                        .to_string(),
                ));
            }
        }

        let mut patch = patch;
        if let Some(map) = patch.as_object_mut() {
            map.insert(
                "updatedAt".to_string(),
                Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }
        self.store
            .update(CERTIFICATES, &existing.id, patch.clone())
            .await?;

        let mut merged_value = serde_json::to_value(&existing)?;
        merge_patch(&mut merged_value, &patch);
        let mut merged: Certificate = serde_json::from_value(merged_value)?;
        merged.id = existing.id;
        Ok(merged)
    }

    /// Three-way fallback lookup: `certificateId` field, storage document
    /// id, then `blockchainHash` — first match wins. Pure projection.
    pub async fn validate(&self, key: &str) -> Result<ValidationReport> {
        match self.find_any(key).await? {
            Some(certificate) => {
                let is_valid = certificate.status.is_valid();
                Ok(ValidationReport {
                    is_valid,
                    certificate: Some(certificate.summary()),
                    reason: if is_valid {
                        None
                    } else {
                        Some("certificate has been revoked".to_string())
                    },
                })
            }
            None => Ok(ValidationReport {
                is_valid: false,
                certificate: None,
                reason: Some("not found".to_string()),
            }),
        }
    }

    /// Flip the status flag to revoked. Idempotent in effect: revoking an
    /// already-revoked certificate is a no-op. Callers must be
    /// pre-authorized through the role authority.
    pub async fn revoke(&self, key: &str) -> Result<Certificate> {
        let certificate = self
            .find_any(key)
            .await?
            .ok_or_else(|| RegistryError::NotFound(format!("certificate {}", key)))?;

        if certificate.status == CertificateStatus::Revoked {
            return Ok(certificate);
        }

        let now = chrono::Utc::now().to_rfc3339();
        self.store
            .update(
                CERTIFICATES,
                &certificate.id,
                json!({ "status": CertificateStatus::Revoked, "updatedAt": now }),
            )
            .await?;

        let mut revoked = certificate;
        revoked.status = CertificateStatus::Revoked;
        revoked.updated_at = now;
        Ok(revoked)
    }

    /// Resolve a certificate by any of its three lookup keys
    pub async fn find_any(&self, key: &str) -> Result<Option<Certificate>> {
        let by_certificate_id = self
            .store
            .list(CERTIFICATES, ListQuery::all().filter_eq("certificateId", key))
            .await?;
        if let Some(doc) = by_certificate_id.into_iter().next() {
            return Ok(Some(decode(doc)?));
        }

        if let Some(doc) = self.store.get(CERTIFICATES, key).await? {
            return Ok(Some(decode(doc)?));
        }

        let by_blockchain_hash = self
            .store
            .list(
                CERTIFICATES,
                ListQuery::all().filter_eq("blockchainHash", key),
            )
            .await?;
        match by_blockchain_hash.into_iter().next() {
            Some(doc) => Ok(Some(decode(doc)?)),
            None => Ok(None),
        }
    }

    async fn persist(&self, mut certificate: Certificate) -> Result<Certificate> {
        let record = serde_json::to_value(&certificate)?;
        certificate.id = self.store.insert(CERTIFICATES, record).await?;
        Ok(certificate)
    }
}

fn decode(doc: Document) -> Result<Certificate> {
    let mut certificate: Certificate = serde_json::from_value(doc.data)?;
    certificate.id = doc.id;
    Ok(certificate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document_store::MemoryStore;
    use crate::pinning::{FailingPinner, LocalPinner};

    fn store() -> CertificateStore {
        CertificateStore::new(Arc::new(MemoryStore::new()), Arc::new(LocalPinner::new()))
    }

    fn input(recipient: &str, issuer: &str) -> CertificateInput {
        CertificateInput {
            title: Some("Intro to X".to_string()),
            recipient_wallet: Some(recipient.to_string()),
            issuer_wallet: Some(issuer.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_persists_normalized_record() {
        let store = store();
        let certificate = store
            .create(input("alice.testnet", "org.testnet"))
            .await
            .unwrap();

        assert!(!certificate.id.is_empty());
        assert!(certificate.certificate_id.starts_with("CERT_"));
        assert_eq!(certificate.status, CertificateStatus::Verified);
        assert_eq!(certificate.skills, vec!["learning".to_string()]);

        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].certificate_id, certificate.certificate_id);
    }

    #[tokio::test]
    async fn test_create_rejects_malformed_recipient() {
        let store = store();
        let err = store
            .create(CertificateInput::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Validation(_)));
    }

    #[tokio::test]
    async fn test_lifecycle_create_revoke_validate() {
        let store = store();
        let certificate = store
            .create(input("alice.testnet", "org.testnet"))
            .await
            .unwrap();

        let revoked = store.revoke(&certificate.certificate_id).await.unwrap();
        assert_eq!(revoked.status, CertificateStatus::Revoked);

        let report = store.validate(&certificate.certificate_id).await.unwrap();
        assert!(!report.is_valid);
        assert_eq!(report.reason.as_deref(), Some("certificate has been revoked"));
        assert!(report.certificate.is_some());
    }

    #[tokio::test]
    async fn test_revoke_is_idempotent() {
        let store = store();
        let certificate = store
            .create(input("alice.testnet", "org.testnet"))
            .await
            .unwrap();

        store.revoke(&certificate.certificate_id).await.unwrap();
        let again = store.revoke(&certificate.certificate_id).await.unwrap();
        assert_eq!(again.status, CertificateStatus::Revoked);
    }

    #[tokio::test]
    async fn test_revoked_certificate_stays_listed() {
        let store = store();
        let certificate = store
            .create(input("alice.testnet", "org.testnet"))
            .await
            .unwrap();
        store.revoke(&certificate.certificate_id).await.unwrap();

        // revoke flags, never deletes
        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].status, CertificateStatus::Revoked);
    }

    #[tokio::test]
    async fn test_validate_matches_all_three_keys() {
        let store = store();
        let certificate = store
            .create(input("alice.testnet", "org.testnet"))
            .await
            .unwrap();

        for key in [
            certificate.certificate_id.as_str(),
            certificate.id.as_str(),
            certificate.blockchain_hash.as_str(),
        ] {
            let report = store.validate(key).await.unwrap();
            assert!(report.is_valid, "lookup by {:?} should succeed", key);
        }
    }

    #[tokio::test]
    async fn test_validate_unknown_key() {
        let store = store();
        let report = store.validate("CERT_does_not_exist").await.unwrap();
        assert!(!report.is_valid);
        assert!(report.certificate.is_none());
        assert_eq!(report.reason.as_deref(), Some("not found"));
    }

    #[tokio::test]
    async fn test_update_mutable_field() {
        let store = store();
        let certificate = store
            .create(input("alice.testnet", "org.testnet"))
            .await
            .unwrap();

        let updated = store
            .update(&certificate.certificate_id, json!({"grade": "A"}))
            .await
            .unwrap();
        assert_eq!(updated.grade, "A");
        assert_eq!(updated.recipient_wallet, "alice.testnet");
    }

    #[tokio::test]
    async fn test_update_rejects_identity_fields() {
        let store = store();
        let certificate = store
            .create(input("alice.testnet", "org.testnet"))
            .await
            .unwrap();

        let err = store
            .update(
                &certificate.certificate_id,
                json!({"recipientWallet": "mallory.testnet"}),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Policy(_)));
    }

    #[tokio::test]
    async fn test_update_rejects_unrevoke() {
        let store = store();
        let certificate = store
            .create(input("alice.testnet", "org.testnet"))
            .await
            .unwrap();
        store.revoke(&certificate.certificate_id).await.unwrap();

        let err = store
            .update(&certificate.certificate_id, json!({"status": "verified"}))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Policy(_)));
    }

    #[tokio::test]
    async fn test_update_unknown_certificate() {
        let store = store();
        let err = store
            .update("CERT_missing", json!({"grade": "A"}))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_by_course_filters() {
        let store = store();
        let mut a = input("alice.testnet", "org.testnet");
        a.course_id = Some("BLOCKCHAIN_101".to_string());
        let mut b = input("bob.testnet", "org.testnet");
        b.course_id = Some("WEB3_201".to_string());
        store.create(a).await.unwrap();
        store.create(b).await.unwrap();

        let matching = store.by_course("BLOCKCHAIN_101").await.unwrap();
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].recipient_wallet, "alice.testnet");
    }

    #[tokio::test]
    async fn test_create_anchored_populates_anchor_fields() {
        let store = store();
        let outcome = store
            .create_anchored(input("alice.testnet", "org.testnet"))
            .await
            .unwrap();

        assert!(outcome.is_anchored());
        let certificate = outcome.certificate();
        assert!(certificate.content_hash.is_some());
        assert!(certificate.content_url.is_some());
        assert!(certificate.metadata_hash.is_some());
        assert_eq!(
            certificate.blockchain_hash,
            certificate.metadata_hash.clone().unwrap()
        );
    }

    #[tokio::test]
    async fn test_anchor_failure_never_blocks_creation() {
        let store =
            CertificateStore::new(Arc::new(MemoryStore::new()), Arc::new(FailingPinner));
        let outcome = store
            .create_anchored(input("alice.testnet", "org.testnet"))
            .await
            .unwrap();

        assert!(!outcome.is_anchored());
        let certificate = outcome.certificate();
        assert!(certificate.content_hash.is_none());
        assert!(certificate.blockchain_hash.starts_with("local_"));

        // the certificate exists and validates despite the failed anchor
        let report = store.validate(&certificate.certificate_id).await.unwrap();
        assert!(report.is_valid);
    }

    #[tokio::test]
    async fn test_anchor_existing_persists_fields() {
        let store = store();
        let certificate = store
            .create(input("alice.testnet", "org.testnet"))
            .await
            .unwrap();
        assert!(certificate.content_hash.is_none());

        let outcome = store
            .anchor_existing(&certificate.certificate_id)
            .await
            .unwrap();
        assert!(outcome.is_anchored());

        let reloaded = store
            .find_any(&certificate.certificate_id)
            .await
            .unwrap()
            .unwrap();
        assert!(reloaded.content_hash.is_some());
        assert_eq!(reloaded.blockchain_hash, reloaded.metadata_hash.clone().unwrap());
    }
}
