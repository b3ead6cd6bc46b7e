//! Certificate Model Module
//!
//! Canonical representation of a certificate record plus the single
//! normalization step that applies field defaults. All defaulting lives in
//! [`CertificateInput::normalize`] so the policy stays auditable in one place.
//!
//! # Default table
//!
//! | field             | default                                  |
//! |-------------------|------------------------------------------|
//! | `certificateId`   | generated `CERT_<unix-millis><seq>` token |
//! | `recipientName`   | the recipient wallet address              |
//! | `issuerName`      | the issuer wallet address                 |
//! | `grade`           | `"Pass"`                                  |
//! | `skills`          | `["learning"]`                            |
//! | `issueDate`       | creation time (RFC 3339)                  |
//! | `completionDate`  | creation time (RFC 3339)                  |
//! | `status`          | `verified`                                |
//! | `blockchainHash`  | locally derived placeholder token         |

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{RegistryError, Result};

/// Validity status of a certificate.
///
/// Two states only: the transition `verified -> revoked` is the single legal
/// one and it is terminal. Legacy records spell the valid state `active` or
/// `valid`; both are accepted on input and written back as `verified`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CertificateStatus {
    #[serde(alias = "active", alias = "valid")]
    Verified,
    Revoked,
}

impl CertificateStatus {
    pub fn is_valid(self) -> bool {
        matches!(self, Self::Verified)
    }
}

/// A stored certificate record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    /// Storage-assigned document id; empty until the record is persisted
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub certificate_id: String,
    pub title: String,
    pub recipient_name: String,
    pub recipient_wallet: String,
    pub issuer_name: String,
    pub issuer_wallet: String,
    pub course_id: String,
    pub grade: String,
    pub skills: Vec<String>,
    pub issue_date: String,
    pub completion_date: String,
    pub status: CertificateStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_url: Option<String>,
    pub blockchain_hash: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Wire field names a certificate patch may touch.
///
/// Everything else — recipient/issuer/course identity, the ids, the
/// timestamps the store owns — is immutable after creation.
pub const MUTABLE_FIELDS: &[&str] = &[
    "status",
    "grade",
    "contentHash",
    "contentUrl",
    "metadataHash",
    "metadataUrl",
    "blockchainHash",
];

/// Caller-supplied fields for creating a certificate.
///
/// Every field is optional except the recipient wallet, which must be a
/// non-blank identifier; the policy is otherwise lenient and fills defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateInput {
    #[serde(default)]
    pub certificate_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub recipient_name: Option<String>,
    #[serde(default)]
    pub recipient_wallet: Option<String>,
    #[serde(default)]
    pub issuer_name: Option<String>,
    #[serde(default)]
    pub issuer_wallet: Option<String>,
    #[serde(default)]
    pub course_id: Option<String>,
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default)]
    pub skills: Option<Vec<String>>,
    #[serde(default)]
    pub issue_date: Option<String>,
    #[serde(default)]
    pub completion_date: Option<String>,
    #[serde(default)]
    pub status: Option<CertificateStatus>,
    #[serde(default)]
    pub blockchain_hash: Option<String>,
}

static CERT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Timestamp-derived token; the sequence suffix keeps ids distinct when two
/// certificates are created within one clock tick
fn generate_certificate_id() -> String {
    let millis = Utc::now().timestamp_millis();
    let seq = CERT_SEQ.fetch_add(1, Ordering::Relaxed) % 1000;
    format!("CERT_{}{:03}", millis, seq)
}

impl CertificateInput {
    /// Apply the default table and produce a normalized record.
    ///
    /// Fails only when the recipient wallet is missing or blank; all other
    /// gaps are filled per the table in the module docs.
    pub fn normalize(self) -> Result<Certificate> {
        let recipient_wallet = self
            .recipient_wallet
            .as_deref()
            .map(str::trim)
            .filter(|w| !w.is_empty())
            .ok_or_else(|| {
                RegistryError::Validation("recipient wallet must be a non-empty address".to_string())
            })?
            .to_string();

        let now = Utc::now().to_rfc3339();
        let issuer_wallet = self.issuer_wallet.unwrap_or_default();
        let skills = match self.skills {
            Some(skills) if !skills.is_empty() => skills,
            _ => vec!["learning".to_string()],
        };

        let mut certificate = Certificate {
            id: String::new(),
            certificate_id: self.certificate_id.unwrap_or_else(generate_certificate_id),
            title: self.title.unwrap_or_default(),
            recipient_name: self
                .recipient_name
                .unwrap_or_else(|| recipient_wallet.clone()),
            recipient_wallet,
            issuer_name: self.issuer_name.unwrap_or_else(|| issuer_wallet.clone()),
            issuer_wallet,
            course_id: self.course_id.unwrap_or_default(),
            grade: self.grade.unwrap_or_else(|| "Pass".to_string()),
            skills,
            issue_date: self.issue_date.unwrap_or_else(|| now.clone()),
            completion_date: self.completion_date.unwrap_or_else(|| now.clone()),
            status: self.status.unwrap_or(CertificateStatus::Verified),
            content_hash: None,
            content_url: None,
            metadata_hash: None,
            metadata_url: None,
            blockchain_hash: String::new(),
            created_at: now.clone(),
            updated_at: now,
        };
        certificate.blockchain_hash = self
            .blockchain_hash
            .unwrap_or_else(|| placeholder_hash(&certificate));
        Ok(certificate)
    }
}

/// Locally generated stand-in for the metadata hash, used until (or unless)
/// the certificate is anchored
fn placeholder_hash(certificate: &Certificate) -> String {
    let digest = Sha256::digest(
        format!(
            "{}:{}:{}",
            certificate.certificate_id, certificate.recipient_wallet, certificate.created_at
        )
        .as_bytes(),
    );
    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    format!("local_{}", &hex[..32])
}

impl Certificate {
    /// Human-readable rendition pinned as the certificate's content document
    pub fn render_text(&self) -> String {
        format!(
            "CERTIFICATE OF COMPLETION\n\n\
             This is to certify that\n\n\
             {recipient}\n\n\
             has successfully completed the course\n\n\
             {title}\n\n\
             Issued by: {issuer}\n\
             Issue Date: {issue_date}\n\
             Certificate ID: {certificate_id}\n\
             Grade: {grade}\n\n\
             Skills Acquired: {skills}\n",
            recipient = self.recipient_name,
            title = self.title,
            issuer = self.issuer_name,
            issue_date = self.issue_date,
            certificate_id = self.certificate_id,
            grade = self.grade,
            skills = self.skills.join(", "),
        )
    }

    /// JSON metadata document pinned alongside the content rendition.
    ///
    /// `content_url` is the already-pinned content address the metadata
    /// embeds, which is why the content pin must complete first.
    pub fn metadata_document(&self, content_url: &str, content_hash: &str) -> serde_json::Value {
        json!({
            "name": format!("Certificate: {}", self.title),
            "description": format!("Digital certificate issued to {}", self.recipient_name),
            "attributes": [
                { "trait_type": "Certificate ID", "value": self.certificate_id },
                { "trait_type": "Recipient", "value": self.recipient_name },
                { "trait_type": "Issuer", "value": self.issuer_name },
                { "trait_type": "Course", "value": self.title },
                { "trait_type": "Issue Date", "value": self.issue_date },
                { "trait_type": "Status", "value": self.status },
            ],
            "certificate_data": {
                "certificateId": self.certificate_id,
                "title": self.title,
                "recipientName": self.recipient_name,
                "recipientWallet": self.recipient_wallet,
                "issuerName": self.issuer_name,
                "issuerWallet": self.issuer_wallet,
                "courseId": self.course_id,
                "issueDate": self.issue_date,
                "completionDate": self.completion_date,
                "grade": self.grade,
                "skills": self.skills,
                "status": self.status,
                "fileUrl": content_url,
                "fileHash": content_hash,
            },
        })
    }

    /// Projection returned by validation lookups
    pub fn summary(&self) -> CertificateSummary {
        CertificateSummary {
            certificate_id: self.certificate_id.clone(),
            title: self.title.clone(),
            recipient_name: self.recipient_name.clone(),
            issuer_name: self.issuer_name.clone(),
            issue_date: self.issue_date.clone(),
            status: self.status,
        }
    }
}

/// Condensed certificate view for validation responses
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateSummary {
    pub certificate_id: String,
    pub title: String,
    pub recipient_name: String,
    pub issuer_name: String,
    pub issue_date: String,
    pub status: CertificateStatus,
}
