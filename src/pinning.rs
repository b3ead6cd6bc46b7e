//! Content Pinning Module
//!
//! Collaborator seam for anchoring certificate content to content-addressed
//! storage. The registry pins two documents per certificate: a human-readable
//! text rendition, then a JSON metadata document that embeds the rendition's
//! address. Anchoring is best-effort throughout — see
//! [`crate::store::CertificateStore::anchor`].

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::configs::PinningConfig;
use crate::error::Result;

/// Address assigned by the pinning collaborator
#[derive(Debug, Clone)]
pub struct PinReceipt {
    pub content_id: String,
    pub retrieval_url: String,
}

/// Content-addressing collaborator
#[async_trait]
pub trait ContentPinner: Send + Sync {
    /// Pin raw bytes under the given name
    async fn pin_bytes(&self, bytes: Vec<u8>, name: &str) -> Result<PinReceipt>;

    /// Pin a JSON document under the given name
    async fn pin_json(&self, value: &Value, name: &str) -> Result<PinReceipt>;
}

/// Pinata HTTP client.
///
/// Talks to the `pinFileToIPFS` / `pinJSONToIPFS` endpoints and derives
/// retrieval URLs from the configured gateway. Credentials stay wrapped in
/// [`SecretString`] until the moment a request is built.
pub struct PinataClient {
    http: reqwest::Client,
    base_url: String,
    gateway_url: String,
    api_key: String,
    api_secret: SecretString,
    jwt: SecretString,
}

#[derive(Debug, Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
}

impl PinataClient {
    pub fn new(config: &PinningConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            gateway_url: config.gateway_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            jwt: config.jwt.clone(),
        }
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("pinata_api_key", &self.api_key)
            .header("pinata_secret_api_key", self.api_secret.expose_secret())
            .bearer_auth(self.jwt.expose_secret())
    }

    fn receipt(&self, hash: String) -> PinReceipt {
        PinReceipt {
            retrieval_url: format!("{}/ipfs/{}", self.gateway_url, hash),
            content_id: hash,
        }
    }
}

#[async_trait]
impl ContentPinner for PinataClient {
    async fn pin_bytes(&self, bytes: Vec<u8>, name: &str) -> Result<PinReceipt> {
        let metadata = serde_json::json!({ "name": name }).to_string();
        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(bytes).file_name(name.to_string()),
            )
            .text("pinataMetadata", metadata);

        let response = self
            .authorized(
                self.http
                    .post(format!("{}/pinning/pinFileToIPFS", self.base_url)),
            )
            .multipart(form)
            .send()
            .await?
            .error_for_status()?;

        let pin: PinResponse = response.json().await?;
        Ok(self.receipt(pin.ipfs_hash))
    }

    async fn pin_json(&self, value: &Value, name: &str) -> Result<PinReceipt> {
        let body = serde_json::json!({
            "pinataContent": value,
            "pinataMetadata": { "name": name },
        });

        let response = self
            .authorized(
                self.http
                    .post(format!("{}/pinning/pinJSONToIPFS", self.base_url)),
            )
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let pin: PinResponse = response.json().await?;
        Ok(self.receipt(pin.ipfs_hash))
    }
}

/// Pinner that derives content addresses locally and never leaves the
/// process. Used when no pinning credentials are configured, and as the
/// deterministic double in tests.
#[derive(Debug, Default)]
pub struct LocalPinner;

impl LocalPinner {
    pub fn new() -> Self {
        Self
    }

    fn derive(bytes: &[u8]) -> PinReceipt {
        let digest = Sha256::digest(bytes);
        let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
        let content_id = hex[..46.min(hex.len())].to_string();
        PinReceipt {
            retrieval_url: format!("local://{}", content_id),
            content_id,
        }
    }
}

#[async_trait]
impl ContentPinner for LocalPinner {
    async fn pin_bytes(&self, bytes: Vec<u8>, _name: &str) -> Result<PinReceipt> {
        Ok(Self::derive(&bytes))
    }

    async fn pin_json(&self, value: &Value, _name: &str) -> Result<PinReceipt> {
        Ok(Self::derive(value.to_string().as_bytes()))
    }
}

/// Pinner whose every call fails, for exercising the best-effort anchoring
/// path
#[cfg(test)]
pub struct FailingPinner;

#[cfg(test)]
#[async_trait]
impl ContentPinner for FailingPinner {
    async fn pin_bytes(&self, _bytes: Vec<u8>, _name: &str) -> Result<PinReceipt> {
        Err(crate::error::RegistryError::Collaborator(
            "pinning service unavailable".to_string(),
        ))
    }

    async fn pin_json(&self, _value: &Value, _name: &str) -> Result<PinReceipt> {
        Err(crate::error::RegistryError::Collaborator(
            "pinning service unavailable".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_pinner_is_deterministic() {
        let pinner = LocalPinner::new();
        let a = pinner.pin_bytes(b"hello".to_vec(), "a.txt").await.unwrap();
        let b = pinner.pin_bytes(b"hello".to_vec(), "b.txt").await.unwrap();
        assert_eq!(a.content_id, b.content_id);
        assert!(a.retrieval_url.starts_with("local://"));

        let c = pinner.pin_bytes(b"other".to_vec(), "c.txt").await.unwrap();
        assert_ne!(a.content_id, c.content_id);
    }

    #[tokio::test]
    async fn test_local_pinner_json_matches_serialization() {
        let pinner = LocalPinner::new();
        let value = serde_json::json!({"k": "v"});
        let from_json = pinner.pin_json(&value, "m.json").await.unwrap();
        let from_bytes = pinner
            .pin_bytes(value.to_string().into_bytes(), "m.json")
            .await
            .unwrap();
        assert_eq!(from_json.content_id, from_bytes.content_id);
    }
}
