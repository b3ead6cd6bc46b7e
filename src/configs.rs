use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub pinning: PinningConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Which document-store backend to run against
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// In-process store, contents lost on exit
    Memory,
    /// Firestore REST backend
    Firestore,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_store_backend")]
    pub backend: StoreBackend,
    /// Firestore project id, required when backend = "firestore"
    #[serde(default)]
    pub project_id: String,
    /// Firestore web API key
    #[serde(default = "default_secret")]
    pub api_key: SecretString,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            project_id: String::new(),
            api_key: default_secret(),
        }
    }
}

fn default_store_backend() -> StoreBackend {
    StoreBackend::Memory
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PinningProvider {
    /// Content addresses derived locally, nothing leaves the process
    Local,
    /// Pinata pinning API
    Pinata,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PinningConfig {
    #[serde(default = "default_pinning_provider")]
    pub provider: PinningProvider,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_secret")]
    pub api_secret: SecretString,
    #[serde(default = "default_secret")]
    pub jwt: SecretString,
    #[serde(default = "default_pinning_base_url")]
    pub base_url: String,
    #[serde(default = "default_pinning_gateway_url")]
    pub gateway_url: String,
}

impl Default for PinningConfig {
    fn default() -> Self {
        Self {
            provider: default_pinning_provider(),
            api_key: String::new(),
            api_secret: default_secret(),
            jwt: default_secret(),
            base_url: default_pinning_base_url(),
            gateway_url: default_pinning_gateway_url(),
        }
    }
}

fn default_pinning_provider() -> PinningProvider {
    PinningProvider::Local
}

fn default_pinning_base_url() -> String {
    "https://api.pinata.cloud".to_string()
}

fn default_pinning_gateway_url() -> String {
    "https://gateway.pinata.cloud".to_string()
}

fn default_secret() -> SecretString {
    SecretString::new(String::new())
}

#[derive(Debug, Deserialize, Clone)]
pub struct RegistryConfig {
    /// The contract-owner wallet. Always resolves to the admin role,
    /// independent of any stored role assignment.
    #[serde(default = "default_owner_account")]
    pub owner_account: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            owner_account: default_owner_account(),
        }
    }
}

fn default_owner_account() -> String {
    "bernieio.testnet".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    #[serde(default = "default_web_root")]
    pub web_root: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            web_root: default_web_root(),
        }
    }
}

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    3000
}

fn default_web_root() -> PathBuf {
    PathBuf::from("web_root")
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> Result<Self> {
        let config_str =
            fs::read_to_string(path).context(format!("Failed to read config file: {}", path))?;

        let config: AppConfig =
            toml::from_str(&config_str).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration with default path (config.toml), falling back to
    /// built-in defaults when the file does not exist
    pub fn load() -> Result<Self> {
        if std::path::Path::new("config.toml").exists() {
            Self::from_file("config.toml")
        } else {
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.pinning.provider, PinningProvider::Local);
        assert_eq!(config.registry.owner_account, "bernieio.testnet");
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [server]
            port = 8080

            [store]
            backend = "firestore"
            project_id = "demo-project"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.store.backend, StoreBackend::Firestore);
        assert_eq!(config.store.project_id, "demo-project");
        assert_eq!(config.pinning.provider, PinningProvider::Local);
    }
}
