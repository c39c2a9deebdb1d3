//! Process configuration: bind address, persistence backend, default index type.
//!
//! Priority, highest wins: environment variables (`VDB_*`) > config file > defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use vdb_core::{Result, VdbError};
use vdb_storage::ConnectionConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub embedding: EmbeddingConfig,
    /// One of the registry's known index types. Validated against the
    /// registry at startup, not here.
    pub default_index_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub address: String,
    pub port: u16,
}

/// Address and credentials of the external text→vector provider `/v1/embed`
/// delegates to. The core never depends on this: it's consumed only by the
/// `vdb-server` embedding client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub endpoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub model: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434/api/embed".to_string(),
            api_key: None,
            model: "nomic-embed-text".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// "memory", "rocksdb", or "remote".
    pub backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    pub namespace: String,
    pub database: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig { address: "127.0.0.1".to_string(), port: 8080 },
            database: DatabaseConfig {
                backend: "memory".to_string(),
                path: None,
                endpoint: None,
                namespace: "vdb".to_string(),
                database: "main".to_string(),
                username: None,
                password: None,
            },
            embedding: EmbeddingConfig::default(),
            default_index_type: "flat".to_string(),
        }
    }
}

impl AppConfig {
    /// Load from `path` if it exists, then apply `VDB_*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = path {
            if path.exists() {
                config = Self::from_file(path)?;
            }
        }

        config.apply_env_overrides();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| VdbError::config(format!("failed to read config: {e}")))?;
        toml::from_str(&content).map_err(|e| VdbError::config(format!("failed to parse config: {e}")))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("VDB_ADDRESS") {
            self.server.address = val;
        }
        if let Ok(val) = std::env::var("VDB_PORT") {
            if let Ok(port) = val.parse() {
                self.server.port = port;
            }
        }
        if let Ok(val) = std::env::var("VDB_DB_BACKEND") {
            self.database.backend = val;
        }
        if let Ok(val) = std::env::var("VDB_DB_PATH") {
            self.database.path = Some(val);
        }
        if let Ok(val) = std::env::var("VDB_DB_ENDPOINT") {
            self.database.endpoint = Some(val);
        }
        if let Ok(val) = std::env::var("VDB_DB_NAMESPACE") {
            self.database.namespace = val;
        }
        if let Ok(val) = std::env::var("VDB_DB_NAME") {
            self.database.database = val;
        }
        if let Ok(val) = std::env::var("VDB_DB_USER") {
            self.database.username = Some(val);
        }
        if let Ok(val) = std::env::var("VDB_DB_PASSWORD") {
            self.database.password = Some(val);
        }
        if let Ok(val) = std::env::var("VDB_DEFAULT_INDEX_TYPE") {
            self.default_index_type = val;
        }
        if let Ok(val) = std::env::var("VDB_EMBEDDING_ENDPOINT") {
            self.embedding.endpoint = val;
        }
        if let Ok(val) = std::env::var("VDB_EMBEDDING_API_KEY") {
            self.embedding.api_key = Some(val);
        }
        if let Ok(val) = std::env::var("VDB_EMBEDDING_MODEL") {
            self.embedding.model = val;
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.address, self.server.port)
    }

    pub fn connection_config(&self) -> Result<ConnectionConfig> {
        let mut cfg = match self.database.backend.as_str() {
            "memory" => ConnectionConfig::memory(),
            "rocksdb" => {
                let path = self
                    .database
                    .path
                    .clone()
                    .ok_or_else(|| VdbError::config("database.path is required for the rocksdb backend"))?;
                ConnectionConfig::rocksdb(PathBuf::from(path))
            }
            "remote" => {
                let endpoint = self
                    .database
                    .endpoint
                    .clone()
                    .ok_or_else(|| VdbError::config("database.endpoint is required for the remote backend"))?;
                ConnectionConfig::remote(endpoint)
            }
            other => return Err(VdbError::config(format!("unknown database backend: {other}"))),
        };

        cfg = cfg.with_namespace(self.database.namespace.clone()).with_database(self.database.database.clone());
        if let (Some(user), Some(pass)) = (&self.database.username, &self.database.password) {
            cfg = cfg.with_auth(user.clone(), pass.clone());
        }
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_in_memory_backend() {
        let config = AppConfig::default();
        assert_eq!(config.database.backend, "memory");
        assert_eq!(config.default_index_type, "flat");
    }

    #[test]
    fn connection_config_rejects_rocksdb_without_path() {
        let mut config = AppConfig::default();
        config.database.backend = "rocksdb".to_string();
        assert!(config.connection_config().is_err());
    }
}
