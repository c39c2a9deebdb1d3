//! Connection configuration for SurrealDB.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use vdb_core::{Result, VdbError};

/// Connection mode for SurrealDB.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ConnectionMode {
    /// In-memory database. Data does not survive process restart.
    Memory,
    /// RocksDB file storage.
    RocksDb { path: PathBuf },
    /// Remote server.
    Remote { endpoint: String },
}

/// Configuration for a SurrealDB connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub mode: ConnectionMode,
    pub namespace: String,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl ConnectionConfig {
    pub fn memory() -> Self {
        Self {
            mode: ConnectionMode::Memory,
            namespace: "vdb".to_string(),
            database: "main".to_string(),
            username: None,
            password: None,
        }
    }

    pub fn rocksdb(path: PathBuf) -> Self {
        Self { mode: ConnectionMode::RocksDb { path }, ..Self::memory() }
    }

    pub fn remote(endpoint: String) -> Self {
        Self { mode: ConnectionMode::Remote { endpoint }, ..Self::memory() }
    }

    pub fn with_namespace(mut self, namespace: String) -> Self {
        self.namespace = namespace;
        self
    }

    pub fn with_database(mut self, database: String) -> Self {
        self.database = database;
        self
    }

    pub fn with_auth(mut self, username: String, password: String) -> Self {
        self.username = Some(username);
        self.password = Some(password);
        self
    }

    pub fn connection_string(&self) -> Result<String> {
        match &self.mode {
            ConnectionMode::Memory => Ok("mem://".to_string()),
            ConnectionMode::RocksDb { path } => {
                let path_str = path.to_str().ok_or_else(|| VdbError::config("invalid path for rocksdb"))?;
                Ok(format!("rocksdb://{}", path_str))
            }
            ConnectionMode::Remote { endpoint } => Ok(endpoint.clone()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.namespace.is_empty() {
            return Err(VdbError::config("namespace cannot be empty"));
        }
        if self.database.is_empty() {
            return Err(VdbError::config("database name cannot be empty"));
        }
        Ok(())
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::memory()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_config_defaults() {
        let config = ConnectionConfig::memory();
        assert!(matches!(config.mode, ConnectionMode::Memory));
        assert_eq!(config.connection_string().unwrap(), "mem://");
    }

    #[test]
    fn rocksdb_connection_string_uses_path() {
        let config = ConnectionConfig::rocksdb(PathBuf::from("/tmp/vdb.db"));
        assert!(config.connection_string().unwrap().starts_with("rocksdb://"));
    }

    #[test]
    fn empty_namespace_fails_validation() {
        let mut config = ConnectionConfig::memory();
        config.namespace = String::new();
        assert!(config.validate().is_err());
    }
}
