//! Service-wide configuration.
//!
//! The core only recognizes one knob: which index type a library gets when
//! the caller doesn't specify one, or specifies one the registry doesn't
//! know. Everything else (bind address, storage mode, embedding provider
//! URL) lives in `vdb-server`, which is outside this crate's scope.

use serde::{Deserialize, Serialize};

pub const ENV_DEFAULT_INDEX_TYPE: &str = "VDB_DEFAULT_INDEX_TYPE";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    pub default_index_type: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self { default_index_type: "flat".to_string() }
    }
}

impl CoreConfig {
    /// Start from defaults, then apply the `VDB_DEFAULT_INDEX_TYPE` override
    /// if present.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(v) = std::env::var(ENV_DEFAULT_INDEX_TYPE) {
            if !v.trim().is_empty() {
                cfg.default_index_type = v;
            }
        }
        cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_index_type_is_flat() {
        assert_eq!(CoreConfig::default().default_index_type, "flat");
    }
}
