use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::env;

use crate::infrastructure::id_generator::MAX_NODE_ID;
use crate::schemas::FieldValidation;
use crate::services::page_service::DeletePolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub cache: CacheConfig,
    pub workspace: WorkspaceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Built client assets served for any non-API path
    pub static_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub session_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    pub delete_policy: DeletePolicy,
    pub field_validation: FieldValidation,
    pub change_feed_capacity: usize,
    pub node_id: u16,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key/value source; unset keys fall back to defaults
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let delete_policy = match lookup("DELETE_POLICY") {
            Some(v) => v
                .parse::<DeletePolicy>()
                .map_err(anyhow::Error::msg)
                .context("DELETE_POLICY")?,
            None => DeletePolicy::default(),
        };
        let field_validation = match lookup("FIELD_VALIDATION") {
            Some(v) => v
                .parse::<FieldValidation>()
                .map_err(anyhow::Error::msg)
                .context("FIELD_VALIDATION")?,
            None => FieldValidation::default(),
        };
        let node_id = lookup("NODE_ID")
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(0);
        if node_id > MAX_NODE_ID {
            anyhow::bail!("NODE_ID must be at most {}, got {}", MAX_NODE_ID, node_id);
        }

        Ok(Self {
            database: DatabaseConfig {
                url: lookup("DATABASE_URL")
                    .unwrap_or_else(|| "sqlite:data/pagebase.db".to_string()),
            },
            server: ServerConfig {
                host: lookup("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: lookup("SERVER_PORT")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(3000),
                static_dir: lookup("STATIC_DIR").unwrap_or_else(|| "frontend/build".to_string()),
            },
            cache: CacheConfig {
                session_capacity: lookup("SESSION_CACHE_CAPACITY")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(1000),
            },
            workspace: WorkspaceConfig {
                delete_policy,
                field_validation,
                change_feed_capacity: lookup("CHANGE_FEED_CAPACITY")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(256),
                node_id,
            },
        })
    }

    /// Defaults against a private in-memory database
    pub fn in_memory() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite::memory:".to_string(),
            },
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                static_dir: "frontend/build".to_string(),
            },
            cache: CacheConfig {
                session_capacity: 64,
            },
            workspace: WorkspaceConfig {
                delete_policy: DeletePolicy::default(),
                field_validation: FieldValidation::default(),
                change_feed_capacity: 64,
                node_id: 0,
            },
        }
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
