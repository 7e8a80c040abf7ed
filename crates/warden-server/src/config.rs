use std::fs;

use anyhow::{Context, Result};
use serde::Deserialize;
use warden_db::DbConfig;
use warden_service::ServiceConfig;

// Server configuration sourced from environment variables.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    pub db: DbConfig,
    pub service: ServiceConfig,
}

#[derive(Debug, Deserialize)]
struct ServerConfigOverride {
    db: Option<DbConfig>,
    service: Option<ServiceConfig>,
}

fn env_u64(name: &str, default: u64) -> Result<u64> {
    match std::env::var(name) {
        Ok(raw) => raw.parse().with_context(|| format!("parse {name}")),
        Err(_) => Ok(default),
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let var_or = |name: &str, default: String| std::env::var(name).unwrap_or(default);

        let db = DbConfig {
            endpoint: var_or("WARDEN_DB_ENDPOINT", defaults.db.endpoint),
            namespace: var_or("WARDEN_DB_NS", defaults.db.namespace),
            database: var_or("WARDEN_DB_NAME", defaults.db.database),
            username: var_or("WARDEN_DB_USER", defaults.db.username),
            password: var_or("WARDEN_DB_PASS", defaults.db.password),
        };
        let service = ServiceConfig {
            default_page_size: env_u64(
                "WARDEN_DEFAULT_PAGE_SIZE",
                defaults.service.default_page_size,
            )?,
            max_page_size: env_u64("WARDEN_MAX_PAGE_SIZE", defaults.service.max_page_size)?,
        };
        Ok(Self { db, service })
    }

    pub fn from_env_or_yaml() -> Result<Self> {
        let mut config = Self::from_env()?;
        if let Ok(path) = std::env::var("WARDEN_CONFIG") {
            let contents =
                fs::read_to_string(&path).with_context(|| format!("read WARDEN_CONFIG: {path}"))?;
            config.apply_yaml(&contents)?;
        }
        Ok(config)
    }

    fn apply_yaml(&mut self, contents: &str) -> Result<()> {
        let override_cfg: ServerConfigOverride =
            serde_yaml::from_str(contents).with_context(|| "parse warden config yaml")?;
        if let Some(db) = override_cfg.db {
            self.db = db;
        }
        if let Some(service) = override_cfg.service {
            self.service = service;
        }
        Ok(())
    }
}
