//! Opening the SurrealDB handle shared by every warden repository.

use serde::Deserialize;
use surrealdb::Surreal;
use surrealdb::engine::any::{self, Any};
use surrealdb::opt::auth::Root;
use tracing::{debug, info};

use crate::error::DbError;

/// Address schemes served in-process; these have no root user.
const EMBEDDED_SCHEMES: &[&str] = &["mem://", "memory", "surrealkv://", "rocksdb://"];

/// Where warden keeps its data.
///
/// `endpoint` is any SurrealDB address: `ws://host:port` for a server,
/// `mem://` for an embedded in-memory store.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    pub endpoint: String,
    pub namespace: String,
    pub database: String,
    /// Root credentials, ignored for embedded endpoints.
    pub username: String,
    pub password: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            endpoint: "ws://127.0.0.1:8000".into(),
            namespace: "warden".into(),
            database: "main".into(),
            username: "root".into(),
            password: "root".into(),
        }
    }
}

impl DbConfig {
    pub fn is_embedded(&self) -> bool {
        EMBEDDED_SCHEMES
            .iter()
            .any(|scheme| self.endpoint.starts_with(scheme))
    }
}

/// Open the configured store and select its namespace and database.
///
/// Remote endpoints are signed into as root. The handle is returned only
/// after the store answers a health check.
pub async fn connect(config: &DbConfig) -> Result<Surreal<Any>, DbError> {
    info!(
        endpoint = %config.endpoint,
        namespace = %config.namespace,
        database = %config.database,
        "Opening warden store"
    );

    let db = any::connect(config.endpoint.as_str())
        .await
        .map_err(|e| DbError::Connection(format!("{}: {e}", config.endpoint)))?;

    if config.is_embedded() {
        debug!("Embedded store, skipping sign-in");
    } else {
        db.signin(Root {
            username: config.username.clone(),
            password: config.password.clone(),
        })
        .await
        .map_err(|e| DbError::Connection(format!("sign-in as {}: {e}", config.username)))?;
    }

    db.use_ns(&config.namespace).use_db(&config.database).await?;
    db.health()
        .await
        .map_err(|e| DbError::Connection(format!("health check: {e}")))?;

    Ok(db)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_endpoints_are_recognised() {
        let mut config = DbConfig::default();
        assert!(!config.is_embedded());

        config.endpoint = "mem://".into();
        assert!(config.is_embedded());
        config.endpoint = "surrealkv:///var/lib/warden".into();
        assert!(config.is_embedded());
        config.endpoint = "wss://db.internal".into();
        assert!(!config.is_embedded());
    }
}
