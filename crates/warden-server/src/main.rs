//! warden server: application entry point.

mod config;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;
use warden_db::repository::{
    SurrealGroupRepository, SurrealMembershipStore, SurrealResourceRepository,
    SurrealRoleRepository, SurrealTitleRepository, SurrealUserRepository,
};
use warden_db::run_migrations;
use warden_service::AdminApi;

use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("warden=info".parse().context("parse log directive")?),
        )
        .json()
        .init();

    info!("Starting warden server...");

    let config = ServerConfig::from_env_or_yaml()?;
    let db = warden_db::connect(&config.db)
        .await
        .context("open warden store")?;
    run_migrations(&db).await.context("run schema migrations")?;

    let api = AdminApi::new(
        SurrealUserRepository::new(db.clone()),
        SurrealGroupRepository::new(db.clone()),
        SurrealRoleRepository::new(db.clone()),
        SurrealTitleRepository::new(db.clone()),
        SurrealResourceRepository::new(db.clone()),
        SurrealMembershipStore::new(db),
        config.service.clone(),
    );

    let groups = api.list_groups().await;
    info!(
        successful = groups.successful,
        visible_groups = groups.data.map(|g| g.len()).unwrap_or(0),
        max_page_size = config.service.max_page_size,
        "warden ready"
    );

    tokio::signal::ctrl_c()
        .await
        .context("wait for shutdown signal")?;

    info!("warden server stopped.");
    Ok(())
}
