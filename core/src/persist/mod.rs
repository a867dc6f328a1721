use anyhow::Context;
use log::info;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::sync::Arc;

use crate::config::DatabaseConfig;

pub mod mapper;
pub mod repo;

#[derive(Clone)]
pub struct PersistCtx {
    pub db: Arc<DatabaseConnection>,
}

impl PersistCtx {
    pub async fn new(config: &DatabaseConfig) -> anyhow::Result<Self> {
        Self::connect(&config.url).await
    }

    /// Connect and bring the schema up to date.
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let mut options = ConnectOptions::new(url.to_owned());
        options.sqlx_logging(false);
        // Every pooled connection to `:memory:` would otherwise see its own empty database.
        if url.contains(":memory:") {
            options.max_connections(1).min_connections(1);
        }

        let db = Database::connect(options)
            .await
            .with_context(|| format!("Failed to connect to database {url}"))?;
        Migrator::up(&db, None)
            .await
            .context("Failed to run database migrations")?;
        info!("Database ready");

        Ok(Self::from_conn(db))
    }

    /// Inject an existing `DatabaseConnection`.
    pub fn from_conn(conn: DatabaseConnection) -> Self {
        Self { db: Arc::new(conn) }
    }
}
