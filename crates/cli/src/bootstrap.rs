//! Shared startup path: config, pool, migrations, store, engine.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use repfuel_agent::{LlmClient, OpenAiCompatClient, ToolRegistry, WorkflowEngine};
use repfuel_core::{AppConfig, ConfigError, LoadOptions};
use repfuel_db::{connect_with_settings, migrations, DbPool, DocumentStore, SqlDocumentStore};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub engine: WorkflowEngine,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("model client setup failed: {0}")]
    Llm(String),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "bootstrap_start", "starting application bootstrap");

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(event_name = "bootstrap_database_connected", "database connection established");

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "bootstrap_migrations_applied", "database migrations applied");

    let store: Arc<dyn DocumentStore> = Arc::new(SqlDocumentStore::new(db_pool.clone()));
    let llm: Arc<dyn LlmClient> = Arc::new(
        OpenAiCompatClient::new(config.llm.clone())
            .map_err(|error| BootstrapError::Llm(error.to_string()))?,
    );
    let tools = ToolRegistry::standard(store.clone(), config.macros.clone());
    let engine = WorkflowEngine::new(store, llm, tools, config.agent.clone(), &config.llm);

    Ok(Application { config, db_pool, engine })
}
