use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use souk_core::config::{AppConfig, ConfigError, LoadOptions};
use souk_core::domain::actor::IdentityProvider;
use souk_db::repositories::{
    FreelancerRepository, ServiceRepository, SqlCatalogRepository, SqlIdentityProvider,
    SqlOrderRepository, SqlQuotationRepository, SqlSettingsRepository,
};
use souk_db::{connect, migrations, DbPool};
use souk_engine::{LifecycleManager, LifecyclePolicies, OrderEngine};
use souk_notify::{LogDispatcher, NotificationDispatcher};

use crate::api::AppState;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub state: AppState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start");

    let db_pool =
        connect(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(event_name = "system.bootstrap.database_connected");

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "system.bootstrap.migrations_applied");

    let state = build_state(&config, db_pool.clone());
    Ok(Application { config, db_pool, state })
}

fn build_state(config: &AppConfig, pool: DbPool) -> AppState {
    let catalog = Arc::new(SqlCatalogRepository::new(pool.clone()));
    let quotations = Arc::new(SqlQuotationRepository::new(pool.clone()));
    let orders = Arc::new(SqlOrderRepository::new(pool.clone()));
    let settings = Arc::new(SqlSettingsRepository::new(pool.clone()));
    let identity: Arc<dyn IdentityProvider> = Arc::new(SqlIdentityProvider::new(pool));

    // LogDispatcher stands in for a mail transport.
    let dispatcher: Arc<dyn NotificationDispatcher> = if config.notifications.enabled {
        Arc::new(LogDispatcher)
    } else {
        Arc::new(NullDispatcher)
    };

    let lifecycle = Arc::new(LifecycleManager::new(
        quotations,
        Arc::clone(&catalog) as Arc<dyn ServiceRepository>,
        Arc::clone(&catalog) as Arc<dyn FreelancerRepository>,
        LifecyclePolicies::default(),
    ));
    let order_engine = Arc::new(OrderEngine::new(orders, catalog, settings, dispatcher));

    AppState { lifecycle, orders: order_engine, identity }
}

struct NullDispatcher;

#[async_trait::async_trait]
impl NotificationDispatcher for NullDispatcher {
    async fn dispatch(
        &self,
        _notification: souk_notify::Notification,
    ) -> Result<(), souk_notify::DispatchError> {
        Ok(())
    }
}
