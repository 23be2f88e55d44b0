//! Runtime wiring: storage backend, change notifier, hooks.

use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use federation_infra::config::{Settings, StorageSettings};
use federation_infra::notify::{ChangeNotifier, NoopNotifier, RedisChangeNotifier};
use federation_infra::repository::{Repository, TracingAuditHook};
use federation_infra::service::RegistryService;
use federation_infra::store::{InMemoryRegistryStore, PostgresRegistryStore, RegistryStore};

/// Storage handle shared by every request.
pub type SharedStore = Arc<dyn RegistryStore>;

/// Services shared by every HTTP handler.
#[derive(Clone)]
pub struct AppServices {
    pub registry: RegistryService<SharedStore>,
}

pub async fn build_services(settings: &Settings) -> anyhow::Result<AppServices> {
    match &settings.storage {
        StorageSettings::InMemory => Ok(build_in_memory_services(settings)),
        StorageSettings::Persistent {
            database_url,
            redis_url,
        } => build_persistent_services(settings, database_url, redis_url).await,
    }
}

fn build_in_memory_services(settings: &Settings) -> AppServices {
    tracing::info!("using in-memory registry store");
    let store: SharedStore = Arc::new(InMemoryRegistryStore::new());
    assemble(settings, store, Arc::new(NoopNotifier))
}

async fn build_persistent_services(
    settings: &Settings,
    database_url: &str,
    redis_url: &str,
) -> anyhow::Result<AppServices> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .context("failed to connect to Postgres")?;

    let store = PostgresRegistryStore::new(pool);
    store
        .ensure_schema()
        .await
        .context("failed to apply registry schema")?;

    let notifier = RedisChangeNotifier::connect(redis_url)
        .await
        .context("failed to connect to Redis")?;

    tracing::info!("using Postgres registry store with Redis change notices");
    Ok(assemble(settings, Arc::new(store), Arc::new(notifier)))
}

fn assemble(
    settings: &Settings,
    store: SharedStore,
    notifier: Arc<dyn ChangeNotifier>,
) -> AppServices {
    let repo = Repository::new(store, notifier)
        .with_notice(settings.notice.clone())
        .with_notify_timeout(settings.notify_timeout)
        .with_hook(Arc::new(TracingAuditHook));

    AppServices {
        registry: RegistryService::new(repo),
    }
}
