use std::sync::Arc;

use crate::auth::repo::{TokenRepo, UserRepo};
use crate::config::AppConfig;
use crate::db::PgStore;
use crate::recipes::repo::RecipeRepo;
use crate::storage::{S3Storage, StorageClient};
use crate::taxonomy::repo::TaxonomyRepo;

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepo>,
    pub tokens: Arc<dyn TokenRepo>,
    pub taxonomy: Arc<dyn TaxonomyRepo>,
    pub recipes: Arc<dyn RecipeRepo>,
    pub config: Arc<AppConfig>,
    pub storage: Arc<dyn StorageClient>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let store = PgStore::connect(&config.database_url).await?;
        store.migrate().await?;
        tracing::info!("database ready");

        let s3 = S3Storage::connect(&config.storage).await?;
        if config.storage.create_bucket {
            s3.ensure_bucket().await?;
        }
        tracing::info!(bucket = %config.storage.bucket, "storage ready");
        let storage = Arc::new(s3) as Arc<dyn StorageClient>;

        Ok(Self::from_parts(Arc::new(store), Arc::new(config), storage))
    }

    /// Wires one store implementation into every repository slot.
    pub fn from_parts<S>(store: Arc<S>, config: Arc<AppConfig>, storage: Arc<dyn StorageClient>) -> Self
    where
        S: UserRepo + TokenRepo + TaxonomyRepo + RecipeRepo + 'static,
    {
        Self {
            users: store.clone(),
            tokens: store.clone(),
            taxonomy: store.clone(),
            recipes: store,
            config,
            storage,
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        Self::fake_with(Arc::new(crate::storage::MemoryStorage::default()))
    }

    #[cfg(test)]
    pub fn fake_with(storage: Arc<crate::storage::MemoryStorage>) -> Self {
        Self::from_parts(
            Arc::new(crate::db::memory::MemoryStore::default()),
            Arc::new(AppConfig::for_tests()),
            storage,
        )
    }
}
