use std::sync::Arc;

use crate::auth::repo::{MemoryUserStore, PgUserStore, UserStore};
use crate::config::AppConfig;
use crate::db;
use crate::movies::memory::MemoryMovieStore;
use crate::movies::repo::{MovieStore, PgMovieStore};

/// Shared handler state. Stores are built once at startup and injected
/// into every handler through axum's `State`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub movies: Arc<dyn MovieStore>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let pool = db::connect(&config).await?;
        db::migrate(&pool).await;

        let users = Arc::new(PgUserStore::new(pool.clone())) as Arc<dyn UserStore>;
        let movies = Arc::new(PgMovieStore::new(pool)) as Arc<dyn MovieStore>;
        Ok(Self::from_parts(Arc::new(config), users, movies))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserStore>,
        movies: Arc<dyn MovieStore>,
    ) -> Self {
        Self {
            config,
            users,
            movies,
        }
    }

    /// State backed by in-memory stores, seeded with `movies`.
    pub fn in_memory(config: AppConfig, movies: MemoryMovieStore) -> Self {
        Self::from_parts(
            Arc::new(config),
            Arc::new(MemoryUserStore::default()),
            Arc::new(movies),
        )
    }
}
