use crate::auth::password::CredentialHasher;
use crate::config::AppConfig;
use crate::users::{
    memory::MemoryUserStore,
    repo::{PgUserStore, UserStore},
};
use anyhow::Context;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub hasher: CredentialHasher,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let hasher = CredentialHasher::new(&config.hashing).context("build password hasher")?;

        let users = if config.database_url.starts_with("memory:") {
            warn!("using in-memory user store; data is lost on restart");
            Arc::new(MemoryUserStore::new()) as Arc<dyn UserStore>
        } else {
            let store =
                PgUserStore::connect(&config.database_url, config.max_connections).await?;
            store.migrate().await?;
            info!("database ready");
            Arc::new(store) as Arc<dyn UserStore>
        };

        if config.maintenance {
            warn!("maintenance mode enabled; POST /users/clear is reachable");
        }

        Ok(Self::from_parts(users, hasher, config))
    }

    pub fn from_parts(
        users: Arc<dyn UserStore>,
        hasher: CredentialHasher,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            users,
            hasher,
            config,
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        Self::fake_config(false)
    }

    #[cfg(test)]
    pub fn fake_with_maintenance() -> Self {
        Self::fake_config(true)
    }

    #[cfg(test)]
    fn fake_config(maintenance: bool) -> Self {
        use crate::config::HashingConfig;

        let hashing = HashingConfig {
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
        };
        let config = Arc::new(AppConfig {
            database_url: "memory://".into(),
            max_connections: 1,
            host: "127.0.0.1".into(),
            port: 0,
            maintenance,
            hashing,
        });
        Self::from_parts(
            Arc::new(MemoryUserStore::new()),
            crate::auth::password::cheap_hasher(),
            config,
        )
    }
}
