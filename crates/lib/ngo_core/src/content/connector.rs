//! Connects the session pool to a content store.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::debug;

use super::ContentStore;
use super::memory::InMemoryContentStore;
use super::queries::PgContentStore;
use crate::pool::{Connector, PoolError};

/// Default connection cap of the shared content pool.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Where session handles come from.
#[derive(Debug, Clone)]
pub enum ContentConnector {
    /// Every session leases a handle on one capped Postgres pool, so the
    /// number of sessions never changes the number of connections.
    Postgres(PgPool),
    /// Every session shares one in-process store.
    Memory(Arc<InMemoryContentStore>),
}

impl ContentConnector {
    /// Shared pool over `url`. Connections open on first use.
    pub fn postgres(url: &str, max_connections: u32) -> Result<Self, PoolError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_lazy(url)
            .map_err(|e| PoolError::Connection(e.to_string()))?;
        Ok(Self::Postgres(pool))
    }

    pub fn memory() -> Self {
        Self::Memory(Arc::new(InMemoryContentStore::new()))
    }

    /// Close the shared Postgres pool. Call after the session pool shut down.
    pub async fn shutdown(&self) {
        if let ContentConnector::Postgres(pool) = self {
            pool.close().await;
        }
    }
}

#[async_trait]
impl Connector for ContentConnector {
    type Handle = Arc<dyn ContentStore>;

    async fn connect(&self) -> Result<Self::Handle, PoolError> {
        match self {
            ContentConnector::Postgres(pool) => {
                debug!(
                    idle = pool.num_idle(),
                    size = pool.size(),
                    "leased content store handle"
                );
                Ok(Arc::new(PgContentStore::new(pool.clone())))
            }
            ContentConnector::Memory(store) => Ok(store.clone()),
        }
    }

    async fn close(&self, handle: Self::Handle) -> Result<(), PoolError> {
        handle
            .close()
            .await
            .map_err(|e| PoolError::Close(e.to_string()))
    }
}
