//! Publish server.

use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;

use super::router::create_router;
use super::snapshot::SnapshotSlot;
use crate::config::ServerConfig;
use crate::error::{FeedmergeError, Result};

/// HTTP server publishing the current snapshot.
///
/// [`PublishServer::bind`] binds before any task is spawned; [`serve`](Self::serve)
/// only runs the accept loop.
pub struct PublishServer {
    listener: TcpListener,
    router: Router,
    local_addr: SocketAddr,
}

impl PublishServer {
    /// Bind the listener and build the router.
    pub async fn bind(
        addr: SocketAddr,
        config: &ServerConfig,
        slot: SnapshotSlot,
    ) -> Result<Self> {
        let router = create_router(&config.path, &config.content_type, slot)?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| FeedmergeError::Server(format!("failed to bind {}: {}", addr, e)))?;
        let local_addr = listener.local_addr()?;

        Ok(Self {
            listener,
            router,
            local_addr,
        })
    }

    /// Get the bound address.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve until `stop` turns true, then close the listener.
    pub async fn serve(self, mut stop: watch::Receiver<bool>) -> Result<()> {
        tracing::info!("Publish server listening on http://{}", self.local_addr);

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = stop.wait_for(|stopped| *stopped).await;
            })
            .await
            .map_err(|e| FeedmergeError::Server(e.to_string()))?;

        tracing::info!("Publish server stopped");
        Ok(())
    }
}
