//! TCP serving on top of tokio.

pub mod listener;
pub mod transport;

use std::sync::Arc;

use tokio::net::TcpListener;

use crate::config::ServerSettings;
use crate::dispatch::DispatchChain;

pub use transport::TcpTransport;

/// A configured server: settings plus the handler chain, both frozen once
/// serving starts.
#[derive(Debug, Clone)]
pub struct Server {
    settings: ServerSettings,
    chain: Arc<DispatchChain>,
}

impl Server {
    pub fn new(settings: ServerSettings, chain: DispatchChain) -> Self {
        Self {
            settings,
            chain: Arc::new(chain),
        }
    }

    pub fn settings(&self) -> &ServerSettings {
        &self.settings
    }

    pub fn chain(&self) -> &DispatchChain {
        &self.chain
    }

    /// Binds `listen_addr` and serves until the task is dropped.
    pub async fn run(&self, listen_addr: &str) -> anyhow::Result<()> {
        listener::run(listen_addr, Arc::clone(&self.chain), self.settings).await
    }

    /// Serves on an already bound listener.
    pub async fn serve(&self, listener: TcpListener) -> anyhow::Result<()> {
        listener::serve(listener, Arc::clone(&self.chain), self.settings).await
    }
}
