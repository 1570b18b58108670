use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::ServerSettings;
use crate::dispatch::DispatchChain;
use crate::server::transport::drive;

pub async fn run(
    listen_addr: &str,
    chain: Arc<DispatchChain>,
    settings: ServerSettings,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind {listen_addr}"))?;
    info!("Listening on {}", listen_addr);

    serve(listener, chain, settings).await
}

/// Accepts connections forever, one task per connection.
pub async fn serve(
    listener: TcpListener,
    chain: Arc<DispatchChain>,
    settings: ServerSettings,
) -> anyhow::Result<()> {
    loop {
        let (socket, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                error!(error = %e, "accept failed");
                continue;
            }
        };
        info!("Accepted connection from {}", peer);

        let chain = Arc::clone(&chain);
        tokio::spawn(async move {
            if let Err(e) = drive(socket, peer, chain, settings).await {
                error!("Connection error from {}: {}", peer, e);
            }
        });
    }
}
