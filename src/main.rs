use anyhow::Context;
use ember::{Config, DispatchChain, Method, Server};
use tracing::info;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::load().context("failed to load configuration")?;

    let mut chain = DispatchChain::new();
    chain
        .add_general(|req, _res, _next| {
            info!(
                method = req.method().map(|m| m.as_str()).unwrap_or("-"),
                path = req.path_str().unwrap_or("-"),
                "request"
            );
        })
        .add_router(Method::GET, "/health", |_req, res, _next| {
            let _ = res
                .set_status(200u16, None)
                .and_then(|_| res.set_body(b"ok", Some("text/plain")))
                .and_then(|_| res.send());
        })
        .add_router(Method::GET, "/query", |req, res, _next| {
            let body = req.query_json().to_string();
            let _ = res
                .set_status(200u16, None)
                .and_then(|_| res.set_body(body.as_bytes(), Some("application/json")))
                .and_then(|_| res.send());
        });
    for directory in &cfg.static_files.directories {
        chain.add_static(directory.clone());
    }

    let server = Server::new(cfg.settings(), chain);

    tokio::select! {
        res = server.run(&cfg.server.listen_addr) => {
            res?;
        }

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
