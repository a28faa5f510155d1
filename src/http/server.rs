use crate::app::Server;
use crate::error::{Error, Result};
use hyper::service::{make_service_fn, service_fn};
use hyper::Server as HyperServer;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::Duration;

/// Binds a socket and feeds every connection's requests to a [`Server`]
pub struct Listener {
    server: Server,
}

impl Listener {
    pub fn new(server: Server) -> Self {
        Self { server }
    }

    pub async fn serve(self, addr: &str) -> Result<()> {
        let addr: SocketAddr = addr
            .parse()
            .map_err(|e| Error::config(format!("Invalid address '{}': {}", addr, e)))?;
        let drain_timeout = Duration::from_secs(self.server.config().server.shutdown_timeout);

        log::info!("hookway listening on {}", addr);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        let (drain_tx, drain_rx) = tokio::sync::oneshot::channel::<()>();

        tokio::spawn(async move {
            #[cfg(unix)]
            {
                use tokio::signal::unix::{signal, SignalKind};

                let mut sigterm = match signal(SignalKind::terminate()) {
                    Ok(sig) => sig,
                    Err(e) => {
                        log::error!("Failed to install SIGTERM handler: {}", e);
                        return;
                    }
                };

                let mut sigint = match signal(SignalKind::interrupt()) {
                    Ok(sig) => sig,
                    Err(e) => {
                        log::error!("Failed to install SIGINT handler: {}", e);
                        return;
                    }
                };

                tokio::select! {
                    _ = sigterm.recv() => {
                        log::info!("Received SIGTERM signal - initiating graceful shutdown");
                    }
                    _ = sigint.recv() => {
                        log::info!("Received SIGINT signal (Ctrl+C) - initiating graceful shutdown");
                    }
                }
            }

            #[cfg(not(unix))]
            {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        log::info!("Received Ctrl+C signal - initiating graceful shutdown");
                    }
                    Err(e) => {
                        log::error!("Failed to listen for Ctrl+C signal: {}", e);
                        return;
                    }
                }
            }

            let _ = shutdown_tx.send(());
            let _ = drain_tx.send(());
        });

        let server = self.server;
        let make_svc = make_service_fn(move |_conn| {
            let server = server.clone();
            async move {
                Ok::<_, Infallible>(service_fn(move |req| {
                    let server = server.clone();
                    async move { Ok::<_, Infallible>(server.handle(req).await) }
                }))
            }
        });

        let running = HyperServer::try_bind(&addr)?
            .serve(make_svc)
            .with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            });
        tokio::pin!(running);

        // In-flight requests get `shutdown_timeout` seconds once a signal arrives
        let deadline = async move {
            if drain_rx.await.is_ok() {
                tokio::time::sleep(drain_timeout).await;
            } else {
                std::future::pending::<()>().await;
            }
        };

        tokio::select! {
            result = &mut running => {
                if let Err(e) = result {
                    log::error!("Server error: {}", e);
                }
            }
            _ = deadline => {
                log::warn!(
                    "Connections still open after {:?}, shutting down anyway",
                    drain_timeout
                );
            }
        }

        log::info!("Server stopped");
        Ok(())
    }
}
