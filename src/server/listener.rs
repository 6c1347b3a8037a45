use std::future::Future;
use std::net::SocketAddr;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::http::connection::{Connection, ConnectionContext};
use crate::server::dispatcher::Dispatcher;

/// Owns the listening socket and hands every accepted connection to the
/// dispatcher.
pub struct Server {
    listener: TcpListener,
    ctx: ConnectionContext,
    dispatcher: Dispatcher,
}

impl Server {
    /// Binds the listening socket. Failure here is fatal to startup.
    pub async fn bind(cfg: &ServerConfig, dispatcher: Dispatcher) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(cfg.bind_addr)
            .await
            .with_context(|| format!("unable to bind to {}", cfg.bind_addr))?;

        info!(
            addr = %listener.local_addr()?,
            root = %cfg.root.display(),
            max_connections = cfg.max_connections,
            "Listening"
        );

        Ok(Self {
            listener,
            ctx: ConnectionContext::from_config(cfg),
            dispatcher,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections until `shutdown` completes, then closes the socket.
    ///
    /// Accept errors only affect the connection being accepted; they are
    /// logged and the loop carries on.
    pub async fn run_until<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutting down listener");
                    break;
                }

                accepted = self.listener.accept() => match accepted {
                    Ok((socket, peer)) => {
                        info!("Accepted connection from {}", peer);
                        let conn = Connection::new(socket, peer, self.ctx.clone());
                        self.dispatcher.submit(conn.run());
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to accept connection");
                    }
                },
            }
        }

        self.dispatcher.shutdown();
    }
}
