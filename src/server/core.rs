use log::{error, info, warn};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

use crate::client::{ClientRegistry, handle_client};
use crate::config::{NetworkConfig, ServerConfig};
use crate::engine::FilesystemEngine;
use crate::middleware::logging::{log_connection, log_disconnect};
use crate::protocol::responses;

pub struct Server {
    client_registry: Arc<Mutex<ClientRegistry>>,
    engine: Arc<FilesystemEngine>,
    listener: TcpListener,
    config: Arc<NetworkConfig>,
}

impl Server {
    /// Binds the command listener described by `config.server`.
    pub async fn bind(config: &ServerConfig, engine: Arc<FilesystemEngine>) -> io::Result<Self> {
        let addr = config.listen_addr();
        let listener = match TcpListener::bind(&addr).await {
            Ok(listener) => {
                info!("Server bound to {}", addr);
                listener
            }
            Err(e) => {
                error!("Failed to bind to {}: {}", addr, e);
                return Err(e);
            }
        };

        Ok(Self {
            client_registry: Arc::new(Mutex::new(ClientRegistry::new(config.server.max_clients))),
            engine,
            listener,
            config: Arc::new(config.server.clone()),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept loop; runs until the task is dropped.
    pub async fn start(&self) {
        info!(
            "Starting OmniFS server on {} (max {} clients)",
            self.local_addr()
                .map(|a| a.to_string())
                .unwrap_or_else(|_| "<unknown>".into()),
            self.config.max_clients
        );

        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let client_registry = Arc::clone(&self.client_registry);
                    let engine = Arc::clone(&self.engine);
                    let config = Arc::clone(&self.config);

                    // Spawn a task for each client so accept loop doesn't block
                    tokio::spawn(async move {
                        if let Err(e) = handle_new_client(
                            stream,
                            addr,
                            client_registry,
                            engine,
                            config,
                        )
                        .await
                        {
                            warn!("Failed to handle client {}: {}", addr, e);
                        }
                    });
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                }
            }
        }
    }
}

/// Admits a connection if there is room, runs its session, then deregisters it.
async fn handle_new_client(
    mut stream: TcpStream,
    client_addr: SocketAddr,
    client_registry: Arc<Mutex<ClientRegistry>>,
    engine: Arc<FilesystemEngine>,
    config: Arc<NetworkConfig>,
) -> Result<(), io::Error> {
    {
        let mut clients = client_registry.lock().await;
        if !clients.register(client_addr) {
            warn!(
                "Rejecting {}: {} clients connected",
                client_addr,
                clients.len()
            );
            drop(clients);
            stream.write_all(responses::SERVER_BUSY.as_bytes()).await?;
            return Ok(());
        }
        log_connection(
            &client_addr.to_string(),
            clients.len(),
            clients.max_clients(),
        );
    }

    handle_client(stream, client_addr, engine, config).await;

    client_registry.lock().await.remove(&client_addr);
    log_disconnect(&client_addr.to_string());
    Ok(())
}
