//! Logging middleware
//!
//! Connection and command log lines shared by the listener and the
//! per-client loop.

use log::{debug, info};

use crate::protocol::Command;

/// Log a client connection
pub fn log_connection(client_addr: &str, connected: usize, max_clients: usize) {
    info!(
        "Client connected: {} ({}/{} clients)",
        client_addr, connected, max_clients
    );
}

/// Log a client command by name only; arguments may carry credentials.
pub fn log_command(client: &str, command: &Command) {
    debug!("Client {} executed: {}", client, command.name());
}

/// Log an upload that finished collecting its data
pub fn log_upload(client: &str, bytes: usize) {
    debug!("Client {} uploaded {} bytes", client, bytes);
}

/// Log a client disconnect
pub fn log_disconnect(client_addr: &str) {
    info!("Client {} disconnected", client_addr);
}
