//! Client registry
//!
//! Tracks connected peers and enforces the connection cap.

use std::collections::HashMap;
use std::net::SocketAddr;

use crate::utils::time::unix_now;

/// Registry for tracking connected clients
#[derive(Debug)]
pub struct ClientRegistry {
    clients: HashMap<SocketAddr, u64>,
    max_clients: usize,
}

impl ClientRegistry {
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: HashMap::new(),
            max_clients,
        }
    }

    /// Registers a peer unless the registry is full.
    pub fn register(&mut self, addr: SocketAddr) -> bool {
        if self.clients.len() >= self.max_clients {
            return false;
        }
        self.clients.insert(addr, unix_now());
        true
    }

    /// Removes a peer; returns its connection time if it was registered.
    pub fn remove(&mut self, addr: &SocketAddr) -> Option<u64> {
        self.clients.remove(addr)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn max_clients(&self) -> usize {
        self.max_clients
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    #[test]
    fn test_cap_is_enforced() {
        let mut registry = ClientRegistry::new(2);
        assert!(registry.register(addr(1)));
        assert!(registry.register(addr(2)));
        assert!(!registry.register(addr(3)));

        assert!(registry.remove(&addr(1)).is_some());
        assert!(registry.register(addr(3)));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_remove_unknown() {
        let mut registry = ClientRegistry::new(1);
        assert!(registry.remove(&addr(9)).is_none());
        assert!(registry.is_empty());
    }
}
