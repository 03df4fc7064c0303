//! Client registry — tracks every connected observer.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;

use super::handle::{ClientHandle, ClientId};

/// Thread-safe registry of all active observer connections.
#[derive(Debug)]
pub struct ClientRegistry {
    clients: DashMap<ClientId, Arc<ClientHandle>>,
    buffer_size: usize,
}

impl ClientRegistry {
    /// Creates an empty registry.
    pub fn new(buffer_size: usize) -> Self {
        Self {
            clients: DashMap::new(),
            buffer_size,
        }
    }

    /// Registers a new connection, returning the handle and the receiver
    /// end of its outbound queue.
    pub fn register(&self) -> (Arc<ClientHandle>, mpsc::Receiver<String>) {
        let (handle, rx) = ClientHandle::new(self.buffer_size);
        let handle = Arc::new(handle);
        self.clients.insert(handle.id, handle.clone());
        (handle, rx)
    }

    /// Removes a connection.
    pub fn remove(&self, id: &ClientId) -> Option<Arc<ClientHandle>> {
        self.clients.remove(id).map(|(_, handle)| handle)
    }

    /// Looks up a connection.
    pub fn get(&self, id: &ClientId) -> Option<Arc<ClientHandle>> {
        self.clients.get(id).map(|entry| entry.value().clone())
    }

    /// All active connections.
    pub fn all(&self) -> Vec<Arc<ClientHandle>> {
        self.clients
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Number of active connections.
    pub fn count(&self) -> usize {
        self.clients.len()
    }

    /// Whether no observers are connected.
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_and_remove() {
        let registry = ClientRegistry::new(8);
        let (handle, _rx) = registry.register();
        assert_eq!(registry.count(), 1);
        assert!(registry.get(&handle.id).is_some());

        registry.remove(&handle.id);
        assert!(registry.is_empty());
        assert!(registry.get(&handle.id).is_none());
    }
}
