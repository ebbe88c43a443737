//! Client registry
//!
//! Bidirectional username ↔ address map owned by the server loop.
//! Sessions are keyed by address; username is a secondary index, so sender
//! attribution is a single lookup instead of a scan.

use std::collections::HashMap;
use std::net::SocketAddr;

use crate::error::JoinRejection;

/// Connected clients, bounded by `max_clients`
#[derive(Debug)]
pub struct ClientRegistry {
    /// Username → address
    by_name: HashMap<String, SocketAddr>,
    /// Address → username
    by_addr: HashMap<SocketAddr, String>,
    max_clients: usize,
}

impl ClientRegistry {
    /// Create an empty registry holding at most `max_clients` users
    pub fn new(max_clients: usize) -> Self {
        Self {
            by_name: HashMap::new(),
            by_addr: HashMap::new(),
            max_clients,
        }
    }

    /// Register `username` at `addr`
    ///
    /// Capacity is checked before uniqueness. An address holds at most one
    /// username, so a second JOIN from a registered address is refused as
    /// `UsernameTaken`. Nothing changes on rejection.
    pub fn join(&mut self, username: &str, addr: SocketAddr) -> Result<(), JoinRejection> {
        if self.is_full() {
            return Err(JoinRejection::Full);
        }
        if self.by_name.contains_key(username) || self.by_addr.contains_key(&addr) {
            return Err(JoinRejection::UsernameTaken);
        }

        self.by_addr.insert(addr, username.to_string());
        self.by_name.insert(username.to_string(), addr);
        Ok(())
    }

    /// Remove `username` if present
    ///
    /// Returns the address it was registered at.
    pub fn leave(&mut self, username: &str) -> Option<SocketAddr> {
        let addr = self.by_name.remove(username)?;
        self.by_addr.remove(&addr);
        Some(addr)
    }

    /// Address registered for `username`
    pub fn lookup(&self, username: &str) -> Option<SocketAddr> {
        self.by_name.get(username).copied()
    }

    /// Username registered at `addr`
    pub fn username_of(&self, addr: SocketAddr) -> Option<&str> {
        self.by_addr.get(&addr).map(String::as_str)
    }

    /// All usernames in lexicographic (byte) order
    pub fn list_sorted(&self) -> Vec<String> {
        let mut names: Vec<String> = self.by_name.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Number of registered users
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Check if no further JOIN can succeed
    pub fn is_full(&self) -> bool {
        self.by_name.len() >= self.max_clients
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
    fn test_registry_creation() {
        let registry = ClientRegistry::new(3);

        assert!(registry.is_empty());
        assert!(!registry.is_full());
        assert_eq!(registry.len(), 0);
        assert_eq!(registry.max_clients(), 3);
    }

    #[test]
    fn test_join_and_lookup() {
        let mut registry = ClientRegistry::new(3);

        assert_eq!(registry.join("alice", addr(1000)), Ok(()));
        assert_eq!(registry.lookup("alice"), Some(addr(1000)));
        assert_eq!(registry.username_of(addr(1000)), Some("alice"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_username_rejected() {
        let mut registry = ClientRegistry::new(3);
        registry.join("alice", addr(1000)).unwrap();

        assert_eq!(
            registry.join("alice", addr(2000)),
            Err(JoinRejection::UsernameTaken)
        );
        // Original registration untouched
        assert_eq!(registry.lookup("alice"), Some(addr(1000)));
        assert_eq!(registry.username_of(addr(2000)), None);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_capacity_bound() {
        let mut registry = ClientRegistry::new(2);
        registry.join("alice", addr(1000)).unwrap();
        registry.join("bob", addr(1001)).unwrap();

        assert!(registry.is_full());
        assert_eq!(registry.join("carol", addr(1002)), Err(JoinRejection::Full));
        // Full wins over a taken name
        assert_eq!(registry.join("alice", addr(1003)), Err(JoinRejection::Full));
        assert_eq!(registry.lookup("carol"), None);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_leave() {
        let mut registry = ClientRegistry::new(3);
        registry.join("alice", addr(1000)).unwrap();

        assert_eq!(registry.leave("alice"), Some(addr(1000)));
        assert_eq!(registry.lookup("alice"), None);
        assert_eq!(registry.username_of(addr(1000)), None);

        // Unknown name is a no-op
        assert_eq!(registry.leave("alice"), None);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_leave_frees_capacity() {
        let mut registry = ClientRegistry::new(1);
        registry.join("alice", addr(1000)).unwrap();
        registry.leave("alice");

        assert_eq!(registry.join("bob", addr(1001)), Ok(()));
    }

    #[test]
    fn test_list_sorted() {
        let mut registry = ClientRegistry::new(5);
        registry.join("bob", addr(1000)).unwrap();
        registry.join("carol", addr(1001)).unwrap();
        registry.join("Alice", addr(1002)).unwrap();

        assert_eq!(registry.list_sorted(), vec!["Alice", "bob", "carol"]);
    }

    #[test]
    fn test_second_join_from_same_address_rejected() {
        let mut registry = ClientRegistry::new(3);
        registry.join("alice", addr(1000)).unwrap();

        assert_eq!(
            registry.join("mallory", addr(1000)),
            Err(JoinRejection::UsernameTaken)
        );
        assert_eq!(registry.lookup("alice"), Some(addr(1000)));
        assert_eq!(registry.lookup("mallory"), None);
        assert_eq!(registry.username_of(addr(1000)), Some("alice"));
        assert_eq!(registry.len(), 1);
    }
}
