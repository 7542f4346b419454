//! Friendly names for hardware addresses

use airjam_core::MacAddr;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Lookup of user-assigned device names
pub trait AliasStore: Send + Sync {
    /// Alias for `mac`, if one is set
    fn get(&self, mac: &MacAddr) -> Option<String>;

    /// Alias for `mac`, or `default`
    fn get_or(&self, mac: &MacAddr, default: &str) -> String {
        self.get(mac).unwrap_or_else(|| default.to_string())
    }
}

/// In-memory alias table
#[derive(Debug, Default)]
pub struct Aliases {
    names: RwLock<HashMap<MacAddr, String>>,
}

impl Aliases {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, mac: MacAddr, alias: &str) {
        self.names.write().insert(mac, alias.to_string());
    }

    pub fn remove(&self, mac: &MacAddr) -> Option<String> {
        self.names.write().remove(mac)
    }

    pub fn len(&self) -> usize {
        self.names.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.read().is_empty()
    }
}

impl AliasStore for Aliases {
    fn get(&self, mac: &MacAddr) -> Option<String> {
        self.names.read().get(mac).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or() {
        let aliases = Aliases::new();
        let mac = MacAddr::new([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);

        assert_eq!(aliases.get_or(&mac, ""), "");
        aliases.set(mac, "laptop");
        assert_eq!(aliases.get_or(&mac, ""), "laptop");
        assert_eq!(aliases.remove(&mac).as_deref(), Some("laptop"));
        assert!(aliases.is_empty());
    }
}
