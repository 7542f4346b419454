//! Common types used throughout airjam

use serde::{Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// MAC Address (6 bytes)
///
/// Parsing normalizes: `AA-BB-CC-DD-EE-FF`, `aa:bb:cc:dd:ee:ff` and
/// `aabb.ccdd.eeff` all yield the same value, displayed lowercase with colons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    /// Broadcast MAC address (ff:ff:ff:ff:ff:ff)
    pub const BROADCAST: MacAddr = MacAddr([0xff; 6]);

    /// Zero MAC address (00:00:00:00:00:00)
    pub const ZERO: MacAddr = MacAddr([0x00; 6]);

    /// Create a new MAC address
    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    /// Broadcast MAC address (ff:ff:ff:ff:ff:ff)
    pub const fn broadcast() -> Self {
        Self::BROADCAST
    }

    /// Get bytes as slice
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Convert to array
    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }

    /// Group bit set (includes broadcast)
    pub fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 == 0x01
    }

    pub fn is_unicast(&self) -> bool {
        !self.is_multicast() && *self != Self::ZERO
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

impl FromStr for MacAddr {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || crate::Error::InvalidMac(s.to_string());

        let hex: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ':' | '-' | '.'))
            .collect();
        if hex.len() != 12 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let mut bytes = [0u8; 6];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).map_err(|_| invalid())?;
        }

        Ok(MacAddr(bytes))
    }
}

impl From<[u8; 6]> for MacAddr {
    fn from(bytes: [u8; 6]) -> Self {
        MacAddr(bytes)
    }
}

impl Serialize for MacAddr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Parse a comma and/or whitespace separated list of MAC addresses.
///
/// An empty (or blank) list yields an empty set.
pub fn parse_macs(list: &str) -> crate::Result<HashSet<MacAddr>> {
    list.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(MacAddr::from_str)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes() {
        let a: MacAddr = "AA:BB:CC:00:11:22".parse().unwrap();
        let b: MacAddr = "aa-bb-cc-00-11-22".parse().unwrap();
        let c: MacAddr = "aabb.cc00.1122".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a.to_string(), "aa:bb:cc:00:11:22");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("aa:bb:cc".parse::<MacAddr>().is_err());
        assert!("zz:bb:cc:00:11:22".parse::<MacAddr>().is_err());
        assert!("".parse::<MacAddr>().is_err());
    }

    #[test]
    fn test_address_classes() {
        assert!(MacAddr::BROADCAST.is_broadcast());
        assert!(MacAddr::BROADCAST.is_multicast());
        assert!(!MacAddr::ZERO.is_unicast());
        assert!(MacAddr::new([0x01, 0x00, 0x5e, 0, 0, 1]).is_multicast());
        assert!(MacAddr::new([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]).is_unicast());
    }

    #[test]
    fn test_parse_macs_list() {
        let set = parse_macs("aa:bb:cc:00:11:22, AA:BB:CC:00:11:33 aa:bb:cc:00:11:22").unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.contains(&"aa:bb:cc:00:11:33".parse().unwrap()));

        assert!(parse_macs("").unwrap().is_empty());
        assert!(parse_macs("  ,  ").unwrap().is_empty());
        assert!(parse_macs("aa:bb:cc:00:11:22,nope").is_err());
    }

    #[test]
    fn test_serializes_as_string() {
        let mac = MacAddr::new([0xde, 0xad, 0xbe, 0xef, 0x00, 0x01]);
        assert_eq!(
            serde_json::to_string(&mac).unwrap(),
            "\"de:ad:be:ef:00:01\""
        );
    }
}
