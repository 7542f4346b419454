//! Access points and their clients
//!
//! An [`AccessPoint`] wraps the [`Station`] describing its own radio and
//! keeps the set of client stations seen talking to it. The client map and
//! the key material flag share one reader/writer lock; station attributes
//! are guarded by each station's own lock.

use crate::alias::AliasStore;
use crate::station::{Station, StationRecord};
use airjam_core::MacAddr;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Default)]
struct ApState {
    clients: HashMap<MacAddr, Arc<Station>>,
    with_key_material: bool,
}

/// A wireless access point
pub struct AccessPoint {
    station: Arc<Station>,
    aliases: Arc<dyn AliasStore>,
    state: RwLock<ApState>,
}

/// Deep copy of an access point, safe to serialize without any lock held
///
/// The access point's own attributes are flattened into the top level
/// object. Its `handshake` field carries the key material flag.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccessPointRecord {
    #[serde(flatten)]
    pub station: StationRecord,
    pub clients: Vec<StationRecord>,
}

impl AccessPointRecord {
    pub fn bssid(&self) -> MacAddr {
        self.station.mac
    }

    pub fn has_key_material(&self) -> bool {
        self.station.handshake
    }
}

impl AccessPoint {
    pub fn new(
        essid: &str,
        bssid: MacAddr,
        frequency: u32,
        rssi: i8,
        aliases: Arc<dyn AliasStore>,
    ) -> Self {
        Self::from_station(Station::new(essid, bssid, frequency, rssi), aliases)
    }

    /// Build an access point around an already populated station
    pub fn from_station(station: Station, aliases: Arc<dyn AliasStore>) -> Self {
        Self {
            station: Arc::new(station),
            aliases,
            state: RwLock::new(ApState::default()),
        }
    }

    /// The station describing the access point itself
    pub fn station(&self) -> &Arc<Station> {
        &self.station
    }

    pub fn bssid(&self) -> MacAddr {
        self.station.address()
    }

    pub fn essid(&self) -> &str {
        self.station.hostname()
    }

    pub fn channel(&self) -> u32 {
        self.station.channel()
    }

    pub fn frequency(&self) -> u32 {
        self.station.frequency()
    }

    pub fn rssi(&self) -> i8 {
        self.station.rssi()
    }

    pub fn encryption(&self) -> String {
        self.station.encryption()
    }

    /// No encryption advertised
    pub fn is_open(&self) -> bool {
        let encryption = self.station.encryption();
        encryption.is_empty() || encryption == "OPEN"
    }

    /// Client with the given address
    pub fn get(&self, address: &MacAddr) -> Option<Arc<Station>> {
        self.state.read().clients.get(address).cloned()
    }

    /// Register a client, or refresh it if already known
    ///
    /// Returns the client station and whether it was newly created. The
    /// whole lookup and insert runs under the exclusive lock, so concurrent
    /// callers with the same address always get the same station back.
    pub fn add_client_if_new(
        &self,
        address: MacAddr,
        frequency: u32,
        rssi: i8,
    ) -> (Arc<Station>, bool) {
        let mut state = self.state.write();
        let alias = self.aliases.get_or(&address, "");

        if let Some(client) = state.clients.get(&address) {
            client.update_signal(frequency, rssi);
            if !alias.is_empty() {
                client.set_alias(&alias);
            }
            return (Arc::clone(client), false);
        }

        let client = Station::new("", address, frequency, rssi);
        client.set_alias(&alias);

        let client = Arc::new(client);
        state.clients.insert(address, Arc::clone(&client));
        (client, true)
    }

    pub fn remove_client(&self, address: &MacAddr) {
        self.state.write().clients.remove(address);
    }

    pub fn num_clients(&self) -> usize {
        self.state.read().clients.len()
    }

    /// Copy of the current client list, in no particular order
    pub fn clients(&self) -> Vec<Arc<Station>> {
        self.state.read().clients.values().cloned().collect()
    }

    /// Visit every client under the exclusive lock
    ///
    /// The callback must not call back into this access point: every
    /// locked method (including read-only ones such as [`num_clients`])
    /// will deadlock.
    ///
    /// [`num_clients`]: AccessPoint::num_clients
    pub fn each_client<F>(&self, mut callback: F)
    where
        F: FnMut(&MacAddr, &Arc<Station>),
    {
        let state = self.state.write();
        for (address, client) in state.clients.iter() {
            callback(address, client);
        }
    }

    pub fn with_key_material(&self, acquired: bool) {
        self.state.write().with_key_material = acquired;
    }

    pub fn has_key_material(&self) -> bool {
        self.state.read().with_key_material
    }

    /// Number of clients with a complete handshake
    pub fn num_handshakes(&self) -> usize {
        self.state
            .read()
            .clients
            .values()
            .filter(|client| client.handshake().complete())
            .count()
    }

    pub fn has_handshakes(&self) -> bool {
        self.num_handshakes() > 0
    }

    /// Any client captured a PMKID
    pub fn has_pmkid(&self) -> bool {
        self.state
            .read()
            .clients
            .values()
            .any(|client| client.handshake().has_pmkid())
    }

    pub fn snapshot(&self) -> AccessPointRecord {
        let state = self.state.read();

        let mut station = self.station.record();
        station.handshake = state.with_key_material;

        AccessPointRecord {
            station,
            clients: state.clients.values().map(|client| client.record()).collect(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.snapshot())
    }
}

impl fmt::Debug for AccessPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessPoint")
            .field("bssid", &self.bssid())
            .field("essid", &self.essid())
            .field("clients", &self.num_clients())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alias::Aliases;
    use std::collections::HashSet;
    use std::thread;

    fn mac(last: u8) -> MacAddr {
        MacAddr::new([0xde, 0xad, 0xbe, 0xef, 0x00, last])
    }

    fn ap_with(aliases: Arc<Aliases>) -> AccessPoint {
        AccessPoint::new("corp", mac(0xff), 2437, -40, aliases)
    }

    fn ap() -> AccessPoint {
        ap_with(Arc::new(Aliases::new()))
    }

    #[test]
    fn test_add_client_is_idempotent() {
        let ap = ap();

        let (first, created) = ap.add_client_if_new(mac(1), 2437, -60);
        assert!(created);

        let (second, created) = ap.add_client_if_new(mac(1), 2462, -30);
        assert!(!created);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.rssi(), -30);
        assert_eq!(first.channel(), 11);
        assert_eq!(ap.num_clients(), 1);
    }

    #[test]
    fn test_alias_applied_on_refresh() {
        let aliases = Arc::new(Aliases::new());
        let ap = ap_with(Arc::clone(&aliases));

        let (client, _) = ap.add_client_if_new(mac(1), 2437, -60);
        assert_eq!(client.alias(), "");

        aliases.set(mac(1), "phone");
        ap.add_client_if_new(mac(1), 2437, -60);
        assert_eq!(client.alias(), "phone");

        // an alias removed from the store does not clear the known one
        aliases.remove(&mac(1));
        ap.add_client_if_new(mac(1), 2437, -60);
        assert_eq!(client.alias(), "phone");
    }

    #[test]
    fn test_get_and_remove() {
        let ap = ap();
        ap.add_client_if_new(mac(1), 2437, -60);

        assert!(ap.get(&mac(1)).is_some());
        assert!(ap.get(&mac(2)).is_none());

        ap.remove_client(&mac(2));
        assert_eq!(ap.num_clients(), 1);
        ap.remove_client(&mac(1));
        assert_eq!(ap.num_clients(), 0);
        assert!(ap.clients().is_empty());
    }

    #[test]
    fn test_handshake_queries() {
        let ap = ap();
        let (a, _) = ap.add_client_if_new(mac(1), 2437, -60);
        let (b, _) = ap.add_client_if_new(mac(2), 2437, -60);
        ap.add_client_if_new(mac(3), 2437, -60);

        assert_eq!(ap.num_handshakes(), 0);
        assert!(!ap.has_handshakes());
        assert!(!ap.has_pmkid());

        a.handshake().add_challenge();
        a.handshake().add_response();
        assert_eq!(ap.num_handshakes(), 0);
        a.handshake().add_confirmation();
        assert_eq!(ap.num_handshakes(), 1);
        assert!(ap.has_handshakes());

        b.handshake().set_pmkid(vec![0u8; 16]);
        assert!(ap.has_pmkid());
        assert_eq!(ap.num_handshakes(), 1);
    }

    #[test]
    fn test_is_open() {
        let ap = ap();
        assert!(ap.is_open());
        ap.station().set_security("OPEN", "", "");
        assert!(ap.is_open());
        ap.station().set_security("WPA2", "CCMP", "PSK");
        assert!(!ap.is_open());
    }

    #[test]
    fn test_each_client_visits_all() {
        let ap = ap();
        for i in 0..5 {
            ap.add_client_if_new(mac(i), 2437, -60);
        }

        let mut seen = Vec::new();
        ap.each_client(|address, client| {
            assert_eq!(*address, client.address());
            seen.push(*address);
        });
        seen.sort();
        assert_eq!(seen, (0..5).map(mac).collect::<Vec<_>>());
    }

    #[test]
    fn test_snapshot_json() {
        let ap = ap();
        ap.station().set_security("WPA2", "CCMP", "PSK");
        ap.station().set_wps("Manufacturer", "Acme");
        ap.with_key_material(true);
        let (client, _) = ap.add_client_if_new(mac(1), 2437, -60);
        client.set_wps("Device", "Phone");

        let record = ap.snapshot();
        assert!(record.has_key_material());
        assert_eq!(record.bssid(), mac(0xff));

        let json: serde_json::Value = serde_json::from_str(&ap.to_json().unwrap()).unwrap();
        assert_eq!(json["mac"], "de:ad:be:ef:00:ff");
        assert_eq!(json["hostname"], "corp");
        assert_eq!(json["channel"], 6);
        assert_eq!(json["handshake"], true);
        assert_eq!(json["wps"]["Manufacturer"], "Acme");
        assert_eq!(json["clients"][0]["mac"], "de:ad:be:ef:00:01");
        assert_eq!(json["clients"][0]["wps"]["Device"], "Phone");
        assert_eq!(json["clients"][0]["handshake"], false);
    }

    #[test]
    fn test_concurrent_add_same_address() {
        let ap = Arc::new(ap());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ap = Arc::clone(&ap);
                thread::spawn(move || {
                    let mut created = 0;
                    for i in 0..50 {
                        if ap.add_client_if_new(mac(i), 2437, -60).1 {
                            created += 1;
                        }
                    }
                    created
                })
            })
            .collect();

        let created: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(created, 50);
        assert_eq!(ap.num_clients(), 50);
    }

    #[test]
    fn test_concurrent_add_remove_iterate() {
        let ap = Arc::new(ap());

        let writers: Vec<_> = (0..4u8)
            .map(|t| {
                let ap = Arc::clone(&ap);
                thread::spawn(move || {
                    let addresses: Vec<_> = (t * 16..t * 16 + 16).map(mac).collect();
                    for address in &addresses {
                        ap.add_client_if_new(*address, 2437, -60);
                    }
                    for address in addresses.iter().skip(1).step_by(2) {
                        ap.remove_client(address);
                    }
                    // re-adding a kept client must not create a second entry
                    for address in addresses.iter().step_by(2) {
                        assert!(!ap.add_client_if_new(*address, 2437, -50).1);
                    }
                })
            })
            .collect();

        let readers: Vec<_> = (0..2)
            .map(|_| {
                let ap = Arc::clone(&ap);
                thread::spawn(move || {
                    for _ in 0..200 {
                        ap.each_client(|address, client| assert_eq!(*address, client.address()));
                        let clients = ap.clients();
                        let unique: HashSet<_> = clients.iter().map(|c| c.address()).collect();
                        assert_eq!(unique.len(), clients.len());
                    }
                })
            })
            .collect();

        for handle in writers.into_iter().chain(readers) {
            handle.join().unwrap();
        }

        let expected: HashSet<_> = (0..64u8).step_by(2).map(mac).collect();
        let mut seen = HashSet::new();
        ap.each_client(|address, client| {
            assert_eq!(*address, client.address());
            seen.insert(*address);
        });
        assert_eq!(seen, expected);
        assert_eq!(ap.num_clients(), 32);
    }

    #[test]
    fn test_snapshot_never_sees_torn_wps() {
        let ap = Arc::new(ap());
        let (client, _) = ap.add_client_if_new(mac(1), 2437, -60);
        client.replace_wps(HashMap::from([
            ("a".to_string(), "0".to_string()),
            ("b".to_string(), "0".to_string()),
        ]));

        let writer = {
            let client = Arc::clone(&client);
            thread::spawn(move || {
                for i in 1..500 {
                    let value = i.to_string();
                    client.replace_wps(HashMap::from([
                        ("a".to_string(), value.clone()),
                        ("b".to_string(), value),
                    ]));
                }
            })
        };

        for _ in 0..500 {
            let record = ap.snapshot();
            let wps = &record.clients[0].wps;
            assert_eq!(wps.get("a"), wps.get("b"));
        }

        writer.join().unwrap();
    }
}
