//! Wireless stations
//!
//! A [`Station`] is any 802.11 device we have seen: an access point's own
//! radio or one of its clients. Identity (address, hostname, vendor, first
//! seen) is fixed at creation; everything observed over the air is updated
//! in place behind the station's own lock.

use crate::handshake::Handshake;
use airjam_core::MacAddr;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;

/// Convert a center frequency in MHz to its 802.11 channel number
///
/// Returns 0 for frequencies outside the 2.4, 5 and 6 GHz bands.
pub fn frequency_to_channel(frequency: u32) -> u32 {
    match frequency {
        2484 => 14,
        2412..=2472 => (frequency - 2407) / 5,
        5000..=5895 => (frequency - 5000) / 5,
        5955..=7115 => (frequency - 5950) / 5,
        _ => 0,
    }
}

#[derive(Debug, Clone)]
struct StationState {
    alias: String,
    frequency: u32,
    rssi: i8,
    last_seen: DateTime<Utc>,
    encryption: String,
    cipher: String,
    authentication: String,
    sent: u64,
    received: u64,
    wps: HashMap<String, String>,
}

/// One wireless device
#[derive(Debug)]
pub struct Station {
    address: MacAddr,
    hostname: String,
    vendor: String,
    first_seen: DateTime<Utc>,
    state: RwLock<StationState>,
    handshake: Handshake,
}

/// Immutable copy of a station, ready for serialization
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationRecord {
    pub mac: MacAddr,
    pub hostname: String,
    pub alias: String,
    pub vendor: String,
    pub frequency: u32,
    pub channel: u32,
    pub rssi: i8,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub encryption: String,
    pub cipher: String,
    pub authentication: String,
    pub sent: u64,
    pub received: u64,
    pub wps: HashMap<String, String>,
    /// Complete handshake captured
    pub handshake: bool,
    pub pmkid: bool,
}

impl Station {
    /// New station first seen now
    pub fn new(hostname: &str, address: MacAddr, frequency: u32, rssi: i8) -> Self {
        let now = Utc::now();
        Self {
            address,
            hostname: hostname.to_string(),
            vendor: String::new(),
            first_seen: now,
            state: RwLock::new(StationState {
                alias: String::new(),
                frequency,
                rssi,
                last_seen: now,
                encryption: String::new(),
                cipher: String::new(),
                authentication: String::new(),
                sent: 0,
                received: 0,
                wps: HashMap::new(),
            }),
            handshake: Handshake::new(),
        }
    }

    /// Set the OUI vendor name (only meaningful before the station is shared)
    pub fn with_vendor(mut self, vendor: &str) -> Self {
        self.vendor = vendor.to_string();
        self
    }

    pub fn address(&self) -> MacAddr {
        self.address
    }

    /// ESSID for access points, empty for clients
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    pub fn first_seen(&self) -> DateTime<Utc> {
        self.first_seen
    }

    pub fn alias(&self) -> String {
        self.state.read().alias.clone()
    }

    pub fn set_alias(&self, alias: &str) {
        self.state.write().alias = alias.to_string();
    }

    pub fn frequency(&self) -> u32 {
        self.state.read().frequency
    }

    pub fn channel(&self) -> u32 {
        frequency_to_channel(self.frequency())
    }

    /// Signal strength in dBm
    pub fn rssi(&self) -> i8 {
        self.state.read().rssi
    }

    pub fn last_seen(&self) -> DateTime<Utc> {
        self.state.read().last_seen
    }

    /// Station seen again: refresh radio attributes and last seen
    pub fn update_signal(&self, frequency: u32, rssi: i8) {
        let mut state = self.state.write();
        state.frequency = frequency;
        state.rssi = rssi;
        state.last_seen = Utc::now();
    }

    pub fn set_security(&self, encryption: &str, cipher: &str, authentication: &str) {
        let mut state = self.state.write();
        state.encryption = encryption.to_string();
        state.cipher = cipher.to_string();
        state.authentication = authentication.to_string();
    }

    /// "OPEN", "WEP", "WPA2", ... (empty when unknown)
    pub fn encryption(&self) -> String {
        self.state.read().encryption.clone()
    }

    pub fn cipher(&self) -> String {
        self.state.read().cipher.clone()
    }

    pub fn authentication(&self) -> String {
        self.state.read().authentication.clone()
    }

    /// Count bytes sent by this station (saturates at `u64::MAX`)
    pub fn add_sent(&self, bytes: u64) {
        let mut state = self.state.write();
        state.sent = state.sent.saturating_add(bytes);
    }

    pub fn add_received(&self, bytes: u64) {
        let mut state = self.state.write();
        state.received = state.received.saturating_add(bytes);
    }

    pub fn sent(&self) -> u64 {
        self.state.read().sent
    }

    pub fn received(&self) -> u64 {
        self.state.read().received
    }

    pub fn set_wps(&self, key: &str, value: &str) {
        self.state
            .write()
            .wps
            .insert(key.to_string(), value.to_string());
    }

    /// Replace the whole WPS mapping at once
    pub fn replace_wps(&self, wps: HashMap<String, String>) {
        self.state.write().wps = wps;
    }

    /// Copy of the WPS mapping
    pub fn wps(&self) -> HashMap<String, String> {
        self.state.read().wps.clone()
    }

    pub fn handshake(&self) -> &Handshake {
        &self.handshake
    }

    /// Consistent copy of every attribute, taken under a single lock
    pub fn record(&self) -> StationRecord {
        let state = self.state.read().clone();

        StationRecord {
            mac: self.address,
            hostname: self.hostname.clone(),
            alias: state.alias,
            vendor: self.vendor.clone(),
            frequency: state.frequency,
            channel: frequency_to_channel(state.frequency),
            rssi: state.rssi,
            first_seen: self.first_seen,
            last_seen: state.last_seen,
            encryption: state.encryption,
            cipher: state.cipher,
            authentication: state.authentication,
            sent: state.sent,
            received: state.received,
            wps: state.wps,
            handshake: self.handshake.complete(),
            pmkid: self.handshake.has_pmkid(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mac(last: u8) -> MacAddr {
        MacAddr::new([0x00, 0x11, 0x22, 0x33, 0x44, last])
    }

    #[test]
    fn test_frequency_to_channel() {
        assert_eq!(frequency_to_channel(2412), 1);
        assert_eq!(frequency_to_channel(2437), 6);
        assert_eq!(frequency_to_channel(2462), 11);
        assert_eq!(frequency_to_channel(2484), 14);
        assert_eq!(frequency_to_channel(5180), 36);
        assert_eq!(frequency_to_channel(5825), 165);
        assert_eq!(frequency_to_channel(5955), 1);
        assert_eq!(frequency_to_channel(900), 0);
    }

    #[test]
    fn test_update_signal_refreshes_last_seen() {
        let station = Station::new("", mac(1), 2412, -70);
        let before = station.last_seen();

        std::thread::sleep(std::time::Duration::from_millis(5));
        station.update_signal(2437, -40);

        assert_eq!(station.frequency(), 2437);
        assert_eq!(station.channel(), 6);
        assert_eq!(station.rssi(), -40);
        assert!(station.last_seen() > before);
        assert_eq!(station.first_seen(), before);
    }

    #[test]
    fn test_record_copies_wps() {
        let station = Station::new("home", mac(2), 5180, -55).with_vendor("Acme");
        station.set_wps("Manufacturer", "Acme");
        station.set_security("WPA2", "CCMP", "PSK");

        let record = station.record();
        station.set_wps("Model", "X1");

        assert_eq!(record.wps.len(), 1);
        assert_eq!(station.wps().len(), 2);
        assert_eq!(record.hostname, "home");
        assert_eq!(record.vendor, "Acme");
        assert_eq!(record.channel, 36);
        assert_eq!(record.encryption, "WPA2");
        assert!(!record.handshake);
    }

    #[test]
    fn test_traffic_counters() {
        let station = Station::new("", mac(4), 2412, -60);
        station.add_sent(100);
        station.add_sent(20);
        station.add_received(7);

        let record = station.record();
        assert_eq!((record.sent, record.received), (120, 7));
    }

    #[test]
    fn test_traffic_counters_saturate() {
        let station = Station::new("", mac(5), 2412, -60);
        station.add_sent(u64::MAX - 1);
        station.add_sent(10);
        station.add_received(u64::MAX);
        station.add_received(1);

        assert_eq!(station.sent(), u64::MAX);
        assert_eq!(station.received(), u64::MAX);
    }

    #[test]
    fn test_record_reflects_handshake() {
        let station = Station::new("", mac(3), 2412, -60);
        station.handshake().add_challenge();
        station.handshake().add_response();
        station.handshake().add_confirmation();
        station.handshake().set_pmkid(vec![1, 2, 3]);

        let record = station.record();
        assert!(record.handshake);
        assert!(record.pmkid);
    }
}
