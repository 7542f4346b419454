//! Access point registry
//!
//! Holds every access point discovered by the sniffer, keyed by BSSID.

use crate::access_point::{AccessPoint, AccessPointRecord};
use crate::alias::AliasStore;
use airjam_core::MacAddr;
use chrono::{TimeDelta, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Concurrent map of discovered access points
pub struct WifiRegistry {
    access_points: DashMap<MacAddr, Arc<AccessPoint>>,
    aliases: Arc<dyn AliasStore>,
}

impl WifiRegistry {
    pub fn new(aliases: Arc<dyn AliasStore>) -> Self {
        Self {
            access_points: DashMap::new(),
            aliases,
        }
    }

    /// Shared alias store handed to every access point
    pub fn aliases(&self) -> &Arc<dyn AliasStore> {
        &self.aliases
    }

    /// Register an access point, or refresh it if already known
    pub fn add_if_new(
        &self,
        essid: &str,
        bssid: MacAddr,
        frequency: u32,
        rssi: i8,
    ) -> (Arc<AccessPoint>, bool) {
        match self.access_points.entry(bssid) {
            Entry::Occupied(entry) => {
                let ap = Arc::clone(entry.get());
                ap.station().update_signal(frequency, rssi);
                (ap, false)
            }
            Entry::Vacant(entry) => {
                let ap = Arc::new(AccessPoint::new(
                    essid,
                    bssid,
                    frequency,
                    rssi,
                    Arc::clone(&self.aliases),
                ));
                entry.insert(Arc::clone(&ap));
                debug!(bssid = %bssid, essid = %essid, frequency, "New access point");
                (ap, true)
            }
        }
    }

    pub fn get(&self, bssid: &MacAddr) -> Option<Arc<AccessPoint>> {
        self.access_points
            .get(bssid)
            .map(|entry| Arc::clone(entry.value()))
    }

    pub fn remove(&self, bssid: &MacAddr) -> Option<Arc<AccessPoint>> {
        self.access_points.remove(bssid).map(|(_, ap)| ap)
    }

    /// Copy of the current access point list, in no particular order
    pub fn list(&self) -> Vec<Arc<AccessPoint>> {
        self.access_points
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.access_points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.access_points.is_empty()
    }

    /// Evict access points not seen within `max_age`, returns how many
    pub fn prune_stale(&self, max_age: Duration) -> usize {
        // ages beyond what chrono can represent prune nothing
        let Some(cutoff) = TimeDelta::from_std(max_age)
            .ok()
            .and_then(|age| Utc::now().checked_sub_signed(age))
        else {
            return 0;
        };

        let before = self.access_points.len();
        self.access_points.retain(|bssid, ap| {
            let keep = ap.station().last_seen() >= cutoff;
            if !keep {
                debug!(bssid = %bssid, "Pruning stale access point");
            }
            keep
        });
        before.saturating_sub(self.access_points.len())
    }

    pub fn snapshot(&self) -> Vec<AccessPointRecord> {
        self.list().iter().map(|ap| ap.snapshot()).collect()
    }
}

impl std::fmt::Debug for WifiRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WifiRegistry")
            .field("access_points", &self.access_points.len())
            .finish()
    }
}
