//! Attack orchestration for airjam
//!
//! This crate drives the 802.11 deauthentication attack. It includes:
//!
//! - `DeauthOrchestrator`: resolves targets and runs one background worker per attack
//! - `ChannelArbiter`: the single point through which the radio channel changes
//! - `PacketInjector`: frame transmission with backpressure handling
//! - `DeauthSettings`: live view of the `wifi.deauth.*` parameters
//!
//! # Example
//!
//! ```no_run
//! use airjam_attack::{DeauthOrchestrator, DeauthSettings};
//! use airjam_core::{DatalinkRadio, MacAddr, ParamStore};
//! use airjam_wifi::{Aliases, WifiRegistry};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let params = ParamStore::new();
//!     DeauthSettings::register_defaults(&params)?;
//!
//!     let registry = Arc::new(WifiRegistry::new(Arc::new(Aliases::new())));
//!     let radio = Arc::new(DatalinkRadio::by_name("wlan0mon")?);
//!     let orchestrator = DeauthOrchestrator::new(registry, radio, Arc::new(params));
//!
//!     orchestrator.begin_deauth(MacAddr::BROADCAST).await?;
//!     orchestrator.wait_idle().await;
//!
//!     Ok(())
//! }
//! ```

pub mod cancel;
pub mod channel;
pub mod deauth;
pub mod injector;
pub mod lease;
pub mod settings;

pub use cancel::CancelToken;
pub use channel::ChannelArbiter;
pub use deauth::{resolve_targets, schedule, DeauthInfo, DeauthOrchestrator, Flow};
pub use injector::{FlowLabel, PacketInjector, TX_PAUSE};
pub use lease::RadioLease;
pub use settings::{DeauthSettings, DeauthSnapshot};
