//! IEEE 802.11 frame construction for airjam
//!
//! This crate builds the raw frames airjam injects through a monitor-mode
//! radio:
//!
//! - [`radiotap`] - minimal radiotap TX header
//! - [`dot11`] - frame control, management header and deauthentication frames
//!
//! # Quick Start
//!
//! ```rust
//! use airjam_core::MacAddr;
//! use airjam_packet::build_deauth;
//!
//! let ap = MacAddr::new([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
//! let client = MacAddr::new([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0x01]);
//!
//! // AP -> client, then client -> AP, both inside the AP's BSS
//! let to_client = build_deauth(ap, client, ap, 0).unwrap();
//! let to_ap = build_deauth(client, ap, ap, 0).unwrap();
//! assert_eq!(to_client.len(), to_ap.len());
//! ```

pub mod dot11;
pub mod radiotap;

pub use dot11::{
    build_deauth, Deauthentication, FrameControl, FrameType, ManagementHeader, ReasonCode,
};
pub use radiotap::RadiotapHeader;
