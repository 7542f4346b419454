//! airjam-wifi: wireless topology model
//!
//! Access points, their client stations and the registry holding them.
//! Everything here is safe to share across threads; snapshots are plain
//! data that serialize to JSON without holding any lock.

pub mod access_point;
pub mod alias;
pub mod handshake;
pub mod registry;
pub mod station;

pub use access_point::{AccessPoint, AccessPointRecord};
pub use alias::{AliasStore, Aliases};
pub use handshake::Handshake;
pub use registry::WifiRegistry;
pub use station::{frequency_to_channel, Station, StationRecord};
