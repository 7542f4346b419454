//! airjam core library
//!
//! This crate provides the fundamental types, the radio abstraction, the
//! runtime parameter store and error handling shared by every airjam crate.

pub mod error;
pub mod parameter;
pub mod radio;
pub mod stats;
pub mod types;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export commonly used types
pub use error::{Error, Result};
pub use parameter::{ParamDescriptor, ParamStore, ParameterType};
pub use radio::{DatalinkRadio, Radio};
pub use stats::{InjectionSnapshot, InjectionStats};
pub use types::{parse_macs, MacAddr};
