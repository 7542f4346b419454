//! Runtime parameters
//!
//! Parameters are registered once with a [`ParamDescriptor`] (type and
//! default) and may be changed at any time while attacks are running.
//! Values are stored as strings and parsed on every read, so a reader always
//! sees the latest value and every typed read can fail.

use crate::{Error, MacAddr, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::str::FromStr;

/// Parameter type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterType {
    /// Free-form string
    String,
    /// Boolean flag (`true`/`false`, `1`/`0`)
    Bool,
    /// 32-bit unsigned integer
    U32,
    /// 64-bit unsigned integer
    U64,
    /// Single MAC address
    MacAddr,
    /// Comma/space separated MAC addresses (may be empty)
    MacList,
}

impl ParameterType {
    /// Check that `raw` parses as this type
    pub fn validate(&self, name: &str, raw: &str) -> Result<()> {
        match self {
            ParameterType::String => Ok(()),
            ParameterType::Bool => parse_bool(name, raw).map(|_| ()),
            ParameterType::U32 => parse_num::<u32>(name, raw).map(|_| ()),
            ParameterType::U64 => parse_num::<u64>(name, raw).map(|_| ()),
            ParameterType::MacAddr => raw.parse::<MacAddr>().map(|_| ()),
            ParameterType::MacList => crate::parse_macs(raw).map(|_| ()),
        }
    }
}

/// Parameter descriptor
#[derive(Debug, Clone)]
pub struct ParamDescriptor {
    /// Parameter name (e.g., "wifi.deauth.skip")
    pub name: &'static str,
    /// Parameter description
    pub description: &'static str,
    /// Parameter type
    pub param_type: ParameterType,
    /// Default value, in its string form
    pub default: String,
}

impl ParamDescriptor {
    pub fn new(name: &'static str, param_type: ParameterType, default: impl Into<String>) -> Self {
        Self {
            name,
            description: "",
            param_type,
            default: default.into(),
        }
    }

    pub fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }
}

/// Thread-safe parameter store
#[derive(Debug, Default)]
pub struct ParamStore {
    descriptors: RwLock<HashMap<String, ParamDescriptor>>,
    values: RwLock<HashMap<String, String>>,
}

impl ParamStore {
    /// Create a new empty parameter store
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a parameter; re-registering replaces the descriptor
    pub fn register(&self, descriptor: ParamDescriptor) -> Result<()> {
        descriptor
            .param_type
            .validate(descriptor.name, &descriptor.default)?;

        self.descriptors
            .write()
            .insert(descriptor.name.to_string(), descriptor);
        Ok(())
    }

    /// Set a parameter value
    ///
    /// Registered parameters are validated against their type; unregistered
    /// ones are stored as-is and checked when read.
    pub fn set<K: Into<String>, V: Into<String>>(&self, key: K, value: V) -> Result<()> {
        let key = key.into();
        let value = value.into();

        if let Some(descriptor) = self.descriptors.read().get(&key) {
            descriptor.param_type.validate(&key, &value)?;
        }

        self.values.write().insert(key, value);
        Ok(())
    }

    /// Drop an explicit value, falling back to the default
    pub fn unset(&self, key: &str) {
        self.values.write().remove(key);
    }

    /// Set a parameter value (builder style)
    pub fn with<K: Into<String>, V: Into<String>>(self, key: K, value: V) -> Result<Self> {
        self.set(key, value)?;
        Ok(self)
    }

    /// Descriptor of a registered parameter
    pub fn descriptor(&self, key: &str) -> Option<ParamDescriptor> {
        self.descriptors.read().get(key).cloned()
    }

    /// All registered descriptors, sorted by name
    pub fn descriptors(&self) -> Vec<ParamDescriptor> {
        let mut list: Vec<_> = self.descriptors.read().values().cloned().collect();
        list.sort_by_key(|d| d.name);
        list
    }

    /// Get the raw value, or the registered default
    pub fn get_string(&self, key: &str) -> Result<String> {
        if let Some(value) = self.values.read().get(key) {
            return Ok(value.clone());
        }

        self.descriptors
            .read()
            .get(key)
            .map(|d| d.default.clone())
            .ok_or_else(|| Error::NotFound(format!("parameter {}", key)))
    }

    /// Get a boolean parameter
    pub fn get_bool(&self, key: &str) -> Result<bool> {
        parse_bool(key, &self.get_string(key)?)
    }

    /// Get a u32 parameter
    pub fn get_u32(&self, key: &str) -> Result<u32> {
        parse_num(key, &self.get_string(key)?)
    }

    /// Get a u64 parameter
    pub fn get_u64(&self, key: &str) -> Result<u64> {
        parse_num(key, &self.get_string(key)?)
    }
}

fn parse_bool(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(Error::invalid_parameter(
            name,
            format!("'{}' is not a boolean", other),
        )),
    }
}

fn parse_num<T: FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| Error::invalid_parameter(name, format!("'{}' is not a valid number", raw)))
}
