//! Radio interface abstraction
//!
//! Everything that touches the wireless adapter goes through [`Radio`]:
//! bringing the injection handle up and down, tuning the channel, and
//! pushing raw radiotap-prefixed 802.11 frames out.

use crate::{Error, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use pnet_datalink::{self, Channel, DataLinkSender, NetworkInterface};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::process::Command;
use tracing::{debug, info};

/// A wireless adapter able to inject raw frames
#[async_trait]
pub trait Radio: Send + Sync {
    /// Interface name (e.g., "wlan0mon")
    fn name(&self) -> &str;

    /// Is the injection handle currently open?
    fn is_active(&self) -> bool;

    /// Open the injection handle
    async fn activate(&self) -> Result<()>;

    /// Close the injection handle (no-op when already closed)
    fn deactivate(&self);

    /// Channel the radio is tuned to, if known
    fn channel(&self) -> Option<u32>;

    /// Tune the radio
    async fn set_channel(&self, channel: u32) -> Result<()>;

    /// Transmit one raw frame
    ///
    /// A full transmit buffer surfaces as an [`Error::Io`] whose
    /// [`Error::is_backpressure`] is true.
    fn transmit(&self, frame: &[u8]) -> Result<()>;
}

/// Monitor-mode adapter driven through a raw datalink socket
///
/// Channel changes are delegated to `iw`.
pub struct DatalinkRadio {
    name: String,
    sender: Mutex<Option<Box<dyn DataLinkSender>>>,
    /// 0 = unknown
    channel: AtomicU32,
}

impl DatalinkRadio {
    /// Create a radio for the named interface, without opening it
    pub fn by_name(name: &str) -> Result<Self> {
        find_interface(name)?;

        Ok(Self {
            name: name.to_string(),
            sender: Mutex::new(None),
            channel: AtomicU32::new(0),
        })
    }

    /// Names of every interface visible to the datalink layer
    pub fn list_all() -> Vec<String> {
        pnet_datalink::interfaces()
            .into_iter()
            .map(|iface| iface.name)
            .collect()
    }
}

fn find_interface(name: &str) -> Result<NetworkInterface> {
    pnet_datalink::interfaces()
        .into_iter()
        .find(|iface| iface.name == name)
        .ok_or_else(|| Error::InterfaceNotFound(name.to_string()))
}

#[async_trait]
impl Radio for DatalinkRadio {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_active(&self) -> bool {
        self.sender.lock().is_some()
    }

    async fn activate(&self) -> Result<()> {
        let interface = find_interface(&self.name)?;

        let tx = match pnet_datalink::channel(&interface, Default::default()) {
            Ok(Channel::Ethernet(tx, _rx)) => tx,
            Ok(_) => return Err(Error::Interface("Unsupported channel type".to_string())),
            Err(e) => return Err(Error::Interface(format!("Failed to create channel: {}", e))),
        };

        *self.sender.lock() = Some(tx);
        info!(interface = %self.name, "Injection handle opened");
        Ok(())
    }

    fn deactivate(&self) {
        if self.sender.lock().take().is_some() {
            info!(interface = %self.name, "Injection handle closed");
        }
    }

    fn channel(&self) -> Option<u32> {
        match self.channel.load(Ordering::Relaxed) {
            0 => None,
            ch => Some(ch),
        }
    }

    async fn set_channel(&self, channel: u32) -> Result<()> {
        let output = Command::new("iw")
            .args(["dev", &self.name, "set", "channel", &channel.to_string()])
            .output()
            .await?;

        if !output.status.success() {
            return Err(Error::Interface(format!(
                "iw failed to set channel {} on {}: {}",
                channel,
                self.name,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        self.channel.store(channel, Ordering::Relaxed);
        debug!(interface = %self.name, channel = channel, "Channel set");
        Ok(())
    }

    fn transmit(&self, frame: &[u8]) -> Result<()> {
        let mut sender = self.sender.lock();
        let tx = sender
            .as_mut()
            .ok_or_else(|| Error::Interface(format!("{} is not active", self.name)))?;

        tx.send_to(frame, None)
            .ok_or_else(|| Error::Interface("Failed to send packet".to_string()))??;

        Ok(())
    }
}

impl fmt::Debug for DatalinkRadio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatalinkRadio")
            .field("name", &self.name)
            .field("active", &self.is_active())
            .field("channel", &self.channel())
            .finish()
    }
}
