//! Radiotap transmit header
//!
//! Monitor-mode interfaces expect every injected frame to be prefixed with a
//! radiotap header. For injection only the TX flags field matters, so this
//! is a minimal encoder rather than a full radiotap implementation.

use airjam_core::{Error, Result};
use bytes::{Buf, BufMut, BytesMut};

/// TX flags field present (bit 15 of the present word)
const PRESENT_TX_FLAGS: u32 = 1 << 15;

/// TX flag: do not wait for / retry on missing ACK
pub const TX_FLAG_NO_ACK: u16 = 0x0008;

/// Radiotap header prepended to injected frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RadiotapHeader {
    /// TX flags; `None` omits the field entirely
    pub tx_flags: Option<u16>,
}

impl RadiotapHeader {
    /// Header without any fields
    pub const BARE_LEN: usize = 8;

    /// Header asking the driver not to wait for ACKs
    pub fn no_ack() -> Self {
        Self {
            tx_flags: Some(TX_FLAG_NO_ACK),
        }
    }

    /// Encoded length in bytes
    pub fn len(&self) -> usize {
        match self.tx_flags {
            Some(_) => Self::BARE_LEN + 2,
            None => Self::BARE_LEN,
        }
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Append the encoded header to `buffer` (all fields little endian)
    pub fn encode(&self, buffer: &mut BytesMut) {
        buffer.put_u8(0); // version
        buffer.put_u8(0); // pad
        buffer.put_u16_le(self.len() as u16);

        match self.tx_flags {
            Some(flags) => {
                buffer.put_u32_le(PRESENT_TX_FLAGS);
                buffer.put_u16_le(flags);
            }
            None => buffer.put_u32_le(0),
        }
    }

    /// Length of the radiotap header at the start of `data`
    pub fn header_len(data: &[u8]) -> Result<usize> {
        if data.len() < Self::BARE_LEN {
            return Err(Error::construction("truncated radiotap header"));
        }

        let mut cursor = &data[..Self::BARE_LEN];
        let version = cursor.get_u8();
        let _pad = cursor.get_u8();
        let len = cursor.get_u16_le() as usize;

        if version != 0 || len < Self::BARE_LEN || len > data.len() {
            return Err(Error::construction(format!(
                "invalid radiotap header (version {}, length {})",
                version, len
            )));
        }

        Ok(len)
    }
}
