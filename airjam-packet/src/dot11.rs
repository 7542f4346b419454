//! IEEE 802.11 management frame construction and parsing
//!
//! Only what injection needs: the frame control field, the 24 byte
//! management header and the deauthentication body.

use crate::radiotap::RadiotapHeader;
use airjam_core::{Error, MacAddr, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;

/// 802.11 frame type (bits 2-3 of the first frame control byte)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    Management,
    Control,
    Data,
    Extension,
}

impl FrameType {
    pub fn to_u8(self) -> u8 {
        match self {
            FrameType::Management => 0,
            FrameType::Control => 1,
            FrameType::Data => 2,
            FrameType::Extension => 3,
        }
    }

    pub fn from_u8(value: u8) -> Self {
        match value & 0x03 {
            0 => FrameType::Management,
            1 => FrameType::Control,
            2 => FrameType::Data,
            _ => FrameType::Extension,
        }
    }
}

/// Management frame subtypes
pub mod subtype {
    pub const ASSOCIATION_REQUEST: u8 = 0;
    pub const PROBE_REQUEST: u8 = 4;
    pub const BEACON: u8 = 8;
    pub const DISASSOCIATION: u8 = 10;
    pub const AUTHENTICATION: u8 = 11;
    pub const DEAUTHENTICATION: u8 = 12;
}

/// Frame control field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameControl {
    pub frame_type: FrameType,
    pub subtype: u8,
    /// Second byte: ToDS/FromDS/retry/protected/...
    pub flags: u8,
}

impl FrameControl {
    /// Management frame of the given subtype, no flags
    pub fn management(subtype: u8) -> Self {
        Self {
            frame_type: FrameType::Management,
            subtype,
            flags: 0,
        }
    }

    pub fn to_bytes(self) -> [u8; 2] {
        // protocol version is always 0
        [((self.subtype & 0x0f) << 4) | (self.frame_type.to_u8() << 2), self.flags]
    }

    pub fn from_bytes(bytes: [u8; 2]) -> Result<Self> {
        if bytes[0] & 0x03 != 0 {
            return Err(Error::construction(format!(
                "unsupported 802.11 protocol version {}",
                bytes[0] & 0x03
            )));
        }

        Ok(Self {
            frame_type: FrameType::from_u8(bytes[0] >> 2),
            subtype: bytes[0] >> 4,
            flags: bytes[1],
        })
    }
}

/// Deauthentication / disassociation reason codes (IEEE 802.11-2016 9.4.1.7)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReasonCode {
    Unspecified,
    PreviousAuthNoLongerValid,
    StationLeaving,
    Inactivity,
    ApOverloaded,
    Class2FromNonAuthenticated,
    Class3FromNonAssociated,
    Other(u16),
}

impl ReasonCode {
    pub fn to_u16(self) -> u16 {
        match self {
            ReasonCode::Unspecified => 1,
            ReasonCode::PreviousAuthNoLongerValid => 2,
            ReasonCode::StationLeaving => 3,
            ReasonCode::Inactivity => 4,
            ReasonCode::ApOverloaded => 5,
            ReasonCode::Class2FromNonAuthenticated => 6,
            ReasonCode::Class3FromNonAssociated => 7,
            ReasonCode::Other(code) => code,
        }
    }

    pub fn from_u16(value: u16) -> Self {
        match value {
            1 => ReasonCode::Unspecified,
            2 => ReasonCode::PreviousAuthNoLongerValid,
            3 => ReasonCode::StationLeaving,
            4 => ReasonCode::Inactivity,
            5 => ReasonCode::ApOverloaded,
            6 => ReasonCode::Class2FromNonAuthenticated,
            7 => ReasonCode::Class3FromNonAssociated,
            code => ReasonCode::Other(code),
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReasonCode::Unspecified => write!(f, "unspecified"),
            ReasonCode::PreviousAuthNoLongerValid => {
                write!(f, "previous authentication no longer valid")
            }
            ReasonCode::StationLeaving => write!(f, "station is leaving"),
            ReasonCode::Inactivity => write!(f, "inactivity"),
            ReasonCode::ApOverloaded => write!(f, "AP cannot handle all associated stations"),
            ReasonCode::Class2FromNonAuthenticated => {
                write!(f, "class 2 frame received from nonauthenticated station")
            }
            ReasonCode::Class3FromNonAssociated => {
                write!(f, "class 3 frame received from nonassociated station")
            }
            ReasonCode::Other(code) => write!(f, "reason {}", code),
        }
    }
}

/// 24 byte management frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagementHeader {
    pub frame_control: FrameControl,
    /// Duration/ID in microseconds
    pub duration: u16,
    /// Address 1: receiver
    pub destination: MacAddr,
    /// Address 2: transmitter
    pub source: MacAddr,
    /// Address 3
    pub bssid: MacAddr,
    /// 12 bit sequence number
    pub sequence: u16,
    /// 4 bit fragment number
    pub fragment: u8,
}

impl ManagementHeader {
    pub const SIZE: usize = 24;

    /// Largest value the 12 bit sequence number can hold
    pub const MAX_SEQUENCE: u16 = 0x0fff;

    /// Duration most injection tools put in deauth frames
    pub const DEFAULT_DURATION: u16 = 0x013a;

    fn encode(&self, buffer: &mut BytesMut) -> Result<()> {
        if self.sequence > Self::MAX_SEQUENCE {
            return Err(Error::construction(format!(
                "sequence number {} does not fit in 12 bits",
                self.sequence
            )));
        }
        if self.fragment > 0x0f {
            return Err(Error::construction(format!(
                "fragment number {} does not fit in 4 bits",
                self.fragment
            )));
        }

        buffer.put_slice(&self.frame_control.to_bytes());
        buffer.put_u16_le(self.duration);
        buffer.put_slice(self.destination.as_bytes());
        buffer.put_slice(self.source.as_bytes());
        buffer.put_slice(self.bssid.as_bytes());
        buffer.put_u16_le((self.sequence << 4) | self.fragment as u16);
        Ok(())
    }

    fn decode(data: &mut &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(Error::construction("truncated management header"));
        }

        let frame_control = FrameControl::from_bytes([data.get_u8(), data.get_u8()])?;
        let duration = data.get_u16_le();
        let destination = read_mac(data);
        let source = read_mac(data);
        let bssid = read_mac(data);
        let sequence_control = data.get_u16_le();

        Ok(Self {
            frame_control,
            duration,
            destination,
            source,
            bssid,
            sequence: sequence_control >> 4,
            fragment: (sequence_control & 0x0f) as u8,
        })
    }
}

fn read_mac(data: &mut &[u8]) -> MacAddr {
    let mut bytes = [0u8; 6];
    data.copy_to_slice(&mut bytes);
    MacAddr(bytes)
}

/// Deauthentication frame, radiotap header included
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deauthentication {
    pub radiotap: RadiotapHeader,
    pub header: ManagementHeader,
    pub reason: ReasonCode,
}

impl Deauthentication {
    /// Deauthentication sent by `source` to `destination` within `bssid`
    pub fn new(source: MacAddr, destination: MacAddr, bssid: MacAddr, sequence: u16) -> Self {
        Self {
            radiotap: RadiotapHeader::no_ack(),
            header: ManagementHeader {
                frame_control: FrameControl::management(subtype::DEAUTHENTICATION),
                duration: ManagementHeader::DEFAULT_DURATION,
                destination,
                source,
                bssid,
                sequence,
                fragment: 0,
            },
            reason: ReasonCode::Class2FromNonAuthenticated,
        }
    }

    pub fn with_reason(mut self, reason: ReasonCode) -> Self {
        self.reason = reason;
        self
    }

    /// Encode for injection
    ///
    /// Fails for a non-unicast transmitter address or out of range
    /// sequence/fragment numbers.
    pub fn to_bytes(&self) -> Result<Bytes> {
        if !self.header.source.is_unicast() {
            return Err(Error::construction(format!(
                "deauthentication source {} is not a unicast address",
                self.header.source
            )));
        }

        let mut buffer =
            BytesMut::with_capacity(self.radiotap.len() + ManagementHeader::SIZE + 2);
        self.radiotap.encode(&mut buffer);
        self.header.encode(&mut buffer)?;
        buffer.put_u16_le(self.reason.to_u16());

        Ok(buffer.freeze())
    }

    /// Parse a radiotap-prefixed deauthentication frame
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let radiotap_len = RadiotapHeader::header_len(data)?;
        let radiotap = if radiotap_len >= RadiotapHeader::BARE_LEN + 2 {
            RadiotapHeader {
                tx_flags: Some(u16::from_le_bytes([data[8], data[9]])),
            }
        } else {
            RadiotapHeader::default()
        };

        let mut body = &data[radiotap_len..];
        let header = ManagementHeader::decode(&mut body)?;

        if header.frame_control.frame_type != FrameType::Management
            || header.frame_control.subtype != subtype::DEAUTHENTICATION
        {
            return Err(Error::construction("not a deauthentication frame"));
        }
        if body.len() < 2 {
            return Err(Error::construction("missing reason code"));
        }

        Ok(Self {
            radiotap,
            header,
            reason: ReasonCode::from_u16(body.get_u16_le()),
        })
    }
}

/// Build a ready-to-inject deauthentication frame
pub fn build_deauth(
    source: MacAddr,
    destination: MacAddr,
    bssid: MacAddr,
    sequence: u16,
) -> Result<Bytes> {
    Deauthentication::new(source, destination, bssid, sequence).to_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    const AP: MacAddr = MacAddr([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
    const CLIENT: MacAddr = MacAddr([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0x01]);

    #[test]
    fn test_frame_control_deauth() {
        let fc = FrameControl::management(subtype::DEAUTHENTICATION);
        assert_eq!(fc.to_bytes(), [0xc0, 0x00]);
        assert_eq!(FrameControl::from_bytes([0xc0, 0x00]).unwrap(), fc);
        assert!(FrameControl::from_bytes([0xc1, 0x00]).is_err());
    }

    #[test]
    fn test_deauth_layout() {
        let bytes = build_deauth(AP, CLIENT, AP, 5).unwrap();
        assert_eq!(bytes.len(), 10 + 24 + 2);

        let frame = &bytes[10..];
        assert_eq!(&frame[0..2], &[0xc0, 0x00]);
        assert_eq!(&frame[2..4], &[0x3a, 0x01]);
        assert_eq!(&frame[4..10], CLIENT.as_bytes());
        assert_eq!(&frame[10..16], AP.as_bytes());
        assert_eq!(&frame[16..22], AP.as_bytes());
        // sequence 5, fragment 0
        assert_eq!(&frame[22..24], &[0x50, 0x00]);
        // reason 6
        assert_eq!(&frame[24..26], &[0x06, 0x00]);
    }

    #[test]
    fn test_parse_built_frame() {
        let bytes = build_deauth(CLIENT, AP, AP, 4095).unwrap();
        let deauth = Deauthentication::from_bytes(&bytes).unwrap();

        assert_eq!(deauth.header.source, CLIENT);
        assert_eq!(deauth.header.destination, AP);
        assert_eq!(deauth.header.bssid, AP);
        assert_eq!(deauth.header.sequence, 4095);
        assert_eq!(deauth.reason, ReasonCode::Class2FromNonAuthenticated);
        assert_eq!(deauth.radiotap, RadiotapHeader::no_ack());
    }

    #[test]
    fn test_sequence_out_of_range() {
        let err = build_deauth(AP, CLIENT, AP, 4096).unwrap_err();
        assert!(matches!(err, Error::PacketConstruction(_)));
    }

    #[test]
    fn test_non_unicast_source_rejected() {
        assert!(build_deauth(MacAddr::BROADCAST, CLIENT, AP, 0).is_err());
        assert!(build_deauth(MacAddr([0x01, 0x00, 0x5e, 0, 0, 1]), AP, AP, 0).is_err());
        // broadcast destination is fine (AP -> everyone)
        assert!(build_deauth(AP, MacAddr::BROADCAST, AP, 0).is_ok());
    }

    #[test]
    fn test_custom_reason() {
        let bytes = Deauthentication::new(AP, CLIENT, AP, 0)
            .with_reason(ReasonCode::StationLeaving)
            .to_bytes()
            .unwrap();
        let parsed = Deauthentication::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.reason, ReasonCode::StationLeaving);
        assert_eq!(parsed.reason.to_string(), "station is leaving");
    }

    #[test]
    fn test_parse_rejects_other_frames() {
        let mut bytes = build_deauth(AP, CLIENT, AP, 0).unwrap().to_vec();
        bytes[10] = 0x80; // beacon
        assert!(Deauthentication::from_bytes(&bytes).is_err());
        assert!(Deauthentication::from_bytes(&bytes[..20]).is_err());
    }
}
