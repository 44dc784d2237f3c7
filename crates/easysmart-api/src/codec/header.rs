// ── Frame header ──
//
// Fixed 32-byte, big-endian header that prefixes every frame in both
// directions. The switch echoes most of it back, filling in the token,
// result code and (on discovery) its own MAC.

use std::fmt;
use std::str::FromStr;

use bytes::{Buf, BufMut};
use serde::{Deserialize, Serialize};

use super::DecodeError;
use crate::error::Error;

/// Header length in bytes.
pub const HEADER_LEN: usize = 32;

/// Protocol version stamped on every request.
pub const PROTOCOL_VERSION: u8 = 1;

// ── MacAddr ─────────────────────────────────────────────────────────

/// A 6-byte hardware address, displayed as lowercase `aa:bb:cc:dd:ee:ff`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    pub const ZERO: Self = Self([0; 6]);

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0; 6]
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl FromStr for MacAddr {
    type Err = Error;

    /// Accepts colon-separated, dash-separated, or bare hex.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex: String = s
            .trim()
            .chars()
            .filter(|c| *c != ':' && *c != '-')
            .collect();
        if hex.len() != 12 || !hex.is_ascii() {
            return Err(Error::InvalidMac(s.to_owned()));
        }
        let mut octets = [0u8; 6];
        for (i, octet) in octets.iter_mut().enumerate() {
            let pair = hex.get(i * 2..i * 2 + 2).ok_or_else(|| Error::InvalidMac(s.to_owned()))?;
            *octet = u8::from_str_radix(pair, 16).map_err(|_| Error::InvalidMac(s.to_owned()))?;
        }
        Ok(Self(octets))
    }
}

impl Serialize for MacAddr {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MacAddr {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ── OpCode ──────────────────────────────────────────────────────────

/// Frame operation code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    Discovery,
    /// Read properties (no authentication needed for most).
    Get,
    /// Reply to [`OpCode::Get`].
    GetReply,
    /// Authenticate, optionally carrying property writes.
    Login,
    /// Reply to [`OpCode::Login`]; also signals a credentials change.
    LoginReply,
    Other(u8),
}

impl OpCode {
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Discovery => 0,
            Self::Get => 1,
            Self::GetReply => 2,
            Self::Login => 3,
            Self::LoginReply => 4,
            Self::Other(code) => code,
        }
    }
}

impl From<u8> for OpCode {
    fn from(code: u8) -> Self {
        match code {
            0 => Self::Discovery,
            1 => Self::Get,
            2 => Self::GetReply,
            3 => Self::Login,
            4 => Self::LoginReply,
            other => Self::Other(other),
        }
    }
}

// ── Header ──────────────────────────────────────────────────────────

/// Decoded frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub version: u8,
    pub op_code: OpCode,
    pub switch_mac: MacAddr,
    pub host_mac: MacAddr,
    /// Correlates a reply with its request (0..1000, wrapping).
    pub sequence_id: u16,
    /// Device result signal; zero means success.
    pub error_code: u32,
    /// Total frame length, header included.
    pub check_length: u16,
    pub fragment_offset: u16,
    pub flag: u16,
    /// Session token issued by the switch; zero until one is seen.
    pub token_id: u16,
    pub checksum: u32,
}

impl Header {
    /// A blank request header for the given endpoints.
    pub fn new(host_mac: MacAddr, switch_mac: MacAddr) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            op_code: OpCode::Discovery,
            switch_mac,
            host_mac,
            sequence_id: 0,
            error_code: 0,
            check_length: 0,
            fragment_offset: 0,
            flag: 0,
            token_id: 0,
            checksum: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error_code == 0
    }

    pub(crate) fn write(&self, buf: &mut impl BufMut) {
        buf.put_u8(self.version);
        buf.put_u8(self.op_code.as_u8());
        buf.put_slice(&self.switch_mac.0);
        buf.put_slice(&self.host_mac.0);
        buf.put_u16(self.sequence_id);
        buf.put_u32(self.error_code);
        buf.put_u16(self.check_length);
        buf.put_u16(self.fragment_offset);
        buf.put_u16(self.flag);
        buf.put_u16(self.token_id);
        buf.put_u32(self.checksum);
    }

    pub(crate) fn read(mut buf: &[u8]) -> Result<Self, DecodeError> {
        if buf.len() < HEADER_LEN {
            return Err(DecodeError::Truncated {
                needed: HEADER_LEN,
                available: buf.len(),
            });
        }
        let version = buf.get_u8();
        let op_code = OpCode::from(buf.get_u8());
        let mut switch_mac = [0u8; 6];
        buf.copy_to_slice(&mut switch_mac);
        let mut host_mac = [0u8; 6];
        buf.copy_to_slice(&mut host_mac);
        Ok(Self {
            version,
            op_code,
            switch_mac: MacAddr(switch_mac),
            host_mac: MacAddr(host_mac),
            sequence_id: buf.get_u16(),
            error_code: buf.get_u32(),
            check_length: buf.get_u16(),
            fragment_offset: buf.get_u16(),
            flag: buf.get_u16(),
            token_id: buf.get_u16(),
            checksum: buf.get_u32(),
        })
    }
}
