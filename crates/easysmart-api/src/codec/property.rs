// ── Typed properties ──
//
// A payload is an ordered list of `(id, length, value)` entries. Each known
// id has exactly one value layout; `Property` carries the decoded value and
// is the only place that knows how to turn it back into bytes. Ids the
// client does not understand survive a decode/encode cycle as `Raw`.

use std::collections::BTreeSet;
use std::net::Ipv4Addr;

use bytes::{BufMut, Bytes};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, FromRepr, IntoStaticStr};

use super::DecodeError;
use super::header::MacAddr;
use crate::error::Error;

/// Highest port number a 32-bit membership mask can carry.
pub const MAX_PORTS: u8 = 32;

// ── PropertyId ──────────────────────────────────────────────────────

/// Static, bidirectional property name ⇄ id table.
///
/// `PropertyId::Vlan.to_string() == "vlan"`, `"pvid".parse() == Ok(Pvid)`,
/// `PropertyId::from_repr(4096) == Some(Ports)`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    IntoStaticStr,
    AsRefStr,
    EnumIter,
    FromRepr,
)]
#[strum(serialize_all = "snake_case")]
#[repr(u16)]
pub enum PropertyId {
    Type = 1,
    Hostname = 2,
    Mac = 3,
    IpAddr = 4,
    IpMask = 5,
    Gateway = 6,
    Firmware = 7,
    Hardware = 8,
    Dhcp = 9,
    NumPorts = 10,
    V4 = 13,
    Username = 512,
    NewUsername = 513,
    Password = 514,
    NewPassword = 515,
    GetTokenId = 2305,
    Ports = 4096,
    VlanEnabled = 8704,
    Vlan = 8705,
    Pvid = 8706,
    VlanFiller = 8707,
}

impl PropertyId {
    pub fn id(self) -> u16 {
        self as u16
    }

    pub fn name(self) -> &'static str {
        self.into()
    }

    pub fn from_id(id: u16) -> Option<Self> {
        Self::from_repr(id)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        name.parse().ok()
    }
}

// ── Value types ─────────────────────────────────────────────────────

/// Per-port settings, as carried by the `ports` property.
///
/// `speed`: 1 auto, 2 10MH, 3 10MF, 4 100MH, 5 100MF, 6 1000MF.
/// `flow_control`: 0 off, 1 on. The `actual_*` fields are read-only and
/// written back as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortStatus {
    pub port: u8,
    /// 0 disabled, 1 enabled.
    pub status: u8,
    pub lag: u8,
    pub speed: u8,
    pub actual_speed: u8,
    pub flow_control: u8,
    pub actual_flow_control: u8,
}

impl PortStatus {
    pub fn is_enabled(&self) -> bool {
        self.status == 1
    }

    /// The value to submit when changing only `enabled`, keeping the
    /// port's other settings.
    pub fn with_enabled(&self, enabled: bool) -> Self {
        Self {
            status: u8::from(enabled),
            actual_speed: 0,
            actual_flow_control: 0,
            ..*self
        }
    }
}

/// A port's PVID, as carried by the `pvid` property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortPvid {
    pub port: u8,
    pub pvid: u16,
}

/// A VLAN descriptor, as carried by the `vlan` property.
///
/// `member_ports` includes the tagged ports; untagged members are
/// `member_ports - tagged_ports`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VlanEntry {
    pub vlan_id: u16,
    pub member_ports: BTreeSet<u8>,
    pub tagged_ports: BTreeSet<u8>,
    pub name: String,
}

// ── Port-set bitmask ────────────────────────────────────────────────

/// Encode a port set as a bitmask: port `n` sets bit `n - 1`.
pub fn ports_to_bitmask<I>(ports: I) -> Result<u32, Error>
where
    I: IntoIterator<Item = u8>,
{
    ports.into_iter().try_fold(0u32, |mask, port| {
        if port == 0 || port > MAX_PORTS {
            return Err(Error::Encode {
                property: "vlan",
                reason: format!("port {port} outside 1..={MAX_PORTS}"),
            });
        }
        Ok(mask | 1 << (port - 1))
    })
}

/// Inverse of [`ports_to_bitmask`].
pub fn bitmask_to_ports(mask: u32) -> BTreeSet<u8> {
    (1..=MAX_PORTS)
        .filter(|port| mask & (1 << (port - 1)) != 0)
        .collect()
}

// ── Property ────────────────────────────────────────────────────────

/// One payload entry with its strongly-typed value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Property {
    /// An id with an empty value: how reads are requested.
    Query(PropertyId),
    Type(String),
    Hostname(String),
    Mac(MacAddr),
    IpAddr(Ipv4Addr),
    IpMask(Ipv4Addr),
    Gateway(Ipv4Addr),
    Firmware(String),
    Hardware(String),
    Dhcp(bool),
    NumPorts(u8),
    V4(bool),
    Username(String),
    NewUsername(String),
    Password(String),
    NewPassword(String),
    Ports(PortStatus),
    VlanEnabled(bool),
    Vlan(VlanEntry),
    Pvid(PortPvid),
    /// Any id without a typed layout, kept verbatim.
    Raw { id: u16, value: Bytes },
}

impl Property {
    pub fn id(&self) -> u16 {
        match self {
            Self::Query(id) => id.id(),
            Self::Raw { id, .. } => *id,
            typed => typed.known_id().map_or(0, PropertyId::id),
        }
    }

    /// The table name for this entry, if its id is known.
    pub fn name(&self) -> Option<&'static str> {
        PropertyId::from_id(self.id()).map(PropertyId::name)
    }

    fn known_id(&self) -> Option<PropertyId> {
        let id = match self {
            Self::Query(id) => *id,
            Self::Type(_) => PropertyId::Type,
            Self::Hostname(_) => PropertyId::Hostname,
            Self::Mac(_) => PropertyId::Mac,
            Self::IpAddr(_) => PropertyId::IpAddr,
            Self::IpMask(_) => PropertyId::IpMask,
            Self::Gateway(_) => PropertyId::Gateway,
            Self::Firmware(_) => PropertyId::Firmware,
            Self::Hardware(_) => PropertyId::Hardware,
            Self::Dhcp(_) => PropertyId::Dhcp,
            Self::NumPorts(_) => PropertyId::NumPorts,
            Self::V4(_) => PropertyId::V4,
            Self::Username(_) => PropertyId::Username,
            Self::NewUsername(_) => PropertyId::NewUsername,
            Self::Password(_) => PropertyId::Password,
            Self::NewPassword(_) => PropertyId::NewPassword,
            Self::Ports(_) => PropertyId::Ports,
            Self::VlanEnabled(_) => PropertyId::VlanEnabled,
            Self::Vlan(_) => PropertyId::Vlan,
            Self::Pvid(_) => PropertyId::Pvid,
            Self::Raw { id, .. } => return PropertyId::from_id(*id),
        };
        Some(id)
    }

    /// Encode just the value bytes.
    pub fn encode_value(&self) -> Result<Vec<u8>, Error> {
        let mut out = Vec::new();
        match self {
            Self::Query(_) => {}
            Self::Type(s)
            | Self::Hostname(s)
            | Self::Firmware(s)
            | Self::Hardware(s)
            | Self::Username(s)
            | Self::NewUsername(s)
            | Self::Password(s)
            | Self::NewPassword(s) => put_cstr(&mut out, self.label(), s)?,
            Self::Mac(mac) => out.put_slice(&mac.octets()),
            Self::IpAddr(ip) | Self::IpMask(ip) | Self::Gateway(ip) => {
                out.put_slice(&ip.octets());
            }
            Self::Dhcp(flag) | Self::V4(flag) | Self::VlanEnabled(flag) => {
                out.put_u8(u8::from(*flag));
            }
            Self::NumPorts(n) => out.put_u8(*n),
            Self::Ports(p) => out.put_slice(&[
                p.port,
                p.status,
                p.lag,
                p.speed,
                p.actual_speed,
                p.flow_control,
                p.actual_flow_control,
            ]),
            Self::Pvid(p) => {
                out.put_u8(p.port);
                out.put_u16(p.pvid);
            }
            Self::Vlan(v) => {
                out.put_u16(v.vlan_id);
                out.put_u32(ports_to_bitmask(v.member_ports.iter().copied())?);
                out.put_u32(ports_to_bitmask(v.tagged_ports.iter().copied())?);
                put_cstr(&mut out, "vlan", &v.name)?;
            }
            Self::Raw { value, .. } => out.put_slice(value),
        }
        Ok(out)
    }

    /// Append the full `(id, length, value)` entry to `buf`.
    pub fn encode(&self, buf: &mut impl BufMut) -> Result<(), Error> {
        let value = self.encode_value()?;
        let len = u16::try_from(value.len()).map_err(|_| Error::Encode {
            property: self.label(),
            reason: format!("value of {} bytes does not fit a u16 length", value.len()),
        })?;
        buf.put_u16(self.id());
        buf.put_u16(len);
        buf.put_slice(&value);
        Ok(())
    }

    /// Decode one value for `id`. Empty values decode as [`Property::Query`]
    /// for known ids; unknown ids are preserved as [`Property::Raw`].
    pub fn decode(id: u16, value: &[u8]) -> Result<Self, DecodeError> {
        let Some(known) = PropertyId::from_id(id) else {
            return Ok(Self::Raw {
                id,
                value: Bytes::copy_from_slice(value),
            });
        };
        if value.is_empty() {
            return Ok(Self::Query(known));
        }
        let invalid = || DecodeError::InvalidValue {
            property: known.name(),
            length: value.len(),
        };
        let property = match known {
            PropertyId::Type => Self::Type(get_cstr(value)),
            PropertyId::Hostname => Self::Hostname(get_cstr(value)),
            PropertyId::Firmware => Self::Firmware(get_cstr(value)),
            PropertyId::Hardware => Self::Hardware(get_cstr(value)),
            PropertyId::Username => Self::Username(get_cstr(value)),
            PropertyId::NewUsername => Self::NewUsername(get_cstr(value)),
            PropertyId::Password => Self::Password(get_cstr(value)),
            PropertyId::NewPassword => Self::NewPassword(get_cstr(value)),
            PropertyId::Mac => {
                let octets: [u8; 6] = value.try_into().map_err(|_| invalid())?;
                Self::Mac(MacAddr(octets))
            }
            PropertyId::IpAddr => Self::IpAddr(get_ipv4(value).ok_or_else(invalid)?),
            PropertyId::IpMask => Self::IpMask(get_ipv4(value).ok_or_else(invalid)?),
            PropertyId::Gateway => Self::Gateway(get_ipv4(value).ok_or_else(invalid)?),
            PropertyId::Dhcp => Self::Dhcp(get_bool(value).ok_or_else(invalid)?),
            PropertyId::V4 => Self::V4(get_bool(value).ok_or_else(invalid)?),
            PropertyId::VlanEnabled => Self::VlanEnabled(get_bool(value).ok_or_else(invalid)?),
            PropertyId::NumPorts => match value {
                [n] => Self::NumPorts(*n),
                _ => return Err(invalid()),
            },
            PropertyId::Ports => match value {
                [port, status, lag, speed, actual_speed, flow_control, actual_flow_control] => {
                    Self::Ports(PortStatus {
                        port: *port,
                        status: *status,
                        lag: *lag,
                        speed: *speed,
                        actual_speed: *actual_speed,
                        flow_control: *flow_control,
                        actual_flow_control: *actual_flow_control,
                    })
                }
                _ => return Err(invalid()),
            },
            PropertyId::Pvid => match value {
                [port, hi, lo] => Self::Pvid(PortPvid {
                    port: *port,
                    pvid: u16::from_be_bytes([*hi, *lo]),
                }),
                _ => return Err(invalid()),
            },
            PropertyId::Vlan => {
                if value.len() < 10 {
                    return Err(invalid());
                }
                let (fixed, name) = value.split_at(10);
                let vlan_id = u16::from_be_bytes([fixed[0], fixed[1]]);
                let member = u32::from_be_bytes([fixed[2], fixed[3], fixed[4], fixed[5]]);
                let tagged = u32::from_be_bytes([fixed[6], fixed[7], fixed[8], fixed[9]]);
                Self::Vlan(VlanEntry {
                    vlan_id,
                    member_ports: bitmask_to_ports(member),
                    tagged_ports: bitmask_to_ports(tagged),
                    name: get_cstr(name),
                })
            }
            PropertyId::GetTokenId | PropertyId::VlanFiller => Self::Raw {
                id,
                value: Bytes::copy_from_slice(value),
            },
        };
        Ok(property)
    }

    fn label(&self) -> &'static str {
        self.name().unwrap_or("unknown")
    }
}

// ── Primitive helpers ───────────────────────────────────────────────

fn put_cstr(out: &mut Vec<u8>, property: &'static str, s: &str) -> Result<(), Error> {
    if !s.is_ascii() || s.contains('\0') {
        return Err(Error::Encode {
            property,
            reason: "value must be ASCII without NUL bytes".into(),
        });
    }
    out.put_slice(s.as_bytes());
    out.put_u8(0);
    Ok(())
}

fn get_cstr(value: &[u8]) -> String {
    let end = value.iter().position(|b| *b == 0).unwrap_or(value.len());
    String::from_utf8_lossy(&value[..end]).into_owned()
}

fn get_ipv4(value: &[u8]) -> Option<Ipv4Addr> {
    let octets: [u8; 4] = value.try_into().ok()?;
    Some(Ipv4Addr::from(octets))
}

fn get_bool(value: &[u8]) -> Option<bool> {
    match value {
        [b] => Some(*b != 0),
        _ => None,
    }
}
