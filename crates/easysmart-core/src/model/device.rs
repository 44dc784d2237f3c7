// ── Device identity and management-plane addressing ──

use std::net::Ipv4Addr;

use easysmart_api::{MacAddr, Property};
use serde::Serialize;

/// Answer to an unauthenticated `hostname` read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub device_type: String,
    pub hostname: String,
    pub mac: MacAddr,
    pub firmware: String,
    pub hardware: String,
    pub dhcp: bool,
    pub ip_addr: Option<Ipv4Addr>,
    pub ip_mask: Option<Ipv4Addr>,
    pub gateway: Option<Ipv4Addr>,
    pub num_ports: Option<u8>,
}

impl DeviceInfo {
    pub fn from_properties<'a>(properties: impl IntoIterator<Item = &'a Property>) -> Self {
        let mut info = Self::default();
        for property in properties {
            match property {
                Property::Type(v) => info.device_type.clone_from(v),
                Property::Hostname(v) => info.hostname.clone_from(v),
                Property::Mac(mac) => info.mac = *mac,
                Property::Firmware(v) => info.firmware.clone_from(v),
                Property::Hardware(v) => info.hardware.clone_from(v),
                Property::Dhcp(v) => info.dhcp = *v,
                Property::IpAddr(ip) => info.ip_addr = Some(*ip),
                Property::IpMask(ip) => info.ip_mask = Some(*ip),
                Property::Gateway(ip) => info.gateway = Some(*ip),
                Property::NumPorts(n) => info.num_ports = Some(*n),
                _ => {}
            }
        }
        info
    }
}

/// Static IPv4 management configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NetworkConfig {
    pub dhcp: bool,
    pub ip_addr: Ipv4Addr,
    pub ip_mask: Ipv4Addr,
    pub gateway: Ipv4Addr,
}

impl NetworkConfig {
    /// Fields the switch did not report read as `0.0.0.0`.
    pub fn from_properties<'a>(properties: impl IntoIterator<Item = &'a Property>) -> Self {
        let mut config = Self {
            dhcp: false,
            ip_addr: Ipv4Addr::UNSPECIFIED,
            ip_mask: Ipv4Addr::UNSPECIFIED,
            gateway: Ipv4Addr::UNSPECIFIED,
        };
        for property in properties {
            match property {
                Property::Dhcp(v) => config.dhcp = *v,
                Property::IpAddr(ip) => config.ip_addr = *ip,
                Property::IpMask(ip) => config.ip_mask = *ip,
                Property::Gateway(ip) => config.gateway = *ip,
                _ => {}
            }
        }
        config
    }

    pub fn to_properties(&self) -> Vec<Property> {
        vec![
            Property::Dhcp(self.dhcp),
            Property::IpAddr(self.ip_addr),
            Property::IpMask(self.ip_mask),
            Property::Gateway(self.gateway),
        ]
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn network_config_ignores_unrelated_properties() {
        let props = [
            Property::Hostname("core".into()),
            Property::Dhcp(true),
            Property::IpAddr(Ipv4Addr::new(192, 168, 0, 1)),
            Property::IpMask(Ipv4Addr::new(255, 255, 255, 0)),
        ];
        let config = NetworkConfig::from_properties(&props);
        assert!(config.dhcp);
        assert_eq!(config.ip_addr, Ipv4Addr::new(192, 168, 0, 1));
        assert_eq!(config.gateway, Ipv4Addr::UNSPECIFIED);
    }

    #[test]
    fn network_config_property_order() {
        let config = NetworkConfig {
            dhcp: false,
            ip_addr: Ipv4Addr::new(10, 1, 0, 2),
            ip_mask: Ipv4Addr::new(255, 255, 255, 0),
            gateway: Ipv4Addr::new(10, 1, 0, 1),
        };
        let ids: Vec<u16> = config.to_properties().iter().map(Property::id).collect();
        assert_eq!(ids, [9, 4, 5, 6]);
    }

    #[test]
    fn device_info_from_hostname_reply() {
        let props = [
            Property::Type("TL-SG108E".into()),
            Property::Hostname("core".into()),
            Property::Firmware("1.0.0 Build 20181120 Rel.40749".into()),
            Property::V4(true),
        ];
        let info = DeviceInfo::from_properties(&props);
        assert_eq!(info.device_type, "TL-SG108E");
        assert_eq!(info.hostname, "core");
        assert_eq!(info.ip_addr, None);
    }
}
