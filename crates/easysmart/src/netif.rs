//! Host network interface discovery.
//!
//! Turns an egress choice (interface name or source address) into the
//! interface's name, IPv4 address and MAC. The MAC goes into every request
//! header, and the switch broadcasts its reply back to it.

use std::net::{IpAddr, Ipv4Addr};

use tracing::debug;

use easysmart_api::{Egress, MacAddr};

use crate::error::CliError;

/// The network a factory-reset switch answers on.
pub const FACTORY_NETWORK: Ipv4Addr = Ipv4Addr::new(192, 168, 0, 0);
pub const FACTORY_MASK: Ipv4Addr = Ipv4Addr::new(255, 255, 255, 0);

/// One host interface with an IPv4 address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInterface {
    pub name: String,
    pub ip: Ipv4Addr,
    pub mac: MacAddr,
}

impl HostInterface {
    /// Egress that binds to this interface by name.
    pub fn egress(&self) -> Egress {
        Egress::Interface(self.name.clone())
    }
}

/// Non-loopback IPv4 addresses per interface, as the OS reports them.
fn ipv4_interfaces() -> Result<Vec<(String, Ipv4Addr)>, CliError> {
    let interfaces = local_ip_address::list_afinet_netifas().map_err(|e| CliError::NoInterface {
        what: format!("(cannot list interfaces: {e})"),
    })?;
    Ok(ipv4_only(interfaces))
}

fn ipv4_only(interfaces: Vec<(String, IpAddr)>) -> Vec<(String, Ipv4Addr)> {
    interfaces
        .into_iter()
        .filter_map(|(name, ip)| match ip {
            IpAddr::V4(v4) if !v4.is_loopback() => Some((name, v4)),
            _ => None,
        })
        .collect()
}

/// Whether `ip` lies in `network`/`mask`.
pub fn in_subnet(ip: Ipv4Addr, network: Ipv4Addr, mask: Ipv4Addr) -> bool {
    let mask = u32::from(mask);
    u32::from(ip) & mask == u32::from(network) & mask
}

fn find_in_subnet(
    interfaces: &[(String, Ipv4Addr)],
    network: Ipv4Addr,
    mask: Ipv4Addr,
) -> Option<(String, Ipv4Addr)> {
    interfaces
        .iter()
        .find(|(_, ip)| in_subnet(*ip, network, mask))
        .cloned()
}

fn select(
    interfaces: &[(String, Ipv4Addr)],
    egress: &Egress,
) -> Result<(String, Ipv4Addr), CliError> {
    let found = match egress {
        Egress::Interface(name) => interfaces.iter().find(|(n, _)| n == name),
        Egress::SourceAddress(ip) => interfaces.iter().find(|(_, a)| a == ip),
    };
    found.cloned().ok_or_else(|| CliError::NoInterface {
        what: format!("for {egress}"),
    })
}

// ── Link-layer address ──────────────────────────────────────────────

#[cfg(target_os = "linux")]
fn mac_of(name: &str) -> Result<MacAddr, CliError> {
    let path = std::path::Path::new("/sys/class/net").join(name).join("address");
    let raw = std::fs::read_to_string(&path)?;
    raw.trim().parse().map_err(|_| CliError::NoInterface {
        what: format!("with a usable MAC address on {name}"),
    })
}

/// Reading the MAC through /sys/class/net is Linux-specific.
#[cfg(not(target_os = "linux"))]
fn mac_of(name: &str) -> Result<MacAddr, CliError> {
    Err(CliError::NoInterface {
        what: format!("with a readable MAC address on {name} (only supported on Linux)"),
    })
}

fn with_mac((name, ip): (String, Ipv4Addr)) -> Result<HostInterface, CliError> {
    let mac = mac_of(&name)?;
    debug!(interface = %name, %ip, %mac, "resolved host interface");
    Ok(HostInterface { name, ip, mac })
}

// ── Public entry points ─────────────────────────────────────────────

/// Resolve a configured egress to a concrete interface.
pub fn resolve(egress: &Egress) -> Result<HostInterface, CliError> {
    with_mac(select(&ipv4_interfaces()?, egress)?)
}

/// The first interface with an address inside `network`/`mask`.
pub fn find_subnet(network: Ipv4Addr, mask: Ipv4Addr) -> Result<HostInterface, CliError> {
    let found = find_in_subnet(&ipv4_interfaces()?, network, mask).ok_or_else(|| {
        CliError::NoInterface {
            what: format!("on {network}/{mask}"),
        }
    })?;
    with_mac(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interfaces() -> Vec<(String, Ipv4Addr)> {
        ipv4_only(vec![
            ("lo".into(), IpAddr::V4(Ipv4Addr::LOCALHOST)),
            ("eth0".into(), IpAddr::V4(Ipv4Addr::new(10, 1, 0, 1))),
            ("eth1".into(), "fe80::1".parse().unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))),
            ("eth1".into(), IpAddr::V4(Ipv4Addr::new(192, 168, 0, 254))),
        ])
    }

    #[test]
    fn loopback_and_ipv6_are_skipped() {
        let names: Vec<_> = interfaces().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["eth0", "eth1"]);
    }

    #[test]
    fn subnet_membership() {
        let mask = Ipv4Addr::new(255, 255, 255, 0);
        assert!(in_subnet(Ipv4Addr::new(192, 168, 0, 254), FACTORY_NETWORK, mask));
        assert!(!in_subnet(Ipv4Addr::new(192, 168, 1, 2), FACTORY_NETWORK, mask));
        assert!(in_subnet(
            Ipv4Addr::new(10, 1, 0, 1),
            Ipv4Addr::new(10, 1, 0, 2),
            mask
        ));
    }

    #[test]
    fn finds_the_factory_network_interface() {
        let found = find_in_subnet(&interfaces(), FACTORY_NETWORK, FACTORY_MASK);
        assert_eq!(
            found,
            Some(("eth1".to_owned(), Ipv4Addr::new(192, 168, 0, 254)))
        );
    }

    #[test]
    fn selects_by_name_or_address() {
        let ifs = interfaces();
        let by_name = select(&ifs, &Egress::Interface("eth0".into()));
        assert!(matches!(by_name, Ok((_, ip)) if ip == Ipv4Addr::new(10, 1, 0, 1)));

        let by_addr = select(&ifs, &Egress::SourceAddress(Ipv4Addr::new(192, 168, 0, 254)));
        assert!(matches!(by_addr, Ok((name, _)) if name == "eth1"));

        let missing = select(&ifs, &Egress::Interface("wlan0".into()));
        assert!(matches!(missing, Err(CliError::NoInterface { .. })));
    }
}
