// ── Observed switch state ──
//
// Value objects built fresh from a device read for every run. The switch
// is the only durable store; nothing here is persisted.

use std::collections::{BTreeMap, BTreeSet};

use easysmart_api::{PortPvid, PortStatus, VlanEntry};
use serde::Serialize;
use strum::{Display, FromRepr};
use tracing::warn;

/// Configured or negotiated port speed, as the switch encodes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, FromRepr, Serialize)]
#[repr(u8)]
pub enum LinkSpeed {
    #[strum(serialize = "down")]
    Down = 0,
    #[strum(serialize = "auto")]
    Auto = 1,
    #[strum(serialize = "10M half")]
    Half10 = 2,
    #[strum(serialize = "10M full")]
    Full10 = 3,
    #[strum(serialize = "100M half")]
    Half100 = 4,
    #[strum(serialize = "100M full")]
    Full100 = 5,
    #[strum(serialize = "1000M full")]
    Full1000 = 6,
}

impl LinkSpeed {
    pub fn label(code: u8) -> String {
        Self::from_repr(code).map_or_else(|| format!("unknown ({code})"), |s| s.to_string())
    }
}

/// One physical port as read from the switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Port {
    pub port: u8,
    pub enabled: bool,
    /// Zero when the switch did not report a PVID for this port.
    pub pvid: u16,
    /// Raw settings, re-submitted unchanged when only `enabled` changes.
    #[serde(skip)]
    pub settings: PortStatus,
}

/// One 802.1Q VLAN as read from the switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Vlan {
    pub vlan_id: u16,
    pub name: String,
    pub tagged_ports: BTreeSet<u8>,
    pub untagged_ports: BTreeSet<u8>,
}

impl Vlan {
    pub fn new(vlan_id: u16, name: impl Into<String>) -> Self {
        Self {
            vlan_id,
            name: name.into(),
            tagged_ports: BTreeSet::new(),
            untagged_ports: BTreeSet::new(),
        }
    }

    pub fn member_ports(&self) -> BTreeSet<u8> {
        self.tagged_ports.union(&self.untagged_ports).copied().collect()
    }

    pub fn contains(&self, port: u8) -> bool {
        self.tagged_ports.contains(&port) || self.untagged_ports.contains(&port)
    }

    /// Wire form: members include the tagged ports.
    pub fn to_entry(&self) -> VlanEntry {
        VlanEntry {
            vlan_id: self.vlan_id,
            member_ports: self.member_ports(),
            tagged_ports: self.tagged_ports.clone(),
            name: self.name.clone(),
        }
    }
}

impl From<VlanEntry> for Vlan {
    fn from(entry: VlanEntry) -> Self {
        let untagged_ports = entry
            .member_ports
            .difference(&entry.tagged_ports)
            .copied()
            .collect();
        Self {
            vlan_id: entry.vlan_id,
            name: entry.name,
            tagged_ports: entry.tagged_ports,
            untagged_ports,
        }
    }
}

/// Everything the reconciler compares against a declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SwitchState {
    pub vlan_enabled: bool,
    pub ports: BTreeMap<u8, Port>,
    pub vlans: BTreeMap<u16, Vlan>,
}

impl SwitchState {
    /// Merge the separate port, PVID and VLAN reads into one snapshot.
    pub fn from_parts(
        vlan_enabled: bool,
        ports: Vec<PortStatus>,
        pvids: &[PortPvid],
        vlans: Vec<VlanEntry>,
    ) -> Self {
        let pvid_of: BTreeMap<u8, u16> = pvids.iter().map(|p| (p.port, p.pvid)).collect();
        let ports = ports
            .into_iter()
            .map(|settings| {
                let pvid = pvid_of.get(&settings.port).copied().unwrap_or_else(|| {
                    warn!(port = settings.port, "switch reported no pvid for port");
                    0
                });
                let port = Port {
                    port: settings.port,
                    enabled: settings.is_enabled(),
                    pvid,
                    settings,
                };
                (port.port, port)
            })
            .collect();
        let vlans = vlans
            .into_iter()
            .map(|entry| (entry.vlan_id, Vlan::from(entry)))
            .collect();
        Self {
            vlan_enabled,
            ports,
            vlans,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn status(port: u8, enabled: bool) -> PortStatus {
        PortStatus {
            port,
            status: u8::from(enabled),
            lag: 0,
            speed: 1,
            actual_speed: 6,
            flow_control: 0,
            actual_flow_control: 0,
        }
    }

    #[test]
    fn parts_merge_into_state() {
        let state = SwitchState::from_parts(
            true,
            vec![status(1, true), status(2, false)],
            &[PortPvid { port: 1, pvid: 1 }, PortPvid { port: 2, pvid: 2 }],
            vec![
                VlanEntry {
                    vlan_id: 1,
                    member_ports: BTreeSet::from([1, 2]),
                    tagged_ports: BTreeSet::from([2]),
                    name: "Default".into(),
                },
                VlanEntry {
                    vlan_id: 2,
                    member_ports: BTreeSet::from([2]),
                    tagged_ports: BTreeSet::new(),
                    name: "wan".into(),
                },
            ],
        );
        assert!(state.ports[&1].enabled);
        assert!(!state.ports[&2].enabled);
        assert_eq!(state.ports[&2].pvid, 2);
        assert_eq!(state.vlans[&1].untagged_ports, BTreeSet::from([1]));
        assert_eq!(state.vlans[&1].tagged_ports, BTreeSet::from([2]));
        assert_eq!(state.vlans[&2].untagged_ports, BTreeSet::from([2]));
    }

    #[test]
    fn missing_pvid_reads_as_zero() {
        let state = SwitchState::from_parts(true, vec![status(3, true)], &[], vec![]);
        assert_eq!(state.ports[&3].pvid, 0);
    }

    #[test]
    fn vlan_entry_round_trip() {
        let mut vlan = Vlan::new(10, "iot");
        vlan.tagged_ports.insert(8);
        vlan.untagged_ports.extend([3, 4]);
        let entry = vlan.to_entry();
        assert_eq!(entry.member_ports, BTreeSet::from([3, 4, 8]));
        assert_eq!(Vlan::from(entry), vlan);
    }

    #[test]
    fn speed_labels() {
        assert_eq!(LinkSpeed::label(6), "1000M full");
        assert_eq!(LinkSpeed::label(0), "down");
        assert_eq!(LinkSpeed::label(42), "unknown (42)");
    }
}
