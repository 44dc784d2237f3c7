// ── Ordered mutation batches ──
//
// The switch refuses a port with no VLAN membership and a PVID naming a
// VLAN the port is not untagged in. Writes therefore go out in a fixed
// order: VLANs first grow to the union of old and new members, PVIDs
// move, and only then do VLANs shrink to their final membership.

use easysmart_api::{PortPvid, PortStatus, VlanEntry};
use strum::{Display, EnumIter};
use tracing::warn;

use super::diff::ConfigDiff;

/// One ordered step of an apply, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Phase {
    VlanMode,
    PortAttributes,
    AddToVlans,
    Pvids,
    FinalMembership,
}

/// The writes one diff turns into, grouped by phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    pub vlan_enabled: Option<bool>,
    pub ports: Vec<PortStatus>,
    pub add_vlans: Vec<VlanEntry>,
    pub pvids: Vec<PortPvid>,
    pub vlans: Vec<VlanEntry>,
}

impl Plan {
    pub fn from_diff(diff: &ConfigDiff) -> Self {
        let ports = diff
            .ports
            .values()
            .filter_map(|port| {
                let enabled = port.enabled.add?;
                let Some(current) = port.current else {
                    warn!(port = port.port, "cannot change a port the switch did not report");
                    return None;
                };
                Some(current.with_enabled(enabled))
            })
            .collect();

        let pvids = diff
            .ports
            .values()
            .filter_map(|port| {
                port.pvid.add.map(|pvid| PortPvid {
                    port: port.port,
                    pvid,
                })
            })
            .collect();

        let add_vlans = diff
            .vlans
            .values()
            .filter(|vlan| vlan.has_additions())
            .map(super::diff::VlanDiff::superset_entry)
            .collect();

        let vlans = diff
            .vlans
            .values()
            .filter(|vlan| vlan.is_changed())
            .map(super::diff::VlanDiff::target_entry)
            .collect();

        Self {
            vlan_enabled: diff.vlan_enabled.add,
            ports,
            add_vlans,
            pvids,
            vlans,
        }
    }

    /// Number of items a phase would write.
    pub fn len(&self, phase: Phase) -> usize {
        match phase {
            Phase::VlanMode => usize::from(self.vlan_enabled.is_some()),
            Phase::PortAttributes => self.ports.len(),
            Phase::AddToVlans => self.add_vlans.len(),
            Phase::Pvids => self.pvids.len(),
            Phase::FinalMembership => self.vlans.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vlan_enabled.is_none()
            && self.ports.is_empty()
            && self.add_vlans.is_empty()
            && self.pvids.is_empty()
            && self.vlans.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeSet;

    use easysmart_api::PortStatus;
    use pretty_assertions::assert_eq;
    use strum::IntoEnumIterator;

    use super::*;
    use crate::model::{Declaration, PortDecl, SwitchState, Vlan, VlanDecl};
    use crate::reconcile::plan as plan_diff;

    fn status(port: u8, enabled: bool) -> PortStatus {
        PortStatus {
            port,
            status: u8::from(enabled),
            lag: 0,
            speed: 5,
            actual_speed: 5,
            flow_control: 1,
            actual_flow_control: 1,
        }
    }

    fn actual() -> SwitchState {
        let mut default = Vlan::new(1, "Default");
        default.untagged_ports.extend([1, 2, 3]);
        SwitchState::from_parts(
            true,
            vec![status(1, true), status(2, true), status(3, true)],
            &[
                PortPvid { port: 1, pvid: 1 },
                PortPvid { port: 2, pvid: 1 },
                PortPvid { port: 3, pvid: 1 },
            ],
            vec![default.to_entry()],
        )
    }

    #[test]
    fn phases_run_in_safe_order() {
        let order: Vec<String> = Phase::iter().map(|p| p.to_string()).collect();
        assert_eq!(
            order,
            ["vlan_mode", "port_attributes", "add_to_vlans", "pvids", "final_membership"]
        );
    }

    #[test]
    fn port_move_grows_before_it_shrinks() {
        let decl = Declaration {
            ports: vec![PortDecl::new(1), PortDecl::new(2), PortDecl::new(3).disabled()],
            vlans: vec![
                VlanDecl::new(1, "Default").untagged([1u8, 3]),
                VlanDecl::new(2, "wan").untagged([2u8]),
            ],
        };
        let plan = Plan::from_diff(&plan_diff(&actual(), &decl).unwrap());

        assert_eq!(plan.vlan_enabled, None);

        // Only `enabled` changes; the other settings are re-submitted as read.
        assert_eq!(plan.ports.len(), 1);
        assert_eq!(plan.ports[0].port, 3);
        assert!(!plan.ports[0].is_enabled());
        assert_eq!(plan.ports[0].speed, 5);
        assert_eq!(plan.ports[0].flow_control, 1);

        // VLAN 1 only shrinks, so only VLAN 2 grows first.
        assert_eq!(plan.add_vlans.len(), 1);
        assert_eq!(plan.add_vlans[0].vlan_id, 2);
        assert_eq!(plan.pvids, vec![PortPvid { port: 2, pvid: 2 }]);

        let final_members: Vec<(u16, BTreeSet<u8>)> = plan
            .vlans
            .iter()
            .map(|v| (v.vlan_id, v.member_ports.clone()))
            .collect();
        assert_eq!(
            final_members,
            vec![(1, BTreeSet::from([1, 3])), (2, BTreeSet::from([2]))]
        );
    }

    #[test]
    fn no_changes_no_batches() {
        let decl = Declaration {
            ports: vec![PortDecl::new(1), PortDecl::new(2), PortDecl::new(3)],
            vlans: vec![VlanDecl::new(1, "Default").untagged([1u8, 2, 3])],
        };
        let plan = Plan::from_diff(&plan_diff(&actual(), &decl).unwrap());
        assert!(plan.is_empty());
        assert!(Phase::iter().all(|phase| plan.len(phase) == 0));
    }
}
