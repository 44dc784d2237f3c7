// ── Field-level diff between observed and desired state ──

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;

use easysmart_api::{PortStatus, VlanEntry};
use serde::Serialize;
use strum::Display as StrumDisplay;

use super::normalize::DesiredState;
use crate::model::SwitchState;

/// Three-way classification of one scalar field.
///
/// `equal` is set when nothing changes. Otherwise `add` holds the desired
/// value and `remove` the observed one (absent when the device did not
/// report the field).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDiff<T> {
    pub equal: Option<T>,
    pub add: Option<T>,
    pub remove: Option<T>,
}

impl<T: PartialEq> FieldDiff<T> {
    pub fn between(desired: T, actual: Option<T>) -> Self {
        if actual.as_ref() == Some(&desired) {
            Self {
                equal: Some(desired),
                add: None,
                remove: None,
            }
        } else {
            Self {
                equal: None,
                add: Some(desired),
                remove: actual,
            }
        }
    }

    /// Only an observed value, nothing desired.
    pub fn removed(actual: T) -> Self {
        Self {
            equal: None,
            add: None,
            remove: Some(actual),
        }
    }

    pub fn is_changed(&self) -> bool {
        self.add.is_some() || self.remove.is_some()
    }

    /// The value the device should hold afterwards.
    pub fn target(&self) -> Option<&T> {
        self.add.as_ref().or(self.equal.as_ref())
    }
}

/// Three-way classification of a port set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MembershipDiff {
    pub equal: BTreeSet<u8>,
    pub add: BTreeSet<u8>,
    pub remove: BTreeSet<u8>,
}

impl MembershipDiff {
    pub fn between(desired: &BTreeSet<u8>, actual: &BTreeSet<u8>) -> Self {
        Self {
            equal: desired.intersection(actual).copied().collect(),
            add: desired.difference(actual).copied().collect(),
            remove: actual.difference(desired).copied().collect(),
        }
    }

    pub fn is_changed(&self) -> bool {
        !self.add.is_empty() || !self.remove.is_empty()
    }

    /// Members once the change is complete.
    pub fn target(&self) -> BTreeSet<u8> {
        self.equal.union(&self.add).copied().collect()
    }

    /// Old and new members together.
    pub fn superset(&self) -> BTreeSet<u8> {
        self.target().union(&self.remove).copied().collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortDiff {
    pub port: u8,
    pub name: Option<String>,
    pub enabled: FieldDiff<bool>,
    pub pvid: FieldDiff<u16>,
    /// Observed raw settings, re-submitted alongside a new `enabled` value.
    #[serde(skip)]
    pub current: Option<PortStatus>,
}

impl PortDiff {
    pub fn is_changed(&self) -> bool {
        self.enabled.is_changed() || self.pvid.is_changed()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, StrumDisplay)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum VlanChange {
    Added,
    Removed,
    Kept,
}

impl VlanChange {
    fn marker(self) -> char {
        match self {
            Self::Added => '+',
            Self::Removed => '-',
            Self::Kept => ' ',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VlanDiff {
    pub vlan_id: u16,
    pub change: VlanChange,
    pub name: FieldDiff<String>,
    pub tagged_ports: MembershipDiff,
    pub untagged_ports: MembershipDiff,
}

impl VlanDiff {
    /// Anything to add: a new name or a new member.
    pub fn has_additions(&self) -> bool {
        self.name.add.is_some() || !self.tagged_ports.add.is_empty() || !self.untagged_ports.add.is_empty()
    }

    pub fn is_changed(&self) -> bool {
        self.name.is_changed() || self.tagged_ports.is_changed() || self.untagged_ports.is_changed()
    }

    fn target_name(&self) -> String {
        self.name.target().cloned().unwrap_or_default()
    }

    /// Wire entry holding every old and new member, so no port drops out.
    pub fn superset_entry(&self) -> VlanEntry {
        let tagged_ports = self.tagged_ports.superset();
        let member_ports = tagged_ports.union(&self.untagged_ports.superset()).copied().collect();
        VlanEntry {
            vlan_id: self.vlan_id,
            member_ports,
            tagged_ports,
            name: self.target_name(),
        }
    }

    /// Wire entry holding exactly the desired members. Empty for a
    /// removed VLAN.
    pub fn target_entry(&self) -> VlanEntry {
        let tagged_ports = self.tagged_ports.target();
        let member_ports = tagged_ports.union(&self.untagged_ports.target()).copied().collect();
        VlanEntry {
            vlan_id: self.vlan_id,
            member_ports,
            tagged_ports,
            name: self.target_name(),
        }
    }
}

/// Everything that differs between a switch and its declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigDiff {
    pub vlan_enabled: FieldDiff<bool>,
    pub ports: BTreeMap<u8, PortDiff>,
    pub vlans: BTreeMap<u16, VlanDiff>,
    /// Operator-facing port names used when rendering.
    #[serde(skip)]
    labels: BTreeMap<u8, String>,
}

impl ConfigDiff {
    pub fn compute(actual: &SwitchState, desired: &DesiredState) -> Self {
        let vlan_enabled = FieldDiff::between(desired.vlan_enabled, Some(actual.vlan_enabled));

        let ports = desired
            .ports
            .values()
            .map(|want| {
                let have = actual.ports.get(&want.port);
                let diff = PortDiff {
                    port: want.port,
                    name: want.name.clone(),
                    enabled: FieldDiff::between(want.enabled, have.map(|p| p.enabled)),
                    // PVID 0 means the switch did not report one.
                    pvid: FieldDiff::between(want.pvid, have.map(|p| p.pvid).filter(|pvid| *pvid != 0)),
                    current: have.map(|p| p.settings),
                };
                (want.port, diff)
            })
            .collect();

        let empty = BTreeSet::new();
        let mut vlans: BTreeMap<u16, VlanDiff> = desired
            .vlans
            .values()
            .map(|want| {
                let have = actual.vlans.get(&want.vlan_id);
                let diff = VlanDiff {
                    vlan_id: want.vlan_id,
                    change: if have.is_some() {
                        VlanChange::Kept
                    } else {
                        VlanChange::Added
                    },
                    name: FieldDiff::between(want.name.clone(), have.map(|v| v.name.clone())),
                    tagged_ports: MembershipDiff::between(
                        &want.tagged_ports,
                        have.map_or(&empty, |v| &v.tagged_ports),
                    ),
                    untagged_ports: MembershipDiff::between(
                        &want.untagged_ports,
                        have.map_or(&empty, |v| &v.untagged_ports),
                    ),
                };
                (want.vlan_id, diff)
            })
            .collect();

        for have in actual.vlans.values() {
            vlans.entry(have.vlan_id).or_insert_with(|| VlanDiff {
                vlan_id: have.vlan_id,
                change: VlanChange::Removed,
                name: FieldDiff::removed(have.name.clone()),
                tagged_ports: MembershipDiff::between(&empty, &have.tagged_ports),
                untagged_ports: MembershipDiff::between(&empty, &have.untagged_ports),
            });
        }

        let labels = actual
            .ports
            .keys()
            .chain(desired.ports.keys())
            .map(|port| (*port, desired.port_label(*port)))
            .collect();

        Self {
            vlan_enabled,
            ports,
            vlans,
            labels,
        }
    }

    /// True when applying would issue no writes.
    pub fn is_empty(&self) -> bool {
        !self.vlan_enabled.is_changed()
            && !self.ports.values().any(PortDiff::is_changed)
            && !self.vlans.values().any(VlanDiff::is_changed)
    }

    fn label(&self, port: u8) -> String {
        self.labels
            .get(&port)
            .cloned()
            .unwrap_or_else(|| port.to_string())
    }

    /// YAML-shaped unified diff of the declaration, empty when nothing
    /// changes.
    pub fn render(&self) -> String {
        let mut lines = Vec::new();
        push_field(&mut lines, "", "vlan_enabled", &self.vlan_enabled);

        let mut port_lines = Vec::new();
        for diff in self.ports.values() {
            let mut body = Vec::new();
            push_field(&mut body, "    ", "enabled", &diff.enabled);
            push_field(&mut body, "    ", "pvid", &diff.pvid);
            if body.is_empty() {
                continue;
            }
            port_lines.push(format!("   - port: {}", diff.port));
            if let Some(name) = &diff.name {
                port_lines.push(format!("     name: {name}"));
            }
            port_lines.append(&mut body);
        }
        if !port_lines.is_empty() {
            lines.push(" ports:".to_owned());
            lines.append(&mut port_lines);
        }

        let mut vlan_lines = Vec::new();
        for diff in self.vlans.values() {
            let marker = diff.change.marker();
            let mut body = Vec::new();
            push_field(&mut body, "    ", "name", &diff.name);
            self.push_members(&mut body, marker, "tagged_ports", &diff.tagged_ports);
            self.push_members(&mut body, marker, "untagged_ports", &diff.untagged_ports);
            if body.is_empty() {
                continue;
            }
            vlan_lines.push(format!("{marker}  - vlan_id: {}", diff.vlan_id));
            if let Some(name) = &diff.name.equal {
                vlan_lines.push(format!("{marker}    name: {name}"));
            }
            vlan_lines.append(&mut body);
        }
        if !vlan_lines.is_empty() {
            lines.push(" vlans:".to_owned());
            lines.append(&mut vlan_lines);
        }

        if lines.is_empty() {
            return String::new();
        }
        let mut out = vec![
            "--- before: config.yml".to_owned(),
            "+++ after: config.yml".to_owned(),
            "@@ -0,0 +0,0 @@".to_owned(),
        ];
        out.append(&mut lines);
        out.join("\n")
    }

    fn push_members(&self, lines: &mut Vec<String>, marker: char, key: &str, diff: &MembershipDiff) {
        if !diff.is_changed() {
            return;
        }
        lines.push(format!("{marker}    {key}:"));
        lines.extend(diff.remove.iter().map(|p| format!("-      - {}", self.label(*p))));
        lines.extend(diff.add.iter().map(|p| format!("+      - {}", self.label(*p))));
    }
}

fn push_field<T: Display>(lines: &mut Vec<String>, indent: &str, key: &str, diff: &FieldDiff<T>) {
    if let Some(old) = &diff.remove {
        lines.push(format!("-{indent}{key}: {old}"));
    }
    if let Some(new) = &diff.add {
        lines.push(format!("+{indent}{key}: {new}"));
    }
}
