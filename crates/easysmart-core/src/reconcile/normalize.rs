// ── Declaration validation and normalization ──
//
// Turns an operator declaration into a fully resolved desired state:
// every port reference becomes a port number, every port has a concrete
// PVID, and every port the switch reports belongs to at least one VLAN.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use indexmap::IndexMap;
use tracing::debug;

use crate::error::CoreError;
use crate::model::{Declaration, PortRef, SwitchState, Vlan, VlanRef};

/// VLAN every unplaced port falls back to.
pub const DEFAULT_VLAN: u16 = 1;

/// Valid 802.1Q VLAN ids.
pub const VLAN_ID_RANGE: std::ops::RangeInclusive<u16> = 1..=4094;

const DEFAULT_VLAN_NAME: &str = "Default";

/// One port after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredPort {
    pub port: u8,
    pub name: Option<String>,
    pub pvid: u16,
    pub enabled: bool,
}

/// A declaration with every reference resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredState {
    /// 802.1Q mode is always wanted on.
    pub vlan_enabled: bool,
    pub ports: BTreeMap<u8, DesiredPort>,
    /// Declaration order, followed by a synthesized VLAN 1 if it was missing.
    pub vlans: IndexMap<u16, Vlan>,
}

impl DesiredState {
    /// Operator-facing name of a port: its alias, or its number.
    pub fn port_label(&self, port: u8) -> String {
        self.ports
            .get(&port)
            .and_then(|p| p.name.clone())
            .unwrap_or_else(|| port.to_string())
    }
}

// ── Lookups ─────────────────────────────────────────────────────────

/// Ports addressable by alias or by number.
struct PortIndex {
    by_name: HashMap<String, u8>,
    known: BTreeSet<u8>,
}

impl PortIndex {
    fn new(declaration: &Declaration, actual: &SwitchState) -> Self {
        let by_name = declaration
            .ports
            .iter()
            .filter_map(|p| p.name.clone().map(|name| (name, p.port)))
            .collect();
        let known = declaration
            .ports
            .iter()
            .map(|p| p.port)
            .chain(actual.ports.keys().copied())
            .collect();
        Self { by_name, known }
    }

    fn resolve(&self, reference: &PortRef) -> Option<u8> {
        match reference {
            PortRef::Number(n) => self.known.contains(n).then_some(*n),
            PortRef::Name(name) => self.by_name.get(name).copied().or_else(|| {
                name.parse::<u8>()
                    .ok()
                    .filter(|n| self.known.contains(n))
            }),
        }
    }
}

/// VLANs addressable by name or by id.
struct VlanIndex {
    by_name: HashMap<String, u16>,
    ids: BTreeSet<u16>,
}

impl VlanIndex {
    fn new(declaration: &Declaration) -> Self {
        let by_name = declaration
            .vlans
            .iter()
            .filter(|v| !v.name.is_empty())
            .map(|v| (v.name.clone(), v.vlan_id))
            .collect();
        let ids = declaration.vlans.iter().map(|v| v.vlan_id).collect();
        Self { by_name, ids }
    }

    fn resolve(&self, reference: &VlanRef) -> Option<u16> {
        match reference {
            VlanRef::Id(id) => self.ids.contains(id).then_some(*id),
            VlanRef::Name(name) => self.by_name.get(name).copied().or_else(|| {
                name.parse::<u16>()
                    .ok()
                    .filter(|id| self.ids.contains(id))
            }),
        }
    }
}

// ── Validation ──────────────────────────────────────────────────────

/// Reject declarations that cannot be applied safely, before anything is
/// planned or written.
pub fn validate(declaration: &Declaration, actual: &SwitchState) -> Result<(), CoreError> {
    let mut seen_ports = BTreeSet::new();
    let mut seen_names = BTreeSet::new();
    for port in &declaration.ports {
        if !seen_ports.insert(port.port) {
            return Err(CoreError::invalid(format!(
                "port {} is declared more than once",
                port.port
            )));
        }
        if !actual.ports.contains_key(&port.port) {
            return Err(CoreError::invalid(format!(
                "port {} is not reported by the switch (ports: {})",
                port.port,
                join(actual.ports.keys())
            )));
        }
        if let Some(name) = &port.name {
            if !seen_names.insert(name.as_str()) {
                return Err(CoreError::invalid(format!(
                    "port name '{name}' is used more than once"
                )));
            }
        }
    }

    let mut seen_vlans = BTreeSet::new();
    for vlan in &declaration.vlans {
        if !VLAN_ID_RANGE.contains(&vlan.vlan_id) {
            return Err(CoreError::invalid(format!(
                "vlan id {} is outside {}..={}",
                vlan.vlan_id,
                VLAN_ID_RANGE.start(),
                VLAN_ID_RANGE.end()
            )));
        }
        if !seen_vlans.insert(vlan.vlan_id) {
            return Err(CoreError::invalid(format!(
                "vlan {} is declared more than once",
                vlan.vlan_id
            )));
        }
    }
    if !seen_vlans.contains(&DEFAULT_VLAN) {
        return Err(CoreError::invalid(format!(
            "vlan {DEFAULT_VLAN} must be declared; it hosts every port not placed elsewhere"
        )));
    }

    let ports = PortIndex::new(declaration, actual);
    for vlan in &declaration.vlans {
        for reference in vlan.tagged_ports.iter().chain(&vlan.untagged_ports) {
            if ports.resolve(reference).is_none() {
                return Err(CoreError::invalid(format!(
                    "vlan {} references unknown port '{reference}'",
                    vlan.vlan_id
                )));
            }
        }
    }

    let vlans = VlanIndex::new(declaration);
    for port in &declaration.ports {
        let Some(reference) = &port.pvid else {
            continue;
        };
        let Some(vlan_id) = vlans.resolve(reference) else {
            return Err(CoreError::invalid(format!(
                "port {} pvid '{reference}' does not name a declared vlan",
                port.port
            )));
        };
        let untagged_here = declaration
            .vlans
            .iter()
            .filter(|v| v.vlan_id == vlan_id)
            .flat_map(|v| &v.untagged_ports)
            .any(|r| ports.resolve(r) == Some(port.port));
        if !untagged_here {
            return Err(CoreError::invalid(format!(
                "port {} pvid '{reference}' names vlan {vlan_id}, which does not list the port as untagged",
                port.port
            )));
        }
    }
    Ok(())
}

fn resolve_all(ports: &PortIndex, refs: &[PortRef], vlan_id: u16) -> Result<BTreeSet<u8>, CoreError> {
    refs.iter()
        .map(|r| {
            ports.resolve(r).ok_or_else(|| {
                CoreError::invalid(format!("vlan {vlan_id} references unknown port '{r}'"))
            })
        })
        .collect()
}

fn join<'a>(values: impl IntoIterator<Item = &'a u8>) -> String {
    values
        .into_iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

// ── Normalization ───────────────────────────────────────────────────

/// Resolve `declaration` against the ports the switch reports.
///
/// Ports the declaration leaves out, and declared ports that end up in no
/// VLAN, are disabled and parked untagged in VLAN 1 with PVID 1. If VLAN 1
/// itself is not declared it is created to host them.
pub fn normalize(declaration: &Declaration, actual: &SwitchState) -> Result<DesiredState, CoreError> {
    let ports = PortIndex::new(declaration, actual);
    let vlan_index = VlanIndex::new(declaration);

    let mut vlans: IndexMap<u16, Vlan> = IndexMap::new();
    for decl in &declaration.vlans {
        vlans.insert(
            decl.vlan_id,
            Vlan {
                vlan_id: decl.vlan_id,
                name: decl.name.clone(),
                tagged_ports: resolve_all(&ports, &decl.tagged_ports, decl.vlan_id)?,
                untagged_ports: resolve_all(&ports, &decl.untagged_ports, decl.vlan_id)?,
            },
        );
    }

    // First VLAN, in declaration order, that carries the port untagged.
    let mut deduced: BTreeMap<u8, u16> = BTreeMap::new();
    for vlan in vlans.values() {
        for port in &vlan.untagged_ports {
            deduced.entry(*port).or_insert(vlan.vlan_id);
        }
    }

    let mut desired: BTreeMap<u8, DesiredPort> = BTreeMap::new();
    for decl in &declaration.ports {
        let pvid = match &decl.pvid {
            Some(reference) => vlan_index.resolve(reference).ok_or_else(|| {
                CoreError::invalid(format!(
                    "port {} pvid '{reference}' does not name a declared vlan",
                    decl.port
                ))
            })?,
            None => deduced.get(&decl.port).copied().unwrap_or(DEFAULT_VLAN),
        };
        desired.insert(
            decl.port,
            DesiredPort {
                port: decl.port,
                name: decl.name.clone(),
                pvid,
                enabled: decl.enabled,
            },
        );
    }

    let mut parked = Vec::new();

    for port in actual.ports.keys() {
        if desired.contains_key(port) {
            continue;
        }
        debug!(port, "undeclared port will be disabled");
        desired.insert(
            *port,
            DesiredPort {
                port: *port,
                name: None,
                pvid: DEFAULT_VLAN,
                enabled: false,
            },
        );
        parked.push(*port);
    }

    for port in desired.values_mut() {
        if parked.contains(&port.port) || vlans.values().any(|v| v.contains(port.port)) {
            continue;
        }
        debug!(port = port.port, "port in no vlan will be disabled");
        port.enabled = false;
        port.pvid = DEFAULT_VLAN;
        parked.push(port.port);
    }

    if !parked.is_empty() {
        let default = vlans.entry(DEFAULT_VLAN).or_insert_with(|| {
            let name = actual
                .vlans
                .get(&DEFAULT_VLAN)
                .map_or(DEFAULT_VLAN_NAME, |v| v.name.as_str());
            Vlan::new(DEFAULT_VLAN, name)
        });
        default.untagged_ports.extend(parked);
    }

    Ok(DesiredState {
        vlan_enabled: true,
        ports: desired,
        vlans,
    })
}
