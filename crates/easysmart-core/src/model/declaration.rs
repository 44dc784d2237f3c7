// ── Desired-state declaration ──
//
// What the operator writes: ports and VLANs, with ports referenced by
// number or by a local alias and VLANs by id or by name.
//
// ```yaml
// ports:
//   - port: 1
//     name: isp
//   - port: 2
//     name: lan
//     pvid: wan
// vlans:
//   - vlan_id: 1
//     name: mgmt
//     untagged_ports: [isp]
//   - vlan_id: 2
//     name: wan
//     untagged_ports: [lan]
// ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// A port reference inside a VLAN: a port number or a declared name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PortRef {
    Number(u8),
    Name(String),
}

impl fmt::Display for PortRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

impl From<u8> for PortRef {
    fn from(n: u8) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for PortRef {
    fn from(name: &str) -> Self {
        Self::Name(name.to_owned())
    }
}

/// A VLAN reference used as a port's PVID: a VLAN id or a declared name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VlanRef {
    Id(u16),
    Name(String),
}

impl fmt::Display for VlanRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

impl From<u16> for VlanRef {
    fn from(id: u16) -> Self {
        Self::Id(id)
    }
}

impl From<&str> for VlanRef {
    fn from(name: &str) -> Self {
        Self::Name(name.to_owned())
    }
}

fn enabled_by_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PortDecl {
    pub port: u8,
    /// Local alias; never stored on the switch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Deduced from VLAN membership when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pvid: Option<VlanRef>,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

impl PortDecl {
    pub fn new(port: u8) -> Self {
        Self {
            port,
            name: None,
            pvid: None,
            enabled: true,
        }
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_pvid(mut self, pvid: impl Into<VlanRef>) -> Self {
        self.pvid = Some(pvid.into());
        self
    }

    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VlanDecl {
    pub vlan_id: u16,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tagged_ports: Vec<PortRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub untagged_ports: Vec<PortRef>,
}

impl VlanDecl {
    pub fn new(vlan_id: u16, name: impl Into<String>) -> Self {
        Self {
            vlan_id,
            name: name.into(),
            tagged_ports: Vec::new(),
            untagged_ports: Vec::new(),
        }
    }

    #[must_use]
    pub fn tagged<I, P>(mut self, ports: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PortRef>,
    {
        self.tagged_ports.extend(ports.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn untagged<I, P>(mut self, ports: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PortRef>,
    {
        self.untagged_ports.extend(ports.into_iter().map(Into::into));
        self
    }
}

/// The full desired port and VLAN layout of one switch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Declaration {
    #[serde(default)]
    pub ports: Vec<PortDecl>,
    #[serde(default)]
    pub vlans: Vec<VlanDecl>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn yaml_declaration_parses() {
        let yaml = r"
ports:
  - port: 1
    name: isp
  - port: 2
    name: lan
    pvid: wan
  - port: 3
    pvid: 2
    enabled: false
vlans:
  - vlan_id: 1
    name: mgmt
    untagged_ports: [isp]
  - vlan_id: 2
    name: wan
    untagged_ports: [lan, 3]
    tagged_ports: [8]
";
        let decl: Declaration = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            decl,
            Declaration {
                ports: vec![
                    PortDecl::new(1).named("isp"),
                    PortDecl::new(2).named("lan").with_pvid("wan"),
                    PortDecl::new(3).with_pvid(2u16).disabled(),
                ],
                vlans: vec![
                    VlanDecl::new(1, "mgmt").untagged(["isp"]),
                    VlanDecl::new(2, "wan")
                        .untagged([PortRef::from("lan"), PortRef::from(3u8)])
                        .tagged([8u8]),
                ],
            }
        );
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let yaml = "ports:\n  - port: 1\n    speed: 100\n";
        assert!(serde_yaml::from_str::<Declaration>(yaml).is_err());
    }
}
