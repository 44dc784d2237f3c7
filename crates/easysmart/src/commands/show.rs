//! `show`: the switch's current ports and VLANs.

use tabled::Tabled;

use easysmart_core::{LinkSpeed, Port, Reconciler, SwitchState, Vlan};

use crate::cli::GlobalOpts;
use crate::config;
use crate::error::CliError;
use crate::output;

// ── Table rows ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct PortRow {
    #[tabled(rename = "Port")]
    port: u8,
    #[tabled(rename = "Enabled")]
    enabled: bool,
    #[tabled(rename = "PVID")]
    pvid: String,
    #[tabled(rename = "Speed")]
    speed: String,
    #[tabled(rename = "Link")]
    link: String,
}

impl From<&Port> for PortRow {
    fn from(p: &Port) -> Self {
        Self {
            port: p.port,
            enabled: p.enabled,
            pvid: if p.pvid == 0 {
                "-".into()
            } else {
                p.pvid.to_string()
            },
            speed: LinkSpeed::label(p.settings.speed),
            link: LinkSpeed::label(p.settings.actual_speed),
        }
    }
}

#[derive(Tabled)]
struct VlanRow {
    #[tabled(rename = "VLAN")]
    vlan_id: u16,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Untagged")]
    untagged: String,
    #[tabled(rename = "Tagged")]
    tagged: String,
}

fn port_list(ports: &std::collections::BTreeSet<u8>) -> String {
    if ports.is_empty() {
        return "-".into();
    }
    ports
        .iter()
        .map(u8::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

impl From<&Vlan> for VlanRow {
    fn from(v: &Vlan) -> Self {
        Self {
            vlan_id: v.vlan_id,
            name: v.name.clone(),
            untagged: port_list(&v.untagged_ports),
            tagged: port_list(&v.tagged_ports),
        }
    }
}

fn detail(state: &SwitchState) -> String {
    let ports: Vec<PortRow> = state.ports.values().map(PortRow::from).collect();
    let vlans: Vec<VlanRow> = state.vlans.values().map(VlanRow::from).collect();
    format!(
        "802.1Q VLAN: {}\n{}\n{}",
        if state.vlan_enabled { "enabled" } else { "disabled" },
        output::render_table(&ports),
        output::render_table(&vlans)
    )
}

/// One line per port: number, pvid, enabled.
fn plain(state: &SwitchState) -> String {
    state
        .ports
        .values()
        .map(|p| format!("{} {} {}", p.port, p.pvid, p.enabled))
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let resolved = config::resolve(global)?;
    let switch_mac = resolved.require_switch_mac(global)?;
    let credentials = resolved.credentials(global)?;
    let (host, egress) = resolved.host_interface(global)?;
    let mut client = config::connect(&host, egress, switch_mac, resolved.timeout(), credentials)?;
    client
        .login()
        .await
        .map_err(|e| CliError::from_core(e, &resolved.name))?;

    let state = Reconciler::new(client).read_state().await?;
    let out = output::render_single(&global.output(), &state, detail, plain);
    output::print_output(&out, global.quiet);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    #[test]
    fn vlan_rows_list_members() {
        let mut vlan = Vlan::new(10, "iot");
        vlan.untagged_ports = BTreeSet::from([2, 3]);
        let row = VlanRow::from(&vlan);
        assert_eq!(row.untagged, "2,3");
        assert_eq!(row.tagged, "-");
    }
}
