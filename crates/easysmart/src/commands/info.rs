//! `info`: switch identity and addressing. Needs no login.

use std::net::Ipv4Addr;

use tracing::warn;

use easysmart_api::MacAddr;
use easysmart_core::{Credentials, DeviceInfo};

use crate::cli::GlobalOpts;
use crate::config;
use crate::error::CliError;
use crate::output;

fn or_dash(ip: Option<Ipv4Addr>) -> String {
    ip.map_or_else(|| "-".into(), |ip| ip.to_string())
}

fn detail(info: &DeviceInfo) -> String {
    [
        format!("Type:      {}", info.device_type),
        format!("Hostname:  {}", info.hostname),
        format!("MAC:       {}", info.mac),
        format!("Firmware:  {}", info.firmware),
        format!("Hardware:  {}", info.hardware),
        format!("DHCP:      {}", info.dhcp),
        format!("IP:        {}", or_dash(info.ip_addr)),
        format!("Netmask:   {}", or_dash(info.ip_mask)),
        format!("Gateway:   {}", or_dash(info.gateway)),
        format!(
            "Ports:     {}",
            info.num_ports.map_or_else(|| "-".into(), |n| n.to_string())
        ),
    ]
    .join("\n")
}

pub async fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let resolved = config::resolve(global)?;
    let switch_mac = resolved.switch_mac(global).unwrap_or_else(|| {
        warn!("no switch MAC given; addressing any switch on the segment");
        MacAddr::ZERO
    });
    let (host, egress) = resolved.host_interface(global)?;
    // Reads are unauthenticated; the identity is never sent.
    let mut client = config::connect(
        &host,
        egress,
        switch_mac,
        resolved.timeout(),
        Credentials::factory_default(),
    )?;

    let info = client.info().await?;
    let out = output::render_single(&global.output(), &info, detail, |i| i.mac.to_string());
    output::print_output(&out, global.quiet);
    Ok(())
}
