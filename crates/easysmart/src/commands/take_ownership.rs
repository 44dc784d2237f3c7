//! `take-ownership`: credentials and a static address for a reset switch.
//!
//! The session leaves through the configured egress (flags, then profile)
//! and otherwise from the host interface on the factory network
//! (192.168.0.0/24). The switch's new gateway is this host's address on
//! the target subnet.

use std::net::Ipv4Addr;

use serde::Serialize;
use tracing::{info, warn};

use easysmart_api::{Egress, MacAddr};
use easysmart_core::{Bootstrap, BootstrapState, Credentials, OwnershipTarget};

use crate::cli::{GlobalOpts, OutputFormat, TakeOwnershipArgs};
use crate::commands::changed_line;
use crate::config;
use crate::error::CliError;
use crate::netif::{self, FACTORY_MASK, FACTORY_NETWORK, HostInterface};
use crate::output;

const DEFAULT_MASK: Ipv4Addr = Ipv4Addr::new(255, 255, 255, 0);

/// Where the ownership session leaves from.
#[derive(Debug, Clone, PartialEq, Eq)]
enum HostChoice {
    /// An egress from `--interface`, `--source-address` or the profile.
    Configured(Egress),
    /// Whichever interface has an address on the factory network.
    FactoryNetwork,
}

fn host_choice(configured: Option<Egress>) -> HostChoice {
    configured.map_or(HostChoice::FactoryNetwork, HostChoice::Configured)
}

fn ownership_host(choice: HostChoice) -> Result<(HostInterface, Egress), CliError> {
    match choice {
        HostChoice::Configured(egress) => Ok((netif::resolve(&egress)?, egress)),
        HostChoice::FactoryNetwork => {
            let host = netif::find_subnet(FACTORY_NETWORK, FACTORY_MASK)?;
            let egress = host.egress();
            Ok((host, egress))
        }
    }
}

#[derive(Debug, Serialize)]
struct Report {
    changed: bool,
    check: bool,
    state: BootstrapState,
    #[serde(flatten)]
    target: OwnershipTarget,
}

pub async fn handle(args: TakeOwnershipArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let resolved = config::resolve(global)?;
    let switch_ip = args
        .switch_ip
        .or(resolved.profile.switch_ip)
        .ok_or_else(|| CliError::Validation {
            field: "switch_ip".into(),
            reason: format!(
                "no switch address given; pass --switch-ip or set switch_ip in profile '{}'",
                resolved.name
            ),
        })?;
    let ip_mask = args
        .ip_mask
        .or(resolved.profile.ip_mask)
        .unwrap_or(DEFAULT_MASK);
    let credentials = resolved.credentials(global)?;

    let gateway = netif::find_subnet(switch_ip, ip_mask)?.ip;
    let target = OwnershipTarget {
        switch_ip,
        ip_mask,
        gateway,
    };

    let (host, egress) = ownership_host(host_choice(resolved.egress(global)?))?;
    let switch_mac = resolved.switch_mac(global).unwrap_or_else(|| {
        warn!("no switch MAC given; addressing any switch on the segment");
        MacAddr::ZERO
    });
    info!(%egress, interface = %host.name, %switch_ip, %gateway, "resolved ownership target");

    // Each ownership step carries its own identity.
    let client = config::connect(
        &host,
        egress,
        switch_mac,
        resolved.timeout(),
        Credentials::factory_default(),
    )?;
    let mut bootstrap = Bootstrap::new(client, credentials, target);
    let changed = bootstrap.take_ownership(args.check).await?;

    let report = Report {
        changed,
        check: args.check,
        state: bootstrap.state(),
        target,
    };
    let out = match global.output() {
        OutputFormat::Table => changed_line(changed),
        OutputFormat::Plain => changed.to_string(),
        OutputFormat::Json | OutputFormat::Yaml => {
            output::render_single(&global.output(), &report, |_| String::new(), |_| String::new())
        }
    };
    output::print_output(&out, global.quiet);
    Ok(())
}
