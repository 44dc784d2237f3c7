//! Translation from config profile + CLI flags to a session.
//!
//! Flags win over the profile, the profile wins over `[defaults]`. Core
//! never sees these types; it receives a connected `DeviceClient`.

use std::time::Duration;

use tracing::debug;

use easysmart_api::{Egress, MacAddr, Session, SessionConfig};
use easysmart_config::{Config, ConfigError, Profile};
use easysmart_core::{Credentials, DeviceClient};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::netif::{self, HostInterface};

/// A profile as selected by `--profile` or `default_profile`.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub name: String,
    pub profile: Profile,
    timeout: Duration,
}

/// Determine the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, cfg: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| cfg.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Load the config and pick the active profile.
///
/// An explicitly requested profile must exist. Without `--profile`, a
/// missing default profile yields an empty one so flags alone can drive
/// a run.
pub fn resolve(global: &GlobalOpts) -> Result<Resolved, CliError> {
    let cfg = easysmart_config::load_config()?;
    resolve_from(global, &cfg)
}

pub fn resolve_from(global: &GlobalOpts, cfg: &Config) -> Result<Resolved, CliError> {
    let name = active_profile_name(global, cfg);
    let profile = match cfg.profile(Some(name.as_str())) {
        Ok((_, profile)) => profile.clone(),
        Err(ConfigError::UnknownProfile { .. }) if global.profile.is_none() => {
            debug!(profile = %name, "no such profile; using flags only");
            Profile::default()
        }
        Err(ConfigError::UnknownProfile { profile }) => {
            let mut available: Vec<&str> = cfg.profiles.keys().map(String::as_str).collect();
            available.sort_unstable();
            return Err(CliError::ProfileNotFound {
                name: profile,
                available: if available.is_empty() {
                    "(none)".into()
                } else {
                    available.join(", ")
                },
            });
        }
        Err(other) => return Err(other.into()),
    };

    let timeout = global
        .timeout
        .map_or_else(|| profile.timeout(&cfg.defaults), Duration::from_secs);

    Ok(Resolved {
        name,
        profile,
        timeout,
    })
}

impl Resolved {
    /// The egress strategy: flags first, then the profile.
    pub fn egress(&self, global: &GlobalOpts) -> Result<Option<Egress>, CliError> {
        if let Some(name) = &global.interface {
            return Ok(Some(Egress::Interface(name.clone())));
        }
        if let Some(ip) = global.source_address {
            return Ok(Some(Egress::SourceAddress(ip)));
        }
        Ok(self.profile.egress()?)
    }

    pub fn switch_mac(&self, global: &GlobalOpts) -> Option<MacAddr> {
        global.switch_mac.or(self.profile.switch_mac)
    }

    /// The switch MAC, required for anything that reads or writes state.
    pub fn require_switch_mac(&self, global: &GlobalOpts) -> Result<MacAddr, CliError> {
        self.switch_mac(global).ok_or_else(|| CliError::Validation {
            field: "switch_mac".into(),
            reason: format!(
                "no switch MAC given; pass --switch-mac or set switch_mac in profile '{}'",
                self.name
            ),
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The switch login, with `--username` overriding the profile.
    pub fn credentials(&self, global: &GlobalOpts) -> Result<Credentials, CliError> {
        let mut profile = self.profile.clone();
        if let Some(username) = &global.username {
            profile.username = Some(username.clone());
        }
        Ok(easysmart_config::resolve_credentials(&profile, &self.name)?)
    }

    /// Resolve the host interface for the configured egress.
    pub fn host_interface(&self, global: &GlobalOpts) -> Result<(HostInterface, Egress), CliError> {
        let egress = self.egress(global)?.ok_or_else(|| CliError::Validation {
            field: "interface".into(),
            reason: format!(
                "no egress configured; pass --interface or --source-address, or set one in profile '{}'",
                self.name
            ),
        })?;
        let host = netif::resolve(&egress)?;
        Ok((host, egress))
    }
}

/// Open a UDP session from `egress` to `switch_mac`.
pub fn connect(
    host: &HostInterface,
    egress: Egress,
    switch_mac: MacAddr,
    timeout: Duration,
    credentials: Credentials,
) -> Result<DeviceClient, CliError> {
    let config = SessionConfig::new(egress, host.mac, switch_mac).with_timeout(timeout);
    debug!(egress = %config.egress, host_mac = %config.host_mac, %switch_mac, "opening session");
    let session = Session::connect(&config).map_err(easysmart_core::CoreError::from)?;
    Ok(DeviceClient::new(session, credentials))
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cli::Cli;

    fn global(args: &[&str]) -> GlobalOpts {
        let mut argv = vec!["easysmart"];
        argv.extend_from_slice(args);
        argv.push("info");
        match Cli::try_parse_from(argv) {
            Ok(cli) => cli.global,
            Err(e) => panic!("{e}"),
        }
    }

    fn config() -> Config {
        let mut cfg = Config {
            default_profile: Some("lab".into()),
            ..Config::default()
        };
        cfg.profiles.insert(
            "lab".into(),
            Profile {
                interface: Some("eth1".into()),
                switch_mac: Some(MacAddr([0x50, 0xd4, 0xf7, 0x3c, 0xa6, 0xa1])),
                username: Some("admin".into()),
                password: Some("secret".into()),
                timeout: Some(3),
                ..Profile::default()
            },
        );
        cfg
    }

    #[test]
    fn profile_values_apply_without_flags() {
        let g = global(&[]);
        let resolved = match resolve_from(&g, &config()) {
            Ok(resolved) => resolved,
            Err(e) => panic!("{e}"),
        };
        assert_eq!(resolved.name, "lab");
        assert_eq!(resolved.timeout(), Duration::from_secs(3));
        assert!(matches!(
            resolved.egress(&g),
            Ok(Some(Egress::Interface(name))) if name == "eth1"
        ));
        assert!(resolved.require_switch_mac(&g).is_ok());
    }

    #[test]
    fn flags_override_profile() {
        let g = global(&["--source-address", "10.1.0.1", "--timeout", "1", "-m", "00:00:00:00:00:01"]);
        let Ok(resolved) = resolve_from(&g, &config()) else {
            panic!("profile should resolve");
        };
        assert_eq!(resolved.timeout(), Duration::from_secs(1));
        assert!(matches!(
            resolved.egress(&g),
            Ok(Some(Egress::SourceAddress(ip))) if ip.octets() == [10, 1, 0, 1]
        ));
        assert_eq!(resolved.switch_mac(&g), Some(MacAddr([0, 0, 0, 0, 0, 1])));
    }

    #[test]
    fn unknown_explicit_profile_lists_available() {
        let g = global(&["--profile", "nope"]);
        let err = resolve_from(&g, &config()).err();
        assert!(matches!(
            err,
            Some(CliError::ProfileNotFound { ref available, .. }) if available == "lab"
        ));
    }

    #[test]
    fn missing_default_profile_falls_back_to_flags() {
        let g = global(&[]);
        let Ok(resolved) = resolve_from(&g, &Config::default()) else {
            panic!("default profile should fall back");
        };
        assert_eq!(resolved.name, "default");
        assert!(matches!(resolved.egress(&g), Ok(None)));
        assert!(resolved.require_switch_mac(&g).is_err());
    }
}
