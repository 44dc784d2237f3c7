//! Config subcommand handlers.

use std::net::Ipv4Addr;

use dialoguer::{Input, Select};
use secrecy::SecretString;
use serde::Serialize;
use tabled::Tabled;

use easysmart_api::MacAddr;
use easysmart_config::{Config, Profile};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn optional(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

fn parse_ip(field: &str, raw: &str) -> Result<Ipv4Addr, CliError> {
    raw.parse().map_err(|_| CliError::Validation {
        field: field.into(),
        reason: format!("'{raw}' is not an IPv4 address"),
    })
}

#[derive(Debug, Serialize)]
struct ProfileSummary {
    name: String,
    default: bool,
    switch_mac: Option<MacAddr>,
    egress: String,
}

#[derive(Tabled)]
struct ProfileRow {
    #[tabled(rename = "Profile")]
    name: String,
    #[tabled(rename = "Default")]
    default: String,
    #[tabled(rename = "Switch MAC")]
    switch_mac: String,
    #[tabled(rename = "Egress")]
    egress: String,
}

impl From<&ProfileSummary> for ProfileRow {
    fn from(p: &ProfileSummary) -> Self {
        Self {
            name: p.name.clone(),
            default: if p.default { "*".into() } else { String::new() },
            switch_mac: p.switch_mac.map_or_else(|| "-".into(), |m| m.to_string()),
            egress: p.egress.clone(),
        }
    }
}

fn summaries(cfg: &Config) -> Vec<ProfileSummary> {
    let mut list: Vec<ProfileSummary> = cfg
        .profiles
        .iter()
        .map(|(name, profile)| ProfileSummary {
            name: name.clone(),
            default: cfg.default_profile.as_deref() == Some(name.as_str()),
            switch_mac: profile.switch_mac,
            egress: match profile.egress() {
                Ok(Some(egress)) => egress.to_string(),
                Ok(None) => "-".into(),
                Err(e) => e.to_string(),
            },
        })
        .collect();
    list.sort_by(|a, b| a.name.cmp(&b.name));
    list
}

/// Hide plaintext passwords before printing.
fn redact(cfg: &mut Config) {
    for profile in cfg.profiles.values_mut() {
        if profile.password.is_some() {
            profile.password = Some("********".into());
        }
    }
}

// ── Init wizard ─────────────────────────────────────────────────────

fn init() -> Result<(), CliError> {
    let config_path = easysmart_config::config_path();
    eprintln!("easysmart configuration wizard");
    eprintln!("   Config path: {}\n", config_path.display());

    let mut cfg = easysmart_config::load_config()?;

    // 1. Profile name
    let profile_name: String = Input::new()
        .with_prompt("Profile name")
        .default("default".into())
        .interact_text()
        .map_err(prompt_err)?;

    // 2. Switch MAC
    let switch_mac: String = Input::new()
        .with_prompt("Switch MAC address (blank for any switch)")
        .allow_empty(true)
        .interact_text()
        .map_err(prompt_err)?;
    let switch_mac = optional(&switch_mac)
        .map(|raw| raw.parse::<MacAddr>())
        .transpose()
        .map_err(|e| CliError::Validation {
            field: "switch_mac".into(),
            reason: e.to_string(),
        })?;

    // 3. Egress
    let egress_choices = &["Host interface name", "Host source address"];
    let egress_selection = Select::new()
        .with_prompt("How should requests leave this host?")
        .items(egress_choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;
    let (interface, source_address) = if egress_selection == 0 {
        let name: String = Input::new()
            .with_prompt("Interface")
            .default("eth0".into())
            .interact_text()
            .map_err(prompt_err)?;
        (Some(name), None)
    } else {
        let raw: String = Input::new()
            .with_prompt("Source address")
            .interact_text()
            .map_err(prompt_err)?;
        (None, Some(parse_ip("source_address", &raw)?))
    };

    // 4. Management address for take-ownership
    let switch_ip: String = Input::new()
        .with_prompt("Switch management address (blank to skip)")
        .allow_empty(true)
        .interact_text()
        .map_err(prompt_err)?;
    let switch_ip = optional(&switch_ip)
        .map(|raw| parse_ip("switch_ip", &raw))
        .transpose()?;

    // 5. Credentials
    let username: String = Input::new()
        .with_prompt("Username")
        .default("admin".into())
        .interact_text()
        .map_err(prompt_err)?;
    let password = rpassword::prompt_password("Password: ").map_err(prompt_err)?;
    if username.is_empty() || password.is_empty() {
        return Err(CliError::Validation {
            field: "credentials".into(),
            reason: "username and password cannot be empty".into(),
        });
    }

    let store_choices = &[
        "Store password in system keyring (recommended)",
        "Save to config file (plaintext)",
    ];
    let store_selection = Select::new()
        .with_prompt("Where to store the password?")
        .items(store_choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;
    let password = if store_selection == 0 {
        easysmart_config::store_password(&profile_name, &SecretString::from(password))?;
        eprintln!("   Password stored in system keyring");
        None
    } else {
        Some(password)
    };

    // 6. Build profile and write config
    let profile = Profile {
        switch_mac,
        interface,
        source_address,
        switch_ip,
        username: Some(username),
        password,
        ..Profile::default()
    };
    cfg.profiles.insert(profile_name.clone(), profile);
    cfg.default_profile = Some(profile_name.clone());

    let path = easysmart_config::save_config(&cfg)?;
    eprintln!("\nConfiguration written to {}", path.display());
    eprintln!("  Active profile: {profile_name}");
    eprintln!("\n  Test it: easysmart info");
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init(),

        ConfigCommand::Show => {
            let mut cfg = easysmart_config::load_config()?;
            redact(&mut cfg);
            let out = output::render_single(
                &global.output(),
                &cfg,
                |c| output::render_yaml(c),
                |c| config::active_profile_name(global, c),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(
                &easysmart_config::config_path().display().to_string(),
                global.quiet,
            );
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = easysmart_config::load_config()?;
            let list = summaries(&cfg);
            let out = output::render_list(&global.output(), &list, |p| ProfileRow::from(p), |p| {
                p.name.clone()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Use { name } => {
            let mut cfg = easysmart_config::load_config()?;
            if !cfg.profiles.contains_key(&name) {
                let mut available: Vec<&str> = cfg.profiles.keys().map(String::as_str).collect();
                available.sort_unstable();
                return Err(CliError::ProfileNotFound {
                    name,
                    available: available.join(", "),
                });
            }
            cfg.default_profile = Some(name.clone());
            easysmart_config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("Default profile set to '{name}'");
            }
            Ok(())
        }

        ConfigCommand::SetPassword { profile } => {
            let cfg = easysmart_config::load_config()?;
            let name = profile.unwrap_or_else(|| config::active_profile_name(global, &cfg));
            let password = rpassword::prompt_password(format!("Password for '{name}': "))
                .map_err(prompt_err)?;
            if password.is_empty() {
                return Err(CliError::Validation {
                    field: "password".into(),
                    reason: "password cannot be empty".into(),
                });
            }
            easysmart_config::store_password(&name, &SecretString::from(password))?;
            if !global.quiet {
                eprintln!("Password for '{name}' stored in system keyring");
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summaries_mark_the_default() {
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "default".into(),
            Profile {
                interface: Some("eth1".into()),
                ..Profile::default()
            },
        );
        cfg.profiles.insert("spare".into(), Profile::default());

        let list = summaries(&cfg);
        assert_eq!(list.len(), 2);
        assert!(list[0].default);
        assert_eq!(list[0].egress, "interface eth1");
        assert!(!list[1].default);
        assert_eq!(list[1].egress, "-");
    }

    #[test]
    fn redaction_hides_plaintext_only() {
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "lab".into(),
            Profile {
                password: Some("hunter2".into()),
                password_env: Some("LAB_PASSWORD".into()),
                ..Profile::default()
            },
        );
        redact(&mut cfg);
        let lab = &cfg.profiles["lab"];
        assert_eq!(lab.password.as_deref(), Some("********"));
        assert_eq!(lab.password_env.as_deref(), Some("LAB_PASSWORD"));
    }
}
