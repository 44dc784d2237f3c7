//! Clap derive structures for the `easysmart` CLI.

use std::net::Ipv4Addr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::warn;

use easysmart_api::MacAddr;
use easysmart_config::Defaults;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// easysmart -- declarative configuration for TP-Link Easy Smart switches
#[derive(Debug, Parser)]
#[command(
    name = "easysmart",
    version,
    about = "Manage TP-Link Easy Smart switch ports and VLANs from the command line",
    long_about = "Converges a TP-Link Easy Smart switch to a declared port and VLAN layout \
        over the vendor's UDP broadcast protocol, and takes ownership of factory-reset switches.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Switch profile to use
    #[arg(long, short = 'p', env = "EASYSMART_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Host interface to broadcast from (overrides profile)
    #[arg(
        long,
        short = 'i',
        env = "EASYSMART_INTERFACE",
        global = true,
        conflicts_with = "source_address"
    )]
    pub interface: Option<String>,

    /// Host IPv4 address to broadcast from (overrides profile)
    #[arg(long, env = "EASYSMART_SOURCE_ADDRESS", global = true)]
    pub source_address: Option<Ipv4Addr>,

    /// Switch MAC address (overrides profile)
    #[arg(long, short = 'm', env = "EASYSMART_SWITCH_MAC", global = true)]
    pub switch_mac: Option<MacAddr>,

    /// Switch login (overrides profile)
    #[arg(long, short = 'u', global = true)]
    pub username: Option<String>,

    /// Output format [default: `output` under [defaults] in the config, else table]
    #[arg(long, short = 'o', env = "EASYSMART_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Receive timeout in seconds (overrides profile)
    #[arg(long, env = "EASYSMART_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

impl GlobalOpts {
    /// The output format to render with.
    pub fn output(&self) -> OutputFormat {
        self.output.clone().unwrap_or(OutputFormat::Table)
    }

    /// Take the config's `[defaults] output` unless `--output` was given.
    pub fn apply_output_default(&mut self, defaults: &Defaults) {
        if self.output.is_some() {
            return;
        }
        match <OutputFormat as ValueEnum>::from_str(&defaults.output, true) {
            Ok(format) => self.output = Some(format),
            Err(_) => warn!(output = %defaults.output, "unknown default output format; using table"),
        }
    }
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Converge the switch to a declaration file
    Apply(ApplyArgs),

    /// Show the switch's current ports and VLANs
    Show,

    /// Show switch identity and addressing (no login needed)
    Info,

    /// Set credentials and a static address on a factory-reset switch
    TakeOwnership(TakeOwnershipArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct ApplyArgs {
    /// YAML declaration with `ports` and `vlans`
    pub file: PathBuf,

    /// Plan only; write nothing
    #[arg(long)]
    pub check: bool,

    /// Print the textual diff
    #[arg(long)]
    pub diff: bool,
}

#[derive(Debug, Args)]
pub struct TakeOwnershipArgs {
    /// Static address to give the switch (overrides profile)
    #[arg(long)]
    pub switch_ip: Option<Ipv4Addr>,

    /// Subnet mask for the switch address
    #[arg(long)]
    pub ip_mask: Option<Ipv4Addr>,

    /// Report whether anything would change; write nothing
    #[arg(long)]
    pub check: bool,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current resolved configuration
    Show,

    /// Print the config file location
    Path,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store a profile's switch password in the system keyring
    SetPassword {
        /// Profile name (defaults to the active profile)
        #[arg(long)]
        profile: Option<String>,
    },
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn interface_and_source_address_conflict() {
        let parsed = Cli::try_parse_from([
            "easysmart",
            "--interface",
            "eth0",
            "--source-address",
            "10.0.0.1",
            "show",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn switch_mac_is_parsed() {
        let cli = match Cli::try_parse_from(["easysmart", "-m", "50-d4-f7-3c-a6-a1", "info"]) {
            Ok(cli) => cli,
            Err(e) => panic!("parse failed: {e}"),
        };
        assert_eq!(
            cli.global.switch_mac,
            Some(MacAddr([0x50, 0xd4, 0xf7, 0x3c, 0xa6, 0xa1]))
        );
    }

    fn global(args: &[&str]) -> GlobalOpts {
        let mut argv = vec!["easysmart"];
        argv.extend_from_slice(args);
        argv.push("show");
        match Cli::try_parse_from(argv) {
            Ok(cli) => cli.global,
            Err(e) => panic!("parse failed: {e}"),
        }
    }

    fn defaults(output: &str) -> Defaults {
        Defaults {
            output: output.into(),
            ..Defaults::default()
        }
    }

    #[test]
    fn config_default_output_applies_without_flag() {
        let mut g = global(&[]);
        assert!(matches!(g.output(), OutputFormat::Table));
        g.apply_output_default(&defaults("json"));
        assert!(matches!(g.output(), OutputFormat::Json));
    }

    #[test]
    fn output_flag_beats_config_default() {
        let mut g = global(&["-o", "plain"]);
        g.apply_output_default(&defaults("yaml"));
        assert!(matches!(g.output(), OutputFormat::Plain));
    }

    #[test]
    fn unknown_config_default_falls_back_to_table() {
        let mut g = global(&[]);
        g.apply_output_default(&defaults("xml"));
        assert!(matches!(g.output(), OutputFormat::Table));
    }
}
