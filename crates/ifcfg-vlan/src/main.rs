//! vlanctl - VLAN settings command line
//!
//! Runs one VLAN settings action and prints its JSON envelope on stdout.
//! Logs go to stderr.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use ifcfg_common::settings::DEFAULT_SETTINGS_PATH;
use ifcfg_common::{FieldValues, IfCfgError, IfCfgSettings, Refusal, ShellBackend, EXIT_REFUSED};
use ifcfg_model::RequestIntent;
use serde::Serialize;
use tracing::{debug, error};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use ifcfg_vlan::{fields, VlanProto, VlanSettings, VlanTag};

/// Exit status of a failed environment (spawn, disk, parse)
const EXIT_FAILURE: u8 = 1;

/// VLAN interface settings
#[derive(Parser, Debug)]
#[command(name = "vlanctl")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Settings file
    #[arg(short = 'c', long, default_value = DEFAULT_SETTINGS_PATH)]
    config: PathBuf,

    /// Log level when RUST_LOG is not set (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List VLANs
    Search {
        /// Case-insensitive filter over the listed columns
        #[arg(short, long)]
        phrase: Option<String>,

        /// 1-based page number
        #[arg(long, default_value = "1")]
        page: usize,

        /// Rows per page (all rows when omitted)
        #[arg(long)]
        rows: Option<usize>,
    },
    /// Show one VLAN, or the defaults of a new one
    Get { uuid: Option<String> },
    /// Create a VLAN
    Add(VlanArgs),
    /// Update a VLAN
    Set {
        uuid: String,
        #[command(flatten)]
        vlan: VlanArgs,
    },
    /// Delete a VLAN
    Del { uuid: String },
    /// Apply staged VLAN changes
    Reconfigure,
    /// Show VLAN devices queued for removal
    Pending {
        /// Empty the queue after printing it
        #[arg(long)]
        drain: bool,
    },
}

#[derive(Args, Debug)]
struct VlanArgs {
    /// Parent interface
    #[arg(long = "if")]
    parent: Option<String>,

    /// VLAN tag (1-4094)
    #[arg(long)]
    tag: Option<VlanTag>,

    /// Priority code point
    #[arg(long)]
    pcp: Option<String>,

    /// Encapsulation (802.1q or 802.1ad)
    #[arg(long)]
    proto: Option<VlanProto>,

    /// Description
    #[arg(long)]
    descr: Option<String>,
}

impl VlanArgs {
    /// Only options given on the command line become fields.
    fn into_fields(self) -> FieldValues {
        [
            (fields::PARENT, self.parent),
            (fields::TAG, self.tag.map(|tag| tag.to_string())),
            (fields::PCP, self.pcp),
            (fields::PROTO, self.proto.map(|proto| proto.as_str().to_string())),
            (fields::DESCR, self.descr),
        ]
        .into_iter()
        .filter_map(|(field, value)| value.map(|v| (field.to_string(), v)))
        .collect()
    }
}

/// Initializes tracing/logging subsystem
fn init_logging(log_level: &str) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Refusal envelope of an error the operator must see, looked up through
/// any context added on the way out of `run`
fn refusal(e: &anyhow::Error) -> Option<Refusal> {
    e.downcast_ref::<IfCfgError>().and_then(IfCfgError::refusal)
}

/// Prints a refusal on stdout, or logs anything else, and returns the exit status
fn report(e: &anyhow::Error) -> u8 {
    let Some(refusal) = refusal(e) else {
        error!("{:#}", e);
        return EXIT_FAILURE;
    };
    debug!("{:#}", e);
    match print_json(&refusal) {
        Ok(()) => EXIT_REFUSED,
        Err(print_err) => {
            error!("{:#}", print_err);
            EXIT_FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = IfCfgSettings::load_or_default(&cli.config)
        .with_context(|| format!("loading settings from {}", cli.config.display()))?;
    debug!(?settings, "Settings loaded");

    let backend = Arc::new(ShellBackend::new(settings.command_timeout()));
    let vlans = VlanSettings::from_settings(&settings, backend)?;

    match cli.command {
        Command::Search { phrase, page, rows } => {
            print_json(&vlans.search_item(page, rows, phrase.as_deref()))
        }
        Command::Get { uuid } => print_json(&vlans.get_item(uuid.as_deref())?),
        Command::Add(vlan) => print_json(&vlans.add_item(&vlan.into_fields())?),
        Command::Set { uuid, vlan } => print_json(&vlans.set_item(&uuid, &vlan.into_fields())?),
        Command::Del { uuid } => print_json(&vlans.del_item(&uuid)?),
        Command::Reconfigure => print_json(&vlans.reconfigure(RequestIntent::Write).await),
        Command::Pending { drain } => {
            let entries = if drain {
                vlans.drain_pending_removals()?
            } else {
                vlans.pending_removals()?
            };
            print_json(&entries)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(&cli.log_level) {
        eprintln!("{:#}", e);
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => ExitCode::from(report(&e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ifcfg_vlan::messages;

    #[test]
    fn test_in_use_is_refusal_through_context() {
        let err = anyhow::Error::from(IfCfgError::in_use(messages::DELETE_ASSIGNED))
            .context("deleting VLAN");
        assert_eq!(
            refusal(&err),
            Some(Refusal {
                result: "failed",
                message: messages::DELETE_ASSIGNED.to_string(),
            })
        );
        assert_eq!(report(&err), EXIT_REFUSED);
    }

    #[test]
    fn test_environment_failures_are_not_refusals() {
        let err = anyhow::Error::from(IfCfgError::document("trailing comma"));
        assert!(refusal(&err).is_none());
        assert!(refusal(&anyhow::anyhow!("Failed to set tracing subscriber")).is_none());
        assert_eq!(report(&err), EXIT_FAILURE);
    }

    #[test]
    fn test_proto_option_is_typed() {
        let cli = Cli::try_parse_from(["vlanctl", "add", "--if", "em0", "--tag", "10", "--proto", "802.1ad"])
            .unwrap();
        let Command::Add(vlan) = cli.command else {
            panic!("expected add");
        };
        assert_eq!(
            vlan.into_fields(),
            vec![
                ("if".to_string(), "em0".to_string()),
                ("tag".to_string(), "10".to_string()),
                ("proto".to_string(), "802.1ad".to_string()),
            ]
        );
        assert!(Cli::try_parse_from(["vlanctl", "add", "--proto", "qinq"]).is_err());
    }
}
