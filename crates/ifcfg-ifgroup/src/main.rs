//! ifgroupctl - interface group settings command line
//!
//! Runs one interface group action and prints its JSON envelope on stdout.
//! Logs go to stderr.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use ifcfg_common::settings::DEFAULT_SETTINGS_PATH;
use ifcfg_common::{FieldValues, IfCfgError, IfCfgSettings, Refusal, ShellBackend, EXIT_REFUSED};
use serde::Serialize;
use tracing::{debug, error};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use ifcfg_ifgroup::{fields, IfGroupSettings};

/// Exit status of a failed environment (spawn, disk, parse)
const EXIT_FAILURE: u8 = 1;

/// Interface group settings
#[derive(Parser, Debug)]
#[command(name = "ifgroupctl")]
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
    /// List interface groups
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
    /// Show one group, or the defaults of a new one
    Get { uuid: Option<String> },
    /// Create a group
    Add(GroupArgs),
    /// Update a group
    Set {
        uuid: String,
        #[command(flatten)]
        group: GroupArgs,
    },
    /// Detach members and delete a group
    Del { uuid: String },
}

#[derive(Args, Debug)]
struct GroupArgs {
    /// Group name
    #[arg(long)]
    ifname: Option<String>,

    /// Assigned interfaces (lan, opt1, ...), repeat or space separate
    #[arg(long, num_args = 1..)]
    members: Vec<String>,

    /// Description
    #[arg(long)]
    descr: Option<String>,
}

impl GroupArgs {
    fn into_fields(self) -> FieldValues {
        let mut values = FieldValues::new();
        if let Some(ifname) = self.ifname {
            values.push((fields::IFNAME.to_string(), ifname));
        }
        if !self.members.is_empty() {
            values.push((fields::MEMBERS.to_string(), self.members.join(" ")));
        }
        if let Some(descr) = self.descr {
            values.push((fields::DESCR.to_string(), descr));
        }
        values
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
    let groups = IfGroupSettings::from_settings(&settings, backend)?;

    match cli.command {
        Command::Search { phrase, page, rows } => {
            print_json(&groups.search_item(page, rows, phrase.as_deref()))
        }
        Command::Get { uuid } => print_json(&groups.get_item(uuid.as_deref())?),
        Command::Add(group) => print_json(&groups.add_item(&group.into_fields())?),
        Command::Set { uuid, group } => {
            print_json(&groups.set_item(&uuid, &group.into_fields())?)
        }
        Command::Del { uuid } => print_json(&groups.del_item(&uuid).await?),
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
