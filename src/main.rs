use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::GlobalArgs;

mod commands;
mod output;

use commands::{agents, config, deploy, hosts};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "agent-rollout")]
#[command(version = VERSION)]
#[command(about = "Deploy security agents to many hosts with bounded parallelism")]
struct Cli {
    /// Config file (defaults to ~/.config/agent-rollout/config.json)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print a JSON envelope instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Raise log verbosity (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy the agent to every host in a host list
    Deploy(deploy::DeployArgs),
    /// Parse a host list and show the tasks without deploying
    Hosts(hosts::HostsArgs),
    /// List agents registered with the manager
    Agents(agents::AgentsArgs),
    /// Show the resolved configuration
    Config(config::ConfigArgs),
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let global = GlobalArgs { config: cli.config };
    let exit_code = commands::run(cli.command, &global, cli.json);

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}
