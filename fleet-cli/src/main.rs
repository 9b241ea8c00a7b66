use anyhow::Result;
use clap::{Parser, Subcommand};
use fleet_cli::commands::TargetArgs;
use fleet_cli::commands::check::handle_check_command;
use fleet_cli::commands::deploy::{DeployArgs, handle_deploy_command};
use fleet_cli::commands::introspect::{IntrospectArgs, handle_introspect_command};

#[derive(Debug, Parser)]
#[clap(
    name = "fleet-cli",
    version = fleet_c0re_lib::VERSION,
    about = "Deploy a peer-to-peer node fleet: bootstrap first, then everyone else"
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Deploy bootstrap hosts, then the fleet, and print the node directory
    Deploy(DeployArgs),
    /// Check ssh connectivity to every host of an environment
    Check(TargetArgs),
    /// Show ports and peer id of one running container
    Introspect(IntrospectArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Deploy(args) => handle_deploy_command(args).await,
        Commands::Check(target) => handle_check_command(target).await,
        Commands::Introspect(args) => handle_introspect_command(args).await,
    }
}
