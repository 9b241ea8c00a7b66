//! `fleet-cli deploy` - two-phase fleet deployment

use super::{TargetArgs, ssh_executor};
use crate::config::FleetConfig;
use crate::orchestrator::{FleetFailurePolicy, MissingIdentityPolicy, Orchestrator};
use crate::report::{DirectoryReport, render_directory};
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tracing::warn;

#[derive(Debug, Args, Clone)]
pub struct DeployArgs {
    #[clap(flatten)]
    pub target: TargetArgs,

    /// Image tag exported as TAG on every host (overrides the config)
    #[clap(short, long, env = "FLEET_TAG")]
    pub tag: Option<String>,

    /// Keep successful fleet hosts when others fail
    #[clap(long)]
    pub partial: bool,

    /// Abort when a node's peer id is not found in its logs
    #[clap(long)]
    pub strict_identity: bool,

    /// Write the node directory as JSON to this path
    #[clap(short, long)]
    pub output: Option<PathBuf>,

    /// Print the directory as JSON instead of plain lines
    #[clap(long)]
    pub json: bool,
}

/// Handle the deploy command
pub async fn handle_deploy_command(args: DeployArgs) -> Result<()> {
    let config = FleetConfig::load(&args.target.config)?;
    let mut plan = config
        .plan(args.target.environment.as_deref(), args.tag.as_deref())
        .context("Invalid deployment configuration")?;

    if args.partial {
        plan.settings.fleet_failure = FleetFailurePolicy::Partial;
    }
    if args.strict_identity {
        plan.settings.missing_identity = MissingIdentityPolicy::Fail;
    }

    let orchestrator = Orchestrator::new(ssh_executor(&plan.settings), plan);
    let directory = orchestrator.deploy_fleet().await?;

    let plan = orchestrator.plan();
    let report = DirectoryReport::new(&plan.environment, &plan.settings.tag, &directory);

    if args.json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", render_directory(&directory));
    }

    if let Some(output) = &args.output {
        report.write(output)?;
        println!("Report written to: {}", output.display());
    }

    if !directory.failures.is_empty() {
        warn!(
            "{} fleet hosts failed, directory is incomplete",
            directory.failures.len()
        );
    }

    Ok(())
}
