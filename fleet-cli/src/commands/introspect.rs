//! `fleet-cli introspect` - read ports and peer id of one running container

use super::ssh_executor;
use crate::config::{DeploySettings, FleetConfig};
use crate::introspector::ContainerIntrospector;
use anyhow::Result;
use clap::Args;
use fleet_c0re_lib::multiaddr::resolve_node;
use std::path::PathBuf;

#[derive(Debug, Args, Clone)]
pub struct IntrospectArgs {
    /// Host running the container
    #[clap(long)]
    pub host: String,

    /// Container id or name
    #[clap(long)]
    pub container: String,

    /// Path to the deployment config (for ssh user and options)
    #[clap(short, long, env = "FLEET_CONFIG", default_value = "fleet.toml")]
    pub config: PathBuf,
}

/// Handle the introspect command
pub async fn handle_introspect_command(args: IntrospectArgs) -> Result<()> {
    let config = FleetConfig::load(&args.config)?;
    let executor = ssh_executor(&DeploySettings::from(&config.deploy));

    let info = ContainerIntrospector::new(&executor)
        .introspect(&args.host, &args.container)
        .await?;
    let container = info.container_id.clone();
    let node = resolve_node(&args.host, &info.into_node());

    println!("{container} {node}");
    Ok(())
}
