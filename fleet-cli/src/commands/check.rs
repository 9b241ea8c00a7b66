//! `fleet-cli check` - connection test against every host

use super::{TargetArgs, ssh_executor};
use crate::config::{DeploySettings, FleetConfig, validate_inventory};
use crate::executor::{ExecutionMode, RemoteExecutor, execute};
use anyhow::Result;

/// Handle the check command: `uname -a` on every host in parallel
pub async fn handle_check_command(target: TargetArgs) -> Result<()> {
    let config = FleetConfig::load(&target.config)?;
    let (name, env) = config.environment(target.environment.as_deref())?;
    validate_inventory(env)?;

    let hosts: Vec<String> = env.bootstrap.iter().chain(env.nodes.iter()).cloned().collect();
    println!("Checking {} hosts of {}", hosts.len(), name);

    let executor = ssh_executor(&DeploySettings::from(&config.deploy));
    let executor = &executor;
    let outcomes = execute(&hosts, ExecutionMode::Parallel, |_, host| async move {
        executor.run(&host, "uname -a", &[]).await
    })
    .await;

    let mut failed = 0;
    for outcome in &outcomes {
        match &outcome.result {
            Ok(output) => println!("  ok   {} {}", outcome.host, output.trim()),
            Err(e) => {
                failed += 1;
                println!("  fail {} {:#}", outcome.host, e);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} hosts unreachable", failed, outcomes.len());
    }

    Ok(())
}
