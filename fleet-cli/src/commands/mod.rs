//! Command handlers behind the `fleet-cli` subcommands

pub mod check;
pub mod deploy;
pub mod introspect;

use crate::config::DeploySettings;
use crate::executor::SshExecutor;
use clap::Args;
use std::path::PathBuf;

/// Where the inventory lives and which environment to target
#[derive(Debug, Args, Clone)]
pub struct TargetArgs {
    /// Path to the deployment config
    #[clap(short, long, env = "FLEET_CONFIG", default_value = "fleet.toml")]
    pub config: PathBuf,

    /// Environment from the config to deploy (optional when only one is defined)
    #[clap(short, long, env = "FLEET_ENV")]
    pub environment: Option<String>,
}

/// Build the ssh executor from the run's deploy settings
pub fn ssh_executor(settings: &DeploySettings) -> SshExecutor {
    SshExecutor::new(settings.user.clone(), settings.ssh_options.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ssh_executor_follows_settings() {
        let settings = DeploySettings {
            user: "deployer".to_string(),
            ssh_options: vec!["Port=2222".to_string()],
            ..DeploySettings::default()
        };
        let executor = ssh_executor(&settings);
        assert_eq!(executor.destination("10.0.0.5"), "deployer@10.0.0.5");
        assert_eq!(
            executor.base_args(),
            vec!["-o", "BatchMode=yes", "-o", "Port=2222"]
        );
    }
}
