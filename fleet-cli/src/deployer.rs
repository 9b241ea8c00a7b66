//! Per-host deployment procedure
//!
//! Ship the compose file, recreate the containers without starting them,
//! inject the shared node config and one keypair per container, start them,
//! wait for readiness and introspect. Every step is a blocking remote call;
//! nothing is retried.

use crate::config::{DeploySettings, PhasePlan};
use crate::executor::RemoteExecutor;
use crate::introspector::ContainerIntrospector;
use anyhow::{Context, Result};
use fleet_c0re_lib::{Multiaddr, RawContainerInfo};
use tracing::{debug, info};

/// Path of the shared node config inside every container
pub const CONTAINER_CONFIG_PATH: &str = "/Config.toml";
/// Path of the node keypair inside every container
pub const CONTAINER_KEY_PATH: &str = "/node.key";

/// Environment of one host deployment, passed explicitly to every command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployEnv {
    pub host: String,
    pub tag: String,
    /// Set for fleet hosts only
    pub bootstrap: Option<Multiaddr>,
}

impl DeployEnv {
    pub fn new(host: &str, tag: &str, bootstrap: Option<&Multiaddr>) -> Self {
        Self {
            host: host.to_string(),
            tag: tag.to_string(),
            bootstrap: bootstrap.cloned(),
        }
    }

    /// `HOST`, `TAG` and, when known, `BOOTSTRAP`
    pub fn vars(&self) -> Vec<(&'static str, String)> {
        let mut vars = vec![("HOST", self.host.clone()), ("TAG", self.tag.clone())];
        if let Some(bootstrap) = &self.bootstrap {
            vars.push(("BOOTSTRAP", bootstrap.to_string()));
        }
        vars
    }
}

pub struct Deployer<'a, E: RemoteExecutor + ?Sized> {
    executor: &'a E,
    settings: &'a DeploySettings,
}

impl<'a, E: RemoteExecutor + ?Sized> Deployer<'a, E> {
    pub fn new(executor: &'a E, settings: &'a DeploySettings) -> Self {
        Self { executor, settings }
    }

    fn config_name(&self) -> Result<String> {
        self.settings
            .config_file
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .with_context(|| {
                format!(
                    "Node config path {} has no file name",
                    self.settings.config_file.display()
                )
            })
    }

    /// `docker-compose -f <file> <subcommand>` in the deployment environment
    async fn compose(
        &self,
        phase: &PhasePlan,
        env: &DeployEnv,
        subcommand: &str,
    ) -> Result<String> {
        let command = format!(
            "{} -f {} {}",
            self.settings.compose_command, phase.compose.file_name, subcommand
        );
        let vars = env.vars();
        self.executor.run(&env.host, &command, &vars).await
    }

    /// Container ids of the service, in the order the runtime lists them
    async fn containers(&self, phase: &PhasePlan, env: &DeployEnv) -> Result<Vec<String>> {
        let output = self.compose(phase, env, "ps -q").await?;
        Ok(output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Copy the shared config and a keypair into every created container.
    /// Staged key files are removed from the host once copied.
    async fn copy_configs_and_keys(
        &self,
        phase: &PhasePlan,
        host_pos: usize,
        env: &DeployEnv,
    ) -> Result<Vec<String>> {
        let host = env.host.as_str();
        let config_name = self.config_name()?;
        self.executor
            .put(host, &self.settings.config_file, &format!("./{config_name}"))
            .await?;

        let containers = self.containers(phase, env).await?;
        if containers.len() != phase.layout.containers_per_host() {
            anyhow::bail!(
                "{} created {} containers for {}, expected {}",
                host,
                containers.len(),
                phase.compose.service,
                phase.layout.containers_per_host()
            );
        }

        for (container_pos, container) in containers.iter().enumerate() {
            self.executor
                .run(
                    host,
                    &format!("docker cp ./{config_name} {container}:{CONTAINER_CONFIG_PATH}"),
                    &[],
                )
                .await?;

            let index = phase
                .layout
                .index(host_pos, container_pos)
                .with_context(|| format!("No keypair slot for container {container} on {host}"))?;
            let keypair = phase.keystore.get(index)?;
            let staging = format!("./{}_{}.key", phase.compose.file_name, index);
            debug!("[{}] container {} gets keypair #{}", host, container, index);

            self.executor
                .write(host, &format!("{keypair}\n"), &staging)
                .await?;
            self.executor
                .run(
                    host,
                    &format!("docker cp {staging} {container}:{CONTAINER_KEY_PATH}"),
                    &[],
                )
                .await?;
            self.executor
                .run(host, &format!("rm -f {staging}"), &[])
                .await?;
        }

        Ok(containers)
    }

    /// Recreate, configure and start the phase's containers on one host.
    /// Returns container ids in listing order.
    pub async fn deploy(
        &self,
        phase: &PhasePlan,
        host_pos: usize,
        env: &DeployEnv,
    ) -> Result<Vec<String>> {
        let host = env.host.as_str();
        info!("[{}] deploying {}", host, phase.compose.service);

        self.executor
            .put(host, &phase.compose.path, &format!("./{}", phase.compose.file_name))
            .await?;

        self.compose(phase, env, "pull").await?;
        self.compose(phase, env, "rm -fs").await?;
        self.compose(phase, env, "up --no-start").await?;

        let containers = self.copy_configs_and_keys(phase, host_pos, env).await?;

        self.compose(phase, env, "restart").await?;
        info!("[{}] started {} containers", host, containers.len());

        Ok(containers)
    }

    /// Full host procedure: deploy, wait for readiness, introspect
    pub async fn deploy_node(
        &self,
        phase: &PhasePlan,
        host_pos: usize,
        env: &DeployEnv,
    ) -> Result<Vec<RawContainerInfo>> {
        let containers = self.deploy(phase, host_pos, env).await?;
        ContainerIntrospector::new(self.executor)
            .await_ready(&env.host, &containers, &self.settings.readiness)
            .await
    }
}
