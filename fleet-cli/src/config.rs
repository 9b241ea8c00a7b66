//! Deployment configuration loaded from `fleet.toml`
//!
//! Reads the TOML inventory, resolves relative paths against the config
//! file's directory, and validates everything that can be validated locally
//! before a single remote command runs.

use crate::introspector::Readiness;
use crate::orchestrator::{FleetFailurePolicy, MissingIdentityPolicy};
use anyhow::{Context, Result};
use fleet_c0re_lib::{ComposeFile, KeyLayout, Keystore};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration structure matching fleet.toml
#[derive(Debug, Deserialize)]
pub struct FleetConfig {
    #[serde(default)]
    pub deploy: DeploySection,
    pub bootstrap: PhaseSection,
    pub fleet: PhaseSection,
    #[serde(default)]
    pub environments: BTreeMap<String, Environment>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DeploySection {
    pub user: String,
    pub compose_command: String,
    pub tag: String,
    pub config_file: PathBuf,
    pub fleet_failure: FleetFailurePolicy,
    pub missing_identity: MissingIdentityPolicy,
    pub readiness: ReadinessSection,
    /// Extra `-o` options for ssh/scp, e.g. `StrictHostKeyChecking=no`
    pub ssh_options: Vec<String>,
}

impl Default for DeploySection {
    fn default() -> Self {
        Self {
            user: "root".to_string(),
            compose_command: "docker-compose".to_string(),
            tag: "latest".to_string(),
            config_file: PathBuf::from("Config.toml"),
            fleet_failure: FleetFailurePolicy::default(),
            missing_identity: MissingIdentityPolicy::default(),
            readiness: ReadinessSection::default(),
            ssh_options: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReadinessMode {
    #[default]
    Settle,
    Poll,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ReadinessSection {
    pub mode: ReadinessMode,
    pub settle_ms: u64,
    pub interval_ms: u64,
    pub timeout_secs: u64,
}

impl Default for ReadinessSection {
    fn default() -> Self {
        Self {
            mode: ReadinessMode::Settle,
            settle_ms: 1000,
            interval_ms: 500,
            timeout_secs: 30,
        }
    }
}

impl ReadinessSection {
    pub fn readiness(&self) -> Readiness {
        match self.mode {
            ReadinessMode::Settle => Readiness::Settle {
                delay: Duration::from_millis(self.settle_ms),
            },
            ReadinessMode::Poll => Readiness::Poll {
                interval: Duration::from_millis(self.interval_ms),
                timeout: Duration::from_secs(self.timeout_secs),
            },
        }
    }
}

/// One deployment phase: which compose file, which keys, how many containers
#[derive(Debug, Deserialize, Clone)]
pub struct PhaseSection {
    pub compose: PathBuf,
    pub keystore: PathBuf,
    #[serde(default = "default_containers_per_host")]
    pub containers_per_host: usize,
}

fn default_containers_per_host() -> usize {
    1
}

/// Host inventory of one target environment. Order matters: it fixes the
/// keypair assigned to every container.
#[derive(Debug, Deserialize, Clone)]
pub struct Environment {
    pub bootstrap: Vec<String>,
    #[serde(default)]
    pub nodes: Vec<String>,
}

/// Settings shared by every host deployment of a run
#[derive(Debug, Clone)]
pub struct DeploySettings {
    pub user: String,
    pub compose_command: String,
    pub tag: String,
    pub config_file: PathBuf,
    pub fleet_failure: FleetFailurePolicy,
    pub missing_identity: MissingIdentityPolicy,
    pub readiness: Readiness,
    pub ssh_options: Vec<String>,
}

impl From<&DeploySection> for DeploySettings {
    fn from(section: &DeploySection) -> Self {
        Self {
            user: section.user.clone(),
            compose_command: section.compose_command.clone(),
            tag: section.tag.clone(),
            config_file: section.config_file.clone(),
            fleet_failure: section.fleet_failure,
            missing_identity: section.missing_identity,
            readiness: section.readiness.readiness(),
            ssh_options: section.ssh_options.clone(),
        }
    }
}

impl Default for DeploySettings {
    fn default() -> Self {
        Self::from(&DeploySection::default())
    }
}

/// Everything needed to deploy one phase
#[derive(Debug, Clone)]
pub struct PhasePlan {
    pub hosts: Vec<String>,
    pub compose: ComposeFile,
    pub keystore: Keystore,
    pub layout: KeyLayout,
}

impl PhasePlan {
    pub fn new(
        hosts: Vec<String>,
        compose: ComposeFile,
        keystore: Keystore,
        containers_per_host: usize,
    ) -> Result<Self> {
        let layout = KeyLayout::new(hosts.len(), containers_per_host)
            .with_context(|| format!("Invalid layout for {}", compose.file_name))?;

        if keystore.len() < layout.capacity() {
            anyhow::bail!(
                "Keystore for {} holds {} keypairs but {} hosts x {} containers need {}",
                compose.file_name,
                keystore.len(),
                hosts.len(),
                containers_per_host,
                layout.capacity()
            );
        }

        Ok(Self {
            hosts,
            compose,
            keystore,
            layout,
        })
    }
}

/// A validated, ready-to-run deployment
#[derive(Debug, Clone)]
pub struct DeploymentPlan {
    pub environment: String,
    pub settings: DeploySettings,
    pub bootstrap: PhasePlan,
    pub fleet: PhasePlan,
}

/// Expand `~` and make relative paths relative to the config file
fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
    let expanded = PathBuf::from(expanded);
    if expanded.is_absolute() {
        expanded
    } else {
        base.join(expanded)
    }
}

impl FleetConfig {
    /// Load configuration from a TOML file
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_path =
            PathBuf::from(shellexpand::tilde(&config_path.to_string_lossy()).into_owned());
        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let mut config: FleetConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        let base = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        config.deploy.config_file = resolve_path(&base, &config.deploy.config_file);
        for phase in [&mut config.bootstrap, &mut config.fleet] {
            phase.compose = resolve_path(&base, &phase.compose);
            phase.keystore = resolve_path(&base, &phase.keystore);
        }

        Ok(config)
    }

    /// Pick the target environment. With a single environment the name may be omitted.
    pub fn environment(&self, name: Option<&str>) -> Result<(String, &Environment)> {
        match name {
            Some(name) => self
                .environments
                .get(name)
                .map(|env| (name.to_string(), env))
                .ok_or_else(|| {
                    anyhow::anyhow!(
                        "Unknown environment '{}', known: {}",
                        name,
                        self.environments
                            .keys()
                            .cloned()
                            .collect::<Vec<_>>()
                            .join(", ")
                    )
                }),
            None if self.environments.len() == 1 => self
                .environments
                .iter()
                .next()
                .map(|(name, env)| (name.clone(), env))
                .context("No environments configured"),
            None => anyhow::bail!(
                "{} environments configured, select one with --environment",
                self.environments.len()
            ),
        }
    }

    /// Build the deployment plan: load compose files and keystores, validate the inventory
    pub fn plan(&self, environment: Option<&str>, tag: Option<&str>) -> Result<DeploymentPlan> {
        let (name, env) = self.environment(environment)?;
        validate_inventory(env)?;

        if !self.deploy.config_file.is_file() {
            anyhow::bail!(
                "Node config file not found: {}",
                self.deploy.config_file.display()
            );
        }

        let bootstrap = load_phase(&self.bootstrap, env.bootstrap.clone())
            .context("Failed to prepare bootstrap phase")?;
        let fleet =
            load_phase(&self.fleet, env.nodes.clone()).context("Failed to prepare fleet phase")?;

        let mut settings = DeploySettings::from(&self.deploy);
        if let Some(tag) = tag {
            settings.tag = tag.to_string();
        }

        Ok(DeploymentPlan {
            environment: name,
            settings,
            bootstrap,
            fleet,
        })
    }
}

fn load_phase(section: &PhaseSection, hosts: Vec<String>) -> Result<PhasePlan> {
    let compose = ComposeFile::load(&section.compose)?;
    let keystore = Keystore::load(&section.keystore)?;
    PhasePlan::new(hosts, compose, keystore, section.containers_per_host)
}

/// Host lists must be non-empty for bootstrap, duplicate-free and disjoint
pub fn validate_inventory(env: &Environment) -> Result<()> {
    if env.bootstrap.is_empty() {
        anyhow::bail!("Environment has no bootstrap hosts");
    }

    let mut seen = HashSet::new();
    for host in env.bootstrap.iter().chain(env.nodes.iter()) {
        if !seen.insert(host.as_str()) {
            anyhow::bail!("Host {} listed more than once", host);
        }
    }

    Ok(())
}
