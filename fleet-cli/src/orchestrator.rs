//! Fleet orchestrator - two-phase deployment
//!
//! Deploys the bootstrap hosts one at a time, takes the first bootstrap
//! node's tcp multiaddr as the bootstrap address, then deploys every other
//! host in parallel with that address in its environment. Per-host results
//! are merged into a `NodeDirectory`.

use crate::config::{DeploymentPlan, PhasePlan};
use crate::deployer::{DeployEnv, Deployer};
use crate::executor::{ExecutionMode, HostOutcome, RemoteExecutor, execute};
use anyhow::{Context, Result};
use fleet_c0re_lib::multiaddr::fill_addresses;
use fleet_c0re_lib::{
    HostFailure, HostNodes, Multiaddr, Node, NodeDirectory, PeerIdentity, RawContainerInfo,
};
use serde::Deserialize;
use tracing::{info, warn};

/// What a failing fleet host does to the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FleetFailurePolicy {
    /// Any failing host aborts the whole run
    #[default]
    Abort,
    /// Keep successful hosts, report failed ones in the directory
    Partial,
}

/// What a node without a peer id in its logs does to the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingIdentityPolicy {
    /// Keep the node, marked `unknown`
    #[default]
    Degrade,
    /// Abort the run
    Fail,
}

/// Orchestrator drives both deployment phases over one executor
pub struct Orchestrator<E: RemoteExecutor> {
    executor: E,
    plan: DeploymentPlan,
}

impl<E: RemoteExecutor> Orchestrator<E> {
    pub fn new(executor: E, plan: DeploymentPlan) -> Self {
        Self { executor, plan }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn plan(&self) -> &DeploymentPlan {
        &self.plan
    }

    /// Deploy one phase's hosts, one `HostOutcome` per host dispatched
    async fn deploy_phase(
        &self,
        phase: &PhasePlan,
        bootstrap: Option<&Multiaddr>,
        mode: ExecutionMode,
    ) -> Vec<HostOutcome<HostNodes<Node>>> {
        let deployer = Deployer::new(&self.executor, &self.plan.settings);
        let deployer = &deployer;
        let tag = self.plan.settings.tag.as_str();

        execute(&phase.hosts, mode, |host_pos, host| async move {
            let env = DeployEnv::new(&host, tag, bootstrap);
            let raw = deployer
                .deploy_node(phase, host_pos, &env)
                .await
                .with_context(|| format!("Deployment of {} failed", host))?;
            Ok::<_, anyhow::Error>(HostNodes {
                host,
                nodes: raw.into_iter().map(RawContainerInfo::into_node).collect(),
            })
        })
        .await
    }

    /// Apply the missing-identity policy to resolved nodes
    fn check_identities(&self, nodes: &[Node]) -> Result<()> {
        for node in nodes {
            if node.identity() != PeerIdentity::Unresolved {
                continue;
            }
            let addr = node
                .tcp
                .multiaddr
                .as_ref()
                .map_or_else(|| node.tcp.port.clone(), ToString::to_string);
            match self.plan.settings.missing_identity {
                MissingIdentityPolicy::Degrade => {
                    warn!("peer id of node {} not found in its logs", addr);
                }
                MissingIdentityPolicy::Fail => {
                    anyhow::bail!("Peer id of node {} not found in its logs", addr);
                }
            }
        }
        Ok(())
    }

    /// Phase 1: sequential, any failure is fatal
    async fn deploy_bootstrap(&self) -> Result<(Node, Vec<Node>)> {
        info!("deploying bootstrap on {}", self.plan.bootstrap.hosts.join(", "));
        let outcomes = self
            .deploy_phase(&self.plan.bootstrap, None, ExecutionMode::Sequential)
            .await;

        let mut hosts = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            let nodes = outcome
                .result
                .with_context(|| format!("Bootstrap host {} failed", outcome.host))?;
            hosts.push(nodes);
        }

        let mut nodes = fill_addresses(&hosts).into_iter();
        let bootstrap = nodes
            .next()
            .context("Bootstrap phase produced no nodes")?;
        let special: Vec<Node> = nodes.collect();

        self.check_identities(std::slice::from_ref(&bootstrap))?;
        self.check_identities(&special)?;
        Ok((bootstrap, special))
    }

    /// Phase 2: parallel, failures handled per `FleetFailurePolicy`.
    /// Identities are checked host by host, so with `Partial` a node missing
    /// its peer id only costs its own host.
    async fn deploy_nodes(&self, bootstrap: &Multiaddr) -> Result<(Vec<Node>, Vec<HostFailure>)> {
        if self.plan.fleet.hosts.is_empty() {
            return Ok((Vec::new(), Vec::new()));
        }

        info!("deploying {} fleet hosts", self.plan.fleet.hosts.len());
        let outcomes = self
            .deploy_phase(&self.plan.fleet, Some(bootstrap), ExecutionMode::Parallel)
            .await;

        let mut nodes = Vec::new();
        let mut failures = Vec::new();
        for outcome in outcomes {
            let result = outcome.result.and_then(|entry| {
                let resolved = fill_addresses(std::iter::once(&entry));
                self.check_identities(&resolved)?;
                Ok(resolved)
            });
            match (result, self.plan.settings.fleet_failure) {
                (Ok(resolved), _) => nodes.extend(resolved),
                (Err(e), FleetFailurePolicy::Abort) => {
                    return Err(e.context(format!("Fleet host {} failed", outcome.host)));
                }
                (Err(e), FleetFailurePolicy::Partial) => {
                    warn!("fleet host {} failed: {:#}", outcome.host, e);
                    failures.push(HostFailure {
                        host: outcome.host,
                        cause: format!("{e:#}"),
                    });
                }
            }
        }

        Ok((nodes, failures))
    }

    /// Run both phases and assemble the node directory
    pub async fn deploy_fleet(&self) -> Result<NodeDirectory> {
        let (bootstrap, special) = self.deploy_bootstrap().await?;
        let address = bootstrap
            .tcp
            .multiaddr
            .clone()
            .context("Bootstrap node has no tcp multiaddr")?;
        info!("bootstrap will be {}", address);

        let (fleet, failures) = self.deploy_nodes(&address).await?;
        info!(
            "deployed {} nodes ({} hosts failed)",
            1 + special.len() + fleet.len(),
            failures.len()
        );

        Ok(NodeDirectory {
            bootstrap,
            special,
            fleet,
            failures,
        })
    }
}
