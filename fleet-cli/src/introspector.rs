//! Container introspection over the remote executor
//!
//! Reads `docker port` and `docker logs` of a running container and turns
//! them into a `RawContainerInfo`. Readiness is either the classic fixed
//! settle delay or a bounded poll.

use crate::executor::RemoteExecutor;
use anyhow::{Context, Result};
use fleet_c0re_lib::{NodePorts, RawContainerInfo, parse_peer_id, parse_ports};
use snafu::Snafu;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

/// How long to wait for freshly started containers before reading them
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    /// Sleep once, then introspect exactly once
    Settle { delay: Duration },
    /// Introspect repeatedly until ports classify and a peer id shows up
    Poll { interval: Duration, timeout: Duration },
}

impl Default for Readiness {
    fn default() -> Self {
        Readiness::Settle {
            delay: Duration::from_secs(1),
        }
    }
}

/// A container that never reached the expected shape within the poll timeout
#[derive(Debug, Snafu)]
#[snafu(display(
    "node {container} on {host} did not become ready within {timeout:?}: {last_error}"
))]
pub struct NodeNotReady {
    pub host: String,
    pub container: String,
    pub timeout: Duration,
    pub last_error: String,
}

pub struct ContainerIntrospector<'a, E: RemoteExecutor + ?Sized> {
    executor: &'a E,
}

impl<'a, E: RemoteExecutor + ?Sized> ContainerIntrospector<'a, E> {
    pub fn new(executor: &'a E) -> Self {
        Self { executor }
    }

    /// Classified host ports of a container
    pub async fn ports(&self, host: &str, container: &str) -> Result<NodePorts> {
        let output = self
            .executor
            .run(host, &format!("docker port {container}"), &[])
            .await?;
        parse_ports(&output)
            .with_context(|| format!("Ports of container {container} on {host} not discoverable"))
    }

    /// Peer id the node last reported in its logs, if any
    pub async fn peer_id(&self, host: &str, container: &str) -> Result<Option<String>> {
        let logs = self
            .executor
            .run(host, &format!("docker logs {container} 2>&1"), &[])
            .await?;
        Ok(parse_peer_id(&logs))
    }

    pub async fn introspect(&self, host: &str, container: &str) -> Result<RawContainerInfo> {
        let ports = self.ports(host, container).await?;
        let peer_id = self.peer_id(host, container).await?;
        debug!(
            "[{}] container {}: tcp={} ws={} peer_id={:?}",
            host, container, ports.tcp, ports.ws, peer_id
        );
        Ok(RawContainerInfo {
            container_id: container.to_string(),
            peer_id,
            ports,
        })
    }

    /// Wait per `readiness`, then introspect every container in listing order
    pub async fn await_ready(
        &self,
        host: &str,
        containers: &[String],
        readiness: &Readiness,
    ) -> Result<Vec<RawContainerInfo>> {
        match readiness {
            Readiness::Settle { delay } => {
                sleep(*delay).await;
                let mut infos = Vec::with_capacity(containers.len());
                for container in containers {
                    infos.push(self.introspect(host, container).await?);
                }
                Ok(infos)
            }
            Readiness::Poll { interval, timeout } => {
                let deadline = Instant::now() + *timeout;
                let mut infos = Vec::with_capacity(containers.len());
                for container in containers {
                    infos.push(
                        self.poll(host, container, *interval, *timeout, deadline)
                            .await?,
                    );
                }
                Ok(infos)
            }
        }
    }

    async fn poll(
        &self,
        host: &str,
        container: &str,
        interval: Duration,
        timeout: Duration,
        deadline: Instant,
    ) -> Result<RawContainerInfo> {
        loop {
            let last_error = match self.introspect(host, container).await {
                Ok(info) if info.peer_id.is_some() => return Ok(info),
                Ok(_) => "peer id not yet in logs".to_string(),
                Err(e) => format!("{e:#}"),
            };

            if Instant::now() + interval > deadline {
                warn!("[{}] container {} not ready: {}", host, container, last_error);
                return Err(NodeNotReady {
                    host: host.to_string(),
                    container: container.to_string(),
                    timeout,
                    last_error,
                }
                .into());
            }
            debug!("[{}] container {} not ready yet: {}", host, container, last_error);
            sleep(interval).await;
        }
    }
}
