//! Scripted executor and plan fixtures shared by the integration tests
#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use fleet_c0re_lib::{ComposeFile, Keystore};
use fleet_cli::config::{DeploySettings, DeploymentPlan, PhasePlan};
use fleet_cli::executor::{RemoteEnv, RemoteExecutor};
use fleet_cli::introspector::Readiness;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

const COMPOSE: &str = "services:\n  node:\n    image: fluencelabs/fluence:${TAG}\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Run,
    Put,
    Write,
}

/// One recorded remote operation
#[derive(Debug, Clone)]
pub struct Call {
    pub host: String,
    pub kind: CallKind,
    /// Command for `Run`, remote path for `Put`/`Write`
    pub target: String,
    /// File contents for `Write`
    pub contents: String,
    pub env: Vec<(String, String)>,
}

impl Call {
    pub fn env_var(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ContainerScript {
    pub id: String,
    pub ports: String,
    /// Successive `docker logs` outputs; the last one repeats
    pub logs: Vec<String>,
}

pub fn container(id: &str, tcp: &str, ws: &str, peer_id: Option<&str>) -> ContainerScript {
    let logs = match peer_id {
        Some(peer_id) => format!("starting node\n[INFO] server peer id = {peer_id}\n"),
        None => "starting node\n".to_string(),
    };
    ContainerScript {
        id: id.to_string(),
        ports: format!("{tcp}/tcp -> 0.0.0.0:{tcp}\n{ws}/tcp -> 0.0.0.0:{ws}\n"),
        logs: vec![logs],
    }
}

#[derive(Debug, Default)]
struct HostScript {
    containers: Vec<ContainerScript>,
    fail_on: Option<String>,
}

/// In-memory executor answering like docker / docker-compose would
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    hosts: HashMap<String, HostScript>,
    calls: Mutex<Vec<Call>>,
    log_reads: Mutex<HashMap<String, usize>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn host(mut self, host: &str, containers: Vec<ContainerScript>) -> Self {
        self.hosts.entry(host.to_string()).or_default().containers = containers;
        self
    }

    /// Any command on `host` containing `needle` fails
    pub fn fail_on(mut self, host: &str, needle: &str) -> Self {
        self.hosts.entry(host.to_string()).or_default().fail_on = Some(needle.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_on(&self, host: &str) -> Vec<Call> {
        self.calls().into_iter().filter(|c| c.host == host).collect()
    }

    fn record(
        &self,
        host: &str,
        kind: CallKind,
        target: &str,
        contents: &str,
        env: RemoteEnv<'_>,
    ) {
        self.calls.lock().unwrap().push(Call {
            host: host.to_string(),
            kind,
            target: target.to_string(),
            contents: contents.to_string(),
            env: env.iter().map(|(k, v)| ((*k).to_string(), v.clone())).collect(),
        });
    }

    fn script(&self, host: &str) -> Result<&HostScript> {
        self.hosts
            .get(host)
            .ok_or_else(|| anyhow::anyhow!("ssh: connect to host {host}: no route to host"))
    }

    fn container(&self, host: &str, id: &str) -> Result<&ContainerScript> {
        self.script(host)?
            .containers
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| anyhow::anyhow!("Error: No such container: {id}"))
    }
}

#[async_trait]
impl RemoteExecutor for ScriptedExecutor {
    async fn run(&self, host: &str, command: &str, env: RemoteEnv<'_>) -> Result<String> {
        self.record(host, CallKind::Run, command, "", env);
        let script = self.script(host)?;

        if let Some(needle) = &script.fail_on {
            if command.contains(needle.as_str()) {
                anyhow::bail!("[{host}] `{command}` failed (exit status: 1): scripted failure");
            }
        }

        if command.ends_with("ps -q") {
            let ids: Vec<&str> = script.containers.iter().map(|c| c.id.as_str()).collect();
            return Ok(ids.join("\n"));
        }
        if let Some(id) = command.strip_prefix("docker port ") {
            return Ok(self.container(host, id.trim())?.ports.clone());
        }
        if let Some(rest) = command.strip_prefix("docker logs ") {
            let id = rest.trim_end_matches("2>&1").trim();
            let logs = &self.container(host, id)?.logs;
            let mut reads = self.log_reads.lock().unwrap();
            let count = reads.entry(format!("{host}/{id}")).or_insert(0);
            let output = logs[(*count).min(logs.len() - 1)].clone();
            *count += 1;
            return Ok(output);
        }
        Ok(String::new())
    }

    async fn put(&self, host: &str, local: &Path, remote: &str) -> Result<()> {
        self.record(host, CallKind::Put, remote, &local.display().to_string(), &[]);
        self.script(host).map(|_| ())
    }

    async fn write(&self, host: &str, contents: &str, remote: &str) -> Result<()> {
        self.record(host, CallKind::Write, remote, contents, &[]);
        self.script(host).map(|_| ())
    }
}

fn phase(file: &str, hosts: &[&str], containers_per_host: usize) -> PhasePlan {
    let compose = ComposeFile::parse(Path::new(file), COMPOSE).unwrap();
    let keys: Vec<String> = (0..hosts.len() * containers_per_host)
        .map(|i| format!("key-{i}"))
        .collect();
    PhasePlan::new(
        hosts.iter().map(ToString::to_string).collect(),
        compose,
        Keystore::parse(&keys.join("\n")),
        containers_per_host,
    )
    .unwrap()
}

/// Plan with instant settle readiness and default policies
pub fn plan(bootstrap: &[&str], nodes: &[&str], containers_per_host: usize) -> DeploymentPlan {
    DeploymentPlan {
        environment: "test".to_string(),
        settings: DeploySettings {
            tag: "v-test".to_string(),
            readiness: Readiness::Settle {
                delay: Duration::ZERO,
            },
            ..DeploySettings::default()
        },
        bootstrap: phase("fluence_bootstrap.yml", bootstrap, 1),
        fleet: phase("fluence.yml", nodes, containers_per_host),
    }
}
