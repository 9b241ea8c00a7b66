//! Remote command execution
//!
//! `RemoteExecutor` is the seam between the deployment logic and the hosts.
//! `SshExecutor` shells out to `ssh`/`scp`; tests substitute a scripted one.

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::future::join_all;
use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variables exported before a remote command
pub type RemoteEnv<'a> = &'a [(&'a str, String)];

#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    /// Run a shell command on `host`, returning captured stdout.
    /// A non-zero exit status is an error naming host and command.
    async fn run(&self, host: &str, command: &str, env: RemoteEnv<'_>) -> Result<String>;

    /// Copy a local file to `remote` on `host`
    async fn put(&self, host: &str, local: &Path, remote: &str) -> Result<()>;

    /// Write `contents` to `remote` on `host`
    async fn write(&self, host: &str, contents: &str, remote: &str) -> Result<()>;
}

/// How a group of hosts is driven
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// One host at a time; stops at the first failure
    Sequential,
    /// All hosts at once, joined before returning
    Parallel,
}

/// Result of running a task on one host
#[derive(Debug)]
pub struct HostOutcome<T> {
    pub host: String,
    pub result: Result<T>,
}

/// Run `task` for every host. The task receives the host's position in
/// `hosts` and its name. Outcomes come back in host-list order.
pub async fn execute<T, F, Fut>(
    hosts: &[String],
    mode: ExecutionMode,
    task: F,
) -> Vec<HostOutcome<T>>
where
    F: Fn(usize, String) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match mode {
        ExecutionMode::Sequential => {
            let mut outcomes = Vec::with_capacity(hosts.len());
            for (pos, host) in hosts.iter().enumerate() {
                let result = task(pos, host.clone()).await;
                let failed = result.is_err();
                outcomes.push(HostOutcome {
                    host: host.clone(),
                    result,
                });
                if failed {
                    break;
                }
            }
            outcomes
        }
        ExecutionMode::Parallel => {
            let results = join_all(
                hosts
                    .iter()
                    .enumerate()
                    .map(|(pos, host)| task(pos, host.clone())),
            )
            .await;
            hosts
                .iter()
                .cloned()
                .zip(results)
                .map(|(host, result)| HostOutcome { host, result })
                .collect()
        }
    }
}

/// POSIX single-quote a value for the remote shell
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Prefix `command` with `export K='v';` for every variable
pub fn with_env(command: &str, env: RemoteEnv<'_>) -> String {
    if env.is_empty() {
        return command.to_string();
    }
    let exports: Vec<String> = env
        .iter()
        .map(|(key, value)| format!("{}={}", key, shell_quote(value)))
        .collect();
    format!("export {}; {}", exports.join(" "), command)
}

/// Executes over OpenSSH in batch mode
#[derive(Debug, Clone)]
pub struct SshExecutor {
    user: String,
    options: Vec<String>,
}

impl SshExecutor {
    pub fn new(user: impl Into<String>, options: Vec<String>) -> Self {
        Self {
            user: user.into(),
            options,
        }
    }

    pub(crate) fn destination(&self, host: &str) -> String {
        format!("{}@{}", self.user, host)
    }

    pub(crate) fn base_args(&self) -> Vec<String> {
        let mut args = vec!["-o".to_string(), "BatchMode=yes".to_string()];
        for option in &self.options {
            args.push("-o".to_string());
            args.push(option.clone());
        }
        args
    }

    /// Run a local program off the async runtime, failing on non-zero exit
    async fn spawn(
        program: &'static str,
        args: Vec<String>,
        stdin: Option<Vec<u8>>,
        what: String,
    ) -> Result<String> {
        let label = what.clone();
        let output = tokio::task::spawn_blocking(move || {
            let mut expression = duct::cmd(program, args)
                .stdout_capture()
                .stderr_capture()
                .unchecked();
            if let Some(bytes) = stdin {
                expression = expression.stdin_bytes(bytes);
            }
            expression.run()
        })
        .await
        .with_context(|| format!("{program} task for {label} did not complete"))?
        .with_context(|| format!("Failed to execute {program} for {label}"))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("{} failed ({}): {}", what, output.status, stderr.trim());
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl RemoteExecutor for SshExecutor {
    async fn run(&self, host: &str, command: &str, env: RemoteEnv<'_>) -> Result<String> {
        debug!("[{}] run: {}", host, command);
        let mut args = self.base_args();
        args.push(self.destination(host));
        args.push(with_env(command, env));
        Self::spawn("ssh", args, None, format!("[{host}] `{command}`")).await
    }

    async fn put(&self, host: &str, local: &Path, remote: &str) -> Result<()> {
        debug!("[{}] put: {} -> {}", host, local.display(), remote);
        let local: PathBuf = local.to_path_buf();
        let mut args = self.base_args();
        args.push(local.to_string_lossy().into_owned());
        args.push(format!("{}:{}", self.destination(host), remote));
        Self::spawn(
            "scp",
            args,
            None,
            format!("[{host}] put {} -> {remote}", local.display()),
        )
        .await
        .map(|_| ())
    }

    async fn write(&self, host: &str, contents: &str, remote: &str) -> Result<()> {
        debug!("[{}] write: {}", host, remote);
        let mut args = self.base_args();
        args.push(self.destination(host));
        args.push(format!("umask 077 && cat > {}", shell_quote(remote)));
        Self::spawn(
            "ssh",
            args,
            Some(contents.as_bytes().to_vec()),
            format!("[{host}] write {remote}"),
        )
        .await
        .map(|_| ())
    }
}
