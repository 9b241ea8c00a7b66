//! Keypair arena and fleet-wide key index layout.
//!
//! Every container gets a precomputed keypair selected by a global index
//! `host_pos * containers_per_host + container_pos`. The formula only stays
//! collision-free while every host runs the same number of containers, so
//! the layout rejects positions outside that grid.

use crate::error::{
    ContainerOutOfRangeSnafu, HostOutOfRangeSnafu, KeyOutOfRangeSnafu, KeystoreError, LayoutError,
    ReadKeystoreSnafu, ZeroContainersSnafu,
};
use snafu::{ResultExt, ensure};
use std::path::Path;

/// Shape of one deployment phase: how many hosts, how many containers each
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyLayout {
    hosts: usize,
    containers_per_host: usize,
}

impl KeyLayout {
    pub fn new(hosts: usize, containers_per_host: usize) -> Result<Self, LayoutError> {
        ensure!(containers_per_host > 0, ZeroContainersSnafu);
        Ok(Self {
            hosts,
            containers_per_host,
        })
    }

    pub fn containers_per_host(&self) -> usize {
        self.containers_per_host
    }

    /// Number of keypairs this layout consumes
    pub fn capacity(&self) -> usize {
        self.hosts * self.containers_per_host
    }

    /// Global keypair index of a container
    pub fn index(&self, host_pos: usize, container_pos: usize) -> Result<usize, LayoutError> {
        ensure!(
            host_pos < self.hosts,
            HostOutOfRangeSnafu {
                host_pos,
                hosts: self.hosts
            }
        );
        ensure!(
            container_pos < self.containers_per_host,
            ContainerOutOfRangeSnafu {
                container_pos,
                containers_per_host: self.containers_per_host
            }
        );
        Ok(host_pos * self.containers_per_host + container_pos)
    }
}

/// Read-only arena of keypairs addressed by 0-based index
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keystore {
    keypairs: Vec<String>,
}

impl Keystore {
    /// One keypair per non-empty line; `#` lines are comments
    pub fn parse(content: &str) -> Self {
        let keypairs = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)
            .collect();
        Self { keypairs }
    }

    pub fn load(path: &Path) -> Result<Self, KeystoreError> {
        let content = std::fs::read_to_string(path).context(ReadKeystoreSnafu { path })?;
        let keystore = Self::parse(&content);
        tracing::debug!(
            "loaded {} keypairs from {}",
            keystore.len(),
            path.display()
        );
        Ok(keystore)
    }

    pub fn len(&self) -> usize {
        self.keypairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypairs.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<&str, KeystoreError> {
        self.keypairs
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| {
                KeyOutOfRangeSnafu {
                    index,
                    len: self.keypairs.len(),
                }
                .build()
            })
    }
}
