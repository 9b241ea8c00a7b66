//! Typed errors for the fleet core.
//!
//! Each concern gets its own enum so the CLI can attach host/command context
//! with `anyhow` while tests can still match on the exact variant.

use snafu::Snafu;
use std::path::PathBuf;

/// Failures while reading a container's ports or logs
#[derive(Debug, Snafu, Clone, PartialEq, Eq)]
#[snafu(visibility(pub(crate)))]
pub enum IntrospectError {
    #[snafu(display(
        "expected exactly two node ports (7xxx tcp, 9xxx ws), found {}: {found:?}",
        found.len()
    ))]
    PortCardinality { found: Vec<String> },

    #[snafu(display("cannot classify ports {found:?}: need one 7xxx and one 9xxx port"))]
    PortClassification { found: Vec<String> },
}

/// Failures loading or addressing the keypair arena
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum KeystoreError {
    #[snafu(display("failed to read keystore {}", path.display()))]
    ReadKeystore {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("keypair index {index} out of range, keystore holds {len} keypairs"))]
    KeyOutOfRange { index: usize, len: usize },
}

/// Violations of the fleet-wide key index layout
#[derive(Debug, Snafu, Clone, PartialEq, Eq)]
#[snafu(visibility(pub(crate)))]
pub enum LayoutError {
    #[snafu(display("containers per host must be at least 1"))]
    ZeroContainers,

    #[snafu(display("host position {host_pos} outside host list of {hosts}"))]
    HostOutOfRange { host_pos: usize, hosts: usize },

    #[snafu(display(
        "container position {container_pos} exceeds {containers_per_host} containers per host"
    ))]
    ContainerOutOfRange {
        container_pos: usize,
        containers_per_host: usize,
    },
}

/// Malformed compose definitions
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ComposeError {
    #[snafu(display("failed to read compose file {}", path.display()))]
    ReadCompose {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("compose file {} is not valid YAML", path.display()))]
    ParseCompose {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[snafu(display("compose file {} defines no services", path.display()))]
    NoServices { path: PathBuf },

    #[snafu(display("compose path {} has no usable file name", path.display()))]
    BadComposeName { path: PathBuf },
}
