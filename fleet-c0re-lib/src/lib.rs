//! Core shared library for fleet deployment tooling.
//!
//! Everything here is free of remote I/O: the node model, multiaddr
//! resolution, parsing of container ports and logs, the keypair arena and
//! compose validation. `fleet-cli` drives the remote side.

pub mod compose;
pub mod error;
pub mod introspect;
pub mod keystore;
pub mod model;
pub mod multiaddr;

pub use compose::ComposeFile;
pub use error::{ComposeError, IntrospectError, KeystoreError, LayoutError};
pub use introspect::{PEER_ID_MARKER, parse_peer_id, parse_ports};
pub use keystore::{KeyLayout, Keystore};
pub use model::{
    HostFailure, HostNodes, Multiaddr, Node, NodeDirectory, NodePorts, PeerIdentity,
    RawContainerInfo, Service, Transport,
};

/// Crate version, shared by every workspace member
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
