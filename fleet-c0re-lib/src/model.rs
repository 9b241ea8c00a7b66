//! Node directory data model
//!
//! A `Node` is built in two steps: introspection yields ports and the peer id,
//! then address resolution fills in the multiaddrs. Once resolved it is never
//! mutated again.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The two network-facing roles every node exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// Primary peer-to-peer transport
    Tcp,
    /// Client / browser transport
    Ws,
}

impl Transport {
    /// Leading digit of host ports published for this transport
    pub fn port_prefix(self) -> char {
        match self {
            Transport::Tcp => '7',
            Transport::Ws => '9',
        }
    }

    /// Protocol suffix appended after the tcp component of the multiaddr
    pub fn suffix(self) -> &'static str {
        match self {
            Transport::Tcp => "",
            Transport::Ws => "/ws",
        }
    }

    /// Classify a host port by its leading digit
    pub fn classify(port: &str) -> Option<Transport> {
        let first = port.chars().next()?;
        [Transport::Tcp, Transport::Ws]
            .into_iter()
            .find(|transport| transport.port_prefix() == first)
    }
}

/// Self-describing network address, e.g. `/ip4/10.0.0.5/tcp/7777`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Multiaddr(String);

impl Multiaddr {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Multiaddr {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for Multiaddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One endpoint of a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub port: String,
    pub multiaddr: Option<Multiaddr>,
}

impl Service {
    pub fn unresolved(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            multiaddr: None,
        }
    }
}

/// Host ports of a container, already classified by transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodePorts {
    pub tcp: String,
    pub ws: String,
}

/// Raw per-container data gathered right after the container starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawContainerInfo {
    pub container_id: String,
    pub peer_id: Option<String>,
    pub ports: NodePorts,
}

impl RawContainerInfo {
    /// Node record with ports known but multiaddrs still unset
    pub fn into_node(self) -> Node {
        Node {
            peer_id: self.peer_id,
            tcp: Service::unresolved(self.ports.tcp),
            ws: Service::unresolved(self.ports.ws),
        }
    }
}

/// Whether a node reported its own peer id in its logs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerIdentity<'a> {
    Resolved(&'a str),
    Unresolved,
}

/// Identity of one deployed peer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub peer_id: Option<String>,
    pub tcp: Service,
    pub ws: Service,
}

impl Node {
    pub fn identity(&self) -> PeerIdentity<'_> {
        match self.peer_id.as_deref() {
            Some(id) => PeerIdentity::Resolved(id),
            None => PeerIdentity::Unresolved,
        }
    }
}

impl fmt::Display for Node {
    /// `<tcp multiaddr> <ws multiaddr> <peer id>`, the line format operators paste
    /// into registration scripts
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn addr(service: &Service) -> &str {
            service.multiaddr.as_ref().map_or("-", Multiaddr::as_str)
        }
        write!(
            f,
            "{} {} {}",
            addr(&self.tcp),
            addr(&self.ws),
            self.peer_id.as_deref().unwrap_or("unknown")
        )
    }
}

/// Nodes deployed on a single host, in container-listing order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostNodes<T> {
    pub host: String,
    pub nodes: Vec<T>,
}

/// A host whose deployment failed while the run continued
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostFailure {
    pub host: String,
    pub cause: String,
}

/// Final result of a deployment run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDirectory {
    pub bootstrap: Node,
    /// Remaining nodes started during the bootstrap phase
    pub special: Vec<Node>,
    pub fleet: Vec<Node>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<HostFailure>,
}

impl NodeDirectory {
    /// Every node in the directory, bootstrap first
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        std::iter::once(&self.bootstrap)
            .chain(self.special.iter())
            .chain(self.fleet.iter())
    }
}
