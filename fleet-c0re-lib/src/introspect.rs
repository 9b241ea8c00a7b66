//! Parsing of live container output.
//!
//! Nodes expose no structured API for their own identity, so ports come from
//! `docker port` and the peer id from the node's log stream.

use crate::error::{IntrospectError, PortCardinalitySnafu, PortClassificationSnafu};
use crate::model::{NodePorts, Transport};
use lazy_static::lazy_static;
use regex::Regex;
use snafu::ensure;

/// Log marker preceding the node's self-reported peer id
pub const PEER_ID_MARKER: &str = "server peer id";

lazy_static! {
    static ref ANSI_ESCAPE: Regex = Regex::new(r"\x1b\[[0-9;?]*[ -/]*[@-~]").unwrap();
}

/// Host port of one `docker port` line, e.g. `7777/tcp -> 0.0.0.0:7777`.
/// The bind address (`0.0.0.0`, `[::]`, `::`) is dropped; the port must be numeric.
fn host_port(line: &str) -> Option<&str> {
    let (_, binding) = line.split_once("->")?;
    let binding = binding.trim();
    let port = binding.rsplit_once(':').map_or(binding, |(_, port)| port);
    (!port.is_empty() && port.bytes().all(|b| b.is_ascii_digit())).then_some(port)
}

/// Extract and classify the tcp/ws host ports of a container.
///
/// Only ports starting with `7` or `9` count. The same port published on
/// both IPv4 and IPv6 is counted once. Anything other than exactly one
/// `7xxx` and one `9xxx` port is an error.
pub fn parse_ports(output: &str) -> Result<NodePorts, IntrospectError> {
    let mut found: Vec<String> = Vec::new();
    for port in output.lines().filter_map(host_port) {
        if Transport::classify(port).is_some() && !found.iter().any(|p| p == port) {
            found.push(port.to_string());
        }
    }

    ensure!(found.len() == 2, PortCardinalitySnafu { found });

    let (a, b) = (&found[0], &found[1]);
    match (Transport::classify(a), Transport::classify(b)) {
        (Some(Transport::Tcp), Some(Transport::Ws)) => Ok(NodePorts {
            tcp: a.clone(),
            ws: b.clone(),
        }),
        (Some(Transport::Ws), Some(Transport::Tcp)) => Ok(NodePorts {
            tcp: b.clone(),
            ws: a.clone(),
        }),
        _ => PortClassificationSnafu { found }.fail(),
    }
}

/// Remove terminal colour sequences from a log line
pub fn strip_ansi(line: &str) -> std::borrow::Cow<'_, str> {
    ANSI_ESCAPE.replace_all(line, "")
}

/// Peer id from a node's log stream.
///
/// The last line carrying [`PEER_ID_MARKER`] wins, so a node that restarted
/// reports its most recent identity. The id is whatever follows the last `=`.
pub fn parse_peer_id(logs: &str) -> Option<String> {
    logs.lines()
        .rev()
        .map(strip_ansi)
        .find(|line| line.contains(PEER_ID_MARKER))
        .and_then(|line| {
            let id = line.rsplit('=').next().unwrap_or_default().trim();
            (!id.is_empty()).then(|| id.to_string())
        })
}
