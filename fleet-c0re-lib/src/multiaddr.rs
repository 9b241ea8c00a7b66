//! Address resolution: host + port + transport -> multiaddr

use crate::model::{HostNodes, Multiaddr, Node, Service, Transport};
use std::net::IpAddr;

/// Network-layer component for a host string.
/// Hosts in the inventory are normally IPv4 literals; names fall back to `dns4`.
fn network_component(host: &str) -> String {
    match host.parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) => format!("/ip4/{ip}"),
        Ok(IpAddr::V6(ip)) => format!("/ip6/{ip}"),
        Err(_) => format!("/dns4/{host}"),
    }
}

/// Build `/ip4/<ip>/tcp/<port><suffix>`
pub fn multiaddr(host: &str, port: &str, suffix: &str) -> Multiaddr {
    Multiaddr::from(format!("{}/tcp/{port}{suffix}", network_component(host)))
}

/// Fill in the multiaddr of one service
pub fn resolve(host: &str, service: &Service, transport: Transport) -> Service {
    Service {
        port: service.port.clone(),
        multiaddr: Some(multiaddr(host, &service.port, transport.suffix())),
    }
}

/// Resolve both services of a node
pub fn resolve_node(host: &str, node: &Node) -> Node {
    Node {
        peer_id: node.peer_id.clone(),
        tcp: resolve(host, &node.tcp, Transport::Tcp),
        ws: resolve(host, &node.ws, Transport::Ws),
    }
}

/// Flatten per-host results into resolved nodes, keeping host order then
/// container order
pub fn fill_addresses<'a, I>(hosts: I) -> Vec<Node>
where
    I: IntoIterator<Item = &'a HostNodes<Node>>,
{
    hosts
        .into_iter()
        .flat_map(|entry| {
            entry
                .nodes
                .iter()
                .map(move |node| resolve_node(&entry.host, node))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_primary_transport() {
        let service = resolve("10.0.0.5", &Service::unresolved("7777"), Transport::Tcp);
        assert_eq!(
            service.multiaddr.unwrap().as_str(),
            "/ip4/10.0.0.5/tcp/7777"
        );
    }

    #[test]
    fn test_resolve_client_transport() {
        let service = resolve("10.0.0.5", &Service::unresolved("9999"), Transport::Ws);
        assert_eq!(service.port, "9999");
        assert_eq!(
            service.multiaddr.unwrap().as_str(),
            "/ip4/10.0.0.5/tcp/9999/ws"
        );
    }

    #[test]
    fn test_non_ipv4_hosts() {
        assert_eq!(multiaddr("::1", "7001", "").as_str(), "/ip6/::1/tcp/7001");
        assert_eq!(
            multiaddr("node-1.example", "9001", "/ws").as_str(),
            "/dns4/node-1.example/tcp/9001/ws"
        );
    }

    #[test]
    fn test_fill_addresses_keeps_order() {
        let node = |tcp: &str, ws: &str| Node {
            peer_id: None,
            tcp: Service::unresolved(tcp),
            ws: Service::unresolved(ws),
        };
        let hosts = vec![
            HostNodes {
                host: "10.0.0.1".to_string(),
                nodes: vec![node("7001", "9001"), node("7002", "9002")],
            },
            HostNodes {
                host: "10.0.0.2".to_string(),
                nodes: vec![node("7001", "9001")],
            },
        ];

        let resolved = fill_addresses(&hosts);
        let addrs: Vec<String> = resolved.iter().map(ToString::to_string).collect();
        assert_eq!(
            addrs,
            vec![
                "/ip4/10.0.0.1/tcp/7001 /ip4/10.0.0.1/tcp/9001/ws unknown",
                "/ip4/10.0.0.1/tcp/7002 /ip4/10.0.0.1/tcp/9002/ws unknown",
                "/ip4/10.0.0.2/tcp/7001 /ip4/10.0.0.2/tcp/9001/ws unknown",
            ]
        );
    }
}
