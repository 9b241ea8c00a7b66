mod common;

use common::{ScriptedExecutor, container};
use fleet_cli::{ContainerIntrospector, NodeNotReady, Readiness};
use std::time::Duration;

const HOST: &str = "10.0.0.5";

fn poll() -> Readiness {
    Readiness::Poll {
        interval: Duration::from_millis(5),
        timeout: Duration::from_secs(2),
    }
}

#[tokio::test]
async fn test_introspect_reads_ports_and_last_peer_id() {
    let mut script = container("c0", "7102", "9102", None);
    script.ports = "\
9999/tcp -> 0.0.0.0:9102
7777/tcp -> 0.0.0.0:7102
7777/tcp -> [::]:7102
"
    .to_string();
    script.logs = vec!["server peer id = OLD\nrestart\nserver peer id = NEW\n".to_string()];
    let executor = ScriptedExecutor::new().host(HOST, vec![script]);

    let info = ContainerIntrospector::new(&executor)
        .introspect(HOST, "c0")
        .await
        .unwrap();

    assert_eq!(info.container_id, "c0");
    assert_eq!(info.ports.tcp, "7102");
    assert_eq!(info.ports.ws, "9102");
    assert_eq!(info.peer_id.as_deref(), Some("NEW"));
}

#[tokio::test]
async fn test_settle_introspects_once() {
    let executor = ScriptedExecutor::new().host(HOST, vec![container("c0", "7777", "9999", None)]);
    let readiness = Readiness::Settle {
        delay: Duration::from_millis(1),
    };

    let infos = ContainerIntrospector::new(&executor)
        .await_ready(HOST, &["c0".to_string()], &readiness)
        .await
        .unwrap();

    assert_eq!(infos.len(), 1);
    assert_eq!(infos[0].peer_id, None);
    assert_eq!(executor.calls().len(), 2);
}

#[tokio::test]
async fn test_poll_waits_for_peer_id() {
    let mut script = container("c0", "7777", "9999", Some("P0"));
    let ready_logs = script.logs[0].clone();
    script.logs = vec![String::new(), "booting\n".to_string(), ready_logs];
    let executor = ScriptedExecutor::new().host(HOST, vec![script]);

    let infos = ContainerIntrospector::new(&executor)
        .await_ready(HOST, &["c0".to_string()], &poll())
        .await
        .unwrap();

    assert_eq!(infos[0].peer_id.as_deref(), Some("P0"));
    let log_reads = executor
        .calls()
        .iter()
        .filter(|c| c.target.starts_with("docker logs"))
        .count();
    assert_eq!(log_reads, 3);
}

#[tokio::test]
async fn test_poll_times_out_with_readiness_error() {
    let executor = ScriptedExecutor::new().host(HOST, vec![container("c0", "7777", "9999", None)]);
    let readiness = Readiness::Poll {
        interval: Duration::from_millis(5),
        timeout: Duration::from_millis(30),
    };

    let err = ContainerIntrospector::new(&executor)
        .await_ready(HOST, &["c0".to_string()], &readiness)
        .await
        .unwrap_err();

    let not_ready = err.downcast_ref::<NodeNotReady>().unwrap();
    assert_eq!(not_ready.host, HOST);
    assert_eq!(not_ready.container, "c0");
    assert_eq!(not_ready.last_error, "peer id not yet in logs");
}

#[tokio::test]
async fn test_poll_reports_port_errors_as_not_ready() {
    let mut script = container("c0", "7777", "9999", Some("P0"));
    script.ports = "7777/tcp -> 0.0.0.0:7777\n".to_string();
    let executor = ScriptedExecutor::new().host(HOST, vec![script]);
    let readiness = Readiness::Poll {
        interval: Duration::from_millis(5),
        timeout: Duration::from_millis(20),
    };

    let err = ContainerIntrospector::new(&executor)
        .await_ready(HOST, &["c0".to_string()], &readiness)
        .await
        .unwrap_err();

    let not_ready = err.downcast_ref::<NodeNotReady>().unwrap();
    assert!(not_ready.last_error.contains("expected exactly two node ports"));
}
