mod common;

use std::time::Duration;

use common::{catalog, init};
use patchbay::graph::Graph;
use patchbay::runtime::wire::read_frame;
use patchbay::runtime::{SessionConfig, StatusUpdate};
use patchbay::types::{NodeId, Position};
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

fn test_config(port: u16) -> SessionConfig {
    let mut config = SessionConfig::default()
        .with_host("127.0.0.1")
        .with_port(port)
        .with_connect_timeout(Duration::from_secs(2));
    config.unpause_delay = Duration::from_millis(10);
    config
}

fn small_graph() -> Graph {
    init();
    let mut g = Graph::new(catalog());
    let c = g.spawn_node("Constant", None, Position::ORIGIN, true).unwrap();
    let sink = g.spawn_node("Collect", None, Position::ORIGIN, true).unwrap();
    g.connect(c, "value", sink, "value").unwrap();
    g
}

async fn bind_local() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

async fn expect_token(stream: &mut TcpStream, token: &str) {
    let mut buf = vec![0u8; token.len()];
    timeout(WAIT, stream.read_exact(&mut buf))
        .await
        .expect("timed out waiting for command token")
        .unwrap();
    assert_eq!(std::str::from_utf8(&buf).unwrap(), token);
}

#[tokio::test]
async fn execute_sends_pause_frame_update_unpause() {
    let (listener, port) = bind_local().await;
    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        expect_token(&mut stream, "PAUSE").await;
        let payload = timeout(WAIT, read_frame(&mut stream)).await.unwrap().unwrap();
        expect_token(&mut stream, "UPDATE").await;
        expect_token(&mut stream, "UNPAUSE").await;
        payload
    });

    let mut graph = small_graph();
    graph.attach_runner(test_config(port)).await.unwrap();
    graph.execute().await.unwrap();

    let payload = server.await.unwrap();
    let state: Value = serde_json::from_str(&payload).unwrap();
    let map = state.as_object().unwrap();
    assert_eq!(map.len(), 2);
    assert_eq!(map["0"]["class"], "Constant");
}

#[tokio::test]
async fn status_messages_flow_into_history_and_updates() {
    let (listener, port) = bind_local().await;
    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        stream.write_all(b"0#1#").await.unwrap();
        // Keep the socket open until the client has read the status.
        tokio::time::sleep(Duration::from_secs(2)).await;
        drop(stream);
    });

    let mut graph = small_graph();
    graph.attach_runner(test_config(port)).await.unwrap();

    let updates = graph.session().unwrap().updates();
    let update = timeout(WAIT, updates.recv_async()).await.unwrap().unwrap();
    assert_eq!(
        update,
        StatusUpdate {
            executed: vec![NodeId(0), NodeId(1)]
        }
    );
    assert_eq!(graph.execution_history(), vec![NodeId(0), NodeId(1)]);
    assert!(graph.needs_repaint());
    // One-shot: the flag is consumed.
    assert!(!graph.needs_repaint());

    graph.detach_runner().await.unwrap();
    server.abort();
}

#[tokio::test]
async fn push_update_clears_previous_history() {
    let (listener, port) = bind_local().await;
    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        stream.write_all(b"7#").await.unwrap();
        expect_token(&mut stream, "PAUSE").await;
        let _ = timeout(WAIT, read_frame(&mut stream)).await.unwrap().unwrap();
        expect_token(&mut stream, "UPDATE").await;
    });

    let mut graph = small_graph();
    graph.attach_runner(test_config(port)).await.unwrap();

    // Wait for the stale status to land, then push a new graph state.
    let updates = graph.session().unwrap().updates();
    timeout(WAIT, updates.recv_async()).await.unwrap().unwrap();
    assert_eq!(graph.execution_history(), vec![NodeId(7)]);

    graph.push_update().await.unwrap();
    assert!(graph.execution_history().is_empty());
    server.await.unwrap();
}

#[tokio::test]
async fn control_commands_are_bare_tokens() {
    let (listener, port) = bind_local().await;
    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        expect_token(&mut stream, "PAUSE").await;
        expect_token(&mut stream, "STEP").await;
        expect_token(&mut stream, "GOTO4").await;
        expect_token(&mut stream, "UNPAUSE").await;
    });

    let mut graph = small_graph();
    graph.attach_runner(test_config(port)).await.unwrap();
    graph.pause_runner().await.unwrap();
    graph.step_runner().await.unwrap();
    graph.goto_runner(NodeId(4)).await.unwrap();
    graph.unpause_runner().await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn attach_fails_when_nothing_listens() {
    let (listener, port) = bind_local().await;
    drop(listener);

    let mut graph = small_graph();
    let result = graph.attach_runner(test_config(port)).await;
    assert!(result.is_err());
    assert!(graph.session().is_none());
}

#[tokio::test]
async fn kill_is_a_noop_for_attached_runners() {
    let (listener, port) = bind_local().await;
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;
        drop(stream);
    });

    let mut graph = small_graph();
    graph.attach_runner(test_config(port)).await.unwrap();
    // Not a slave session: the runner process is not ours to kill.
    graph.kill_runner().await.unwrap();
    assert!(graph.session().is_some());

    graph.detach_runner().await.unwrap();
    assert!(graph.session().is_none());
    server.abort();
}

#[tokio::test]
async fn detach_closes_the_socket() {
    let (listener, port) = bind_local().await;
    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 16];
        // A clean shutdown reads as EOF.
        let n = timeout(WAIT, stream.read(&mut buf)).await.unwrap().unwrap();
        assert_eq!(n, 0);
    });

    let mut graph = small_graph();
    graph.attach_runner(test_config(port)).await.unwrap();
    graph.detach_runner().await.unwrap();
    server.await.unwrap();
}
