//! End-to-end flow: UDP syslog in, subscribed TCP stream out.
//!
//! Each test runs a full orchestrator on loopback ports chosen by the OS.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpStream, UdpSocket};
use tokio::time::timeout;

use catcher_core::config::CatcherConfig;
use catcher_core::event::{EventKind, PortDuplex, PortSpeed};
use catcher_core::stream::StreamMessage;
use catcher_daemon::orchestrator::Orchestrator;

fn loopback_config() -> CatcherConfig {
    let mut config = CatcherConfig::default();
    config.syslog.listen = "127.0.0.1:0".to_owned();
    config.stream.listen = "127.0.0.1:0".to_owned();
    config
}

async fn started() -> (Orchestrator, SocketAddr, SocketAddr) {
    let mut orchestrator = Orchestrator::build_from_config(loopback_config())
        .await
        .expect("build orchestrator");
    orchestrator.start().await.expect("start orchestrator");
    let syslog = orchestrator.syslog_addr().expect("syslog bound");
    let stream = orchestrator.stream_addr().expect("stream bound");
    (orchestrator, syslog, stream)
}

async fn subscribe(stream_addr: SocketAddr, request: &str) -> BufReader<TcpStream> {
    let mut stream = TcpStream::connect(stream_addr).await.expect("connect");
    stream.write_all(request.as_bytes()).await.expect("send request");
    stream.write_all(b"\n").await.expect("send newline");
    BufReader::new(stream)
}

async fn next_message(reader: &mut BufReader<TcpStream>) -> Option<StreamMessage> {
    let mut line = String::new();
    let n = timeout(Duration::from_secs(3), reader.read_line(&mut line))
        .await
        .expect("message within timeout")
        .expect("read line");
    (n > 0).then(|| serde_json::from_str(line.trim()).expect("valid JSON line"))
}

async fn wait_for_subscriptions(orchestrator: &Orchestrator, count: usize) {
    timeout(Duration::from_secs(3), async {
        while orchestrator.broker().subscription_count() != count {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("subscription count should settle");
}

#[tokio::test]
async fn test_udp_line_reaches_stream_subscriber() {
    let (mut orchestrator, syslog_addr, stream_addr) = started().await;

    let mut client = subscribe(
        stream_addr,
        r#"{"client_name":"noc","events":["port_up","port_down"],"nets":["192.168.1.0/24"]}"#,
    )
    .await;
    wait_for_subscriptions(&orchestrator, 1).await;

    let sender = UdpSocket::bind("127.0.0.1:0").await.expect("bind sender");
    let lines = [
        // outside the subscribed network
        "10.0.0.1 - - - port 3 change link state to down",
        // not a known format
        "192.168.1.50 - - - fan speed nominal",
        // delivered
        "192.168.1.105 - - - port 7 change link state to up with 1000mb full-duplex",
    ];
    for line in lines {
        sender.send_to(line.as_bytes(), syslog_addr).await.expect("send");
    }

    match next_message(&mut client).await {
        Some(StreamMessage::Event(event)) => {
            assert_eq!(event.kind, EventKind::PortUp);
            assert_eq!(event.host, "192.168.1.105");
            assert_eq!(event.port, 7);
            assert_eq!(event.speed, PortSpeed::Speed1Gb);
            assert_eq!(event.duplex, PortDuplex::Full);
        }
        other => panic!("expected port_up event, got {other:?}"),
    }

    orchestrator.shutdown().await.expect("shutdown");
    assert!(next_message(&mut client).await.is_none());
}

#[tokio::test]
async fn test_rejected_subscription_keeps_daemon_healthy() {
    let (mut orchestrator, _syslog_addr, stream_addr) = started().await;

    let mut bad = subscribe(stream_addr, r#"{"client_name":"noc","events":["port_up"],"nets":["300.0.0.0/8"]}"#).await;
    assert!(matches!(next_message(&mut bad).await, Some(StreamMessage::Error(_))));
    assert_eq!(orchestrator.broker().subscription_count(), 0);
    assert!(orchestrator.health().await.status.is_healthy());

    orchestrator.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn test_multiple_subscribers_get_their_own_copy() {
    let (mut orchestrator, syslog_addr, stream_addr) = started().await;

    let mut a = subscribe(stream_addr, r#"{"client_name":"a","events":["port_down"]}"#).await;
    let mut b = subscribe(stream_addr, r#"{"client_name":"b","events":["port_down"],"nets":["172.16.0.0/12"]}"#).await;
    wait_for_subscriptions(&orchestrator, 2).await;

    let sender = UdpSocket::bind("127.0.0.1:0").await.expect("bind sender");
    sender
        .send_to(b"172.16.4.4 - - - port 12 change link state to down", syslog_addr)
        .await
        .expect("send");

    for client in [&mut a, &mut b] {
        match next_message(client).await {
            Some(StreamMessage::Event(event)) => {
                assert_eq!(event.kind, EventKind::PortDown);
                assert_eq!(event.port, 12);
            }
            other => panic!("expected port_down event, got {other:?}"),
        }
    }

    let stats = orchestrator.broker().stats();
    assert_eq!(stats.published, 1);
    assert_eq!(stats.delivered, 2);

    orchestrator.shutdown().await.expect("shutdown");
}
