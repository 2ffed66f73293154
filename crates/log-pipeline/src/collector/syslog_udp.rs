//! UDP Syslog 수집기
//!
//! 장비가 보내는 syslog 메시지를 UDP 소켓으로 수신합니다.
//! 각 UDP 데이터그램을 하나의 로그 라인으로 취급합니다.

use std::net::SocketAddr;

use bytes::Bytes;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::RawLog;
use crate::error::LogPipelineError;

/// UDP syslog 수집기 설정
#[derive(Debug, Clone)]
pub struct SyslogUdpConfig {
    /// 바인드 주소 (예: "0.0.0.0:51514")
    pub bind_addr: String,
    /// 데이터그램 수신 버퍼 크기 (바이트). 초과분은 잘립니다.
    pub buf_size: usize,
}

impl Default for SyslogUdpConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:51514".to_owned(),
            buf_size: 2048,
        }
    }
}

/// UDP Syslog 수집기
///
/// [`bind`](Self::bind)로 소켓을 연 뒤 [`run`](Self::run)을 별도 태스크에서 실행합니다.
/// 취소 토큰이 취소되거나 수신 채널이 닫히면 종료합니다.
pub struct SyslogUdpCollector {
    /// 수집기 설정
    config: SyslogUdpConfig,
    /// 바인드된 소켓
    socket: UdpSocket,
    /// 실제 바인드 주소 (포트 0 바인드 시 확정된 포트 포함)
    local_addr: SocketAddr,
    /// 수집된 로그 전송 채널
    tx: mpsc::Sender<RawLog>,
    /// Cancellation token for graceful shutdown
    cancel_token: CancellationToken,
}

impl SyslogUdpCollector {
    /// 소켓을 바인드하고 수집기를 생성합니다.
    pub async fn bind(
        config: SyslogUdpConfig,
        tx: mpsc::Sender<RawLog>,
        cancel_token: CancellationToken,
    ) -> Result<Self, LogPipelineError> {
        let socket = UdpSocket::bind(&config.bind_addr)
            .await
            .map_err(|e| LogPipelineError::Collector {
                source_type: "syslog_udp".to_owned(),
                reason: format!("failed to bind to {}: {}", config.bind_addr, e),
            })?;
        let local_addr = socket.local_addr()?;

        info!(%local_addr, "UDP syslog collector bound");

        Ok(Self {
            config,
            socket,
            local_addr,
            tx,
            cancel_token,
        })
    }

    /// 실제 바인드 주소를 반환합니다.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// 수신 루프를 실행합니다.
    ///
    /// 수신 에러는 기록만 하고 계속 진행합니다.
    pub async fn run(self) -> Result<(), LogPipelineError> {
        let mut buf = vec![0u8; self.config.buf_size];
        let mut datagrams: u64 = 0;

        loop {
            tokio::select! {
                result = self.socket.recv_from(&mut buf) => {
                    let (len, peer) = match result {
                        Ok(received) => received,
                        Err(e) => {
                            warn!(error = %e, "UDP syslog receive failed");
                            continue;
                        }
                    };
                    datagrams += 1;

                    let raw_log = RawLog::new(
                        Bytes::copy_from_slice(&buf[..len]),
                        format!("syslog_udp:{peer}"),
                    );
                    if self.tx.send(raw_log).await.is_err() {
                        debug!("raw log receiver dropped, stopping UDP collector");
                        break;
                    }
                }
                _ = self.cancel_token.cancelled() => {
                    debug!("UDP syslog collector received shutdown signal");
                    break;
                }
            }
        }

        info!(
            local_addr = %self.local_addr,
            datagrams,
            "UDP syslog collector stopped"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    fn loopback_config() -> SyslogUdpConfig {
        SyslogUdpConfig {
            bind_addr: "127.0.0.1:0".to_owned(),
            buf_size: 2048,
        }
    }

    #[test]
    fn default_config() {
        let config = SyslogUdpConfig::default();
        assert_eq!(config.bind_addr, "0.0.0.0:51514");
        assert_eq!(config.buf_size, 2048);
    }

    #[tokio::test]
    async fn bind_reports_ephemeral_port() {
        let (tx, _rx) = mpsc::channel(10);
        let collector = SyslogUdpCollector::bind(loopback_config(), tx, CancellationToken::new())
            .await
            .expect("should bind");
        assert_ne!(collector.local_addr().port(), 0);
    }

    #[tokio::test]
    async fn bind_invalid_address_fails() {
        let (tx, _rx) = mpsc::channel(10);
        let config = SyslogUdpConfig {
            bind_addr: "not-an-address".to_owned(),
            ..loopback_config()
        };
        let result = SyslogUdpCollector::bind(config, tx, CancellationToken::new()).await;
        assert!(matches!(result, Err(LogPipelineError::Collector { .. })));
    }

    #[tokio::test]
    async fn receives_datagrams_until_cancelled() {
        let (tx, mut rx) = mpsc::channel(10);
        let cancel = CancellationToken::new();
        let collector = SyslogUdpCollector::bind(loopback_config(), tx, cancel.clone())
            .await
            .expect("should bind");
        let addr = collector.local_addr();
        let handle = tokio::spawn(collector.run());

        let sender = UdpSocket::bind("127.0.0.1:0").await.expect("should bind sender");
        sender
            .send_to(b"192.168.1.105 - - - port 7 change link state to down\n", addr)
            .await
            .expect("should send");

        let raw = timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("should receive within timeout")
            .expect("channel should be open");
        assert_eq!(raw.line(), "192.168.1.105 - - - port 7 change link state to down");
        assert!(raw.source.starts_with("syslog_udp:127.0.0.1:"));

        cancel.cancel();
        timeout(Duration::from_secs(1), handle)
            .await
            .expect("collector should stop")
            .expect("task should not panic")
            .expect("collector should exit cleanly");
    }

    #[tokio::test]
    async fn oversized_datagram_is_truncated() {
        let (tx, mut rx) = mpsc::channel(10);
        let cancel = CancellationToken::new();
        let config = SyslogUdpConfig {
            buf_size: 8,
            ..loopback_config()
        };
        let collector = SyslogUdpCollector::bind(config, tx, cancel.clone())
            .await
            .expect("should bind");
        let addr = collector.local_addr();
        tokio::spawn(collector.run());

        let sender = UdpSocket::bind("127.0.0.1:0").await.expect("should bind sender");
        sender
            .send_to(b"0123456789abcdef", addr)
            .await
            .expect("should send");

        let raw = timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("should receive within timeout")
            .expect("channel should be open");
        assert_eq!(raw.data.len(), 8);
        cancel.cancel();
    }

    #[tokio::test]
    async fn stops_when_receiver_dropped() {
        let (tx, rx) = mpsc::channel(1);
        let collector = SyslogUdpCollector::bind(loopback_config(), tx, CancellationToken::new())
            .await
            .expect("should bind");
        let addr = collector.local_addr();
        let handle = tokio::spawn(collector.run());
        drop(rx);

        let sender = UdpSocket::bind("127.0.0.1:0").await.expect("should bind sender");
        sender.send_to(b"line", addr).await.expect("should send");

        timeout(Duration::from_secs(1), handle)
            .await
            .expect("collector should stop")
            .expect("task should not panic")
            .expect("collector should exit cleanly");
    }
}
