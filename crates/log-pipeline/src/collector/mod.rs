//! 로그 수집 모듈 -- 네트워크 장비가 보내는 원시 syslog 라인을 수집합니다.
//!
//! # 수집 소스
//! - [`SyslogUdpCollector`]: UDP syslog 수신 (데이터그램 1개 = 라인 1개)
//!
//! # 아키텍처
//! 수집기는 자체 tokio 태스크에서 실행되며, 수집된 원시 로그를
//! `tokio::mpsc::Sender<RawLog>` 채널을 통해 파이프라인으로 전달합니다.

pub mod syslog_udp;

pub use syslog_udp::{SyslogUdpCollector, SyslogUdpConfig};

use bytes::Bytes;

/// 수집된 원시 로그 데이터
///
/// 수집기가 생성하고, 파서가 소비하는 중간 데이터 형식입니다.
#[derive(Debug, Clone)]
pub struct RawLog {
    /// 원시 로그 바이트
    pub data: Bytes,
    /// 수집 소스 식별자 (예: "syslog_udp:192.168.1.99:514")
    pub source: String,
    /// 수집 시각
    pub received_at: std::time::SystemTime,
}

impl RawLog {
    /// 새 RawLog를 생성합니다.
    pub fn new(data: Bytes, source: impl Into<String>) -> Self {
        Self {
            data,
            source: source.into(),
            received_at: std::time::SystemTime::now(),
        }
    }

    /// 파서에 넘길 텍스트 라인을 반환합니다.
    ///
    /// 잘못된 UTF-8은 대체 문자로 바꾸고, 끝의 공백/개행/NUL은 제거합니다.
    pub fn line(&self) -> String {
        String::from_utf8_lossy(&self.data)
            .trim_end_matches(|c: char| c.is_whitespace() || c == '\0')
            .to_owned()
    }
}
