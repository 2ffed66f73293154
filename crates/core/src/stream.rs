//! 이벤트 스트림 프로토콜 메시지
//!
//! 데몬의 스트림 서버와 CLI 구독 클라이언트가 공유하는 줄 단위 JSON 메시지입니다.
//!
//! ```text
//! client -> server : {"client_name":"noc","events":["port_down"],"nets":["192.168.1.0/24"]}\n
//! server -> client : {"kind":"port_down","host":"192.168.1.105","port":7,"speed":"unknown","duplex":"unknown"}\n
//!                    ...
//! server -> client : {"error":"..."}\n   (거부 시 한 줄 후 종료)
//! ```

use serde::{Deserialize, Serialize};

use crate::event::{Event, EventKind};

/// 구독 요청 (연결 직후 클라이언트가 보내는 첫 줄)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeRequest {
    /// 클라이언트 이름 (구독 식별자 접두사)
    pub client_name: String,
    /// 구독할 이벤트 종류 이름
    #[serde(default)]
    pub events: Vec<String>,
    /// CIDR 네트워크 필터 (비어 있으면 전체)
    #[serde(default)]
    pub nets: Vec<String>,
}

impl SubscribeRequest {
    /// 이벤트 종류 이름을 해석합니다.
    ///
    /// 하나라도 알 수 없는 이름이면 그 이름을 담아 실패합니다.
    pub fn kinds(&self) -> Result<Vec<EventKind>, String> {
        self.events
            .iter()
            .map(|name| {
                EventKind::from_str_loose(name)
                    .ok_or_else(|| format!("unknown event kind '{name}'"))
            })
            .collect()
    }
}

/// 거부 응답
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// 거부 사유
    pub error: String,
}

/// 서버가 보내는 한 줄
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StreamMessage {
    /// 구독 거부
    Error(ErrorResponse),
    /// 이벤트
    Event(Event),
}
