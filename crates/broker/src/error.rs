//! 브로커 에러 타입
//!
//! 구독 요청 거부와 설정 오류를 표현합니다. 발행(publish)은 실패하지 않으므로
//! 여기에 해당하는 변형이 없습니다.

use catcher_core::error::CatcherError;

/// 브로커 도메인 에러
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BrokerError {
    /// 구독할 이벤트 종류가 하나도 없음
    #[error("subscription rejected: at least one event kind is required")]
    EmptyKinds,

    /// 네트워크 필터 항목이 CIDR 형식이 아님
    #[error("subscription rejected: invalid network '{input}': {reason}")]
    InvalidCidr {
        /// 문제가 된 입력
        input: String,
        /// 실패 사유
        reason: String,
    },

    /// 브로커가 이미 닫힘
    #[error("broker is closed")]
    Closed,

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },
}

impl From<catcher_core::error::NetworkParseError> for BrokerError {
    fn from(err: catcher_core::error::NetworkParseError) -> Self {
        BrokerError::InvalidCidr {
            input: err.input,
            reason: err.reason,
        }
    }
}

impl From<BrokerError> for CatcherError {
    fn from(err: BrokerError) -> Self {
        CatcherError::Broker(err.to_string())
    }
}
