//! 로그 파이프라인 에러 타입
//!
//! [`LogPipelineError`]는 템플릿 컴파일, 수집, 채널 통신 등 파이프라인 구성과
//! 실행 중 발생하는 에러를 표현합니다. 라인 단위 파싱 실패는 core의
//! [`ParseError`](catcher_core::error::ParseError)로 따로 다룹니다.
//!
//! `From<LogPipelineError> for CatcherError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use catcher_core::error::{CatcherError, PipelineError};

/// 로그 파이프라인 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum LogPipelineError {
    /// 템플릿 컴파일 실패
    #[error("template error: '{template}': {reason}")]
    Template {
        /// 문제가 된 설정 항목
        template: String,
        /// 실패 사유
        reason: String,
    },

    /// 수집기 에러 (소켓 바인드, 수신 등)
    #[error("collector error: {source_type}: {reason}")]
    Collector {
        /// 수집 소스 유형 (syslog_udp)
        source_type: String,
        /// 에러 사유
        reason: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 채널 통신 에러
    #[error("channel error: {0}")]
    Channel(String),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LogPipelineError> for CatcherError {
    fn from(err: LogPipelineError) -> Self {
        CatcherError::Pipeline(PipelineError::InitFailed(err.to_string()))
    }
}
