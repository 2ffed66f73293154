//! 에러 타입 -- 도메인별 에러 정의

/// syslog-catcher 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum CatcherError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 파이프라인 처리 에러
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// 로그 라인 파싱 에러
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// 구독 브로커 에러
    #[error("broker error: {0}")]
    Broker(String),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 파이프라인 처리 에러
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 파이프라인 초기화 실패
    #[error("pipeline init failed: {0}")]
    InitFailed(String),

    /// 이미 실행 중인 파이프라인을 다시 시작
    #[error("pipeline already running")]
    AlreadyRunning,

    /// 실행 중이 아닌 파이프라인을 정지
    #[error("pipeline not running")]
    NotRunning,
}

/// 로그 라인 파싱 에러
///
/// 두 변형 모두 해당 라인에 대해서만 유효하며, 수집은 계속됩니다.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// 토큰 수에 맞는 템플릿이 없거나, 어떤 템플릿의 리터럴과도 일치하지 않음
    #[error("line has unknown format: \"{line}\"")]
    UnknownFormat { line: String },

    /// 템플릿 구조는 일치했지만 플레이스홀더 값 추출에 실패
    #[error("malformed {field} field '{token}': {reason}")]
    MalformedField {
        /// 실패한 플레이스홀더 이름 (device_addr, device_port, ...)
        field: String,
        /// 입력 토큰
        token: String,
        /// 실패 사유
        reason: String,
    },
}

impl ParseError {
    /// 메트릭 레이블용 사유 문자열
    pub fn reason_label(&self) -> &'static str {
        match self {
            Self::UnknownFormat { .. } => "unknown_format",
            Self::MalformedField { .. } => "malformed_field",
        }
    }
}

/// CIDR 표기 네트워크 파싱 에러
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid network '{input}': {reason}")]
pub struct NetworkParseError {
    /// 입력 문자열
    pub input: String,
    /// 실패 사유
    pub reason: String,
}
