//! 설정 관리 -- catcher.toml 파싱 및 런타임 설정
//!
//! [`CatcherConfig`]는 모든 모듈의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`CATCHER_SYSLOG_LISTEN=0.0.0.0:514` 형식)
//! 3. 설정 파일 (`catcher.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), catcher_core::error::CatcherError> {
//! use catcher_core::config::CatcherConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = CatcherConfig::load("catcher.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = CatcherConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{CatcherError, ConfigError};

/// UDP 데이터그램 최대 크기
const MAX_DATAGRAM_SIZE: usize = 65_535;

/// syslog-catcher 통합 설정
///
/// `catcher.toml` 파일의 최상위 구조를 나타냅니다.
/// 각 모듈은 자기 섹션만 읽어 사용합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatcherConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// syslog 수신 및 템플릿 설정
    #[serde(default)]
    pub syslog: SyslogConfig,
    /// 구독 브로커 설정
    #[serde(default)]
    pub broker: BrokerConfig,
    /// 이벤트 스트림 서버 설정
    #[serde(default)]
    pub stream: StreamConfig,
    /// Prometheus 메트릭 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl CatcherConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    ///
    /// 설정 로딩 순서:
    /// 1. TOML 파일 파싱
    /// 2. 환경변수 오버라이드 적용
    /// 3. 유효성 검증
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, CatcherError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, CatcherError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CatcherError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                CatcherError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, CatcherError> {
        toml::from_str(toml_str).map_err(|e| {
            CatcherError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `CATCHER_{SECTION}_{FIELD}`
    /// 예: `CATCHER_BROKER_QUEUE_CAPACITY=4096`
    ///
    /// 템플릿 목록은 순서가 의미를 가지므로 파일에서만 설정합니다.
    pub fn apply_env_overrides(&mut self) {
        env_override(&mut self.general.log_level, "CATCHER_GENERAL_LOG_LEVEL");
        env_override(&mut self.general.log_format, "CATCHER_GENERAL_LOG_FORMAT");
        env_override(&mut self.general.log_file, "CATCHER_GENERAL_LOG_FILE");
        env_override(&mut self.general.pid_file, "CATCHER_GENERAL_PID_FILE");

        env_override(&mut self.syslog.listen, "CATCHER_SYSLOG_LISTEN");
        env_override(&mut self.syslog.buf_size, "CATCHER_SYSLOG_BUF_SIZE");

        env_override(
            &mut self.broker.queue_capacity,
            "CATCHER_BROKER_QUEUE_CAPACITY",
        );
        env_override(
            &mut self.broker.overflow_policy,
            "CATCHER_BROKER_OVERFLOW_POLICY",
        );
        env_override(
            &mut self.broker.input_capacity,
            "CATCHER_BROKER_INPUT_CAPACITY",
        );

        env_override(&mut self.stream.listen, "CATCHER_STREAM_LISTEN");
        env_override(
            &mut self.stream.idle_timeout_secs,
            "CATCHER_STREAM_IDLE_TIMEOUT_SECS",
        );
        env_override(
            &mut self.stream.max_connections,
            "CATCHER_STREAM_MAX_CONNECTIONS",
        );

        env_override(&mut self.metrics.enabled, "CATCHER_METRICS_ENABLED");
        env_override(&mut self.metrics.listen_addr, "CATCHER_METRICS_LISTEN_ADDR");
        env_override(&mut self.metrics.port, "CATCHER_METRICS_PORT");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), CatcherError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        if self.syslog.listen.is_empty() {
            return Err(invalid("syslog.listen", "listen address must not be empty"));
        }

        if self.syslog.buf_size == 0 || self.syslog.buf_size > MAX_DATAGRAM_SIZE {
            return Err(invalid(
                "syslog.buf_size",
                format!("must be 1-{MAX_DATAGRAM_SIZE}"),
            ));
        }

        if self.syslog.templates.is_empty() {
            return Err(invalid(
                "syslog.templates",
                "at least one parsing template is required",
            ));
        }

        if self.broker.queue_capacity == 0 {
            return Err(invalid("broker.queue_capacity", "must be greater than 0"));
        }

        if self.broker.input_capacity == 0 {
            return Err(invalid("broker.input_capacity", "must be greater than 0"));
        }

        let valid_policies = ["drop_oldest", "drop_newest"];
        if !valid_policies.contains(&self.broker.overflow_policy.as_str()) {
            return Err(invalid(
                "broker.overflow_policy",
                format!("must be one of: {}", valid_policies.join(", ")),
            ));
        }

        if self.stream.listen.is_empty() {
            return Err(invalid("stream.listen", "listen address must not be empty"));
        }

        if self.stream.idle_timeout_secs == 0 {
            return Err(invalid("stream.idle_timeout_secs", "must be greater than 0"));
        }

        if self.stream.max_connections == 0 {
            return Err(invalid("stream.max_connections", "must be greater than 0"));
        }

        if self.metrics.enabled {
            if self.metrics.port == 0 {
                return Err(invalid(
                    "metrics.port",
                    "port must not be 0 when metrics are enabled",
                ));
            }
            if self.metrics.listen_addr.is_empty() {
                return Err(invalid(
                    "metrics.listen_addr",
                    "listen address must not be empty when metrics are enabled",
                ));
            }
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> CatcherError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: reason.into(),
    }
    .into()
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
    /// 추가 로그 파일 경로 (빈 문자열이면 stdout만 사용)
    pub log_file: String,
    /// PID 파일 경로 (빈 문자열이면 생성하지 않음)
    pub pid_file: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
            log_file: String::new(),
            pid_file: String::new(),
        }
    }
}

/// syslog 수신 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyslogConfig {
    /// UDP 수신 주소
    pub listen: String,
    /// 데이터그램 수신 버퍼 크기 (바이트)
    pub buf_size: usize,
    /// 파싱 템플릿 목록 (`"<keyword> ~ <template>"`), 순서가 매칭 우선순위
    pub templates: Vec<String>,
}

impl Default for SyslogConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:51514".to_owned(),
            buf_size: 2048,
            templates: default_templates(),
        }
    }
}

/// 기본 템플릿 세트
pub fn default_templates() -> Vec<String> {
    vec![
        "link_up ~ $device_addr$ - - - port $device_port$ change link state to up with $port_speed$ $port_duplex$".to_owned(),
        "link_down ~ $device_addr$ - - - port $device_port$ change link state to down".to_owned(),
        "loopdetect ~ $device_addr$ - - - port $device_port$ disabled by loop detect service".to_owned(),
    ]
}

/// 구독 브로커 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// 구독별 대기 큐 용량
    pub queue_capacity: usize,
    /// 큐 초과 시 정책 (drop_oldest, drop_newest)
    pub overflow_policy: String,
    /// 파서 -> 브로커 입력 채널 용량
    pub input_capacity: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            overflow_policy: "drop_oldest".to_owned(),
            input_capacity: 4096,
        }
    }
}

/// 이벤트 스트림 서버 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// TCP 수신 주소
    pub listen: String,
    /// 이벤트 없이 연결을 유지하는 최대 시간 (초)
    pub idle_timeout_secs: u64,
    /// 최대 동시 연결 수
    pub max_connections: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:61614".to_owned(),
            idle_timeout_secs: 180,
            max_connections: 256,
        }
    }
}

/// Prometheus 메트릭 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// HTTP 수신 주소
    pub listen_addr: String,
    /// HTTP 포트
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9100,
        }
    }
}

/// `env_key`가 설정되어 있고 `T`로 파싱되면 `target`을 덮어씁니다.
///
/// 파싱 실패는 경고만 남기고 기존 값을 유지합니다.
fn env_override<T: FromStr>(target: &mut T, env_key: &str) {
    let Ok(val) = std::env::var(env_key) else {
        return;
    };
    match val.parse::<T>() {
        Ok(parsed) => *target = parsed,
        Err(_) => warn!(
            env_key,
            value = val.as_str(),
            expected = std::any::type_name::<T>(),
            "ignoring unparsable env override"
        ),
    }
}
