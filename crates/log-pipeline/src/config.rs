//! 로그 파이프라인 설정
//!
//! [`PipelineConfig`]는 core의 [`SyslogConfig`](catcher_core::config::SyslogConfig)를
//! 기반으로 수집/파싱 경로 전용 설정을 제공합니다.
//!
//! # 사용 예시
//! ```ignore
//! use catcher_core::config::CatcherConfig;
//! use catcher_log_pipeline::config::PipelineConfig;
//!
//! let core_config = CatcherConfig::default();
//! let config = PipelineConfig::from_core(&core_config.syslog);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::LogPipelineError;

/// UDP 데이터그램 최대 크기
const MAX_DATAGRAM_SIZE: usize = 65_535;

/// 로그 파이프라인 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// UDP syslog 바인드 주소
    pub syslog_bind: String,
    /// 데이터그램 수신 버퍼 크기 (바이트)
    pub buf_size: usize,
    /// 파싱 템플릿 (설정 순서 = 매칭 우선순위)
    pub templates: Vec<String>,

    // --- 확장 설정 (core에 없는 추가 필드) ---
    /// 수집기 -> 파서 원시 로그 채널 용량
    pub raw_channel_capacity: usize,
    /// 동시에 진행 중인 파싱 태스크 상한
    ///
    /// 모두 사용 중이면 원시 로그 수신을 멈추므로, 이벤트 채널이 막히면
    /// 수집기까지 역압이 전달됩니다.
    pub max_inflight_parses: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            syslog_bind: "0.0.0.0:51514".to_owned(),
            buf_size: 2048,
            templates: catcher_core::config::default_templates(),
            raw_channel_capacity: 4096,
            max_inflight_parses: 1024,
        }
    }
}

impl PipelineConfig {
    /// core의 `SyslogConfig`에서 파이프라인 설정을 생성합니다.
    ///
    /// core 설정에 없는 확장 필드는 기본값이 적용됩니다.
    pub fn from_core(core: &catcher_core::config::SyslogConfig) -> Self {
        Self {
            syslog_bind: core.listen.clone(),
            buf_size: core.buf_size,
            templates: core.templates.clone(),
            ..Self::default()
        }
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), LogPipelineError> {
        const MAX_CHANNEL_CAPACITY: usize = 1_000_000;

        if self.syslog_bind.is_empty() {
            return Err(LogPipelineError::Config {
                field: "syslog_bind".to_owned(),
                reason: "bind address must not be empty".to_owned(),
            });
        }

        if self.buf_size == 0 || self.buf_size > MAX_DATAGRAM_SIZE {
            return Err(LogPipelineError::Config {
                field: "buf_size".to_owned(),
                reason: format!("must be 1-{}", MAX_DATAGRAM_SIZE),
            });
        }

        if self.templates.is_empty() {
            return Err(LogPipelineError::Config {
                field: "templates".to_owned(),
                reason: "at least one template must be configured".to_owned(),
            });
        }

        if self.raw_channel_capacity == 0 || self.raw_channel_capacity > MAX_CHANNEL_CAPACITY {
            return Err(LogPipelineError::Config {
                field: "raw_channel_capacity".to_owned(),
                reason: format!("must be 1-{}", MAX_CHANNEL_CAPACITY),
            });
        }

        if self.max_inflight_parses == 0 || self.max_inflight_parses > MAX_CHANNEL_CAPACITY {
            return Err(LogPipelineError::Config {
                field: "max_inflight_parses".to_owned(),
                reason: format!("must be 1-{}", MAX_CHANNEL_CAPACITY),
            });
        }

        Ok(())
    }
}

/// 파이프라인 설정 빌더
#[derive(Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// Syslog 바인드 주소를 설정합니다.
    pub fn syslog_bind(mut self, bind: impl Into<String>) -> Self {
        self.config.syslog_bind = bind.into();
        self
    }

    /// 수신 버퍼 크기를 설정합니다.
    pub fn buf_size(mut self, size: usize) -> Self {
        self.config.buf_size = size;
        self
    }

    /// 파싱 템플릿을 설정합니다.
    pub fn templates(mut self, templates: Vec<String>) -> Self {
        self.config.templates = templates;
        self
    }

    /// 원시 로그 채널 용량을 설정합니다.
    pub fn raw_channel_capacity(mut self, capacity: usize) -> Self {
        self.config.raw_channel_capacity = capacity;
        self
    }

    /// 동시 파싱 태스크 상한을 설정합니다.
    pub fn max_inflight_parses(mut self, limit: usize) -> Self {
        self.config.max_inflight_parses = limit;
        self
    }

    /// 설정을 검증하고 `PipelineConfig`를 생성합니다.
    pub fn build(self) -> Result<PipelineConfig, LogPipelineError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
