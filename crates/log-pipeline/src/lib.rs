#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`collector`]: UDP syslog 수신
//! - [`parser`]: 템플릿 컴파일 및 arity 버킷 기반 라인 파싱
//! - [`pipeline`]: 전체 파이프라인 오케스트레이션 (Pipeline trait 구현)
//! - [`config`]: 파이프라인 설정 (core 설정 확장)
//! - [`error`]: 도메인 에러 타입
//!
//! # 아키텍처
//!
//! ```text
//! SyslogUdpCollector -> processing loop -> TemplateParser -> mpsc<Event> -> broker
//!        |                    |                  |
//!   UDP datagram       라인별 파싱 태스크     arity 버킷 + 설정 순서
//! ```

pub mod config;
pub mod error;
pub mod pipeline;

pub mod collector;
pub mod parser;

// --- 주요 타입 re-export ---

// 파이프라인
pub use pipeline::{LogPipeline, LogPipelineBuilder, PipelineStats};

// 설정
pub use config::{PipelineConfig, PipelineConfigBuilder};

// 에러
pub use error::LogPipelineError;

// 파서
pub use parser::{TemplateParser, Vocabulary};

// 수집기
pub use collector::{RawLog, SyslogUdpCollector, SyslogUdpConfig};
