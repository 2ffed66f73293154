//! catcher.toml 통합 설정 테스트
//!
//! - catcher.toml.example 파싱 테스트
//! - 부분 설정 (일부 섹션만) 로딩 테스트
//! - 환경변수 우선순위 테스트
//! - 파일 로딩 / 잘못된 형식 에러 테스트

use std::io::Write;

use catcher_core::config::{CatcherConfig, default_templates};
use catcher_core::error::{CatcherError, ConfigError};

// =============================================================================
// catcher.toml.example 파싱 테스트
// =============================================================================

#[test]
fn example_config_parses_successfully() {
    let content = include_str!("../../../catcher.toml.example");
    let config = CatcherConfig::parse(content).expect("example config should parse");

    assert_eq!(config.general.log_level, "info");
    assert_eq!(config.general.log_format, "json");
    assert!(config.general.log_file.is_empty());
}

#[test]
fn example_config_passes_validation() {
    let content = include_str!("../../../catcher.toml.example");
    let config = CatcherConfig::parse(content).expect("should parse");
    config
        .validate()
        .expect("example config should pass validation");
}

#[test]
fn example_config_matches_code_defaults() {
    let content = include_str!("../../../catcher.toml.example");
    let example = CatcherConfig::parse(content).expect("should parse");
    let defaults = CatcherConfig::default();

    assert_eq!(example.syslog.listen, defaults.syslog.listen);
    assert_eq!(example.syslog.buf_size, defaults.syslog.buf_size);
    assert_eq!(example.syslog.templates, default_templates());
    assert_eq!(example.broker.queue_capacity, defaults.broker.queue_capacity);
    assert_eq!(example.broker.overflow_policy, defaults.broker.overflow_policy);
    assert_eq!(example.broker.input_capacity, defaults.broker.input_capacity);
    assert_eq!(example.stream.listen, defaults.stream.listen);
    assert_eq!(
        example.stream.idle_timeout_secs,
        defaults.stream.idle_timeout_secs
    );
    assert_eq!(
        example.stream.max_connections,
        defaults.stream.max_connections
    );
    assert_eq!(example.metrics.enabled, defaults.metrics.enabled);
    assert_eq!(example.metrics.port, defaults.metrics.port);
}

// =============================================================================
// 부분 설정 테스트
// =============================================================================

#[test]
fn partial_config_stream_only() {
    let toml = r#"
[stream]
listen = "0.0.0.0:7000"
idle_timeout_secs = 30
"#;
    let config = CatcherConfig::parse(toml).expect("should parse");

    assert_eq!(config.stream.listen, "0.0.0.0:7000");
    assert_eq!(config.stream.idle_timeout_secs, 30);
    // 다른 섹션은 기본값
    assert_eq!(config.stream.max_connections, 256);
    assert_eq!(config.syslog.listen, "0.0.0.0:51514");
    config.validate().expect("should be valid");
}

#[test]
fn partial_config_syslog_templates_replace_defaults() {
    let toml = r#"
[syslog]
templates = ["link_down ~ $device_addr$ port $device_port$ down"]
"#;
    let config = CatcherConfig::parse(toml).expect("should parse");
    assert_eq!(config.syslog.templates.len(), 1);
    assert_eq!(config.syslog.buf_size, 2048);
}

#[test]
fn unknown_field_type_is_parse_error() {
    let toml = r#"
[broker]
queue_capacity = "lots"
"#;
    let err = CatcherConfig::parse(toml).expect_err("should fail");
    assert!(matches!(
        err,
        CatcherError::Config(ConfigError::ParseFailed { .. })
    ));
}

// =============================================================================
// 환경변수 오버라이드 테스트
// =============================================================================

#[test]
#[serial_test::serial]
fn env_override_takes_precedence_over_toml() {
    let toml = r#"
[general]
log_level = "warn"
"#;

    let original = std::env::var("CATCHER_GENERAL_LOG_LEVEL").ok();
    // SAFETY: serial_test로 직렬화되어 환경변수 조작이 안전합니다.
    unsafe {
        std::env::set_var("CATCHER_GENERAL_LOG_LEVEL", "error");
    }

    let mut config = CatcherConfig::parse(toml).expect("should parse");
    config.apply_env_overrides();
    let result = config.general.log_level.clone();

    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var("CATCHER_GENERAL_LOG_LEVEL", val),
            None => std::env::remove_var("CATCHER_GENERAL_LOG_LEVEL"),
        }
    }

    assert_eq!(result, "error");
}

#[test]
#[serial_test::serial]
fn env_override_numeric_field() {
    let original = std::env::var("CATCHER_BROKER_QUEUE_CAPACITY").ok();
    // SAFETY: serial_test로 직렬화되어 환경변수 조작이 안전합니다.
    unsafe {
        std::env::set_var("CATCHER_BROKER_QUEUE_CAPACITY", "64");
    }

    let mut config = CatcherConfig::parse("").expect("should parse");
    config.apply_env_overrides();
    let result = config.broker.queue_capacity;

    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var("CATCHER_BROKER_QUEUE_CAPACITY", val),
            None => std::env::remove_var("CATCHER_BROKER_QUEUE_CAPACITY"),
        }
    }

    assert_eq!(result, 64);
}

#[test]
#[serial_test::serial]
fn env_override_invalid_numeric_keeps_toml_value() {
    let toml = r#"
[stream]
idle_timeout_secs = 45
"#;

    let original = std::env::var("CATCHER_STREAM_IDLE_TIMEOUT_SECS").ok();
    // SAFETY: serial_test로 직렬화되어 환경변수 조작이 안전합니다.
    unsafe {
        std::env::set_var("CATCHER_STREAM_IDLE_TIMEOUT_SECS", "soon");
    }

    let mut config = CatcherConfig::parse(toml).expect("should parse");
    config.apply_env_overrides();
    let result = config.stream.idle_timeout_secs;

    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var("CATCHER_STREAM_IDLE_TIMEOUT_SECS", val),
            None => std::env::remove_var("CATCHER_STREAM_IDLE_TIMEOUT_SECS"),
        }
    }

    assert_eq!(result, 45);
}

#[test]
#[serial_test::serial]
fn env_override_metrics_enabled() {
    let original = std::env::var("CATCHER_METRICS_ENABLED").ok();
    // SAFETY: serial_test로 직렬화되어 환경변수 조작이 안전합니다.
    unsafe {
        std::env::set_var("CATCHER_METRICS_ENABLED", "true");
    }

    let mut config = CatcherConfig::parse("").expect("should parse");
    config.apply_env_overrides();
    let result = config.metrics.enabled;

    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var("CATCHER_METRICS_ENABLED", val),
            None => std::env::remove_var("CATCHER_METRICS_ENABLED"),
        }
    }

    assert!(result);
}

// =============================================================================
// 파일 로딩 테스트
// =============================================================================

#[tokio::test]
#[serial_test::serial]
async fn load_from_file_applies_validation() {
    let mut file = tempfile::NamedTempFile::new().expect("should create temp file");
    writeln!(
        file,
        r#"
[broker]
overflow_policy = "block_forever"
"#
    )
    .expect("should write config");

    let err = CatcherConfig::load(file.path())
        .await
        .expect_err("invalid policy should be rejected");
    assert!(err.to_string().contains("overflow_policy"));
}

#[tokio::test]
#[serial_test::serial]
async fn load_from_file_success() {
    let mut file = tempfile::NamedTempFile::new().expect("should create temp file");
    writeln!(
        file,
        r#"
[general]
log_format = "pretty"

[syslog]
listen = "127.0.0.1:5514"
"#
    )
    .expect("should write config");

    let config = CatcherConfig::load(file.path())
        .await
        .expect("config should load");
    assert_eq!(config.general.log_format, "pretty");
    assert_eq!(config.syslog.listen, "127.0.0.1:5514");
}

#[tokio::test]
async fn load_missing_file_is_file_not_found() {
    let err = CatcherConfig::load("/nonexistent/catcher.toml")
        .await
        .expect_err("should fail");
    assert!(matches!(
        err,
        CatcherError::Config(ConfigError::FileNotFound { .. })
    ));
}
