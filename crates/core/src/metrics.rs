//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 크레이트는 이 상수로 `metrics::counter!()`, `metrics::gauge!()`,
//! `metrics::histogram!()` 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `catcher_`
//! - 모듈명: `syslog_`, `broker_`, `stream_`, `daemon_`
//! - 접미어: `_total` (counter), `_seconds` (histogram/latency), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(catcher_core::metrics::SYSLOG_LINES_RECEIVED_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 파싱 실패 사유 레이블 키 (unknown_format, malformed_field)
pub const LABEL_REASON: &str = "reason";

/// 이벤트 종류 레이블 키 (port_up, port_down, ...)
pub const LABEL_KIND: &str = "kind";

// ─── Syslog 수집/파싱 메트릭 ────────────────────────────────────────

/// Syslog: 수신된 전체 라인 수 (counter)
pub const SYSLOG_LINES_RECEIVED_TOTAL: &str = "catcher_syslog_lines_received_total";

/// Syslog: 이벤트로 파싱된 라인 수 (counter, label: kind)
pub const SYSLOG_EVENTS_PARSED_TOTAL: &str = "catcher_syslog_events_parsed_total";

/// Syslog: 파싱 실패 수 (counter, label: reason)
pub const SYSLOG_PARSE_ERRORS_TOTAL: &str = "catcher_syslog_parse_errors_total";

/// Syslog: 라인 파싱 소요 시간 (histogram, 초)
pub const SYSLOG_PARSE_DURATION_SECONDS: &str = "catcher_syslog_parse_duration_seconds";

// ─── Broker 메트릭 ─────────────────────────────────────────────────

/// Broker: 발행된 이벤트 수 (counter)
pub const BROKER_EVENTS_PUBLISHED_TOTAL: &str = "catcher_broker_events_published_total";

/// Broker: 구독 큐에 전달된 이벤트 수 (counter)
pub const BROKER_EVENTS_DELIVERED_TOTAL: &str = "catcher_broker_events_delivered_total";

/// Broker: 큐 초과로 드롭된 이벤트 수 (counter)
pub const BROKER_EVENTS_DROPPED_TOTAL: &str = "catcher_broker_events_dropped_total";

/// Broker: 활성 구독 수 (gauge)
pub const BROKER_ACTIVE_SUBSCRIPTIONS: &str = "catcher_broker_active_subscriptions";

// ─── Stream 서버 메트릭 ─────────────────────────────────────────────

/// Stream: 수락된 연결 수 (counter)
pub const STREAM_CONNECTIONS_TOTAL: &str = "catcher_stream_connections_total";

/// Stream: 거부된 구독 요청 수 (counter)
pub const STREAM_REJECTED_TOTAL: &str = "catcher_stream_rejected_total";

// ─── Daemon 메트릭 ──────────────────────────────────────────────────

/// Daemon: 가동 시간 (gauge, 초)
pub const DAEMON_UPTIME_SECONDS: &str = "catcher_daemon_uptime_seconds";

/// Daemon: 빌드 정보 (gauge, 항상 1, label: version)
pub const DAEMON_BUILD_INFO: &str = "catcher_daemon_build_info";

// ─── 히스토그램 버킷 정의 ────────────────────────────────────────────

/// 라인 파싱 지연 시간 히스토그램 버킷 (초)
///
/// 1us ~ 10ms 범위
pub const PARSE_DURATION_BUCKETS: [f64; 8] = [
    0.000_001, 0.000_005, 0.000_01, 0.000_05, 0.000_1, 0.000_5, 0.001, 0.01,
];

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더 설치 후 한 번 호출합니다. 레코더가 없어도 패닉하지 않습니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    // Syslog
    describe_counter!(
        SYSLOG_LINES_RECEIVED_TOTAL,
        "Total number of raw syslog lines received"
    );
    describe_counter!(
        SYSLOG_EVENTS_PARSED_TOTAL,
        "Lines successfully parsed into events, per event kind"
    );
    describe_counter!(
        SYSLOG_PARSE_ERRORS_TOTAL,
        "Lines that failed to parse (unknown_format, malformed_field)"
    );
    describe_histogram!(
        SYSLOG_PARSE_DURATION_SECONDS,
        "Template matching latency per line in seconds"
    );

    // Broker
    describe_counter!(
        BROKER_EVENTS_PUBLISHED_TOTAL,
        "Events published to the subscription broker"
    );
    describe_counter!(
        BROKER_EVENTS_DELIVERED_TOTAL,
        "Events enqueued to matching subscriptions"
    );
    describe_counter!(
        BROKER_EVENTS_DROPPED_TOTAL,
        "Events dropped because a subscription queue was full"
    );
    describe_gauge!(
        BROKER_ACTIVE_SUBSCRIPTIONS,
        "Number of currently registered subscriptions"
    );

    // Stream
    describe_counter!(
        STREAM_CONNECTIONS_TOTAL,
        "Stream client connections accepted"
    );
    describe_counter!(
        STREAM_REJECTED_TOTAL,
        "Stream subscribe requests rejected (bad request or connection limit)"
    );

    // Daemon
    describe_gauge!(DAEMON_UPTIME_SECONDS, "Daemon uptime in seconds");
    describe_gauge!(
        DAEMON_BUILD_INFO,
        "Build information (always 1, with version label)"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_METRIC_NAMES: &[&str] = &[
        SYSLOG_LINES_RECEIVED_TOTAL,
        SYSLOG_EVENTS_PARSED_TOTAL,
        SYSLOG_PARSE_ERRORS_TOTAL,
        SYSLOG_PARSE_DURATION_SECONDS,
        BROKER_EVENTS_PUBLISHED_TOTAL,
        BROKER_EVENTS_DELIVERED_TOTAL,
        BROKER_EVENTS_DROPPED_TOTAL,
        BROKER_ACTIVE_SUBSCRIPTIONS,
        STREAM_CONNECTIONS_TOTAL,
        STREAM_REJECTED_TOTAL,
        DAEMON_UPTIME_SECONDS,
        DAEMON_BUILD_INFO,
    ];

    #[test]
    fn all_metrics_start_with_catcher_prefix() {
        for name in ALL_METRIC_NAMES {
            assert!(
                name.starts_with("catcher_"),
                "Metric '{}' does not start with 'catcher_' prefix",
                name
            );
        }
    }

    #[test]
    fn counters_end_with_total() {
        let counters = [
            SYSLOG_LINES_RECEIVED_TOTAL,
            SYSLOG_EVENTS_PARSED_TOTAL,
            SYSLOG_PARSE_ERRORS_TOTAL,
            BROKER_EVENTS_PUBLISHED_TOTAL,
            BROKER_EVENTS_DELIVERED_TOTAL,
            BROKER_EVENTS_DROPPED_TOTAL,
            STREAM_CONNECTIONS_TOTAL,
            STREAM_REJECTED_TOTAL,
        ];
        for name in counters {
            assert!(name.ends_with("_total"), "{name} should end with _total");
        }
    }

    #[test]
    fn metric_names_are_unique() {
        let mut names = ALL_METRIC_NAMES.to_vec();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), ALL_METRIC_NAMES.len());
    }

    #[test]
    fn describe_all_does_not_panic() {
        describe_all();
    }

    #[test]
    fn parse_duration_buckets_are_sorted() {
        for pair in PARSE_DURATION_BUCKETS.windows(2) {
            assert!(pair[1] > pair[0], "Bucket values must be in ascending order");
        }
    }
}
