//! 템플릿 파싱 엔진 -- 장비 로그 한 줄을 [`Event`]로 변환합니다.
//!
//! [`TemplateParser`]는 설정된 템플릿을 토큰 수(arity)별 버킷으로 나누어 보관하고,
//! 입력 라인과 토큰 수가 같은 버킷의 패턴만 설정 순서대로 시도합니다.
//!
//! # 매칭 규칙
//! - 해당 arity 버킷이 없거나 모든 후보가 리터럴 불일치 -> `UnknownFormat`
//! - 후보의 플레이스홀더 추출 실패 -> 즉시 `MalformedField` (다른 후보를 시도하지 않음)
//! - 모든 필드 일치 -> 이벤트 반환
//!
//! # 사용 예시
//! ```
//! use catcher_log_pipeline::parser::TemplateParser;
//! use catcher_core::event::EventKind;
//!
//! let parser = TemplateParser::new(&[
//!     "link_down ~ $device_addr$ - - - port $device_port$ change link state to down",
//! ])?;
//! let event = parser.parse("192.168.1.105 - - - port 7 change link state to down")?;
//! assert_eq!(event.kind, EventKind::PortDown);
//! assert_eq!(event.port, 7);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod extract;
pub mod field;
pub mod pattern;
pub mod vocabulary;

pub use field::{FieldMatch, Placeholder, TemplateField};
pub use pattern::TemplatePattern;
pub use vocabulary::Vocabulary;

use std::collections::HashMap;

use catcher_core::error::ParseError;
use catcher_core::event::Event;
use catcher_core::pipeline::EventParser;

use crate::error::LogPipelineError;

/// arity별 버킷으로 정리된 템플릿 파서
///
/// 시작 시 한 번 구성된 뒤 읽기 전용이므로 `Arc`로 공유해
/// 여러 태스크에서 동시에 호출할 수 있습니다.
#[derive(Debug, Clone)]
pub struct TemplateParser {
    /// arity -> 설정 순서를 유지한 패턴 목록
    buckets: HashMap<usize, Vec<TemplatePattern>>,
    /// 전체 패턴 수
    pattern_count: usize,
}

impl TemplateParser {
    /// 기본 어휘로 템플릿 목록을 컴파일합니다.
    pub fn new<S: AsRef<str>>(templates: &[S]) -> Result<Self, LogPipelineError> {
        Self::with_vocabulary(templates, &Vocabulary::default())
    }

    /// 주어진 어휘로 템플릿 목록을 컴파일합니다.
    ///
    /// 하나라도 컴파일에 실패하면 전체 설정을 거부합니다.
    pub fn with_vocabulary<S: AsRef<str>>(
        templates: &[S],
        vocabulary: &Vocabulary,
    ) -> Result<Self, LogPipelineError> {
        if templates.is_empty() {
            return Err(LogPipelineError::Config {
                field: "templates".to_owned(),
                reason: "no parsing templates provided".to_owned(),
            });
        }

        let mut buckets: HashMap<usize, Vec<TemplatePattern>> = HashMap::new();
        for entry in templates {
            let pattern = TemplatePattern::compile(entry.as_ref(), vocabulary)?;
            buckets.entry(pattern.arity()).or_default().push(pattern);
        }

        tracing::debug!(
            patterns = templates.len(),
            buckets = buckets.len(),
            "compiled text parser templates"
        );

        Ok(Self {
            buckets,
            pattern_count: templates.len(),
        })
    }

    /// 전체 패턴 수
    pub fn pattern_count(&self) -> usize {
        self.pattern_count
    }

    /// 주어진 arity의 패턴 목록 (설정 순서)
    pub fn patterns_for(&self, arity: usize) -> &[TemplatePattern] {
        self.buckets.get(&arity).map(Vec::as_slice).unwrap_or(&[])
    }

    /// 라인 하나를 파싱합니다.
    pub fn parse(&self, line: &str) -> Result<Event, ParseError> {
        let tokens: Vec<&str> = line.split_whitespace().collect();

        for pattern in self.patterns_for(tokens.len()) {
            if let Some(event) = pattern.match_tokens(&tokens)? {
                return Ok(event);
            }
        }

        Err(ParseError::UnknownFormat {
            line: line.to_owned(),
        })
    }
}

impl EventParser for TemplateParser {
    fn name(&self) -> &str {
        "template"
    }

    fn parse(&self, line: &str) -> Result<Event, ParseError> {
        TemplateParser::parse(self, line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catcher_core::event::{EventKind, PortDuplex, PortSpeed};

    const LINK_UP: &str = "link_up ~ $device_addr$ - - - port $device_port$ change link state to up with $port_speed$ $port_duplex$";
    const LINK_DOWN: &str =
        "link_down ~ $device_addr$ - - - port $device_port$ change link state to down";
    const LOOP_DETECT: &str =
        "loopdetect ~ $device_addr$ - - - port $device_port$ disabled by loop detect service";

    fn default_parser() -> TemplateParser {
        TemplateParser::new(&[LINK_UP, LINK_DOWN, LOOP_DETECT]).unwrap()
    }

    #[test]
    fn new_rejects_empty_template_list() {
        let templates: [&str; 0] = [];
        let err = TemplateParser::new(&templates).unwrap_err();
        assert!(err.to_string().contains("templates"));
    }

    #[test]
    fn new_rejects_whole_set_on_one_bad_entry() {
        let result = TemplateParser::new(&[LINK_UP, "bogus ~ $device_addr$", LINK_DOWN]);
        assert!(result.is_err());
    }

    #[test]
    fn patterns_are_bucketed_by_arity() {
        let parser = default_parser();
        assert_eq!(parser.pattern_count(), 3);
        assert_eq!(parser.patterns_for(14).len(), 1);
        assert_eq!(parser.patterns_for(11).len(), 1);
        assert_eq!(parser.patterns_for(12).len(), 1);
        assert!(parser.patterns_for(5).is_empty());
    }

    #[test]
    fn link_up_with_speed_and_duplex() {
        let event = default_parser()
            .parse("192.168.1.99 - - - port 1 change link state to up with 100mb half-duplex")
            .unwrap();
        assert_eq!(
            event,
            Event {
                kind: EventKind::PortUp,
                host: "192.168.1.99".to_owned(),
                port: 1,
                speed: PortSpeed::Speed100Mb,
                duplex: PortDuplex::Half,
            }
        );
    }

    #[test]
    fn link_up_takes_last_digit_run_of_port() {
        let event = default_parser()
            .parse("192.168.1.101 - - - port ethernet1/0/3 change link state to up with 1000mb full-duplex")
            .unwrap();
        assert_eq!(event.port, 3);
        assert_eq!(event.speed, PortSpeed::Speed1Gb);
        assert_eq!(event.duplex, PortDuplex::Full);
    }

    #[test]
    fn invalid_ip_is_malformed_not_unknown() {
        let err = default_parser()
            .parse("192.168.1. - - - port 10 change link state to up with 10mb half-duplex")
            .unwrap_err();
        assert!(
            matches!(err, ParseError::MalformedField { ref field, .. } if field == "device_addr")
        );
    }

    #[test]
    fn unknown_speed_is_malformed() {
        let err = default_parser()
            .parse("192.168.1.104 - - - port 6 change link state to up with 999mb half-duplex")
            .unwrap_err();
        assert!(
            matches!(err, ParseError::MalformedField { ref field, ref token, .. } if field == "port_speed" && token == "999mb")
        );
    }

    #[test]
    fn non_numeric_port_is_malformed() {
        let err = default_parser()
            .parse("192.168.1.103 - - - port X change link state to up with 10mb half-duplex")
            .unwrap_err();
        assert!(
            matches!(err, ParseError::MalformedField { ref field, .. } if field == "device_port")
        );
    }

    #[test]
    fn missing_tokens_is_unknown_format() {
        let line = "192.168.1.107 - - - port 9 change link state to up";
        let err = default_parser().parse(line).unwrap_err();
        assert_eq!(
            err,
            ParseError::UnknownFormat {
                line: line.to_owned()
            }
        );
    }

    #[test]
    fn same_arity_literal_mismatch_is_unknown_format() {
        // loop detect 템플릿과 토큰 수는 같지만 "detected" 리터럴이 다름
        let err = default_parser()
            .parse("192.168.1.108 - - - port 10 disabled by loop detected service")
            .unwrap_err();
        assert!(matches!(err, ParseError::UnknownFormat { .. }));
    }

    #[test]
    fn link_down_leaves_speed_and_duplex_unknown() {
        let event = default_parser()
            .parse("192.168.1.106 - - - port eth1/8 change link state to down")
            .unwrap();
        assert_eq!(event.kind, EventKind::PortDown);
        assert_eq!(event.host, "192.168.1.106");
        assert_eq!(event.port, 8);
        assert_eq!(event.speed, PortSpeed::Unknown);
        assert_eq!(event.duplex, PortDuplex::Unknown);
    }

    #[test]
    fn loop_detect() {
        let event = default_parser()
            .parse("172.16.0.9 - - - port 4 disabled by loop detect service")
            .unwrap();
        assert_eq!(event.kind, EventKind::PortLoopDetect);
        assert_eq!(event.port, 4);
    }

    #[test]
    fn first_matching_pattern_in_bucket_wins() {
        let parser = TemplateParser::new(&[
            "ignore ~ $ignore$ - - - port $ignore$ change link state to down",
            LINK_DOWN,
        ])
        .unwrap();
        let event = parser
            .parse("192.168.1.105 - - - port 7 change link state to down")
            .unwrap();
        assert_eq!(event.kind, EventKind::Unknown);
        assert!(event.host.is_empty());
        assert_eq!(event.port, 0);
    }

    #[test]
    fn malformed_field_does_not_fall_through_to_sibling() {
        // 첫 패턴의 포트 추출이 실패하면 두 번째 패턴이 일치하더라도 시도하지 않음
        let parser = TemplateParser::new(&[
            LINK_DOWN,
            "ignore ~ $ignore$ - - - port $ignore$ change link state to down",
        ])
        .unwrap();
        let err = parser
            .parse("192.168.1.105 - - - port X change link state to down")
            .unwrap_err();
        assert!(matches!(err, ParseError::MalformedField { .. }));
    }

    #[test]
    fn literal_mismatch_falls_through_to_sibling() {
        let parser = TemplateParser::new(&[
            "link_down ~ $device_addr$ - - - port $device_port$ change link state to down",
            "link_up ~ $device_addr$ - - - port $device_port$ change link state to up",
        ])
        .unwrap();
        let event = parser
            .parse("10.0.0.1 - - - port 2 change link state to up")
            .unwrap();
        assert_eq!(event.kind, EventKind::PortUp);
    }

    #[test]
    fn parse_is_deterministic() {
        let parser = default_parser();
        let line = "192.168.1.99 - - - port 1 change link state to up with 100mb half-duplex";
        let first = parser.parse(line).unwrap();
        for _ in 0..10 {
            assert_eq!(parser.parse(line).unwrap(), first);
        }
    }

    #[test]
    fn empty_line_is_unknown_format() {
        let err = default_parser().parse("").unwrap_err();
        assert!(matches!(err, ParseError::UnknownFormat { .. }));
    }

    #[test]
    fn event_parser_trait_object() {
        let parser: Box<dyn EventParser> = Box::new(default_parser());
        assert_eq!(parser.name(), "template");
        assert!(parser
            .parse("192.168.1.105 - - - port 7 change link state to down")
            .is_ok());
    }

    // Property-based tests using proptest
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn parse_arbitrary_text_does_not_panic(line in "\\PC{0,200}") {
                let parser = default_parser();
                let _ = parser.parse(&line);
            }

            #[test]
            fn parse_arbitrary_port_token_does_not_panic(port in "[a-zA-Z0-9/]{1,30}") {
                let parser = default_parser();
                let line = format!("192.168.1.1 - - - port {port} change link state to down");
                match parser.parse(&line) {
                    Ok(event) => prop_assert_eq!(event.kind, EventKind::PortDown),
                    Err(ParseError::MalformedField { field, .. }) => prop_assert_eq!(field, "device_port"),
                    Err(other) => prop_assert!(false, "unexpected error: {other:?}"),
                }
            }

            #[test]
            fn valid_ipv4_hosts_roundtrip(a in 0u8..=255, b in 0u8..=255, c in 0u8..=255, d in 0u8..=255, port in 0u32..100_000) {
                let parser = default_parser();
                let host = format!("{a}.{b}.{c}.{d}");
                let line = format!("{host} - - - port {port} change link state to down");
                let event = parser.parse(&line).unwrap();
                prop_assert_eq!(event.host, host);
                prop_assert_eq!(event.port, port);
            }

            #[test]
            fn token_count_without_bucket_is_unknown(count in 0usize..40) {
                prop_assume!(count != 11 && count != 12 && count != 14);
                let parser = default_parser();
                let line = vec!["x"; count].join(" ");
                let is_unknown = matches!(parser.parse(&line), Err(ParseError::UnknownFormat { .. }));
                prop_assert!(is_unknown);
            }
        }
    }
}
