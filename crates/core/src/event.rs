//! 이벤트 모델 -- 파싱된 장비 로그 한 줄의 구조화 표현
//!
//! [`Event`]는 파서가 한 번 생성하고 브로커가 구독자에게 팬아웃한 뒤 버려지는
//! 불변 값입니다. 템플릿에 해당 플레이스홀더가 없는 필드는
//! `Unknown`/`0` 기본값을 유지합니다.
//!
//! 모든 열거형은 serde에서 snake_case 이름으로 직렬화되며, 이 이름은
//! 스트림 프로토콜과 CLI 인자에서도 그대로 쓰입니다.

use std::fmt;

use serde::{Deserialize, Serialize};

/// 이벤트 종류
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// 분류되지 않은 이벤트 (`ignore` 템플릿)
    #[default]
    Unknown,
    /// 포트 링크 업
    PortUp,
    /// 포트 링크 다운
    PortDown,
    /// 루프 감지로 포트 비활성화
    PortLoopDetect,
}

impl EventKind {
    /// 모든 이벤트 종류
    pub const ALL: [EventKind; 4] = [
        EventKind::Unknown,
        EventKind::PortUp,
        EventKind::PortDown,
        EventKind::PortLoopDetect,
    ];

    /// 직렬화 이름을 반환합니다.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::PortUp => "port_up",
            Self::PortDown => "port_down",
            Self::PortLoopDetect => "port_loop_detect",
        }
    }

    /// 문자열에서 이벤트 종류를 파싱합니다.
    ///
    /// 대소문자와 `_`/`-` 구분자 유무를 가리지 않습니다.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "unknown" => Some(Self::Unknown),
            "portup" | "up" => Some(Self::PortUp),
            "portdown" | "down" => Some(Self::PortDown),
            "portloopdetect" | "loopdetect" => Some(Self::PortLoopDetect),
            _ => None,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 포트 속도
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortSpeed {
    /// 알 수 없음
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
    /// 10 Mbit/s
    #[serde(rename = "10mb")]
    Speed10Mb,
    /// 100 Mbit/s
    #[serde(rename = "100mb")]
    Speed100Mb,
    /// 1 Gbit/s
    #[serde(rename = "1gb")]
    Speed1Gb,
}

impl PortSpeed {
    /// 장비 로그의 속도 숫자 토큰을 해석합니다.
    ///
    /// `"10"`, `"100"`, `"1000"`만 인정하며 나머지는 `None`입니다.
    pub fn from_digits(digits: &str) -> Option<Self> {
        match digits {
            "10" => Some(Self::Speed10Mb),
            "100" => Some(Self::Speed100Mb),
            "1000" => Some(Self::Speed1Gb),
            _ => None,
        }
    }

    /// 직렬화 이름을 반환합니다.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Speed10Mb => "10mb",
            Self::Speed100Mb => "100mb",
            Self::Speed1Gb => "1gb",
        }
    }
}

impl fmt::Display for PortSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 포트 듀플렉스 모드
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortDuplex {
    /// 알 수 없음
    #[default]
    Unknown,
    /// 반이중
    Half,
    /// 전이중
    Full,
}

impl PortDuplex {
    /// 직렬화 이름을 반환합니다.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Half => "half",
            Self::Full => "full",
        }
    }
}

impl fmt::Display for PortDuplex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 파싱된 장비 이벤트
///
/// 필드 순서(`kind`, `host`, `port`, `speed`, `duplex`)는 JSON 직렬화 순서이기도 합니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// 이벤트 종류
    pub kind: EventKind,
    /// 장비 IP 주소 (정규화된 문자열 표현)
    pub host: String,
    /// 장비 포트 번호
    pub port: u32,
    /// 포트 속도
    pub speed: PortSpeed,
    /// 듀플렉스 모드
    pub duplex: PortDuplex,
}

impl Event {
    /// 나머지 필드가 기본값인 이벤트를 생성합니다.
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} host={} port={} speed={} duplex={}",
            self.kind, self.host, self.port, self.speed, self.duplex,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_event_has_unknown_defaults() {
        let event = Event::new(EventKind::PortDown);
        assert_eq!(event.kind, EventKind::PortDown);
        assert!(event.host.is_empty());
        assert_eq!(event.port, 0);
        assert_eq!(event.speed, PortSpeed::Unknown);
        assert_eq!(event.duplex, PortDuplex::Unknown);
    }

    #[test]
    fn event_json_keeps_field_order() {
        let event = Event {
            kind: EventKind::PortUp,
            host: "192.168.1.99".to_owned(),
            port: 1,
            speed: PortSpeed::Speed100Mb,
            duplex: PortDuplex::Half,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(
            json,
            r#"{"kind":"port_up","host":"192.168.1.99","port":1,"speed":"100mb","duplex":"half"}"#
        );
    }

    #[test]
    fn event_display() {
        let mut event = Event::new(EventKind::PortLoopDetect);
        event.host = "172.16.0.4".to_owned();
        event.port = 7;
        assert_eq!(
            event.to_string(),
            "port_loop_detect host=172.16.0.4 port=7 speed=unknown duplex=unknown"
        );
    }

    #[test]
    fn event_kind_from_str_loose() {
        assert_eq!(EventKind::from_str_loose("port_up"), Some(EventKind::PortUp));
        assert_eq!(EventKind::from_str_loose("PortDown"), Some(EventKind::PortDown));
        assert_eq!(
            EventKind::from_str_loose("port-loop-detect"),
            Some(EventKind::PortLoopDetect)
        );
        assert_eq!(EventKind::from_str_loose("UNKNOWN"), Some(EventKind::Unknown));
        assert_eq!(EventKind::from_str_loose("port_flap"), None);
    }

    #[test]
    fn event_kind_names_roundtrip_through_loose_parser() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::from_str_loose(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn port_speed_from_digits() {
        assert_eq!(PortSpeed::from_digits("10"), Some(PortSpeed::Speed10Mb));
        assert_eq!(PortSpeed::from_digits("100"), Some(PortSpeed::Speed100Mb));
        assert_eq!(PortSpeed::from_digits("1000"), Some(PortSpeed::Speed1Gb));
        assert_eq!(PortSpeed::from_digits("999"), None);
        assert_eq!(PortSpeed::from_digits("010"), None);
    }
}
