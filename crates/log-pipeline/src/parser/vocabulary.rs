//! 템플릿 어휘 -- 이벤트 키워드와 플레이스홀더 마커 테이블
//!
//! [`Vocabulary`]는 컴파일러에 주입되는 불변 값입니다.
//! 기본값은 syslog-catcher의 고정 어휘이며, 테스트나 다른 장비군을 위해
//! 별도 어휘를 만들어 넘길 수 있습니다.

use catcher_core::event::EventKind;

use super::field::{Placeholder, TemplateField};

/// 키워드/마커 테이블
#[derive(Debug, Clone)]
pub struct Vocabulary {
    /// 이벤트 키워드 -> 이벤트 종류
    keywords: Vec<(String, EventKind)>,
    /// 플레이스홀더 마커 -> 플레이스홀더 종류
    markers: Vec<(String, Placeholder)>,
}

impl Vocabulary {
    /// 빈 어휘를 생성합니다.
    pub fn empty() -> Self {
        Self {
            keywords: Vec::new(),
            markers: Vec::new(),
        }
    }

    /// 이벤트 키워드를 추가합니다.
    pub fn with_keyword(mut self, keyword: impl Into<String>, kind: EventKind) -> Self {
        self.keywords.push((keyword.into(), kind));
        self
    }

    /// 플레이스홀더 마커를 추가합니다.
    pub fn with_marker(mut self, marker: impl Into<String>, placeholder: Placeholder) -> Self {
        self.markers.push((marker.into(), placeholder));
        self
    }

    /// 키워드에 해당하는 이벤트 종류를 찾습니다.
    pub fn event_kind(&self, keyword: &str) -> Option<EventKind> {
        self.keywords
            .iter()
            .find(|(k, _)| k == keyword)
            .map(|(_, kind)| *kind)
    }

    /// 템플릿 단어 하나를 필드로 컴파일합니다.
    ///
    /// 마커와 정확히 같은 단어만 플레이스홀더가 되고, 나머지는 리터럴입니다.
    pub fn compile_word(&self, word: &str) -> TemplateField {
        self.markers
            .iter()
            .find(|(marker, _)| marker == word)
            .map(|(_, placeholder)| TemplateField::Placeholder(*placeholder))
            .unwrap_or_else(|| TemplateField::Literal(word.to_owned()))
    }

    /// 등록된 키워드 목록
    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.keywords.iter().map(|(k, _)| k.as_str())
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::empty()
            .with_keyword("ignore", EventKind::Unknown)
            .with_keyword("link_up", EventKind::PortUp)
            .with_keyword("link_down", EventKind::PortDown)
            .with_keyword("loopdetect", EventKind::PortLoopDetect)
            .with_marker("$ignore$", Placeholder::Ignore)
            .with_marker("$device_addr$", Placeholder::DeviceAddr)
            .with_marker("$device_port$", Placeholder::DevicePort)
            .with_marker("$port_speed$", Placeholder::PortSpeed)
            .with_marker("$port_duplex$", Placeholder::PortDuplex)
    }
}
