//! 템플릿 필드 분류기
//!
//! 템플릿의 각 단어는 리터럴이거나 타입이 있는 플레이스홀더입니다.
//! 분류는 템플릿 구조만 보고 결정되며, 입력 토큰의 값은
//! 리터럴 비교에만 쓰입니다.

use std::fmt;

/// 플레이스홀더 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placeholder {
    /// 아무 토큰이나 받아들이고 값을 버림
    Ignore,
    /// 장비 IP 주소
    DeviceAddr,
    /// 장비 포트 번호
    DevicePort,
    /// 포트 속도
    PortSpeed,
    /// 듀플렉스 모드
    PortDuplex,
}

impl Placeholder {
    /// 에러 메시지와 로그에 쓰는 필드 이름
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ignore => "ignore",
            Self::DeviceAddr => "device_addr",
            Self::DevicePort => "device_port",
            Self::PortSpeed => "port_speed",
            Self::PortDuplex => "port_duplex",
        }
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 컴파일된 템플릿 필드 (한 위치)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateField {
    /// 정확히 같은 토큰만 일치
    Literal(String),
    /// 타입 추출 대상
    Placeholder(Placeholder),
}

/// 토큰 하나에 대한 분류 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldMatch {
    /// 리터럴 불일치. 이 템플릿은 포기하고 다음 후보로 넘어갑니다.
    NoMatch,
    /// 리터럴 일치
    Literal,
    /// 플레이스홀더 위치. 값 추출이 필요합니다.
    Placeholder(Placeholder),
}

impl TemplateField {
    /// 입력 토큰을 이 필드에 대해 분류합니다.
    pub fn classify(&self, token: &str) -> FieldMatch {
        match self {
            Self::Literal(text) if text == token => FieldMatch::Literal,
            Self::Literal(_) => FieldMatch::NoMatch,
            Self::Placeholder(kind) => FieldMatch::Placeholder(*kind),
        }
    }
}

impl fmt::Display for TemplateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(text) => f.write_str(text),
            Self::Placeholder(kind) => write!(f, "${kind}$"),
        }
    }
}
