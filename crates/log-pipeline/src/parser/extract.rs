//! 플레이스홀더 값 추출
//!
//! 숫자 추출은 정규식 없이 왼쪽에서 오른쪽으로 ASCII 숫자의 최대 연속 구간을
//! 훑는 방식으로 구현합니다. 포트는 마지막 구간(`ethernet1/0/3` -> 3),
//! 속도는 첫 구간(`100mb` -> 100)을 사용합니다.

use std::net::IpAddr;

use catcher_core::error::ParseError;
use catcher_core::event::{Event, PortDuplex, PortSpeed};

use super::field::Placeholder;

/// 문자열 안의 ASCII 숫자 최대 연속 구간을 순서대로 반환하는 이터레이터
#[derive(Debug, Clone)]
pub struct DigitRuns<'a> {
    text: &'a str,
    pos: usize,
}

/// `text`의 숫자 구간 이터레이터를 생성합니다.
pub fn digit_runs(text: &str) -> DigitRuns<'_> {
    DigitRuns { text, pos: 0 }
}

impl<'a> Iterator for DigitRuns<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let bytes = self.text.as_bytes();
        while self.pos < bytes.len() && !bytes[self.pos].is_ascii_digit() {
            self.pos += 1;
        }
        if self.pos >= bytes.len() {
            return None;
        }
        let start = self.pos;
        while self.pos < bytes.len() && bytes[self.pos].is_ascii_digit() {
            self.pos += 1;
        }
        // ASCII 숫자 경계이므로 항상 char 경계
        Some(&self.text[start..self.pos])
    }
}

/// 플레이스홀더 값을 추출해 이벤트에 채웁니다.
///
/// 실패하면 해당 필드를 지목하는 `MalformedField`를 반환합니다.
pub fn apply(placeholder: Placeholder, token: &str, event: &mut Event) -> Result<(), ParseError> {
    let result = match placeholder {
        Placeholder::Ignore => Ok(()),
        Placeholder::DeviceAddr => device_addr(token).map(|host| event.host = host),
        Placeholder::DevicePort => device_port(token).map(|port| event.port = port),
        Placeholder::PortSpeed => port_speed(token).map(|speed| event.speed = speed),
        Placeholder::PortDuplex => port_duplex(token).map(|duplex| event.duplex = duplex),
    };

    result.map_err(|reason| ParseError::MalformedField {
        field: placeholder.name().to_owned(),
        token: token.to_owned(),
        reason,
    })
}

/// IP 주소 리터럴을 정규화된 문자열로 변환합니다.
///
/// IPv4-mapped IPv6 주소는 IPv4 표기로 바뀝니다.
pub fn device_addr(token: &str) -> Result<String, String> {
    token
        .parse::<IpAddr>()
        .map(|ip| ip.to_canonical().to_string())
        .map_err(|_| "ip address has invalid format".to_owned())
}

/// 마지막 숫자 구간을 포트 번호로 해석합니다.
pub fn device_port(token: &str) -> Result<u32, String> {
    let digits = digit_runs(token)
        .last()
        .ok_or_else(|| "no port index digits".to_owned())?;
    digits
        .parse::<u32>()
        .map_err(|e| format!("port index {digits} out of range: {e}"))
}

/// 첫 숫자 구간을 포트 속도로 해석합니다.
pub fn port_speed(token: &str) -> Result<PortSpeed, String> {
    let digits = digit_runs(token)
        .next()
        .ok_or_else(|| "no port speed digits".to_owned())?;
    PortSpeed::from_digits(digits).ok_or_else(|| format!("unknown port speed {digits}"))
}

/// 대소문자 구분 없이 `half`, `full` 순서로 찾습니다.
pub fn port_duplex(token: &str) -> Result<PortDuplex, String> {
    let lowered = token.to_ascii_lowercase();
    if lowered.contains("half") {
        Ok(PortDuplex::Half)
    } else if lowered.contains("full") {
        Ok(PortDuplex::Full)
    } else {
        Err("unknown port duplex".to_owned())
    }
}
