//! 파이프라인 trait -- 모듈 확장 포인트 정의

use std::future::Future;

use crate::error::{CatcherError, ParseError};
use crate::event::Event;

/// 텍스트 로그 파서 trait
///
/// 장비 로그 한 줄을 [`Event`]로 변환합니다.
/// 수집 경로에서 여러 태스크가 동시에 호출하므로 `Send + Sync`여야 합니다.
pub trait EventParser: Send + Sync {
    /// 파서 이름 (로깅용)
    fn name(&self) -> &str;

    /// 한 줄을 파싱합니다.
    fn parse(&self, line: &str) -> Result<Event, ParseError>;
}

/// 모듈 생명주기 trait
///
/// 데몬이 모든 장기 실행 모듈을 동일한 방식으로 시작/정지/점검합니다.
pub trait Pipeline: Send {
    /// 모듈을 시작합니다.
    fn start(&mut self) -> impl Future<Output = Result<(), CatcherError>> + Send;

    /// 모듈을 정지합니다.
    fn stop(&mut self) -> impl Future<Output = Result<(), CatcherError>> + Send;

    /// 현재 상태를 점검합니다.
    fn health_check(&self) -> impl Future<Output = HealthStatus> + Send;
}

/// 모듈 상태
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// 정상
    Healthy,
    /// 동작하지만 성능 저하
    Degraded(String),
    /// 비정상
    Unhealthy(String),
}

impl HealthStatus {
    /// 정상 여부
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }

    /// 비정상 여부
    pub fn is_unhealthy(&self) -> bool {
        matches!(self, Self::Unhealthy(_))
    }
}
