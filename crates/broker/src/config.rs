//! 브로커 설정

use catcher_core::config::BrokerConfig as CoreBrokerConfig;

use crate::error::BrokerError;
use crate::subscription::OverflowPolicy;

/// 브로커 설정
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerConfig {
    /// 구독별 대기 큐 용량
    pub queue_capacity: usize,
    /// 큐가 가득 찼을 때의 정책
    pub overflow_policy: OverflowPolicy,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            overflow_policy: OverflowPolicy::default(),
        }
    }
}

impl BrokerConfig {
    /// core의 `BrokerConfig`에서 브로커 설정을 생성합니다.
    pub fn from_core(core: &CoreBrokerConfig) -> Result<Self, BrokerError> {
        let overflow_policy = core.overflow_policy.parse().map_err(|reason| BrokerError::Config {
            field: "overflow_policy".to_owned(),
            reason,
        })?;
        let config = Self {
            queue_capacity: core.queue_capacity,
            overflow_policy,
        };
        config.validate()?;
        Ok(config)
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), BrokerError> {
        if self.queue_capacity == 0 {
            return Err(BrokerError::Config {
                field: "queue_capacity".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }
        Ok(())
    }
}
