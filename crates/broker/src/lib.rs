#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`broker`]: 구독 레지스트리, 발행, 디스패치 루프
//! - [`subscription`]: 구독 필터, 구독별 bounded 큐, 소비자 핸들
//! - [`config`]: 브로커 설정 (core 설정 변환)
//! - [`error`]: 도메인 에러 타입

pub mod broker;
pub mod config;
pub mod error;
pub mod subscription;

pub use broker::{Broker, BrokerStats, SubscriptionInfo};
pub use config::BrokerConfig;
pub use error::BrokerError;
pub use subscription::{OverflowPolicy, Subscription, SubscriptionFilter, SubscriptionId};
