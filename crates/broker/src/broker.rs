//! 이벤트 브로커 -- 구독 레지스트리와 팬아웃
//!
//! [`Broker`]는 구독 요청을 검증해 레지스트리에 등록하고, 발행된 이벤트를
//! 각 구독의 필터로 걸러 구독별 큐에 전달합니다.
//!
//! # 동시성
//! - 레지스트리는 `RwLock<HashMap>`이며, 발행 시 읽기 잠금으로 `Arc` 스냅샷만
//!   복사한 뒤 잠금 없이 전달합니다.
//! - 구독별 전달은 블로킹하지 않습니다. 느린 구독자는 자기 큐만 넘칩니다.
//! - 닫힘 신호는 공유 [`CancellationToken`]입니다.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use catcher_core::event::{Event, EventKind};
use catcher_core::metrics as m;
use catcher_core::types::IpNetwork;

use crate::config::BrokerConfig;
use crate::error::BrokerError;
use crate::subscription::{Offer, SubscriberSlot, Subscription, SubscriptionFilter, SubscriptionId};

/// 브로커 누적 통계
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BrokerStats {
    /// 발행된 이벤트 수
    pub published: u64,
    /// 구독 큐에 들어간 이벤트 수 (구독 수만큼 중복 집계)
    pub delivered: u64,
    /// 큐 초과로 버려진 이벤트 수
    pub dropped: u64,
    /// 현재 활성 구독 수
    pub active_subscriptions: usize,
}

/// 현재 활성 구독 요약
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionInfo {
    /// 구독 식별자
    pub id: String,
    /// 구독 종류
    pub kinds: Vec<EventKind>,
    /// 네트워크 필터
    pub networks: Vec<IpNetwork>,
    /// 대기 중인 이벤트 수
    pub queued: usize,
    /// 큐에 들어간 이벤트 수
    pub delivered: u64,
    /// 버려진 이벤트 수
    pub dropped: u64,
}

#[derive(Debug)]
pub(crate) struct BrokerInner {
    config: BrokerConfig,
    registry: RwLock<HashMap<SubscriptionId, Arc<SubscriberSlot>>>,
    cancel_token: CancellationToken,
    next_seq: AtomicU64,
    published: AtomicU64,
    delivered: AtomicU64,
    dropped: AtomicU64,
}

impl BrokerInner {
    /// 레지스트리에서 구독을 제거하고 닫습니다.
    pub(crate) fn remove(&self, id: &SubscriptionId) -> bool {
        let removed = {
            let mut registry = self.registry.write();
            let removed = registry.remove(id);
            metrics::gauge!(m::BROKER_ACTIVE_SUBSCRIPTIONS).set(registry.len() as f64);
            removed
        };

        match removed {
            Some(slot) => {
                slot.close();
                tracing::info!(
                    subscription = %id,
                    delivered = slot.delivered(),
                    dropped = slot.dropped(),
                    "subscription removed"
                );
                true
            }
            None => false,
        }
    }
}

/// 이벤트 브로커
///
/// 복제 비용이 싼 핸들이며, 모든 복제본은 같은 레지스트리를 공유합니다.
///
/// # 사용 예시
/// ```
/// use catcher_broker::{Broker, BrokerConfig};
/// use catcher_core::event::{Event, EventKind};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let broker = Broker::new(BrokerConfig::default());
/// let mut sub = broker.subscribe("noc", &[EventKind::PortDown], &["192.168.1.0/24"])?;
///
/// let mut event = Event::new(EventKind::PortDown);
/// event.host = "192.168.1.105".to_owned();
/// broker.publish(&event);
///
/// assert_eq!(sub.next().await, Some(event));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Broker {
    inner: Arc<BrokerInner>,
}

impl Broker {
    /// 새 브로커를 생성합니다.
    pub fn new(config: BrokerConfig) -> Self {
        Self {
            inner: Arc::new(BrokerInner {
                config,
                registry: RwLock::new(HashMap::new()),
                cancel_token: CancellationToken::new(),
                next_seq: AtomicU64::new(0),
                published: AtomicU64::new(0),
                delivered: AtomicU64::new(0),
                dropped: AtomicU64::new(0),
            }),
        }
    }

    /// 브로커 설정
    pub fn config(&self) -> &BrokerConfig {
        &self.inner.config
    }

    /// 구독을 등록합니다.
    ///
    /// `kinds`가 비었거나 `cidrs` 중 하나라도 CIDR로 해석되지 않으면
    /// 레지스트리를 건드리지 않고 거부합니다.
    pub fn subscribe<S: AsRef<str>>(
        &self,
        name: &str,
        kinds: &[EventKind],
        cidrs: &[S],
    ) -> Result<Subscription, BrokerError> {
        if kinds.is_empty() {
            return Err(BrokerError::EmptyKinds);
        }
        let networks = cidrs
            .iter()
            .map(|cidr| cidr.as_ref().trim().parse::<IpNetwork>())
            .collect::<Result<Vec<_>, _>>()?;

        let seq = self.inner.next_seq.fetch_add(1, Ordering::Relaxed);
        let id = SubscriptionId::generate(name, seq);
        let slot = Arc::new(SubscriberSlot::new(
            id.clone(),
            name.to_owned(),
            SubscriptionFilter::new(kinds.iter().copied(), networks),
            self.inner.config.queue_capacity,
            self.inner.config.overflow_policy,
        ));

        {
            let mut registry = self.inner.registry.write();
            // close()는 토큰 취소 후 쓰기 잠금을 잡으므로, 여기서 확인하면 경합이 없음
            if self.inner.cancel_token.is_cancelled() {
                return Err(BrokerError::Closed);
            }
            registry.insert(id.clone(), Arc::clone(&slot));
            metrics::gauge!(m::BROKER_ACTIVE_SUBSCRIPTIONS).set(registry.len() as f64);
        }

        tracing::info!(
            subscription = %id,
            kinds = ?kinds,
            networks = ?slot.filter().networks(),
            "subscription registered"
        );

        Ok(Subscription::new(
            slot,
            Arc::downgrade(&self.inner),
            self.inner.cancel_token.clone(),
        ))
    }

    /// 구독을 해제합니다. 이미 해제된 구독이면 `false`를 반환합니다.
    pub fn unsubscribe(&self, id: &SubscriptionId) -> bool {
        self.inner.remove(id)
    }

    /// 이벤트를 모든 일치하는 구독에 전달합니다.
    ///
    /// 닫힌 브로커에서는 아무 일도 하지 않습니다. 절대 블로킹하지 않습니다.
    pub fn publish(&self, event: &Event) {
        if self.inner.cancel_token.is_cancelled() {
            return;
        }
        self.inner.published.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(m::BROKER_EVENTS_PUBLISHED_TOTAL).increment(1);

        let snapshot: Vec<Arc<SubscriberSlot>> =
            self.inner.registry.read().values().cloned().collect();

        let mut delivered = 0u64;
        let mut dropped = 0u64;
        for slot in snapshot.iter().filter(|slot| slot.filter().matches(event)) {
            match slot.offer(event) {
                Offer::Queued => delivered += 1,
                Offer::QueuedEvicting => {
                    delivered += 1;
                    dropped += 1;
                }
                Offer::Rejected => dropped += 1,
                Offer::Closed => {}
            }
        }

        if delivered > 0 {
            self.inner.delivered.fetch_add(delivered, Ordering::Relaxed);
            metrics::counter!(m::BROKER_EVENTS_DELIVERED_TOTAL).increment(delivered);
        }
        if dropped > 0 {
            self.inner.dropped.fetch_add(dropped, Ordering::Relaxed);
            metrics::counter!(m::BROKER_EVENTS_DROPPED_TOTAL).increment(dropped);
        }
        tracing::trace!(event = %event, delivered, dropped, "event published");
    }

    /// 브로커를 닫습니다.
    ///
    /// 이후 발행은 무시되고 새 구독은 거부되며, 열려 있는 모든 구독이 깨어나
    /// `next()`가 `None`을 반환합니다.
    pub fn close(&self) {
        self.inner.cancel_token.cancel();

        let slots: Vec<Arc<SubscriberSlot>> = {
            let mut registry = self.inner.registry.write();
            registry.drain().map(|(_, slot)| slot).collect()
        };
        metrics::gauge!(m::BROKER_ACTIVE_SUBSCRIPTIONS).set(0.0);

        let closed = slots.iter().filter(|slot| slot.close()).count();
        tracing::info!(
            closed_subscriptions = closed,
            published = self.inner.published.load(Ordering::Relaxed),
            "broker closed"
        );
    }

    /// 닫힘 여부
    pub fn is_closed(&self) -> bool {
        self.inner.cancel_token.is_cancelled()
    }

    /// 현재 활성 구독 수
    pub fn subscription_count(&self) -> usize {
        self.inner.registry.read().len()
    }

    /// 활성 구독 목록 (식별자 순)
    pub fn subscriptions(&self) -> Vec<SubscriptionInfo> {
        let mut infos: Vec<SubscriptionInfo> = self
            .inner
            .registry
            .read()
            .values()
            .map(|slot| {
                let mut kinds: Vec<EventKind> = slot.filter().kinds().iter().copied().collect();
                kinds.sort_by_key(|kind| kind.as_str());
                SubscriptionInfo {
                    id: slot.id().to_string(),
                    kinds,
                    networks: slot.filter().networks().to_vec(),
                    queued: slot.queued(),
                    delivered: slot.delivered(),
                    dropped: slot.dropped(),
                }
            })
            .collect();
        infos.sort_by(|a, b| a.id.cmp(&b.id));
        infos
    }

    /// 누적 통계
    pub fn stats(&self) -> BrokerStats {
        BrokerStats {
            published: self.inner.published.load(Ordering::Relaxed),
            delivered: self.inner.delivered.load(Ordering::Relaxed),
            dropped: self.inner.dropped.load(Ordering::Relaxed),
            active_subscriptions: self.subscription_count(),
        }
    }

    /// 입력 채널을 소비해 이벤트를 발행하는 디스패치 태스크를 시작합니다.
    ///
    /// 브로커가 닫히거나 채널의 모든 송신측이 닫히면 종료합니다.
    pub fn spawn_dispatcher(&self, mut rx: mpsc::Receiver<Event>) -> JoinHandle<()> {
        let broker = self.clone();
        tokio::spawn(async move {
            tracing::info!("broker dispatcher started");
            loop {
                tokio::select! {
                    biased;
                    _ = broker.inner.cancel_token.cancelled() => {
                        tracing::debug!("broker dispatcher received shutdown signal");
                        break;
                    }
                    event = rx.recv() => match event {
                        Some(event) => broker.publish(&event),
                        None => {
                            tracing::debug!("broker input channel closed");
                            break;
                        }
                    }
                }
            }
            tracing::info!(stats = ?broker.stats(), "broker dispatcher stopped");
        })
    }
}

impl Default for Broker {
    fn default() -> Self {
        Self::new(BrokerConfig::default())
    }
}
