//! 구독 -- 필터, 구독별 대기 큐, 소비자 핸들
//!
//! 각 구독은 자신만의 bounded 큐를 가지며, broker는 필터를 통과한 이벤트를
//! 블로킹 없이 큐에 밀어 넣고 [`Notify`]로 소비자를 깨웁니다.
//! 큐가 가득 차면 [`OverflowPolicy`]에 따라 이벤트를 버립니다.
//!
//! ```text
//! Broker::publish -> filter -> SubscriberSlot (VecDeque + Notify) -> Subscription::next
//! ```

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::str::FromStr;
use std::sync::Weak;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use catcher_core::event::{Event, EventKind};
use catcher_core::types::IpNetwork;

use crate::broker::BrokerInner;

/// 드롭 경고 로그 간격 (첫 드롭과 이 배수마다 기록)
const DROP_WARN_INTERVAL: u64 = 1000;

/// 구독 큐가 가득 찼을 때의 처리 정책
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// 가장 오래된 이벤트를 버리고 새 이벤트를 넣음
    #[default]
    DropOldest,
    /// 새 이벤트를 버림
    DropNewest,
}

impl OverflowPolicy {
    /// 설정 파일 표기를 반환합니다.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DropOldest => "drop_oldest",
            Self::DropNewest => "drop_newest",
        }
    }
}

impl FromStr for OverflowPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "drop_oldest" => Ok(Self::DropOldest),
            "drop_newest" => Ok(Self::DropNewest),
            other => Err(format!(
                "unknown overflow policy '{other}', expected drop_oldest or drop_newest"
            )),
        }
    }
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 구독 식별자
///
/// `{name}-{unix_micros}-{seq}` 형식이며, 같은 이름의 구독이 동시에 있어도
/// broker 내부 순번으로 구분됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(String);

impl SubscriptionId {
    pub(crate) fn generate(name: &str, seq: u64) -> Self {
        let micros = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_micros())
            .unwrap_or_default();
        Self(format!("{name}-{micros}-{seq}"))
    }

    /// 문자열 표현
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 구독 필터
///
/// 이벤트 종류 집합은 항상 검사하고, 네트워크 목록이 비어 있지 않으면
/// 호스트 주소가 그중 하나에 속해야 합니다.
#[derive(Debug, Clone)]
pub struct SubscriptionFilter {
    kinds: HashSet<EventKind>,
    networks: Vec<IpNetwork>,
}

impl SubscriptionFilter {
    /// 필터를 생성합니다.
    pub fn new(kinds: impl IntoIterator<Item = EventKind>, networks: Vec<IpNetwork>) -> Self {
        Self {
            kinds: kinds.into_iter().collect(),
            networks,
        }
    }

    /// 이벤트가 필터를 통과하는지 검사합니다.
    ///
    /// 네트워크 필터가 있을 때 호스트가 IP로 해석되지 않으면 통과하지 못합니다.
    pub fn matches(&self, event: &Event) -> bool {
        if !self.kinds.contains(&event.kind) {
            return false;
        }
        if self.networks.is_empty() {
            return true;
        }
        match event.host.parse() {
            Ok(addr) => self.networks.iter().any(|net| net.contains(addr)),
            Err(_) => false,
        }
    }

    /// 구독 중인 이벤트 종류
    pub fn kinds(&self) -> &HashSet<EventKind> {
        &self.kinds
    }

    /// 네트워크 필터
    pub fn networks(&self) -> &[IpNetwork] {
        &self.networks
    }
}

/// 큐 삽입 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Offer {
    /// 큐에 들어감
    Queued,
    /// 큐에 들어갔고 가장 오래된 이벤트 하나가 밀려남
    QueuedEvicting,
    /// 새 이벤트가 버려짐
    Rejected,
    /// 구독이 닫혀 있음
    Closed,
}

#[derive(Debug, Default)]
struct SlotQueue {
    events: VecDeque<Event>,
    closed: bool,
}

/// broker 레지스트리에 등록되는 구독 상태
#[derive(Debug)]
pub(crate) struct SubscriberSlot {
    id: SubscriptionId,
    name: String,
    filter: SubscriptionFilter,
    capacity: usize,
    policy: OverflowPolicy,
    queue: Mutex<SlotQueue>,
    notify: Notify,
    delivered: AtomicU64,
    dropped: AtomicU64,
}

impl SubscriberSlot {
    pub(crate) fn new(
        id: SubscriptionId,
        name: String,
        filter: SubscriptionFilter,
        capacity: usize,
        policy: OverflowPolicy,
    ) -> Self {
        Self {
            id,
            name,
            filter,
            capacity,
            policy,
            queue: Mutex::new(SlotQueue::default()),
            notify: Notify::new(),
            delivered: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    pub(crate) fn id(&self) -> &SubscriptionId {
        &self.id
    }

    pub(crate) fn filter(&self) -> &SubscriptionFilter {
        &self.filter
    }

    /// 이벤트를 큐에 넣습니다. 절대 블로킹하지 않습니다.
    pub(crate) fn offer(&self, event: &Event) -> Offer {
        let outcome = {
            let mut queue = self.queue.lock();
            if queue.closed {
                return Offer::Closed;
            }
            if queue.events.len() < self.capacity {
                queue.events.push_back(event.clone());
                Offer::Queued
            } else {
                match self.policy {
                    OverflowPolicy::DropOldest => {
                        queue.events.pop_front();
                        queue.events.push_back(event.clone());
                        Offer::QueuedEvicting
                    }
                    OverflowPolicy::DropNewest => Offer::Rejected,
                }
            }
        };

        if outcome != Offer::Rejected {
            self.delivered.fetch_add(1, Ordering::Relaxed);
            self.notify.notify_one();
        }
        if matches!(outcome, Offer::QueuedEvicting | Offer::Rejected) {
            let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            if dropped == 1 || dropped % DROP_WARN_INTERVAL == 0 {
                tracing::warn!(
                    subscription = %self.id,
                    policy = %self.policy,
                    capacity = self.capacity,
                    dropped,
                    "subscription queue full, dropping events"
                );
            }
        }
        outcome
    }

    /// 큐에서 이벤트 하나를 꺼냅니다.
    ///
    /// `Ok(None)`은 비어 있음, `Err(())`는 닫힘을 뜻합니다.
    fn try_pop(&self) -> Result<Option<Event>, ()> {
        let mut queue = self.queue.lock();
        if queue.closed {
            return Err(());
        }
        Ok(queue.events.pop_front())
    }

    /// 구독을 닫고 대기 중인 소비자를 깨웁니다.
    ///
    /// 이 호출이 반환된 뒤에는 어떤 이벤트도 큐에 들어가지 않습니다.
    pub(crate) fn close(&self) -> bool {
        let was_open = {
            let mut queue = self.queue.lock();
            let was_open = !queue.closed;
            queue.closed = true;
            queue.events.clear();
            was_open
        };
        self.notify.notify_one();
        was_open
    }

    pub(crate) fn queued(&self) -> usize {
        self.queue.lock().events.len()
    }

    pub(crate) fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub(crate) fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// 구독 핸들
///
/// [`next`](Self::next)로 필터를 통과한 이벤트를 차례로 받습니다.
/// 핸들이 drop되면 broker 레지스트리에서 자동으로 해제됩니다.
///
/// # 사용 예시
/// ```ignore
/// let mut sub = broker.subscribe("noc", &[EventKind::PortDown], &["192.168.1.0/24"])?;
/// while let Some(event) = sub.next().await {
///     println!("{event}");
/// }
/// ```
#[derive(Debug)]
pub struct Subscription {
    slot: std::sync::Arc<SubscriberSlot>,
    broker: Weak<BrokerInner>,
    cancel_token: CancellationToken,
}

impl Subscription {
    pub(crate) fn new(
        slot: std::sync::Arc<SubscriberSlot>,
        broker: Weak<BrokerInner>,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            slot,
            broker,
            cancel_token,
        }
    }

    /// 구독 식별자
    pub fn id(&self) -> &SubscriptionId {
        &self.slot.id
    }

    /// 구독자가 요청한 이름
    pub fn name(&self) -> &str {
        &self.slot.name
    }

    /// 구독 필터
    pub fn filter(&self) -> &SubscriptionFilter {
        &self.slot.filter
    }

    /// 다음 이벤트를 기다립니다.
    ///
    /// 구독이 닫히거나 broker가 닫히면 `None`을 반환합니다.
    pub async fn next(&mut self) -> Option<Event> {
        loop {
            match self.slot.try_pop() {
                Ok(Some(event)) => return Some(event),
                Ok(None) => {}
                Err(()) => return None,
            }

            tokio::select! {
                _ = self.slot.notify.notified() => {}
                _ = self.cancel_token.cancelled() => return None,
            }
        }
    }

    /// 구독을 닫고 broker에서 해제합니다. 여러 번 호출해도 안전합니다.
    pub fn close(&mut self) {
        if let Some(broker) = self.broker.upgrade() {
            broker.remove(&self.slot.id);
        }
        self.slot.close();
    }

    /// 닫힘 여부
    pub fn is_closed(&self) -> bool {
        self.slot.queue.lock().closed
    }

    /// 현재 대기 중인 이벤트 수
    pub fn queued(&self) -> usize {
        self.slot.queued()
    }

    /// 큐에 들어간 이벤트 수
    pub fn delivered(&self) -> u64 {
        self.slot.delivered()
    }

    /// 큐 초과로 버려진 이벤트 수
    pub fn dropped(&self) -> u64 {
        self.slot.dropped()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.close();
    }
}
