//! 브로커 팬아웃 벤치마크
//!
//! 구독 수와 네트워크 필터 유무에 따른 publish 비용을 측정합니다.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use catcher_broker::{Broker, BrokerConfig, OverflowPolicy, Subscription};
use catcher_core::event::{Event, EventKind};

fn sample_event() -> Event {
    Event {
        kind: EventKind::PortDown,
        host: "192.168.1.105".to_owned(),
        port: 7,
        ..Event::default()
    }
}

fn broker_with(subscribers: usize, nets: &[&str]) -> (Broker, Vec<Subscription>) {
    let broker = Broker::new(BrokerConfig {
        queue_capacity: 64,
        overflow_policy: OverflowPolicy::DropOldest,
    });
    let subs = (0..subscribers)
        .map(|i| {
            broker
                .subscribe(&format!("bench{i}"), &[EventKind::PortDown], nets)
                .expect("subscribe")
        })
        .collect();
    (broker, subs)
}

fn bench_publish_fanout(c: &mut Criterion) {
    let event = sample_event();
    let mut group = c.benchmark_group("broker_publish");
    group.throughput(Throughput::Elements(1));

    for subscribers in [1usize, 10, 100] {
        let (broker, _subs) = broker_with(subscribers, &[]);
        group.bench_with_input(
            BenchmarkId::new("kind_filter", subscribers),
            &broker,
            |b, broker| b.iter(|| broker.publish(black_box(&event))),
        );

        let (broker, _subs) = broker_with(subscribers, &["10.0.0.0/8", "192.168.0.0/16"]);
        group.bench_with_input(
            BenchmarkId::new("network_filter", subscribers),
            &broker,
            |b, broker| b.iter(|| broker.publish(black_box(&event))),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_publish_fanout);
criterion_main!(benches);
