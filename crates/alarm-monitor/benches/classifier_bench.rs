//! 이벤트 분류 벤치마크
//!
//! 액션 분류, 알람 생성, JSON 직렬화 성능을 측정합니다.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use dockermon_alarm_monitor::{AlarmRecord, ContainerAction, RawEvent, classify_action};

const ACTIONS: [&str; 8] = [
    "die", "stop", "start", "pause", "unpause", "create", "destroy", "exec_start",
];

fn create_event(action: &str, i: i64) -> RawEvent {
    RawEvent::new(
        ContainerAction::parse(action),
        1_700_000_000 + i,
        format!("container-{i}"),
        "registry.local/app:1.0",
    )
    .with_exit_code("0")
}

fn bench_classify_action(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify_action");

    for action in ACTIONS {
        let parsed = ContainerAction::parse(action);
        group.bench_with_input(BenchmarkId::from_parameter(action), &parsed, |b, parsed| {
            b.iter(|| classify_action(black_box(parsed)));
        });
    }

    group.finish();
}

fn bench_event_to_alarm(c: &mut Criterion) {
    let mut group = c.benchmark_group("event_to_alarm");

    for count in [10_i64, 100, 1000] {
        let events: Vec<RawEvent> = (0..count)
            .map(|i| create_event(ACTIONS[(i as usize) % ACTIONS.len()], i))
            .collect();

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &events, |b, events| {
            b.iter(|| {
                events
                    .iter()
                    .filter_map(|event| {
                        classify_action(&event.action).map(|classification| {
                            AlarmRecord::from_event(
                                event,
                                classification.description,
                                classification.severity,
                                "sha256:0123456789abcdef".to_owned(),
                            )
                        })
                    })
                    .count()
            });
        });
    }

    group.finish();
}

fn bench_alarm_to_json(c: &mut Criterion) {
    let event = create_event("die", 1);
    let classification = classify_action(&event.action).expect("die is classified");
    let alarm = AlarmRecord::from_event(
        &event,
        classification.description,
        classification.severity,
        "sha256:0123456789abcdef".to_owned(),
    );

    c.bench_function("alarm_to_json", |b| {
        b.iter(|| black_box(&alarm).to_json());
    });
}

criterion_group!(
    benches,
    bench_classify_action,
    bench_event_to_alarm,
    bench_alarm_to_json
);
criterion_main!(benches);
