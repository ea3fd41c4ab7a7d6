use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use padel_scoreboard::bridge::{BridgeMessage, decode_line, encode_line};
use padel_scoreboard::format::ScoreboardView;
use padel_scoreboard::snapshot::{DisplayConfig, parse_snapshot_json};

const SNAPSHOT_JSON: &str = r#"{
  "points": { "A": 3, "B": 3 },
  "games": { "A": 5, "B": 4 },
  "sets": [ { "A": 6, "B": 4 }, { "A": 3, "B": 6 }, { "A": 5, "B": 4 } ],
  "tie_break": false,
  "terminado": false,
  "bola_de_oro": true
}"#;

fn bench_snapshot_parse(c: &mut Criterion) {
    c.bench_function("snapshot_parse", |b| {
        b.iter(|| {
            let snap = parse_snapshot_json(black_box(SNAPSHOT_JSON)).unwrap();
            black_box(snap.sets.len());
        })
    });
}

fn bench_view_build(c: &mut Criterion) {
    let snap = parse_snapshot_json(SNAPSHOT_JSON).unwrap();
    let config = DisplayConfig::default();
    c.bench_function("scoreboard_view_build", |b| {
        b.iter(|| {
            let view = ScoreboardView::build(black_box(&snap), black_box(&config), 754);
            black_box(view.golden_point);
        })
    });
}

fn bench_bridge_roundtrip(c: &mut Criterion) {
    let msg = BridgeMessage::Snapshot {
        snapshot: parse_snapshot_json(SNAPSHOT_JSON).unwrap(),
        config: DisplayConfig::default(),
        fresh_match: false,
    };
    c.bench_function("bridge_line_roundtrip", |b| {
        b.iter(|| {
            let line = encode_line(black_box(&msg)).unwrap();
            black_box(decode_line(&line).unwrap());
        })
    });
}

criterion_group!(
    benches,
    bench_snapshot_parse,
    bench_view_build,
    bench_bridge_roundtrip
);
criterion_main!(benches);
