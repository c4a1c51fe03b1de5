//! Criterion benchmarks for performance-critical hot paths
//!
//! Covers: per-sync engine processing, pose geometry, normalization and the
//! outbound message queue.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::time::Duration;
use touchpad2touch::capture::types::SurfaceBounds;
use touchpad2touch::capture::MessageRing;
use touchpad2touch::engine::normalize::normalize_point;
use touchpad2touch::engine::pose::{compute_pose, Point, PoseConfig};
use touchpad2touch::engine::{EngineConfig, TouchSink, TriggerMode};
use touchpad2touch::{AxisRange, ContactProtocol, Engine, OutboundMessage, RawEvent, Timestamp};

/// Touch sink that discards everything
struct NullSink;

impl TouchSink for NullSink {
    fn press(&mut self) -> touchpad2touch::Result<()> {
        Ok(())
    }

    fn release(&mut self) -> touchpad2touch::Result<()> {
        Ok(())
    }

    fn move_to(&mut self, _x: u16, _y: u16) -> touchpad2touch::Result<()> {
        Ok(())
    }

    fn sync(&mut self) -> touchpad2touch::Result<()> {
        Ok(())
    }
}

fn bounds() -> SurfaceBounds {
    SurfaceBounds::new(AxisRange::new(0, 4000), AxisRange::new(0, 3000))
}

fn engine(fingers: i32) -> Engine {
    let config = EngineConfig {
        calibration_window: Duration::ZERO,
        trigger_mode: TriggerMode::Keyboard,
        ..EngineConfig::default()
    };
    let mut engine = Engine::new(
        config,
        ContactProtocol::MultiTouch,
        bounds(),
        Timestamp::from_millis(0),
    );
    let mut out: Vec<OutboundMessage> = Vec::new();
    for slot in 0..fingers {
        for event in [
            RawEvent::Slot(slot),
            RawEvent::TrackingId(slot + 1),
            RawEvent::x(500 + slot * 900),
            RawEvent::y(1500 - slot * 200),
        ] {
            let _ = engine.apply(&event, Timestamp::from_millis(slot as u64), &mut NullSink, &mut out);
        }
    }
    engine
}

// ---------------------------------------------------------------------------
// Engine benchmarks
// ---------------------------------------------------------------------------

fn bench_engine_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_frame");

    for fingers in [1, 2, 3, 5] {
        group.bench_with_input(BenchmarkId::from_parameter(fingers), &fingers, |b, &fingers| {
            let mut engine = engine(fingers);
            let (mut producer, mut consumer) = MessageRing::<OutboundMessage>::with_capacity(4096).split();
            let mut tick = 0i32;
            let mut ms = 100u64;

            b.iter(|| {
                tick = (tick + 1) % 400;
                ms += 8;
                let now = Timestamp::from_millis(ms);
                let events = [
                    RawEvent::Slot(fingers - 1),
                    RawEvent::x(1000 + tick),
                    RawEvent::y(1000 + tick / 2),
                    RawEvent::Sync,
                ];
                for event in &events {
                    let _ = engine.apply(black_box(event), now, &mut NullSink, &mut producer);
                }
                consumer.pop_batch(64);
            });
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// Geometry benchmarks
// ---------------------------------------------------------------------------

fn bench_compute_pose(c: &mut Criterion) {
    let cfg = PoseConfig::default();
    let thumb = Point::new(420.0, 760.0);
    let mid = Point::new(960.0, 540.0);
    let pink = Point::new(1400.0, 610.0);

    c.bench_function("compute_pose", |b| {
        b.iter(|| compute_pose(black_box(thumb), black_box(mid), black_box(pink), &cfg));
    });
}

fn bench_normalize(c: &mut Criterion) {
    let bounds = bounds();
    c.bench_function("normalize_point", |b| {
        let mut raw = 0i32;
        b.iter(|| {
            raw = (raw + 37) % 4500;
            normalize_point(black_box((raw, raw / 2)), &bounds)
        });
    });
}

// ---------------------------------------------------------------------------
// Queue benchmarks
// ---------------------------------------------------------------------------

fn bench_message_queue(c: &mut Criterion) {
    c.bench_function("outbound_push_pop", |b| {
        let (mut producer, mut consumer) = MessageRing::<OutboundMessage>::with_capacity(8192).split();
        let message = OutboundMessage::ActFrame {
            x: 1200,
            y: 3400,
            down: true,
        };

        b.iter(|| {
            if !producer.push(black_box(message.clone())) {
                consumer.pop_batch(4096);
            }
        });
    });
}

criterion_group!(
    benches,
    bench_engine_frame,
    bench_compute_pose,
    bench_normalize,
    bench_message_queue,
);

criterion_main!(benches);
