use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use glam::Vec2;
use horde_sim::{
    movement_pass, placement_pass, EntityBufferSet, MotionPattern, PlacementConfig, RoundConfig,
    TransformAccess,
};
use std::time::Duration;

fn population(count: usize) -> RoundConfig {
    let mut round = RoundConfig::uniform(count, 1.0, MotionPattern::LinearRight, Vec2::new(1.0, 2.0));
    for (i, tag) in round.patterns.iter_mut().enumerate() {
        *tag = MotionPattern::ALL[i % MotionPattern::ALL.len()].into();
    }
    round
}

fn bench_passes(c: &mut Criterion) {
    let mut group = c.benchmark_group("passes");
    let samples: usize = std::env::var("HORDE_BENCH_SAMPLES")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(30);
    group.sample_size(samples);
    group.measurement_time(Duration::from_secs(5));

    let placement = PlacementConfig::default();
    for &count in &[1_000usize, 10_000, 100_000] {
        let round = population(count);
        let batch = (count / 4).max(1);

        group.bench_function(format!("placement_{}", count), |b| {
            b.iter_batched(
                || EntityBufferSet::create(&round, 7, &TransformAccess::new()).unwrap(),
                |mut buffers| {
                    // Far player: every entity takes the placement branch
                    placement_pass(buffers.placement_lanes(), Vec2::new(1e4, 1e4), &placement, batch)
                },
                BatchSize::LargeInput,
            );
        });

        group.bench_function(format!("movement_{}", count), |b| {
            let mut buffers = EntityBufferSet::create(&round, 7, &TransformAccess::new()).unwrap();
            let mut tick = 0u32;
            b.iter(|| {
                movement_pass(buffers.movement_lanes(), f64::from(tick) / 30.0, batch);
                tick = tick.wrapping_add(1);
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_passes);
criterion_main!(benches);
