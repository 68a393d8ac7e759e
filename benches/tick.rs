//! Tick benchmarks for the Outbreak host
//!
//! Measures a full simulation frame and its heaviest systems at increasing
//! bot counts.
//!
//! Run with: cargo bench --bench tick

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use hashbrown::HashMap;
use outbreak_server::config::GameConfig;
use outbreak_server::game::game_loop::GameLoop;
use outbreak_server::game::state::MatchPhase;
use outbreak_server::game::systems::ai::{self, SteeringParams};
use outbreak_server::game::systems::infection;
use outbreak_server::game::systems::physics::MovementParams;
use outbreak_server::net::protocol::{self, Message};
use rand::rngs::StdRng;
use rand::SeedableRng;

const FRAME: Duration = Duration::from_millis(16);

fn config() -> GameConfig {
    GameConfig {
        seed: Some(7),
        ..Default::default()
    }
}

/// A running match with `count` bots
fn create_loop_with_bots(count: usize) -> (GameLoop, Duration) {
    let mut game = GameLoop::new(config());
    for _ in 0..count {
        game.add_bot();
    }

    let inputs = HashMap::new();
    let mut now = FRAME;
    game.tick(now, &inputs);
    now += Duration::from_secs(4);
    game.tick(now, &inputs);
    assert_eq!(game.phase(), MatchPhase::Playing);
    (game, now)
}

fn bench_full_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");
    group.sample_size(50);
    let inputs = HashMap::new();

    for count in [10, 50, 100, 250] {
        let (mut game, start) = create_loop_with_bots(count);

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("bots", count), &count, |b, _| {
            // Frozen clock; the time limit never expires
            b.iter(|| black_box(game.tick(start, &inputs)));
        });
    }

    group.finish();
}

fn bench_ai(c: &mut Criterion) {
    let mut group = c.benchmark_group("ai");
    group.sample_size(50);
    let steering = SteeringParams::from_config(&config());
    let movement = MovementParams::from_config(&config());
    let mut rng = StdRng::seed_from_u64(1);

    for count in [10, 50, 100, 250] {
        let (mut game, _) = create_loop_with_bots(count);

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("steer", count), &count, |b, _| {
            b.iter(|| ai::update(game.state_mut(), &steering, &movement, &mut rng));
        });
    }

    group.finish();
}

fn bench_infection(c: &mut Criterion) {
    let mut group = c.benchmark_group("infection");

    for count in [50, 250] {
        let (mut game, _) = create_loop_with_bots(count);

        group.bench_with_input(BenchmarkId::new("contacts", count), &count, |b, _| {
            b.iter(|| black_box(infection::update(game.state_mut())));
        });
    }

    group.finish();
}

fn bench_snapshot_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot");

    for count in [10, 100, 250] {
        let (game, _) = create_loop_with_bots(count);

        group.bench_with_input(BenchmarkId::new("encode_state", count), &count, |b, _| {
            b.iter(|| black_box(protocol::encode(&Message::state(game.state()))));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_full_tick,
    bench_ai,
    bench_infection,
    bench_snapshot_encode
);
criterion_main!(benches);
