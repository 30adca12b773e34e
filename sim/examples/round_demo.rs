//! Demonstration of one round of the horde motion core.
//!
//! Run with: cargo run --example round_demo
//! More output: RUST_LOG=horde_sim=debug cargo run --example round_demo

use glam::Vec2;
use horde_sim::{DriveMode, MotionConfig, MotionPattern, RoundConfig, SimWorld};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn main() -> horde_sim::Result<()> {
    init_tracing();
    println!("=== Horde Sim - Round Demo ===\n");

    let config = MotionConfig {
        tick_interval_secs: 0.05,
        drive: DriveMode::Manual,
        ..Default::default()
    };
    let mut sim = SimWorld::with_config(config)?;

    // One of each pattern family
    let round = RoundConfig::new()
        .with_entity(0.5, MotionPattern::LinearRight, Vec2::ZERO)
        .with_entity(0.5, MotionPattern::LinearLeft, Vec2::ZERO)
        .with_entity(0.5, MotionPattern::WavyRight, Vec2::new(2.0, 3.0))
        .with_entity(0.5, MotionPattern::JerkyLeft, Vec2::new(0.5, 0.5))
        .with_entity(0.0, MotionPattern::Static, Vec2::ZERO)
        .with_entity(15.0, MotionPattern::RotateInPlace, Vec2::ZERO);
    sim.start_round(&round)?;

    println!("Initial state:");
    print_snapshot(&mut sim);

    // Player falls steadily; enemies get re-placed ahead of them
    for frame in 0..200 {
        let player = Vec2::new(0.0, -(frame as f32) * 0.4);
        sim.set_player_position(player);
        sim.step(0.05);

        if (frame + 1) % 40 == 0 {
            println!(
                "--- Tick {} (t={:.2}s) player=({:.1}, {:.1}) ---",
                sim.current_tick(),
                sim.current_time(),
                player.x,
                player.y
            );
            print_snapshot(&mut sim);
        }
    }

    if let Some(stats) = sim.pass_stats("placement") {
        println!("\nplacement: {} calls, avg {:?}", stats.call_count, stats.avg_time());
    }
    if let Some(stats) = sim.pass_stats("movement") {
        println!("movement:  {} calls, avg {:?}", stats.call_count, stats.avg_time());
    }

    println!("\n=== Final State (JSON) ===\n");
    println!("{}", sim.snapshot_json());

    sim.end_round();
    Ok(())
}

fn print_snapshot(sim: &mut SimWorld) {
    let snapshot = sim.snapshot();
    for enemy in &snapshot.enemies {
        println!(
            "    Enemy {}: pos=({:.1}, {:.1}) rot={:.0}",
            enemy.id, enemy.x, enemy.y, enemy.rotation
        );
    }
}
