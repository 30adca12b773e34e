//! Public API for the motion core.
//!
//! `SimWorld` is the interface a game engine (or any other client) talks to.
//! It owns the round lifecycle gate plus an ECS world holding the player and
//! one visual per enemy.
//!
//! ## Frame Flow
//!
//! Every `step(dt)`:
//! 1. Input schedule: `player_sample_system` pushes the Player position to the motion core
//! 2. In `DriveMode::Manual`, runs as many fixed ticks as the accumulated time allows
//!    (in `DriveMode::Threaded` the tick thread is already running)
//! 3. Output schedule: `transform_sync_system` copies published transforms onto visuals
//!
//! ## Fixed Timestep
//!
//! In manual mode time accumulates and ticks run at `tick_interval_secs`, so
//! the outcome is the same regardless of frame rate.

use crate::buffers::{TransformAccess, TransformHandle};
use crate::components::*;
use crate::config::{DriveMode, MotionConfig, RoundConfig};
use crate::error::Result;
use crate::lifecycle::RoundLifecycleGate;
use crate::pattern::PatternTag;
use crate::profiler::SectionStats;
use crate::systems::{player_sample_system, transform_sync_system};
use crate::transform_buffer::transforms_to_flatbuffer;
use crate::world::Snapshot;
use bevy_ecs::prelude::*;
use glam::Vec2;

/// The main motion world container.
///
/// Holds the ECS world, the input/output schedules and the round gate,
/// providing a clean API for:
/// - Starting and ending rounds
/// - Tracking the player
/// - Stepping the simulation forward
/// - Extracting state snapshots
pub struct SimWorld {
    world: World,
    input: Schedule,
    output: Schedule,
    gate: RoundLifecycleGate,
    player: Entity,
    /// Accumulated time for fixed timestep.
    time_accumulator: f32,
}

impl SimWorld {
    /// Create a world with the default configuration.
    pub fn new() -> Result<Self> {
        Self::with_config(MotionConfig::default())
    }

    pub fn with_config(config: MotionConfig) -> Result<Self> {
        let gate = RoundLifecycleGate::new(config.clone())?;

        let mut world = World::new();
        world.insert_resource(config);
        world.insert_resource(gate.player().clone());
        world.insert_resource(gate.transforms().clone());
        let player = world.spawn(PlayerBundle::default()).id();

        let mut input = Schedule::default();
        input.add_systems(player_sample_system);
        let mut output = Schedule::default();
        output.add_systems(transform_sync_system);

        Ok(Self {
            world,
            input,
            output,
            gate,
            player,
            time_accumulator: 0.0,
        })
    }

    /// Move the player. Visible to the next tick's placement pass.
    pub fn set_player_position(&mut self, position: Vec2) {
        if let Some(mut pos) = self.world.get_mut::<Position>(self.player) {
            *pos = position.into();
        }
        self.gate.player().set(position);
    }

    pub fn player_position(&self) -> Vec2 {
        self.world
            .get::<Position>(self.player)
            .map(|p| p.to_vec2())
            .unwrap_or_default()
    }

    /// Start a round and spawn one visual per entity.
    ///
    /// Visuals of a previous round are despawned first.
    pub fn start_round(&mut self, round: &RoundConfig) -> Result<Vec<TransformHandle>> {
        self.despawn_visuals();
        self.input.run(&mut self.world);

        let handles = self.gate.on_round_start(round)?;
        let transforms = self.gate.transforms();
        let visuals: Vec<_> = handles
            .iter()
            .map(|&handle| {
                let position = transforms.get(handle).map(|t| t.position).unwrap_or_default();
                EnemyVisualBundle::new(handle, position)
            })
            .collect();
        self.world.spawn_batch(visuals);
        self.time_accumulator = 0.0;
        Ok(handles)
    }

    /// Start a round from its JSON description.
    pub fn start_round_json(&mut self, json: &str) -> Result<Vec<TransformHandle>> {
        let round = RoundConfig::from_json(json)?;
        self.start_round(&round)
    }

    /// End the active round and despawn its visuals.
    pub fn end_round(&mut self) {
        self.gate.on_round_end();
        self.despawn_visuals();
        self.time_accumulator = 0.0;
    }

    pub fn is_round_active(&self) -> bool {
        self.gate.is_active()
    }

    /// Change one enemy's speed, pattern and pattern parameters.
    pub fn update_enemy(
        &mut self,
        index: usize,
        speed: f32,
        pattern: PatternTag,
        params: Vec2,
    ) -> Result<()> {
        self.gate.update_entity(index, speed, pattern, params)
    }

    /// Advance the host frame by `dt` seconds. Returns the ticks run on this
    /// thread (always 0 in threaded mode).
    pub fn step(&mut self, dt: f32) -> u32 {
        self.input.run(&mut self.world);

        let mut ticks = 0;
        if self.gate.config().drive == DriveMode::Manual && self.gate.is_active() {
            let fixed_dt = self.gate.config().tick_interval_secs;
            self.time_accumulator += dt;
            while self.time_accumulator >= fixed_dt {
                self.gate.step();
                self.time_accumulator -= fixed_dt;
                ticks += 1;
            }
        }

        self.output.run(&mut self.world);
        ticks
    }

    /// Get a snapshot of the current state.
    pub fn snapshot(&mut self) -> Snapshot {
        let tick = self.current_tick();
        let time = self.current_time();
        let generation = self.gate.transforms().generation();
        Snapshot::from_world(&mut self.world, tick, time, generation)
    }

    /// Get the snapshot as a JSON string.
    pub fn snapshot_json(&mut self) -> String {
        self.snapshot().to_json().unwrap_or_else(|_| "{}".to_string())
    }

    /// Latest published transforms in the flat layout of [`crate::transform_buffer`].
    pub fn transform_buffer(&self) -> Vec<f32> {
        transforms_to_flatbuffer(self.gate.transforms().frame().as_ref())
    }

    pub fn transforms(&self) -> &TransformAccess {
        self.gate.transforms()
    }

    /// Ticks run in the current round.
    pub fn current_tick(&self) -> u64 {
        self.gate.tick_count()
    }

    /// Simulation time of the next tick.
    pub fn current_time(&self) -> f32 {
        self.gate.current_time() as f32
    }

    /// Timing of one tick section (`"placement"`, `"movement"` or `"publish"`).
    pub fn pass_stats(&self, section: &str) -> Option<SectionStats> {
        self.gate.pass_stats(section)
    }

    /// Get direct access to the ECS world (for advanced usage).
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Get mutable access to the ECS world (for advanced usage).
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    fn despawn_visuals(&mut self) {
        let mut query = self.world.query_filtered::<Entity, With<EnemyVisual>>();
        let visuals: Vec<Entity> = query.iter(&self.world).collect();
        for entity in visuals {
            self.world.despawn(entity);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MotionError;
    use crate::pattern::MotionPattern;
    use crate::profiler::{MOVEMENT, PLACEMENT};
    use crate::transform_buffer::{enemy_offset, parse_enemy_count, FIELD_X, FIELD_Y};
    use std::thread;
    use std::time::{Duration, Instant};

    fn manual_world() -> SimWorld {
        SimWorld::with_config(MotionConfig {
            tick_interval_secs: 1.0,
            worker_threads: 2,
            drive: DriveMode::Manual,
            ..Default::default()
        })
        .unwrap()
    }

    fn four_patterns() -> RoundConfig {
        RoundConfig::new()
            .with_entity(1.0, MotionPattern::LinearRight, Vec2::ZERO)
            .with_entity(1.0, MotionPattern::Static, Vec2::ZERO)
            .with_entity(1.0, MotionPattern::WavyRight, Vec2::new(1.0, 2.0))
            .with_entity(1.0, MotionPattern::JerkyRight, Vec2::new(1.0, 1.0))
    }

    #[test]
    fn test_sim_world_creation() {
        let mut sim = SimWorld::new().unwrap();
        assert_eq!(sim.current_tick(), 0);
        assert!(!sim.is_round_active());
        assert!(sim.snapshot().enemies.is_empty());
        assert_eq!(sim.transform_buffer(), vec![0.0, 0.0]);
    }

    #[test]
    fn test_round_through_facade() {
        let mut sim = manual_world();
        sim.set_player_position(Vec2::new(5.0, 0.0));
        let handles = sim.start_round(&four_patterns()).unwrap();
        assert_eq!(handles.len(), 4);

        let mut ticks = 0;
        for _ in 0..10 {
            ticks += sim.step(1.0);
        }
        assert_eq!(ticks, 10);
        assert_eq!(sim.current_tick(), 10);

        let snapshot = sim.snapshot();
        assert_eq!(snapshot.enemies.len(), 4);
        assert_eq!(snapshot.enemies[0].x, 10.0);
        assert_eq!((snapshot.enemies[1].x, snapshot.enemies[1].y), (0.0, 0.0));
        assert!((snapshot.enemies[2].x - 10.0).abs() < 1e-5);
        assert!(snapshot.enemies[2].y.abs() <= 2.0);
        assert_eq!(snapshot.enemies[3].x, 5.0);
        assert_eq!(snapshot.player_x, 5.0);

        let buffer = sim.transform_buffer();
        assert_eq!(parse_enemy_count(&buffer), Some(4));
        assert_eq!(buffer[enemy_offset(0) + FIELD_X], 10.0);
        assert!(sim.pass_stats(PLACEMENT).is_some());
        assert!(sim.pass_stats(MOVEMENT).is_some());
    }

    #[test]
    fn test_fixed_timestep_accumulates() {
        let mut sim = manual_world();
        sim.start_round(&four_patterns()).unwrap();
        assert_eq!(sim.step(0.4), 0);
        assert_eq!(sim.step(0.4), 0);
        assert_eq!(sim.step(0.4), 1);
        assert_eq!(sim.step(2.0), 2);
        assert_eq!(sim.current_tick(), 3);
    }

    #[test]
    fn test_player_jump_through_ecs() {
        let mut sim = manual_world();
        sim.start_round(&four_patterns()).unwrap();
        sim.step(1.0);

        // Move the player through the ECS world, as a host system would
        let player = sim.player;
        sim.world_mut()
            .entity_mut(player)
            .insert(Position::new(500.0, 0.0));
        sim.step(1.0);

        for enemy in sim.snapshot().enemies {
            assert!((enemy.x - 500.0).abs() <= 14.0, "enemy {} at {}", enemy.id, enemy.x);
            assert!(enemy.y <= -10.0 && enemy.y >= -18.0);
        }
        let buffer = sim.transform_buffer();
        assert!(buffer[enemy_offset(1) + FIELD_Y] <= -10.0);
    }

    #[test]
    fn test_start_round_json() {
        let mut sim = manual_world();
        let handles = sim
            .start_round_json(
                r#"{"count":2,"speeds":[1.0,2.0],"patterns":[2,3],"pattern_params":[[0,0],[0,0]]}"#,
            )
            .unwrap();
        assert_eq!(handles.len(), 2);
        sim.step(1.0);
        let snapshot = sim.snapshot();
        assert_eq!(snapshot.enemies[0].y, 1.0);
        assert_eq!(snapshot.enemies[1].y, -2.0);

        let err = sim.start_round_json(r#"{"count":2,"speeds":[1.0]"#).unwrap_err();
        assert!(matches!(err, MotionError::Parse(_)));
    }

    #[test]
    fn test_end_round_clears_visuals() {
        let mut sim = manual_world();
        let handles = sim.start_round(&four_patterns()).unwrap();
        sim.step(1.0);
        sim.end_round();

        assert!(!sim.is_round_active());
        assert!(sim.snapshot().enemies.is_empty());
        assert!(sim.transforms().get(handles[0]).is_none());
        assert_eq!(sim.step(5.0), 0);
        assert!(sim
            .update_enemy(0, 1.0, MotionPattern::Static.into(), Vec2::ZERO)
            .is_err());
    }

    #[test]
    fn test_restart_respawns_visuals() {
        let mut sim = manual_world();
        sim.start_round(&four_patterns()).unwrap();
        sim.start_round(&RoundConfig::uniform(7, 1.0, MotionPattern::Static, Vec2::ZERO))
            .unwrap();
        assert_eq!(sim.snapshot().enemies.len(), 7);
        assert_eq!(sim.current_tick(), 0);
    }

    #[test]
    fn test_update_enemy() {
        let mut sim = manual_world();
        sim.start_round(&four_patterns()).unwrap();
        sim.update_enemy(1, 3.0, MotionPattern::LinearDown.into(), Vec2::ZERO)
            .unwrap();
        sim.step(1.0);
        assert_eq!(sim.snapshot().enemies[1].y, -3.0);
        assert!(matches!(
            sim.update_enemy(9, 1.0, MotionPattern::Static.into(), Vec2::ZERO),
            Err(MotionError::IndexOutOfRange { index: 9, count: 4 })
        ));
    }

    #[test]
    fn test_threaded_round_publishes() {
        let mut sim = SimWorld::with_config(MotionConfig {
            tick_interval_secs: 0.002,
            ..Default::default()
        })
        .unwrap();
        sim.start_round(&RoundConfig::uniform(100, 0.01, MotionPattern::LinearUp, Vec2::ZERO))
            .unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while sim.current_tick() < 3 && Instant::now() < deadline {
            assert_eq!(sim.step(0.016), 0);
            thread::sleep(Duration::from_millis(2));
        }
        sim.step(0.0);
        assert!(sim.current_tick() >= 3);
        assert!(sim.snapshot().enemies.iter().all(|e| e.y > 0.0));
        sim.end_round();
    }
}
