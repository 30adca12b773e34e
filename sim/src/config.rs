//! Configuration for the motion core.
//!
//! `MotionConfig` is process-wide tuning (tick rate, pool size, seed and
//! placement distances). `RoundConfig` is the per-round population handed
//! over by the config-loading collaborator on round start.

use crate::error::{MotionError, Result};
use crate::pattern::{MotionPattern, PatternTag};
use bevy_ecs::prelude::*;
use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// How ticks are driven once a round starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DriveMode {
    /// A dedicated tick thread runs at `tick_interval_secs`.
    #[default]
    Threaded,
    /// The host advances ticks explicitly (fixed-timestep accumulator, tests, replays).
    Manual,
}

/// Distances used by the placement pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    /// Max horizontal distance from the player before an entity is re-placed.
    pub x_threshold: f32,
    /// Max vertical distance from the player before an entity is re-placed.
    pub y_threshold: f32,
    pub min_travel_x: f32,
    pub max_travel_x: f32,
    pub min_travel_y: f32,
    pub max_travel_y: f32,
    /// Half-width of the horizontal scatter for patterns with no heading.
    pub max_static_offset_x: f32,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            x_threshold: 30.0,
            y_threshold: 20.0,
            min_travel_x: 8.0,
            max_travel_x: 14.0,
            min_travel_y: 10.0,
            max_travel_y: 18.0,
            max_static_offset_x: 6.0,
        }
    }
}

impl PlacementConfig {
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("x_threshold", self.x_threshold),
            ("y_threshold", self.y_threshold),
            ("min_travel_x", self.min_travel_x),
            ("max_travel_x", self.max_travel_x),
            ("min_travel_y", self.min_travel_y),
            ("max_travel_y", self.max_travel_y),
            ("max_static_offset_x", self.max_static_offset_x),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(MotionError::InvalidConfig(format!(
                    "placement.{name} must be a finite non-negative distance, got {value}"
                )));
            }
        }
        if self.min_travel_x > self.max_travel_x {
            return Err(MotionError::InvalidConfig(format!(
                "placement travel x range is inverted ({} > {})",
                self.min_travel_x, self.max_travel_x
            )));
        }
        if self.min_travel_y > self.max_travel_y {
            return Err(MotionError::InvalidConfig(format!(
                "placement travel y range is inverted ({} > {})",
                self.min_travel_y, self.max_travel_y
            )));
        }

        // Legal, but entities placed this far out are re-placed again next tick.
        if self.max_travel_x.max(self.max_static_offset_x) > self.x_threshold {
            warn!(
                max_travel_x = self.max_travel_x,
                x_threshold = self.x_threshold,
                "placement can land outside the x threshold"
            );
        }
        if self.max_travel_y > self.y_threshold {
            warn!(
                max_travel_y = self.max_travel_y,
                y_threshold = self.y_threshold,
                "placement can land outside the y threshold"
            );
        }
        Ok(())
    }
}

/// Process-wide motion tuning.
#[derive(Resource, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Seconds per tick; also the simulation-time step.
    pub tick_interval_secs: f32,
    /// Entities per worker batch. 0 picks a quarter of the population.
    pub batch_size: usize,
    /// Size of the bounded worker pool. 0 lets rayon decide.
    pub worker_threads: usize,
    /// Seed every per-entity random stream is split from.
    pub process_seed: u64,
    pub drive: DriveMode,
    pub placement: PlacementConfig,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: 1.0 / 30.0,
            batch_size: 0,
            worker_threads: 4,
            process_seed: 0x5EED_CAFE,
            drive: DriveMode::Threaded,
            placement: PlacementConfig::default(),
        }
    }
}

impl MotionConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.tick_interval()?;
        self.placement.validate()
    }

    /// Wall-clock tick period. Fails unless `tick_interval_secs` converts to
    /// a non-zero `Duration`.
    pub fn tick_interval(&self) -> Result<Duration> {
        Duration::try_from_secs_f32(self.tick_interval_secs)
            .ok()
            .filter(|interval| !interval.is_zero())
            .ok_or_else(|| {
                MotionError::InvalidConfig(format!(
                    "tick_interval_secs must be a positive duration, got {}",
                    self.tick_interval_secs
                ))
            })
    }

    /// Batch length for a population of `count` entities.
    pub fn batch_len(&self, count: usize) -> usize {
        if self.batch_size > 0 {
            self.batch_size
        } else {
            (count / 4).max(1)
        }
    }
}

/// Per-round population supplied on round start.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoundConfig {
    pub count: usize,
    pub speeds: Vec<f32>,
    pub patterns: Vec<PatternTag>,
    /// (frequency, amplitude) for wavy, (active, pause) for jerky, unused otherwise.
    pub pattern_params: Vec<Vec2>,
    /// Spawn positions. Empty means every entity starts at the origin.
    #[serde(default)]
    pub initial_positions: Vec<Vec2>,
}

impl RoundConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Start an empty config and add entities with [`RoundConfig::with_entity`].
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entity(mut self, speed: f32, pattern: MotionPattern, params: Vec2) -> Self {
        self.count += 1;
        self.speeds.push(speed);
        self.patterns.push(pattern.into());
        self.pattern_params.push(params);
        self
    }

    /// Like [`RoundConfig::with_entity`] with an explicit spawn position.
    ///
    /// Mixing this with `with_entity` leaves `initial_positions` short, which
    /// round creation rejects.
    pub fn with_entity_at(
        mut self,
        speed: f32,
        pattern: MotionPattern,
        params: Vec2,
        position: Vec2,
    ) -> Self {
        self.initial_positions.push(position);
        self.with_entity(speed, pattern, params)
    }

    /// `count` copies of one entity.
    pub fn uniform(count: usize, speed: f32, pattern: MotionPattern, params: Vec2) -> Self {
        Self {
            count,
            speeds: vec![speed; count],
            patterns: vec![pattern.into(); count],
            pattern_params: vec![params; count],
            initial_positions: Vec::new(),
        }
    }
}
