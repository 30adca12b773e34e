//! Round lifecycle gate.
//!
//! Ties buffer and scheduler lifetime to round boundaries. A round start
//! allocates fresh buffers and (in threaded mode) starts ticking; a round end
//! stops the scheduler, waits for the in-flight tick and only then releases
//! the buffers. Handles from an ended round resolve to nothing.

use crate::buffers::{EntityBufferSet, TransformAccess, TransformHandle};
use crate::config::{DriveMode, MotionConfig, RoundConfig};
use crate::error::{MotionError, Result};
use crate::pattern::PatternTag;
use crate::profiler::SectionStats;
use crate::scheduler::{MotionScheduler, TickStats};
use crate::signal::PlayerSignal;
use glam::Vec2;
use tracing::{info, warn};

/// Owns the active round, if any.
pub struct RoundLifecycleGate {
    config: MotionConfig,
    player: PlayerSignal,
    transforms: TransformAccess,
    active: Option<MotionScheduler>,
}

impl RoundLifecycleGate {
    pub fn new(config: MotionConfig) -> Result<Self> {
        Self::with_shared(config, PlayerSignal::default(), TransformAccess::new())
    }

    /// Build a gate around an existing player signal and transform output.
    pub fn with_shared(
        config: MotionConfig,
        player: PlayerSignal,
        transforms: TransformAccess,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            player,
            transforms,
            active: None,
        })
    }

    /// Allocate buffers for `round` and start ticking.
    ///
    /// A round that is still active is ended first. On error nothing is
    /// allocated and no tick runs.
    pub fn on_round_start(&mut self, round: &RoundConfig) -> Result<Vec<TransformHandle>> {
        if self.active.is_some() {
            warn!("round started while the previous one was active, ending it");
            self.on_round_end();
        }

        let interval = self.config.tick_interval()?;
        let buffers =
            EntityBufferSet::create(round, self.config.process_seed, &self.transforms)?;
        let handles = buffers.handles();
        let generation = buffers.generation();

        // Any error below drops the buffers, which detaches the new generation.
        let mut scheduler =
            MotionScheduler::new(buffers, self.config.clone(), self.player.clone())?;
        if self.config.drive == DriveMode::Threaded {
            scheduler.start(interval)?;
        }

        info!(
            count = round.count,
            generation,
            drive = ?self.config.drive,
            "round started"
        );
        self.active = Some(scheduler);
        Ok(handles)
    }

    /// Stop ticking, drain the in-flight tick and release the round's buffers.
    ///
    /// Does nothing between rounds.
    pub fn on_round_end(&mut self) {
        let Some(scheduler) = self.active.take() else {
            return;
        };
        let ticks = scheduler.tick_count();
        let buffers = scheduler.into_buffers();
        let generation = buffers.generation();
        buffers.destroy();
        info!(ticks, generation, "round ended");
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Change one entity of the active round.
    pub fn update_entity(
        &self,
        index: usize,
        speed: f32,
        pattern: PatternTag,
        params: Vec2,
    ) -> Result<()> {
        match &self.active {
            Some(scheduler) => scheduler.update_entity(index, speed, pattern, params),
            None => {
                warn!(index, "entity update with no active round");
                Err(MotionError::IndexOutOfRange { index, count: 0 })
            }
        }
    }

    /// Run one tick of the active round on the calling thread.
    pub fn step(&self) -> Option<TickStats> {
        self.active.as_ref().map(MotionScheduler::step)
    }

    pub fn scheduler(&self) -> Option<&MotionScheduler> {
        self.active.as_ref()
    }

    pub fn tick_count(&self) -> u64 {
        self.active.as_ref().map_or(0, MotionScheduler::tick_count)
    }

    pub fn current_time(&self) -> f64 {
        self.active.as_ref().map_or(0.0, MotionScheduler::current_time)
    }

    pub fn pass_stats(&self, section: &str) -> Option<SectionStats> {
        self.active.as_ref()?.pass_stats(section)
    }

    pub fn player(&self) -> &PlayerSignal {
        &self.player
    }

    pub fn transforms(&self) -> &TransformAccess {
        &self.transforms
    }

    pub fn config(&self) -> &MotionConfig {
        &self.config
    }
}

impl Drop for RoundLifecycleGate {
    fn drop(&mut self) {
        self.on_round_end();
    }
}
