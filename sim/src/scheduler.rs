//! Motion scheduler - the repeating two-pass tick loop.
//!
//! ## Tick Order
//!
//! Every tick runs, under the round's buffer lock:
//!
//! 1. Sample the player position once (broadcast, immutable for the tick)
//! 2. **Placement pass** over all entities, batched across the worker pool
//! 3. **Movement pass** over all entities, only after placement has returned
//! 4. Publish transforms to the shared [`TransformAccess`](crate::buffers::TransformAccess)
//!
//! Returning from a pass means every batch has finished, so movement always
//! observes the complete placement output of the same tick. A tick never
//! starts before the previous one has published.
//!
//! ## Draining
//!
//! The buffer lock is held for the whole tick. [`MotionScheduler::update_entity`]
//! and [`MotionScheduler::into_buffers`] take the same lock, so configuration
//! edits and round teardown wait for an in-flight tick instead of racing it.
//!
//! ## Threading
//!
//! [`MotionScheduler::start`] spawns one tick thread paced by a
//! `crossbeam_channel::tick` ticker. [`MotionScheduler::stop`] signals the stop
//! channel and joins the thread; a tick already running completes first.
//! [`MotionScheduler::step`] runs a single tick on the caller's thread.

use crate::buffers::EntityBufferSet;
use crate::config::MotionConfig;
use crate::error::Result;
use crate::pattern::PatternTag;
use crate::profiler::{PassProfiler, SectionStats, MOVEMENT, PLACEMENT, PUBLISH};
use crate::signal::PlayerSignal;
use crate::systems::{movement_pass, placement_pass};
use crossbeam_channel::select;
use glam::Vec2;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, trace, warn};

/// Outcome of one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickStats {
    /// Index of the tick that just ran (0 for the first).
    pub tick: u64,
    /// Simulation time the movement pass evaluated at.
    pub time: f64,
    /// Entities flagged for re-placement by this tick's placement pass.
    pub placed: usize,
}

/// Bounded pool the passes fan out on.
struct WorkerPool {
    #[cfg(feature = "parallel")]
    pool: rayon::ThreadPool,
}

impl WorkerPool {
    fn new(threads: usize) -> Result<Self> {
        #[cfg(feature = "parallel")]
        {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .thread_name(|i| format!("motion-worker-{i}"))
                .build()?;
            Ok(Self { pool })
        }

        #[cfg(not(feature = "parallel"))]
        {
            let _ = threads;
            Ok(Self {})
        }
    }

    fn install<R, F>(&self, op: F) -> R
    where
        R: Send,
        F: FnOnce() -> R + Send,
    {
        #[cfg(feature = "parallel")]
        return self.pool.install(op);

        #[cfg(not(feature = "parallel"))]
        return op();
    }
}

struct TickState {
    buffers: EntityBufferSet,
    tick: u64,
    profiler: PassProfiler,
}

/// State shared between the scheduler handle and its tick thread.
struct TickCore {
    state: Mutex<TickState>,
    player: PlayerSignal,
    config: MotionConfig,
    pool: WorkerPool,
}

impl TickCore {
    /// Lock the round state. Waits for any in-flight tick to finish.
    fn lock(&self) -> MutexGuard<'_, TickState> {
        // Passes never leave an entity half-written, so a poisoned lock is still consistent.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn run_tick(&self) -> TickStats {
        let mut guard = self.lock();
        let TickState {
            buffers,
            tick,
            profiler,
        } = &mut *guard;

        let player = self.player.sample();
        let time = *tick as f64 * f64::from(self.config.tick_interval_secs);
        let batch = self.config.batch_len(buffers.len());
        let placement = &self.config.placement;
        let pool = &self.pool;

        let placed = profiler.time_section(PLACEMENT, || {
            pool.install(|| placement_pass(buffers.placement_lanes(), player, placement, batch))
        });
        // Placement has fully returned; movement may consume its flags.
        profiler.time_section(MOVEMENT, || {
            pool.install(|| movement_pass(buffers.movement_lanes(), time, batch))
        });
        profiler.time_section(PUBLISH, || buffers.publish());
        profiler.tick();

        let stats = TickStats {
            tick: *tick,
            time,
            placed,
        };
        *tick += 1;
        trace!(
            tick = stats.tick,
            placed,
            player_x = player.x,
            player_y = player.y,
            "motion tick"
        );
        stats
    }
}

struct TickWorker {
    stop: crossbeam_channel::Sender<()>,
    handle: JoinHandle<()>,
}

/// Drives placement and movement for one round's buffers.
pub struct MotionScheduler {
    core: Arc<TickCore>,
    worker: Option<TickWorker>,
}

impl MotionScheduler {
    /// Take ownership of a round's buffers. No tick runs until
    /// [`start`](Self::start) or [`step`](Self::step).
    pub fn new(
        buffers: EntityBufferSet,
        config: MotionConfig,
        player: PlayerSignal,
    ) -> Result<Self> {
        config.validate()?;
        let pool = WorkerPool::new(config.worker_threads)?;
        Ok(Self {
            core: Arc::new(TickCore {
                state: Mutex::new(TickState {
                    buffers,
                    tick: 0,
                    profiler: PassProfiler::new(),
                }),
                player,
                config,
                pool,
            }),
            worker: None,
        })
    }

    /// Start ticking every `tick_interval` on a dedicated thread.
    ///
    /// `tick_interval` only paces wall-clock ticks; simulation time always
    /// advances by the configured step.
    pub fn start(&mut self, tick_interval: Duration) -> Result<()> {
        if self.worker.is_some() {
            warn!("motion scheduler already running");
            return Ok(());
        }

        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
        let core = Arc::clone(&self.core);
        let handle = thread::Builder::new()
            .name("motion-tick".to_string())
            .spawn(move || {
                let ticker = crossbeam_channel::tick(tick_interval);
                loop {
                    select! {
                        recv(stop_rx) -> _ => break,
                        recv(ticker) -> _ => {
                            core.run_tick();
                        }
                    }
                }
            })?;

        debug!(interval = ?tick_interval, "motion scheduler started");
        self.worker = Some(TickWorker {
            stop: stop_tx,
            handle,
        });
        Ok(())
    }

    /// Signal cancellation and wait for the tick thread to exit.
    ///
    /// A tick in progress runs to completion first, so no pass touches the
    /// buffers once this returns.
    pub fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        // A full channel or a gone receiver both mean the thread is already stopping.
        let _ = worker.stop.try_send(());
        if worker.handle.join().is_err() {
            error!("motion tick thread panicked");
        }
        debug!(ticks = self.tick_count(), "motion scheduler stopped");
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Run one tick on the calling thread.
    pub fn step(&self) -> TickStats {
        self.core.run_tick()
    }

    /// Change one entity's characteristics after draining the in-flight tick.
    pub fn update_entity(
        &self,
        index: usize,
        speed: f32,
        pattern: PatternTag,
        params: Vec2,
    ) -> Result<()> {
        self.core.lock().buffers.update(index, speed, pattern, params)
    }

    /// Read the buffers between ticks.
    pub fn with_buffers<R>(&self, f: impl FnOnce(&EntityBufferSet) -> R) -> R {
        f(&self.core.lock().buffers)
    }

    /// Ticks run so far.
    pub fn tick_count(&self) -> u64 {
        self.core.lock().tick
    }

    /// Simulation time the next tick will evaluate at.
    pub fn current_time(&self) -> f64 {
        self.tick_count() as f64 * f64::from(self.core.config.tick_interval_secs)
    }

    pub fn config(&self) -> &MotionConfig {
        &self.core.config
    }

    pub fn pass_stats(&self, section: &str) -> Option<SectionStats> {
        self.core.lock().profiler.get_section(section).cloned()
    }

    /// Stop ticking and hand the buffers back for destruction.
    pub fn into_buffers(mut self) -> EntityBufferSet {
        self.stop();
        let mut state = self.core.lock();
        state.profiler.log_summary();
        std::mem::take(&mut state.buffers)
    }
}

impl Drop for MotionScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
