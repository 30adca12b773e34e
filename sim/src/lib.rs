//! Horde Sim - Procedural Enemy Motion Core
//!
//! Moves and re-places large enemy populations every tick, relative to a
//! moving player. Per-entity state lives in flat buffers; a placement pass and
//! a movement pass run over them in data-parallel batches with a barrier in
//! between. A `bevy_ecs` world mirrors the player and enemy visuals for the host.

pub mod api;
pub mod buffers;
pub mod components;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod pattern;
pub mod profiler;
pub mod rng;
pub mod scheduler;
pub mod signal;
pub mod systems;
pub mod transform_buffer;
pub mod world;

pub use api::SimWorld;
pub use buffers::{EntityBufferSet, EntityTransform, TransformAccess, TransformFrame, TransformHandle};
pub use components::*;
pub use config::{DriveMode, MotionConfig, PlacementConfig, RoundConfig};
pub use error::{MotionError, Result};
pub use lifecycle::RoundLifecycleGate;
pub use pattern::{Heading, MotionPattern, PatternTag};
pub use rng::{seed_for, StreamState};
pub use scheduler::{MotionScheduler, TickStats};
pub use signal::PlayerSignal;
pub use systems::*;
pub use world::Snapshot;
