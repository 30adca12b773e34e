//! Broadcast player-position sample.
//!
//! The position tracker writes whenever the player moves; the scheduler reads
//! one sample at the start of every tick and hands that value to the placement
//! pass. Both coordinates live in a single atomic word so a sample is never torn.

use bevy_ecs::prelude::*;
use glam::Vec2;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[inline]
fn pack(position: Vec2) -> u64 {
    ((position.x.to_bits() as u64) << 32) | position.y.to_bits() as u64
}

#[inline]
fn unpack(bits: u64) -> Vec2 {
    Vec2::new(f32::from_bits((bits >> 32) as u32), f32::from_bits(bits as u32))
}

/// Shared, lock-free player position. Clones observe the same value.
#[derive(Resource, Debug, Clone)]
pub struct PlayerSignal(Arc<AtomicU64>);

impl PlayerSignal {
    pub fn new(position: Vec2) -> Self {
        Self(Arc::new(AtomicU64::new(pack(position))))
    }

    pub fn set(&self, position: Vec2) {
        self.0.store(pack(position), Ordering::Release);
    }

    pub fn sample(&self) -> Vec2 {
        unpack(self.0.load(Ordering::Acquire))
    }
}

impl Default for PlayerSignal {
    fn default() -> Self {
        Self::new(Vec2::ZERO)
    }
}
