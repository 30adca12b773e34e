//! Structure-of-arrays storage for one round's motion entities.
//!
//! `EntityBufferSet` owns every per-entity lane (speed, pattern, params,
//! position, rotation, target, replacement flag, random stream). All lanes have
//! the same length for the whole round; the set is created on round start and
//! consumed by [`EntityBufferSet::destroy`] on round end.
//!
//! The only externally visible output is [`TransformAccess`], a shared,
//! generation-stamped copy of every entity's transform. Each round attaches a
//! new generation, so a [`TransformHandle`] from an earlier round reads `None`
//! instead of another round's entity.

use crate::config::RoundConfig;
use crate::error::{MotionError, Result};
use crate::pattern::PatternTag;
use crate::rng::{seed_for, StreamState};
use crate::transform_buffer::MAX_EXACT_INT;
use bevy_ecs::prelude::*;
use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, error, warn};

/// Published transform of one entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityTransform {
    pub position: Vec2,
    /// Rotation in degrees, only changed by `RotateInPlace`.
    pub rotation_deg: f32,
}

/// Stable reference to one entity's transform within one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransformHandle {
    index: u32,
    generation: u32,
}

impl TransformHandle {
    pub fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(&self) -> usize {
        self.index as usize
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

/// All transforms of the live round, copied out in one read.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformFrame {
    pub generation: u32,
    pub transforms: Vec<EntityTransform>,
}

#[derive(Debug, Default)]
struct PublishedTransforms {
    /// Generation of the attached round; 0 while nothing is attached.
    generation: u32,
    last_generation: u32,
    transforms: Vec<EntityTransform>,
}

/// Shared transform output read by visual and collision collaborators.
///
/// Cloning shares the same underlying storage.
#[derive(Resource, Debug, Clone, Default)]
pub struct TransformAccess(Arc<RwLock<PublishedTransforms>>);

impl TransformAccess {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, PublishedTransforms> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, PublishedTransforms> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Generation of the live round, if any.
    pub fn generation(&self) -> Option<u32> {
        let published = self.read();
        (published.generation != 0).then_some(published.generation)
    }

    /// Number of published transforms (0 between rounds).
    pub fn len(&self) -> usize {
        self.read().transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `handle` still refers to a live entity.
    pub fn is_live(&self, handle: TransformHandle) -> bool {
        let published = self.read();
        published.generation != 0
            && handle.generation == published.generation
            && handle.index() < published.transforms.len()
    }

    /// Transform behind `handle`, `None` once its round has been destroyed.
    pub fn get(&self, handle: TransformHandle) -> Option<EntityTransform> {
        let published = self.read();
        if published.generation == 0 || handle.generation != published.generation {
            return None;
        }
        published.transforms.get(handle.index()).copied()
    }

    /// Copy of every live transform.
    pub fn frame(&self) -> Option<TransformFrame> {
        let published = self.read();
        (published.generation != 0).then(|| TransformFrame {
            generation: published.generation,
            transforms: published.transforms.clone(),
        })
    }

    /// Attach a new round and return its generation.
    fn attach(&self, initial: impl Iterator<Item = EntityTransform>) -> u32 {
        let mut published = self.write();
        // Generations stay below MAX_EXACT_INT so the flat buffer header holds them exactly
        published.last_generation = ((published.last_generation + 1) % MAX_EXACT_INT).max(1);
        published.generation = published.last_generation;
        published.transforms.clear();
        published.transforms.extend(initial);
        published.generation
    }

    fn publish(&self, generation: u32, positions: &[Vec2], rotations: &[f32]) {
        let mut published = self.write();
        if published.generation != generation {
            return;
        }
        for ((out, &position), &rotation_deg) in published
            .transforms
            .iter_mut()
            .zip(positions)
            .zip(rotations)
        {
            *out = EntityTransform {
                position,
                rotation_deg,
            };
        }
    }

    fn detach(&self, generation: u32) {
        let mut published = self.write();
        if generation != 0 && published.generation == generation {
            published.generation = 0;
            published.transforms = Vec::new();
        }
    }
}

/// Lanes the placement pass works on.
pub struct PlacementLanes<'a> {
    pub positions: &'a [Vec2],
    pub patterns: &'a [PatternTag],
    pub targets: &'a mut [Vec2],
    pub needs_replacement: &'a mut [bool],
    pub rngs: &'a mut [StreamState],
}

/// Lanes the movement pass works on.
pub struct MovementLanes<'a> {
    pub speeds: &'a [f32],
    pub patterns: &'a [PatternTag],
    pub params: &'a [Vec2],
    pub targets: &'a [Vec2],
    pub positions: &'a mut [Vec2],
    pub rotations: &'a mut [f32],
    pub needs_replacement: &'a mut [bool],
}

/// Per-round structure-of-arrays entity storage.
#[derive(Debug, Default)]
pub struct EntityBufferSet {
    generation: u32,
    speeds: Vec<f32>,
    patterns: Vec<PatternTag>,
    params: Vec<Vec2>,
    positions: Vec<Vec2>,
    rotations: Vec<f32>,
    /// Placement target, also the anchor wavy motion oscillates around.
    targets: Vec<Vec2>,
    needs_replacement: Vec<bool>,
    rngs: Vec<StreamState>,
    transforms: TransformAccess,
}

fn check_len(field: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(MotionError::SizeMismatch {
            field,
            expected,
            actual,
        })
    }
}

impl EntityBufferSet {
    /// Allocate every lane for `round.count` entities and attach a new
    /// generation to `transforms`.
    ///
    /// Nothing is allocated or attached when a lane length disagrees with the
    /// declared count.
    pub fn create(
        round: &RoundConfig,
        process_seed: u64,
        transforms: &TransformAccess,
    ) -> Result<Self> {
        let count = round.count;
        if count > MAX_EXACT_INT as usize {
            let err = MotionError::InvalidConfig(format!(
                "round count {count} exceeds the flat buffer limit of {MAX_EXACT_INT}"
            ));
            error!(%err, count, "entity buffer creation aborted");
            return Err(err);
        }
        let checked = check_len("speeds", count, round.speeds.len())
            .and_then(|_| check_len("patterns", count, round.patterns.len()))
            .and_then(|_| check_len("pattern_params", count, round.pattern_params.len()))
            .and_then(|_| {
                if round.initial_positions.is_empty() {
                    Ok(())
                } else {
                    check_len("initial_positions", count, round.initial_positions.len())
                }
            });
        if let Err(err) = checked {
            error!(%err, count, "entity buffer creation aborted");
            return Err(err);
        }

        let unknown = round.patterns.iter().filter(|tag| tag.pattern().is_none()).count();
        if unknown > 0 {
            warn!(
                unknown,
                count, "round contains unknown pattern tags, those entities stay static"
            );
        }

        let positions = if round.initial_positions.is_empty() {
            vec![Vec2::ZERO; count]
        } else {
            round.initial_positions.clone()
        };
        let rotations = vec![0.0; count];
        let generation = transforms.attach(positions.iter().map(|&position| EntityTransform {
            position,
            rotation_deg: 0.0,
        }));

        debug!(count, generation, "entity buffers allocated");

        Ok(Self {
            generation,
            speeds: round.speeds.clone(),
            patterns: round.patterns.clone(),
            params: round.pattern_params.clone(),
            targets: positions.clone(),
            positions,
            rotations,
            needs_replacement: vec![false; count],
            rngs: (0..count).map(|i| seed_for(process_seed, i)).collect(),
            transforms: transforms.clone(),
        })
    }

    /// Change one entity's characteristics mid-round.
    ///
    /// Out-of-range indices change nothing and are logged.
    pub fn update(
        &mut self,
        index: usize,
        speed: f32,
        pattern: PatternTag,
        params: Vec2,
    ) -> Result<()> {
        let count = self.len();
        if index >= count {
            warn!(index, count, "ignoring update for entity outside the population");
            return Err(MotionError::IndexOutOfRange { index, count });
        }
        if pattern.pattern().is_none() {
            warn!(index, tag = pattern.0, "entity updated with unknown pattern tag");
        }
        self.speeds[index] = speed;
        self.patterns[index] = pattern;
        self.params[index] = params;
        Ok(())
    }

    /// Release every lane and retire this round's transform handles.
    ///
    /// Dropping the set has the same effect; this only adds the log line.
    pub fn destroy(self) {
        debug!(
            count = self.len(),
            generation = self.generation,
            "entity buffers released"
        );
    }

    /// Push current positions and rotations to the transform output.
    pub fn publish(&self) {
        self.transforms
            .publish(self.generation, &self.positions, &self.rotations);
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn handle(&self, index: usize) -> Option<TransformHandle> {
        (index < self.len()).then(|| TransformHandle::new(index as u32, self.generation))
    }

    pub fn handles(&self) -> Vec<TransformHandle> {
        (0..self.len())
            .map(|i| TransformHandle::new(i as u32, self.generation))
            .collect()
    }

    pub fn positions(&self) -> &[Vec2] {
        &self.positions
    }

    pub fn targets(&self) -> &[Vec2] {
        &self.targets
    }

    pub fn rotations(&self) -> &[f32] {
        &self.rotations
    }

    pub fn needs_replacement(&self) -> &[bool] {
        &self.needs_replacement
    }

    pub fn speed(&self, index: usize) -> Option<f32> {
        self.speeds.get(index).copied()
    }

    pub fn pattern(&self, index: usize) -> Option<PatternTag> {
        self.patterns.get(index).copied()
    }

    pub fn params(&self, index: usize) -> Option<Vec2> {
        self.params.get(index).copied()
    }

    pub fn placement_lanes(&mut self) -> PlacementLanes<'_> {
        PlacementLanes {
            positions: &self.positions,
            patterns: &self.patterns,
            targets: &mut self.targets,
            needs_replacement: &mut self.needs_replacement,
            rngs: &mut self.rngs,
        }
    }

    pub fn movement_lanes(&mut self) -> MovementLanes<'_> {
        MovementLanes {
            speeds: &self.speeds,
            patterns: &self.patterns,
            params: &self.params,
            targets: &self.targets,
            positions: &mut self.positions,
            rotations: &mut self.rotations,
            needs_replacement: &mut self.needs_replacement,
        }
    }
}

impl Drop for EntityBufferSet {
    fn drop(&mut self) {
        // Also runs on error paths after `create`, so a round that never
        // started cannot stay attached.
        self.transforms.detach(self.generation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::MotionPattern;
    use rand::Rng;

    fn round(count: usize) -> RoundConfig {
        RoundConfig::uniform(count, 1.0, MotionPattern::LinearRight, Vec2::ZERO)
    }

    #[test]
    fn test_create_allocates_equal_lanes() {
        let access = TransformAccess::new();
        let buffers = EntityBufferSet::create(&round(5), 1, &access).unwrap();
        assert_eq!(buffers.len(), 5);
        assert_eq!(buffers.targets().len(), 5);
        assert_eq!(buffers.rotations().len(), 5);
        assert_eq!(buffers.needs_replacement(), &[false; 5]);
        assert_eq!(access.len(), 5);
        assert_eq!(access.generation(), Some(buffers.generation()));
    }

    #[test]
    fn test_create_rejects_size_mismatch() {
        let access = TransformAccess::new();
        let mut config = round(4);
        config.speeds.pop();

        let err = EntityBufferSet::create(&config, 1, &access).unwrap_err();
        assert!(matches!(
            err,
            MotionError::SizeMismatch {
                field: "speeds",
                expected: 4,
                actual: 3
            }
        ));
        // Nothing attached
        assert_eq!(access.generation(), None);
        assert!(access.is_empty());
    }

    #[test]
    fn test_create_rejects_oversized_round() {
        let transforms = TransformAccess::new();
        let round = RoundConfig {
            count: MAX_EXACT_INT as usize + 1,
            ..Default::default()
        };
        let err = EntityBufferSet::create(&round, 1, &transforms).unwrap_err();
        assert!(matches!(err, MotionError::InvalidConfig(_)));
        assert!(transforms.generation().is_none());
    }

    #[test]
    fn test_generation_wraps_below_exact_limit() {
        let transforms = TransformAccess::new();
        transforms.write().last_generation = MAX_EXACT_INT - 2;
        let round = RoundConfig::uniform(1, 1.0, MotionPattern::Static, Vec2::ZERO);

        let last = EntityBufferSet::create(&round, 1, &transforms).unwrap();
        assert_eq!(last.generation(), MAX_EXACT_INT - 1);
        last.destroy();

        let wrapped = EntityBufferSet::create(&round, 1, &transforms).unwrap();
        assert_eq!(wrapped.generation(), 1);
    }

    #[test]
    fn test_create_rejects_short_initial_positions() {
        let access = TransformAccess::new();
        let mut config = round(3);
        config.initial_positions = vec![Vec2::ONE];
        assert!(matches!(
            EntityBufferSet::create(&config, 1, &access),
            Err(MotionError::SizeMismatch {
                field: "initial_positions",
                ..
            })
        ));
    }

    #[test]
    fn test_initial_positions_seed_targets() {
        let access = TransformAccess::new();
        let config = RoundConfig::new()
            .with_entity_at(1.0, MotionPattern::Static, Vec2::ZERO, Vec2::new(3.0, 4.0))
            .with_entity_at(1.0, MotionPattern::Static, Vec2::ZERO, Vec2::new(-1.0, 2.0));
        let buffers = EntityBufferSet::create(&config, 1, &access).unwrap();
        assert_eq!(buffers.positions(), buffers.targets());
        let handle = buffers.handle(0).unwrap();
        assert_eq!(access.get(handle).unwrap().position, Vec2::new(3.0, 4.0));
    }

    #[test]
    fn test_random_streams_are_reproducible() {
        let access = TransformAccess::new();
        let mut a = EntityBufferSet::create(&round(3), 99, &access).unwrap();
        let mut b = EntityBufferSet::create(&round(3), 99, &access).unwrap();
        let lanes_a = a.placement_lanes();
        let lanes_b = b.placement_lanes();
        for (ra, rb) in lanes_a.rngs.iter_mut().zip(lanes_b.rngs.iter_mut()) {
            assert_eq!(ra.gen::<u64>(), rb.gen::<u64>());
        }
    }

    #[test]
    fn test_update_in_range() {
        let access = TransformAccess::new();
        let mut buffers = EntityBufferSet::create(&round(2), 1, &access).unwrap();
        buffers
            .update(1, 3.5, MotionPattern::WavyLeft.into(), Vec2::new(1.0, 2.0))
            .unwrap();
        assert_eq!(buffers.speed(1), Some(3.5));
        assert_eq!(buffers.pattern(1), Some(MotionPattern::WavyLeft.into()));
        assert_eq!(buffers.params(1), Some(Vec2::new(1.0, 2.0)));
        assert_eq!(buffers.speed(0), Some(1.0));
    }

    #[test]
    fn test_update_out_of_range_is_noop() {
        let access = TransformAccess::new();
        let mut buffers = EntityBufferSet::create(&round(2), 1, &access).unwrap();
        let err = buffers
            .update(2, 9.0, MotionPattern::Static.into(), Vec2::ZERO)
            .unwrap_err();
        assert!(matches!(err, MotionError::IndexOutOfRange { index: 2, count: 2 }));
        assert_eq!(buffers.speed(0), Some(1.0));
        assert_eq!(buffers.speed(1), Some(1.0));
    }

    #[test]
    fn test_destroy_retires_handles() {
        let access = TransformAccess::new();
        let buffers = EntityBufferSet::create(&round(2), 1, &access).unwrap();
        let handle = buffers.handle(1).unwrap();
        assert!(access.is_live(handle));

        buffers.destroy();
        assert!(!access.is_live(handle));
        assert_eq!(access.get(handle), None);
        assert_eq!(access.frame(), None);
    }

    #[test]
    fn test_drop_without_destroy_detaches() {
        let access = TransformAccess::new();
        let buffers = EntityBufferSet::create(&round(4), 1, &access).unwrap();
        let handle = buffers.handle(0).unwrap();
        assert_eq!(access.len(), 4);

        drop(buffers);
        assert_eq!(access.generation(), None);
        assert!(access.is_empty());
        assert!(!access.is_live(handle));
    }

    #[test]
    fn test_taken_buffers_stay_attached() {
        let access = TransformAccess::new();
        let mut slot = EntityBufferSet::create(&round(2), 1, &access).unwrap();
        let buffers = std::mem::take(&mut slot);
        // The empty placeholder has nothing to detach.
        drop(slot);
        assert_eq!(access.generation(), Some(buffers.generation()));
        buffers.destroy();
        assert_eq!(access.generation(), None);
    }

    #[test]
    fn test_new_round_invalidates_old_handles() {
        let access = TransformAccess::new();
        let first = EntityBufferSet::create(&round(2), 1, &access).unwrap();
        let old = first.handle(0).unwrap();
        first.destroy();

        let second = EntityBufferSet::create(&round(2), 1, &access).unwrap();
        assert_ne!(second.generation(), old.generation());
        assert_eq!(access.get(old), None);
        assert!(access.get(second.handle(0).unwrap()).is_some());
    }

    #[test]
    fn test_stale_destroy_keeps_newer_round() {
        let access = TransformAccess::new();
        let first = EntityBufferSet::create(&round(1), 1, &access).unwrap();
        let second = EntityBufferSet::create(&round(1), 1, &access).unwrap();
        first.destroy();
        assert_eq!(access.generation(), Some(second.generation()));
    }

    #[test]
    fn test_publish_copies_positions() {
        let access = TransformAccess::new();
        let mut buffers = EntityBufferSet::create(&round(2), 1, &access).unwrap();
        {
            let lanes = buffers.movement_lanes();
            lanes.positions[1] = Vec2::new(7.0, -2.0);
            lanes.rotations[1] = 45.0;
        }
        buffers.publish();
        let transform = access.get(buffers.handle(1).unwrap()).unwrap();
        assert_eq!(transform.position, Vec2::new(7.0, -2.0));
        assert_eq!(transform.rotation_deg, 45.0);
    }

    #[test]
    fn test_handle_out_of_range() {
        let access = TransformAccess::new();
        let buffers = EntityBufferSet::create(&round(2), 1, &access).unwrap();
        assert!(buffers.handle(2).is_none());
        assert_eq!(buffers.handles().len(), 2);
    }
}
