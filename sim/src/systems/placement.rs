//! Placement pass - re-places entities that drifted too far from the player.
//!
//! ## Data Access
//! - Reads: Position, PatternTag, player sample (broadcast)
//! - Writes: Target, NeedsReplacement, RandomStream
//!
//! Each entity only touches its own lanes and its own random stream, so batches
//! run in any order. With `--features parallel` the batches go to rayon.

use crate::buffers::PlacementLanes;
use crate::config::PlacementConfig;
use crate::pattern::{Heading, PatternTag};
use crate::rng::StreamState;
use glam::Vec2;
use rand::Rng;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Decide whether an entity needs re-placing and, if so, draw its new target.
///
/// Returns `None` while the entity is within both thresholds of the player.
/// Unknown tags take the no-heading branch.
pub fn place(
    position: Vec2,
    player: Vec2,
    pattern: PatternTag,
    rng: &mut StreamState,
    config: &PlacementConfig,
) -> Option<Vec2> {
    let drifted = (player.y - position.y).abs() > config.y_threshold
        || (player.x - position.x).abs() > config.x_threshold;
    if !drifted {
        return None;
    }

    let x = match pattern.heading() {
        Heading::Right => player.x - rng.gen_range(config.min_travel_x..=config.max_travel_x),
        Heading::Left => player.x + rng.gen_range(config.min_travel_x..=config.max_travel_x),
        Heading::None => {
            player.x + rng.gen_range(-config.max_static_offset_x..=config.max_static_offset_x)
        }
    };
    // Always ahead of the player along the fall direction.
    let y = player.y - rng.gen_range(config.min_travel_y..=config.max_travel_y);

    Some(Vec2::new(x, y))
}

fn place_batch(
    positions: &[Vec2],
    patterns: &[PatternTag],
    targets: &mut [Vec2],
    needs_replacement: &mut [bool],
    rngs: &mut [StreamState],
    player: Vec2,
    config: &PlacementConfig,
) -> usize {
    let mut placed = 0;
    for ((((&position, &pattern), target), flag), rng) in positions
        .iter()
        .zip(patterns)
        .zip(targets.iter_mut())
        .zip(needs_replacement.iter_mut())
        .zip(rngs.iter_mut())
    {
        if let Some(new_target) = place(position, player, pattern, rng, config) {
            *target = new_target;
            *flag = true;
            placed += 1;
        }
    }
    placed
}

/// Run placement over every entity. Returns how many were flagged.
///
/// `player` is the sample captured at tick start; every batch sees the same value.
pub fn placement_pass(
    lanes: PlacementLanes<'_>,
    player: Vec2,
    config: &PlacementConfig,
    batch: usize,
) -> usize {
    let batch = batch.max(1);
    let PlacementLanes {
        positions,
        patterns,
        targets,
        needs_replacement,
        rngs,
    } = lanes;

    #[cfg(feature = "parallel")]
    let placed = {
        (
            positions.par_chunks(batch),
            patterns.par_chunks(batch),
            targets.par_chunks_mut(batch),
            needs_replacement.par_chunks_mut(batch),
            rngs.par_chunks_mut(batch),
        )
            .into_par_iter()
            .map(|(positions, patterns, targets, flags, rngs)| {
                place_batch(positions, patterns, targets, flags, rngs, player, config)
            })
            .sum()
    };

    #[cfg(not(feature = "parallel"))]
    let placed = {
        positions
            .chunks(batch)
            .zip(patterns.chunks(batch))
            .zip(targets.chunks_mut(batch))
            .zip(needs_replacement.chunks_mut(batch))
            .zip(rngs.chunks_mut(batch))
            .map(|((((positions, patterns), targets), flags), rngs)| {
                place_batch(positions, patterns, targets, flags, rngs, player, config)
            })
            .sum()
    };

    placed
}
