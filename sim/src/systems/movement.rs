//! Movement pass - teleports flagged entities and evaluates motion patterns.
//!
//! ## Data Access
//! - Reads: Speed, PatternTag, PatternParams, Target, simulation time
//! - Writes: Position, Rotation, NeedsReplacement (clear only)
//!
//! Must run after the placement pass of the same tick has returned.

use crate::buffers::MovementLanes;
use crate::pattern::{MotionPattern, PatternTag};
use glam::Vec2;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Position and rotation of one entity between ticks.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotionState {
    pub position: Vec2,
    pub rotation_deg: f32,
}

/// Everything the evaluator needs about one entity.
#[derive(Debug, Clone, Copy)]
pub struct MotionInput {
    pub pattern: PatternTag,
    pub speed: f32,
    /// (frequency, amplitude) for wavy, (active, pause) for jerky.
    pub params: Vec2,
    /// Placement target; wavy motion oscillates around its y.
    pub anchor: Vec2,
}

/// Next position and rotation for one entity at simulation time `time`.
///
/// Speeds are per tick. Unknown tags hold still. `time` stays `f64` through
/// the phase computations so long rounds keep their wave and cycle timing.
pub fn evaluate(input: MotionInput, state: MotionState, time: f64) -> MotionState {
    let Some(pattern) = input.pattern.pattern() else {
        return state;
    };
    let step = input.speed * pattern.direction();

    match pattern {
        MotionPattern::LinearRight
        | MotionPattern::LinearLeft
        | MotionPattern::LinearUp
        | MotionPattern::LinearDown => MotionState {
            position: state.position + step,
            ..state
        },
        MotionPattern::WavyRight | MotionPattern::WavyLeft => {
            let (frequency, amplitude) = (input.params.x, input.params.y);
            MotionState {
                position: Vec2::new(
                    state.position.x + step.x,
                    input.anchor.y + (time * f64::from(frequency)).sin() as f32 * amplitude,
                ),
                ..state
            }
        }
        MotionPattern::JerkyRight | MotionPattern::JerkyLeft => {
            let (active, pause) = (input.params.x, input.params.y);
            let period = f64::from(active) + f64::from(pause);
            let moving = period <= 0.0 || time.rem_euclid(period) < f64::from(active);
            if moving {
                MotionState {
                    position: state.position + step,
                    ..state
                }
            } else {
                state
            }
        }
        MotionPattern::Static => state,
        MotionPattern::RotateInPlace => MotionState {
            rotation_deg: (state.rotation_deg + input.speed).rem_euclid(360.0),
            ..state
        },
    }
}

#[allow(clippy::too_many_arguments)]
fn move_batch(
    speeds: &[f32],
    patterns: &[PatternTag],
    params: &[Vec2],
    targets: &[Vec2],
    positions: &mut [Vec2],
    rotations: &mut [f32],
    needs_replacement: &mut [bool],
    time: f64,
) {
    for i in 0..positions.len() {
        // A teleport consumes the whole tick for this entity.
        if needs_replacement[i] {
            positions[i] = targets[i];
            needs_replacement[i] = false;
            continue;
        }

        let next = evaluate(
            MotionInput {
                pattern: patterns[i],
                speed: speeds[i],
                params: params[i],
                anchor: targets[i],
            },
            MotionState {
                position: positions[i],
                rotation_deg: rotations[i],
            },
            time,
        );
        positions[i] = next.position;
        rotations[i] = next.rotation_deg;
    }
}

/// Run movement over every entity at simulation time `time`.
pub fn movement_pass(lanes: MovementLanes<'_>, time: f64, batch: usize) {
    let batch = batch.max(1);
    let MovementLanes {
        speeds,
        patterns,
        params,
        targets,
        positions,
        rotations,
        needs_replacement,
    } = lanes;

    #[cfg(feature = "parallel")]
    {
        (
            speeds.par_chunks(batch),
            patterns.par_chunks(batch),
            params.par_chunks(batch),
            targets.par_chunks(batch),
            positions.par_chunks_mut(batch),
            rotations.par_chunks_mut(batch),
            needs_replacement.par_chunks_mut(batch),
        )
            .into_par_iter()
            .for_each(|(speeds, patterns, params, targets, positions, rotations, flags)| {
                move_batch(speeds, patterns, params, targets, positions, rotations, flags, time)
            });
    }

    #[cfg(not(feature = "parallel"))]
    {
        for ((((((speeds, patterns), params), targets), positions), rotations), flags) in speeds
            .chunks(batch)
            .zip(patterns.chunks(batch))
            .zip(params.chunks(batch))
            .zip(targets.chunks(batch))
            .zip(positions.chunks_mut(batch))
            .zip(rotations.chunks_mut(batch))
            .zip(needs_replacement.chunks_mut(batch))
        {
            move_batch(speeds, patterns, params, targets, positions, rotations, flags, time);
        }
    }
}
