//! Systems bridging the ECS world and the motion core.
//!
//! ## Data Access
//! - `player_sample_system`: reads Player Position, writes PlayerSignal
//! - `transform_sync_system`: reads TransformAccess, writes EnemyVisual Position/Rotation

use crate::buffers::TransformAccess;
use crate::components::{EnemyVisual, Player, Position, Rotation};
use crate::signal::PlayerSignal;
use bevy_ecs::prelude::*;

/// Publish the player's ECS position to the motion core.
pub fn player_sample_system(signal: Res<PlayerSignal>, query: Query<&Position, With<Player>>) {
    if let Some(position) = query.iter().next() {
        signal.set(position.to_vec2());
    }
}

/// Copy the latest published transforms onto enemy visuals.
///
/// Visuals whose handle belongs to an ended round keep their last transform.
pub fn transform_sync_system(
    access: Res<TransformAccess>,
    mut query: Query<(&EnemyVisual, &mut Position, &mut Rotation)>,
) {
    let Some(frame) = access.frame() else {
        return;
    };
    for (visual, mut position, mut rotation) in query.iter_mut() {
        if visual.handle.generation() != frame.generation {
            continue;
        }
        if let Some(transform) = frame.transforms.get(visual.handle.index()) {
            *position = transform.position.into();
            rotation.0 = transform.rotation_deg;
        }
    }
}
