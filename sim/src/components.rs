//! ECS components for the host-side view of the motion core.
//!
//! The motion passes run on flat buffers, not on these components. The
//! facade mirrors the player and every enemy visual into the ECS world so
//! render and collision systems can query them like any other entity.

use crate::buffers::TransformHandle;
use bevy_ecs::prelude::*;
use glam::Vec2;
use serde::{Deserialize, Serialize};

// ============================================================================
// SPATIAL COMPONENTS
// ============================================================================

/// 2D world position (+y is up).
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn to_vec2(self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

impl From<Vec2> for Position {
    fn from(v: Vec2) -> Self {
        Self::new(v.x, v.y)
    }
}

/// Rotation in degrees, `[0, 360)`.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rotation(pub f32);

// ============================================================================
// IDENTITY COMPONENTS
// ============================================================================

/// Marks the single player entity whose position drives placement.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Player;

/// A visual driven by one motion entity.
#[derive(Component, Debug, Clone, Copy)]
pub struct EnemyVisual {
    pub handle: TransformHandle,
}

// ============================================================================
// BUNDLES
// ============================================================================

#[derive(Bundle, Default)]
pub struct PlayerBundle {
    pub player: Player,
    pub position: Position,
}

#[derive(Bundle)]
pub struct EnemyVisualBundle {
    pub visual: EnemyVisual,
    pub position: Position,
    pub rotation: Rotation,
}

impl EnemyVisualBundle {
    pub fn new(handle: TransformHandle, position: Vec2) -> Self {
        Self {
            visual: EnemyVisual { handle },
            position: position.into(),
            rotation: Rotation::default(),
        }
    }
}
