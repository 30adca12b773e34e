//! Flat transform export for engine-side consumers.
//!
//! Converts the published transforms of the live round into one contiguous
//! `Vec<f32>` that a renderer or collision layer can consume without
//! deserialization.
//!
//! # Buffer Layout (Version 1.0)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │ HEADER (2 elements)                                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │ [0] enemy_count (as f32)                                        │
//! │ [1] generation  (as f32, 0 = no live round)                     │
//! ├─────────────────────────────────────────────────────────────────┤
//! │ For each enemy i (offset = 2 + i * ENEMY_STRIDE):               │
//! │   [+0] index        - Entity index within the round             │
//! │   [+1] x            - X position (world units)                  │
//! │   [+2] y            - Y position (world units, +y up)           │
//! │   [+3] rotation_deg - Rotation in degrees                       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage from an engine script
//!
//! ```gdscript
//! const ENEMY_STRIDE = 4
//! const HEADER_SIZE = 2
//!
//! func apply_transforms(buffer: PackedFloat32Array):
//!     var count = int(buffer[0])
//!     for i in range(count):
//!         var offset = HEADER_SIZE + i * ENEMY_STRIDE
//!         enemies[i].position = Vector2(buffer[offset + 1], -buffer[offset + 2])
//!         enemies[i].rotation_degrees = buffer[offset + 3]
//! ```
//!
//! Enemies are written in index order, so the same frame always produces
//! the same buffer.
//!
//! Count, generation and index are integers stored as f32, exact below
//! [`MAX_EXACT_INT`]. Rounds never exceed that many entities and generations
//! wrap before reaching it.

use crate::buffers::TransformFrame;

// ============================================================================
// CONSTANTS - STABLE LAYOUT
// ============================================================================

/// Number of f32 values per enemy.
///
/// **Part of the stable buffer layout. Do not change without versioning.**
pub const ENEMY_STRIDE: usize = 4;

/// Number of f32 values in the buffer header (count, generation).
pub const HEADER_SIZE: usize = 2;

/// Integers below this (2^24) survive the f32 round trip exactly.
pub const MAX_EXACT_INT: u32 = 1 << 24;

/// Offset within enemy data for: entity index
pub const FIELD_INDEX: usize = 0;
/// Offset within enemy data for: X position
pub const FIELD_X: usize = 1;
/// Offset within enemy data for: Y position
pub const FIELD_Y: usize = 2;
/// Offset within enemy data for: rotation in degrees
pub const FIELD_ROTATION: usize = 3;

// ============================================================================
// SERIALIZATION
// ============================================================================

/// Flatten a transform frame. `None` (no live round) yields a header-only
/// buffer with count and generation both 0.
pub fn transforms_to_flatbuffer(frame: Option<&TransformFrame>) -> Vec<f32> {
    let Some(frame) = frame else {
        return vec![0.0; HEADER_SIZE];
    };

    let count = frame.transforms.len();
    let buffer_size = calculate_buffer_size(count);
    let mut buffer = Vec::with_capacity(buffer_size);

    buffer.push(count as f32);
    buffer.push(frame.generation as f32);

    for (index, transform) in frame.transforms.iter().enumerate() {
        buffer.push(index as f32);
        buffer.push(transform.position.x);
        buffer.push(transform.position.y);
        buffer.push(transform.rotation_deg);
    }

    debug_assert_eq!(buffer.len(), buffer_size, "Buffer size mismatch");
    buffer
}

/// `HEADER_SIZE + enemy_count * ENEMY_STRIDE`
#[inline]
pub fn calculate_buffer_size(enemy_count: usize) -> usize {
    HEADER_SIZE + enemy_count * ENEMY_STRIDE
}

/// Parse the enemy count from a flat buffer.
///
/// Returns `None` if the header is incomplete.
#[inline]
pub fn parse_enemy_count(buffer: &[f32]) -> Option<usize> {
    if buffer.len() < HEADER_SIZE {
        return None;
    }
    Some(buffer[0] as usize)
}

/// Parse the round generation from a flat buffer.
#[inline]
pub fn parse_generation(buffer: &[f32]) -> Option<u32> {
    buffer.get(1).map(|&g| g as u32)
}

/// Buffer offset of enemy `enemy_index`.
#[inline]
pub const fn enemy_offset(enemy_index: usize) -> usize {
    HEADER_SIZE + enemy_index * ENEMY_STRIDE
}
