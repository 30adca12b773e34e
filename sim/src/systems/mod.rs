//! Passes and ECS systems of the motion core.
//!
//! ## Tick Ordering
//!
//! The two passes are data-parallel over entities but strictly ordered
//! against each other:
//!
//! **Pass 1 (Placement)** - reads positions and the player sample:
//! - `placement_pass` - flags drifted entities and draws new targets
//!
//! **Barrier** - the placement pass has returned for every batch.
//!
//! **Pass 2 (Movement)** - reads targets and flags written by pass 1:
//! - `movement_pass` - teleports flagged entities, evaluates patterns for the rest
//!
//! ## ECS Systems
//!
//! Run by the `SimWorld` facade around the ticks:
//! - `player_sample_system` - input, before ticks
//! - `transform_sync_system` - output, after ticks

pub mod movement;
pub mod placement;
pub mod sync;

pub use movement::*;
pub use placement::*;
pub use sync::*;
