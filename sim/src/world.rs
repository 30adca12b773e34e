//! Serializable snapshot of the host-side world.
//!
//! `Snapshot` is built from the ECS world after transforms have been synced,
//! so it reflects what the visuals currently show.

use crate::components::*;
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// State of one enemy visual.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemySnapshot {
    /// Entity index within its round.
    pub id: u32,
    /// Round generation the visual belongs to.
    pub generation: u32,
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
}

/// Complete snapshot for clients.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// Ticks run in the current round.
    pub tick: u64,
    /// Simulation time of the next tick, in seconds.
    pub time: f32,
    /// Live round generation, `None` between rounds.
    pub generation: Option<u32>,
    pub player_x: f32,
    pub player_y: f32,
    /// Enemy visuals, sorted by id.
    pub enemies: Vec<EnemySnapshot>,
}

impl Snapshot {
    pub fn from_world(world: &mut World, tick: u64, time: f32, generation: Option<u32>) -> Self {
        let mut player_query = world.query_filtered::<&Position, With<Player>>();
        let player = player_query.iter(world).next().copied().unwrap_or_default();

        let mut enemies = Vec::new();
        let mut query = world.query::<(&EnemyVisual, &Position, &Rotation)>();
        for (visual, pos, rotation) in query.iter(world) {
            enemies.push(EnemySnapshot {
                id: visual.handle.index() as u32,
                generation: visual.handle.generation(),
                x: pos.x,
                y: pos.y,
                rotation: rotation.0,
            });
        }
        // Query order is archetype order, not index order
        enemies.sort_by_key(|e| e.id);

        Self {
            tick,
            time,
            generation,
            player_x: player.x,
            player_y: player.y,
            enemies,
        }
    }

    /// Serialize snapshot to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize snapshot to pretty JSON string.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffers::TransformHandle;
    use glam::Vec2;

    #[test]
    fn test_snapshot_from_world() {
        let mut world = World::new();
        world.spawn(PlayerBundle {
            position: Position::new(1.0, 2.0),
            ..Default::default()
        });
        world.spawn(EnemyVisualBundle::new(TransformHandle::new(1, 4), Vec2::new(5.0, 6.0)));
        world.spawn(EnemyVisualBundle::new(TransformHandle::new(0, 4), Vec2::new(-5.0, 0.0)));

        let snapshot = Snapshot::from_world(&mut world, 12, 0.4, Some(4));

        assert_eq!(snapshot.tick, 12);
        assert_eq!((snapshot.player_x, snapshot.player_y), (1.0, 2.0));
        assert_eq!(snapshot.enemies.len(), 2);
        assert_eq!(snapshot.enemies[0].id, 0);
        assert_eq!(snapshot.enemies[0].x, -5.0);
        assert_eq!(snapshot.enemies[1].generation, 4);

        let json = snapshot.to_json().unwrap();
        assert!(json.contains("\"generation\":4"));
        let back: Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.enemies, snapshot.enemies);
    }

    #[test]
    fn test_empty_world_snapshot() {
        let mut world = World::new();
        let snapshot = Snapshot::from_world(&mut world, 0, 0.0, None);
        assert!(snapshot.enemies.is_empty());
        assert_eq!(snapshot.player_x, 0.0);
        assert!(snapshot.to_json_pretty().unwrap().contains("\"generation\": null"));
    }
}
