//! Session registry: the authoritative map of connected players
//!
//! Identities are handed out from a counter that starts at 1 and is never
//! rewound, so an id is never reused for the lifetime of the process even
//! after its player disconnects. The registry also enforces the server's
//! player capacity and decides where new players appear.

use clap::ValueEnum;
use log::info;
use rand::Rng;
use shared::{Player, MAX_NAME_LEN, ROOM_WIDTH, SPAWN_JITTER, SPAWN_POINTS, SPAWN_Y};
use std::collections::BTreeMap;

/// How a newly admitted player picks their starting position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SpawnMode {
    /// Anywhere along the entry band with horizontal jitter
    #[default]
    EntryBand,
    /// Cycle through a fixed set of spawn points by identity
    Rotation,
}

pub struct PlayerRegistry {
    players: BTreeMap<u32, Player>,
    /// Next identity to assign
    next_id: u32,
    max_players: usize,
    spawn_mode: SpawnMode,
}

impl PlayerRegistry {
    pub fn new(max_players: usize, spawn_mode: SpawnMode) -> Self {
        Self {
            players: BTreeMap::new(),
            next_id: 1,
            max_players,
            spawn_mode,
        }
    }

    /// Registers a new player and returns their identity.
    ///
    /// Returns None if the server is at capacity. A rejected connection does
    /// not consume an identity.
    pub fn admit<R: Rng>(&mut self, rng: &mut R) -> Option<u32> {
        if self.players.len() >= self.max_players {
            return None;
        }

        let id = self.next_id;
        self.next_id += 1;

        let (x, y) = self.spawn_position(id, rng);
        let player = Player::new(id, x, y);

        info!("Added player {} at ({:.1}, {:.1})", id, player.x, player.y);
        self.players.insert(id, player);

        Some(id)
    }

    fn spawn_position<R: Rng>(&self, id: u32, rng: &mut R) -> (f32, f32) {
        match self.spawn_mode {
            SpawnMode::EntryBand => entry_band_position(rng),
            SpawnMode::Rotation => SPAWN_POINTS[(id as usize - 1) % SPAWN_POINTS.len()],
        }
    }

    /// Moves a player. Returns false if the identity is no longer registered.
    pub fn update_position(&mut self, id: u32, x: f32, y: f32, angle: Option<f32>) -> bool {
        let Some(player) = self.players.get_mut(&id) else {
            return false;
        };

        player.x = x;
        player.y = y;
        if angle.is_some() {
            player.angle = angle;
        }
        true
    }

    /// Renames a player, returning the stored (truncated) name.
    pub fn rename(&mut self, id: u32, name: &str) -> Option<String> {
        let player = self.players.get_mut(&id)?;
        player.name = truncate_name(name);
        Some(player.name.clone())
    }

    /// Removes a player. Returns true if they were registered.
    pub fn remove(&mut self, id: u32) -> bool {
        if self.players.remove(&id).is_some() {
            info!("Removed player {}", id);
            true
        } else {
            false
        }
    }

    /// Moves every player back onto the entry band.
    pub fn relocate_all<R: Rng>(&mut self, rng: &mut R) {
        for player in self.players.values_mut() {
            let (x, y) = entry_band_position(rng);
            player.x = x;
            player.y = y;
        }
    }

    /// Looks up a registered player by identity.
    pub fn get(&self, id: u32) -> Option<&Player> {
        self.players.get(&id)
    }

    /// Every registered player, ordered by identity.
    ///
    /// This is the map snapshotted into `init` and `new_room`.
    pub fn players(&self) -> &BTreeMap<u32, Player> {
        &self.players
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

/// A point on the entry band: fixed height just above the bottom wall,
/// jittered horizontally around the room's centre line.
pub fn entry_band_position<R: Rng>(rng: &mut R) -> (f32, f32) {
    let x = ROOM_WIDTH / 2.0 + rng.gen_range(-SPAWN_JITTER..=SPAWN_JITTER);
    (x, SPAWN_Y)
}

/// Cuts a requested name to `MAX_NAME_LEN` characters.
pub fn truncate_name(name: &str) -> String {
    name.chars().take(MAX_NAME_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use shared::COLORS;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(9)
    }

    #[test]
    fn test_admit_assigns_sequential_ids() {
        let mut rng = rng();
        let mut registry = PlayerRegistry::new(8, SpawnMode::EntryBand);

        assert_eq!(registry.admit(&mut rng), Some(1));
        assert_eq!(registry.admit(&mut rng), Some(2));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_ids_never_reused() {
        let mut rng = rng();
        let mut registry = PlayerRegistry::new(8, SpawnMode::EntryBand);

        let first = registry.admit(&mut rng).unwrap();
        assert!(registry.remove(first));
        let second = registry.admit(&mut rng).unwrap();

        assert_eq!(second, first + 1);
    }

    #[test]
    fn test_admit_defaults() {
        let mut rng = rng();
        let mut registry = PlayerRegistry::new(8, SpawnMode::EntryBand);

        let id = registry.admit(&mut rng).unwrap();
        let player = registry.get(id).unwrap();

        assert_eq!(player.name, "Player 1");
        assert_eq!(player.color, COLORS[0]);
        assert_eq!(player.angle, None);
        assert_approx_eq!(player.y, SPAWN_Y, 0.001);
        assert!((player.x - ROOM_WIDTH / 2.0).abs() <= SPAWN_JITTER);
    }

    #[test]
    fn test_rotation_spawn_points() {
        let mut rng = rng();
        let mut registry = PlayerRegistry::new(8, SpawnMode::Rotation);

        for expected in SPAWN_POINTS.iter().chain(SPAWN_POINTS.iter().take(1)) {
            let id = registry.admit(&mut rng).unwrap();
            let player = registry.get(id).unwrap();
            assert_eq!((player.x, player.y), *expected);
        }
    }

    #[test]
    fn test_capacity() {
        let mut rng = rng();
        let mut registry = PlayerRegistry::new(1, SpawnMode::EntryBand);

        assert_eq!(registry.admit(&mut rng), Some(1));
        assert_eq!(registry.admit(&mut rng), None);
        assert_eq!(registry.len(), 1);

        registry.remove(1);
        // the rejected attempt did not burn an id
        assert_eq!(registry.admit(&mut rng), Some(2));
    }

    #[test]
    fn test_update_position() {
        let mut rng = rng();
        let mut registry = PlayerRegistry::new(8, SpawnMode::EntryBand);
        let id = registry.admit(&mut rng).unwrap();

        assert!(registry.update_position(id, 10.0, 20.0, Some(0.5)));
        assert!(registry.update_position(id, 11.0, 21.0, None));

        let player = registry.get(id).unwrap();
        assert_eq!((player.x, player.y), (11.0, 21.0));
        assert_eq!(player.angle, Some(0.5));
    }

    #[test]
    fn test_update_unknown_player_is_noop() {
        let mut registry = PlayerRegistry::new(8, SpawnMode::EntryBand);
        assert!(!registry.update_position(99, 1.0, 1.0, None));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_rename_truncates() {
        let mut rng = rng();
        let mut registry = PlayerRegistry::new(8, SpawnMode::EntryBand);
        let id = registry.admit(&mut rng).unwrap();

        let name = registry.rename(id, "abcdefghijklmnopqrstuvwxyz0123").unwrap();
        assert_eq!(name, "abcdefghijklmnopqrst");
        assert_eq!(registry.get(id).unwrap().name, name);

        assert_eq!(registry.rename(42, "ghost"), None);
    }

    #[test]
    fn test_truncate_name_counts_chars() {
        let name = "é".repeat(25);
        assert_eq!(truncate_name(&name).chars().count(), MAX_NAME_LEN);
        assert_eq!(truncate_name("short"), "short");
        assert_eq!(truncate_name(""), "");
    }

    #[test]
    fn test_remove_twice() {
        let mut rng = rng();
        let mut registry = PlayerRegistry::new(8, SpawnMode::EntryBand);
        let id = registry.admit(&mut rng).unwrap();

        assert!(registry.remove(id));
        assert!(!registry.remove(id));
    }

    #[test]
    fn test_relocate_all() {
        let mut rng = rng();
        let mut registry = PlayerRegistry::new(8, SpawnMode::EntryBand);
        let a = registry.admit(&mut rng).unwrap();
        let b = registry.admit(&mut rng).unwrap();
        registry.update_position(a, 400.0, 30.0, None);
        registry.update_position(b, 100.0, 100.0, None);

        registry.relocate_all(&mut rng);

        for player in registry.players().values() {
            assert_approx_eq!(player.y, SPAWN_Y, 0.001);
            assert!((player.x - ROOM_WIDTH / 2.0).abs() <= SPAWN_JITTER);
        }
    }
}
