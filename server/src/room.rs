//! The single shared room and its transitions

use crate::placement::generate_stones;
use rand::Rng;
use shared::{RoomSnapshot, StepTarget, STONE_COUNT};

/// The room every connected player is standing in.
#[derive(Debug, Clone)]
pub struct Room {
    pub stones: Vec<StepTarget>,
    /// Length of the correctly ordered prefix stepped on since the last reset
    pub progress: u8,
    pub door_open: bool,
    pub room_number: u32,
}

impl Room {
    /// Builds the first room of a server run.
    pub fn first<R: Rng>(rng: &mut R) -> Self {
        Self::generate(rng, 1)
    }

    /// Builds the room that replaces this one once the door has been used.
    pub fn next<R: Rng>(&self, rng: &mut R) -> Self {
        Self::generate(rng, self.room_number + 1)
    }

    fn generate<R: Rng>(rng: &mut R, room_number: u32) -> Self {
        Self {
            stones: generate_stones(rng),
            progress: 0,
            door_open: false,
            room_number,
        }
    }

    /// Clears progress and closes the door, keeping the same stones.
    pub fn reset(&mut self) {
        self.progress = 0;
        self.door_open = false;
    }

    /// Records one more correctly ordered step. The door opens on the last one.
    pub fn advance_progress(&mut self) {
        self.progress = (self.progress + 1).min(STONE_COUNT as u8);
        self.door_open = self.progress as usize == STONE_COUNT;
    }

    pub fn snapshot(&self, reveal_step_order: bool) -> RoomSnapshot {
        RoomSnapshot {
            stones: self
                .stones
                .iter()
                .map(|stone| stone.view(reveal_step_order))
                .collect(),
            progress: self.progress,
            door_open: self.door_open,
            room_number: self.room_number,
        }
    }

    pub fn stone_with_order(&self, step_order: u8) -> Option<&StepTarget> {
        self.stones.iter().find(|stone| stone.step_order == step_order)
    }
}
