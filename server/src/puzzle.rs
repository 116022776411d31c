//! Step ordering rules for the stones and the door trigger

use crate::room::Room;
use shared::{distance, in_door_band, STEP_TRIGGER_RADIUS};

/// What a player's move did to the room's puzzle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The next stone in order was stepped on.
    Advanced { progress: u8, door_open: bool },
    /// A stone was stepped on too early; progress must be reset.
    OutOfOrder,
    /// Nothing changed.
    Ignored,
}

/// Evaluates a new player position against the room's stones.
///
/// Only the first stone within trigger range is considered. Once the door is
/// open the stones no longer do anything.
pub fn evaluate_step(room: &mut Room, x: f32, y: f32) -> StepOutcome {
    if room.door_open {
        return StepOutcome::Ignored;
    }

    let Some(step_order) = room
        .stones
        .iter()
        .find(|stone| distance(x, y, stone.x, stone.y) < STEP_TRIGGER_RADIUS)
        .map(|stone| stone.step_order)
    else {
        return StepOutcome::Ignored;
    };

    let expected = room.progress + 1;
    if step_order == expected {
        room.advance_progress();
        StepOutcome::Advanced {
            progress: room.progress,
            door_open: room.door_open,
        }
    } else if step_order > expected {
        StepOutcome::OutOfOrder
    } else {
        StepOutcome::Ignored
    }
}

/// True when the door is open and the position is in its trigger band.
pub fn door_reached(room: &Room, x: f32, y: f32) -> bool {
    room.door_open && in_door_band(x, y)
}
