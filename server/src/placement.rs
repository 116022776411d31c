//! Stone placement for a freshly generated room
//!
//! Stones are placed by rejection sampling inside the playable interior. A
//! candidate is accepted only when it keeps clear of the columns, the central
//! pedestal, the strip below the door and every stone already placed. If the
//! attempt budget runs out the stone drops onto a fixed grid of fallback
//! slots instead, so generation always terminates.

use log::warn;
use rand::seq::SliceRandom;
use rand::Rng;
use shared::{
    distance, StepTarget, COLUMNS, DOOR_CLEARANCE, DOOR_HALF_WIDTH, DOOR_X, MIN_STONE_SEPARATION,
    PEDESTAL_HALF_SIZE, PEDESTAL_X, PEDESTAL_Y, PLACEMENT_ATTEMPTS, PLACEMENT_MARGIN, ROOM_WIDTH,
    SPAWN_Y, STONE_COUNT, STONE_SIZE, WALL_THICKNESS,
};

const STONE_HALF: f32 = STONE_SIZE / 2.0;

const MIN_X: f32 = WALL_THICKNESS + PLACEMENT_MARGIN;
const MAX_X: f32 = ROOM_WIDTH - WALL_THICKNESS - PLACEMENT_MARGIN;
const MIN_Y: f32 = WALL_THICKNESS + PLACEMENT_MARGIN;
const MAX_Y: f32 = SPAWN_Y - STONE_SIZE * 2.0;

const FALLBACK_ROWS_Y: [f32; 2] = [240.0, 360.0];
const FALLBACK_START_X: f32 = 120.0;
const FALLBACK_SPACING: f32 = 140.0;
const FALLBACK_SLOTS: usize = STONE_COUNT * FALLBACK_ROWS_Y.len();

/// Generates the stones for a new room.
///
/// Step order follows placement order (the first stone placed must be
/// stepped on first). Display labels are an independent shuffle of 1..=5.
pub fn generate_stones<R: Rng>(rng: &mut R) -> Vec<StepTarget> {
    let mut placed: Vec<(f32, f32)> = Vec::with_capacity(STONE_COUNT);

    for index in 0..STONE_COUNT {
        let position = sample_position(rng, &placed).unwrap_or_else(|| {
            warn!(
                "Stone placement exhausted {} attempts, using a fallback slot for stone {}",
                PLACEMENT_ATTEMPTS, index
            );
            fallback_for(index, &placed)
        });
        placed.push(position);
    }

    let mut labels: Vec<u8> = (1..=STONE_COUNT as u8).collect();
    labels.shuffle(rng);

    placed
        .into_iter()
        .zip(labels)
        .enumerate()
        .map(|(index, ((x, y), display_num))| StepTarget {
            x,
            y,
            display_num,
            step_order: index as u8 + 1,
        })
        .collect()
}

fn sample_position<R: Rng>(rng: &mut R, placed: &[(f32, f32)]) -> Option<(f32, f32)> {
    (0..PLACEMENT_ATTEMPTS)
        .map(|_| (rng.gen_range(MIN_X..=MAX_X), rng.gen_range(MIN_Y..=MAX_Y)))
        .find(|&(x, y)| is_clear(x, y, placed))
}

/// Checks a candidate stone centre against every exclusion zone.
pub fn is_clear(x: f32, y: f32, placed: &[(f32, f32)]) -> bool {
    if !(MIN_X..=MAX_X).contains(&x) || !(MIN_Y..=MAX_Y).contains(&y) {
        return false;
    }

    let clear_of_columns = COLUMNS
        .iter()
        .all(|column| distance(x, y, column.x, column.y) >= column.radius + STONE_HALF);
    if !clear_of_columns {
        return false;
    }

    let pedestal_reach = PEDESTAL_HALF_SIZE + STONE_HALF;
    if (x - PEDESTAL_X).abs() < pedestal_reach && (y - PEDESTAL_Y).abs() < pedestal_reach {
        return false;
    }

    if (x - DOOR_X).abs() < DOOR_HALF_WIDTH + STONE_SIZE && y < WALL_THICKNESS + DOOR_CLEARANCE {
        return false;
    }

    placed
        .iter()
        .all(|&(px, py)| distance(x, y, px, py) >= MIN_STONE_SEPARATION)
}

/// Fixed slot `slot` of the fallback grid, filled row by row.
pub fn fallback_position(slot: usize) -> (f32, f32) {
    let column = slot % STONE_COUNT;
    let row = (slot / STONE_COUNT) % FALLBACK_ROWS_Y.len();
    (
        FALLBACK_START_X + column as f32 * FALLBACK_SPACING,
        FALLBACK_ROWS_Y[row],
    )
}

/// Picks a fallback slot for the stone at `index`.
///
/// Slots are tried starting from the stone's own index, so an all-fallback
/// room lands on the first row in order. A slot is only taken if it keeps
/// clear of the stones already placed; if every slot is blocked the one
/// farthest from its nearest neighbour wins.
fn fallback_for(index: usize, placed: &[(f32, f32)]) -> (f32, f32) {
    let slots =
        (0..FALLBACK_SLOTS).map(move |k| fallback_position((index + k) % FALLBACK_SLOTS));

    if let Some(slot) = slots.clone().find(|&(x, y)| is_clear(x, y, placed)) {
        return slot;
    }

    warn!("Every fallback slot is crowded, placing stone {} loosely", index);
    let clearance = |&(x, y): &(f32, f32)| {
        placed
            .iter()
            .map(|&(px, py)| distance(x, y, px, py))
            .fold(f32::INFINITY, f32::min)
    };
    slots
        .max_by(|a, b| clearance(a).total_cmp(&clearance(b)))
        .unwrap_or_else(|| fallback_position(index))
}
