use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

pub const ROOM_WIDTH: f32 = 800.0;
pub const ROOM_HEIGHT: f32 = 600.0;
pub const WALL_THICKNESS: f32 = 20.0;
pub const PLAYER_RADIUS: f32 = 15.0;

pub const STONE_COUNT: usize = 5;
pub const STONE_SIZE: f32 = 40.0;
pub const MIN_STONE_SEPARATION: f32 = STONE_SIZE * 2.5;
pub const STEP_TRIGGER_RADIUS: f32 = STONE_SIZE / 2.0 + PLAYER_RADIUS;
pub const PLACEMENT_MARGIN: f32 = 40.0;
pub const PLACEMENT_ATTEMPTS: usize = 200;

pub const PEDESTAL_X: f32 = ROOM_WIDTH / 2.0;
pub const PEDESTAL_Y: f32 = ROOM_HEIGHT / 2.0;
pub const PEDESTAL_HALF_SIZE: f32 = 30.0;

/// Door opening centred on the top wall.
pub const DOOR_X: f32 = ROOM_WIDTH / 2.0;
pub const DOOR_HALF_WIDTH: f32 = 40.0;
pub const DOOR_TRIGGER_DEPTH: f32 = 30.0;
/// Stones keep at least this far below the wall face inside the door's span.
pub const DOOR_CLEARANCE: f32 = DOOR_TRIGGER_DEPTH + STONE_SIZE * 1.5;

/// Players enter a room along the bottom wall.
pub const SPAWN_Y: f32 = ROOM_HEIGHT - WALL_THICKNESS - 40.0;
pub const SPAWN_JITTER: f32 = 80.0;
pub const SPAWN_POINTS: [(f32, f32); 4] = [
    (ROOM_WIDTH / 2.0 - 60.0, SPAWN_Y),
    (ROOM_WIDTH / 2.0 + 60.0, SPAWN_Y),
    (ROOM_WIDTH / 2.0 - 120.0, SPAWN_Y),
    (ROOM_WIDTH / 2.0 + 120.0, SPAWN_Y),
];

pub const MAX_NAME_LEN: usize = 20;

pub const COLORS: [&str; 12] = [
    "#FF6B6B", "#4ECDC4", "#45B7D1", "#96CEB4", "#FFEAA7", "#DDA0DD", "#98D8C8", "#F7DC6F",
    "#BB8FCE", "#85C1E9", "#F0B27A", "#82E0AA",
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Column {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

pub const COLUMNS: [Column; 4] = [
    Column { x: 200.0, y: 180.0, radius: 25.0 },
    Column { x: 600.0, y: 180.0, radius: 25.0 },
    Column { x: 200.0, y: 420.0, radius: 25.0 },
    Column { x: 600.0, y: 420.0, radius: 25.0 },
];

/// Messages sent by a client.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Move {
        x: f32,
        y: f32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        angle: Option<f32>,
    },
    SetName {
        name: String,
    },
}

/// Messages sent by the server.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Init {
        id: u32,
        #[serde(with = "player_map")]
        players: BTreeMap<u32, Player>,
        room: RoomSnapshot,
    },
    PlayerJoined {
        id: u32,
        player: Player,
    },
    PlayerMoved {
        id: u32,
        x: f32,
        y: f32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        angle: Option<f32>,
    },
    PlayerRenamed {
        id: u32,
        name: String,
    },
    PlayerLeft {
        id: u32,
    },
    PuzzleUpdate {
        progress: u8,
        #[serde(rename = "doorOpen")]
        door_open: bool,
        reset: bool,
    },
    NewRoom {
        room: RoomSnapshot,
        #[serde(with = "player_map")]
        players: BTreeMap<u32, Player>,
    },
}

/// Player maps travel as JSON objects keyed by the id's decimal string.
///
/// Buffered (internally tagged) decoding hands keys over as plain strings, so
/// they are parsed back explicitly.
mod player_map {
    use super::Player;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S: Serializer>(
        players: &BTreeMap<u32, Player>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        players.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<u32, Player>, D::Error> {
        BTreeMap::<String, Player>::deserialize(deserializer)?
            .into_iter()
            .map(|(key, player)| {
                key.parse::<u32>()
                    .map(|id| (id, player))
                    .map_err(D::Error::custom)
            })
            .collect()
    }
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    /// A number that does not fit a finite f32 (serde_json writes those as null)
    #[error("non-finite coordinate in move")]
    NonFinite,
}

impl ClientMessage {
    /// Decodes one inbound text frame.
    ///
    /// Moves whose coordinates overflow to infinity are rejected here so they
    /// never reach the registry and get echoed to other clients.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let message: Self = serde_json::from_str(text)?;

        if let ClientMessage::Move { x, y, angle } = &message {
            let angle_ok = angle.map_or(true, f32::is_finite);
            if !x.is_finite() || !y.is_finite() || !angle_ok {
                return Err(ProtocolError::NonFinite);
            }
        }

        Ok(message)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Player {
    pub x: f32,
    pub y: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle: Option<f32>,
    pub color: String,
    pub name: String,
}

impl Player {
    pub fn new(id: u32, x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            angle: None,
            color: player_color(id).to_string(),
            name: format!("Player {}", id),
        }
    }
}

/// A stone in the current room. `step_order` is the hidden activation order,
/// `display_num` the shuffled label shown to players.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepTarget {
    pub x: f32,
    pub y: f32,
    pub display_num: u8,
    pub step_order: u8,
}

impl StepTarget {
    pub fn view(&self, reveal_step_order: bool) -> StoneView {
        StoneView {
            x: self.x,
            y: self.y,
            display_num: self.display_num,
            step_order: reveal_step_order.then_some(self.step_order),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoneView {
    pub x: f32,
    pub y: f32,
    pub display_num: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_order: Option<u8>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub stones: Vec<StoneView>,
    pub progress: u8,
    pub door_open: bool,
    pub room_number: u32,
}

/// Palette colour for a player identity.
///
/// Identities start at 1 and wrap around the palette.
pub fn player_color(id: u32) -> &'static str {
    COLORS[(id.saturating_sub(1) as usize) % COLORS.len()]
}

/// Euclidean distance between two points
pub fn distance(ax: f32, ay: f32, bx: f32, by: f32) -> f32 {
    let dx = bx - ax;
    let dy = by - ay;
    (dx * dx + dy * dy).sqrt()
}

/// True when the point lies in the strip just below the door opening.
pub fn in_door_band(x: f32, y: f32) -> bool {
    (x - DOOR_X).abs() <= DOOR_HALF_WIDTH && y <= WALL_THICKNESS + DOOR_TRIGGER_DEPTH
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_player_creation() {
        let player = Player::new(1, 100.0, 200.0);
        assert_eq!(player.x, 100.0);
        assert_eq!(player.y, 200.0);
        assert_eq!(player.angle, None);
        assert_eq!(player.color, "#FF6B6B");
        assert_eq!(player.name, "Player 1");
    }

    #[test]
    fn test_player_color_wraps_palette() {
        assert_eq!(player_color(1), COLORS[0]);
        assert_eq!(player_color(12), COLORS[11]);
        assert_eq!(player_color(13), COLORS[0]);
    }

    #[test]
    fn test_distance() {
        assert_approx_eq!(distance(0.0, 0.0, 3.0, 4.0), 5.0, 0.0001);
        assert_approx_eq!(distance(10.0, 10.0, 10.0, 10.0), 0.0, 0.0001);
    }

    #[test]
    fn test_door_band() {
        assert!(in_door_band(DOOR_X, WALL_THICKNESS + 10.0));
        assert!(in_door_band(DOOR_X + DOOR_HALF_WIDTH, WALL_THICKNESS));
        assert!(!in_door_band(DOOR_X + DOOR_HALF_WIDTH + 1.0, WALL_THICKNESS));
        assert!(!in_door_band(DOOR_X, WALL_THICKNESS + DOOR_TRIGGER_DEPTH + 1.0));
        assert!(!in_door_band(DOOR_X, SPAWN_Y));
    }

    #[test]
    fn test_trigger_radius_cannot_overlap_two_stones() {
        assert!(MIN_STONE_SEPARATION > STEP_TRIGGER_RADIUS * 2.0);
    }

    #[test]
    fn test_parse_move() {
        let msg = ClientMessage::parse(r#"{"type":"move","x":12.5,"y":40,"angle":1.5}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Move {
                x: 12.5,
                y: 40.0,
                angle: Some(1.5)
            }
        );

        let msg = ClientMessage::parse(r#"{"type":"move","x":1,"y":2}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Move {
                x: 1.0,
                y: 2.0,
                angle: None
            }
        );
    }

    #[test]
    fn test_parse_set_name() {
        let msg = ClientMessage::parse(r#"{"type":"set_name","name":"Ada"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::SetName {
                name: "Ada".to_string()
            }
        );
    }

    #[test]
    fn test_parse_rejects_malformed() {
        let bad = [
            "",
            "not json",
            r#"{"x":1,"y":2}"#,
            r#"{"type":"teleport","x":1,"y":2}"#,
            r#"{"type":"move","x":"left","y":2}"#,
            r#"{"type":"set_name","name":42}"#,
            r#"{"type":"move","x":1"#,
        ];
        for text in bad {
            assert!(ClientMessage::parse(text).is_err(), "accepted {:?}", text);
        }
    }

    #[test]
    fn test_parse_rejects_overflowing_coordinates() {
        let overflowing = [
            r#"{"type":"move","x":1e39,"y":100}"#,
            r#"{"type":"move","x":100,"y":-1e39}"#,
            r#"{"type":"move","x":100,"y":100,"angle":1e300}"#,
        ];
        for text in overflowing {
            assert!(
                matches!(ClientMessage::parse(text), Err(ProtocolError::NonFinite)),
                "accepted {:?}",
                text
            );
        }

        // large but representable values still pass
        assert!(ClientMessage::parse(r#"{"type":"move","x":1e38,"y":-1e38}"#).is_ok());
    }

    #[test]
    fn test_puzzle_update_wire_format() {
        let msg = ServerMessage::PuzzleUpdate {
            progress: 1,
            door_open: false,
            reset: false,
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"type":"puzzle_update","progress":1,"doorOpen":false,"reset":false})
        );
    }

    #[test]
    fn test_player_moved_omits_missing_angle() {
        let msg = ServerMessage::PlayerMoved {
            id: 3,
            x: 1.0,
            y: 2.0,
            angle: None,
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"type":"player_moved","id":3,"x":1.0,"y":2.0})
        );
    }

    #[test]
    fn test_init_keys_players_by_id() {
        let mut players = BTreeMap::new();
        players.insert(7, Player::new(7, 10.0, 20.0));
        let msg = ServerMessage::Init {
            id: 7,
            players,
            room: RoomSnapshot {
                stones: vec![],
                progress: 0,
                door_open: false,
                room_number: 1,
            },
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "init");
        assert_eq!(value["players"]["7"]["name"], "Player 7");
        assert_eq!(value["room"]["roomNumber"], 1);
        assert_eq!(value["room"]["doorOpen"], false);
    }

    #[test]
    fn test_init_decodes_player_map() {
        let text = r##"{"type":"init","id":2,"players":{"1":{"x":1,"y":2,"color":"#FF6B6B","name":"Player 1"},"2":{"x":3,"y":4,"angle":0.5,"color":"#4ECDC4","name":"Player 2"}},"room":{"stones":[{"x":100,"y":120,"displayNum":3}],"progress":0,"doorOpen":false,"roomNumber":1}}"##;

        match serde_json::from_str::<ServerMessage>(text).unwrap() {
            ServerMessage::Init { id, players, room } => {
                assert_eq!(id, 2);
                assert_eq!(players.len(), 2);
                assert_eq!(players[&1].name, "Player 1");
                assert_eq!(players[&2].angle, Some(0.5));
                assert_eq!(room.stones[0].display_num, 3);
                assert_eq!(room.stones[0].step_order, None);
            }
            other => panic!("Unexpected message {:?}", other),
        }
    }

    #[test]
    fn test_player_map_rejects_non_numeric_keys() {
        let text = r#"{"type":"new_room","room":{"stones":[],"progress":0,"doorOpen":false,"roomNumber":2},"players":{"abc":{"x":1,"y":2,"color":"c","name":"n"}}}"#;
        assert!(serde_json::from_str::<ServerMessage>(text).is_err());
    }

    #[test]
    fn test_stone_view_hides_step_order() {
        let stone = StepTarget {
            x: 100.0,
            y: 120.0,
            display_num: 4,
            step_order: 2,
        };

        let hidden = serde_json::to_value(stone.view(false)).unwrap();
        assert_eq!(hidden["displayNum"], 4);
        assert!(hidden.get("stepOrder").is_none());

        let revealed = serde_json::to_value(stone.view(true)).unwrap();
        assert_eq!(revealed["stepOrder"], 2);
    }
}
