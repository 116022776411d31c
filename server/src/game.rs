use crate::client_manager::Outgoing;
use crate::puzzle::{door_reached, evaluate_step, StepOutcome};
use crate::registry::{PlayerRegistry, SpawnMode};
use crate::room::Room;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{ClientMessage, ServerMessage};

/// Settings that shape the game rules for one server run.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub max_players: usize,
    pub spawn_mode: SpawnMode,
    /// Include each stone's hidden step order in room snapshots
    pub reveal_step_order: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            max_players: 64,
            spawn_mode: SpawnMode::EntryBand,
            reveal_step_order: false,
        }
    }
}

/// All shared game state: the players and the room they are in.
///
/// Every method runs to completion before the next event is looked at, so
/// each one is atomic with respect to every other connection. The returned
/// `Outgoing` list is what has to be fanned out as a result.
pub struct GameState {
    pub registry: PlayerRegistry,
    pub room: Room,
    config: GameConfig,
    rng: StdRng,
}

impl GameState {
    pub fn new(config: GameConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    pub fn with_rng(config: GameConfig, mut rng: StdRng) -> Self {
        let room = Room::first(&mut rng);
        info!("Room {} generated", room.room_number);

        Self {
            registry: PlayerRegistry::new(config.max_players, config.spawn_mode),
            room,
            config,
            rng,
        }
    }

    /// Admits a new connection.
    ///
    /// Returns the new identity plus its private `init` and the `player_joined`
    /// announcement for everyone else, or None when the server is full.
    pub fn connect(&mut self) -> Option<(u32, Vec<Outgoing>)> {
        let id = self.registry.admit(&mut self.rng)?;
        let player = self.registry.get(id)?.clone();

        let init = ServerMessage::Init {
            id,
            players: self.registry.players().clone(),
            room: self.room.snapshot(self.config.reveal_step_order),
        };

        Some((
            id,
            vec![
                Outgoing::SendTo { id, message: init },
                Outgoing::Broadcast {
                    message: ServerMessage::PlayerJoined { id, player },
                    exclude: Some(id),
                },
            ],
        ))
    }

    /// Handles one raw text frame from a connection. Unparseable input is dropped.
    pub fn handle_message(&mut self, id: u32, text: &str) -> Vec<Outgoing> {
        match ClientMessage::parse(text) {
            Ok(message) => self.apply(id, message),
            Err(e) => {
                debug!("Dropping message from player {}: {}", id, e);
                Vec::new()
            }
        }
    }

    pub fn apply(&mut self, id: u32, message: ClientMessage) -> Vec<Outgoing> {
        match message {
            ClientMessage::Move { x, y, angle } => self.move_player(id, x, y, angle),
            ClientMessage::SetName { name } => self.rename_player(id, &name),
        }
    }

    fn move_player(&mut self, id: u32, x: f32, y: f32, angle: Option<f32>) -> Vec<Outgoing> {
        if !self.registry.update_position(id, x, y, angle) {
            return Vec::new();
        }

        let mut outgoing = vec![Outgoing::Broadcast {
            message: ServerMessage::PlayerMoved { id, x, y, angle },
            exclude: Some(id),
        }];

        match evaluate_step(&mut self.room, x, y) {
            StepOutcome::Advanced {
                progress,
                door_open,
            } => {
                debug!("Player {} advanced room {} to {}", id, self.room.room_number, progress);
                if door_open {
                    info!("Door opened in room {}", self.room.room_number);
                }
                outgoing.push(Outgoing::Broadcast {
                    message: ServerMessage::PuzzleUpdate {
                        progress,
                        door_open,
                        reset: false,
                    },
                    exclude: None,
                });
            }
            StepOutcome::OutOfOrder => {
                debug!("Player {} stepped out of order", id);
                outgoing.push(self.reset_puzzle());
            }
            StepOutcome::Ignored => {}
        }

        if door_reached(&self.room, x, y) {
            outgoing.push(self.advance_room());
        }

        outgoing
    }

    fn rename_player(&mut self, id: u32, name: &str) -> Vec<Outgoing> {
        match self.registry.rename(id, name) {
            Some(name) => vec![Outgoing::Broadcast {
                message: ServerMessage::PlayerRenamed { id, name },
                exclude: None,
            }],
            None => Vec::new(),
        }
    }

    /// Removes a closed connection's player and announces it if they were present.
    pub fn disconnect(&mut self, id: u32) -> Vec<Outgoing> {
        if self.registry.remove(id) {
            vec![Outgoing::Broadcast {
                message: ServerMessage::PlayerLeft { id },
                exclude: None,
            }]
        } else {
            Vec::new()
        }
    }

    /// Starts the current room's puzzle over.
    pub fn reset_puzzle(&mut self) -> Outgoing {
        self.room.reset();
        Outgoing::Broadcast {
            message: ServerMessage::PuzzleUpdate {
                progress: self.room.progress,
                door_open: self.room.door_open,
                reset: true,
            },
            exclude: None,
        }
    }

    /// Replaces the room and moves every player to the entry band.
    pub fn advance_room(&mut self) -> Outgoing {
        self.room = self.room.next(&mut self.rng);
        self.registry.relocate_all(&mut self.rng);
        info!(
            "Advanced to room {} with {} players",
            self.room.room_number,
            self.registry.len()
        );

        Outgoing::Broadcast {
            message: ServerMessage::NewRoom {
                room: self.room.snapshot(self.config.reveal_step_order),
                players: self.registry.players().clone(),
            },
            exclude: None,
        }
    }

    pub fn player_count(&self) -> usize {
        self.registry.len()
    }
}
