//! # Room Puzzle Server Library
//!
//! This library provides the authoritative server for a small multiplayer
//! room puzzle. Players walk around a shared room, step on numbered stones in
//! a hidden order to open the exit door, and walk through the door together
//! into a freshly generated room.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Room State
//! There is exactly one active room for the whole server. The server decides
//! which stone a reported position touches, whether that step continues the
//! hidden sequence or resets it, when the door opens and when the room is
//! replaced. Clients only ever display what the server tells them.
//!
//! ### Session Management
//! Handles the lifecycle of every connection:
//! - Identity assignment (monotonic, never reused) and spawn placement
//! - Position and display name updates from the player's own messages
//! - Removal and announcement when the connection closes
//!
//! ### State Broadcasting
//! Every state change is pushed to the relevant connections as a small JSON
//! event. Movement is echoed to everyone except the mover; puzzle progress,
//! renames, departures and room changes go to everyone.
//!
//! ## Architecture Design
//!
//! ### Single Sequential Game Loop
//! Connection tasks only read and write WebSocket frames. Every state change
//! is funnelled through one channel into a single loop that owns all game
//! state, so each event is applied atomically relative to every other. In
//! particular a room transition (new stones, relocated players and the
//! `new_room` broadcast) can never interleave with another player's move.
//!
//! ### Fire-and-forget Fan-out
//! Each connection owns an outbound queue. Broadcasting pushes onto the
//! queues without waiting; a queue whose connection has closed is skipped.
//!
//! ## Module Organization
//!
//! - `placement`: rejection-sampled stone layout around the fixed obstacles
//! - `room`: the active room, its progress counter and transitions
//! - `puzzle`: step ordering rules and the door trigger
//! - `registry`: player identities, spawn positions and names
//! - `game`: ties the above together per inbound event
//! - `client_manager`: open connections and message delivery
//! - `network`: WebSocket accept loop and the game loop
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::game::GameConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::bind("127.0.0.1:3000", GameConfig::default()).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod client_manager;
pub mod error;
pub mod game;
pub mod network;
pub mod placement;
pub mod puzzle;
pub mod registry;
pub mod room;
