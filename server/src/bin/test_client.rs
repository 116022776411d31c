use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use log::{info, warn};
use shared::{ClientMessage, RoomSnapshot, ServerMessage, DOOR_X, WALL_THICKNESS};
use std::time::Duration;
use tokio::time::sleep;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

/// Scripted client that joins, renames itself and walks the stones in order
/// (the server must run with --reveal-step-order for it to know the order).
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server WebSocket URL
    #[arg(short = 's', long, default_value = "ws://127.0.0.1:3000")]
    server: String,

    /// Display name to request
    #[arg(short, long, default_value = "test-bot")]
    name: String,

    /// Number of rooms to clear before leaving
    #[arg(short, long, default_value = "1")]
    rooms: u32,

    /// Delay between moves in milliseconds
    #[arg(long, default_value = "250")]
    step_delay: u64,
}

fn encode(message: &ClientMessage) -> Result<Message, serde_json::Error> {
    Ok(Message::Text(serde_json::to_string(message)?))
}

/// Positions to walk through for a room, ending in the door band.
fn route(room: &RoomSnapshot) -> Option<Vec<(f32, f32)>> {
    let mut stones: Vec<_> = room
        .stones
        .iter()
        .map(|stone| stone.step_order.map(|order| (order, stone.x, stone.y)))
        .collect::<Option<_>>()?;
    stones.sort_by_key(|(order, _, _)| *order);

    let mut path: Vec<(f32, f32)> = stones.into_iter().map(|(_, x, y)| (x, y)).collect();
    path.push((DOOR_X, WALL_THICKNESS + 5.0));
    Some(path)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    info!("Connecting to {}", args.server);
    let (ws, _response) = connect_async(args.server.as_str()).await?;
    let (mut write, mut read) = ws.split();

    write
        .send(encode(&ClientMessage::SetName {
            name: args.name.clone(),
        })?)
        .await?;

    let mut cleared = 0;
    while let Some(frame) = read.next().await {
        let text = match frame? {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        let room = match serde_json::from_str::<ServerMessage>(&text) {
            Ok(ServerMessage::Init { id, players, room }) => {
                info!("Joined as player {} with {} players online", id, players.len());
                room
            }
            Ok(ServerMessage::NewRoom { room, .. }) => {
                cleared += 1;
                info!("Entered room {}", room.room_number);
                if cleared >= args.rooms {
                    break;
                }
                room
            }
            Ok(ServerMessage::PuzzleUpdate {
                progress,
                door_open,
                reset,
            }) => {
                info!(
                    "Puzzle progress {} (door open: {}, reset: {})",
                    progress, door_open, reset
                );
                continue;
            }
            Ok(other) => {
                info!("{:?}", other);
                continue;
            }
            Err(e) => {
                warn!("Unreadable server message: {}", e);
                continue;
            }
        };

        let Some(path) = route(&room) else {
            warn!("Step order hidden by the server, nothing to solve");
            break;
        };

        for (x, y) in path {
            sleep(Duration::from_millis(args.step_delay)).await;
            write
                .send(encode(&ClientMessage::Move { x, y, angle: None })?)
                .await?;
        }
    }

    let _ = write.send(Message::Close(None)).await;
    info!("Test client finished after {} rooms", cleared);
    Ok(())
}
