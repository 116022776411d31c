//! Server network layer handling WebSocket connections and the game loop

use crate::client_manager::{ClientManager, OUTBOUND_QUEUE_CAPACITY};
use crate::error::ServerError;
use crate::game::{GameConfig, GameState};
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

/// Events sent from connection tasks to the game loop
#[derive(Debug)]
pub enum ServerEvent {
    Connected {
        outbound: mpsc::Sender<Message>,
        /// Receives the assigned identity, or None if the server is full
        reply: oneshot::Sender<Option<u32>>,
    },
    MessageReceived {
        id: u32,
        text: String,
    },
    Disconnected {
        id: u32,
    },
}

/// Main server owning the listener and all game state
pub struct Server {
    listener: TcpListener,
    game_state: GameState,
    clients: ClientManager,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerEvent>,
    server_rx: mpsc::UnboundedReceiver<ServerEvent>,
}

impl Server {
    pub async fn bind(addr: &str, config: GameConfig) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        info!("Server listening on {}", listener.local_addr()?);

        Ok(Self::with_state(listener, GameState::new(config)))
    }

    pub fn with_state(listener: TcpListener, game_state: GameState) -> Self {
        let (server_tx, server_rx) = mpsc::unbounded_channel();

        Server {
            listener,
            game_state,
            clients: ClientManager::new(),
            server_tx,
            server_rx,
        }
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Runs the accept loop and the game loop until the process ends.
    ///
    /// Connection tasks only move frames; every state change happens here,
    /// one event at a time.
    pub async fn run(self) -> Result<(), ServerError> {
        let Server {
            listener,
            mut game_state,
            mut clients,
            server_tx,
            mut server_rx,
        } = self;

        tokio::spawn(accept_loop(listener, server_tx));
        info!("Server started successfully");

        while let Some(event) = server_rx.recv().await {
            handle_event(&mut game_state, &mut clients, event);
        }

        info!("Server shutting down");
        Ok(())
    }
}

/// Applies one connection event to the game state and fans out the result.
pub fn handle_event(game_state: &mut GameState, clients: &mut ClientManager, event: ServerEvent) {
    match event {
        ServerEvent::Connected { outbound, reply } => {
            let Some((id, outgoing)) = game_state.connect() else {
                warn!("Rejecting connection: server full");
                let _ = reply.send(None);
                return;
            };

            if reply.send(Some(id)).is_err() {
                // the connection went away before it learned its identity
                game_state.disconnect(id);
                return;
            }

            clients.register(id, outbound);
            for out in &outgoing {
                clients.dispatch(out);
            }
            info!(
                "Player {} connected ({} online)",
                id,
                game_state.player_count()
            );
        }

        ServerEvent::MessageReceived { id, text } => {
            for out in game_state.handle_message(id, &text) {
                clients.dispatch(&out);
            }
        }

        ServerEvent::Disconnected { id } => {
            clients.unregister(id);
            for out in game_state.disconnect(id) {
                clients.dispatch(&out);
            }
            info!(
                "Player {} disconnected ({} online)",
                id,
                game_state.player_count()
            );
        }
    }
}

async fn accept_loop(listener: TcpListener, server_tx: mpsc::UnboundedSender<ServerEvent>) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let server_tx = server_tx.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, addr, server_tx).await {
                        warn!("Connection from {} failed: {}", addr, e);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {}", e);
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            }
        }
    }
}

/// Drives a single WebSocket from handshake to close.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    server_tx: mpsc::UnboundedSender<ServerEvent>,
) -> Result<(), ServerError> {
    let ws_stream = accept_async(stream).await?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let (outbound_tx, mut outbound_rx) = mpsc::channel::<Message>(OUTBOUND_QUEUE_CAPACITY);
    let (reply_tx, reply_rx) = oneshot::channel();

    if server_tx
        .send(ServerEvent::Connected {
            outbound: outbound_tx,
            reply: reply_tx,
        })
        .is_err()
    {
        return Ok(());
    }

    let Ok(Some(id)) = reply_rx.await else {
        let close = Message::Close(Some(CloseFrame {
            code: CloseCode::Again,
            reason: "Server full".into(),
        }));
        let _ = ws_sender.send(close).await;
        return Ok(());
    };
    debug!("Connection from {} bound to player {}", addr, id);

    // Ends once the game loop drops this connection's queue
    let writer = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if let Err(e) = ws_sender.send(message).await {
                debug!("Write to player {} failed: {}", id, e);
                break;
            }
        }
        let _ = ws_sender.close().await;
    });

    while let Some(frame) = ws_receiver.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                if server_tx
                    .send(ServerEvent::MessageReceived { id, text })
                    .is_err()
                {
                    break;
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!("WebSocket error for player {}: {}", id, e);
                break;
            }
        }
    }

    let _ = server_tx.send(ServerEvent::Disconnected { id });
    let _ = writer.await;
    Ok(())
}
