use thiserror::Error;
use tokio_tungstenite::tungstenite;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("websocket handshake failed: {0}")]
    Handshake(#[from] tungstenite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
