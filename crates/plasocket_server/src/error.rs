use plasocket_api::ConnectionId;
use plasocket_world::WorldError;

/// Errors raised by the server core.
///
/// Errors caused by a client frame are answered with an `ERROR` frame and
/// never end the connection.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Connection {0} not found")]
    ConnectionNotFound(ConnectionId),
    #[error("Malformed message: {0}")]
    MalformedMessage(String),
    #[error(transparent)]
    World(#[from] WorldError),
}
