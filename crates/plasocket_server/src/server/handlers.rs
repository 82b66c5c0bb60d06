//! Per-connection WebSocket handling.

use crate::connection::OUTBOUND_QUEUE_CAPACITY;
use crate::error::ServerError;
use crate::messaging::Dispatcher;
use futures::{Sink, SinkExt, Stream, StreamExt};
use std::fmt::Display;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::{
    accept_async,
    tungstenite::{Error as WsError, Message},
};
use tracing::{debug, info, warn};

/// How long a peer may take to complete the WebSocket upgrade.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// How long the writer may keep flushing after the connection is cleaned up.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Runs one client connection from handshake to cleanup.
///
/// A peer that does not finish the handshake within [`HANDSHAKE_TIMEOUT`],
/// or before shutdown is requested, is dropped without being registered.
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    dispatcher: Arc<Dispatcher>,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<(), ServerError> {
    let ws_stream = tokio::select! {
        _ = shutdown.recv() => {
            debug!("Shutdown during handshake with {}", addr);
            return Ok(());
        }
        handshake = tokio::time::timeout(HANDSHAKE_TIMEOUT, accept_async(stream)) => match handshake {
            Ok(Ok(ws_stream)) => ws_stream,
            Ok(Err(e)) => {
                return Err(ServerError::Network(format!("WebSocket handshake failed for {addr}: {e}")));
            }
            Err(_) => {
                return Err(ServerError::Network(format!("WebSocket handshake with {addr} timed out")));
            }
        }
    };

    let (ws_sink, ws_receiver) = ws_stream.split();
    run_session(ws_sink, ws_receiver, Some(addr), dispatcher, shutdown).await;
    Ok(())
}

/// Drives an upgraded connection until the peer leaves, a write fails or
/// shutdown is requested.
///
/// Outbound frames are queued on a channel and written by a separate task,
/// so the read loop never waits on a slow client. Frames from this
/// connection are handled one at a time, in arrival order. On shutdown the
/// frame being handled is finished before the loop exits. Cleanup runs
/// exactly once however the session ends.
pub(crate) async fn run_session<S, R>(
    mut sink: S,
    mut frames: R,
    addr: Option<SocketAddr>,
    dispatcher: Arc<Dispatcher>,
    mut shutdown: broadcast::Receiver<()>,
) where
    S: Sink<Message> + Unpin + Send + 'static,
    S::Error: Display + Send,
    R: Stream<Item = Result<Message, WsError>> + Unpin,
{
    let (outbound, mut outbound_rx) = mpsc::channel::<String>(OUTBOUND_QUEUE_CAPACITY);

    let conn = dispatcher.on_connect(outbound, addr).await;
    match addr {
        Some(addr) => info!("Connection {} established from {}", conn, addr),
        None => info!("Connection {} established", conn),
    }

    let mut writer = tokio::spawn(async move {
        while let Some(text) = outbound_rx.recv().await {
            if let Err(e) = sink.send(Message::text(text)).await {
                debug!("Write to {} failed: {}", conn, e);
                break;
            }
        }
        let _ = sink.close().await;
    });
    let mut writer_done = false;

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                debug!("Closing connection {} for shutdown", conn);
                break;
            }
            _ = &mut writer => {
                debug!("Writer for {} stopped, closing connection", conn);
                writer_done = true;
                break;
            }
            frame = frames.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    dispatcher.on_frame(conn, text.as_str()).await;
                }
                Some(Ok(Message::Binary(_))) => {
                    warn!("Ignoring binary frame from {}", conn);
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!("WebSocket error on {}: {}", conn, e);
                    break;
                }
            }
        }
    }

    // dropping the registry's sender lets the writer drain and close
    dispatcher.on_disconnect(conn).await;
    if !writer_done && tokio::time::timeout(WRITER_DRAIN_TIMEOUT, writer).await.is_err() {
        warn!("Writer for {} did not finish in time", conn);
    }

    info!("Connection {} closed", conn);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::connection::{ConnectionRegistry, Messenger};
    use plugin_system::PluginManager;
    use plasocket_world::{shared, WorldGrid};

    fn dispatcher() -> (Arc<Dispatcher>, Arc<ConnectionRegistry>) {
        let registry = Arc::new(ConnectionRegistry::new());
        let messenger = Arc::new(Messenger::new(registry.clone()));
        let dispatcher = Dispatcher::new(
            Arc::new(ServerConfig::default()),
            shared(WorldGrid::default()),
            registry.clone(),
            messenger,
            Arc::new(PluginManager::empty()),
        );
        (Arc::new(dispatcher), registry)
    }

    #[tokio::test]
    async fn test_failed_write_ends_session() {
        let (dispatcher, registry) = dispatcher();
        let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);

        // every write fails while the read side stays open
        let sink = Box::pin(futures::sink::unfold((), |_, _: Message| async {
            Err::<(), WsError>(WsError::ConnectionClosed)
        }));
        let frames = futures::stream::iter(vec![Ok(Message::text(
            "PLAYER_MESSAGE|PLACERCLIENT|bob|hello",
        ))])
        .chain(futures::stream::pending());

        let session = run_session(sink, frames, None, dispatcher, shutdown_rx);
        tokio::time::timeout(Duration::from_secs(2), session)
            .await
            .expect("session kept running after its writer failed");

        assert_eq!(registry.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_ends_idle_session() {
        let (dispatcher, registry) = dispatcher();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let session = tokio::spawn(run_session(
            futures::sink::drain::<Message>(),
            futures::stream::pending::<Result<Message, WsError>>(),
            None,
            dispatcher,
            shutdown_rx,
        ));

        for _ in 0..100 {
            if registry.connection_count() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        shutdown_tx.send(()).unwrap();

        tokio::time::timeout(Duration::from_secs(2), session)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(registry.connection_count(), 0);
    }
}
