//! Client connection representation.

use std::net::SocketAddr;
use std::time::{Instant, SystemTime};
use tokio::sync::mpsc::Sender;

/// Frames that may wait in a connection's outbound queue. A client that
/// falls this far behind loses further frames until its writer catches up.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 1024;

/// An individual client connection as the registry sees it.
///
/// Outbound frames go through `outbound`, which is drained by the
/// connection's writer task. Dropping the connection drops the sender and
/// ends that task.
#[derive(Debug)]
pub struct ClientConnection {
    /// Self-declared on the first `SYNC_REQ`
    pub username: Option<String>,

    pub remote_addr: Option<SocketAddr>,

    pub connected_at: SystemTime,

    /// Updated by heartbeats
    pub last_seen: Instant,

    pub outbound: Sender<String>,
}

impl ClientConnection {
    pub fn new(outbound: Sender<String>, remote_addr: Option<SocketAddr>) -> Self {
        Self {
            username: None,
            remote_addr,
            connected_at: SystemTime::now(),
            last_seen: Instant::now(),
            outbound,
        }
    }
}
