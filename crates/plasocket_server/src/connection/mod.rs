//! Connection tracking and message delivery.

pub mod client;
pub mod messenger;
pub mod registry;

pub use client::{ClientConnection, OUTBOUND_QUEUE_CAPACITY};
pub use messenger::Messenger;
pub use registry::ConnectionRegistry;
