//! Server lifecycle and connection handling.

pub mod core;
pub mod handlers;

pub use self::core::GameServer;
