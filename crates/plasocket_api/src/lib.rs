//! # Plasocket plugin API
//!
//! Types shared between the server core and its plugins: connection handles,
//! the [`Plugin`] trait with its hook points, the [`ServerApi`] capability
//! object plugins act through, and builders for the wire frames the server
//! emits.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use plasocket_api::*;
//! use std::sync::Arc;
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl Plugin for Echo {
//!     fn name(&self) -> &str { "echo" }
//!
//!     fn hooks(&self) -> Hooks {
//!         Hooks::NONE.with(HookKind::Message)
//!     }
//!
//!     async fn on_message(
//!         &self,
//!         conn: ConnectionId,
//!         raw: &str,
//!         parts: &[String],
//!         api: Arc<dyn ServerApi>,
//!     ) -> Result<bool, PluginError> {
//!         if parts.first().map(String::as_str) == Some("ECHO") {
//!             api.send_to_client(conn, raw);
//!             return Ok(true);
//!         }
//!         Ok(false)
//!     }
//! }
//! ```

pub mod context;
pub mod plugin;
pub mod protocol;
pub mod types;

pub use async_trait::async_trait;
pub use context::{BroadcastOverride, DirectSender, ServerApi};
pub use plasocket_world::BlockId;
pub use plugin::Plugin;
pub use protocol::{split_frame, ServerFrame, CLIENT_TAG, SERVER_TAG};
pub use types::{ConnectionId, HookKind, Hooks, LogLevel, PluginError};
