//! Identifiers, hook capabilities, log levels and plugin errors.

use std::fmt;

/// Opaque handle addressing one client connection.
///
/// Handles are never reused within a server's lifetime, so a stale handle
/// simply fails to resolve instead of reaching a different client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The named extension points of the message lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    Load,
    Connect,
    Message,
    Disconnect,
    Unload,
}

impl HookKind {
    pub const ALL: [HookKind; 5] = [
        HookKind::Load,
        HookKind::Connect,
        HookKind::Message,
        HookKind::Disconnect,
        HookKind::Unload,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            HookKind::Load => "on_load",
            HookKind::Connect => "on_connect",
            HookKind::Message => "on_message",
            HookKind::Disconnect => "on_disconnect",
            HookKind::Unload => "on_unload",
        }
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The set of hooks a plugin implements.
///
/// Hooks outside the set are never invoked, even though the [`Plugin`]
/// trait provides no-op defaults for all of them.
///
/// [`Plugin`]: crate::Plugin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Hooks {
    bits: u8,
}

impl Hooks {
    pub const NONE: Hooks = Hooks { bits: 0 };
    pub const ALL: Hooks = Hooks { bits: 0b1_1111 };

    fn bit(kind: HookKind) -> u8 {
        match kind {
            HookKind::Load => 1,
            HookKind::Connect => 1 << 1,
            HookKind::Message => 1 << 2,
            HookKind::Disconnect => 1 << 3,
            HookKind::Unload => 1 << 4,
        }
    }

    pub fn with(self, kind: HookKind) -> Self {
        Hooks {
            bits: self.bits | Self::bit(kind),
        }
    }

    pub fn contains(self, kind: HookKind) -> bool {
        self.bits & Self::bit(kind) != 0
    }

    pub fn iter(self) -> impl Iterator<Item = HookKind> {
        HookKind::ALL.into_iter().filter(move |k| self.contains(*k))
    }
}

impl FromIterator<HookKind> for Hooks {
    fn from_iter<I: IntoIterator<Item = HookKind>>(iter: I) -> Self {
        iter.into_iter().fold(Hooks::NONE, Hooks::with)
    }
}

/// Enumeration of log levels for plugin logging.
///
/// These map one-to-one onto the server's `tracing` levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Critical errors that may affect system stability
    Error,
    /// Warning conditions that should be investigated
    Warn,
    /// General informational messages
    Info,
    /// Detailed information for debugging
    Debug,
    /// Very detailed trace information
    Trace,
}

/// Errors that can occur during plugin operations.
///
/// None of these ever reach a client; the hook pipeline logs them and treats
/// the failed call as a no-op.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PluginError {
    #[error("Plugin execution error: {0}")]
    ExecutionError(String),
    #[error("Plugin runtime error: {0}")]
    Runtime(String),
}

impl PluginError {
    /// Converts a caught panic payload into [`PluginError::Runtime`].
    pub fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            format!("Plugin panicked: {}", s)
        } else if let Some(s) = payload.downcast_ref::<String>() {
            format!("Plugin panicked: {}", s)
        } else {
            "Plugin panicked with unknown error".to_string()
        };

        PluginError::Runtime(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hook_set() {
        let hooks: Hooks = [HookKind::Connect, HookKind::Message].into_iter().collect();
        assert!(hooks.contains(HookKind::Message));
        assert!(!hooks.contains(HookKind::Load));
        assert_eq!(hooks.iter().count(), 2);
        assert!(HookKind::ALL.iter().all(|k| Hooks::ALL.contains(*k)));
        assert_eq!(Hooks::NONE.iter().count(), 0);
    }

    #[test]
    fn test_hook_names() {
        assert_eq!(HookKind::Disconnect.to_string(), "on_disconnect");
        assert_eq!(HookKind::Load.as_str(), "on_load");
    }

    #[test]
    fn test_panic_payloads() {
        let err = PluginError::from_panic(Box::new("boom"));
        assert_eq!(err.to_string(), "Plugin runtime error: Plugin panicked: boom");

        let err = PluginError::from_panic(Box::new(String::from("owned")));
        assert!(err.to_string().contains("owned"));

        let err = PluginError::from_panic(Box::new(42u8));
        assert!(matches!(err, PluginError::Runtime(m) if m.contains("unknown")));
    }
}
