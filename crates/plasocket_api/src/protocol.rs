//! Builders for server-originated frames.
//!
//! Frames are `|` delimited UTF-8 strings. Most server frames carry the
//! [`SERVER_TAG`] in the position where clients put [`CLIENT_TAG`].

use plasocket_world::BlockId;
use std::fmt;

pub const DELIMITER: char = '|';
pub const SERVER_TAG: &str = "PLACERSERVER";
pub const CLIENT_TAG: &str = "PLACERCLIENT";

/// Source field used in error frames produced by the server itself.
pub const ERROR_SOURCE: &str = "SERVER";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerFrame<'a> {
    JoinAccept,
    /// Carries the JSON world record.
    WorldData(&'a str),
    Place { x: i64, y: i64, block: BlockId },
    Erase { x: i64, y: i64 },
    PlayerMessage { username: &'a str, content: &'a str },
    ServerMessage(&'a str),
    Tellraw(&'a str),
    Texture(&'a str),
    ForceTexture(&'a str),
    TitleTexture(&'a str),
    Error { source: &'a str, message: &'a str },
}

impl<'a> ServerFrame<'a> {
    /// Re-asserts a cell's current state: `ERASE` for air, `PLACE` otherwise.
    pub fn block_state(x: i64, y: i64, block: BlockId) -> Self {
        if block.is_air() {
            ServerFrame::Erase { x, y }
        } else {
            ServerFrame::Place { x, y, block }
        }
    }

    pub fn server_error(message: &'a str) -> Self {
        ServerFrame::Error {
            source: ERROR_SOURCE,
            message,
        }
    }
}

impl fmt::Display for ServerFrame<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerFrame::JoinAccept => write!(f, "JOIN_ACCEPT|{}|ME", SERVER_TAG),
            ServerFrame::WorldData(json) => write!(f, "WORLD_DATA|{}|{}", SERVER_TAG, json),
            ServerFrame::Place { x, y, block } => {
                write!(f, "PLACE|{}|{}|{}|{}", SERVER_TAG, x, y, block)
            }
            ServerFrame::Erase { x, y } => write!(f, "ERASE|{}|{}|{}", SERVER_TAG, x, y),
            ServerFrame::PlayerMessage { username, content } => {
                write!(f, "PLAYER_MESSAGE|{}|{}|{}", SERVER_TAG, username, content)
            }
            ServerFrame::ServerMessage(content) => write!(f, "SERVER_MESSAGE|{}", content),
            ServerFrame::Tellraw(content) => write!(f, "TELLRAW|{}|{}", SERVER_TAG, content),
            ServerFrame::Texture(url) => write!(f, "TEXTURE|{}|{}", SERVER_TAG, url),
            ServerFrame::ForceTexture(url) => write!(f, "FORCE_TEXTURE|{}|{}", SERVER_TAG, url),
            ServerFrame::TitleTexture(url) => write!(f, "TITLE_TEXTURE|{}|{}", SERVER_TAG, url),
            ServerFrame::Error { source, message } => write!(f, "ERROR|{}|{}", source, message),
        }
    }
}

/// Splits a raw frame into its `|` separated parts.
pub fn split_frame(raw: &str) -> Vec<String> {
    raw.split(DELIMITER).map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_shapes() {
        assert_eq!(ServerFrame::JoinAccept.to_string(), "JOIN_ACCEPT|PLACERSERVER|ME");
        assert_eq!(
            ServerFrame::Place { x: 5, y: 7, block: BlockId::Stone }.to_string(),
            "PLACE|PLACERSERVER|5|7|2"
        );
        assert_eq!(
            ServerFrame::Erase { x: 0, y: 59 }.to_string(),
            "ERASE|PLACERSERVER|0|59"
        );
        assert_eq!(
            ServerFrame::PlayerMessage { username: "alice", content: "hi" }.to_string(),
            "PLAYER_MESSAGE|PLACERSERVER|alice|hi"
        );
        assert_eq!(ServerFrame::ServerMessage("hello").to_string(), "SERVER_MESSAGE|hello");
        assert_eq!(
            ServerFrame::TitleTexture("http://x/t.png").to_string(),
            "TITLE_TEXTURE|PLACERSERVER|http://x/t.png"
        );
        assert_eq!(
            ServerFrame::server_error("Unknown message format").to_string(),
            "ERROR|SERVER|Unknown message format"
        );
    }

    #[test]
    fn test_block_state_uses_erase_for_air() {
        assert_eq!(
            ServerFrame::block_state(1, 2, BlockId::Air),
            ServerFrame::Erase { x: 1, y: 2 }
        );
        assert_eq!(
            ServerFrame::block_state(1, 2, BlockId::Gold).to_string(),
            "PLACE|PLACERSERVER|1|2|15"
        );
    }

    #[test]
    fn test_split_keeps_empty_parts() {
        assert_eq!(split_frame("a||b"), vec!["a", "", "b"]);
        assert_eq!(split_frame("HEARTBEAT"), vec!["HEARTBEAT"]);
    }
}
