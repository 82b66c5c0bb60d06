//! Frame classification.
//!
//! The protocol puts the type token at different positions depending on the
//! message kind, so classification walks an ordered rule table instead of
//! switching on one index. The first rule whose predicate matches decides
//! the kind; a rule that matches but cannot extract its fields makes the
//! frame malformed rather than falling through.

use crate::error::ServerError;
use plasocket_api::split_frame;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    SyncRequest {
        username: String,
        client_version: String,
    },
    Place {
        placer: String,
        x: i64,
        y: i64,
        block_id: i64,
    },
    Erase {
        placer: String,
        x: i64,
        y: i64,
    },
    Chat {
        placer: String,
        username: String,
        content: String,
    },
    /// Position and animation relay. Fields are everything before the
    /// trailing `PLAYER_INFO` tag.
    PlayerInfo {
        fields: Vec<String>,
    },
    Heartbeat,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMessage {
    pub raw: String,
    pub parts: Vec<String>,
    pub kind: MessageKind,
}

struct Rule {
    name: &'static str,
    matches: fn(&str, &[String]) -> bool,
    extract: fn(&[String]) -> Result<MessageKind, ServerError>,
}

fn part_is(parts: &[String], index: usize, token: &str) -> bool {
    parts.get(index).map(String::as_str) == Some(token)
}

const RULES: &[Rule] = &[
    Rule {
        name: "SYNC_REQ",
        matches: |_, parts| part_is(parts, 1, "SYNC_REQ"),
        extract: |parts| {
            Ok(MessageKind::SyncRequest {
                username: field(parts, 0, "username")?.to_string(),
                client_version: field(parts, 2, "client version")?.to_string(),
            })
        },
    },
    Rule {
        name: "PLACE",
        matches: |_, parts| part_is(parts, 0, "PLACE"),
        extract: |parts| {
            Ok(MessageKind::Place {
                placer: field(parts, 1, "placer")?.to_string(),
                x: number(parts, 2, "x")?,
                y: number(parts, 3, "y")?,
                block_id: number(parts, 4, "block id")?,
            })
        },
    },
    Rule {
        name: "ERASE",
        matches: |_, parts| part_is(parts, 0, "ERASE"),
        extract: |parts| {
            Ok(MessageKind::Erase {
                placer: field(parts, 1, "placer")?.to_string(),
                x: number(parts, 2, "x")?,
                y: number(parts, 3, "y")?,
            })
        },
    },
    Rule {
        name: "PLAYER_MESSAGE",
        matches: |_, parts| part_is(parts, 0, "PLAYER_MESSAGE"),
        extract: |parts| {
            field(parts, 3, "content")?;
            Ok(MessageKind::Chat {
                placer: field(parts, 1, "placer")?.to_string(),
                username: field(parts, 2, "username")?.to_string(),
                // chat text may itself contain the delimiter
                content: parts[3..].join("|"),
            })
        },
    },
    Rule {
        name: "PLAYER_INFO",
        matches: |_, parts| parts.last().map(String::as_str) == Some("PLAYER_INFO"),
        extract: |parts| {
            Ok(MessageKind::PlayerInfo {
                fields: parts[..parts.len() - 1].to_vec(),
            })
        },
    },
    Rule {
        name: "HEARTBEAT",
        matches: |raw, _| raw == "HEARTBEAT",
        extract: |_| Ok(MessageKind::Heartbeat),
    },
];

fn field<'a>(parts: &'a [String], index: usize, name: &str) -> Result<&'a str, ServerError> {
    parts.get(index).map(String::as_str).ok_or_else(|| {
        ServerError::MalformedMessage(format!("missing {} (field {})", name, index))
    })
}

fn number(parts: &[String], index: usize, name: &str) -> Result<i64, ServerError> {
    let value = field(parts, index, name)?;
    value.trim().parse().map_err(|_| {
        ServerError::MalformedMessage(format!("{} is not an integer: {:?}", name, value))
    })
}

/// Classifies already split parts.
pub fn classify(raw: &str, parts: &[String]) -> Result<MessageKind, ServerError> {
    match RULES.iter().find(|rule| (rule.matches)(raw, parts)) {
        Some(rule) => (rule.extract)(parts).map_err(|e| match e {
            ServerError::MalformedMessage(detail) => {
                ServerError::MalformedMessage(format!("{}: {}", rule.name, detail))
            }
            other => other,
        }),
        None => Ok(MessageKind::Unknown),
    }
}

pub fn parse(raw: &str) -> Result<ParsedMessage, ServerError> {
    let parts = split_frame(raw);
    let kind = classify(raw, &parts)?;
    Ok(ParsedMessage {
        raw: raw.to_string(),
        parts,
        kind,
    })
}
