//! Error types for the world grid, its codec and its storage.

use std::{io::Error as IoError, path::PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorldError {
    #[error("Coordinates ({x}, {y}) are outside the {width}x{height} world")]
    OutOfBounds {
        x: i64,
        y: i64,
        width: usize,
        height: usize,
    },

    #[error("Unknown block id: {0}")]
    InvalidBlockId(i64),

    #[error("Malformed RLE data: {0}")]
    MalformedRle(String),

    #[error("Failed to read file {0}: {1}")]
    FileRead(PathBuf, IoError),

    #[error("Failed to create file {0}: {1}")]
    FileCreate(PathBuf, IoError),

    #[error("Failed to write to file {0}: {1}")]
    FileWrite(PathBuf, IoError),

    #[error("Failed to sync file {0}: {1}")]
    FileSync(PathBuf, IoError),

    #[error("Failed to rename file from {0} to {1}: {2}")]
    FileRename(PathBuf, PathBuf, IoError),

    #[error("Failed to serialize world: {0}")]
    Serialization(serde_json::Error),

    #[error("Failed to deserialize file {0}: {1}")]
    Deserialization(PathBuf, serde_json::Error),
}

pub type WorldResult<T> = Result<T, WorldError>;
