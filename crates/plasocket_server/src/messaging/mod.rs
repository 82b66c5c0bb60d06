//! Inbound frame parsing and handling.

pub mod dispatcher;
pub mod parser;

pub use dispatcher::Dispatcher;
pub use parser::{classify, parse, MessageKind, ParsedMessage};
