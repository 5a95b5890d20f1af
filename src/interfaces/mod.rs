//! Edges of the engine: callback payload parsing, replay event input and
//! statement output.

pub mod replay;
pub mod statement;
pub mod webhook;
