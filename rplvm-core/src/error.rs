//! Error kinds reported by the core.
//!
//! Operations return `Result`; the runtime additionally records the most
//! recent failure in a last-error slot so an embedder polling the C-style
//! boolean surface can retrieve it after the fact.

use crate::object::Id;
use std::error;
use std::fmt::{Display, Formatter};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// Arena exhausted even after collection.
    OutOfMemory,
    /// No kind consumed the input, or a kind consumed then rejected it.
    /// The position is a byte offset into the source text.
    Parse { position: usize, message: String },
    /// Operation applied to the wrong object kind.
    Type { expected: Id, got: Id },
    /// Domain error in an operation that requires a finite operand.
    Arithmetic,
    /// Pop or peek past the bottom of the evaluation stack.
    StackUnderflow,
    /// Recall of an unbound name.
    NotFound(String),
    /// External interrupt observed at a step boundary.
    Interrupted,
}

impl Error {
    pub fn parse(position: usize, message: impl Into<String>) -> Self {
        Error::Parse {
            position,
            message: message.into(),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::OutOfMemory => write!(f, "out of memory"),
            Error::Parse { position, message } => {
                write!(f, "parse error at {}: {}", position, message)
            }
            Error::Type { expected, got } => {
                write!(f, "type error: expected {:?}, got {:?}", expected, got)
            }
            Error::Arithmetic => write!(f, "arithmetic error"),
            Error::StackUnderflow => write!(f, "stack underflow"),
            Error::NotFound(name) => write!(f, "name '{}' not found", name),
            Error::Interrupted => write!(f, "interrupted"),
        }
    }
}

impl error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;
