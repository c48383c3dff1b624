use std::fmt::{self, Display};
use std::io;

use serde::ser;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while encoding a term.
///
/// Every variant is terminal for the encode call that produced it. When
/// writing straight into a sink with `to_writer`, bytes of sibling elements
/// encoded before the failure are already in the sink and should be
/// discarded by the caller.
#[derive(Debug)]
pub enum Error {
    /// The underlying sink failed.
    Io(io::Error),
    /// A `Serialize` implementation reported its own error.
    Message(String),
    /// The value has no BERT encoding, e.g. a user-defined struct.
    UnsupportedType(String),
    /// A length or arity does not fit the 32-bit field that must hold it.
    ValueTooLarge(usize),
    /// A sequence or map did not report its length up front.
    LengthRequired,
    /// The value is nested deeper than the serializer allows.
    RecursionLimitExceeded,
}

impl Error {
    #[cold]
    pub(crate) fn unsupported(kind: impl Display) -> Self {
        Error::UnsupportedType(kind.to_string())
    }
}

impl ser::Error for Error {
    fn custom<T: Display>(msg: T) -> Self {
        Error::Message(msg.to_string())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err) => err.fmt(f),
            Error::Message(err) => err.fmt(f),
            Error::UnsupportedType(kind) => write!(f, "unsupported type: {}", kind),
            Error::ValueTooLarge(len) => {
                write!(f, "value too large: length {} exceeds 32 bits", len)
            }
            Error::LengthRequired => "length required".fmt(f),
            Error::RecursionLimitExceeded => "recursion limit exceeded".fmt(f),
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}
