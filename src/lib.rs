//! Serde support for BERT, the Binary ERlang Term encoding built on Erlang's
//! External Term Format.

pub mod error;
pub mod ser;
pub mod value;

pub use error::{Error, Result};
pub use ser::{to_vec, to_writer, Serializer};
pub use value::{to_value, Value};

/// Format version byte. Every encoded stream starts with it.
pub const MAGIC: u8 = 131;

/// Tag bytes of the External Term Format.
///
/// `String` and `LargeBignum` are part of the format but never produced by
/// this encoder.
#[repr(u8)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub enum Tag {
    SmallInt = 97,
    Int = 98,
    Float = 99,
    Atom = 100,
    SmallTuple = 104,
    LargeTuple = 105,
    Nil = 106,
    String = 107,
    List = 108,
    Binary = 109,
    SmallBignum = 110,
    LargeBignum = 111,
}
