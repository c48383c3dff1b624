use crate::error::{Error, Result};
use crate::{Tag, MAGIC};

use byteorder::{BigEndian, WriteBytesExt};
use serde::ser;
use std::convert::TryFrom;
use std::io;

/// Nesting limit used unless `Serializer::max_depth` says otherwise.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Helper object for serializing Rust objects into BERT.
///
/// The serializer writes terms only. Use `write_header` (or `to_writer`) to
/// emit the version byte that must start every stream.
///
/// A serializer that returned an error may be reused: failed compounds give
/// back their nesting budget. Bytes written before the error stay in the
/// writer.
pub struct Serializer<W> {
    writer: W,
    depth: usize,
    max_depth: usize,
}

impl<W> Serializer<W>
where
    W: io::Write,
{
    #[inline]
    pub fn new(writer: W) -> Self {
        Serializer {
            writer,
            depth: 0,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Limit how deeply tuples, lists and dictionaries may nest.
    #[inline]
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Write the format version byte.
    #[inline]
    pub fn write_header(&mut self) -> Result<()> {
        self.writer.write_u8(MAGIC)?;
        Ok(())
    }

    #[inline]
    pub fn into_inner(self) -> W {
        self.writer
    }

    #[inline]
    fn write_tag(&mut self, tag: Tag) -> Result<()> {
        self.writer.write_u8(tag as u8)?;
        Ok(())
    }

    /// Atom names written here are fixed and always fit the 1-byte length.
    #[inline]
    fn write_atom(&mut self, name: &str) -> Result<()> {
        debug_assert!(name.len() <= u8::MAX as usize);
        self.write_tag(Tag::Atom)?;
        self.writer.write_u8(name.len() as u8)?;
        self.writer.write_all(name.as_bytes())?;
        Ok(())
    }

    /// `{bert, <kind>}`
    #[inline]
    fn write_wrapped(&mut self, kind: &str) -> Result<()> {
        self.begin_tuple(2)?;
        self.write_atom("bert")?;
        self.write_atom(kind)
    }

    #[inline]
    fn write_small_int(&mut self, v: u8) -> Result<()> {
        self.write_tag(Tag::SmallInt)?;
        self.writer.write_u8(v)?;
        Ok(())
    }

    #[inline]
    fn write_int(&mut self, v: i32) -> Result<()> {
        self.write_tag(Tag::Int)?;
        self.writer.write_i32::<BigEndian>(v)?;
        Ok(())
    }

    /// 64-bit integers always take 8 magnitude bytes, whatever their value.
    fn write_bignum(&mut self, negative: bool, magnitude: u64) -> Result<()> {
        self.write_tag(Tag::SmallBignum)?;
        self.writer.write_u8(8)?;
        self.writer.write_u8(negative as u8)?;
        self.writer.write_u64::<BigEndian>(magnitude)?;
        Ok(())
    }

    fn write_wide_bignum(&mut self, negative: bool, magnitude: u128) -> Result<()> {
        self.write_tag(Tag::SmallBignum)?;
        self.writer.write_u8(16)?;
        self.writer.write_u8(negative as u8)?;
        self.writer.write_u128::<BigEndian>(magnitude)?;
        Ok(())
    }

    /// Floats travel as `%.20e` text, e.g. `1.20000000000000000000e+03`.
    fn write_float(&mut self, v: f64) -> Result<()> {
        if !v.is_finite() {
            return Err(Error::unsupported(format_args!("non-finite float {}", v)));
        }

        // Rust leaves the exponent unsigned and unpadded.
        let text = format!("{:.20e}", v);
        let (mantissa, exponent) = text.split_once('e').unwrap_or((text.as_str(), "0"));
        let (sign, digits) = match exponent.strip_prefix('-') {
            Some(digits) => (b'-', digits),
            None => (b'+', exponent),
        };

        self.write_tag(Tag::Float)?;
        self.writer.write_all(mantissa.as_bytes())?;
        self.writer.write_u8(b'e')?;
        self.writer.write_u8(sign)?;
        if digits.len() < 2 {
            self.writer.write_u8(b'0')?;
        }
        self.writer.write_all(digits.as_bytes())?;
        Ok(())
    }

    #[inline]
    fn enter(&mut self) -> Result<()> {
        if self.depth >= self.max_depth {
            return Err(Error::RecursionLimitExceeded);
        }
        self.depth += 1;
        Ok(())
    }

    #[inline]
    fn leave(&mut self) {
        self.depth -= 1;
    }

    /// Undo `enter` when a compound fails before reaching `end`.
    #[inline]
    fn unwind<T>(&mut self, result: Result<T>) -> Result<T> {
        if result.is_err() {
            self.leave();
        }
        result
    }

    #[inline]
    fn begin_tuple(&mut self, arity: usize) -> Result<()> {
        if arity <= u8::MAX as usize {
            self.write_tag(Tag::SmallTuple)?;
            self.writer.write_u8(arity as u8)?;
        } else {
            let arity = frame_len(arity)?;
            self.write_tag(Tag::LargeTuple)?;
            self.writer.write_u32::<BigEndian>(arity)?;
        }
        Ok(())
    }

    #[inline]
    fn begin_list(&mut self, len: usize) -> Result<()> {
        let len = frame_len(len)?;
        self.write_tag(Tag::List)?;
        self.writer.write_u32::<BigEndian>(len)?;
        Ok(())
    }

    #[inline]
    fn end_list(&mut self) -> Result<()> {
        self.write_tag(Tag::Nil)
    }

    /// `{bert, dict, [` up to the first pair.
    #[inline]
    fn begin_dict(&mut self, len: usize) -> Result<()> {
        frame_len(len)?;
        self.begin_tuple(3)?;
        self.write_atom("bert")?;
        self.write_atom("dict")?;
        self.begin_list(len)
    }
}

/// Length fields on the wire are 32 bits wide.
#[inline]
fn frame_len(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| Error::ValueTooLarge(len))
}

impl<'a, W> ser::Serializer for &'a mut Serializer<W>
where
    W: io::Write,
{
    type Ok = ();
    type Error = Error;

    type SerializeSeq = Self;
    type SerializeTuple = Self;
    type SerializeTupleStruct = ser::Impossible<(), Error>;
    type SerializeTupleVariant = ser::Impossible<(), Error>;
    type SerializeMap = Self;
    type SerializeStruct = ser::Impossible<(), Error>;
    type SerializeStructVariant = ser::Impossible<(), Error>;

    #[inline]
    fn is_human_readable(&self) -> bool {
        false
    }

    #[inline]
    fn serialize_bool(self, v: bool) -> Result<()> {
        self.write_wrapped(if v { "true" } else { "false" })
    }

    #[inline]
    fn serialize_i8(self, v: i8) -> Result<()> {
        self.write_int(v as i32)
    }

    #[inline]
    fn serialize_i16(self, v: i16) -> Result<()> {
        self.write_int(v as i32)
    }

    #[inline]
    fn serialize_i32(self, v: i32) -> Result<()> {
        self.write_int(v)
    }

    #[inline]
    fn serialize_i64(self, v: i64) -> Result<()> {
        self.write_bignum(v < 0, v.unsigned_abs())
    }

    #[inline]
    fn serialize_i128(self, v: i128) -> Result<()> {
        self.write_wide_bignum(v < 0, v.unsigned_abs())
    }

    #[inline]
    fn serialize_u8(self, v: u8) -> Result<()> {
        self.write_small_int(v)
    }

    #[inline]
    fn serialize_u16(self, v: u16) -> Result<()> {
        self.write_int(v as i32)
    }

    #[inline]
    fn serialize_u32(self, v: u32) -> Result<()> {
        match i32::try_from(v) {
            Ok(v) => self.write_int(v),
            Err(_) => self.write_bignum(false, v as u64),
        }
    }

    #[inline]
    fn serialize_u64(self, v: u64) -> Result<()> {
        self.write_bignum(false, v)
    }

    #[inline]
    fn serialize_u128(self, v: u128) -> Result<()> {
        self.write_wide_bignum(false, v)
    }

    #[inline]
    fn serialize_f32(self, v: f32) -> Result<()> {
        self.write_float(v as f64)
    }

    #[inline]
    fn serialize_f64(self, v: f64) -> Result<()> {
        self.write_float(v)
    }

    #[inline]
    fn serialize_char(self, v: char) -> Result<()> {
        let mut buf = [0; 4];
        self.serialize_str(v.encode_utf8(&mut buf))
    }

    #[inline]
    fn serialize_str(self, v: &str) -> Result<()> {
        self.serialize_bytes(v.as_bytes())
    }

    #[inline]
    fn serialize_bytes(self, v: &[u8]) -> Result<()> {
        let len = frame_len(v.len())?;
        self.write_tag(Tag::Binary)?;
        self.writer.write_u32::<BigEndian>(len)?;
        self.writer.write_all(v)?;
        Ok(())
    }

    #[inline]
    fn serialize_unit(self) -> Result<()> {
        self.write_wrapped("nil")
    }

    #[inline]
    fn serialize_unit_struct(self, _name: &'static str) -> Result<()> {
        self.serialize_unit()
    }

    fn serialize_unit_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<()> {
        Err(Error::unsupported(format_args!("enum variant `{}::{}`", name, variant)))
    }

    /// Serialize newtypes without a wrapper.
    #[inline]
    fn serialize_newtype_struct<T: ?Sized>(self, _name: &'static str, value: &T) -> Result<()>
    where
        T: ser::Serialize,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized>(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _value: &T,
    ) -> Result<()>
    where
        T: ser::Serialize,
    {
        Err(Error::unsupported(format_args!("enum variant `{}::{}`", name, variant)))
    }

    #[inline]
    fn serialize_none(self) -> Result<()> {
        self.serialize_unit()
    }

    #[inline]
    fn serialize_some<T: ?Sized>(self, value: &T) -> Result<()>
    where
        T: ser::Serialize,
    {
        value.serialize(self)
    }

    #[inline]
    fn serialize_seq(self, len: Option<usize>) -> Result<Self::SerializeSeq> {
        if let Some(len) = len {
            self.enter()?;
            let begun = self.begin_list(len);
            self.unwind(begun)?;
            Ok(self)
        } else {
            Err(Error::LengthRequired)
        }
    }

    #[inline]
    fn serialize_tuple(self, len: usize) -> Result<Self::SerializeTuple> {
        self.enter()?;
        let begun = self.begin_tuple(len);
        self.unwind(begun)?;
        Ok(self)
    }

    fn serialize_tuple_struct(
        self,
        name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        Err(Error::unsupported(format_args!("tuple struct `{}`", name)))
    }

    fn serialize_tuple_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        Err(Error::unsupported(format_args!("enum variant `{}::{}`", name, variant)))
    }

    #[inline]
    fn serialize_map(self, len: Option<usize>) -> Result<Self::SerializeMap> {
        if let Some(len) = len {
            self.enter()?;
            let begun = self.begin_dict(len);
            self.unwind(begun)?;
            Ok(self)
        } else {
            Err(Error::LengthRequired)
        }
    }

    fn serialize_struct(self, name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        Err(Error::unsupported(format_args!("struct `{}`", name)))
    }

    fn serialize_struct_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        Err(Error::unsupported(format_args!("enum variant `{}::{}`", name, variant)))
    }
}

impl<'a, W> ser::SerializeSeq for &'a mut Serializer<W>
where
    W: io::Write,
{
    type Ok = ();
    type Error = Error;

    #[inline]
    fn serialize_element<T: ?Sized>(&mut self, v: &T) -> Result<()>
    where
        T: ser::Serialize,
    {
        let result = v.serialize(&mut **self);
        self.unwind(result)
    }

    #[inline]
    fn end(self) -> Result<()> {
        self.leave();
        self.end_list()
    }
}

impl<'a, W> ser::SerializeTuple for &'a mut Serializer<W>
where
    W: io::Write,
{
    type Ok = ();
    type Error = Error;

    #[inline]
    fn serialize_element<T: ?Sized>(&mut self, v: &T) -> Result<()>
    where
        T: ser::Serialize,
    {
        let result = v.serialize(&mut **self);
        self.unwind(result)
    }

    #[inline]
    fn end(self) -> Result<()> {
        self.leave();
        Ok(())
    }
}

/// Each entry becomes a `{Key, Value}` pair in the dictionary's list.
impl<'a, W> ser::SerializeMap for &'a mut Serializer<W>
where
    W: io::Write,
{
    type Ok = ();
    type Error = Error;

    #[inline]
    fn serialize_key<T: ?Sized>(&mut self, key: &T) -> Result<()>
    where
        T: ser::Serialize,
    {
        let result = match self.begin_tuple(2) {
            Ok(()) => key.serialize(&mut **self),
            Err(err) => Err(err),
        };
        self.unwind(result)
    }

    #[inline]
    fn serialize_value<T: ?Sized>(&mut self, v: &T) -> Result<()>
    where
        T: ser::Serialize,
    {
        let result = v.serialize(&mut **self);
        self.unwind(result)
    }

    #[inline]
    fn end(self) -> Result<()> {
        self.leave();
        self.end_list()
    }
}

// ----------------------------------------------------------------------------

/// Serialize the given data structure as BERT into the IO stream, starting
/// with the version byte.
///
/// Bytes are written as they are produced. If encoding fails part way, the
/// stream holds the output of everything encoded before the failing value
/// and must be discarded. The failing value itself writes nothing.
///
/// Integers are framed by their Rust width: `u8` as a small integer, other
/// types up to 32 bits as a 4-byte integer, 64- and 128-bit types as bignums.
///
/// `Vec<u8>` and `&[u8]` are plain sequences to serde and come out as lists of
/// small integers. Wrap them in `serde_bytes::Bytes`/`ByteBuf` (or use
/// `Value::Binary`) to get a BERT binary.
///
/// # Errors
///
/// Serialization fails if `T` contains a value with no BERT encoding (structs,
/// enum variants, non-finite floats), a length that does not fit 32 bits, or
/// nesting deeper than `DEFAULT_MAX_DEPTH`, or if the writer fails.
pub fn to_writer<W, T: ?Sized>(writer: W, value: &T) -> Result<()>
where
    W: io::Write,
    T: ser::Serialize,
{
    let mut ser = Serializer::new(writer);
    ser.write_header()?;
    value.serialize(&mut ser)?;
    Ok(())
}

/// Serialize the given data structure as a BERT byte vector.
///
/// Nothing is returned on failure, so no partial output escapes.
///
/// # Errors
///
/// Same as `to_writer`, minus writer failures.
pub fn to_vec<T: ?Sized>(value: &T) -> Result<Vec<u8>>
where
    T: ser::Serialize,
{
    let mut writer = Vec::with_capacity(128);
    to_writer(&mut writer, value)?;
    Ok(writer)
}
