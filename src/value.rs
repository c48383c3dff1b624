//! A closed representation of every value BERT can encode.
//!
//! `Value` is useful when terms are assembled at runtime, or when a caller
//! wants unsupported kinds rejected before any byte is written: `to_value`
//! performs that check, and a `Value` always encodes (barring length, depth
//! and I/O limits).

use crate::error::{Error, Result};

use serde::ser::{self, Serialize, SerializeMap, SerializeTuple};
use std::iter::FromIterator;

/// An encodable value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absence, written as `{bert, nil}`.
    Nil,
    /// Written as `{bert, true}` or `{bert, false}`.
    Bool(bool),
    U8(u8),
    I8(i8),
    U16(u16),
    I16(i16),
    U32(u32),
    I32(i32),
    U64(u64),
    I64(i64),
    I128(i128),
    U128(u128),
    F32(f32),
    F64(f64),
    /// Raw bytes.
    Binary(Vec<u8>),
    /// Text, written as a binary of its UTF-8 bytes.
    Text(String),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    /// Key/value pairs, written as `{bert, dict, [{K, V}, ...]}` in this
    /// order. Keys are expected to be unique.
    Dict(Vec<(Value, Value)>),
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: ser::Serializer,
    {
        match self {
            Value::Nil => serializer.serialize_unit(),
            Value::Bool(v) => serializer.serialize_bool(*v),
            Value::U8(v) => serializer.serialize_u8(*v),
            Value::I8(v) => serializer.serialize_i8(*v),
            Value::U16(v) => serializer.serialize_u16(*v),
            Value::I16(v) => serializer.serialize_i16(*v),
            Value::U32(v) => serializer.serialize_u32(*v),
            Value::I32(v) => serializer.serialize_i32(*v),
            Value::U64(v) => serializer.serialize_u64(*v),
            Value::I64(v) => serializer.serialize_i64(*v),
            Value::I128(v) => serializer.serialize_i128(*v),
            Value::U128(v) => serializer.serialize_u128(*v),
            Value::F32(v) => serializer.serialize_f32(*v),
            Value::F64(v) => serializer.serialize_f64(*v),
            Value::Binary(v) => serializer.serialize_bytes(v),
            Value::Text(v) => serializer.serialize_str(v),
            Value::List(items) => items.serialize(serializer),
            Value::Tuple(items) => {
                let mut tuple = serializer.serialize_tuple(items.len())?;
                for item in items {
                    tuple.serialize_element(item)?;
                }
                tuple.end()
            }
            Value::Dict(pairs) => {
                let mut map = serializer.serialize_map(Some(pairs.len()))?;
                for (key, value) in pairs {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

macro_rules! from_scalar {
    ($($ty:ty => $variant:ident),* $(,)*) => {
        $(
            impl From<$ty> for Value {
                #[inline]
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

from_scalar! {
    bool => Bool,
    u8 => U8,
    i8 => I8,
    u16 => U16,
    i16 => I16,
    u32 => U32,
    i32 => I32,
    u64 => U64,
    i64 => I64,
    i128 => I128,
    u128 => U128,
    f32 => F32,
    f64 => F64,
    String => Text,
}

impl<'a> From<&'a str> for Value {
    #[inline]
    fn from(v: &'a str) -> Self {
        Value::Text(v.to_owned())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    #[inline]
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Nil, Into::into)
    }
}

/// Collecting pairs builds a `Dict`.
impl<K: Into<Value>, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Value::Dict(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

// ----------------------------------------------------------------------------

/// Convert any `Serialize` type into a `Value`.
///
/// # Errors
///
/// Fails with `UnsupportedType` for structs, enum variants and non-finite
/// floats.
pub fn to_value<T: ?Sized>(value: &T) -> Result<Value>
where
    T: Serialize,
{
    value.serialize(ValueSerializer)
}

struct ValueSerializer;

impl ser::Serializer for ValueSerializer {
    type Ok = Value;
    type Error = Error;

    type SerializeSeq = SerializeVec;
    type SerializeTuple = SerializeVec;
    type SerializeTupleStruct = ser::Impossible<Value, Error>;
    type SerializeTupleVariant = ser::Impossible<Value, Error>;
    type SerializeMap = SerializeDict;
    type SerializeStruct = ser::Impossible<Value, Error>;
    type SerializeStructVariant = ser::Impossible<Value, Error>;

    fn is_human_readable(&self) -> bool {
        false
    }

    fn serialize_bool(self, v: bool) -> Result<Value> {
        Ok(Value::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Value> {
        Ok(Value::I8(v))
    }

    fn serialize_i16(self, v: i16) -> Result<Value> {
        Ok(Value::I16(v))
    }

    fn serialize_i32(self, v: i32) -> Result<Value> {
        Ok(Value::I32(v))
    }

    fn serialize_i64(self, v: i64) -> Result<Value> {
        Ok(Value::I64(v))
    }

    fn serialize_i128(self, v: i128) -> Result<Value> {
        Ok(Value::I128(v))
    }

    fn serialize_u8(self, v: u8) -> Result<Value> {
        Ok(Value::U8(v))
    }

    fn serialize_u16(self, v: u16) -> Result<Value> {
        Ok(Value::U16(v))
    }

    fn serialize_u32(self, v: u32) -> Result<Value> {
        Ok(Value::U32(v))
    }

    fn serialize_u64(self, v: u64) -> Result<Value> {
        Ok(Value::U64(v))
    }

    fn serialize_u128(self, v: u128) -> Result<Value> {
        Ok(Value::U128(v))
    }

    fn serialize_f32(self, v: f32) -> Result<Value> {
        if !v.is_finite() {
            return Err(Error::unsupported(format_args!("non-finite float {}", v)));
        }
        Ok(Value::F32(v))
    }

    fn serialize_f64(self, v: f64) -> Result<Value> {
        if !v.is_finite() {
            return Err(Error::unsupported(format_args!("non-finite float {}", v)));
        }
        Ok(Value::F64(v))
    }

    fn serialize_char(self, v: char) -> Result<Value> {
        Ok(Value::Text(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<Value> {
        Ok(Value::Text(v.to_owned()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Value> {
        Ok(Value::Binary(v.to_owned()))
    }

    fn serialize_unit(self) -> Result<Value> {
        Ok(Value::Nil)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Value> {
        Ok(Value::Nil)
    }

    fn serialize_unit_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Value> {
        Err(Error::unsupported(format_args!("enum variant `{}::{}`", name, variant)))
    }

    fn serialize_newtype_struct<T: ?Sized>(self, _name: &'static str, value: &T) -> Result<Value>
    where
        T: Serialize,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized>(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _value: &T,
    ) -> Result<Value>
    where
        T: Serialize,
    {
        Err(Error::unsupported(format_args!("enum variant `{}::{}`", name, variant)))
    }

    fn serialize_none(self) -> Result<Value> {
        Ok(Value::Nil)
    }

    fn serialize_some<T: ?Sized>(self, value: &T) -> Result<Value>
    where
        T: Serialize,
    {
        value.serialize(self)
    }

    /// Unlike the streaming serializer, unknown lengths are fine here.
    fn serialize_seq(self, len: Option<usize>) -> Result<Self::SerializeSeq> {
        Ok(SerializeVec {
            items: Vec::with_capacity(len.unwrap_or(0)),
            tuple: false,
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<Self::SerializeTuple> {
        Ok(SerializeVec {
            items: Vec::with_capacity(len),
            tuple: true,
        })
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

    fn serialize_map(self, len: Option<usize>) -> Result<Self::SerializeMap> {
        Ok(SerializeDict {
            pairs: Vec::with_capacity(len.unwrap_or(0)),
            next_key: None,
        })
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

struct SerializeVec {
    items: Vec<Value>,
    tuple: bool,
}

impl SerializeVec {
    fn finish(self) -> Value {
        if self.tuple {
            Value::Tuple(self.items)
        } else {
            Value::List(self.items)
        }
    }
}

impl ser::SerializeSeq for SerializeVec {
    type Ok = Value;
    type Error = Error;

    fn serialize_element<T: ?Sized>(&mut self, v: &T) -> Result<()>
    where
        T: Serialize,
    {
        self.items.push(v.serialize(ValueSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<Value> {
        Ok(self.finish())
    }
}

impl ser::SerializeTuple for SerializeVec {
    type Ok = Value;
    type Error = Error;

    fn serialize_element<T: ?Sized>(&mut self, v: &T) -> Result<()>
    where
        T: Serialize,
    {
        ser::SerializeSeq::serialize_element(self, v)
    }

    fn end(self) -> Result<Value> {
        Ok(self.finish())
    }
}

struct SerializeDict {
    pairs: Vec<(Value, Value)>,
    next_key: Option<Value>,
}

impl ser::SerializeMap for SerializeDict {
    type Ok = Value;
    type Error = Error;

    fn serialize_key<T: ?Sized>(&mut self, key: &T) -> Result<()>
    where
        T: Serialize,
    {
        self.next_key = Some(key.serialize(ValueSerializer)?);
        Ok(())
    }

    fn serialize_value<T: ?Sized>(&mut self, v: &T) -> Result<()>
    where
        T: Serialize,
    {
        let key = match self.next_key.take() {
            Some(key) => key,
            None => return Err(ser::Error::custom("map value serialized before its key")),
        };
        self.pairs.push((key, v.serialize(ValueSerializer)?));
        Ok(())
    }

    fn end(self) -> Result<Value> {
        Ok(Value::Dict(self.pairs))
    }
}
