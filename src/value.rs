//! Dynamic value model: what a stream decodes to when no target type is
//! known.
//!
//! Unlike the typed path, this one has nothing to reconcile against — it
//! reproduces whatever is on the wire with full fidelity and fails only on
//! truncation or corruption. `Object` keys are insertion-ordered strings;
//! `Dictionary` keys are arbitrary decoded values, kept as ordered pairs.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::decode::{
    read_char_payload, read_datetime_payload, read_decimal_payload, read_guid_payload, Decode,
};
use crate::encode::{write_count, Encode};
use crate::io::{BinReader, BinWriter};
use crate::skip::read_element_tag;
use crate::wire::{EnumerableType, SerializedType};
use crate::{CodecError, DecodeOptions, EncodeOptions, Result};

/// A dynamically-typed decoded value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Char(char),
    Str(String),
    U8(u8),
    I8(i8),
    U16(u16),
    I16(i16),
    U32(u32),
    I32(i32),
    U64(u64),
    I64(i64),
    F32(f32),
    F64(f64),
    Decimal(Decimal),
    DateTime(DateTime<Utc>),
    Guid(Uuid),
    List(Vec<Value>),
    Dictionary(Vec<(Value, Value)>),
    Object(IndexMap<String, Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The scalar wire tag of this value, when it has one.
    pub fn scalar_tag(&self) -> Option<SerializedType> {
        Some(match self {
            Value::Bool(_) => SerializedType::Bool,
            Value::Char(_) => SerializedType::Char,
            Value::Str(_) => SerializedType::String,
            Value::U8(_) => SerializedType::Byte,
            Value::I8(_) => SerializedType::SByte,
            Value::U16(_) => SerializedType::UShort,
            Value::I16(_) => SerializedType::Short,
            Value::U32(_) => SerializedType::UInt,
            Value::I32(_) => SerializedType::Int,
            Value::U64(_) => SerializedType::ULong,
            Value::I64(_) => SerializedType::Long,
            Value::F32(_) => SerializedType::Float,
            Value::F64(_) => SerializedType::Double,
            Value::Decimal(_) => SerializedType::Decimal,
            Value::DateTime(_) => SerializedType::DateTime,
            Value::Guid(_) => SerializedType::Guid,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Any integer variant widened to `i64`; `u64` values above `i64::MAX`
    /// return `None`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::U8(v) => Some(*v as i64),
            Value::I8(v) => Some(*v as i64),
            Value::U16(v) => Some(*v as i64),
            Value::I16(v) => Some(*v as i64),
            Value::U32(v) => Some(*v as i64),
            Value::I32(v) => Some(*v as i64),
            Value::U64(v) => i64::try_from(*v).ok(),
            Value::I64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F32(v) => Some(*v as f64),
            Value::F64(v) => Some(*v),
            _ => None,
        }
    }

    /// Member lookup on an `Object` value.
    pub fn get(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Object(members) => members.get(name),
            _ => None,
        }
    }

    /// Element lookup on a `List` value.
    pub fn index(&self, idx: usize) -> Option<&Value> {
        match self {
            Value::List(items) => items.get(idx),
            _ => None,
        }
    }

    pub fn len(&self) -> Option<usize> {
        match self {
            Value::List(items) => Some(items.len()),
            Value::Dictionary(entries) => Some(entries.len()),
            Value::Object(members) => Some(members.len()),
            Value::Str(s) => Some(s.len()),
            _ => None,
        }
    }
}

/// Shared element tag when every list element is the same scalar kind.
/// Empty lists have no element type to commit to and stay heterogeneous.
fn homogeneous_tag(items: &[Value]) -> Option<SerializedType> {
    let first = items.first()?.scalar_tag()?;
    items[1..]
        .iter()
        .all(|item| item.scalar_tag() == Some(first))
        .then_some(first)
}

impl Encode for Value {
    fn encode(&self, writer: &mut BinWriter<'_>, opts: &EncodeOptions) -> Result<()> {
        match self {
            Value::Null => writer.write_tag(SerializedType::Null),
            Value::Bool(v) => v.encode(writer, opts),
            Value::Char(v) => v.encode(writer, opts),
            Value::Str(v) => v.encode(writer, opts),
            Value::U8(v) => v.encode(writer, opts),
            Value::I8(v) => v.encode(writer, opts),
            Value::U16(v) => v.encode(writer, opts),
            Value::I16(v) => v.encode(writer, opts),
            Value::U32(v) => v.encode(writer, opts),
            Value::I32(v) => v.encode(writer, opts),
            Value::U64(v) => v.encode(writer, opts),
            Value::I64(v) => v.encode(writer, opts),
            Value::F32(v) => v.encode(writer, opts),
            Value::F64(v) => v.encode(writer, opts),
            Value::Decimal(v) => v.encode(writer, opts),
            Value::DateTime(v) => v.encode(writer, opts),
            Value::Guid(v) => v.encode(writer, opts),
            Value::List(items) => {
                // Same homogeneity probe as the typed path, at runtime.
                if let Some(element_tag) = homogeneous_tag(items) {
                    writer.write_tag(SerializedType::HList)?;
                    write_count(writer, items.len())?;
                    writer.write_u8(element_tag as u8)?;
                    for item in items {
                        item.encode_payload(writer)?;
                    }
                    Ok(())
                } else {
                    writer.write_tag(SerializedType::List)?;
                    write_count(writer, items.len())?;
                    for item in items {
                        item.encode(writer, opts)?;
                    }
                    Ok(())
                }
            }
            Value::Dictionary(entries) => {
                writer.write_tag(SerializedType::Dictionary)?;
                write_count(writer, entries.len())?;
                for (key, value) in entries {
                    key.encode(writer, opts)?;
                    value.encode(writer, opts)?;
                }
                Ok(())
            }
            Value::Object(members) => {
                writer.write_tag(SerializedType::Object)?;
                for (name, value) in members {
                    if opts.skip_null_values && value.is_null() {
                        continue;
                    }
                    writer.write_marker(EnumerableType::HasItem)?;
                    writer.write_string(name)?;
                    value.encode(writer, opts)?;
                }
                writer.write_marker(EnumerableType::End)
            }
        }
    }

    fn encode_payload(&self, writer: &mut BinWriter<'_>) -> Result<()> {
        match self {
            Value::Bool(v) => v.encode_payload(writer),
            Value::Char(v) => v.encode_payload(writer),
            Value::Str(v) => v.encode_payload(writer),
            Value::U8(v) => v.encode_payload(writer),
            Value::I8(v) => v.encode_payload(writer),
            Value::U16(v) => v.encode_payload(writer),
            Value::I16(v) => v.encode_payload(writer),
            Value::U32(v) => v.encode_payload(writer),
            Value::I32(v) => v.encode_payload(writer),
            Value::U64(v) => v.encode_payload(writer),
            Value::I64(v) => v.encode_payload(writer),
            Value::F32(v) => v.encode_payload(writer),
            Value::F64(v) => v.encode_payload(writer),
            Value::Decimal(v) => v.encode_payload(writer),
            Value::DateTime(v) => v.encode_payload(writer),
            Value::Guid(v) => v.encode_payload(writer),
            other => Err(CodecError::Encode(format!(
                "Value {:?} has no untagged scalar payload",
                other
            ))),
        }
    }

    fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl Decode for Value {
    fn decode_from(
        tag: SerializedType,
        reader: &mut BinReader<'_>,
        opts: &DecodeOptions,
    ) -> Result<Option<Self>> {
        Ok(Some(match tag {
            SerializedType::Null => Value::Null,
            SerializedType::Bool => Value::Bool(reader.read_u8()? != 0),
            SerializedType::Char => Value::Char(read_char_payload(reader)?),
            SerializedType::String => Value::Str(reader.read_string()?),
            SerializedType::Byte => Value::U8(reader.read_u8()?),
            SerializedType::SByte => Value::I8(reader.read_i8()?),
            SerializedType::UShort => Value::U16(reader.read_u16()?),
            SerializedType::Short => Value::I16(reader.read_i16()?),
            SerializedType::UInt => Value::U32(reader.read_u32()?),
            SerializedType::Int => Value::I32(reader.read_i32()?),
            SerializedType::ULong => Value::U64(reader.read_u64()?),
            SerializedType::Long => Value::I64(reader.read_i64()?),
            SerializedType::Float => Value::F32(reader.read_f32()?),
            SerializedType::Double => Value::F64(reader.read_f64()?),
            SerializedType::Decimal => Value::Decimal(read_decimal_payload(reader)?),
            SerializedType::DateTime => Value::DateTime(read_datetime_payload(reader)?),
            SerializedType::Guid => Value::Guid(read_guid_payload(reader)?),
            SerializedType::List => {
                let count = reader.read_count()?;
                let mut items = Vec::with_capacity(count.min(opts.list_capacity));
                for _ in 0..count {
                    items.push(Value::decode(reader, opts)?.unwrap_or(Value::Null));
                }
                Value::List(items)
            }
            SerializedType::HList => {
                let count = reader.read_count()?;
                let element_tag = read_element_tag(reader)?;
                let mut items = Vec::with_capacity(count.min(opts.list_capacity));
                for _ in 0..count {
                    items.push(
                        Value::decode_from(element_tag, reader, opts)?.unwrap_or(Value::Null),
                    );
                }
                Value::List(items)
            }
            SerializedType::Enumerable => {
                let mut items = Vec::new();
                while reader.read_marker()? == EnumerableType::HasItem {
                    items.push(Value::decode(reader, opts)?.unwrap_or(Value::Null));
                }
                Value::List(items)
            }
            SerializedType::HEnumerable => {
                let element_tag = read_element_tag(reader)?;
                let mut items = Vec::new();
                while reader.read_marker()? == EnumerableType::HasItem {
                    items.push(
                        Value::decode_from(element_tag, reader, opts)?.unwrap_or(Value::Null),
                    );
                }
                Value::List(items)
            }
            SerializedType::Dictionary => {
                let count = reader.read_count()?;
                let mut entries = Vec::with_capacity(count.min(opts.list_capacity));
                for _ in 0..count {
                    let key = Value::decode(reader, opts)?.unwrap_or(Value::Null);
                    let value = Value::decode(reader, opts)?.unwrap_or(Value::Null);
                    entries.push((key, value));
                }
                Value::Dictionary(entries)
            }
            SerializedType::Object => {
                let mut members = IndexMap::new();
                while reader.read_marker()? == EnumerableType::HasItem {
                    let name = reader.read_string()?;
                    let value = Value::decode(reader, opts)?.unwrap_or(Value::Null);
                    members.insert(name, value);
                }
                Value::Object(members)
            }
        }))
    }
}
