//! Encoder: value dispatch and the `Encode` impl surface.
//!
//! Dispatch priority for types satisfying several capabilities at once is
//! fixed: dictionary-like, then countable-collection-like, then
//! generic-enumerable-like, then plain-object. Custom host types pick the
//! matching writer helper ([`write_map_entries`], [`write_slice`] /
//! [`write_counted`], [`write_enumerable`], [`write_object`]) in that
//! order of preference.
//!
//! Countable collections whose element type maps to one fixed scalar tag
//! take the homogeneous fast path: the element tag is probed *before* any
//! tag byte is committed, and the sequence is written as `HList` /
//! `HEnumerable` with a single shared element tag.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Local, Utc};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::io::BinWriter;
use crate::reflect::{Reflect, TYPE_KEY};
use crate::wire::{datetime_to_ticks, EnumerableType, SerializedType};
use crate::{dec128, CodecError, EncodeOptions, Result};

/// Trait for values that can be written to the tagged wire format.
///
/// Object-safe so that reflected members can be handled as `&dyn Encode`.
/// Most container and scalar types are covered by the provided impls; plain
/// structs go through the [`Reflect`] seam (see [`crate::reflect_object!`]).
pub trait Encode {
    /// The single scalar tag every value of this type encodes under, when
    /// there is one. Drives the homogeneous sequence fast path; container
    /// and object types return `None`.
    fn scalar_tag() -> Option<SerializedType>
    where
        Self: Sized,
    {
        None
    }

    /// Writes the tagged encoding of this value.
    fn encode(&self, writer: &mut BinWriter<'_>, opts: &EncodeOptions) -> Result<()>;

    /// Writes the untagged payload only. Valid for scalar types; the
    /// homogeneous sequence writers call this once per element.
    fn encode_payload(&self, _writer: &mut BinWriter<'_>) -> Result<()> {
        Err(CodecError::Encode(
            "Type has no untagged scalar payload".to_string(),
        ))
    }

    /// True when this value is a null (`Option::None`, `Value::Null`).
    /// Consulted by the object writer for `skip_null_values`.
    fn is_null(&self) -> bool {
        false
    }
}

pub(crate) fn write_count(writer: &mut BinWriter<'_>, count: usize) -> Result<()> {
    if count > i32::MAX as usize {
        return Err(CodecError::Encode(format!(
            "Sequence of {} elements exceeds the wire count field",
            count
        )));
    }
    writer.write_i32(count as i32)
}

// --- Fixed-width scalars ---
/// Scalar encoders write one tag byte and a little-endian payload.
macro_rules! scalar_encode {
    ($ty:ty, $tag:ident, $write:ident) => {
        impl Encode for $ty {
            fn scalar_tag() -> Option<SerializedType> {
                Some(SerializedType::$tag)
            }

            fn encode(&self, writer: &mut BinWriter<'_>, _opts: &EncodeOptions) -> Result<()> {
                writer.write_tag(SerializedType::$tag)?;
                self.encode_payload(writer)
            }

            fn encode_payload(&self, writer: &mut BinWriter<'_>) -> Result<()> {
                writer.$write(*self)
            }
        }
    };
}

scalar_encode!(u8, Byte, write_u8);
scalar_encode!(i8, SByte, write_i8);
scalar_encode!(u16, UShort, write_u16);
scalar_encode!(i16, Short, write_i16);
scalar_encode!(u32, UInt, write_u32);
scalar_encode!(i32, Int, write_i32);
scalar_encode!(u64, ULong, write_u64);
scalar_encode!(i64, Long, write_i64);
scalar_encode!(f32, Float, write_f32);
scalar_encode!(f64, Double, write_f64);

impl Encode for bool {
    fn scalar_tag() -> Option<SerializedType> {
        Some(SerializedType::Bool)
    }

    fn encode(&self, writer: &mut BinWriter<'_>, _opts: &EncodeOptions) -> Result<()> {
        writer.write_tag(SerializedType::Bool)?;
        self.encode_payload(writer)
    }

    fn encode_payload(&self, writer: &mut BinWriter<'_>) -> Result<()> {
        writer.write_u8(*self as u8)
    }
}

/// Encodes a `char` as one UTF-16 code unit.
///
/// # Errors
/// A character outside the Basic Multilingual Plane needs a surrogate pair
/// and cannot be a single code unit; encoding one is an error (encode it as
/// a string instead — the char↔string cross-read covers the decode side).
impl Encode for char {
    fn scalar_tag() -> Option<SerializedType> {
        Some(SerializedType::Char)
    }

    fn encode(&self, writer: &mut BinWriter<'_>, _opts: &EncodeOptions) -> Result<()> {
        writer.write_tag(SerializedType::Char)?;
        self.encode_payload(writer)
    }

    fn encode_payload(&self, writer: &mut BinWriter<'_>) -> Result<()> {
        let code = *self as u32;
        if code > 0xFFFF {
            return Err(CodecError::Encode(format!(
                "char {:?} is outside the Basic Multilingual Plane",
                self
            )));
        }
        writer.write_u16(code as u16)
    }
}

// --- Strings ---
/// Encodes a `String` as a length-prefixed UTF-16 code-unit sequence.
/// An empty string is valid and distinct from null.
impl Encode for String {
    fn scalar_tag() -> Option<SerializedType> {
        Some(SerializedType::String)
    }

    fn encode(&self, writer: &mut BinWriter<'_>, _opts: &EncodeOptions) -> Result<()> {
        writer.write_tag(SerializedType::String)?;
        writer.write_string(self)
    }

    fn encode_payload(&self, writer: &mut BinWriter<'_>) -> Result<()> {
        writer.write_string(self)
    }
}

impl Encode for str {
    fn encode(&self, writer: &mut BinWriter<'_>, _opts: &EncodeOptions) -> Result<()> {
        writer.write_tag(SerializedType::String)?;
        writer.write_string(self)
    }

    fn encode_payload(&self, writer: &mut BinWriter<'_>) -> Result<()> {
        writer.write_string(self)
    }
}

// --- DateTime ---
/// Encodes a `DateTime<Utc>` as a signed 64-bit UTC tick count (100 ns
/// units since 0001-01-01T00:00:00Z). The wire bytes are always UTC.
impl Encode for DateTime<Utc> {
    fn scalar_tag() -> Option<SerializedType> {
        Some(SerializedType::DateTime)
    }

    fn encode(&self, writer: &mut BinWriter<'_>, _opts: &EncodeOptions) -> Result<()> {
        writer.write_tag(SerializedType::DateTime)?;
        self.encode_payload(writer)
    }

    fn encode_payload(&self, writer: &mut BinWriter<'_>) -> Result<()> {
        let ticks = datetime_to_ticks(self).ok_or_else(|| {
            CodecError::Encode(format!("DateTime {} is outside the tick range", self))
        })?;
        writer.write_i64(ticks)
    }
}

macro_rules! datetime_encode_normalized {
    ($tz:ty) => {
        /// Normalized to UTC before encoding.
        impl Encode for DateTime<$tz> {
            fn scalar_tag() -> Option<SerializedType> {
                Some(SerializedType::DateTime)
            }

            fn encode(&self, writer: &mut BinWriter<'_>, opts: &EncodeOptions) -> Result<()> {
                self.with_timezone(&Utc).encode(writer, opts)
            }

            fn encode_payload(&self, writer: &mut BinWriter<'_>) -> Result<()> {
                self.with_timezone(&Utc).encode_payload(writer)
            }
        }
    };
}

datetime_encode_normalized!(Local);
datetime_encode_normalized!(FixedOffset);

// --- Decimal ---
/// Encodes a `Decimal` as IEEE 754-2008 Decimal128 bits, low word first.
impl Encode for Decimal {
    fn scalar_tag() -> Option<SerializedType> {
        Some(SerializedType::Decimal)
    }

    fn encode(&self, writer: &mut BinWriter<'_>, _opts: &EncodeOptions) -> Result<()> {
        writer.write_tag(SerializedType::Decimal)?;
        self.encode_payload(writer)
    }

    fn encode_payload(&self, writer: &mut BinWriter<'_>) -> Result<()> {
        let (lo, hi) = dec128::to_bits(self);
        writer.write_u64(lo)?;
        writer.write_u64(hi)
    }
}

// --- Guid ---
impl Encode for Uuid {
    fn scalar_tag() -> Option<SerializedType> {
        Some(SerializedType::Guid)
    }

    fn encode(&self, writer: &mut BinWriter<'_>, _opts: &EncodeOptions) -> Result<()> {
        writer.write_tag(SerializedType::Guid)?;
        self.encode_payload(writer)
    }

    fn encode_payload(&self, writer: &mut BinWriter<'_>) -> Result<()> {
        writer.write_bytes(self.as_bytes())
    }
}

// --- Option ---
/// `None` encodes as the `Null` tag; `Some` encodes the inner value.
impl<T: Encode> Encode for Option<T> {
    fn encode(&self, writer: &mut BinWriter<'_>, opts: &EncodeOptions) -> Result<()> {
        match self {
            Some(value) => value.encode(writer, opts),
            None => writer.write_tag(SerializedType::Null),
        }
    }

    fn is_null(&self) -> bool {
        self.is_none()
    }
}

// --- Countable collections ---
/// Writes a counted sequence, probing element homogeneity before the tag
/// byte is committed: scalar element types produce `HList` (count, shared
/// element tag, untagged payloads), everything else `List` (count, tagged
/// elements).
pub fn write_slice<T: Encode>(
    items: &[T],
    writer: &mut BinWriter<'_>,
    opts: &EncodeOptions,
) -> Result<()> {
    write_counted(items.iter(), items.len(), writer, opts)
}

/// [`write_slice`] for collections that expose a count but no slice.
pub fn write_counted<'a, T, I>(
    items: I,
    count: usize,
    writer: &mut BinWriter<'_>,
    opts: &EncodeOptions,
) -> Result<()>
where
    T: Encode + 'a,
    I: IntoIterator<Item = &'a T>,
{
    if let Some(element_tag) = T::scalar_tag() {
        writer.write_tag(SerializedType::HList)?;
        write_count(writer, count)?;
        writer.write_u8(element_tag as u8)?;
        for item in items {
            item.encode_payload(writer)?;
        }
    } else {
        writer.write_tag(SerializedType::List)?;
        write_count(writer, count)?;
        for item in items {
            item.encode(writer, opts)?;
        }
    }
    Ok(())
}

/// Writes a marker-delimited sequence for iterables whose count is unknown
/// ahead of iteration: `HEnumerable` with a shared element tag for scalar
/// element types, `Enumerable` with per-element tags otherwise. Both are
/// `HasItem`-prefixed per element and terminated by one `End`.
pub fn write_enumerable<T, I>(
    items: I,
    writer: &mut BinWriter<'_>,
    opts: &EncodeOptions,
) -> Result<()>
where
    T: Encode,
    I: IntoIterator<Item = T>,
{
    if let Some(element_tag) = T::scalar_tag() {
        writer.write_tag(SerializedType::HEnumerable)?;
        writer.write_u8(element_tag as u8)?;
        for item in items {
            writer.write_marker(EnumerableType::HasItem)?;
            item.encode_payload(writer)?;
        }
    } else {
        writer.write_tag(SerializedType::Enumerable)?;
        for item in items {
            writer.write_marker(EnumerableType::HasItem)?;
            item.encode(writer, opts)?;
        }
    }
    writer.write_marker(EnumerableType::End)
}

/// Writes a dictionary: count, then each entry as a tagged key and a
/// tagged value. Null dictionary values are always written explicitly;
/// `skip_null_values` applies to object members only.
pub fn write_map_entries<'a, K, V, I>(
    entries: I,
    count: usize,
    writer: &mut BinWriter<'_>,
    opts: &EncodeOptions,
) -> Result<()>
where
    K: Encode + 'a,
    V: Encode + 'a,
    I: IntoIterator<Item = (&'a K, &'a V)>,
{
    writer.write_tag(SerializedType::Dictionary)?;
    write_count(writer, count)?;
    for (key, value) in entries {
        key.encode(writer, opts)?;
        value.encode(writer, opts)?;
    }
    Ok(())
}

/// Writes a plain object through the [`Reflect`] seam: a discriminator
/// member first when the type provides one, then each gettable member as
/// `HasItem` + name string + tagged value, terminated by one `End`.
/// Null-valued members are omitted entirely under `skip_null_values`.
pub fn write_object<T: Reflect + ?Sized>(
    value: &T,
    writer: &mut BinWriter<'_>,
    opts: &EncodeOptions,
) -> Result<()> {
    writer.write_tag(SerializedType::Object)?;
    if let Some(discriminator) = value.discriminator() {
        writer.write_marker(EnumerableType::HasItem)?;
        writer.write_string(TYPE_KEY)?;
        writer.write_tag(SerializedType::String)?;
        writer.write_string(discriminator)?;
    }
    for member in value.members() {
        if opts.skip_null_values && member.value.is_null() {
            continue;
        }
        writer.write_marker(EnumerableType::HasItem)?;
        writer.write_string(member.name)?;
        member.value.encode(writer, opts)?;
    }
    writer.write_marker(EnumerableType::End)
}

impl<T: Encode> Encode for Vec<T> {
    fn encode(&self, writer: &mut BinWriter<'_>, opts: &EncodeOptions) -> Result<()> {
        write_slice(self, writer, opts)
    }
}

impl<T: Encode> Encode for [T] {
    fn encode(&self, writer: &mut BinWriter<'_>, opts: &EncodeOptions) -> Result<()> {
        write_slice(self, writer, opts)
    }
}

impl<T: Encode, const N: usize> Encode for [T; N] {
    fn encode(&self, writer: &mut BinWriter<'_>, opts: &EncodeOptions) -> Result<()> {
        write_slice(self, writer, opts)
    }
}

// --- Sets (countable, element-addable) ---
impl<T: Encode + Eq + std::hash::Hash> Encode for HashSet<T> {
    fn encode(&self, writer: &mut BinWriter<'_>, opts: &EncodeOptions) -> Result<()> {
        write_counted(self.iter(), self.len(), writer, opts)
    }
}

impl<T: Encode + Ord> Encode for BTreeSet<T> {
    fn encode(&self, writer: &mut BinWriter<'_>, opts: &EncodeOptions) -> Result<()> {
        write_counted(self.iter(), self.len(), writer, opts)
    }
}

// --- Maps (dictionary-like wins over their enumerable capability) ---
impl<K: Encode, V: Encode> Encode for HashMap<K, V> {
    fn encode(&self, writer: &mut BinWriter<'_>, opts: &EncodeOptions) -> Result<()> {
        write_map_entries(self.iter(), self.len(), writer, opts)
    }
}

impl<K: Encode, V: Encode> Encode for BTreeMap<K, V> {
    fn encode(&self, writer: &mut BinWriter<'_>, opts: &EncodeOptions) -> Result<()> {
        write_map_entries(self.iter(), self.len(), writer, opts)
    }
}

impl<K: Encode, V: Encode> Encode for IndexMap<K, V> {
    fn encode(&self, writer: &mut BinWriter<'_>, opts: &EncodeOptions) -> Result<()> {
        write_map_entries(self.iter(), self.len(), writer, opts)
    }
}

// --- Reference and smart-pointer forwarding ---
impl<T: Encode + ?Sized> Encode for &T {
    fn encode(&self, writer: &mut BinWriter<'_>, opts: &EncodeOptions) -> Result<()> {
        (**self).encode(writer, opts)
    }

    fn encode_payload(&self, writer: &mut BinWriter<'_>) -> Result<()> {
        (**self).encode_payload(writer)
    }

    fn is_null(&self) -> bool {
        (**self).is_null()
    }
}

impl<T: Encode + ?Sized> Encode for Box<T> {
    fn encode(&self, writer: &mut BinWriter<'_>, opts: &EncodeOptions) -> Result<()> {
        (**self).encode(writer, opts)
    }

    fn encode_payload(&self, writer: &mut BinWriter<'_>) -> Result<()> {
        (**self).encode_payload(writer)
    }

    fn is_null(&self) -> bool {
        (**self).is_null()
    }
}

impl<T: Encode + ?Sized> Encode for Arc<T> {
    fn encode(&self, writer: &mut BinWriter<'_>, opts: &EncodeOptions) -> Result<()> {
        (**self).encode(writer, opts)
    }

    fn encode_payload(&self, writer: &mut BinWriter<'_>) -> Result<()> {
        (**self).encode_payload(writer)
    }

    fn is_null(&self) -> bool {
        (**self).is_null()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_count_is_an_encode_error() {
        // Both the typed and the dynamic sequence writers share this
        // guard; the wire count field is a signed 32-bit value.
        let mut sink = Vec::new();
        let mut writer = BinWriter::new(&mut sink).unwrap();
        assert!(write_count(&mut writer, i32::MAX as usize).is_ok());
        assert!(matches!(
            write_count(&mut writer, i32::MAX as usize + 1),
            Err(CodecError::Encode(_))
        ));
    }
}
