//! Typed decoder: type-directed reading with self-upgrading coercion.
//!
//! Every scalar target accepts any arriving tag and either widens it
//! (value-domain-safe conversions only) or discards the value, consuming its
//! exact byte span and reporting `Ok(None)` so the caller substitutes the
//! target's default. The accepted-arrival table:
//!
//! | target   | accepted arriving tags                            |
//! |----------|---------------------------------------------------|
//! | `u8`     | Byte                                              |
//! | `i8`     | SByte                                             |
//! | `u16`    | Byte, UShort                                      |
//! | `i16`    | Byte, SByte, Short                                |
//! | `u32`    | Byte, UShort, UInt                                |
//! | `i32`    | Byte, SByte, UShort, Short, Int                   |
//! | `u64`    | Byte, UShort, UInt, ULong                         |
//! | `i64`    | Byte, SByte, UShort, Short, UInt, Int, Long       |
//! | `f32`    | Byte, SByte, UShort, Short, Float                 |
//! | `f64`    | Byte, SByte, UShort, Short, UInt, Int, Float, Double |
//! | `Decimal`| all integer tags, Decimal                         |
//! | `bool`   | Bool                                              |
//! | `char`   | Char, single-character String                     |
//! | `String` | String, Char                                      |
//! | `DateTime` | DateTime                                        |
//! | `Uuid`   | Guid                                              |
//!
//! Containers self-upgrade at the shape level: sequences accept any of
//! List/HList/Enumerable/HEnumerable, maps accept Dictionary (and Object
//! when the key type is exactly `String`). Mismatched map entries are
//! skipped individually; their bytes are always fully consumed, so the
//! entry loop resumes exactly at the next entry boundary.

use std::any::{Any, TypeId};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::io::BinReader;
use crate::skip::{read_element_tag, skip_payload};
use crate::wire::{datetime_from_ticks, EnumerableType, SerializedType};
use crate::{dec128, CodecError, DecodeOptions, Result};

/// Trait for types that can be read from the tagged wire format.
///
/// `Ok(None)` is the discard-and-default channel: the arriving value had no
/// safe conversion to `Self`, and its bytes were consumed. Structural
/// problems (truncation, unknown tags, bad counts) are `Err`.
pub trait Decode: Sized {
    /// Mirror of [`crate::Encode::scalar_tag`] for the decode side.
    fn scalar_tag() -> Option<SerializedType> {
        None
    }

    /// Decodes one value whose tag byte was already consumed.
    fn decode_from(
        tag: SerializedType,
        reader: &mut BinReader<'_>,
        opts: &DecodeOptions,
    ) -> Result<Option<Self>>;

    /// Reads one tag byte and decodes the value it announces.
    fn decode(reader: &mut BinReader<'_>, opts: &DecodeOptions) -> Result<Option<Self>> {
        let tag = reader.read_tag()?;
        Self::decode_from(tag, reader, opts)
    }
}

// --- Scalar payload readers (shared with the dynamic decoder) ---

pub(crate) fn read_char_payload(reader: &mut BinReader<'_>) -> Result<char> {
    let unit = reader.read_u16()?;
    char::from_u32(unit as u32).ok_or_else(|| {
        CodecError::Decode(format!("Lone surrogate code unit 0x{:04X} in char", unit))
    })
}

pub(crate) fn read_datetime_payload(reader: &mut BinReader<'_>) -> Result<DateTime<Utc>> {
    let ticks = reader.read_i64()?;
    datetime_from_ticks(ticks)
        .ok_or_else(|| CodecError::Decode(format!("DateTime ticks out of range: {}", ticks)))
}

pub(crate) fn read_decimal_payload(reader: &mut BinReader<'_>) -> Result<Decimal> {
    let lo = reader.read_u64()?;
    let hi = reader.read_u64()?;
    dec128::from_bits(lo, hi).ok_or_else(|| {
        CodecError::Decode(format!(
            "Decimal128 value outside the decimal domain: lo=0x{:016X} hi=0x{:016X}",
            lo, hi
        ))
    })
}

pub(crate) fn read_guid_payload(reader: &mut BinReader<'_>) -> Result<Uuid> {
    let mut bytes = [0u8; 16];
    reader.read_bytes_into(&mut bytes)?;
    Ok(Uuid::from_bytes(bytes))
}

// --- Numeric targets ---
/// One impl per target; the accepted arms are the widening matrix above.
macro_rules! numeric_decode {
    ($ty:ty, $own:ident, { $($src:ident => $read:ident),+ $(,)? }) => {
        impl Decode for $ty {
            fn scalar_tag() -> Option<SerializedType> {
                Some(SerializedType::$own)
            }

            fn decode_from(
                tag: SerializedType,
                reader: &mut BinReader<'_>,
                _opts: &DecodeOptions,
            ) -> Result<Option<Self>> {
                Ok(match tag {
                    $(SerializedType::$src => Some(reader.$read()? as $ty),)+
                    other => {
                        skip_payload(other, reader)?;
                        None
                    }
                })
            }
        }
    };
}

numeric_decode!(u8, Byte, { Byte => read_u8 });
numeric_decode!(i8, SByte, { SByte => read_i8 });
numeric_decode!(u16, UShort, { Byte => read_u8, UShort => read_u16 });
numeric_decode!(i16, Short, { Byte => read_u8, SByte => read_i8, Short => read_i16 });
numeric_decode!(u32, UInt, { Byte => read_u8, UShort => read_u16, UInt => read_u32 });
numeric_decode!(i32, Int, {
    Byte => read_u8,
    SByte => read_i8,
    UShort => read_u16,
    Short => read_i16,
    Int => read_i32,
});
numeric_decode!(u64, ULong, {
    Byte => read_u8,
    UShort => read_u16,
    UInt => read_u32,
    ULong => read_u64,
});
numeric_decode!(i64, Long, {
    Byte => read_u8,
    SByte => read_i8,
    UShort => read_u16,
    Short => read_i16,
    UInt => read_u32,
    Int => read_i32,
    Long => read_i64,
});
numeric_decode!(f32, Float, {
    Byte => read_u8,
    SByte => read_i8,
    UShort => read_u16,
    Short => read_i16,
    Float => read_f32,
});
numeric_decode!(f64, Double, {
    Byte => read_u8,
    SByte => read_i8,
    UShort => read_u16,
    Short => read_i16,
    UInt => read_u32,
    Int => read_i32,
    Float => read_f32,
    Double => read_f64,
});

impl Decode for bool {
    fn scalar_tag() -> Option<SerializedType> {
        Some(SerializedType::Bool)
    }

    fn decode_from(
        tag: SerializedType,
        reader: &mut BinReader<'_>,
        _opts: &DecodeOptions,
    ) -> Result<Option<Self>> {
        match tag {
            SerializedType::Bool => Ok(Some(reader.read_u8()? != 0)),
            other => {
                skip_payload(other, reader)?;
                Ok(None)
            }
        }
    }
}

/// Every integer tag widens into `Decimal` (the 96-bit significand holds
/// the full `u64`/`i64` domains). Binary floats do not: their fractions are
/// not decimal-exact, so Float/Double arrivals are discarded.
impl Decode for Decimal {
    fn scalar_tag() -> Option<SerializedType> {
        Some(SerializedType::Decimal)
    }

    fn decode_from(
        tag: SerializedType,
        reader: &mut BinReader<'_>,
        _opts: &DecodeOptions,
    ) -> Result<Option<Self>> {
        Ok(match tag {
            SerializedType::Byte => Some(Decimal::from(reader.read_u8()?)),
            SerializedType::SByte => Some(Decimal::from(reader.read_i8()?)),
            SerializedType::UShort => Some(Decimal::from(reader.read_u16()?)),
            SerializedType::Short => Some(Decimal::from(reader.read_i16()?)),
            SerializedType::UInt => Some(Decimal::from(reader.read_u32()?)),
            SerializedType::Int => Some(Decimal::from(reader.read_i32()?)),
            SerializedType::ULong => Some(Decimal::from(reader.read_u64()?)),
            SerializedType::Long => Some(Decimal::from(reader.read_i64()?)),
            SerializedType::Decimal => Some(read_decimal_payload(reader)?),
            other => {
                skip_payload(other, reader)?;
                None
            }
        })
    }
}

impl Decode for char {
    fn scalar_tag() -> Option<SerializedType> {
        Some(SerializedType::Char)
    }

    fn decode_from(
        tag: SerializedType,
        reader: &mut BinReader<'_>,
        _opts: &DecodeOptions,
    ) -> Result<Option<Self>> {
        match tag {
            SerializedType::Char => Ok(Some(read_char_payload(reader)?)),
            SerializedType::String => {
                // Cross-read: a single-character string is a char.
                let text = reader.read_string()?;
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(Some(c)),
                    _ => Ok(None),
                }
            }
            other => {
                skip_payload(other, reader)?;
                Ok(None)
            }
        }
    }
}

impl Decode for String {
    fn scalar_tag() -> Option<SerializedType> {
        Some(SerializedType::String)
    }

    fn decode_from(
        tag: SerializedType,
        reader: &mut BinReader<'_>,
        _opts: &DecodeOptions,
    ) -> Result<Option<Self>> {
        match tag {
            SerializedType::String => Ok(Some(reader.read_string()?)),
            SerializedType::Char => Ok(Some(read_char_payload(reader)?.to_string())),
            other => {
                skip_payload(other, reader)?;
                Ok(None)
            }
        }
    }
}

impl Decode for DateTime<Utc> {
    fn scalar_tag() -> Option<SerializedType> {
        Some(SerializedType::DateTime)
    }

    fn decode_from(
        tag: SerializedType,
        reader: &mut BinReader<'_>,
        _opts: &DecodeOptions,
    ) -> Result<Option<Self>> {
        match tag {
            SerializedType::DateTime => Ok(Some(read_datetime_payload(reader)?)),
            other => {
                skip_payload(other, reader)?;
                Ok(None)
            }
        }
    }
}

/// Wire bytes are always UTC ticks; decoding to `DateTime<Local>`
/// re-localizes the decoded instant.
impl Decode for DateTime<Local> {
    fn scalar_tag() -> Option<SerializedType> {
        Some(SerializedType::DateTime)
    }

    fn decode_from(
        tag: SerializedType,
        reader: &mut BinReader<'_>,
        opts: &DecodeOptions,
    ) -> Result<Option<Self>> {
        Ok(DateTime::<Utc>::decode_from(tag, reader, opts)?.map(|utc| utc.with_timezone(&Local)))
    }
}

impl Decode for Uuid {
    fn scalar_tag() -> Option<SerializedType> {
        Some(SerializedType::Guid)
    }

    fn decode_from(
        tag: SerializedType,
        reader: &mut BinReader<'_>,
        _opts: &DecodeOptions,
    ) -> Result<Option<Self>> {
        match tag {
            SerializedType::Guid => Ok(Some(read_guid_payload(reader)?)),
            other => {
                skip_payload(other, reader)?;
                Ok(None)
            }
        }
    }
}

// --- Nullability ---
/// `Null` decodes to `Some(None)`; anything else wraps the underlying
/// self-upgrading read, so a mismatch surfaces as `Some(None)` too.
impl<T: Decode> Decode for Option<T> {
    fn decode_from(
        tag: SerializedType,
        reader: &mut BinReader<'_>,
        opts: &DecodeOptions,
    ) -> Result<Option<Self>> {
        match tag {
            SerializedType::Null => Ok(Some(None)),
            other => Ok(Some(T::decode_from(other, reader, opts)?)),
        }
    }
}

// --- Sequences ---
/// Reads any sequence shape into a growable buffer. Element coercion
/// failure yields the element default; count-prefixed shapes pre-allocate
/// against the count clamped to `opts.list_capacity`.
pub(crate) fn read_sequence<T: Decode + Default>(
    tag: SerializedType,
    reader: &mut BinReader<'_>,
    opts: &DecodeOptions,
) -> Result<Option<Vec<T>>> {
    match tag {
        SerializedType::List => {
            let count = reader.read_count()?;
            let mut items = Vec::with_capacity(count.min(opts.list_capacity));
            for _ in 0..count {
                items.push(T::decode(reader, opts)?.unwrap_or_default());
            }
            Ok(Some(items))
        }
        SerializedType::HList => {
            let count = reader.read_count()?;
            let element_tag = read_element_tag(reader)?;
            let mut items = Vec::with_capacity(count.min(opts.list_capacity));
            for _ in 0..count {
                items.push(T::decode_from(element_tag, reader, opts)?.unwrap_or_default());
            }
            Ok(Some(items))
        }
        SerializedType::Enumerable => {
            let mut items = Vec::new();
            while reader.read_marker()? == EnumerableType::HasItem {
                items.push(T::decode(reader, opts)?.unwrap_or_default());
            }
            Ok(Some(items))
        }
        SerializedType::HEnumerable => {
            let element_tag = read_element_tag(reader)?;
            let mut items = Vec::new();
            while reader.read_marker()? == EnumerableType::HasItem {
                items.push(T::decode_from(element_tag, reader, opts)?.unwrap_or_default());
            }
            Ok(Some(items))
        }
        other => {
            skip_payload(other, reader)?;
            Ok(None)
        }
    }
}

impl<T: Decode + Default> Decode for Vec<T> {
    fn decode_from(
        tag: SerializedType,
        reader: &mut BinReader<'_>,
        opts: &DecodeOptions,
    ) -> Result<Option<Self>> {
        read_sequence(tag, reader, opts)
    }
}

impl<T: Decode + Default + Eq + std::hash::Hash> Decode for HashSet<T> {
    fn decode_from(
        tag: SerializedType,
        reader: &mut BinReader<'_>,
        opts: &DecodeOptions,
    ) -> Result<Option<Self>> {
        Ok(read_sequence::<T>(tag, reader, opts)?.map(|items| items.into_iter().collect()))
    }
}

impl<T: Decode + Default + Ord> Decode for BTreeSet<T> {
    fn decode_from(
        tag: SerializedType,
        reader: &mut BinReader<'_>,
        opts: &DecodeOptions,
    ) -> Result<Option<Self>> {
        Ok(read_sequence::<T>(tag, reader, opts)?.map(|items| items.into_iter().collect()))
    }
}

/// Fixed arrays fill through a growable intermediate: excess wire elements
/// are dropped, missing ones default.
impl<T: Decode + Default, const N: usize> Decode for [T; N] {
    fn decode_from(
        tag: SerializedType,
        reader: &mut BinReader<'_>,
        opts: &DecodeOptions,
    ) -> Result<Option<Self>> {
        let Some(mut items) = read_sequence::<T>(tag, reader, opts)? else {
            return Ok(None);
        };
        items.truncate(N);
        while items.len() < N {
            items.push(T::default());
        }
        Ok(items.try_into().ok())
    }
}

// --- Dictionaries ---
/// Reads a dictionary-shaped value into ordered (key, value) pairs.
///
/// An entry whose key or value fails coercion is omitted; both spans are
/// consumed regardless, so the loop resumes at the next entry boundary.
/// When `K` is exactly `String`, an arriving `Object` member stream is
/// accepted as a string-keyed dictionary.
pub(crate) fn read_dictionary<K, V>(
    tag: SerializedType,
    reader: &mut BinReader<'_>,
    opts: &DecodeOptions,
) -> Result<Option<Vec<(K, V)>>>
where
    K: Decode + 'static,
    V: Decode,
{
    match tag {
        SerializedType::Dictionary => {
            let count = reader.read_count()?;
            let mut entries = Vec::with_capacity(count.min(opts.list_capacity));
            for _ in 0..count {
                let key = K::decode(reader, opts)?;
                let value = V::decode(reader, opts)?;
                if let (Some(key), Some(value)) = (key, value) {
                    entries.push((key, value));
                }
            }
            Ok(Some(entries))
        }
        SerializedType::Object if TypeId::of::<K>() == TypeId::of::<String>() => {
            let mut entries = Vec::new();
            while reader.read_marker()? == EnumerableType::HasItem {
                let name = reader.read_string()?;
                let Some(value) = V::decode(reader, opts)? else {
                    continue;
                };
                // The TypeId guard above makes this downcast infallible.
                if let Ok(key) = (Box::new(name) as Box<dyn Any>).downcast::<K>() {
                    entries.push((*key, value));
                }
            }
            Ok(Some(entries))
        }
        other => {
            skip_payload(other, reader)?;
            Ok(None)
        }
    }
}

impl<K, V> Decode for HashMap<K, V>
where
    K: Decode + Eq + std::hash::Hash + 'static,
    V: Decode,
{
    fn decode_from(
        tag: SerializedType,
        reader: &mut BinReader<'_>,
        opts: &DecodeOptions,
    ) -> Result<Option<Self>> {
        Ok(read_dictionary(tag, reader, opts)?.map(|entries| entries.into_iter().collect()))
    }
}

impl<K, V> Decode for BTreeMap<K, V>
where
    K: Decode + Ord + 'static,
    V: Decode,
{
    fn decode_from(
        tag: SerializedType,
        reader: &mut BinReader<'_>,
        opts: &DecodeOptions,
    ) -> Result<Option<Self>> {
        Ok(read_dictionary(tag, reader, opts)?.map(|entries| entries.into_iter().collect()))
    }
}

impl<K, V> Decode for IndexMap<K, V>
where
    K: Decode + Eq + std::hash::Hash + 'static,
    V: Decode,
{
    fn decode_from(
        tag: SerializedType,
        reader: &mut BinReader<'_>,
        opts: &DecodeOptions,
    ) -> Result<Option<Self>> {
        Ok(read_dictionary(tag, reader, opts)?.map(|entries| entries.into_iter().collect()))
    }
}

// --- Smart-pointer forwarding ---
impl<T: Decode> Decode for Box<T> {
    fn decode_from(
        tag: SerializedType,
        reader: &mut BinReader<'_>,
        opts: &DecodeOptions,
    ) -> Result<Option<Self>> {
        Ok(T::decode_from(tag, reader, opts)?.map(Box::new))
    }
}

impl<T: Decode> Decode for Arc<T> {
    fn decode_from(
        tag: SerializedType,
        reader: &mut BinReader<'_>,
        opts: &DecodeOptions,
    ) -> Result<Option<Self>> {
        Ok(T::decode_from(tag, reader, opts)?.map(Arc::new))
    }
}
