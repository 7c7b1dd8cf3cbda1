//! Wire-format tag enumerations.
//!
//! Every encoded value is preceded by exactly one [`SerializedType`] byte.
//! Homogeneous sequence bodies (`HList`/`HEnumerable`) are the only
//! exception: their elements share one element tag written once for the
//! whole sequence. Marker-delimited sequences (object member streams,
//! enumerables) interleave [`EnumerableType`] continuation bytes.
//!
//! Tags are stable and part of the wire format.

use chrono::{DateTime, Utc};

use crate::CodecError;

/// 100 ns ticks per second.
const TICKS_PER_SECOND: i64 = 10_000_000;

/// Tick count of the Unix epoch relative to 0001-01-01T00:00:00Z.
const UNIX_EPOCH_TICKS: i64 = 621_355_968_000_000_000;

/// Converts a UTC timestamp to the wire representation: signed 64-bit tick
/// count (100 ns units) since 0001-01-01T00:00:00Z. Sub-tick precision
/// truncates. `None` when the instant lies outside the i64 tick range
/// (chrono's year domain is wider than the tick domain).
pub fn datetime_to_ticks(value: &DateTime<Utc>) -> Option<i64> {
    let seconds = value.timestamp().checked_mul(TICKS_PER_SECOND)?;
    let sub_ticks = (value.timestamp_subsec_nanos() as i64) / 100;
    UNIX_EPOCH_TICKS
        .checked_add(seconds)?
        .checked_add(sub_ticks)
}

/// Reconstructs a UTC timestamp from wire ticks. `None` when the tick
/// count has no representable instant (the wire can carry any i64).
pub fn datetime_from_ticks(ticks: i64) -> Option<DateTime<Utc>> {
    let unix_ticks = ticks.checked_sub(UNIX_EPOCH_TICKS)?;
    let seconds = unix_ticks.div_euclid(TICKS_PER_SECOND);
    let nanos = unix_ticks.rem_euclid(TICKS_PER_SECOND).checked_mul(100)? as u32;
    DateTime::from_timestamp(seconds, nanos)
}

/// One-byte type tag identifying the shape of the value that follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SerializedType {
    Null = 0,
    Object = 1,
    Dictionary = 2,
    List = 3,
    /// Homogeneous list: one shared element tag, untagged payloads.
    HList = 4,
    Enumerable = 5,
    /// Homogeneous enumerable: shared element tag, marker-delimited payloads.
    HEnumerable = 6,
    String = 7,
    Char = 8,
    Byte = 9,
    SByte = 10,
    UShort = 11,
    Short = 12,
    UInt = 13,
    Int = 14,
    ULong = 15,
    Long = 16,
    Float = 17,
    Double = 18,
    Decimal = 19,
    Bool = 20,
    DateTime = 21,
    Guid = 22,
}

impl SerializedType {
    /// Returns true for the flat scalar tags — the only tags permitted as
    /// the shared element type of an `HList`/`HEnumerable` body.
    pub fn is_scalar(self) -> bool {
        (self as u8) >= SerializedType::String as u8
    }
}

impl TryFrom<u8> for SerializedType {
    type Error = CodecError;

    fn try_from(byte: u8) -> Result<Self, CodecError> {
        use SerializedType::*;
        Ok(match byte {
            0 => Null,
            1 => Object,
            2 => Dictionary,
            3 => List,
            4 => HList,
            5 => Enumerable,
            6 => HEnumerable,
            7 => String,
            8 => Char,
            9 => Byte,
            10 => SByte,
            11 => UShort,
            12 => Short,
            13 => UInt,
            14 => Int,
            15 => ULong,
            16 => Long,
            17 => Float,
            18 => Double,
            19 => Decimal,
            20 => Bool,
            21 => DateTime,
            22 => Guid,
            other => return Err(CodecError::UnknownTag(other)),
        })
    }
}

/// Per-element continuation marker for length-unknown sequences.
///
/// A marker-delimited sequence is `HasItem` + payload, repeated, terminated
/// by exactly one `End`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EnumerableType {
    End = 0,
    HasItem = 1,
}

impl TryFrom<u8> for EnumerableType {
    type Error = CodecError;

    fn try_from(byte: u8) -> Result<Self, CodecError> {
        match byte {
            0 => Ok(EnumerableType::End),
            1 => Ok(EnumerableType::HasItem),
            other => Err(CodecError::Decode(format!(
                "Expected continuation marker (0 or 1), got {}",
                other
            ))),
        }
    }
}
