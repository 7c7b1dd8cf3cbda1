//! Discard path: advances the read cursor past a value without
//! materializing it.
//!
//! Used when a stream field or element has no corresponding target (unknown
//! object members, coercion-rejected scalars). Each routine consumes exactly
//! the byte span the corresponding decode would, including nested subtrees;
//! that equivalence is what keeps skip-and-continue from desyncing the
//! stream.

use crate::io::BinReader;
use crate::wire::{EnumerableType, SerializedType};
use crate::{CodecError, Result};

/// Skips one complete tagged value.
pub fn skip_value(reader: &mut BinReader<'_>) -> Result<()> {
    let tag = reader.read_tag()?;
    skip_payload(tag, reader)
}

/// Skips the payload of a value whose tag byte was already consumed.
pub fn skip_payload(tag: SerializedType, reader: &mut BinReader<'_>) -> Result<()> {
    match tag {
        SerializedType::Null => Ok(()),
        SerializedType::Object => {
            while reader.read_marker()? == EnumerableType::HasItem {
                skip_string_payload(reader)?; // member name
                skip_value(reader)?;
            }
            Ok(())
        }
        SerializedType::Dictionary => {
            let count = reader.read_count()?;
            for _ in 0..count {
                skip_value(reader)?; // key
                skip_value(reader)?; // value
            }
            Ok(())
        }
        SerializedType::List => {
            let count = reader.read_count()?;
            for _ in 0..count {
                skip_value(reader)?;
            }
            Ok(())
        }
        SerializedType::HList => {
            let count = reader.read_count()?;
            let element_tag = read_element_tag(reader)?;
            for _ in 0..count {
                skip_scalar_payload(element_tag, reader)?;
            }
            Ok(())
        }
        SerializedType::Enumerable => {
            while reader.read_marker()? == EnumerableType::HasItem {
                skip_value(reader)?;
            }
            Ok(())
        }
        SerializedType::HEnumerable => {
            let element_tag = read_element_tag(reader)?;
            while reader.read_marker()? == EnumerableType::HasItem {
                skip_scalar_payload(element_tag, reader)?;
            }
            Ok(())
        }
        scalar => skip_scalar_payload(scalar, reader),
    }
}

/// Reads and validates the shared element tag of an `HList`/`HEnumerable`
/// body. Container element tags never appear there on a well-formed stream.
pub(crate) fn read_element_tag(reader: &mut BinReader<'_>) -> Result<SerializedType> {
    let tag = reader.read_tag()?;
    if !tag.is_scalar() {
        return Err(CodecError::Decode(format!(
            "Homogeneous sequence with non-scalar element tag {:?}",
            tag
        )));
    }
    Ok(tag)
}

/// Skips the untagged payload of one scalar.
pub(crate) fn skip_scalar_payload(tag: SerializedType, reader: &mut BinReader<'_>) -> Result<()> {
    let fixed = match tag {
        SerializedType::String => return skip_string_payload(reader),
        SerializedType::Char => 2,
        SerializedType::Byte | SerializedType::SByte | SerializedType::Bool => 1,
        SerializedType::UShort | SerializedType::Short => 2,
        SerializedType::UInt | SerializedType::Int | SerializedType::Float => 4,
        SerializedType::ULong
        | SerializedType::Long
        | SerializedType::Double
        | SerializedType::DateTime => 8,
        SerializedType::Decimal | SerializedType::Guid => 16,
        other => {
            return Err(CodecError::Decode(format!(
                "Tag {:?} has no scalar payload to skip",
                other
            )))
        }
    };
    reader.skip_bytes(fixed)
}

fn skip_string_payload(reader: &mut BinReader<'_>) -> Result<()> {
    let count = reader.read_i32()?;
    if count < 0 {
        return Err(CodecError::Decode(format!(
            "Negative string length: {}",
            count
        )));
    }
    reader.skip_bytes(count as usize * 2)
}
