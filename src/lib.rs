//! # tagbin
//!
//! A compact, self-describing, type-tagged binary object serialization
//! library for Rust.
//!
//! - Every value on the wire is preceded by a one-byte type tag, so streams
//!   decode without an external schema — into a statically known target type
//!   or into the dynamic [`Value`] model.
//! - Typed decoding is "self-upgrading": an arriving value whose tag safely
//!   widens to the target type is converted (`Byte` → `i32`, `Float` →
//!   `f64`, ...); one with no safe conversion is discarded and the target
//!   keeps its default. Unknown object fields are skipped byte-exactly.
//!   This is deliberate format-evolution tolerance, not an error path.
//! - Homogeneous collections of scalars share a single element tag
//!   (`HList`/`HEnumerable`) instead of tagging every element.
//! - Object member discovery is host-provided through the [`Reflect`] /
//!   [`DecodeObject`] seam; the [`reflect_object!`] and [`wire_enum!`]
//!   macros cover manual registration for ordinary structs and C-like
//!   enums.
//!
//! ## Example
//!
//! ```rust
//! use tagbin::{decode, encode_to_vec, reflect_object, DecodeOptions, EncodeOptions};
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Book {
//!     id: u32,
//!     title: String,
//! }
//! reflect_object!(Book { id => "Id", title => "Title" });
//!
//! let book = Book { id: 10, title: "Blah blah".to_string() };
//! let bytes = encode_to_vec(&book, &EncodeOptions::default()).unwrap();
//! let back: Book = decode(&mut &bytes[..], &DecodeOptions::default()).unwrap();
//! assert_eq!(back, book);
//! ```

pub mod dec128;
pub mod decode;
pub mod encode;
pub mod io;
pub mod reflect;
pub mod skip;
pub mod value;
pub mod wire;

use std::io::{Read, Write};

pub use crate::decode::Decode;
pub use crate::encode::Encode;
pub use crate::reflect::{DecodeObject, Member, Reflect};
pub use crate::value::Value;
pub use crate::wire::{EnumerableType, SerializedType};

use crate::io::{BinReader, BinWriter};

/// Capacity clamp for count-prefixed sequences: pre-allocation never trusts
/// a claimed count beyond this many elements; excess grows incrementally.
pub const LIST_CAPACITY: usize = 65536;

/// Errors that can occur during encoding or decoding operations.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The value could not be encoded (e.g., a `char` outside the Basic
    /// Multilingual Plane, which has no single-code-unit representation).
    #[error("Encode error: {0}")]
    Encode(String),
    /// The stream is structurally malformed (bad count, marker, string
    /// payload, or Decimal128 domain). Always fatal to the decode call.
    #[error("Decode error: {0}")]
    Decode(String),
    /// The source ran out of bytes mid-value. Never padded with zeros.
    #[error("Unexpected end of stream")]
    EndOfStream,
    /// A tag byte outside the known `SerializedType` set (stream corruption).
    #[error("Unknown type tag: {0}")]
    UnknownTag(u8),
    /// The channel cannot operate on a big-endian host.
    #[error("Big-endian hosts are not supported")]
    BigEndianHost,
    /// Sink/source failure; also how an aborted underlying stream surfaces.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The result type used throughout this crate.
pub type Result<T> = std::result::Result<T, CodecError>;

/// Encode-time options.
#[derive(Debug, Clone, Default)]
pub struct EncodeOptions {
    /// When true, object members whose value is null are omitted entirely
    /// instead of being written as explicit `Null`-tagged values. The
    /// default preserves nulls so a decoder can distinguish "absent" from
    /// "present-but-null".
    pub skip_null_values: bool,
}

/// Decode-time options.
#[derive(Debug, Clone)]
pub struct DecodeOptions {
    /// Pre-allocation clamp for count-prefixed sequences.
    pub list_capacity: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        DecodeOptions {
            list_capacity: LIST_CAPACITY,
        }
    }
}

/// Encodes one value as a complete tagged stream into the given sink.
///
/// The buffered channel is flushed and closed before returning.
///
/// # Errors
/// Returns [`CodecError`] if the value cannot be encoded or the sink fails.
pub fn encode<T: Encode + ?Sized>(
    value: &T,
    sink: &mut dyn Write,
    opts: &EncodeOptions,
) -> Result<()> {
    let mut writer = BinWriter::new(sink)?;
    value.encode(&mut writer, opts)?;
    writer.close()
}

/// Encodes one value into a freshly allocated byte vector.
///
/// # Example
/// ```rust
/// use tagbin::{encode_to_vec, EncodeOptions, SerializedType};
///
/// let bytes = encode_to_vec(&42i32, &EncodeOptions::default()).unwrap();
/// assert_eq!(bytes[0], SerializedType::Int as u8);
/// assert_eq!(&bytes[1..], &42i32.to_le_bytes());
/// ```
pub fn encode_to_vec<T: Encode + ?Sized>(value: &T, opts: &EncodeOptions) -> Result<Vec<u8>> {
    let mut sink = Vec::new();
    encode(value, &mut sink, opts)?;
    Ok(sink)
}

/// Decodes one value from the source into a statically known target type.
///
/// An arriving value with no safe conversion to `T` is discarded and the
/// target's default is returned; callers must not assume a successful
/// decode implies every field was present and well-typed. Only
/// [`decode_value`] guarantees full fidelity to what was on the wire.
///
/// # Errors
/// Returns [`CodecError`] on truncation, unknown tags, or a malformed
/// stream — never on a mere type mismatch.
pub fn decode<T: Decode + Default>(source: &mut dyn Read, opts: &DecodeOptions) -> Result<T> {
    let mut reader = BinReader::new(source)?;
    Ok(T::decode(&mut reader, opts)?.unwrap_or_default())
}

/// Decodes one value from the source into the dynamic [`Value`] model.
///
/// This path has no target type to reconcile against: it reproduces
/// whatever was on the wire and fails only on truncation or corruption.
pub fn decode_value(source: &mut dyn Read) -> Result<Value> {
    let mut reader = BinReader::new(source)?;
    let opts = DecodeOptions::default();
    let tag = reader.read_tag()?;
    Ok(Value::decode_from(tag, &mut reader, &opts)?.unwrap_or(Value::Null))
}
