//! Host-type registration seam: how plain structs and C-like enums join
//! the wire format without a schema.
//!
//! Encoding an object walks the members reported by [`Reflect`]; decoding
//! one drives members through [`DecodeObject`], which activates an instance
//! (optionally from the `"@type"` discriminator) and resolves each arriving
//! member by name. Members the target does not know are skipped
//! byte-exactly, and members the stream does not carry keep whatever the
//! activator put there — both directions of schema drift are tolerated.
//!
//! For ordinary structs and enums the [`reflect_object!`] and
//! [`wire_enum!`] macros generate all four impls; hand-written impls are
//! for types that need a non-`Default` activator or conditional member
//! sets.

use crate::encode::Encode;
use crate::io::BinReader;
use crate::skip::{skip_payload, skip_value};
use crate::wire::{EnumerableType, SerializedType};
use crate::{DecodeOptions, Result};

/// Reserved member name carrying the type discriminator. Written first when
/// a type provides one; recognized only in first position when decoding.
pub const TYPE_KEY: &str = "@type";

/// One gettable member of a reflected object.
pub struct Member<'a> {
    pub name: &'a str,
    pub value: &'a dyn Encode,
}

/// Encode-side member discovery for plain objects.
pub trait Reflect {
    /// Type discriminator written as the leading `"@type"` member, for
    /// hierarchies where the decoder picks a concrete type at runtime.
    fn discriminator(&self) -> Option<&str> {
        None
    }

    /// The object's members, in wire order.
    fn members(&self) -> Vec<Member<'_>>;
}

/// Decode-side member resolution for plain objects.
pub trait DecodeObject: Sized {
    /// Produces the instance members will be applied to. Called with the
    /// stream's discriminator when the first member is `"@type"`, with
    /// `None` otherwise.
    fn activate(discriminator: Option<&str>, opts: &DecodeOptions) -> Result<Self>;

    /// Resolves one arriving member by name, consuming its tagged value
    /// from the reader. Returns `false` without consuming anything when the
    /// name is unknown; the caller then discards the value byte-exactly.
    fn set_member(
        &mut self,
        name: &str,
        reader: &mut BinReader<'_>,
        opts: &DecodeOptions,
    ) -> Result<bool>;
}

/// Decodes an `Object` body (tag already consumed) into `T`.
///
/// A leading `"@type"` member is consumed here and fed to the activator
/// rather than resolved as an ordinary member; anywhere else in the stream
/// the name falls through to `set_member` like any other.
pub fn read_object<T: DecodeObject>(reader: &mut BinReader<'_>, opts: &DecodeOptions) -> Result<T> {
    let mut target: Option<T> = None;
    let mut first = true;
    while reader.read_marker()? == EnumerableType::HasItem {
        let name = reader.read_string()?;
        if first && name == TYPE_KEY {
            first = false;
            let tag = reader.read_tag()?;
            let discriminator = match tag {
                SerializedType::String => Some(reader.read_string()?),
                other => {
                    skip_payload(other, reader)?;
                    None
                }
            };
            target = Some(T::activate(discriminator.as_deref(), opts)?);
            continue;
        }
        first = false;
        if target.is_none() {
            target = Some(T::activate(None, opts)?);
        }
        if let Some(obj) = target.as_mut() {
            if !obj.set_member(&name, reader, opts)? {
                skip_value(reader)?;
            }
        }
    }
    match target {
        Some(obj) => Ok(obj),
        // Empty object on the wire.
        None => T::activate(None, opts),
    }
}

/// Registers a plain struct with the wire format.
///
/// Generates [`Reflect`], [`Encode`], [`DecodeObject`], and
/// [`crate::Decode`] for a `Default` struct from a field-to-wire-name
/// table. The optional `as "Name"` form also writes a `"@type"`
/// discriminator.
///
/// ```rust
/// use tagbin::reflect_object;
///
/// #[derive(Debug, Default, PartialEq)]
/// struct Point {
///     x: i32,
///     y: i32,
/// }
/// reflect_object!(Point { x => "X", y => "Y" });
/// ```
#[macro_export]
macro_rules! reflect_object {
    ($ty:ty { $($field:ident => $name:literal),+ $(,)? }) => {
        $crate::reflect_object!(@impls $ty, (None), { $($field => $name),+ });
    };
    ($ty:ty as $disc:literal { $($field:ident => $name:literal),+ $(,)? }) => {
        $crate::reflect_object!(@impls $ty, (Some($disc)), { $($field => $name),+ });
    };
    (@impls $ty:ty, ($($disc:tt)+), { $($field:ident => $name:literal),+ }) => {
        impl $crate::Reflect for $ty {
            fn discriminator(&self) -> Option<&str> {
                $($disc)+
            }

            fn members(&self) -> Vec<$crate::Member<'_>> {
                vec![$($crate::Member { name: $name, value: &self.$field }),+]
            }
        }

        impl $crate::Encode for $ty {
            fn encode(
                &self,
                writer: &mut $crate::io::BinWriter<'_>,
                opts: &$crate::EncodeOptions,
            ) -> $crate::Result<()> {
                $crate::encode::write_object(self, writer, opts)
            }
        }

        impl $crate::DecodeObject for $ty {
            fn activate(
                _discriminator: Option<&str>,
                _opts: &$crate::DecodeOptions,
            ) -> $crate::Result<Self> {
                Ok(<$ty as Default>::default())
            }

            fn set_member(
                &mut self,
                name: &str,
                reader: &mut $crate::io::BinReader<'_>,
                opts: &$crate::DecodeOptions,
            ) -> $crate::Result<bool> {
                match name {
                    $(
                        $name => {
                            if let Some(value) = $crate::Decode::decode(reader, opts)? {
                                self.$field = value;
                            }
                            Ok(true)
                        }
                    )+
                    _ => Ok(false),
                }
            }
        }

        impl $crate::Decode for $ty {
            fn decode_from(
                tag: $crate::SerializedType,
                reader: &mut $crate::io::BinReader<'_>,
                opts: &$crate::DecodeOptions,
            ) -> $crate::Result<Option<Self>> {
                match tag {
                    $crate::SerializedType::Object => {
                        Ok(Some($crate::reflect::read_object(reader, opts)?))
                    }
                    $crate::SerializedType::Null => Ok(None),
                    other => {
                        $crate::skip::skip_payload(other, reader)?;
                        Ok(None)
                    }
                }
            }
        }
    };
}

/// Registers a C-like enum with the wire format through its integer
/// representation.
///
/// The enum travels as its declared discriminant in the named repr type;
/// decoding accepts any tag the repr type itself would accept, and an
/// unmapped discriminant is discarded like any other unconvertible value.
///
/// ```rust
/// use tagbin::wire_enum;
///
/// #[derive(Debug, Clone, Copy, Default, PartialEq)]
/// #[repr(u8)]
/// enum Color {
///     #[default]
///     Red = 1,
///     Green = 2,
///     Blue = 4,
/// }
/// wire_enum!(Color: u8 { Red, Green, Blue });
/// ```
#[macro_export]
macro_rules! wire_enum {
    ($ty:ty : $repr:ty { $($variant:ident),+ $(,)? }) => {
        impl $crate::Encode for $ty {
            fn scalar_tag() -> Option<$crate::SerializedType> {
                <$repr as $crate::Encode>::scalar_tag()
            }

            fn encode(
                &self,
                writer: &mut $crate::io::BinWriter<'_>,
                opts: &$crate::EncodeOptions,
            ) -> $crate::Result<()> {
                (*self as $repr).encode(writer, opts)
            }

            fn encode_payload(
                &self,
                writer: &mut $crate::io::BinWriter<'_>,
            ) -> $crate::Result<()> {
                (*self as $repr).encode_payload(writer)
            }
        }

        impl $crate::Decode for $ty {
            fn scalar_tag() -> Option<$crate::SerializedType> {
                <$repr as $crate::Decode>::scalar_tag()
            }

            fn decode_from(
                tag: $crate::SerializedType,
                reader: &mut $crate::io::BinReader<'_>,
                opts: &$crate::DecodeOptions,
            ) -> $crate::Result<Option<Self>> {
                let Some(raw) = <$repr as $crate::Decode>::decode_from(tag, reader, opts)? else {
                    return Ok(None);
                };
                $(
                    if raw == <$ty>::$variant as $repr {
                        return Ok(Some(<$ty>::$variant));
                    }
                )+
                Ok(None)
            }
        }
    };
}
