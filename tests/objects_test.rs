//! Object encoding through the reflection seam: member streams, schema
//! drift in both directions, discriminators, and enum registration.

use tagbin::io::{BinReader, BinWriter};
use tagbin::reflect::read_object;
use tagbin::{
    decode, decode_value, encode_to_vec, reflect_object, wire_enum, DecodeObject, DecodeOptions,
    EncodeOptions, Member, Reflect, SerializedType, Value,
};

#[derive(Debug, Default, PartialEq)]
struct Book {
    id: u32,
    title: String,
    pages: Option<i32>,
}
reflect_object!(Book { id => "Id", title => "Title", pages => "Pages" });

#[derive(Debug, Default, PartialEq)]
struct BookV2 {
    id: u32,
    title: String,
    pages: Option<i32>,
    isbn: String,
    tags: Vec<String>,
}
reflect_object!(BookV2 {
    id => "Id",
    title => "Title",
    pages => "Pages",
    isbn => "Isbn",
    tags => "Tags",
});

#[derive(Debug, Default, PartialEq)]
struct Shelf {
    name: String,
    top: Book,
}
reflect_object!(Shelf { name => "Name", top => "Top" });

#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[repr(u8)]
enum Color {
    #[default]
    Red = 1,
    Green = 2,
    Blue = 4,
}
wire_enum!(Color: u8 { Red, Green, Blue });

fn sample_book() -> Book {
    Book {
        id: 7,
        title: "Systems".to_string(),
        pages: Some(320),
    }
}

#[test]
fn test_object_roundtrip() {
    let book = sample_book();
    let bytes = encode_to_vec(&book, &EncodeOptions::default()).unwrap();
    assert_eq!(bytes[0], SerializedType::Object as u8);
    let back: Book = decode(&mut &bytes[..], &DecodeOptions::default()).unwrap();
    assert_eq!(back, book);
}

#[test]
fn test_nested_object_roundtrip() {
    let shelf = Shelf {
        name: "A3".to_string(),
        top: sample_book(),
    };
    let bytes = encode_to_vec(&shelf, &EncodeOptions::default()).unwrap();
    let back: Shelf = decode(&mut &bytes[..], &DecodeOptions::default()).unwrap();
    assert_eq!(back, shelf);
}

#[test]
fn test_unknown_members_are_skipped() {
    // A newer writer, an older reader: extra members are discarded
    // byte-exactly and the known ones land.
    let v2 = BookV2 {
        id: 9,
        title: "Newer".to_string(),
        pages: None,
        isbn: "978-1".to_string(),
        tags: vec!["a".to_string(), "b".to_string()],
    };
    let mut bytes = encode_to_vec(&v2, &EncodeOptions::default()).unwrap();
    // A trailing value proves the object consumed exactly its own span.
    bytes.extend(encode_to_vec(&11i32, &EncodeOptions::default()).unwrap());

    let mut source: &[u8] = &bytes;
    let mut reader = BinReader::new(&mut source).unwrap();
    let opts = DecodeOptions::default();
    let old: Book = tagbin::Decode::decode(&mut reader, &opts).unwrap().unwrap();
    assert_eq!(
        old,
        Book {
            id: 9,
            title: "Newer".to_string(),
            pages: None,
        }
    );
    assert_eq!(
        <i32 as tagbin::Decode>::decode(&mut reader, &opts).unwrap(),
        Some(11)
    );
}

#[test]
fn test_missing_members_keep_defaults() {
    // An older writer, a newer reader: absent members stay at their
    // activated defaults.
    let old = sample_book();
    let bytes = encode_to_vec(&old, &EncodeOptions::default()).unwrap();
    let new: BookV2 = decode(&mut &bytes[..], &DecodeOptions::default()).unwrap();
    assert_eq!(new.id, 7);
    assert_eq!(new.title, "Systems");
    assert_eq!(new.pages, Some(320));
    assert_eq!(new.isbn, "");
    assert!(new.tags.is_empty());
}

#[test]
fn test_member_type_drift_widens_or_defaults() {
    // Same member names, different member types.
    #[derive(Debug, Default, PartialEq)]
    struct Wide {
        id: i64,
        title: i32,
        pages: Option<i32>,
    }
    reflect_object!(Wide { id => "Id", title => "Title", pages => "Pages" });

    let bytes = encode_to_vec(&sample_book(), &EncodeOptions::default()).unwrap();
    let wide: Wide = decode(&mut &bytes[..], &DecodeOptions::default()).unwrap();
    assert_eq!(wide.id, 7); // UInt widens into i64
    assert_eq!(wide.title, 0); // String into i32 discards
    assert_eq!(wide.pages, Some(320));
}

#[test]
fn test_skip_null_values() {
    let book = Book {
        id: 1,
        title: "T".to_string(),
        pages: None,
    };
    let keep = encode_to_vec(&book, &EncodeOptions::default()).unwrap();
    let skip = encode_to_vec(
        &book,
        &EncodeOptions {
            skip_null_values: true,
        },
    )
    .unwrap();
    assert!(skip.len() < keep.len());

    let kept = decode_value(&mut &keep[..]).unwrap();
    assert_eq!(kept.get("Pages"), Some(&Value::Null));
    let skipped = decode_value(&mut &skip[..]).unwrap();
    assert_eq!(skipped.get("Pages"), None);

    // Either way the typed decode agrees.
    let back: Book = decode(&mut &skip[..], &DecodeOptions::default()).unwrap();
    assert_eq!(back, book);
}

#[test]
fn test_object_decodes_as_string_keyed_map() {
    use std::collections::HashMap;
    let bytes = encode_to_vec(&sample_book(), &EncodeOptions::default()).unwrap();
    let map: HashMap<String, Value> = decode(&mut &bytes[..], &DecodeOptions::default()).unwrap();
    assert_eq!(map["Id"], Value::U32(7));
    assert_eq!(map["Title"], Value::Str("Systems".to_string()));
}

// A polymorphic target with a hand-written activator: the discriminator
// picks the concrete variant before members arrive.
#[derive(Debug, PartialEq)]
enum Vehicle {
    Car { wheels: i32 },
    Boat { draft: f64 },
}

impl Default for Vehicle {
    fn default() -> Self {
        Vehicle::Car { wheels: 0 }
    }
}

impl Reflect for Vehicle {
    fn discriminator(&self) -> Option<&str> {
        Some(match self {
            Vehicle::Car { .. } => "Car",
            Vehicle::Boat { .. } => "Boat",
        })
    }

    fn members(&self) -> Vec<Member<'_>> {
        match self {
            Vehicle::Car { wheels } => vec![Member {
                name: "Wheels",
                value: wheels,
            }],
            Vehicle::Boat { draft } => vec![Member {
                name: "Draft",
                value: draft,
            }],
        }
    }
}

impl tagbin::Encode for Vehicle {
    fn encode(&self, writer: &mut BinWriter<'_>, opts: &EncodeOptions) -> tagbin::Result<()> {
        tagbin::encode::write_object(self, writer, opts)
    }
}

impl DecodeObject for Vehicle {
    fn activate(discriminator: Option<&str>, _opts: &DecodeOptions) -> tagbin::Result<Self> {
        Ok(match discriminator {
            Some("Boat") => Vehicle::Boat { draft: 0.0 },
            _ => Vehicle::default(),
        })
    }

    fn set_member(
        &mut self,
        name: &str,
        reader: &mut BinReader<'_>,
        opts: &DecodeOptions,
    ) -> tagbin::Result<bool> {
        match (self, name) {
            (Vehicle::Car { wheels }, "Wheels") => {
                if let Some(value) = tagbin::Decode::decode(reader, opts)? {
                    *wheels = value;
                }
                Ok(true)
            }
            (Vehicle::Boat { draft }, "Draft") => {
                if let Some(value) = tagbin::Decode::decode(reader, opts)? {
                    *draft = value;
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

impl tagbin::Decode for Vehicle {
    fn decode_from(
        tag: SerializedType,
        reader: &mut BinReader<'_>,
        opts: &DecodeOptions,
    ) -> tagbin::Result<Option<Self>> {
        match tag {
            SerializedType::Object => Ok(Some(read_object(reader, opts)?)),
            other => {
                tagbin::skip::skip_payload(other, reader)?;
                Ok(None)
            }
        }
    }
}

#[test]
fn test_discriminated_object_roundtrip() {
    let boat = Vehicle::Boat { draft: 2.5 };
    let bytes = encode_to_vec(&boat, &EncodeOptions::default()).unwrap();
    let back: Vehicle = decode(&mut &bytes[..], &DecodeOptions::default()).unwrap();
    assert_eq!(back, boat);

    // The discriminator travels as a leading "@type" member.
    let value = decode_value(&mut &bytes[..]).unwrap();
    assert_eq!(value.get("@type"), Some(&Value::Str("Boat".to_string())));
}

#[test]
fn test_unknown_discriminator_falls_back() {
    // A stream from a writer that knows variants this reader does not.
    let boat = Vehicle::Boat { draft: 1.0 };
    let bytes = encode_to_vec(&boat, &EncodeOptions::default()).unwrap();
    let mut value = decode_value(&mut &bytes[..]).unwrap();
    if let Value::Object(members) = &mut value {
        members.insert("@type".to_string(), Value::Str("Plane".to_string()));
    }
    let bytes = encode_to_vec(&value, &EncodeOptions::default()).unwrap();
    let back: Vehicle = decode(&mut &bytes[..], &DecodeOptions::default()).unwrap();
    // Unknown discriminator activates the default variant; the "Draft"
    // member is then unknown and skipped.
    assert_eq!(back, Vehicle::Car { wheels: 0 });
}

#[test]
fn test_object_with_collection_members() {
    #[derive(Debug, Default, PartialEq)]
    struct Novel {
        id: u32,
        title: String,
        pages: Vec<i32>,
        genres: Vec<Color>,
    }
    reflect_object!(Novel {
        id => "Id",
        title => "Title",
        pages => "Pages",
        genres => "Genres",
    });

    let novel = Novel {
        id: 10,
        title: "Blah blah".to_string(),
        pages: (0..150).collect(),
        genres: vec![Color::Green, Color::Blue],
    };
    let bytes = encode_to_vec(&novel, &EncodeOptions::default()).unwrap();
    let back: Novel = decode(&mut &bytes[..], &DecodeOptions::default()).unwrap();
    assert_eq!(back.genres[0], Color::Green);
    assert_eq!(back.genres[1], Color::Blue);
    assert_eq!(back.pages.len(), 150);
    assert_eq!(back, novel);
}

#[test]
fn test_wire_enum_roundtrip() {
    for color in [Color::Red, Color::Green, Color::Blue] {
        let bytes = encode_to_vec(&color, &EncodeOptions::default()).unwrap();
        assert_eq!(bytes[0], SerializedType::Byte as u8);
        assert_eq!(bytes[1], color as u8);
        let back: Color = decode(&mut &bytes[..], &DecodeOptions::default()).unwrap();
        assert_eq!(back, color);
    }
}

#[test]
fn test_wire_enum_unknown_discriminant_defaults() {
    let bytes = encode_to_vec(&3u8, &EncodeOptions::default()).unwrap();
    let back: Color = decode(&mut &bytes[..], &DecodeOptions::default()).unwrap();
    assert_eq!(back, Color::Red);
}

#[test]
fn test_wire_enum_members_take_the_homogeneous_path() {
    let colors = vec![Color::Red, Color::Blue, Color::Green];
    let bytes = encode_to_vec(&colors, &EncodeOptions::default()).unwrap();
    assert_eq!(bytes[0], SerializedType::HList as u8);
    assert_eq!(bytes[5], SerializedType::Byte as u8);
    let back: Vec<Color> = decode(&mut &bytes[..], &DecodeOptions::default()).unwrap();
    assert_eq!(back, colors);
}
