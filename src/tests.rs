//! Cross-encoding round-trip tests over the whole data model.

use num_bigint::{BigInt, BigUint};
use num_traits::Num;
use pretty_assertions::assert_eq;

use crate::{
    dump, load, BinaryReader, BinaryWriter, Blob, Clob, Data, Decimal, IonReader, IonType,
    IonWriter, List, Sexp, Struct, SymbolToken, TextReader, TextWriter, TextWriterConfig,
    Timestamp, Value,
};

fn parse_text(text: &str) -> Vec<Value> {
    let mut reader = TextReader::new(text);
    load(&mut reader).unwrap()
}

fn binary_round_trip(values: &[Value]) -> Vec<Value> {
    let mut writer = BinaryWriter::new();
    dump(values, &mut writer).unwrap();
    writer.finish().unwrap();
    let mut reader = BinaryReader::new(writer.bytes());
    load(&mut reader).unwrap()
}

fn text_round_trip(values: &[Value], pretty: bool) -> Vec<Value> {
    let mut writer = TextWriter::with_config(TextWriterConfig {
        pretty,
        include_ivm: true,
    });
    dump(values, &mut writer).unwrap();
    writer.finish().unwrap();
    let mut reader = TextReader::new(writer.output());
    load(&mut reader).unwrap()
}

fn assert_round_trips(values: Vec<Value>) {
    assert_eq!(binary_round_trip(&values), values, "binary round trip");
    assert_eq!(text_round_trip(&values, false), values, "text round trip");
    assert_eq!(text_round_trip(&values, true), values, "pretty round trip");
}

fn annotated(data: Data, annotations: &[&str]) -> Value {
    Value {
        data,
        annotations: annotations
            .iter()
            .map(|text| SymbolToken::known(*text))
            .collect(),
    }
}

/// One value of every type, nulls included, some annotated, some nested.
fn corpus() -> Vec<Value> {
    vec![
        Value::from(Data::Null),
        Value::from(true),
        Value::from(0i64),
        Value::from(-1i64),
        Value::from(i64::MAX),
        Value::from(BigInt::from_str_radix("-123456789012345678901234567890", 10).unwrap()),
        Value::from(0.0f64),
        Value::from(-0.0f64),
        Value::from(f64::NAN),
        Value::from(f64::NEG_INFINITY),
        Value::from(1.625f64),
        Value::from(Decimal::new(BigInt::from(100), -3)),
        Value::from(Decimal::new(BigInt::from(-7), 4)),
        Value::from(Decimal::negative_zero(-2)),
        Value::from(Timestamp::year(1066).unwrap()),
        Value::from(Timestamp::day(2020, 2, 29).unwrap()),
        Value::from(Timestamp::minute(None, 1999, 12, 31, 23, 59).unwrap()),
        Value::from(
            Timestamp::fractional_second(
                Some(-330),
                2016,
                8,
                1,
                7,
                5,
                0,
                BigUint::from(250u32),
                -3,
            )
            .unwrap(),
        ),
        Value::from(SymbolToken::known("plain")),
        Value::from(SymbolToken::known("needs quoting")),
        Value::from(SymbolToken::Zero),
        Value::from("a string with \"quotes\" and \u{1F600}"),
        Value::from(Data::String(Some(String::new()))),
        Value::from(Clob {
            data: b"opaque text \xff".to_vec(),
        }),
        Value::from(Blob {
            data: vec![0, 1, 2, 253, 254, 255],
        }),
        annotated(Data::Int(Some(BigInt::from(7))), &["degrees", "celsius"]),
        Value::from(List {
            values: vec![
                Value::from(1i64),
                annotated(Data::Bool(Some(false)), &["flag"]),
                Value::from(Data::List(Some(List { values: vec![] }))),
            ],
        }),
        Value::from(Sexp {
            values: vec![
                Value::from(Data::Symbol(Some(SymbolToken::known("+")))),
                Value::from(1i64),
                Value::from(2i64),
            ],
        }),
        Value::from(Struct {
            fields: vec![
                (SymbolToken::known("first"), Value::from(1i64)),
                (
                    SymbolToken::known("nested"),
                    Value::from(Struct {
                        fields: vec![(SymbolToken::known("first"), Value::from(2i64))],
                    }),
                ),
            ],
        }),
        Value::from(Data::Bool(None)),
        Value::from(Data::Int(None)),
        Value::from(Data::Float(None)),
        Value::from(Data::Decimal(None)),
        Value::from(Data::Timestamp(None)),
        Value::from(Data::String(None)),
        Value::from(Data::Symbol(None)),
        Value::from(Data::Clob(None)),
        Value::from(Data::Blob(None)),
        Value::from(Data::List(None)),
        Value::from(Data::Sexp(None)),
        Value::from(Data::Struct(None)),
    ]
}

#[test]
fn corpus_round_trips_through_both_encodings() {
    assert_round_trips(corpus());
}

#[test]
fn text_to_binary_to_text_is_stable() {
    let original = parse_text(
        "{a: 1, b: \"hi\", c: [true, null.int]} (op 1 2) 'quoted sym'::[1.5e0, 0.25]",
    );
    let through_binary = binary_round_trip(&original);
    assert_eq!(through_binary, original);
    let through_text = text_round_trip(&through_binary, false);
    assert_eq!(through_text, original);
}

// Scenario: text struct through binary, preserving field order.
#[test]
fn struct_survives_transcoding_in_order() {
    let original = parse_text("{a: 1, b: \"hi\", c: [true, null.int]}");
    let mut writer = BinaryWriter::new();
    dump(&original, &mut writer).unwrap();
    writer.finish().unwrap();
    assert_eq!(&writer.bytes()[..4], &[0xE0, 0x01, 0x00, 0xEA]);

    let mut reader = BinaryReader::new(writer.bytes());
    let reread = load(&mut reader).unwrap();
    assert_eq!(reread, original);
    match &reread[0].data {
        Data::Struct(Some(value)) => {
            let names: Vec<_> = value
                .fields
                .iter()
                .map(|(name, _)| name.text().unwrap().to_string())
                .collect();
            assert_eq!(names, vec!["a", "b", "c"]);
        }
        other => panic!("expected struct, got {:?}", other),
    }
}

// Scenario: null.symbol is the single byte 0x7F after the version marker.
#[test]
fn null_symbol_is_one_byte() {
    let original = parse_text("null.symbol");
    let mut writer = BinaryWriter::new();
    dump(&original, &mut writer).unwrap();
    writer.finish().unwrap();
    assert_eq!(writer.bytes(), &[0xE0, 0x01, 0x00, 0xEA, 0x7F]);
    assert_eq!(binary_round_trip(&original), original);
}

// Scenario: fractional precision and extreme offsets survive transcoding.
#[test]
fn timestamp_precision_and_offset_survive() {
    let original = parse_text("2007-02-24T01:02:03.456+23:59");
    let timestamp = match &original[0].data {
        Data::Timestamp(Some(value)) => value.clone(),
        other => panic!("expected timestamp, got {:?}", other),
    };
    assert_eq!(timestamp.fractional_precision(), Some(3));
    assert_eq!(timestamp.offset_minutes(), Some(1439));
    assert_round_trips(original);
}

// Scenario: 0.100 is coefficient 100 with exponent -3, not 1 x 10^-1.
#[test]
fn decimal_digit_count_is_identity() {
    let original = parse_text("0.100");
    assert_eq!(
        original[0].data,
        Data::Decimal(Some(Decimal::new(BigInt::from(100), -3)))
    );
    assert_round_trips(original);

    let distinct = parse_text("0d0 0d-1");
    assert_ne!(distinct[0], distinct[1]);
    assert_round_trips(distinct);
}

// Scenario: a 200-digit integer is preserved exactly.
#[test]
fn huge_integers_round_trip() {
    let digits: String = "123456789".chars().cycle().take(200).collect();
    let original = parse_text(&digits);
    assert_eq!(
        original[0].data,
        Data::Int(Some(BigInt::from_str_radix(&digits, 10).unwrap()))
    );
    assert_round_trips(original);
}

// Scenario: repeated field names are preserved in order.
#[test]
fn repeated_fields_survive() {
    let original = parse_text("{a: 1, a: 2, a: 3}");
    let values = binary_round_trip(&original);
    match &values[0].data {
        Data::Struct(Some(value)) => {
            assert_eq!(value.fields.len(), 3);
            let ints: Vec<_> = value
                .fields
                .iter()
                .map(|(name, value)| {
                    assert_eq!(name.text(), Some("a"));
                    value.clone()
                })
                .collect();
            assert_eq!(
                ints,
                vec![Value::from(1i64), Value::from(2i64), Value::from(3i64)]
            );
        }
        other => panic!("expected struct, got {:?}", other),
    }
    assert_round_trips(original);
}

#[test]
fn empty_containers_round_trip() {
    assert_round_trips(parse_text("[] () {}"));
}

#[test]
fn deeply_nested_containers_round_trip() {
    let mut value = Value::from(0i64);
    for depth in 0..128 {
        if depth % 2 == 0 {
            value = Value::from(List {
                values: vec![value],
            });
        } else {
            value = Value::from(Struct {
                fields: vec![(SymbolToken::known("depth"), value)],
            });
        }
    }
    assert_round_trips(vec![value]);
}

#[test]
fn long_strings_round_trip() {
    let text = "long \"text\" \\ with escapes\n".repeat(40_000);
    assert!(text.len() >= 1 << 20);
    assert_round_trips(vec![Value::from(text.as_str())]);
}

#[test]
fn symbol_zero_is_distinct_from_null_symbol() {
    let values = parse_text("$0 null.symbol");
    assert_eq!(values[0].data, Data::Symbol(Some(SymbolToken::Zero)));
    assert_eq!(values[1].data, Data::Symbol(None));
    assert_ne!(values[0], values[1]);
    assert_round_trips(values);
}

#[test]
fn every_typed_null_round_trips() {
    let text = "null null.null null.bool null.int null.float null.decimal null.timestamp \
                null.string null.symbol null.clob null.blob null.list null.sexp null.struct";
    let values = parse_text(text);
    assert_eq!(values.len(), 14);
    assert_round_trips(values);
}

#[test]
fn annotations_survive_both_encodings() {
    let values = parse_text("a::b::{c: d::[e::1]}");
    assert_eq!(
        values[0].annotations,
        vec![SymbolToken::known("a"), SymbolToken::known("b")]
    );
    assert_round_trips(values);
}

#[test]
fn writer_symbol_tables_resolve_on_reread() {
    // the same symbol text reused across values interns to one sid
    let values = parse_text("sym sym {sym: sym::sym}");
    let mut writer = BinaryWriter::new();
    dump(&values, &mut writer).unwrap();
    writer.finish().unwrap();
    let mut reader = BinaryReader::new(writer.bytes());
    assert_eq!(load(&mut reader).unwrap(), values);
    // interned once: "sym" resolves to the first local sid
    assert_eq!(reader.symbol_table().sid_for("sym"), Some(10));
}

#[test]
fn step_out_discards_unread_binary_children() {
    let values = parse_text("{a: [1, 2, 3], b: 4}");
    let mut writer = BinaryWriter::new();
    dump(&values, &mut writer).unwrap();
    writer.finish().unwrap();

    let mut reader = BinaryReader::new(writer.bytes());
    assert_eq!(reader.next().unwrap(), crate::StreamItem::VersionMarker);
    assert_eq!(
        reader.next().unwrap(),
        crate::StreamItem::ContainerStart(IonType::Struct)
    );
    reader.step_in().unwrap();
    assert_eq!(
        reader.next().unwrap(),
        crate::StreamItem::ContainerStart(IonType::List)
    );
    reader.step_in().unwrap();
    assert_eq!(reader.next().unwrap(), crate::StreamItem::Value(IonType::Int));
    reader.step_out().unwrap();
    assert_eq!(reader.next().unwrap(), crate::StreamItem::Value(IonType::Int));
    assert_eq!(reader.field_name().unwrap(), Some(SymbolToken::known("b")));
    assert_eq!(reader.read_i64().unwrap(), 4);
}

#[test]
fn embedded_streams_without_markers() {
    let mut writer = BinaryWriter::with_config(crate::BinaryWriterConfig { include_ivm: false });
    dump(&parse_text("true"), &mut writer).unwrap();
    writer.finish().unwrap();
    assert_eq!(writer.bytes(), &[0x11]);
}

#[test]
fn binary_symbol_table_append_extends_earlier_declarations() {
    let mut bytes = vec![0xE0, 0x01, 0x00, 0xEA];
    // $ion_symbol_table::{symbols: ["a"]}
    bytes.extend(hex::decode("e78183d487b28161").unwrap());
    // $ion_symbol_table::{imports: $ion_symbol_table, symbols: ["b"]}
    bytes.extend(hex::decode("ea8183d786710387b28162").unwrap());
    // 'a' then 'b' by sid
    bytes.extend(hex::decode("710a710b").unwrap());

    let mut reader = BinaryReader::new(&bytes);
    let values = load(&mut reader).unwrap();
    assert_eq!(
        values,
        vec![
            Value::from(Data::Symbol(Some(SymbolToken::known("a")))),
            Value::from(Data::Symbol(Some(SymbolToken::known("b")))),
        ]
    );
}

#[test]
fn binary_symbol_table_reset_forgets_earlier_declarations() {
    let mut bytes = vec![0xE0, 0x01, 0x00, 0xEA];
    bytes.extend(hex::decode("e78183d487b28161").unwrap());
    // no imports field: forget "a", declare only "b"
    bytes.extend(hex::decode("e78183d487b28162").unwrap());
    bytes.extend(hex::decode("710a").unwrap());

    let mut reader = BinaryReader::new(&bytes);
    let values = load(&mut reader).unwrap();
    assert_eq!(
        values,
        vec![Value::from(Data::Symbol(Some(SymbolToken::known("b"))))]
    );
}

mod malformed {
    use super::*;
    use crate::Error;
    use pretty_assertions::assert_eq;

    fn binary_fails(body_hex: &str) -> Error {
        let mut bytes = vec![0xE0, 0x01, 0x00, 0xEA];
        bytes.extend(hex::decode(body_hex.replace(' ', "")).unwrap());
        let mut reader = BinaryReader::new(&bytes);
        load(&mut reader).expect_err("expected failure")
    }

    fn text_fails(text: &str) -> Error {
        let mut reader = TextReader::new(text);
        load(&mut reader).expect_err("expected failure")
    }

    #[test]
    fn truncated_binary_values() {
        assert_eq!(binary_fails("24 0102"), Error::UnexpectedEof);
        assert_eq!(binary_fails("8e 94"), Error::UnexpectedEof);
        assert_eq!(binary_fails("b3 21"), Error::UnexpectedEof);
    }

    #[test]
    fn illegal_binary_descriptors() {
        assert!(matches!(binary_fails("f3 00 00 00"), Error::Malformed { .. }));
        // bool with a length nibble
        assert!(matches!(binary_fails("13"), Error::Malformed { .. }));
        // float of length 2
        assert!(matches!(binary_fails("42 0000"), Error::Malformed { .. }));
        // annotation wrapper too short to hold a value
        assert!(matches!(binary_fails("e2 81 84"), Error::Malformed { .. }));
    }

    #[test]
    fn unknown_binary_sid() {
        assert!(matches!(binary_fails("71 63"), Error::Symbol(_)));
    }

    #[test]
    fn broken_text_syntax() {
        assert!(matches!(text_fails("{a 1}"), Error::Malformed { .. }));
        assert!(matches!(text_fails("[1, 2"), Error::Malformed { .. }));
        assert!(matches!(text_fails("\"open"), Error::Malformed { .. }));
        assert!(matches!(text_fails("/* open"), Error::Malformed { .. }));
        assert!(matches!(text_fails("1_"), Error::Malformed { .. }));
        assert!(matches!(text_fails("{{ not base64! }}"), Error::Malformed { .. }));
        assert!(matches!(text_fails("2007-02-30T"), Error::Timestamp(_)));
    }

    #[test]
    fn overflow_is_not_a_parse_failure() {
        let mut reader = TextReader::new("123456789012345678901234567890");
        assert_eq!(
            reader.next().unwrap(),
            crate::StreamItem::Value(IonType::Int)
        );
        assert_eq!(reader.read_i64().unwrap_err(), Error::Overflow);
        // the arbitrary-precision accessor still works
        assert!(reader.read_int().is_ok());
    }
}
