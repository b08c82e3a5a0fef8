use bitframe::conv::EncodeErrorKind;
use bitframe::parse::error::{DataIntegrityError, SelectionError, TokenError};
use bitframe::prelude::*;
use bitframe::ParseError;
use proptest::prelude::*;

fn framed_text() -> TemplateDescriptor {
    TemplateDescriptor::new("Text")
        .starts_with(b"\x7e")
        .field(FieldDescriptor::new("len", ValueType::U8).bind(Binding::primitive(8, ByteOrder::BigEndian)))
        .field(FieldDescriptor::new("payload", ValueType::Text).bind(Binding::string(Size::expr("len"), "US-ASCII")))
        .field(FieldDescriptor::new("crc", ValueType::U8).checksum(ChecksumParams::new("sum8", 8).skip(1, 1)))
}

fn engine() -> Engine {
    Engine::builder().template(framed_text()).build().unwrap()
}

fn text(payload: &str) -> Record {
    Record::new("Text")
        .with("len", payload.len() as u8)
        .with("payload", payload)
}

#[test]
fn eight_byte_frame() {
    let engine = engine();
    let bytes = engine.encode_one(&text("ABCDE")).unwrap();
    let sum = [5u8, b'A', b'B', b'C', b'D', b'E']
        .iter()
        .fold(0u8, |acc, b| acc.wrapping_add(*b));
    assert_eq!(bytes, vec![0x7e, 5, b'A', b'B', b'C', b'D', b'E', sum]);

    let rec = engine.decode_one("Text", &bytes).unwrap();
    assert_eq!(rec.get("len"), Some(&Value::UInt(5)));
    assert_eq!(rec.get("payload"), Some(&Value::from("ABCDE")));
    assert_eq!(rec.get("crc"), Some(&Value::UInt(u64::from(sum))));
}

#[test]
fn resync_spans_garbage() {
    let engine = engine();
    let a = engine.encode_one(&text("AB")).unwrap();
    let b = engine.encode_one(&text("XYZ")).unwrap();
    let garbage = [0x00, 0x11, 0x22, 0x33];
    let stream = [a.as_slice(), &garbage, b.as_slice()].concat();

    let report = engine.decode(&stream);
    assert_eq!(report.successes.len(), 2);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.successes[0].offset, 0);
    assert_eq!(report.errors[0].offset, a.len());
    assert_eq!(report.successes[1].offset, a.len() + garbage.len());
    assert!(matches!(
        report.errors[0].error.error,
        ParseError::Token(TokenError::NoHeaderMatch { found: Some(0x00) })
    ));
    assert_eq!(report.successes[1].record.get("payload"), Some(&Value::from("XYZ")));
}

#[test]
fn corrupt_message_between_good_ones() {
    let engine = engine();
    let a = engine.encode_one(&text("AB")).unwrap();
    let mut bad = engine.encode_one(&text("CD")).unwrap();
    bad[2] ^= 0x20;
    let stream = [a.as_slice(), &bad, a.as_slice()].concat();

    let report = engine.decode(&stream);
    assert_eq!(report.successes.len(), 2);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].offset, a.len());
    assert_eq!(report.errors[0].error.path, vec!["crc".to_owned()]);
}

#[test]
fn checksum_covers_exactly_its_range() {
    let engine = engine();
    let bytes = engine.encode_one(&text("ABCDE")).unwrap();
    for ix in 1..bytes.len() - 1 {
        let mut flipped = bytes.clone();
        // a shorter length still leaves the checksum in reach
        flipped[ix] ^= if ix == 1 { 0x01 } else { 0x40 };
        let err = engine.decode_one("Text", &flipped).unwrap_err();
        match err.error {
            ParseError::Integrity(DataIntegrityError::ChecksumMismatch { declared, computed, .. }) => {
                assert_ne!(declared, computed, "byte {ix}");
            }
            other => panic!("byte {ix}: unexpected {other}"),
        }
    }

    let mut flipped = bytes.clone();
    flipped[0] ^= 0x01;
    let err = engine.decode_one("Text", &flipped).unwrap_err();
    assert!(!matches!(err.error, ParseError::Integrity(_)));
}

#[test]
fn huge_declared_length_is_rejected_not_fatal() {
    let engine = Engine::builder()
        .template(
            TemplateDescriptor::new("Blob")
                .starts_with(b"\x7e")
                .field(FieldDescriptor::new("len", ValueType::U64).bind(Binding::primitive(64, ByteOrder::BigEndian)))
                .field(FieldDescriptor::new("s", ValueType::Text).bind(Binding::string(Size::expr("len"), "US-ASCII"))),
        )
        .build()
        .unwrap();
    let stream = [
        &[0x7e, 0x20, 0, 0, 0, 0, 0, 0, 1, b'A', b'B'][..],
        &[0x7e, 0, 0, 0, 0, 0, 0, 0, 2, b'h', b'i'][..],
    ]
    .concat();

    let report = engine.decode(&stream);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].offset, 0);
    assert_eq!(report.errors[0].error.path, vec!["s".to_owned()]);
    assert_eq!(report.successes.len(), 1);
    assert_eq!(report.successes[0].offset, 11);
    assert_eq!(report.successes[0].record.get("s"), Some(&Value::from("hi")));
}

fn shapes() -> Vec<TemplateDescriptor> {
    let leaf = |name: &str| {
        TemplateDescriptor::new(name)
            .extends("Shape")
            .field(FieldDescriptor::new("size", ValueType::U8).bind(Binding::primitive(8, ByteOrder::BigEndian)))
    };
    let holder = TemplateDescriptor::new("Holder").starts_with("H").field(
        FieldDescriptor::new("shape", ValueType::object("Shape")).bind(Binding::choice(
            Choices::with_prefix(8)
                .alternative(Alternative::new("#prefix >= 1 && #prefix <= 3", 1, "Circle"))
                .alternative(Alternative::new("#prefix == 2", 2, "Square")),
        )),
    );
    vec![leaf("Circle"), leaf("Square"), holder]
}

#[test]
fn first_matching_alternative_wins() {
    let engine = Engine::builder().templates(shapes()).build().unwrap();
    for tag in 1..=3u8 {
        let rec = engine.decode_one("Holder", &[b'H', tag, 9]).unwrap();
        let shape = rec.get("shape").and_then(Value::as_record).unwrap();
        assert_eq!(shape.type_name(), "Circle");
    }

    let err = engine.decode_one("Holder", &[b'H', 4, 9]).unwrap_err();
    assert_eq!(
        err.error,
        ParseError::Selection(SelectionError {
            base: "Shape".into(),
            tag: Some(4)
        })
    );
    assert_eq!(err.path, vec!["shape".to_owned()]);

    let square = Record::new("Holder").with("shape", Record::new("Square").with("size", 1u8));
    assert_eq!(engine.encode_one(&square).unwrap(), vec![b'H', 2, 1]);

    let stranger = Record::new("Holder").with("shape", Record::new("Holder"));
    assert!(matches!(
        engine.encode_one(&stranger).unwrap_err().kind,
        EncodeErrorKind::Selection { .. }
    ));
}

#[test]
fn shared_engine_across_threads() {
    let engine = engine();
    let bytes = engine.encode_one(&text("HELLO")).unwrap();
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let engine = engine.clone();
            let bytes = bytes.clone();
            std::thread::spawn(move || engine.decode(&bytes).successes.len())
        })
        .collect();
    for h in handles {
        assert_eq!(h.join().unwrap(), 1);
    }
}

proptest! {
    #[test]
    fn text_frames_round_trip(payload in "[A-Z]{1,40}") {
        let engine = engine();
        let bytes = engine.encode_one(&text(&payload)).unwrap();
        prop_assert_eq!(bytes.len(), payload.len() + 3);
        let report = engine.decode(&bytes);
        prop_assert!(report.is_clean());
        let rec = &report.successes[0].record;
        prop_assert_eq!(rec.get("payload"), Some(&Value::from(payload.as_str())));
    }
}
