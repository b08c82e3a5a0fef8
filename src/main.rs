use bitframe::prelude::*;
use bitframe::schema::Modifier;
use tracing::info;

fn tracker() -> TemplateDescriptor {
    TemplateDescriptor::new("Position")
        .starts_with(b"\x7e")
        .ends_with(b"\x0d")
        .field(FieldDescriptor::new("kind", ValueType::U8).bind(Binding::primitive(4, ByteOrder::BigEndian)))
        .field(FieldDescriptor::new("sats", ValueType::U8).bind(Binding::primitive(4, ByteOrder::BigEndian)))
        .field(
            FieldDescriptor::new("lat", ValueType::I32)
                .bind(Binding::primitive(24, ByteOrder::BigEndian))
                .post_process("lat * 10", "lat / 10"),
        )
        .field(
            FieldDescriptor::new("speed", ValueType::U16)
                .bind(Binding::primitive(8, ByteOrder::BigEndian).when("kind == 2")),
        )
        .field(FieldDescriptor::new("fast", ValueType::Bool).modifier(Modifier::Evaluate {
            formula: "speed > 80".to_owned(),
            condition: Some("kind == 2".to_owned()),
        }))
        .field(FieldDescriptor::new("crc", ValueType::U8).checksum(ChecksumParams::new("crc8", 8).skip(1, 1)))
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_target(false)
        .init();

    let engine = match Engine::builder().template(tracker()).build() {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("invalid template: {e}");
            std::process::exit(1);
        }
    };

    let fix = Record::new("Position")
        .with("kind", 2u8)
        .with("sats", 9u8)
        .with("lat", 45_123_450i64)
        .with("speed", 97u16);
    let plain = Record::new("Position")
        .with("kind", 1u8)
        .with("sats", 4u8)
        .with("lat", -1_000i64);

    let composed = engine.compose(&[fix, plain]);
    info!(bytes = ?composed.bytes, "composed two messages");

    let mut stream = composed.bytes.clone();
    stream.splice(8..8, [0xde, 0xad]);
    let report = engine.decode(&stream);
    for d in &report.successes {
        info!(offset = d.offset, record = %d.record, "decoded");
    }
    for f in &report.errors {
        info!(offset = f.offset, error = %f.error, "rejected");
    }
}
