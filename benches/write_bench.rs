use criterion::{black_box, criterion_group, criterion_main, Criterion};

use bitframe::prelude::*;
use bitframe::BitWriter;

fn unaligned_bench(c: &mut Criterion) {
    c.bench_function("bitwriter_unaligned", |b| {
        b.iter(|| {
            let mut w = BitWriter::new();
            for i in 0..256u64 {
                w.write_unsigned(i, 5, ByteOrder::BigEndian);
                w.write_unsigned(i * 3, 11, ByteOrder::LittleEndian);
            }
            black_box(w.finish())
        })
    });
}

fn compose_bench(c: &mut Criterion) {
    let engine = Engine::builder()
        .template(
            TemplateDescriptor::new("Log")
                .starts_with("LG")
                .ends_with(b"\r\n")
                .field(FieldDescriptor::new("level", ValueType::U8).bind(Binding::primitive(3, ByteOrder::BigEndian)))
                .field(FieldDescriptor::new("code", ValueType::U16).bind(Binding::primitive(13, ByteOrder::BigEndian)))
                .field(FieldDescriptor::new("text", ValueType::Text).bind(Binding::string_until(0, true, "US-ASCII")))
                .field(FieldDescriptor::new("crc", ValueType::U8).checksum(ChecksumParams::new("xor8", 8).skip(2, 1))),
        )
        .build()
        .unwrap();
    let records: Vec<_> = (0..500u16)
        .map(|i| {
            Record::new("Log")
                .with("level", (i % 8) as u8)
                .with("code", i)
                .with("text", format!("event number {i}"))
        })
        .collect();
    c.bench_function("compose_batch", |b| b.iter(|| black_box(engine.compose(black_box(&records)))));
}

criterion_group!(benches, unaligned_bench, compose_bench);
criterion_main!(benches);
