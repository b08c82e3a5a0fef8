use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use bitframe::matcher::{naive_find, Bndm, KarpRabin, PatternMatcher};

fn haystack() -> Vec<u8> {
    let mut x: u32 = 0x2545_f491;
    (0..64 * 1024)
        .map(|_| {
            x ^= x << 13;
            x ^= x >> 17;
            x ^= x << 5;
            (x % 251) as u8
        })
        .collect()
}

fn find_bench(c: &mut Criterion) {
    let mut source = haystack();
    let patterns: [&[u8]; 3] = [b"\xfe\xfe", b"\xfe\xfe\xfdHEADER", b"\xfe\xfe\xfdVERY-LONG-START-PATTERN-FOR-KR-\xfd"];
    let tail = source.len() - 64;
    for (ix, p) in patterns.iter().enumerate() {
        source[tail + ix * 20..tail + ix * 20 + p.len()].copy_from_slice(p);
    }

    let mut group = c.benchmark_group("find");
    for p in patterns {
        group.bench_with_input(BenchmarkId::new("naive", p.len()), p, |b, p| {
            b.iter(|| black_box(naive_find(&source, p, None, 0)))
        });
        if p.len() <= Bndm::MAX_PATTERN {
            let m = Bndm::new(p, None).unwrap();
            group.bench_with_input(BenchmarkId::new("bndm", p.len()), &m, |b, m| {
                b.iter(|| black_box(m.find(&source, 0)))
            });
        }
        let m = KarpRabin::new(p);
        group.bench_with_input(BenchmarkId::new("karp_rabin", p.len()), &m, |b, m| {
            b.iter(|| black_box(m.find(&source, 0)))
        });
    }
    group.finish();
}

criterion_group!(benches, find_bench);
criterion_main!(benches);
