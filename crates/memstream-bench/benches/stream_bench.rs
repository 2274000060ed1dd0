//! Memory and string stream benchmarks.

use std::io::SeekFrom;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use memstream_core::{BufMode, MemBuffer, StrBuffer, StreamConfig, mem, string};

const SIZES: &[usize] = &[16, 256, 4096, 65536];

/// NUL-free so string streams keep every byte.
fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| b'a' + (i % 26) as u8).collect()
}

fn bench_mem_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("mem_write");

    for &size in SIZES {
        let src = payload(size);
        group.throughput(Throughput::Bytes(size as u64));

        for (label, mode) in [("full", BufMode::Full), ("none", BufMode::None)] {
            let cfg = StreamConfig::default().with_buffering(mode, 8192);
            group.bench_with_input(BenchmarkId::new(label, size), &size, |b, _| {
                b.iter(|| {
                    let mut buf = MemBuffer::new();
                    if let Ok(mut s) = mem::open_with(&mut buf, "w", &cfg) {
                        let _ = s.fwrite(&src);
                        let _ = s.fclose();
                    }
                    black_box(buf.len());
                });
            });
        }
    }
    group.finish();
}

fn bench_str_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("str_write");

    for &size in SIZES {
        let src = payload(size);
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_with_input(BenchmarkId::new("full", size), &size, |b, _| {
            b.iter(|| {
                let mut buf = StrBuffer::new();
                if let Ok(mut s) = string::open_with(&mut buf, "w", &StreamConfig::default()) {
                    let _ = s.fwrite(&src);
                    let _ = s.fclose();
                }
                black_box(buf.len());
            });
        });
    }
    group.finish();
}

fn bench_mem_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("mem_read");

    for &size in SIZES {
        let mut buf = MemBuffer::from(payload(size));
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_with_input(BenchmarkId::new("fread", size), &size, |b, &sz| {
            let mut dst = vec![0u8; sz];
            b.iter(|| {
                if let Ok(mut s) = mem::open_with(&mut buf, "r", &StreamConfig::default()) {
                    black_box(s.fread(&mut dst).unwrap_or(0));
                }
            });
        });
    }
    group.finish();
}

fn bench_getc(c: &mut Criterion) {
    let size = 4096;
    let mut buf = MemBuffer::from(payload(size));
    let mut group = c.benchmark_group("mem_getc");
    group.throughput(Throughput::Bytes(size as u64));

    group.bench_function("drain_4k", |b| {
        b.iter(|| {
            if let Ok(mut s) = mem::open_with(&mut buf, "r", &StreamConfig::default()) {
                let mut sum = 0u64;
                while let Ok(Some(byte)) = s.fgetc() {
                    sum += u64::from(byte);
                }
                black_box(sum);
            }
        });
    });
    group.finish();
}

fn bench_seek_overwrite(c: &mut Criterion) {
    let mut buf = MemBuffer::from(payload(65536));

    c.bench_function("mem_seek_overwrite_64k", |b| {
        b.iter(|| {
            if let Ok(mut s) = mem::open_with(&mut buf, "r+", &StreamConfig::default()) {
                for off in (0..65536u64).step_by(4096) {
                    let _ = s.fseek(SeekFrom::Start(off));
                    let _ = s.fwrite(b"xyzw");
                }
                let _ = s.fclose();
            }
        });
    });
}

criterion_group!(
    benches,
    bench_mem_write,
    bench_str_write,
    bench_mem_read,
    bench_getc,
    bench_seek_overwrite
);
criterion_main!(benches);
