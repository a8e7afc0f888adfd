//! Archive Codec Benchmarks
//!
//! Extraction and packing throughput for DITA-sized archives, plus manifest
//! parsing.
//!
//! Run with: `cargo bench --bench archive_codec`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::time::Duration;

use dita_pdf_server::archive;
use dita_pdf_server::manifest::Manifest;

/// Archive with a manifest, one map per item and `topics` topic files each
fn create_dita_archive(items: usize, topics: usize) -> Vec<u8> {
    use std::io::{Cursor, Write};
    use zip::{write::SimpleFileOptions, ZipWriter};

    let options = SimpleFileOptions::default();
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

    writer.start_file("manifest.xml", options).unwrap();
    writer.write_all(create_manifest(items, topics).as_bytes()).unwrap();

    for item in 0..items {
        writer
            .start_file(format!("book{}/book{}.ditamap", item, item), options)
            .unwrap();
        writer.write_all(b"<map><title>Bench</title></map>").unwrap();

        for topic in 0..topics {
            writer
                .start_file(format!("book{}/topics/topic{}.dita", item, topic), options)
                .unwrap();
            write!(
                writer,
                "<topic id=\"t{}\"><title>Topic {}</title><body><p>{}</p></body></topic>",
                topic,
                topic,
                "Lorem ipsum dolor sit amet. ".repeat(40)
            )
            .unwrap();
        }
    }

    writer.finish().unwrap().into_inner()
}

fn create_manifest(items: usize, topics: usize) -> String {
    let mut xml = String::from("<manifest version=\"1.0\"><items>");
    for item in 0..items {
        xml.push_str(&format!(
            "<item name=\"{}\"><ditamap>book{}/book{}.ditamap</ditamap><files>",
            item, item, item
        ));
        for topic in 0..topics {
            xml.push_str(&format!("<file>book{}/topics/topic{}.dita</file>", item, topic));
        }
        xml.push_str("</files></item>");
    }
    xml.push_str("</items></manifest>");
    xml
}

/// Benchmark extraction into a fresh directory
fn bench_unzip(c: &mut Criterion) {
    let mut group = c.benchmark_group("unzip");
    group.measurement_time(Duration::from_secs(10));

    for (items, topics) in [(1, 10), (5, 50)] {
        let data = create_dita_archive(items, topics);
        group.throughput(Throughput::Bytes(data.len() as u64));

        group.bench_with_input(
            BenchmarkId::new("dita_archive", items * topics),
            &data,
            |b, data| {
                b.iter_batched(
                    || tempfile::TempDir::new().expect("Failed to create temp dir"),
                    |dir| {
                        let created = archive::unzip(black_box(data), dir.path()).expect("Failed to unzip");
                        black_box(created.len())
                    },
                    criterion::BatchSize::SmallInput,
                )
            },
        );
    }

    group.finish();
}

/// Benchmark packing a directory of rendered outputs
fn bench_zip(c: &mut Criterion) {
    let mut group = c.benchmark_group("zip");
    group.measurement_time(Duration::from_secs(10));

    for outputs in [2usize, 20] {
        group.bench_function(BenchmarkId::new("pdf_outputs", outputs), |b| {
            b.iter_batched(
                || {
                    let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
                    for i in 0..outputs {
                        std::fs::write(dir.path().join(format!("book{}.pdf", i)), vec![b'%'; 64 * 1024])
                            .expect("Failed to write output");
                    }
                    dir
                },
                |dir| {
                    let path = archive::zip(black_box(dir.path())).expect("Failed to zip");
                    black_box(path)
                },
                criterion::BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

/// Benchmark manifest parsing
fn bench_manifest(c: &mut Criterion) {
    let xml = create_manifest(20, 50);

    let mut group = c.benchmark_group("manifest");
    group.throughput(Throughput::Bytes(xml.len() as u64));

    group.bench_function("parse_20_items", |b| {
        b.iter(|| {
            let manifest = Manifest::parse_str(black_box(&xml)).expect("Failed to parse manifest");
            black_box(manifest.len())
        })
    });

    group.finish();
}

criterion_group!(benches, bench_unzip, bench_zip, bench_manifest);
criterion_main!(benches);
