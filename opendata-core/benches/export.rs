use std::io::Cursor;

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use opendata_core::{
    export, CsvSerializer, ExportFormat, HelperRegistry, Layout, MemoryRecordSource, Partition,
    Record, Template,
};
use serde_json::json;

fn records(count: usize) -> Vec<Record> {
    let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
    (0..count)
        .map(|i| {
            let time = start + Duration::seconds(i as i64 * 17);
            Record::from_pairs([
                ("open_uuid", json!(format!("P{:08x}", i))),
                ("open_test_uuid", json!(format!("O{:08x}", i))),
                ("time_utc", json!(time.format("%Y-%m-%d %H:%M:%S").to_string())),
                ("cat_technology", json!(if i % 3 == 0 { "4G" } else { "WLAN" })),
                ("lat", json!(48.2 + (i % 100) as f64 / 1000.0)),
                ("long", json!(16.37)),
                ("download_kbit", json!(20000 + i * 37 % 180000)),
                ("upload_kbit", json!(5000 + i % 40000)),
                ("ping_ms", json!(12.5)),
                ("lte_rsrp", json!(-90 - (i % 30) as i64)),
                ("signal_strength", json!(-60 - (i % 20) as i64)),
                ("network_name", json!("Magenta, \"Home\"")),
            ]).unwrap()
        })
        .collect()
}

fn bench_serializer(c: &mut Criterion) {
    let mut group = c.benchmark_group("csv_serializer");
    for count in [1_000usize, 10_000] {
        let input = records(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &input, |b, input| {
            b.iter(|| {
                let mut out = Vec::with_capacity(count * 256);
                let written = CsvSerializer::new(Layout::OpenTest.columns())
                    .serialize(input.iter().cloned().map(Ok), &mut out)
                    .unwrap();
                black_box((written, out.len()))
            });
        });
    }
    group.finish();
}

fn bench_zip_export(c: &mut Criterion) {
    let source = MemoryRecordSource::new(records(10_000));
    let now = Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap();
    let format = ExportFormat::zip();

    c.bench_function("export::zip_current_10k", |b| {
        b.iter(|| {
            let mut out = Cursor::new(Vec::new());
            let outcome = export(&source, &format, &Partition::Current, now, &mut out).unwrap();
            black_box((outcome.records, out.into_inner().len()))
        });
    });
}

fn bench_report_render(c: &mut Criterion) {
    let template = Template::compile(
        "{{#each records}}{{toMbit download_kbit}} {{roundNumber ping_ms 0}} \
         {{#ifCond conditioned_signal_strength '<' -100}}weak{{else}}ok{{/ifCond}}\n{{/each}}",
    )
    .unwrap();
    let registry = HelperRegistry::default();
    let input = records(1_000);

    c.bench_function("report::render_1k", |b| {
        b.iter(|| {
            let out = opendata_core::render_report(
                &template,
                input.iter().cloned().map(Ok),
                &registry,
                "bench",
            )
            .unwrap();
            black_box(out.len())
        });
    });
}

criterion_group!(
    benches,
    bench_serializer,
    bench_zip_export,
    bench_report_render,
);

criterion_main!(benches);
