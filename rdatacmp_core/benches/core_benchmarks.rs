use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rdatacmp_common::{
    CanonicalRow, ComparatorRef, DataSource, FieldDeclaration, FieldMapping, FieldValue,
};
use rdatacmp_core::{
    normalize, CompareEngine, ComparePlan, CsvSource, Granularity, Registries, BUILTIN_GROUP,
};
use std::fs;
use std::io::Write as IoWrite;
use tempfile::TempDir;

fn fields() -> Vec<FieldDeclaration> {
    vec![
        FieldDeclaration::new("id").unique(),
        FieldDeclaration::new("region").unique(),
        FieldDeclaration::new("name")
            .with_comparator(ComparatorRef::new(BUILTIN_GROUP, "String (ignore case)")),
        FieldDeclaration::new("amount").with_comparator(
            ComparatorRef::new(BUILTIN_GROUP, "Float").with_config(r#"{"precision":2}"#),
        ),
        FieldDeclaration::new("booked")
            .with_comparator(ComparatorRef::new(BUILTIN_GROUP, "Date")),
    ]
}

fn engine() -> CompareEngine {
    let registries = Registries::with_builtins();
    CompareEngine::new(ComparePlan::build(&fields(), &registries.comparators).unwrap())
}

// Every tenth row differs; shadow is reversed so lookups are not sequential
fn create_rows(count: usize) -> (Vec<CanonicalRow>, Vec<CanonicalRow>) {
    let make = |i: usize, shadow: bool| -> CanonicalRow {
        let amount = if shadow && i % 10 == 0 { i as f64 + 0.5 } else { i as f64 };
        let booked = if shadow {
            format!("2024/01/{:02}", i % 28 + 1)
        } else {
            format!("2024-01-{:02}", i % 28 + 1)
        };
        [
            ("id", FieldValue::Int(i as i64)),
            ("region", FieldValue::from(format!("R{}", i % 7))),
            ("name", FieldValue::from(format!("customer {}", i))),
            ("amount", FieldValue::Float(amount)),
            ("booked", FieldValue::from(booked)),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    };

    let primary = (0..count).map(|i| make(i, false)).collect();
    let shadow = (0..count).rev().map(|i| make(i, true)).collect();
    (primary, shadow)
}

fn write_csv(dir: &TempDir, name: &str, count: usize) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut file = fs::File::create(&path).unwrap();
    writeln!(file, "id,region,name,amount,booked").unwrap();
    for i in 0..count {
        writeln!(file, "{},R{},customer {},{}.00,2024-01-{:02}", i, i % 7, i, i, i % 28 + 1).unwrap();
    }
    path
}

fn bench_compare_rows(c: &mut Criterion) {
    let engine = engine();
    let mut group = c.benchmark_group("compare_rows");

    for size in [100, 1_000, 10_000].iter() {
        let (primary, shadow) = create_rows(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let report = engine
                    .compare_rows(black_box(primary.clone()), black_box(shadow.clone()))
                    .unwrap();
                black_box(report);
            });
        });
    }

    group.finish();
}

fn bench_compare_csv_sources(c: &mut Criterion) {
    c.bench_function("compare_csv_sources_1000_rows", |b| {
        let temp = TempDir::new().unwrap();
        let primary_path = write_csv(&temp, "primary.csv", 1_000);
        let shadow_path = write_csv(&temp, "shadow.csv", 1_000);
        let mapping = FieldMapping::identity(&fields());
        let primary = CsvSource::new(primary_path, mapping.clone());
        let shadow = CsvSource::new(shadow_path, mapping);
        let engine = engine();

        b.iter(|| {
            let report = engine
                .compare_sources(black_box(&primary as &dyn DataSource), &shadow)
                .unwrap();
            black_box(report);
        });
    });
}

fn bench_temporal_normalize(c: &mut Criterion) {
    let inputs: Vec<FieldValue> = [
        "2024-03-15",
        "20240315",
        "15.03.2024",
        "2024年3月15日",
        "2024-03-15 10:20:30.123",
        "not a date",
    ]
    .into_iter()
    .map(FieldValue::from)
    .collect();

    c.bench_function("temporal_normalize_mixed", |b| {
        b.iter(|| {
            for input in &inputs {
                black_box(normalize(black_box(input), Granularity::Date));
            }
        });
    });
}

criterion_group!(engine_benches, bench_compare_rows, bench_compare_csv_sources);

criterion_group!(temporal_benches, bench_temporal_normalize);

criterion_main!(engine_benches, temporal_benches);
