use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use opcua_secure_conversation::services::{ArrayValue, NumericRange, Variant};

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("numeric_range_parse");
    for text in ["7", "100:2000", "1:3,4:9", "not a range"] {
        group.bench_function(text, |b| {
            b.iter(|| NumericRange::from(criterion::black_box(text)))
        });
    }
    group.finish();
}

fn bench_extract_and_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("numeric_range_values");
    let doubles = ArrayValue::from((0..100_000).map(f64::from).collect::<Vec<f64>>());
    let list = ArrayValue::List((0..10_000).map(Variant::Int32).collect());
    let range = NumericRange::from("1000:1999");

    group.bench_function("extract_double_buffer", |b| {
        b.iter(|| range.extract_values(&doubles))
    });
    group.bench_function("extract_list", |b| b.iter(|| range.extract_values(&list)));

    let patch = ArrayValue::from(vec![0.5f64; 1000]);
    group.bench_function("write_double_buffer", |b| {
        b.iter_batched(
            || doubles.clone(),
            |mut target| range.set_values(&mut target, &patch),
            BatchSize::LargeInput,
        )
    });
    group.finish();
}

criterion_group!(benches, bench_parse, bench_extract_and_write);
criterion_main!(benches);
