use criterion::{criterion_group, criterion_main, Criterion};
use duckserve_core::{result_schema, ColumnDescriptor, DataRow, DataValue, TypeTag};
use std::sync::Arc;

fn schema_build_bench(c: &mut Criterion) {
    let columns: Vec<ColumnDescriptor> = (0..64)
        .map(|idx| {
            let tag = match idx % 4 {
                0 => TypeTag::BigInt,
                1 => TypeTag::Varchar,
                2 => TypeTag::parse("INTEGER[]"),
                _ => TypeTag::TimestampTz,
            };
            ColumnDescriptor::new(format!("col_{idx}"), tag)
        })
        .collect();
    c.bench_function("result_schema_64_columns", |b| {
        b.iter(|| {
            let schema = result_schema(&columns);
            let _ = serde_json::to_vec(&schema).expect("serialize");
        })
    });
}

fn row_serialize_bench(c: &mut Criterion) {
    let columns: Arc<[String]> = vec!["id".to_string(), "name".to_string(), "tags".to_string()].into();
    let rows: Vec<DataRow> = (0..10_000i64)
        .map(|idx| {
            DataRow::new(
                columns.clone(),
                vec![
                    DataValue::BigInt(i128::from(idx) << 40),
                    DataValue::Text(format!("user-{idx}")),
                    DataValue::List(vec![DataValue::Integer(idx), DataValue::Null]),
                ],
            )
        })
        .collect();
    c.bench_function("serialize_10k_rows", |b| {
        b.iter(|| {
            let _ = serde_json::to_vec(&rows).expect("serialize");
        })
    });
}

criterion_group!(schema_benches, schema_build_bench, row_serialize_bench);
criterion_main!(schema_benches);
