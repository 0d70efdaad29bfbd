//! Benchmarks for pipeline execution.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use flowline::prelude::*;

fn pipeline_benchmark(c: &mut Criterion) {
    let pipeline = PipelineBuilder::new("bench")
        .add_stage(FnStage::new("Upper", |s: String, _: &RunContext| {
            Ok(s.to_uppercase())
        }))
        .add_stage(FnStage::new("Append", |s: String, _: &RunContext| {
            Ok(format!("{s}123"))
        }))
        .add_stage(FnStage::new("Len", |s: String, _: &RunContext| Ok(s.len())))
        .build();

    c.bench_function("sync_three_stage", |b| {
        b.iter(|| pipeline.execute(black_box("benchmark input".to_string())));
    });

    let rt = tokio::runtime::Runtime::new().unwrap();
    let async_pipeline = AsyncPipelineBuilder::new("bench-async", rt.handle().clone())
        .add_stage(Blocking(FnStage::new("Upper", |s: String, _: &RunContext| {
            Ok(s.to_uppercase())
        })))
        .build();

    c.bench_function("async_single_stage", |b| {
        b.iter(|| async_pipeline.execute(black_box("benchmark input".to_string())));
    });
}

criterion_group!(benches, pipeline_benchmark);
criterion_main!(benches);
