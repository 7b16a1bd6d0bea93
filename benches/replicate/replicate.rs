use criterion::{criterion_group, criterion_main, Criterion};
use viral_load_abm::parameters::Params;
use viral_load_abm::simulation::run_replicate;

pub fn criterion_benchmark(c: &mut Criterion) {
    let model = Params::default()
        .validate()
        .expect("default parameters are valid");
    c.bench_function("replicate with default parameters", |bencher| {
        bencher.iter_with_large_drop(|| run_replicate(&model, 42).expect("replicate failed"));
    });
}

criterion_group!(replicate_benches, criterion_benchmark);
criterion_main!(replicate_benches);
