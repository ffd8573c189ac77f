use criterion::{
    BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main,
};
use hlsfuzz_backend::HlsCppBackend;
use hlsfuzz_gen::{BuilderConfig, RandomGraphBuilder};

fn build_and_lower_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate");
    for actions in [100usize, 400, 1600] {
        group.bench_with_input(
            BenchmarkId::from_parameter(actions),
            &actions,
            |b, &actions| {
                b.iter_batched(
                    || BuilderConfig {
                        actions,
                        ..BuilderConfig::default()
                    },
                    |config| {
                        let graph = RandomGraphBuilder::new(config, 42)
                            .unwrap()
                            .build()
                            .unwrap();
                        HlsCppBackend::default().render(&graph).unwrap()
                    },
                    BatchSize::SmallInput,
                )
            },
        );
    }
    group.finish();
}

criterion_group! {
    name = generate;
    config = Criterion::default().sample_size(20);
    targets = build_and_lower_bench
}
criterion_main!(generate);
