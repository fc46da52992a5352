use criterion::Criterion;
use rand::{rngs::StdRng, SeedableRng};
use seviper::Mlp;

fn bench_forward(bench: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(7);
    let mlp = Mlp::new(5, vec![5, 5, 3], &mut rng);
    let input = [3., 7., 2., 11., 14.];

    bench.bench_function("mlp-forward", |b| b.iter(|| mlp.forward(&input).unwrap()));
}

fn main() {
    let mut criterion = Criterion::default().configure_from_args();
    bench_forward(&mut criterion);
    criterion.final_summary();
}
