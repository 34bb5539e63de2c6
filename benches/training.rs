use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use churn_pipeline::prelude::*;
use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

fn create_churn_data(n_rows: usize, n_features: usize) -> (Array2<f64>, Array1<i64>) {
    let mut rng = ChaCha8Rng::seed_from_u64(7);

    let x = Array2::from_shape_fn((n_rows, n_features), |_| rng.gen::<f64>() * 10.0);
    // Roughly a quarter churn, driven by the first two features
    let y = x
        .rows()
        .into_iter()
        .map(|row| i64::from(row[0] + row[1] < 7.0))
        .collect();

    (x, y)
}

fn bench_forest_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("forest_fit");
    group.sample_size(10); // Fewer samples for training benchmarks

    for n_rows in [1000, 5000].iter() {
        let data = create_churn_data(*n_rows, 19);

        group.bench_with_input(BenchmarkId::new("fit", n_rows), &data, |b, (x, y)| {
            b.iter(|| {
                let mut forest = RandomForest::new(50)
                    .with_class_weight(ClassWeight::Balanced)
                    .with_random_state(42);
                forest.fit(black_box(x), black_box(y)).unwrap()
            })
        });
    }

    group.finish();
}

fn bench_pipeline_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline_fit");
    group.sample_size(10);

    let (x, y) = create_churn_data(2000, 19);
    let names: Vec<String> = (0..19).map(|i| format!("feature_{}", i)).collect();
    let config = TrainingConfig::default().with_n_estimators(50);

    group.bench_function("scaler_smote_forest", |b| {
        b.iter(|| {
            let mut pipeline = ChurnPipeline::from_config(&config);
            pipeline.fit(black_box(&x), black_box(&y), &names).unwrap()
        })
    });

    group.finish();
}

fn bench_prediction(c: &mut Criterion) {
    let mut group = c.benchmark_group("prediction");

    // Train model once
    let (x, y) = create_churn_data(5000, 19);
    let names: Vec<String> = (0..19).map(|i| format!("feature_{}", i)).collect();
    let mut pipeline = ChurnPipeline::from_config(&TrainingConfig::default().with_n_estimators(100));
    pipeline.fit(&x, &y, &names).unwrap();

    for batch_size in [100, 1000].iter() {
        let (batch, _) = create_churn_data(*batch_size, 19);
        group.bench_with_input(BenchmarkId::new("predict_with_proba", batch_size), &batch, |b, batch| {
            b.iter(|| pipeline.predict_with_proba(black_box(batch)).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_forest_fit, bench_pipeline_fit, bench_prediction);
criterion_main!(benches);
