//! Integration test: splitting, oversampling and forest training

use churn_pipeline::pipeline::ChurnPipeline;
use churn_pipeline::prelude::*;
use churn_pipeline::synthetic::class_counts;
use ndarray::{Array1, Array2};

fn imbalanced(n: usize) -> (Array2<f64>, Array1<i64>) {
    let x = Array2::from_shape_fn((n, 3), |(i, j)| {
        let base = if i % 4 == 0 { 5.0 } else { 0.0 };
        base + ((i * 7 + j * 3) % 11) as f64 / 10.0
    });
    let y = Array1::from_shape_fn(n, |i| i64::from(i % 4 == 0));
    (x, y)
}

#[test]
fn test_split_deterministic_and_stratified() {
    let (x, y) = imbalanced(120);

    let a = split_data(&x, &y, 0.25, 42).unwrap();
    let b = split_data(&x, &y, 0.25, 42).unwrap();
    assert_eq!(a.test_indices, b.test_indices);
    assert_eq!(a.y_train, b.y_train);

    // 30 test rows; quotas 22.5 and 7.5, the tie goes to the lower label
    let test = class_counts(&a.y_test);
    assert_eq!(test[&0], 23);
    assert_eq!(test[&1], 7);

    let other_seed = split_data(&x, &y, 0.25, 43).unwrap();
    assert_ne!(a.test_indices, other_seed.test_indices);
}

#[test]
fn test_smote_then_forest() {
    let (x, y) = imbalanced(80);

    let mut smote = Smote::new().with_seed(42);
    let resampled = smote.fit_resample(&x, &y).unwrap();
    let counts = class_counts(&resampled.y);
    assert_eq!(counts[&0], counts[&1]);

    let mut forest = RandomForest::new(30)
        .with_class_weight(ClassWeight::Balanced)
        .with_random_state(42);
    forest.fit(&resampled.x, &resampled.y).unwrap();

    let predictions = forest.predict(&x).unwrap();
    assert_eq!(predictions, y);
    assert_eq!(forest.feature_importances().unwrap().len(), 3);
}

#[test]
fn test_pipeline_from_default_config() {
    let (x, y) = imbalanced(60);
    let names: Vec<String> = vec!["a".into(), "b".into(), "c".into()];

    let config = TrainingConfig::default().with_n_estimators(20);
    let mut pipeline = ChurnPipeline::from_config(&config);
    let report = pipeline.fit(&x, &y, &names).unwrap();

    assert_eq!(report.n_rows, 60);
    assert_eq!(report.n_synthetic, 30);

    let proba = pipeline.positive_proba(&x).unwrap();
    assert!(proba.iter().all(|p| (0.0..=1.0).contains(p)));
}

#[test]
fn test_oversampling_fails_with_tiny_minority() {
    let x = Array2::from_shape_fn((12, 2), |(i, j)| (i + j) as f64);
    let y = Array1::from_shape_fn(12, |i| i64::from(i < 3));

    let mut pipeline = ChurnPipeline::from_config(&TrainingConfig::default());
    let names: Vec<String> = vec!["a".into(), "b".into()];
    assert!(pipeline.fit(&x, &y, &names).is_err());
}
