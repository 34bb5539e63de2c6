//! Shared fixtures for the integration tests

#![allow(dead_code)]

use churn_pipeline::config::{PathsConfig, PipelineConfig, TrainingConfig};
use churn_pipeline::utils::DataSaver;
use polars::prelude::*;
use std::path::Path;

/// 100 customers, 30 of whom churn. Churners have short tenure and
/// month-to-month contracts, so the classes are learnable.
pub fn raw_customers() -> DataFrame {
    let n = 100;
    let mut ids = Vec::with_capacity(n);
    let mut gender = Vec::with_capacity(n);
    let mut tenure = Vec::with_capacity(n);
    let mut contract = Vec::with_capacity(n);
    let mut monthly = Vec::with_capacity(n);
    let mut total = Vec::with_capacity(n);
    let mut churn = Vec::with_capacity(n);

    for i in 0..n {
        let churned = i % 10 < 3;
        ids.push(format!("{:04}-CUST", i));
        gender.push(if i % 2 == 0 { "Female" } else { "Male" });
        let months = if churned { 1 + (i % 7) as i64 } else { 12 + (i % 50) as i64 };
        tenure.push(months);
        contract.push(match (churned, i % 3) {
            (true, _) => "Month-to-month",
            (false, 0) => "One year",
            (false, 1) => "Two year",
            (false, _) => "Month-to-month",
        });
        let charge = if churned { 80.0 + (i % 9) as f64 } else { 40.0 + (i % 17) as f64 };
        monthly.push(charge);
        total.push(if i == 5 { " ".to_string() } else { format!("{:.2}", charge * months as f64) });
        churn.push(if churned { "Yes" } else { "No" });
    }

    df!(
        "customerID" => ids,
        "gender" => gender,
        "tenure" => tenure,
        "Contract" => contract,
        "MonthlyCharges" => monthly,
        "TotalCharges" => total,
        "Churn" => churn
    )
    .unwrap()
}

/// Configuration whose paths all live under `dir`, with a small forest
pub fn config_in(dir: &Path) -> PipelineConfig {
    let paths = PathsConfig {
        raw_data: dir.join("raw").join("customer_churn.csv"),
        clean_data: dir.join("processed").join("clean_data.csv"),
        encoder: dir.join("processed").join("label_encoding.json"),
        model: dir.join("models").join("random_forest_churn.bin"),
        predictions: dir.join("predictions").join("churn_predictions.csv"),
    };
    PipelineConfig::new()
        .with_paths(paths)
        .with_training(TrainingConfig::new().with_n_estimators(25))
}

/// Write the raw fixture to the configured raw path
pub fn write_raw(config: &PipelineConfig) {
    DataSaver::save_csv(&mut raw_customers(), &config.paths.raw_data).unwrap();
}

pub fn i64_column(df: &DataFrame, name: &str) -> Vec<i64> {
    df.column(name)
        .unwrap()
        .as_materialized_series()
        .cast(&DataType::Int64)
        .unwrap()
        .i64()
        .unwrap()
        .into_iter()
        .map(|v| v.unwrap())
        .collect()
}

pub fn f64_column(df: &DataFrame, name: &str) -> Vec<f64> {
    df.column(name)
        .unwrap()
        .as_materialized_series()
        .cast(&DataType::Float64)
        .unwrap()
        .f64()
        .unwrap()
        .into_iter()
        .map(|v| v.unwrap())
        .collect()
}
