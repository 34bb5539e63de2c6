//! Churn pipeline CLI module
//!
//! Command-line interface for cleaning, training, evaluation, and prediction.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::PipelineConfig;
use crate::inference::{predict_new, run_evaluation, save_results};
use crate::preprocessing::DataCleaner;
use crate::training::train_model;

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn line_box_top()    { println!("  {}", dim("┌─────────────────────────────────────────────────────────┐")); }
fn line_box_bottom() { println!("  {}", dim("└─────────────────────────────────────────────────────────┘")); }
fn line_box_sep()    { println!("  {}", dim("├─────────────────────────────────────────────────────────┤")); }

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let pad = W.saturating_sub(visible_len);
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn line_box_center(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let total_pad = W.saturating_sub(visible_len);
    let left = total_pad / 2;
    let right = total_pad - left;
    println!("  {}  {}{}{} {}", dim("│"), " ".repeat(left), content, " ".repeat(right), dim("│"));
}

fn line_box_empty() { line_box(""); }

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' { in_escape = true; continue; }
        if in_escape { if c == 'm' { in_escape = false; } continue; }
        out.push(c);
    }
    out
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(key), val.white())
}

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "churn")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Customer churn pipeline: clean, train, evaluate, predict")]
#[command(long_about = None)]
pub struct Cli {
    /// JSON configuration file (defaults are used for missing keys)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Drop identifier columns, label-encode categories, write the cleaned CSV
    Clean {
        /// Raw customer CSV
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Cleaned CSV output
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Fit scaler → SMOTE → random forest and save the model
    Train {
        /// Cleaned CSV
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Output model file
        #[arg(short, long)]
        model: Option<PathBuf>,
    },

    /// Score the cleaned dataset, print metrics, save predictions
    Evaluate {
        /// Cleaned CSV
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Trained model file
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// Predictions CSV output
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Only score the rows held out by the training split
        #[arg(long)]
        holdout: bool,
    },

    /// Make predictions on new data using a trained model
    Predict {
        /// Input data file
        #[arg(short, long)]
        data: PathBuf,

        /// Trained model file
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// Output predictions file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Configuration from `--config`, or the built-in defaults
pub fn resolve_config(path: Option<&Path>) -> anyhow::Result<PipelineConfig> {
    let config = match path {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_clean(config: &PipelineConfig, input: Option<&Path>, output: Option<&Path>) -> anyhow::Result<()> {
    let input = input.unwrap_or(config.paths.raw_data.as_path());
    let output = output.unwrap_or(config.paths.clean_data.as_path());

    section("Clean");

    step_run(&format!("Cleaning {}", input.display()));
    let start = Instant::now();
    let cleaned = DataCleaner::new(&config.cleaning)
        .with_encoder_path(&config.paths.encoder)
        .clean_file(input, output)?;
    step_done(&format!(
        "{} rows × {} cols in {:?}",
        cleaned.cleaned.height(),
        cleaned.cleaned.width(),
        start.elapsed()
    ));

    step_ok(&format!("Clean data → {}", cleaned.output_path.display()));
    step_ok(&format!("Label encoding → {}", config.paths.encoder.display()));

    println!();
    println!("  {:<20} {}", muted("Column"), muted("Categories"));
    println!("  {}", dim(&"─".repeat(46)));
    for column in cleaned.encoder.columns() {
        let n = cleaned.encoder.encoding(column).map(|e| e.classes.len()).unwrap_or(0);
        println!("  {:<20} {}", column, n);
    }
    println!();

    Ok(())
}

pub fn cmd_train(config: &PipelineConfig, data: Option<&Path>, model: Option<&Path>) -> anyhow::Result<()> {
    let data = data.unwrap_or(config.paths.clean_data.as_path());
    let model = model.unwrap_or(config.paths.model.as_path());

    section("Train");

    step_run(&format!(
        "Training random forest ({} trees)",
        config.training.n_estimators.to_string().cyan()
    ));
    let summary = train_model(data, model, config)?;
    step_done(&format!("{:.2}s", summary.duration_secs));

    println!();
    println!("  {:<16} {}", muted("Train rows"), summary.n_train.to_string().white());
    println!("  {:<16} {}", muted("Held out"), summary.n_test.to_string().white());
    println!("  {:<16} {}", muted("Synthetic"), summary.n_synthetic.to_string().white());
    println!("  {:<16} {}", muted("Features"), summary.n_features.to_string().white());

    section("Top features");
    for (name, importance) in summary.feature_importances.iter().take(5) {
        println!("  {:<24} {}", name, format!("{:.4}", importance).white().bold());
    }

    println!();
    step_ok(&format!("Model → {}", summary.model_path.display()));
    println!();

    Ok(())
}

pub fn cmd_evaluate(
    config: &PipelineConfig,
    data: Option<&Path>,
    model: Option<&Path>,
    output: Option<&Path>,
    holdout: bool,
) -> anyhow::Result<()> {
    let mut config = config.clone();
    if let Some(data) = data {
        config.paths.clean_data = data.to_path_buf();
    }
    if let Some(model) = model {
        config.paths.model = model.to_path_buf();
    }
    if let Some(output) = output {
        config.paths.predictions = output.to_path_buf();
    }

    section(if holdout { "Evaluate (held-out rows)" } else { "Evaluate" });
    println!();

    let run = run_evaluation(&config, holdout)?;

    println!();
    line_box_top();
    line_box_empty();
    line_box_center(&format!("{}", "Churn model".white().bold()));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box(&kv("Rows     ", &run.results.height().to_string()));
    line_box(&kv("Accuracy ", &format!("{:.3}", run.evaluation.report.accuracy)));
    line_box(&kv("ROC-AUC  ", &format!("{:.3}", run.evaluation.roc_auc)));
    line_box(&kv("Output   ", &config.paths.predictions.display().to_string()));
    line_box_empty();
    line_box_bottom();
    println!();

    Ok(())
}

pub fn cmd_predict(
    config: &PipelineConfig,
    data: &Path,
    model: Option<&Path>,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let model = model.unwrap_or(config.paths.model.as_path());

    section("Predict");

    let start = Instant::now();
    let mut results = predict_new(data, model)?;
    println!();
    step_ok(&format!("{} rows scored in {:?}", results.height(), start.elapsed()));

    if let Some(output) = output {
        step_run(&format!("Saving → {}", output.display()));
        save_results(&mut results, output)?;
        step_done(&format!("{} rows × {} cols", results.height(), results.width()));
    }

    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_parses() {
        let cli = Cli::try_parse_from(["churn"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_evaluate_flags() {
        let cli = Cli::try_parse_from(["churn", "evaluate", "--holdout", "--config", "cfg.json"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("cfg.json")));
        match cli.command {
            Some(Commands::Evaluate { holdout, data, .. }) => {
                assert!(holdout);
                assert!(data.is_none());
            }
            _ => panic!("expected evaluate"),
        }
    }

    #[test]
    fn test_predict_requires_data() {
        assert!(Cli::try_parse_from(["churn", "predict"]).is_err());
    }

    #[test]
    fn test_strip_ansi() {
        let styled = format!("{}", "abc".red());
        assert_eq!(strip_ansi(&styled), "abc");
    }
}
