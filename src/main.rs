//! Churn pipeline - Main Entry Point
//!
//! Without a subcommand the binary runs the evaluation: load the cleaned
//! dataset and the trained model, score every row, print the report and a
//! preview, and write the predictions CSV.

use clap::Parser;
use churn_pipeline::cli::{cmd_clean, cmd_evaluate, cmd_predict, cmd_train, resolve_config, Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "churn_pipeline=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = resolve_config(cli.config.as_deref())?;

    match cli.command {
        Some(Commands::Clean { input, output }) => {
            cmd_clean(&config, input.as_deref(), output.as_deref())?;
        }
        Some(Commands::Train { data, model }) => {
            cmd_train(&config, data.as_deref(), model.as_deref())?;
        }
        Some(Commands::Evaluate { data, model, output, holdout }) => {
            cmd_evaluate(&config, data.as_deref(), model.as_deref(), output.as_deref(), holdout)?;
        }
        Some(Commands::Predict { data, model, output }) => {
            cmd_predict(&config, &data, model.as_deref(), output.as_deref())?;
        }
        None => {
            cmd_evaluate(&config, None, None, None, false)?;
        }
    }

    Ok(())
}
