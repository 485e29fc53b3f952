// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses arguments with clap and routes each subcommand to its
// Layer 2 use case. Results are printed here and nowhere else.
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, PipelineArgs, PredictArgs};

use crate::application::{
    config::PipelineConfig,
    evaluate_use_case::{EvaluateUseCase, EvaluationReport},
    predict_use_case::PredictUseCase,
    train_use_case::TrainUseCase,
};

#[derive(Parser, Debug)]
#[command(
    name = "quake-forecast",
    version,
    about = "Train a BiLSTM + attention model on an earthquake catalogue and predict magnitudes."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// This keeps the CLI layer thin — it only routes, never computes.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)    => run_train(args),
            Commands::Evaluate(args) => run_evaluate(args),
            Commands::Run(args)      => {
                run_train(args.clone())?;
                run_evaluate(args)
            }
            Commands::Predict(args)  => run_predict(args),
        }
    }
}

fn run_train(args: PipelineArgs) -> Result<()> {
    let cfg: PipelineConfig = args.into();
    tracing::info!("Starting training on '{}'", cfg.data_path.display());

    let summary = TrainUseCase::new(cfg).execute()?;
    println!(
        "Training complete. {} epochs, final loss {:.4}, lr {:.6}. Checkpoint: {}",
        summary.epochs_completed,
        summary.final_loss,
        summary.final_lr,
        summary.checkpoint.display(),
    );
    Ok(())
}

fn run_evaluate(args: PipelineArgs) -> Result<()> {
    let report = EvaluateUseCase::new(args.into()).execute()?;
    print_report(&report);
    Ok(())
}

fn run_predict(args: PredictArgs) -> Result<()> {
    let magnitude = PredictUseCase::new(args.pipeline.into(), args.events).execute()?;
    println!("\nPredicted magnitude: {magnitude:.2}");
    Ok(())
}

fn print_report(report: &EvaluationReport) {
    let fmt = |v: Option<f64>| v.map_or_else(|| "n/a".to_string(), |x| format!("{x:.4}"));
    for (label, m) in [("all", &report.overall), ("high-magnitude", &report.high_magnitude)] {
        println!(
            "{:<15} n={:<6} MAE={} MSE={} RMSE={} loss={}",
            label,
            m.sample_count,
            fmt(m.mean_absolute_error),
            fmt(m.mean_squared_error),
            fmt(m.root_mean_squared_error),
            fmt(m.magnitude_aware_loss),
        );
    }
}
