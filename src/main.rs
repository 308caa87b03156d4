//! Diagnostic CLI over tournament splitters.
//!
//! # Usage
//!
//! ```bash
//! # Rows, eras and regions of a dataset
//! numerox-split summary --data numerai_training_data.parquet
//!
//! # Fold report for one strategy
//! numerox-split split --data train.parquet --strategy cv --kfold 5
//! numerox-split split --data train.parquet --strategy roll --fit-window 15 --predict-window 10 --step 15
//!
//! # Check every strategy in a JSON plan (or every default strategy)
//! numerox-split audit --data train.parquet --plan plan.json
//! ```

use std::fs;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::warn;

use numerox_split::splitter::strategy::{
    DEFAULT_FIT_FRACTION, DEFAULT_FIT_WINDOW, DEFAULT_KFOLD, DEFAULT_PREDICT_WINDOW, DEFAULT_STEP,
};
use numerox_split::{Data, DataLoader, SplitStrategy, Splitter, Tournament};

#[derive(Parser)]
#[command(name = "numerox-split")]
#[command(about = "Era-aware fit/predict splits for tournament data")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize a dataset
    Summary {
        /// Path to a parquet or csv dataset
        #[arg(short, long)]
        data: String,
    },

    /// Print the fold report of one strategy
    Split {
        /// Path to a parquet or csv dataset
        #[arg(short, long)]
        data: String,

        #[command(flatten)]
        strategy: StrategyArgs,
    },

    /// Audit strategies for overlapping folds
    Audit {
        /// Path to a parquet or csv dataset
        #[arg(short, long)]
        data: String,

        /// JSON file holding a list of strategies (defaults to every strategy)
        #[arg(short, long)]
        plan: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyKind {
    Tournament,
    Flip,
    Validation,
    Cheat,
    Cv,
    Loocv,
    IgnoreEraCv,
    Fraction,
    ConsecutiveCv,
    Roll,
}

#[derive(Args)]
struct StrategyArgs {
    /// Partition strategy
    #[arg(short, long, value_enum)]
    strategy: StrategyKind,

    /// Number of folds for k-fold strategies
    #[arg(long, default_value_t = DEFAULT_KFOLD)]
    kfold: usize,

    /// Share of eras to fit on
    #[arg(long, default_value_t = DEFAULT_FIT_FRACTION)]
    fit_fraction: f64,

    /// Eras per fit window
    #[arg(long, default_value_t = DEFAULT_FIT_WINDOW)]
    fit_window: usize,

    /// Eras per predict window
    #[arg(long, default_value_t = DEFAULT_PREDICT_WINDOW)]
    predict_window: usize,

    /// Eras to advance between windows
    #[arg(long, default_value_t = DEFAULT_STEP)]
    step: usize,

    /// Tournament number or name
    #[arg(long, default_value = "1")]
    tournament: String,

    /// Partition every region instead of train only
    #[arg(long)]
    all_rows: bool,
}

impl StrategyArgs {
    fn to_strategy(&self) -> Result<SplitStrategy> {
        let train_only = !self.all_rows;
        let strategy = match self.strategy {
            StrategyKind::Tournament => SplitStrategy::Tournament,
            StrategyKind::Flip => SplitStrategy::Flip,
            StrategyKind::Validation => SplitStrategy::Validation,
            StrategyKind::Cheat => SplitStrategy::Cheat,
            StrategyKind::Cv => SplitStrategy::Cv {
                kfold: self.kfold,
                train_only,
            },
            StrategyKind::Loocv => SplitStrategy::Loocv { train_only },
            StrategyKind::IgnoreEraCv => SplitStrategy::IgnoreEraCv {
                kfold: self.kfold,
                tournament: self
                    .tournament
                    .parse::<Tournament>()
                    .context("Invalid tournament")?,
                train_only,
            },
            StrategyKind::Fraction => SplitStrategy::Fraction {
                fit_fraction: self.fit_fraction,
                train_only,
            },
            StrategyKind::ConsecutiveCv => SplitStrategy::ConsecutiveCv {
                kfold: self.kfold,
                train_only,
            },
            StrategyKind::Roll => SplitStrategy::Roll {
                fit_window: self.fit_window,
                predict_window: self.predict_window,
                step: self.step,
                train_only,
            },
        };
        Ok(strategy)
    }
}

fn load(path: &str) -> Result<Data> {
    DataLoader::new(path)
        .load()
        .with_context(|| format!("Failed to load dataset {}", path))
}

fn load_plan(path: &str) -> Result<Vec<SplitStrategy>> {
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid strategy plan {}", path))
}

fn cmd_summary(path: &str) -> Result<()> {
    let data = load(path)?;
    println!("{}", serde_json::to_string_pretty(&data.summary())?);
    Ok(())
}

fn cmd_split(path: &str, args: &StrategyArgs) -> Result<()> {
    let strategy = args.to_strategy()?;
    let splitter = Splitter::new(load(path)?, strategy)?;
    println!("{}", serde_json::to_string_pretty(&splitter.report())?);
    Ok(())
}

fn cmd_audit(path: &str, plan: Option<&str>) -> Result<()> {
    let data = load(path)?;
    let strategies = match plan {
        Some(plan) => load_plan(plan)?,
        None => SplitStrategy::catalog(),
    };

    let mut failures = 0;
    for strategy in strategies {
        let label = strategy.to_string();
        match Splitter::new(data.clone(), strategy).and_then(|s| s.audit()) {
            Ok(report) => println!(
                "{:<60} ok    folds={:<4} predicted={}",
                label, report.fold_count, report.predict_rows
            ),
            Err(e) => {
                failures += 1;
                warn!("{} failed: {}", label, e);
                println!("{:<60} FAIL  {}", label, e);
            }
        }
    }

    if failures > 0 {
        bail!("{} strategies failed the audit", failures);
    }
    Ok(())
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("numerox_split=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Summary { data } => cmd_summary(&data)?,
        Commands::Split { data, strategy } => cmd_split(&data, &strategy)?,
        Commands::Audit { data, plan } => cmd_audit(&data, plan.as_deref())?,
    }

    Ok(())
}
