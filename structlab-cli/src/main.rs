//! StructLab CLI: run configs and one-off scans.
//!
//! Commands:
//! - `run`: execute every timeframe in a TOML run config and save artifacts
//! - `scan`: run one timeframe from a CSV (or synthetic bars) with its preset
//!
//! Logging goes to stderr through `tracing`; set `RUST_LOG` to adjust.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use structlab_core::domain::Timeframe;
use structlab_core::risk::AccountStatus;
use structlab_runner::export::{export_json, save_artifacts};
use structlab_runner::{
    run, AccountConfig, RunConfig, RunResult, RunSection, TimeframeConfig, TimeframeResult,
};

#[derive(Parser)]
#[command(
    name = "structlab",
    about = "StructLab CLI: market structure and confluence research"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a TOML run config.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Output directory for artifacts. Overrides `run.output_dir`.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Scan a single timeframe with its preset profile.
    Scan {
        /// CSV bar file.
        #[arg(long, required_unless_present = "synthetic", conflicts_with = "synthetic")]
        bars: Option<PathBuf>,

        /// Timeframe of the bars: M5, M15, H1, H4 or D1.
        #[arg(long)]
        timeframe: Timeframe,

        /// Generate this many seeded synthetic bars instead of reading a CSV.
        #[arg(long)]
        synthetic: Option<usize>,

        /// CSV bars of the next higher timeframe, for regime matching.
        #[arg(long)]
        htf_bars: Option<PathBuf>,

        #[arg(long, default_value_t = 0)]
        seed: u64,

        #[arg(long, default_value_t = 10_000.0)]
        equity: f64,

        #[arg(long, value_enum, default_value_t = StatusArg::Baseline)]
        status: StatusArg,

        /// Print the full result as JSON instead of a summary.
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Save artifacts here as well.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum StatusArg {
    Profit,
    Baseline,
    Drawdown,
}

impl From<StatusArg> for AccountStatus {
    fn from(s: StatusArg) -> Self {
        match s {
            StatusArg::Profit => AccountStatus::Profit,
            StatusArg::Baseline => AccountStatus::Baseline,
            StatusArg::Drawdown => AccountStatus::Drawdown,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("structlab_runner=info".parse()?)
                .add_directive("structlab_core=warn".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, output_dir } => run_cmd(config, output_dir),
        Commands::Scan {
            bars,
            timeframe,
            synthetic,
            htf_bars,
            seed,
            equity,
            status,
            json,
            output_dir,
        } => {
            let config = scan_config(
                bars,
                timeframe,
                synthetic,
                htf_bars,
                seed,
                AccountConfig {
                    equity,
                    status: status.into(),
                    drawdown_pct: 0.0,
                },
            )?;
            scan_cmd(&config, timeframe, json, output_dir)
        }
    }
}

fn run_cmd(config_path: PathBuf, output_dir: Option<PathBuf>) -> Result<()> {
    let config = RunConfig::from_file(&config_path)
        .with_context(|| format!("failed to load config {}", config_path.display()))?;
    let result = run(&config).context("run failed")?;

    print_summary(&result);

    let output_dir = output_dir
        .or_else(|| config.run.output_dir.clone())
        .unwrap_or_else(|| PathBuf::from("results"));
    let run_dir = save_artifacts(&result, &output_dir)?;
    println!("Artifacts saved to: {}", run_dir.display());
    Ok(())
}

/// Build a one-timeframe config (plus an optional HTF entry) for `scan`.
fn scan_config(
    bars: Option<PathBuf>,
    timeframe: Timeframe,
    synthetic: Option<usize>,
    htf_bars: Option<PathBuf>,
    seed: u64,
    account: AccountConfig,
) -> Result<RunConfig> {
    let mut timeframes = vec![TimeframeConfig {
        timeframe,
        bars,
        synthetic,
        overrides: None,
    }];
    if let Some(path) = htf_bars {
        let Some(higher) = timeframe.higher() else {
            bail!("{timeframe} has no higher timeframe; drop --htf-bars");
        };
        timeframes.push(TimeframeConfig {
            timeframe: higher,
            bars: Some(path),
            synthetic: None,
            overrides: None,
        });
    }

    let config = RunConfig {
        run: RunSection {
            name: format!("scan-{timeframe}"),
            seed,
            output_dir: None,
        },
        account,
        timeframes,
    };
    config.validate()?;
    Ok(config)
}

fn scan_cmd(
    config: &RunConfig,
    timeframe: Timeframe,
    json: bool,
    output_dir: Option<PathBuf>,
) -> Result<()> {
    let result = run(config).context("scan failed")?;

    if json {
        println!("{}", export_json(&result)?);
    } else {
        print_summary(&result);
        if let Some(tf) = result.timeframe(timeframe) {
            print_trades(tf);
        }
    }

    if let Some(dir) = output_dir {
        let run_dir = save_artifacts(&result, &dir)?;
        eprintln!("Artifacts saved to: {}", run_dir.display());
    }
    Ok(())
}

fn print_summary(result: &RunResult) {
    println!();
    println!("=== {} ===", result.name);
    println!("Run ID:  {}", result.run_id);
    println!(
        "Account: {:.2} ({:?}, drawdown {:.1}%)",
        result.account.equity,
        result.account.status,
        result.account.drawdown_pct * 100.0
    );
    if result.has_synthetic {
        println!("WARNING: results include SYNTHETIC data");
    }
    println!();
    println!(
        "{:<4} {:>7} {:>5} {:>6} {:>6} {:>7} {:>8} {:>8} {:>7}  Gate",
        "TF", "Bars", "HTF", "Cands", "Acc", "Trades", "WinRate", "Exp(R)", "PF"
    );
    for tf in &result.timeframes {
        let s = &tf.stats;
        println!(
            "{:<4} {:>7} {:>5} {:>6} {:>6} {:>7} {:>7.1}% {:>8.2} {:>7.2}  {}",
            tf.timeframe.as_str(),
            tf.bar_count,
            tf.htf.map_or("-", |h| h.as_str()),
            tf.candidates,
            tf.accepted,
            s.trade_count,
            s.win_rate * 100.0,
            s.expectancy_r,
            s.profit_factor,
            if tf.verdict.passed { "pass" } else { "fail" },
        );
        for reason in &tf.verdict.reasons {
            println!("       - {reason}");
        }
        if tf.liquidity_fallback {
            println!("       - liquidity threshold relaxed over the whole series");
        }
    }
    println!();
}

fn print_trades(tf: &TimeframeResult) {
    if tf.trades.is_empty() {
        println!("No trades.");
        return;
    }
    println!(
        "{:<25} {:<5} {:>10} {:>10} {:<13} {:>6} {:>8}",
        "Entry", "Side", "Entry Px", "Exit Px", "Exit", "Lots", "R"
    );
    for t in &tf.trades {
        println!(
            "{:<25} {:<5} {:>10.2} {:>10.2} {:<13} {:>6.2} {:>8.2}",
            t.entry_time.format("%Y-%m-%d %H:%M").to_string(),
            format!("{:?}", t.side),
            t.entry_price,
            t.exit_price,
            format!("{:?}", t.exit_reason),
            t.lot_size,
            t.reward_r,
        );
    }
}
