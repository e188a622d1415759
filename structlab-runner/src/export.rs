//! Reporting and export: JSON, CSV, and Markdown artifact generation.
//!
//! - **JSON**: full round-trip serialization of a [`RunResult`] with schema
//!   versioning
//! - **CSV**: per-timeframe trade tape and a one-row-per-timeframe summary
//! - **Markdown**: a human-readable run report
//!
//! Unknown (newer) schema versions are rejected on load.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use structlab_core::domain::TradeRecord;

use crate::runner::{RunResult, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `RunResult` to pretty JSON.
pub fn export_json(result: &RunResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize RunResult to JSON")
}

/// Deserialize a `RunResult` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<RunResult> {
    let result: RunResult =
        serde_json::from_str(json).context("failed to deserialize RunResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export a trade list as CSV.
///
/// Columns: side, entry_index, entry_time, entry_price, exit_index,
/// exit_time, exit_price, outcome, exit_reason, lot_size, reward, reward_r,
/// bars_held, mae, mfe
pub fn export_trades_csv(trades: &[TradeRecord]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "side",
        "entry_index",
        "entry_time",
        "entry_price",
        "exit_index",
        "exit_time",
        "exit_price",
        "outcome",
        "exit_reason",
        "lot_size",
        "reward",
        "reward_r",
        "bars_held",
        "mae",
        "mfe",
    ])?;

    for t in trades {
        wtr.write_record([
            &format!("{:?}", t.side),
            &t.entry_index.to_string(),
            &t.entry_time.to_rfc3339(),
            &format!("{:.5}", t.entry_price),
            &t.exit_index.to_string(),
            &t.exit_time.to_rfc3339(),
            &format!("{:.5}", t.exit_price),
            &format!("{:?}", t.outcome),
            &format!("{:?}", t.exit_reason),
            &format!("{:.2}", t.lot_size),
            &format!("{:.2}", t.reward),
            &format!("{:.4}", t.reward_r),
            &t.bars_held.to_string(),
            &format!("{:.5}", t.mae),
            &format!("{:.5}", t.mfe),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// One row per timeframe with the headline numbers.
pub fn export_summary_csv(result: &RunResult) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "timeframe",
        "bars",
        "candidates",
        "accepted",
        "rejected",
        "trades",
        "win_rate",
        "expectancy_r",
        "profit_factor",
        "max_drawdown_r",
        "passed",
        "synthetic",
        "run_id",
    ])?;
    for tf in &result.timeframes {
        let s = &tf.stats;
        wtr.write_record([
            &tf.timeframe.to_string(),
            &tf.bar_count.to_string(),
            &tf.candidates.to_string(),
            &tf.accepted.to_string(),
            &tf.rejected.to_string(),
            &s.trade_count.to_string(),
            &format!("{:.4}", s.win_rate),
            &format!("{:.4}", s.expectancy_r),
            &format!("{:.4}", s.profit_factor),
            &format!("{:.4}", s.max_drawdown_r),
            &tf.verdict.passed.to_string(),
            &tf.synthetic.to_string(),
            &tf.run_id,
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for a run.
///
/// Creates `{name}_{run_id prefix}/` under `output_dir` containing:
/// - `manifest.json`: the full `RunResult`
/// - `summary.csv`: one row per timeframe
/// - `trades_{TF}.csv`: trade tape per timeframe
/// - `report.md`
///
/// The directory name depends only on the config, so re-running the same
/// config overwrites its own artifacts. Returns the directory path.
pub fn save_artifacts(result: &RunResult, output_dir: &Path) -> Result<PathBuf> {
    let prefix = result.run_id.get(..12).unwrap_or(&result.run_id);
    let run_dir = output_dir.join(format!("{}_{}", sanitize(&result.name), prefix));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    write(&run_dir.join("manifest.json"), &export_json(result)?)?;
    write(&run_dir.join("summary.csv"), &export_summary_csv(result)?)?;
    for tf in &result.timeframes {
        let path = run_dir.join(format!("trades_{}.csv", tf.timeframe));
        write(&path, &export_trades_csv(&tf.trades)?)?;
    }
    write(&run_dir.join("report.md"), &generate_report(result))?;

    Ok(run_dir)
}

/// Load a `RunResult` from an artifact directory's manifest.json.
pub fn load_artifacts(dir: &Path) -> Result<RunResult> {
    let manifest_path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("failed to read {}", manifest_path.display()))?;
    import_json(&json)
}

fn write(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

// ─── Markdown report ────────────────────────────────────────────────

pub fn generate_report(result: &RunResult) -> String {
    let mut md = String::with_capacity(2048);

    let _ = writeln!(md, "# Run Report: {}\n", result.name);
    md.push_str("| Field | Value |\n| --- | --- |\n");
    let _ = writeln!(md, "| Run ID | {} |", result.run_id);
    let _ = writeln!(md, "| Seed | {} |", result.seed);
    let _ = writeln!(md, "| Equity | {:.2} |", result.account.equity);
    let _ = writeln!(md, "| Account Status | {:?} |", result.account.status);
    let _ = writeln!(md, "| Drawdown | {:.1}% |", result.account.drawdown_pct * 100.0);
    if result.has_synthetic {
        md.push_str("| Data | **SYNTHETIC** |\n");
    }
    md.push('\n');

    md.push_str("## Timeframes\n\n");
    md.push_str("| TF | Bars | HTF | Candidates | Accepted | Trades | Win Rate | Exp (R) | PF | Max DD (R) | Gate |\n");
    md.push_str("| --- | ---: | --- | ---: | ---: | ---: | ---: | ---: | ---: | ---: | --- |\n");
    for tf in &result.timeframes {
        let s = &tf.stats;
        let _ = writeln!(
            md,
            "| {} | {} | {} | {} | {} | {} | {:.1}% | {:.2} | {:.2} | {:.2} | {} |",
            tf.timeframe,
            tf.bar_count,
            tf.htf.map_or("-", |h| h.as_str()),
            tf.candidates,
            tf.accepted,
            s.trade_count,
            s.win_rate * 100.0,
            s.expectancy_r,
            s.profit_factor,
            s.max_drawdown_r,
            if tf.verdict.passed { "pass" } else { "fail" },
        );
    }
    md.push('\n');

    for tf in &result.timeframes {
        if tf.rejections.is_empty() && tf.verdict.passed && !tf.liquidity_fallback {
            continue;
        }
        let _ = writeln!(md, "### {}\n", tf.timeframe);
        for reason in &tf.verdict.reasons {
            let _ = writeln!(md, "- Gate: {reason}");
        }
        for (kind, count) in &tf.rejections {
            let _ = writeln!(md, "- Rejected ({kind}): {count}");
        }
        if tf.liquidity_fallback {
            md.push_str("- Liquidity threshold relaxed over the whole series\n");
        }
        md.push('\n');
    }

    md
}
