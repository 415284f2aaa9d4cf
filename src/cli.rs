// ============================================================================
// ScratchFE CLI — headless session replay via command-line arguments
// ============================================================================
//
// Usage examples:
//   scratchfe --level cards/garden.json --trace traces/quickwin.json
//   scratchfe -l garden.json -t "traces/*.json" --summary-only
//   scratchfe --level garden.json                 (validate + static summary)
//
// Each trace file replays against a fresh session built from the level.
// All processing runs synchronously on the current thread.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use serde::Deserialize;

use crate::level::{load_level, LevelData};
use crate::session::ScratchSession;

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// ScratchFE headless session runner.
///
/// Replay pointer traces against a level file and print the resulting
/// event stream, no front-end required.
#[derive(Parser, Debug)]
#[command(
    name = "scratchfe",
    about = "ScratchFE headless scratch-card session runner",
    long_about = "Replay recorded pointer traces against a level file and print the\n\
                  event stream a front-end would react to, plus a per-session\n\
                  summary (outcome, score, coverage).\n\n\
                  Example:\n  \
                  scratchfe --level garden.json --trace traces/quickwin.json\n  \
                  scratchfe -l garden.json -t \"traces/*.json\" --summary-only"
)]
pub struct CliArgs {
    /// Level JSON file describing the overlay, brushes, regions, and
    /// scoring/timer configuration.
    #[arg(short, long, value_name = "LEVEL.json")]
    pub level: PathBuf,

    /// Pointer-trace JSON file(s). Glob patterns accepted (e.g.
    /// "traces/*.json"). Each trace runs a fresh session. With no trace
    /// the level is only validated and summarised.
    #[arg(short, long, value_name = "TRACE.json", num_args = 0..)]
    pub trace: Vec<String>,

    /// Suppress the per-tick event stream, print summaries only.
    #[arg(long)]
    pub summary_only: bool,

    /// Mirror the session log to stderr and print per-trace timing.
    #[arg(short, long)]
    pub verbose: bool,
}

// ============================================================================
// Trace format
// ============================================================================

/// A store purchase injected between ticks.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
enum TraceAction {
    Shield { cost: i32 },
    Doubler { cost: i32, factor: f32, duration: f32 },
    Time { cost: i32, delta: f32 },
    EndSession,
}

/// One tick of recorded input.
#[derive(Debug, Clone, Deserialize)]
struct TraceStep {
    #[serde(default = "default_dt")]
    dt: f32,
    #[serde(default)]
    x: f32,
    #[serde(default)]
    y: f32,
    #[serde(default)]
    active: bool,
    /// Optional brush switch, applied before the sample.
    #[serde(default)]
    brush: Option<usize>,
    #[serde(default)]
    action: Option<TraceAction>,
}

fn default_dt() -> f32 {
    1.0 / 60.0
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run all CLI processing and return an OS exit code.
/// `0` = every input loaded and replayed, `1` = one or more files failed.
pub fn run(args: CliArgs) -> ExitCode {
    crate::logger::set_mirror_stderr(args.verbose);

    let level = match load_level(&args.level) {
        Ok(level) => level,
        Err(e) => {
            eprintln!("error: level {}: {}", args.level.display(), e);
            return ExitCode::FAILURE;
        }
    };
    let base_dir = args
        .level
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let traces = resolve_inputs(&args.trace);
    if args.trace.is_empty() {
        print_level_summary(&level);
        return ExitCode::SUCCESS;
    }
    if traces.is_empty() {
        eprintln!("error: no trace files matched the given pattern(s).");
        return ExitCode::FAILURE;
    }

    let mut any_failed = false;
    for trace_path in &traces {
        let started = Instant::now();
        match replay_trace(&level, &base_dir, trace_path, args.summary_only) {
            Ok(summary) => {
                println!("{}: {}", trace_path.display(), summary);
                if args.verbose {
                    println!("  ({} steps in {:.1?})", summary.steps, started.elapsed());
                }
            }
            Err(e) => {
                eprintln!("error: {}: {}", trace_path.display(), e);
                any_failed = true;
            }
        }
    }

    if any_failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

// ============================================================================
// Replay
// ============================================================================

struct SessionSummary {
    steps: usize,
    ticks: u64,
    score: i32,
    outcome: String,
    coverage: f32,
    regions_cleared: usize,
    regions_total: usize,
}

impl std::fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} | score {} | {}/{} regions | {:.0}% scratched | {} ticks",
            self.outcome,
            self.score,
            self.regions_cleared,
            self.regions_total,
            self.coverage * 100.0,
            self.ticks
        )
    }
}

fn replay_trace(
    level: &LevelData,
    base_dir: &Path,
    trace_path: &Path,
    summary_only: bool,
) -> Result<SessionSummary, String> {
    let raw = std::fs::read_to_string(trace_path)
        .map_err(|e| format!("read failed: {}", e))?;
    let steps: Vec<TraceStep> =
        serde_json::from_str(&raw).map_err(|e| format!("parse failed: {}", e))?;

    let mut session =
        ScratchSession::from_level(level, base_dir).map_err(|e| e.to_string())?;

    for step in &steps {
        if let Some(brush) = step.brush {
            session.select_brush(brush);
        }
        match step.action {
            Some(TraceAction::Shield { cost }) => session.buy_shield(cost),
            Some(TraceAction::Doubler { cost, factor, duration }) => {
                session.buy_doubler(cost, factor, duration)
            }
            Some(TraceAction::Time { cost, delta }) => session.buy_time(cost, delta),
            Some(TraceAction::EndSession) => session.request_end(),
            None => {}
        }
        session.pointer_sample(step.x, step.y, step.active);
        session.update(step.dt);

        if !summary_only {
            for event in session.take_events() {
                println!("  [tick {:>5}] {}", session.current_tick(), event);
            }
        }
    }
    // Leftover events still count for the summary pass.
    session.take_events();

    let coverage = session.buffer().coverage(level.alpha_threshold);
    Ok(SessionSummary {
        steps: steps.len(),
        ticks: session.current_tick(),
        score: session.score(),
        outcome: session
            .outcome()
            .map(|o| o.label().to_string())
            .unwrap_or_else(|| "unresolved".to_string()),
        coverage,
        regions_cleared: session.tracker().cleared_count(),
        regions_total: session.tracker().total_count(),
    })
}

fn print_level_summary(level: &LevelData) {
    println!(
        "level '{}': {}x{} buffer, {} brush(es), {} region(s)",
        level.name,
        level.buffer.width,
        level.buffer.height,
        level.brushes.len(),
        level.regions.len()
    );
    println!(
        "  score threshold {} | timer {:.0}s / cap {:.0}s | clear ratio {:.0}% at alpha <= {}",
        level.score_threshold,
        level.timer_start,
        level.timer_cap,
        level.required_ratio * 100.0,
        level.alpha_threshold
    );
}

// ============================================================================
// Input resolution
// ============================================================================

/// Expand glob patterns / literal paths into concrete files.
/// Literal paths pass through even when the file is missing, so the error
/// surfaces at read time with a useful message.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for pattern in patterns {
        let looks_like_glob = pattern.contains('*') || pattern.contains('?') || pattern.contains('[');
        if looks_like_glob {
            match glob::glob(pattern) {
                Ok(paths) => {
                    for entry in paths.flatten() {
                        if entry.is_file() {
                            files.push(entry);
                        }
                    }
                }
                Err(e) => eprintln!("warning: bad pattern '{}': {}", pattern, e),
            }
        } else {
            files.push(PathBuf::from(pattern));
        }
    }
    files
}
