//! `gazepop` CLI: scenario runs, batch evaluation, trace replay, calibration.

mod live;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use gaze_core::{
    calibration::CalibrationSession,
    game_loop::{GameConfig, GameLoop, HitPoint},
    kf::GazeFilter,
    session::SessionResult,
    source::GazeSource,
};
use rayon::prelude::*;
use serde::Serialize;
use sim::replay::{load_trace, save_trace, GazeTrace, RecordingSource, ReplaySource};
use sim::scenarios::{Scenario, ScenarioKind};
use sim::viewer::{Behavior, SimulatedViewer};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "gazepop", about = "Gaze-tracking balloon-pop session runner")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Point that is hit-tested against balloons.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum HitPointArg {
    Predicted,
    Filtered,
}

impl From<HitPointArg> for HitPoint {
    fn from(arg: HitPointArg) -> Self {
        match arg {
            HitPointArg::Predicted => HitPoint::Predicted,
            HitPointArg::Filtered => HitPoint::Filtered,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Play one session against a simulated viewer and print the results.
    RunSession {
        #[arg(value_enum)]
        scenario: ScenarioKind,
        /// Random seed for reproducibility
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Game configuration JSON; missing fields take defaults
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, value_enum)]
        hit_point: Option<HitPointArg>,
        /// Output the session result to a JSON file
        #[arg(long)]
        output: Option<PathBuf>,
        /// Also save the gaze trace for replay
        #[arg(long)]
        save_trace: Option<PathBuf>,
        /// Run on wall-clock timers instead of a virtual clock
        #[arg(long)]
        realtime: bool,
        /// Wall-clock speed-up in real-time mode
        #[arg(long, default_value_t = 1.0)]
        speed: f64,
    },
    /// Play many seeds of one scenario in parallel and summarise.
    Batch {
        #[arg(value_enum)]
        scenario: ScenarioKind,
        /// Number of sessions
        #[arg(long, default_value_t = 32)]
        sessions: u64,
        #[arg(long, default_value_t = 0)]
        first_seed: u64,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, value_enum)]
        hit_point: Option<HitPointArg>,
        /// Output the summary to a JSON file
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Replay a recorded gaze trace and check it reproduces the session.
    Replay {
        /// Path to trace JSON file
        input: PathBuf,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Run the four-point calibration check with a simulated viewer.
    Calibrate {
        #[arg(value_enum)]
        scenario: ScenarioKind,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Observations averaged by the filter per point
        #[arg(long, default_value_t = 30)]
        samples: u64,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::RunSession {
            scenario,
            seed,
            config,
            hit_point,
            output,
            save_trace: trace_path,
            realtime,
            speed,
        } => {
            let cfg = game_config(config.as_deref(), hit_point, seed)?;
            run_session(
                scenario,
                cfg,
                output.as_deref(),
                trace_path.as_deref(),
                realtime.then_some(speed),
            )?;
        }
        Commands::Batch {
            scenario,
            sessions,
            first_seed,
            config,
            hit_point,
            output,
        } => {
            let cfg = game_config(config.as_deref(), hit_point, first_seed)?;
            run_batch(scenario, cfg, first_seed, sessions, output.as_deref())?;
        }
        Commands::Replay { input, output } => {
            run_replay(&input, output.as_deref())?;
        }
        Commands::Calibrate {
            scenario,
            seed,
            samples,
        } => {
            run_calibration(scenario, seed, samples)?;
        }
    }

    Ok(())
}

/// Load and validate the game configuration.
fn game_config(path: Option<&Path>, hit_point: Option<HitPointArg>, seed: u64) -> Result<GameConfig> {
    let mut cfg = match path {
        Some(p) => {
            let text = std::fs::read_to_string(p)
                .with_context(|| format!("reading config {}", p.display()))?;
            serde_json::from_str::<GameConfig>(&text)
                .with_context(|| format!("parsing config {}", p.display()))?
        }
        None => GameConfig::default(),
    };
    if let Some(hp) = hit_point {
        cfg.hit_point = hp.into();
    }
    cfg.seed = seed;
    cfg.validate()?;
    Ok(cfg)
}

fn print_session(result: &SessionResult) {
    for r in &result.rounds {
        let stats = r.statistics();
        println!(
            "  round {}: score={} popped={}/{} accuracy={:.1}% mean_time_to_pop={:.0}ms",
            r.round_number,
            r.score,
            r.targets_popped,
            r.targets_spawned,
            r.accuracy,
            stats.mean_time_to_pop_ms,
        );
    }
    println!(
        "Total score {} ({:.2}/round), avg accuracy {:.1}%, best round {}, worst round {}, {}s played",
        result.total_score,
        result.average_score_per_round,
        result.average_accuracy,
        result.best_round_index,
        result.worst_round_index,
        result.total_game_time_s,
    );
}

fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    std::fs::write(path, serde_json::to_string_pretty(value)?)?;
    println!("Saved to {}", path.display());
    Ok(())
}

fn play<S: GazeSource>(game: &mut GameLoop, source: &mut S, realtime: Option<f64>) -> Result<SessionResult> {
    match realtime {
        Some(speed) => {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            rt.block_on(live::run_realtime(game, source, speed))
        }
        None => Ok(game.run_session(source, 0)),
    }
}

fn run_session(
    kind: ScenarioKind,
    cfg: GameConfig,
    output_path: Option<&Path>,
    trace_path: Option<&Path>,
    realtime: Option<f64>,
) -> Result<()> {
    let scenario = Scenario::build(kind, cfg.seed);
    let mut game = GameLoop::new(cfg.clone())?;

    println!(
        "Running scenario '{}' (seed={}, hit point={:?}{})...",
        scenario.name,
        scenario.seed,
        cfg.hit_point,
        if realtime.is_some() { ", real time" } else { "" },
    );

    let start = std::time::Instant::now();
    let mut source = RecordingSource::new(scenario.viewer());
    let result = play(&mut game, &mut source, realtime)?;
    let elapsed = start.elapsed();

    print_session(&result);
    let status = game.status();
    println!(
        "Tracking: {} accepted, {} dropped, elapsed={:.3}s",
        status.accepted_observations,
        status.dropped_observations,
        elapsed.as_secs_f64(),
    );

    if let Some(tpath) = trace_path {
        if realtime.is_some() {
            tracing::warn!("traces recorded in real time do not replay exactly");
        }
        let mut trace = GazeTrace::new(scenario.name.clone(), scenario.seed, cfg);
        trace.polls = source.into_polls();
        trace.result = Some(result.clone());
        save_trace(&trace, tpath)?;
        println!("Trace saved to {}", tpath.display());
    }

    if let Some(opath) = output_path {
        write_json(&result, opath)?;
    }

    Ok(())
}

#[derive(Serialize)]
struct SeedSummary {
    seed: u64,
    total_score: u32,
    average_accuracy: f64,
    round_counts: Vec<u32>,
}

#[derive(Serialize)]
struct BatchSummary {
    scenario: String,
    sessions: usize,
    mean_total_score: f64,
    min_total_score: u32,
    max_total_score: u32,
    mean_accuracy: f64,
    mean_time_to_pop_ms: f64,
    per_seed: Vec<SeedSummary>,
}

fn run_batch(
    kind: ScenarioKind,
    cfg: GameConfig,
    first_seed: u64,
    sessions: u64,
    output_path: Option<&Path>,
) -> Result<()> {
    anyhow::ensure!(sessions > 0, "at least one session is required");
    let start = std::time::Instant::now();

    let results: Vec<(u64, SessionResult)> = (first_seed..first_seed + sessions)
        .into_par_iter()
        .map(|seed| -> Result<(u64, SessionResult)> {
            let scenario = Scenario::build(kind, seed);
            let mut game = GameLoop::new(GameConfig {
                seed,
                ..cfg.clone()
            })?;
            Ok((seed, game.run_session(&mut scenario.viewer(), 0)))
        })
        .collect::<Result<_>>()?;

    let n = results.len() as f64;
    let scores: Vec<u32> = results.iter().map(|(_, r)| r.total_score).collect();
    let pop_times: Vec<f64> = results
        .iter()
        .flat_map(|(_, r)| r.rounds.iter())
        .map(|round| round.statistics())
        .filter(|s| s.targets_popped > 0)
        .map(|s| s.mean_time_to_pop_ms)
        .collect();

    let summary = BatchSummary {
        scenario: Scenario::build(kind, first_seed).name,
        sessions: results.len(),
        mean_total_score: scores.iter().map(|&s| s as f64).sum::<f64>() / n,
        min_total_score: scores.iter().copied().min().unwrap_or(0),
        max_total_score: scores.iter().copied().max().unwrap_or(0),
        mean_accuracy: results.iter().map(|(_, r)| r.average_accuracy).sum::<f64>() / n,
        mean_time_to_pop_ms: if pop_times.is_empty() {
            0.0
        } else {
            pop_times.iter().sum::<f64>() / pop_times.len() as f64
        },
        per_seed: results
            .iter()
            .map(|(seed, r)| SeedSummary {
                seed: *seed,
                total_score: r.total_score,
                average_accuracy: r.average_accuracy,
                round_counts: r.round_counts(),
            })
            .collect(),
    };

    println!(
        "Batch '{}': {} sessions in {:.2}s",
        summary.scenario,
        summary.sessions,
        start.elapsed().as_secs_f64()
    );
    println!(
        "Score mean={:.1} min={} max={}, accuracy mean={:.1}%, time to pop mean={:.0}ms",
        summary.mean_total_score,
        summary.min_total_score,
        summary.max_total_score,
        summary.mean_accuracy,
        summary.mean_time_to_pop_ms,
    );

    if let Some(opath) = output_path {
        write_json(&summary, opath)?;
    }
    Ok(())
}

fn run_replay(input: &Path, output_path: Option<&Path>) -> Result<()> {
    let trace = load_trace(input)?;
    println!(
        "Replaying '{}' ({} polls)...",
        trace.scenario_name,
        trace.polls.len()
    );

    let mut game = GameLoop::new(trace.game.clone())?;
    let mut source = ReplaySource::new(&trace);
    let result = game.run_session(&mut source, 0);
    print_session(&result);

    match &trace.result {
        Some(recorded) if *recorded == result => println!("Replay matches the recording"),
        Some(recorded) => println!(
            "Replay differs from the recording: score {} vs {} ({} schedule mismatches)",
            result.total_score,
            recorded.total_score,
            source.mismatches()
        ),
        None => println!("No recorded result to compare"),
    }

    if let Some(opath) = output_path {
        write_json(&result, opath)?;
    }
    Ok(())
}

fn run_calibration(kind: ScenarioKind, seed: u64, samples: u64) -> Result<()> {
    let scenario = Scenario::build(kind, seed);
    let cfg = GameConfig::default();
    let mut session = CalibrationSession::new(*cfg.play_area());
    let mut now = 0;

    while let Some((id, label, marker)) = session.current_point() {
        // The viewer fixates the marker with the scenario's noise and link quality
        let mut viewer_cfg = scenario.viewer.clone();
        viewer_cfg.behavior = Behavior::Fixate { at: marker };
        let mut viewer = SimulatedViewer::new(viewer_cfg, seed.wrapping_add(id as u64));
        let mut filter = GazeFilter::new(cfg.filter.clone());
        for _ in 0..samples {
            now += cfg.cadence.observation_ms;
            let polled = viewer.poll_gaze(now);
            if let Ok(p) = polled.and_then(|s| cfg.screen.to_play_area(&s, cfg.play_area())) {
                filter.filter(p);
            }
        }
        let Some(gaze) = filter.position() else {
            println!("  {id} {label}: no usable samples");
            session.record(gaze_core::Position::new(f64::NAN, f64::NAN), marker);
            continue;
        };
        if let Some(rec) = session.record(gaze, marker) {
            println!(
                "  {id} {label}: gaze=({:.0}, {:.0}) accuracy={:.1}%",
                rec.gaze.x, rec.gaze.y, rec.accuracy
            );
        }
    }

    println!("Overall calibration accuracy {:.1}%", session.overall_accuracy());
    Ok(())
}
