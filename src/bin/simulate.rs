use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use lane_racer_rust_server::config::{parse_end_condition, parse_variant};
use lane_racer_rust_server::constants::GameRules;
use lane_racer_rust_server::engine::{GameEngine, StepOutcome};
use lane_racer_rust_server::rng::Rng;
use lane_racer_rust_server::types::{EndCondition, GameVariant, Slot, SLOTS};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Runs seeded matches between two scripted drivers without any network.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[arg(long, default_value_t = 1)]
    seed: u32,
    #[arg(long, default_value_t = 5)]
    runs: u32,
    #[arg(long, default_value_t = 60 * 60 * 5)]
    max_ticks: u64,
    #[arg(long, default_value = "classic", value_parser = parse_variant)]
    variant: GameVariant,
    #[arg(long, default_value = "all_down", value_parser = parse_end_condition)]
    end_condition: EndCondition,
    /// Chance per tick that a driver reacts to a threat, one per slot.
    #[arg(long, num_args = 2, default_values_t = [0.35, 0.2])]
    attention: Vec<f64>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize)]
struct RunResult {
    seed: u32,
    ticks: u64,
    finished: bool,
    winner: Option<Slot>,
    scores: Vec<f64>,
    #[serde(rename = "finalSpeed")]
    final_speed: f64,
    anomalies: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
struct RunSummary {
    runs: usize,
    #[serde(rename = "averageTicks")]
    average_ticks: u64,
    unfinished: usize,
    #[serde(rename = "winsBySlot")]
    wins_by_slot: BTreeMap<String, usize>,
    #[serde(rename = "anomalyCount")]
    anomaly_count: usize,
    results: Vec<RunResult>,
}

/// Steers towards a lane with no obstacle ahead, but only notices the
/// threat on a fraction of ticks.
struct Driver {
    slot: Slot,
    attention: f64,
    lookahead: f64,
}

impl Driver {
    fn steer(&self, engine: &GameEngine, rng: &mut Rng) -> Option<f64> {
        let idx = usize::from(self.slot - 1);
        let rules = &engine.rules;
        let player = engine.player(self.slot)?;
        if !player.alive || !rng.chance(self.attention) {
            return None;
        }
        let offset = rules.slot_offsets[idx];
        let (_, band_bottom) = rules.collision_band;
        let blocked = |x: f64| {
            engine.obstacles().iter().any(|obstacle| {
                obstacle.y < band_bottom
                    && obstacle.y + rules.entity_height > band_bottom - self.lookahead
                    && (obstacle.x + offset - x).abs() < rules.hit_distance
            })
        };
        if !blocked(player.x) {
            return None;
        }
        rules
            .lanes
            .iter()
            .map(|lane| lane.x + offset)
            .find(|&x| !blocked(x))
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let rules = GameRules::with_variant(cli.variant, cli.end_condition);
    let mut results = Vec::new();
    for run in 0..cli.runs {
        let seed = cli.seed.wrapping_add(run);
        let result = run_match(&rules, seed, &cli.attention, cli.max_ticks);
        for anomaly in &result.anomalies {
            warn!(seed, anomaly = %anomaly, "anomaly detected");
        }
        info!(
            seed,
            ticks = result.ticks,
            winner = ?result.winner,
            finished = result.finished,
            "run finished"
        );
        println!("{}", serde_json::to_string(&result)?);
        results.push(result);
    }

    let summary = build_run_summary(results);
    info!(
        runs = summary.runs,
        average_ticks = summary.average_ticks,
        unfinished = summary.unfinished,
        "simulation finished"
    );
    if let Some(path) = cli.summary_out.as_ref() {
        write_summary(path, &summary)?;
    }
    if summary.anomaly_count > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn run_match(rules: &GameRules, seed: u32, attention: &[f64], max_ticks: u64) -> RunResult {
    let names = SLOTS.map(|slot| format!("Bot-{slot}"));
    let mut engine = GameEngine::new(names, rules.clone(), seed);
    let mut driver_rng = Rng::new(seed ^ 0x5eed_0001);
    let drivers: Vec<Driver> = SLOTS
        .iter()
        .enumerate()
        .map(|(idx, &slot)| Driver {
            slot,
            attention: attention.get(idx).copied().unwrap_or(0.3),
            lookahead: 320.0,
        })
        .collect();

    let mut anomalies = Vec::new();
    let mut previous_speed = engine.speed();
    let mut finished = false;
    while engine.tick() < max_ticks {
        for driver in &drivers {
            if let Some(x) = driver.steer(&engine, &mut driver_rng) {
                let _ = engine.move_player(driver.slot, x);
            }
        }
        if engine.step() == StepOutcome::Terminal {
            finished = true;
            break;
        }
        anomalies.extend(collect_anomalies(&engine, previous_speed));
        previous_speed = engine.speed();
    }

    let summary = engine.build_summary();
    RunResult {
        seed,
        ticks: engine.tick(),
        finished,
        winner: summary.winner,
        scores: SLOTS
            .iter()
            .filter_map(|&slot| engine.player(slot).map(|player| player.score))
            .collect(),
        final_speed: engine.speed(),
        anomalies,
    }
}

fn collect_anomalies(engine: &GameEngine, previous_speed: f64) -> Vec<String> {
    let rules = &engine.rules;
    let mut anomalies = Vec::new();
    if engine.speed() < previous_speed || engine.speed() > rules.max_speed {
        anomalies.push(format!(
            "speed {} out of ramp at tick {}",
            engine.speed(),
            engine.tick()
        ));
    }
    let mut ys: Vec<f64> = engine.obstacles().iter().map(|obstacle| obstacle.y).collect();
    ys.sort_by(f64::total_cmp);
    if ys
        .windows(2)
        .any(|pair| pair[1] - pair[0] < rules.obstacle_min_gap - 1e-6)
    {
        anomalies.push(format!("obstacles closer than min gap at tick {}", engine.tick()));
    }
    if ys.iter().any(|&y| y >= rules.window_end_y) {
        anomalies.push(format!("obstacle retained past window at tick {}", engine.tick()));
    }
    anomalies
}

fn build_run_summary(results: Vec<RunResult>) -> RunSummary {
    let runs = results.len();
    let total_ticks: u64 = results.iter().map(|result| result.ticks).sum();
    let mut wins_by_slot = BTreeMap::new();
    for result in &results {
        let key = result
            .winner
            .map(|slot| format!("slot{slot}"))
            .unwrap_or_else(|| "draw".to_string());
        *wins_by_slot.entry(key).or_insert(0) += 1;
    }
    RunSummary {
        runs,
        average_ticks: if runs == 0 { 0 } else { total_ticks / runs as u64 },
        unfinished: results.iter().filter(|result| !result.finished).count(),
        wins_by_slot,
        anomaly_count: results.iter().map(|result| result.anomalies.len()).sum(),
        results,
    }
}

fn write_summary(path: &Path, summary: &RunSummary) -> anyhow::Result<()> {
    let text = serde_json::to_string_pretty(summary)?;
    std::fs::write(path, text)
        .with_context(|| format!("failed to write summary to {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_result(winner: Option<Slot>, ticks: u64, finished: bool) -> RunResult {
        RunResult {
            seed: 1,
            ticks,
            finished,
            winner,
            scores: vec![1.0, 2.0],
            final_speed: 3.0,
            anomalies: Vec::new(),
        }
    }

    #[test]
    fn summary_counts_wins_and_averages_ticks() {
        let summary = build_run_summary(vec![
            make_result(Some(1), 100, true),
            make_result(Some(2), 300, true),
            make_result(None, 200, false),
        ]);
        assert_eq!(summary.runs, 3);
        assert_eq!(summary.average_ticks, 200);
        assert_eq!(summary.unfinished, 1);
        assert_eq!(summary.wins_by_slot.get("slot1"), Some(&1));
        assert_eq!(summary.wins_by_slot.get("draw"), Some(&1));
    }

    #[test]
    fn seeded_match_is_reproducible_and_clean() {
        let rules = GameRules::default();
        let a = run_match(&rules, 17, &[0.3, 0.3], 5_000);
        let b = run_match(&rules, 17, &[0.3, 0.3], 5_000);
        assert_eq!(a.ticks, b.ticks);
        assert_eq!(a.winner, b.winner);
        assert!(a.anomalies.is_empty());
    }

    #[test]
    fn inattentive_drivers_crash_eventually() {
        let rules = GameRules::default();
        let result = run_match(&rules, 3, &[0.0, 0.0], 20_000);
        assert!(result.finished);
    }

    #[test]
    fn write_summary_fails_for_missing_parent() {
        let target = std::env::temp_dir()
            .join(lane_racer_rust_server::server_utils::make_id("lane-racer-missing"))
            .join("summary.json");
        let summary = build_run_summary(vec![make_result(None, 1, false)]);
        assert!(write_summary(&target, &summary).is_err());
    }
}
