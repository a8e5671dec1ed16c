use anyhow::Context;
use chase_arcade_server::constants::CELL_SIZE;
use chase_arcade_server::engine::GameEngine;
use chase_arcade_server::rng::Rng;
use chase_arcade_server::types::{
    Cell, Direction, GameConfig, GamePhase, Position, RuntimeEvent, Snapshot, Trigger,
};
use chase_arcade_server::world::GridMap;
use clap::Parser;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// Every this many ticks the autopilot picks a fresh direction even if it
/// is still moving.
const AUTOPILOT_TURN_EVERY: u64 = 45;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[arg(long)]
    seed: Option<u32>,
    /// Tick limit per game.
    #[arg(long, default_value_t = 60 * 60 * 10)]
    ticks: u64,
    #[arg(long, default_value_t = 1)]
    games: u32,
    /// Let the engine restart itself after each game over.
    #[arg(long)]
    attract: bool,
    #[arg(long)]
    match_id: Option<String>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize)]
struct GameResultLine {
    game: u32,
    seed: u32,
    reason: String,
    ticks: u64,
    #[serde(rename = "finalScore")]
    final_score: u32,
    #[serde(rename = "finalLevel")]
    final_level: u32,
    #[serde(rename = "itemsEaten")]
    items_eaten: u32,
    #[serde(rename = "pillsEaten")]
    pills_eaten: u32,
    #[serde(rename = "pursuersEaten")]
    pursuers_eaten: u32,
    #[serde(rename = "livesLost")]
    lives_lost: u32,
    #[serde(rename = "levelsCompleted")]
    levels_completed: u32,
    #[serde(rename = "extraLives")]
    extra_lives: u32,
    anomalies: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
struct AnomalyRecord {
    tick: u64,
    message: String,
}

#[derive(Clone, Debug, Serialize)]
struct GameRunResult {
    #[serde(flatten)]
    result: GameResultLine,
    #[serde(rename = "anomalyRecords")]
    anomaly_records: Vec<AnomalyRecord>,
}

#[derive(Clone, Debug, Serialize)]
struct RunSummary {
    #[serde(rename = "matchId")]
    match_id: String,
    #[serde(rename = "startedAtMs")]
    started_at_ms: u64,
    #[serde(rename = "finishedAtMs")]
    finished_at_ms: u64,
    #[serde(rename = "gameCount")]
    game_count: usize,
    #[serde(rename = "anomalyCount")]
    anomaly_count: usize,
    #[serde(rename = "averageScore")]
    average_score: u32,
    #[serde(rename = "reasonCounts")]
    reason_counts: BTreeMap<String, usize>,
    games: Vec<GameResultLine>,
}

#[derive(Clone, Debug, Serialize)]
struct StructuredLogLine {
    #[serde(rename = "timestampMs")]
    timestamp_ms: u64,
    level: String,
    event: String,
    #[serde(rename = "matchId")]
    match_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tick: Option<u64>,
    details: Value,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let base_seed = cli.seed.unwrap_or_else(|| now_ms() as u32);
    let run_started_at_ms = now_ms();
    let match_id = cli
        .match_id
        .clone()
        .unwrap_or_else(|| default_match_id(base_seed, run_started_at_ms));
    let mut has_anomaly = false;
    let mut game_results = Vec::new();
    let mut reason_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut total_anomalies = 0usize;

    for game in 0..cli.games.max(1) {
        let seed = base_seed.wrapping_add(game);
        emit_log(
            "info",
            "game_started",
            &match_id,
            Some(seed),
            None,
            json!({ "game": game, "attract": cli.attract, "tickLimit": cli.ticks }),
        );
        let run = run_game(game, seed, cli.ticks, cli.attract)
            .with_context(|| format!("failed to run game {game}"))?;

        for anomaly in &run.anomaly_records {
            emit_log(
                "warn",
                "anomaly_detected",
                &match_id,
                Some(seed),
                Some(anomaly.tick),
                json!({ "message": anomaly.message }),
            );
        }

        if !run.result.anomalies.is_empty() {
            has_anomaly = true;
        }
        total_anomalies += run.anomaly_records.len();
        *reason_counts.entry(run.result.reason.clone()).or_insert(0) += 1;

        emit_log(
            "info",
            "game_finished",
            &match_id,
            Some(seed),
            Some(run.result.ticks),
            json!({
                "reason": run.result.reason,
                "score": run.result.final_score,
                "level": run.result.final_level,
                "anomalyCount": run.anomaly_records.len(),
            }),
        );

        println!(
            "{}",
            serde_json::to_string(&run.result).context("game result should serialize")?
        );
        game_results.push(run.result);
    }

    let summary = build_run_summary(
        match_id.clone(),
        run_started_at_ms,
        now_ms(),
        game_results,
        reason_counts,
        total_anomalies,
    );

    let mut summary_out_written: Option<String> = None;
    if let Some(path) = cli.summary_out.as_ref() {
        if let Err(error) = write_summary(path, &summary) {
            emit_log(
                "error",
                "summary_write_failed",
                &match_id,
                None,
                None,
                json!({
                    "path": path.to_string_lossy(),
                    "error": format!("{error:#}"),
                }),
            );
            std::process::exit(2);
        }
        summary_out_written = Some(path.to_string_lossy().to_string());
    }

    emit_log(
        "info",
        "run_finished",
        &match_id,
        None,
        None,
        json!({
            "gameCount": summary.game_count,
            "anomalyCount": summary.anomaly_count,
            "averageScore": summary.average_score,
            "reasonCounts": summary.reason_counts,
            "summaryOut": summary_out_written,
        }),
    );

    if has_anomaly {
        std::process::exit(1);
    }
    Ok(())
}

fn run_game(game: u32, seed: u32, tick_limit: u64, attract: bool) -> anyhow::Result<GameRunResult> {
    let config = GameConfig {
        auto_start: attract,
        ..GameConfig::default()
    };
    let mut engine = GameEngine::standard(config, seed).context("standard level is invalid")?;
    if !attract {
        engine.handle_trigger(Trigger::Start);
    }
    let item_total = engine.template().item_count();
    let mut pilot = Rng::new(seed ^ 0x9e37_79b9);

    let mut result = GameResultLine {
        game,
        seed,
        reason: "tick_limit".to_string(),
        ticks: 0,
        final_score: 0,
        final_level: 1,
        items_eaten: 0,
        pills_eaten: 0,
        pursuers_eaten: 0,
        lives_lost: 0,
        levels_completed: 0,
        extra_lives: 0,
        anomalies: Vec::new(),
    };
    let mut anomaly_records = Vec::new();
    let mut anomaly_seen = HashSet::new();
    let mut last_score = 0u32;

    while engine.tick() < tick_limit {
        if engine.phase() == GamePhase::Playing {
            let view = engine.build_snapshot(false).player;
            if view.direction == Direction::None || engine.tick() % AUTOPILOT_TURN_EVERY == 0 {
                let pick = Direction::CARDINALS[pilot.pick_index(Direction::CARDINALS.len())];
                engine.set_player_due(pick);
            }
        }

        engine.step();
        let snapshot = engine.build_snapshot(true);
        result.ticks = snapshot.tick;

        let mut new_game = false;
        for event in &snapshot.events {
            match event {
                RuntimeEvent::ItemConsumed { .. } => result.items_eaten += 1,
                RuntimeEvent::PillEaten => result.pills_eaten += 1,
                RuntimeEvent::PursuerEaten { .. } => result.pursuers_eaten += 1,
                RuntimeEvent::LifeLost { .. } => result.lives_lost += 1,
                RuntimeEvent::LevelCompleted { .. } => result.levels_completed += 1,
                RuntimeEvent::ExtraLife { .. } => result.extra_lives += 1,
                RuntimeEvent::MapReset if snapshot.level == 1 && snapshot.player.score == 0 => {
                    new_game = true;
                }
                _ => {}
            }
        }

        let mut messages = collect_snapshot_anomalies(&snapshot, engine.map(), item_total);
        if snapshot.player.score < last_score && !new_game {
            messages.push(format!(
                "score went backwards: {last_score} -> {}",
                snapshot.player.score
            ));
        }
        last_score = snapshot.player.score;
        for message in messages {
            push_anomaly(
                &mut result.anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                snapshot.tick,
                message,
            );
        }

        result.final_score = snapshot.player.score;
        result.final_level = snapshot.level;
        if !attract && engine.is_game_over() {
            result.reason = "game_over".to_string();
            break;
        }
    }

    Ok(GameRunResult {
        result,
        anomaly_records,
    })
}

fn collect_snapshot_anomalies(snapshot: &Snapshot, map: &GridMap, item_total: u32) -> Vec<String> {
    let mut anomalies = Vec::new();

    if let Some(message) = wall_overlap(map, "player", snapshot.player.position) {
        anomalies.push(message);
    }
    for pursuer in &snapshot.pursuers {
        let label = format!("pursuer {}", pursuer.index);
        if let Some(message) = wall_overlap(map, &label, pursuer.position) {
            anomalies.push(message);
        }
    }

    let accounted = map.remaining_items() + snapshot.player.items_eaten;
    if accounted != item_total {
        anomalies.push(format!(
            "item ledger mismatch: {} remaining + {} eaten != {item_total}",
            map.remaining_items(),
            snapshot.player.items_eaten
        ));
    }

    if snapshot.phase == GamePhase::Countdown && snapshot.countdown.is_none() {
        anomalies.push("countdown phase without a countdown value".to_string());
    }
    anomalies
}

fn wall_overlap(map: &GridMap, who: &str, position: Position) -> Option<String> {
    if !position.is_grid_aligned() {
        return None;
    }
    let (row, col) = (position.y / CELL_SIZE, position.x / CELL_SIZE);
    (map.cell_at(row, col) == Some(Cell::Wall))
        .then(|| format!("{who} inside wall at ({}, {})", position.x, position.y))
}

fn push_anomaly(
    anomalies: &mut Vec<String>,
    anomaly_records: &mut Vec<AnomalyRecord>,
    anomaly_seen: &mut HashSet<String>,
    tick: u64,
    message: String,
) {
    anomaly_records.push(AnomalyRecord {
        tick,
        message: message.clone(),
    });
    if anomaly_seen.insert(message.clone()) {
        anomalies.push(message);
    }
}

fn default_match_id(seed: u32, timestamp_ms: u64) -> String {
    format!("sim-{seed}-{timestamp_ms}")
}

fn build_run_summary(
    match_id: String,
    started_at_ms: u64,
    finished_at_ms: u64,
    games: Vec<GameResultLine>,
    reason_counts: BTreeMap<String, usize>,
    anomaly_count: usize,
) -> RunSummary {
    let game_count = games.len();
    let total_score: u64 = games.iter().map(|game| game.final_score as u64).sum();
    let average_score = if game_count == 0 {
        0
    } else {
        (total_score / game_count as u64) as u32
    };
    RunSummary {
        match_id,
        started_at_ms,
        finished_at_ms,
        game_count,
        anomaly_count,
        average_score,
        reason_counts,
        games,
    }
}

fn emit_log(
    level: &str,
    event: &str,
    match_id: &str,
    seed: Option<u32>,
    tick: Option<u64>,
    details: Value,
) {
    let log_line = StructuredLogLine {
        timestamp_ms: now_ms(),
        level: level.to_string(),
        event: event.to_string(),
        match_id: match_id.to_string(),
        seed,
        tick,
        details,
    };
    match serde_json::to_string(&log_line) {
        Ok(line) => eprintln!("{line}"),
        Err(error) => eprintln!("{{\"level\":\"error\",\"event\":\"log_encode_failed\",\"error\":\"{error}\"}}"),
    }
}

fn now_ms() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

fn write_summary(path: &Path, summary: &RunSummary) -> anyhow::Result<()> {
    let summary_text =
        serde_json::to_string_pretty(summary).context("run summary should serialize")?;
    std::fs::write(path, summary_text)
        .with_context(|| format!("failed to write {}", path.to_string_lossy()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_game_result(reason: &str, final_score: u32) -> GameResultLine {
        GameResultLine {
            game: 0,
            seed: 42,
            reason: reason.to_string(),
            ticks: 1_000,
            final_score,
            final_level: 1,
            items_eaten: 0,
            pills_eaten: 0,
            pursuers_eaten: 0,
            lives_lost: 0,
            levels_completed: 0,
            extra_lives: 0,
            anomalies: Vec::new(),
        }
    }

    #[test]
    fn default_match_id_contains_seed_and_timestamp() {
        assert_eq!(default_match_id(42, 123456789), "sim-42-123456789");
    }

    #[test]
    fn build_run_summary_calculates_average_score() {
        let summary = build_run_summary(
            "sim-42-1".to_string(),
            1,
            2,
            vec![
                make_game_result("game_over", 1_200),
                make_game_result("tick_limit", 1_800),
            ],
            BTreeMap::from([
                ("game_over".to_string(), 1usize),
                ("tick_limit".to_string(), 1usize),
            ]),
            1,
        );
        assert_eq!(summary.average_score, 1_500);
        assert_eq!(summary.game_count, 2);
    }

    #[test]
    fn write_summary_returns_error_when_parent_does_not_exist() {
        let target = std::env::temp_dir()
            .join(format!("chase-arcade-missing-{}", now_ms()))
            .join("summary.json");
        let summary = build_run_summary(
            "sim-1-1".to_string(),
            1,
            2,
            vec![make_game_result("game_over", 0)],
            BTreeMap::from([("game_over".to_string(), 1usize)]),
            0,
        );
        assert!(write_summary(&target, &summary).is_err());
    }

    #[test]
    fn push_anomaly_keeps_records_and_deduplicates_summary_messages() {
        let mut anomalies = Vec::new();
        let mut records = Vec::new();
        let mut seen = HashSet::new();
        push_anomaly(&mut anomalies, &mut records, &mut seen, 10, "same".to_string());
        push_anomaly(&mut anomalies, &mut records, &mut seen, 11, "same".to_string());

        assert_eq!(anomalies.len(), 1);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].tick, 10);
        assert_eq!(records[1].tick, 11);
    }

    #[test]
    fn seeded_games_repeat_exactly() {
        let a = run_game(0, 77, 3_000, false).expect("game a");
        let b = run_game(0, 77, 3_000, false).expect("game b");
        assert_eq!(
            serde_json::to_value(&a.result).expect("a json"),
            serde_json::to_value(&b.result).expect("b json")
        );
    }

    #[test]
    fn autopilot_game_has_no_anomalies() {
        let run = run_game(0, 2024, 6_000, true).expect("game");
        assert!(run.result.anomalies.is_empty(), "{:?}", run.result.anomalies);
        assert!(run.result.items_eaten > 0);
    }

    #[test]
    fn wall_overlap_only_flags_aligned_wall_cells() {
        let engine = GameEngine::standard(GameConfig::default(), 1).expect("engine");
        assert!(wall_overlap(engine.map(), "x", Position::new(0, 0)).is_some());
        assert!(wall_overlap(engine.map(), "x", Position::new(10, 10)).is_none());
        assert!(wall_overlap(engine.map(), "x", Position::new(2, 0)).is_none());
    }
}
