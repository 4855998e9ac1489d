use chrono::{SecondsFormat, Utc};
use tracing::trace;

use crate::constants::GameRules;
use crate::error::SessionError;
use crate::rng::Rng;
use crate::types::{
    slot_index, EndCondition, GameOverReason, GameSummary, ObstacleView, PickupView, PlayerView,
    ScoreEntry, Slot, Snapshot, SLOTS,
};

mod collision_system;
mod spawn_system;
mod utils;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// The world advanced by one tick.
    Advanced,
    /// The end condition already held; nothing was mutated.
    Terminal,
}

/// World state of one match plus the rules that advance it. A new engine is
/// built for every match; nothing is carried over.
#[derive(Clone, Debug)]
pub struct GameEngine {
    pub rules: GameRules,

    rng: Rng,
    seed: u32,
    players: Vec<PlayerView>,
    obstacles: Vec<ObstacleView>,
    pickups: Vec<PickupView>,

    tick: u64,
    speed: f64,
    dash_offset: f64,
    last_obstacle_y: Option<f64>,
    last_pickup_y: Option<f64>,
}

impl GameEngine {
    pub fn new(names: [String; 2], rules: GameRules, seed: u32) -> Self {
        let pickups_counter = rules.pickups_enabled().then_some(0);
        let players = SLOTS
            .iter()
            .zip(names)
            .enumerate()
            .map(|(idx, (&slot, name))| PlayerView {
                slot,
                name,
                x: rules.start_positions[idx],
                alive: true,
                score: 0.0,
                pickups: pickups_counter,
            })
            .collect();

        Self {
            speed: rules.speed_at(0),
            rules,
            rng: Rng::new(seed),
            seed,
            players,
            obstacles: Vec::new(),
            pickups: Vec::new(),
            tick: 0,
            dash_offset: 0.0,
            last_obstacle_y: None,
            last_pickup_y: None,
        }
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn player(&self, slot: Slot) -> Option<&PlayerView> {
        slot_index(slot).and_then(|idx| self.players.get(idx))
    }

    pub fn obstacles(&self) -> &[ObstacleView] {
        &self.obstacles
    }

    pub fn pickups(&self) -> &[PickupView] {
        &self.pickups
    }

    pub fn is_over(&self) -> bool {
        self.rules
            .end_condition
            .is_met(self.players.iter().map(|player| player.alive))
    }

    /// Applies a steering command. Returns the position actually stored.
    pub fn move_player(&mut self, slot: Slot, x: f64) -> Result<f64, SessionError> {
        if !x.is_finite() {
            return Err(SessionError::InvalidCommand("position is not a finite number"));
        }
        let idx = slot_index(slot).ok_or(SessionError::InvalidCommand("unknown slot"))?;
        let clamped = self.rules.clamp_to_lane(idx, x);
        let player = &mut self.players[idx];
        if !player.alive {
            return Err(SessionError::InvalidCommand("participant already crashed"));
        }
        player.x = clamped;
        Ok(clamped)
    }

    pub fn step(&mut self) -> StepOutcome {
        if self.is_over() {
            return StepOutcome::Terminal;
        }

        self.tick += 1;
        self.speed = self.rules.speed_at(self.tick);

        if self.tick > self.rules.spawn_warmup_ticks {
            self.try_spawn_obstacle();
            if self.rules.pickups_enabled() {
                self.try_spawn_pickup();
            }
        }

        self.advance_entities();
        self.resolve_crashes();
        if self.rules.pickups_enabled() {
            self.collect_pickups();
        }
        self.award_distance();
        self.scroll();

        StepOutcome::Advanced
    }

    fn advance_entities(&mut self) {
        let speed = self.speed;
        let window_end = self.rules.window_end_y;
        for obstacle in &mut self.obstacles {
            obstacle.y += speed;
            trace!(y = obstacle.y, "obstacle advanced");
        }
        self.obstacles.retain(|obstacle| obstacle.y < window_end);
        for pickup in &mut self.pickups {
            pickup.y += speed;
        }
        self.pickups.retain(|pickup| pickup.y < window_end);

        if let Some(y) = self.last_obstacle_y.as_mut() {
            *y += speed;
        }
        if let Some(y) = self.last_pickup_y.as_mut() {
            *y += speed;
        }
    }

    fn award_distance(&mut self) {
        let gained = self.speed / f64::from(self.rules.tick_rate.max(1));
        for player in self.players.iter_mut().filter(|player| player.alive) {
            player.score += gained;
        }
    }

    fn scroll(&mut self) {
        self.dash_offset -= self.speed;
        if self.dash_offset <= -self.rules.dash_period {
            self.dash_offset += self.rules.dash_period;
        }
    }

    pub fn build_snapshot(&self) -> Snapshot {
        Snapshot {
            tick: self.tick,
            speed: self.speed,
            dash_offset: self.dash_offset,
            last_obstacle_y: self.last_obstacle_y,
            last_pickup_y: self.last_pickup_y,
            min_gap: self.rules.obstacle_min_gap,
            players: self.players.clone(),
            obstacles: self.obstacles.clone(),
            pickups: self.pickups.clone(),
        }
    }

    pub fn build_summary(&self) -> GameSummary {
        let mut ranking: Vec<ScoreEntry> = self
            .players
            .iter()
            .map(|player| ScoreEntry {
                slot: player.slot,
                name: player.name.clone(),
                score: player.score,
                alive: player.alive,
                pickups: player.pickups,
            })
            .collect();
        ranking.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.slot.cmp(&b.slot)));

        let winner = match ranking.as_slice() {
            [first, second] if first.score > second.score => Some(first.slot),
            _ => None,
        };
        let all_crashed = self.players.iter().all(|player| !player.alive);
        let reason = if all_crashed || self.rules.end_condition == EndCondition::AllDown {
            GameOverReason::AllCrashed
        } else {
            GameOverReason::PlayerCrashed
        };

        GameSummary {
            reason,
            ticks: self.tick,
            ended_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            winner,
            ranking,
        }
    }
}
