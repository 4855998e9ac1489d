use crate::types::{EndCondition, GameVariant, LaneSide};

pub const TICK_RATE: u32 = 60;

pub const ROAD_WIDTH: f64 = 200.0;
pub const ROAD_LEFT: [f64; 2] = [50.0, 350.0];
pub const CAR_WIDTH: f64 = 40.0;
pub const CAR_HEIGHT: f64 = 60.0;
pub const OBSTACLE_WIDTH: f64 = 80.0;
pub const OBSTACLE_HEIGHT: f64 = 100.0;

pub const CANVAS_HEIGHT: f64 = 900.0;
pub const CAR_BOTTOM_MARGIN: f64 = 10.0;

pub const BASE_SPEED: f64 = 3.0;
pub const SPEED_STEP_TICKS: u64 = 120;
pub const SPEED_STEP: f64 = 0.1;
pub const MAX_SPEED: f64 = 15.0;

pub const SPAWN_Y: f64 = -100.0;
pub const WINDOW_END_Y: f64 = 1000.0;
pub const MIN_GAP: f64 = 250.0;
pub const SPAWN_WARMUP_TICKS: u64 = 60;
pub const DASH_PERIOD: f64 = 70.0;

pub const OBSTACLE_IMAGES: [&str; 7] = [
    "Ambulance.png",
    "Audi.png",
    "Black_viper.png",
    "Police.png",
    "taxi.png",
    "truck.png",
    "Mini_truck.png",
];

pub const PICKUP_KINDS: [&str; 1] = ["coin.png"];

pub fn get_tick_ms(tick_rate: u32) -> u64 {
    1000 / u64::from(tick_rate.max(1))
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Lane {
    pub side: LaneSide,
    pub x: f64,
}

/// Every variant-dependent number of the game in one place. Obstacles and
/// pickups are positioned in slot 1 track space; `slot_offsets` maps them
/// onto each participant's road when collisions are evaluated.
#[derive(Clone, Debug)]
pub struct GameRules {
    pub variant: GameVariant,
    pub end_condition: EndCondition,
    pub tick_rate: u32,

    pub base_speed: f64,
    pub speed_step_ticks: u64,
    pub speed_step: f64,
    pub max_speed: f64,

    pub lanes: Vec<Lane>,
    pub slot_offsets: [f64; 2],
    pub start_positions: [f64; 2],
    pub lane_bounds: [(f64, f64); 2],

    pub spawn_y: f64,
    pub window_end_y: f64,
    pub spawn_warmup_ticks: u64,
    pub obstacle_spawn_chance: f64,
    pub obstacle_min_gap: f64,
    pub obstacle_images: Vec<String>,
    pub pickup_spawn_chance: f64,
    pub pickup_min_gap: f64,
    pub pickup_kinds: Vec<String>,

    pub entity_height: f64,
    pub collision_band: (f64, f64),
    pub hit_distance: f64,

    pub dash_period: f64,
}

impl Default for GameRules {
    fn default() -> Self {
        let car_top = CANVAS_HEIGHT - CAR_HEIGHT - CAR_BOTTOM_MARGIN;
        let lane_center = |lane: f64| ROAD_LEFT[0] + lane * ROAD_WIDTH / 2.0 + ROAD_WIDTH / 4.0;
        let bounds = |left: f64| (left + CAR_WIDTH / 2.0, left + ROAD_WIDTH - CAR_WIDTH / 2.0);
        Self {
            variant: GameVariant::Classic,
            end_condition: EndCondition::AllDown,
            tick_rate: TICK_RATE,
            base_speed: BASE_SPEED,
            speed_step_ticks: SPEED_STEP_TICKS,
            speed_step: SPEED_STEP,
            max_speed: MAX_SPEED,
            lanes: vec![
                Lane {
                    side: LaneSide::Left,
                    x: lane_center(0.0),
                },
                Lane {
                    side: LaneSide::Right,
                    x: lane_center(1.0),
                },
            ],
            slot_offsets: [0.0, ROAD_LEFT[1] - ROAD_LEFT[0]],
            start_positions: [
                ROAD_LEFT[0] + ROAD_WIDTH / 4.0,
                ROAD_LEFT[1] + ROAD_WIDTH / 4.0,
            ],
            lane_bounds: [bounds(ROAD_LEFT[0]), bounds(ROAD_LEFT[1])],
            spawn_y: SPAWN_Y,
            window_end_y: WINDOW_END_Y,
            spawn_warmup_ticks: SPAWN_WARMUP_TICKS,
            obstacle_spawn_chance: 0.5,
            obstacle_min_gap: MIN_GAP,
            obstacle_images: OBSTACLE_IMAGES.iter().map(|img| img.to_string()).collect(),
            pickup_spawn_chance: 0.3,
            pickup_min_gap: MIN_GAP * 1.5,
            pickup_kinds: PICKUP_KINDS.iter().map(|kind| kind.to_string()).collect(),
            entity_height: OBSTACLE_HEIGHT,
            collision_band: (car_top, CANVAS_HEIGHT),
            hit_distance: CAR_WIDTH / 2.0 + OBSTACLE_WIDTH / 2.0,
            dash_period: DASH_PERIOD,
        }
    }
}

impl GameRules {
    pub fn with_variant(variant: GameVariant, end_condition: EndCondition) -> Self {
        Self {
            variant,
            end_condition,
            ..Self::default()
        }
    }

    pub fn pickups_enabled(&self) -> bool {
        self.variant == GameVariant::Pickups
    }

    pub fn tick_ms(&self) -> u64 {
        get_tick_ms(self.tick_rate)
    }

    /// Stepped difficulty ramp: one increment per `speed_step_ticks`, capped.
    pub fn speed_at(&self, tick: u64) -> f64 {
        let steps = tick / self.speed_step_ticks.max(1);
        (self.base_speed + steps as f64 * self.speed_step).min(self.max_speed)
    }

    pub fn clamp_to_lane(&self, slot_idx: usize, x: f64) -> f64 {
        let (min, max) = self.lane_bounds[slot_idx];
        x.clamp(min, max)
    }

    /// Vertical overlap of an entity's span with the collision band.
    pub fn in_collision_band(&self, y: f64) -> bool {
        let (top, bottom) = self.collision_band;
        y + self.entity_height > top && y < bottom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_geometry_matches_two_road_layout() {
        let rules = GameRules::default();
        assert_eq!(rules.lanes[0].x, 100.0);
        assert_eq!(rules.lanes[1].x, 200.0);
        assert_eq!(rules.slot_offsets, [0.0, 300.0]);
        assert_eq!(rules.start_positions, [100.0, 400.0]);
        assert_eq!(rules.collision_band, (830.0, 900.0));
        assert_eq!(rules.hit_distance, 60.0);
        assert_eq!(rules.lane_bounds[1], (370.0, 530.0));
    }

    #[test]
    fn speed_ramp_steps_and_caps() {
        let rules = GameRules::default();
        assert_eq!(rules.speed_at(0), 3.0);
        assert_eq!(rules.speed_at(119), 3.0);
        assert!((rules.speed_at(120) - 3.1).abs() < 1e-9);
        assert_eq!(rules.speed_at(10_000_000), MAX_SPEED);
    }

    #[test]
    fn collision_band_edges_are_exclusive() {
        let rules = GameRules::default();
        assert!(!rules.in_collision_band(730.0));
        assert!(rules.in_collision_band(730.5));
        assert!(rules.in_collision_band(899.5));
        assert!(!rules.in_collision_band(900.0));
    }

    #[test]
    fn tick_ms_never_divides_by_zero() {
        assert_eq!(get_tick_ms(60), 16);
        assert_eq!(get_tick_ms(0), 1000);
    }
}
