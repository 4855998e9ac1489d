use serde::Serialize;

/// Participant slot, 1 or 2.
pub type Slot = u8;

pub const SLOTS: [Slot; 2] = [1, 2];

pub fn slot_index(slot: Slot) -> Option<usize> {
    match slot {
        1 => Some(0),
        2 => Some(1),
        _ => None,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LaneSide {
    Left,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GameVariant {
    Classic,
    Pickups,
}

impl GameVariant {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "classic" => Some(Self::Classic),
            "pickups" => Some(Self::Pickups),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndCondition {
    /// The match ends as soon as one participant crashes.
    AnyDown,
    /// The survivor keeps racing until both have crashed.
    AllDown,
}

impl EndCondition {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "any_down" | "any" => Some(Self::AnyDown),
            "all_down" | "all" => Some(Self::AllDown),
            _ => None,
        }
    }

    pub fn is_met<I>(self, mut alive: I) -> bool
    where
        I: Iterator<Item = bool>,
    {
        match self {
            Self::AnyDown => alive.any(|flag| !flag),
            Self::AllDown => alive.all(|flag| !flag),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Waiting,
    Active,
    Ended,
}

#[derive(Clone, Debug, Serialize)]
pub struct PlayerView {
    pub slot: Slot,
    pub name: String,
    pub x: f64,
    pub alive: bool,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pickups: Option<u32>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ObstacleView {
    pub x: f64,
    pub y: f64,
    pub side: LaneSide,
    pub img: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct PickupView {
    pub x: f64,
    pub y: f64,
    pub kind: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    pub speed: f64,
    #[serde(rename = "dashOffset")]
    pub dash_offset: f64,
    #[serde(rename = "lastObstacleY")]
    pub last_obstacle_y: Option<f64>,
    #[serde(rename = "lastPickupY", skip_serializing_if = "Option::is_none")]
    pub last_pickup_y: Option<f64>,
    #[serde(rename = "minGap")]
    pub min_gap: f64,
    pub players: Vec<PlayerView>,
    pub obstacles: Vec<ObstacleView>,
    pub pickups: Vec<PickupView>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOverReason {
    PlayerCrashed,
    AllCrashed,
}

#[derive(Clone, Debug, Serialize)]
pub struct ScoreEntry {
    pub slot: Slot,
    pub name: String,
    pub score: f64,
    pub alive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pickups: Option<u32>,
}

#[derive(Clone, Debug, Serialize)]
pub struct GameSummary {
    pub reason: GameOverReason,
    pub ticks: u64,
    #[serde(rename = "endedAt")]
    pub ended_at: String,
    pub winner: Option<Slot>,
    pub ranking: Vec<ScoreEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_condition_any_vs_all() {
        assert!(EndCondition::AnyDown.is_met([true, false].into_iter()));
        assert!(!EndCondition::AllDown.is_met([true, false].into_iter()));
        assert!(EndCondition::AllDown.is_met([false, false].into_iter()));
        assert!(!EndCondition::AnyDown.is_met([true, true].into_iter()));
    }

    #[test]
    fn variant_and_end_condition_parse_leniently() {
        assert_eq!(GameVariant::parse(" Pickups "), Some(GameVariant::Pickups));
        assert_eq!(GameVariant::parse("arcade"), None);
        assert_eq!(EndCondition::parse("ANY_DOWN"), Some(EndCondition::AnyDown));
        assert_eq!(EndCondition::parse("all"), Some(EndCondition::AllDown));
        assert_eq!(EndCondition::parse(""), None);
    }

    #[test]
    fn slot_index_only_accepts_two_slots() {
        assert_eq!(slot_index(1), Some(0));
        assert_eq!(slot_index(2), Some(1));
        assert_eq!(slot_index(0), None);
        assert_eq!(slot_index(3), None);
    }
}
