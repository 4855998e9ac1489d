use std::path::PathBuf;

use clap::Parser;

use crate::constants::{GameRules, TICK_RATE};
use crate::types::{EndCondition, GameVariant};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Authoritative server for two-player lane racing")]
pub struct ServerConfig {
    #[arg(long, env = "BIND_HOST", default_value = "0.0.0.0")]
    pub host: String,
    #[arg(long, env = "PORT", default_value_t = 8765)]
    pub port: u16,
    #[arg(long, env = "TICK_RATE", default_value_t = TICK_RATE)]
    pub tick_rate: u32,
    #[arg(long, env = "GAME_VARIANT", default_value = "classic", value_parser = parse_variant)]
    pub variant: GameVariant,
    #[arg(long, env = "END_CONDITION", default_value = "all_down", value_parser = parse_end_condition)]
    pub end_condition: EndCondition,
    /// Pins every match to this seed instead of a random one.
    #[arg(long, env = "GAME_SEED")]
    pub seed: Option<u32>,
    #[arg(long, env = "STATIC_DIR")]
    pub static_dir: Option<PathBuf>,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn rules(&self) -> GameRules {
        GameRules {
            tick_rate: self.tick_rate.clamp(1, 1000),
            ..GameRules::with_variant(self.variant, self.end_condition)
        }
    }
}

pub fn parse_variant(raw: &str) -> Result<GameVariant, String> {
    GameVariant::parse(raw).ok_or_else(|| format!("unknown variant '{raw}' (classic | pickups)"))
}

pub fn parse_end_condition(raw: &str) -> Result<EndCondition, String> {
    EndCondition::parse(raw)
        .ok_or_else(|| format!("unknown end condition '{raw}' (all_down | any_down)"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_describe_classic_two_player_race() {
        let config = ServerConfig::parse_from(["server"]);
        assert_eq!(config.tick_rate, 60);
        assert_eq!(config.variant, GameVariant::Classic);
        assert_eq!(config.end_condition, EndCondition::AllDown);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn flags_override_rules() {
        let config = ServerConfig::parse_from([
            "server",
            "--host",
            "127.0.0.1",
            "--port",
            "9000",
            "--tick-rate",
            "30",
            "--variant",
            "pickups",
            "--end-condition",
            "any_down",
            "--seed",
            "12",
        ]);
        let rules = config.rules();
        assert_eq!(rules.tick_rate, 30);
        assert!(rules.pickups_enabled());
        assert_eq!(rules.end_condition, EndCondition::AnyDown);
        assert_eq!(config.seed, Some(12));
        assert_eq!(config.bind_addr(), "127.0.0.1:9000");
    }

    #[test]
    fn unknown_variant_is_a_parse_error() {
        assert!(ServerConfig::try_parse_from(["server", "--variant", "arcade"]).is_err());
    }
}
