use serde::Serialize;
use serde_json::Value;

use crate::types::{GameSummary, Slot, Snapshot};

#[derive(Debug, PartialEq)]
pub enum ParsedClientMessage {
    Join { display_name: String },
    Move { x: f64 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorReason {
    Full,
    InvalidMessage,
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Init { slot: Slot },
    Error { reason: ErrorReason },
    Start,
    State(Snapshot),
    GameOver { summary: GameSummary },
}

pub fn parse_client_message(raw: &str) -> Option<ParsedClientMessage> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let object = value.as_object()?;
    let message_type = object.get("type")?.as_str()?;

    match message_type {
        "join" => {
            let name = ["displayName", "username", "name"]
                .iter()
                .find_map(|key| object.get(*key));
            let display_name = match name {
                None => String::new(),
                Some(value) => value.as_str()?.to_string(),
            };
            Some(ParsedClientMessage::Join { display_name })
        }
        "move" => {
            let x = object
                .get("x")
                .or_else(|| object.get("position"))?
                .as_f64()?;
            if !x.is_finite() {
                return None;
            }
            Some(ParsedClientMessage::Move { x })
        }
        _ => None,
    }
}
