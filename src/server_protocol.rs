use serde_json::Value;

use crate::types::Direction;

#[derive(Debug, PartialEq, Eq)]
pub enum ParsedClientMessage {
    Press { direction: Direction },
    Release { direction: Direction },
    Start,
    Pause,
}

pub fn parse_client_message(raw: &str) -> Option<ParsedClientMessage> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let object = value.as_object()?;
    let message_type = object.get("type")?.as_str()?;

    match message_type {
        "press" => Some(ParsedClientMessage::Press {
            direction: parse_direction(object.get("direction"))?,
        }),
        "release" => Some(ParsedClientMessage::Release {
            direction: parse_direction(object.get("direction"))?,
        }),
        "start" => Some(ParsedClientMessage::Start),
        "pause" => Some(ParsedClientMessage::Pause),
        _ => None,
    }
}

/// Only the four arrow directions are valid key presses.
fn parse_direction(value: Option<&Value>) -> Option<Direction> {
    let direction = Direction::parse_move(value?.as_str()?)?;
    if direction == Direction::None {
        return None;
    }
    Some(direction)
}
