// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Message protocol definitions and serialization.
//!
//! Every message is one line of JSON terminated by `\n`, shaped as
//! `{"cat": <category>, "value": <payload>}`. Status updates may also arrive
//! as a bare `{"status": "..."}` object. Free-form operator commands such as
//! `move:up` travel as raw text lines.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::arena::{Direction, Obstacle};
use crate::error::ProtocolError;

/// Line terminator used for framing.
pub const LINE_DELIMITER: char = '\n';

/// Movement mode sent alongside obstacle lists.
pub const DEFAULT_MODE: &str = "0";

/// Control payload that starts an autonomous run.
pub const CONTROL_START: &str = "start";

type JsonObject = Map<String, Value>;

/// Manual movement commands, sent as raw text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Movement {
    Up,
    Down,
    Left,
    Right,
}

impl Movement {
    pub fn as_command(&self) -> &'static str {
        match self {
            Self::Up => "move:up",
            Self::Down => "move:down",
            Self::Left => "move:left",
            Self::Right => "move:right",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" | "u" | "move:up" => Some(Self::Up),
            "down" | "d" | "move:down" => Some(Self::Down),
            "left" | "l" | "move:left" => Some(Self::Left),
            "right" | "r" | "move:right" => Some(Self::Right),
            _ => None,
        }
    }
}

/// Message categories carried in the `cat` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Obstacles,
    Control,
    Status,
    ImageRec,
    Location,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Obstacles => "obstacles",
            Self::Control => "control",
            Self::Status => "status",
            Self::ImageRec => "image-rec",
            Self::Location => "location",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "obstacles" => Some(Self::Obstacles),
            "control" => Some(Self::Control),
            "status" => Some(Self::Status),
            "image-rec" => Some(Self::ImageRec),
            "location" => Some(Self::Location),
            _ => None,
        }
    }
}

/// One obstacle on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObstacleRecord {
    pub id: u32,
    pub x: i32,
    pub y: i32,
    #[serde(rename = "w")]
    pub width: i32,
    #[serde(rename = "h")]
    pub height: i32,
    /// Target face as a compass code.
    #[serde(rename = "d", serialize_with = "serialize_direction")]
    pub face: Direction,
}

fn serialize_direction<S: serde::Serializer>(d: &Direction, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u8(d.code())
}

impl ObstacleRecord {
    fn from_object(obj: &JsonObject) -> Result<Self, ProtocolError> {
        Ok(Self {
            id: int_field(obj, "id")?,
            x: int_field(obj, "x")?,
            y: int_field(obj, "y")?,
            width: optional_int_field(obj, "w")?.unwrap_or(1),
            height: optional_int_field(obj, "h")?.unwrap_or(1),
            face: direction_field(obj, "d")?,
        })
    }
}

impl From<&Obstacle> for ObstacleRecord {
    fn from(obs: &Obstacle) -> Self {
        Self {
            id: obs.id(),
            x: obs.x,
            y: obs.y,
            width: obs.width(),
            height: obs.height(),
            face: obs.target_face,
        }
    }
}

/// Bulk obstacle transfer payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObstacleBatch {
    pub obstacles: Vec<ObstacleRecord>,
    pub mode: String,
}

impl ObstacleBatch {
    pub fn new(obstacles: &[Obstacle]) -> Self {
        Self {
            obstacles: obstacles.iter().map(ObstacleRecord::from).collect(),
            mode: DEFAULT_MODE.to_string(),
        }
    }

    /// Parse the payload, keeping every well-formed record.
    ///
    /// Malformed records are logged and skipped; they never fail the batch.
    fn from_value(value: &Value) -> Result<Self, ProtocolError> {
        let obj = value.as_object().ok_or(ProtocolError::NotAnObject)?;
        let entries = obj
            .get("obstacles")
            .and_then(Value::as_array)
            .ok_or(ProtocolError::MissingField("obstacles"))?;

        let mut obstacles = Vec::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            let record = entry
                .as_object()
                .ok_or(ProtocolError::NotAnObject)
                .and_then(ObstacleRecord::from_object);
            match record {
                Ok(record) => obstacles.push(record),
                Err(e) => warn!("Dropping obstacle record {}: {}", index, e),
            }
        }

        let mode = obj
            .get("mode")
            .map(value_to_string)
            .unwrap_or_else(|| DEFAULT_MODE.to_string());

        Ok(Self { obstacles, mode })
    }
}

/// Wire envelope for categorized messages.
#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    cat: &'a str,
    value: T,
}

/// Robot position payload.
#[derive(Serialize)]
struct LocationPayload {
    x: i32,
    y: i32,
    d: u8,
}

/// Target recognition payload.
#[derive(Serialize)]
struct TargetPayload<'a> {
    image_id: &'a str,
    obstacle_id: u32,
}

/// A decoded or to-be-encoded protocol message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Full obstacle list, operator to robot.
    Obstacles(ObstacleBatch),
    /// Run control, operator to robot.
    Control(String),
    /// Status text, robot to operator.
    Status(String),
    /// Recognized target on an obstacle, robot to operator.
    Target { obstacle_id: u32, target_id: String },
    /// Robot pose, robot to operator.
    Location { x: i32, y: i32, facing: Direction },
    /// Raw operator text, sent unmodified.
    Command(String),
}

impl Message {
    /// Create an obstacle transfer for the given obstacles, in order.
    pub fn obstacles(obstacles: &[Obstacle]) -> Self {
        Self::Obstacles(ObstacleBatch::new(obstacles))
    }

    /// Create the start-run control message.
    pub fn start() -> Self {
        Self::Control(CONTROL_START.to_string())
    }

    /// Create a raw command message.
    pub fn command(text: impl Into<String>) -> Self {
        Self::Command(text.into())
    }

    pub fn movement(movement: Movement) -> Self {
        Self::Command(movement.as_command().to_string())
    }

    pub fn category(&self) -> Option<Category> {
        match self {
            Self::Obstacles(_) => Some(Category::Obstacles),
            Self::Control(_) => Some(Category::Control),
            Self::Status(_) => Some(Category::Status),
            Self::Target { .. } => Some(Category::ImageRec),
            Self::Location { .. } => Some(Category::Location),
            Self::Command(_) => None,
        }
    }

    /// Serialize to a single newline-terminated line.
    pub fn to_line(&self) -> Result<String, ProtocolError> {
        let body = match self {
            Self::Command(text) => text.trim_end_matches(LINE_DELIMITER).to_string(),
            Self::Obstacles(batch) => envelope(Category::Obstacles, batch)?,
            Self::Control(value) => envelope(Category::Control, value)?,
            Self::Status(value) => envelope(Category::Status, value)?,
            Self::Target {
                obstacle_id,
                target_id,
            } => envelope(
                Category::ImageRec,
                TargetPayload {
                    image_id: target_id,
                    obstacle_id: *obstacle_id,
                },
            )?,
            Self::Location { x, y, facing } => envelope(
                Category::Location,
                LocationPayload {
                    x: *x,
                    y: *y,
                    d: facing.code(),
                },
            )?,
        };
        Ok(format!("{}{}", body, LINE_DELIMITER))
    }

    /// Parse one received line.
    pub fn from_line(line: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(line.trim())?;
        let obj = value.as_object().ok_or(ProtocolError::NotAnObject)?;

        if let Some(status) = obj.get("status") {
            return Ok(Self::Status(value_to_string(status)));
        }

        let cat = obj
            .get("cat")
            .and_then(Value::as_str)
            .ok_or(ProtocolError::MissingField("cat"))?;
        let category =
            Category::parse(cat).ok_or_else(|| ProtocolError::UnknownCategory(cat.to_string()))?;
        let payload = obj.get("value").ok_or(ProtocolError::MissingField("value"))?;

        match category {
            Category::Obstacles => Ok(Self::Obstacles(ObstacleBatch::from_value(payload)?)),
            Category::Control => Ok(Self::Control(value_to_string(payload))),
            Category::Status => Ok(Self::Status(value_to_string(payload))),
            Category::ImageRec => {
                let inner = payload.as_object().ok_or(ProtocolError::NotAnObject)?;
                let target_id = inner
                    .get("image_id")
                    .map(value_to_string)
                    .ok_or(ProtocolError::MissingField("image_id"))?;
                Ok(Self::Target {
                    obstacle_id: int_field(inner, "obstacle_id")?,
                    target_id,
                })
            }
            Category::Location => {
                let inner = payload.as_object().ok_or(ProtocolError::NotAnObject)?;
                Ok(Self::Location {
                    x: int_field(inner, "x")?,
                    y: int_field(inner, "y")?,
                    facing: direction_field(inner, "d")?,
                })
            }
        }
    }
}

fn envelope<T: Serialize>(category: Category, value: T) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(&Envelope {
        cat: category.as_str(),
        value,
    })?)
}

/// Render a scalar as text without JSON quoting.
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Read an integer that may be encoded as a JSON number or numeric string.
fn optional_int_field<T: TryFrom<i64>>(
    obj: &JsonObject,
    field: &'static str,
) -> Result<Option<T>, ProtocolError> {
    let Some(raw) = obj.get(field) else {
        return Ok(None);
    };
    let parsed = match raw {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed
        .and_then(|n| T::try_from(n).ok())
        .map(Some)
        .ok_or_else(|| ProtocolError::InvalidField {
            field,
            value: raw.to_string(),
        })
}

fn int_field<T: TryFrom<i64>>(obj: &JsonObject, field: &'static str) -> Result<T, ProtocolError> {
    optional_int_field(obj, field)?.ok_or(ProtocolError::MissingField(field))
}

/// Read a direction given as a compass code or a letter.
///
/// Unknown codes fall back to north; only a missing field is an error.
fn direction_field(obj: &JsonObject, field: &'static str) -> Result<Direction, ProtocolError> {
    let raw = obj.get(field).ok_or(ProtocolError::MissingField(field))?;
    let direction = match raw {
        Value::Number(n) => n.as_i64().and_then(Direction::from_code),
        Value::String(s) => Direction::parse(s).or_else(|| {
            s.trim()
                .parse::<i64>()
                .ok()
                .and_then(Direction::from_code)
        }),
        _ => None,
    };
    Ok(direction.unwrap_or_else(|| {
        warn!("Unknown direction code {}, defaulting to NORTH", raw);
        Direction::North
    }))
}
