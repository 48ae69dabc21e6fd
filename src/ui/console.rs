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

//! Operator console on stdin/stdout.

use anyhow::{anyhow, bail, Context, Result};
use std::fmt::Write as _;
use std::str::FromStr;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::arena::{Arena, Direction, Rotation, GRID_SIZE};
use crate::bluetooth::Movement;

/// Size of the virtual canvas used by the pointer commands, in pixels.
pub const CANVAS_SIZE: f32 = 630.0;

pub const HELP: &str = "\
Connection:
  listen                      wait for the robot to connect
  peers                       list paired devices
  connect <index|address>     connect to a paired device
  disconnect                  close the link and listen again
  status                      show link and robot status
Robot control:
  up | down | left | right    manual movement
  start                       start the autonomous run
  send <text>                 send raw text
  tilt on|off | tilt <x> <y>  tilt control and accelerometer samples
Arena:
  obstacles                   send the obstacle list
  add [<w> <h> [<face>]]      add a centered obstacle
  place <x> <y>               add a 1x1 obstacle at a cell
  select <id> | edit <w> <h> <face> | delete
  move <id> <x> <y>           move an obstacle
  clear | clear all           remove obstacles (and the robot)
  robot spawn|remove|cw|ccw   manage the robot marker
  robot <x> <y> [<face>]      place the robot
  lock on|off                 toggle drag lock
  tap <sx> <sy>               tap on the 630x630 canvas
  drag <sx> <sy> <sx2> <sy2>  drag on the 630x630 canvas
Other:
  show | log | help | quit";

/// Robot marker operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RobotAction {
    Spawn,
    Remove,
    Rotate(Rotation),
    Place { x: i32, y: i32, facing: Direction },
}

/// Tilt control operations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TiltAction {
    Enable(bool),
    Sample { x: f32, y: f32 },
}

/// Actions entered at the console.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleAction {
    Listen,
    Peers,
    /// Paired-list index or address.
    Connect(String),
    Disconnect,
    Status,
    Move(Movement),
    Start,
    Send(String),
    Tilt(TiltAction),
    SendObstacles,
    Add {
        width: i32,
        height: i32,
        face: Direction,
    },
    Place {
        x: i32,
        y: i32,
    },
    Select(u32),
    Edit {
        width: i32,
        height: i32,
        face: Direction,
    },
    Delete,
    MoveObstacle {
        id: u32,
        x: i32,
        y: i32,
    },
    Clear,
    ClearAll,
    Robot(RobotAction),
    Lock(bool),
    Tap {
        x: f32,
        y: f32,
    },
    Drag {
        from: (f32, f32),
        to: (f32, f32),
    },
    Show,
    Log,
    Help,
    Quit,
}

fn arg<T: FromStr>(args: &[&str], index: usize, name: &str) -> Result<T> {
    let raw = args
        .get(index)
        .ok_or_else(|| anyhow!("missing <{}>", name))?;
    raw.parse()
        .map_err(|_| anyhow!("invalid <{}>: {}", name, raw))
}

fn face_arg(args: &[&str], index: usize) -> Result<Direction> {
    match args.get(index) {
        Some(raw) => Direction::parse(raw).ok_or_else(|| anyhow!("invalid <face>: {}", raw)),
        None => Ok(Direction::North),
    }
}

fn on_off(args: &[&str]) -> Result<bool> {
    match args.first().map(|s| s.to_ascii_lowercase()).as_deref() {
        Some("on") => Ok(true),
        Some("off") => Ok(false),
        _ => bail!("expected on|off"),
    }
}

impl ConsoleAction {
    /// Parse one console line. Empty lines yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let line = line.trim();
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };
        if command.is_empty() {
            return Ok(None);
        }

        // `send` keeps its text untouched.
        if command.eq_ignore_ascii_case("send") {
            if rest.is_empty() {
                bail!("nothing to send");
            }
            return Ok(Some(Self::Send(rest.to_string())));
        }

        let args: Vec<&str> = rest.split_whitespace().collect();
        let command = command.to_ascii_lowercase();

        if let Some(movement) = Movement::parse(&command) {
            return Ok(Some(Self::Move(movement)));
        }

        let action = match command.as_str() {
            "listen" => Self::Listen,
            "peers" => Self::Peers,
            "connect" => Self::Connect(arg(&args, 0, "index|address")?),
            "disconnect" => Self::Disconnect,
            "status" => Self::Status,
            "start" => Self::Start,
            "tilt" => match args.len() {
                2 => Self::Tilt(TiltAction::Sample {
                    x: arg(&args, 0, "x")?,
                    y: arg(&args, 1, "y")?,
                }),
                _ => Self::Tilt(TiltAction::Enable(on_off(&args)?)),
            },
            "obstacles" => Self::SendObstacles,
            "add" => {
                if args.is_empty() {
                    Self::Add {
                        width: 1,
                        height: 1,
                        face: Direction::North,
                    }
                } else {
                    Self::Add {
                        width: arg(&args, 0, "w")?,
                        height: arg(&args, 1, "h")?,
                        face: face_arg(&args, 2)?,
                    }
                }
            }
            "place" => Self::Place {
                x: arg(&args, 0, "x")?,
                y: arg(&args, 1, "y")?,
            },
            "select" => Self::Select(arg(&args, 0, "id")?),
            "edit" => Self::Edit {
                width: arg(&args, 0, "w")?,
                height: arg(&args, 1, "h")?,
                face: face_arg(&args, 2)?,
            },
            "delete" => Self::Delete,
            "move" => Self::MoveObstacle {
                id: arg(&args, 0, "id")?,
                x: arg(&args, 1, "x")?,
                y: arg(&args, 2, "y")?,
            },
            "clear" => match args.first() {
                Some(&"all") => Self::ClearAll,
                None => Self::Clear,
                Some(other) => bail!("unknown clear target: {}", other),
            },
            "robot" => Self::Robot(parse_robot(&args)?),
            "lock" => Self::Lock(on_off(&args)?),
            "tap" => Self::Tap {
                x: arg(&args, 0, "sx")?,
                y: arg(&args, 1, "sy")?,
            },
            "drag" => Self::Drag {
                from: (arg(&args, 0, "sx")?, arg(&args, 1, "sy")?),
                to: (arg(&args, 2, "sx2")?, arg(&args, 3, "sy2")?),
            },
            "show" => Self::Show,
            "log" => Self::Log,
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => bail!("unknown command: {} (try `help`)", other),
        };
        Ok(Some(action))
    }
}

fn parse_robot(args: &[&str]) -> Result<RobotAction> {
    let first = args
        .first()
        .context("expected spawn|remove|cw|ccw|<x> <y>")?;
    let action = match first.to_ascii_lowercase().as_str() {
        "spawn" => RobotAction::Spawn,
        "remove" => RobotAction::Remove,
        "cw" => RobotAction::Rotate(Rotation::Clockwise),
        "ccw" => RobotAction::Rotate(Rotation::CounterClockwise),
        _ => RobotAction::Place {
            x: arg(args, 0, "x")?,
            y: arg(args, 1, "y")?,
            facing: face_arg(args, 2)?,
        },
    };
    Ok(action)
}

/// Read console lines on a background task.
pub fn run_console() -> mpsc::UnboundedReceiver<ConsoleAction> {
    let (action_tx, action_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => match ConsoleAction::parse(&line) {
                    Ok(Some(action)) => {
                        debug!("Console action: {:?}", action);
                        if action_tx.send(action).is_err() {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => println!("error: {}", e),
                },
                Ok(None) => {
                    info!("Console input closed");
                    let _ = action_tx.send(ConsoleAction::Quit);
                    break;
                }
                Err(e) => {
                    info!("Console read failed: {}", e);
                    break;
                }
            }
        }
    });

    info!("Console started, type `help` for commands");
    action_rx
}

fn facing_glyph(direction: Direction) -> char {
    match direction {
        Direction::North => '^',
        Direction::East => '>',
        Direction::South => 'v',
        Direction::West => '<',
    }
}

/// Render the arena as text, top row first.
pub fn render_arena(arena: &Arena) -> String {
    let selected = arena.selected().map(|o| o.id());
    let mut out = String::new();

    for y in (0..GRID_SIZE).rev() {
        let _ = write!(out, "{:>2} ", y);
        for x in 0..GRID_SIZE {
            let cell = if let Some(robot) = arena.robot().filter(|r| r.contains_point(x, y)) {
                if x == robot.x + 1 && y == robot.y + 1 {
                    facing_glyph(robot.facing)
                } else {
                    'R'
                }
            } else if let Some(obstacle) = arena.obstacle_at(x, y) {
                if Some(obstacle.id()) == selected {
                    '@'
                } else if obstacle.recognized_target().is_some() {
                    '*'
                } else {
                    obstacle.target_face.letter()
                }
            } else {
                '.'
            };
            out.push(' ');
            out.push(cell);
        }
        out.push('\n');
    }

    out.push_str("   ");
    for x in 0..GRID_SIZE {
        let _ = write!(out, "{:>2}", x % 10);
    }
    out.push('\n');

    for obstacle in arena.obstacles() {
        let _ = writeln!(out, "  {}", obstacle);
    }
    if let Some(robot) = arena.robot() {
        let _ = writeln!(out, "  {}", robot);
    }
    out
}
