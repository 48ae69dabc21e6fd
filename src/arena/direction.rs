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

//! Compass directions on an 8-point code wheel.

use std::fmt;

/// Number of points on the compass code wheel.
const COMPASS_POINTS: u8 = 8;

/// Step between adjacent cardinal directions on the code wheel.
const CARDINAL_STEP: u8 = 2;

/// Cardinal direction, used both for robot facing and obstacle target faces.
///
/// Each direction carries a code on an 8-point compass (N=0, E=2, S=4, W=6),
/// leaving the odd codes free for diagonals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    #[default]
    North,
    East,
    South,
    West,
}

/// Rotation sense for [`Direction::rotate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Clockwise,
    CounterClockwise,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Numeric compass code.
    pub fn code(&self) -> u8 {
        match self {
            Self::North => 0,
            Self::East => 2,
            Self::South => 4,
            Self::West => 6,
        }
    }

    /// Exact lookup by compass code.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::North),
            2 => Some(Self::East),
            4 => Some(Self::South),
            6 => Some(Self::West),
            _ => None,
        }
    }

    /// Single-letter code used on the wire and in the console.
    pub fn letter(&self) -> char {
        match self {
            Self::North => 'N',
            Self::East => 'E',
            Self::South => 'S',
            Self::West => 'W',
        }
    }

    /// Parse a letter or full name, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "N" | "NORTH" => Some(Self::North),
            "E" | "EAST" => Some(Self::East),
            "S" | "SOUTH" => Some(Self::South),
            "W" | "WEST" => Some(Self::West),
            _ => None,
        }
    }

    /// Upper-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::North => "NORTH",
            Self::East => "EAST",
            Self::South => "SOUTH",
            Self::West => "WEST",
        }
    }

    /// Advance or retreat one cardinal step on the code wheel.
    ///
    /// Codes wrap mod 8 and snap down to the nearest cardinal, so a future
    /// diagonal code still rotates onto a defined direction.
    pub fn rotate(self, rotation: Rotation) -> Self {
        let code = match rotation {
            Rotation::Clockwise => (self.code() + CARDINAL_STEP) % COMPASS_POINTS,
            Rotation::CounterClockwise => {
                (self.code() + COMPASS_POINTS - CARDINAL_STEP) % COMPASS_POINTS
            }
        };
        Self::from_code(i64::from(code - code % CARDINAL_STEP)).unwrap_or_default()
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_two_apart() {
        let codes: Vec<u8> = Direction::ALL.iter().map(Direction::code).collect();
        assert_eq!(codes, vec![0, 2, 4, 6]);
        for d in Direction::ALL {
            assert_eq!(Direction::from_code(i64::from(d.code())), Some(d));
        }
        assert_eq!(Direction::from_code(1), None);
        assert_eq!(Direction::from_code(8), None);
    }

    #[test]
    fn test_rotate_full_turn() {
        let mut d = Direction::North;
        let mut seen = Vec::new();
        for _ in 0..4 {
            d = d.rotate(Rotation::Clockwise);
            seen.push(d);
        }
        assert_eq!(
            seen,
            vec![
                Direction::East,
                Direction::South,
                Direction::West,
                Direction::North
            ]
        );

        assert_eq!(
            Direction::North.rotate(Rotation::CounterClockwise),
            Direction::West
        );
        assert_eq!(
            Direction::West.rotate(Rotation::CounterClockwise),
            Direction::South
        );
    }

    #[test]
    fn test_parse() {
        assert_eq!(Direction::parse("n"), Some(Direction::North));
        assert_eq!(Direction::parse("West"), Some(Direction::West));
        assert_eq!(Direction::parse(" S "), Some(Direction::South));
        assert_eq!(Direction::parse("up"), None);
    }
}
