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

//! Robot marker.

use std::fmt;

use super::direction::{Direction, Rotation};

/// The robot occupies a fixed 3x3 footprint anchored at its bottom-left cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Robot {
    pub x: i32,
    pub y: i32,
    pub facing: Direction,
}

impl Robot {
    /// Footprint edge length in grid units.
    pub const SIZE: i32 = 3;

    pub fn new(x: i32, y: i32, facing: Direction) -> Self {
        Self { x, y, facing }
    }

    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.x + Self::SIZE && y >= self.y && y < self.y + Self::SIZE
    }

    pub fn rotate(&mut self, rotation: Rotation) {
        self.facing = self.facing.rotate(rotation);
    }

    /// Largest valid anchor coordinate on a `grid_size` arena.
    pub fn max_coordinate(grid_size: i32) -> i32 {
        grid_size - Self::SIZE
    }

    /// Whether `(x, y)` is a valid anchor on a `grid_size` arena.
    pub fn in_bounds(x: i32, y: i32, grid_size: i32) -> bool {
        let max = Self::max_coordinate(grid_size);
        (0..=max).contains(&x) && (0..=max).contains(&y)
    }
}

impl Default for Robot {
    /// Bottom-left corner, facing north.
    fn default() -> Self {
        Self::new(0, 0, Direction::North)
    }
}

impl fmt::Display for Robot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Robot at ({}, {}) facing {}", self.x, self.y, self.facing)
    }
}
