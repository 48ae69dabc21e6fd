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

//! Obstacle placed on the arena.

use std::fmt;

use super::direction::Direction;

/// An axis-aligned obstacle with a target marker on one face.
///
/// Position is the bottom-left cell; the footprint covers the half-open
/// ranges `[x, x + width)` and `[y, y + height)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Obstacle {
    id: u32,
    pub x: i32,
    pub y: i32,
    width: i32,
    height: i32,
    pub target_face: Direction,
    recognized_target: Option<String>,
}

impl Obstacle {
    /// Create a 1x1 obstacle facing north.
    pub fn new(id: u32, x: i32, y: i32) -> Self {
        Self::with_size(id, x, y, 1, 1)
    }

    /// Create an obstacle with explicit dimensions (each at least 1).
    pub fn with_size(id: u32, x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            id,
            x,
            y,
            width: width.max(1),
            height: height.max(1),
            target_face: Direction::North,
            recognized_target: None,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn set_width(&mut self, width: i32) {
        self.width = width.max(1);
    }

    pub fn set_height(&mut self, height: i32) {
        self.height = height.max(1);
    }

    /// Target id reported by the robot, if any.
    pub fn recognized_target(&self) -> Option<&str> {
        self.recognized_target.as_deref()
    }

    pub fn set_recognized_target(&mut self, target: impl Into<String>) {
        let target = target.into();
        self.recognized_target = if target.is_empty() { None } else { Some(target) };
    }

    /// Right edge (exclusive).
    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.width)
    }

    /// Top edge (exclusive).
    pub fn top(&self) -> i32 {
        self.y.saturating_add(self.height)
    }

    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.top()
    }

    pub fn overlaps(&self, other: &Obstacle) -> bool {
        !(self.right() <= other.x
            || other.right() <= self.x
            || self.top() <= other.y
            || other.top() <= self.y)
    }

    /// Whether the whole footprint lies inside a `grid_size` square.
    pub fn fits_within(&self, grid_size: i32) -> bool {
        self.x >= 0 && self.y >= 0 && self.right() <= grid_size && self.top() <= grid_size
    }
}

impl fmt::Display for Obstacle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Obstacle #{} at ({}, {}) {}x{} face={}",
            self.id, self.x, self.y, self.width, self.height, self.target_face
        )?;
        if let Some(target) = &self.recognized_target {
            write!(f, " target={}", target)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_point_half_open() {
        let obs = Obstacle::with_size(1, 5, 10, 2, 3);
        assert!(obs.contains_point(5, 10));
        assert!(obs.contains_point(6, 12));
        assert!(!obs.contains_point(7, 10));
        assert!(!obs.contains_point(5, 13));
        assert!(!obs.contains_point(4, 10));
    }

    #[test]
    fn test_overlap_is_symmetric() {
        let a = Obstacle::with_size(1, 0, 0, 2, 2);
        let touching = Obstacle::new(2, 2, 0);
        let inside = Obstacle::new(3, 1, 1);
        let far = Obstacle::with_size(4, 10, 10, 3, 1);

        for other in [&touching, &inside, &far] {
            assert_eq!(a.overlaps(other), other.overlaps(&a));
        }
        assert!(!a.overlaps(&touching));
        assert!(a.overlaps(&inside));
        assert!(!a.overlaps(&far));
    }

    #[test]
    fn test_dimensions_never_below_one() {
        let mut obs = Obstacle::with_size(1, 0, 0, 0, -4);
        assert_eq!((obs.width(), obs.height()), (1, 1));
        obs.set_width(-1);
        obs.set_height(3);
        assert_eq!((obs.width(), obs.height()), (1, 3));
    }

    #[test]
    fn test_fits_within() {
        assert!(Obstacle::with_size(1, 18, 18, 2, 2).fits_within(20));
        assert!(!Obstacle::with_size(1, 19, 18, 2, 2).fits_within(20));
        assert!(!Obstacle::new(1, -1, 0).fits_within(20));
    }

    #[test]
    fn test_recognized_target() {
        let mut obs = Obstacle::new(1, 0, 0);
        assert_eq!(obs.recognized_target(), None);
        obs.set_recognized_target("11");
        assert_eq!(obs.recognized_target(), Some("11"));
        obs.set_recognized_target("");
        assert_eq!(obs.recognized_target(), None);
    }
}
