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

//! Arena state: obstacles, robot and selection.

use tracing::{debug, info};

use super::direction::{Direction, Rotation};
use super::obstacle::Obstacle;
use super::robot::Robot;
use crate::error::ArenaError;

/// Edge length of the square arena in grid units.
pub const GRID_SIZE: i32 = 20;

/// The operator's model of the arena.
///
/// Owns obstacle id assignment: ids start at 1, increase by one per creation
/// and only reset when every obstacle is cleared.
#[derive(Debug)]
pub struct Arena {
    obstacles: Vec<Obstacle>,
    next_id: u32,
    robot: Option<Robot>,
    selected: Option<u32>,
    drag_locked: bool,
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

impl Arena {
    pub fn new() -> Self {
        Self {
            obstacles: Vec::new(),
            next_id: 1,
            robot: None,
            selected: None,
            drag_locked: false,
        }
    }

    pub fn grid_size(&self) -> i32 {
        GRID_SIZE
    }

    fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Add a 1x1 obstacle at `(x, y)`.
    pub fn add_obstacle(&mut self, x: i32, y: i32) -> Result<u32, ArenaError> {
        self.add_obstacle_sized(x, y, 1, 1)
    }

    /// Add an obstacle with explicit dimensions at `(x, y)`.
    ///
    /// The committed footprint must lie inside the grid; no id is consumed
    /// when it does not.
    pub fn add_obstacle_sized(
        &mut self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    ) -> Result<u32, ArenaError> {
        if !(0..GRID_SIZE).contains(&x) || !(0..GRID_SIZE).contains(&y) {
            return Err(ArenaError::OutOfBounds { x, y });
        }
        let candidate = Obstacle::with_size(0, x, y, width, height);
        if !candidate.fits_within(GRID_SIZE) {
            return Err(ArenaError::OutOfBounds { x, y });
        }
        let id = self.allocate_id();
        let obstacle = Obstacle::with_size(id, x, y, width, height);
        debug!("Added {}", obstacle);
        self.obstacles.push(obstacle);
        Ok(id)
    }

    /// Add an obstacle of the requested size centered on the grid and select it.
    ///
    /// Dimensions are clamped into `[1, GRID_SIZE]`.
    pub fn add_centered(&mut self, width: i32, height: i32, face: Direction) -> u32 {
        let width = width.clamp(1, GRID_SIZE);
        let height = height.clamp(1, GRID_SIZE);
        let id = self.allocate_id();
        let mut obstacle = Obstacle::with_size(
            id,
            (GRID_SIZE - width) / 2,
            (GRID_SIZE - height) / 2,
            width,
            height,
        );
        obstacle.target_face = face;
        info!("Added {}", obstacle);
        self.obstacles.push(obstacle);
        self.selected = Some(id);
        id
    }

    /// Resize an obstacle and change its target face.
    ///
    /// Dimensions are clamped into `[1, GRID_SIZE]` and the obstacle is shifted
    /// back inside the grid if the new size would overflow it.
    pub fn edit_obstacle(
        &mut self,
        id: u32,
        width: i32,
        height: i32,
        face: Direction,
    ) -> Result<(), ArenaError> {
        let obstacle = self.obstacle_mut(id).ok_or(ArenaError::LookupMiss(id))?;
        obstacle.set_width(width.clamp(1, GRID_SIZE));
        obstacle.set_height(height.clamp(1, GRID_SIZE));
        obstacle.target_face = face;
        if obstacle.right() > GRID_SIZE {
            obstacle.x = GRID_SIZE - obstacle.width();
        }
        if obstacle.top() > GRID_SIZE {
            obstacle.y = GRID_SIZE - obstacle.height();
        }
        info!("Edited {}", obstacle);
        Ok(())
    }

    /// Move an obstacle so its bottom-left cell is `(x, y)`.
    ///
    /// Positions are clamped so the footprint stays on the grid.
    pub fn move_obstacle(&mut self, id: u32, x: i32, y: i32) -> Result<(), ArenaError> {
        let obstacle = self.obstacle_mut(id).ok_or(ArenaError::LookupMiss(id))?;
        obstacle.x = x.clamp(0, GRID_SIZE - obstacle.width());
        obstacle.y = y.clamp(0, GRID_SIZE - obstacle.height());
        debug!("Moved {}", obstacle);
        Ok(())
    }

    pub fn remove_obstacle(&mut self, id: u32) -> Option<Obstacle> {
        let index = self.obstacles.iter().position(|o| o.id() == id)?;
        if self.selected == Some(id) {
            self.selected = None;
        }
        let removed = self.obstacles.remove(index);
        info!("Removed {}", removed);
        Some(removed)
    }

    /// Remove every obstacle and reset id assignment to 1.
    pub fn clear_obstacles(&mut self) {
        self.obstacles.clear();
        self.selected = None;
        self.next_id = 1;
    }

    /// Remove every obstacle and the robot.
    pub fn clear_all(&mut self) {
        self.clear_obstacles();
        self.robot = None;
        info!("Arena cleared");
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn obstacle(&self, id: u32) -> Option<&Obstacle> {
        self.obstacles.iter().find(|o| o.id() == id)
    }

    pub fn obstacle_mut(&mut self, id: u32) -> Option<&mut Obstacle> {
        self.obstacles.iter_mut().find(|o| o.id() == id)
    }

    /// First obstacle covering cell `(x, y)`, in insertion order.
    pub fn obstacle_at(&self, x: i32, y: i32) -> Option<&Obstacle> {
        self.obstacles.iter().find(|o| o.contains_point(x, y))
    }

    /// Whether `candidate` would overlap any live obstacle other than itself.
    pub fn overlaps_any(&self, candidate: &Obstacle) -> bool {
        self.obstacles
            .iter()
            .filter(|o| o.id() != candidate.id())
            .any(|o| o.overlaps(candidate))
    }

    /// Record a recognized target on a live obstacle.
    pub fn set_recognized_target(&mut self, id: u32, target: &str) -> Result<(), ArenaError> {
        let obstacle = self.obstacle_mut(id).ok_or(ArenaError::LookupMiss(id))?;
        obstacle.set_recognized_target(target);
        Ok(())
    }

    pub fn select(&mut self, id: u32) -> Result<(), ArenaError> {
        if self.obstacle(id).is_none() {
            return Err(ArenaError::LookupMiss(id));
        }
        self.selected = Some(id);
        Ok(())
    }

    /// Select the obstacle covering cell `(x, y)`, if any.
    pub fn select_at(&mut self, x: i32, y: i32) -> Option<&Obstacle> {
        let index = self.obstacles.iter().position(|o| o.contains_point(x, y))?;
        let obstacle = &self.obstacles[index];
        self.selected = Some(obstacle.id());
        Some(obstacle)
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<&Obstacle> {
        self.selected.and_then(|id| self.obstacle(id))
    }

    pub fn set_drag_locked(&mut self, locked: bool) {
        self.drag_locked = locked;
    }

    pub fn is_drag_locked(&self) -> bool {
        self.drag_locked
    }

    /// Place a fresh robot at the bottom-left corner facing north.
    ///
    /// An existing robot is reset.
    pub fn spawn_robot(&mut self) -> &Robot {
        self.robot.insert(Robot::default())
    }

    pub fn remove_robot(&mut self) -> Option<Robot> {
        self.robot.take()
    }

    pub fn robot(&self) -> Option<&Robot> {
        self.robot.as_ref()
    }

    pub fn robot_mut(&mut self) -> Option<&mut Robot> {
        self.robot.as_mut()
    }

    /// Overwrite robot position and facing, creating the robot if absent.
    ///
    /// Rejects anchors that would put the 3x3 footprint off the grid and
    /// leaves the previous state untouched.
    pub fn update_robot(&mut self, x: i32, y: i32, facing: Direction) -> Result<&Robot, ArenaError> {
        if !Robot::in_bounds(x, y, GRID_SIZE) {
            return Err(ArenaError::OutOfBounds { x, y });
        }
        Ok(self.robot.insert(Robot::new(x, y, facing)))
    }

    /// Rotate the robot in place, if there is one.
    pub fn rotate_robot(&mut self, rotation: Rotation) -> Option<&Robot> {
        let robot = self.robot.as_mut()?;
        robot.rotate(rotation);
        Some(robot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_monotonic_and_reset_on_clear() {
        let mut arena = Arena::new();
        let ids: Vec<u32> = (0..5)
            .map(|i| arena.add_obstacle(i * 2, 0).unwrap())
            .collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);

        // Removing one does not recycle its id.
        arena.remove_obstacle(3);
        assert_eq!(arena.add_obstacle(15, 15).unwrap(), 6);

        arena.clear_obstacles();
        assert!(arena.obstacles().is_empty());
        assert_eq!(arena.add_obstacle(0, 0).unwrap(), 1);
    }

    #[test]
    fn test_add_out_of_bounds_consumes_no_id() {
        let mut arena = Arena::new();
        assert_eq!(
            arena.add_obstacle_sized(19, 0, 2, 1),
            Err(ArenaError::OutOfBounds { x: 19, y: 0 })
        );
        assert_eq!(arena.add_obstacle(0, 0).unwrap(), 1);
    }

    #[test]
    fn test_add_far_outside_grid_is_rejected() {
        let mut arena = Arena::new();
        assert_eq!(
            arena.add_obstacle(i32::MAX, 0),
            Err(ArenaError::OutOfBounds { x: i32::MAX, y: 0 })
        );
        assert_eq!(
            arena.add_obstacle(0, i32::MIN),
            Err(ArenaError::OutOfBounds { x: 0, y: i32::MIN })
        );
        assert_eq!(
            arena.add_obstacle_sized(0, 0, i32::MAX, 1),
            Err(ArenaError::OutOfBounds { x: 0, y: 0 })
        );
        assert_eq!(arena.add_obstacle(0, 0).unwrap(), 1);
    }

    #[test]
    fn test_select_at_covering_obstacle() {
        let mut arena = Arena::new();
        let id = arena.add_obstacle_sized(4, 4, 2, 2).unwrap();
        arena.clear_selection();
        assert!(arena.select_at(0, 0).is_none());
        assert!(arena.selected().is_none());

        assert_eq!(arena.select_at(5, 5).map(|o| o.id()), Some(id));
        assert_eq!(arena.selected().map(|o| o.id()), Some(id));
    }

    #[test]
    fn test_add_centered_clamps_and_selects() {
        let mut arena = Arena::new();
        let id = arena.add_centered(4, 50, Direction::East);
        let obs = arena.obstacle(id).unwrap();
        assert_eq!((obs.width(), obs.height()), (4, GRID_SIZE));
        assert_eq!((obs.x, obs.y), (8, 0));
        assert_eq!(obs.target_face, Direction::East);
        assert_eq!(arena.selected().map(Obstacle::id), Some(id));
    }

    #[test]
    fn test_edit_shifts_back_inside_grid() {
        let mut arena = Arena::new();
        let id = arena.add_obstacle(18, 19).unwrap();
        arena.edit_obstacle(id, 4, 3, Direction::South).unwrap();
        let obs = arena.obstacle(id).unwrap();
        assert_eq!((obs.x, obs.y), (16, 17));
        assert!(obs.fits_within(GRID_SIZE));
        assert_eq!(obs.target_face, Direction::South);

        assert_eq!(
            arena.edit_obstacle(99, 1, 1, Direction::North),
            Err(ArenaError::LookupMiss(99))
        );
    }

    #[test]
    fn test_target_lookup_miss_leaves_state() {
        let mut arena = Arena::new();
        let id = arena.add_obstacle(3, 3).unwrap();
        assert_eq!(
            arena.set_recognized_target(42, "7"),
            Err(ArenaError::LookupMiss(42))
        );
        assert_eq!(arena.obstacle(id).unwrap().recognized_target(), None);

        arena.set_recognized_target(id, "7").unwrap();
        assert_eq!(arena.obstacle(id).unwrap().recognized_target(), Some("7"));
    }

    #[test]
    fn test_robot_update_bounds() {
        let mut arena = Arena::new();
        assert!(arena.robot().is_none());

        arena.update_robot(17, 17, Direction::West).unwrap();
        assert_eq!(arena.robot(), Some(&Robot::new(17, 17, Direction::West)));

        assert_eq!(
            arena.update_robot(18, 5, Direction::North).map(|r| *r),
            Err(ArenaError::OutOfBounds { x: 18, y: 5 })
        );
        assert_eq!(arena.robot(), Some(&Robot::new(17, 17, Direction::West)));
    }

    #[test]
    fn test_spawn_resets_existing_robot() {
        let mut arena = Arena::new();
        arena.update_robot(5, 5, Direction::South).unwrap();
        arena.spawn_robot();
        assert_eq!(arena.robot(), Some(&Robot::default()));
        arena.clear_all();
        assert!(arena.robot().is_none());
    }

    #[test]
    fn test_overlaps_any_excludes_self() {
        let mut arena = Arena::new();
        let a = arena.add_obstacle_sized(0, 0, 2, 2).unwrap();
        arena.add_obstacle(5, 5).unwrap();

        let moved = arena.obstacle(a).unwrap().clone();
        assert!(!arena.overlaps_any(&moved));

        arena.move_obstacle(a, 4, 4).unwrap();
        let moved = arena.obstacle(a).unwrap().clone();
        assert!(arena.overlaps_any(&moved));
    }

    #[test]
    fn test_remove_clears_selection() {
        let mut arena = Arena::new();
        let id = arena.add_obstacle(1, 1).unwrap();
        arena.select(id).unwrap();
        arena.remove_obstacle(id);
        assert!(arena.selected().is_none());
        assert_eq!(arena.select(id), Err(ArenaError::LookupMiss(id)));
    }
}
