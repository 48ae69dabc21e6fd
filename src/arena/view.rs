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

//! Screen-space pointer handling for the arena.
//!
//! Screen coordinates grow right and down; grid coordinates grow right and
//! up from the bottom-left cell.

use tracing::debug;

use super::grid::{Arena, GRID_SIZE};
use super::obstacle::Obstacle;
use super::robot::Robot;

/// Space reserved left of the grid for row labels.
const LABEL_MARGIN_LEFT: f32 = 30.0;

/// Space reserved below the grid for column labels.
const LABEL_MARGIN_BOTTOM: f32 = 30.0;

/// Affine mapping between a view's pixels and grid cells.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridGeometry {
    pub cell_size: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl GridGeometry {
    /// Fit square cells into a `width` x `height` view, leaving label margins.
    pub fn fit(width: f32, height: f32) -> Self {
        let available_width = width - LABEL_MARGIN_LEFT;
        let available_height = height - LABEL_MARGIN_BOTTOM;
        let grid = GRID_SIZE as f32;
        let cell_size = (available_width / grid).min(available_height / grid);
        let extent = cell_size * grid;
        Self {
            cell_size,
            offset_x: LABEL_MARGIN_LEFT + (available_width - extent) / 2.0,
            offset_y: (available_height - extent) / 2.0,
        }
    }

    /// Cell under a screen point, clamped onto the grid.
    pub fn screen_to_grid(&self, sx: f32, sy: f32) -> (i32, i32) {
        let gx = ((sx - self.offset_x) / self.cell_size) as i32;
        let row = (((sy - self.offset_y) / self.cell_size) as i32).clamp(0, GRID_SIZE - 1);
        (gx.clamp(0, GRID_SIZE - 1), GRID_SIZE - 1 - row)
    }

    /// Screen position of the top-left corner of a footprint.
    pub fn footprint_origin(&self, x: i32, y: i32, height: i32) -> (f32, f32) {
        (
            self.offset_x + x as f32 * self.cell_size,
            self.offset_y + (GRID_SIZE - y - height) as f32 * self.cell_size,
        )
    }

    /// Nearest row boundary to a screen y, clamped to `[0, GRID_SIZE]`.
    fn snapped_row(&self, sy: f32) -> i32 {
        (((sy - self.offset_y) / self.cell_size).round() as i32).clamp(0, GRID_SIZE)
    }

    fn extent(&self) -> f32 {
        GRID_SIZE as f32 * self.cell_size
    }
}

/// What a pointer gesture did to the arena.
#[derive(Debug, Clone, PartialEq)]
pub enum PointerOutcome {
    None,
    Selected(u32),
    EmptyCell { x: i32, y: i32 },
    RobotMoved(Robot),
    ObstacleMoved(u32),
    ObstacleRemoved(Obstacle),
}

#[derive(Debug, Clone, Copy)]
enum Drag {
    Robot {
        grab_dx: f32,
        grab_dy: f32,
    },
    Obstacle {
        id: u32,
        grab_dx: f32,
        grab_dy: f32,
        outside: bool,
    },
}

/// Tracks one in-progress drag.
#[derive(Debug, Default)]
pub struct PointerTracker {
    geometry: Option<GridGeometry>,
    drag: Option<Drag>,
}

impl PointerTracker {
    pub fn new(geometry: GridGeometry) -> Self {
        Self {
            geometry: Some(geometry),
            drag: None,
        }
    }

    pub fn set_geometry(&mut self, geometry: GridGeometry) {
        self.geometry = Some(geometry);
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Whether the obstacle being dragged is currently over the delete zone.
    pub fn is_outside_grid(&self) -> bool {
        matches!(self.drag, Some(Drag::Obstacle { outside: true, .. }))
    }

    /// Single tap: select the obstacle under the pointer.
    pub fn tap(&self, arena: &mut Arena, sx: f32, sy: f32) -> PointerOutcome {
        let Some(geometry) = self.geometry else {
            return PointerOutcome::None;
        };
        let (x, y) = geometry.screen_to_grid(sx, sy);
        match arena.select_at(x, y).map(Obstacle::id) {
            Some(id) => PointerOutcome::Selected(id),
            None => PointerOutcome::EmptyCell { x, y },
        }
    }

    /// Start a drag on the robot (checked first, it is drawn on top) or an obstacle.
    pub fn pointer_down(&mut self, arena: &mut Arena, sx: f32, sy: f32) -> PointerOutcome {
        self.drag = None;
        let Some(geometry) = self.geometry else {
            return PointerOutcome::None;
        };
        if arena.is_drag_locked() {
            return PointerOutcome::None;
        }
        let (x, y) = geometry.screen_to_grid(sx, sy);

        if let Some(robot) = arena.robot().filter(|r| r.contains_point(x, y)) {
            let (ox, oy) = geometry.footprint_origin(robot.x, robot.y, Robot::SIZE);
            self.drag = Some(Drag::Robot {
                grab_dx: sx - ox,
                grab_dy: sy - oy,
            });
            return PointerOutcome::None;
        }

        let Some(obstacle) = arena.select_at(x, y) else {
            return PointerOutcome::None;
        };
        let id = obstacle.id();
        let (ox, oy) = geometry.footprint_origin(obstacle.x, obstacle.y, obstacle.height());
        self.drag = Some(Drag::Obstacle {
            id,
            grab_dx: sx - ox,
            grab_dy: sy - oy,
            outside: false,
        });
        PointerOutcome::Selected(id)
    }

    /// Follow the pointer, snapping the dragged entity to whole cells.
    pub fn pointer_move(&mut self, arena: &mut Arena, sx: f32, sy: f32) {
        let (Some(geometry), Some(drag)) = (self.geometry, self.drag.as_mut()) else {
            return;
        };
        match drag {
            Drag::Robot { grab_dx, grab_dy } => {
                let left = sx - *grab_dx;
                let top = sy - *grab_dy;
                let max = Robot::max_coordinate(GRID_SIZE);
                let gx = ((left - geometry.offset_x) / geometry.cell_size).round() as i32;
                let row = geometry.snapped_row(top);
                let gy = GRID_SIZE - Robot::SIZE - row;
                if let Some(robot) = arena.robot_mut() {
                    robot.x = gx.clamp(0, max);
                    robot.y = gy.clamp(0, max);
                }
            }
            Drag::Obstacle {
                id,
                grab_dx,
                grab_dy,
                outside,
            } => {
                let Some(obstacle) = arena.obstacle(*id) else {
                    return;
                };
                let (width, height) = (obstacle.width(), obstacle.height());
                let left = sx - *grab_dx;
                let top = sy - *grab_dy;
                let center_x = left + width as f32 * geometry.cell_size / 2.0;
                let center_y = top + height as f32 * geometry.cell_size / 2.0;
                let extent = geometry.extent();
                *outside = center_x < geometry.offset_x
                    || center_x > geometry.offset_x + extent
                    || center_y < geometry.offset_y
                    || center_y > geometry.offset_y + extent;

                if !*outside {
                    let gx = ((left - geometry.offset_x) / geometry.cell_size).round() as i32;
                    let row = geometry.snapped_row(top);
                    let gy = GRID_SIZE - height - row;
                    if let Err(e) = arena.move_obstacle(*id, gx, gy) {
                        debug!("Drag move skipped: {}", e);
                    }
                }
            }
        }
    }

    /// Finish the drag; an obstacle released outside the grid is deleted.
    pub fn pointer_up(&mut self, arena: &mut Arena) -> PointerOutcome {
        match self.drag.take() {
            Some(Drag::Robot { .. }) => arena
                .robot()
                .copied()
                .map_or(PointerOutcome::None, PointerOutcome::RobotMoved),
            Some(Drag::Obstacle { id, outside, .. }) => {
                if outside {
                    debug!("Obstacle #{} dropped outside the grid", id);
                    arena
                        .remove_obstacle(id)
                        .map_or(PointerOutcome::None, PointerOutcome::ObstacleRemoved)
                } else {
                    PointerOutcome::ObstacleMoved(id)
                }
            }
            None => PointerOutcome::None,
        }
    }
}
