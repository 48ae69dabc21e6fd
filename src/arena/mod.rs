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

//! Grid entity model.
//!
//! Pure data and queries for the 20x20 arena: obstacles, the robot and
//! pointer interaction. No I/O happens here.

mod direction;
mod grid;
mod obstacle;
mod robot;
mod view;

pub use direction::{Direction, Rotation};
pub use grid::{Arena, GRID_SIZE};
pub use obstacle::Obstacle;
pub use robot::Robot;
pub use view::{GridGeometry, PointerOutcome, PointerTracker};
