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

//! Tilt-to-movement filter.
//!
//! Turns raw accelerometer samples into discrete movement commands using a
//! dead zone and a minimum re-fire interval.

use std::time::{Duration, Instant};

use crate::bluetooth::Movement;
use crate::config::TiltConfig;

#[derive(Debug, Clone)]
pub struct TiltController {
    threshold: f32,
    interval: Duration,
    last_fired: Option<Instant>,
}

impl TiltController {
    pub fn new(threshold: f32, interval: Duration) -> Self {
        Self {
            threshold: threshold.abs(),
            interval,
            last_fired: None,
        }
    }

    pub fn from_config(config: &TiltConfig) -> Self {
        Self::new(config.threshold, config.interval())
    }

    /// Feed one sample taken at `now`.
    ///
    /// The axis with the larger magnitude decides the direction. Samples
    /// inside the dead zone, or within the interval of the last command,
    /// produce nothing.
    pub fn sample(&mut self, x: f32, y: f32, now: Instant) -> Option<Movement> {
        if let Some(last) = self.last_fired {
            if now.saturating_duration_since(last) < self.interval {
                return None;
            }
        }

        let movement = if y.abs() > x.abs() {
            if y < -self.threshold {
                Some(Movement::Up)
            } else if y > self.threshold {
                Some(Movement::Down)
            } else {
                None
            }
        } else if x > self.threshold {
            Some(Movement::Left)
        } else if x < -self.threshold {
            Some(Movement::Right)
        } else {
            None
        };

        if movement.is_some() {
            self.last_fired = Some(now);
        }
        movement
    }

    /// Forget the last command, e.g. when tilt is re-enabled.
    pub fn reset(&mut self) {
        self.last_fired = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> TiltController {
        TiltController::new(3.0, Duration::from_millis(500))
    }

    #[test]
    fn test_dominant_axis_wins() {
        let now = Instant::now();
        assert_eq!(controller().sample(1.0, -5.0, now), Some(Movement::Up));
        assert_eq!(controller().sample(-1.0, 5.0, now), Some(Movement::Down));
        assert_eq!(controller().sample(6.0, 4.0, now), Some(Movement::Left));
        assert_eq!(controller().sample(-6.0, -4.0, now), Some(Movement::Right));
    }

    #[test]
    fn test_dead_zone() {
        let mut tilt = controller();
        let now = Instant::now();
        assert_eq!(tilt.sample(2.9, -2.9, now), None);
        assert_eq!(tilt.sample(-3.0, 0.0, now), None);
        // Quiet samples do not start the interval.
        assert_eq!(tilt.sample(0.0, -4.0, now), Some(Movement::Up));
    }

    #[test]
    fn test_refire_interval() {
        let mut tilt = controller();
        let start = Instant::now();
        assert_eq!(tilt.sample(0.0, -4.0, start), Some(Movement::Up));
        assert_eq!(
            tilt.sample(0.0, -4.0, start + Duration::from_millis(499)),
            None
        );
        assert_eq!(
            tilt.sample(5.0, 0.0, start + Duration::from_millis(500)),
            Some(Movement::Left)
        );

        tilt.reset();
        assert_eq!(
            tilt.sample(5.0, 0.0, start + Duration::from_millis(501)),
            Some(Movement::Left)
        );
    }
}
