use serde::{Deserialize, Serialize};

/// Global day timer and speed control.
///
/// Frame deltas are scaled by the speed multiplier, which is kept within
/// `[0, max_speed]`. Pausing forces the multiplier to zero and remembers the
/// previous value, so paused frames still tick agents with zero elapsed time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationClock {
    day_length: f64,
    max_speed: f64,
    speed: f64,
    saved_speed: f64,
    active: bool,
    timer: f64,
    day: usize,
}

impl SimulationClock {
    pub fn new(day_length: f64, max_speed: f64, speed: f64) -> Self {
        let mut clock = Self {
            day_length,
            max_speed: max_speed.max(0.0),
            speed: 0.0,
            saved_speed: 0.0,
            active: true,
            timer: 0.0,
            day: 0,
        };
        clock.set_speed_multiplier(speed);
        clock
    }

    pub fn day_length(&self) -> f64 {
        self.day_length
    }

    /// Completed days since the last reset.
    pub fn day(&self) -> usize {
        self.day
    }

    pub fn timer(&self) -> f64 {
        self.timer
    }

    pub fn active(&self) -> bool {
        self.active
    }

    /// Effective multiplier, zero while paused.
    pub fn speed_multiplier(&self) -> f64 {
        self.speed
    }

    /// Set the multiplier, clamped to `[0, max_speed]`.
    ///
    /// While paused only the value restored on resume changes.
    pub fn set_speed_multiplier(&mut self, speed: f64) {
        let speed = if speed.is_nan() {
            0.0
        } else {
            speed.clamp(0.0, self.max_speed)
        };
        if self.active {
            self.speed = speed;
        } else {
            self.saved_speed = speed;
        }
    }

    pub fn set_active(&mut self, active: bool) {
        if active == self.active {
            return;
        }
        if active {
            self.speed = self.saved_speed;
        } else {
            self.saved_speed = self.speed;
            self.speed = 0.0;
        }
        self.active = active;
    }

    /// Simulated seconds elapsed during a frame of `frame_dt` wall seconds.
    pub fn scale(&self, frame_dt: f64) -> f64 {
        if !(frame_dt > 0.0) || !frame_dt.is_finite() {
            return 0.0;
        }
        frame_dt * self.speed
    }

    /// Accumulate `sim_dt`; returns `true` when a day boundary is crossed.
    pub fn advance(&mut self, sim_dt: f64) -> bool {
        self.timer += sim_dt;
        if self.timer > self.day_length {
            self.timer = 0.0;
            self.day += 1;
            return true;
        }
        false
    }

    /// Rewind to day zero, keeping the speed settings.
    pub fn reset(&mut self) {
        self.timer = 0.0;
        self.day = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speed_multiplier_stays_clamped() {
        let mut clock = SimulationClock::new(10.0, 4.0, 1.0);
        for speed in [-3.0, 0.5, 100.0, f64::INFINITY, f64::NEG_INFINITY, f64::NAN, 3.9] {
            clock.set_speed_multiplier(speed);
            let val = clock.speed_multiplier();
            assert!((0.0..=4.0).contains(&val), "{speed} -> {val}");
        }
        clock.set_speed_multiplier(100.0);
        assert_eq!(clock.speed_multiplier(), 4.0);
    }

    #[test]
    fn pause_zeroes_and_resume_restores() {
        let mut clock = SimulationClock::new(10.0, 4.0, 2.0);
        clock.set_active(false);
        assert_eq!(clock.speed_multiplier(), 0.0);
        assert_eq!(clock.scale(0.1), 0.0);

        clock.set_speed_multiplier(3.0);
        assert_eq!(clock.speed_multiplier(), 0.0);

        clock.set_active(true);
        assert_eq!(clock.speed_multiplier(), 3.0);
        assert!((clock.scale(0.1) - 0.3).abs() < 1e-12);
    }

    #[test]
    fn day_boundary_resets_timer() {
        let mut clock = SimulationClock::new(1.0, 4.0, 1.0);
        let mut boundaries = 0;
        for _ in 0..25 {
            if clock.advance(clock.scale(0.1)) {
                boundaries += 1;
                assert_eq!(clock.timer(), 0.0);
            }
        }
        assert_eq!(boundaries, 2);
        assert_eq!(clock.day(), 2);

        clock.reset();
        assert_eq!(clock.day(), 0);
    }

    #[test]
    fn negative_frame_delta_is_ignored() {
        let clock = SimulationClock::new(1.0, 4.0, 1.0);
        assert_eq!(clock.scale(-0.5), 0.0);
        assert_eq!(clock.scale(f64::NAN), 0.0);
    }
}
