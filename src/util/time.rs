//! Frame timing

use std::time::{Duration, Instant};

/// Longest step fed to the simulation after a stall
pub const MAX_FRAME_DT: f32 = 0.25;

/// Frame period for a target rate
pub fn frame_period(frame_rate: u32) -> Duration {
    Duration::from_micros(1_000_000 / u64::from(frame_rate.max(1)))
}

/// Measures elapsed time between frames
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    fps: f32,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(now: Instant) -> Self {
        Self { last: now, fps: 0.0 }
    }

    /// Seconds since the previous tick, capped at [`MAX_FRAME_DT`]
    pub fn tick(&mut self, now: Instant) -> f32 {
        let elapsed = now.saturating_duration_since(self.last).as_secs_f32();
        self.last = now;
        if elapsed > 0.0 {
            self.fps = 1.0 / elapsed;
        }
        elapsed.min(MAX_FRAME_DT)
    }

    /// Rate implied by the last tick
    pub fn fps(&self) -> f32 {
        self.fps
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_reports_elapsed_and_fps() {
        let start = Instant::now();
        let mut clock = FrameClock::starting_at(start);
        let dt = clock.tick(start + Duration::from_millis(20));
        assert!((dt - 0.02).abs() < 1e-4);
        assert!((clock.fps() - 50.0).abs() < 0.1);
    }

    #[test]
    fn long_stall_is_capped() {
        let start = Instant::now();
        let mut clock = FrameClock::starting_at(start);
        assert_eq!(clock.tick(start + Duration::from_secs(3)), MAX_FRAME_DT);
        assert!(clock.fps() < 1.0);
    }

    #[test]
    fn frame_period_from_rate() {
        assert_eq!(frame_period(50), Duration::from_millis(20));
        assert_eq!(frame_period(0), Duration::from_secs(1));
    }
}
