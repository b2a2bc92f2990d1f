//! Deferred respawn keyed by generation

use std::time::{Duration, Instant};

/// A respawn waiting for its due time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledRespawn {
    pub generation: u64,
    pub due: Instant,
}

/// Fire-once respawn timer. Every `schedule` bumps the generation, so a
/// respawn scheduled earlier can never fire once a newer one exists.
#[derive(Debug, Default)]
pub struct RespawnScheduler {
    generation: u64,
    pending: Option<ScheduledRespawn>,
}

impl RespawnScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, now: Instant, delay: Duration) -> ScheduledRespawn {
        self.generation += 1;
        let scheduled = ScheduledRespawn {
            generation: self.generation,
            due: now + delay,
        };
        self.pending = Some(scheduled);
        scheduled
    }

    /// Consume the pending respawn if it is due. Returns the generation fired.
    pub fn poll(&mut self, now: Instant) -> Option<u64> {
        match self.pending {
            Some(scheduled) if scheduled.due <= now && scheduled.generation == self.generation => {
                self.pending = None;
                Some(scheduled.generation)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_when_due() {
        let start = Instant::now();
        let mut scheduler = RespawnScheduler::new();
        scheduler.schedule(start, Duration::from_millis(500));

        assert_eq!(scheduler.poll(start + Duration::from_millis(100)), None);
        assert_eq!(scheduler.poll(start + Duration::from_millis(500)), Some(1));
        assert_eq!(scheduler.poll(start + Duration::from_secs(5)), None);
        assert_eq!(scheduler.pending, None);
    }

    #[test]
    fn newer_schedule_invalidates_older() {
        let start = Instant::now();
        let mut scheduler = RespawnScheduler::new();
        let first = scheduler.schedule(start, Duration::from_secs(1));
        let second = scheduler.schedule(start + Duration::from_millis(500), Duration::from_secs(1));

        assert_ne!(scheduler.pending, Some(first));
        assert_eq!(scheduler.pending, Some(second));

        // The first would have been due here
        assert_eq!(scheduler.poll(start + Duration::from_secs(1)), None);
        assert_eq!(
            scheduler.poll(start + Duration::from_millis(1500)),
            Some(second.generation)
        );
        assert_eq!(second.generation, 2);
    }
}
