use std::time::{Duration, Instant};

/// Fixed-rate tick gate. At most one tick fires per poll and time lost to a
/// slow frame is dropped, never replayed as a burst.
#[derive(Clone, Debug)]
pub struct FrameClock {
    frame: Duration,
    last: Option<Instant>,
}

impl FrameClock {
    pub fn new(fps: u64) -> Self {
        Self {
            frame: Duration::from_micros(1_000_000 / fps.max(1)),
            last: None,
        }
    }

    pub fn frame(&self) -> Duration {
        self.frame
    }

    pub fn poll(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last {
            if now.saturating_duration_since(last) < self.frame {
                return false;
            }
        }
        self.last = Some(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_once_per_frame() {
        let mut clock = FrameClock::new(60);
        let t0 = Instant::now();
        assert!(clock.poll(t0));
        assert!(!clock.poll(t0 + Duration::from_millis(10)));
        assert!(clock.poll(t0 + Duration::from_millis(17)));
        assert!(!clock.poll(t0 + Duration::from_millis(20)));
    }

    #[test]
    fn stall_does_not_queue_ticks() {
        let mut clock = FrameClock::new(60);
        let t0 = Instant::now();
        assert!(clock.poll(t0));
        let late = t0 + Duration::from_millis(500);
        assert!(clock.poll(late));
        assert!(!clock.poll(late + Duration::from_millis(1)));
        assert!(!clock.poll(late + Duration::from_millis(16)));
        assert!(clock.poll(late + clock.frame()));
    }

    #[test]
    fn frame_length_follows_rate() {
        assert_eq!(FrameClock::new(60).frame(), Duration::from_micros(16_666));
        assert_eq!(FrameClock::new(0).frame(), Duration::from_secs(1));
    }
}
