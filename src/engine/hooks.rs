/// What agents may ask of, or tell, the game loop while they move.
///
/// `GameEngine` owns the implementer, a [`TickSignals`] field, so an agent can
/// hold the hooks and the map mutably at once. The engine stamps the tick with
/// [`TickSignals::begin`] and drains the flags after the player has moved.
pub trait GameHooks {
    fn current_tick(&self) -> u64;
    fn notify_level_complete(&mut self);
    fn notify_pill_eaten(&mut self);
}

/// Per-tick mailbox the engine drains after the player has moved.
#[derive(Clone, Debug, Default)]
pub struct TickSignals {
    tick: u64,
    level_complete: bool,
    pill_eaten: bool,
}

impl TickSignals {
    pub fn begin(&mut self, tick: u64) {
        self.tick = tick;
        self.level_complete = false;
        self.pill_eaten = false;
    }

    pub fn take_level_complete(&mut self) -> bool {
        std::mem::take(&mut self.level_complete)
    }

    pub fn take_pill_eaten(&mut self) -> bool {
        std::mem::take(&mut self.pill_eaten)
    }
}

impl GameHooks for TickSignals {
    fn current_tick(&self) -> u64 {
        self.tick
    }

    fn notify_level_complete(&mut self) {
        self.level_complete = true;
    }

    fn notify_pill_eaten(&mut self) {
        self.pill_eaten = true;
    }
}

#[cfg(test)]
mod tests {
    use super::{GameHooks, TickSignals};

    #[test]
    fn flags_are_taken_once_and_cleared_each_tick() {
        let mut signals = TickSignals::default();
        signals.begin(41);
        assert_eq!(signals.current_tick(), 41);
        signals.notify_pill_eaten();
        signals.notify_level_complete();
        assert!(signals.take_pill_eaten());
        assert!(!signals.take_pill_eaten());
        assert!(signals.take_level_complete());

        signals.notify_pill_eaten();
        signals.begin(42);
        assert_eq!(signals.current_tick(), 42);
        assert!(!signals.take_pill_eaten());
    }
}
