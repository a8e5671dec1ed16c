use crate::types::Direction;

/// Last-write-wins direction source. Keys still held are remembered so that
/// letting go of the newest one hands control back to an older one.
#[derive(Clone, Debug, Default)]
pub struct InputLatch {
    held: Vec<Direction>,
    current: Option<Direction>,
    pending: Option<Direction>,
}

impl InputLatch {
    pub fn press(&mut self, direction: Direction) {
        self.held.retain(|held| *held != direction);
        self.held.push(direction);
        self.current = Some(direction);
        self.pending = Some(direction);
    }

    pub fn release(&mut self, direction: Direction) {
        self.held.retain(|held| *held != direction);
        if self.current != Some(direction) {
            return;
        }
        if let Some(&fallback) = self.held.last() {
            self.current = Some(fallback);
            self.pending = Some(fallback);
        }
    }

    /// Direction to hand to the engine this tick, if it changed.
    pub fn take(&mut self) -> Option<Direction> {
        self.pending.take()
    }

    pub fn clear(&mut self) {
        self.held.clear();
        self.current = None;
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_press_wins() {
        let mut latch = InputLatch::default();
        latch.press(Direction::Up);
        latch.press(Direction::Left);
        assert_eq!(latch.take(), Some(Direction::Left));
        assert_eq!(latch.take(), None);
    }

    #[test]
    fn releasing_newest_key_falls_back_to_held_key() {
        let mut latch = InputLatch::default();
        latch.press(Direction::Up);
        latch.press(Direction::Left);
        latch.take();
        latch.release(Direction::Left);
        assert_eq!(latch.take(), Some(Direction::Up));
    }

    #[test]
    fn releasing_older_key_changes_nothing() {
        let mut latch = InputLatch::default();
        latch.press(Direction::Up);
        latch.press(Direction::Left);
        latch.take();
        latch.release(Direction::Up);
        assert_eq!(latch.take(), None);
        latch.release(Direction::Left);
        assert_eq!(latch.take(), None);
    }

    #[test]
    fn clear_forgets_held_keys() {
        let mut latch = InputLatch::default();
        latch.press(Direction::Down);
        latch.press(Direction::Right);
        latch.clear();
        latch.release(Direction::Right);
        assert_eq!(latch.take(), None);
    }
}
