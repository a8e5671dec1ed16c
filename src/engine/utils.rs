use crate::rng::Rng;
use crate::types::{Direction, Position};

/// A left or right turn relative to `dir`, never a reversal.
pub(super) fn random_turn(rng: &mut Rng, dir: Direction) -> Direction {
    rng.pick(&dir.perpendicular())
}

/// Both turns relative to `dir`, in random order.
pub(super) fn shuffled_turns(rng: &mut Rng, dir: Direction) -> [Direction; 2] {
    let mut turns = dir.perpendicular();
    if rng.pick_index(2) == 1 {
        turns.swap(0, 1);
    }
    turns
}

pub(super) fn squared_distance(a: Position, b: Position) -> i64 {
    let dx = (a.x - b.x) as i64;
    let dy = (a.y - b.y) as i64;
    dx * dx + dy * dy
}

/// Centre-to-centre test, so diagonal approaches are caught the same as
/// straight ones.
pub(super) fn within_capture(a: Position, b: Position, radius: i32) -> bool {
    let radius = radius as i64;
    squared_distance(a, b) < radius * radius
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_uses_euclidean_distance() {
        let origin = Position::new(50, 100);
        assert!(within_capture(origin, Position::new(59, 100), 10));
        assert!(!within_capture(origin, Position::new(60, 100), 10));
        assert!(!within_capture(origin, Position::new(61, 100), 10));
        assert!(within_capture(origin, Position::new(57, 107), 10));
        assert!(!within_capture(origin, Position::new(58, 108), 10));
    }

    #[test]
    fn turns_are_always_perpendicular() {
        let mut rng = Rng::new(5);
        for _ in 0..200 {
            let turn = random_turn(&mut rng, Direction::Left);
            assert!(turn.is_vertical());
            let turn = random_turn(&mut rng, Direction::Down);
            assert!(turn.is_horizontal());
        }
    }

    #[test]
    fn shuffled_turns_cover_both_options() {
        let mut rng = Rng::new(11);
        for _ in 0..50 {
            let [a, b] = shuffled_turns(&mut rng, Direction::Up);
            assert_ne!(a, b);
            assert!(a.is_horizontal() && b.is_horizontal());
        }
    }
}
