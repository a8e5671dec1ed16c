use crate::constants::{CELL_SIZE, TUNNEL_OVERHANG};
use crate::types::{Direction, Position};
use crate::world::GridMap;

/// Which direction changes may happen between grid lines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnRule {
    /// Every change of direction waits for grid alignment.
    AlignedOnly,
    /// Reversals along the current axis happen immediately.
    ReverseAnywhere,
}

/// Horizontal wrap on a single row. Leaving east at `east` re-enters at
/// `west` and the reverse, so crossing and coming back is lossless.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tunnel {
    pub row: i32,
    pub east: i32,
    pub west: i32,
}

impl Tunnel {
    pub fn for_map(row: i32, map_width: i32) -> Self {
        Self {
            row,
            east: map_width * CELL_SIZE,
            west: -TUNNEL_OVERHANG,
        }
    }

    fn span(&self) -> i32 {
        self.east - self.west
    }

    pub fn wrap(&self, pos: Position, dir: Direction) -> Position {
        if pos.y != self.row * CELL_SIZE {
            return pos;
        }
        match dir {
            Direction::Right if pos.x >= self.east => Position::new(pos.x - self.span(), pos.y),
            Direction::Left if pos.x <= self.west => Position::new(pos.x + self.span(), pos.y),
            _ => pos,
        }
    }
}

/// Kinematic state every agent carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Body {
    pub position: Position,
    pub direction: Direction,
    pub due: Direction,
}

impl Body {
    pub fn new(position: Position, direction: Direction, due: Direction) -> Self {
        Self {
            position,
            direction,
            due,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// Where the body should go. Not yet committed.
    Advance(Position),
    /// Aligned and facing a wall.
    Blocked,
}

#[derive(Clone, Copy, Debug)]
pub struct MotionController {
    pub rule: TurnRule,
    pub tunnel: Tunnel,
}

impl MotionController {
    pub fn new(rule: TurnRule, tunnel: Tunnel) -> Self {
        Self { rule, tunnel }
    }

    /// Applies a pending turn when it is legal and plans one step. Only
    /// `direction` is written; the caller commits the position.
    pub fn plan(&self, body: &mut Body, map: &GridMap, speed: i32) -> Step {
        let on_grid = body.position.is_grid_aligned();
        let mut planned = None;

        if body.due != body.direction {
            let candidate = advance(body.position, body.due, speed);
            let reversal =
                self.rule == TurnRule::ReverseAnywhere && body.due.same_axis(body.direction);
            let (row, col) = cell_ahead(candidate, body.due);
            if reversal || (on_grid && map.is_floor(row, col)) {
                body.direction = body.due;
                planned = Some(candidate);
            }
        }

        let next = planned.unwrap_or_else(|| advance(body.position, body.direction, speed));
        let (row, col) = cell_ahead(next, body.direction);
        if on_grid && map.is_wall(row, col) {
            return Step::Blocked;
        }
        Step::Advance(self.tunnel.wrap(next, body.direction))
    }
}

/// Adds `delta` but never carries the value past the next grid line.
pub fn add_bounded(value: i32, delta: i32) -> i32 {
    let rem = value % CELL_SIZE;
    let result = rem + delta;
    if rem != 0 && result > CELL_SIZE {
        value + (CELL_SIZE - rem)
    } else if rem > 0 && result < 0 {
        value - rem
    } else {
        value + delta
    }
}

pub fn advance(pos: Position, dir: Direction, speed: i32) -> Position {
    let (dx, dy) = match dir {
        Direction::Left => (-speed, 0),
        Direction::Right => (speed, 0),
        Direction::Up => (0, -speed),
        Direction::Down => (0, speed),
        Direction::None => (0, 0),
    };
    Position::new(add_bounded(pos.x, dx), add_bounded(pos.y, dy))
}

/// The grid line an agent at `value` reaches next when moving in `dir`.
pub fn next_grid_line(value: i32, dir: Direction) -> i32 {
    let rem = value % CELL_SIZE;
    if rem == 0 {
        value
    } else if matches!(dir, Direction::Right | Direction::Down) {
        value + (CELL_SIZE - rem)
    } else {
        value - rem
    }
}

/// (row, col) of the cell the agent is entering.
pub fn cell_ahead(pos: Position, dir: Direction) -> (i32, i32) {
    (
        next_grid_line(pos.y, dir) / CELL_SIZE,
        next_grid_line(pos.x, dir) / CELL_SIZE,
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use proptest::prelude::*;

    use super::*;
    use crate::world::LevelTemplate;

    fn standard_map() -> GridMap {
        GridMap::new(Arc::new(LevelTemplate::standard().expect("standard level")))
    }

    fn controller(rule: TurnRule) -> MotionController {
        MotionController::new(rule, Tunnel::for_map(10, 19))
    }

    fn walk(ctl: &MotionController, body: &mut Body, map: &GridMap, speed: i32) -> Step {
        let step = ctl.plan(body, map, speed);
        if let Step::Advance(next) = step {
            body.position = next;
        }
        step
    }

    #[test]
    fn add_bounded_stops_at_grid_lines() {
        assert_eq!(add_bounded(98, 4), 100);
        assert_eq!(add_bounded(102, -4), 100);
        assert_eq!(add_bounded(100, 4), 104);
        assert_eq!(add_bounded(100, -4), 96);
        assert_eq!(add_bounded(94, 2), 96);
    }

    #[test]
    fn next_grid_line_follows_direction() {
        assert_eq!(next_grid_line(118, Direction::Up), 110);
        assert_eq!(next_grid_line(118, Direction::Down), 120);
        assert_eq!(next_grid_line(120, Direction::Left), 120);
        assert_eq!(next_grid_line(-12, Direction::Right), 0);
        assert_eq!(next_grid_line(-12, Direction::Left), -10);
    }

    #[test]
    fn east_exit_reenters_west_of_the_maze() {
        let map = standard_map();
        let ctl = controller(TurnRule::ReverseAnywhere);
        let mut body = Body::new(Position::new(192, 100), Direction::Right, Direction::Right);
        assert_eq!(walk(&ctl, &mut body, &map, 2), Step::Advance(Position::new(-8, 100)));
    }

    #[test]
    fn wrap_only_applies_on_the_tunnel_row() {
        let tunnel = Tunnel::for_map(10, 19);
        let off_row = Position::new(194, 90);
        assert_eq!(tunnel.wrap(off_row, Direction::Right), off_row);
        assert_eq!(
            tunnel.wrap(Position::new(-12, 100), Direction::Left),
            Position::new(190, 100)
        );
        assert_eq!(
            tunnel.wrap(Position::new(-12, 100), Direction::Right),
            Position::new(-12, 100)
        );
    }

    #[test]
    fn perpendicular_turn_waits_for_alignment() {
        let map = standard_map();
        let ctl = controller(TurnRule::ReverseAnywhere);
        let mut body = Body::new(Position::new(42, 100), Direction::Left, Direction::Up);

        walk(&ctl, &mut body, &map, 2);
        assert_eq!(body.position, Position::new(40, 100));
        assert_eq!(body.direction, Direction::Left);

        walk(&ctl, &mut body, &map, 2);
        assert_eq!(body.position, Position::new(40, 98));
        assert_eq!(body.direction, Direction::Up);
    }

    #[test]
    fn turn_into_wall_is_refused() {
        let map = standard_map();
        let ctl = controller(TurnRule::AlignedOnly);
        let mut body = Body::new(Position::new(90, 120), Direction::Left, Direction::Up);
        walk(&ctl, &mut body, &map, 2);
        assert_eq!(body.position, Position::new(88, 120));
        assert_eq!(body.direction, Direction::Left);
        assert_eq!(body.due, Direction::Up);
    }

    #[test]
    fn reversal_rule_differs_off_grid() {
        let map = standard_map();
        let mut free = Body::new(Position::new(42, 100), Direction::Left, Direction::Right);
        walk(&controller(TurnRule::ReverseAnywhere), &mut free, &map, 2);
        assert_eq!(free.position, Position::new(44, 100));
        assert_eq!(free.direction, Direction::Right);

        let mut strict = Body::new(Position::new(42, 100), Direction::Left, Direction::Right);
        walk(&controller(TurnRule::AlignedOnly), &mut strict, &map, 2);
        assert_eq!(strict.position, Position::new(40, 100));
        assert_eq!(strict.direction, Direction::Left);
    }

    #[test]
    fn aligned_body_facing_wall_is_blocked() {
        let map = standard_map();
        let ctl = controller(TurnRule::AlignedOnly);
        let mut body = Body::new(Position::new(90, 120), Direction::Up, Direction::Up);
        assert_eq!(walk(&ctl, &mut body, &map, 2), Step::Blocked);
        assert_eq!(body.position, Position::new(90, 120));
    }

    #[test]
    fn stationary_body_plans_in_place() {
        let map = standard_map();
        let ctl = controller(TurnRule::ReverseAnywhere);
        let mut body = Body::new(Position::new(90, 120), Direction::None, Direction::None);
        assert_eq!(
            walk(&ctl, &mut body, &map, 2),
            Step::Advance(Position::new(90, 120))
        );
    }

    proptest! {
        #[test]
        fn tunnel_crossing_walks_back_to_start(half in 75i32..95, ticks in 0usize..=36) {
            let map = standard_map();
            let ctl = controller(TurnRule::ReverseAnywhere);
            let start = Position::new(half * 2, 100);
            let mut body = Body::new(start, Direction::Right, Direction::Right);
            for _ in 0..ticks {
                prop_assert!(matches!(walk(&ctl, &mut body, &map, 2), Step::Advance(_)));
            }
            body.due = Direction::Left;
            for _ in 0..ticks {
                prop_assert!(matches!(walk(&ctl, &mut body, &map, 2), Step::Advance(_)));
            }
            prop_assert_eq!(body.position, start);
        }
    }
}
