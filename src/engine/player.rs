use crate::types::{Cell, Direction, GameConfig, MoveOutcome, PlayerView, Position};
use crate::world::GridMap;

use super::hooks::GameHooks;
use super::motion::{cell_ahead, Body, MotionController, Step, TurnRule, Tunnel};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConsumedItem {
    pub row: i32,
    pub col: i32,
    pub cell: Cell,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlayerStep {
    pub outcome: MoveOutcome,
    pub consumed: Option<ConsumedItem>,
}

#[derive(Clone, Debug)]
struct Scoring {
    biscuit: u32,
    pill: u32,
    extra_life: u32,
    item_target: u32,
    starting_lives: u32,
}

#[derive(Clone, Debug)]
pub struct Player {
    pub(super) body: Body,
    previous: Position,
    start: Position,
    speed: i32,
    controller: MotionController,
    scoring: Scoring,
    score: u32,
    lives: u32,
    pub(super) items_eaten: u32,
}

impl Player {
    pub fn new(config: &GameConfig, tunnel: Tunnel) -> Self {
        let mut player = Self {
            body: Body::new(config.player_start, Direction::Left, Direction::Left),
            previous: config.player_start,
            start: config.player_start,
            speed: config.player_speed,
            controller: MotionController::new(TurnRule::ReverseAnywhere, tunnel),
            scoring: Scoring {
                biscuit: config.biscuit_points,
                pill: config.pill_points,
                extra_life: config.extra_life_score,
                item_target: config.level_item_target,
                starting_lives: config.starting_lives,
            },
            score: 0,
            lives: 0,
            items_eaten: 0,
        };
        player.reset();
        player
    }

    /// Fresh game: score cleared, full lives.
    pub fn reset(&mut self) {
        self.score = 0;
        self.lives = self.scoring.starting_lives;
        self.new_level();
    }

    pub fn new_level(&mut self) {
        self.reset_position();
        self.items_eaten = 0;
    }

    pub fn reset_position(&mut self) {
        self.body = Body::new(self.start, Direction::Left, Direction::Left);
        self.previous = self.start;
    }

    pub fn set_due(&mut self, dir: Direction) {
        self.body.due = dir;
    }

    /// Returns true when this award crossed the extra-life threshold.
    pub fn add_score(&mut self, points: u32) -> bool {
        let before = self.score;
        self.score = self.score.saturating_add(points);
        let threshold = self.scoring.extra_life;
        if before < threshold && self.score >= threshold {
            self.lives += 1;
            return true;
        }
        false
    }

    pub fn lose_life(&mut self) {
        self.lives = self.lives.saturating_sub(1);
    }

    pub fn step(&mut self, map: &mut GridMap, hooks: &mut impl GameHooks) -> PlayerStep {
        let old = self.body.position;
        self.previous = old;

        let next = match self.controller.plan(&mut self.body, map, self.speed) {
            Step::Blocked => {
                self.body.direction = Direction::None;
                None
            }
            Step::Advance(_) if self.body.direction == Direction::None => None,
            Step::Advance(next) => Some(next),
        };
        let Some(next) = next else {
            return PlayerStep {
                outcome: MoveOutcome::stationary(old),
                consumed: None,
            };
        };

        self.body.position = next;
        let (row, col) = cell_ahead(next, self.body.direction);
        let consumed = self
            .consume_at(map, row, col, hooks)
            .map(|cell| ConsumedItem { row, col, cell });
        PlayerStep {
            outcome: MoveOutcome { new: next, old },
            consumed,
        }
    }

    /// Scores the item at (row, col), if any. A cell only pays once.
    pub fn consume_at(
        &mut self,
        map: &mut GridMap,
        row: i32,
        col: i32,
        hooks: &mut impl GameHooks,
    ) -> Option<Cell> {
        let cell = map.consume(row, col).filter(|cell| cell.is_item())?;
        let points = match cell {
            Cell::Pill => self.scoring.pill,
            _ => self.scoring.biscuit,
        };
        self.add_score(points);
        self.items_eaten += 1;
        if self.items_eaten == self.scoring.item_target {
            hooks.notify_level_complete();
        }
        if cell == Cell::Pill {
            hooks.notify_pill_eaten();
        }
        Some(cell)
    }

    pub fn position(&self) -> Position {
        self.body.position
    }

    pub fn direction(&self) -> Direction {
        self.body.direction
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn lives(&self) -> u32 {
        self.lives
    }

    pub fn items_eaten(&self) -> u32 {
        self.items_eaten
    }

    pub fn view(&self) -> PlayerView {
        PlayerView {
            position: self.body.position,
            previous: self.previous,
            direction: self.body.direction,
            due: self.body.due,
            score: self.score,
            lives: self.lives,
            items_eaten: self.items_eaten,
        }
    }
}
