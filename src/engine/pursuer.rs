use tracing::warn;

use crate::rng::Rng;
use crate::types::{Direction, GameConfig, MoveOutcome, Position, PursuerView, ThreatState};
use crate::world::GridMap;

use super::motion::{Body, MotionController, Step, TurnRule, Tunnel};
use super::utils::{random_turn, shuffled_turns};

/// The pending turn, then each perpendicular. Validated layouts never need
/// more; anything else holds the pursuer in place for the tick.
const MAX_MOVE_ATTEMPTS: usize = Direction::CARDINALS.len() - 1;

#[derive(Clone, Debug)]
struct Timing {
    speed: i32,
    vulnerable_speed: i32,
    hidden_speed: i32,
    vulnerable_ticks: u64,
    hidden_ticks: u64,
    flash_after_ticks: u64,
    flash_cadence_ticks: u64,
}

#[derive(Clone, Debug)]
pub struct Pursuer {
    index: usize,
    pub(super) body: Body,
    previous: Position,
    start: Position,
    controller: MotionController,
    timing: Timing,
    pub(super) threat: ThreatState,
}

impl Pursuer {
    pub fn new(index: usize, config: &GameConfig, tunnel: Tunnel, rng: &mut Rng) -> Self {
        let mut pursuer = Self {
            index,
            body: Body::new(config.pursuer_start, Direction::None, Direction::None),
            previous: config.pursuer_start,
            start: config.pursuer_start,
            controller: MotionController::new(TurnRule::AlignedOnly, tunnel),
            timing: Timing {
                speed: config.pursuer_speed,
                vulnerable_speed: config.pursuer_vulnerable_speed,
                hidden_speed: config.pursuer_hidden_speed,
                vulnerable_ticks: config.vulnerable_ticks,
                hidden_ticks: config.hidden_ticks,
                flash_after_ticks: config.flash_after_ticks,
                flash_cadence_ticks: config.flash_cadence_ticks.max(1),
            },
            threat: ThreatState::Dangerous,
        };
        pursuer.reset(rng);
        pursuer
    }

    /// Back to the pen, dangerous, heading off on a random turn.
    pub fn reset(&mut self, rng: &mut Rng) {
        let direction = random_turn(rng, self.body.direction);
        let due = random_turn(rng, direction);
        self.body = Body::new(self.start, direction, due);
        self.previous = self.start;
        self.threat = ThreatState::Dangerous;
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn position(&self) -> Position {
        self.body.position
    }

    pub fn direction(&self) -> Direction {
        self.body.direction
    }

    pub fn threat(&self) -> ThreatState {
        self.threat
    }

    pub fn eatable_since(&self) -> Option<u64> {
        match self.threat {
            ThreatState::Vulnerable { since } => Some(since),
            _ => None,
        }
    }

    pub fn eaten_since(&self) -> Option<u64> {
        match self.threat {
            ThreatState::Hidden { since } => Some(since),
            _ => None,
        }
    }

    pub fn is_vulnerable(&self) -> bool {
        matches!(self.threat, ThreatState::Vulnerable { .. })
    }

    pub fn is_dangerous(&self) -> bool {
        self.threat == ThreatState::Dangerous
    }

    /// Turns around and becomes edible. A hidden pursuer is caught by this
    /// too and stops being hidden.
    pub fn make_vulnerable(&mut self, tick: u64) {
        self.body.direction = self.body.direction.opposite();
        self.threat = ThreatState::Vulnerable { since: tick };
    }

    /// Only a vulnerable pursuer can be eaten.
    pub fn eat(&mut self, tick: u64) -> bool {
        if !self.is_vulnerable() {
            return false;
        }
        self.threat = ThreatState::Hidden { since: tick };
        true
    }

    /// Reverts timed states that have run their course.
    pub fn expire(&mut self, tick: u64) {
        let expired = match self.threat {
            ThreatState::Dangerous => false,
            ThreatState::Vulnerable { since } => {
                tick.saturating_sub(since) >= self.timing.vulnerable_ticks
            }
            ThreatState::Hidden { since } => tick.saturating_sub(since) >= self.timing.hidden_ticks,
        };
        if expired {
            self.threat = ThreatState::Dangerous;
        }
    }

    pub fn speed(&self) -> i32 {
        match self.threat {
            ThreatState::Dangerous => self.timing.speed,
            ThreatState::Vulnerable { .. } => self.timing.vulnerable_speed,
            ThreatState::Hidden { .. } => self.timing.hidden_speed,
        }
    }

    /// Late in a vulnerable spell the renderer blinks the pursuer.
    pub fn is_flashing(&self, tick: u64) -> bool {
        let Some(since) = self.eatable_since() else {
            return false;
        };
        let cadence = self.timing.flash_cadence_ticks;
        tick.saturating_sub(since) > self.timing.flash_after_ticks && tick % cadence > cadence / 2
    }

    pub fn step(&mut self, map: &GridMap, rng: &mut Rng) -> MoveOutcome {
        let old = self.body.position;
        self.previous = old;
        let speed = self.speed();
        let mut fallbacks: Option<[Direction; 2]> = None;

        for attempt in 0..MAX_MOVE_ATTEMPTS {
            match self.controller.plan(&mut self.body, map, speed) {
                Step::Advance(next) => {
                    self.body.position = next;
                    self.body.due = random_turn(rng, self.body.direction);
                    return MoveOutcome { new: next, old };
                }
                Step::Blocked => {
                    let turns = *fallbacks
                        .get_or_insert_with(|| shuffled_turns(rng, self.body.direction));
                    if let Some(turn) = turns.get(attempt) {
                        self.body.due = *turn;
                    }
                }
            }
        }

        warn!(
            pursuer = self.index,
            x = old.x,
            y = old.y,
            direction = ?self.body.direction,
            "pursuer boxed in; holding position"
        );
        MoveOutcome::stationary(old)
    }

    pub fn view(&self, tick: u64) -> PursuerView {
        PursuerView {
            index: self.index,
            position: self.body.position,
            previous: self.previous,
            direction: self.body.direction,
            due: self.body.due,
            threat: self.threat,
            flashing: self.is_flashing(tick),
        }
    }
}
