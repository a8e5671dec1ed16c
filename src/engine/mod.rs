use std::sync::Arc;

use tracing::{debug, info};

use crate::rng::Rng;
use crate::types::{
    Direction, GameConfig, GamePhase, MapView, Position, RuntimeEvent, Snapshot, Trigger,
};
use crate::world::{GridMap, LevelTemplate, TemplateError};

pub mod hooks;
pub mod motion;
pub mod player;
pub mod pursuer;
mod utils;

use self::hooks::{GameHooks, TickSignals};
use self::motion::Tunnel;
use self::player::Player;
use self::pursuer::Pursuer;
use self::utils::within_capture;

/// One game: the maze, the player, the pursuers and the phase machine that
/// drives them at a fixed tick.
#[derive(Clone, Debug)]
pub struct GameEngine {
    pub config: GameConfig,

    template: Arc<LevelTemplate>,
    map: GridMap,
    rng: Rng,
    player: Player,
    pursuers: Vec<Pursuer>,
    /// The engine's [`GameHooks`] implementer, handed to the player each tick.
    signals: TickSignals,
    events: Vec<RuntimeEvent>,

    tick: u64,
    level: u32,
    phase: GamePhase,
    phase_started_at: u64,
    phase_changed: bool,
    paused_from: Option<(GamePhase, u64)>,
    countdown_shown: Option<i64>,
    eaten_combo: u32,
}

impl GameEngine {
    pub fn new(
        config: GameConfig,
        template: Arc<LevelTemplate>,
        mut rng: Rng,
    ) -> Result<Self, TemplateError> {
        template.validate(
            &[config.player_start, config.pursuer_start],
            config.tunnel_row,
            config.level_item_target,
        )?;

        let tunnel = Tunnel::for_map(config.tunnel_row, template.width());
        let player = Player::new(&config, tunnel);
        let pursuers = (0..config.pursuer_count)
            .map(|index| Pursuer::new(index, &config, tunnel, &mut rng))
            .collect();

        Ok(Self {
            map: GridMap::new(Arc::clone(&template)),
            template,
            rng,
            player,
            pursuers,
            signals: TickSignals::default(),
            events: Vec::new(),
            tick: 0,
            level: 1,
            phase: GamePhase::Waiting,
            phase_started_at: 0,
            phase_changed: true,
            paused_from: None,
            countdown_shown: None,
            eaten_combo: 0,
            config,
        })
    }

    pub fn standard(config: GameConfig, seed: u32) -> Result<Self, TemplateError> {
        let template = Arc::new(LevelTemplate::standard()?);
        Self::new(config, template, Rng::new(seed))
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn map(&self) -> &GridMap {
        &self.map
    }

    pub fn template(&self) -> &Arc<LevelTemplate> {
        &self.template
    }

    pub fn map_view(&self) -> MapView {
        self.map.to_view()
    }

    pub fn is_game_over(&self) -> bool {
        self.phase == GamePhase::Waiting && self.player.lives() == 0
    }

    /// Direction input is dropped while paused.
    pub fn set_player_due(&mut self, dir: Direction) {
        if self.phase != GamePhase::Pause {
            self.player.set_due(dir);
        }
    }

    pub fn handle_trigger(&mut self, trigger: Trigger) {
        match trigger {
            Trigger::Start => self.start_new_game(),
            Trigger::TogglePause => self.toggle_pause(),
        }
    }

    pub fn step(&mut self) {
        if self.phase != GamePhase::Pause {
            self.tick += 1;
            for pursuer in &mut self.pursuers {
                pursuer.expire(self.tick);
            }
        }
        self.signals.begin(self.tick);

        let elapsed = self.tick.saturating_sub(self.phase_started_at);
        match self.phase {
            GamePhase::Playing => self.update_playing(),
            GamePhase::Waiting => {
                if self.phase_changed {
                    self.phase_changed = false;
                    if self.config.auto_start {
                        self.start_new_game();
                    }
                }
            }
            GamePhase::EatenPause => {
                if elapsed > self.config.eaten_pause_ticks {
                    self.set_phase(GamePhase::Playing);
                }
            }
            GamePhase::Dying => {
                if elapsed > self.config.dying_ticks {
                    self.lose_life();
                }
            }
            GamePhase::Countdown => self.update_countdown(),
            GamePhase::Pause => {}
        }
    }

    pub fn build_snapshot(&mut self, include_events: bool) -> Snapshot {
        let snapshot = Snapshot {
            tick: self.tick,
            phase: self.phase,
            phase_started_at: self.phase_started_at,
            level: self.level,
            countdown: if self.phase == GamePhase::Countdown {
                self.countdown_shown
            } else {
                None
            },
            player: self.player.view(),
            pursuers: self.pursuers.iter().map(|p| p.view(self.tick)).collect(),
            events: if include_events {
                self.events.clone()
            } else {
                Vec::new()
            },
        };
        if include_events {
            self.events.clear();
        }
        snapshot
    }

    fn set_phase(&mut self, next: GamePhase) {
        let from = self.phase;
        self.phase = next;
        self.phase_started_at = self.tick;
        self.phase_changed = true;
        if from != next {
            debug!(tick = self.tick, ?from, to = ?next, "phase change");
            self.events.push(RuntimeEvent::PhaseChanged { from, to: next });
        }
    }

    fn toggle_pause(&mut self) {
        if self.phase == GamePhase::Pause {
            let Some((phase, started_at)) = self.paused_from.take() else {
                return;
            };
            self.phase = phase;
            self.phase_started_at = started_at;
            self.events.push(RuntimeEvent::PhaseChanged {
                from: GamePhase::Pause,
                to: phase,
            });
            debug!(tick = self.tick, to = ?phase, "resumed");
        } else {
            self.paused_from = Some((self.phase, self.phase_started_at));
            self.set_phase(GamePhase::Pause);
        }
    }

    fn start_new_game(&mut self) {
        info!(tick = self.tick, "new game");
        self.paused_from = None;
        self.set_phase(GamePhase::Waiting);
        self.level = 1;
        self.player.reset();
        self.map.reset();
        self.events.push(RuntimeEvent::MapReset);
        self.start_level();
    }

    fn start_level(&mut self) {
        self.player.reset_position();
        for pursuer in &mut self.pursuers {
            pursuer.reset(&mut self.rng);
        }
        self.set_phase(GamePhase::Countdown);
        let first = (self.config.countdown_seconds - 1).max(1);
        self.countdown_shown = Some(first);
        self.events.push(RuntimeEvent::CountdownTick { remaining: first });
    }

    fn update_countdown(&mut self) {
        let since = self.phase_started_at as i64 - self.tick as i64;
        let remaining = self.config.countdown_seconds + since.div_euclid(self.config.fps.max(1) as i64);
        if remaining <= 0 {
            self.set_phase(GamePhase::Playing);
        } else if self.countdown_shown != Some(remaining) {
            self.countdown_shown = Some(remaining);
            self.events.push(RuntimeEvent::CountdownTick { remaining });
        }
    }

    fn update_playing(&mut self) {
        let targets: Vec<Position> = self
            .pursuers
            .iter_mut()
            .map(|pursuer| pursuer.step(&self.map, &mut self.rng).new)
            .collect();

        let lives_before = self.player.lives();
        let moved = self.player.step(&mut self.map, &mut self.signals);
        if let Some(item) = moved.consumed {
            self.events.push(RuntimeEvent::ItemConsumed {
                row: item.row,
                col: item.col,
                cell: item.cell,
            });
        }
        self.note_extra_life(lives_before);

        if self.signals.take_level_complete() {
            self.complete_level();
            return;
        }
        if self.signals.take_pill_eaten() {
            self.eaten_pill();
        }
        self.resolve_pursuer_collisions(moved.outcome.new, &targets);
    }

    fn note_extra_life(&mut self, lives_before: u32) {
        let lives = self.player.lives();
        if lives > lives_before {
            info!(tick = self.tick, lives, "extra life");
            self.events.push(RuntimeEvent::ExtraLife { lives });
        }
    }

    fn eaten_pill(&mut self) {
        self.eaten_combo = 0;
        let tick = self.signals.current_tick();
        for pursuer in &mut self.pursuers {
            pursuer.make_vulnerable(tick);
        }
        self.events.push(RuntimeEvent::PillEaten);
    }

    /// Vulnerable pursuers in range are eaten first; a dangerous one in range
    /// still ends the life in the same tick.
    fn resolve_pursuer_collisions(&mut self, player: Position, pursuers: &[Position]) {
        let radius = self.config.capture_radius;
        let mut caught_by = None;

        for (index, position) in pursuers.iter().enumerate() {
            if !within_capture(player, *position, radius) {
                continue;
            }
            let Some(pursuer) = self.pursuers.get_mut(index) else {
                continue;
            };
            if pursuer.is_vulnerable() {
                pursuer.eat(self.tick);
                self.eaten_combo += 1;
                let points = self.eaten_combo * self.config.pursuer_combo_points;
                let lives_before = self.player.lives();
                self.player.add_score(points);
                self.events
                    .push(RuntimeEvent::PursuerEaten { index, points });
                self.note_extra_life(lives_before);
                if self.phase != GamePhase::EatenPause {
                    self.set_phase(GamePhase::EatenPause);
                }
            } else if pursuer.is_dangerous() && caught_by.is_none() {
                caught_by = Some(index);
            }
        }

        if let Some(index) = caught_by {
            self.events.push(RuntimeEvent::PlayerCaught { index });
            self.set_phase(GamePhase::Dying);
        }
    }

    fn lose_life(&mut self) {
        self.set_phase(GamePhase::Waiting);
        self.player.lose_life();
        let lives_left = self.player.lives();
        self.events.push(RuntimeEvent::LifeLost { lives_left });
        if lives_left > 0 {
            self.start_level();
        } else {
            info!(
                tick = self.tick,
                score = self.player.score(),
                level = self.level,
                "game over"
            );
            self.events.push(RuntimeEvent::GameOver {
                score: self.player.score(),
                level: self.level,
            });
        }
    }

    fn complete_level(&mut self) {
        info!(tick = self.tick, level = self.level, score = self.player.score(), "level complete");
        self.events.push(RuntimeEvent::LevelCompleted { level: self.level });
        self.set_phase(GamePhase::Waiting);
        self.level += 1;
        self.map.reset();
        self.events.push(RuntimeEvent::MapReset);
        self.player.new_level();
        self.start_level();
    }
}
