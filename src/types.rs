use serde::Serialize;

use crate::constants::{
    BISCUIT_POINTS, CAPTURE_RADIUS, CELL_SIZE, COUNTDOWN_SECONDS, DYING_TICKS, EATEN_PAUSE_TICKS,
    EXTRA_LIFE_SCORE, FLASH_AFTER_SECONDS, FLASH_CADENCE_TICKS, FPS, HIDDEN_SECONDS,
    LEVEL_ITEM_TARGET, PILL_POINTS, PLAYER_SPEED, PLAYER_START, PURSUER_COMBO_POINTS,
    PURSUER_COUNT, PURSUER_HIDDEN_SPEED, PURSUER_SPEED, PURSUER_START, PURSUER_VULNERABLE_SPEED,
    STARTING_LIVES, TUNNEL_ROW, VULNERABLE_SECONDS,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    None,
}

impl Direction {
    pub const CARDINALS: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn parse_move(value: &str) -> Option<Self> {
        match value {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            "none" => Some(Self::None),
            _ => None,
        }
    }

    /// `None` reverses to `Up`.
    pub fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
            Self::Up => Self::Down,
            Self::Down | Self::None => Self::Up,
        }
    }

    /// The two turns available without reversing. Vertical and stationary
    /// agents turn onto the horizontal axis.
    pub fn perpendicular(self) -> [Direction; 2] {
        if self.is_horizontal() {
            [Self::Up, Self::Down]
        } else {
            [Self::Left, Self::Right]
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Self::Left | Self::Right)
    }

    pub fn is_vertical(self) -> bool {
        matches!(self, Self::Up | Self::Down)
    }

    pub fn same_axis(self, other: Direction) -> bool {
        (self.is_horizontal() && other.is_horizontal())
            || (self.is_vertical() && other.is_vertical())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Cell {
    Wall,
    Empty,
    Biscuit,
    Pill,
    Block,
}

impl Cell {
    pub fn from_glyph(glyph: char) -> Option<Self> {
        match glyph {
            '#' => Some(Self::Wall),
            ' ' => Some(Self::Empty),
            '.' => Some(Self::Biscuit),
            'o' => Some(Self::Pill),
            '-' => Some(Self::Block),
            _ => None,
        }
    }

    pub fn glyph(self) -> char {
        match self {
            Self::Wall => '#',
            Self::Empty => ' ',
            Self::Biscuit => '.',
            Self::Pill => 'o',
            Self::Block => '-',
        }
    }

    pub fn is_floor(self) -> bool {
        matches!(self, Self::Empty | Self::Biscuit | Self::Pill)
    }

    pub fn is_item(self) -> bool {
        matches!(self, Self::Biscuit | Self::Pill)
    }
}

/// Position in sub-grid units, `CELL_SIZE` units per cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn is_grid_aligned(self) -> bool {
        self.x % CELL_SIZE == 0 && self.y % CELL_SIZE == 0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    Waiting,
    Countdown,
    Playing,
    EatenPause,
    Dying,
    Pause,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ThreatState {
    #[default]
    Dangerous,
    Vulnerable {
        since: u64,
    },
    Hidden {
        since: u64,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trigger {
    Start,
    TogglePause,
}

#[derive(Clone, Debug, Serialize)]
pub struct GameConfig {
    pub fps: u64,
    #[serde(rename = "tunnelRow")]
    pub tunnel_row: i32,
    #[serde(rename = "playerStart")]
    pub player_start: Position,
    #[serde(rename = "pursuerStart")]
    pub pursuer_start: Position,
    #[serde(rename = "pursuerCount")]
    pub pursuer_count: usize,
    #[serde(rename = "playerSpeed")]
    pub player_speed: i32,
    #[serde(rename = "pursuerSpeed")]
    pub pursuer_speed: i32,
    #[serde(rename = "pursuerVulnerableSpeed")]
    pub pursuer_vulnerable_speed: i32,
    #[serde(rename = "pursuerHiddenSpeed")]
    pub pursuer_hidden_speed: i32,
    #[serde(rename = "startingLives")]
    pub starting_lives: u32,
    #[serde(rename = "levelItemTarget")]
    pub level_item_target: u32,
    #[serde(rename = "biscuitPoints")]
    pub biscuit_points: u32,
    #[serde(rename = "pillPoints")]
    pub pill_points: u32,
    #[serde(rename = "pursuerComboPoints")]
    pub pursuer_combo_points: u32,
    #[serde(rename = "extraLifeScore")]
    pub extra_life_score: u32,
    #[serde(rename = "vulnerableTicks")]
    pub vulnerable_ticks: u64,
    #[serde(rename = "hiddenTicks")]
    pub hidden_ticks: u64,
    #[serde(rename = "flashAfterTicks")]
    pub flash_after_ticks: u64,
    #[serde(rename = "flashCadenceTicks")]
    pub flash_cadence_ticks: u64,
    #[serde(rename = "countdownSeconds")]
    pub countdown_seconds: i64,
    #[serde(rename = "eatenPauseTicks")]
    pub eaten_pause_ticks: u64,
    #[serde(rename = "dyingTicks")]
    pub dying_ticks: u64,
    #[serde(rename = "captureRadius")]
    pub capture_radius: i32,
    #[serde(rename = "autoStart")]
    pub auto_start: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            fps: FPS,
            tunnel_row: TUNNEL_ROW,
            player_start: PLAYER_START,
            pursuer_start: PURSUER_START,
            pursuer_count: PURSUER_COUNT,
            player_speed: PLAYER_SPEED,
            pursuer_speed: PURSUER_SPEED,
            pursuer_vulnerable_speed: PURSUER_VULNERABLE_SPEED,
            pursuer_hidden_speed: PURSUER_HIDDEN_SPEED,
            starting_lives: STARTING_LIVES,
            level_item_target: LEVEL_ITEM_TARGET,
            biscuit_points: BISCUIT_POINTS,
            pill_points: PILL_POINTS,
            pursuer_combo_points: PURSUER_COMBO_POINTS,
            extra_life_score: EXTRA_LIFE_SCORE,
            vulnerable_ticks: VULNERABLE_SECONDS * FPS,
            hidden_ticks: HIDDEN_SECONDS * FPS,
            flash_after_ticks: FLASH_AFTER_SECONDS * FPS,
            flash_cadence_ticks: FLASH_CADENCE_TICKS,
            countdown_seconds: COUNTDOWN_SECONDS,
            eaten_pause_ticks: EATEN_PAUSE_TICKS,
            dying_ticks: DYING_TICKS,
            capture_radius: CAPTURE_RADIUS,
            auto_start: false,
        }
    }
}

/// New and vacated position of one agent for one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct MoveOutcome {
    pub new: Position,
    pub old: Position,
}

impl MoveOutcome {
    pub fn stationary(position: Position) -> Self {
        Self {
            new: position,
            old: position,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct PlayerView {
    pub position: Position,
    pub previous: Position,
    pub direction: Direction,
    pub due: Direction,
    pub score: u32,
    pub lives: u32,
    #[serde(rename = "itemsEaten")]
    pub items_eaten: u32,
}

#[derive(Clone, Debug, Serialize)]
pub struct PursuerView {
    pub index: usize,
    pub position: Position,
    pub previous: Position,
    pub direction: Direction,
    pub due: Direction,
    pub threat: ThreatState,
    pub flashing: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct MapView {
    pub width: i32,
    pub height: i32,
    pub tiles: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuntimeEvent {
    PhaseChanged {
        from: GamePhase,
        to: GamePhase,
    },
    CountdownTick {
        remaining: i64,
    },
    ItemConsumed {
        row: i32,
        col: i32,
        cell: Cell,
    },
    PillEaten,
    PursuerEaten {
        index: usize,
        points: u32,
    },
    PlayerCaught {
        index: usize,
    },
    ExtraLife {
        lives: u32,
    },
    LevelCompleted {
        level: u32,
    },
    LifeLost {
        #[serde(rename = "livesLeft")]
        lives_left: u32,
    },
    GameOver {
        score: u32,
        level: u32,
    },
    MapReset,
}

#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    pub phase: GamePhase,
    #[serde(rename = "phaseStartedAt")]
    pub phase_started_at: u64,
    pub level: u32,
    pub countdown: Option<i64>,
    pub player: PlayerView,
    pub pursuers: Vec<PursuerView>,
    pub events: Vec<RuntimeEvent>,
}
