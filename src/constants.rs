use crate::types::Position;

pub const FPS: u64 = 60;

/// Sub-grid units per maze cell.
pub const CELL_SIZE: i32 = 10;
pub const TUNNEL_ROW: i32 = 10;
/// How far past the west edge an agent travels before reappearing east.
pub const TUNNEL_OVERHANG: i32 = 12;

pub const PLAYER_START: Position = Position { x: 90, y: 120 };
pub const PURSUER_START: Position = Position { x: 90, y: 80 };
pub const PURSUER_COUNT: usize = 4;

pub const PLAYER_SPEED: i32 = 2;
pub const PURSUER_SPEED: i32 = 2;
pub const PURSUER_VULNERABLE_SPEED: i32 = 1;
pub const PURSUER_HIDDEN_SPEED: i32 = 4;

pub const STARTING_LIVES: u32 = 3;
pub const LEVEL_ITEM_TARGET: u32 = 182;
pub const BISCUIT_POINTS: u32 = 10;
pub const PILL_POINTS: u32 = 50;
pub const PURSUER_COMBO_POINTS: u32 = 50;
pub const EXTRA_LIFE_SCORE: u32 = 10_000;

pub const VULNERABLE_SECONDS: u64 = 8;
pub const HIDDEN_SECONDS: u64 = 3;
pub const FLASH_AFTER_SECONDS: u64 = 5;
pub const FLASH_CADENCE_TICKS: u64 = 20;

pub const COUNTDOWN_SECONDS: i64 = 4;
pub const EATEN_PAUSE_TICKS: u64 = FPS / 3;
pub const DYING_TICKS: u64 = FPS * 2;
pub const CAPTURE_RADIUS: i32 = 10;

/// `#` wall, `.` biscuit, `o` pill, `-` block, space empty.
pub const STANDARD_LEVEL: [&str; 22] = [
    "###################",
    "#........#........#",
    "#o##.###.#.###.##o#",
    "#.##.###.#.###.##.#",
    "#.................#",
    "#.##.#.#####.#.##.#",
    "#....#...#...#....#",
    "####.###.#.###.####",
    "   #.#.......#.#   ",
    "####.#.##-##.#.####",
    "    ...#---#...    ",
    "####.#.#####.#.####",
    "   #.#... ...#.#   ",
    "####.#.#####.#.####",
    "#........#........#",
    "#.##.###.#.###.##.#",
    "#o.#...........#.o#",
    "##.#.#.#####.#.#.##",
    "#....#...#...#....#",
    "#.######.#.######.#",
    "#.................#",
    "###################",
];
