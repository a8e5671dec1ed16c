use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use thiserror::Error;

use crate::constants::{CELL_SIZE, STANDARD_LEVEL};
use crate::types::{Cell, Direction, MapView, Position};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("level template has no rows")]
    Empty,
    #[error("row {row} is {found} cells wide, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("unknown cell glyph {glyph:?} at row {row}, col {col}")]
    UnknownGlyph { row: usize, col: usize, glyph: char },
    #[error("spawn at ({x},{y}) is not on a floor cell")]
    SpawnNotFloor { x: i32, y: i32 },
    #[error("tunnel row {row} is walled at col {col}")]
    TunnelBlocked { row: i32, col: i32 },
    #[error("floor cell at row {row}, col {col} leaves a pursuer no turn")]
    DeadEnd { row: i32, col: i32 },
    #[error("level needs {target} items but the template holds {available}")]
    ItemTargetUnreachable { target: u32, available: u32 },
}

/// Immutable maze layout. Every `GridMap` copies its cells from here.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LevelTemplate {
    width: i32,
    height: i32,
    cells: Vec<Cell>,
}

impl LevelTemplate {
    pub fn parse<S: AsRef<str>>(rows: &[S]) -> Result<Self, TemplateError> {
        let Some(first) = rows.first() else {
            return Err(TemplateError::Empty);
        };
        let width = first.as_ref().chars().count();
        if width == 0 {
            return Err(TemplateError::Empty);
        }

        let mut cells = Vec::with_capacity(width * rows.len());
        for (row, line) in rows.iter().enumerate() {
            let line = line.as_ref();
            let found = line.chars().count();
            if found != width {
                return Err(TemplateError::RaggedRow {
                    row,
                    expected: width,
                    found,
                });
            }
            for (col, glyph) in line.chars().enumerate() {
                let cell =
                    Cell::from_glyph(glyph).ok_or(TemplateError::UnknownGlyph { row, col, glyph })?;
                cells.push(cell);
            }
        }

        Ok(Self {
            width: width as i32,
            height: rows.len() as i32,
            cells,
        })
    }

    pub fn standard() -> Result<Self, TemplateError> {
        Self::parse(&STANDARD_LEVEL)
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn cell(&self, row: i32, col: i32) -> Option<Cell> {
        cell_index(self.width, self.height, row, col).map(|idx| self.cells[idx])
    }

    pub fn item_count(&self) -> u32 {
        self.cells.iter().filter(|cell| cell.is_item()).count() as u32
    }

    fn is_floor(&self, row: i32, col: i32) -> bool {
        self.cell(row, col).is_some_and(Cell::is_floor)
    }

    fn is_wall(&self, row: i32, col: i32) -> bool {
        self.cell(row, col) == Some(Cell::Wall)
    }

    /// Rejects layouts the motion rules cannot play: spawns off the floor,
    /// a walled tunnel, or a reachable cell where a pursuer facing a wall
    /// has no perpendicular way out.
    pub fn validate(
        &self,
        spawns: &[Position],
        tunnel_row: i32,
        item_target: u32,
    ) -> Result<(), TemplateError> {
        let available = self.item_count();
        if item_target > available {
            return Err(TemplateError::ItemTargetUnreachable {
                target: item_target,
                available,
            });
        }

        for spawn in spawns {
            if !self.is_floor(spawn.y / CELL_SIZE, spawn.x / CELL_SIZE) {
                return Err(TemplateError::SpawnNotFloor {
                    x: spawn.x,
                    y: spawn.y,
                });
            }
        }

        if (0..self.height).contains(&tunnel_row) {
            for col in [0, self.width - 1] {
                if self.is_wall(tunnel_row, col) {
                    return Err(TemplateError::TunnelBlocked {
                        row: tunnel_row,
                        col,
                    });
                }
            }
        }

        let reachable = self.reachable_floor_cells(spawns, tunnel_row);
        let mut ordered: Vec<(i32, i32)> = reachable.into_iter().collect();
        ordered.sort_unstable();
        for (row, col) in ordered {
            for dir in Direction::CARDINALS {
                let (dr, dc) = cell_delta(dir);
                if !self.is_wall(row + dr, col + dc) {
                    continue;
                }
                let has_turn = dir.perpendicular().into_iter().any(|turn| {
                    let (tr, tc) = cell_delta(turn);
                    self.is_floor(row + tr, col + tc)
                });
                if !has_turn {
                    return Err(TemplateError::DeadEnd { row, col });
                }
            }
        }
        Ok(())
    }

    fn reachable_floor_cells(&self, spawns: &[Position], tunnel_row: i32) -> HashSet<(i32, i32)> {
        let mut out = HashSet::new();
        let mut queue = VecDeque::new();
        for spawn in spawns {
            let start = (spawn.y / CELL_SIZE, spawn.x / CELL_SIZE);
            if self.is_floor(start.0, start.1) && out.insert(start) {
                queue.push_back(start);
            }
        }

        while let Some((row, col)) = queue.pop_front() {
            for dir in Direction::CARDINALS {
                let (dr, dc) = cell_delta(dir);
                let next_row = row + dr;
                let mut next_col = col + dc;
                if next_row == tunnel_row {
                    next_col = next_col.rem_euclid(self.width);
                }
                if !self.is_floor(next_row, next_col) {
                    continue;
                }
                if out.insert((next_row, next_col)) {
                    queue.push_back((next_row, next_col));
                }
            }
        }
        out
    }
}

/// Mutable per-level copy of a template. Only item consumption changes it.
#[derive(Clone, Debug)]
pub struct GridMap {
    template: Arc<LevelTemplate>,
    cells: Vec<Cell>,
}

impl GridMap {
    pub fn new(template: Arc<LevelTemplate>) -> Self {
        let cells = template.cells.clone();
        Self { template, cells }
    }

    pub fn width(&self) -> i32 {
        self.template.width
    }

    pub fn height(&self) -> i32 {
        self.template.height
    }

    /// `None` outside the maze. Agents probe past the tunnel edges every
    /// time they wrap, so this is not an error.
    pub fn cell_at(&self, row: i32, col: i32) -> Option<Cell> {
        cell_index(self.width(), self.height(), row, col).map(|idx| self.cells[idx])
    }

    pub fn is_wall(&self, row: i32, col: i32) -> bool {
        self.cell_at(row, col) == Some(Cell::Wall)
    }

    pub fn is_floor(&self, row: i32, col: i32) -> bool {
        self.cell_at(row, col).is_some_and(Cell::is_floor)
    }

    /// Returns the prior content and clears it if it was an item.
    pub fn consume(&mut self, row: i32, col: i32) -> Option<Cell> {
        let idx = cell_index(self.width(), self.height(), row, col)?;
        let prior = self.cells[idx];
        if prior.is_item() {
            self.cells[idx] = Cell::Empty;
        }
        Some(prior)
    }

    pub fn reset(&mut self) {
        self.cells.clone_from(&self.template.cells);
    }

    pub fn remaining_items(&self) -> u32 {
        self.cells.iter().filter(|cell| cell.is_item()).count() as u32
    }

    pub fn to_view(&self) -> MapView {
        MapView {
            width: self.width(),
            height: self.height(),
            tiles: self
                .cells
                .chunks(self.width() as usize)
                .map(|row| row.iter().map(|cell| cell.glyph()).collect())
                .collect(),
        }
    }
}

fn cell_index(width: i32, height: i32, row: i32, col: i32) -> Option<usize> {
    if row < 0 || col < 0 || row >= height || col >= width {
        return None;
    }
    Some((row * width + col) as usize)
}

/// (row, col) step for one cell in `dir`.
pub fn cell_delta(dir: Direction) -> (i32, i32) {
    match dir {
        Direction::Up => (-1, 0),
        Direction::Down => (1, 0),
        Direction::Left => (0, -1),
        Direction::Right => (0, 1),
        Direction::None => (0, 0),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::constants::{LEVEL_ITEM_TARGET, PLAYER_START, PURSUER_START, TUNNEL_ROW};
    use crate::types::{Cell, Direction, Position};

    use super::{cell_delta, GridMap, LevelTemplate, TemplateError};

    fn standard_map() -> GridMap {
        GridMap::new(Arc::new(
            LevelTemplate::standard().expect("standard level parses"),
        ))
    }

    #[test]
    fn standard_level_holds_the_item_target() {
        let template = LevelTemplate::standard().expect("standard level parses");
        assert_eq!(template.width(), 19);
        assert_eq!(template.height(), 22);
        assert_eq!(template.item_count(), LEVEL_ITEM_TARGET);
        template
            .validate(&[PLAYER_START, PURSUER_START], TUNNEL_ROW, LEVEL_ITEM_TARGET)
            .expect("standard level is playable");
    }

    #[test]
    fn pursuer_pen_is_blocked_off() {
        let map = standard_map();
        assert_eq!(map.cell_at(9, 9), Some(Cell::Block));
        for col in 8..=10 {
            assert_eq!(map.cell_at(10, col), Some(Cell::Block));
            assert!(!map.is_floor(10, col));
            assert!(!map.is_wall(10, col));
        }
    }

    #[test]
    fn every_floor_cell_has_a_floor_neighbour() {
        let map = standard_map();
        for row in 0..map.height() {
            for col in 0..map.width() {
                if !map.is_floor(row, col) {
                    continue;
                }
                let has_neighbour = Direction::CARDINALS.into_iter().any(|dir| {
                    let (dr, dc) = cell_delta(dir);
                    map.is_floor(row + dr, col + dc)
                });
                assert!(has_neighbour, "isolated floor at ({row},{col})");
            }
        }
    }

    #[test]
    fn tunnel_edges_are_open_floor() {
        let map = standard_map();
        assert!(map.is_floor(TUNNEL_ROW, 0));
        assert!(map.is_floor(TUNNEL_ROW, map.width() - 1));
        assert!(!map.is_wall(TUNNEL_ROW, -1));
        assert!(!map.is_floor(TUNNEL_ROW, map.width()));
    }

    #[test]
    fn out_of_bounds_is_neither_wall_nor_floor() {
        let map = standard_map();
        for (row, col) in [(-1, 0), (0, -1), (22, 3), (3, 19), (-5, -5)] {
            assert_eq!(map.cell_at(row, col), None);
            assert!(!map.is_wall(row, col));
            assert!(!map.is_floor(row, col));
        }
    }

    #[test]
    fn consume_is_idempotent() {
        let mut map = standard_map();
        assert_eq!(map.consume(1, 1), Some(Cell::Biscuit));
        assert_eq!(map.consume(1, 1), Some(Cell::Empty));
        assert_eq!(map.consume(2, 1), Some(Cell::Pill));
        assert_eq!(map.consume(2, 1), Some(Cell::Empty));
        assert_eq!(map.remaining_items(), LEVEL_ITEM_TARGET - 2);
    }

    #[test]
    fn consume_leaves_walls_alone() {
        let mut map = standard_map();
        assert_eq!(map.consume(0, 0), Some(Cell::Wall));
        assert!(map.is_wall(0, 0));
        assert_eq!(map.consume(-1, 4), None);
    }

    #[test]
    fn reset_restores_template_without_touching_it() {
        let template = Arc::new(LevelTemplate::standard().expect("standard level parses"));
        let mut map = GridMap::new(template.clone());
        map.consume(1, 1);
        map.consume(4, 9);
        let mut second = GridMap::new(template.clone());
        assert_eq!(second.cell_at(1, 1), Some(Cell::Biscuit));

        map.reset();
        assert_eq!(map.cell_at(1, 1), Some(Cell::Biscuit));
        assert_eq!(map.remaining_items(), LEVEL_ITEM_TARGET);
        second.reset();
        assert_eq!(template.item_count(), LEVEL_ITEM_TARGET);
    }

    #[test]
    fn view_round_trips_glyphs() {
        let map = standard_map();
        let view = map.to_view();
        assert_eq!(view.tiles.len(), 22);
        assert_eq!(view.tiles[2], "#o##.###.#.###.##o#");
    }

    #[test]
    fn parse_rejects_ragged_and_unknown_rows() {
        assert_eq!(
            LevelTemplate::parse(&["###", "##"]),
            Err(TemplateError::RaggedRow {
                row: 1,
                expected: 3,
                found: 2
            })
        );
        assert_eq!(
            LevelTemplate::parse(&["#x#"]),
            Err(TemplateError::UnknownGlyph {
                row: 0,
                col: 1,
                glyph: 'x'
            })
        );
        let empty: [&str; 0] = [];
        assert_eq!(LevelTemplate::parse(&empty), Err(TemplateError::Empty));
    }

    #[test]
    fn validate_rejects_dead_end_corridor() {
        let template = LevelTemplate::parse(&[
            "#######", //
            "#.....#", //
            "#.###.#", //
            "#.#.#.#", //
            "#.....#", //
            "#######",
        ])
        .expect("parses");
        let spawn = Position::new(10, 10);
        assert_eq!(
            template.validate(&[spawn], -1, 0),
            Err(TemplateError::DeadEnd { row: 3, col: 3 })
        );
    }

    #[test]
    fn validate_rejects_spawn_in_wall_and_walled_tunnel() {
        let template = LevelTemplate::parse(&["#####", "#...#", "#####"]).expect("parses");
        assert_eq!(
            template.validate(&[Position::new(0, 0)], -1, 0),
            Err(TemplateError::SpawnNotFloor { x: 0, y: 0 })
        );
        assert_eq!(
            template.validate(&[Position::new(10, 10)], 1, 0),
            Err(TemplateError::TunnelBlocked { row: 1, col: 0 })
        );
        assert_eq!(
            template.validate(&[Position::new(10, 10)], -1, 4),
            Err(TemplateError::ItemTargetUnreachable {
                target: 4,
                available: 3
            })
        );
    }

    #[test]
    fn unreachable_pockets_are_not_checked() {
        let template = LevelTemplate::parse(&[
            "#######", //
            "#.....#", //
            "#.###.#", //
            "#.....#", //
            "###.###", //
            "### ###", //
            "#######",
        ])
        .expect("parses");
        assert_eq!(
            template.validate(&[Position::new(10, 10)], -1, 0),
            Err(TemplateError::DeadEnd { row: 5, col: 3 })
        );
        // Sealed side pockets exist in the standard level too.
        let sealed = LevelTemplate::parse(&[
            "#######", //
            "#.....#", //
            "#.###.#", //
            "#.....#", //
            "#######", //
            "### ###", //
            "#######",
        ])
        .expect("parses");
        assert_eq!(sealed.validate(&[Position::new(10, 10)], -1, 0), Ok(()));
    }
}
