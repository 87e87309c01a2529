/// Level grid and the wall query used by movement arbitration.
///
/// The grid is built once at level load and never mutated. Construction
/// validates the table (rectangular, known codes, exactly one start) so
/// everything downstream can assume a well-formed map.
///
/// Coordinates are signed: neighbours of edge cells are simply out of
/// bounds, and out of bounds counts as wall.

use thiserror::Error;

use super::entity::PixelPos;
use super::tile::Tile;

/// Load-time precondition violations. Any of these rejects the level.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LevelError {
    #[error("level has no rows")]
    Empty,
    #[error("row {row} has {found} cells, expected {expected}")]
    Ragged { row: usize, expected: usize, found: usize },
    #[error("unexpected character {ch:?} on row {row}")]
    BadChar { row: usize, ch: char },
    #[error("unknown cell code {code} at ({x}, {y})")]
    UnknownCode { x: usize, y: usize, code: u8 },
    #[error("level has no start cell")]
    NoStart,
    #[error("level has {count} start cells, expected exactly one")]
    MultipleStarts { count: usize },
}

/// Map seen by movement arbitration: wall checks plus the cell ↔ pixel
/// mapping. Must be pure: arbitration calls it several times per frame.
pub trait WallQuery {
    fn is_blocked(&self, x: i32, y: i32) -> bool;
    fn cell_center(&self, x: i32, y: i32) -> PixelPos;
}

#[derive(Clone, Debug)]
pub struct Grid {
    tiles: Vec<Vec<Tile>>,
    width: usize,
    height: usize,
    start: (i32, i32),
    cell_size: f64,
}

impl Grid {
    /// Build from raw cell codes, validating every precondition.
    pub fn from_codes(rows: &[Vec<u8>], cell_size: f64) -> Result<Grid, LevelError> {
        let height = rows.len();
        let width = rows.first().map(|r| r.len()).unwrap_or(0);
        if height == 0 || width == 0 {
            return Err(LevelError::Empty);
        }

        let mut tiles = Vec::with_capacity(height);
        let mut starts = vec![];
        for (y, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(LevelError::Ragged { row: y, expected: width, found: row.len() });
            }
            let mut line = Vec::with_capacity(width);
            for (x, &code) in row.iter().enumerate() {
                let tile = Tile::from_code(code)
                    .ok_or(LevelError::UnknownCode { x, y, code })?;
                if tile == Tile::Start {
                    starts.push((x as i32, y as i32));
                }
                line.push(tile);
            }
            tiles.push(line);
        }

        let start = match starts.as_slice() {
            [] => return Err(LevelError::NoStart),
            [only] => *only,
            many => return Err(LevelError::MultipleStarts { count: many.len() }),
        };

        Ok(Grid { tiles, width, height, start, cell_size })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn start(&self) -> (i32, i32) {
        self.start
    }

    /// Tile at (x, y); `None` outside the grid.
    #[inline]
    pub fn tile_at(&self, x: i32, y: i32) -> Option<Tile> {
        if x < 0 || y < 0 {
            return None;
        }
        self.tiles.get(y as usize).and_then(|row| row.get(x as usize)).copied()
    }

    /// Cell whose square contains `pos`.
    pub fn cell_containing(&self, pos: PixelPos) -> (i32, i32) {
        (
            (pos.x / self.cell_size).floor() as i32,
            (pos.y / self.cell_size).floor() as i32,
        )
    }

    pub fn hazard_spawns(&self) -> Vec<(i32, i32)> {
        self.cells_where(Tile::is_hazard_spawn)
    }

    pub fn exits(&self) -> Vec<(i32, i32)> {
        self.cells_where(Tile::is_exit)
    }

    fn cells_where(&self, pred: fn(Tile) -> bool) -> Vec<(i32, i32)> {
        let mut out = vec![];
        for (y, row) in self.tiles.iter().enumerate() {
            for (x, &tile) in row.iter().enumerate() {
                if pred(tile) {
                    out.push((x as i32, y as i32));
                }
            }
        }
        out
    }
}

impl WallQuery for Grid {
    #[inline]
    fn is_blocked(&self, x: i32, y: i32) -> bool {
        self.tile_at(x, y).map_or(true, Tile::is_wall)
    }

    fn cell_center(&self, x: i32, y: i32) -> PixelPos {
        let half = self.cell_size / 2.0;
        PixelPos::new(
            x as f64 * self.cell_size + half,
            y as f64 * self.cell_size + half,
        )
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Test fixture: one row per string, one digit per cell.
    pub(crate) fn grid_from(rows: &[&str]) -> Grid {
        let codes: Vec<Vec<u8>> = rows
            .iter()
            .map(|r| r.bytes().map(|b| b - b'0').collect())
            .collect();
        Grid::from_codes(&codes, 64.0).expect("fixture grid must be valid")
    }

    #[test]
    fn out_of_bounds_is_wall() {
        let g = grid_from(&["030"]);
        assert!(g.is_blocked(-1, 0));
        assert!(g.is_blocked(3, 0));
        assert!(g.is_blocked(0, -1));
        assert!(g.is_blocked(0, 1));
        assert!(!g.is_blocked(0, 0));
    }

    #[test]
    fn only_wall_code_blocks() {
        let g = grid_from(&["01234"]);
        let blocked: Vec<bool> = (0..5).map(|x| g.is_blocked(x, 0)).collect();
        assert_eq!(blocked, vec![false, true, false, false, false]);
    }

    #[test]
    fn finds_start_exits_and_hazards() {
        let g = grid_from(&[
            "11111",
            "14021",
            "10301",
            "11111",
        ]);
        assert_eq!(g.start(), (2, 2));
        assert_eq!(g.exits(), vec![(1, 1)]);
        assert_eq!(g.hazard_spawns(), vec![(3, 1)]);
        assert_eq!((g.width(), g.height()), (5, 4));
    }

    #[test]
    fn cell_center_and_containing_agree() {
        let g = grid_from(&["03", "00"]);
        let c = g.cell_center(1, 1);
        assert_eq!(c, PixelPos::new(96.0, 96.0));
        assert_eq!(g.cell_containing(c), (1, 1));
        assert_eq!(g.cell_containing(PixelPos::new(63.9, 0.0)), (0, 0));
    }

    #[test]
    fn rejects_ragged_rows() {
        let err = Grid::from_codes(&[vec![3, 0], vec![0]], 64.0).unwrap_err();
        assert_eq!(err, LevelError::Ragged { row: 1, expected: 2, found: 1 });
    }

    #[test]
    fn rejects_missing_and_duplicate_start() {
        assert_eq!(Grid::from_codes(&[vec![0, 0]], 64.0).unwrap_err(), LevelError::NoStart);
        assert_eq!(
            Grid::from_codes(&[vec![3, 3]], 64.0).unwrap_err(),
            LevelError::MultipleStarts { count: 2 }
        );
    }

    #[test]
    fn rejects_empty_and_unknown_codes() {
        assert_eq!(Grid::from_codes(&[], 64.0).unwrap_err(), LevelError::Empty);
        assert_eq!(
            Grid::from_codes(&[vec![3, 7]], 64.0).unwrap_err(),
            LevelError::UnknownCode { x: 1, y: 0, code: 7 }
        );
    }
}
