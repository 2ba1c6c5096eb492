//! # 2048 Tree-Search Core
//!
//! A pure Rust model of the 2048 board together with two heuristic-guided
//! search engines (Monte-Carlo Tree Search and depth-bounded Expectimax),
//! built on a deterministic, seedable PRNG for reproducible play.
//!
//! ## Example
//!
//! ```rust
//! use search_2048_core::Board;
//! use search_2048_core::heuristic::CompositeHeuristic;
//! use search_2048_core::expectimax::Expectimax;
//!
//! let mut board = Board::fresh(42);
//! let engine = Expectimax::new(3, CompositeHeuristic::default());
//! let best = engine.search(&board).unwrap();
//! board.step(best);
//! ```

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

pub mod expectimax;
pub mod heuristic;
pub mod mcts;

use heuristic::HeuristicError;

/// A 4x4 tile grid in row-major order. 0 is an empty cell; every non-zero
/// value is a power of two >= 2.
pub type Grid = [[u32; 4]; 4];

/// The four possible move directions in 2048.
///
/// `Move::all()` fixes the canonical enumeration order; wherever two moves
/// score equally, the earlier one in this order wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Move {
    Left = 0,
    Right = 1,
    Up = 2,
    Down = 3,
}

impl Move {
    /// All four moves in canonical enumeration order.
    pub fn all() -> [Move; 4] {
        [Move::Left, Move::Right, Move::Up, Move::Down]
    }
}

/// Rejected grid passed to [`Board::from_grid`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvalidGrid {
    /// A cell holds a value that is neither 0 nor a power of two >= 2.
    #[error("cell ({row},{col}) holds {value}, expected 0 or a power of two >= 2")]
    NotAPowerOfTwo { row: usize, col: usize, value: u32 },
}

/// Errors surfaced by the search engines.
///
/// These are result values, never control flow: a terminal state reached
/// mid-search is handled internally and only a terminal *root* is an error.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The root board has no legal move; there is nothing to search.
    #[error("no moves available from the root board")]
    NoAvailableMoves,
    /// The MCTS iteration budget cannot visit every root child at least once.
    #[error("max_iterations {configured} cannot visit all {required} root children plus the root rollout")]
    IterationBudgetTooSmall { configured: u32, required: usize },
    /// The evaluation capability failed to score a grid; the search aborts.
    #[error(transparent)]
    Heuristic(#[from] HeuristicError),
}

/// Return the grid resulting from sliding and merging tiles in `mv`.
///
/// Each of the four lines along the move direction is handled independently:
/// compress out zeros, merge equal neighbors at most once per pass, compress
/// again. `[2, 2, 2, 2]` slid left becomes `[4, 4, 0, 0]`, never `[8, 0, 0, 0]`.
/// The input grid is not modified and no tile is spawned.
pub fn slide(grid: &Grid, mv: Move) -> Grid {
    let mut out = *grid;
    match mv {
        Move::Left => {
            for row in 0..4 {
                let mut line = out[row];
                compress_and_merge(&mut line);
                out[row] = line;
            }
        }
        Move::Right => {
            for row in 0..4 {
                let mut line = [out[row][3], out[row][2], out[row][1], out[row][0]];
                compress_and_merge(&mut line);
                out[row] = [line[3], line[2], line[1], line[0]];
            }
        }
        Move::Up => {
            for col in 0..4 {
                let mut line = [out[0][col], out[1][col], out[2][col], out[3][col]];
                compress_and_merge(&mut line);
                for row in 0..4 {
                    out[row][col] = line[row];
                }
            }
        }
        Move::Down => {
            for col in 0..4 {
                let mut line = [out[3][col], out[2][col], out[1][col], out[0][col]];
                compress_and_merge(&mut line);
                for row in 0..4 {
                    out[3 - row][col] = line[row];
                }
            }
        }
    }
    out
}

/// Return the legal moves for `grid` in canonical enumeration order.
///
/// A move is legal iff it changes the grid.
pub fn available_moves(grid: &Grid) -> Vec<Move> {
    Move::all()
        .into_iter()
        .filter(|&mv| slide(grid, mv) != *grid)
        .collect()
}

/// True iff no move changes the grid.
pub fn is_terminal(grid: &Grid) -> bool {
    Move::all().into_iter().all(|mv| slide(grid, mv) == *grid)
}

/// Coordinates of all empty cells, row-major.
pub fn empty_cells(grid: &Grid) -> Vec<(usize, usize)> {
    let mut cells = Vec::with_capacity(16);
    for row in 0..4 {
        for col in 0..4 {
            if grid[row][col] == 0 {
                cells.push((row, col));
            }
        }
    }
    cells
}

/// Compress and merge a line of 4 tiles towards index 0.
///
/// 1. Compress: move all non-zero values to the front.
/// 2. Merge: combine equal neighbors left to right; a tile produced by a
///    merge never merges again in the same pass.
/// 3. Compress again to close the gaps the merges left.
fn compress_and_merge(line: &mut [u32; 4]) {
    compress(line);
    for i in 0..3 {
        if line[i] != 0 && line[i] == line[i + 1] {
            line[i] *= 2;
            line[i + 1] = 0;
        }
    }
    compress(line);
}

/// Compress a line by moving all non-zero values to the front.
fn compress(line: &mut [u32; 4]) {
    let mut write_idx = 0;
    for read_idx in 0..4 {
        if line[read_idx] != 0 {
            if write_idx != read_idx {
                line[write_idx] = line[read_idx];
                line[read_idx] = 0;
            }
            write_idx += 1;
        }
    }
}

/// One turn's 2048 position.
///
/// A `Board` wraps a [`Grid`] plus the PRNG that backs tile spawning, so a
/// given seed always replays the same game. The grid only changes through
/// [`Board::step`] / [`Board::spawn_random_tile`]; [`Board::apply`] returns
/// the slid grid without touching the board, which is what the search
/// engines branch on.
#[derive(Clone)]
pub struct Board {
    grid: Grid,
    rng: SmallRng,
}

impl Board {
    /// Create a fresh board with two random tiles spawned.
    ///
    /// Tiles spawn as 2 with 90% probability and 4 with 10% probability.
    pub fn fresh(seed: u64) -> Board {
        let mut board = Board {
            grid: [[0; 4]; 4],
            rng: SmallRng::seed_from_u64(seed),
        };
        board.spawn_random_tile();
        board.spawn_random_tile();
        board
    }

    /// Create a board from an explicit starting grid (tests and scenarios).
    ///
    /// Every cell must be 0 or a power of two >= 2.
    pub fn from_grid(grid: Grid, seed: u64) -> Result<Board, InvalidGrid> {
        for row in 0..4 {
            for col in 0..4 {
                let value = grid[row][col];
                if value != 0 && !(value >= 2 && value.is_power_of_two()) {
                    return Err(InvalidGrid::NotAPowerOfTwo { row, col, value });
                }
            }
        }
        Ok(Board::with_grid(grid, seed))
    }

    /// Unvalidated constructor for grids the engines produced via `slide`.
    pub(crate) fn with_grid(grid: Grid, seed: u64) -> Board {
        Board {
            grid,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Get a reference to the tile grid.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Return the grid after sliding in `mv`, without spawning a tile.
    pub fn apply(&self, mv: Move) -> Grid {
        slide(&self.grid, mv)
    }

    /// The legal moves from this position, in canonical enumeration order.
    pub fn available_moves(&self) -> Vec<Move> {
        available_moves(&self.grid)
    }

    /// True iff no legal move remains.
    pub fn is_terminal(&self) -> bool {
        is_terminal(&self.grid)
    }

    /// Spawn a 2 (90%) or 4 (10%) on a uniformly random empty cell.
    ///
    /// Returns `false` and leaves the grid unchanged when the board is full.
    pub fn spawn_random_tile(&mut self) -> bool {
        let empty = empty_cells(&self.grid);
        if empty.is_empty() {
            return false;
        }
        let (row, col) = empty[self.rng.gen_range(0..empty.len())];
        self.grid[row][col] = if self.rng.gen::<f32>() < 0.9 { 2 } else { 4 };
        true
    }

    /// Play one turn: slide in `mv` and, if the grid changed, spawn a tile.
    ///
    /// Returns whether the grid changed. A no-op move spawns nothing.
    pub fn step(&mut self, mv: Move) -> bool {
        let slid = slide(&self.grid, mv);
        if slid == self.grid {
            return false;
        }
        self.grid = slid;
        self.spawn_random_tile();
        true
    }

    /// The highest tile value on the board.
    pub fn max_tile(&self) -> u32 {
        self.grid.iter().flatten().copied().max().unwrap_or(0)
    }

    /// The number of empty cells on the board.
    pub fn empty_count(&self) -> usize {
        empty_cells(&self.grid).len()
    }
}

impl std::fmt::Debug for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Board {{ max_tile: {}, empty: {} }}", self.max_tile(), self.empty_count())?;
        for row in 0..4 {
            for col in 0..4 {
                let val = self.grid[row][col];
                if val == 0 {
                    write!(f, "    .")?;
                } else {
                    write!(f, "{:5}", val)?;
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl std::fmt::Display for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "+------+------+------+------+")?;
        for row in 0..4 {
            write!(f, "|")?;
            for col in 0..4 {
                let val = self.grid[row][col];
                if val == 0 {
                    write!(f, "      |")?;
                } else {
                    write!(f, "{:^6}|", val)?;
                }
            }
            writeln!(f)?;
            writeln!(f, "+------+------+------+------+")?;
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_sum(grid: &Grid) -> u64 {
        grid.iter().flatten().map(|&v| v as u64).sum()
    }

    // -------------------------------------------------------------------------
    // Line compression and merging
    // -------------------------------------------------------------------------

    #[test]
    fn test_compress_simple() {
        let mut line = [0, 2, 0, 4];
        compress(&mut line);
        assert_eq!(line, [2, 4, 0, 0]);
    }

    #[test]
    fn test_compress_already_compressed() {
        let mut line = [2, 4, 8, 16];
        compress(&mut line);
        assert_eq!(line, [2, 4, 8, 16]);
    }

    #[test]
    fn test_compress_all_zeros() {
        let mut line = [0, 0, 0, 0];
        compress(&mut line);
        assert_eq!(line, [0, 0, 0, 0]);
    }

    #[test]
    fn test_merge_simple() {
        let mut line = [2, 2, 0, 0];
        compress_and_merge(&mut line);
        assert_eq!(line, [4, 0, 0, 0]);
    }

    #[test]
    fn test_merge_two_pairs() {
        let mut line = [2, 2, 4, 4];
        compress_and_merge(&mut line);
        assert_eq!(line, [4, 8, 0, 0]);
    }

    #[test]
    fn test_no_double_merge() {
        // [4, 2, 2, 0] becomes [4, 4, 0, 0], not [8, 0, 0, 0]
        let mut line = [4, 2, 2, 0];
        compress_and_merge(&mut line);
        assert_eq!(line, [4, 4, 0, 0]);
    }

    #[test]
    fn test_no_double_merge_chain() {
        // [2, 2, 2, 2] becomes [4, 4, 0, 0], not [8, 0, 0, 0]
        let mut line = [2, 2, 2, 2];
        compress_and_merge(&mut line);
        assert_eq!(line, [4, 4, 0, 0]);
    }

    #[test]
    fn test_merge_with_gaps() {
        let mut line = [2, 0, 2, 0];
        compress_and_merge(&mut line);
        assert_eq!(line, [4, 0, 0, 0]);
    }

    // -------------------------------------------------------------------------
    // Slide correctness per direction
    // -------------------------------------------------------------------------

    #[test]
    fn test_slide_left() {
        let grid = [[2, 2, 0, 0], [0, 4, 4, 0], [2, 0, 2, 0], [8, 8, 8, 8]];
        let slid = slide(&grid, Move::Left);
        assert_eq!(slid, [[4, 0, 0, 0], [8, 0, 0, 0], [4, 0, 0, 0], [16, 16, 0, 0]]);
    }

    #[test]
    fn test_slide_right() {
        let grid = [[2, 2, 0, 0], [0, 4, 4, 0], [2, 0, 2, 0], [8, 8, 8, 8]];
        let slid = slide(&grid, Move::Right);
        assert_eq!(slid, [[0, 0, 0, 4], [0, 0, 0, 8], [0, 0, 0, 4], [0, 0, 16, 16]]);
    }

    #[test]
    fn test_slide_up() {
        let grid = [[2, 0, 2, 8], [2, 4, 0, 8], [0, 4, 2, 8], [0, 0, 0, 8]];
        let slid = slide(&grid, Move::Up);
        assert_eq!(slid, [[4, 8, 4, 16], [0, 0, 0, 16], [0, 0, 0, 0], [0, 0, 0, 0]]);
    }

    #[test]
    fn test_slide_down() {
        let grid = [[2, 0, 2, 8], [2, 4, 0, 8], [0, 4, 2, 8], [0, 0, 0, 8]];
        let slid = slide(&grid, Move::Down);
        assert_eq!(slid, [[0, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 16], [4, 8, 4, 16]]);
    }

    #[test]
    fn test_slide_does_not_modify_input() {
        let grid = [[2, 2, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0]];
        let _ = slide(&grid, Move::Left);
        assert_eq!(grid[0], [2, 2, 0, 0]);
    }

    #[test]
    fn test_end_to_end_scenario() {
        // The single merge scenario: [[2,2,0,0], ...] slid left, before any spawn.
        let grid = [[2, 2, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0]];
        let board = Board::from_grid(grid, 0).unwrap();
        let slid = board.apply(Move::Left);
        assert_eq!(slid, [[4, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0]]);
    }

    // -------------------------------------------------------------------------
    // Slide properties
    // -------------------------------------------------------------------------

    #[test]
    fn test_noop_slide_is_idempotent() {
        // Left cannot change this grid; re-applying keeps it fixed.
        let grid = [[2, 0, 0, 0], [4, 0, 0, 0], [8, 0, 0, 0], [16, 0, 0, 0]];
        let once = slide(&grid, Move::Left);
        assert_eq!(once, grid);
        assert_eq!(slide(&once, Move::Left), grid);
    }

    #[test]
    fn test_mass_conservation() {
        let grid = [[2, 2, 4, 0], [0, 4, 4, 8], [2, 0, 2, 0], [16, 16, 2, 2]];
        let before = grid_sum(&grid);
        for mv in Move::all() {
            assert_eq!(grid_sum(&slide(&grid, mv)), before, "mass changed for {:?}", mv);
        }
    }

    // -------------------------------------------------------------------------
    // Available moves and terminal detection
    // -------------------------------------------------------------------------

    #[test]
    fn test_available_moves_open_board() {
        let grid = [[2, 2, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0]];
        let moves = available_moves(&grid);
        assert_eq!(moves, vec![Move::Left, Move::Right, Move::Down]);
    }

    #[test]
    fn test_checkerboard_is_terminal() {
        let grid = [[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]];
        assert!(available_moves(&grid).is_empty());
        assert!(is_terminal(&grid));
        let board = Board::from_grid(grid, 0).unwrap();
        assert!(board.is_terminal());
    }

    #[test]
    fn test_full_board_with_merge_not_terminal() {
        let grid = [[2, 2, 4, 8], [4, 8, 16, 32], [8, 16, 32, 64], [16, 32, 64, 128]];
        assert!(!is_terminal(&grid));
    }

    // -------------------------------------------------------------------------
    // Spawning
    // -------------------------------------------------------------------------

    #[test]
    fn test_spawn_fills_exactly_one_empty_cell() {
        let grid = [[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 0]];
        let mut board = Board::from_grid(grid, 7).unwrap();
        assert!(board.spawn_random_tile());
        let spawned = board.grid()[3][3];
        assert!(spawned == 2 || spawned == 4);
        // every pre-existing tile is untouched
        for row in 0..4 {
            for col in 0..4 {
                if (row, col) != (3, 3) {
                    assert_eq!(board.grid()[row][col], grid[row][col]);
                }
            }
        }
    }

    #[test]
    fn test_spawn_on_full_board_fails_unchanged() {
        let grid = [[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]];
        let mut board = Board::from_grid(grid, 7).unwrap();
        assert!(!board.spawn_random_tile());
        assert_eq!(*board.grid(), grid);
    }

    #[test]
    fn test_spawn_value_distribution() {
        // 90/10 split: across many seeded spawns both values appear and 2s
        // are the clear majority.
        let mut twos = 0;
        let mut fours = 0;
        for seed in 0..200 {
            let mut board = Board::from_grid([[0; 4]; 4], seed).unwrap();
            board.spawn_random_tile();
            match board.grid().iter().flatten().copied().find(|&v| v != 0) {
                Some(2) => twos += 1,
                Some(4) => fours += 1,
                other => panic!("unexpected spawn {:?}", other),
            }
        }
        assert!(twos > fours);
        assert!(fours > 0);
    }

    #[test]
    fn test_fresh_board_has_two_tiles() {
        let board = Board::fresh(42);
        let tiles: Vec<u32> = board.grid().iter().flatten().copied().filter(|&v| v != 0).collect();
        assert_eq!(tiles.len(), 2);
        assert!(tiles.iter().all(|&v| v == 2 || v == 4));
    }

    #[test]
    fn test_fresh_determinism() {
        assert_eq!(*Board::fresh(12345).grid(), *Board::fresh(12345).grid());
    }

    #[test]
    fn test_different_seeds_different_boards() {
        // Very unlikely to collide
        assert_ne!(*Board::fresh(111).grid(), *Board::fresh(222).grid());
    }

    // -------------------------------------------------------------------------
    // Steps
    // -------------------------------------------------------------------------

    #[test]
    fn test_step_spawns_after_change() {
        let grid = [[2, 2, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0]];
        let mut board = Board::from_grid(grid, 3).unwrap();
        assert!(board.step(Move::Left));
        assert_eq!(board.grid()[0][0], 4);
        // the merge left 15 empties, the spawn took one back
        assert_eq!(board.empty_count(), 14);
    }

    #[test]
    fn test_step_no_change_no_spawn() {
        let grid = [[2, 0, 0, 0], [4, 0, 0, 0], [8, 0, 0, 0], [16, 0, 0, 0]];
        let mut board = Board::from_grid(grid, 3).unwrap();
        assert!(!board.step(Move::Left));
        assert_eq!(*board.grid(), grid);
    }

    #[test]
    fn test_step_determinism() {
        let mut a = Board::fresh(54321);
        let mut b = Board::fresh(54321);
        for mv in [Move::Left, Move::Up, Move::Right, Move::Down] {
            a.step(mv);
            b.step(mv);
            assert_eq!(a.grid(), b.grid());
        }
    }

    // -------------------------------------------------------------------------
    // Construction and validation
    // -------------------------------------------------------------------------

    #[test]
    fn test_from_grid_rejects_non_power_of_two() {
        let mut grid = [[0; 4]; 4];
        grid[1][2] = 3;
        assert_eq!(
            Board::from_grid(grid, 0).unwrap_err(),
            InvalidGrid::NotAPowerOfTwo { row: 1, col: 2, value: 3 }
        );
    }

    #[test]
    fn test_from_grid_rejects_one() {
        // 1 is a power of two but not a legal tile
        let mut grid = [[0; 4]; 4];
        grid[0][0] = 1;
        assert!(Board::from_grid(grid, 0).is_err());
    }

    #[test]
    fn test_from_grid_accepts_valid_tiles() {
        let grid = [[0, 2, 4, 8], [16, 32, 64, 128], [256, 512, 1024, 2048], [4096, 8192, 0, 0]];
        assert!(Board::from_grid(grid, 0).is_ok());
    }

    // -------------------------------------------------------------------------
    // Rendering
    // -------------------------------------------------------------------------

    #[test]
    fn test_display_format() {
        let board = Board::fresh(42);
        let rendered = format!("{}", board);
        assert!(rendered.contains("+------+"));
    }
}
