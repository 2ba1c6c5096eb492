//! Depth-bounded Expectimax search with alpha-beta pruning.
//!
//! Alternates a maximizing layer (the player's move choice) with a chance
//! layer (the random tile spawn), evaluated as a probability-weighted
//! expectation. Only the maximizing layer prunes: skipping any spawn outcome
//! would bias the expectation.

use crate::heuristic::Heuristic;
use crate::{available_moves, empty_cells, is_terminal, slide, Board, Grid, Move, SearchError};

/// Spawn outcomes and their probabilities: 2 at 90%, 4 at 10%.
const SPAWN_DISTRIBUTION: [(u32, f64); 2] = [(2, 0.9), (4, 0.1)];

/// Expectimax engine.
pub struct Expectimax<H: Heuristic> {
    max_depth: u32,
    heuristic: H,
}

impl<H: Heuristic> Expectimax<H> {
    /// Create an engine recursing at most `max_depth` layers before falling
    /// back to the heuristic.
    pub fn new(max_depth: u32, heuristic: H) -> Self {
        Self { max_depth, heuristic }
    }

    /// Return the move with the highest expected evaluation.
    ///
    /// Each available move is applied (without spawning; chance happens one
    /// layer down) and scored by a chance-layer call at depth 0. Ties break
    /// towards the earlier move in enumeration order.
    pub fn search(&self, board: &Board) -> Result<Move, SearchError> {
        let moves = board.available_moves();
        if moves.is_empty() {
            return Err(SearchError::NoAvailableMoves);
        }

        let mut best_value = f64::NEG_INFINITY;
        let mut best_move = moves[0];
        for mv in moves {
            let slid = board.apply(mv);
            let value = self.expectimax(&slid, false, f64::NEG_INFINITY, f64::INFINITY, 0)?;
            if value > best_value {
                best_value = value;
                best_move = mv;
            }
        }
        Ok(best_move)
    }

    fn expectimax(
        &self,
        grid: &Grid,
        maximizing: bool,
        mut alpha: f64,
        beta: f64,
        depth: u32,
    ) -> Result<f64, SearchError> {
        if depth >= self.max_depth || is_terminal(grid) {
            return Ok(self.heuristic.evaluate(grid)?);
        }

        if maximizing {
            let mut best = f64::NEG_INFINITY;
            for mv in available_moves(grid) {
                let child = slide(grid, mv);
                let value = self.expectimax(&child, false, alpha, beta, depth + 1)?;
                if value > best {
                    best = value;
                }
                if value >= beta {
                    break;
                }
                if value > alpha {
                    alpha = value;
                }
            }
            Ok(best)
        } else {
            let empty = empty_cells(grid);
            if empty.is_empty() {
                // unreachable via a legal move, but never divide by zero
                return Ok(self.heuristic.evaluate(grid)?);
            }
            let mut expectation = 0.0;
            let mut scratch = *grid;
            for (value, probability) in SPAWN_DISTRIBUTION {
                let weight = probability / empty.len() as f64;
                for &(row, col) in &empty {
                    scratch[row][col] = value;
                    expectation += weight * self.expectimax(&scratch, true, alpha, beta, depth + 1)?;
                    scratch[row][col] = 0;
                }
            }
            Ok(expectation)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
