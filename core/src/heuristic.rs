//! Board evaluation heuristics.
//!
//! The search engines treat evaluation as an injected capability: they hand
//! over a grid and consume a scalar, nothing else. Higher is better.

use crate::Grid;
use thiserror::Error;

/// Failure raised by an evaluation capability that cannot score a grid.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("heuristic evaluation failed: {reason}")]
pub struct HeuristicError {
    pub reason: String,
}

/// A desirability score for a grid. Pure: no side effects, no hidden state.
pub trait Heuristic {
    fn evaluate(&self, grid: &Grid) -> Result<f64, HeuristicError>;
}

/// Location score map rewarding edges and corners, from the reference scorer.
pub const EDGE_CORNER_MAP: [[f64; 4]; 4] = [
    [3.0, 2.0, 2.0, 3.0],
    [2.0, 1.0, 1.0, 2.0],
    [2.0, 1.0, 1.0, 2.0],
    [3.0, 2.0, 2.0, 3.0],
];

/// The reference four-factor scorer.
///
/// Factors, each gathered in a single pass over the 16 cells:
/// - `empty`: count of empty cells;
/// - `sum`: sum of all tile values;
/// - `position`: each tile's value times its location-map weight, rewarding
///   tiles parked on edges and corners;
/// - `smoothness`: minus the sum of `|log2(a) - log2(b)|` over every
///   horizontally or vertically adjacent non-empty pair, so boards whose
///   neighbors hold similar values are penalized least.
///
/// The total is the weighted sum of the four factors. Weights and the
/// location map are plain constructor state, never process-wide globals.
#[derive(Debug, Clone)]
pub struct CompositeHeuristic {
    empty_weight: f64,
    sum_weight: f64,
    position_weight: f64,
    smoothness_weight: f64,
    location_map: [[f64; 4]; 4],
}

impl Default for CompositeHeuristic {
    fn default() -> Self {
        CompositeHeuristic::new(1.0, 1.0, 1.0, 1.0, EDGE_CORNER_MAP)
    }
}

impl CompositeHeuristic {
    pub fn new(
        empty_weight: f64,
        sum_weight: f64,
        position_weight: f64,
        smoothness_weight: f64,
        location_map: [[f64; 4]; 4],
    ) -> Self {
        Self {
            empty_weight,
            sum_weight,
            position_weight,
            smoothness_weight,
            location_map,
        }
    }
}

impl Heuristic for CompositeHeuristic {
    fn evaluate(&self, grid: &Grid) -> Result<f64, HeuristicError> {
        let mut empty = 0.0;
        let mut sum = 0.0;
        let mut position = 0.0;
        let mut smoothness = 0.0;

        for row in 0..4 {
            for col in 0..4 {
                let tile = grid[row][col];
                if tile == 0 {
                    empty += 1.0;
                    continue;
                }
                let value = tile as f64;
                sum += value;
                position += value * self.location_map[row][col];

                // right and down neighbors cover each adjacent pair once
                if col < 3 && grid[row][col + 1] != 0 {
                    smoothness -= (value.log2() - (grid[row][col + 1] as f64).log2()).abs();
                }
                if row < 3 && grid[row + 1][col] != 0 {
                    smoothness -= (value.log2() - (grid[row + 1][col] as f64).log2()).abs();
                }
            }
        }

        Ok(empty * self.empty_weight
            + sum * self.sum_weight
            + position * self.position_weight
            + smoothness * self.smoothness_weight)
    }
}

/// The simplest scorer: the sum of all tile values.
///
/// Mostly useful as a baseline and in tests, since slide/merge conserves it.
#[derive(Debug, Clone, Copy, Default)]
pub struct TileSum;

impl Heuristic for TileSum {
    fn evaluate(&self, grid: &Grid) -> Result<f64, HeuristicError> {
        Ok(grid.iter().flatten().map(|&v| v as f64).sum())
    }
}

// =============================================================================
// Tests
// =============================================================================
