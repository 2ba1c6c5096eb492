//! Monte-Carlo Tree Search over 2048 move sequences.
//!
//! The tree is rebuilt from scratch on every [`Mcts::search`] call and
//! refined for a fixed number of iterations: UCB1-guided selection down to a
//! leaf, expansion of previously visited leaves, a random rollout from
//! unvisited ones, heuristic evaluation, and backpropagation of the score to
//! the root. Nodes live in an arena and point at each other by index, so
//! parent back-references never create ownership cycles.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::heuristic::Heuristic;
use crate::{Board, Move, SearchError};

type NodeId = usize;

/// A search-tree node. Rollout nodes also land here: they keep a parent link
/// so backpropagation can reach the tree, but are never attached as children.
struct Node {
    board: Board,
    parent: Option<NodeId>,
    children: Vec<(NodeId, Move)>,
    visits: u32,
    score: f64,
}

impl Node {
    fn root(board: Board) -> Node {
        Node {
            board,
            parent: None,
            children: Vec::new(),
            visits: 0,
            score: 0.0,
        }
    }

    fn child(board: Board, parent: NodeId) -> Node {
        Node {
            parent: Some(parent),
            ..Node::root(board)
        }
    }
}

/// Arena-backed node storage, fresh per search call.
struct Arena {
    nodes: Vec<Node>,
}

impl Arena {
    fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(node);
        id
    }

    fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id]
    }
}

/// The UCB1 score of a child under `parent_visits` total parent visits.
///
/// An unvisited child scores positive infinity, so every child is tried once
/// before any sibling is revisited.
fn ucb1(parent_visits: u32, score: f64, visits: u32, exploration: f64) -> f64 {
    if visits == 0 {
        return f64::INFINITY;
    }
    let mean = score / visits as f64;
    mean + exploration * (2.0 * (parent_visits as f64).ln() / visits as f64).sqrt()
}

/// Monte-Carlo Tree Search engine.
pub struct Mcts<H: Heuristic> {
    max_iterations: u32,
    max_simulation_depth: u32,
    exploration: f64,
    heuristic: H,
    rng: SmallRng,
}

impl<H: Heuristic> Mcts<H> {
    /// Create an engine running `max_iterations` tree iterations per search,
    /// with rollouts bounded by `max_simulation_depth` random steps.
    ///
    /// The UCB1 exploration constant defaults to 1; see
    /// [`Mcts::with_exploration`].
    pub fn new(max_iterations: u32, max_simulation_depth: u32, heuristic: H) -> Self {
        Self {
            max_iterations,
            max_simulation_depth,
            exploration: 1.0,
            heuristic,
            rng: SmallRng::from_entropy(),
        }
    }

    /// Set the UCB1 exploration constant.
    pub fn with_exploration(mut self, exploration: f64) -> Self {
        self.exploration = exploration;
        self
    }

    /// Seed the engine's PRNG for reproducible searches.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = SmallRng::seed_from_u64(seed);
        self
    }

    /// Search the move tree rooted at `board` and return the best move.
    ///
    /// The best move is the root child with the highest mean evaluation.
    /// Fails with [`SearchError::NoAvailableMoves`] on a terminal root and
    /// with [`SearchError::IterationBudgetTooSmall`] when the iteration
    /// budget could leave a root child unvisited (the first iteration is
    /// spent rolling out the unexpanded root, hence the `+ 1`).
    pub fn search(&mut self, board: &Board) -> Result<Move, SearchError> {
        let root_moves = board.available_moves();
        if root_moves.is_empty() {
            return Err(SearchError::NoAvailableMoves);
        }
        if (self.max_iterations as usize) < root_moves.len() + 1 {
            return Err(SearchError::IterationBudgetTooSmall {
                configured: self.max_iterations,
                required: root_moves.len(),
            });
        }

        let mut arena = Arena::new();
        let root = arena.push(Node::root(board.clone()));

        for _ in 0..self.max_iterations {
            // Selection: descend to a leaf along the best UCB1 children.
            let mut node = root;
            while !arena.get(node).children.is_empty() {
                node = self.select_child(&arena, node);
            }

            // Expansion: a leaf that has already been scored grows one child
            // per available move; descend into one of them.
            if arena.get(node).visits > 0 {
                if self.expand(&mut arena, node) {
                    node = self.select_child(&arena, node);
                }
            }

            // Simulation: an unscored node is rolled out randomly instead.
            if arena.get(node).visits == 0 {
                node = self.simulate(&mut arena, node);
            }

            let score = self.heuristic.evaluate(arena.get(node).board.grid())?;
            backpropagate(&mut arena, node, score);
        }

        best_move(&arena, root)
    }

    /// The child of `id` with the highest UCB1 score.
    fn select_child(&self, arena: &Arena, id: NodeId) -> NodeId {
        let node = arena.get(id);
        let mut best = node.children[0].0;
        let mut best_ucb = f64::NEG_INFINITY;
        for &(child_id, _) in &node.children {
            let child = arena.get(child_id);
            let ucb = ucb1(node.visits, child.score, child.visits, self.exploration);
            if ucb > best_ucb {
                best_ucb = ucb;
                best = child_id;
            }
        }
        best
    }

    /// Create one child per available move, each with one random tile
    /// spawned. Returns false on a terminal node, which stays a leaf.
    fn expand(&mut self, arena: &mut Arena, id: NodeId) -> bool {
        let moves = arena.get(id).board.available_moves();
        if moves.is_empty() {
            return false;
        }
        for mv in moves {
            let grid = arena.get(id).board.apply(mv);
            let mut board = Board::with_grid(grid, self.rng.gen::<u64>());
            board.spawn_random_tile();
            let child = arena.push(Node::child(board, id));
            arena.get_mut(id).children.push((child, mv));
        }
        true
    }

    /// Random playout from `id`: up to `max_simulation_depth` uniformly
    /// random steps through transient nodes, stopping early at a terminal
    /// state. Returns the node the rollout ended on.
    fn simulate(&mut self, arena: &mut Arena, id: NodeId) -> NodeId {
        let mut node = id;
        for _ in 0..self.max_simulation_depth {
            let moves = arena.get(node).board.available_moves();
            if moves.is_empty() {
                break;
            }
            let mv = moves[self.rng.gen_range(0..moves.len())];
            let grid = arena.get(node).board.apply(mv);
            let mut board = Board::with_grid(grid, self.rng.gen::<u64>());
            board.spawn_random_tile();
            node = arena.push(Node::child(board, node));
        }
        node
    }
}

/// Walk the parent links from `id` to the root inclusive, crediting one
/// visit and the evaluation score to every node on the path.
fn backpropagate(arena: &mut Arena, mut id: NodeId, score: f64) {
    loop {
        let node = arena.get_mut(id);
        node.visits += 1;
        node.score += score;
        match node.parent {
            Some(parent) => id = parent,
            None => break,
        }
    }
}

/// The root child with the highest mean evaluation; first of equals wins.
fn best_move(arena: &Arena, root: NodeId) -> Result<Move, SearchError> {
    let mut best: Option<(f64, Move)> = None;
    for &(child_id, mv) in &arena.get(root).children {
        let child = arena.get(child_id);
        let mean = child.score / child.visits as f64;
        match best {
            Some((score, _)) if mean <= score => {}
            _ => best = Some((mean, mv)),
        }
    }
    best.map(|(_, mv)| mv).ok_or(SearchError::NoAvailableMoves)
}

// =============================================================================
// Tests
// =============================================================================
