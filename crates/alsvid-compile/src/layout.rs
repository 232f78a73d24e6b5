//! Qubit layout: logical→physical mapping, device connectivity, and the
//! constraint-satisfaction direct-layout solver.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::time::Instant;

use alsvid_ir::QubitId;

/// A bijection between logical qubit indices and physical qubit indices.
///
/// Maintained as two synchronized maps. `Clone` is cheap: the router's
/// lookahead search explores speculative swaps on copies and only commits
/// to the authoritative layout once a winner is chosen.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Layout {
    /// Map from logical qubit to physical qubit index.
    logical_to_physical: FxHashMap<QubitId, u32>,
    /// Map from physical qubit index to logical qubit.
    physical_to_logical: FxHashMap<u32, QubitId>,
}

impl Layout {
    /// Create a new empty layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a trivial layout (logical qubit i → physical qubit i).
    pub fn trivial(num_qubits: u32) -> Self {
        let mut layout = Self::new();
        for i in 0..num_qubits {
            layout.add(QubitId(i), i);
        }
        layout
    }

    /// Add a mapping from logical to physical qubit.
    ///
    /// Conflicting stale entries in either direction are removed first so
    /// the two maps stay consistent.
    pub fn add(&mut self, logical: QubitId, physical: u32) {
        if let Some(&old_logical) = self.physical_to_logical.get(&physical) {
            if old_logical != logical {
                self.logical_to_physical.remove(&old_logical);
            }
        }
        if let Some(&old_physical) = self.logical_to_physical.get(&logical) {
            if old_physical != physical {
                self.physical_to_logical.remove(&old_physical);
            }
        }
        self.logical_to_physical.insert(logical, physical);
        self.physical_to_logical.insert(physical, logical);
    }

    /// Get the physical qubit for a logical qubit.
    pub fn physical(&self, logical: QubitId) -> Option<u32> {
        self.logical_to_physical.get(&logical).copied()
    }

    /// Get the logical qubit for a physical qubit.
    pub fn logical(&self, physical: u32) -> Option<QubitId> {
        self.physical_to_logical.get(&physical).copied()
    }

    /// Exchange the logical qubits held by two physical positions.
    pub fn swap_by_physical(&mut self, p1: u32, p2: u32) {
        let l1 = self.physical_to_logical.get(&p1).copied();
        let l2 = self.physical_to_logical.get(&p2).copied();

        if let Some(l1) = l1 {
            self.logical_to_physical.insert(l1, p2);
            self.physical_to_logical.insert(p2, l1);
        } else {
            self.physical_to_logical.remove(&p2);
        }

        if let Some(l2) = l2 {
            self.logical_to_physical.insert(l2, p1);
            self.physical_to_logical.insert(p1, l2);
        } else {
            self.physical_to_logical.remove(&p1);
        }
    }

    /// Get the number of mapped qubits.
    pub fn len(&self) -> usize {
        self.logical_to_physical.len()
    }

    /// Check if the layout is empty.
    pub fn is_empty(&self) -> bool {
        self.logical_to_physical.is_empty()
    }

    /// Iterate over (logical, physical) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (QubitId, u32)> + '_ {
        self.logical_to_physical.iter().map(|(&l, &p)| (l, p))
    }
}

/// Target device coupling map.
///
/// Defines which pairs of physical qubits can interact with two-qubit
/// gates. All-pairs shortest-path distances are precomputed with BFS from
/// each node, so routing gets O(1) distance lookups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouplingMap {
    /// List of connected qubit pairs (bidirectional).
    edges: Vec<(u32, u32)>,
    /// Number of physical qubits.
    num_qubits: u32,
    /// Adjacency list for fast lookup.
    #[serde(skip)]
    adjacency: FxHashMap<u32, Vec<u32>>,
    /// Precomputed all-pairs distance matrix; `u32::MAX` means unreachable.
    #[serde(skip)]
    dist_matrix: Vec<Vec<u32>>,
}

impl CouplingMap {
    /// Create a new coupling map with the given number of qubits.
    pub fn new(num_qubits: u32) -> Self {
        Self {
            edges: vec![],
            num_qubits,
            adjacency: FxHashMap::default(),
            dist_matrix: vec![],
        }
    }

    /// Build a coupling map from an edge list.
    pub fn from_edges(num_qubits: u32, edges: &[(u32, u32)]) -> Self {
        let mut map = Self::new(num_qubits);
        for &(a, b) in edges {
            map.add_edge(a, b);
        }
        map.precompute_distances();
        map
    }

    /// Add an edge between two qubits (bidirectional).
    ///
    /// Duplicate edges (including reversed pairs) are silently ignored.
    pub fn add_edge(&mut self, q1: u32, q2: u32) {
        if self
            .edges
            .iter()
            .any(|&(a, b)| (a == q1 && b == q2) || (a == q2 && b == q1))
        {
            return;
        }
        self.edges.push((q1, q2));
        self.adjacency.entry(q1).or_default().push(q2);
        self.adjacency.entry(q2).or_default().push(q1);
    }

    /// Precompute all-pairs shortest paths using BFS from each node.
    pub fn precompute_distances(&mut self) {
        let n = self.num_qubits as usize;
        self.dist_matrix = vec![vec![u32::MAX; n]; n];

        for src in 0..n {
            self.dist_matrix[src][src] = 0;
            let mut queue = VecDeque::new();
            queue.push_back(src as u32);

            while let Some(current) = queue.pop_front() {
                let cur = current as usize;
                for &neighbor in self.adjacency.get(&current).into_iter().flatten() {
                    let nb = neighbor as usize;
                    if self.dist_matrix[src][nb] == u32::MAX {
                        self.dist_matrix[src][nb] = self.dist_matrix[src][cur] + 1;
                        queue.push_back(neighbor);
                    }
                }
            }
        }
    }

    /// Rebuild adjacency and distances from the edge list. Must be called
    /// after deserialization.
    pub fn rebuild_caches(&mut self) {
        self.adjacency.clear();
        let edges = self.edges.clone();
        for (q1, q2) in edges {
            self.adjacency.entry(q1).or_default().push(q2);
            self.adjacency.entry(q2).or_default().push(q1);
        }
        self.precompute_distances();
    }

    /// Check if two qubits are directly connected (either orientation).
    #[inline]
    pub fn is_connected(&self, q1: u32, q2: u32) -> bool {
        self.adjacency
            .get(&q1)
            .is_some_and(|neighbors| neighbors.contains(&q2))
    }

    /// Get the number of physical qubits.
    #[inline]
    pub fn num_qubits(&self) -> u32 {
        self.num_qubits
    }

    /// Get the coupling edges.
    pub fn edges(&self) -> &[(u32, u32)] {
        &self.edges
    }

    /// Get neighbors of a qubit.
    pub fn neighbors(&self, qubit: u32) -> impl Iterator<Item = u32> + '_ {
        self.adjacency
            .get(&qubit)
            .map(|v| v.iter().copied())
            .into_iter()
            .flatten()
    }

    /// Shortest-path distance between two physical qubits.
    pub fn distance(&self, from: u32, to: u32) -> Option<u32> {
        if from == to {
            return Some(0);
        }
        let (f, t) = (from as usize, to as usize);
        if f < self.dist_matrix.len() && t < self.dist_matrix[f].len() {
            let d = self.dist_matrix[f][t];
            return if d == u32::MAX { None } else { Some(d) };
        }
        None
    }

    /// Create a linear coupling map (0-1-2-3-…).
    pub fn linear(n: u32) -> Self {
        let mut map = Self::new(n);
        for i in 0..n.saturating_sub(1) {
            map.add_edge(i, i + 1);
        }
        map.precompute_distances();
        map
    }

    /// Create a ring coupling map.
    pub fn ring(n: u32) -> Self {
        let mut map = Self::new(n);
        for i in 0..n.saturating_sub(1) {
            map.add_edge(i, i + 1);
        }
        if n > 2 {
            map.add_edge(n - 1, 0);
        }
        map.precompute_distances();
        map
    }

    /// Create a fully connected coupling map.
    pub fn full(n: u32) -> Self {
        let mut map = Self::new(n);
        for i in 0..n {
            for j in (i + 1)..n {
                map.add_edge(i, j);
            }
        }
        map.precompute_distances();
        map
    }

    /// Create a star topology (center qubit connected to all others).
    pub fn star(n: u32) -> Self {
        let mut map = Self::new(n);
        for i in 1..n {
            map.add_edge(0, i);
        }
        map.precompute_distances();
        map
    }

    /// Create a rectangular grid topology.
    pub fn grid(width: u32, height: u32) -> Self {
        let mut map = Self::new(width * height);
        for y in 0..height {
            for x in 0..width {
                let idx = y * width + x;
                if x + 1 < width {
                    map.add_edge(idx, idx + 1);
                }
                if y + 1 < height {
                    map.add_edge(idx, idx + width);
                }
            }
        }
        map.precompute_distances();
        map
    }
}

/// Why a bounded search stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetExceeded {
    /// The iteration cap was reached.
    Iterations,
    /// The wall-clock deadline passed.
    Timeout,
}

/// Explicit search bounds threaded through the CSP backtracker.
///
/// Checked at every recursive step; exhaustion aborts the search cleanly
/// with a diagnostic instead of throwing.
#[derive(Debug, Clone)]
pub struct SearchBudget {
    /// Maximum number of backtracking steps.
    pub max_iterations: u64,
    /// Optional wall-clock deadline.
    pub deadline: Option<Instant>,
    spent: u64,
}

impl SearchBudget {
    /// Create a budget with an iteration cap only.
    pub fn iterations(max_iterations: u64) -> Self {
        Self {
            max_iterations,
            deadline: None,
            spent: 0,
        }
    }

    /// Create a budget with an iteration cap and a deadline.
    pub fn with_deadline(max_iterations: u64, deadline: Instant) -> Self {
        Self {
            max_iterations,
            deadline: Some(deadline),
            spent: 0,
        }
    }

    /// Charge one search step, reporting exhaustion if a bound is hit.
    pub fn charge(&mut self) -> Option<BudgetExceeded> {
        self.spent += 1;
        if self.spent > self.max_iterations {
            return Some(BudgetExceeded::Iterations);
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Some(BudgetExceeded::Timeout);
            }
        }
        None
    }

    /// Search steps charged so far.
    pub fn spent(&self) -> u64 {
        self.spent
    }
}

impl Default for SearchBudget {
    fn default() -> Self {
        Self::iterations(100_000)
    }
}

/// Outcome of the direct-layout search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectLayoutStatus {
    /// A satisfying layout was found.
    Found,
    /// The constraint system is provably unsatisfiable.
    Infeasible,
    /// The iteration cap was reached before a decision.
    IterationLimit,
    /// The wall-clock deadline passed before a decision.
    Timeout,
}

impl fmt::Display for DirectLayoutStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DirectLayoutStatus::Found => "OK",
            DirectLayoutStatus::Infeasible => "no available layout",
            DirectLayoutStatus::IterationLimit => "iteration limit reached",
            DirectLayoutStatus::Timeout => "timeout",
        };
        write!(f, "{s}")
    }
}

/// Find a logical→physical bijection such that every logical connection
/// pair lands on adjacent physical qubits, with no SWAP insertion needed.
///
/// Modeled as a constraint-satisfaction problem: variables are logical
/// qubits, domains are physical indices, constraints are all-different
/// plus coupling-map adjacency (undirected) for every connection pair.
/// Three-qubit gates contribute all three pairwise connections upstream.
///
/// Fails closed: more logical than physical qubits is immediately
/// infeasible without searching. Infeasibility is an expected, recoverable
/// outcome — the caller falls back to routing — so it is reported via the
/// status, never as an error.
pub fn generate_direct_layout(
    logical_qubit_num: u32,
    connections: &[(u32, u32)],
    coupling: &CouplingMap,
    budget: &mut SearchBudget,
) -> (Option<Layout>, DirectLayoutStatus) {
    if logical_qubit_num > coupling.num_qubits() {
        return (None, DirectLayoutStatus::Infeasible);
    }

    // Adjacency constraints grouped per logical qubit, against every
    // already-assigned peer.
    let mut constraints: FxHashMap<u32, Vec<u32>> = FxHashMap::default();
    for &(a, b) in connections {
        constraints.entry(a.max(b)).or_default().push(a.min(b));
    }

    let mut assignment: Vec<Option<u32>> = vec![None; logical_qubit_num as usize];
    let mut used = vec![false; coupling.num_qubits() as usize];

    match assign(
        0,
        logical_qubit_num,
        &constraints,
        coupling,
        &mut assignment,
        &mut used,
        budget,
    ) {
        Ok(true) => {
            let mut layout = Layout::new();
            for (logical, physical) in assignment.iter().enumerate() {
                // All variables are assigned on success.
                layout.add(QubitId(logical as u32), physical.unwrap());
            }
            (Some(layout), DirectLayoutStatus::Found)
        }
        Ok(false) => (None, DirectLayoutStatus::Infeasible),
        Err(BudgetExceeded::Iterations) => (None, DirectLayoutStatus::IterationLimit),
        Err(BudgetExceeded::Timeout) => (None, DirectLayoutStatus::Timeout),
    }
}

/// Recursive backtracking step: try every free physical position for
/// logical qubit `var`, honoring adjacency against already-placed peers.
fn assign(
    var: u32,
    total: u32,
    constraints: &FxHashMap<u32, Vec<u32>>,
    coupling: &CouplingMap,
    assignment: &mut Vec<Option<u32>>,
    used: &mut Vec<bool>,
    budget: &mut SearchBudget,
) -> Result<bool, BudgetExceeded> {
    if var == total {
        return Ok(true);
    }
    if let Some(exceeded) = budget.charge() {
        return Err(exceeded);
    }

    let peers = constraints.get(&var);

    for physical in 0..coupling.num_qubits() {
        if used[physical as usize] {
            continue;
        }
        let satisfied = peers.into_iter().flatten().all(|&peer| {
            // Peers have lower variable numbers, so they are always placed.
            let peer_phys = assignment[peer as usize].unwrap();
            coupling.is_connected(physical, peer_phys)
        });
        if !satisfied {
            continue;
        }

        assignment[var as usize] = Some(physical);
        used[physical as usize] = true;
        if assign(var + 1, total, constraints, coupling, assignment, used, budget)? {
            return Ok(true);
        }
        assignment[var as usize] = None;
        used[physical as usize] = false;
    }

    Ok(false)
}
