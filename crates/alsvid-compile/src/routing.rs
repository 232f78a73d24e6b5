//! Heuristic lookahead SWAP-insertion routing.
//!
//! When direct layout fails, the router starts from the trivial layout
//! (logical i on physical i) and inserts SWAP operations at specific
//! points in the gate stream so that every multi-qubit gate's physical
//! qubits are adjacent when it executes. The search is a bounded
//! depth×width lookahead over candidate coupling edges, scored by how many
//! gates a swap sequence unblocks against how many swaps it costs. The
//! schedule is valid but not minimal; full SWAP minimization is NP-hard.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use alsvid_ir::{NodeIndex, QubitId};

use crate::error::{CompileError, CompileResult};
use crate::layout::{CouplingMap, Layout};

/// Bounds for the lookahead search.
#[derive(Debug, Clone, Copy)]
pub struct RoutingConfig {
    /// Maximum number of consecutive speculative swaps explored per search.
    pub depth: u32,
    /// Maximum candidates expanded per search level.
    pub width: u32,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self { depth: 3, width: 4 }
    }
}

/// The router's output: where to insert which physical swaps, and the
/// resolved physical qubits of every input interaction.
#[derive(Debug, Clone)]
pub struct RoutingPlan {
    /// Gate position → ordered physical SWAP pairs executed just before it.
    pub swaps: FxHashMap<usize, Vec<(u32, u32)>>,
    /// Final physical qubits of every interaction, in input order.
    pub gate_layout: Vec<Vec<u32>>,
    /// The layout after all swaps have been applied.
    pub final_layout: Layout,
}

impl RoutingPlan {
    /// Total number of inserted SWAP operations.
    pub fn num_swaps(&self) -> usize {
        self.swaps.values().map(Vec::len).sum()
    }
}

/// Produce a SWAP schedule making every interaction adjacency-satisfying.
///
/// `interactions` is the ordered gate/qubit list extracted from the IR
/// (callers already expanded into their constituent interactions). Gates
/// touching fewer than two qubits are trivially satisfied. Fails with
/// [`CompileError::Routing`] when a full search round makes zero progress,
/// which covers unsatisfiable (disconnected) coupling graphs.
pub fn generate_lookahead_routing(
    interactions: &[(NodeIndex, Vec<QubitId>)],
    coupling: &CouplingMap,
    config: &RoutingConfig,
) -> CompileResult<RoutingPlan> {
    let num_physical = coupling.num_qubits();
    for (_, qubits) in interactions {
        if let Some(max) = qubits.iter().map(|q| q.0).max() {
            if max >= num_physical {
                return Err(CompileError::CircuitTooLarge {
                    required: max as usize + 1,
                    available: num_physical,
                });
            }
        }
    }

    // Trivial initial layout over every physical position, so any coupling
    // edge always exchanges two mapped qubits.
    let mut layout = Layout::trivial(num_physical);
    let mut resolved: Vec<Option<Vec<u32>>> = vec![None; interactions.len()];
    let mut swaps: FxHashMap<usize, Vec<(u32, u32)>> = FxHashMap::default();

    // Hard cap on swaps spent resolving one front gate. Improving
    // lookahead steps and shortest-path fallback steps are both bounded
    // by the graph diameter, so exceeding the cap means the instance is
    // unroutable (e.g. a triangle requirement on a line).
    let max_swaps_per_gate = num_physical as usize * 4 + 8;

    loop {
        transform_gates(interactions, &mut resolved, &layout, coupling);

        let Some(front) = resolved.iter().position(Option::is_none) else {
            break;
        };

        // Apply swaps until the front gate becomes ready; every round of
        // this loop must resolve the front gate or raise.
        let mut swaps_for_front = 0usize;
        let mut lookahead_live = true;
        loop {
            let front_dist = gate_distance(&interactions[front].1, &layout, coupling)
                .ok_or_else(|| {
                    CompileError::Routing(format!(
                        "gate at position {front} spans disconnected coupling components"
                    ))
                })?;
            if front_dist == 0 {
                break;
            }
            if swaps_for_front >= max_swaps_per_gate {
                return Err(CompileError::Routing(format!(
                    "no progress after {swaps_for_front} swaps at gate position {front}"
                )));
            }

            let swap = if lookahead_live {
                search_best_swap(interactions, &resolved, &layout, coupling, config)
            } else {
                // The lookahead stopped shrinking the front gate's
                // distance; step its farthest pair along a shortest path
                // instead, which makes guaranteed progress for two-qubit
                // gates on a connected coupling.
                front_path_swap(&interactions[front].1, &layout, coupling)
            }
            .ok_or_else(|| {
                CompileError::Routing(format!(
                    "no candidate swap for gate at position {front}"
                ))
            })?;

            let position = locate_swap(interactions, &resolved, &layout, swap, front);
            swaps.entry(position).or_default().push(swap);
            layout.swap_by_physical(swap.0, swap.1);
            swaps_for_front += 1;
            debug!(
                "inserted swap ({}, {}) before gate {}",
                swap.0, swap.1, position
            );

            let new_dist = gate_distance(&interactions[front].1, &layout, coupling)
                .unwrap_or(front_dist + 1);
            if new_dist >= front_dist {
                lookahead_live = false;
            }
        }
    }

    let gate_layout = resolved
        .into_iter()
        .map(|r| r.expect("all interactions resolved on loop exit"))
        .collect();

    Ok(RoutingPlan {
        swaps,
        gate_layout,
        final_layout: layout,
    })
}

/// Translate ready gates to physical qubits under the current layout.
///
/// Conservative single-threaded scheduling: translation stops at the
/// first non-adjacent gate, so the resolved gates always form a prefix of
/// the stream. The prefix property is what makes recording a swap at the
/// earliest unresolved gate touching it sound — no gate resolved earlier
/// can sit after the swap's insertion point.
fn transform_gates(
    interactions: &[(NodeIndex, Vec<QubitId>)],
    resolved: &mut [Option<Vec<u32>>],
    layout: &Layout,
    coupling: &CouplingMap,
) -> usize {
    let mut newly = 0usize;
    for (i, (_, qubits)) in interactions.iter().enumerate() {
        if resolved[i].is_some() {
            continue;
        }
        if !gate_ready(qubits, layout, coupling) {
            break;
        }
        resolved[i] = Some(
            qubits
                .iter()
                .map(|&q| layout.physical(q).expect("trivial layout is total"))
                .collect(),
        );
        newly += 1;
    }
    newly
}

/// Count how many unresolved gates would translate under a speculative
/// layout, without committing anything. Same first-blocked-gate stop rule
/// as [`transform_gates`].
fn count_resolvable(
    interactions: &[(NodeIndex, Vec<QubitId>)],
    resolved: &[Option<Vec<u32>>],
    layout: &Layout,
    coupling: &CouplingMap,
) -> usize {
    let mut count = 0usize;
    for (i, (_, qubits)) in interactions.iter().enumerate() {
        if resolved[i].is_some() {
            continue;
        }
        if !gate_ready(qubits, layout, coupling) {
            break;
        }
        count += 1;
    }
    count
}

/// Whether every qubit pair of a gate is adjacent under the layout.
fn gate_ready(qubits: &[QubitId], layout: &Layout, coupling: &CouplingMap) -> bool {
    gate_distance(qubits, layout, coupling) == Some(0)
}

/// Excess pairwise distance of a gate: 0 when all pairs are adjacent,
/// `None` when a pair is unreachable. Three-qubit gates contribute all
/// three pairwise terms.
fn gate_distance(qubits: &[QubitId], layout: &Layout, coupling: &CouplingMap) -> Option<u32> {
    let mut total = 0u32;
    for (i, &a) in qubits.iter().enumerate() {
        for &b in &qubits[i + 1..] {
            let pa = layout.physical(a)?;
            let pb = layout.physical(b)?;
            total += coupling.distance(pa, pb)?.saturating_sub(1);
        }
    }
    Some(total)
}

/// Summed excess distance of every unresolved gate under a layout.
fn total_blocked_distance(
    interactions: &[(NodeIndex, Vec<QubitId>)],
    resolved: &[Option<Vec<u32>>],
    layout: &Layout,
    coupling: &CouplingMap,
) -> u64 {
    interactions
        .iter()
        .enumerate()
        .filter(|(i, _)| resolved[*i].is_none())
        .map(|(_, (_, qubits))| {
            gate_distance(qubits, layout, coupling)
                .map_or(u64::from(u32::MAX), u64::from)
        })
        .sum()
}

/// Coupling edges worth considering: those touching a physical position
/// that currently hosts a qubit of some unresolved gate.
fn candidate_swaps(
    interactions: &[(NodeIndex, Vec<QubitId>)],
    resolved: &[Option<Vec<u32>>],
    layout: &Layout,
    coupling: &CouplingMap,
) -> Vec<(u32, u32)> {
    let mut hot: FxHashSet<u32> = FxHashSet::default();
    for (i, (_, qubits)) in interactions.iter().enumerate() {
        if resolved[i].is_none() {
            for &q in qubits {
                if let Some(p) = layout.physical(q) {
                    hot.insert(p);
                }
            }
        }
    }
    coupling
        .edges()
        .iter()
        .copied()
        .filter(|&(u, v)| hot.contains(&u) || hot.contains(&v))
        .collect()
}

/// Bounded lookahead over candidate swaps.
///
/// Each speculative swap is applied to a copy of the layout; candidates
/// are explored in ascending order of the total blocked distance they
/// leave behind (a greedy ranking), at most `width` per level and `depth`
/// levels deep. A path scores `gates_unblocked − 3 × swaps_used`; the
/// first swap of the best-scoring path wins. The search stops early at a
/// first-level candidate that already unblocks a gate without increasing
/// total distance.
fn search_best_swap(
    interactions: &[(NodeIndex, Vec<QubitId>)],
    resolved: &[Option<Vec<u32>>],
    layout: &Layout,
    coupling: &CouplingMap,
    config: &RoutingConfig,
) -> Option<(u32, u32)> {
    let base_dist = total_blocked_distance(interactions, resolved, layout, coupling);

    struct Best {
        score: i64,
        dist: u64,
        first_swap: (u32, u32),
    }
    let mut best: Option<Best> = None;

    // Ranked first-level candidates.
    let mut first_level: Vec<((u32, u32), Layout, u64, usize)> =
        candidate_swaps(interactions, resolved, layout, coupling)
            .into_iter()
            .map(|swap| {
                let mut spec = layout.clone();
                spec.swap_by_physical(swap.0, swap.1);
                let dist = total_blocked_distance(interactions, resolved, &spec, coupling);
                let unblocked = count_resolvable(interactions, resolved, &spec, coupling);
                (swap, spec, dist, unblocked)
            })
            .collect();
    first_level.sort_by_key(|c| (c.2, std::cmp::Reverse(c.3)));

    for (swap, spec, dist, unblocked) in first_level.into_iter().take(config.width as usize) {
        let score = unblocked as i64 - 3;
        if best.as_ref().is_none_or(|b| (score, std::cmp::Reverse(dist)) > (b.score, std::cmp::Reverse(b.dist))) {
            best = Some(Best {
                score,
                dist,
                first_swap: swap,
            });
        }

        // Early stop: an immediately productive swap that does not make
        // the remaining gates farther away is good enough.
        if unblocked > 0 && dist <= base_dist {
            return Some(swap);
        }

        if config.depth > 1 {
            explore(
                interactions,
                resolved,
                &spec,
                coupling,
                config,
                2,
                swap,
                &mut |deep_score, deep_dist, first| {
                    if best.as_ref().is_none_or(|b| {
                        (deep_score, std::cmp::Reverse(deep_dist))
                            > (b.score, std::cmp::Reverse(b.dist))
                    }) {
                        best = Some(Best {
                            score: deep_score,
                            dist: deep_dist,
                            first_swap: first,
                        });
                    }
                },
            );
        }
    }

    best.map(|b| b.first_swap)
}

/// Recursive expansion of swap paths below the first level.
#[allow(clippy::too_many_arguments)]
fn explore(
    interactions: &[(NodeIndex, Vec<QubitId>)],
    resolved: &[Option<Vec<u32>>],
    layout: &Layout,
    coupling: &CouplingMap,
    config: &RoutingConfig,
    level: u32,
    first_swap: (u32, u32),
    report: &mut impl FnMut(i64, u64, (u32, u32)),
) {
    let mut candidates: Vec<((u32, u32), Layout, u64, usize)> =
        candidate_swaps(interactions, resolved, layout, coupling)
            .into_iter()
            .map(|swap| {
                let mut spec = layout.clone();
                spec.swap_by_physical(swap.0, swap.1);
                let dist = total_blocked_distance(interactions, resolved, &spec, coupling);
                let unblocked = count_resolvable(interactions, resolved, &spec, coupling);
                (swap, spec, dist, unblocked)
            })
            .collect();
    candidates.sort_by_key(|c| (c.2, std::cmp::Reverse(c.3)));

    for (_, spec, dist, unblocked) in candidates.into_iter().take(config.width as usize) {
        let score = unblocked as i64 - 3 * i64::from(level);
        report(score, dist, first_swap);
        if level < config.depth {
            explore(
                interactions,
                resolved,
                &spec,
                coupling,
                config,
                level + 1,
                first_swap,
                report,
            );
        }
    }
}

/// One swap stepping the front gate's farthest pair along a shortest
/// path. Returns `None` when no pair has excess distance or a pair is
/// unreachable.
fn front_path_swap(
    qubits: &[QubitId],
    layout: &Layout,
    coupling: &CouplingMap,
) -> Option<(u32, u32)> {
    let mut worst: Option<(u32, u32, u32)> = None;
    for (i, &a) in qubits.iter().enumerate() {
        for &b in &qubits[i + 1..] {
            let pa = layout.physical(a)?;
            let pb = layout.physical(b)?;
            let d = coupling.distance(pa, pb)?;
            if d >= 2 && worst.is_none_or(|w| d > w.2) {
                worst = Some((pa, pb, d));
            }
        }
    }
    let (pa, pb, d) = worst?;
    coupling
        .neighbors(pa)
        .filter(|&n| coupling.distance(n, pb).is_some_and(|nd| nd < d))
        .min()
        .map(|n| (pa, n))
}

/// The earliest unresolved gate position whose logical qubits are touched
/// by the swap; the emitted SWAP executes just before it is needed, not
/// before the whole remaining circuit.
fn locate_swap(
    interactions: &[(NodeIndex, Vec<QubitId>)],
    resolved: &[Option<Vec<u32>>],
    layout: &Layout,
    swap: (u32, u32),
    front: usize,
) -> usize {
    let touched: Vec<QubitId> = [swap.0, swap.1]
        .iter()
        .filter_map(|&p| layout.logical(p))
        .collect();

    interactions
        .iter()
        .enumerate()
        .position(|(i, (_, qubits))| {
            resolved[i].is_none() && qubits.iter().any(|q| touched.contains(q))
        })
        .unwrap_or(front)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alsvid_ir::NodeIndex;

    fn interactions(pairs: &[&[u32]]) -> Vec<(NodeIndex, Vec<QubitId>)> {
        pairs
            .iter()
            .enumerate()
            .map(|(i, qs)| {
                (
                    NodeIndex::new(i),
                    qs.iter().map(|&q| QubitId(q)).collect(),
                )
            })
            .collect()
    }

    fn assert_plan_valid(
        plan: &RoutingPlan,
        gates: &[(NodeIndex, Vec<QubitId>)],
        coupling: &CouplingMap,
    ) {
        // Replay: apply recorded swaps before each gate and confirm the
        // recorded physical qubits are adjacent and consistent.
        let mut layout = Layout::trivial(coupling.num_qubits());
        for (i, (_, qubits)) in gates.iter().enumerate() {
            if let Some(swaps) = plan.swaps.get(&i) {
                for &(p1, p2) in swaps {
                    assert!(coupling.is_connected(p1, p2), "swap on non-edge");
                    layout.swap_by_physical(p1, p2);
                }
            }
            let phys = &plan.gate_layout[i];
            for (j, &q) in qubits.iter().enumerate() {
                assert_eq!(layout.physical(q), Some(phys[j]), "gate {i} qubit {j}");
            }
            for a in 0..phys.len() {
                for b in (a + 1)..phys.len() {
                    assert!(
                        coupling.is_connected(phys[a], phys[b]),
                        "gate {i} pair not adjacent"
                    );
                }
            }
        }
    }

    #[test]
    fn test_already_routed_needs_no_swaps() {
        let coupling = CouplingMap::linear(3);
        let gates = interactions(&[&[0, 1], &[1, 2]]);
        let plan = generate_lookahead_routing(&gates, &coupling, &RoutingConfig::default())
            .unwrap();
        assert_eq!(plan.num_swaps(), 0);
        assert_plan_valid(&plan, &gates, &coupling);
    }

    #[test]
    fn test_single_swap_on_line() {
        let coupling = CouplingMap::linear(3);
        let gates = interactions(&[&[0, 2]]);
        let plan = generate_lookahead_routing(&gates, &coupling, &RoutingConfig::default())
            .unwrap();
        assert!(plan.num_swaps() >= 1);
        assert_plan_valid(&plan, &gates, &coupling);
    }

    #[test]
    fn test_swap_recorded_at_blocked_gate() {
        let coupling = CouplingMap::linear(4);
        // First gate is fine; only the second needs a swap, so the swap
        // must not be scheduled before position 1.
        let gates = interactions(&[&[0, 1], &[0, 3]]);
        let plan = generate_lookahead_routing(&gates, &coupling, &RoutingConfig::default())
            .unwrap();
        assert!(!plan.swaps.contains_key(&0));
        assert_plan_valid(&plan, &gates, &coupling);
    }

    #[test]
    fn test_three_qubit_gate_requires_all_pairs() {
        let coupling = CouplingMap::full(4);
        let gates = interactions(&[&[0, 1, 2]]);
        let plan = generate_lookahead_routing(&gates, &coupling, &RoutingConfig::default())
            .unwrap();
        assert_eq!(plan.num_swaps(), 0);
        assert_plan_valid(&plan, &gates, &coupling);
    }

    #[test]
    fn test_three_qubit_gate_on_line_routes() {
        // On a line, a CCX over 0,2,4 needs swaps until all three pairwise
        // edges hold; a line can host a triangle only... it cannot, so this
        // must error rather than loop forever.
        let coupling = CouplingMap::linear(5);
        let gates = interactions(&[&[0, 2, 4]]);
        let result = generate_lookahead_routing(&gates, &coupling, &RoutingConfig::default());
        assert!(matches!(result, Err(CompileError::Routing(_))));
    }

    #[test]
    fn test_disconnected_coupling_errors() {
        let coupling = CouplingMap::from_edges(4, &[(0, 1), (2, 3)]);
        let gates = interactions(&[&[0, 3]]);
        let result = generate_lookahead_routing(&gates, &coupling, &RoutingConfig::default());
        assert!(matches!(result, Err(CompileError::Routing(_))));
    }

    #[test]
    fn test_qubit_exceeding_device_errors() {
        let coupling = CouplingMap::linear(2);
        let gates = interactions(&[&[0, 5]]);
        let result = generate_lookahead_routing(&gates, &coupling, &RoutingConfig::default());
        assert!(matches!(result, Err(CompileError::CircuitTooLarge { .. })));
    }

    #[test]
    fn test_longer_program_on_line() {
        let coupling = CouplingMap::linear(5);
        let gates = interactions(&[&[0, 4], &[1, 3], &[0, 1], &[2, 4], &[3, 4]]);
        let plan = generate_lookahead_routing(&gates, &coupling, &RoutingConfig::default())
            .unwrap();
        assert_plan_valid(&plan, &gates, &coupling);
    }

    #[test]
    fn test_single_qubit_gates_never_block() {
        let coupling = CouplingMap::linear(3);
        let gates = interactions(&[&[0], &[2], &[0, 2], &[1]]);
        let plan = generate_lookahead_routing(&gates, &coupling, &RoutingConfig::default())
            .unwrap();
        assert_plan_valid(&plan, &gates, &coupling);
    }

    #[test]
    fn test_ring_topology() {
        let coupling = CouplingMap::ring(6);
        let gates = interactions(&[&[0, 3], &[1, 4], &[2, 5]]);
        let plan = generate_lookahead_routing(&gates, &coupling, &RoutingConfig::default())
            .unwrap();
        assert_plan_valid(&plan, &gates, &coupling);
    }
}
