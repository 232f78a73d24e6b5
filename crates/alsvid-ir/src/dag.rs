//! DAG-based intermediate representation.
//!
//! The IR is a directed acyclic graph over an index-stable arena
//! ([`StableDiGraph`]); node removal tombstones the slot instead of
//! reindexing, so the repeated substitute/remove cycles of the optimizer
//! never invalidate outstanding [`NodeIndex`] values.
//!
//! Edges carry wire continuity: an edge `u → v` with wire `w` means "the
//! last thing that touched `w` was `u`, and `v` touches it next". For any
//! qubit or classical wire the edges of that wire form a single simple path
//! from its init node to the current frontier (the `leaves` map). Classical
//! condition reads are carried on separate `Conbit` edges which fan out
//! from a classical wire's frontier without advancing it.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use num_complex::Complex64;
use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex as PetNodeIndex, StableDiGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};
use crate::gate::{Condition, StandardGate};
use crate::qubit::{ClbitId, QubitId};

/// Node index type for the IR graph.
pub type NodeIndex = PetNodeIndex<u32>;

/// Handle to a gate definition within a DAG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DefId(pub u32);

/// Kind of a register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegisterKind {
    /// A bank of qubits.
    Quantum,
    /// A bank of classical bits.
    Classical,
}

/// A wire identity: one qubit or one classical bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Wire {
    /// A quantum wire.
    Qubit(QubitId),
    /// A classical wire.
    Clbit(ClbitId),
}

/// What an edge carries.
///
/// `Qubit` and `Clbit` edges are wire continuity; `Conbit` edges are
/// classical-condition reads, distinct from the clbit edges used for
/// measurement writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WireKind {
    /// Continuity of a quantum wire.
    Qubit(QubitId),
    /// Continuity of a classical wire.
    Clbit(ClbitId),
    /// A classical-condition read of a classical wire.
    Conbit(ClbitId),
}

impl WireKind {
    /// The wire this edge continues, if it is a continuity edge.
    #[inline]
    pub fn continuity(&self) -> Option<Wire> {
        match self {
            WireKind::Qubit(q) => Some(Wire::Qubit(*q)),
            WireKind::Clbit(c) => Some(Wire::Clbit(*c)),
            WireKind::Conbit(_) => None,
        }
    }
}

/// An edge in the IR graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DagEdge {
    /// The wire this edge carries.
    pub wire: WireKind,
}

/// The operation performed by an op node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OpKind {
    /// A primitive (basis-set) gate application.
    Gate(StandardGate),
    /// Measurement write to classical bits.
    Measure,
    /// Reset qubit to |0⟩.
    Reset,
    /// Barrier (scheduling fence).
    Barrier,
}

impl OpKind {
    /// The gate, if this op applies one.
    pub fn gate(&self) -> Option<&StandardGate> {
        match self {
            OpKind::Gate(g) => Some(g),
            _ => None,
        }
    }
}

/// A primitive operation node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpNode {
    /// What the node does.
    pub kind: OpKind,
    /// Qubits the operation acts on.
    pub qubits: Vec<QubitId>,
    /// Classical bits written (measurement targets).
    pub clbits: Vec<ClbitId>,
    /// Optional classical condition.
    pub condition: Option<Condition>,
}

impl OpNode {
    /// Create a gate op.
    pub fn gate(gate: StandardGate, qubits: impl IntoIterator<Item = QubitId>) -> Self {
        Self {
            kind: OpKind::Gate(gate),
            qubits: qubits.into_iter().collect(),
            clbits: vec![],
            condition: None,
        }
    }

    /// Create a measurement op.
    pub fn measure(qubit: QubitId, clbit: ClbitId) -> Self {
        Self {
            kind: OpKind::Measure,
            qubits: vec![qubit],
            clbits: vec![clbit],
            condition: None,
        }
    }

    /// Create a reset op.
    pub fn reset(qubit: QubitId) -> Self {
        Self {
            kind: OpKind::Reset,
            qubits: vec![qubit],
            clbits: vec![],
            condition: None,
        }
    }

    /// Create a barrier op.
    pub fn barrier(qubits: impl IntoIterator<Item = QubitId>) -> Self {
        Self {
            kind: OpKind::Barrier,
            qubits: qubits.into_iter().collect(),
            clbits: vec![],
            condition: None,
        }
    }

    /// Attach a classical condition.
    #[must_use]
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// The gate name, or the op kind name.
    pub fn name(&self) -> &str {
        match &self.kind {
            OpKind::Gate(g) => g.name(),
            OpKind::Measure => "measure",
            OpKind::Reset => "reset",
            OpKind::Barrier => "barrier",
        }
    }
}

/// A reusable subroutine template: a custom gate's body, defined once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefinitionNode {
    /// Gate name this definition implements.
    pub name: String,
    /// Arity of the defined gate.
    pub num_qubits: u32,
    /// Dense matrix carried for backends that prefer it over the body.
    pub matrix: Option<Vec<Complex64>>,
}

/// One body step of a definition, bound to local qubit positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalleeNode {
    /// Owning definition.
    pub def: DefId,
    /// The primitive gate this step applies.
    pub gate: StandardGate,
    /// Positions into the caller's qubit list.
    pub positions: Vec<u32>,
}

/// A use site of a definition; qubits bind positionally to the body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallerNode {
    /// The referenced definition.
    pub def: DefId,
    /// Concrete qubits for this instantiation.
    pub qubits: Vec<QubitId>,
    /// Optional classical condition.
    pub condition: Option<Condition>,
}

/// An opaque dense-matrix operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitaryNode {
    /// Display name.
    pub name: String,
    /// Row-major matrix over the base (uncontrolled) qubits.
    pub matrix: Vec<Complex64>,
    /// Qubits: controls first, then base qubits.
    pub qubits: Vec<QubitId>,
    /// Number of leading control qubits.
    pub controls: u32,
    /// Whether the matrix is applied inverted (conjugate transpose).
    pub inverse: bool,
    /// Optional classical condition.
    pub condition: Option<Condition>,
}

/// A node in the IR graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DagNode {
    /// Declares a named bank of wires.
    Register {
        /// Register name.
        name: String,
        /// Quantum or classical.
        kind: RegisterKind,
        /// First wire index in the bank.
        start: u32,
        /// Number of wires.
        size: u32,
    },
    /// Start of one quantum wire.
    InitQubit(QubitId),
    /// Start of one classical wire.
    InitClbit(ClbitId),
    /// A primitive operation.
    Op(OpNode),
    /// A subroutine template.
    Definition(DefinitionNode),
    /// A subroutine body step.
    Callee(CalleeNode),
    /// A subroutine use site.
    Caller(CallerNode),
    /// An opaque dense-matrix operation.
    Unitary(UnitaryNode),
}

impl DagNode {
    /// Check if this node sits on the main circuit path.
    #[inline]
    pub fn is_operation(&self) -> bool {
        matches!(
            self,
            DagNode::Op(_) | DagNode::Caller(_) | DagNode::Unitary(_)
        )
    }

    /// The node's classical condition, if any.
    pub fn condition(&self) -> Option<&Condition> {
        match self {
            DagNode::Op(op) => op.condition.as_ref(),
            DagNode::Caller(c) => c.condition.as_ref(),
            DagNode::Unitary(u) => u.condition.as_ref(),
            _ => None,
        }
    }

    /// The qubits an operation node acts on.
    pub fn qubits(&self) -> &[QubitId] {
        match self {
            DagNode::Op(op) => &op.qubits,
            DagNode::Caller(c) => &c.qubits,
            DagNode::Unitary(u) => &u.qubits,
            _ => &[],
        }
    }

    /// The op payload, if this is an op node.
    pub fn op(&self) -> Option<&OpNode> {
        match self {
            DagNode::Op(op) => Some(op),
            _ => None,
        }
    }
}

/// Summary of a declared register.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterInfo {
    /// Register name.
    pub name: String,
    /// Quantum or classical.
    pub kind: RegisterKind,
    /// First wire index.
    pub start: u32,
    /// Number of wires.
    pub size: u32,
}

struct DefRecord {
    node: NodeIndex,
    callees: Vec<NodeIndex>,
}

/// The intermediate representation of a compiled circuit.
pub struct Dag {
    graph: StableDiGraph<DagNode, DagEdge, u32>,
    register_nodes: Vec<NodeIndex>,
    qubit_inits: FxHashMap<QubitId, NodeIndex>,
    clbit_inits: FxHashMap<ClbitId, NodeIndex>,
    /// Wire frontier: the latest node touching each wire.
    leaves: FxHashMap<Wire, NodeIndex>,
    defs: Vec<DefRecord>,
    def_names: FxHashMap<String, DefId>,
    /// Local wire frontiers inside definitions, keyed by (def, position).
    def_leaves: FxHashMap<(u32, u32), NodeIndex>,
    num_qubits: u32,
    num_clbits: u32,
}

impl Dag {
    /// Create a new empty IR graph.
    pub fn new() -> Self {
        Self {
            graph: StableDiGraph::default(),
            register_nodes: vec![],
            qubit_inits: FxHashMap::default(),
            clbit_inits: FxHashMap::default(),
            leaves: FxHashMap::default(),
            defs: vec![],
            def_names: FxHashMap::default(),
            def_leaves: FxHashMap::default(),
            num_qubits: 0,
            num_clbits: 0,
        }
    }

    // =========================================================================
    // Registers and wires
    // =========================================================================

    /// Declare a quantum register: one register node plus one init node per
    /// wire. Must be called before any operation references the new wires.
    pub fn add_qubit_register(&mut self, name: impl Into<String>, size: u32) -> Vec<QubitId> {
        let start = self.num_qubits;
        let reg = self.graph.add_node(DagNode::Register {
            name: name.into(),
            kind: RegisterKind::Quantum,
            start,
            size,
        });
        self.register_nodes.push(reg);

        let mut ids = Vec::with_capacity(size as usize);
        for i in 0..size {
            let id = QubitId(start + i);
            let init = self.graph.add_node(DagNode::InitQubit(id));
            self.graph.add_edge(
                reg,
                init,
                DagEdge {
                    wire: WireKind::Qubit(id),
                },
            );
            self.qubit_inits.insert(id, init);
            self.leaves.insert(Wire::Qubit(id), init);
            ids.push(id);
        }
        self.num_qubits += size;
        ids
    }

    /// Declare a classical register.
    pub fn add_clbit_register(&mut self, name: impl Into<String>, size: u32) -> Vec<ClbitId> {
        let start = self.num_clbits;
        let reg = self.graph.add_node(DagNode::Register {
            name: name.into(),
            kind: RegisterKind::Classical,
            start,
            size,
        });
        self.register_nodes.push(reg);

        let mut ids = Vec::with_capacity(size as usize);
        for i in 0..size {
            let id = ClbitId(start + i);
            let init = self.graph.add_node(DagNode::InitClbit(id));
            self.graph.add_edge(
                reg,
                init,
                DagEdge {
                    wire: WireKind::Clbit(id),
                },
            );
            self.clbit_inits.insert(id, init);
            self.leaves.insert(Wire::Clbit(id), init);
            ids.push(id);
        }
        self.num_clbits += size;
        ids
    }

    /// Get the number of qubits.
    #[inline]
    pub fn num_qubits(&self) -> usize {
        self.num_qubits as usize
    }

    /// Get the number of classical bits.
    #[inline]
    pub fn num_clbits(&self) -> usize {
        self.num_clbits as usize
    }

    /// Iterate over declared registers in declaration order.
    pub fn registers(&self) -> Vec<RegisterInfo> {
        self.register_nodes
            .iter()
            .filter_map(|&idx| match &self.graph[idx] {
                DagNode::Register {
                    name,
                    kind,
                    start,
                    size,
                } => Some(RegisterInfo {
                    name: name.clone(),
                    kind: *kind,
                    start: *start,
                    size: *size,
                }),
                _ => None,
            })
            .collect()
    }

    /// Iterate over qubit ids.
    pub fn qubits(&self) -> impl Iterator<Item = QubitId> + '_ {
        (0..self.num_qubits).map(QubitId)
    }

    /// Iterate over classical bit ids.
    pub fn clbits(&self) -> impl Iterator<Item = ClbitId> + '_ {
        (0..self.num_clbits).map(ClbitId)
    }

    // =========================================================================
    // Node insertion
    // =========================================================================

    fn validate_op(&self, op: &OpNode) -> IrResult<()> {
        if let OpKind::Gate(gate) = &op.kind {
            let expected = gate.num_qubits() as usize;
            if expected != op.qubits.len() {
                return Err(IrError::QubitCountMismatch {
                    gate: gate.name().to_string(),
                    expected: expected as u32,
                    got: op.qubits.len() as u32,
                });
            }
        }
        let mut seen = FxHashSet::default();
        for &qubit in &op.qubits {
            if !self.qubit_inits.contains_key(&qubit) {
                return Err(IrError::QubitNotFound {
                    qubit,
                    context: op.name().to_string(),
                });
            }
            if !seen.insert(qubit) {
                return Err(IrError::DuplicateQubit {
                    qubit,
                    context: op.name().to_string(),
                });
            }
        }
        for &clbit in &op.clbits {
            if !self.clbit_inits.contains_key(&clbit) {
                return Err(IrError::ClbitNotFound {
                    clbit,
                    context: op.name().to_string(),
                });
            }
        }
        if let Some(cond) = &op.condition {
            for &clbit in &cond.clbits {
                if !self.clbit_inits.contains_key(&clbit) {
                    return Err(IrError::ClbitNotFound {
                        clbit,
                        context: op.name().to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Connect a freshly inserted operation node to the wire frontiers.
    fn wire_in(
        &mut self,
        node: NodeIndex,
        qubits: &[QubitId],
        clbits: &[ClbitId],
        condition: Option<&Condition>,
    ) {
        for &q in qubits {
            let wire = Wire::Qubit(q);
            let prev = self.leaves[&wire];
            self.graph.add_edge(
                prev,
                node,
                DagEdge {
                    wire: WireKind::Qubit(q),
                },
            );
            self.leaves.insert(wire, node);
        }
        for &c in clbits {
            let wire = Wire::Clbit(c);
            let prev = self.leaves[&wire];
            self.graph.add_edge(
                prev,
                node,
                DagEdge {
                    wire: WireKind::Clbit(c),
                },
            );
            self.leaves.insert(wire, node);
        }
        if let Some(cond) = condition {
            // Condition reads fan out from the classical frontier; they do
            // not advance it.
            for &b in &cond.clbits {
                let src = self.leaves[&Wire::Clbit(b)];
                self.graph.add_edge(
                    src,
                    node,
                    DagEdge {
                        wire: WireKind::Conbit(b),
                    },
                );
            }
        }
    }

    /// Append a primitive operation node and advance the touched frontiers.
    pub fn add_op(&mut self, op: OpNode) -> IrResult<NodeIndex> {
        self.validate_op(&op)?;
        let qubits = op.qubits.clone();
        let clbits = op.clbits.clone();
        let condition = op.condition.clone();
        let node = self.graph.add_node(DagNode::Op(op));
        self.wire_in(node, &qubits, &clbits, condition.as_ref());
        Ok(node)
    }

    /// Append an opaque unitary node.
    pub fn add_unitary(&mut self, unitary: UnitaryNode) -> IrResult<NodeIndex> {
        let mut seen = FxHashSet::default();
        for &qubit in &unitary.qubits {
            if !self.qubit_inits.contains_key(&qubit) {
                return Err(IrError::QubitNotFound {
                    qubit,
                    context: unitary.name.clone(),
                });
            }
            if !seen.insert(qubit) {
                return Err(IrError::DuplicateQubit {
                    qubit,
                    context: unitary.name.clone(),
                });
            }
        }
        let qubits = unitary.qubits.clone();
        let condition = unitary.condition.clone();
        let node = self.graph.add_node(DagNode::Unitary(unitary));
        self.wire_in(node, &qubits, &[], condition.as_ref());
        Ok(node)
    }

    // =========================================================================
    // Definitions, callees, callers
    // =========================================================================

    /// Create a gate-definition template node.
    ///
    /// The definition's body is built with [`add_callee`](Self::add_callee);
    /// use sites are emitted with [`add_caller`](Self::add_caller).
    pub fn add_definition(
        &mut self,
        name: impl Into<String>,
        num_qubits: u32,
        matrix: Option<Vec<Complex64>>,
    ) -> DefId {
        let name = name.into();
        let node = self.graph.add_node(DagNode::Definition(DefinitionNode {
            name: name.clone(),
            num_qubits,
            matrix,
        }));
        let id = DefId(self.defs.len() as u32);
        self.defs.push(DefRecord {
            node,
            callees: vec![],
        });
        self.def_names.insert(name, id);
        id
    }

    /// Append one body step to a definition.
    ///
    /// Body steps are chained on a definition-local frontier so the body is
    /// stored once regardless of how many callers instantiate it.
    pub fn add_callee(
        &mut self,
        def: DefId,
        gate: StandardGate,
        positions: impl IntoIterator<Item = u32>,
    ) -> IrResult<NodeIndex> {
        let positions: Vec<u32> = positions.into_iter().collect();
        let record = self
            .defs
            .get(def.0 as usize)
            .ok_or_else(|| IrError::UnknownDefinition(format!("def #{}", def.0)))?;
        let def_node = record.node;

        let node = self.graph.add_node(DagNode::Callee(CalleeNode {
            def,
            gate,
            positions: positions.clone(),
        }));
        for &p in &positions {
            let prev = self
                .def_leaves
                .get(&(def.0, p))
                .copied()
                .unwrap_or(def_node);
            self.graph.add_edge(
                prev,
                node,
                DagEdge {
                    wire: WireKind::Qubit(QubitId(p)),
                },
            );
            self.def_leaves.insert((def.0, p), node);
        }
        self.defs[def.0 as usize].callees.push(node);
        Ok(node)
    }

    /// Append a use site of a definition, binding qubits positionally.
    pub fn add_caller(
        &mut self,
        def: DefId,
        qubits: impl IntoIterator<Item = QubitId>,
        condition: Option<Condition>,
    ) -> IrResult<NodeIndex> {
        let qubits: Vec<QubitId> = qubits.into_iter().collect();
        let record = self
            .defs
            .get(def.0 as usize)
            .ok_or_else(|| IrError::UnknownDefinition(format!("def #{}", def.0)))?;
        let DagNode::Definition(template) = &self.graph[record.node] else {
            return Err(IrError::InvalidDag("definition node missing".into()));
        };
        if template.num_qubits as usize != qubits.len() {
            return Err(IrError::QubitCountMismatch {
                gate: template.name.clone(),
                expected: template.num_qubits,
                got: qubits.len() as u32,
            });
        }
        for &qubit in &qubits {
            if !self.qubit_inits.contains_key(&qubit) {
                return Err(IrError::QubitNotFound {
                    qubit,
                    context: template.name.clone(),
                });
            }
        }

        let node = self.graph.add_node(DagNode::Caller(CallerNode {
            def,
            qubits: qubits.clone(),
            condition: condition.clone(),
        }));
        self.wire_in(node, &qubits, &[], condition.as_ref());
        Ok(node)
    }

    /// Look up a definition handle by gate name.
    pub fn find_definition(&self, name: &str) -> Option<DefId> {
        self.def_names.get(name).copied()
    }

    /// Number of gate definitions in the graph.
    pub fn num_definitions(&self) -> usize {
        self.defs.len()
    }

    /// The definition template for a handle.
    pub fn definition(&self, def: DefId) -> Option<&DefinitionNode> {
        let record = self.defs.get(def.0 as usize)?;
        match &self.graph[record.node] {
            DagNode::Definition(d) => Some(d),
            _ => None,
        }
    }

    /// The body steps of a definition, in body order.
    pub fn callees(&self, def: DefId) -> Vec<&CalleeNode> {
        let Some(record) = self.defs.get(def.0 as usize) else {
            return vec![];
        };
        record
            .callees
            .iter()
            .filter_map(|&idx| match &self.graph[idx] {
                DagNode::Callee(c) => Some(c),
                _ => None,
            })
            .collect()
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Get a node by index.
    #[inline]
    pub fn node(&self, idx: NodeIndex) -> Option<&DagNode> {
        self.graph.node_weight(idx)
    }

    /// Get a mutable node by index.
    #[inline]
    pub fn node_mut(&mut self, idx: NodeIndex) -> Option<&mut DagNode> {
        self.graph.node_weight_mut(idx)
    }

    /// Get an op payload by index.
    #[inline]
    pub fn op(&self, idx: NodeIndex) -> Option<&OpNode> {
        self.graph.node_weight(idx).and_then(DagNode::op)
    }

    /// Get a reference to the underlying graph.
    pub fn graph(&self) -> &StableDiGraph<DagNode, DagEdge, u32> {
        &self.graph
    }

    /// The current frontier node of a wire.
    pub fn frontier(&self, wire: Wire) -> Option<NodeIndex> {
        self.leaves.get(&wire).copied()
    }

    /// Classical bits written by a node, in ascending bit order.
    pub fn get_clbits(&self, node: NodeIndex) -> Vec<ClbitId> {
        let mut bits: Vec<ClbitId> = self
            .graph
            .edges_directed(node, Direction::Incoming)
            .filter_map(|e| match e.weight().wire {
                WireKind::Clbit(c) => Some(c),
                _ => None,
            })
            .collect();
        bits.sort_unstable();
        bits
    }

    /// Classical bits read by a node's condition, in ascending bit order.
    pub fn get_conbits(&self, node: NodeIndex) -> Vec<ClbitId> {
        let mut bits: Vec<ClbitId> = self
            .graph
            .edges_directed(node, Direction::Incoming)
            .filter_map(|e| match e.weight().wire {
                WireKind::Conbit(c) => Some(c),
                _ => None,
            })
            .collect();
        bits.sort_unstable();
        bits
    }

    /// Check whether all listed nodes share an identical condition triple
    /// (comparator, constant, condition bits), including "no condition".
    pub fn has_same_condition(&self, nodes: &[NodeIndex]) -> bool {
        self.shared_condition(nodes).is_some()
    }

    /// The condition shared by all listed nodes, if they agree.
    ///
    /// Returns `Some(None)` when every node is unconditioned, `Some(cond)`
    /// when every node carries the identical condition, and `None` when the
    /// nodes disagree.
    pub fn shared_condition(&self, nodes: &[NodeIndex]) -> Option<Option<Condition>> {
        let mut shared: Option<Option<Condition>> = None;
        for &idx in nodes {
            let cond = self.graph.node_weight(idx)?.condition().cloned();
            match &shared {
                None => shared = Some(cond),
                Some(existing) => {
                    if *existing != cond {
                        return None;
                    }
                }
            }
        }
        shared
    }

    /// Every node index in a deterministic topological order: Kahn's
    /// algorithm taking the smallest ready index first, so a freshly-built
    /// graph reads in insertion order and rewritten graphs stay
    /// reproducible across calls.
    fn topo_order(&self) -> Vec<NodeIndex> {
        let mut indegree: FxHashMap<NodeIndex, usize> = self
            .graph
            .node_indices()
            .map(|n| (n, self.graph.edges_directed(n, Direction::Incoming).count()))
            .collect();
        let mut ready: BinaryHeap<Reverse<NodeIndex>> = indegree
            .iter()
            .filter_map(|(&n, &d)| (d == 0).then_some(Reverse(n)))
            .collect();

        let mut order = Vec::with_capacity(self.graph.node_count());
        while let Some(Reverse(n)) = ready.pop() {
            order.push(n);
            // Parallel edges each count once, matching the indegree tally.
            for succ in self.graph.neighbors(n) {
                let d = indegree.get_mut(&succ).expect("successor is a known node");
                *d -= 1;
                if *d == 0 {
                    ready.push(Reverse(succ));
                }
            }
        }
        assert_eq!(
            order.len(),
            self.graph.node_count(),
            "IR must be acyclic — cycle detected in circuit graph"
        );
        order
    }

    /// Iterate over operation nodes (op, caller, unitary) in topological
    /// order.
    ///
    /// The order is deterministic; a graph that has not been rewritten
    /// reads back in insertion order.
    pub fn topological_ops(&self) -> Vec<(NodeIndex, &DagNode)> {
        self.topo_order()
            .into_iter()
            .filter_map(|idx| {
                let node = &self.graph[idx];
                node.is_operation().then_some((idx, node))
            })
            .collect()
    }

    /// Number of operation nodes on the main circuit path.
    pub fn num_ops(&self) -> usize {
        self.graph
            .node_indices()
            .filter(|&idx| self.graph[idx].is_operation())
            .count()
    }

    /// Calculate the circuit depth over operation nodes.
    pub fn depth(&self) -> usize {
        let mut depths: FxHashMap<NodeIndex, usize> =
            FxHashMap::with_capacity_and_hasher(self.graph.node_count(), Default::default());
        let mut max_depth = 0usize;

        for node in self.topo_order() {
            let max_pred = self
                .graph
                .edges_directed(node, Direction::Incoming)
                .map(|e| depths.get(&e.source()).copied().unwrap_or(0))
                .max()
                .unwrap_or(0);
            let d = if self.graph[node].is_operation() {
                max_pred + 1
            } else {
                max_pred
            };
            max_depth = max_depth.max(d);
            depths.insert(node, d);
        }
        max_depth
    }

    /// Collect the ordered gate/qubit interactions of the circuit for
    /// routing.
    ///
    /// Caller nodes are expanded depth-first into their definition's body
    /// steps with positions resolved to the caller's concrete qubits, so
    /// the router sees true pairwise interactions instead of opaque
    /// subroutine calls.
    pub fn collect_gate_qubits(&self) -> Vec<(NodeIndex, Vec<QubitId>)> {
        let mut out = vec![];
        for (idx, node) in self.topological_ops() {
            match node {
                DagNode::Op(op) => {
                    if matches!(op.kind, OpKind::Gate(_)) {
                        out.push((idx, op.qubits.clone()));
                    }
                }
                DagNode::Unitary(u) => {
                    out.push((idx, u.qubits.clone()));
                }
                DagNode::Caller(c) => {
                    for callee in self.callees(c.def) {
                        let qubits: Vec<QubitId> = callee
                            .positions
                            .iter()
                            .map(|&p| c.qubits[p as usize])
                            .collect();
                        out.push((idx, qubits));
                    }
                }
                _ => {}
            }
        }
        out
    }

    // =========================================================================
    // Rewriting
    // =========================================================================

    /// Replace a span of operation nodes with a new instruction list while
    /// preserving external wire connectivity.
    ///
    /// For every qubit/classical wire passing through the span, the external
    /// predecessor and successor are recorded; the replacement ops are
    /// inserted wire-correctly between them, and a condition shared by the
    /// whole span is re-attached (with its conbit wiring) to every new node.
    ///
    /// The old nodes are NOT deleted; callers must follow with
    /// [`remove_nodes`](Self::remove_nodes) (`keep_edge = false`). Until
    /// then the graph transiently carries both the old and the new path.
    pub fn substitute_nodes(
        &mut self,
        span: &[NodeIndex],
        replacement: Vec<OpNode>,
    ) -> IrResult<Vec<NodeIndex>> {
        let span_set: FxHashSet<NodeIndex> = span.iter().copied().collect();

        // External sources and targets per wire, plus condition-read sources.
        let mut in_source: FxHashMap<Wire, NodeIndex> = FxHashMap::default();
        let mut out_target: FxHashMap<Wire, NodeIndex> = FxHashMap::default();
        let mut con_source: FxHashMap<ClbitId, NodeIndex> = FxHashMap::default();

        for &idx in span {
            let node = self.graph.node_weight(idx).ok_or(IrError::InvalidNode)?;
            if !node.is_operation() {
                return Err(IrError::InvalidDag(
                    "substitute_nodes: span contains a non-operation node".into(),
                ));
            }
            for edge in self.graph.edges_directed(idx, Direction::Incoming) {
                let src = edge.source();
                if span_set.contains(&src) {
                    continue;
                }
                match edge.weight().wire {
                    WireKind::Conbit(b) => {
                        con_source.insert(b, src);
                    }
                    kind => {
                        let wire = kind.continuity().expect("qubit/clbit edge");
                        if in_source.insert(wire, src).is_some_and(|old| old != src) {
                            return Err(IrError::InvalidDag(format!(
                                "substitute_nodes: wire {wire:?} enters the span more than once"
                            )));
                        }
                    }
                }
            }
            for edge in self.graph.edges_directed(idx, Direction::Outgoing) {
                let tgt = edge.target();
                if span_set.contains(&tgt) {
                    continue;
                }
                if let Some(wire) = edge.weight().wire.continuity() {
                    if out_target.insert(wire, tgt).is_some_and(|old| old != tgt) {
                        return Err(IrError::InvalidDag(format!(
                            "substitute_nodes: wire {wire:?} leaves the span more than once"
                        )));
                    }
                }
            }
        }

        let shared = self.shared_condition(span).flatten();

        // Insert the replacement ops, chaining each wire from the previous
        // new node on that wire, or from the recorded external source.
        let mut last_new: FxHashMap<Wire, NodeIndex> = FxHashMap::default();
        let mut new_nodes = Vec::with_capacity(replacement.len());

        for mut op in replacement {
            if shared.is_some() {
                op.condition = shared.clone();
            }
            let qubits = op.qubits.clone();
            let clbits = op.clbits.clone();
            let condition = op.condition.clone();
            let node = self.graph.add_node(DagNode::Op(op));

            for &q in &qubits {
                let wire = Wire::Qubit(q);
                let prev = last_new
                    .get(&wire)
                    .or_else(|| in_source.get(&wire))
                    .copied()
                    .ok_or_else(|| IrError::QubitNotFound {
                        qubit: q,
                        context: "substitution".into(),
                    })?;
                self.graph.add_edge(
                    prev,
                    node,
                    DagEdge {
                        wire: WireKind::Qubit(q),
                    },
                );
                last_new.insert(wire, node);
            }
            for &c in &clbits {
                let wire = Wire::Clbit(c);
                let prev = last_new
                    .get(&wire)
                    .or_else(|| in_source.get(&wire))
                    .copied()
                    .ok_or_else(|| IrError::ClbitNotFound {
                        clbit: c,
                        context: "substitution".into(),
                    })?;
                self.graph.add_edge(
                    prev,
                    node,
                    DagEdge {
                        wire: WireKind::Clbit(c),
                    },
                );
                last_new.insert(wire, node);
            }
            if let Some(cond) = &condition {
                for &b in &cond.clbits {
                    let src = con_source
                        .get(&b)
                        .copied()
                        .or_else(|| self.leaves.get(&Wire::Clbit(b)).copied())
                        .ok_or_else(|| IrError::ClbitNotFound {
                            clbit: b,
                            context: "substitution".into(),
                        })?;
                    self.graph.add_edge(
                        src,
                        node,
                        DagEdge {
                            wire: WireKind::Conbit(b),
                        },
                    );
                }
            }
            new_nodes.push(node);
        }

        // Reconnect each wire's tail to the recorded external target, or
        // advance the frontier when the span ended the wire.
        for (&wire, &src) in &in_source {
            let tail = last_new.get(&wire).copied().unwrap_or(src);
            match out_target.get(&wire) {
                Some(&tgt) => {
                    let kind = match wire {
                        Wire::Qubit(q) => WireKind::Qubit(q),
                        Wire::Clbit(c) => WireKind::Clbit(c),
                    };
                    self.graph.add_edge(tail, tgt, DagEdge { wire: kind });
                }
                None => {
                    self.leaves.insert(wire, tail);
                }
            }
        }

        Ok(new_nodes)
    }

    /// Delete a list of operation nodes.
    ///
    /// With `keep_edge = true` each wire's surviving predecessor is bridged
    /// directly to its surviving successor first (used when the removed
    /// nodes are logical no-ops, e.g. cancelled gate pairs). With
    /// `keep_edge = false` nodes and their edges are dropped as-is (used
    /// after [`substitute_nodes`](Self::substitute_nodes) has already
    /// rewired the new span). Sequencing is the caller's responsibility:
    /// removing nodes that still carry unresolved external wiring corrupts
    /// the graph.
    pub fn remove_nodes(&mut self, nodes: &[NodeIndex], keep_edge: bool) -> IrResult<()> {
        for &idx in nodes {
            let node = self.graph.node_weight(idx).ok_or(IrError::InvalidNode)?;
            if !node.is_operation() {
                return Err(IrError::InvalidDag(
                    "remove_nodes: cannot remove a non-operation node".into(),
                ));
            }

            let incoming: Vec<(NodeIndex, WireKind)> = self
                .graph
                .edges_directed(idx, Direction::Incoming)
                .map(|e| (e.source(), e.weight().wire))
                .collect();
            let outgoing: Vec<(NodeIndex, WireKind)> = self
                .graph
                .edges_directed(idx, Direction::Outgoing)
                .map(|e| (e.target(), e.weight().wire))
                .collect();

            if keep_edge {
                for &(pred, wire) in &incoming {
                    if matches!(wire, WireKind::Conbit(_)) {
                        continue;
                    }
                    for &(succ, succ_wire) in &outgoing {
                        if wire == succ_wire {
                            self.graph.add_edge(pred, succ, DagEdge { wire });
                        }
                    }
                    // Outgoing condition reads sourced at this node move to
                    // the predecessor on the same classical wire.
                    if let WireKind::Clbit(c) = wire {
                        for &(reader, read_wire) in &outgoing {
                            if read_wire == WireKind::Conbit(c) {
                                self.graph.add_edge(pred, reader, DagEdge { wire: read_wire });
                            }
                        }
                    }
                }
            }

            // Frontier repair: wires ending at this node fall back to the
            // predecessor on that wire.
            for &(pred, wire) in &incoming {
                if let Some(w) = wire.continuity() {
                    if self.leaves.get(&w) == Some(&idx) {
                        self.leaves.insert(w, pred);
                    }
                }
            }

            self.graph.remove_node(idx);
        }
        Ok(())
    }

    // =========================================================================
    // Integrity
    // =========================================================================

    /// Verify the structural integrity of the IR.
    ///
    /// Checks that the graph is acyclic, that no node branches a wire
    /// (in/out degree ≤ 1 per qubit/clbit wire per node), and that every
    /// wire's continuity edges form a single path from its init node to the
    /// frontier recorded in the leaves map.
    pub fn verify_integrity(&self) -> IrResult<()> {
        if petgraph::algo::is_cyclic_directed(&self.graph) {
            return Err(IrError::InvalidDag("graph contains a cycle".into()));
        }

        // No wire may branch or merge at any node.
        let mut out_seen: FxHashSet<(NodeIndex, Wire)> = FxHashSet::default();
        let mut in_seen: FxHashSet<(NodeIndex, Wire)> = FxHashSet::default();
        for edge in self.graph.edge_references() {
            let Some(wire) = edge.weight().wire.continuity() else {
                continue;
            };
            // Register→init edges share the wire key with the init chain but
            // are declaration edges, not continuity.
            if matches!(self.graph[edge.source()], DagNode::Register { .. }) {
                continue;
            }
            // Definition-local chains reuse position indices as wire keys;
            // they are checked per definition, not against the main path.
            if matches!(
                self.graph[edge.source()],
                DagNode::Definition(_) | DagNode::Callee(_)
            ) {
                continue;
            }
            if !out_seen.insert((edge.source(), wire)) {
                return Err(IrError::InvalidDag(format!(
                    "wire {wire:?} branches at node {:?}",
                    edge.source()
                )));
            }
            if !in_seen.insert((edge.target(), wire)) {
                return Err(IrError::InvalidDag(format!(
                    "wire {wire:?} merges at node {:?}",
                    edge.target()
                )));
            }
        }

        // Every wire walks from its init node to the recorded frontier.
        for (&qubit, &init) in &self.qubit_inits {
            self.walk_wire(Wire::Qubit(qubit), init)?;
        }
        for (&clbit, &init) in &self.clbit_inits {
            self.walk_wire(Wire::Clbit(clbit), init)?;
        }

        Ok(())
    }

    fn walk_wire(&self, wire: Wire, init: NodeIndex) -> IrResult<()> {
        let frontier = self.leaves.get(&wire).copied().ok_or_else(|| {
            IrError::InvalidDag(format!("wire {wire:?} has no frontier entry"))
        })?;

        let mut current = init;
        let mut steps = 0usize;
        let max_steps = self.graph.node_count() + 1;

        loop {
            let next = self
                .graph
                .edges_directed(current, Direction::Outgoing)
                .find(|e| e.weight().wire.continuity() == Some(wire))
                .map(|e| e.target());

            match next {
                Some(n) => current = n,
                None => break,
            }

            steps += 1;
            if steps > max_steps {
                return Err(IrError::InvalidDag(format!(
                    "wire {wire:?} has too many steps (possible loop)"
                )));
            }
        }

        if current != frontier {
            return Err(IrError::InvalidDag(format!(
                "wire {wire:?} ends at {current:?} but frontier map records {frontier:?}"
            )));
        }
        Ok(())
    }
}

impl Default for Dag {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Dag {
    fn clone(&self) -> Self {
        Self {
            graph: self.graph.clone(),
            register_nodes: self.register_nodes.clone(),
            qubit_inits: self.qubit_inits.clone(),
            clbit_inits: self.clbit_inits.clone(),
            leaves: self.leaves.clone(),
            defs: self
                .defs
                .iter()
                .map(|d| DefRecord {
                    node: d.node,
                    callees: d.callees.clone(),
                })
                .collect(),
            def_names: self.def_names.clone(),
            def_leaves: self.def_leaves.clone(),
            num_qubits: self.num_qubits,
            num_clbits: self.num_clbits,
        }
    }
}

impl std::fmt::Debug for Dag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dag")
            .field("num_qubits", &self.num_qubits)
            .field("num_clbits", &self.num_clbits)
            .field("num_ops", &self.num_ops())
            .field("definitions", &self.defs.len())
            .finish()
    }
}
