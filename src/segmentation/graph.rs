//! s-t flow network with a Dinic max-flow solver
//!
//! Arcs live in a forward-star layout: arc `a` and its residual twin `a ^ 1`
//! are always allocated together, and `first`/`next` thread the outgoing
//! arcs of each node. Path search is iterative so long augmenting paths on
//! large grids cannot exhaust the stack.

use std::collections::VecDeque;

const NONE: u32 = u32::MAX;
const UNREACHED: u32 = u32::MAX;

/// Residual capacities at or below this are treated as saturated
const CAPACITY_EPSILON: f64 = 1e-9;

pub(crate) struct FlowGraph {
    first: Vec<u32>,
    next: Vec<u32>,
    head: Vec<u32>,
    capacity: Vec<f64>,
    source: usize,
    sink: usize,
    /// Flow that terminal weight pairs route straight through a node
    terminal_flow: f64,
}

impl FlowGraph {
    /// A graph over `nodes` inner nodes plus the two terminals
    pub(crate) fn new(nodes: usize, arc_hint: usize) -> Self {
        Self {
            first: vec![NONE; nodes + 2],
            next: Vec::with_capacity(arc_hint),
            head: Vec::with_capacity(arc_hint),
            capacity: Vec::with_capacity(arc_hint),
            source: nodes,
            sink: nodes + 1,
            terminal_flow: 0.0,
        }
    }

    fn push_arc(&mut self, from: usize, to: usize, capacity: f64) {
        let index = self.head.len() as u32;
        self.head.push(to as u32);
        self.capacity.push(capacity);
        self.next.push(self.first[from]);
        self.first[from] = index;
    }

    /// Undirected-style pair: `capacity` from `i` to `j`, `reverse` back
    pub(crate) fn add_edge(&mut self, i: usize, j: usize, capacity: f64, reverse: f64) {
        self.push_arc(i, j, capacity);
        self.push_arc(j, i, reverse);
    }

    /// Attach `node` to both terminals
    ///
    /// Only the difference of the two weights becomes an arc; the common
    /// part is flow that any cut pays anyway. Negative weights are fine.
    pub(crate) fn add_terminal_weights(
        &mut self,
        node: usize,
        source_weight: f64,
        sink_weight: f64,
    ) {
        let delta = source_weight - sink_weight;
        if delta > 0.0 {
            self.add_edge(self.source, node, delta, 0.0);
        } else if delta < 0.0 {
            self.add_edge(node, self.sink, -delta, 0.0);
        }
        self.terminal_flow += source_weight.min(sink_weight);
    }

    /// Push the maximum flow from source to sink, returning its value
    pub(crate) fn max_flow(&mut self) -> f64 {
        let nodes = self.first.len();
        let mut level = vec![UNREACHED; nodes];
        let mut cursor = vec![NONE; nodes];
        let mut queue = VecDeque::with_capacity(nodes);
        let mut path = Vec::new();
        let mut flow = self.terminal_flow;

        while self.build_levels(&mut level, &mut queue) {
            cursor.copy_from_slice(&self.first);
            loop {
                let pushed = self.augment(&mut level, &mut cursor, &mut path);
                if pushed <= 0.0 {
                    break;
                }
                flow += pushed;
            }
        }

        flow
    }

    /// Breadth-first levels over unsaturated arcs; true if the sink is reachable
    fn build_levels(&self, level: &mut [u32], queue: &mut VecDeque<usize>) -> bool {
        level.fill(UNREACHED);
        queue.clear();
        level[self.source] = 0;
        queue.push_back(self.source);

        while let Some(v) = queue.pop_front() {
            let mut arc = self.first[v];
            while arc != NONE {
                let a = arc as usize;
                let w = self.head[a] as usize;
                if self.capacity[a] > CAPACITY_EPSILON && level[w] == UNREACHED {
                    level[w] = level[v] + 1;
                    queue.push_back(w);
                }
                arc = self.next[a];
            }
        }

        level[self.sink] != UNREACHED
    }

    /// Find one source-to-sink path in the level graph and saturate it
    ///
    /// Returns the pushed amount, or zero once the level graph is blocked.
    fn augment(&mut self, level: &mut [u32], cursor: &mut [u32], path: &mut Vec<usize>) -> f64 {
        path.clear();
        let mut v = self.source;

        loop {
            if v == self.sink {
                let bottleneck = path
                    .iter()
                    .map(|&a| self.capacity[a])
                    .fold(f64::INFINITY, f64::min);
                for &a in path.iter() {
                    self.capacity[a] -= bottleneck;
                    self.capacity[a ^ 1] += bottleneck;
                }
                return bottleneck;
            }

            let mut advanced = false;
            while cursor[v] != NONE {
                let a = cursor[v] as usize;
                let w = self.head[a] as usize;
                if self.capacity[a] > CAPACITY_EPSILON
                    && level[w] != UNREACHED
                    && level[w] == level[v] + 1
                {
                    path.push(a);
                    v = w;
                    advanced = true;
                    break;
                }
                cursor[v] = self.next[a];
            }

            if !advanced {
                // Dead end: drop v from this phase and step back
                level[v] = UNREACHED;
                match path.pop() {
                    None => return 0.0,
                    Some(a) => {
                        v = self.head[a ^ 1] as usize;
                        cursor[v] = self.next[a];
                    },
                }
            }
        }
    }

    /// Inner nodes still reachable from the source in the residual graph
    ///
    /// Only meaningful after [`FlowGraph::max_flow`].
    pub(crate) fn source_side(&self) -> Vec<bool> {
        let mut reached = vec![false; self.first.len()];
        let mut stack = vec![self.source];
        reached[self.source] = true;

        while let Some(v) = stack.pop() {
            let mut arc = self.first[v];
            while arc != NONE {
                let a = arc as usize;
                let w = self.head[a] as usize;
                if self.capacity[a] > CAPACITY_EPSILON && !reached[w] {
                    reached[w] = true;
                    stack.push(w);
                }
                arc = self.next[a];
            }
        }

        reached.truncate(self.source);
        reached
    }
}
