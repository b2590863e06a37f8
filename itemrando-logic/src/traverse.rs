use std::collections::VecDeque;

use hashbrown::HashMap;
use itemrando_game::{Edge, EdgeOptions, LogicGraph, NodeId};
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default)]
pub struct TraverseOptions {
    /// Goal nodes which must all be reached for a win. `None` means every node.
    pub wanted: Option<Vec<NodeId>>,
    /// Process the work queue last-in-first-out instead of first-in-first-out.
    pub dfs: bool,
    /// Facts treated as held from the start, in addition to zero-dependency edges.
    pub assumed: Vec<NodeId>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathEntry {
    pub node: String,
    pub requires: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct TraverseResult {
    pub win: bool,
    /// Reachable nodes, each with the edge that first proved it reachable.
    pub seen: HashMap<NodeId, Edge>,
    /// Reachable nodes in discovery order.
    pub order: Vec<NodeId>,
}

impl TraverseResult {
    pub fn is_seen(&self, node: NodeId) -> bool {
        self.seen.contains_key(&node)
    }

    pub fn num_seen(&self) -> usize {
        self.order.len()
    }

    /// Human-readable discovery path, for spoiler logs and debugging.
    pub fn path(&self, graph: &LogicGraph) -> Vec<PathEntry> {
        self.order
            .iter()
            .map(|node| PathEntry {
                node: graph.name(*node).to_string(),
                requires: graph.names(&self.seen[node].deps),
            })
            .collect()
    }
}

/// Worklist fixpoint over AND-edges. Origins can be added before traversing, and
/// `traverse` may be called repeatedly with further edges; reachability only grows.
pub struct Traverser {
    num_nodes: usize,
    dfs: bool,
    seen: HashMap<NodeId, Edge>,
    order: Vec<NodeId>,
}

impl Traverser {
    pub fn new(num_nodes: usize, dfs: bool) -> Self {
        Traverser {
            num_nodes,
            dfs,
            seen: HashMap::new(),
            order: vec![],
        }
    }

    fn mark(&mut self, edge: &Edge) -> bool {
        if self.seen.contains_key(&edge.target) {
            return false;
        }
        self.seen.insert(edge.target, edge.clone());
        self.order.push(edge.target);
        true
    }

    pub fn add_origin(&mut self, node: NodeId) {
        self.mark(&Edge::always(node));
    }

    pub fn is_seen(&self, node: NodeId) -> bool {
        self.seen.contains_key(&node)
    }

    pub fn traverse(&mut self, edges: &[Edge]) {
        // For each node, the edges which it can help satisfy:
        let mut edges_by_dep: HashMap<NodeId, Vec<usize>> = HashMap::new();
        let mut queue: VecDeque<NodeId> = self.order.iter().copied().collect();
        for (i, edge) in edges.iter().enumerate() {
            if edge.is_trivial() {
                if self.mark(edge) {
                    queue.push_back(edge.target);
                }
            } else {
                for &dep in &edge.deps {
                    edges_by_dep.entry(dep).or_default().push(i);
                }
            }
        }

        loop {
            let next = if self.dfs {
                queue.pop_back()
            } else {
                queue.pop_front()
            };
            let Some(node) = next else {
                break;
            };
            let Some(edge_idxs) = edges_by_dep.get(&node) else {
                continue;
            };
            for &i in edge_idxs {
                let edge = &edges[i];
                if self.seen.contains_key(&edge.target) {
                    continue;
                }
                if edge.deps.iter().all(|d| self.seen.contains_key(d)) {
                    self.mark(edge);
                    queue.push_back(edge.target);
                }
            }
        }
        debug!(
            "traverse: {} edges, {} of {} nodes reachable",
            edges.len(),
            self.order.len(),
            self.num_nodes
        );
    }

    pub fn finish(self, wanted: Option<&[NodeId]>) -> TraverseResult {
        let win = match wanted {
            Some(wanted) => wanted.iter().all(|n| self.seen.contains_key(n)),
            None => (0..self.num_nodes).all(|i| self.seen.contains_key(&NodeId(i))),
        };
        TraverseResult {
            win,
            seen: self.seen,
            order: self.order,
        }
    }
}

pub fn traverse(num_nodes: usize, edges: &[Edge], options: &TraverseOptions) -> TraverseResult {
    let mut traverser = Traverser::new(num_nodes, options.dfs);
    for &node in &options.assumed {
        traverser.add_origin(node);
    }
    traverser.traverse(edges);
    traverser.finish(options.wanted.as_deref())
}

pub fn traverse_graph(
    graph: &LogicGraph,
    edge_options: &EdgeOptions,
    options: &TraverseOptions,
) -> TraverseResult {
    let edges = graph.edges(edge_options);
    traverse(graph.len(), &edges, options)
}
