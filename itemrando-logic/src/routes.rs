use std::collections::{BTreeMap, BTreeSet};

use anyhow::{bail, Result};
use itemrando_game::{Edge, NodeId};
use log::debug;

/// One minimal alternative for unlocking `target`: all of `deps` held together.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
    pub target: NodeId,
    // Sorted and free of duplicates.
    pub deps: Vec<NodeId>,
}

pub fn route_label(deps: &[NodeId]) -> String {
    deps.iter()
        .map(|d| d.to_string())
        .collect::<Vec<String>>()
        .join(" ")
}

impl Route {
    fn new(target: NodeId, deps: BTreeSet<NodeId>) -> Self {
        Route {
            target,
            deps: deps.into_iter().collect(),
        }
    }

    pub fn label(&self) -> String {
        route_label(&self.deps)
    }

    pub fn to_edge(&self) -> Edge {
        Edge::new(self.target, self.deps.clone())
    }

    fn is_subset_of(&self, other: &Route) -> bool {
        // Both dependency lists are sorted, so `binary_search` is valid.
        self.deps.iter().all(|d| other.deps.binary_search(d).is_ok())
    }
}

/// Per-target store of minimal alternative AND-clauses (a DNF per target).
///
/// For every target the stored routes form an antichain under set inclusion. Once a node
/// is finalized its own routes are frozen, and no route anywhere in the store refers to
/// it directly: its alternatives are substituted in its place. A finalized node with no
/// routes is unreachable, so always-available facts need an explicit zero-dependency
/// route before they are finalized.
#[derive(Clone, Debug)]
pub struct RouteStore {
    size: usize,
    routes: Vec<BTreeMap<String, Route>>,
    finalized: Vec<bool>,
    finalizing: Option<NodeId>,
}

impl RouteStore {
    pub fn new(size: usize) -> Self {
        RouteStore {
            size,
            routes: vec![BTreeMap::new(); size],
            finalized: vec![false; size],
            finalizing: None,
        }
    }

    pub fn from_edges(size: usize, edges: &[Edge]) -> Result<Self> {
        let mut store = RouteStore::new(size);
        for edge in edges {
            store.add_route(edge)?;
        }
        Ok(store)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_finalized(&self, node: NodeId) -> bool {
        self.finalized.get(node.0).copied().unwrap_or(false)
    }

    /// Routes stored for `target`, ordered by label.
    pub fn routes(&self, target: NodeId) -> impl Iterator<Item = &Route> {
        self.routes[target.0].values()
    }

    pub fn labels(&self, target: NodeId) -> Vec<&str> {
        self.routes[target.0].keys().map(|l| l.as_str()).collect()
    }

    pub fn route_count(&self) -> usize {
        self.routes.iter().map(|r| r.len()).sum()
    }

    /// Every stored route as a requirement edge, suitable for traversal.
    pub fn edges(&self) -> Vec<Edge> {
        self.routes
            .iter()
            .flat_map(|r| r.values().map(|route| route.to_edge()))
            .collect()
    }

    fn check_id(&self, node: NodeId) -> Result<()> {
        if node.0 >= self.size {
            bail!("node {node} is outside the route store (size {})", self.size);
        }
        Ok(())
    }

    /// Adds an alternative for `edge.target`, returning the routes that were newly stored.
    pub fn add_route(&mut self, edge: &Edge) -> Result<Vec<Route>> {
        self.check_id(edge.target)?;
        for &dep in &edge.deps {
            self.check_id(dep)?;
        }
        if self.finalized[edge.target.0] {
            bail!(
                "cannot add a route for a finalized node ({})",
                edge.target
            );
        }
        let deps: BTreeSet<NodeId> = edge.deps.iter().copied().collect();
        Ok(self.install(edge.target, deps))
    }

    fn install(&mut self, target: NodeId, mut deps: BTreeSet<NodeId>) -> Vec<Route> {
        loop {
            if deps.contains(&target) {
                return vec![];
            }
            let Some(&dep) = deps.iter().find(|d| self.finalized[d.0]) else {
                break;
            };
            let alternatives: Vec<Vec<NodeId>> = self.routes[dep.0]
                .values()
                .map(|r| r.deps.clone())
                .collect();
            match alternatives.len() {
                0 => return vec![],
                1 => {
                    deps.remove(&dep);
                    deps.extend(&alternatives[0]);
                }
                _ => {
                    // Each alternative of `dep` becomes its own OR-branch of the target.
                    let mut added = vec![];
                    for alternative in alternatives {
                        let mut branch = deps.clone();
                        branch.remove(&dep);
                        branch.extend(alternative);
                        added.extend(self.install(target, branch));
                    }
                    let stored = &self.routes[target.0];
                    added.retain(|r| stored.contains_key(&r.label()));
                    return added;
                }
            }
        }

        let route = Route::new(target, deps);
        let label = route.label();
        let stored = &mut self.routes[target.0];
        if stored.contains_key(&label) {
            return vec![];
        }
        if stored.values().any(|r| r.is_subset_of(&route)) {
            return vec![];
        }
        stored.retain(|_, r| !route.is_subset_of(r));
        stored.insert(label, route.clone());
        vec![route]
    }

    /// Freezes the routes of `node` and substitutes them into every route referring to it.
    pub fn finalize(&mut self, node: NodeId) -> Result<()> {
        self.check_id(node)?;
        if self.finalized[node.0] {
            return Ok(());
        }
        if let Some(active) = self.finalizing {
            bail!("cannot finalize node {node} while node {active} is being finalized");
        }
        self.finalizing = Some(node);
        self.finalized[node.0] = true;

        let mut num_rewritten = 0;
        for t in 0..self.size {
            let stale: Vec<String> = self.routes[t]
                .iter()
                .filter(|(_, r)| r.deps.contains(&node))
                .map(|(label, _)| label.clone())
                .collect();
            if stale.is_empty() {
                continue;
            }
            let was_finalized = self.finalized[t];
            self.finalized[t] = false;
            for label in stale {
                // An earlier rewrite of this target may already have superseded the route.
                let Some(route) = self.routes[t].remove(&label) else {
                    continue;
                };
                self.install(NodeId(t), route.deps.into_iter().collect());
                num_rewritten += 1;
            }
            self.finalized[t] = was_finalized;
        }
        self.finalizing = None;
        debug!(
            "finalize {node}: {} alternatives, {num_rewritten} routes rewritten",
            self.routes[node.0].len()
        );
        Ok(())
    }

    pub fn finalize_all(&mut self, nodes: impl IntoIterator<Item = NodeId>) -> Result<()> {
        for node in nodes {
            self.finalize(node)?;
        }
        Ok(())
    }
}
