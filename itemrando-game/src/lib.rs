pub mod world;

use std::fmt;
use std::hash::Hash;

use anyhow::{bail, Result};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use strum_macros::IntoStaticStr;

pub use world::{World, WorldData};

/// Identity of a node within its owning `LogicGraph`, assigned in creation order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl From<usize> for NodeId {
    fn from(idx: usize) -> Self {
        NodeId(idx)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Alternatives (OR) of dependency lists (AND).
pub type Requirements = Vec<Vec<NodeId>>;

/// A requirement tuple: `target` becomes reachable once every id in `deps` is reachable.
/// Several edges sharing a target are alternative routes to it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Edge {
    pub target: NodeId,
    pub deps: Vec<NodeId>,
}

impl Edge {
    pub fn new(target: NodeId, deps: Vec<NodeId>) -> Self {
        Edge { target, deps }
    }

    /// Edge with no requirements: the target is always available.
    pub fn always(target: NodeId) -> Self {
        Edge {
            target,
            deps: vec![],
        }
    }

    /// Builds an edge from the flat `[target, dep1, ..., depN]` form. Returns `None` for an
    /// empty tuple.
    pub fn from_tuple(tuple: &[NodeId]) -> Option<Self> {
        let (&target, deps) = tuple.split_first()?;
        Some(Edge {
            target,
            deps: deps.to_vec(),
        })
    }

    pub fn to_tuple(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.deps.len() + 1);
        out.push(self.target);
        out.extend(&self.deps);
        out
    }

    pub fn is_trivial(&self) -> bool {
        self.deps.is_empty()
    }
}

#[derive(Default, Clone, Debug)]
pub struct IndexedVec<T: Hash + Eq> {
    pub keys: Vec<T>,
    pub index_by_key: HashMap<T, usize>,
}

impl<T: Hash + Eq> IndexedVec<T> {
    pub fn add<U: ToOwned<Owned = T> + ?Sized>(&mut self, name: &U) -> usize {
        if !self.index_by_key.contains_key(&name.to_owned()) {
            let idx = self.keys.len();
            self.index_by_key.insert(name.to_owned(), self.keys.len());
            self.keys.push(name.to_owned());
            idx
        } else {
            self.index_by_key[&name.to_owned()]
        }
    }
}

#[derive(Clone, Debug, IntoStaticStr)]
pub enum NodeKind {
    Start,
    Item,
    Area(Requirements),
    Slot(Requirements),
    Event(Requirements),
}

impl NodeKind {
    pub fn requirements(&self) -> Option<&Requirements> {
        match self {
            NodeKind::Area(reqs) | NodeKind::Slot(reqs) | NodeKind::Event(reqs) => Some(reqs),
            NodeKind::Start | NodeKind::Item => None,
        }
    }

    fn requirements_mut(&mut self) -> Option<&mut Requirements> {
        match self {
            NodeKind::Area(reqs) | NodeKind::Slot(reqs) | NodeKind::Event(reqs) => Some(reqs),
            NodeKind::Start | NodeKind::Item => None,
        }
    }
}

/// Inputs that influence edge production but are not part of the fixed world logic.
#[derive(Default, Clone, Copy)]
pub struct EdgeOptions<'a> {
    pub starting_items: &'a [NodeId],
    pub placement: Option<&'a Placement>,
}

#[derive(Clone, Debug)]
pub struct Node {
    pub uid: NodeId,
    pub name: String,
    pub kind: NodeKind,
}

impl Node {
    pub fn kind_name(&self) -> &'static str {
        (&self.kind).into()
    }

    pub fn edges(&self, options: &EdgeOptions) -> Vec<Edge> {
        match &self.kind {
            NodeKind::Start => vec![Edge::always(self.uid)],
            NodeKind::Item => {
                let mut out = vec![];
                if options.starting_items.contains(&self.uid) {
                    out.push(Edge::always(self.uid));
                }
                if let Some(placement) = options.placement {
                    for &slot in placement.slots_for(self.uid) {
                        out.push(Edge::new(self.uid, vec![slot]));
                    }
                }
                out
            }
            NodeKind::Area(reqs) | NodeKind::Slot(reqs) | NodeKind::Event(reqs) => reqs
                .iter()
                .map(|deps| Edge::new(self.uid, deps.clone()))
                .collect(),
        }
    }
}

/// Assignment of items to slots.
#[derive(Default, Clone, Debug)]
pub struct Placement {
    item_by_slot: HashMap<NodeId, NodeId>,
    slots_by_item: HashMap<NodeId, Vec<NodeId>>,
}

impl Placement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn place(&mut self, slot: NodeId, item: NodeId) -> Result<()> {
        if let Some(existing) = self.item_by_slot.get(&slot) {
            bail!("slot {slot} already holds item {existing}");
        }
        self.item_by_slot.insert(slot, item);
        self.slots_by_item.entry(item).or_default().push(slot);
        Ok(())
    }

    pub fn item_at(&self, slot: NodeId) -> Option<NodeId> {
        self.item_by_slot.get(&slot).copied()
    }

    pub fn slots_for(&self, item: NodeId) -> &[NodeId] {
        self.slots_by_item
            .get(&item)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.item_by_slot.len()
    }

    pub fn is_empty(&self) -> bool {
        self.item_by_slot.is_empty()
    }

    /// (slot, item) pairs ordered by slot id.
    pub fn assignments(&self) -> Vec<(NodeId, NodeId)> {
        let mut out: Vec<(NodeId, NodeId)> =
            self.item_by_slot.iter().map(|(&s, &i)| (s, i)).collect();
        out.sort();
        out
    }
}

/// Node registry. Ids are dense, permanent, and index directly into `nodes`.
#[derive(Default, Clone, Debug)]
pub struct LogicGraph {
    nodes: Vec<Node>,
    name_isv: IndexedVec<String>,
}

impl LogicGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_node(&mut self, name: &str, kind: NodeKind) -> Result<NodeId> {
        if self.name_isv.index_by_key.contains_key(name) {
            bail!("duplicate node name {name:?}");
        }
        let idx = self.name_isv.add(name);
        assert_eq!(idx, self.nodes.len());
        let uid = NodeId(idx);
        self.nodes.push(Node {
            uid,
            name: name.to_string(),
            kind,
        });
        Ok(uid)
    }

    pub fn add_requirement(&mut self, node: NodeId, deps: Vec<NodeId>) -> Result<()> {
        let num_nodes = self.nodes.len();
        if let Some(&bad) = deps.iter().find(|d| d.0 >= num_nodes) {
            bail!("requirement references unknown node id {bad}");
        }
        let Some(n) = self.nodes.get_mut(node.0) else {
            bail!("unknown node id {node}");
        };
        match n.kind.requirements_mut() {
            Some(reqs) => {
                reqs.push(deps);
                Ok(())
            }
            None => bail!(
                "node {:?} of kind {} does not carry requirements",
                n.name,
                n.kind_name()
            ),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn name(&self, id: NodeId) -> &str {
        &self.nodes[id.0].name
    }

    pub fn names(&self, ids: &[NodeId]) -> Vec<String> {
        ids.iter().map(|&id| self.name(id).to_string()).collect()
    }

    pub fn id_by_name(&self, name: &str) -> Option<NodeId> {
        self.name_isv.index_by_key.get(name).map(|&idx| NodeId(idx))
    }

    pub fn items(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| matches!(n.kind, NodeKind::Item))
            .map(|n| n.uid)
            .collect()
    }

    pub fn slots(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| matches!(n.kind, NodeKind::Slot(_)))
            .map(|n| n.uid)
            .collect()
    }

    pub fn edges(&self, options: &EdgeOptions) -> Vec<Edge> {
        self.nodes.iter().flat_map(|n| n.edges(options)).collect()
    }

    /// Edges that do not depend on item placement or starting items.
    pub fn logic_edges(&self) -> Vec<Edge> {
        let options = EdgeOptions::default();
        self.nodes
            .iter()
            .filter(|n| !matches!(n.kind, NodeKind::Item))
            .flat_map(|n| n.edges(&options))
            .collect()
    }
}
