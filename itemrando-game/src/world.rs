use std::path::Path;

use anyhow::{bail, Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{LogicGraph, NodeId, NodeKind, Placement};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationData {
    pub name: String,
    // Alternatives of node names which must all be held; `[[]]` means always available.
    pub requires: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotData {
    pub name: String,
    pub requires: Vec<Vec<String>>,
    #[serde(default)]
    pub vanilla_item: Option<String>,
}

/// Serialized description of a world: the node universe and its requirement rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldData {
    pub start: String,
    pub items: Vec<String>,
    #[serde(default)]
    pub starting_items: Vec<String>,
    #[serde(default)]
    pub areas: Vec<LocationData>,
    #[serde(default)]
    pub slots: Vec<SlotData>,
    #[serde(default)]
    pub events: Vec<LocationData>,
    pub win: Vec<String>,
}

impl WorldData {
    pub fn parse(json_str: &str) -> Result<Self> {
        Ok(serde_json::from_str(json_str)?)
    }
}

#[derive(Clone, Debug)]
pub struct World {
    pub graph: LogicGraph,
    pub start: NodeId,
    pub items: Vec<NodeId>,
    pub slots: Vec<NodeId>,
    pub starting_items: Vec<NodeId>,
    pub win: Vec<NodeId>,
    pub vanilla_placement: Placement,
}

fn resolve(graph: &LogicGraph, name: &str) -> Result<NodeId> {
    graph
        .id_by_name(name)
        .with_context(|| format!("unknown node name {name:?}"))
}

fn resolve_requirements(
    graph: &mut LogicGraph,
    node: NodeId,
    requires: &[Vec<String>],
) -> Result<()> {
    for alternative in requires {
        let deps = alternative
            .iter()
            .map(|name| resolve(&*graph, name))
            .collect::<Result<Vec<NodeId>>>()?;
        graph.add_requirement(node, deps)?;
    }
    Ok(())
}

impl World {
    pub fn load(path: &Path) -> Result<World> {
        let json_str = std::fs::read_to_string(path)
            .with_context(|| format!("unable to read {}", path.display()))?;
        let data = WorldData::parse(&json_str)
            .with_context(|| format!("unable to parse {}", path.display()))?;
        World::from_data(&data).with_context(|| format!("invalid world in {}", path.display()))
    }

    pub fn from_data(data: &WorldData) -> Result<World> {
        let mut graph = LogicGraph::new();

        // All nodes are created before any requirement is resolved, so that requirements
        // may refer forward to nodes declared later in the file.
        let start = graph.create_node(&data.start, NodeKind::Start)?;
        let mut items = vec![];
        for name in &data.items {
            items.push(graph.create_node(name, NodeKind::Item)?);
        }
        let mut areas = vec![];
        for area in &data.areas {
            areas.push(graph.create_node(&area.name, NodeKind::Area(vec![]))?);
        }
        let mut slots = vec![];
        for slot in &data.slots {
            slots.push(graph.create_node(&slot.name, NodeKind::Slot(vec![]))?);
        }
        let mut events = vec![];
        for event in &data.events {
            events.push(graph.create_node(&event.name, NodeKind::Event(vec![]))?);
        }

        for (&id, area) in areas.iter().zip(&data.areas) {
            resolve_requirements(&mut graph, id, &area.requires)
                .with_context(|| format!("in area {:?}", area.name))?;
        }
        for (&id, slot) in slots.iter().zip(&data.slots) {
            resolve_requirements(&mut graph, id, &slot.requires)
                .with_context(|| format!("in slot {:?}", slot.name))?;
        }
        for (&id, event) in events.iter().zip(&data.events) {
            resolve_requirements(&mut graph, id, &event.requires)
                .with_context(|| format!("in event {:?}", event.name))?;
        }

        let mut starting_items = vec![];
        for name in &data.starting_items {
            let id = resolve(&graph, name)?;
            if !items.contains(&id) {
                bail!("starting item {name:?} is not an item");
            }
            starting_items.push(id);
        }

        let mut vanilla_placement = Placement::new();
        for (&slot_id, slot) in slots.iter().zip(&data.slots) {
            if let Some(item_name) = &slot.vanilla_item {
                let item_id = resolve(&graph, item_name)?;
                if !items.contains(&item_id) {
                    bail!(
                        "vanilla item {item_name:?} of slot {:?} is not an item",
                        slot.name
                    );
                }
                vanilla_placement.place(slot_id, item_id)?;
            }
        }

        if data.win.is_empty() {
            bail!("win condition is empty");
        }
        let win = data
            .win
            .iter()
            .map(|name| resolve(&graph, name))
            .collect::<Result<Vec<NodeId>>>()
            .context("in win condition")?;

        debug!(
            "Loaded world: {} nodes, {} items, {} slots, {} events",
            graph.len(),
            items.len(),
            slots.len(),
            events.len()
        );
        Ok(World {
            graph,
            start,
            items,
            slots,
            starting_items,
            win,
            vanilla_placement,
        })
    }
}
