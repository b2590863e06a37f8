use itemrando_game::{Placement, World};
use itemrando_logic::{PathEntry, TraverseResult};
use serde_derive::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SpoilerItemLoc {
    pub item: String,
    pub slot: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SpoilerLog {
    pub seed: usize,
    pub beatable: bool,
    pub starting_items: Vec<String>,
    pub all_items: Vec<SpoilerItemLoc>,
    pub empty_slots: Vec<String>,
    // Every fact in the order it became reachable, with the requirements that unlocked it.
    pub route: Vec<PathEntry>,
}

pub fn get_spoiler_log(
    world: &World,
    seed: usize,
    placement: &Placement,
    result: &TraverseResult,
) -> SpoilerLog {
    let graph = &world.graph;
    let all_items = placement
        .assignments()
        .into_iter()
        .map(|(slot, item)| SpoilerItemLoc {
            item: graph.name(item).to_string(),
            slot: graph.name(slot).to_string(),
        })
        .collect();
    let empty_slots = world
        .slots
        .iter()
        .filter(|&&slot| placement.item_at(slot).is_none())
        .map(|&slot| graph.name(slot).to_string())
        .collect();
    SpoilerLog {
        seed,
        beatable: result.win,
        starting_items: graph.names(&world.starting_items),
        all_items,
        empty_slots,
        route: result.path(graph),
    }
}
