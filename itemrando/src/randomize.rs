use anyhow::{bail, Context, Result};
use hashbrown::HashSet;
use itemrando_game::{Edge, EdgeOptions, NodeId, NodeKind, Placement, World};
use itemrando_logic::{traverse, RouteStore, TraverseOptions, TraverseResult};
use log::{debug, info};
use rand::seq::SliceRandom;
use rand::{RngCore, SeedableRng};

use crate::settings::RandomizerSettings;
use crate::spoiler_log::{get_spoiler_log, SpoilerLog};

pub struct Randomizer<'a> {
    pub world: &'a World,
    pub settings: &'a RandomizerSettings,
    // Placement-independent requirement edges (possibly simplified).
    logic_edges: Vec<Edge>,
    item_pool: Vec<NodeId>,
}

pub struct Randomization {
    pub seed: usize,
    pub placement: Placement,
    pub spoiler_log: SpoilerLog,
}

fn get_item_pool(world: &World, settings: &RandomizerSettings) -> Result<Vec<NodeId>> {
    let item_pool: Vec<NodeId> = match &settings.item_pool {
        Some(names) => {
            let mut out = vec![];
            let mut seen: HashSet<NodeId> = HashSet::new();
            for name in names {
                let id = world
                    .graph
                    .id_by_name(name)
                    .with_context(|| format!("unknown item {name:?} in item pool"))?;
                if !world.items.contains(&id) {
                    bail!("{name:?} in item pool is not an item");
                }
                if !seen.insert(id) {
                    bail!("{name:?} appears more than once in item pool");
                }
                out.push(id);
            }
            out
        }
        None => world
            .items
            .iter()
            .copied()
            .filter(|item| !world.starting_items.contains(item))
            .collect(),
    };
    if item_pool.len() > world.slots.len() {
        bail!(
            "item pool has {} items but there are only {} slots",
            item_pool.len(),
            world.slots.len()
        );
    }
    Ok(item_pool)
}

impl<'a> Randomizer<'a> {
    pub fn new(world: &'a World, settings: &'a RandomizerSettings) -> Result<Self> {
        let graph = &world.graph;
        let raw_edges = graph.logic_edges();
        let logic_edges = if settings.simplify_logic {
            // Items stay open: their routes depend on where they end up being placed.
            let mut store = RouteStore::from_edges(graph.len(), &raw_edges)?;
            store.finalize_all(
                graph
                    .nodes()
                    .iter()
                    .filter(|n| !matches!(n.kind, NodeKind::Item))
                    .map(|n| n.uid),
            )?;
            info!(
                "Simplified {} requirement edges into {} routes",
                raw_edges.len(),
                store.route_count()
            );
            store.edges()
        } else {
            raw_edges
        };
        let item_pool = get_item_pool(world, settings)?;
        Ok(Randomizer {
            world,
            settings,
            logic_edges,
            item_pool,
        })
    }

    pub fn item_pool(&self) -> &[NodeId] {
        &self.item_pool
    }

    fn get_edges(&self, placement: &Placement) -> Vec<Edge> {
        let options = EdgeOptions {
            starting_items: &self.world.starting_items,
            placement: Some(placement),
        };
        let mut edges = self.logic_edges.clone();
        for &item in &self.world.items {
            edges.extend(self.world.graph.node(item).edges(&options));
        }
        edges
    }

    fn get_traverse_options(&self, assumed: Vec<NodeId>) -> TraverseOptions {
        TraverseOptions {
            wanted: Some(self.world.win.clone()),
            dfs: self.settings.traversal_mode.is_dfs(),
            assumed,
        }
    }

    /// Checks whether the win condition is reachable with the given placement.
    pub fn check(&self, placement: &Placement) -> TraverseResult {
        let edges = self.get_edges(placement);
        traverse(
            self.world.graph.len(),
            &edges,
            &self.get_traverse_options(vec![]),
        )
    }

    pub fn randomize(&self, attempt_num_rando: usize, seed: usize) -> Result<Randomization> {
        let mut rng_seed = [0u8; 32];
        rng_seed[..8].copy_from_slice(&seed.to_le_bytes());
        let mut rng = rand::rngs::StdRng::from_seed(rng_seed);
        let graph = &self.world.graph;

        let mut items_to_place = self.item_pool.clone();
        items_to_place.shuffle(&mut rng);

        // Assumed fill: each item goes to a slot reachable while holding every item that
        // has not been placed yet. Placements made this way never lock an item behind itself.
        let mut placement = Placement::new();
        for (i, &item) in items_to_place.iter().enumerate() {
            let assumed = items_to_place[i + 1..].to_vec();
            let edges = self.get_edges(&placement);
            let result = traverse(graph.len(), &edges, &self.get_traverse_options(assumed));
            let candidates: Vec<NodeId> = self
                .world
                .slots
                .iter()
                .copied()
                .filter(|&slot| placement.item_at(slot).is_none() && result.is_seen(slot))
                .collect();
            let Some(&slot) = candidates.choose(&mut rng) else {
                bail!(
                    "[attempt {attempt_num_rando}] No reachable empty slot for {}",
                    graph.name(item)
                );
            };
            debug!(
                "[attempt {attempt_num_rando}] Placing {} at {} ({} candidates)",
                graph.name(item),
                graph.name(slot),
                candidates.len()
            );
            placement.place(slot, item)?;
        }

        let result = self.check(&placement);
        if !result.win {
            bail!("[attempt {attempt_num_rando}] Attempt failed: Game not beatable");
        }
        info!(
            "[attempt {attempt_num_rando}] Placed {} items, {} of {} nodes reachable",
            placement.len(),
            result.num_seen(),
            graph.len()
        );
        let spoiler_log = get_spoiler_log(self.world, seed, &placement, &result);
        Ok(Randomization {
            seed,
            placement,
            spoiler_log,
        })
    }

    pub fn randomize_with_retries(
        &self,
        max_attempts: usize,
        root_seed: usize,
    ) -> Result<Randomization> {
        let mut rng_seed = [0u8; 32];
        rng_seed[..8].copy_from_slice(&root_seed.to_le_bytes());
        let mut rng = rand::rngs::StdRng::from_seed(rng_seed);
        for attempt_num in 1..=max_attempts {
            let item_seed = (rng.next_u64() & 0xFFFFFFFF) as usize;
            info!("Attempt {attempt_num}/{max_attempts}: item placement seed={item_seed}");
            match self.randomize(attempt_num, item_seed) {
                Ok(randomization) => {
                    return Ok(randomization);
                }
                Err(e) => {
                    info!(
                        "Attempt {attempt_num}/{max_attempts}: Randomization failed: {}",
                        e
                    );
                }
            }
        }
        bail!("Exhausted randomization attempts");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itemrando_game::WorldData;

    const TWO_KEYS: &str = r#"{
        "start": "Start",
        "items": ["Red Key", "Blue Key"],
        "slots": [
            {"name": "Porch", "requires": [["Start"]]},
            {"name": "Red Room", "requires": [["Red Key"]]},
            {"name": "Blue Room", "requires": [["Blue Key"]]}
        ],
        "events": [{"name": "Exit", "requires": [["Red Key", "Blue Key"]]}],
        "win": ["Exit"]
    }"#;

    fn two_keys() -> Result<World> {
        World::from_data(&WorldData::parse(TWO_KEYS)?)
    }

    #[test]
    fn test_first_key_lands_on_porch() -> Result<()> {
        let world = two_keys()?;
        let settings = RandomizerSettings::default();
        let randomizer = Randomizer::new(&world, &settings)?;
        let porch = world.graph.id_by_name("Porch").unwrap();
        for seed in 0..20 {
            let randomization = randomizer.randomize(1, seed)?;
            // Whichever key is needed first can only be on the porch.
            let item = randomization.placement.item_at(porch);
            assert!(item.is_some());
            assert!(randomizer.check(&randomization.placement).win);
            assert!(randomization.spoiler_log.beatable);
            assert_eq!(randomization.spoiler_log.empty_slots.len(), 1);
        }
        Ok(())
    }

    #[test]
    fn test_item_pool_validation() -> Result<()> {
        let world = two_keys()?;
        let mut settings = RandomizerSettings::default();
        settings.item_pool = Some(vec!["Porch".to_string()]);
        assert!(Randomizer::new(&world, &settings).is_err());
        settings.item_pool = Some(vec!["Red Key".to_string(), "Red Key".to_string()]);
        assert!(Randomizer::new(&world, &settings).is_err());
        settings.item_pool = Some(vec!["Red Key".to_string()]);
        let randomizer = Randomizer::new(&world, &settings)?;
        assert_eq!(randomizer.item_pool().len(), 1);
        Ok(())
    }

    #[test]
    fn test_unplaceable_pool_fails() -> Result<()> {
        // Only the Red Key gets shuffled, so the Blue Key can never be obtained.
        let world = two_keys()?;
        let mut settings = RandomizerSettings::default();
        settings.item_pool = Some(vec!["Red Key".to_string()]);
        let randomizer = Randomizer::new(&world, &settings)?;
        assert!(randomizer.randomize(1, 0).is_err());
        assert!(randomizer.randomize_with_retries(3, 0).is_err());
        Ok(())
    }
}
