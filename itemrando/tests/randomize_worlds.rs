use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use hashbrown::HashSet;
use itemrando::randomize::Randomizer;
use itemrando::settings::{RandomizerSettings, TraversalMode};
use itemrando_game::{NodeKind, World};
use itemrando_logic::{traverse, RouteStore, TraverseOptions};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ScenariosList {
    scenarios: Vec<Scenario>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Scenario {
    world: String,
    vanilla_beatable: bool,
    randomizable: bool,
}

fn worlds_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/worlds")
}

fn load_scenarios() -> Result<Vec<(Scenario, World)>> {
    let scenarios_path = worlds_dir().join("scenarios.json");
    let scenarios_str = std::fs::read_to_string(&scenarios_path)
        .context(format!("loading {}", scenarios_path.display()))?;
    let scenarios_list: ScenariosList = serde_json::from_str(&scenarios_str)
        .context(format!("parsing {}", scenarios_path.display()))?;
    let mut out = vec![];
    for scenario in scenarios_list.scenarios {
        let world = World::load(&worlds_dir().join(&scenario.world))?;
        out.push((scenario, world));
    }
    Ok(out)
}

fn test_scenario(scenario: &Scenario, world: &World) -> Result<()> {
    let settings = RandomizerSettings::default();
    let randomizer = Randomizer::new(world, &settings)?;

    let vanilla = randomizer.check(&world.vanilla_placement);
    if vanilla.win != scenario.vanilla_beatable {
        bail!(
            "Vanilla placement beatable: {}, expected {}",
            vanilla.win,
            scenario.vanilla_beatable
        );
    }

    for root_seed in 0..10 {
        let result = randomizer.randomize_with_retries(settings.max_attempts, root_seed);
        let randomization = match (result, scenario.randomizable) {
            (Ok(r), true) => r,
            (Err(_), false) => continue,
            (Ok(_), false) => bail!("Randomization succeeded for an unbeatable world"),
            (Err(e), true) => return Err(e.context(format!("root seed {root_seed}"))),
        };

        // Every pooled item is placed exactly once, in distinct slots.
        let placement = &randomization.placement;
        assert_eq!(placement.len(), randomizer.item_pool().len());
        let placed_items: HashSet<_> = placement.assignments().iter().map(|x| x.1).collect();
        assert_eq!(placed_items.len(), randomizer.item_pool().len());
        assert!(randomizer.check(placement).win);

        let spoiler_log = &randomization.spoiler_log;
        assert!(spoiler_log.beatable);
        assert_eq!(spoiler_log.all_items.len(), placement.len());
        assert_eq!(
            spoiler_log.empty_slots.len() + placement.len(),
            world.slots.len()
        );
        for name in world.graph.names(&world.win) {
            assert!(spoiler_log.route.iter().any(|e| e.node == name));
        }
    }
    Ok(())
}

#[test]
fn test_world_scenarios() -> Result<()> {
    for (scenario, world) in load_scenarios()? {
        println!("Scenario: {:?}", scenario);
        test_scenario(&scenario, &world).context(format!("in {}", scenario.world))?;
    }
    Ok(())
}

#[test]
fn test_same_seed_same_placement() -> Result<()> {
    let world = World::load(&worlds_dir().join("dungeon.json"))?;
    let settings = RandomizerSettings::default();
    let randomizer = Randomizer::new(&world, &settings)?;
    let a = randomizer.randomize_with_retries(100, 12345)?;
    let b = randomizer.randomize_with_retries(100, 12345)?;
    assert_eq!(a.seed, b.seed);
    assert_eq!(a.placement.assignments(), b.placement.assignments());
    assert_eq!(a.spoiler_log.route, b.spoiler_log.route);
    Ok(())
}

#[test]
fn test_settings_do_not_change_placement() -> Result<()> {
    // Logic simplification and traversal order only affect how reachability is computed,
    // never which slots are reachable, so the placements for a given seed are identical.
    let world = World::load(&worlds_dir().join("switches.json"))?;
    let base = RandomizerSettings::default();
    let variants = [
        RandomizerSettings {
            simplify_logic: false,
            ..base.clone()
        },
        RandomizerSettings {
            traversal_mode: TraversalMode::DepthFirst,
            ..base.clone()
        },
    ];
    let base_randomizer = Randomizer::new(&world, &base)?;
    for settings in &variants {
        let randomizer = Randomizer::new(&world, settings)?;
        for seed in 0..20 {
            let expected = base_randomizer.randomize(1, seed);
            let actual = randomizer.randomize(1, seed);
            match (expected, actual) {
                (Ok(e), Ok(a)) => {
                    assert_eq!(e.placement.assignments(), a.placement.assignments())
                }
                (Err(_), Err(_)) => {}
                _ => bail!("seed {seed}: outcomes differ"),
            }
        }
    }
    Ok(())
}

#[test]
fn test_simplified_world_logic_matches_raw() -> Result<()> {
    for (_, world) in load_scenarios()? {
        let graph = &world.graph;
        let raw_edges = graph.logic_edges();
        let mut store = RouteStore::from_edges(graph.len(), &raw_edges)?;
        store.finalize_all(
            graph
                .nodes()
                .iter()
                .filter(|n| !matches!(n.kind, NodeKind::Item))
                .map(|n| n.uid),
        )?;

        // With every item assumed held, both edge sets reach exactly the same facts.
        let options = TraverseOptions {
            assumed: world.items.clone(),
            ..Default::default()
        };
        let raw = traverse(graph.len(), &raw_edges, &options);
        let simplified = traverse(graph.len(), &store.edges(), &options);
        let mut a: Vec<_> = raw.seen.keys().copied().collect();
        let mut b: Vec<_> = simplified.seen.keys().copied().collect();
        a.sort();
        b.sort();
        assert_eq!(a, b);
    }
    Ok(())
}
