use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use strum::VariantNames;
use strum_macros::{EnumString, VariantNames};

#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, EnumString, VariantNames,
)]
pub enum TraversalMode {
    BreadthFirst,
    DepthFirst,
}

impl TraversalMode {
    pub fn parse(s: &str) -> Result<Self> {
        TraversalMode::from_str(s).with_context(|| {
            format!(
                "unknown traversal mode {s:?} (expected one of {:?})",
                TraversalMode::VARIANTS
            )
        })
    }

    pub fn is_dfs(self) -> bool {
        self == TraversalMode::DepthFirst
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct RandomizerSettings {
    pub name: Option<String>,
    pub traversal_mode: TraversalMode,
    // Pre-simplify the world logic with a route store before placing items.
    pub simplify_logic: bool,
    pub max_attempts: usize,
    // Names of the items to shuffle. By default every item not held from the start.
    pub item_pool: Option<Vec<String>>,
}

impl Default for RandomizerSettings {
    fn default() -> Self {
        RandomizerSettings {
            name: None,
            traversal_mode: TraversalMode::BreadthFirst,
            simplify_logic: true,
            max_attempts: 100,
            item_pool: None,
        }
    }
}

impl RandomizerSettings {
    pub fn parse(json_str: &str) -> Result<Self> {
        Ok(serde_json::from_str(json_str)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json_str = std::fs::read_to_string(path)
            .with_context(|| format!("unable to read settings at {}", path.display()))?;
        RandomizerSettings::parse(&json_str)
            .with_context(|| format!("unable to parse settings at {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_settings_use_defaults() -> Result<()> {
        let settings = RandomizerSettings::parse(r#"{"traversalMode": "DepthFirst"}"#)?;
        assert_eq!(settings.traversal_mode, TraversalMode::DepthFirst);
        assert!(settings.simplify_logic);
        assert_eq!(settings.max_attempts, 100);
        assert!(settings.item_pool.is_none());
        Ok(())
    }

    #[test]
    fn test_traversal_mode_parse() {
        assert_eq!(
            TraversalMode::parse("BreadthFirst").unwrap(),
            TraversalMode::BreadthFirst
        );
        assert!(TraversalMode::parse("DepthFirst").unwrap().is_dfs());
        let err = TraversalMode::parse("Sideways").unwrap_err();
        assert!(err.to_string().contains("DepthFirst"));
    }
}
