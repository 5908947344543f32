//! Settings management

use anyhow::{Context, Result};
use delve_core::ecs::RelationConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Runtime settings, read from an optional JSON file.
///
/// Every section falls back to its defaults, so a file only needs the
/// values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub world: WorldSettings,
    pub sim: SimSettings,
    /// Index layout of the "carries" relation.
    pub carries: RelationConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldSettings {
    pub width: i32,
    pub height: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimSettings {
    pub seed: u64,
    pub monsters: usize,
    pub items: usize,
    pub turns: u32,
    /// Chance per turn that a monster dies and drops what it carries.
    pub death_chance: f32,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self { width: 64, height: 32 }
    }
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            seed: 0x5EED,
            monsters: 24,
            items: 96,
            turns: 200,
            death_chance: 0.002,
        }
    }
}

impl Settings {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading settings from {}", path.display()))?;
        let settings = serde_json::from_str(&text)
            .with_context(|| format!("parsing settings in {}", path.display()))?;
        Ok(settings)
    }
}
