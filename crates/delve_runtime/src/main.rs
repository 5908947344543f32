//! Delve Runtime
//!
//! Headless binary: loads settings, runs the wandering-monster simulation
//! on top of delve_core and logs the outcome.
//!
//! Usage: `delve [settings.json]`

mod demo;
mod settings;

use anyhow::Result;
use settings::Settings;

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    tracing::info!("Delve v{}", delve_core::VERSION);

    let settings = match std::env::args().nth(1) {
        Some(path) => {
            tracing::info!(path = %path, "loading settings");
            Settings::load(&path)?
        }
        None => Settings::default(),
    };
    tracing::debug!(?settings, "settings resolved");

    let summary = demo::run(&settings)?;
    tracing::info!(
        turns = summary.turns,
        pickups = summary.pickups,
        drops = summary.drops,
        deaths = summary.deaths,
        monsters = summary.monsters,
        items_on_floor = summary.items_on_floor,
        items_carried = summary.items_carried,
        positioned = summary.positioned,
        "simulation finished"
    );

    Ok(())
}
