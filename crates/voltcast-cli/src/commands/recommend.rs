//! Recommendation command implementation

use std::path::Path;

use anyhow::{bail, Result};
use serde::Serialize;
use voltcast_core::{EnergyIntelligence, Recommendation, Snapshot};

use super::trends::print_insights;
use super::{load_config, load_readings, print_json};

#[derive(Serialize)]
struct RecommendOutput<'a> {
    facility_id: i64,
    snapshot: &'a Snapshot,
    load_ratio: Option<f64>,
    recommendations: &'a [Recommendation],
}

pub fn cmd_recommend(
    data: &Path,
    config_path: Option<&Path>,
    facility: i64,
    capacity: f64,
    json: bool,
) -> Result<()> {
    if !capacity.is_finite() || capacity <= 0.0 {
        bail!("--capacity must be a positive number, got {}", capacity);
    }

    let config = load_config(config_path)?;
    let readings = load_readings(data, facility)?;
    let Some(latest) = readings.last() else {
        bail!("No readings for facility {} in {}", facility, data.display());
    };

    let service = EnergyIntelligence::new(&config);
    let snapshot = Snapshot::from_reading(latest, Some(capacity));
    let recommendations = service.get_ai_recommendations(&snapshot);

    if json {
        return print_json(&RecommendOutput {
            facility_id: facility,
            snapshot: &snapshot,
            load_ratio: snapshot.load_ratio(),
            recommendations: &recommendations,
        });
    }

    println!();
    println!(
        "🔧 Recommendations (facility {}, reading at {})",
        facility,
        latest.timestamp.format("%Y-%m-%d %H:%M UTC")
    );
    println!("   ─────────────────────────────────────────────────────────────");
    println!(
        "   Load {:.1} / {:.1} ({:.0}%), efficiency {:.0}%, produced {:.1}, consumed {:.1}",
        snapshot.current_load,
        capacity,
        snapshot.load_ratio().unwrap_or(0.0) * 100.0,
        snapshot.efficiency * 100.0,
        snapshot.energy_produced,
        snapshot.energy_consumed
    );
    println!();
    print_insights(&recommendations);

    Ok(())
}
