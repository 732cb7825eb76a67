//! Domain models for Voltcast

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// One timestamped energy sample for a facility
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub timestamp: DateTime<Utc>,
    /// Energy produced in the sample period (kWh, >= 0)
    pub energy_produced: f64,
    /// Energy consumed in the sample period (kWh, >= 0)
    pub energy_consumed: f64,
    /// Conversion efficiency, 0.0 - 1.0
    pub efficiency: f64,
    /// Instantaneous load (kW, >= 0)
    pub current_load: f64,
    pub facility_id: i64,
}

impl Reading {
    pub fn new(
        timestamp: DateTime<Utc>,
        energy_produced: f64,
        energy_consumed: f64,
        efficiency: f64,
        current_load: f64,
        facility_id: i64,
    ) -> Self {
        Self {
            timestamp,
            energy_produced,
            energy_consumed,
            efficiency,
            current_load,
            facility_id,
        }
    }

    fn is_finite(&self) -> bool {
        Metric::ALL.iter().all(|m| m.value_of(self).is_finite())
    }

    /// Clip values into their documented ranges
    fn clipped(&self) -> (Self, bool) {
        let clipped = Self {
            timestamp: self.timestamp,
            energy_produced: self.energy_produced.max(0.0),
            energy_consumed: self.energy_consumed.max(0.0),
            efficiency: self.efficiency.clamp(0.0, 1.0),
            current_load: self.current_load.max(0.0),
            facility_id: self.facility_id,
        };
        let changed = clipped != *self;
        (clipped, changed)
    }
}

/// Ingestion payload for a new reading, before validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReading {
    pub energy_produced: f64,
    pub energy_consumed: f64,
    pub current_load: f64,
    /// Derived from produced/consumed when absent
    #[serde(default)]
    pub efficiency: Option<f64>,
    /// Defaults to the ingestion time when absent
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl NewReading {
    /// Reject negative, non-finite or out-of-range values
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("energy_produced", self.energy_produced),
            ("energy_consumed", self.energy_consumed),
            ("current_load", self.current_load),
        ];

        for (name, value) in fields {
            if !value.is_finite() {
                return Err(Error::InvalidData(format!("{} is not a finite number", name)));
            }
            if value < 0.0 {
                return Err(Error::InvalidData(format!(
                    "{} must be non-negative, got {}",
                    name, value
                )));
            }
        }

        if let Some(efficiency) = self.efficiency {
            if !efficiency.is_finite() || !(0.0..=1.0).contains(&efficiency) {
                return Err(Error::InvalidData(format!(
                    "efficiency must be within [0, 1], got {}",
                    efficiency
                )));
            }
        }

        Ok(())
    }

    /// Efficiency as the ratio of the smaller to the larger energy figure
    pub fn derived_efficiency(&self) -> f64 {
        let high = self.energy_produced.max(self.energy_consumed);
        if high <= 0.0 {
            return 1.0;
        }
        (self.energy_produced.min(self.energy_consumed) / high).clamp(0.0, 1.0)
    }

    /// Validate and convert into a stored reading
    pub fn into_reading(self, facility_id: i64, received_at: DateTime<Utc>) -> Result<Reading> {
        self.validate()?;
        let efficiency = self
            .efficiency
            .unwrap_or_else(|| self.derived_efficiency());

        Ok(Reading {
            timestamp: self.timestamp.unwrap_or(received_at),
            energy_produced: self.energy_produced,
            energy_consumed: self.energy_consumed,
            efficiency,
            current_load: self.current_load,
            facility_id,
        })
    }
}

/// The tracked reading metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    EnergyProduced,
    EnergyConsumed,
    Efficiency,
    CurrentLoad,
}

impl Metric {
    /// All metrics in reporting order
    pub const ALL: [Metric; 4] = [
        Metric::EnergyProduced,
        Metric::EnergyConsumed,
        Metric::Efficiency,
        Metric::CurrentLoad,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::EnergyProduced => "energy_produced",
            Metric::EnergyConsumed => "energy_consumed",
            Metric::Efficiency => "efficiency",
            Metric::CurrentLoad => "current_load",
        }
    }

    /// Human-readable label for messages
    pub fn label(&self) -> &'static str {
        match self {
            Metric::EnergyProduced => "Energy production",
            Metric::EnergyConsumed => "Energy consumption",
            Metric::Efficiency => "Efficiency",
            Metric::CurrentLoad => "Load",
        }
    }

    pub fn value_of(&self, reading: &Reading) -> f64 {
        match self {
            Metric::EnergyProduced => reading.energy_produced,
            Metric::EnergyConsumed => reading.energy_consumed,
            Metric::Efficiency => reading.efficiency,
            Metric::CurrentLoad => reading.current_load,
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "energy_produced" | "produced" => Ok(Metric::EnergyProduced),
            "energy_consumed" | "consumed" => Ok(Metric::EnergyConsumed),
            "efficiency" => Ok(Metric::Efficiency),
            "current_load" | "load" => Ok(Metric::CurrentLoad),
            _ => Err(format!("Unknown metric: {}", s)),
        }
    }
}

/// Point-in-time view used by the recommendation rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub energy_produced: f64,
    pub energy_consumed: f64,
    pub efficiency: f64,
    pub current_load: f64,
    /// Facility capacity in the same unit as `current_load`
    pub capacity: Option<f64>,
}

impl Snapshot {
    pub fn from_reading(reading: &Reading, capacity: Option<f64>) -> Self {
        Self {
            energy_produced: reading.energy_produced,
            energy_consumed: reading.energy_consumed,
            efficiency: reading.efficiency,
            current_load: reading.current_load,
            capacity,
        }
    }

    pub fn value_of(&self, metric: Metric) -> f64 {
        match metric {
            Metric::EnergyProduced => self.energy_produced,
            Metric::EnergyConsumed => self.energy_consumed,
            Metric::Efficiency => self.efficiency,
            Metric::CurrentLoad => self.current_load,
        }
    }

    /// Load as a fraction of capacity; None without a usable capacity
    pub fn load_ratio(&self) -> Option<f64> {
        match self.capacity {
            Some(capacity) if capacity.is_finite() && capacity > 0.0 => {
                let ratio = self.current_load / capacity;
                ratio.is_finite().then_some(ratio)
            }
            _ => None,
        }
    }
}

/// Clip or drop malformed readings so downstream math never sees them.
///
/// Non-finite readings and readings that do not advance the timestamp are
/// dropped; negative values are clipped to zero and efficiency is clamped to
/// [0, 1].
pub fn sanitize(readings: &[Reading]) -> Vec<Reading> {
    let mut clean: Vec<Reading> = Vec::with_capacity(readings.len());
    let mut dropped = 0usize;
    let mut clipped = 0usize;

    for reading in readings {
        if !reading.is_finite() {
            dropped += 1;
            continue;
        }
        if let Some(last) = clean.last() {
            if reading.timestamp <= last.timestamp {
                dropped += 1;
                continue;
            }
        }

        let (reading, changed) = reading.clipped();
        if changed {
            clipped += 1;
        }
        clean.push(reading);
    }

    if dropped > 0 || clipped > 0 {
        debug!(
            total = readings.len(),
            dropped, clipped, "Sanitized malformed readings"
        );
    }

    clean
}
