//! Telemetry snapshot rendering for report synthesis
//!
//! The telemetry collaborator aligns yearly series; this module only turns
//! the latest observation into the short factual line the report prompt
//! embeds. Absent data is stated explicitly.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stated in the snapshot when there is nothing to report
pub const NO_TELEMETRY_NOTE: &str = "- note: no recent telemetry data available for this region.";

/// Latest values on record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestObservation {
    pub year: i32,
    /// CO2 emissions, tonnes per capita
    pub co2: Option<f64>,
    /// Renewable share of final energy consumption, percent
    pub renewables: Option<f64>,
    /// PM2.5 concentration, µg/m³
    pub aqi: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub country: String,
    pub latest: Option<LatestObservation>,
}

impl TelemetrySnapshot {
    pub fn unavailable(country: impl Into<String>) -> Self {
        Self {
            country: country.into(),
            latest: None,
        }
    }

    /// Take the last position of year-aligned series.
    ///
    /// Series shorter than `years` count as missing at that position.
    pub fn from_series(
        country: impl Into<String>,
        years: &[i32],
        co2: &[Option<f64>],
        renewables: &[Option<f64>],
        aqi: &[Option<f64>],
    ) -> Self {
        let latest = years.len().checked_sub(1).map(|idx| LatestObservation {
            year: years[idx],
            co2: co2.get(idx).copied().flatten(),
            renewables: renewables.get(idx).copied().flatten(),
            aqi: aqi.get(idx).copied().flatten(),
        });

        Self {
            country: country.into(),
            latest,
        }
    }
}

fn value_or_na(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| v.to_string())
}

impl fmt::Display for TelemetrySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "country: {}", self.country)?;
        match &self.latest {
            Some(obs) => {
                writeln!(f, "- latest year on record: {}", obs.year)?;
                writeln!(f, "- latest co2: {} tonnes/capita", value_or_na(obs.co2))?;
                writeln!(f, "- renewable share: {}%", value_or_na(obs.renewables))?;
                write!(f, "- air quality (pm2.5): {} µg/m³", value_or_na(obs.aqi))
            }
            None => write!(f, "{}", NO_TELEMETRY_NOTE),
        }
    }
}
