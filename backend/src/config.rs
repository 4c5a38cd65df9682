//! Cell configuration
//!
//! Read-only input to the cycle engine. A cycle clones the configuration
//! once when it starts, so updates applied while a cycle is running only
//! take effect from the next cycle.

use crate::core::geometry::Point;
use crate::error::SimulationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Name of the transporter's parking position
pub const HOME: &str = "HOME";

/// Name of the transfer position in front of the engraver
pub const DOCK: &str = "DOCK";

// ============================================================================
// Configuration Types
// ============================================================================

/// Engraver billing and timing parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngraverConfig {
    /// Engraving time per character of order text (seconds)
    pub seconds_per_letter: f64,

    /// Fixed energy charged per job (kWh)
    pub base_idle_energy_kwh: f64,

    /// Laser energy per second of engraving (kWh/s)
    pub laser_energy_rate_kwh_per_s: f64,

    /// Grams of CO2 emitted per kWh
    pub emission_factor_g_per_kwh: f64,

    /// Price per kWh
    pub cost_per_energy_unit: f64,
}

impl Default for EngraverConfig {
    fn default() -> Self {
        Self {
            seconds_per_letter: 0.5,
            base_idle_energy_kwh: 0.02,
            laser_energy_rate_kwh_per_s: 0.002,
            emission_factor_g_per_kwh: 360.0,
            cost_per_energy_unit: 0.40,
        }
    }
}

/// Transporter (AGV) motion and billing parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransporterConfig {
    /// Travel speed (m/s)
    pub speed_m_per_s: f64,

    /// Price per billed metre
    pub cost_per_meter: f64,
}

impl Default for TransporterConfig {
    fn default() -> Self {
        Self {
            speed_m_per_s: 0.5,
            cost_per_meter: 0.02,
        }
    }
}

/// Named sites on the cell floor
///
/// Always contains [`HOME`] and [`DOCK`] once validated, plus one or more
/// job positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CoordinateTable(BTreeMap<String, Point>);

impl CoordinateTable {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn get(&self, site: &str) -> Option<Point> {
        self.0.get(site).copied()
    }

    pub fn contains(&self, site: &str) -> bool {
        self.0.contains_key(site)
    }

    pub fn insert(&mut self, site: impl Into<String>, point: Point) {
        self.0.insert(site.into(), point);
    }

    /// Site names in sorted order
    pub fn sites(&self) -> Vec<String> {
        self.0.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Point)> {
        self.0.iter()
    }

    /// Look up a site or report it as invalid
    pub fn resolve(&self, site: &str) -> Result<Point, SimulationError> {
        self.get(site).ok_or_else(|| SimulationError::InvalidSite {
            site: site.to_string(),
            available: self.sites(),
        })
    }
}

impl Default for CoordinateTable {
    fn default() -> Self {
        let mut table = Self::new();
        table.insert(HOME, Point::new(0.0, 0.0));
        table.insert(DOCK, Point::new(5.0, 0.0));
        table.insert("JOB_POS1", Point::new(12.0, 8.0));
        table.insert("JOB_POS2", Point::new(15.0, -6.0));
        table
    }
}

impl FromIterator<(String, Point)> for CoordinateTable {
    fn from_iter<I: IntoIterator<Item = (String, Point)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Complete cell configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellConfig {
    /// Currency label attached to device ledgers
    pub currency: String,

    pub engraver: EngraverConfig,

    pub transporter: TransporterConfig,

    /// Engraving progress increment in percent (1..=100)
    pub progress_step: u32,

    /// Simulated length of one transporter tick (seconds)
    pub tick_interval_s: f64,

    pub coords: CoordinateTable,
}

impl Default for CellConfig {
    fn default() -> Self {
        Self {
            currency: "EUR".to_string(),
            engraver: EngraverConfig::default(),
            transporter: TransporterConfig::default(),
            progress_step: 5,
            tick_interval_s: 0.1,
            coords: CoordinateTable::default(),
        }
    }
}

impl CellConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), SimulationError> {
        fn positive(name: &str, value: f64) -> Result<(), SimulationError> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(SimulationError::InvalidConfig(format!(
                    "{} must be > 0, got {}",
                    name, value
                )))
            }
        }

        fn non_negative(name: &str, value: f64) -> Result<(), SimulationError> {
            if value.is_finite() && value >= 0.0 {
                Ok(())
            } else {
                Err(SimulationError::InvalidConfig(format!(
                    "{} must be >= 0, got {}",
                    name, value
                )))
            }
        }

        positive("transporter.speed_m_per_s", self.transporter.speed_m_per_s)?;
        positive("tick_interval_s", self.tick_interval_s)?;
        non_negative("transporter.cost_per_meter", self.transporter.cost_per_meter)?;
        non_negative("engraver.seconds_per_letter", self.engraver.seconds_per_letter)?;
        non_negative(
            "engraver.base_idle_energy_kwh",
            self.engraver.base_idle_energy_kwh,
        )?;
        non_negative(
            "engraver.laser_energy_rate_kwh_per_s",
            self.engraver.laser_energy_rate_kwh_per_s,
        )?;
        non_negative(
            "engraver.emission_factor_g_per_kwh",
            self.engraver.emission_factor_g_per_kwh,
        )?;
        non_negative(
            "engraver.cost_per_energy_unit",
            self.engraver.cost_per_energy_unit,
        )?;

        if self.progress_step == 0 || self.progress_step > 100 {
            return Err(SimulationError::InvalidConfig(format!(
                "progress_step must be within 1..=100, got {}",
                self.progress_step
            )));
        }

        for required in [HOME, DOCK] {
            if !self.coords.contains(required) {
                return Err(SimulationError::InvalidConfig(format!(
                    "coordinate table must define {}",
                    required
                )));
            }
        }

        if let Some((site, _)) = self.coords.iter().find(|(_, p)| !p.is_finite()) {
            return Err(SimulationError::InvalidConfig(format!(
                "coordinates of {} are not finite",
                site
            )));
        }

        Ok(())
    }

    /// Apply a partial update, returning the validated result
    ///
    /// The receiver is left untouched when validation fails.
    pub fn apply(&self, update: &ConfigUpdate) -> Result<CellConfig, SimulationError> {
        let mut next = self.clone();

        if let Some(currency) = &update.currency {
            if !currency.is_empty() {
                next.currency = currency.clone();
            }
        }
        if let Some(engraver) = &update.engraver {
            let e = &mut next.engraver;
            e.seconds_per_letter = engraver.seconds_per_letter.unwrap_or(e.seconds_per_letter);
            e.base_idle_energy_kwh = engraver
                .base_idle_energy_kwh
                .unwrap_or(e.base_idle_energy_kwh);
            e.laser_energy_rate_kwh_per_s = engraver
                .laser_energy_rate_kwh_per_s
                .unwrap_or(e.laser_energy_rate_kwh_per_s);
            e.emission_factor_g_per_kwh = engraver
                .emission_factor_g_per_kwh
                .unwrap_or(e.emission_factor_g_per_kwh);
            e.cost_per_energy_unit = engraver
                .cost_per_energy_unit
                .unwrap_or(e.cost_per_energy_unit);
        }
        if let Some(transporter) = &update.transporter {
            let t = &mut next.transporter;
            t.speed_m_per_s = transporter.speed_m_per_s.unwrap_or(t.speed_m_per_s);
            t.cost_per_meter = transporter.cost_per_meter.unwrap_or(t.cost_per_meter);
        }
        if let Some(step) = update.progress_step {
            next.progress_step = step;
        }
        if let Some(interval) = update.tick_interval_s {
            next.tick_interval_s = interval;
        }

        next.validate()?;
        Ok(next)
    }

    /// Insert or overwrite named sites, returning the validated result
    pub fn with_coords(
        &self,
        updates: impl IntoIterator<Item = (String, Point)>,
    ) -> Result<CellConfig, SimulationError> {
        let mut next = self.clone();
        for (site, point) in updates {
            next.coords.insert(site, point);
        }
        next.validate()?;
        Ok(next)
    }
}

// ============================================================================
// Partial Updates
// ============================================================================

/// Optional engraver fields for a partial update
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngraverConfigUpdate {
    pub seconds_per_letter: Option<f64>,
    pub base_idle_energy_kwh: Option<f64>,
    pub laser_energy_rate_kwh_per_s: Option<f64>,
    pub emission_factor_g_per_kwh: Option<f64>,
    pub cost_per_energy_unit: Option<f64>,
}

/// Optional transporter fields for a partial update
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransporterConfigUpdate {
    pub speed_m_per_s: Option<f64>,
    pub cost_per_meter: Option<f64>,
}

/// Partial configuration update; `None` keeps the current value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigUpdate {
    pub currency: Option<String>,
    pub engraver: Option<EngraverConfigUpdate>,
    pub transporter: Option<TransporterConfigUpdate>,
    pub progress_step: Option<u32>,
    pub tick_interval_s: Option<f64>,
}
