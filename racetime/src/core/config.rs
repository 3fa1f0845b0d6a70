use crate::core::{DurationMs, TimestampMs};
use helpers::general::min_to_ms;
use serde::{Deserialize, Serialize};

/// * `id` - Driver identity, unique within a configuration
/// * `name` - Display name, e.g. "Valtteri Bottas"
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Driver {
    pub id: String,
    pub name: String,
}

/// One entry of the planned driver rotation. The order of entries is meaningful.
/// * `driver_id` - Must reference an existing driver id
/// * `planned_duration_minutes` - Planned stint length; the fuel duration is used when absent
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StintEntry {
    pub driver_id: String,
    pub planned_duration_minutes: Option<f64>,
}

/// RaceConfig describes the event: drivers, stint plan and duration parameters. It is
/// treated as a value object; any change produces a new version that reaches the state
/// machine through the LoadConfig event (or through the race-time stint editing events).
///
/// * `drivers` - Participating drivers (at least one)
/// * `stint_sequence` - Planned rotation (at least one entry)
/// * `fuel_duration_minutes` - Running time of a full tank
/// * `fuel_warning_threshold_minutes` - Remaining fuel below which the alert raises
/// * `race_duration_minutes` - Total race length
/// * `race_official_start_time` - Scheduled start as an RFC-3339 timestamp (optional)
/// * `practice_duration_minutes` - Length of the practice phase; absent means no practice
/// * `driver_checkup_minutes` - Interval of the periodic driver checkup (optional)
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RaceConfig {
    pub drivers: Vec<Driver>,
    pub stint_sequence: Vec<StintEntry>,
    pub fuel_duration_minutes: f64,
    pub fuel_warning_threshold_minutes: f64,
    pub race_duration_minutes: f64,
    pub race_official_start_time: Option<String>,
    pub practice_duration_minutes: Option<f64>,
    pub driver_checkup_minutes: Option<f64>,
}

impl RaceConfig {
    /// check verifies the basic shape requirements. A configuration failing this check
    /// is discarded wholesale, never repaired field by field.
    pub fn check(&self) -> anyhow::Result<()> {
        if self.drivers.is_empty() {
            anyhow::bail!("Configuration must contain at least one driver!");
        }
        for (i, driver) in self.drivers.iter().enumerate() {
            if driver.id.is_empty() {
                anyhow::bail!("Driver {} has an empty id!", i);
            }
            if self.drivers.iter().filter(|d| d.id == driver.id).count() > 1 {
                anyhow::bail!("Driver id {} is not unique!", driver.id);
            }
        }
        if self.stint_sequence.is_empty() {
            anyhow::bail!("Stint sequence must contain at least one entry!");
        }
        for entry in self.stint_sequence.iter() {
            if !self.has_driver(&entry.driver_id) {
                anyhow::bail!("Stint entry references unknown driver {}!", entry.driver_id);
            }
            if let Some(minutes) = entry.planned_duration_minutes {
                if minutes <= 0.0 {
                    anyhow::bail!("Planned stint duration must be positive!");
                }
            }
        }
        if self.fuel_duration_minutes <= 0.0 {
            anyhow::bail!("Fuel duration must be positive!");
        }
        if self.fuel_warning_threshold_minutes <= 0.0 {
            anyhow::bail!("Fuel warning threshold must be positive!");
        }
        if self.race_duration_minutes <= 0.0 {
            anyhow::bail!("Race duration must be positive!");
        }
        if let Some(minutes) = self.practice_duration_minutes {
            if minutes <= 0.0 {
                anyhow::bail!("Practice duration must be positive!");
            }
        }
        if let Some(minutes) = self.driver_checkup_minutes {
            if minutes <= 0.0 {
                anyhow::bail!("Driver checkup interval must be positive!");
            }
        }
        if let Some(raw) = &self.race_official_start_time {
            if chrono::DateTime::parse_from_rfc3339(raw).is_err() {
                anyhow::bail!("Official start time {} is not a valid RFC-3339 timestamp!", raw);
            }
        }
        Ok(())
    }

    pub fn has_driver(&self, id: &str) -> bool {
        self.drivers.iter().any(|d| d.id == id)
    }

    pub fn driver_name(&self, id: &str) -> Option<&str> {
        self.drivers.iter().find(|d| d.id == id).map(|d| d.name.as_str())
    }

    /// has_practice reports whether a practice phase is configured at all.
    pub fn has_practice(&self) -> bool {
        self.practice_duration_minutes.map_or(false, |m| m > 0.0)
    }

    pub fn fuel_duration_ms(&self) -> DurationMs {
        min_to_ms(self.fuel_duration_minutes)
    }

    pub fn fuel_warning_threshold_ms(&self) -> DurationMs {
        min_to_ms(self.fuel_warning_threshold_minutes)
    }

    pub fn race_duration_ms(&self) -> DurationMs {
        min_to_ms(self.race_duration_minutes)
    }

    pub fn practice_duration_ms(&self) -> Option<DurationMs> {
        self.practice_duration_minutes.filter(|m| *m > 0.0).map(min_to_ms)
    }

    pub fn checkup_interval_ms(&self) -> Option<DurationMs> {
        self.driver_checkup_minutes.filter(|m| *m > 0.0).map(min_to_ms)
    }

    /// official_start_ms returns the scheduled start as epoch milliseconds, or None if
    /// no (parseable) official start time is configured.
    pub fn official_start_ms(&self) -> Option<TimestampMs> {
        self.race_official_start_time
            .as_deref()
            .and_then(|raw| chrono::DateTime::parse_from_rfc3339(raw).ok())
            .map(|dt| dt.timestamp_millis())
    }

    /// planned_stint_ms returns the planned length of the given stint, falling back to
    /// the fuel duration when the entry carries no explicit plan.
    pub fn planned_stint_ms(&self, index: usize) -> DurationMs {
        self.stint_sequence
            .get(index)
            .and_then(|entry| entry.planned_duration_minutes)
            .map(min_to_ms)
            .unwrap_or_else(|| self.fuel_duration_ms())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> RaceConfig {
        RaceConfig {
            drivers: vec![
                Driver { id: "d1".into(), name: "Alice".into() },
                Driver { id: "d2".into(), name: "Bob".into() },
            ],
            stint_sequence: vec![
                StintEntry { driver_id: "d1".into(), planned_duration_minutes: None },
                StintEntry { driver_id: "d2".into(), planned_duration_minutes: Some(45.0) },
            ],
            fuel_duration_minutes: 50.0,
            fuel_warning_threshold_minutes: 8.0,
            race_duration_minutes: 120.0,
            race_official_start_time: None,
            practice_duration_minutes: Some(20.0),
            driver_checkup_minutes: None,
        }
    }

    #[test]
    fn test_check_accepts_valid_config() {
        assert!(base_config().check().is_ok());
    }

    #[test]
    fn test_check_rejects_duplicate_driver_ids() {
        let mut config = base_config();
        config.drivers.push(Driver { id: "d1".into(), name: "Clone".into() });
        assert!(config.check().is_err());
    }

    #[test]
    fn test_check_rejects_unknown_stint_driver() {
        let mut config = base_config();
        config.stint_sequence.push(StintEntry {
            driver_id: "ghost".into(),
            planned_duration_minutes: None,
        });
        assert!(config.check().is_err());
    }

    #[test]
    fn test_check_rejects_nonpositive_durations() {
        let mut config = base_config();
        config.race_duration_minutes = 0.0;
        assert!(config.check().is_err());

        let mut config = base_config();
        config.practice_duration_minutes = Some(-5.0);
        assert!(config.check().is_err());
    }

    #[test]
    fn test_official_start_parsing() {
        let mut config = base_config();
        config.race_official_start_time = Some("1970-01-01T00:00:10Z".into());
        assert!(config.check().is_ok());
        assert_eq!(config.official_start_ms(), Some(10_000));

        config.race_official_start_time = Some("not a timestamp".into());
        assert!(config.check().is_err());
        assert_eq!(config.official_start_ms(), None);
    }

    #[test]
    fn test_planned_stint_falls_back_to_fuel_duration() {
        let config = base_config();
        assert_eq!(config.planned_stint_ms(0), min_to_ms(50.0));
        assert_eq!(config.planned_stint_ms(1), min_to_ms(45.0));
        // out of range falls back as well
        assert_eq!(config.planned_stint_ms(7), min_to_ms(50.0));
    }
}
