use crate::core::config::RaceConfig;
use crate::core::{DurationMs, TimestampMs};
use serde::{Deserialize, Serialize};

/// CompletedStintEntry is appended to the stint log on every driver swap and once more
/// when the race completes mid-stint. The log is append-only; entries are never mutated
/// or reordered after creation.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CompletedStintEntry {
    pub driver_id: String,
    pub driver_name: String,
    pub stint_number: u32,
    pub start_time: TimestampMs,
    pub end_time: TimestampMs,
    pub actual_duration_ms: DurationMs,
    pub planned_duration_minutes: Option<f64>,
    pub refuelled: bool,
}

/// RaceState is the single mutable entity of the timing core. Derived values (remaining
/// times, fuel level) are always recomputed from the stored timestamps and a supplied
/// "now"; no live counter is ever persisted. That choice is what makes catch-up
/// reconciliation after downtime possible.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RaceState {
    pub config: RaceConfig,

    // race clock
    pub race_active: bool,
    pub race_paused: bool,
    pub race_completed: bool,
    pub race_start_time: Option<TimestampMs>,
    pub race_finish_time: Option<TimestampMs>,
    pub race_pause_time: Option<TimestampMs>,
    pub accumulated_pause_ms: DurationMs,

    // practice clock
    pub practice_active: bool,
    pub practice_paused: bool,
    pub practice_completed: bool,
    pub practice_start_time: Option<TimestampMs>,
    pub practice_finish_time: Option<TimestampMs>,
    pub practice_pause_time: Option<TimestampMs>,
    pub practice_accumulated_pause_ms: DurationMs,

    // rotation
    pub current_stint_index: usize,
    pub current_driver_id: Option<String>,
    pub stint_start_time: Option<TimestampMs>,

    // fuel
    pub fuel_tank_start_time: Option<TimestampMs>,
    pub fuel_alert_active: bool,

    pub completed_stints: Vec<CompletedStintEntry>,
}

impl RaceState {
    /// new creates the initial state for the inserted configuration. A race without a
    /// configured practice phase behaves as if practice were already done.
    pub fn new(config: RaceConfig) -> RaceState {
        let practice_completed = !config.has_practice();
        let current_driver_id = config.stint_sequence.first().map(|e| e.driver_id.clone());

        RaceState {
            config,
            race_active: false,
            race_paused: false,
            race_completed: false,
            race_start_time: None,
            race_finish_time: None,
            race_pause_time: None,
            accumulated_pause_ms: 0,
            practice_active: false,
            practice_paused: false,
            practice_completed,
            practice_start_time: None,
            practice_finish_time: None,
            practice_pause_time: None,
            practice_accumulated_pause_ms: 0,
            current_stint_index: 0,
            current_driver_id,
            stint_start_time: None,
            fuel_tank_start_time: None,
            fuel_alert_active: false,
            completed_stints: Vec::new(),
        }
    }

    pub fn race_running(&self) -> bool {
        self.race_active && !self.race_paused
    }

    pub fn practice_running(&self) -> bool {
        self.practice_active && !self.practice_paused
    }

    /// any_clock_running reports whether the periodic tick is required at all. Paused
    /// phases need no ticks: nothing time-driven can happen while every clock is frozen.
    pub fn any_clock_running(&self) -> bool {
        self.race_running() || self.practice_running()
    }
}

/// shift_time moves a stored timestamp forward by the inserted duration, if set.
pub(crate) fn shift_time(slot: &mut Option<TimestampMs>, by: DurationMs) {
    if let Some(t) = slot.as_mut() {
        *t += by;
    }
}
