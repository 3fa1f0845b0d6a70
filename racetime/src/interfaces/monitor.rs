use crate::core::state::{CompletedStintEntry, RaceState};
use crate::core::timing;
use crate::core::{DurationMs, TimestampMs};

pub const MAX_MONITOR_UPDATE_FREQUENCY: f64 = 10.0;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionPhase {
    Idle,
    Practice,
    PracticePaused,
    PracticeCompleted,
    Race,
    RacePaused,
    RaceCompleted,
}

impl Default for SessionPhase {
    fn default() -> Self {
        SessionPhase::Idle
    }
}

impl SessionPhase {
    pub fn of(state: &RaceState) -> SessionPhase {
        if state.race_active {
            if state.race_paused {
                SessionPhase::RacePaused
            } else {
                SessionPhase::Race
            }
        } else if state.practice_active {
            if state.practice_paused {
                SessionPhase::PracticePaused
            } else {
                SessionPhase::Practice
            }
        } else if state.race_completed {
            SessionPhase::RaceCompleted
        } else if state.practice_completed && state.config.has_practice() {
            SessionPhase::PracticeCompleted
        } else {
            SessionPhase::Idle
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SessionPhase::Idle => "idle",
            SessionPhase::Practice => "practice",
            SessionPhase::PracticePaused => "practice (paused)",
            SessionPhase::PracticeCompleted => "practice completed",
            SessionPhase::Race => "race",
            SessionPhase::RacePaused => "race (paused)",
            SessionPhase::RaceCompleted => "race completed",
        }
    }
}

/// SessionSnapshot is the read model published to the display side: one capture of the
/// phase, all derived clock values, and the stint log. The status command and the
/// periodic monitor channel both go through this single derivation.
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub current_driver: Option<String>,
    pub stint_number: u32,
    pub stint_elapsed_ms: Option<DurationMs>,
    pub stint_remaining_ms: Option<DurationMs>,
    pub race_elapsed_ms: Option<DurationMs>,
    pub race_remaining_ms: Option<DurationMs>,
    pub practice_remaining_ms: Option<DurationMs>,
    pub fuel_remaining_ms: DurationMs,
    pub fuel_fraction: f64,
    pub fuel_alert_active: bool,
    pub next_checkup_in_ms: Option<DurationMs>,
    pub completed_stints: Vec<CompletedStintEntry>,
}

impl SessionSnapshot {
    pub fn capture(state: &RaceState, now: TimestampMs) -> SessionSnapshot {
        let current_driver = state
            .current_driver_id
            .as_deref()
            .map(|id| state.config.driver_name(id).unwrap_or(id).to_owned());

        SessionSnapshot {
            phase: SessionPhase::of(state),
            current_driver,
            stint_number: state.current_stint_index as u32 + 1,
            stint_elapsed_ms: timing::stint_elapsed_ms(state, now),
            stint_remaining_ms: timing::stint_remaining_ms(state, now),
            race_elapsed_ms: timing::race_elapsed_ms(state, now),
            race_remaining_ms: timing::race_remaining_ms(state, now),
            practice_remaining_ms: timing::practice_remaining_ms(state, now),
            fuel_remaining_ms: timing::fuel_remaining_ms(state, now),
            fuel_fraction: timing::fuel_fraction(state, now),
            fuel_alert_active: state.fuel_alert_active,
            next_checkup_in_ms: timing::next_checkup_in_ms(state, now),
            completed_stints: state.completed_stints.clone(),
        }
    }
}
