use crate::core::config::{RaceConfig, StintEntry};
use crate::core::state::RaceState;
use crate::core::TimestampMs;

/// All events the timing core reacts to. Events are passive data: the state machine
/// computes the successor state from the current state, one event, and the wall-clock
/// timestamp supplied by the caller. Events invalid for the current state are no-ops.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Periodic time-based re-evaluation issued by the tick driver. Drives the practice
    /// timeout, race completion and fuel-alert toggling without an explicit user event.
    Tick,

    // practice lifecycle
    StartPractice,
    PausePractice,
    ResumePractice,
    /// Ends practice early; the recorded finish time never exceeds the planned one.
    CompletePractice,
    ResetPractice,

    // race lifecycle
    StartRace,
    PauseRace,
    ResumeRace,
    /// Ends the race early; the recorded finish time never exceeds the planned one.
    CompleteRace,
    ResetRace,

    /// Hands the car to the next driver in the stint sequence. An explicitly supplied
    /// swap time overrides "now"; `next_planned_minutes` rewrites the plan of the
    /// upcoming stint only.
    SwapDriver {
        swap_time: Option<TimestampMs>,
        refuel: bool,
        next_planned_minutes: Option<f64>,
    },

    /// Resets the fuel clock to the supplied time (defaulting to now).
    Refuel { at: Option<TimestampMs> },

    // stint sequence editing (configuration mutations)
    EditStint { index: usize, entry: StintEntry },
    AddStint { index: Option<usize>, entry: StintEntry },
    DeleteStint { index: usize },
    MoveStint { from: usize, to: usize },

    /// Manual correction of the running stint clock.
    EditStintStartTime { start_time: TimestampMs },

    /// Sets or clears the scheduled start (RFC-3339).
    SetOfficialStartTime { start_time: Option<String> },

    /// Replaces the configuration and reconciles the in-flight session against it.
    LoadConfig { config: RaceConfig },

    /// Replaces the whole state with a persisted one, run through the reconciliation
    /// function as of now.
    LoadState { state: Box<RaceState> },
}

impl SessionEvent {
    /// type_name returns the event name for console logging.
    pub fn type_name(&self) -> &'static str {
        match self {
            SessionEvent::Tick => "Tick",
            SessionEvent::StartPractice => "StartPractice",
            SessionEvent::PausePractice => "PausePractice",
            SessionEvent::ResumePractice => "ResumePractice",
            SessionEvent::CompletePractice => "CompletePractice",
            SessionEvent::ResetPractice => "ResetPractice",
            SessionEvent::StartRace => "StartRace",
            SessionEvent::PauseRace => "PauseRace",
            SessionEvent::ResumeRace => "ResumeRace",
            SessionEvent::CompleteRace => "CompleteRace",
            SessionEvent::ResetRace => "ResetRace",
            SessionEvent::SwapDriver { .. } => "SwapDriver",
            SessionEvent::Refuel { .. } => "Refuel",
            SessionEvent::EditStint { .. } => "EditStint",
            SessionEvent::AddStint { .. } => "AddStint",
            SessionEvent::DeleteStint { .. } => "DeleteStint",
            SessionEvent::MoveStint { .. } => "MoveStint",
            SessionEvent::EditStintStartTime { .. } => "EditStintStartTime",
            SessionEvent::SetOfficialStartTime { .. } => "SetOfficialStartTime",
            SessionEvent::LoadConfig { .. } => "LoadConfig",
            SessionEvent::LoadState { .. } => "LoadState",
        }
    }
}
