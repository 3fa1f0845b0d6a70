use crate::core::state::RaceState;
use crate::core::{DurationMs, TimestampMs};

/// effective_now selects the timestamp all "remaining"/"elapsed" computations subtract
/// against: the pause timestamp while the relevant phase is paused, the practice finish
/// once practice ended and the race was never started (fuel and stint clocks freeze at
/// that instant), and the live clock otherwise.
pub fn effective_now(state: &RaceState, now: TimestampMs) -> TimestampMs {
    if state.practice_active && state.practice_paused {
        return state.practice_pause_time.unwrap_or(now);
    }
    if state.race_active && state.race_paused {
        return state.race_pause_time.unwrap_or(now);
    }
    if state.practice_completed && !state.race_active && state.race_start_time.is_none() {
        if let Some(finish) = state.practice_finish_time {
            return finish;
        }
    }
    now
}

/// fuel_remaining_ms recomputes the fuel level from the tank start timestamp. Fuel is
/// never stored as a countdown. An untouched tank reads as full.
pub fn fuel_remaining_ms(state: &RaceState, now: TimestampMs) -> DurationMs {
    let duration = state.config.fuel_duration_ms();
    match state.fuel_tank_start_time {
        Some(start) => (duration - (effective_now(state, now) - start)).max(0),
        None => duration,
    }
}

/// fuel_alert reports whether the remaining fuel is strictly between zero and the
/// configured warning threshold. Recomputed identically on every tick and on load, so
/// loading stale state never yields a different alert than continuous ticking would.
pub fn fuel_alert(state: &RaceState, now: TimestampMs) -> bool {
    let remaining = fuel_remaining_ms(state, now);
    remaining > 0 && remaining < state.config.fuel_warning_threshold_ms()
}

/// fuel_fraction returns the remaining tank level in [0, 1].
pub fn fuel_fraction(state: &RaceState, now: TimestampMs) -> f64 {
    let duration = state.config.fuel_duration_ms();
    if duration <= 0 {
        return 0.0;
    }
    fuel_remaining_ms(state, now) as f64 / duration as f64
}

/// stint_elapsed_ms returns the running time of the current stint, or None when no
/// stint clock is running.
pub fn stint_elapsed_ms(state: &RaceState, now: TimestampMs) -> Option<DurationMs> {
    state
        .stint_start_time
        .map(|start| (effective_now(state, now) - start).max(0))
}

/// stint_remaining_ms returns the time left of the current stint's planned duration.
pub fn stint_remaining_ms(state: &RaceState, now: TimestampMs) -> Option<DurationMs> {
    let elapsed = stint_elapsed_ms(state, now)?;
    let planned = state.config.planned_stint_ms(state.current_stint_index);
    Some((planned - elapsed).max(0))
}

/// race_elapsed_ms returns the consumed race time excluding pauses, clamped to the race
/// duration.
pub fn race_elapsed_ms(state: &RaceState, now: TimestampMs) -> Option<DurationMs> {
    let start = state.race_start_time?;
    let elapsed = effective_now(state, now) - start - state.accumulated_pause_ms;
    Some(elapsed.max(0).min(state.config.race_duration_ms()))
}

/// race_remaining_ms returns the time left until the (pause-shifted) finish.
pub fn race_remaining_ms(state: &RaceState, now: TimestampMs) -> Option<DurationMs> {
    let finish = state.race_finish_time?;
    Some((finish - effective_now(state, now)).max(0))
}

/// practice_remaining_ms returns the time left of a running practice phase.
pub fn practice_remaining_ms(state: &RaceState, now: TimestampMs) -> Option<DurationMs> {
    if !state.practice_active {
        return None;
    }
    let finish = state.practice_finish_time?;
    Some((finish - effective_now(state, now)).max(0))
}

/// next_checkup_in_ms returns the time until the next periodic driver checkup within
/// the running stint, if a checkup interval is configured.
pub fn next_checkup_in_ms(state: &RaceState, now: TimestampMs) -> Option<DurationMs> {
    let interval = state.config.checkup_interval_ms()?;
    let elapsed = stint_elapsed_ms(state, now)?;
    Some(interval - (elapsed % interval))
}
