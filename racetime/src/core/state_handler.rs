use crate::core::config::{RaceConfig, StintEntry};
use crate::core::event::SessionEvent;
use crate::core::reconcile::reconcile;
use crate::core::state::{shift_time, CompletedStintEntry, RaceState};
use crate::core::timing;
use crate::core::TimestampMs;

/// transition computes the successor state from the current state, an event, and the
/// current wall-clock time. Events that are invalid for the current state return the
/// state unchanged; a transition either fully applies or not at all. The fuel alert is
/// re-derived after every applied transition so that it always reflects the corrected
/// timestamps.
pub fn transition(state: &RaceState, event: &SessionEvent, now: TimestampMs) -> RaceState {
    let mut next = state.clone();

    let applied = match event {
        SessionEvent::Tick => apply_tick(&mut next, now),
        SessionEvent::StartPractice => start_practice(&mut next, now),
        SessionEvent::PausePractice => pause_practice(&mut next, now),
        SessionEvent::ResumePractice => resume_practice(&mut next, now),
        SessionEvent::CompletePractice => complete_practice(&mut next, now),
        SessionEvent::ResetPractice => reset_practice(&mut next),
        SessionEvent::StartRace => start_race(&mut next, now),
        SessionEvent::PauseRace => pause_race(&mut next, now),
        SessionEvent::ResumeRace => resume_race(&mut next, now),
        SessionEvent::CompleteRace => complete_race(&mut next, now),
        SessionEvent::ResetRace => reset_race(&mut next),
        SessionEvent::SwapDriver { swap_time, refuel, next_planned_minutes } => {
            swap_driver(&mut next, now, *swap_time, *refuel, *next_planned_minutes)
        }
        SessionEvent::Refuel { at } => refuel(&mut next, (*at).unwrap_or(now)),
        SessionEvent::EditStint { index, entry } => edit_stint(&mut next, *index, entry),
        SessionEvent::AddStint { index, entry } => add_stint(&mut next, *index, entry),
        SessionEvent::DeleteStint { index } => delete_stint(&mut next, *index),
        SessionEvent::MoveStint { from, to } => move_stint(&mut next, *from, *to),
        SessionEvent::EditStintStartTime { start_time } => {
            edit_stint_start_time(&mut next, *start_time)
        }
        SessionEvent::SetOfficialStartTime { start_time } => {
            set_official_start_time(&mut next, start_time.as_deref())
        }
        SessionEvent::LoadConfig { config } => load_config(&mut next, config, now),
        SessionEvent::LoadState { state: loaded } => {
            next = reconcile(loaded, now);
            true
        }
    };

    if applied {
        next.fuel_alert_active = timing::fuel_alert(&next, now);
    }
    next
}

// -------------------------------------------------------------------------------------------------
// TIME-DRIVEN RE-EVALUATION -----------------------------------------------------------------------
// -------------------------------------------------------------------------------------------------

/// apply_tick runs the transitions that happen by the passage of time alone: the
/// practice timeout, race completion, and fuel-alert toggling. Delivering the same
/// timestamp twice never double-counts anything because every duration is recomputed
/// from absolute timestamps.
fn apply_tick(state: &mut RaceState, now: TimestampMs) -> bool {
    let mut changed = false;

    if state.practice_running() {
        if let Some(finish) = state.practice_finish_time {
            if now >= finish {
                complete_practice(state, now);
                changed = true;
            }
        }
    }

    if state.race_running() {
        if let Some(finish) = state.race_finish_time {
            if now >= finish {
                finish_race(state, finish);
                changed = true;
            }
        }
    }

    let alert = timing::fuel_alert(state, now);
    if alert != state.fuel_alert_active {
        state.fuel_alert_active = alert;
        changed = true;
    }

    changed
}

// -------------------------------------------------------------------------------------------------
// PRACTICE SUB-MACHINE ----------------------------------------------------------------------------
// -------------------------------------------------------------------------------------------------

/// start_practice is legal only when practice is idle and not yet completed, a practice
/// duration is configured, and the race is not active. Practice always starts with a
/// full tank and the rotation positioned at the first stint.
fn start_practice(state: &mut RaceState, now: TimestampMs) -> bool {
    let duration = match state.config.practice_duration_ms() {
        Some(d) => d,
        None => return false,
    };
    if state.practice_active || state.practice_completed || state.race_active {
        return false;
    }

    state.practice_active = true;
    state.practice_paused = false;
    state.practice_start_time = Some(now);
    state.practice_finish_time = Some(now + duration);
    state.practice_pause_time = None;
    state.practice_accumulated_pause_ms = 0;
    state.fuel_tank_start_time = Some(now);
    state.current_stint_index = 0;
    state.current_driver_id = state.config.stint_sequence.first().map(|e| e.driver_id.clone());
    state.stint_start_time = Some(now);
    true
}

fn pause_practice(state: &mut RaceState, now: TimestampMs) -> bool {
    if !state.practice_active || state.practice_paused {
        return false;
    }
    state.practice_paused = true;
    state.practice_pause_time = Some(now);
    true
}

/// resume_practice shifts every practice-side clock forward by the pause duration, so
/// the remaining practice, stint and fuel times read identically across the pause.
fn resume_practice(state: &mut RaceState, now: TimestampMs) -> bool {
    if !state.practice_active || !state.practice_paused {
        return false;
    }
    let pause_start = match state.practice_pause_time {
        Some(t) => t,
        None => return false,
    };
    let pause_ms = (now - pause_start).max(0);

    state.practice_accumulated_pause_ms += pause_ms;
    shift_time(&mut state.practice_start_time, pause_ms);
    shift_time(&mut state.practice_finish_time, pause_ms);
    shift_time(&mut state.fuel_tank_start_time, pause_ms);
    shift_time(&mut state.stint_start_time, pause_ms);
    state.practice_paused = false;
    state.practice_pause_time = None;
    true
}

/// complete_practice ends the practice phase. The recorded finish is clamped to the
/// planned one when the timeout fired late, so an overdue completion never inflates the
/// practice window. With no race running the rotation returns to stint 0 with no
/// running stint clock; driver selection is settled again at race start.
pub(crate) fn complete_practice(state: &mut RaceState, now: TimestampMs) -> bool {
    if !state.practice_active {
        return false;
    }
    let finish = match state.practice_finish_time {
        Some(planned) => planned.min(now),
        None => now,
    };
    state.practice_finish_time = Some(finish);
    state.practice_active = false;
    state.practice_paused = false;
    state.practice_pause_time = None;
    state.practice_completed = true;

    if !state.race_active {
        state.current_stint_index = 0;
        state.current_driver_id = state.config.stint_sequence.first().map(|e| e.driver_id.clone());
        state.stint_start_time = None;
    }
    true
}

/// reset_practice returns the practice sub-machine to idle. Without a configured
/// practice duration the phase stays permanently completed.
fn reset_practice(state: &mut RaceState) -> bool {
    state.practice_active = false;
    state.practice_paused = false;
    state.practice_completed = !state.config.has_practice();
    state.practice_start_time = None;
    state.practice_finish_time = None;
    state.practice_pause_time = None;
    state.practice_accumulated_pause_ms = 0;

    if !state.race_active {
        state.current_stint_index = 0;
        state.current_driver_id = state.config.stint_sequence.first().map(|e| e.driver_id.clone());
        state.stint_start_time = None;
    }
    true
}

// -------------------------------------------------------------------------------------------------
// RACE SUB-MACHINE --------------------------------------------------------------------------------
// -------------------------------------------------------------------------------------------------

/// start_race anchors the race to its reference start time: the configured official
/// start when the operator starts at or before it (duration is measured from the
/// schedule even on an early start), the actual click otherwise. Fuel carries over from
/// a completed practice by back-dating the tank start by the amount already consumed.
fn start_race(state: &mut RaceState, now: TimestampMs) -> bool {
    if state.practice_active || state.race_active || state.race_completed {
        return false;
    }
    if state.config.stint_sequence.is_empty() {
        return false;
    }

    let reference = match state.config.official_start_ms() {
        Some(official) if now <= official => official,
        _ => now,
    };

    state.race_active = true;
    state.race_paused = false;
    state.race_completed = false;
    state.race_start_time = Some(reference);
    state.race_finish_time = Some(reference + state.config.race_duration_ms());
    state.race_pause_time = None;
    state.accumulated_pause_ms = 0;

    state.current_stint_index = 0;
    state.current_driver_id = state.config.stint_sequence.first().map(|e| e.driver_id.clone());
    state.stint_start_time = Some(reference);

    state.fuel_tank_start_time = Some(match (state.practice_finish_time, state.fuel_tank_start_time) {
        (Some(practice_finish), Some(fuel_start))
            if state.practice_completed && practice_finish >= fuel_start =>
        {
            now - (practice_finish - fuel_start)
        }
        _ => now,
    });

    state.completed_stints.clear();
    true
}

fn pause_race(state: &mut RaceState, now: TimestampMs) -> bool {
    if !state.race_active || state.race_paused {
        return false;
    }
    state.race_paused = true;
    state.race_pause_time = Some(now);
    true
}

/// resume_race pushes the finish, stint and fuel clocks forward by exactly the pause
/// duration, preserving the remaining race, stint and fuel times across the pause. The
/// race start timestamp itself is never shifted; the accumulated pause duration keeps
/// the elapsed-time derivation honest.
fn resume_race(state: &mut RaceState, now: TimestampMs) -> bool {
    if !state.race_active || !state.race_paused {
        return false;
    }
    let pause_start = match state.race_pause_time {
        Some(t) => t,
        None => return false,
    };
    let pause_ms = (now - pause_start).max(0);

    state.accumulated_pause_ms += pause_ms;
    shift_time(&mut state.race_finish_time, pause_ms);
    shift_time(&mut state.stint_start_time, pause_ms);
    shift_time(&mut state.fuel_tank_start_time, pause_ms);
    state.race_paused = false;
    state.race_pause_time = None;
    true
}

fn complete_race(state: &mut RaceState, now: TimestampMs) -> bool {
    if !state.race_active {
        return false;
    }
    let finish = state.race_finish_time.map_or(now, |f| f.min(now));
    finish_race(state, finish);
    true
}

/// finish_race closes out the running stint at the exact finish instant and deactivates
/// the race. The synthesized log entry ends at the finish time rather than the polling
/// timestamp, so polling granularity never drifts the recorded durations.
fn finish_race(state: &mut RaceState, finish: TimestampMs) {
    if let (Some(stint_start), Some(driver_id)) =
        (state.stint_start_time, state.current_driver_id.clone())
    {
        // keeps end >= start even when a race anchored to a future official start is
        // completed before that reference
        let entry_end = finish.max(stint_start);
        let already_closed = state
            .completed_stints
            .last()
            .map_or(false, |e| e.end_time == entry_end);
        if !already_closed {
            push_completed_stint(state, &driver_id, stint_start, entry_end, false);
        }
    }

    state.race_finish_time = Some(finish);
    state.race_completed = true;
    state.race_active = false;
    state.race_paused = false;
    state.race_pause_time = None;
    state.stint_start_time = None;
}

/// reset_race returns all race fields to their defaults while retaining the
/// configuration. Practice goes back to "not yet run" unless it is unconfigured, in
/// which case the next race can start immediately.
fn reset_race(state: &mut RaceState) -> bool {
    state.race_active = false;
    state.race_paused = false;
    state.race_completed = false;
    state.race_start_time = None;
    state.race_finish_time = None;
    state.race_pause_time = None;
    state.accumulated_pause_ms = 0;

    state.practice_active = false;
    state.practice_paused = false;
    state.practice_completed = !state.config.has_practice();
    state.practice_start_time = None;
    state.practice_finish_time = None;
    state.practice_pause_time = None;
    state.practice_accumulated_pause_ms = 0;

    state.current_stint_index = 0;
    state.current_driver_id = state.config.stint_sequence.first().map(|e| e.driver_id.clone());
    state.stint_start_time = None;
    state.fuel_tank_start_time = None;
    state.fuel_alert_active = false;
    state.completed_stints.clear();
    true
}

// -------------------------------------------------------------------------------------------------
// ROTATION & FUEL ---------------------------------------------------------------------------------
// -------------------------------------------------------------------------------------------------

/// swap_driver closes the outgoing driver's stint at the effective swap time and hands
/// the car to the next entry of the sequence. Swapping past the last planned stint is
/// rejected: the stint index stays a valid sequence position and only ever advances by
/// one per swap.
fn swap_driver(
    state: &mut RaceState,
    now: TimestampMs,
    swap_time: Option<TimestampMs>,
    refuel: bool,
    next_planned_minutes: Option<f64>,
) -> bool {
    if !state.race_active && !state.practice_active {
        return false;
    }
    let stint_start = match state.stint_start_time {
        Some(t) => t,
        None => return false,
    };
    let outgoing = match state.current_driver_id.clone() {
        Some(id) => id,
        None => return false,
    };
    let next_index = state.current_stint_index + 1;
    if next_index >= state.config.stint_sequence.len() {
        return false;
    }

    // clamped so the append-only log keeps end >= start in order
    let effective = swap_time.unwrap_or(now).max(stint_start);

    push_completed_stint(state, &outgoing, stint_start, effective, refuel);

    if let Some(minutes) = next_planned_minutes {
        if minutes > 0.0 {
            state.config.stint_sequence[next_index].planned_duration_minutes = Some(minutes);
        }
    }

    state.current_stint_index = next_index;
    state.current_driver_id = Some(state.config.stint_sequence[next_index].driver_id.clone());
    state.stint_start_time = Some(effective);
    if refuel {
        state.fuel_tank_start_time = Some(effective);
    }
    true
}

/// refuel resets the tank clock. Legal only while the running phase is not paused.
fn refuel(state: &mut RaceState, at: TimestampMs) -> bool {
    if !state.practice_running() && !state.race_running() {
        return false;
    }
    state.fuel_tank_start_time = Some(at);
    true
}

fn push_completed_stint(
    state: &mut RaceState,
    driver_id: &str,
    start: TimestampMs,
    end: TimestampMs,
    refuelled: bool,
) {
    let driver_name = state
        .config
        .driver_name(driver_id)
        .unwrap_or(driver_id)
        .to_owned();
    let planned_duration_minutes = state
        .config
        .stint_sequence
        .get(state.current_stint_index)
        .and_then(|e| e.planned_duration_minutes);

    state.completed_stints.push(CompletedStintEntry {
        driver_id: driver_id.to_owned(),
        driver_name,
        stint_number: state.completed_stints.len() as u32 + 1,
        start_time: start,
        end_time: end,
        actual_duration_ms: (end - start).max(0),
        planned_duration_minutes,
        refuelled,
    });
}

// -------------------------------------------------------------------------------------------------
// STINT SEQUENCE EDITING --------------------------------------------------------------------------
// -------------------------------------------------------------------------------------------------

/// edit_stint replaces one entry of the stint sequence. The referenced driver must
/// exist; out-of-range indices are ignored. Editing the entry currently being driven
/// reassigns the current driver.
fn edit_stint(state: &mut RaceState, index: usize, entry: &StintEntry) -> bool {
    if index >= state.config.stint_sequence.len() {
        return false;
    }
    if !state.config.has_driver(&entry.driver_id) {
        return false;
    }
    if entry.planned_duration_minutes.map_or(false, |m| m <= 0.0) {
        return false;
    }

    state.config.stint_sequence[index] = entry.clone();
    if index == state.current_stint_index && (state.race_active || state.practice_active) {
        state.current_driver_id = Some(entry.driver_id.clone());
    } else if !state.race_active && !state.practice_active {
        repin_rotation(state);
    }
    true
}

fn add_stint(state: &mut RaceState, index: Option<usize>, entry: &StintEntry) -> bool {
    if !state.config.has_driver(&entry.driver_id) {
        return false;
    }
    if entry.planned_duration_minutes.map_or(false, |m| m <= 0.0) {
        return false;
    }
    let len = state.config.stint_sequence.len();
    let at = index.unwrap_or(len);
    if at > len {
        return false;
    }

    state.config.stint_sequence.insert(at, entry.clone());
    if state.race_active || state.practice_active {
        if at <= state.current_stint_index {
            state.current_stint_index += 1;
        }
    } else {
        repin_rotation(state);
    }
    true
}

/// delete_stint removes one planned stint. The entry currently being driven cannot be
/// deleted (the editing dialogs prevent it; the intended recovery is unsettled), and
/// the sequence never shrinks below one entry.
fn delete_stint(state: &mut RaceState, index: usize) -> bool {
    let len = state.config.stint_sequence.len();
    if index >= len || len <= 1 {
        return false;
    }
    let active = state.race_active || state.practice_active;
    if active && index == state.current_stint_index {
        return false;
    }

    state.config.stint_sequence.remove(index);
    if active {
        if index < state.current_stint_index {
            state.current_stint_index -= 1;
        }
    } else {
        repin_rotation(state);
    }
    true
}

fn move_stint(state: &mut RaceState, from: usize, to: usize) -> bool {
    let len = state.config.stint_sequence.len();
    if from >= len || to >= len || from == to {
        return false;
    }

    let entry = state.config.stint_sequence.remove(from);
    state.config.stint_sequence.insert(to, entry);

    if state.race_active || state.practice_active {
        let cur = state.current_stint_index;
        if from == cur {
            state.current_stint_index = to;
        } else if from < cur && to >= cur {
            state.current_stint_index = cur - 1;
        } else if from > cur && to <= cur {
            state.current_stint_index = cur + 1;
        }
    } else {
        repin_rotation(state);
    }
    true
}

/// edit_stint_start_time corrects the running stint clock manually. The corrected start
/// may not precede the end of the last completed stint, keeping the log ordered.
fn edit_stint_start_time(state: &mut RaceState, start_time: TimestampMs) -> bool {
    if !state.race_active && !state.practice_active {
        return false;
    }
    if state.stint_start_time.is_none() {
        return false;
    }
    let floor = state.completed_stints.last().map(|e| e.end_time);
    state.stint_start_time = Some(match floor {
        Some(f) => start_time.max(f),
        None => start_time,
    });
    true
}

fn set_official_start_time(state: &mut RaceState, start_time: Option<&str>) -> bool {
    match start_time {
        None => {
            if state.config.race_official_start_time.is_none() {
                return false;
            }
            state.config.race_official_start_time = None;
        }
        Some(raw) => {
            if chrono::DateTime::parse_from_rfc3339(raw).is_err() {
                return false;
            }
            state.config.race_official_start_time = Some(raw.to_owned());
        }
    }
    true
}

// -------------------------------------------------------------------------------------------------
// CONFIGURATION LOADING ---------------------------------------------------------------------------
// -------------------------------------------------------------------------------------------------

/// load_config swaps in a new configuration version and reconciles the in-flight
/// session against it: duration deltas shift the running finish times, a completed
/// practice is re-armed when its duration changed before any race start, and the
/// rotation is revalidated against the new stint sequence.
fn load_config(state: &mut RaceState, new: &RaceConfig, now: TimestampMs) -> bool {
    if new.check().is_err() {
        return false;
    }
    let old = state.config.clone();
    state.config = new.clone();

    if state.race_active {
        if let Some(finish) = state.race_finish_time.as_mut() {
            *finish += state.config.race_duration_ms() - old.race_duration_ms();
        }
    }

    if state.practice_active {
        match state.config.practice_duration_ms() {
            Some(new_duration) => {
                let old_duration = old.practice_duration_ms().unwrap_or(new_duration);
                if let Some(finish) = state.practice_finish_time.as_mut() {
                    *finish += new_duration - old_duration;
                }
            }
            // practice was removed from under a running phase: end it now
            None => {
                complete_practice(state, now);
            }
        }
    } else if !state.practice_completed {
        if state.config.practice_duration_ms().is_none() {
            state.practice_completed = true;
        }
    } else if !state.race_active && state.race_start_time.is_none() {
        if let Some(new_duration) = state.config.practice_duration_ms() {
            if old.practice_duration_ms() != Some(new_duration) {
                state.practice_completed = false;
                state.practice_start_time = None;
                state.practice_finish_time = None;
                state.practice_pause_time = None;
                state.practice_paused = false;
                state.practice_accumulated_pause_ms = 0;
            }
        }
    }

    revalidate_rotation(state);
    true
}

/// revalidate_rotation re-checks the stint index and current driver against the (new)
/// sequence: the index is clamped into range, a driver that no longer exists is
/// replaced by the sequence assignment, and an idle session is pinned back to stint 0.
fn revalidate_rotation(state: &mut RaceState) {
    let len = state.config.stint_sequence.len();
    if len == 0 {
        return;
    }
    if state.race_active || state.practice_active {
        if state.current_stint_index >= len {
            state.current_stint_index = len - 1;
        }
        let known = state
            .current_driver_id
            .as_deref()
            .map_or(false, |id| state.config.has_driver(id));
        if !known {
            state.current_driver_id =
                Some(state.config.stint_sequence[state.current_stint_index].driver_id.clone());
        }
    } else {
        repin_rotation(state);
    }
}

fn repin_rotation(state: &mut RaceState) {
    state.current_stint_index = 0;
    state.current_driver_id = state.config.stint_sequence.first().map(|e| e.driver_id.clone());
}
