use crate::core::state::{shift_time, RaceState};
use crate::core::state_handler::complete_practice;
use crate::core::timing;
use crate::core::TimestampMs;

/// reconcile re-derives the state that continuous ticking would have produced across an
/// arbitrary offline interval. It is invoked exactly once when persisted state is
/// loaded, never on the periodic tick path.
///
/// The correction order is significant: pause extensions run before the practice
/// timeout check, which runs before the fuel alert is recomputed, because each step
/// reads the timestamps corrected by the previous one. A race that ran past its finish
/// while offline is left to the first tick, which closes it out at the stored finish
/// time either way.
pub fn reconcile(state: &RaceState, now: TimestampMs) -> RaceState {
    let mut next = state.clone();

    // offline time while paused counts as paused time, never as race time. The pause
    // simply continues: the stint and fuel clocks shift along with the finish so that a
    // later resume only has to account for the post-load span.
    if next.race_active && next.race_paused {
        if let Some(pause_start) = next.race_pause_time {
            let offline = (now - pause_start).max(0);
            next.accumulated_pause_ms += offline;
            shift_time(&mut next.race_finish_time, offline);
            shift_time(&mut next.stint_start_time, offline);
            shift_time(&mut next.fuel_tank_start_time, offline);
            next.race_pause_time = Some(now);
        }
    }

    if next.practice_active && next.practice_paused {
        if let Some(pause_start) = next.practice_pause_time {
            let offline = (now - pause_start).max(0);
            next.practice_accumulated_pause_ms += offline;
            shift_time(&mut next.practice_start_time, offline);
            shift_time(&mut next.practice_finish_time, offline);
            shift_time(&mut next.stint_start_time, offline);
            shift_time(&mut next.fuel_tank_start_time, offline);
            next.practice_pause_time = Some(now);
        }
    }

    // a practice phase that timed out while offline completes as of its planned finish
    // instant, not as of now
    if next.practice_running() {
        if let Some(finish) = next.practice_finish_time {
            if now >= finish {
                complete_practice(&mut next, now);
            }
        }
    }

    // unconfigured or already-finished practice leaves no pause markers behind
    if !next.config.has_practice() || next.practice_completed {
        next.practice_completed = true;
        next.practice_active = false;
        next.practice_paused = false;
        next.practice_pause_time = None;
    }

    // an idle session never retains a stale current driver across a reload
    if !next.race_active && !next.practice_active {
        next.current_stint_index = 0;
        next.current_driver_id = next.config.stint_sequence.first().map(|e| e.driver_id.clone());
        next.stint_start_time = None;
    }

    next.fuel_alert_active = timing::fuel_alert(&next, now);
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{Driver, RaceConfig, StintEntry};
    use crate::core::event::SessionEvent;
    use crate::core::state_handler::transition;
    use helpers::general::min_to_ms;

    fn config(practice_minutes: Option<f64>) -> RaceConfig {
        RaceConfig {
            drivers: vec![
                Driver { id: "d1".into(), name: "Alice".into() },
                Driver { id: "d2".into(), name: "Bob".into() },
            ],
            stint_sequence: vec![
                StintEntry { driver_id: "d1".into(), planned_duration_minutes: None },
                StintEntry { driver_id: "d2".into(), planned_duration_minutes: None },
            ],
            fuel_duration_minutes: 40.0,
            fuel_warning_threshold_minutes: 5.0,
            race_duration_minutes: 60.0,
            race_official_start_time: None,
            practice_duration_minutes: practice_minutes,
            driver_checkup_minutes: None,
        }
    }

    #[test]
    fn test_offline_practice_timeout_completes_at_planned_finish() {
        let state = RaceState::new(config(Some(20.0)));
        let state = transition(&state, &SessionEvent::StartPractice, 0);

        // the app goes away at 5min and comes back at 30min
        let state = reconcile(&state, min_to_ms(30.0));
        assert!(state.practice_completed);
        assert!(!state.practice_active);
        assert_eq!(state.practice_finish_time, Some(min_to_ms(20.0)));
        assert!(state.stint_start_time.is_none());
    }

    #[test]
    fn test_offline_race_pause_continues_as_pause() {
        let state = RaceState::new(config(None));
        let state = transition(&state, &SessionEvent::StartRace, 0);
        let state = transition(&state, &SessionEvent::PauseRace, min_to_ms(10.0));

        let reloaded = reconcile(&state, min_to_ms(40.0));
        assert!(reloaded.race_active && reloaded.race_paused);
        assert_eq!(reloaded.accumulated_pause_ms, min_to_ms(30.0));
        assert_eq!(reloaded.race_pause_time, Some(min_to_ms(40.0)));
        assert_eq!(reloaded.race_finish_time, Some(min_to_ms(90.0)));
        // stint and fuel clocks shifted along: the displayed values did not move
        assert_eq!(
            timing::stint_elapsed_ms(&reloaded, min_to_ms(40.0)),
            timing::stint_elapsed_ms(&state, min_to_ms(10.0))
        );
        assert_eq!(
            timing::fuel_remaining_ms(&reloaded, min_to_ms(40.0)),
            timing::fuel_remaining_ms(&state, min_to_ms(10.0))
        );
    }

    #[test]
    fn test_reconciliation_equivalence_for_paused_race() {
        let state = RaceState::new(config(None));
        let state = transition(&state, &SessionEvent::StartRace, 0);
        let paused = transition(&state, &SessionEvent::PauseRace, min_to_ms(10.0));

        // path A: the process stays up, ticking, and resumes at 40min
        let mut ticked = paused.clone();
        for minute in 11..=39 {
            ticked = transition(&ticked, &SessionEvent::Tick, min_to_ms(minute as f64));
        }
        let ticked = transition(&ticked, &SessionEvent::ResumeRace, min_to_ms(40.0));

        // path B: the process dies at 10min and reconciles once at 40min
        let reloaded = reconcile(&paused, min_to_ms(40.0));
        let reloaded = transition(&reloaded, &SessionEvent::ResumeRace, min_to_ms(40.0));

        assert_eq!(ticked, reloaded);
    }

    #[test]
    fn test_reconcile_is_transparent_for_a_running_race() {
        let state = RaceState::new(config(None));
        let state = transition(&state, &SessionEvent::StartRace, 0);

        let reloaded = reconcile(&state, min_to_ms(30.0));
        // the offline span counts as race time; a tick then behaves identically
        let ticked_live = transition(&state, &SessionEvent::Tick, min_to_ms(30.0));
        let ticked_reloaded = transition(&reloaded, &SessionEvent::Tick, min_to_ms(30.0));
        assert_eq!(ticked_live, ticked_reloaded);

        // past the finish, the first tick closes the race at the stored finish time
        let done = transition(&reloaded, &SessionEvent::Tick, min_to_ms(75.0));
        assert!(done.race_completed);
        assert_eq!(done.completed_stints.last().unwrap().end_time, min_to_ms(60.0));
    }

    #[test]
    fn test_offline_practice_pause_shifts_all_clocks() {
        let state = RaceState::new(config(Some(20.0)));
        let state = transition(&state, &SessionEvent::StartPractice, 0);
        let state = transition(&state, &SessionEvent::PausePractice, min_to_ms(8.0));

        let reloaded = reconcile(&state, min_to_ms(50.0));
        assert!(reloaded.practice_active && reloaded.practice_paused);
        assert_eq!(reloaded.practice_start_time, Some(min_to_ms(42.0)));
        assert_eq!(reloaded.practice_finish_time, Some(min_to_ms(62.0)));
        assert_eq!(reloaded.fuel_tank_start_time, Some(min_to_ms(42.0)));
        assert_eq!(reloaded.practice_pause_time, Some(min_to_ms(50.0)));
        // remaining practice time is unchanged by the offline interval
        assert_eq!(
            timing::practice_remaining_ms(&reloaded, min_to_ms(50.0)),
            Some(min_to_ms(12.0))
        );
    }

    #[test]
    fn test_idle_reload_repins_rotation() {
        let mut state = RaceState::new(config(None));
        // simulate stale persisted rotation fields
        state.current_stint_index = 1;
        state.current_driver_id = Some("d2".into());
        state.stint_start_time = Some(min_to_ms(5.0));

        let reloaded = reconcile(&state, min_to_ms(99.0));
        assert_eq!(reloaded.current_stint_index, 0);
        assert_eq!(reloaded.current_driver_id.as_deref(), Some("d1"));
        assert!(reloaded.stint_start_time.is_none());
    }

    #[test]
    fn test_unconfigured_practice_is_forced_complete_with_clean_markers() {
        let mut state = RaceState::new(config(None));
        // stale markers that a crash mid-write could have left behind
        state.practice_paused = true;
        state.practice_pause_time = Some(min_to_ms(3.0));

        let reloaded = reconcile(&state, min_to_ms(10.0));
        assert!(reloaded.practice_completed);
        assert!(!reloaded.practice_paused);
        assert!(reloaded.practice_pause_time.is_none());
    }

    #[test]
    fn test_reload_recomputes_fuel_alert() {
        let state = RaceState::new(config(None));
        let state = transition(&state, &SessionEvent::StartRace, 0);
        assert!(!state.fuel_alert_active);

        // 37min offline: 3min of fuel left, inside the 5min warning window
        let reloaded = reconcile(&state, min_to_ms(37.0));
        assert!(reloaded.fuel_alert_active);

        // fully drained: the alert clears again
        let reloaded = reconcile(&state, min_to_ms(55.0));
        assert!(!reloaded.fuel_alert_active);
    }
}
