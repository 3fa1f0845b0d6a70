use crate::core::config::RaceConfig;
use crate::core::event::SessionEvent;
use crate::core::reconcile::reconcile;
use crate::core::state::RaceState;
use crate::core::state_handler::transition;
use crate::core::TimestampMs;
use crate::interfaces::monitor::{SessionSnapshot, MAX_MONITOR_UPDATE_FREQUENCY};
use crate::interfaces::store::{self, BlobStore};
use flume::{Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

/// wall_clock_ms returns the current wall-clock time in milliseconds since the epoch.
/// This is the only place the live clock is read; the core transitions always receive
/// their timestamp as a parameter.
pub fn wall_clock_ms() -> TimestampMs {
    chrono::Utc::now().timestamp_millis()
}

/// SessionRunner owns the state, applies transitions, and writes every change back to
/// the store before the next event is read. A lost final write is acceptable; a
/// half-applied transition is never persisted because transitions replace the whole
/// state value.
pub struct SessionRunner<S: BlobStore> {
    pub state: RaceState,
    store: S,
    pub print_events: bool,
    pub debug: bool,
}

impl<S: BlobStore> SessionRunner<S> {
    /// load_or_init restores the persisted session through the reconciliation function,
    /// or starts fresh from the inserted configuration. A configuration blob that
    /// differs from the embedded one is applied as a LoadConfig transition, so duration
    /// deltas and stint edits made between runs reconcile the in-flight session.
    pub fn load_or_init(store: S, config: RaceConfig, now: TimestampMs) -> SessionRunner<S> {
        let state = match store::load_state(&store) {
            Some(saved) => {
                let state = reconcile(&saved, now);
                if state.config != config {
                    transition(&state, &SessionEvent::LoadConfig { config }, now)
                } else {
                    state
                }
            }
            None => RaceState::new(config),
        };
        SessionRunner { state, store, print_events: false, debug: false }
    }

    /// dispatch applies one transition and persists the result. The configuration blob
    /// is only rewritten when the transition changed the configuration (stint edits,
    /// official-time edits, LoadConfig). Returns whether the state changed.
    pub fn dispatch(&mut self, event: &SessionEvent, now: TimestampMs) -> bool {
        let next = transition(&self.state, event, now);
        if next == self.state {
            return false;
        }

        if next.config != self.state.config {
            if let Err(e) = store::save_config(&mut self.store, &next.config) {
                println!("WARNING: Failed to save configuration: {:#}", e);
            }
        }
        if let Err(e) = store::save_state(&mut self.store, &next) {
            println!("WARNING: Failed to save race state: {:#}", e);
        }

        if self.debug {
            println!("DEBUG: Applied {}", event.type_name());
        }
        if self.print_events {
            print_changes(&self.state, &next);
        }
        self.state = next;
        true
    }

    pub fn into_state(self) -> RaceState {
        self.state
    }
}

/// print_changes reports the user-visible phase changes on the console.
fn print_changes(old: &RaceState, new: &RaceState) {
    if !old.practice_active && new.practice_active {
        println!("INFO: Practice started");
    }
    if old.practice_active && new.practice_paused && !old.practice_paused {
        println!("INFO: Practice paused");
    }
    if new.practice_active && old.practice_paused && !new.practice_paused {
        println!("INFO: Practice resumed");
    }
    if !old.practice_completed && new.practice_completed && old.practice_active {
        println!("INFO: Practice completed");
    }
    if !old.race_active && new.race_active {
        println!("INFO: Race started");
    }
    if old.race_active && new.race_paused && !old.race_paused {
        println!("INFO: Race paused");
    }
    if new.race_active && old.race_paused && !new.race_paused {
        println!("INFO: Race resumed");
    }
    if !old.race_completed && new.race_completed {
        println!("INFO: Race completed");
    }
    if new.completed_stints.len() > old.completed_stints.len() {
        if let Some(entry) = new.completed_stints.last() {
            println!(
                "INFO: Stint {} closed for {} after {}{}",
                entry.stint_number,
                entry.driver_name,
                helpers::general::format_hms(entry.actual_duration_ms),
                if entry.refuelled { " (refuelled)" } else { "" }
            );
        }
    }
    if !old.fuel_alert_active && new.fuel_alert_active {
        println!("WARNING: Fuel level below the warning threshold!");
    }
    if old.fuel_alert_active && !new.fuel_alert_active {
        println!("INFO: Fuel alert cleared");
    }
}

/// run_session drives the event loop: user events are applied as they arrive, and the
/// time-based re-evaluation fires at the tick interval whenever some sub-clock is
/// running. Snapshots are published at a bounded frequency for the display side.
/// Returns the final state once the event channel closes.
pub fn run_session<S: BlobStore>(
    mut runner: SessionRunner<S>,
    event_rx: Receiver<SessionEvent>,
    snapshot_tx: Option<&Sender<SessionSnapshot>>,
    tick_interval_ms: u64,
) -> RaceState {
    let snapshot_interval = Duration::from_secs_f64(1.0 / MAX_MONITOR_UPDATE_FREQUENCY);
    let mut last_snapshot = Instant::now() - snapshot_interval;

    loop {
        match event_rx.recv_timeout(Duration::from_millis(tick_interval_ms)) {
            Ok(event) => {
                runner.dispatch(&event, wall_clock_ms());
            }
            Err(RecvTimeoutError::Timeout) => {
                // ticks stop being issued when no timer is active on any sub-clock
                if runner.state.any_clock_running() {
                    runner.dispatch(&SessionEvent::Tick, wall_clock_ms());
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }

        if let Some(tx) = snapshot_tx {
            if last_snapshot.elapsed() >= snapshot_interval {
                let snapshot = SessionSnapshot::capture(&runner.state, wall_clock_ms());
                if tx.send(snapshot).is_err() {
                    break;
                }
                last_snapshot = Instant::now();
            }
        }
    }

    runner.into_state()
}
