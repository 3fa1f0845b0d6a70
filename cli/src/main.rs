use chrono::{Local, NaiveTime, TimeZone};
use clap::Parser;
use helpers::general::{format_hms, format_mmss};
use racetime::core::config::StintEntry;
use racetime::core::event::SessionEvent;
use racetime::core::handle_session::{run_session, wall_clock_ms, SessionRunner};
use racetime::interfaces::monitor::{SessionPhase, SessionSnapshot};
use racetime::interfaces::store::{self, FileStore};
use racetime::post::stint_report::StintReport;
use racetime::pre::read_config::read_config;
use racetime::pre::session_opts::SessionOpts;
use std::io::BufRead;
use std::thread;

enum Command {
    Event(SessionEvent),
    Status,
    Stints,
    Help,
    Quit,
    Invalid(String),
}

fn main() -> anyhow::Result<()> {
    // PRE-PROCESSING ------------------------------------------------------------------------------
    // get session options from the command line arguments
    let opts: SessionOpts = SessionOpts::parse();
    let mut file_store = FileStore::new(&opts.store_dir);

    // configuration precedence: an explicit file wins over the stored blob
    let config = if let Some(path) = &opts.config_path {
        println!("INFO: Reading race configuration from {:?}", path);
        read_config(path)?
    } else if let Some(stored) = store::load_config(&file_store) {
        println!("INFO: Reusing the stored race configuration");
        stored
    } else {
        anyhow::bail!("No race configuration available! Use -c <path_to_json> on the first run.");
    };
    store::save_config(&mut file_store, &config)?;

    println!(
        "INFO: {} drivers, {} planned stints, race duration {:.0}min",
        config.drivers.len(),
        config.stint_sequence.len(),
        config.race_duration_minutes
    );

    let mut runner = SessionRunner::load_or_init(file_store, config, wall_clock_ms());
    runner.print_events = true;
    runner.debug = opts.debug;

    // EXECUTION -----------------------------------------------------------------------------------
    let (event_tx, event_rx) = flume::unbounded();
    let (snapshot_tx, snapshot_rx) = flume::unbounded();

    // run the timing loop in a worker thread; the console owns the main thread
    let tick_interval_ms = opts.tick_interval_ms;
    let session_handle =
        thread::spawn(move || run_session(runner, event_rx, Some(&snapshot_tx), tick_interval_ms));

    println!("INFO: Console ready, type 'help' for the command list");
    let stdin = std::io::stdin();
    let mut last_snapshot: Option<SessionSnapshot> = None;

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };
        while let Ok(snapshot) = snapshot_rx.try_recv() {
            last_snapshot = Some(snapshot);
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match parse_command(trimmed, last_snapshot.as_ref()) {
            Command::Quit => break,
            Command::Help => print_help(),
            Command::Status => print_status(last_snapshot.as_ref()),
            Command::Stints => match last_snapshot.as_ref() {
                Some(snapshot) => {
                    let completed = snapshot.phase == SessionPhase::RaceCompleted;
                    StintReport::from_entries(snapshot.completed_stints.clone(), completed)
                        .print_stints()
                }
                None => println!("RESULT: No completed stints"),
            },
            Command::Event(event) => {
                if event_tx.send(event).is_err() {
                    break;
                }
            }
            Command::Invalid(msg) => println!("WARNING: {}", msg),
        }
    }

    // closing the event channel ends the timing loop
    drop(event_tx);
    let final_state = session_handle.join().expect("Timing thread panicked!");

    // POST-PROCESSING -----------------------------------------------------------------------------
    let report = StintReport::from_state(&final_state);
    report.print_stints();
    if let Some(path) = &opts.export_csv {
        match report.write_csv(path) {
            Ok(written) => println!("INFO: Stint log exported to {}", written),
            Err(e) => println!("WARNING: Failed to export the stint log: {:#}", e),
        }
    }

    Ok(())
}

/// parse_command maps one console line onto a session command. "pause" and "resume"
/// address whichever phase the latest snapshot shows as active.
fn parse_command(line: &str, snapshot: Option<&SessionSnapshot>) -> Command {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let keyword = tokens[0].to_lowercase();

    let practice_phase = matches!(
        snapshot.map(|s| &s.phase),
        Some(SessionPhase::Practice) | Some(SessionPhase::PracticePaused)
    );

    match keyword.as_str() {
        "help" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        "status" | "s" => Command::Status,
        "stints" => Command::Stints,
        "start-practice" => Command::Event(SessionEvent::StartPractice),
        "complete-practice" => Command::Event(SessionEvent::CompletePractice),
        "reset-practice" => Command::Event(SessionEvent::ResetPractice),
        "start-race" => Command::Event(SessionEvent::StartRace),
        "complete-race" => Command::Event(SessionEvent::CompleteRace),
        "reset-race" => Command::Event(SessionEvent::ResetRace),
        "pause" => Command::Event(if practice_phase {
            SessionEvent::PausePractice
        } else {
            SessionEvent::PauseRace
        }),
        "resume" => Command::Event(if practice_phase {
            SessionEvent::ResumePractice
        } else {
            SessionEvent::ResumeRace
        }),
        "swap" => parse_swap(&tokens[1..]),
        "refuel" => Command::Event(SessionEvent::Refuel { at: None }),
        "stint-start" => match tokens.get(1).and_then(|raw| parse_clock_time(raw)) {
            Some(start_time) => Command::Event(SessionEvent::EditStintStartTime { start_time }),
            None => Command::Invalid("Usage: stint-start <HH:MM:SS>".into()),
        },
        "official" => match tokens.get(1) {
            Some(&"clear") => Command::Event(SessionEvent::SetOfficialStartTime { start_time: None }),
            Some(raw) => Command::Event(SessionEvent::SetOfficialStartTime {
                start_time: Some((*raw).to_owned()),
            }),
            None => Command::Invalid("Usage: official <RFC-3339 timestamp|clear>".into()),
        },
        "add-stint" => match tokens.get(1) {
            Some(driver_id) => Command::Event(SessionEvent::AddStint {
                index: None,
                entry: StintEntry {
                    driver_id: (*driver_id).to_owned(),
                    planned_duration_minutes: tokens.get(2).and_then(|m| m.parse().ok()),
                },
            }),
            None => Command::Invalid("Usage: add-stint <driver_id> [minutes]".into()),
        },
        "edit-stint" => match (
            tokens.get(1).and_then(|i| i.parse::<usize>().ok()),
            tokens.get(2),
        ) {
            (Some(index), Some(driver_id)) => Command::Event(SessionEvent::EditStint {
                index,
                entry: StintEntry {
                    driver_id: (*driver_id).to_owned(),
                    planned_duration_minutes: tokens.get(3).and_then(|m| m.parse().ok()),
                },
            }),
            _ => Command::Invalid("Usage: edit-stint <index> <driver_id> [minutes]".into()),
        },
        "del-stint" => match tokens.get(1).and_then(|i| i.parse::<usize>().ok()) {
            Some(index) => Command::Event(SessionEvent::DeleteStint { index }),
            None => Command::Invalid("Usage: del-stint <index>".into()),
        },
        "move-stint" => match (
            tokens.get(1).and_then(|i| i.parse::<usize>().ok()),
            tokens.get(2).and_then(|i| i.parse::<usize>().ok()),
        ) {
            (Some(from), Some(to)) => Command::Event(SessionEvent::MoveStint { from, to }),
            _ => Command::Invalid("Usage: move-stint <from> <to>".into()),
        },
        _ => Command::Invalid(format!("Unknown command '{}', type 'help'", keyword)),
    }
}

/// parse_swap handles: swap [refuel] [at HH:MM:SS] [plan MINUTES]
fn parse_swap(args: &[&str]) -> Command {
    let mut refuel = false;
    let mut swap_time = None;
    let mut next_planned_minutes = None;

    let mut i = 0;
    while i < args.len() {
        match args[i].to_lowercase().as_str() {
            "refuel" => refuel = true,
            "at" => {
                i += 1;
                swap_time = args.get(i).and_then(|raw| parse_clock_time(raw));
                if swap_time.is_none() {
                    return Command::Invalid("Usage: swap [refuel] [at HH:MM:SS] [plan MINUTES]".into());
                }
            }
            "plan" => {
                i += 1;
                next_planned_minutes = args.get(i).and_then(|raw| raw.parse::<f64>().ok());
                if next_planned_minutes.is_none() {
                    return Command::Invalid("Usage: swap [refuel] [at HH:MM:SS] [plan MINUTES]".into());
                }
            }
            _ => return Command::Invalid("Usage: swap [refuel] [at HH:MM:SS] [plan MINUTES]".into()),
        }
        i += 1;
    }

    Command::Event(SessionEvent::SwapDriver { swap_time, refuel, next_planned_minutes })
}

/// parse_clock_time interprets "HH:MM:SS" as today's local wall-clock time.
fn parse_clock_time(raw: &str) -> Option<i64> {
    let time = NaiveTime::parse_from_str(raw, "%H:%M:%S").ok()?;
    let date_time = Local::now().date_naive().and_time(time);
    Local
        .from_local_datetime(&date_time)
        .single()
        .map(|dt| dt.timestamp_millis())
}

fn print_status(snapshot: Option<&SessionSnapshot>) {
    let snapshot = match snapshot {
        Some(s) => s,
        None => {
            println!("STATUS: No snapshot received yet");
            return;
        }
    };

    println!("STATUS: Phase: {}", snapshot.phase.label());
    if let Some(driver) = &snapshot.current_driver {
        println!("STATUS: Driver: {} (stint {})", driver, snapshot.stint_number);
    }
    if let (Some(elapsed), Some(remaining)) = (snapshot.stint_elapsed_ms, snapshot.stint_remaining_ms) {
        println!(
            "STATUS: Stint: {} elapsed, {} to plan",
            format_hms(elapsed),
            format_hms(remaining)
        );
    }
    if let Some(remaining) = snapshot.practice_remaining_ms {
        println!("STATUS: Practice remaining: {}", format_hms(remaining));
    }
    if let (Some(elapsed), Some(remaining)) = (snapshot.race_elapsed_ms, snapshot.race_remaining_ms) {
        println!(
            "STATUS: Race: {} elapsed, {} remaining",
            format_hms(elapsed),
            format_hms(remaining)
        );
    }
    println!(
        "STATUS: Fuel: {} ({:.0}%){}",
        format_mmss(snapshot.fuel_remaining_ms),
        snapshot.fuel_fraction * 100.0,
        if snapshot.fuel_alert_active { " FUEL WARNING" } else { "" }
    );
    if let Some(checkup) = snapshot.next_checkup_in_ms {
        println!("STATUS: Next driver checkup in {}", format_mmss(checkup));
    }
    println!("STATUS: Completed stints: {}", snapshot.completed_stints.len());
}

fn print_help() {
    println!("Commands:");
    println!("  start-practice | complete-practice | reset-practice");
    println!("  start-race | complete-race | reset-race");
    println!("  pause | resume                pause/resume the active phase");
    println!("  swap [refuel] [at HH:MM:SS] [plan MINUTES]");
    println!("                                hand over to the next driver");
    println!("  refuel                        reset the fuel clock");
    println!("  stint-start <HH:MM:SS>        correct the running stint start");
    println!("  official <RFC-3339|clear>     set or clear the official start");
    println!("  add-stint <driver> [min]      append a planned stint");
    println!("  edit-stint <idx> <driver> [min]");
    println!("  del-stint <idx> | move-stint <from> <to>");
    println!("  status | stints | help | quit");
}
