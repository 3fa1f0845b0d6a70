use crate::core::state::{CompletedStintEntry, RaceState};
use crate::core::TimestampMs;
use anyhow::Context;
use chrono::TimeZone;
use helpers::general::format_hms;
use std::fmt::Write;
use std::path::Path;

/// StintReport contains the completed-stint log in a form suitable for post-processing
/// the session.
#[derive(Debug, Clone)]
pub struct StintReport {
    pub entries: Vec<CompletedStintEntry>,
    pub race_completed: bool,
}

impl StintReport {
    pub fn from_state(state: &RaceState) -> StintReport {
        StintReport {
            entries: state.completed_stints.clone(),
            race_completed: state.race_completed,
        }
    }

    pub fn from_entries(entries: Vec<CompletedStintEntry>, race_completed: bool) -> StintReport {
        StintReport { entries, race_completed }
    }

    /// render formats the stint log as a console table.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for entry in self.entries.iter() {
            let planned = match entry.planned_duration_minutes {
                Some(minutes) => format!("{:>5.1}min", minutes),
                None => "      - ".to_string(),
            };
            writeln!(
                &mut out,
                "{:3}, {:<18} {} - {}, {:>9}, planned {}{}",
                entry.stint_number,
                entry.driver_name,
                format_wall(entry.start_time),
                format_wall(entry.end_time),
                format_hms(entry.actual_duration_ms),
                planned,
                if entry.refuelled { ", refuelled" } else { "" }
            )
            .unwrap();
        }
        out
    }

    /// print_stints prints the resulting stint log to the console output.
    pub fn print_stints(&self) {
        if self.entries.is_empty() {
            println!("RESULT: No completed stints");
            return;
        }
        println!(
            "RESULT: Completed stints{}",
            if self.race_completed { " (race completed)" } else { "" }
        );
        print!("{}", self.render());
    }

    /// write_csv exports the stint log as CSV and returns the path written.
    pub fn write_csv(&self, path: &Path) -> anyhow::Result<String> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).context(format!(
                    "Failed to create output directory {}!",
                    parent.display()
                ))?;
            }
        }
        let mut wtr = csv::Writer::from_path(path).context(format!(
            "Failed to create stint log file {}!",
            path.display()
        ))?;
        wtr.write_record(&[
            "stint",
            "driver_id",
            "driver_name",
            "start_ms",
            "end_ms",
            "duration_ms",
            "planned_minutes",
            "refuelled",
        ])?;
        for entry in self.entries.iter() {
            wtr.write_record(&[
                entry.stint_number.to_string(),
                entry.driver_id.clone(),
                entry.driver_name.clone(),
                entry.start_time.to_string(),
                entry.end_time.to_string(),
                entry.actual_duration_ms.to_string(),
                entry
                    .planned_duration_minutes
                    .map(|m| m.to_string())
                    .unwrap_or_default(),
                entry.refuelled.to_string(),
            ])?;
        }
        wtr.flush()?;
        Ok(path.to_string_lossy().into_owned())
    }
}

fn format_wall(ms: TimestampMs) -> String {
    match chrono::Local.timestamp_millis_opt(ms).single() {
        Some(dt) => dt.format("%H:%M:%S").to_string(),
        None => ms.to_string(),
    }
}
