/// min_to_ms converts a duration given in minutes to whole milliseconds.
pub fn min_to_ms(minutes: f64) -> i64 {
    (minutes * 60_000.0).round() as i64
}

/// format_hms formats a millisecond duration as "HH:MM:SS". Negative durations are
/// treated as zero.
pub fn format_hms(ms: i64) -> String {
    let total_secs = ms.max(0) / 1000;
    let h = total_secs / 3600;
    let m = (total_secs % 3600) / 60;
    let s = total_secs % 60;
    format!("{:02}:{:02}:{:02}", h, m, s)
}

/// format_mmss formats a millisecond duration as "MM:SS" for the shorter sub-clocks
/// (stint and fuel displays).
pub fn format_mmss(ms: i64) -> String {
    let total_secs = ms.max(0) / 1000;
    let m = total_secs / 60;
    let s = total_secs % 60;
    format!("{:02}:{:02}", m, s)
}
