use byte_unit::{Byte, UnitType};
use chrono::NaiveDateTime;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table};
use serde::Serialize;

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Output format for every report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Format storage bytes into a human-readable string
pub fn format_storage(bytes: u64) -> String {
    let byte = Byte::from_u64(bytes);
    let adjusted = byte.get_appropriate_unit(UnitType::Binary);
    format!("{:.1}", adjusted)
}

/// Bytes as GiB with one decimal, the unit used by the summary tables.
pub fn gb(bytes: u64) -> String {
    format!("{:.1}", bytes as f64 / GIB)
}

pub fn format_duration(duration: chrono::Duration) -> String {
    let secs = duration.num_seconds().max(0);
    format!("{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

pub fn format_time(ts: &NaiveDateTime) -> String {
    ts.format("%Y-%m-%d %H:%M").to_string()
}

/// Age as "N days" or "N hours", singular when N is 1.
pub fn format_age(age: chrono::Duration) -> String {
    let (value, unit) = if age.num_days() >= 1 {
        (age.num_days(), "day")
    } else {
        (age.num_hours(), "hour")
    };
    format!("{} {}{}", value, unit, if value == 1 { "" } else { "s" })
}

pub fn new_table<T: Into<comfy_table::Row>>(header: T) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(header);
    table
}

/// A title followed by a line of dashes of the same width.
pub fn underlined(title: &str) -> String {
    format!("{}\n{}", title, "-".repeat(title.chars().count()))
}
