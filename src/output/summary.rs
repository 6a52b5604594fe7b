use std::fmt::Write;

use comfy_table::Cell;

use crate::reference::ReferenceBuildRecord;

use super::styling::{bright, bright_green, bright_red, bright_yellow, dim};
use super::tables::{create_table, cyan_header, error_cell, reference_cell};

/// Prints a human-readable summary of a resolution to stdout.
///
/// Shows an overview table (owner build, reference build, resolution time)
/// followed by the decision trail. Error messages are highlighted in red.
pub fn print_summary(record: &ReferenceBuildRecord) {
    println!("{}", render_summary(record));
}

fn add_section_header(output: &mut String, emoji: &str, title: &str) {
    let _ = writeln!(output, "{} {}", bright(emoji), bright(title).underlined());
}

pub fn render_summary(record: &ReferenceBuildRecord) -> String {
    let mut output = String::new();

    add_section_header(&mut output, "📋", "Overview");
    let mut overview = create_table();
    overview.set_header(cyan_header(&["Build", "Reference Build", "Resolved At"]));
    overview.add_row(vec![
        Cell::new(&record.owner),
        reference_cell(record.reference.as_deref()),
        Cell::new(record.resolved_at.format("%Y-%m-%d %H:%M:%S UTC").to_string()),
    ]);
    let _ = writeln!(output, "{overview}\n");

    add_section_header(&mut output, "🧭", "Decision Trail");
    let mut trail = create_table();
    trail.set_header(cyan_header(&["#", "Level", "Message"]));
    for (index, message) in record.info_messages.iter().enumerate() {
        trail.add_row(vec![
            Cell::new(index + 1),
            Cell::new("info"),
            Cell::new(message),
        ]);
    }
    let offset = record.info_messages.len();
    for (index, message) in record.error_messages.iter().enumerate() {
        trail.add_row(vec![
            Cell::new(offset + index + 1),
            error_cell("error"),
            error_cell(message),
        ]);
    }
    let _ = writeln!(output, "{trail}\n");

    let verdict = match &record.reference {
        Some(id) => bright_green(format!("✓ Results will be compared against '{id}'")),
        None if record.error_messages.is_empty() => {
            bright_yellow("No reference build, comparison features are disabled".to_string())
        }
        None => bright_red("No reference build, see the errors above".to_string()),
    };
    let _ = writeln!(output, "{verdict}");
    let _ = write!(
        output,
        "{}",
        dim("Set RUST_LOG=info to mirror the decision trail to the log")
    );

    output
}
