//! Output formatting utilities for the CLI.

use console::{measure_text_width, pad_str, style, truncate_str, Alignment};

use certstat_core::models::ListingStatus;

/// Prints a table header with the given columns.
pub fn print_table_header(columns: &[(&str, usize)]) {
    let header: String = columns
        .iter()
        .map(|(name, width)| pad_str(name, *width, Alignment::Left, None).into_owned())
        .collect::<Vec<_>>()
        .join(" ");
    println!("{}", style(header).bold());

    let total_width: usize = columns.iter().map(|(_, w)| w + 1).sum();
    println!("{}", "-".repeat(total_width.saturating_sub(1)));
}

/// Prints a table row. Cells wider than their column are cut with `...`.
pub fn print_table_row(values: &[(&str, usize)]) {
    println!("{}", format_row(values));
}

fn format_row(values: &[(&str, usize)]) -> String {
    values
        .iter()
        .map(|(val, width)| {
            // Emoji cells are two columns wide, so measure display width
            if measure_text_width(val) > *width {
                truncate_str(val, *width, "...").into_owned()
            } else {
                pad_str(val, *width, Alignment::Left, None).into_owned()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end()
        .to_string()
}

/// Prints a key-value pair with consistent formatting.
pub fn print_key_value(key: &str, value: &str) {
    println!("{:<18}{}", format!("{}:", key), value);
}

/// Prints a section header.
pub fn print_section(title: &str) {
    println!();
    println!("{}", style(title).bold().underlined());
}

pub fn print_success(message: &str) {
    println!("{} {}", style("✓").green(), message);
}

pub fn print_info(message: &str) {
    println!("{} {}", style("ℹ").blue(), message);
}

pub fn print_warning(message: &str) {
    eprintln!("{} {}", style("⚠").yellow(), message);
}

/// Colors a listing status for terminal display.
pub fn styled_status(status: ListingStatus) -> String {
    match status {
        ListingStatus::Signed => style(status.as_str()).green().to_string(),
        ListingStatus::Revoked => style(status.as_str()).red().to_string(),
        ListingStatus::Unknown => style(status.as_str()).yellow().to_string(),
    }
}
