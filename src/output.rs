//! CLI output formatting for conversion runs.
//!
//! Output is **album-centric**: every album leads with its positional index
//! and source name, and each photo is listed under it with its own index and
//! title. Failures are shown inline, under the entity they belong to.
//!
//! ```text
//! Found 2 albums
//! 001 broken.md
//!     Skipped: unreadable header: header is not closed by a `---` line
//! 002 summer.md
//!     Summer (2 photos, category Landscape)
//!     001 Beach 1 → content/portfolio/beach-1-1718000000001.md
//!     002 Beach 2 → content/portfolio/beach-2-1718000000002.md
//!     Deleted source
//!
//! Converted 1 album: 2 records created, 0 failed, 1 source deleted, 1 album skipped
//! ```
//!
//! An interrupted run stops between albums and says so:
//!
//! ```text
//! Interrupted, 3 albums not started
//!
//! Converted 1 album: 2 records created, 0 failed, 1 source deleted
//! Interrupted by user before all albums were converted
//! ```
//!
//! # Architecture
//!
//! [`format_event`] and [`format_summary`] return `Vec<String>` for
//! testability and have `print_*` wrappers that write to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::convert::{ConvertEvent, ConvertSummary};

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

/// Photo line: index and title, with a fallback for entries that never got
/// a title.
fn photo_line(index: usize, title: Option<&str>) -> String {
    match title {
        Some(t) if !t.is_empty() => format!("{}{} {}", indent(1), format_index(index), t),
        _ => format!("{}{} (image entry {})", indent(1), format_index(index), index),
    }
}

/// Format a single conversion event as display lines.
pub fn format_event(event: &ConvertEvent) -> Vec<String> {
    match event {
        ConvertEvent::Discovered { count } => {
            vec![format!("Found {}", plural(*count, "album", "albums"))]
        }
        ConvertEvent::NoInput => vec!["No album records found".to_string()],
        ConvertEvent::AlbumStarted { index, source } => {
            vec![format!("{} {}", format_index(*index), source)]
        }
        ConvertEvent::AlbumParsed {
            album_name,
            category,
            base_title: _,
            image_count,
        } => vec![format!(
            "{}{} ({}, category {})",
            indent(1),
            album_name,
            plural(*image_count, "photo", "photos"),
            category
        )],
        ConvertEvent::AlbumSkipped { reason, .. } => {
            vec![format!("{}Skipped: {}", indent(1), reason)]
        }
        ConvertEvent::NoImages { .. } => {
            vec![format!("{}No images, nothing to convert", indent(1))]
        }
        ConvertEvent::RecordCreated {
            index,
            title,
            location,
            ..
        } => vec![format!("{} → {}", photo_line(*index, Some(title)), location)],
        ConvertEvent::RecordPlanned {
            index, title, id, ..
        } => vec![format!(
            "{} (dry run, would write {})",
            photo_line(*index, Some(title)),
            id
        )],
        ConvertEvent::RecordFailed {
            index,
            title,
            reason,
            ..
        } => vec![
            photo_line(*index, title.as_deref()),
            format!("{}Failed: {}", indent(2), reason),
        ],
        ConvertEvent::SourceDeleted { .. } => vec![format!("{}Deleted source", indent(1))],
        ConvertEvent::SourceKept { failed, .. } => {
            if *failed == 0 {
                vec![format!("{}Kept source", indent(1))]
            } else {
                vec![format!(
                    "{}Kept source ({} failed)",
                    indent(1),
                    plural(*failed, "photo", "photos")
                )]
            }
        }
        ConvertEvent::DeleteFailed { reason, .. } => {
            vec![format!("{}Could not delete source: {}", indent(1), reason)]
        }
        ConvertEvent::AlbumFinished { .. } => Vec::new(),
        ConvertEvent::Cancelled { remaining } => vec![format!(
            "Interrupted, {} not started",
            plural(*remaining, "album", "albums")
        )],
    }
}

pub fn print_event(event: &ConvertEvent) {
    for line in format_event(event) {
        println!("{}", line);
    }
}

/// Format the closing summary of a run.
pub fn format_summary(summary: &ConvertSummary) -> Vec<String> {
    let mut lines = vec![String::new()];

    if summary.albums_found == 0 {
        lines.push("Nothing to convert".to_string());
        return lines;
    }

    let verb = if summary.dry_run {
        "Dry run: would convert"
    } else {
        "Converted"
    };
    let created = if summary.dry_run {
        "planned"
    } else {
        "created"
    };
    let mut line = format!(
        "{} {}: {} {}, {} failed",
        verb,
        plural(summary.albums_converted(), "album", "albums"),
        plural(summary.records_created, "record", "records"),
        created,
        summary.records_failed
    );
    if !summary.dry_run {
        line.push_str(&format!(
            ", {} deleted",
            plural(summary.sources_deleted, "source", "sources")
        ));
    }
    if summary.albums_skipped > 0 {
        line.push_str(&format!(
            ", {} skipped",
            plural(summary.albums_skipped, "album", "albums")
        ));
    }
    lines.push(line);

    if summary.delete_failures > 0 {
        lines.push(format!(
            "{} could not be deleted",
            plural(summary.delete_failures, "source", "sources")
        ));
    }

    if summary.cancelled {
        lines.push("Interrupted by user before all albums were converted".to_string());
    }

    let incomplete: Vec<&str> = summary
        .albums
        .iter()
        .filter(|a| a.failed > 0)
        .map(|a| a.source.as_str())
        .collect();
    if !incomplete.is_empty() {
        lines.push("Albums with failed photos:".to_string());
        for source in incomplete {
            lines.push(format!("{}{}", indent(1), source));
        }
    }
    lines
}

pub fn print_summary(summary: &ConvertSummary) {
    for line in format_summary(summary) {
        println!("{}", line);
    }
}
