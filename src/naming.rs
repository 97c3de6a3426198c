//! Identifier generation for portfolio records.
//!
//! Every portfolio record is stored under `{slug}-{millis}.md`, where the slug
//! comes from its title and `millis` is the creation time in milliseconds
//! since the Unix epoch:
//!
//! - `"Beach 1"` at `1704067200000` → `beach-1-1704067200000.md`
//! - `"L'été à Nice 3"` → `lété-à-nice-3-…`
//! - `"Photo -- 2"` → `photo-2-…`
//!
//! Titles repeat freely across albums, so the timestamp is what keeps
//! identifiers apart. Two records with the same title created within the same
//! millisecond would collide; backends refuse to overwrite in that case.

/// File extension of every record this tool reads or writes.
pub const RECORD_EXTENSION: &str = "md";

/// Turn a title into a URL-safe slug.
///
/// - Lower-cases the title
/// - Drops everything except word characters (letters, digits, `_`),
///   whitespace and `-`
/// - Collapses each run of whitespace and dashes into a single `-`
///
/// Leading or trailing separators are kept as a single dash; titles built as
/// `"{base} {n}"` never have them.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut in_separator = false;
    for c in title.to_lowercase().chars() {
        if c.is_whitespace() || c == '-' {
            if !in_separator {
                slug.push('-');
            }
            in_separator = true;
        } else if c.is_alphanumeric() || c == '_' {
            slug.push(c);
            in_separator = false;
        }
    }
    slug
}

/// Storage identifier for a record: `{slug}-{millis}`.
pub fn record_id(title: &str, millis: i64) -> String {
    format!("{}-{}", slugify(title), millis)
}

/// File name for a record identifier.
pub fn record_file_name(id: &str) -> String {
    format!("{id}.{RECORD_EXTENSION}")
}

/// Whether a file name carries the record extension (case-insensitive).
pub fn is_record_file(name: &str) -> bool {
    std::path::Path::new(name)
        .extension()
        .map(|e| e.eq_ignore_ascii_case(RECORD_EXTENSION))
        .unwrap_or(false)
}
