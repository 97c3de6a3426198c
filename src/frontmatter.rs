//! Frontmatter header parsing and rendering.
//!
//! Album and portfolio records share one text format: a YAML mapping between
//! two `---` delimiter lines, followed by an optional free-form body that this
//! tool never looks at.
//!
//! ```text
//! ---
//! albumName: Summer
//! images:
//!   - a.jpg
//!   - b.jpg
//! ---
//! ```
//!
//! The opening delimiter must be the very first line (a UTF-8 BOM is skipped).
//! Delimiter lines may carry trailing whitespace and CRLF endings; anything
//! else on the line makes it a body line, not a delimiter.

use serde::Serialize;
use serde_yaml::{Mapping, Value};
use thiserror::Error;

const DELIMITER: &str = "---";

#[derive(Error, Debug)]
pub enum FrontmatterError {
    #[error("record does not start with a `---` header line")]
    MissingOpening,
    #[error("header is not closed by a `---` line")]
    MissingClosing,
    #[error("header is not valid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("header must be a key/value mapping, found {0}")]
    NotAMapping(&'static str),
}

/// Split `text` into its raw header body and the rest of the record.
fn split(text: &str) -> Result<(&str, &str), FrontmatterError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let (first, mut rest) = match text.split_once('\n') {
        Some((first, rest)) => (first, rest),
        None => (text, ""),
    };
    if !is_delimiter(first) {
        return Err(FrontmatterError::MissingOpening);
    }

    let header_start = rest;
    let mut offset = 0;
    loop {
        if rest.is_empty() {
            return Err(FrontmatterError::MissingClosing);
        }
        let (line, remainder, consumed) = match rest.split_once('\n') {
            Some((line, remainder)) => (line, remainder, line.len() + 1),
            None => (rest, "", rest.len()),
        };
        if is_delimiter(line) {
            return Ok((&header_start[..offset], remainder));
        }
        offset += consumed;
        rest = remainder;
    }
}

fn is_delimiter(line: &str) -> bool {
    line.trim_end() == DELIMITER
}

/// Parse the header of a record into a key/value mapping.
///
/// Missing keys are not an error here; callers apply their own defaults.
/// Sequence values keep their source order.
pub fn parse(text: &str) -> Result<Mapping, FrontmatterError> {
    let (header, _body) = split(text)?;
    if header.trim().is_empty() {
        return Err(FrontmatterError::NotAMapping("null"));
    }
    let value: Value = serde_yaml::from_str(header)?;
    match value {
        Value::Mapping(mapping) => Ok(mapping),
        other => Err(FrontmatterError::NotAMapping(crate::types::describe_value(
            &other,
        ))),
    }
}

/// Render a value as a header-only record.
///
/// Output always parses back with [`parse`] into the same fields, whatever
/// characters the values contain, because serialisation goes through YAML
/// quoting rather than string interpolation.
pub fn render<T: Serialize>(fields: &T) -> Result<String, FrontmatterError> {
    let yaml = serde_yaml::to_string(fields)?;
    Ok(format!("{DELIMITER}\n{yaml}{DELIMITER}\n"))
}
