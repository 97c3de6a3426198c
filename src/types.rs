//! Record types shared by the transformer, the backends and the driver.
//!
//! An album record is read from a frontmatter header and immediately
//! normalised into an [`AlbumRecord`] with every default applied, so nothing
//! downstream has to care which keys were actually present.

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use thiserror::Error;

pub const DEFAULT_ALBUM_NAME: &str = "Unnamed Album";
pub const DEFAULT_CATEGORY: &str = "Portrait";
pub const DEFAULT_BASE_TITLE: &str = "Photo";

/// An album header after defaults have been applied.
///
/// `images` keeps the raw YAML values: a malformed entry only costs that one
/// photo, so validation is deferred to the transformer.
#[derive(Debug, Clone, PartialEq)]
pub struct AlbumRecord {
    pub album_name: String,
    pub category: String,
    pub base_title: String,
    pub date: String,
    pub images: Vec<Value>,
}

/// A header that parsed but cannot describe an album.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct InvalidAlbum(pub String);

impl AlbumRecord {
    /// Build an album from a parsed header.
    ///
    /// `now` supplies the default date. Missing or `null` keys fall back to
    /// their defaults; `images` must be a sequence when present.
    pub fn from_header(header: &Mapping, now: &str) -> Result<Self, InvalidAlbum> {
        let images = match header.get("images") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Sequence(seq)) => seq.clone(),
            Some(other) => {
                return Err(InvalidAlbum(format!(
                    "`images` must be a list, found {}",
                    describe_value(other)
                )));
            }
        };

        Ok(Self {
            album_name: text_field(header, "albumName")
                .unwrap_or_else(|| DEFAULT_ALBUM_NAME.into()),
            category: text_field(header, "category").unwrap_or_else(|| DEFAULT_CATEGORY.into()),
            base_title: text_field(header, "baseTitle")
                .unwrap_or_else(|| DEFAULT_BASE_TITLE.into()),
            date: text_field(header, "date").unwrap_or_else(|| now.to_string()),
            images,
        })
    }
}

/// Read a scalar header field as text. Numbers and booleans are stringified;
/// `null`, sequences and mappings count as absent.
fn text_field(header: &Mapping, key: &str) -> Option<String> {
    match header.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Short human description of a YAML value's kind, for error messages.
pub fn describe_value(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

/// One photo, derived from one entry of an album's `images` list.
///
/// Field order matches the header written to disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioRecord {
    /// Storage identifier (`{slug}-{millis}`); not part of the header.
    #[serde(skip)]
    pub id: String,
    pub image: String,
    pub title: String,
    pub category: String,
    pub album: String,
    pub date: String,
}

/// Location of a record inside a backend.
///
/// `path` is whatever the backend needs to address the record again (a file
/// path locally, a repository path remotely); `name` is the bare file name
/// used for display.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordHandle {
    pub path: String,
    pub name: String,
}

impl RecordHandle {
    pub fn new(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for RecordHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path)
    }
}

/// Opaque marker for one version of a record, passed back on delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionToken(pub String);

impl VersionToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
