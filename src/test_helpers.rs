//! Shared test utilities for the album-convert test suite.
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! let store = local_store(&tmp);
//! // ... run a conversion ...
//! let records = read_portfolio(&tmp.path().join("portfolio"));
//! assert_eq!(titles(&records), vec!["Beach 1", "Beach 2"]);
//! ```

use std::path::Path;
use tempfile::TempDir;

use crate::backend::LocalBackend;
use crate::frontmatter;
use crate::types::AlbumRecord;

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/content/` to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/content");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

/// Local backend over `albums/` and `portfolio/` inside a fixture copy.
pub fn local_store(tmp: &TempDir) -> LocalBackend {
    LocalBackend::new(tmp.path().join("albums"), tmp.path().join("portfolio"))
}

// =========================================================================
// Record helpers
// =========================================================================

/// Build an album from a YAML header body (without the `---` fences).
/// Panics on invalid input. The fallback date is the literal `"now"`.
pub fn album(yaml: &str) -> AlbumRecord {
    let header: serde_yaml::Mapping = serde_yaml::from_str(yaml)
        .unwrap_or_else(|e| panic!("test album is not a YAML mapping: {e}"));
    AlbumRecord::from_header(&header, "now")
        .unwrap_or_else(|e| panic!("test album is invalid: {e}"))
}

/// Parse every portfolio record in `dir`, sorted by file name.
pub fn read_portfolio(dir: &Path) -> Vec<(String, serde_yaml::Mapping)> {
    let mut names: Vec<String> = match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => return Vec::new(),
    };
    names.sort();
    names
        .into_iter()
        .map(|name| {
            let text = std::fs::read_to_string(dir.join(&name)).unwrap();
            let header = frontmatter::parse(&text)
                .unwrap_or_else(|e| panic!("portfolio record {name} does not parse: {e}"));
            (name, header)
        })
        .collect()
}

/// A string field of a parsed record. Panics if missing.
pub fn field<'a>(header: &'a serde_yaml::Mapping, key: &str) -> &'a str {
    header
        .get(key)
        .and_then(|v| v.as_str())
        .unwrap_or_else(|| panic!("field '{key}' missing in {header:?}"))
}

/// Titles of parsed portfolio records, in file-name order.
pub fn titles(records: &[(String, serde_yaml::Mapping)]) -> Vec<&str> {
    records.iter().map(|(_, h)| field(h, "title")).collect()
}
