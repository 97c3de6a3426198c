//! # album-convert
//!
//! Turns album records into portfolio records. An album is a markdown file
//! whose YAML header lists several photos with shared metadata; the converter
//! writes one portfolio record per photo and optionally removes the album.
//!
//! ```text
//! content/albums/summer.md            content/portfolio/beach-1-1718000000000.md
//! ---                                 ---
//! albumName: Summer             →     image: a.jpg
//! baseTitle: Beach                    title: Beach 1
//! images: [a.jpg, b.jpg]              ...
//! ---                                 content/portfolio/beach-2-1718000000001.md
//! ```
//!
//! The same pipeline runs against a local checkout or, through the GitHub
//! contents API, against the repository itself.
//!
//! # Pipeline
//!
//! ```text
//! Discover  list album records        (RecordStore::list_album_records)
//! Read      fetch text + version      (RecordStore::read_record)
//! Parse     YAML header → AlbumRecord (frontmatter, types)
//! Fan out   one record per image      (transform)
//! Write     create-only               (RecordStore::write_portfolio_record)
//! Delete    per DeletePolicy          (RecordStore::delete_record)
//! ```
//!
//! Processing is sequential. Failures are scoped: a bad image fails one
//! record, a bad album is skipped, and only a failure to list albums stops
//! the run.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`convert`] | Batch driver: discovery, per-album processing, delete policy, summary |
//! | [`transform`] | Fan-out of one album into portfolio records |
//! | [`backend`] | `RecordStore` trait with local filesystem and GitHub implementations |
//! | [`frontmatter`] | `---` delimited YAML header parsing and rendering |
//! | [`types`] | Album and portfolio records, handles, version tokens |
//! | [`naming`] | Slugs and portfolio record identifiers |
//! | [`clock`] | Timestamp source for identifiers and default dates |
//! | [`config`] | Layered `album-convert.toml` configuration |
//! | [`output`] | CLI output formatting for progress events and summaries |

pub mod backend;
pub mod clock;
pub mod config;
pub mod convert;
pub mod frontmatter;
pub mod naming;
pub mod output;
pub mod transform;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
