//! Storage backends for album and portfolio records.
//!
//! The [`RecordStore`] trait defines the four operations every backend must
//! support: list albums, read a record, write a portfolio record, and delete a
//! record. The driver only ever talks to this trait.
//!
//! | Operation | [`LocalBackend`] | [`RemoteBackend`] |
//! |-----------|------------------|-------------------|
//! | list      | `*.md` files in the album directory | contents API listing of the album path |
//! | read      | file contents, SHA-256 as version token | base64 content, blob `sha` as version token |
//! | write     | create-new file in the portfolio directory | `PUT` without `sha` (create only) |
//! | delete    | remove file, token ignored | `DELETE` with `sha` precondition |

pub mod local;
pub mod remote;

pub use local::LocalBackend;
pub use remote::RemoteBackend;

use crate::frontmatter::FrontmatterError;
use crate::types::{PortfolioRecord, RecordHandle, VersionToken};
use remote::HttpFailure;
use thiserror::Error;

/// Why a backend operation failed.
#[derive(Error, Debug)]
pub enum Cause {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Http(#[from] HttpFailure),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("could not render record: {0}")]
    Render(#[from] FrontmatterError),
    #[error("a record already exists at this location")]
    AlreadyExists,
    #[error("{0}")]
    Invalid(String),
}

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("failed to list {path}: {source}")]
    List {
        path: String,
        #[source]
        source: Cause,
    },
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: Cause,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: Cause,
    },
    #[error("failed to delete {path}: {source}")]
    Delete {
        path: String,
        #[source]
        source: Cause,
    },
}

impl BackendError {
    pub fn list(path: impl Into<String>, source: impl Into<Cause>) -> Self {
        Self::List {
            path: path.into(),
            source: source.into(),
        }
    }

    pub fn read(path: impl Into<String>, source: impl Into<Cause>) -> Self {
        Self::Read {
            path: path.into(),
            source: source.into(),
        }
    }

    pub fn write(path: impl Into<String>, source: impl Into<Cause>) -> Self {
        Self::Write {
            path: path.into(),
            source: source.into(),
        }
    }

    pub fn delete(path: impl Into<String>, source: impl Into<Cause>) -> Self {
        Self::Delete {
            path: path.into(),
            source: source.into(),
        }
    }
}

/// Trait for record storage backends.
///
/// Implementations must never overwrite an existing record on write; an
/// identifier collision is reported as an error.
pub trait RecordStore {
    /// Enumerate candidate album records. Order is whatever the backend
    /// yields. A missing album location is an empty list, not an error.
    fn list_album_records(&self) -> Result<Vec<RecordHandle>, BackendError>;

    /// Fetch a record's full text and its current version token.
    fn read_record(&self, handle: &RecordHandle) -> Result<(String, VersionToken), BackendError>;

    /// Store a portfolio record under its identifier.
    fn write_portfolio_record(&self, record: &PortfolioRecord) -> Result<RecordHandle, BackendError>;

    /// Remove a record. Backends with optimistic concurrency refuse the delete
    /// when `token` no longer matches.
    fn delete_record(&self, handle: &RecordHandle, token: &VersionToken) -> Result<(), BackendError>;

    /// Where this backend reads and writes, for log and console output.
    fn location(&self) -> String;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::frontmatter;
    use std::collections::{BTreeMap, BTreeSet};
    use std::sync::Mutex;

    /// In-memory backend that records every operation.
    ///
    /// Albums live under `albums/{name}`; writes are stored by identifier.
    /// Failures can be injected per album name or per photo title.
    #[derive(Default)]
    pub struct MockStore {
        pub albums: Mutex<BTreeMap<String, String>>,
        pub written: Mutex<Vec<PortfolioRecord>>,
        pub operations: Mutex<Vec<RecordedOp>>,
        pub fail_reads: BTreeSet<String>,
        pub fail_writes: BTreeSet<String>,
        pub fail_deletes: bool,
        pub fail_list: bool,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        List,
        Read(String),
        Write(String),
        Delete { path: String, token: String },
    }

    impl MockStore {
        pub fn with_albums(albums: &[(&str, &str)]) -> Self {
            Self {
                albums: Mutex::new(
                    albums
                        .iter()
                        .map(|(name, text)| (name.to_string(), text.to_string()))
                        .collect(),
                ),
                ..Self::default()
            }
        }

        pub fn failing_writes(mut self, titles: &[&str]) -> Self {
            self.fail_writes = titles.iter().map(|t| t.to_string()).collect();
            self
        }

        pub fn failing_reads(mut self, names: &[&str]) -> Self {
            self.fail_reads = names.iter().map(|n| n.to_string()).collect();
            self
        }

        pub fn failing_deletes(mut self) -> Self {
            self.fail_deletes = true;
            self
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }

        pub fn deleted_paths(&self) -> Vec<String> {
            self.get_operations()
                .into_iter()
                .filter_map(|op| match op {
                    RecordedOp::Delete { path, .. } => Some(path),
                    _ => None,
                })
                .collect()
        }

        pub fn written_titles(&self) -> Vec<String> {
            self.written
                .lock()
                .unwrap()
                .iter()
                .map(|r| r.title.clone())
                .collect()
        }

        pub fn remaining_albums(&self) -> Vec<String> {
            self.albums.lock().unwrap().keys().cloned().collect()
        }
    }

    fn token_for(text: &str) -> VersionToken {
        VersionToken(format!("v{}", text.len()))
    }

    fn unauthorized() -> HttpFailure {
        HttpFailure::new(401, None, "Bad credentials".into())
    }

    impl RecordStore for MockStore {
        fn list_album_records(&self) -> Result<Vec<RecordHandle>, BackendError> {
            self.operations.lock().unwrap().push(RecordedOp::List);
            if self.fail_list {
                return Err(BackendError::list("albums", unauthorized()));
            }
            Ok(self
                .albums
                .lock()
                .unwrap()
                .keys()
                .map(|name| RecordHandle::new(format!("albums/{name}"), name.clone()))
                .collect())
        }

        fn read_record(
            &self,
            handle: &RecordHandle,
        ) -> Result<(String, VersionToken), BackendError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Read(handle.path.clone()));
            if self.fail_reads.contains(&handle.name) {
                return Err(BackendError::read(&handle.path, unauthorized()));
            }
            let albums = self.albums.lock().unwrap();
            let text = albums
                .get(&handle.name)
                .ok_or_else(|| BackendError::NotFound(handle.path.clone()))?;
            Ok((text.clone(), token_for(text)))
        }

        fn write_portfolio_record(
            &self,
            record: &PortfolioRecord,
        ) -> Result<RecordHandle, BackendError> {
            let path = format!("portfolio/{}.md", record.id);
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Write(path.clone()));
            if self.fail_writes.contains(&record.title) {
                return Err(BackendError::write(&path, unauthorized()));
            }
            // Must be renderable like a real backend would store it
            frontmatter::render(record).map_err(|e| BackendError::write(&path, e))?;
            let mut written = self.written.lock().unwrap();
            if written.iter().any(|r| r.id == record.id) {
                return Err(BackendError::write(&path, Cause::AlreadyExists));
            }
            written.push(record.clone());
            Ok(RecordHandle::new(path, format!("{}.md", record.id)))
        }

        fn delete_record(
            &self,
            handle: &RecordHandle,
            token: &VersionToken,
        ) -> Result<(), BackendError> {
            self.operations.lock().unwrap().push(RecordedOp::Delete {
                path: handle.path.clone(),
                token: token.as_str().to_string(),
            });
            if self.fail_deletes {
                return Err(BackendError::delete(
                    &handle.path,
                    HttpFailure::new(409, None, "sha does not match".into()),
                ));
            }
            self.albums
                .lock()
                .unwrap()
                .remove(&handle.name)
                .map(|_| ())
                .ok_or_else(|| BackendError::NotFound(handle.path.clone()))
        }

        fn location(&self) -> String {
            "mock".to_string()
        }
    }

    #[test]
    fn mock_records_operations() {
        let store = MockStore::with_albums(&[("a.md", "---\nimages: []\n---\n")]);
        let handles = store.list_album_records().unwrap();
        assert_eq!(handles, vec![RecordHandle::new("albums/a.md", "a.md")]);

        let (_, token) = store.read_record(&handles[0]).unwrap();
        store.delete_record(&handles[0], &token).unwrap();

        assert_eq!(
            store.get_operations(),
            vec![
                RecordedOp::List,
                RecordedOp::Read("albums/a.md".into()),
                RecordedOp::Delete {
                    path: "albums/a.md".into(),
                    token: token.0,
                },
            ]
        );
        assert!(store.remaining_albums().is_empty());
    }

    #[test]
    fn mock_rejects_duplicate_ids() {
        let store = MockStore::default();
        let record = PortfolioRecord {
            id: "x-1".into(),
            image: "x.jpg".into(),
            title: "X 1".into(),
            category: "c".into(),
            album: "a".into(),
            date: "d".into(),
        };
        store.write_portfolio_record(&record).unwrap();
        let err = store.write_portfolio_record(&record).unwrap_err();
        assert!(matches!(
            err,
            BackendError::Write {
                source: Cause::AlreadyExists,
                ..
            }
        ));
    }

    #[test]
    fn error_messages_name_the_path() {
        let err = BackendError::write("portfolio/x.md", unauthorized());
        let msg = err.to_string();
        assert!(msg.contains("portfolio/x.md"), "{msg}");
        assert!(msg.contains("401"), "{msg}");
    }
}
