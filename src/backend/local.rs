//! Local filesystem backend.
//!
//! Albums are the `*.md` files directly inside the album directory (no
//! recursion); portfolio records are written as `{id}.md` into the portfolio
//! directory, which is created on first write.

use super::{BackendError, Cause, RecordStore};
use crate::frontmatter;
use crate::naming;
use crate::types::{PortfolioRecord, RecordHandle, VersionToken};
use sha2::{Digest, Sha256};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct LocalBackend {
    albums_dir: PathBuf,
    portfolio_dir: PathBuf,
}

impl LocalBackend {
    pub fn new(albums_dir: impl Into<PathBuf>, portfolio_dir: impl Into<PathBuf>) -> Self {
        Self {
            albums_dir: albums_dir.into(),
            portfolio_dir: portfolio_dir.into(),
        }
    }

    pub fn albums_dir(&self) -> &Path {
        &self.albums_dir
    }

    pub fn portfolio_dir(&self) -> &Path {
        &self.portfolio_dir
    }
}

fn display(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// SHA-256 of a record's bytes, hex-encoded.
fn content_token(bytes: &[u8]) -> VersionToken {
    VersionToken(format!("{:x}", Sha256::digest(bytes)))
}

impl RecordStore for LocalBackend {
    fn list_album_records(&self) -> Result<Vec<RecordHandle>, BackendError> {
        if !self.albums_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut handles = Vec::new();
        for entry in WalkDir::new(&self.albums_dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| {
                BackendError::list(display(&self.albums_dir), std::io::Error::from(e))
            })?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type().is_file() && naming::is_record_file(&name) {
                handles.push(RecordHandle::new(display(entry.path()), name));
            }
        }
        Ok(handles)
    }

    fn read_record(&self, handle: &RecordHandle) -> Result<(String, VersionToken), BackendError> {
        let bytes = fs::read(&handle.path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => BackendError::NotFound(handle.path.clone()),
            _ => BackendError::read(&handle.path, e),
        })?;
        let token = content_token(&bytes);
        let text = String::from_utf8(bytes).map_err(|_| {
            BackendError::read(&handle.path, Cause::Invalid("not valid UTF-8".into()))
        })?;
        Ok((text, token))
    }

    fn write_portfolio_record(&self, record: &PortfolioRecord) -> Result<RecordHandle, BackendError> {
        let name = naming::record_file_name(&record.id);
        let path = self.portfolio_dir.join(&name);
        let shown = display(&path);

        let content = frontmatter::render(record).map_err(|e| BackendError::write(&shown, e))?;
        fs::create_dir_all(&self.portfolio_dir).map_err(|e| BackendError::write(&shown, e))?;

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => BackendError::write(&shown, Cause::AlreadyExists),
                _ => BackendError::write(&shown, e),
            })?;
        file.write_all(content.as_bytes())
            .map_err(|e| BackendError::write(&shown, e))?;

        Ok(RecordHandle::new(shown, name))
    }

    /// Local deletes are unconditional; the version token is not checked.
    fn delete_record(&self, handle: &RecordHandle, _token: &VersionToken) -> Result<(), BackendError> {
        fs::remove_file(&handle.path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => BackendError::NotFound(handle.path.clone()),
            _ => BackendError::delete(&handle.path, e),
        })
    }

    fn location(&self) -> String {
        format!(
            "{} → {}",
            self.albums_dir.display(),
            self.portfolio_dir.display()
        )
    }
}
