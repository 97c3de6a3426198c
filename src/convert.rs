//! Batch conversion of album records into portfolio records.
//!
//! The driver runs three phases against any [`RecordStore`]:
//!
//! ```text
//! Discover   list album records          (none → NoInput, clean exit)
//! Process    per album: read → parse → transform → write ×N → delete?
//! Report     ConvertSummary returned to the caller
//! ```
//!
//! Every failure below the discover step is contained: a bad album is
//! reported and skipped, a failed write is reported and the next image is
//! attempted. Nothing is retried and nothing is rolled back. Progress is
//! published as [`ConvertEvent`]s on an optional channel and mirrored to
//! `tracing`, so callers can render it however they like.
//!
//! ## Deleting source albums
//!
//! What happens to an album after its fan-out is governed by [`DeletePolicy`].
//! Albums skipped before the write loop (unreadable, bad header, no images)
//! are never deleted under any policy.
//!
//! ## Cancellation
//!
//! A [`CancelToken`] is checked before each album, never inside one, so an
//! album is either fully processed (writes and delete) or not touched.

use crate::backend::{BackendError, RecordStore};
use crate::clock::Clock;
use crate::frontmatter;
use crate::transform::{self, Fanout, SkippedImage};
use crate::types::{AlbumRecord, PortfolioRecord, RecordHandle};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("could not discover albums: {0}")]
    Discover(#[from] BackendError),
}

/// When to remove a source album after writing its portfolio records.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum DeletePolicy {
    /// Keep every source album.
    Never,
    /// Delete only when every image produced a record and every write
    /// succeeded.
    #[default]
    AfterAllWrites,
    /// Delete once the write loop has run, whatever its outcome.
    Always,
}

impl DeletePolicy {
    /// Whether an album whose write loop ended with `failed` failures should
    /// be deleted.
    pub fn allows_delete(self, failed: usize) -> bool {
        match self {
            Self::Never => false,
            Self::AfterAllWrites => failed == 0,
            Self::Always => true,
        }
    }
}

/// Shared flag asking a running conversion to stop before its next album.
///
/// Clones share the flag, so one can live in a signal handler while another
/// travels with [`ConvertOptions`].
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    pub delete_policy: DeletePolicy,
    /// Read, parse and transform, but never write or delete.
    pub dry_run: bool,
    pub cancel: CancelToken,
}

/// Progress of a conversion run, in the order things happen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConvertEvent {
    Discovered {
        count: usize,
    },
    NoInput,
    AlbumStarted {
        index: usize,
        source: String,
    },
    AlbumParsed {
        album_name: String,
        category: String,
        base_title: String,
        image_count: usize,
    },
    AlbumSkipped {
        source: String,
        reason: String,
    },
    NoImages {
        source: String,
    },
    RecordCreated {
        index: usize,
        total: usize,
        title: String,
        location: String,
    },
    RecordPlanned {
        index: usize,
        total: usize,
        title: String,
        id: String,
    },
    RecordFailed {
        index: usize,
        total: usize,
        title: Option<String>,
        reason: String,
    },
    SourceDeleted {
        source: String,
    },
    SourceKept {
        source: String,
        failed: usize,
    },
    DeleteFailed {
        source: String,
        reason: String,
    },
    AlbumFinished {
        source: String,
        created: usize,
        total: usize,
    },
    /// The run was interrupted; `remaining` albums were never started.
    Cancelled {
        remaining: usize,
    },
}

/// Outcome of one album that reached the write loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumSummary {
    pub source: String,
    pub album_name: String,
    pub images: usize,
    pub created: usize,
    pub failed: usize,
    pub deleted: bool,
    pub delete_failed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConvertSummary {
    pub albums_found: usize,
    pub albums_skipped: usize,
    pub records_created: usize,
    pub records_failed: usize,
    pub sources_deleted: usize,
    pub delete_failures: usize,
    pub dry_run: bool,
    /// Stopped early; counts cover only the albums processed before that.
    pub cancelled: bool,
    pub albums: Vec<AlbumSummary>,
}

impl ConvertSummary {
    /// Albums that made it to the write loop.
    pub fn albums_converted(&self) -> usize {
        self.albums.len()
    }
}

fn emit(events: &Option<Sender<ConvertEvent>>, event: ConvertEvent) {
    if let Some(tx) = events {
        // A dropped receiver only means nobody is watching
        tx.send(event).ok();
    }
}

/// Run a full conversion against `store`.
///
/// Only a failure to list albums is returned as an error; everything else is
/// reported through `events` and counted in the summary.
pub fn convert(
    store: &impl RecordStore,
    clock: &impl Clock,
    options: &ConvertOptions,
    events: Option<Sender<ConvertEvent>>,
) -> Result<ConvertSummary, ConvertError> {
    let mut summary = ConvertSummary {
        dry_run: options.dry_run,
        ..ConvertSummary::default()
    };

    info!(location = %store.location(), "discovering albums");
    let handles = store.list_album_records()?;
    summary.albums_found = handles.len();

    if handles.is_empty() {
        info!("no album records found");
        emit(&events, ConvertEvent::NoInput);
        return Ok(summary);
    }
    emit(
        &events,
        ConvertEvent::Discovered {
            count: handles.len(),
        },
    );

    for (i, handle) in handles.iter().enumerate() {
        if options.cancel.is_cancelled() {
            let remaining = handles.len() - i;
            warn!(remaining, "conversion interrupted");
            summary.cancelled = true;
            emit(&events, ConvertEvent::Cancelled { remaining });
            break;
        }
        emit(
            &events,
            ConvertEvent::AlbumStarted {
                index: i + 1,
                source: handle.name.clone(),
            },
        );
        match convert_album(store, clock, options, handle, &events) {
            Some(album) => {
                summary.records_created += album.created;
                summary.records_failed += album.failed;
                if album.deleted {
                    summary.sources_deleted += 1;
                }
                if album.delete_failed {
                    summary.delete_failures += 1;
                }
                summary.albums.push(album);
            }
            None => summary.albums_skipped += 1,
        }
    }

    info!(
        albums = summary.albums_found,
        created = summary.records_created,
        failed = summary.records_failed,
        deleted = summary.sources_deleted,
        "conversion finished"
    );
    Ok(summary)
}

/// Read, parse and fan out one album. `None` means the album was skipped
/// before any write was attempted.
fn convert_album(
    store: &impl RecordStore,
    clock: &impl Clock,
    options: &ConvertOptions,
    handle: &RecordHandle,
    events: &Option<Sender<ConvertEvent>>,
) -> Option<AlbumSummary> {
    let source = handle.name.clone();
    let skip = |reason: String| {
        warn!(album = %handle, %reason, "skipping album");
        emit(
            events,
            ConvertEvent::AlbumSkipped {
                source: source.clone(),
                reason,
            },
        );
    };

    let (text, token) = match store.read_record(handle) {
        Ok(read) => read,
        Err(e) => {
            skip(e.to_string());
            return None;
        }
    };
    let header = match frontmatter::parse(&text) {
        Ok(header) => header,
        Err(e) => {
            skip(format!("unreadable header: {e}"));
            return None;
        }
    };
    let album = match AlbumRecord::from_header(&header, &clock.now_iso()) {
        Ok(album) => album,
        Err(e) => {
            skip(format!("invalid album: {e}"));
            return None;
        }
    };

    info!(
        album = %album.album_name,
        category = %album.category,
        images = album.images.len(),
        "converting album"
    );
    emit(
        events,
        ConvertEvent::AlbumParsed {
            album_name: album.album_name.clone(),
            category: album.category.clone(),
            base_title: album.base_title.clone(),
            image_count: album.images.len(),
        },
    );

    let fanout = transform::transform(&album, clock);
    if fanout.no_images() {
        warn!(album = %handle, "album has no images");
        emit(events, ConvertEvent::NoImages { source });
        return None;
    }

    let total = fanout.image_count();
    let mut created = 0;
    let mut failed = 0;
    for entry in in_source_order(&fanout) {
        match entry {
            Entry::Skipped(skipped) => {
                warn!(album = %handle, index = skipped.index, error = %skipped.error, "skipping image");
                failed += 1;
                emit(
                    events,
                    ConvertEvent::RecordFailed {
                        index: skipped.index,
                        total,
                        title: None,
                        reason: skipped.error.to_string(),
                    },
                );
            }
            Entry::Record(index, record) if options.dry_run => {
                debug!(id = %record.id, "planned record");
                created += 1;
                emit(
                    events,
                    ConvertEvent::RecordPlanned {
                        index,
                        total,
                        title: record.title.clone(),
                        id: record.id.clone(),
                    },
                );
            }
            Entry::Record(index, record) => match store.write_portfolio_record(record) {
                Ok(written) => {
                    debug!(id = %record.id, location = %written, "created record");
                    created += 1;
                    emit(
                        events,
                        ConvertEvent::RecordCreated {
                            index,
                            total,
                            title: record.title.clone(),
                            location: written.path,
                        },
                    );
                }
                Err(e) => {
                    warn!(title = %record.title, error = %e, "failed to write record");
                    failed += 1;
                    emit(
                        events,
                        ConvertEvent::RecordFailed {
                            index,
                            total,
                            title: Some(record.title.clone()),
                            reason: e.to_string(),
                        },
                    );
                }
            },
        }
    }

    let mut deleted = false;
    let mut delete_failed = false;
    if !options.dry_run {
        if options.delete_policy.allows_delete(failed) {
            match store.delete_record(handle, &token) {
                Ok(()) => {
                    info!(album = %handle, "deleted source album");
                    deleted = true;
                    emit(
                        events,
                        ConvertEvent::SourceDeleted {
                            source: source.clone(),
                        },
                    );
                }
                Err(e) => {
                    warn!(album = %handle, error = %e, "failed to delete source album");
                    delete_failed = true;
                    emit(
                        events,
                        ConvertEvent::DeleteFailed {
                            source: source.clone(),
                            reason: e.to_string(),
                        },
                    );
                }
            }
        } else if options.delete_policy != DeletePolicy::Never {
            info!(album = %handle, failed, "keeping source album after failures");
            emit(
                events,
                ConvertEvent::SourceKept {
                    source: source.clone(),
                    failed,
                },
            );
        }
    }

    emit(
        events,
        ConvertEvent::AlbumFinished {
            source: source.clone(),
            created,
            total,
        },
    );
    Some(AlbumSummary {
        source,
        album_name: album.album_name,
        images: total,
        created,
        failed,
        deleted,
        delete_failed,
    })
}

enum Entry<'a> {
    Record(usize, &'a PortfolioRecord),
    Skipped(&'a SkippedImage),
}

/// Interleave records and skipped entries back into `images` order.
fn in_source_order(fanout: &Fanout) -> Vec<Entry<'_>> {
    let mut skipped = fanout.skipped.iter().peekable();
    let mut records = fanout.records.iter();
    let mut entries = Vec::with_capacity(fanout.image_count());
    for index in 1..=fanout.image_count() {
        if let Some(s) = skipped.next_if(|s| s.index == index) {
            entries.push(Entry::Skipped(s));
        } else if let Some(record) = records.next() {
            entries.push(Entry::Record(index, record));
        }
    }
    entries
}
