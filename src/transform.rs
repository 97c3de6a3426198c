//! Album → portfolio fan-out.
//!
//! One album with K images becomes K portfolio records, in image order:
//!
//! ```text
//! albumName: Summer          image: a.jpg        image: b.jpg
//! baseTitle: Beach     →     title: Beach 1      title: Beach 2
//! images: [a.jpg, b.jpg]     album: Summer       album: Summer
//! ```
//!
//! Category and date are copied unchanged. The 1-based index always follows
//! the entry's position in the source list, so a malformed entry that gets
//! skipped leaves a gap in the numbering instead of shifting later titles.

use crate::clock::Clock;
use crate::naming;
use crate::types::{AlbumRecord, PortfolioRecord, describe_value};
use serde_yaml::Value;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageError {
    #[error("image entry is {0}, expected a string")]
    NotAString(&'static str),
    #[error("image entry is empty")]
    Empty,
}

/// An image entry that produced no record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedImage {
    /// 1-based position in the album's `images` list.
    pub index: usize,
    pub error: ImageError,
}

/// Result of transforming one album.
#[derive(Debug, Default)]
pub struct Fanout {
    pub records: Vec<PortfolioRecord>,
    pub skipped: Vec<SkippedImage>,
}

impl Fanout {
    /// The album listed no images at all.
    pub fn no_images(&self) -> bool {
        self.image_count() == 0
    }

    /// Number of entries in the album's `images` list.
    pub fn image_count(&self) -> usize {
        self.records.len() + self.skipped.len()
    }
}

/// Title of the photo at 1-based `index`.
pub fn photo_title(base_title: &str, index: usize) -> String {
    format!("{base_title} {index}")
}

fn image_reference(entry: &Value) -> Result<&str, ImageError> {
    match entry {
        Value::String(s) if s.trim().is_empty() => Err(ImageError::Empty),
        Value::String(s) => Ok(s),
        other => Err(ImageError::NotAString(describe_value(other))),
    }
}

/// Fan an album out into one portfolio record per image.
///
/// The clock is read once per record, so identifiers of consecutive records
/// differ whenever the clock has ticked between them.
pub fn transform(album: &AlbumRecord, clock: &impl Clock) -> Fanout {
    let mut fanout = Fanout::default();

    for (i, entry) in album.images.iter().enumerate() {
        let index = i + 1;
        let image = match image_reference(entry) {
            Ok(image) => image,
            Err(error) => {
                fanout.skipped.push(SkippedImage { index, error });
                continue;
            }
        };

        let title = photo_title(&album.base_title, index);
        fanout.records.push(PortfolioRecord {
            id: naming::record_id(&title, clock.now_millis()),
            image: image.to_string(),
            title,
            category: album.category.clone(),
            album: album.album_name.clone(),
            date: album.date.clone(),
        });
    }

    fanout
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::tests::{FixedClock, SteppingClock};
    use crate::test_helpers::album;

    #[test]
    fn summer_beach_scenario() {
        let album = album(
            "albumName: Summer\ncategory: Landscape\nbaseTitle: Beach\nimages: [a.jpg, b.jpg]\ndate: 2024-01-01\n",
        );
        let fanout = transform(&album, &SteppingClock::starting_at(1_000));

        assert!(fanout.skipped.is_empty());
        assert_eq!(
            fanout.records,
            vec![
                PortfolioRecord {
                    id: "beach-1-1000".into(),
                    image: "a.jpg".into(),
                    title: "Beach 1".into(),
                    category: "Landscape".into(),
                    album: "Summer".into(),
                    date: "2024-01-01".into(),
                },
                PortfolioRecord {
                    id: "beach-2-1001".into(),
                    image: "b.jpg".into(),
                    title: "Beach 2".into(),
                    category: "Landscape".into(),
                    album: "Summer".into(),
                    date: "2024-01-01".into(),
                },
            ]
        );
    }

    #[test]
    fn k_images_give_k_records_in_order() {
        let images: Vec<String> = (0..7).map(|n| format!("  - img{n}.jpg")).collect();
        let album = album(&format!(
            "baseTitle: Shot\ncategory: Voyage\nalbumName: Rome\ndate: d\nimages:\n{}\n",
            images.join("\n")
        ));
        let fanout = transform(&album, &FixedClock(5));

        assert_eq!(fanout.records.len(), 7);
        for (i, record) in fanout.records.iter().enumerate() {
            assert_eq!(record.title, format!("Shot {}", i + 1));
            assert_eq!(record.image, format!("img{i}.jpg"));
            assert_eq!(record.category, "Voyage");
            assert_eq!(record.album, "Rome");
            assert_eq!(record.date, "d");
        }
    }

    #[test]
    fn no_images_gives_no_records() {
        for header in ["albumName: Empty\n", "images: []\n", "images: ~\n"] {
            let fanout = transform(&album(header), &FixedClock(1));
            assert!(fanout.no_images(), "{header:?}");
            assert!(fanout.records.is_empty());
        }
    }

    #[test]
    fn defaults_flow_into_records() {
        let fanout = transform(&album("images: [x.jpg]\n"), &FixedClock(42));
        let record = &fanout.records[0];
        assert_eq!(record.title, "Photo 1");
        assert_eq!(record.category, "Portrait");
        assert_eq!(record.album, "Unnamed Album");
        assert_eq!(record.id, "photo-1-42");
    }

    #[test]
    fn malformed_entries_skipped_numbering_kept() {
        let album = album("baseTitle: P\nimages:\n  - a.jpg\n  - 12\n  - ''\n  - {url: x}\n  - e.jpg\n");
        let fanout = transform(&album, &FixedClock(1));

        let titles: Vec<&str> = fanout.records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["P 1", "P 5"]);
        assert_eq!(
            fanout.skipped,
            vec![
                SkippedImage {
                    index: 2,
                    error: ImageError::NotAString("a number"),
                },
                SkippedImage {
                    index: 3,
                    error: ImageError::Empty,
                },
                SkippedImage {
                    index: 4,
                    error: ImageError::NotAString("a mapping"),
                },
            ]
        );
        assert_eq!(fanout.image_count(), 5);
        assert!(!fanout.no_images());
    }

    #[test]
    fn identical_base_titles_differ_by_timestamp() {
        let a = transform(&album("baseTitle: Photo\nimages: [a.jpg]\n"), &FixedClock(100));
        let b = transform(&album("baseTitle: Photo\nimages: [b.jpg]\n"), &FixedClock(101));
        assert_eq!(a.records[0].title, b.records[0].title);
        assert_ne!(a.records[0].id, b.records[0].id);
    }
}
