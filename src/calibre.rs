mod filter;
mod library;

pub use filter::{BOOKS_TABLE, CalibreFilter, LANG_PARAM, TAG_PARAM, compose};
pub use library::{CalibreLibrary, METADATA_DB};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Book record from the Calibre `books` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibreBook {
    /// Book ID.
    pub id: i64,
    /// Book title.
    pub title: String,
    /// Title sort key.
    pub sort: Option<String>,
    /// Author sort key.
    pub author_sort: Option<String>,
    /// Date added to the library (Calibre text timestamp).
    pub timestamp: Option<String>,
    /// Publication date (Calibre text timestamp).
    pub pubdate: Option<String>,
    /// Last metadata change (Calibre text timestamp).
    pub last_modified: Option<String>,
    /// Position in series.
    pub series_index: Option<f64>,
    /// Directory of the book, relative to the library root.
    pub path: String,
    /// Calibre UUID.
    pub uuid: Option<String>,
    /// Whether a cover.jpg exists.
    pub has_cover: bool,
}

impl CalibreBook {
    /// Date added, parsed.
    pub fn added_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp.as_deref().and_then(parse_calibre_timestamp)
    }

    /// Publication date, parsed.
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        self.pubdate.as_deref().and_then(parse_calibre_timestamp)
    }
}

/// Row of the Calibre `languages` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    /// Language ID (the value of a language selector).
    pub id: i64,
    /// ISO 639 code, e.g. "eng".
    pub lang_code: String,
}

/// Row of the Calibre `tags` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Tag ID (the value of a tag selector).
    pub id: i64,
    /// Tag name.
    pub name: String,
}

/// One page of a book listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    /// Entries on this page.
    pub entries: Vec<T>,
    /// Zero-based page index.
    pub page: u32,
    /// Number of matching rows over all pages.
    pub total: u64,
    /// Number of pages.
    pub pages: u32,
}

impl<T> Page<T> {
    pub(crate) fn new(entries: Vec<T>, page: u32, page_size: u32, total: u64) -> Self {
        let pages = total.div_ceil(u64::from(page_size));
        Self {
            entries,
            page,
            total,
            pages: u32::try_from(pages).unwrap_or(u32::MAX),
        }
    }
}

/// Column used to order "recent" listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TitleTimeSort {
    /// Date the book was added.
    #[default]
    Timestamp,
    /// Publication date.
    Pubdate,
    /// Last metadata change.
    Lastmodified,
}

impl TitleTimeSort {
    /// Column name in the `books` table.
    pub fn column(&self) -> &'static str {
        match self {
            TitleTimeSort::Timestamp => "timestamp",
            TitleTimeSort::Pubdate => "pubdate",
            TitleTimeSort::Lastmodified => "last_modified",
        }
    }

    /// Parse a setting value.
    pub fn from_setting(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "timestamp" => Some(TitleTimeSort::Timestamp),
            "pubdate" => Some(TitleTimeSort::Pubdate),
            "lastmodified" => Some(TitleTimeSort::Lastmodified),
            _ => None,
        }
    }
}

/// Parse a Calibre timestamp such as `2017-04-04 22:11:03.123456+00:00`.
pub fn parse_calibre_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f%:z")
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}
