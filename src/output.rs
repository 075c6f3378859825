//! Output rows, the run-wide row buffer, and CSV serialization.

use chrono::{DateTime, Utc};
use log::info;
use serde::{Serialize, Serializer};
use std::path::Path;

use crate::error::ScrapeError;

/// CSV header, in column order.
pub const COLUMNS: [&str; 21] = [
    "tweet_id",
    "user",
    "created_at",
    "post_text",
    "lang",
    "ViewCount",
    "quoteCount",
    "likeCount",
    "replyCount",
    "retweetCount",
    "bookmarkCount",
    "is_retweet",
    "is_quote",
    "is_reply",
    "reply_to_id",
    "reply_to_user",
    "reply_to_text",
    "original_tweet_id",
    "original_tweet_user",
    "original_tweet_text",
    "is_mutual_followership",
];

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Whether two accounts follow each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Mutuality {
    #[serde(rename = "Mutual")]
    Mutual,
    #[serde(rename = "Not Mutual")]
    NotMutual,
}

impl Mutuality {
    pub fn from_bool(mutual: bool) -> Self {
        if mutual {
            Mutuality::Mutual
        } else {
            Mutuality::NotMutual
        }
    }
}

/// One flattened CSV row. Field order matches [`COLUMNS`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputRow {
    pub tweet_id: String,
    pub user: String,
    #[serde(serialize_with = "serialize_timestamp")]
    pub created_at: DateTime<Utc>,
    pub post_text: String,
    pub lang: String,
    #[serde(rename = "ViewCount")]
    pub view_count: Option<u64>,
    #[serde(rename = "quoteCount")]
    pub quote_count: Option<u64>,
    #[serde(rename = "likeCount")]
    pub like_count: Option<u64>,
    #[serde(rename = "replyCount")]
    pub reply_count: Option<u64>,
    #[serde(rename = "retweetCount")]
    pub retweet_count: Option<u64>,
    #[serde(rename = "bookmarkCount")]
    pub bookmark_count: Option<u64>,
    pub is_retweet: bool,
    pub is_quote: bool,
    pub is_reply: bool,
    pub reply_to_id: Option<String>,
    pub reply_to_user: Option<String>,
    pub reply_to_text: Option<String>,
    pub original_tweet_id: Option<String>,
    pub original_tweet_user: Option<String>,
    pub original_tweet_text: Option<String>,
    pub is_mutual_followership: Mutuality,
}

fn serialize_timestamp<S: Serializer>(
    value: &DateTime<Utc>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&value.format(TIMESTAMP_FORMAT))
}

/// Rows collected over a run, in emission order.
#[derive(Debug, Default)]
pub struct RowBuffer {
    rows: Vec<OutputRow>,
}

impl RowBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, row: OutputRow) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows in emission order.
    #[cfg(test)]
    pub(crate) fn rows(&self) -> &[OutputRow] {
        &self.rows
    }

    /// Consumes the buffer, returning rows stably sorted by (user, created_at).
    pub fn into_sorted(self) -> Vec<OutputRow> {
        let mut rows = self.rows;
        rows.sort_by(|a, b| {
            a.user
                .cmp(&b.user)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        rows
    }
}

/// Writes `rows` as CSV to any writer: header first, no index column.
pub fn write_rows<W: std::io::Write>(writer: W, rows: &[OutputRow]) -> Result<(), ScrapeError> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    csv_writer.write_record(COLUMNS)?;
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Sorts the buffer and writes it to `path`.
pub fn save_csv(buffer: RowBuffer, path: &Path) -> Result<usize, ScrapeError> {
    let rows = buffer.into_sorted();
    let file = std::fs::File::create(path)?;
    write_rows(std::io::BufWriter::new(file), &rows)?;
    info!("Data saved to {} ({} rows)", path.display(), rows.len());
    Ok(rows.len())
}
