//! Note summary projection.
//!
//! # Responsibility
//! - Define listing filters (category, text search, calendar-date search).
//! - Derive preview text the same way the storage query does.
//! - Fan out change events so listings can re-query after every committed
//!   write.
//!
//! # Invariants
//! - Summaries are computed from current rows on every query; nothing here is
//!   cached or stored.
//! - Change events are published only after the write transaction commits.

use crate::model::note::{FullNote, NoteId, NoteSummary};
use chrono::{NaiveDate, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Mutex, PoisonError};

static DATE_QUERY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4})(\d{2})?(\d{2})?$").expect("valid date query regex")
});

const DATE_QUERY_MIN_YEAR: i32 = 1900;
const DATE_QUERY_MAX_YEAR: i32 = 2100;

/// Inclusive epoch-millisecond range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start_ms: i64,
    pub end_ms: i64,
}

/// Listing filter. Set conditions combine as
/// `category AND (text OR updated_between)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SummaryFilter {
    pub category_id: Option<String>,
    /// Substring matched against titles and text block bodies. ASCII letters
    /// match case-insensitively.
    pub text: Option<String>,
    pub updated_between: Option<DateRange>,
}

impl SummaryFilter {
    /// Every note.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn in_category(category_id: impl Into<String>) -> Self {
        Self {
            category_id: Some(category_id.into()),
            ..Self::default()
        }
    }

    /// Text search; a blank query matches every note.
    pub fn text(query: &str) -> Self {
        let trimmed = query.trim();
        Self {
            text: (!trimmed.is_empty()).then(|| trimmed.to_string()),
            ..Self::default()
        }
    }

    /// Text search that also matches notes modified within the calendar range
    /// named by an all-digit query (`yyyy`, `yyyymm`, `yyyymmdd`).
    pub fn smart_search(query: &str) -> Self {
        Self {
            updated_between: parse_date_query(query),
            ..Self::text(query)
        }
    }
}

/// Parses `yyyy`, `yyyymm` or `yyyymmdd` (UTC) into an inclusive range.
///
/// Returns `None` for anything else, including impossible dates.
pub fn parse_date_query(query: &str) -> Option<DateRange> {
    let caps = DATE_QUERY_RE.captures(query.trim())?;
    let year: i32 = caps[1].parse().ok()?;
    if !(DATE_QUERY_MIN_YEAR..=DATE_QUERY_MAX_YEAR).contains(&year) {
        return None;
    }
    let month = caps.get(2).map(|m| m.as_str().parse::<u32>()).transpose().ok()?;
    let day = caps.get(3).map(|m| m.as_str().parse::<u32>()).transpose().ok()?;

    let (start, next) = match (month, day) {
        (None, _) => (
            NaiveDate::from_ymd_opt(year, 1, 1)?,
            NaiveDate::from_ymd_opt(year + 1, 1, 1)?,
        ),
        (Some(month), None) => {
            let start = NaiveDate::from_ymd_opt(year, month, 1)?;
            let next = if month == 12 {
                NaiveDate::from_ymd_opt(year + 1, 1, 1)?
            } else {
                NaiveDate::from_ymd_opt(year, month + 1, 1)?
            };
            (start, next)
        }
        (Some(month), Some(day)) => {
            let start = NaiveDate::from_ymd_opt(year, month, day)?;
            (start, start.succ_opt()?)
        }
    };

    Some(DateRange {
        start_ms: midnight_ms(start)?,
        end_ms: midnight_ms(next)? - 1,
    })
}

fn midnight_ms(date: NaiveDate) -> Option<i64> {
    let naive = date.and_hms_opt(0, 0, 0)?;
    Some(Utc.from_utc_datetime(&naive).timestamp_millis())
}

/// Joins text bodies with single spaces, in the given order.
pub fn join_preview<'a>(bodies: impl IntoIterator<Item = &'a str>) -> String {
    bodies.into_iter().collect::<Vec<_>>().join(" ")
}

/// Projects an in-memory full note; matches what the storage query returns.
pub fn summarize(full: &FullNote) -> NoteSummary {
    let mut blocks: Vec<_> = full.blocks.iter().collect();
    blocks.sort_by_key(|block| block.order());
    NoteSummary {
        id: full.note.id,
        title: full.note.title.clone(),
        preview: join_preview(blocks.iter().filter_map(|block| block.text_body())),
        last_modified: full.note.updated_at,
        block_count: full.blocks.len() as u32,
        category_id: full.note.category_id.clone(),
    }
}

/// Committed write that may change one or more summaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteChange {
    Saved { note_id: NoteId, version: i64 },
    Deleted { note_id: NoteId },
    CategoryChanged { category_id: String },
}

/// Subscriber registry for [`NoteChange`] events.
#[derive(Debug, Default)]
pub struct SummaryFeed {
    subscribers: Mutex<Vec<Sender<NoteChange>>>,
}

impl SummaryFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener. Dropping the receiver unsubscribes it.
    pub fn subscribe(&self) -> Receiver<NoteChange> {
        let (tx, rx) = channel();
        self.lock().push(tx);
        rx
    }

    /// Delivers `change` to every live subscriber.
    pub fn publish(&self, change: NoteChange) {
        self.lock()
            .retain(|subscriber| subscriber.send(change.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Sender<NoteChange>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::{join_preview, parse_date_query, summarize, NoteChange, SummaryFeed, SummaryFilter};
    use crate::model::block::{BlockKind, ContentBlock};
    use crate::model::note::{FullNote, Note};
    use uuid::Uuid;

    #[test]
    fn date_query_covers_whole_year_month_and_day() {
        let year = parse_date_query("2025").unwrap();
        assert_eq!(year.start_ms, 1_735_689_600_000);
        assert_eq!(year.end_ms, 1_767_225_600_000 - 1);

        let february = parse_date_query("202402").unwrap();
        assert_eq!(february.end_ms - february.start_ms + 1, 29 * 86_400_000);

        let day = parse_date_query("20250315").unwrap();
        assert_eq!(day.end_ms - day.start_ms + 1, 86_400_000);
    }

    #[test]
    fn date_query_rejects_non_dates() {
        assert_eq!(parse_date_query("hello"), None);
        assert_eq!(parse_date_query("20251"), None);
        assert_eq!(parse_date_query("202513"), None);
        assert_eq!(parse_date_query("20250230"), None);
        assert_eq!(parse_date_query("1800"), None);
    }

    #[test]
    fn smart_search_keeps_text_and_adds_range() {
        let filter = SummaryFilter::smart_search(" 202503 ");
        assert_eq!(filter.text.as_deref(), Some("202503"));
        assert!(filter.updated_between.is_some());

        let plain = SummaryFilter::smart_search("groceries");
        assert_eq!(plain.updated_between, None);
        assert_eq!(SummaryFilter::text("   ").text, None);
    }

    #[test]
    fn preview_joins_text_bodies_only() {
        let note = Note::new("mixed");
        let blocks = vec![
            ContentBlock::new(note.id, BlockKind::text("Hello "), 0).unwrap(),
            ContentBlock::new(note.id, BlockKind::image("a.jpg", None, None), 1).unwrap(),
            ContentBlock::new(note.id, BlockKind::text("world"), 2).unwrap(),
        ];
        let summary = summarize(&FullNote::new(note, blocks).unwrap());
        assert_eq!(summary.preview, "Hello  world");
        assert_eq!(summary.block_count, 3);
        assert_eq!(join_preview(Vec::<&str>::new()), "");
    }

    #[test]
    fn feed_drops_closed_subscribers() {
        let feed = SummaryFeed::new();
        let live = feed.subscribe();
        let closed = feed.subscribe();
        drop(closed);

        let note_id = Uuid::new_v4();
        feed.publish(NoteChange::Deleted { note_id });
        assert_eq!(live.try_recv().unwrap(), NoteChange::Deleted { note_id });
        assert_eq!(feed.subscriber_count(), 1);
    }
}
