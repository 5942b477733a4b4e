//! Day buckets for transaction and payout history
//!
//! History screens show records under headers such as `TODAY`,
//! `YESTERDAY, JAN 11, 2024` or `Monday, Jan 1, 2024`. [`group_by_date`]
//! computes those buckets as a snapshot relative to an injected `now`; callers
//! regroup whenever they need fresh labels.

use std::collections::BTreeMap;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    #[error("Invalid timestamp {value:?} on record {record_id}")]
    InvalidTimestamp { record_id: String, value: String },
}

/// Timestamp as it arrives from the record source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawTimestamp<'a> {
    /// Unix seconds
    Unix(i64),
    /// Unix milliseconds
    UnixMillis(i64),
    /// RFC 3339 as returned by the payments backend, or an ISO 8601 local
    /// date-time (`T` or space separated) or plain date
    Text(&'a str),
}

impl RawTimestamp<'_> {
    /// Parse into an instant, reading offset-less text as UTC
    pub fn parse(&self) -> Option<DateTime<Utc>> {
        self.parse_in(&Utc)
    }

    /// Parse into an instant, reading offset-less text in `tz`
    ///
    /// `None` if unparseable, out of range, or a local time skipped by a DST
    /// transition.
    pub fn parse_in<Tz: TimeZone>(&self, tz: &Tz) -> Option<DateTime<Utc>> {
        match *self {
            RawTimestamp::Unix(secs) => DateTime::from_timestamp(secs, 0),
            RawTimestamp::UnixMillis(millis) => DateTime::from_timestamp_millis(millis),
            RawTimestamp::Text(text) => {
                let text = text.trim();
                if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
                    return Some(dt.with_timezone(&Utc));
                }
                let naive = parse_naive(text)?;
                tz.from_local_datetime(&naive)
                    .earliest()
                    .map(|dt| dt.with_timezone(&Utc))
            }
        }
    }

    fn describe(&self) -> String {
        match *self {
            RawTimestamp::Unix(secs) => secs.to_string(),
            RawTimestamp::UnixMillis(millis) => format!("{}ms", millis),
            RawTimestamp::Text(text) => text.to_string(),
        }
    }
}

fn parse_naive(text: &str) -> Option<NaiveDateTime> {
    const DATE_TIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

    DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// Anything with an identifier and a timestamp
pub trait TimestampedRecord {
    fn record_id(&self) -> &str;
    fn timestamp(&self) -> RawTimestamp<'_>;
}

/// What to do with a record whose timestamp does not parse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InvalidTimestampPolicy {
    /// Fail the whole call with [`HistoryError::InvalidTimestamp`]
    #[default]
    Reject,
    /// Leave the record out and report it in [`GroupedHistory::skipped`]
    Skip,
}

/// Records sharing one calendar day
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket<R> {
    pub label: String,
    pub date: NaiveDate,
    /// Newest first
    pub items: Vec<R>,
}

/// A record left out under [`InvalidTimestampPolicy::Skip`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord<R> {
    pub record: R,
    pub error: HistoryError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupedHistory<R> {
    /// Newest day first
    pub buckets: Vec<Bucket<R>>,
    /// Input order
    pub skipped: Vec<SkippedRecord<R>>,
}

impl<R> GroupedHistory<R> {
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Number of records placed in buckets
    pub fn record_count(&self) -> usize {
        self.buckets.iter().map(|b| b.items.len()).sum()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.buckets.iter().map(|b| b.label.as_str()).collect()
    }
}

/// Header for records on `date`, seen from `today`
pub fn bucket_label(date: NaiveDate, today: NaiveDate) -> String {
    if date == today {
        "TODAY".to_string()
    } else if today.pred_opt() == Some(date) {
        date.format("Yesterday, %b %-d, %Y").to_string().to_uppercase()
    } else {
        date.format("%A, %b %-d, %Y").to_string()
    }
}

/// Group records into day buckets relative to `now`
///
/// Calendar days are taken in `now`'s time zone. Items inside a bucket are
/// ordered newest first; equal timestamps keep their input order.
pub fn group_by_date<R, I, Tz>(
    records: I,
    now: &DateTime<Tz>,
    policy: InvalidTimestampPolicy,
) -> Result<GroupedHistory<R>, HistoryError>
where
    R: TimestampedRecord,
    I: IntoIterator<Item = R>,
    Tz: TimeZone,
{
    let tz = now.timezone();
    let today = now.date_naive();

    let mut days: BTreeMap<NaiveDate, Vec<(DateTime<Utc>, R)>> = BTreeMap::new();
    let mut skipped = Vec::new();

    for record in records {
        let raw = record.timestamp();
        let Some(instant) = raw.parse_in(&tz) else {
            let error = HistoryError::InvalidTimestamp {
                record_id: record.record_id().to_string(),
                value: raw.describe(),
            };
            match policy {
                InvalidTimestampPolicy::Reject => return Err(error),
                InvalidTimestampPolicy::Skip => {
                    log::warn!("Skipping history record: {}", error);
                    skipped.push(SkippedRecord { record, error });
                    continue;
                }
            }
        };

        let date = instant.with_timezone(&tz).date_naive();
        days.entry(date).or_default().push((instant, record));
    }

    let buckets = days
        .into_iter()
        .rev()
        .map(|(date, mut entries)| {
            entries.sort_by(|a, b| b.0.cmp(&a.0));
            Bucket {
                label: bucket_label(date, today),
                date,
                items: entries.into_iter().map(|(_, record)| record).collect(),
            }
        })
        .collect();

    Ok(GroupedHistory { buckets, skipped })
}

/// [`group_by_date`] against the device clock and time zone
pub fn group_by_date_local<R, I>(
    records: I,
    policy: InvalidTimestampPolicy,
) -> Result<GroupedHistory<R>, HistoryError>
where
    R: TimestampedRecord,
    I: IntoIterator<Item = R>,
{
    group_by_date(records, &Local::now(), policy)
}
