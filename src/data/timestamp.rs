//! Timestamp validation: normalizes the time column of a raw record set into
//! a strictly ordered, duplicate-free, gap-annotated time index.
//!
//! Policy decisions (documented, not implicit):
//! - duplicate timestamps resolve keep-first after a stable ascending sort
//! - rows with unparseable timestamps are dropped and counted, up to a
//!   configurable rejection tolerance
//! - gaps wider than 1.5x the dominant cadence are annotated, never dropped

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::errors::{PipelineError, PipelineResult};
use super::RawRecordSet;

/// Column names accepted as the time axis, tried in order.
const TIME_COLUMN_CANDIDATES: &[&str] = &["timestamp", "time", "datetime", "date"];

/// Canonical format tried first, then known alternates.
const CANONICAL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const ALTERNATE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M", "%m/%d/%Y %H:%M:%S"];

/// A single row tagged with its parsed timestamp. Remaining columns stay as
/// named raw fields until the comprehensive validator types them.
#[derive(Debug, Clone)]
pub struct TimedRow {
    pub timestamp: DateTime<Utc>,
    pub fields: HashMap<String, String>,
}

/// A gap in the time axis wider than the dominant cadence allows.
#[derive(Debug, Clone, Serialize)]
pub struct GapAnnotation {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub gap_seconds: i64,
    pub expected_seconds: i64,
}

/// Counts emitted as the validator's structured diagnostic record.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TimestampDiagnostics {
    pub parsed: usize,
    pub rejected: usize,
    pub deduplicated: usize,
    pub gaps: usize,
}

/// Output of timestamp validation.
///
/// Invariants: timestamps strictly ascending, no duplicates, non-empty.
#[derive(Debug, Clone)]
pub struct TimeIndexedTable {
    pub rows: Vec<TimedRow>,
    pub gaps: Vec<GapAnnotation>,
    pub diagnostics: TimestampDiagnostics,
}

impl TimeIndexedTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Validator for the time axis of a raw record set.
pub struct TimestampValidator {
    /// Maximum fraction of input rows that may be rejected before the source
    /// is considered unusable.
    max_rejection_ratio: f64,
    /// Minimum viable row count after validation.
    min_rows: usize,
}

impl Default for TimestampValidator {
    fn default() -> Self {
        Self {
            max_rejection_ratio: 0.5,
            min_rows: 1,
        }
    }
}

impl TimestampValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tolerance(max_rejection_ratio: f64, min_rows: usize) -> Self {
        Self {
            max_rejection_ratio,
            min_rows: min_rows.max(1),
        }
    }

    /// Validate the time axis of a raw record set.
    ///
    /// Fails with a data integrity error when no time column exists, when the
    /// rejection tolerance is exceeded, or when fewer than `min_rows` rows
    /// survive. Never returns an empty table.
    pub fn validate(&self, raw: RawRecordSet) -> PipelineResult<TimeIndexedTable> {
        let time_idx = TIME_COLUMN_CANDIDATES
            .iter()
            .find_map(|name| raw.column_index(name))
            .ok_or_else(|| {
                PipelineError::integrity(format!(
                    "no parseable timestamp column found (tried {:?})",
                    TIME_COLUMN_CANDIDATES
                ))
            })?;

        let total = raw.rows.len();
        let mut rows: Vec<TimedRow> = Vec::with_capacity(total);
        let mut rejected = 0usize;

        for record in &raw.rows {
            let value = record.get(time_idx).map(String::as_str).unwrap_or("");
            match parse_timestamp(value) {
                Some(timestamp) => {
                    let fields = raw
                        .headers
                        .iter()
                        .enumerate()
                        .filter(|(i, _)| *i != time_idx)
                        .map(|(i, h)| {
                            (h.clone(), record.get(i).cloned().unwrap_or_default())
                        })
                        .collect();
                    rows.push(TimedRow { timestamp, fields });
                }
                None => {
                    rejected += 1;
                    warn!(value, "dropping row with unparseable timestamp");
                }
            }
        }

        if total > 0 && (rejected as f64 / total as f64) > self.max_rejection_ratio {
            return Err(PipelineError::integrity(format!(
                "{} of {} rows had unparseable timestamps (tolerance {:.0}%)",
                rejected,
                total,
                self.max_rejection_ratio * 100.0
            )));
        }

        let parsed = rows.len();

        // Stable sort so keep-first dedup is deterministic with respect to
        // input order.
        rows.sort_by_key(|r| r.timestamp);
        let before_dedup = rows.len();
        rows.dedup_by_key(|r| r.timestamp);
        let deduplicated = before_dedup - rows.len();
        if deduplicated > 0 {
            warn!(deduplicated, "resolved duplicate timestamps (keep-first)");
        }

        if rows.len() < self.min_rows {
            return Err(PipelineError::integrity(format!(
                "validation produced {} rows, below minimum of {}",
                rows.len(),
                self.min_rows
            )));
        }

        let gaps = annotate_gaps(&rows);
        let diagnostics = TimestampDiagnostics {
            parsed,
            rejected,
            deduplicated,
            gaps: gaps.len(),
        };

        info!(
            parsed = diagnostics.parsed,
            rejected = diagnostics.rejected,
            deduplicated = diagnostics.deduplicated,
            gaps = diagnostics.gaps,
            rows = rows.len(),
            "timestamp validation complete"
        );

        Ok(TimeIndexedTable {
            rows,
            gaps,
            diagnostics,
        })
    }
}

/// Parse a raw timestamp value: canonical format first, then known
/// alternates, then RFC 3339, date-only, and unix epoch seconds/millis.
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = NaiveDateTime::parse_from_str(value, CANONICAL_FORMAT) {
        return Some(dt.and_utc());
    }
    for format in ALTERNATE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt.and_utc());
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    if let Ok(epoch) = value.parse::<i64>() {
        // Heuristic: values past the year ~2286 in seconds are milliseconds.
        let (secs, millis) = if epoch.abs() >= 10_000_000_000 {
            (epoch.div_euclid(1000), epoch.rem_euclid(1000) as u32)
        } else {
            (epoch, 0)
        };
        return Utc.timestamp_opt(secs, millis * 1_000_000).single();
    }
    None
}

/// Annotate gaps wider than 1.5x the dominant (modal) inter-row interval.
fn annotate_gaps(rows: &[TimedRow]) -> Vec<GapAnnotation> {
    if rows.len() < 3 {
        return Vec::new();
    }

    let deltas: Vec<i64> = rows
        .windows(2)
        .map(|w| (w[1].timestamp - w[0].timestamp).num_seconds())
        .collect();

    let mut counts: HashMap<i64, usize> = HashMap::new();
    for d in &deltas {
        *counts.entry(*d).or_insert(0) += 1;
    }
    // Ties between equally frequent deltas resolve to the smaller one so the
    // cadence is deterministic regardless of map iteration order.
    let cadence = counts
        .into_iter()
        .max_by_key(|(delta, count)| (*count, std::cmp::Reverse(*delta)))
        .map(|(delta, _)| delta)
        .unwrap_or(0);
    if cadence <= 0 {
        return Vec::new();
    }

    rows.windows(2)
        .filter_map(|w| {
            let gap = (w[1].timestamp - w[0].timestamp).num_seconds();
            if gap as f64 > cadence as f64 * 1.5 {
                Some(GapAnnotation {
                    from: w[0].timestamp,
                    to: w[1].timestamp,
                    gap_seconds: gap,
                    expected_seconds: cadence,
                })
            } else {
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(headers: &[&str], rows: &[&[&str]]) -> RawRecordSet {
        RawRecordSet {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|v| v.to_string()).collect())
                .collect(),
        }
    }

    #[test]
    fn test_parse_canonical_and_alternates() {
        assert!(parse_timestamp("2024-01-01 09:30:00").is_some());
        assert!(parse_timestamp("2024-01-01T09:30:00").is_some());
        assert!(parse_timestamp("2024-01-01T09:30:00+00:00").is_some());
        assert!(parse_timestamp("2024-01-01").is_some());
        assert!(parse_timestamp("1704103800").is_some());
        assert!(parse_timestamp("1704103800000").is_some());
        assert!(parse_timestamp("not a time").is_none());
        assert!(parse_timestamp("").is_none());
    }

    #[test]
    fn test_epoch_seconds_and_millis_agree() {
        let secs = parse_timestamp("1704103800").unwrap();
        let millis = parse_timestamp("1704103800000").unwrap();
        assert_eq!(secs, millis);
    }

    #[test]
    fn test_output_strictly_ascending_no_duplicates() {
        let input = raw(
            &["timestamp", "close"],
            &[
                &["2024-01-01 00:02:00", "3"],
                &["2024-01-01 00:00:00", "1"],
                &["2024-01-01 00:01:00", "2"],
                &["2024-01-01 00:01:00", "2b"],
            ],
        );
        let table = TimestampValidator::new().validate(input).expect("valid");
        assert_eq!(table.len(), 3);
        for pair in table.rows.windows(2) {
            assert!(pair[0].timestamp < pair[1].timestamp);
        }
        assert_eq!(table.diagnostics.deduplicated, 1);
        // Keep-first: the earlier input row wins the tie.
        assert_eq!(table.rows[1].fields["close"], "2");
    }

    #[test]
    fn test_empty_result_is_fatal() {
        let input = raw(&["timestamp", "close"], &[]);
        let err = TimestampValidator::new().validate(input).unwrap_err();
        assert!(matches!(err, PipelineError::DataIntegrity { .. }));
    }

    #[test]
    fn test_all_unparseable_is_fatal() {
        let input = raw(
            &["timestamp", "close"],
            &[&["garbage", "1"], &["junk", "2"]],
        );
        let err = TimestampValidator::new().validate(input).unwrap_err();
        assert!(matches!(err, PipelineError::DataIntegrity { .. }));
    }

    #[test]
    fn test_missing_time_column_is_fatal() {
        let input = raw(&["open", "close"], &[&["1", "2"]]);
        let err = TimestampValidator::new().validate(input).unwrap_err();
        assert!(matches!(err, PipelineError::DataIntegrity { .. }));
    }

    #[test]
    fn test_unparseable_rows_dropped_within_tolerance() {
        let input = raw(
            &["timestamp", "close"],
            &[
                &["2024-01-01 00:00:00", "1"],
                &["bad", "2"],
                &["2024-01-01 00:01:00", "3"],
            ],
        );
        let table = TimestampValidator::new().validate(input).expect("valid");
        assert_eq!(table.len(), 2);
        assert_eq!(table.diagnostics.rejected, 1);
        assert_eq!(table.diagnostics.parsed, 2);
    }

    #[test]
    fn test_gap_annotation_keeps_rows() {
        let mut rows: Vec<Vec<String>> = (0..10)
            .map(|i| {
                vec![
                    format!("2024-01-01 00:{:02}:00", i),
                    "1".to_string(),
                ]
            })
            .collect();
        // One 5-minute hole in an otherwise 1-minute cadence.
        rows.push(vec!["2024-01-01 00:15:00".to_string(), "1".to_string()]);
        let input = RawRecordSet {
            headers: vec!["timestamp".to_string(), "close".to_string()],
            rows,
        };
        let table = TimestampValidator::new().validate(input).expect("valid");
        assert_eq!(table.len(), 11);
        assert_eq!(table.gaps.len(), 1);
        assert_eq!(table.gaps[0].gap_seconds, 360);
        assert_eq!(table.gaps[0].expected_seconds, 60);
    }

    #[test]
    fn test_cadence_tie_prefers_smaller_delta() {
        // Deltas of 60s and 120s occur equally often; the smaller delta must
        // win so the 120s intervals are annotated as gaps on every run.
        let times = ["00:00:00", "00:01:00", "00:03:00", "00:04:00", "00:06:00"];
        let rows: Vec<Vec<String>> = times
            .iter()
            .map(|t| vec![format!("2024-01-01 {t}"), "1".to_string()])
            .collect();
        let input = RawRecordSet {
            headers: vec!["timestamp".to_string(), "close".to_string()],
            rows,
        };
        let table = TimestampValidator::new().validate(input).expect("valid");
        assert_eq!(table.gaps.len(), 2);
        for gap in &table.gaps {
            assert_eq!(gap.expected_seconds, 60);
            assert_eq!(gap.gap_seconds, 120);
        }
    }

    #[test]
    fn test_scenario_a_counts() {
        // 100 rows: one duplicate timestamp, one unparseable timestamp.
        let mut rows: Vec<Vec<String>> = (0..98)
            .map(|i| {
                vec![
                    format!("2024-01-01 {:02}:{:02}:00", i / 60, i % 60),
                    format!("{}", i),
                ]
            })
            .collect();
        rows.push(vec!["2024-01-01 00:00:00".to_string(), "dup".to_string()]);
        rows.push(vec!["unparseable".to_string(), "bad".to_string()]);
        assert_eq!(rows.len(), 100);

        let input = RawRecordSet {
            headers: vec!["timestamp".to_string(), "close".to_string()],
            rows,
        };
        let table = TimestampValidator::new().validate(input).expect("valid");
        assert_eq!(table.len(), 98);
        assert_eq!(table.diagnostics.parsed, 99);
        assert_eq!(table.diagnostics.rejected, 1);
        assert_eq!(table.diagnostics.deduplicated, 1);
    }
}
