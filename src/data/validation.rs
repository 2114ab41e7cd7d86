//! Comprehensive data validation: schema, type, and value-domain checks on a
//! timestamp-clean table.
//!
//! Hard invariants (high >= low, open/close within [low, high]) never pass
//! through silently: the offending row is rejected and reported, or the run
//! fails outright when rejection is disabled. Soft violations follow the
//! per-column policy and every correction is logged.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::errors::{PipelineError, PipelineResult};
use super::timestamp::{GapAnnotation, TimeIndexedTable, TimedRow};

/// Columns every table must carry beyond its time axis.
pub const REQUIRED_COLUMNS: &[&str] = &["open", "high", "low", "close", "volume"];

/// How to handle a value outside its declared domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainPolicy {
    /// Drop the row and record a rejection.
    Reject,
    /// Clamp the value to the domain boundary and record a correction.
    Clip,
}

/// How to handle a row violating a hard relational invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardViolationPolicy {
    /// Drop the row and record a rejection.
    RejectRow,
    /// Fail the whole validation with a value domain error.
    Fail,
}

/// Per-run validation policy.
#[derive(Debug, Clone)]
pub struct ValidationPolicy {
    /// Policy for non-positive prices (open/high/low/close must be > 0).
    pub price_policy: DomainPolicy,
    /// Policy for negative volume (must be >= 0).
    pub volume_policy: DomainPolicy,
    /// Policy for relational invariant violations.
    pub hard_policy: HardViolationPolicy,
    /// Fail when more than this fraction of rows violate one column's domain.
    pub max_violation_ratio: f64,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            price_policy: DomainPolicy::Reject,
            volume_policy: DomainPolicy::Clip,
            hard_policy: HardViolationPolicy::RejectRow,
            max_violation_ratio: 0.2,
        }
    }
}

/// A fully typed, domain-checked row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Summary of every correction and rejection applied during validation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub rows_in: usize,
    pub rows_out: usize,
    pub corrections: usize,
    pub rejections: usize,
    /// Domain violation counts keyed by column name.
    pub violations_by_column: HashMap<String, usize>,
    /// Rows dropped for hard relational invariant violations.
    pub relational_rejections: usize,
}

/// Terminal artifact of the ingestion pipeline.
///
/// Every row satisfies: prices > 0, volume >= 0, low <= high, and open/close
/// within [low, high]. Downstream modes need no further defensive checks.
#[derive(Debug, Clone)]
pub struct ValidatedTable {
    pub rows: Vec<Candle>,
    pub gaps: Vec<GapAnnotation>,
    pub report: ValidationReport,
}

impl ValidatedTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Close price series, oldest first.
    pub fn closes(&self) -> Vec<f64> {
        self.rows.iter().map(|c| c.close).collect()
    }
}

/// Validator enforcing schema, type, and domain invariants.
pub struct DataValidator {
    policy: ValidationPolicy,
}

impl Default for DataValidator {
    fn default() -> Self {
        Self {
            policy: ValidationPolicy::default(),
        }
    }
}

impl DataValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: ValidationPolicy) -> Self {
        Self { policy }
    }

    /// Validate a timestamp-clean table into a fully typed one.
    pub fn validate(&self, table: TimeIndexedTable) -> PipelineResult<ValidatedTable> {
        // Schema check against the first row; the time axis guarantees at
        // least one row exists.
        let first = table
            .rows
            .first()
            .ok_or_else(|| PipelineError::integrity("cannot validate an empty table"))?;
        for column in REQUIRED_COLUMNS {
            if !first.fields.keys().any(|k| k.eq_ignore_ascii_case(column)) {
                return Err(PipelineError::SchemaViolation {
                    column: column.to_string(),
                });
            }
        }

        let rows_in = table.rows.len();
        let mut report = ValidationReport {
            rows_in,
            ..Default::default()
        };
        let mut rows: Vec<Candle> = Vec::with_capacity(rows_in);

        for row in &table.rows {
            match self.validate_row(row, &mut report)? {
                Some(candle) => rows.push(candle),
                None => report.rejections += 1,
            }
        }

        // Systematic violations beyond tolerance fail regardless of policy.
        for (column, count) in &report.violations_by_column {
            let ratio = *count as f64 / rows_in as f64;
            if ratio > self.policy.max_violation_ratio {
                return Err(PipelineError::domain(
                    column.clone(),
                    format!(
                        "{} of {} rows ({:.0}%) violate the declared domain",
                        count,
                        rows_in,
                        ratio * 100.0
                    ),
                ));
            }
        }

        if rows.is_empty() {
            return Err(PipelineError::integrity(
                "comprehensive validation rejected every row",
            ));
        }

        report.rows_out = rows.len();
        info!(
            rows_in = report.rows_in,
            rows_out = report.rows_out,
            corrections = report.corrections,
            rejections = report.rejections,
            relational_rejections = report.relational_rejections,
            "comprehensive data validation complete"
        );

        Ok(ValidatedTable {
            rows,
            gaps: table.gaps,
            report,
        })
    }

    /// Validate one row. Returns `Ok(None)` when the row is rejected.
    fn validate_row(
        &self,
        row: &TimedRow,
        report: &mut ValidationReport,
    ) -> PipelineResult<Option<Candle>> {
        let open = self.coerce_price(row, "open", report)?;
        let high = self.coerce_price(row, "high", report)?;
        let low = self.coerce_price(row, "low", report)?;
        let close = self.coerce_price(row, "close", report)?;
        let volume = self.coerce_volume(row, report)?;

        let (open, high, low, close, volume) = match (open, high, low, close, volume) {
            (Some(o), Some(h), Some(l), Some(c), Some(v)) => (o, h, l, c, v),
            _ => return Ok(None),
        };

        // Hard relational invariants.
        let relational_ok =
            high >= low && open >= low && open <= high && close >= low && close <= high;
        if !relational_ok {
            match self.policy.hard_policy {
                HardViolationPolicy::RejectRow => {
                    warn!(
                        timestamp = %row.timestamp,
                        open, high, low, close,
                        "rejecting row violating OHLC relational invariant"
                    );
                    report.relational_rejections += 1;
                    return Ok(None);
                }
                HardViolationPolicy::Fail => {
                    return Err(PipelineError::domain(
                        "high/low".to_string(),
                        format!(
                            "row at {} violates OHLC relational invariant (o={} h={} l={} c={})",
                            row.timestamp, open, high, low, close
                        ),
                    ));
                }
            }
        }

        Ok(Some(Candle {
            timestamp: row.timestamp,
            open,
            high,
            low,
            close,
            volume,
        }))
    }

    /// Coerce and domain-check a price column (> 0). `Ok(None)` rejects the row.
    fn coerce_price(
        &self,
        row: &TimedRow,
        column: &str,
        report: &mut ValidationReport,
    ) -> PipelineResult<Option<f64>> {
        let value = match field_as_f64(row, column) {
            Some(v) if v.is_finite() => v,
            _ => {
                *report
                    .violations_by_column
                    .entry(column.to_string())
                    .or_insert(0) += 1;
                return Ok(None);
            }
        };

        if value > 0.0 {
            return Ok(Some(value));
        }

        *report
            .violations_by_column
            .entry(column.to_string())
            .or_insert(0) += 1;
        match self.policy.price_policy {
            DomainPolicy::Reject => {
                warn!(column, value, timestamp = %row.timestamp, "rejecting non-positive price");
                Ok(None)
            }
            DomainPolicy::Clip => {
                // Smallest positive price stand-in; a zero price would still
                // break downstream return arithmetic.
                report.corrections += 1;
                warn!(column, value, "clipping non-positive price to epsilon");
                Ok(Some(f64::EPSILON))
            }
        }
    }

    /// Coerce and domain-check the volume column (>= 0).
    fn coerce_volume(
        &self,
        row: &TimedRow,
        report: &mut ValidationReport,
    ) -> PipelineResult<Option<f64>> {
        let value = match field_as_f64(row, "volume") {
            Some(v) if v.is_finite() => v,
            _ => {
                *report
                    .violations_by_column
                    .entry("volume".to_string())
                    .or_insert(0) += 1;
                return Ok(None);
            }
        };

        if value >= 0.0 {
            return Ok(Some(value));
        }

        *report
            .violations_by_column
            .entry("volume".to_string())
            .or_insert(0) += 1;
        match self.policy.volume_policy {
            DomainPolicy::Clip => {
                report.corrections += 1;
                warn!(value, timestamp = %row.timestamp, "clipping negative volume to 0");
                Ok(Some(0.0))
            }
            DomainPolicy::Reject => {
                warn!(value, timestamp = %row.timestamp, "rejecting negative volume");
                Ok(None)
            }
        }
    }

    /// Re-validate already-validated rows. Used for the idempotence check:
    /// a clean table round-trips with zero corrections or rejections.
    pub fn revalidate(&self, table: &ValidatedTable) -> PipelineResult<ValidatedTable> {
        let rows: Vec<TimedRow> = table
            .rows
            .iter()
            .map(|c| {
                let mut fields = HashMap::new();
                fields.insert("open".to_string(), c.open.to_string());
                fields.insert("high".to_string(), c.high.to_string());
                fields.insert("low".to_string(), c.low.to_string());
                fields.insert("close".to_string(), c.close.to_string());
                fields.insert("volume".to_string(), c.volume.to_string());
                TimedRow {
                    timestamp: c.timestamp,
                    fields,
                }
            })
            .collect();

        self.validate(TimeIndexedTable {
            rows,
            gaps: table.gaps.clone(),
            diagnostics: Default::default(),
        })
    }
}

fn field_as_f64(row: &TimedRow, column: &str) -> Option<f64> {
    row.fields
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(column))
        .and_then(|(_, v)| v.trim().parse::<f64>().ok())
}
