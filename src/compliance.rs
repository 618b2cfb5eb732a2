//! Plan compliance: reconciles planned entries against logged ones, per day.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::iter;
use uuid::Uuid;

use crate::models::{LoggedEntry, PlannedEntry};

/// Compliance reported for a day (or a whole period) with nothing planned.
pub const NOTHING_PLANNED_COMPLIANCE: f64 = 1.0;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ComplianceError {
    #[error("start date {start} is after end date {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
}

/// Inclusive calendar-date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Period {
    start_date: NaiveDate,
    end_date: NaiveDate,
}

impl Period {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ComplianceError> {
        if start > end {
            return Err(ComplianceError::InvalidRange { start, end });
        }
        Ok(Period {
            start_date: start,
            end_date: end,
        })
    }

    pub fn start(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end(&self) -> NaiveDate {
        self.end_date
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        (self.start_date..=self.end_date).contains(&date)
    }

    /// Number of calendar days covered, both ends included.
    pub fn len_days(&self) -> u64 {
        (self.end_date - self.start_date).num_days().unsigned_abs() + 1
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end_date;
        iter::successors(Some(self.start_date), move |d| {
            if *d < end {
                d.succ_opt()
            } else {
                None
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplianceDetail {
    pub planned: PlannedEntry,
    pub actual: Option<LoggedEntry>,
    pub matched: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyCompliance {
    pub date: NaiveDate,
    pub planned: usize,
    pub actual: usize,
    pub matched: usize,
    pub compliance: f64,
    pub details: Vec<ComplianceDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceReport {
    pub plan_id: Uuid,
    pub period: Period,
    pub overall_compliance: f64,
    pub daily_breakdown: Vec<DailyCompliance>,
}

fn ratio(matched: usize, planned: usize) -> f64 {
    if planned == 0 {
        NOTHING_PLANNED_COMPLIANCE
    } else {
        matched as f64 / planned as f64
    }
}

/// Builds the compliance report for `plan_id` over `period`.
///
/// Each planned entry consumes at most one logged entry from the same day
/// with the same kind and an identical description. Entries dated outside
/// the period are ignored.
pub fn aggregate(
    plan_id: Uuid,
    period: Period,
    planned: &[PlannedEntry],
    logged: &[LoggedEntry],
) -> ComplianceReport {
    let mut planned_by_day: BTreeMap<NaiveDate, Vec<&PlannedEntry>> = BTreeMap::new();
    for entry in planned.iter().filter(|e| period.contains(e.date)) {
        planned_by_day.entry(entry.date).or_default().push(entry);
    }

    let mut logged_by_day: BTreeMap<NaiveDate, Vec<&LoggedEntry>> = BTreeMap::new();
    for entry in logged.iter().filter(|e| period.contains(e.date())) {
        logged_by_day.entry(entry.date()).or_default().push(entry);
    }

    let mut total_planned = 0;
    let mut total_matched = 0;
    let mut daily_breakdown = Vec::new();

    for date in period.days() {
        let day_planned = planned_by_day.remove(&date).unwrap_or_default();
        let mut pool: Vec<Option<&LoggedEntry>> = logged_by_day
            .remove(&date)
            .unwrap_or_default()
            .into_iter()
            .map(Some)
            .collect();
        let actual = pool.len();

        let details: Vec<ComplianceDetail> = day_planned
            .into_iter()
            .map(|plan| {
                let found = pool
                    .iter_mut()
                    .find(|slot| {
                        slot.is_some_and(|log| {
                            log.detail.kind() == plan.detail.kind()
                                && log.description == plan.description
                        })
                    })
                    .and_then(Option::take);
                ComplianceDetail {
                    planned: plan.clone(),
                    matched: found.is_some(),
                    actual: found.cloned(),
                }
            })
            .collect();

        let matched = details.iter().filter(|d| d.matched).count();
        total_planned += details.len();
        total_matched += matched;

        daily_breakdown.push(DailyCompliance {
            date,
            planned: details.len(),
            actual,
            matched,
            compliance: ratio(matched, details.len()),
            details,
        });
    }

    tracing::debug!(
        %plan_id,
        planned = total_planned,
        matched = total_matched,
        days = daily_breakdown.len(),
        "compliance aggregated"
    );

    ComplianceReport {
        plan_id,
        period,
        overall_compliance: ratio(total_matched, total_planned),
        daily_breakdown,
    }
}
