use crate::errors::InsufficientDataError;
use crate::project::Intervention;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Canonical analysis-window label. `Baseline` always precedes the first
/// intervention and `Reporting` always follows the last; spans between
/// multiple interventions become `Intervening` periods when the gap policy
/// keeps them.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum PeriodLabel {
    Baseline,
    Reporting,
    Intervening(usize),
}

impl Display for PeriodLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PeriodLabel::Baseline => write!(f, "baseline"),
            PeriodLabel::Reporting => write!(f, "reporting"),
            PeriodLabel::Intervening(i) => write!(f, "intervening_{i}"),
        }
    }
}

/// What to do with the span between two consecutive interventions.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum GapPolicy {
    /// Exclude the span from both baseline and reporting (default).
    #[default]
    Exclude,
    /// Keep each span as its own `Intervening` period; it is fitted and
    /// reported but never joins the canonical (baseline, reporting) pairing.
    LabelIntervening,
}

/// One contiguous modeling window, half-open [start, end).
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct ModelingPeriod {
    pub label: PeriodLabel,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ModelingPeriod {
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

/// The project-level partitioning scheme, shared read-only by all traces.
/// Periods are pairwise disjoint and ordered by start.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ModelingPeriodSet {
    periods: Vec<ModelingPeriod>,
}

impl ModelingPeriodSet {
    pub fn periods(&self) -> &[ModelingPeriod] {
        &self.periods
    }

    pub fn get(&self, label: PeriodLabel) -> Option<&ModelingPeriod> {
        self.periods.iter().find(|period| period.label == label)
    }

    pub fn baseline(&self) -> Option<&ModelingPeriod> {
        self.get(PeriodLabel::Baseline)
    }

    pub fn reporting(&self) -> Option<&ModelingPeriod> {
        self.get(PeriodLabel::Reporting)
    }

    /// Canonical (baseline, reporting) pairings. A single evaluation targets
    /// one pairing, but the result shape supports several.
    pub fn period_pairs(&self) -> Vec<(PeriodLabel, PeriodLabel)> {
        match (self.baseline(), self.reporting()) {
            (Some(baseline), Some(reporting)) => vec![(baseline.label, reporting.label)],
            _ => vec![],
        }
    }
}

/// Partition the analyzed span around the ordered interventions.
///
/// Baseline covers [span_start, first_intervention.start); reporting covers
/// [last_intervention.end, span_end). Errors when either canonical window is
/// shorter than `min_period_days` — recoverable: the caller reports it and the
/// affected evaluation degrades to `None` derivatives rather than aborting.
pub fn split_modeling_periods(
    span_start: DateTime<Utc>,
    span_end: DateTime<Utc>,
    interventions: &[Intervention],
    policy: GapPolicy,
    min_period_days: i64,
) -> Result<ModelingPeriodSet, InsufficientDataError> {
    debug_assert!(interventions
        .windows(2)
        .all(|pair| pair[0].start() <= pair[1].start()));

    let first = interventions
        .first()
        .expect("caller guarantees at least one intervention");
    let last = interventions
        .last()
        .expect("caller guarantees at least one intervention");

    let baseline = ModelingPeriod {
        label: PeriodLabel::Baseline,
        start: span_start,
        end: first.start(),
    };
    let reporting = ModelingPeriod {
        label: PeriodLabel::Reporting,
        start: last.end(),
        end: span_end,
    };

    for period in [&baseline, &reporting] {
        let days = if period.end > period.start {
            period.days()
        } else {
            0
        };
        if days < min_period_days {
            return Err(InsufficientDataError::new(
                format!("{} period", period.label),
                days.max(0) as usize,
                min_period_days as usize,
            ));
        }
    }

    let mut periods = vec![baseline];
    if policy == GapPolicy::LabelIntervening {
        for (i, pair) in interventions.windows(2).enumerate() {
            let (gap_start, gap_end) = (pair[0].end(), pair[1].start());
            if gap_end > gap_start {
                periods.push(ModelingPeriod {
                    label: PeriodLabel::Intervening(i),
                    start: gap_start,
                    end: gap_end,
                });
            }
        }
    }
    periods.push(reporting);

    Ok(ModelingPeriodSet { periods })
}
