use anyhow::{anyhow, bail};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// A daily-resolution consumption series: one reading per calendar day (UTC),
/// strictly increasing dates, with an estimated flag per reading. Immutable
/// once constructed.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DailyTimeSeries {
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
    estimated: Vec<bool>,
}

impl DailyTimeSeries {
    pub fn new(
        dates: Vec<NaiveDate>,
        values: Vec<f64>,
        estimated: Vec<bool>,
    ) -> anyhow::Result<Self> {
        if dates.len() != values.len() || dates.len() != estimated.len() {
            bail!(
                "series columns must have equal lengths (dates: {}, values: {}, estimated: {})",
                dates.len(),
                values.len(),
                estimated.len()
            );
        }
        if !dates.iter().tuple_windows().all(|(a, b)| a < b) {
            bail!("series dates must be strictly increasing");
        }
        Ok(Self {
            dates,
            values,
            estimated,
        })
    }

    /// Contiguous run of `days` readings of the same value starting at `start`.
    pub fn constant(start: NaiveDate, days: usize, value: f64) -> Self {
        let dates = (0..days)
            .map(|offset| start + chrono::Days::new(offset as u64))
            .collect::<Vec<_>>();
        Self {
            dates,
            values: vec![value; days],
            estimated: vec![false; days],
        }
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn estimated(&self) -> &[bool] {
        &self.estimated
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    /// Start of the observed span as a UTC instant (midnight of the first day).
    pub fn span_start(&self) -> anyhow::Result<DateTime<Utc>> {
        self.first_date()
            .map(midnight_utc)
            .ok_or_else(|| anyhow!("series is empty"))
    }

    /// Exclusive end of the observed span (midnight after the last day).
    pub fn span_end(&self) -> anyhow::Result<DateTime<Utc>> {
        self.last_date()
            .map(|date| midnight_utc(date + chrono::Days::new(1)))
            .ok_or_else(|| anyhow!("series is empty"))
    }

    /// Readings falling within the half-open instant interval [start, end).
    pub fn slice(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> DailyTimeSeries {
        let mut dates = vec![];
        let mut values = vec![];
        let mut estimated = vec![];
        for (i, date) in self.dates.iter().enumerate() {
            let instant = midnight_utc(*date);
            if instant >= start && instant < end {
                dates.push(*date);
                values.push(self.values[i]);
                estimated.push(self.estimated[i]);
            }
        }
        DailyTimeSeries {
            dates,
            values,
            estimated,
        }
    }
}

pub(crate) fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}
