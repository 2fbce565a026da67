use crate::errors::WeatherSourceError;
use chrono::NaiveDate;
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Daily mean temperatures (deg C) for a station over an inclusive date range.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TemperatureSeries {
    pub station: String,
    pub dates: Vec<NaiveDate>,
    pub values: Vec<f64>,
}

impl TemperatureSeries {
    /// Temperature for a specific date, if present in the series.
    pub fn value_on(&self, date: NaiveDate) -> Option<f64> {
        self.dates
            .binary_search(&date)
            .ok()
            .map(|idx| self.values[idx])
    }
}

/// Access to station weather data: actual observed history and the long-run
/// typical-year ("normal") profile. The only I/O boundary of an evaluation;
/// implementations are expected to block.
pub trait WeatherSource: Send + Sync {
    fn station(&self) -> &str;

    /// Observed daily mean temperatures for [start, end] inclusive.
    fn actual_temperatures(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<TemperatureSeries, WeatherSourceError>;

    /// Typical-year daily profile: exactly 365 values, index 0 = January 1st
    /// (February 29th dropped).
    fn normal_temperatures(&self) -> Result<Vec<f64>, WeatherSourceError>;
}

/// Caching wrapper keyed by requested date range, so repeated lookups across
/// periods of the same trace hit the underlying source once. Constructed
/// explicitly and passed by handle; there is no hidden global cache.
pub struct CachedWeatherSource<W> {
    inner: W,
    actual_cache: RwLock<IndexMap<(NaiveDate, NaiveDate), Arc<TemperatureSeries>>>,
    normal_cache: RwLock<Option<Arc<Vec<f64>>>>,
}

impl<W: WeatherSource> CachedWeatherSource<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            actual_cache: RwLock::new(IndexMap::new()),
            normal_cache: RwLock::new(None),
        }
    }

    #[cfg(test)]
    pub(crate) fn cached_range_count(&self) -> usize {
        self.actual_cache.read().len()
    }
}

impl<W: WeatherSource> WeatherSource for CachedWeatherSource<W> {
    fn station(&self) -> &str {
        self.inner.station()
    }

    fn actual_temperatures(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<TemperatureSeries, WeatherSourceError> {
        if let Some(series) = self.actual_cache.read().get(&(start, end)) {
            return Ok(series.as_ref().clone());
        }
        let series = Arc::new(self.inner.actual_temperatures(start, end)?);
        self.actual_cache
            .write()
            .insert((start, end), series.clone());
        Ok(series.as_ref().clone())
    }

    fn normal_temperatures(&self) -> Result<Vec<f64>, WeatherSourceError> {
        if let Some(profile) = self.normal_cache.read().as_ref() {
            return Ok(profile.as_ref().clone());
        }
        let profile = Arc::new(self.inner.normal_temperatures()?);
        *self.normal_cache.write() = Some(profile.clone());
        Ok(profile.as_ref().clone())
    }
}

impl<W: WeatherSource> WeatherSource for Arc<W> {
    fn station(&self) -> &str {
        self.as_ref().station()
    }

    fn actual_temperatures(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<TemperatureSeries, WeatherSourceError> {
        self.as_ref().actual_temperatures(start, end)
    }

    fn normal_temperatures(&self) -> Result<Vec<f64>, WeatherSourceError> {
        self.as_ref().normal_temperatures()
    }
}

impl WeatherSource for Arc<dyn WeatherSource> {
    fn station(&self) -> &str {
        self.as_ref().station()
    }

    fn actual_temperatures(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<TemperatureSeries, WeatherSourceError> {
        self.as_ref().actual_temperatures(start, end)
    }

    fn normal_temperatures(&self) -> Result<Vec<f64>, WeatherSourceError> {
        self.as_ref().normal_temperatures()
    }
}

#[cfg(test)]
pub(crate) mod mocks {
    use super::*;
    use crate::core::units::DAYS_PER_NORMAL_YEAR;
    use chrono::Datelike;

    /// Deterministic seasonal sinusoid standing in for real station data:
    /// coldest around mid January, warmest around mid July.
    pub(crate) struct SinusoidWeatherSource {
        pub station: String,
        pub mean: f64,
        pub amplitude: f64,
    }

    impl SinusoidWeatherSource {
        pub(crate) fn new(station: &str) -> Self {
            Self {
                station: station.to_string(),
                mean: 10.0,
                amplitude: 12.0,
            }
        }

        fn temperature_for_day_of_year(&self, day_of_year: u32) -> f64 {
            let phase = (day_of_year as f64 - 15.0) / 365.25 * std::f64::consts::TAU;
            self.mean - self.amplitude * phase.cos()
        }
    }

    impl WeatherSource for SinusoidWeatherSource {
        fn station(&self) -> &str {
            &self.station
        }

        fn actual_temperatures(
            &self,
            start: NaiveDate,
            end: NaiveDate,
        ) -> Result<TemperatureSeries, WeatherSourceError> {
            let mut dates = vec![];
            let mut values = vec![];
            let mut date = start;
            while date <= end {
                dates.push(date);
                values.push(self.temperature_for_day_of_year(date.ordinal()));
                date = date + chrono::Days::new(1);
            }
            Ok(TemperatureSeries {
                station: self.station.clone(),
                dates,
                values,
            })
        }

        fn normal_temperatures(&self) -> Result<Vec<f64>, WeatherSourceError> {
            Ok((1..=DAYS_PER_NORMAL_YEAR)
                .map(|day| self.temperature_for_day_of_year(day))
                .collect())
        }
    }

    /// Always fails, for exercising weather-error recovery paths.
    pub(crate) struct UnavailableWeatherSource {
        pub station: String,
    }

    impl WeatherSource for UnavailableWeatherSource {
        fn station(&self) -> &str {
            &self.station
        }

        fn actual_temperatures(
            &self,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<TemperatureSeries, WeatherSourceError> {
            Err(WeatherSourceError::new(
                &self.station,
                anyhow::anyhow!("station unavailable"),
            ))
        }

        fn normal_temperatures(&self) -> Result<Vec<f64>, WeatherSourceError> {
            Err(WeatherSourceError::new(
                &self.station,
                anyhow::anyhow!("station unavailable"),
            ))
        }
    }
}
