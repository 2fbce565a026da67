use crate::core::model::{DailyObservation, DerivativeValue, ModelStrategy, PeriodModel};
use crate::core::periods::{ModelingPeriod, ModelingPeriodSet, PeriodLabel};
use crate::core::units::CANONICAL_UNIT_LABEL;
use crate::errors::{EvaluationError, InsufficientDataError};
use crate::project::{EnergyTrace, Interpretation};
use crate::weather::WeatherSource;
use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, warn};

/// Result of attempting to fit one modeling period of one trace. Failures are
/// recoverable and recorded here so callers can distinguish "legitimately
/// absent" from "failed" without parsing logs.
#[derive(Debug)]
pub enum FitOutcome {
    Fitted {
        model: Box<dyn PeriodModel>,
        /// Observed daily temperatures matched against the period's readings,
        /// kept for gross-predicted queries.
        actual_temperatures: Vec<f64>,
    },
    Failed(EvaluationError),
}

impl FitOutcome {
    pub fn is_fitted(&self) -> bool {
        matches!(self, FitOutcome::Fitted { .. })
    }
}

/// Derivatives for one (trace, period): prediction under typical-year weather
/// and under the period's actual weather, both in the canonical unit.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct PeriodDerivatives {
    pub annualized_weather_normal: DerivativeValue,
    pub gross_predicted: DerivativeValue,
}

impl PeriodDerivatives {
    pub(crate) fn combine(&self, other: &PeriodDerivatives) -> PeriodDerivatives {
        PeriodDerivatives {
            annualized_weather_normal: self
                .annualized_weather_normal
                .combine(&other.annualized_weather_normal),
            gross_predicted: self.gross_predicted.combine(&other.gross_predicted),
        }
    }
}

/// Derivative bundle for one trace under one (baseline, reporting) pairing,
/// already reconciled to the canonical unit.
#[derive(Clone, Debug, Serialize)]
pub struct TraceDerivatives {
    pub interpretation: Interpretation,
    pub unit: String,
    pub baseline: Option<PeriodDerivatives>,
    pub reporting: Option<PeriodDerivatives>,
}

/// One fitted model per modeling period for a single trace. A fit failure in
/// one period never prevents fitting the others.
#[derive(Debug)]
pub struct SplitModeledTrace {
    interpretation: Interpretation,
    unit_factor_to_kwh: f64,
    outcomes: IndexMap<PeriodLabel, FitOutcome>,
}

impl SplitModeledTrace {
    pub fn fit_all(
        strategy: &dyn ModelStrategy,
        modeling_period_set: &ModelingPeriodSet,
        trace: &EnergyTrace,
        weather_source: &dyn WeatherSource,
    ) -> Self {
        let mut outcomes = IndexMap::new();
        for period in modeling_period_set.periods() {
            let outcome = fit_period(strategy, period, trace, weather_source);
            if let FitOutcome::Failed(error) = &outcome {
                warn!(
                    period = %period.label,
                    interpretation = %trace.interpretation(),
                    %error,
                    "period fit failed; derivatives for this period will be absent"
                );
            }
            outcomes.insert(period.label, outcome);
        }
        Self {
            interpretation: trace.interpretation(),
            unit_factor_to_kwh: trace.unit().factor_to_kwh(),
            outcomes,
        }
    }

    pub fn interpretation(&self) -> Interpretation {
        self.interpretation
    }

    pub fn outcome(&self, label: PeriodLabel) -> Option<&FitOutcome> {
        self.outcomes.get(&label)
    }

    /// Derivatives for one canonical period label, or `None` when that
    /// period's model was not fit successfully. `None` is a first-class
    /// outcome here, not an error.
    pub fn derivative(
        &self,
        label: PeriodLabel,
        normal_temperatures: &[f64],
    ) -> Option<PeriodDerivatives> {
        match self.outcomes.get(&label)? {
            FitOutcome::Fitted {
                model,
                actual_temperatures,
            } => Some(PeriodDerivatives {
                annualized_weather_normal: model
                    .annualized_normal(normal_temperatures)
                    .scaled(self.unit_factor_to_kwh),
                gross_predicted: model
                    .gross_predicted(actual_temperatures)
                    .scaled(self.unit_factor_to_kwh),
            }),
            FitOutcome::Failed(_) => None,
        }
    }

    /// Full bundle for one (baseline, reporting) pairing.
    pub fn derivatives_for_pair(
        &self,
        pair: (PeriodLabel, PeriodLabel),
        normal_temperatures: &[f64],
    ) -> TraceDerivatives {
        TraceDerivatives {
            interpretation: self.interpretation,
            unit: CANONICAL_UNIT_LABEL.to_string(),
            baseline: self.derivative(pair.0, normal_temperatures),
            reporting: self.derivative(pair.1, normal_temperatures),
        }
    }
}

fn fit_period(
    strategy: &dyn ModelStrategy,
    period: &ModelingPeriod,
    trace: &EnergyTrace,
    weather_source: &dyn WeatherSource,
) -> FitOutcome {
    let slice = trace.series().slice(period.start, period.end);
    let (Some(first), Some(last)) = (slice.first_date(), slice.last_date()) else {
        return FitOutcome::Failed(
            InsufficientDataError::new(format!("{} period", period.label), 0, 1).into(),
        );
    };

    let temperatures = match weather_source.actual_temperatures(first, last) {
        Ok(series) => series,
        Err(error) => return FitOutcome::Failed(error.into()),
    };

    let mut observations = Vec::with_capacity(slice.len());
    let mut actual_temperatures = Vec::with_capacity(slice.len());
    let mut unmatched = 0usize;
    for (date, value) in slice.dates().iter().zip(slice.values()) {
        match temperatures.value_on(*date) {
            Some(temperature) => {
                observations.push(DailyObservation {
                    value: *value,
                    temperature,
                });
                actual_temperatures.push(temperature);
            }
            None => unmatched += 1,
        }
    }
    if unmatched > 0 {
        debug!(
            period = %period.label,
            unmatched,
            "readings without matching temperature data were dropped from the fit"
        );
    }

    match strategy.fit(&observations) {
        Ok(model) => FitOutcome::Fitted {
            model,
            actual_temperatures,
        },
        Err(error) => FitOutcome::Failed(error.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::BalancePointStrategy;
    use crate::core::periods::{split_modeling_periods, GapPolicy};
    use crate::core::units::KWH_PER_THERM;
    use crate::project::Intervention;
    use crate::timeseries::{midnight_utc, DailyTimeSeries};
    use crate::weather::mocks::{SinusoidWeatherSource, UnavailableWeatherSource};
    use crate::weather::WeatherSource;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rstest::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[fixture]
    fn period_set() -> ModelingPeriodSet {
        let intervention = Intervention::new(
            midnight_utc(date(2014, 1, 1)),
            midnight_utc(date(2014, 2, 1)),
        )
        .unwrap();
        split_modeling_periods(
            midnight_utc(date(2012, 1, 1)),
            midnight_utc(date(2015, 12, 30)),
            &[intervention],
            GapPolicy::Exclude,
            30,
        )
        .unwrap()
    }

    #[fixture]
    fn electricity_trace() -> EnergyTrace {
        EnergyTrace::new(
            Interpretation::ElectricityConsumptionSupplied,
            DailyTimeSeries::constant(date(2012, 1, 1), 365 * 4, 1.0),
            "kWh",
        )
        .unwrap()
    }

    #[rstest]
    fn should_fit_each_period_independently(
        period_set: ModelingPeriodSet,
        electricity_trace: EnergyTrace,
    ) {
        let weather = SinusoidWeatherSource::new("994971");
        let modeled = SplitModeledTrace::fit_all(
            &BalancePointStrategy::default(),
            &period_set,
            &electricity_trace,
            &weather,
        );
        assert!(modeled.outcome(PeriodLabel::Baseline).unwrap().is_fitted());
        assert!(modeled.outcome(PeriodLabel::Reporting).unwrap().is_fitted());
    }

    #[rstest]
    fn should_produce_annualized_and_gross_derivatives(
        period_set: ModelingPeriodSet,
        electricity_trace: EnergyTrace,
    ) {
        let weather = SinusoidWeatherSource::new("994971");
        let modeled = SplitModeledTrace::fit_all(
            &BalancePointStrategy::default(),
            &period_set,
            &electricity_trace,
            &weather,
        );
        let normal = weather.normal_temperatures().unwrap();
        let derivatives = modeled
            .derivative(PeriodLabel::Baseline, &normal)
            .unwrap();
        // constant 1 kWh/day annualizes to 365 kWh
        assert_relative_eq!(
            derivatives.annualized_weather_normal.value,
            365.0,
            epsilon = 1e-6
        );
        // gross predicted covers the 731-day baseline period
        assert_relative_eq!(derivatives.gross_predicted.value, 731.0, epsilon = 1e-6);
    }

    #[rstest]
    fn should_convert_therm_traces_to_kwh_equivalent(period_set: ModelingPeriodSet) {
        let trace = EnergyTrace::new(
            Interpretation::NaturalGasConsumptionSupplied,
            DailyTimeSeries::constant(date(2012, 1, 1), 365 * 4, 1.0),
            "therm",
        )
        .unwrap();
        let weather = SinusoidWeatherSource::new("994971");
        let modeled = SplitModeledTrace::fit_all(
            &BalancePointStrategy::default(),
            &period_set,
            &trace,
            &weather,
        );
        let normal = weather.normal_temperatures().unwrap();
        let derivatives = modeled.derivative(PeriodLabel::Baseline, &normal).unwrap();
        assert_relative_eq!(
            derivatives.annualized_weather_normal.value,
            365.0 * KWH_PER_THERM,
            epsilon = 1e-6
        );
    }

    #[rstest]
    fn should_record_weather_failure_without_panicking(
        period_set: ModelingPeriodSet,
        electricity_trace: EnergyTrace,
    ) {
        let weather = UnavailableWeatherSource {
            station: "000000".into(),
        };
        let modeled = SplitModeledTrace::fit_all(
            &BalancePointStrategy::default(),
            &period_set,
            &electricity_trace,
            &weather,
        );
        let outcome = modeled.outcome(PeriodLabel::Baseline).unwrap();
        assert!(matches!(
            outcome,
            FitOutcome::Failed(EvaluationError::WeatherSource(_))
        ));
        let normal = vec![10.0; 365];
        assert!(modeled.derivative(PeriodLabel::Baseline, &normal).is_none());
    }

    #[rstest]
    fn should_record_insufficient_data_for_sparse_period(period_set: ModelingPeriodSet) {
        // only 10 readings fall inside the reporting window
        let trace = EnergyTrace::new(
            Interpretation::ElectricityConsumptionSupplied,
            DailyTimeSeries::constant(date(2012, 1, 1), 731 + 31 + 10, 1.0),
            "kWh",
        )
        .unwrap();
        let weather = SinusoidWeatherSource::new("994971");
        let modeled = SplitModeledTrace::fit_all(
            &BalancePointStrategy::default(),
            &period_set,
            &trace,
            &weather,
        );
        assert!(modeled.outcome(PeriodLabel::Baseline).unwrap().is_fitted());
        assert!(matches!(
            modeled.outcome(PeriodLabel::Reporting).unwrap(),
            FitOutcome::Failed(EvaluationError::ModelFit(_))
        ));
    }

    #[rstest]
    fn should_expose_full_pair_bundle(
        period_set: ModelingPeriodSet,
        electricity_trace: EnergyTrace,
    ) {
        let weather = SinusoidWeatherSource::new("994971");
        let modeled = SplitModeledTrace::fit_all(
            &BalancePointStrategy::default(),
            &period_set,
            &electricity_trace,
            &weather,
        );
        let normal = weather.normal_temperatures().unwrap();
        let bundle = modeled
            .derivatives_for_pair((PeriodLabel::Baseline, PeriodLabel::Reporting), &normal);
        assert_eq!(bundle.unit, "KWH");
        assert!(bundle.baseline.is_some());
        assert!(bundle.reporting.is_some());
    }
}
