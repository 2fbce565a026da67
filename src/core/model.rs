use crate::errors::ModelFitError;
use crate::statistics::{sample_variance, Z_95};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// One (consumption, temperature) pair for a single day of a modeling period.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DailyObservation {
    pub value: f64,
    pub temperature: f64,
}

/// Fixed-width derivative summary: point estimate, 95% confidence bounds
/// derived from model residual variance, and the number of daily observations
/// behind the estimate (kept as f64 so the serialized form is a homogeneous
/// 4-element array).
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(into = "[f64; 4]", from = "[f64; 4]")]
pub struct DerivativeValue {
    pub value: f64,
    pub lower: f64,
    pub upper: f64,
    pub n: f64,
}

impl DerivativeValue {
    pub fn from_variance(value: f64, variance: f64, n: f64) -> Self {
        let half_width = Z_95 * variance.max(0.).sqrt();
        Self {
            value,
            lower: value - half_width,
            upper: value + half_width,
            n,
        }
    }

    /// Variance implied by the stored bounds.
    pub fn variance(&self) -> f64 {
        let half_width = (self.upper - self.value) / Z_95;
        half_width * half_width
    }

    /// Sum of two independent estimates: point values and observation counts
    /// add, bounds recombine from summed variances (half-widths add in
    /// quadrature, never naively).
    pub fn combine(&self, other: &DerivativeValue) -> DerivativeValue {
        DerivativeValue::from_variance(
            self.value + other.value,
            self.variance() + other.variance(),
            self.n + other.n,
        )
    }

    /// Rescale into another unit; bounds scale with the value, the
    /// observation count does not.
    pub fn scaled(&self, factor: f64) -> DerivativeValue {
        DerivativeValue {
            value: self.value * factor,
            lower: self.lower * factor,
            upper: self.upper * factor,
            n: self.n,
        }
    }

    pub fn as_array(&self) -> [f64; 4] {
        [self.value, self.lower, self.upper, self.n]
    }
}

impl From<DerivativeValue> for [f64; 4] {
    fn from(derivative: DerivativeValue) -> Self {
        derivative.as_array()
    }
}

impl From<[f64; 4]> for DerivativeValue {
    fn from([value, lower, upper, n]: [f64; 4]) -> Self {
        Self {
            value,
            lower,
            upper,
            n,
        }
    }
}

/// A fitted statistical consumption model for one modeling period. Immutable
/// after fit; prediction must extrapolate (not fail) outside the fitted
/// temperature range.
pub trait PeriodModel: std::fmt::Debug + Send + Sync {
    /// Predicted consumption at the same resolution as the input temperatures.
    fn predict(&self, temperatures: &[f64]) -> Vec<f64>;

    /// Annualized consumption under the canonical 365-day typical-year
    /// temperature profile.
    fn annualized_normal(&self, normal_temperatures: &[f64]) -> DerivativeValue;

    /// Total predicted consumption under the actual observed weather for a
    /// period, for counterfactual comparison.
    fn gross_predicted(&self, actual_temperatures: &[f64]) -> DerivativeValue;

    fn observation_count(&self) -> usize;
}

/// Pluggable fit strategy; any regression technique satisfying the
/// [`PeriodModel`] output contract can be substituted for the default.
pub trait ModelStrategy: Send + Sync {
    fn fit(&self, observations: &[DailyObservation])
        -> Result<Box<dyn PeriodModel>, ModelFitError>;
}

const VARIANCE_EPS: f64 = 1e-9;

/// Default strategy: ordinary least squares of daily consumption on heating
/// and cooling degree days at fixed balance points, with an intercept. Degree-
/// day regressors with no variance over the period are dropped rather than
/// fed to a singular solve.
#[derive(Clone, Copy, Debug)]
pub struct BalancePointStrategy {
    pub heating_balance_point: f64,
    pub cooling_balance_point: f64,
    pub min_observations: usize,
}

impl Default for BalancePointStrategy {
    fn default() -> Self {
        Self {
            // 65F expressed in deg C
            heating_balance_point: 18.33,
            cooling_balance_point: 18.33,
            min_observations: 30,
        }
    }
}

impl ModelStrategy for BalancePointStrategy {
    fn fit(
        &self,
        observations: &[DailyObservation],
    ) -> Result<Box<dyn PeriodModel>, ModelFitError> {
        let n = observations.len();
        if n < self.min_observations {
            return Err(ModelFitError::TooFewObservations {
                observed: n,
                required: self.min_observations,
            });
        }
        if observations
            .iter()
            .any(|obs| !obs.value.is_finite() || !obs.temperature.is_finite())
        {
            return Err(ModelFitError::NonFiniteInput);
        }

        let temperatures = observations
            .iter()
            .map(|obs| obs.temperature)
            .collect::<Vec<_>>();
        if sample_variance(&temperatures) < VARIANCE_EPS {
            return Err(ModelFitError::ZeroTemperatureVariance);
        }

        let hdd = temperatures
            .iter()
            .map(|t| (self.heating_balance_point - t).max(0.))
            .collect::<Vec<_>>();
        let cdd = temperatures
            .iter()
            .map(|t| (t - self.cooling_balance_point).max(0.))
            .collect::<Vec<_>>();

        let mut regressors: Vec<&[f64]> = vec![];
        let use_hdd = sample_variance(&hdd) >= VARIANCE_EPS;
        let use_cdd = sample_variance(&cdd) >= VARIANCE_EPS;
        if use_hdd {
            regressors.push(&hdd);
        }
        if use_cdd {
            regressors.push(&cdd);
        }

        let p = regressors.len() + 1;
        if n <= p {
            return Err(ModelFitError::Degenerate(format!(
                "{n} observations cannot support {p} regression parameters"
            )));
        }

        let x = DMatrix::from_fn(n, p, |row, col| {
            if col == 0 {
                1.0
            } else {
                regressors[col - 1][row]
            }
        });
        let y = DVector::from_iterator(n, observations.iter().map(|obs| obs.value));

        let beta = x
            .clone()
            .svd(true, true)
            .solve(&y, VARIANCE_EPS)
            .map_err(|message| ModelFitError::Degenerate(message.to_string()))?;

        let residuals = &y - &x * &beta;
        let residual_variance = residuals.iter().map(|r| r * r).sum::<f64>() / (n - p) as f64;

        let mut coefficients = beta.iter().copied().skip(1);
        let heating_coefficient = use_hdd.then(|| coefficients.next().unwrap_or(0.));
        let cooling_coefficient = use_cdd.then(|| coefficients.next().unwrap_or(0.));

        Ok(Box::new(BalancePointModel {
            intercept: beta[0],
            heating_balance_point: self.heating_balance_point,
            cooling_balance_point: self.cooling_balance_point,
            heating_coefficient,
            cooling_coefficient,
            residual_variance,
            observation_count: n,
        }))
    }
}

/// Learned parameters of a balance-point fit. Immutable after fit.
#[derive(Clone, Debug)]
pub struct BalancePointModel {
    intercept: f64,
    heating_balance_point: f64,
    cooling_balance_point: f64,
    heating_coefficient: Option<f64>,
    cooling_coefficient: Option<f64>,
    residual_variance: f64,
    observation_count: usize,
}

impl BalancePointModel {
    fn predict_one(&self, temperature: f64) -> f64 {
        let mut prediction = self.intercept;
        if let Some(coefficient) = self.heating_coefficient {
            prediction += coefficient * (self.heating_balance_point - temperature).max(0.);
        }
        if let Some(coefficient) = self.cooling_coefficient {
            prediction += coefficient * (temperature - self.cooling_balance_point).max(0.);
        }
        prediction
    }

    /// Independent daily residuals: the variance of a summed prediction grows
    /// linearly with the number of predicted days.
    fn summed_prediction(&self, temperatures: &[f64]) -> DerivativeValue {
        let total = temperatures.iter().map(|t| self.predict_one(*t)).sum();
        DerivativeValue::from_variance(
            total,
            self.residual_variance * temperatures.len() as f64,
            self.observation_count as f64,
        )
    }
}

impl PeriodModel for BalancePointModel {
    fn predict(&self, temperatures: &[f64]) -> Vec<f64> {
        temperatures.iter().map(|t| self.predict_one(*t)).collect()
    }

    fn annualized_normal(&self, normal_temperatures: &[f64]) -> DerivativeValue {
        self.summed_prediction(normal_temperatures)
    }

    fn gross_predicted(&self, actual_temperatures: &[f64]) -> DerivativeValue {
        self.summed_prediction(actual_temperatures)
    }

    fn observation_count(&self) -> usize {
        self.observation_count
    }
}
