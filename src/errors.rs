use thiserror::Error;

/// Top-level error for a project evaluation. Only structurally invalid input is
/// fatal to a whole evaluation; the per-period variants are recoverable and are
/// normally recorded against the affected (trace, period) rather than raised.
#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("Project was considered invalid due to error: {0}")]
    InvalidProject(String),
    #[error(transparent)]
    InsufficientData(#[from] InsufficientDataError),
    #[error(transparent)]
    ModelFit(#[from] ModelFitError),
    #[error(transparent)]
    UnitConversion(#[from] UnitConversionError),
    #[error(transparent)]
    WeatherSource(#[from] WeatherSourceError),
}

/// A modeling period held too few observations to attempt a fit.
#[derive(Clone, Debug, Error)]
#[error("Insufficient data for '{context}': {observed} observations, {required} required")]
pub struct InsufficientDataError {
    pub context: String,
    pub observed: usize,
    pub required: usize,
}

impl InsufficientDataError {
    pub(crate) fn new(context: impl Into<String>, observed: usize, required: usize) -> Self {
        Self {
            context: context.into(),
            observed,
            required,
        }
    }
}

/// The regression inputs were degenerate. Recoverable: the caller records a
/// `None` derivative for the affected period and continues.
#[derive(Clone, Debug, Error)]
pub enum ModelFitError {
    #[error("Too few observations to fit: {observed} present, {required} required")]
    TooFewObservations { observed: usize, required: usize },
    #[error("Temperature series has (near-)zero variance; no weather response can be fitted")]
    ZeroTemperatureVariance,
    #[error("Non-finite value encountered in fit inputs")]
    NonFiniteInput,
    #[error("Degenerate regression inputs: {0}")]
    Degenerate(String),
}

/// A trace's declared unit could not be reconciled with the canonical
/// aggregation unit (kWh).
#[derive(Clone, Debug, Error)]
#[error("Unrecognized energy unit '{unit}'")]
pub struct UnitConversionError {
    pub unit: String,
}

/// An underlying weather lookup failed. Fatal for the affected trace's model
/// fit but does not abort other traces.
#[derive(Debug, Error)]
#[error("Weather lookup failed for station '{station}': {source}")]
pub struct WeatherSourceError {
    pub station: String,
    #[source]
    pub source: anyhow::Error,
}

impl WeatherSourceError {
    pub fn new(station: impl Into<String>, source: anyhow::Error) -> Self {
        Self {
            station: station.into(),
            source,
        }
    }
}
