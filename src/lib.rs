pub mod core;
mod errors;
pub mod meter;
pub mod project;
mod statistics;
pub mod timeseries;
pub mod weather;

pub use crate::core::aggregate::{
    FuelDerivatives, PeriodPair, ProjectDerivativeSet, ALL_FUELS_CONSUMPTION_SUPPLIED,
};
pub use crate::core::model::{
    BalancePointModel, BalancePointStrategy, DailyObservation, DerivativeValue, ModelStrategy,
    PeriodModel,
};
pub use crate::core::periods::{
    split_modeling_periods, GapPolicy, ModelingPeriod, ModelingPeriodSet, PeriodLabel,
};
pub use crate::core::split_trace::{
    FitOutcome, PeriodDerivatives, SplitModeledTrace, TraceDerivatives,
};
pub use crate::core::units::EnergyUnit;
pub use crate::errors::{
    EvaluationError, InsufficientDataError, ModelFitError, UnitConversionError, WeatherSourceError,
};
pub use crate::meter::{EnergyEfficiencyMeter, EvaluationResults, MeterSettings};
pub use crate::project::{
    EnergyTrace, EnergyTraceSet, Intervention, Interpretation, Project, ZipCodeSite,
};
pub use crate::timeseries::DailyTimeSeries;
pub use crate::weather::{CachedWeatherSource, TemperatureSeries, WeatherSource};
