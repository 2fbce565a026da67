use crate::core::units::EnergyUnit;
use crate::errors::{EvaluationError, UnitConversionError};
use crate::timeseries::DailyTimeSeries;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

/// Fuel/interpretation category of a metered trace.
///
/// Consumption-supplied categories participate in cross-fuel aggregation;
/// on-site generation is reported separately and never summed into
/// `ALL_FUELS_CONSUMPTION_SUPPLIED`.
#[derive(
    Clone, Copy, Debug, Deserialize, Display, EnumIter, EnumString, Eq, Hash, PartialEq, Serialize,
)]
pub enum Interpretation {
    #[strum(serialize = "ELECTRICITY_CONSUMPTION_SUPPLIED")]
    #[serde(rename = "ELECTRICITY_CONSUMPTION_SUPPLIED")]
    ElectricityConsumptionSupplied,
    #[strum(serialize = "NATURAL_GAS_CONSUMPTION_SUPPLIED")]
    #[serde(rename = "NATURAL_GAS_CONSUMPTION_SUPPLIED")]
    NaturalGasConsumptionSupplied,
    #[strum(serialize = "ELECTRICITY_ON_SITE_GENERATION_UNCONSUMED")]
    #[serde(rename = "ELECTRICITY_ON_SITE_GENERATION_UNCONSUMED")]
    ElectricityOnSiteGenerationUnconsumed,
}

impl Interpretation {
    /// Whether traces of this category are summed into the cross-fuel
    /// consumption aggregate.
    pub fn is_consumption_supplied(&self) -> bool {
        matches!(
            self,
            Interpretation::ElectricityConsumptionSupplied
                | Interpretation::NaturalGasConsumptionSupplied
        )
    }
}

/// A labeled daily consumption series for one fuel category, with a declared
/// unit. Immutable once constructed.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct EnergyTrace {
    interpretation: Interpretation,
    unit: EnergyUnit,
    series: DailyTimeSeries,
}

impl EnergyTrace {
    /// The unit string is parsed eagerly so that an unconvertible unit is a
    /// hard error for this trace alone, before any modeling happens.
    pub fn new(
        interpretation: Interpretation,
        series: DailyTimeSeries,
        unit: &str,
    ) -> Result<Self, UnitConversionError> {
        Ok(Self {
            interpretation,
            unit: unit.parse()?,
            series,
        })
    }

    pub fn interpretation(&self) -> Interpretation {
        self.interpretation
    }

    pub fn unit(&self) -> EnergyUnit {
        self.unit
    }

    pub fn series(&self) -> &DailyTimeSeries {
        &self.series
    }
}

/// Ordered collection of traces for one project, keyed by trace identifier.
/// Traces added without an explicit label are keyed "0", "1", ... in insertion
/// order.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EnergyTraceSet {
    traces: IndexMap<String, EnergyTrace>,
}

impl EnergyTraceSet {
    pub fn new(traces: Vec<EnergyTrace>) -> Self {
        Self {
            traces: traces
                .into_iter()
                .enumerate()
                .map(|(i, trace)| (i.to_string(), trace))
                .collect(),
        }
    }

    pub fn with_labels(traces: IndexMap<String, EnergyTrace>) -> Self {
        Self { traces }
    }

    pub fn traces(&self) -> &IndexMap<String, EnergyTrace> {
        &self.traces
    }

    pub fn len(&self) -> usize {
        self.traces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }
}

/// A dated efficiency intervention: the half-open interval [start, end) during
/// which the change (e.g. a retrofit) was carried out.
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct Intervention {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl Intervention {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, EvaluationError> {
        if start >= end {
            return Err(EvaluationError::InvalidProject(format!(
                "intervention must have start < end (got {start} >= {end})"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }
}

/// Site of the metered building. Station resolution (ZIP to weather station)
/// belongs to external collaborators; the core only carries the identifier.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ZipCodeSite {
    pub zip_code: String,
}

impl ZipCodeSite {
    pub fn new(zip_code: impl Into<String>) -> Self {
        Self {
            zip_code: zip_code.into(),
        }
    }
}

/// Everything the meter needs about one building: its traces, its ordered
/// interventions and its site.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Project {
    energy_trace_set: EnergyTraceSet,
    interventions: Vec<Intervention>,
    site: ZipCodeSite,
}

impl Project {
    pub fn new(
        energy_trace_set: EnergyTraceSet,
        interventions: Vec<Intervention>,
        site: ZipCodeSite,
    ) -> Result<Self, EvaluationError> {
        if energy_trace_set.is_empty() {
            return Err(EvaluationError::InvalidProject(
                "project has no energy traces".into(),
            ));
        }
        if interventions.is_empty() {
            return Err(EvaluationError::InvalidProject(
                "project has no interventions".into(),
            ));
        }
        let interventions = interventions
            .into_iter()
            .sorted_by_key(|intervention| intervention.start())
            .collect();
        Ok(Self {
            energy_trace_set,
            interventions,
            site,
        })
    }

    pub fn energy_trace_set(&self) -> &EnergyTraceSet {
        &self.energy_trace_set
    }

    /// Interventions ordered by start.
    pub fn interventions(&self) -> &[Intervention] {
        &self.interventions
    }

    pub fn site(&self) -> &ZipCodeSite {
        &self.site
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeseries::midnight_utc;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rstest::*;

    fn instant(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        midnight_utc(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    #[fixture]
    fn trace() -> EnergyTrace {
        EnergyTrace::new(
            Interpretation::ElectricityConsumptionSupplied,
            DailyTimeSeries::constant(NaiveDate::from_ymd_opt(2012, 1, 1).unwrap(), 30, 1.0),
            "kWh",
        )
        .unwrap()
    }

    #[rstest]
    fn should_reject_unknown_trace_unit() {
        let result = EnergyTrace::new(
            Interpretation::NaturalGasConsumptionSupplied,
            DailyTimeSeries::constant(NaiveDate::from_ymd_opt(2012, 1, 1).unwrap(), 30, 1.0),
            "cords_of_firewood",
        );
        assert!(result.is_err());
    }

    #[rstest]
    fn should_key_traces_by_insertion_order(trace: EnergyTrace) {
        let set = EnergyTraceSet::new(vec![trace.clone(), trace]);
        assert_eq!(set.traces().keys().collect::<Vec<_>>(), vec!["0", "1"]);
    }

    #[rstest]
    fn should_reject_inverted_intervention() {
        assert!(Intervention::new(instant(2014, 2, 1), instant(2014, 1, 1)).is_err());
    }

    #[rstest]
    fn should_sort_interventions_by_start(trace: EnergyTrace) {
        let later = Intervention::new(instant(2014, 6, 1), instant(2014, 7, 1)).unwrap();
        let earlier = Intervention::new(instant(2014, 1, 1), instant(2014, 2, 1)).unwrap();
        let project = Project::new(
            EnergyTraceSet::new(vec![trace]),
            vec![later, earlier],
            ZipCodeSite::new("02138"),
        )
        .unwrap();
        assert_eq!(project.interventions()[0].start(), instant(2014, 1, 1));
    }

    #[rstest]
    fn should_reject_project_without_traces() {
        let intervention = Intervention::new(instant(2014, 1, 1), instant(2014, 2, 1)).unwrap();
        let result = Project::new(
            EnergyTraceSet::default(),
            vec![intervention],
            ZipCodeSite::new("02138"),
        );
        assert!(matches!(result, Err(EvaluationError::InvalidProject(_))));
    }

    #[rstest]
    fn should_distinguish_consumption_from_generation() {
        assert!(Interpretation::ElectricityConsumptionSupplied.is_consumption_supplied());
        assert!(Interpretation::NaturalGasConsumptionSupplied.is_consumption_supplied());
        assert!(!Interpretation::ElectricityOnSiteGenerationUnconsumed.is_consumption_supplied());
    }

    #[rstest]
    fn should_render_screaming_snake_labels() {
        assert_eq!(
            Interpretation::ElectricityConsumptionSupplied.to_string(),
            "ELECTRICITY_CONSUMPTION_SUPPLIED"
        );
    }
}
