use crate::core::aggregate::{
    aggregate_project_derivatives, empty_category_map, PeriodPair, ProjectDerivativeSet,
};
use crate::core::model::{BalancePointStrategy, ModelStrategy};
use crate::core::periods::{split_modeling_periods, GapPolicy, ModelingPeriodSet, PeriodLabel};
use crate::core::split_trace::{SplitModeledTrace, TraceDerivatives};
use crate::core::units::CANONICAL_UNIT_LABEL;
use crate::errors::EvaluationError;
use crate::project::Project;
use crate::weather::WeatherSource;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use rayon::prelude::*;
use std::sync::Arc;
use tracing::warn;

/// Evaluation-wide knobs. Per-model fitting thresholds live on the model
/// strategy itself.
#[derive(Clone, Copy, Debug)]
pub struct MeterSettings {
    /// Minimum calendar length of the canonical baseline and reporting
    /// windows.
    pub min_period_days: i64,
    pub gap_policy: GapPolicy,
}

impl Default for MeterSettings {
    fn default() -> Self {
        Self {
            min_period_days: 30,
            gap_policy: GapPolicy::default(),
        }
    }
}

/// The full result bundle of one project evaluation. Always has the complete
/// expected shape; anything that could not be computed is a `None` placeholder
/// rather than a missing key.
pub struct EvaluationResults {
    pub modeling_period_set: ModelingPeriodSet,
    pub modeled_energy_traces: IndexMap<String, SplitModeledTrace>,
    pub modeled_energy_trace_derivatives: IndexMap<String, IndexMap<PeriodPair, TraceDerivatives>>,
    pub project_derivatives: ProjectDerivativeSet,
    pub weather_source: Arc<dyn WeatherSource>,
    pub weather_normal_source: Arc<dyn WeatherSource>,
}

/// Orchestrates one project evaluation: period splitting, per-trace fitting,
/// weather normalization and cross-fuel aggregation.
pub struct EnergyEfficiencyMeter {
    settings: MeterSettings,
    strategy: Arc<dyn ModelStrategy>,
}

impl Default for EnergyEfficiencyMeter {
    fn default() -> Self {
        Self {
            settings: MeterSettings::default(),
            strategy: Arc::new(BalancePointStrategy::default()),
        }
    }
}

impl EnergyEfficiencyMeter {
    pub fn new(settings: MeterSettings, strategy: Arc<dyn ModelStrategy>) -> Self {
        Self { settings, strategy }
    }

    /// Evaluate a project against an actual-weather source and a typical-year
    /// ("normal") weather source.
    ///
    /// Errors only on structurally invalid input. Anything local to one
    /// (trace, period) degrades to `None` derivatives with a recorded
    /// diagnostic.
    pub fn evaluate(
        &self,
        project: &Project,
        weather_source: Arc<dyn WeatherSource>,
        weather_normal_source: Arc<dyn WeatherSource>,
    ) -> Result<EvaluationResults, EvaluationError> {
        let (span_start, span_end) = analyzed_span(project)?;

        let modeling_period_set = match split_modeling_periods(
            span_start,
            span_end,
            project.interventions(),
            self.settings.gap_policy,
            self.settings.min_period_days,
        ) {
            Ok(set) => set,
            Err(error) => {
                warn!(%error, "could not establish modeling periods; returning empty derivatives");
                return Ok(degraded_results(weather_source, weather_normal_source));
            }
        };

        // traces are independent after splitting, so fits run in parallel
        let modeled_energy_traces: IndexMap<String, SplitModeledTrace> = project
            .energy_trace_set()
            .traces()
            .iter()
            .collect::<Vec<_>>()
            .into_par_iter()
            .map(|(trace_id, trace)| {
                (
                    trace_id.clone(),
                    SplitModeledTrace::fit_all(
                        self.strategy.as_ref(),
                        &modeling_period_set,
                        trace,
                        &weather_source,
                    ),
                )
            })
            .collect::<Vec<_>>()
            .into_iter()
            .collect();

        let normal_temperatures = match weather_normal_source.normal_temperatures() {
            Ok(profile) => Some(profile),
            Err(error) => {
                warn!(%error, "typical-year profile unavailable; derivatives will be absent");
                None
            }
        };

        let period_pairs = modeling_period_set.period_pairs();
        let modeled_energy_trace_derivatives = modeled_energy_traces
            .iter()
            .map(|(trace_id, modeled)| {
                let per_pair = period_pairs
                    .iter()
                    .map(|pair| {
                        let bundle = match &normal_temperatures {
                            Some(profile) => modeled.derivatives_for_pair(*pair, profile),
                            None => TraceDerivatives {
                                interpretation: modeled.interpretation(),
                                unit: CANONICAL_UNIT_LABEL.to_string(),
                                baseline: None,
                                reporting: None,
                            },
                        };
                        (*pair, bundle)
                    })
                    .collect::<IndexMap<_, _>>();
                (trace_id.clone(), per_pair)
            })
            .collect::<IndexMap<_, _>>();

        let project_derivatives =
            aggregate_project_derivatives(&modeled_energy_trace_derivatives, &period_pairs);

        Ok(EvaluationResults {
            modeling_period_set,
            modeled_energy_traces,
            modeled_energy_trace_derivatives,
            project_derivatives,
            weather_source,
            weather_normal_source,
        })
    }
}

/// Union of the observed spans of all traces; the single partitioning scheme
/// derived from it applies across fuels.
fn analyzed_span(project: &Project) -> Result<(DateTime<Utc>, DateTime<Utc>), EvaluationError> {
    let mut span: Option<(DateTime<Utc>, DateTime<Utc>)> = None;
    for trace in project.energy_trace_set().traces().values() {
        let series = trace.series();
        if series.is_empty() {
            continue;
        }
        let start = series
            .span_start()
            .map_err(|e| EvaluationError::InvalidProject(e.to_string()))?;
        let end = series
            .span_end()
            .map_err(|e| EvaluationError::InvalidProject(e.to_string()))?;
        span = Some(match span {
            Some((s, e)) => (s.min(start), e.max(end)),
            None => (start, end),
        });
    }
    span.ok_or_else(|| EvaluationError::InvalidProject("all energy traces are empty".into()))
}

fn degraded_results(
    weather_source: Arc<dyn WeatherSource>,
    weather_normal_source: Arc<dyn WeatherSource>,
) -> EvaluationResults {
    let mut project_derivatives = ProjectDerivativeSet::new();
    project_derivatives.insert(
        (PeriodLabel::Baseline, PeriodLabel::Reporting),
        empty_category_map(),
    );
    EvaluationResults {
        modeling_period_set: ModelingPeriodSet::default(),
        modeled_energy_traces: IndexMap::new(),
        modeled_energy_trace_derivatives: IndexMap::new(),
        project_derivatives,
        weather_source,
        weather_normal_source,
    }
}
