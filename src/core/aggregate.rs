use crate::core::periods::PeriodLabel;
use crate::core::split_trace::{PeriodDerivatives, TraceDerivatives};
use crate::core::units::CANONICAL_UNIT_LABEL;
use crate::project::Interpretation;
use indexmap::IndexMap;
use serde::Serialize;
use strum::IntoEnumIterator;

/// Key of the cross-fuel consumption aggregate.
pub const ALL_FUELS_CONSUMPTION_SUPPLIED: &str = "ALL_FUELS_CONSUMPTION_SUPPLIED";

/// A (baseline, reporting) pairing of canonical period labels.
pub type PeriodPair = (PeriodLabel, PeriodLabel);

/// Combined derivatives for one fuel category or fuel group. Leaves are
/// `None` when the underlying period model was not fit for any contributing
/// trace.
#[derive(Clone, Debug, Serialize)]
pub struct FuelDerivatives {
    pub unit: String,
    pub baseline: Option<PeriodDerivatives>,
    pub reporting: Option<PeriodDerivatives>,
}

/// Per-pairing map from fuel-category (and fuel-group) key to its combined
/// derivatives. Every recognized category is present; absent categories map
/// to `None`, which is an expected value, not an error.
pub type ProjectDerivativeSet = IndexMap<PeriodPair, IndexMap<String, Option<FuelDerivatives>>>;

/// All recognized category keys with `None` values, in deterministic order.
/// Used both as the aggregation scaffold and as the degraded result shape when
/// no periods could be established at all.
pub fn empty_category_map() -> IndexMap<String, Option<FuelDerivatives>> {
    let mut map: IndexMap<String, Option<FuelDerivatives>> = Interpretation::iter()
        .map(|interpretation| (interpretation.to_string(), None))
        .collect();
    map.insert(ALL_FUELS_CONSUMPTION_SUPPLIED.to_string(), None);
    map
}

/// Combine per-trace derivatives into per-fuel-category and cross-fuel
/// summaries for each period pairing.
///
/// Per-category bundles sum point estimates and observation counts across
/// traces of that category, propagating uncertainty by independent-variance
/// addition. The cross-fuel aggregate then sums the per-category bundles of
/// consumption-supplied categories only; generation categories are reported
/// separately and never join it.
pub fn aggregate_project_derivatives(
    trace_derivatives: &IndexMap<String, IndexMap<PeriodPair, TraceDerivatives>>,
    period_pairs: &[PeriodPair],
) -> ProjectDerivativeSet {
    let mut result = ProjectDerivativeSet::new();
    for pair in period_pairs {
        let mut categories = empty_category_map();

        for interpretation in Interpretation::iter() {
            let contributions = trace_derivatives
                .values()
                .filter_map(|per_pair| per_pair.get(pair))
                .filter(|bundle| bundle.interpretation == interpretation)
                .collect::<Vec<_>>();
            if contributions.is_empty() {
                continue;
            }
            categories.insert(
                interpretation.to_string(),
                Some(FuelDerivatives {
                    unit: CANONICAL_UNIT_LABEL.to_string(),
                    baseline: combine_leaves(
                        contributions.iter().map(|bundle| bundle.baseline.as_ref()),
                    ),
                    reporting: combine_leaves(
                        contributions.iter().map(|bundle| bundle.reporting.as_ref()),
                    ),
                }),
            );
        }

        let consumption_bundles = Interpretation::iter()
            .filter(Interpretation::is_consumption_supplied)
            .filter_map(|interpretation| {
                categories
                    .get(&interpretation.to_string())
                    .and_then(|entry| entry.clone())
            })
            .collect::<Vec<_>>();
        if !consumption_bundles.is_empty() {
            categories.insert(
                ALL_FUELS_CONSUMPTION_SUPPLIED.to_string(),
                Some(FuelDerivatives {
                    unit: CANONICAL_UNIT_LABEL.to_string(),
                    baseline: combine_leaves(
                        consumption_bundles.iter().map(|bundle| bundle.baseline.as_ref()),
                    ),
                    reporting: combine_leaves(
                        consumption_bundles.iter().map(|bundle| bundle.reporting.as_ref()),
                    ),
                }),
            );
        }

        result.insert(*pair, categories);
    }
    result
}

/// Sum the leaves that are present; `None` only when none are.
fn combine_leaves<'a>(
    leaves: impl Iterator<Item = Option<&'a PeriodDerivatives>>,
) -> Option<PeriodDerivatives> {
    leaves
        .flatten()
        .fold(None, |accumulated: Option<PeriodDerivatives>, leaf| {
            Some(match accumulated {
                Some(total) => total.combine(leaf),
                None => *leaf,
            })
        })
}
