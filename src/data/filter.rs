//! Dataset-wide filter ranges and row filtering.

use std::collections::BTreeMap;

use serde::Serialize;

use super::site_map::{Experiment, NormalizedMutation};

/// Slider bounds for one filterable column, derived from every row of an
/// experiment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterRange {
    /// Column name.
    pub column: String,
    /// Slider label.
    pub label: String,
    /// Smallest value in the column.
    pub min: f64,
    /// Largest value in the column.
    pub max: f64,
    /// Slider step (a hundredth of the range).
    pub step: f64,
}

impl Experiment {
    /// Filter ranges for every filterable column, in declaration order.
    /// Columns without any numeric value are skipped.
    #[must_use]
    pub fn filter_ranges(&self) -> Vec<FilterRange> {
        self.filter_cols
            .iter()
            .filter_map(|(column, label)| {
                let (min, max) = self.column_extent(column)?;
                Some(FilterRange {
                    column: column.to_owned(),
                    label: label.clone(),
                    min,
                    max,
                    step: (max - min) / 100.0,
                })
            })
            .collect()
    }

    /// Min and max of a numeric column over every row.
    #[must_use]
    pub fn column_extent(&self, column: &str) -> Option<(f64, f64)> {
        self.mutations
            .iter()
            .filter_map(|m| m.value(column))
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((f64::min(lo, v), f64::max(hi, v))),
            })
    }
}

/// Default filter thresholds: each column's minimum, which keeps every
/// row.
#[must_use]
pub fn default_filters(experiment: &Experiment) -> BTreeMap<String, f64> {
    experiment
        .filter_ranges()
        .into_iter()
        .map(|range| (range.column, range.min))
        .collect()
}

/// Whether a row survives every threshold. Rows lacking a filtered column
/// are kept.
#[must_use]
pub fn passes_filters(
    row: &NormalizedMutation,
    filters: &BTreeMap<String, f64>,
) -> bool {
    filters.iter().all(|(column, threshold)| {
        row.value(column).is_none_or(|v| v >= *threshold)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{normalize_experiment, RawExperiment};

    fn experiment() -> Experiment {
        let raw: RawExperiment = serde_json::from_value(serde_json::json!({
            "sitemap": {
                "1": {"sequential_site": 1, "protein_site": 1, "chains": "A"},
                "2": {"sequential_site": 2, "protein_site": 2, "chains": "A"}
            },
            "mut_metric_df": [
                {"reference_site": "1", "epitope": "A", "escape": 1.0, "times_seen": 2},
                {"reference_site": "1", "epitope": "A", "escape": 2.0, "times_seen": 7},
                {"reference_site": "2", "epitope": "A", "escape": 3.0},
                {"reference_site": "2", "epitope": "A", "escape": 4.0, "times_seen": 12}
            ],
            "metric_col": "escape",
            "epitopes": ["A"],
            "pdb": "6xr8",
            "filter_cols": {"times_seen": "Times Seen", "missing": "Missing"}
        }))
        .unwrap();
        normalize_experiment("exp", &raw).unwrap()
    }

    #[test]
    fn ranges_cover_all_rows() {
        let ranges = experiment().filter_ranges();
        assert_eq!(ranges.len(), 1);
        let range = &ranges[0];
        assert_eq!(range.column, "times_seen");
        assert_eq!(range.label, "Times Seen");
        assert_eq!((range.min, range.max), (2.0, 12.0));
        assert_eq!(range.step, 0.1);
    }

    #[test]
    fn defaults_are_column_minimums() {
        let filters = default_filters(&experiment());
        assert_eq!(filters.get("times_seen"), Some(&2.0));
        assert!(!filters.contains_key("missing"));
    }

    #[test]
    fn thresholds_keep_rows_at_or_above() {
        let exp = experiment();
        let filters = BTreeMap::from([("times_seen".to_owned(), 7.0)]);
        let kept: Vec<f64> = exp
            .mutations
            .iter()
            .filter(|m| passes_filters(m, &filters))
            .filter_map(|m| m.metric)
            .collect();
        // Row without the column survives.
        assert_eq!(kept, [2.0, 3.0, 4.0]);
    }
}
