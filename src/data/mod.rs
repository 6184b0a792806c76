//! Dataset validation, site mapping, and metric aggregation.
//!
//! Input datasets map experiment names to [`RawExperiment`]s. They are
//! validated against a minimal schema ([`RawDataset::from_json`]), then
//! normalized by the site mapper ([`normalize`]) into a [`Dataset`] whose
//! rows carry all three site numbering schemes. Everything downstream
//! (chart, structure, legend) reads the normalized form only.

mod filter;
mod ordered;
mod raw;
mod site_map;
mod summary;

use serde_json::Value;

pub use filter::{default_filters, passes_filters, FilterRange};
pub use ordered::OrderedMap;
pub use raw::{
    ChainSpec, ColumnLabels, ExcludeChains, MutationRecord, ProteinSite,
    RawExperiment, SiteMapEntry,
};
pub use site_map::{
    normalize, normalize_experiment, Dataset, Experiment, NormalizedMutation,
};
pub use summary::{summarize, SiteStats, SiteSummary};

use crate::error::DmsVizError;

/// Keys every experiment object must carry.
pub const REQUIRED_KEYS: [&str; 5] =
    ["sitemap", "mut_metric_df", "metric_col", "epitopes", "pdb"];

/// Bundled example dataset, used whenever user data cannot be loaded.
const EXAMPLE_JSON: &str = include_str!("../../assets/example.json");

/// A validated (but not yet site-mapped) dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDataset {
    /// Experiment name → experiment, in document order.
    pub experiments: OrderedMap<RawExperiment>,
}

impl RawDataset {
    /// Parse and validate a dataset document.
    ///
    /// The top level must be a non-empty object of experiments, each
    /// carrying every key in [`REQUIRED_KEYS`] and at least one epitope.
    pub fn from_json(text: &str) -> Result<Self, DmsVizError> {
        let root: OrderedMap<Value> =
            serde_json::from_str(text).map_err(|e| {
                DmsVizError::SchemaValidation(format!(
                    "expected an object of experiments: {e}"
                ))
            })?;
        if root.is_empty() {
            return Err(DmsVizError::SchemaValidation(
                "dataset contains no experiments".to_owned(),
            ));
        }

        let mut experiments = OrderedMap::new();
        for (name, value) in root {
            let experiment = Self::validate_experiment(&name, value)?;
            let _ = experiments.insert(name, experiment);
        }
        log::debug!("validated dataset with {} experiments", experiments.len());
        Ok(Self { experiments })
    }

    fn validate_experiment(
        name: &str,
        value: Value,
    ) -> Result<RawExperiment, DmsVizError> {
        let Some(object) = value.as_object() else {
            return Err(DmsVizError::SchemaValidation(format!(
                "experiment '{name}' is not an object"
            )));
        };
        if let Some(missing) =
            REQUIRED_KEYS.iter().find(|key| !object.contains_key(**key))
        {
            return Err(DmsVizError::SchemaValidation(format!(
                "experiment '{name}' is missing required key '{missing}'"
            )));
        }

        let experiment: RawExperiment =
            serde_json::from_value(value).map_err(|e| {
                DmsVizError::SchemaValidation(format!(
                    "experiment '{name}': {e}"
                ))
            })?;
        if experiment.epitopes.is_empty() {
            return Err(DmsVizError::SchemaValidation(format!(
                "experiment '{name}' lists no epitopes"
            )));
        }
        Ok(experiment)
    }

    /// The bundled example dataset.
    pub fn example() -> Result<Self, DmsVizError> {
        Self::from_json(EXAMPLE_JSON)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn example_dataset_is_valid() {
        let raw = RawDataset::example().unwrap();
        assert!(!raw.experiments.is_empty());
        let dataset = normalize(&raw).unwrap();
        assert_eq!(dataset.len(), raw.experiments.len());
    }

    #[test]
    fn missing_required_key_is_reported() {
        let text = r#"{"exp": {"sitemap": {}, "metric_col": "escape",
            "epitopes": ["1"], "pdb": "6xr8"}}"#;
        let err = RawDataset::from_json(text).unwrap_err();
        assert!(matches!(err, DmsVizError::SchemaValidation(_)));
        assert!(err.to_string().contains("mut_metric_df"));
    }

    #[test]
    fn empty_epitopes_rejected() {
        let text = r#"{"exp": {"sitemap": {}, "mut_metric_df": [],
            "metric_col": "escape", "epitopes": [], "pdb": "6xr8"}}"#;
        assert!(RawDataset::from_json(text).is_err());
    }

    #[test]
    fn non_object_rejected() {
        assert!(RawDataset::from_json("[1, 2, 3]").is_err());
        assert!(RawDataset::from_json("{}").is_err());
        assert!(RawDataset::from_json("not json").is_err());
    }

    #[test]
    fn experiment_order_is_preserved() {
        let exp = r#"{"sitemap": {}, "mut_metric_df": [],
            "metric_col": "escape", "epitopes": [1], "pdb": "6xr8"}"#;
        let text = format!(r#"{{"second": {exp}, "first": {exp}}}"#);
        let raw = RawDataset::from_json(&text).unwrap();
        let names: Vec<&str> = raw.experiments.keys().collect();
        assert_eq!(names, ["second", "first"]);
        let (_, first) = raw.experiments.first().unwrap();
        assert_eq!(first.epitopes, ["1"]);
    }
}
