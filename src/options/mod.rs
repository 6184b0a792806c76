//! The canonical tool configuration and its option vocabulary.
//!
//! [`ToolConfig`] is the single source of truth the tool owns; every view
//! receives a projection of it. Display options that only touch the
//! structure live in [`ProteinOptions`] (flattened into the config, and
//! storable as TOML presets). Individual options are addressed through
//! the [`OptionKey`] enumeration rather than by field name.

mod display;
mod key;
mod protein;

use std::collections::BTreeMap;

pub use display::{
    BackgroundRepresentation, LigandRepresentation, ProteinRepresentation,
    SelectionRepresentation, SummaryKind,
};
pub(crate) use display::variant_name;
pub use key::{OptionKey, OptionScope, ToolOption};
pub use protein::ProteinOptions;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::data::{default_filters, Experiment};

/// The canonical configuration. Field names match the URL parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "dms-viz")]
#[serde(default, rename_all = "camelCase")]
pub struct ToolConfig {
    /// Active experiment (dataset key).
    #[schemars(title = "Experiment")]
    pub experiment: String,
    /// Per-site aggregation.
    #[schemars(title = "Summary")]
    pub summary: SummaryKind,
    /// Clamp negative summaries to zero before plotting and coloring.
    #[schemars(title = "Floor")]
    pub floor: bool,
    /// Epitope colored on the structure.
    #[schemars(title = "Protein Epitope")]
    pub protein_epitope: String,
    /// Epitopes plotted on the chart.
    #[schemars(title = "Chart Epitopes")]
    pub chart_epitopes: Vec<String>,
    /// Column → minimum value kept.
    #[schemars(title = "Filters")]
    pub filters: BTreeMap<String, f64>,
    /// Structure display options.
    #[serde(flatten)]
    pub protein: ProteinOptions,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            experiment: String::new(),
            summary: SummaryKind::Sum,
            floor: true,
            protein_epitope: String::new(),
            chart_epitopes: Vec::new(),
            filters: BTreeMap::new(),
            protein: ProteinOptions::default(),
        }
    }
}

impl ToolConfig {
    /// Generate the JSON Schema describing the option panel.
    #[must_use]
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(ToolConfig)
    }

    /// Default configuration for an experiment.
    #[must_use]
    pub fn defaults_for(experiment: &Experiment) -> Self {
        let mut config = Self::default();
        config.reset_scope(experiment);
        config
    }

    /// Point the config at `experiment` and reset every field whose domain
    /// depends on it: the protein epitope becomes the first epitope, the
    /// chart shows all epitopes, and every filter drops to its column
    /// minimum. Display options are kept.
    pub fn reset_scope(&mut self, experiment: &Experiment) {
        self.experiment.clone_from(&experiment.name);
        self.protein_epitope = experiment.first_epitope().to_owned();
        self.chart_epitopes.clone_from(&experiment.epitopes);
        self.filters = default_filters(experiment);
    }

    /// Store one typed option.
    pub fn apply(&mut self, option: ToolOption) {
        let p = &mut self.protein;
        match option {
            ToolOption::Summary(v) => self.summary = v,
            ToolOption::Floor(v) => self.floor = v,
            ToolOption::ProteinRepresentation(v) => p.protein_representation = v,
            ToolOption::SelectionRepresentation(v) => {
                p.selection_representation = v;
            }
            ToolOption::BackgroundRepresentation(v) => {
                p.background_representation = v;
            }
            ToolOption::LigandRepresentation(v) => p.ligand_representation = v,
            ToolOption::ProteinColor(v) => p.protein_color = v,
            ToolOption::BackgroundColor(v) => p.background_color = v,
            ToolOption::LigandColor(v) => p.ligand_color = v,
            ToolOption::ProteinOpacity(v) => p.protein_opacity = v,
            ToolOption::SelectionOpacity(v) => p.selection_opacity = v,
            ToolOption::BackgroundOpacity(v) => p.background_opacity = v,
            ToolOption::ShowGlycans(v) => p.show_glycans = v,
            ToolOption::ShowNucleotides(v) => p.show_nucleotides = v,
            ToolOption::ShowNonCarbonHydrogens(v) => {
                p.show_non_carbon_hydrogens = v;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{normalize, RawDataset};

    #[test]
    fn reset_scope_uses_experiment_defaults() {
        let dataset = normalize(&RawDataset::example().unwrap()).unwrap();
        let experiment = dataset.first().unwrap();
        let mut config = ToolConfig {
            protein_epitope: "stale".to_owned(),
            chart_epitopes: vec!["stale".to_owned()],
            filters: BTreeMap::from([("stale".to_owned(), 9.0)]),
            summary: SummaryKind::Max,
            ..ToolConfig::default()
        };
        config.reset_scope(experiment);
        assert_eq!(config.experiment, experiment.name);
        assert_eq!(config.protein_epitope, experiment.epitopes[0]);
        assert_eq!(config.chart_epitopes, experiment.epitopes);
        assert_eq!(config.filters, default_filters(experiment));
        assert_eq!(config.summary, SummaryKind::Max);
    }

    #[test]
    fn json_uses_url_names() {
        let value = serde_json::to_value(ToolConfig::default()).unwrap();
        let object = value.as_object().unwrap();
        for key in ["proteinEpitope", "chartEpitopes", "showNonCarbonHydrogens"] {
            assert!(object.contains_key(key), "{key}");
        }
        assert_eq!(object["floor"], true);
        assert_eq!(object["proteinColor"], "#d3d3d3");
    }

    #[test]
    fn schema_exposes_option_panel() {
        let schema = serde_json::to_value(ToolConfig::json_schema()).unwrap();
        let props = schema["properties"].as_object().unwrap();
        assert!(props.contains_key("summary"));
        assert!(props.contains_key("proteinOpacity"));
        assert_eq!(props["proteinOpacity"]["maximum"], 1.0);
        assert_eq!(props["proteinColor"]["type"], "string");
    }

    #[test]
    fn apply_sets_one_field() {
        let mut config = ToolConfig::default();
        config.apply(ToolOption::ShowGlycans(true));
        config.apply(ToolOption::Summary(SummaryKind::Min));
        assert!(config.protein.show_glycans);
        assert_eq!(config.summary, SummaryKind::Min);
        assert!(!config.protein.show_nucleotides);
    }
}
