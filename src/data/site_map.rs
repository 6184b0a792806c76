//! Site mapper: raw mutation rows → rows carrying every site numbering.

use std::rc::Rc;

use rustc_hash::FxHashMap;
use serde::Serialize;
use serde_json::{Map, Value};
use web_time::Instant;

use super::raw::{
    ChainSpec, ExcludeChains, MutationRecord, ProteinSite, RawExperiment,
};
use super::{OrderedMap, RawDataset};
use crate::color::{Color, EPITOPE_PALETTE};
use crate::error::DmsVizError;

/// Columns derived by the mapper. Stale copies in the input are dropped so
/// re-normalizing already-mapped rows is a no-op.
const DERIVED_COLUMNS: [&str; 4] =
    ["site", "site_reference", "site_protein", "site_chain"];

/// A mutation row after site mapping. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedMutation {
    /// Sequential site.
    pub site: i64,
    /// Site in reference numbering.
    pub site_reference: String,
    /// Site on the structure.
    pub site_protein: ProteinSite,
    /// Space-joined chains the site appears on.
    pub site_chain: String,
    /// Value of the experiment's metric column, if numeric.
    pub metric: Option<f64>,
    /// Epitope / condition.
    pub epitope: String,
    /// Remaining input columns (metric, filter, and tooltip columns).
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl NormalizedMutation {
    /// Numeric value of an input column.
    #[must_use]
    pub fn value(&self, column: &str) -> Option<f64> {
        self.fields.get(column).and_then(Value::as_f64)
    }

    /// The raw record this row was derived from.
    #[must_use]
    pub fn to_record(&self) -> MutationRecord {
        MutationRecord {
            reference_site: self.site_reference.clone(),
            epitope: self.epitope.clone(),
            fields: self.fields.clone(),
        }
    }
}

/// A normalized experiment.
#[derive(Debug, Clone, PartialEq)]
pub struct Experiment {
    /// Experiment name (dataset key).
    pub name: String,
    /// Site-mapped mutation rows, in input order.
    pub mutations: Vec<NormalizedMutation>,
    /// Column holding the metric.
    pub metric_col: String,
    /// Epitopes in display order; never empty.
    pub epitopes: Vec<String>,
    /// Epitope → base color.
    pub epitope_colors: FxHashMap<String, Color>,
    /// Structure id or inline structure text.
    pub pdb: String,
    /// Chains carrying data.
    pub data_chains: ChainSpec,
    /// Chains hidden from the background.
    pub exclude_chains: ExcludeChains,
    /// Filterable column → label.
    pub filter_cols: OrderedMap<String>,
    /// Tooltip column → label.
    pub tooltip_cols: OrderedMap<String>,
}

impl Experiment {
    /// Whether `epitope` belongs to this experiment.
    #[must_use]
    pub fn has_epitope(&self, epitope: &str) -> bool {
        self.epitopes.iter().any(|e| e == epitope)
    }

    /// The default (first) epitope.
    #[must_use]
    pub fn first_epitope(&self) -> &str {
        self.epitopes.first().map_or("", String::as_str)
    }

    /// Base color for an epitope, falling back to the palette.
    #[must_use]
    pub fn epitope_color(&self, epitope: &str) -> Color {
        if let Some(color) = self.epitope_colors.get(epitope) {
            return *color;
        }
        let idx = self.epitopes.iter().position(|e| e == epitope).unwrap_or(0);
        EPITOPE_PALETTE[idx % EPITOPE_PALETTE.len()]
    }
}

/// A normalized dataset: experiment name → experiment, in input order.
///
/// Experiments are reference-counted so views can hold the one they draw
/// without copying rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    experiments: OrderedMap<Rc<Experiment>>,
}

impl Dataset {
    /// Experiment by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Rc<Experiment>> {
        self.experiments.get(name)
    }

    /// The default (first) experiment.
    #[must_use]
    pub fn first(&self) -> Option<&Rc<Experiment>> {
        self.experiments.first().map(|(_, e)| e)
    }

    /// Experiment names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.experiments.keys()
    }

    /// All experiments in order.
    pub fn iter(&self) -> impl Iterator<Item = &Rc<Experiment>> {
        self.experiments.iter().map(|(_, e)| e)
    }

    /// Number of experiments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.experiments.len()
    }

    /// Whether the dataset has no experiments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.experiments.is_empty()
    }
}

/// Normalize every experiment of a dataset.
///
/// Fails on the first experiment containing a row whose reference site is
/// missing from its sitemap.
pub fn normalize(raw: &RawDataset) -> Result<Dataset, DmsVizError> {
    let start = Instant::now();
    let mut experiments = OrderedMap::new();
    for (name, experiment) in raw.experiments.iter() {
        let normalized = normalize_experiment(name, experiment)?;
        let _ = experiments.insert(name.to_owned(), Rc::new(normalized));
    }
    log::debug!(
        "normalized {} experiments in {:?}",
        experiments.len(),
        start.elapsed()
    );
    Ok(Dataset { experiments })
}

/// Normalize one experiment. Pure and deterministic.
pub fn normalize_experiment(
    name: &str,
    raw: &RawExperiment,
) -> Result<Experiment, DmsVizError> {
    let mutations = raw
        .mut_metric_df
        .iter()
        .map(|record| normalize_record(name, raw, record))
        .collect::<Result<Vec<_>, _>>()?;

    let epitope_colors = raw
        .epitope_colors
        .iter()
        .filter_map(|(epitope, hex)| match hex.parse::<Color>() {
            Ok(color) => Some((epitope.clone(), color)),
            Err(e) => {
                log::warn!("experiment '{name}', epitope '{epitope}': {e}");
                None
            }
        })
        .collect();

    Ok(Experiment {
        name: name.to_owned(),
        mutations,
        metric_col: raw.metric_col.clone(),
        epitopes: raw.epitopes.clone(),
        epitope_colors,
        pdb: raw.pdb.clone(),
        data_chains: raw.data_chains.clone(),
        exclude_chains: raw.exclude_chains.clone(),
        filter_cols: raw.filter_cols.clone().unwrap_or_default(),
        tooltip_cols: raw
            .tooltip_cols
            .clone()
            .map(super::ColumnLabels::into_labeled)
            .unwrap_or_default(),
    })
}

fn normalize_record(
    experiment: &str,
    raw: &RawExperiment,
    record: &MutationRecord,
) -> Result<NormalizedMutation, DmsVizError> {
    let Some(entry) = raw.sitemap.get(&record.reference_site) else {
        return Err(DmsVizError::Mapping {
            experiment: experiment.to_owned(),
            reference_site: record.reference_site.clone(),
        });
    };

    let mut fields = record.fields.clone();
    for column in DERIVED_COLUMNS {
        let _ = fields.remove(column);
    }
    let metric = fields.get(&raw.metric_col).and_then(Value::as_f64);

    Ok(NormalizedMutation {
        site: entry.sequential_site,
        site_reference: record.reference_site.clone(),
        site_protein: entry.protein_site.clone(),
        site_chain: entry.chains.clone(),
        metric,
        epitope: record.epitope.clone(),
        fields,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_experiment() -> RawExperiment {
        serde_json::from_value(serde_json::json!({
            "sitemap": {
                "331": {"sequential_site": 1, "protein_site": 331, "chains": "A B"},
                "332": {"sequential_site": 2, "protein_site": "NA", "chains": "A"}
            },
            "mut_metric_df": [
                {"reference_site": "331", "epitope": 1, "escape": 0.4, "mutant": "K"},
                {"reference_site": 332, "epitope": "1", "escape": -0.2, "mutant": "D"},
                {"reference_site": 331, "epitope": 2, "escape": null, "mutant": "E"}
            ],
            "metric_col": "escape",
            "epitopes": [1, 2],
            "epitope_colors": {"1": "#0072B2", "2": "not-a-color"},
            "pdb": "6xr8",
            "filter_cols": {"escape": "Escape"}
        }))
        .unwrap()
    }

    #[test]
    fn maps_all_numbering_schemes() {
        let exp = normalize_experiment("exp", &raw_experiment()).unwrap();
        assert_eq!(exp.mutations.len(), 3);
        let first = &exp.mutations[0];
        assert_eq!(first.site, 1);
        assert_eq!(first.site_reference, "331");
        assert_eq!(first.site_protein, ProteinSite::Number(331));
        assert_eq!(first.site_chain, "A B");
        assert_eq!(first.metric, Some(0.4));
        assert_eq!(first.epitope, "1");
        assert_eq!(exp.mutations[1].site_protein, ProteinSite::Label("NA".into()));
        assert_eq!(exp.mutations[2].metric, None);
    }

    #[test]
    fn invalid_epitope_color_falls_back_to_palette() {
        let exp = normalize_experiment("exp", &raw_experiment()).unwrap();
        assert_eq!(exp.epitope_color("1"), Color::rgb(0x00, 0x72, 0xb2));
        assert_eq!(exp.epitope_color("2"), EPITOPE_PALETTE[1]);
    }

    #[test]
    fn unknown_reference_site_is_a_mapping_error() {
        let mut raw = raw_experiment();
        raw.mut_metric_df[1].reference_site = "999".into();
        let err = normalize_experiment("exp", &raw).unwrap_err();
        match err {
            DmsVizError::Mapping {
                experiment,
                reference_site,
            } => {
                assert_eq!(experiment, "exp");
                assert_eq!(reference_site, "999");
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn normalization_is_idempotent() {
        let raw = raw_experiment();
        let once = normalize_experiment("exp", &raw).unwrap();

        // Feed the normalized rows back in, derived columns and all.
        let mut again = raw.clone();
        again.mut_metric_df = once
            .mutations
            .iter()
            .map(|m| {
                let mut record = m.to_record();
                let _ = record.fields.insert("site".into(), 77.into());
                let _ = record.fields.insert("site_chain".into(), "Z".into());
                record
            })
            .collect();
        let twice = normalize_experiment("exp", &again).unwrap();
        assert_eq!(once.mutations, twice.mutations);
        assert_eq!(
            normalize_experiment("exp", &raw).unwrap().mutations,
            once.mutations
        );
    }
}
