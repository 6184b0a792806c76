//! URL query-string codec for the tool configuration.
//!
//! Every field of [`ToolConfig`] has a query parameter of the same name.
//! Scalars are written in their plain string form (booleans as the
//! literals `true`/`false`); `chartEpitopes` and `filters` are JSON. Decoding
//! never fails as a whole: a bad or stale parameter falls back to the
//! experiment default for that field alone and is reported alongside the
//! decoded config.

use std::collections::BTreeMap;

use serde_json::Value;
use url::form_urlencoded;

use crate::data::{default_filters, Dataset, Experiment};
use crate::error::DmsVizError;
use crate::options::{OptionKey, ToolConfig};

/// Query parameter holding the dataset URL.
pub const DATA_PARAM: &str = "data";
/// Query parameter holding the description document URL.
pub const MARKDOWN_PARAM: &str = "markdown";

const EXPERIMENT_PARAM: &str = "experiment";
const PROTEIN_EPITOPE_PARAM: &str = "proteinEpitope";
const CHART_EPITOPES_PARAM: &str = "chartEpitopes";
const FILTERS_PARAM: &str = "filters";

/// Ordered query parameters with `URLSearchParams`-like editing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryState {
    pairs: Vec<(String, String)>,
}

impl QueryState {
    /// Parse a query string, with or without the leading `?`.
    #[must_use]
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        Self {
            pairs: form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect(),
        }
    }

    /// First value of a parameter.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Whether a parameter is present.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == name)
    }

    /// Set a parameter: the first occurrence is replaced in place and any
    /// others removed; a new parameter is appended.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.pairs.iter().position(|(k, _)| k == name) {
            Some(first) => {
                self.pairs[first].1 = value;
                let mut idx = 0;
                self.pairs.retain(|(k, _)| {
                    let keep = k != name || idx == first;
                    idx += 1;
                    keep
                });
            }
            None => self.pairs.push((name.to_owned(), value)),
        }
    }

    /// Remove every occurrence of a parameter.
    pub fn remove(&mut self, name: &str) {
        self.pairs.retain(|(k, _)| k != name);
    }

    /// Remove everything.
    pub fn clear(&mut self) {
        self.pairs.clear();
    }

    /// Whether there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Encoded query string without the leading `?`.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.pairs.iter())
            .finish()
    }
}

/// Write every config field into `query`, leaving other parameters (such
/// as `data` and `markdown`) untouched.
pub fn write_config(query: &mut QueryState, config: &ToolConfig) {
    query.set(EXPERIMENT_PARAM, config.experiment.clone());
    query.set(PROTEIN_EPITOPE_PARAM, config.protein_epitope.clone());
    query.set(CHART_EPITOPES_PARAM, json_string(&config.chart_epitopes));
    for key in OptionKey::ALL {
        query.set(key.name(), key.read(config));
    }
    query.set(FILTERS_PARAM, json_string(&config.filters));
}

fn json_string<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

/// Result of decoding a query against a dataset.
#[derive(Debug)]
pub struct Decoded {
    /// The reconstructed config; always valid for the dataset.
    pub config: ToolConfig,
    /// Parameters that were rejected and replaced by defaults.
    pub errors: Vec<DmsVizError>,
}

/// Reconstruct a config from `query`, validated against `dataset`.
#[must_use]
pub fn read_config(query: &QueryState, dataset: &Dataset) -> Decoded {
    let mut errors = Vec::new();

    let requested = query.get(EXPERIMENT_PARAM);
    let experiment = match requested.and_then(|name| dataset.get(name)) {
        Some(experiment) => Some(experiment),
        None => {
            if let Some(name) = requested {
                errors.push(DmsVizError::UnknownExperiment(name.to_owned()));
            }
            dataset.first()
        }
    };
    let Some(experiment) = experiment else {
        return Decoded {
            config: ToolConfig::default(),
            errors,
        };
    };
    let mut config = ToolConfig::defaults_for(experiment);

    for key in OptionKey::ALL {
        if let Some(raw) = query.get(key.name()) {
            match key.parse(raw) {
                Ok(option) => config.apply(option),
                Err(e) => errors.push(e),
            }
        }
    }

    if let Some(epitope) = query.get(PROTEIN_EPITOPE_PARAM) {
        if experiment.has_epitope(epitope) {
            epitope.clone_into(&mut config.protein_epitope);
        } else {
            errors.push(DmsVizError::UnknownEpitope(epitope.to_owned()));
        }
    }

    if let Some(raw) = query.get(CHART_EPITOPES_PARAM) {
        read_chart_epitopes(raw, experiment, &mut config, &mut errors);
    }
    if let Some(raw) = query.get(FILTERS_PARAM) {
        read_filters(raw, experiment, &mut config, &mut errors);
    }

    for error in &errors {
        log::warn!("{error}; using the default");
    }
    Decoded { config, errors }
}

fn read_chart_epitopes(
    raw: &str,
    experiment: &Experiment,
    config: &mut ToolConfig,
    errors: &mut Vec<DmsVizError>,
) {
    let requested = match parse_epitope_list(raw) {
        Ok(requested) => requested,
        Err(message) => {
            errors.push(DmsVizError::UrlParse {
                param: CHART_EPITOPES_PARAM.to_owned(),
                message,
            });
            return;
        }
    };
    let (known, unknown): (Vec<String>, Vec<String>) = requested
        .iter()
        .cloned()
        .partition(|e| experiment.has_epitope(e));
    errors.extend(unknown.into_iter().map(DmsVizError::UnknownEpitope));
    // Nothing usable keeps the full default set.
    if !known.is_empty() || requested.is_empty() {
        config.chart_epitopes = known;
    }
}

fn read_filters(
    raw: &str,
    experiment: &Experiment,
    config: &mut ToolConfig,
    errors: &mut Vec<DmsVizError>,
) {
    let requested = match serde_json::from_str::<BTreeMap<String, f64>>(raw) {
        Ok(requested) => requested,
        Err(e) => {
            errors.push(DmsVizError::UrlParse {
                param: FILTERS_PARAM.to_owned(),
                message: e.to_string(),
            });
            return;
        }
    };
    let defaults = default_filters(experiment);
    for (column, threshold) in requested {
        if defaults.contains_key(&column) {
            let _ = config.filters.insert(column, threshold);
        } else {
            errors.push(DmsVizError::UrlParse {
                param: FILTERS_PARAM.to_owned(),
                message: format!("unknown filter column '{column}'"),
            });
        }
    }
}

/// A JSON array of epitope ids; numeric ids are stringified.
fn parse_epitope_list(raw: &str) -> Result<Vec<String>, String> {
    let values: Vec<Value> =
        serde_json::from_str(raw).map_err(|e| e.to_string())?;
    values
        .into_iter()
        .map(|value| match value {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(format!("unexpected epitope {other}")),
        })
        .collect()
}
