//! Site chart: data shaping and the chart-side selection.

use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use serde::Serialize;
use serde_json::Value;

use super::{ChartRenderer, ExportSettings};
use crate::color::Color;
use crate::data::{
    passes_filters, summarize, Experiment, NormalizedMutation, ProteinSite,
    SiteSummary,
};
use crate::options::{SummaryKind, ToolConfig};

/// The chart's projection of the tool configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartConfig {
    /// Active experiment.
    pub experiment: Rc<Experiment>,
    /// Aggregation used for the y-axis.
    pub summary: SummaryKind,
    /// Clamp negative values to zero.
    pub floor: bool,
    /// Epitopes plotted.
    pub chart_epitopes: Vec<String>,
    /// Column thresholds.
    pub filters: BTreeMap<String, f64>,
}

impl ChartConfig {
    /// Copy the chart-relevant fields out of the canonical config.
    #[must_use]
    pub fn project(config: &ToolConfig, experiment: Rc<Experiment>) -> Self {
        Self {
            experiment,
            summary: config.summary,
            floor: config.floor,
            chart_epitopes: config.chart_epitopes.clone(),
            filters: config.filters.clone(),
        }
    }
}

/// One plotted (site, epitope) point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    /// Sequential site number.
    pub site: i64,
    /// Site label in the reference numbering.
    pub site_reference: String,
    /// Site label in the structure numbering.
    pub site_protein: ProteinSite,
    /// Chains the site maps to.
    pub site_chain: String,
    /// Epitope the value belongs to.
    pub epitope: String,
    /// Summarized metric value.
    pub value: f64,
    /// Point color, from the epitope palette.
    pub color: Color,
    /// Whether the site is in the current selection.
    pub selected: bool,
}

/// Everything the chart renderer needs for one draw.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartData {
    /// Active experiment name.
    pub experiment: String,
    /// Axis label of the metric column.
    pub metric: String,
    /// Aggregation used for `value`.
    pub summary: SummaryKind,
    /// Points in site order, one per plotted epitope.
    pub points: Vec<ChartPoint>,
    /// `[min, max]` of plotted values, always including zero.
    pub y_extent: [f64; 2],
    /// Selected sequential sites, ascending.
    pub selected_sites: Vec<i64>,
}

/// Hover content for one point.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tooltip {
    /// Site label in the reference numbering.
    pub site_reference: String,
    /// Site label in the structure numbering.
    pub site_protein: String,
    /// Epitope of the hovered point.
    pub epitope: String,
    /// Summarized metric value.
    pub value: f64,
    /// One entry per underlying mutation: (label, value) for every tooltip
    /// column the mutation carries.
    pub mutations: Vec<Vec<(String, String)>>,
}

/// Owns the chart projection, the selected sites, and the renderer.
pub struct ChartController {
    config: ChartConfig,
    renderer: Box<dyn ChartRenderer>,
    selected: BTreeSet<i64>,
}

impl ChartController {
    /// Create a controller; nothing is drawn until [`Self::update_vis`].
    #[must_use]
    pub fn new(config: ChartConfig, renderer: Box<dyn ChartRenderer>) -> Self {
        Self {
            config,
            renderer,
            selected: BTreeSet::new(),
        }
    }

    /// Current projection.
    #[must_use]
    pub fn config(&self) -> &ChartConfig {
        &self.config
    }

    /// Overwrite the projection.
    pub fn set_config(&mut self, config: ChartConfig) {
        self.config = config;
    }

    /// Rows surviving the current filters.
    pub fn filtered_rows(&self) -> impl Iterator<Item = &NormalizedMutation> {
        self.config
            .experiment
            .mutations
            .iter()
            .filter(|row| passes_filters(row, &self.config.filters))
    }

    /// Per-site summary of the filtered rows for the plotted epitopes.
    #[must_use]
    pub fn summary(&self) -> Vec<SiteSummary> {
        let epitopes = &self.config.chart_epitopes;
        summarize(
            self.filtered_rows()
                .filter(|row| epitopes.contains(&row.epitope)),
            self.config.summary,
        )
    }

    /// Shape the current config into plot data.
    #[must_use]
    pub fn data(&self) -> ChartData {
        let experiment = &self.config.experiment;
        let points: Vec<ChartPoint> = self
            .summary()
            .into_iter()
            .map(|s| {
                let value = if self.config.floor { s.value.max(0.0) } else { s.value };
                ChartPoint {
                    selected: self.selected.contains(&s.site),
                    color: experiment.epitope_color(&s.epitope),
                    site: s.site,
                    site_reference: s.site_reference,
                    site_protein: s.site_protein,
                    site_chain: s.site_chain,
                    epitope: s.epitope,
                    value,
                }
            })
            .collect();
        let y_extent = points.iter().fold([0.0_f64, 0.0_f64], |[lo, hi], p| {
            [lo.min(p.value), hi.max(p.value)]
        });
        ChartData {
            experiment: experiment.name.clone(),
            metric: experiment.metric_col.clone(),
            summary: self.config.summary,
            points,
            y_extent,
            selected_sites: self.selected.iter().copied().collect(),
        }
    }

    /// Redraw from the current config.
    pub fn update_vis(&mut self) {
        let data = self.data();
        log::debug!(
            "chart: {} points for '{}'",
            data.points.len(),
            data.experiment
        );
        self.renderer.draw(&data);
    }

    // ── Selection ────────────────────────────────────────────────────

    /// Replace the selection with `sites` (sequential numbering). Sites
    /// without surviving rows are ignored.
    pub fn select_sites(&mut self, sites: &[i64]) {
        let available: BTreeSet<i64> = self.filtered_rows().map(|r| r.site).collect();
        self.selected = sites
            .iter()
            .copied()
            .filter(|site| available.contains(site))
            .collect();
    }

    /// Select every plotted site.
    pub fn select_all(&mut self) {
        self.selected = self.summary().into_iter().map(|s| s.site).collect();
    }

    /// Clear the selection.
    pub fn deselect_sites(&mut self) {
        self.selected.clear();
    }

    /// Drop selected sites that no longer have surviving rows.
    pub fn rederive_selection(&mut self) {
        let available: BTreeSet<i64> = self.filtered_rows().map(|r| r.site).collect();
        self.selected.retain(|site| available.contains(site));
    }

    /// Selected sites, sequential numbering.
    #[must_use]
    pub fn selected_sites(&self) -> &BTreeSet<i64> {
        &self.selected
    }

    /// One representative filtered row per selected site, in site order.
    /// The selection does not depend on which epitopes are plotted.
    #[must_use]
    pub fn selection_records(&self) -> Vec<NormalizedMutation> {
        let mut by_site: BTreeMap<i64, &NormalizedMutation> = BTreeMap::new();
        for row in self.filtered_rows() {
            if self.selected.contains(&row.site) {
                let _ = by_site.entry(row.site).or_insert(row);
            }
        }
        by_site.into_values().cloned().collect()
    }

    // ── Tooltip / layout ─────────────────────────────────────────────

    /// Hover content for the point at (`site`, `epitope`).
    #[must_use]
    pub fn tooltip(&self, site: i64, epitope: &str) -> Option<Tooltip> {
        let point = self
            .data()
            .points
            .into_iter()
            .find(|p| p.site == site && p.epitope == epitope)?;
        let columns = &self.config.experiment.tooltip_cols;
        let mutations = self
            .filtered_rows()
            .filter(|row| row.site == site && row.epitope == epitope)
            .map(|row| {
                columns
                    .iter()
                    .filter_map(|(column, label)| {
                        row.fields
                            .get(column)
                            .map(|value| (label.clone(), display_value(value)))
                    })
                    .collect()
            })
            .collect();
        Some(Tooltip {
            site_reference: point.site_reference,
            site_protein: point.site_protein.to_string(),
            epitope: point.epitope,
            value: point.value,
            mutations,
        })
    }

    /// The chart area changed size.
    pub fn resize(&mut self, width: f64, height: f64) {
        self.renderer.resize(width, height);
    }

    /// Save the chart as an image.
    pub fn save_image(&mut self) {
        self.renderer.save_image(&ExportSettings::CHART);
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
