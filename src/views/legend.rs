use std::collections::BTreeSet;
use std::rc::Rc;
use std::sync::mpsc;

use serde::Serialize;

use super::LegendRenderer;
use crate::broadcast::{self, SelectionEvent};
use crate::color::Color;
use crate::data::Experiment;
use crate::options::ToolConfig;

/// The legend's projection of the tool configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct LegendConfig {
    /// Active experiment.
    pub experiment: Rc<Experiment>,
    /// Epitope colored on the structure.
    pub protein_epitope: String,
    /// Epitopes plotted on the chart.
    pub chart_epitopes: Vec<String>,
}

impl LegendConfig {
    /// Copy the legend-relevant fields out of the canonical config.
    #[must_use]
    pub fn project(config: &ToolConfig, experiment: Rc<Experiment>) -> Self {
        Self {
            experiment,
            protein_epitope: config.protein_epitope.clone(),
            chart_epitopes: config.chart_epitopes.clone(),
        }
    }
}

/// One legend row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegendEntry {
    /// Epitope name.
    pub epitope: String,
    /// Swatch color.
    pub color: Color,
    /// Whether the epitope is plotted on the chart.
    pub on_chart: bool,
    /// Whether the structure is colored by this epitope.
    pub on_protein: bool,
}

/// Epitope legend plus a count of selected sites.
pub struct LegendController {
    config: LegendConfig,
    renderer: Box<dyn LegendRenderer>,
    selection_rx: Option<mpsc::Receiver<SelectionEvent>>,
    selected_sites: usize,
}

impl LegendController {
    /// Create a controller; nothing is drawn until [`Self::update_vis`].
    #[must_use]
    pub fn new(config: LegendConfig, renderer: Box<dyn LegendRenderer>) -> Self {
        Self {
            config,
            renderer,
            selection_rx: None,
            selected_sites: 0,
        }
    }

    /// Current projection.
    #[must_use]
    pub fn config(&self) -> &LegendConfig {
        &self.config
    }

    /// Overwrite the projection.
    pub fn set_config(&mut self, config: LegendConfig) {
        self.config = config;
    }

    /// Start receiving chart selections on `rx`.
    pub fn attach(&mut self, rx: mpsc::Receiver<SelectionEvent>) {
        self.selection_rx = Some(rx);
    }

    /// Rows in experiment epitope order.
    #[must_use]
    pub fn entries(&self) -> Vec<LegendEntry> {
        let experiment = &self.config.experiment;
        experiment
            .epitopes
            .iter()
            .map(|epitope| LegendEntry {
                epitope: epitope.clone(),
                color: experiment.epitope_color(epitope),
                on_chart: self.config.chart_epitopes.contains(epitope),
                on_protein: *epitope == self.config.protein_epitope,
            })
            .collect()
    }

    /// Number of distinct sites in the last received selection.
    #[must_use]
    pub fn selected_sites(&self) -> usize {
        self.selected_sites
    }

    /// Redraw the legend.
    pub fn update_vis(&mut self) {
        let entries = self.entries();
        self.renderer.draw(&entries, self.selected_sites);
    }

    /// Apply the latest broadcast selection, if one arrived, and redraw.
    pub fn drain_selection(&mut self) {
        let event = self.selection_rx.as_ref().and_then(broadcast::latest);
        if let Some(event) = event {
            self.selected_sites = event
                .rows()
                .iter()
                .map(|row| row.site)
                .collect::<BTreeSet<_>>()
                .len();
            self.update_vis();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::{Consumer, SelectionBroadcaster};
    use crate::data::{normalize, RawDataset};
    use crate::views::testing::recording;

    #[test]
    fn entries_reflect_config_and_selection() {
        let dataset = normalize(&RawDataset::example().unwrap()).unwrap();
        let experiment = Rc::clone(dataset.first().unwrap());
        let mut config = ToolConfig::defaults_for(&experiment);
        config.chart_epitopes.truncate(1);
        let (renderers, shared) = recording();
        let mut legend = LegendController::new(
            LegendConfig::project(&config, Rc::clone(&experiment)),
            renderers.legend,
        );

        let entries = legend.entries();
        assert_eq!(entries.len(), experiment.epitopes.len());
        assert!(entries[0].on_chart && entries[0].on_protein);
        assert!(entries[1..].iter().all(|e| !e.on_chart && !e.on_protein));
        assert_eq!(entries[0].color, experiment.epitope_color(&experiment.epitopes[0]));

        let mut broadcaster = SelectionBroadcaster::new();
        legend.attach(broadcaster.subscribe(Consumer::Legend));
        let rows: Vec<_> = experiment.mutations.iter().take(3).cloned().collect();
        let distinct = rows.iter().map(|r| r.site).collect::<BTreeSet<_>>().len();
        let _ = broadcaster.publish(&SelectionEvent::from_rows(rows));
        legend.drain_selection();
        assert_eq!(legend.selected_sites(), distinct);
        assert_eq!(shared.borrow().legends.last().unwrap().1, distinct);
    }
}
