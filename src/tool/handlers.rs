//! Event handlers: mutate the canonical config, then update exactly the
//! views that depend on the change.

use std::rc::Rc;

use super::Tool;
use crate::broadcast::{Consumer, SelectionEvent};
use crate::error::DmsVizError;
use crate::options::{OptionKey, OptionScope, ProteinOptions, ToolOption};
use crate::views::{ChartConfig, LegendConfig, ProteinConfig, ViewportLayout};

// ── Projections ──────────────────────────────────────────────────────────

impl Tool {
    pub(super) fn project_views(&mut self) {
        self.project_chart();
        self.project_protein();
        self.project_legend();
    }

    fn project_chart(&mut self) {
        self.chart
            .set_config(ChartConfig::project(&self.config, Rc::clone(&self.experiment)));
    }

    fn project_protein(&mut self) {
        self.protein
            .set_config(ProteinConfig::project(&self.config, Rc::clone(&self.experiment)));
    }

    fn project_legend(&mut self) {
        self.legend
            .set_config(LegendConfig::project(&self.config, Rc::clone(&self.experiment)));
    }
}

// ── Config handlers ──────────────────────────────────────────────────────

impl Tool {
    /// Switch the active experiment.
    ///
    /// Epitope and filter choices are reset to the new experiment's
    /// defaults and the chart selection is cleared. The structure is only
    /// reloaded when the new experiment uses a different one.
    pub fn select_experiment(&mut self, name: &str) -> Result<(), DmsVizError> {
        let experiment = self
            .dataset
            .get(name)
            .cloned()
            .ok_or_else(|| DmsVizError::UnknownExperiment(name.to_owned()))?;
        log::info!("switching to experiment '{name}'");
        self.config.reset_scope(&experiment);
        self.experiment = experiment;
        self.project_views();

        self.chart.deselect_sites();
        self.broadcast_selection();
        self.chart.update_vis();
        self.legend.update_vis();

        if self.protein.loaded_pdb() == Some(self.experiment.pdb.as_str()) {
            self.protein.update_representation();
        } else {
            self.protein.clear();
            self.load_structure();
        }
        self.sync_url();
        Ok(())
    }

    /// Store one scalar option and update the views in its scope.
    pub fn set_option(&mut self, option: ToolOption) {
        self.config.apply(option);
        match option.key().scope() {
            OptionScope::Chart => {
                self.project_chart();
                self.project_protein();
                self.chart.update_vis();
                self.protein.update_data();
            }
            OptionScope::Protein => {
                self.project_protein();
                self.protein.update_representation();
            }
        }
        self.sync_url();
    }

    /// Parse and store an option addressed by name.
    pub fn set_option_by_name(&mut self, name: &str, raw: &str) -> Result<(), DmsVizError> {
        let key = OptionKey::from_name(name).ok_or_else(|| DmsVizError::InvalidOption {
            key: name.to_owned(),
            value: raw.to_owned(),
        })?;
        let option = key.parse(raw)?;
        self.set_option(option);
        Ok(())
    }

    /// Replace every structure display option at once (e.g. from a preset).
    pub fn apply_protein_options(&mut self, options: ProteinOptions) {
        self.config.protein = options;
        self.project_protein();
        self.protein.update_representation();
        self.sync_url();
    }

    /// Choose the epitope colored on the structure.
    pub fn set_protein_epitope(&mut self, epitope: &str) -> Result<(), DmsVizError> {
        if !self.experiment.has_epitope(epitope) {
            return Err(DmsVizError::UnknownEpitope(epitope.to_owned()));
        }
        epitope.clone_into(&mut self.config.protein_epitope);
        self.project_protein();
        self.project_legend();
        self.protein.update_data();
        self.legend.update_vis();
        self.sync_url();
        Ok(())
    }

    /// Choose the epitopes plotted on the chart.
    pub fn set_chart_epitopes(&mut self, epitopes: Vec<String>) -> Result<(), DmsVizError> {
        if let Some(unknown) = epitopes.iter().find(|e| !self.experiment.has_epitope(e)) {
            return Err(DmsVizError::UnknownEpitope(unknown.clone()));
        }
        self.config.chart_epitopes = epitopes;
        self.project_chart();
        self.project_legend();
        self.chart.update_vis();
        self.legend.update_vis();
        self.sync_url();
        Ok(())
    }

    /// Move one filter threshold. The chart selection is re-derived from
    /// the surviving rows and republished.
    pub fn set_filter(&mut self, column: &str, threshold: f64) -> Result<(), DmsVizError> {
        if !self.experiment.filter_cols.contains_key(column) || !threshold.is_finite() {
            return Err(DmsVizError::InvalidOption {
                key: column.to_owned(),
                value: threshold.to_string(),
            });
        }
        let _ = self.config.filters.insert(column.to_owned(), threshold);
        self.project_chart();
        self.project_protein();
        self.chart.rederive_selection();
        self.chart.update_vis();
        self.protein.update_data();
        self.broadcast_selection();
        self.sync_url();
        Ok(())
    }
}

// ── Selection ────────────────────────────────────────────────────────────

impl Tool {
    /// Replace the chart selection with `sites` (sequential numbering).
    pub fn select_sites(&mut self, sites: &[i64]) {
        self.chart.select_sites(sites);
        self.chart.update_vis();
        self.broadcast_selection();
    }

    /// Select every plotted site.
    pub fn select_all_sites(&mut self) {
        self.chart.select_all();
        self.chart.update_vis();
        self.broadcast_selection();
    }

    /// Clear the chart selection.
    pub fn deselect_sites(&mut self) {
        self.chart.deselect_sites();
        self.chart.update_vis();
        self.broadcast_selection();
    }

    /// Publish the chart selection and let the consumers apply it.
    pub(super) fn broadcast_selection(&mut self) {
        let event = SelectionEvent::from_rows(self.chart.selection_records());
        let delivered = self.broadcaster.publish(&event);
        log::debug!("selection of {} rows sent to {delivered} views", event.rows().len());
        for consumer in self.broadcaster.consumers() {
            match consumer {
                Consumer::Protein => self.protein.drain_selection(),
                Consumer::Legend => self.legend.drain_selection(),
            }
        }
    }
}

// ── Layout / export ──────────────────────────────────────────────────────

impl Tool {
    /// The page was resized.
    pub fn resize(&mut self, layout: &ViewportLayout, chart_width: f64) {
        self.chart.resize(chart_width, layout.chart_height);
        self.protein.resize(layout);
    }

    /// Save the structure view as an image.
    pub fn export_protein_image(&mut self) {
        self.protein.save_image();
    }

    /// Save the chart as an image.
    pub fn export_chart_image(&mut self) {
        self.chart.save_image();
    }
}
