//! Renderers that draw nothing and log what they were given.

use super::{
    ChartData, ChartRenderer, ExportSettings, LegendEntry, LegendRenderer,
    StructureLayer, StructureRenderer, StructureRequest,
};
use crate::color::SiteColorScheme;

/// Chart renderer for hosts without a chart.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessChart;

/// Structure renderer for hosts without a molecular viewer.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessStructure;

/// Legend renderer for hosts without a legend.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessLegend;

impl ChartRenderer for HeadlessChart {
    fn draw(&mut self, data: &ChartData) {
        log::debug!(
            "chart: {} points, y in [{}, {}], {} selected",
            data.points.len(),
            data.y_extent[0],
            data.y_extent[1],
            data.selected_sites.len()
        );
    }

    fn resize(&mut self, width: f64, height: f64) {
        log::debug!("chart: resize to {width}x{height}");
    }

    fn save_image(&mut self, settings: &ExportSettings) {
        log::info!("chart: no renderer to export {}", settings.file_name);
    }
}

impl StructureRenderer for HeadlessStructure {
    fn load(&mut self, request: &StructureRequest) {
        log::debug!("structure: load generation {}", request.generation);
    }

    fn clear(&mut self) {
        log::debug!("structure: clear");
    }

    fn set_layers(&mut self, layers: &[StructureLayer]) {
        for layer in layers {
            log::debug!(
                "structure: layer {} ({}) on '{}'",
                layer.name,
                layer.representation,
                layer.selection
            );
        }
    }

    fn set_color_scheme(&mut self, scheme: &SiteColorScheme) {
        log::debug!("structure: color scheme over {} residues", scheme.colors.len());
    }

    fn replace_selection(&mut self, layer: Option<&StructureLayer>) {
        match layer {
            Some(layer) => log::debug!("structure: selection '{}'", layer.selection),
            None => log::debug!("structure: selection cleared"),
        }
    }

    fn resize(&mut self, height: f64) {
        log::debug!("structure: resize to height {height}");
    }

    fn save_image(&mut self, settings: &ExportSettings) {
        log::info!("structure: no renderer to export {}", settings.file_name);
    }
}

impl LegendRenderer for HeadlessLegend {
    fn draw(&mut self, entries: &[LegendEntry], selected_sites: usize) {
        log::debug!(
            "legend: {} epitopes, {selected_sites} sites selected",
            entries.len()
        );
    }
}
