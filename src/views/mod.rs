//! View controllers and the renderer contracts they drive.
//!
//! Each controller owns a read-only projection of the tool configuration,
//! derives what its view should show, and hands the result to a renderer.
//! Renderers are the host's business (a charting library, a molecular
//! viewer, DOM code); this module only fixes the calls they receive.

mod chart;
mod headless;
mod legend;
mod protein;

use serde::Serialize;

pub use chart::{ChartConfig, ChartController, ChartData, ChartPoint, Tooltip};
pub use headless::{HeadlessChart, HeadlessLegend, HeadlessStructure};
pub use legend::{LegendConfig, LegendController, LegendEntry};
pub use protein::{
    one_letter_code, selection_expression, site_expression, LayerColor,
    ProteinConfig, ProteinController, RegionSelections, StructureLayer,
    StructureRequest, StructureSource,
};

use crate::color::SiteColorScheme;

// ── Renderer contracts ───────────────────────────────────────────────────

/// Draws the site chart.
pub trait ChartRenderer {
    /// Redraw from scratch.
    fn draw(&mut self, data: &ChartData);
    /// The chart area changed size.
    fn resize(&mut self, width: f64, height: f64);
    /// Save the current rendering.
    fn save_image(&mut self, settings: &ExportSettings);
}

/// Draws the 3D structure.
pub trait StructureRenderer {
    /// Fetch or parse a structure, replacing any loaded one. The renderer
    /// reports completion by calling back into the tool with the request's
    /// generation.
    fn load(&mut self, request: &StructureRequest);
    /// Remove every component.
    fn clear(&mut self);
    /// Replace every non-selection layer.
    fn set_layers(&mut self, layers: &[StructureLayer]);
    /// Install the per-residue color scheme used by the selection layer.
    fn set_color_scheme(&mut self, scheme: &SiteColorScheme);
    /// Dispose the current selection layer and add `layer`, if any.
    fn replace_selection(&mut self, layer: Option<&StructureLayer>);
    /// The viewport changed height.
    fn resize(&mut self, height: f64);
    /// Save the current rendering.
    fn save_image(&mut self, settings: &ExportSettings);
}

/// Draws the epitope legend.
pub trait LegendRenderer {
    /// Redraw from scratch.
    fn draw(&mut self, entries: &[LegendEntry], selected_sites: usize);
}

/// One renderer per view.
pub struct Renderers {
    /// Chart renderer.
    pub chart: Box<dyn ChartRenderer>,
    /// Structure renderer.
    pub structure: Box<dyn StructureRenderer>,
    /// Legend renderer.
    pub legend: Box<dyn LegendRenderer>,
}

impl Renderers {
    /// Renderers that only log what they are asked to draw.
    #[must_use]
    pub fn headless() -> Self {
        Self {
            chart: Box::new(HeadlessChart),
            structure: Box::new(HeadlessStructure),
            legend: Box::new(HeadlessLegend),
        }
    }
}

// ── Export and layout ────────────────────────────────────────────────────

/// Fixed parameters for saving a view as an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSettings {
    /// Download file name.
    pub file_name: &'static str,
    /// Oversampling factor.
    pub factor: u32,
    /// Antialias the rendering.
    pub antialias: bool,
    /// Trim surrounding whitespace.
    pub trim: bool,
    /// Transparent background.
    pub transparent: bool,
}

impl ExportSettings {
    /// Structure export.
    pub const PROTEIN: Self = Self {
        file_name: "protein_plot.png",
        factor: 4,
        antialias: true,
        trim: false,
        transparent: false,
    };

    /// Chart export.
    pub const CHART: Self = Self {
        file_name: "chart.png",
        factor: 4,
        antialias: true,
        trim: false,
        transparent: false,
    };
}

/// Page geometry the structure viewport is fitted into.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ViewportLayout {
    /// Window inner height.
    pub window_height: f64,
    /// Header height.
    pub header_height: f64,
    /// Chart height.
    pub chart_height: f64,
}

impl ViewportLayout {
    /// Margin kept below the structure viewport.
    pub const MARGIN: f64 = 50.0;

    /// Height left for the structure viewport, never negative.
    #[must_use]
    pub fn protein_height(&self) -> f64 {
        (self.window_height - self.header_height - self.chart_height - Self::MARGIN)
            .max(0.0)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Recording renderers shared by controller and tool tests.

    use std::cell::RefCell;
    use std::rc::Rc;

    use super::{
        ChartData, ChartRenderer, ExportSettings, LegendEntry,
        LegendRenderer, Renderers, StructureLayer, StructureRenderer,
        StructureRequest,
    };
    use crate::color::SiteColorScheme;

    /// Everything any renderer was asked to do, in order.
    #[derive(Debug, Default)]
    pub struct Recording {
        pub calls: Vec<String>,
        pub charts: Vec<ChartData>,
        pub loads: Vec<StructureRequest>,
        pub layers: Vec<Vec<StructureLayer>>,
        pub schemes: Vec<SiteColorScheme>,
        pub selections: Vec<Option<StructureLayer>>,
        pub legends: Vec<(Vec<LegendEntry>, usize)>,
        pub exports: Vec<ExportSettings>,
    }

    pub type Shared = Rc<RefCell<Recording>>;

    pub struct Recorder(pub Shared);

    impl ChartRenderer for Recorder {
        fn draw(&mut self, data: &ChartData) {
            let mut r = self.0.borrow_mut();
            r.calls.push("chart.draw".to_owned());
            r.charts.push(data.clone());
        }
        fn resize(&mut self, _width: f64, _height: f64) {
            self.0.borrow_mut().calls.push("chart.resize".to_owned());
        }
        fn save_image(&mut self, settings: &ExportSettings) {
            let mut r = self.0.borrow_mut();
            r.calls.push("chart.save".to_owned());
            r.exports.push(*settings);
        }
    }

    impl StructureRenderer for Recorder {
        fn load(&mut self, request: &StructureRequest) {
            let mut r = self.0.borrow_mut();
            r.calls.push("protein.load".to_owned());
            r.loads.push(request.clone());
        }
        fn clear(&mut self) {
            self.0.borrow_mut().calls.push("protein.clear".to_owned());
        }
        fn set_layers(&mut self, layers: &[StructureLayer]) {
            let mut r = self.0.borrow_mut();
            r.calls.push("protein.layers".to_owned());
            r.layers.push(layers.to_vec());
        }
        fn set_color_scheme(&mut self, scheme: &SiteColorScheme) {
            let mut r = self.0.borrow_mut();
            r.calls.push("protein.scheme".to_owned());
            r.schemes.push(scheme.clone());
        }
        fn replace_selection(&mut self, layer: Option<&StructureLayer>) {
            let mut r = self.0.borrow_mut();
            r.calls.push("protein.selection".to_owned());
            r.selections.push(layer.cloned());
        }
        fn resize(&mut self, _height: f64) {
            self.0.borrow_mut().calls.push("protein.resize".to_owned());
        }
        fn save_image(&mut self, settings: &ExportSettings) {
            let mut r = self.0.borrow_mut();
            r.calls.push("protein.save".to_owned());
            r.exports.push(*settings);
        }
    }

    impl LegendRenderer for Recorder {
        fn draw(&mut self, entries: &[LegendEntry], selected_sites: usize) {
            let mut r = self.0.borrow_mut();
            r.calls.push("legend.draw".to_owned());
            r.legends.push((entries.to_vec(), selected_sites));
        }
    }

    /// Renderers that all record into one shared log.
    pub fn recording() -> (Renderers, Shared) {
        let shared = Shared::default();
        let renderers = Renderers {
            chart: Box::new(Recorder(Rc::clone(&shared))),
            structure: Box::new(Recorder(Rc::clone(&shared))),
            legend: Box::new(Recorder(Rc::clone(&shared))),
        };
        (renderers, shared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protein_height_subtracts_chrome_and_margin() {
        let layout = ViewportLayout {
            window_height: 900.0,
            header_height: 100.0,
            chart_height: 300.0,
        };
        assert_eq!(layout.protein_height(), 450.0);
        let cramped = ViewportLayout {
            window_height: 200.0,
            ..layout
        };
        assert_eq!(cramped.protein_height(), 0.0);
    }

    #[test]
    fn export_settings_are_fixed() {
        assert_eq!(ExportSettings::PROTEIN.file_name, "protein_plot.png");
        assert_eq!(ExportSettings::PROTEIN.factor, 4);
        assert!(!ExportSettings::PROTEIN.transparent);
        assert_eq!(ExportSettings::CHART.file_name, "chart.png");
    }
}
