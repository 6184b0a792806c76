//! Browser bindings.
//!
//! The page hosts the charting library and molecular viewer; this module
//! wires them to a [`Tool`] through a single JS callback. Every renderer
//! call arrives as `render(kind, json)` where `kind` is one of the
//! `chart.*`, `protein.*`, or `legend.*` names below and `json` is the
//! serialized payload.
//!
//! Datasets and structures are fetched by the page. Each request carries
//! a generation number that must be handed back on completion, so late
//! responses for superseded requests are dropped.

use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::color::SiteColorScheme;
use crate::options::{ProteinOptions, ToolConfig};
use crate::query::{QueryState, DATA_PARAM};
use crate::tool::{
    DataSource, HostPage, LocalFile, RequestTicket, Tool, ToolCommand,
};
use crate::views::{
    ChartData, ChartRenderer, ExportSettings, LegendEntry, LegendRenderer,
    Renderers, StructureLayer, StructureRenderer, StructureRequest,
    ViewportLayout,
};

// ── Host page ────────────────────────────────────────────────────────────

/// The browser window the tool is running in.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebPage;

impl HostPage for WebPage {
    fn query(&self) -> String {
        web_sys::window()
            .and_then(|w| w.location().search().ok())
            .unwrap_or_default()
    }

    fn replace_query(&mut self, query: &str) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let url = if query.is_empty() {
            window.location().pathname().unwrap_or_default()
        } else {
            format!("?{query}")
        };
        let result = window.history().and_then(|history| {
            history.replace_state_with_url(&JsValue::NULL, "", Some(&url))
        });
        if let Err(e) = result {
            log::warn!("could not update the page URL: {e:?}");
        }
    }

    fn alert(&mut self, message: &str) {
        if let Some(window) = web_sys::window() {
            let _ = window.alert_with_message(message);
        }
    }
}

// ── Renderer bridge ──────────────────────────────────────────────────────

/// Forwards renderer calls to a JS function.
#[derive(Clone)]
struct JsRenderer {
    callback: js_sys::Function,
}

impl JsRenderer {
    fn send<T: Serialize + ?Sized>(&self, kind: &str, payload: &T) {
        let json = match serde_json::to_string(payload) {
            Ok(json) => json,
            Err(e) => {
                log::error!("could not serialize {kind}: {e}");
                return;
            }
        };
        let result = self.callback.call2(
            &JsValue::NULL,
            &JsValue::from_str(kind),
            &JsValue::from_str(&json),
        );
        if let Err(e) = result {
            log::error!("{kind} callback failed: {e:?}");
        }
    }
}

impl ChartRenderer for JsRenderer {
    fn draw(&mut self, data: &ChartData) {
        self.send("chart.draw", data);
    }

    fn resize(&mut self, width: f64, height: f64) {
        self.send("chart.resize", &[width, height]);
    }

    fn save_image(&mut self, settings: &ExportSettings) {
        self.send("chart.save", settings);
    }
}

impl StructureRenderer for JsRenderer {
    fn load(&mut self, request: &StructureRequest) {
        self.send("protein.load", request);
    }

    fn clear(&mut self) {
        self.send("protein.clear", &());
    }

    fn set_layers(&mut self, layers: &[StructureLayer]) {
        self.send("protein.layers", layers);
    }

    fn set_color_scheme(&mut self, scheme: &SiteColorScheme) {
        self.send("protein.scheme", scheme);
    }

    fn replace_selection(&mut self, layer: Option<&StructureLayer>) {
        self.send("protein.selection", &layer);
    }

    fn resize(&mut self, height: f64) {
        self.send("protein.resize", &height);
    }

    fn save_image(&mut self, settings: &ExportSettings) {
        self.send("protein.save", settings);
    }
}

impl LegendRenderer for JsRenderer {
    fn draw(&mut self, entries: &[LegendEntry], selected_sites: usize) {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Legend<'a> {
            entries: &'a [LegendEntry],
            selected_sites: usize,
        }
        self.send(
            "legend.draw",
            &Legend {
                entries,
                selected_sites,
            },
        );
    }
}

fn js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

// ── Exported tool ────────────────────────────────────────────────────────

/// The tool as seen from JS.
#[wasm_bindgen]
pub struct WebTool {
    tool: Tool,
    pending: Option<RequestTicket>,
}

#[wasm_bindgen]
impl WebTool {
    /// Start on the bundled example. If [`Self::initial_data_url`] returns
    /// a URL, fetch it and pass the body to [`Self::complete_remote`]
    /// with the generation from [`Self::request_initial`].
    #[wasm_bindgen(constructor)]
    pub fn new(render: js_sys::Function) -> Result<Self, JsValue> {
        let bridge = JsRenderer { callback: render };
        let renderers = Renderers {
            chart: Box::new(bridge.clone()),
            structure: Box::new(bridge.clone()),
            legend: Box::new(bridge),
        };
        let tool = Tool::new(
            Box::new(WebPage),
            renderers,
            DataSource::Example,
            crate::tool::example_dataset(),
        )
        .map_err(js_error)?;
        Ok(Self {
            tool,
            pending: None,
        })
    }

    /// The `data` parameter the page was opened with.
    #[must_use]
    pub fn initial_data_url(&self) -> Option<String> {
        QueryState::parse(&WebPage.query())
            .get(DATA_PARAM)
            .map(str::to_owned)
    }

    /// Register a fetch of the page's own `data` URL.
    pub fn request_initial(&mut self, url: &str) -> Result<u64, JsValue> {
        let ticket = self.tool.request_initial(url).map_err(js_error)?;
        self.pending = Some(ticket);
        Ok(ticket.generation())
    }

    /// Register a fetch of a user-supplied dataset URL.
    pub fn request_remote(&mut self, url: &str) -> Result<u64, JsValue> {
        let ticket = self.tool.request_remote(url).map_err(js_error)?;
        self.pending = Some(ticket);
        Ok(ticket.generation())
    }

    /// Hand back a fetched body (or the fetch error).
    pub fn complete_remote(
        &mut self,
        generation: u64,
        body: Option<String>,
        error: Option<String>,
    ) -> bool {
        let Some(ticket) = self.pending.filter(|t| t.generation() == generation) else {
            log::info!("dropping response for superseded request {generation}");
            return false;
        };
        self.pending = None;
        let body = body.ok_or_else(|| {
            crate::DmsVizError::Fetch(error.unwrap_or_else(|| "no response".to_owned()))
        });
        self.tool.complete_remote(ticket, body)
    }

    /// Load a file picked by the user.
    pub fn upload_local(&mut self, name: String, content_type: String, contents: String) -> bool {
        self.tool.upload_local(&LocalFile {
            name,
            content_type,
            contents,
        })
    }

    /// The viewer finished loading the structure of `generation`.
    pub fn structure_loaded(&mut self, generation: u64) -> bool {
        self.tool.structure_loaded(generation)
    }

    /// A form control changed.
    pub fn control_changed(&mut self, id: &str, value: &str) {
        match ToolCommand::from_control(id, value) {
            Ok(command) => self.tool.execute(command),
            Err(e) => {
                log::error!("{e}");
                WebPage.alert(&e.to_string());
            }
        }
    }

    /// Sites brushed or clicked on the chart.
    pub fn select_sites(&mut self, sites: Vec<i64>) {
        self.tool.execute(ToolCommand::SelectSites { sites });
    }

    /// Select every plotted site.
    pub fn select_all_sites(&mut self) {
        self.tool.execute(ToolCommand::SelectAllSites);
    }

    /// Clear the selection.
    pub fn deselect_sites(&mut self) {
        self.tool.execute(ToolCommand::DeselectSites);
    }

    /// Apply a TOML display preset.
    pub fn apply_preset(&mut self, toml_text: &str) -> Result<(), JsValue> {
        let options = ProteinOptions::from_toml(toml_text).map_err(js_error)?;
        self.tool.execute(ToolCommand::ApplyPreset(options));
        Ok(())
    }

    /// The window was resized.
    pub fn resize(
        &mut self,
        window_height: f64,
        header_height: f64,
        chart_height: f64,
        chart_width: f64,
    ) {
        self.tool.execute(ToolCommand::Resize {
            layout: ViewportLayout {
                window_height,
                header_height,
                chart_height,
            },
            chart_width,
        });
    }

    /// Download the structure image.
    pub fn export_protein_image(&mut self) {
        self.tool.execute(ToolCommand::ExportProteinImage);
    }

    /// Download the chart image.
    pub fn export_chart_image(&mut self) {
        self.tool.execute(ToolCommand::ExportChartImage);
    }

    /// Tooltip for one chart point, as JSON.
    #[must_use]
    pub fn tooltip(&self, site: i64, epitope: &str) -> Option<String> {
        let tooltip = self.tool.chart().tooltip(site, epitope)?;
        serde_json::to_string(&tooltip).ok()
    }

    /// The current configuration, as JSON.
    pub fn config_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(self.tool.config()).map_err(js_error)
    }

    /// Filter slider ranges of the active experiment, as JSON.
    pub fn filter_ranges_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.tool.experiment().filter_ranges()).map_err(js_error)
    }

    /// URL of the description document, if any.
    #[must_use]
    pub fn markdown(&self) -> Option<String> {
        self.tool.markdown().map(str::to_owned)
    }
}

/// JSON Schema of the option panel.
#[wasm_bindgen]
pub fn config_schema() -> Result<String, JsValue> {
    serde_json::to_string(&ToolConfig::json_schema()).map_err(js_error)
}

/// Install the panic hook and the console logger.
#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);
}
