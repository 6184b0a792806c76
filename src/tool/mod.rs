//! The orchestrator: canonical config, dataset, views, and URL state.
//!
//! [`Tool`] owns the one [`ToolConfig`] and the normalized [`Dataset`].
//! Every user action goes through a handler (see `handlers.rs`, or
//! [`ToolCommand`] for the same vocabulary as data) that mutates the config
//! first and then pushes fresh projections to exactly the views that
//! depend on the change. Chart selections reach the structure and legend
//! through the [`SelectionBroadcaster`].
//!
//! Datasets arrive asynchronously in a browser. Every dataset request and
//! every structure load carries a generation ticket, and completions for
//! superseded tickets are dropped.

mod command;
mod handlers;
mod load;
mod page;

use std::rc::Rc;

pub use command::{
    ToolCommand, CHART_EPITOPES_CONTROL, EXPERIMENT_CONTROL, PROTEIN_EPITOPE_CONTROL,
};
pub use load::{
    validate_remote_url, DataSource, Fetcher, LocalFile, RequestTicket,
    RequestTracker, JSON_CONTENT_TYPE,
};
#[cfg(feature = "fetch")]
pub use load::UreqFetcher;
pub use page::{HostPage, MemoryPage};

use crate::broadcast::{Consumer, SelectionBroadcaster};
use crate::data::{normalize, Dataset, Experiment, RawDataset};
use crate::error::DmsVizError;
use crate::options::ToolConfig;
use crate::query::{self, QueryState, DATA_PARAM, MARKDOWN_PARAM};
use crate::views::{
    ChartConfig, ChartController, LegendConfig, LegendController,
    ProteinConfig, ProteinController, Renderers,
};

/// Validate and normalize a dataset document.
pub fn parse_dataset(text: &str) -> Result<Dataset, DmsVizError> {
    normalize(&RawDataset::from_json(text)?)
}

/// The bundled example, normalized.
pub fn example_dataset() -> Result<Dataset, DmsVizError> {
    normalize(&RawDataset::example()?)
}

/// Why a remote dataset was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RemoteLoad {
    /// The page was opened with a `data` parameter; keep its state.
    Initial,
    /// The user supplied a new URL; start from fresh state.
    Upload,
}

#[derive(Debug, Clone)]
struct PendingRemote {
    ticket: RequestTicket,
    url: String,
    kind: RemoteLoad,
}

/// Linked-view state engine.
pub struct Tool {
    page: Box<dyn HostPage>,
    dataset: Dataset,
    experiment: Rc<Experiment>,
    config: ToolConfig,
    chart: ChartController,
    protein: ProteinController,
    legend: LegendController,
    broadcaster: SelectionBroadcaster,
    dataset_requests: RequestTracker,
    structure_requests: RequestTracker,
    pending: Option<PendingRemote>,
    source: DataSource,
    markdown: Option<String>,
}

// ── Construction ─────────────────────────────────────────────────────────

impl Tool {
    /// Build a tool around an already-loaded dataset.
    ///
    /// A failed load is alerted and replaced by the bundled example. The
    /// only error returned is the example itself failing to load.
    pub fn new(
        mut page: Box<dyn HostPage>,
        renderers: Renderers,
        source: DataSource,
        loaded: Result<Dataset, DmsVizError>,
    ) -> Result<Self, DmsVizError> {
        let (dataset, source) = match loaded {
            Ok(dataset) => (dataset, source),
            Err(e) => {
                log::error!("{e}; falling back to the example dataset");
                page.alert(&e.to_string());
                (example_dataset()?, DataSource::Example)
            }
        };
        let experiment = Rc::clone(dataset.first().ok_or_else(|| {
            DmsVizError::SchemaValidation("dataset contains no experiments".to_owned())
        })?);
        let markdown = QueryState::parse(&page.query())
            .get(MARKDOWN_PARAM)
            .map(str::to_owned);
        let config = ToolConfig::defaults_for(&experiment);

        let Renderers {
            chart,
            structure,
            legend,
        } = renderers;
        let mut tool = Self {
            chart: ChartController::new(
                ChartConfig::project(&config, Rc::clone(&experiment)),
                chart,
            ),
            protein: ProteinController::new(
                ProteinConfig::project(&config, Rc::clone(&experiment)),
                structure,
            ),
            legend: LegendController::new(
                LegendConfig::project(&config, Rc::clone(&experiment)),
                legend,
            ),
            page,
            dataset,
            experiment,
            config,
            broadcaster: SelectionBroadcaster::new(),
            dataset_requests: RequestTracker::default(),
            structure_requests: RequestTracker::default(),
            pending: None,
            source,
            markdown,
        };
        tool.init_tool();
        Ok(tool)
    }

    /// Build a tool from the page: fetch the `data` URL if present, else
    /// use the example.
    pub fn from_page(
        page: Box<dyn HostPage>,
        renderers: Renderers,
        fetcher: &dyn Fetcher,
    ) -> Result<Self, DmsVizError> {
        let query = QueryState::parse(&page.query());
        let (source, loaded) = match query.get(DATA_PARAM) {
            Some(url) => {
                log::info!("loading dataset from {url}");
                let loaded = fetcher
                    .fetch_text(url)
                    .and_then(|text| parse_dataset(&text));
                (DataSource::Remote(url.to_owned()), loaded)
            }
            None => (DataSource::Example, example_dataset()),
        };
        Self::new(page, renderers, source, loaded)
    }

    /// (Re-)enter the ready state for the current dataset: decode the URL,
    /// project the config into every view, resubscribe the selection
    /// consumers, redraw, and reload the structure. Safe to call again.
    pub fn init_tool(&mut self) {
        let query = QueryState::parse(&self.page.query());
        let decoded = query::read_config(&query, &self.dataset);
        self.config = decoded.config;
        if let Some(experiment) = self.dataset.get(&self.config.experiment) {
            self.experiment = Rc::clone(experiment);
        }
        self.project_views();

        self.protein.attach(self.broadcaster.subscribe(Consumer::Protein));
        self.legend.attach(self.broadcaster.subscribe(Consumer::Legend));

        self.chart.deselect_sites();
        self.chart.update_vis();
        self.legend.update_vis();
        if self.protein.loaded_pdb().is_some() {
            self.protein.clear();
        }
        self.load_structure();
        self.broadcast_selection();

        self.sync_url();
        log::info!(
            "tool ready: experiment '{}' ({} experiments, {:?})",
            self.config.experiment,
            self.dataset.len(),
            self.source
        );
    }
}

// ── Accessors ────────────────────────────────────────────────────────────

impl Tool {
    /// The canonical configuration.
    #[must_use]
    pub fn config(&self) -> &ToolConfig {
        &self.config
    }

    /// The normalized dataset.
    #[must_use]
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// The active experiment.
    #[must_use]
    pub fn experiment(&self) -> &Rc<Experiment> {
        &self.experiment
    }

    /// Chart controller.
    #[must_use]
    pub fn chart(&self) -> &ChartController {
        &self.chart
    }

    /// Protein controller.
    #[must_use]
    pub fn protein(&self) -> &ProteinController {
        &self.protein
    }

    /// Legend controller.
    #[must_use]
    pub fn legend(&self) -> &LegendController {
        &self.legend
    }

    /// Where the dataset came from.
    #[must_use]
    pub fn source(&self) -> &DataSource {
        &self.source
    }

    /// URL of the description document, if any.
    #[must_use]
    pub fn markdown(&self) -> Option<&str> {
        self.markdown.as_deref()
    }
}

// ── Loading ──────────────────────────────────────────────────────────────

impl Tool {
    /// Issue a request for a dataset URL. The host fetches it and hands
    /// the body to [`Self::complete_remote`] with the returned ticket.
    /// Any earlier outstanding request is superseded.
    pub fn request_remote(&mut self, url: &str) -> Result<RequestTicket, DmsVizError> {
        self.issue_remote(url, RemoteLoad::Upload)
    }

    /// Like [`Self::request_remote`], for the URL the page was opened
    /// with: the page's other parameters are honored on completion.
    pub fn request_initial(&mut self, url: &str) -> Result<RequestTicket, DmsVizError> {
        self.issue_remote(url, RemoteLoad::Initial)
    }

    fn issue_remote(&mut self, url: &str, kind: RemoteLoad) -> Result<RequestTicket, DmsVizError> {
        let url = validate_remote_url(url)?.to_string();
        let ticket = self.dataset_requests.issue();
        log::info!("requesting dataset {url} (ticket {})", ticket.generation());
        self.pending = Some(PendingRemote { ticket, url, kind });
        Ok(ticket)
    }

    /// Deliver the body (or failure) of a dataset request.
    ///
    /// Returns `true` when the dataset was swapped in. Stale tickets are
    /// ignored. Failures are alerted; they leave the current state alone.
    pub fn complete_remote(
        &mut self,
        ticket: RequestTicket,
        body: Result<String, DmsVizError>,
    ) -> bool {
        let pending = match self.pending.take() {
            Some(p) if p.ticket == ticket && self.dataset_requests.is_current(ticket) => p,
            other => {
                log::info!("dropping stale dataset response (ticket {})", ticket.generation());
                self.pending = other;
                return false;
            }
        };
        match body.and_then(|text| parse_dataset(&text)) {
            Ok(dataset) => {
                if pending.kind == RemoteLoad::Upload {
                    let mut query = QueryState::default();
                    query.set(DATA_PARAM, pending.url.clone());
                    self.page.replace_query(&query.to_query_string());
                    self.markdown = None;
                }
                self.replace_dataset(dataset, DataSource::Remote(pending.url));
                true
            }
            Err(e) => {
                self.report(&e);
                false
            }
        }
    }

    /// Fetch and load a dataset URL. On success the URL carries only
    /// `data=<url>` (plus the new state).
    pub fn upload_remote(&mut self, url: &str, fetcher: &dyn Fetcher) -> bool {
        let ticket = match self.request_remote(url) {
            Ok(ticket) => ticket,
            Err(e) => {
                self.report(&e);
                return false;
            }
        };
        let body = fetcher.fetch_text(url.trim());
        self.complete_remote(ticket, body)
    }

    /// Load a user-picked file. On success every URL parameter is cleared.
    pub fn upload_local(&mut self, file: &LocalFile) -> bool {
        let loaded = file.validate().and_then(|()| parse_dataset(&file.contents));
        match loaded {
            Ok(dataset) => {
                // Supersede any outstanding remote request.
                let _ = self.dataset_requests.issue();
                self.pending = None;
                self.page.replace_query("");
                self.markdown = None;
                self.replace_dataset(dataset, DataSource::LocalFile(file.name.clone()));
                true
            }
            Err(e) => {
                self.report(&e);
                false
            }
        }
    }

    fn replace_dataset(&mut self, dataset: Dataset, source: DataSource) {
        if let Some(first) = dataset.first() {
            self.experiment = Rc::clone(first);
        }
        self.dataset = dataset;
        self.source = source;
        self.init_tool();
    }

    /// Start loading the active experiment's structure.
    fn load_structure(&mut self) {
        let ticket = self.structure_requests.issue();
        self.protein.load(ticket.generation());
    }

    /// The structure renderer finished loading `generation`.
    pub fn structure_loaded(&mut self, generation: u64) -> bool {
        self.protein.structure_loaded(generation)
    }
}

// ── URL / error reporting ────────────────────────────────────────────────

impl Tool {
    /// Mirror the config into the page URL. Only remote datasets are
    /// addressable, so nothing is written otherwise.
    pub fn sync_url(&mut self) {
        let DataSource::Remote(url) = &self.source else {
            return;
        };
        let mut query = QueryState::parse(&self.page.query());
        query.set(DATA_PARAM, url.clone());
        query::write_config(&mut query, &self.config);
        self.page.replace_query(&query.to_query_string());
    }

    fn report(&mut self, error: &DmsVizError) {
        log::error!("{error}");
        self.page.alert(&error.to_string());
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::views::testing::{recording, Shared};

    pub(crate) const EXAMPLE: &str = include_str!("../../assets/example.json");

    pub(crate) const UPLOADED: &str = r#"{
        "uploaded": {
            "sitemap": {"1": {"sequential_site": 1, "protein_site": 5, "chains": "B"}},
            "mut_metric_df": [{"reference_site": "1", "epitope": "x", "score": 0.5}],
            "metric_col": "score",
            "epitopes": ["x"],
            "pdb": "1abc"
        }
    }"#;

    /// Serves fixed bodies by URL; anything else is a 404.
    pub(crate) struct MapFetcher(pub Vec<(&'static str, &'static str)>);

    impl Fetcher for MapFetcher {
        fn fetch_text(&self, url: &str) -> Result<String, DmsVizError> {
            self.0
                .iter()
                .find(|(u, _)| *u == url)
                .map(|(_, body)| (*body).to_owned())
                .ok_or_else(|| DmsVizError::Fetch(format!("{url}: 404")))
        }
    }

    pub(crate) fn tool_at(query: &str, fetcher: &MapFetcher) -> (Tool, MemoryPage, Shared) {
        let page = MemoryPage::new(query);
        let (renderers, shared) = recording();
        let tool = Tool::from_page(Box::new(page.clone()), renderers, fetcher).unwrap();
        (tool, page, shared)
    }

    pub(crate) fn remote_tool() -> (Tool, MemoryPage, Shared) {
        tool_at(
            "?data=https%3A%2F%2Fexample.org%2Fdata.json",
            &MapFetcher(vec![("https://example.org/data.json", EXAMPLE)]),
        )
    }

    #[test]
    fn invalid_dataset_falls_back_to_example() {
        let broken = r#"{"exp": {"sitemap": {}, "metric_col": "m", "epitopes": ["1"], "pdb": "6xr8"}}"#;
        let (tool, page, _) = tool_at(
            "?data=https%3A%2F%2Fexample.org%2Fbroken.json",
            &MapFetcher(vec![("https://example.org/broken.json", broken)]),
        );
        assert_eq!(tool.dataset(), &example_dataset().unwrap());
        assert_eq!(tool.source(), &DataSource::Example);
        let alerts = page.alerts();
        assert_eq!(alerts.len(), 1);
        assert!(alerts[0].contains("mut_metric_df"));
        // Not remote-driven, so the URL is left alone.
        assert_eq!(page.current_query(), "?data=https%3A%2F%2Fexample.org%2Fbroken.json");
    }

    #[test]
    fn fetch_failure_falls_back_to_example() {
        let (tool, page, _) = tool_at("?data=https%3A%2F%2Fexample.org%2Fgone.json", &MapFetcher(vec![]));
        assert_eq!(tool.source(), &DataSource::Example);
        assert!(page.alerts()[0].contains("404"));
    }

    #[test]
    fn url_is_written_only_for_remote_data() {
        let (_, page, _) = tool_at("?experiment=whatever", &MapFetcher(vec![]));
        assert_eq!(page.current_query(), "?experiment=whatever");

        let (tool, page, _) = remote_tool();
        let query = QueryState::parse(&page.current_query());
        assert_eq!(query.get(DATA_PARAM), Some("https://example.org/data.json"));
        assert_eq!(query.get("experiment"), Some(tool.config().experiment.as_str()));
        assert_eq!(query.get("floor"), Some("true"));
    }

    #[test]
    fn url_state_is_restored_on_load() {
        let dataset = example_dataset().unwrap();
        let second = dataset.iter().nth(1).unwrap();
        let query = format!(
            "?data=https%3A%2F%2Fexample.org%2Fdata.json&experiment={}&summary=max&markdown=https%3A%2F%2Fexample.org%2Fabout.md",
            second.name
        );
        let (tool, _, _) = tool_at(
            &query,
            &MapFetcher(vec![("https://example.org/data.json", EXAMPLE)]),
        );
        assert_eq!(tool.config().experiment, second.name);
        assert_eq!(tool.experiment().name, second.name);
        assert_eq!(tool.config().summary, crate::options::SummaryKind::Max);
        assert_eq!(tool.markdown(), Some("https://example.org/about.md"));
    }

    #[test]
    fn init_tool_is_idempotent() {
        let (mut tool, page, _) = remote_tool();
        let config = tool.config().clone();
        let url = page.current_query();
        tool.init_tool();
        tool.init_tool();
        assert_eq!(tool.config(), &config);
        assert_eq!(page.current_query(), url);
        assert_eq!(tool.broadcaster.subscriber_count(), 2);
    }

    #[test]
    fn stale_dataset_response_is_dropped() {
        let (mut tool, page, _) = remote_tool();
        let first = tool.request_remote("https://example.org/one.json").unwrap();
        let second = tool.request_remote("https://example.org/two.json").unwrap();
        assert!(!tool.complete_remote(first, Ok(UPLOADED.to_owned())));
        assert_eq!(tool.dataset().len(), example_dataset().unwrap().len());

        assert!(tool.complete_remote(second, Ok(UPLOADED.to_owned())));
        assert_eq!(tool.config().experiment, "uploaded");
        assert_eq!(tool.source(), &DataSource::Remote("https://example.org/two.json".to_owned()));
        let query = QueryState::parse(&page.current_query());
        assert_eq!(query.get(DATA_PARAM), Some("https://example.org/two.json"));
        // A second completion for the same ticket is stale too.
        assert!(!tool.complete_remote(second, Ok(UPLOADED.to_owned())));
    }

    #[test]
    fn remote_upload_resets_url_state() {
        let (mut tool, page, _) = tool_at(
            "?data=https%3A%2F%2Fexample.org%2Fdata.json&summary=min&markdown=https%3A%2F%2Fexample.org%2Fa.md",
            &MapFetcher(vec![("https://example.org/data.json", EXAMPLE)]),
        );
        assert!(tool.markdown().is_some());
        let fetcher = MapFetcher(vec![("https://example.org/new.json", UPLOADED)]);
        assert!(tool.upload_remote("https://example.org/new.json", &fetcher));
        let query = QueryState::parse(&page.current_query());
        assert_eq!(query.get(DATA_PARAM), Some("https://example.org/new.json"));
        assert_eq!(query.get("summary"), Some("sum"));
        assert!(!query.has(MARKDOWN_PARAM));
        assert_eq!(tool.markdown(), None);
    }

    #[test]
    fn bad_remote_upload_keeps_state() {
        let (mut tool, page, _) = remote_tool();
        let before = tool.config().clone();
        assert!(!tool.upload_remote("not a url", &MapFetcher(vec![])));
        assert!(!tool.upload_remote("https://example.org/missing.json", &MapFetcher(vec![])));
        assert_eq!(tool.config(), &before);
        assert_eq!(page.alerts().len(), 2);
    }

    #[test]
    fn local_upload_requires_json_and_clears_url() {
        let (mut tool, page, _) = remote_tool();
        let mut file = LocalFile {
            name: "mine.csv".to_owned(),
            content_type: "text/csv".to_owned(),
            contents: UPLOADED.to_owned(),
        };
        assert!(!tool.upload_local(&file));
        assert_eq!(page.alerts().len(), 1);
        assert_ne!(tool.config().experiment, "uploaded");

        file.content_type = JSON_CONTENT_TYPE.to_owned();
        assert!(tool.upload_local(&file));
        assert_eq!(tool.config().experiment, "uploaded");
        assert_eq!(tool.source(), &DataSource::LocalFile("mine.csv".to_owned()));
        assert_eq!(page.current_query(), "");
    }

    #[test]
    fn stale_structure_load_is_ignored() {
        let (mut tool, _, shared) = remote_tool();
        let stale = tool.protein().generation();
        tool.init_tool();
        assert!(!tool.structure_loaded(stale));
        assert!(!tool.protein().is_ready());
        assert!(tool.structure_loaded(tool.protein().generation()));
        assert!(shared.borrow().calls.contains(&"protein.layers".to_owned()));
    }
}
