//! Structure view: region and site selections, layers, and coloring.

use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::mpsc;

use serde::Serialize;

use super::{ExportSettings, StructureRenderer, ViewportLayout};
use crate::broadcast::{self, SelectionEvent};
use crate::color::{build_scale, Color, SiteColorScheme};
use crate::data::{
    passes_filters, summarize, ChainSpec, ExcludeChains, Experiment,
    NormalizedMutation,
};
use crate::options::{variant_name, ProteinOptions, SummaryKind, ToolConfig};

/// Selection keyword for ligands (glycans included).
const LIGAND_SELECTION: &str = "ligand";
/// Selection keyword for nucleotides.
const NUCLEOTIDE_SELECTION: &str = "nucleic";
/// Appended to selections that should not show hydrogens.
const NO_HYDROGENS: &str = " and not hydrogen";

/// The protein view's projection of the tool configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ProteinConfig {
    /// Active experiment.
    pub experiment: Rc<Experiment>,
    /// Epitope used for coloring.
    pub protein_epitope: String,
    /// Aggregation used for coloring.
    pub summary: SummaryKind,
    /// Sequential (floored) rather than diverging scale.
    pub floor: bool,
    /// Column thresholds.
    pub filters: BTreeMap<String, f64>,
    /// Display options.
    pub options: ProteinOptions,
}

impl ProteinConfig {
    /// Copy the protein-relevant fields out of the canonical config.
    #[must_use]
    pub fn project(config: &ToolConfig, experiment: Rc<Experiment>) -> Self {
        Self {
            experiment,
            protein_epitope: config.protein_epitope.clone(),
            summary: config.summary,
            floor: config.floor,
            filters: config.filters.clone(),
            options: config.protein.clone(),
        }
    }
}

// ── Structure source ─────────────────────────────────────────────────────

/// Where a structure comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum StructureSource {
    /// A public repository entry, fetched by the renderer.
    Remote {
        /// Four-character entry id.
        id: String,
        /// Fetch URL understood by the renderer.
        url: String,
    },
    /// Literal structure text.
    Inline {
        /// File contents.
        text: String,
        /// File format.
        format: &'static str,
    },
}

impl StructureSource {
    /// Four characters name a repository entry; anything else is inline
    /// structure text.
    #[must_use]
    pub fn from_pdb(pdb: &str) -> Self {
        if pdb.chars().count() == 4 {
            Self::Remote {
                id: pdb.to_owned(),
                url: format!("rcsb://{pdb}"),
            }
        } else {
            Self::Inline {
                text: pdb.to_owned(),
                format: "pdb",
            }
        }
    }
}

/// A structure load, tagged with the generation that issued it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructureRequest {
    /// Load generation; completions for older generations are ignored.
    pub generation: u64,
    /// What to load.
    pub source: StructureSource,
}

// ── Selections ───────────────────────────────────────────────────────────

/// Data and background region selections derived from the chain options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionSelections {
    /// Chains carrying data.
    pub data: String,
    /// Every other chain minus excluded ones; absent for `polymer`.
    pub background: Option<String>,
}

impl RegionSelections {
    /// Build region selections.
    #[must_use]
    pub fn from_chains(data: &ChainSpec, exclude: &ExcludeChains) -> Self {
        match data {
            ChainSpec::Polymer => Self {
                data: "polymer".to_owned(),
                background: None,
            },
            ChainSpec::Chains(chains) => {
                let data = chains
                    .iter()
                    .map(|c| format!(":{c}"))
                    .collect::<Vec<_>>()
                    .join(" or ");
                let mut background = chains
                    .iter()
                    .map(|c| format!("not :{c}"))
                    .collect::<Vec<_>>()
                    .join(" and ");
                if let ExcludeChains::Chains(excluded) = exclude {
                    for chain in excluded {
                        background.push_str(&format!(" and not :{chain}"));
                    }
                }
                Self {
                    data,
                    background: Some(background),
                }
            }
        }
    }
}

/// Selection expression for one residue on one chain.
#[must_use]
pub fn site_expression(resno: i64, chain: &str) -> String {
    if chain == "polymer" {
        format!("polymer and {resno} and protein")
    } else {
        format!(":{chain} and {resno} and protein")
    }
}

/// Compound selection covering every record's site on each of its chains.
///
/// Records without a numeric structure site are skipped; `None` means
/// nothing is selectable.
#[must_use]
pub fn selection_expression(records: &[NormalizedMutation]) -> Option<String> {
    let mut seen: Vec<(i64, &str)> = Vec::new();
    let mut parts = Vec::new();
    for record in records {
        let Some(resno) = record.site_protein.residue_number() else {
            continue;
        };
        for chain in record.site_chain.split_whitespace() {
            if seen.contains(&(resno, chain)) {
                continue;
            }
            seen.push((resno, chain));
            parts.push(site_expression(resno, chain));
        }
    }
    (!parts.is_empty()).then(|| parts.join(" or "))
}

// ── Layers ───────────────────────────────────────────────────────────────

/// How a layer is colored.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum LayerColor {
    /// One color for every atom.
    Uniform {
        /// The color.
        color: Color,
    },
    /// The installed per-residue scheme.
    SiteScheme,
}

/// One renderer representation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructureLayer {
    /// Layer name, stable across redraws.
    pub name: &'static str,
    /// Renderer representation keyword.
    pub representation: String,
    /// Atom selection expression.
    pub selection: String,
    /// How atoms are colored.
    pub color: LayerColor,
    /// Layer opacity, in `[0, 1]`.
    pub opacity: f64,
}

// ── Controller ───────────────────────────────────────────────────────────

/// Owns the protein projection, the current selection, and the renderer.
pub struct ProteinController {
    config: ProteinConfig,
    renderer: Box<dyn StructureRenderer>,
    selection_rx: Option<mpsc::Receiver<SelectionEvent>>,
    selection: Vec<NormalizedMutation>,
    scheme: Option<SiteColorScheme>,
    loaded_pdb: Option<String>,
    generation: u64,
    ready: bool,
}

impl ProteinController {
    /// Create a controller. Nothing is loaded until [`Self::load`].
    #[must_use]
    pub fn new(config: ProteinConfig, renderer: Box<dyn StructureRenderer>) -> Self {
        Self {
            config,
            renderer,
            selection_rx: None,
            selection: Vec::new(),
            scheme: None,
            loaded_pdb: None,
            generation: 0,
            ready: false,
        }
    }

    /// Current projection.
    #[must_use]
    pub fn config(&self) -> &ProteinConfig {
        &self.config
    }

    /// Overwrite the projection.
    pub fn set_config(&mut self, config: ProteinConfig) {
        self.config = config;
    }

    /// Start receiving chart selections on `rx`.
    pub fn attach(&mut self, rx: mpsc::Receiver<SelectionEvent>) {
        self.selection_rx = Some(rx);
    }

    /// Structure of the most recent load request.
    #[must_use]
    pub fn loaded_pdb(&self) -> Option<&str> {
        self.loaded_pdb.as_deref()
    }

    /// Generation of the most recent load request.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether the current structure has finished loading.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Currently selected rows.
    #[must_use]
    pub fn selection(&self) -> &[NormalizedMutation] {
        &self.selection
    }

    /// Request the active experiment's structure under `generation`.
    pub fn load(&mut self, generation: u64) {
        let pdb = self.config.experiment.pdb.clone();
        let request = StructureRequest {
            generation,
            source: StructureSource::from_pdb(&pdb),
        };
        log::info!(
            "loading structure for '{}' (generation {generation})",
            self.config.experiment.name
        );
        self.generation = generation;
        self.ready = false;
        self.scheme = None;
        self.renderer.load(&request);
        self.loaded_pdb = Some(pdb);
    }

    /// Drop every component.
    pub fn clear(&mut self) {
        self.renderer.clear();
        self.ready = false;
        self.scheme = None;
        self.loaded_pdb = None;
    }

    /// The renderer finished a load. Returns `false` (and does nothing)
    /// when a newer load has been issued since.
    pub fn structure_loaded(&mut self, generation: u64) -> bool {
        if generation != self.generation {
            log::info!(
                "ignoring stale structure (generation {generation}, current {})",
                self.generation
            );
            return false;
        }
        self.ready = true;
        self.update_representation();
        true
    }

    /// Per-residue color scheme for the current config.
    #[must_use]
    pub fn color_scheme(&self) -> SiteColorScheme {
        let experiment = &self.config.experiment;
        let epitope = &self.config.protein_epitope;
        let rows = experiment.mutations.iter().filter(|row| {
            row.epitope == *epitope && passes_filters(row, &self.config.filters)
        });
        let summary = summarize(rows, self.config.summary);
        let (scale, colors) = build_scale(
            &summary,
            epitope,
            self.config.floor,
            experiment.epitope_color(epitope),
        );
        SiteColorScheme {
            scale,
            colors,
            fallback: self.config.options.protein_color,
        }
    }

    /// Every layer except the selection.
    #[must_use]
    pub fn layers(&self) -> Vec<StructureLayer> {
        let opts = &self.config.options;
        let experiment = &self.config.experiment;
        let regions =
            RegionSelections::from_chains(&experiment.data_chains, &experiment.exclude_chains);

        let mut layers = vec![StructureLayer {
            name: "protein",
            representation: variant_name(&opts.protein_representation),
            selection: regions.data,
            color: LayerColor::Uniform {
                color: opts.protein_color,
            },
            opacity: opts.protein_opacity,
        }];
        if let Some(background) = regions.background {
            layers.push(StructureLayer {
                name: "background",
                representation: variant_name(&opts.background_representation),
                selection: background,
                color: LayerColor::Uniform {
                    color: opts.background_color,
                },
                opacity: opts.background_opacity,
            });
        }
        if opts.show_glycans {
            layers.push(self.hetero_layer("ligand", LIGAND_SELECTION));
        }
        if opts.show_nucleotides {
            layers.push(self.hetero_layer("nucleotide", NUCLEOTIDE_SELECTION));
        }
        layers
    }

    fn hetero_layer(&self, name: &'static str, selection: &str) -> StructureLayer {
        let opts = &self.config.options;
        StructureLayer {
            name,
            representation: variant_name(&opts.ligand_representation),
            selection: self.strip_hydrogens(selection),
            color: LayerColor::Uniform {
                color: opts.ligand_color,
            },
            opacity: 1.0,
        }
    }

    fn strip_hydrogens(&self, selection: &str) -> String {
        if self.config.options.show_non_carbon_hydrogens {
            selection.to_owned()
        } else {
            format!("({selection}){NO_HYDROGENS}")
        }
    }

    /// Layer highlighting the selected sites, if any are selectable.
    #[must_use]
    pub fn selection_layer(&self) -> Option<StructureLayer> {
        let expression = selection_expression(&self.selection)?;
        let opts = &self.config.options;
        Some(StructureLayer {
            name: "currentSelection",
            representation: variant_name(&opts.selection_representation),
            selection: self.strip_hydrogens(&expression),
            color: LayerColor::SiteScheme,
            opacity: opts.selection_opacity,
        })
    }

    /// Redraw every layer from the current display options, then the
    /// colored selection.
    pub fn update_representation(&mut self) {
        if !self.ready {
            log::debug!("structure not loaded; deferring representation");
            return;
        }
        let layers = self.layers();
        self.renderer.set_layers(&layers);
        self.update_data();
    }

    /// Rebuild the color scheme, then re-render the selection with it.
    ///
    /// These always run together and in this order: the selection layer
    /// references the scheme.
    pub fn update_data(&mut self) {
        if !self.ready {
            return;
        }
        let scheme = self.color_scheme();
        self.renderer.set_color_scheme(&scheme);
        self.scheme = Some(scheme);
        self.render_selection();
    }

    /// Replace the selection with `records` and re-render it.
    pub fn select_sites(&mut self, records: Vec<NormalizedMutation>) {
        self.selection = records;
        if self.scheme.is_some() {
            self.render_selection();
        } else {
            self.update_data();
        }
    }

    /// Apply the latest broadcast selection, if one arrived.
    pub fn drain_selection(&mut self) {
        let event = self.selection_rx.as_ref().and_then(broadcast::latest);
        if let Some(event) = event {
            self.select_sites(event.rows().to_vec());
        }
    }

    fn render_selection(&mut self) {
        if !self.ready {
            return;
        }
        let layer = self.selection_layer();
        self.renderer.replace_selection(layer.as_ref());
    }

    /// Fit the viewport into the page.
    pub fn resize(&mut self, layout: &ViewportLayout) {
        self.renderer.resize(layout.protein_height());
    }

    /// Save the structure as an image.
    pub fn save_image(&mut self) {
        self.renderer.save_image(&ExportSettings::PROTEIN);
    }
}

/// One-letter code for a three-letter residue name, e.g. for hover text.
#[must_use]
pub fn one_letter_code(three: &str) -> Option<char> {
    let code = match three.to_ascii_uppercase().as_str() {
        "ALA" => 'A',
        "ARG" => 'R',
        "ASN" => 'N',
        "ASP" => 'D',
        "CYS" => 'C',
        "GLU" => 'E',
        "GLN" => 'Q',
        "GLY" => 'G',
        "HIS" => 'H',
        "ILE" => 'I',
        "LEU" => 'L',
        "LYS" => 'K',
        "MET" => 'M',
        "PHE" => 'F',
        "PRO" => 'P',
        "SER" => 'S',
        "THR" => 'T',
        "TRP" => 'W',
        "TYR" => 'Y',
        "VAL" => 'V',
        "SEC" => 'U',
        "PYL" => 'O',
        _ => return None,
    };
    Some(code)
}

#[cfg(test)]
mod tests {
    use serde_json::Map;

    use super::*;
    use crate::broadcast::{Consumer, SelectionBroadcaster};
    use crate::data::{normalize_experiment, ProteinSite, RawExperiment};
    use crate::views::testing::{recording, Shared};

    fn record(site_protein: ProteinSite, chains: &str) -> NormalizedMutation {
        NormalizedMutation {
            site: 1,
            site_reference: "1".to_owned(),
            site_protein,
            site_chain: chains.to_owned(),
            metric: Some(1.0),
            epitope: "A".to_owned(),
            fields: Map::new(),
        }
    }

    fn experiment(data_chains: serde_json::Value) -> Rc<Experiment> {
        let raw: RawExperiment = serde_json::from_value(serde_json::json!({
            "sitemap": {
                "1": {"sequential_site": 1, "protein_site": 10, "chains": "A"},
                "2": {"sequential_site": 2, "protein_site": 11, "chains": "A"}
            },
            "mut_metric_df": [
                {"reference_site": "1", "epitope": "A", "escape": 2.0},
                {"reference_site": "2", "epitope": "A", "escape": -1.0}
            ],
            "metric_col": "escape",
            "epitopes": ["A"],
            "epitope_colors": {"A": "#0000ff"},
            "pdb": "6xr8",
            "dataChains": data_chains,
            "excludeChains": ["C"]
        }))
        .unwrap();
        Rc::new(normalize_experiment("exp", &raw).unwrap())
    }

    fn controller() -> (ProteinController, Shared) {
        let (renderers, shared) = recording();
        let experiment = experiment(serde_json::json!(["A"]));
        let config = ProteinConfig::project(&ToolConfig::defaults_for(&experiment), experiment);
        (ProteinController::new(config, renderers.structure), shared)
    }

    #[test]
    fn compound_selection_skips_non_numeric_sites() {
        let records = [
            record(ProteinSite::Number(10), "A B"),
            record(ProteinSite::Label("NA".to_owned()), "C"),
        ];
        assert_eq!(
            selection_expression(&records).unwrap(),
            ":A and 10 and protein or :B and 10 and protein"
        );
        assert_eq!(selection_expression(&records[1..]), None);
    }

    #[test]
    fn polymer_and_duplicate_sites() {
        let records = [
            record(ProteinSite::Label("214a".to_owned()), "polymer"),
            record(ProteinSite::Number(214), "polymer"),
        ];
        assert_eq!(
            selection_expression(&records).unwrap(),
            "polymer and 214 and protein"
        );
    }

    #[test]
    fn region_selections() {
        let regions = RegionSelections::from_chains(
            &ChainSpec::Chains(vec!["A".to_owned(), "B".to_owned()]),
            &ExcludeChains::Chains(vec!["C".to_owned()]),
        );
        assert_eq!(regions.data, ":A or :B");
        assert_eq!(
            regions.background.as_deref(),
            Some("not :A and not :B and not :C")
        );
        let polymer = RegionSelections::from_chains(&ChainSpec::Polymer, &ExcludeChains::None);
        assert_eq!(polymer.data, "polymer");
        assert_eq!(polymer.background, None);
    }

    #[test]
    fn structure_source_by_length() {
        assert_eq!(
            StructureSource::from_pdb("6xr8"),
            StructureSource::Remote {
                id: "6xr8".to_owned(),
                url: "rcsb://6xr8".to_owned()
            }
        );
        assert!(matches!(
            StructureSource::from_pdb("ATOM      1  N   ASN A 331"),
            StructureSource::Inline { format: "pdb", .. }
        ));
    }

    #[test]
    fn stale_load_completion_is_ignored() {
        let (mut protein, shared) = controller();
        protein.load(1);
        protein.load(2);
        assert!(!protein.structure_loaded(1));
        assert!(!protein.is_ready());
        assert!(protein.structure_loaded(2));
        assert!(protein.is_ready());
        let calls = shared.borrow().calls.clone();
        assert_eq!(
            calls,
            ["protein.load", "protein.load", "protein.layers", "protein.scheme", "protein.selection"]
        );
    }

    #[test]
    fn scheme_precedes_selection() {
        let (mut protein, shared) = controller();
        let mut broadcaster = SelectionBroadcaster::new();
        protein.attach(broadcaster.subscribe(Consumer::Protein));

        // Selections before the structure arrives are kept, not drawn.
        let _ = broadcaster.publish(&SelectionEvent::from_rows(vec![record(
            ProteinSite::Number(10),
            "A",
        )]));
        protein.drain_selection();
        assert_eq!(protein.selection().len(), 1);
        assert!(shared.borrow().calls.is_empty());

        protein.load(1);
        let _ = protein.structure_loaded(1);
        let recording = shared.borrow();
        let scheme_at = recording.calls.iter().position(|c| c == "protein.scheme").unwrap();
        let selection_at = recording.calls.iter().position(|c| c == "protein.selection").unwrap();
        assert!(scheme_at < selection_at);
        let layer = recording.selections.last().unwrap().as_ref().unwrap();
        assert_eq!(layer.name, "currentSelection");
        assert_eq!(layer.selection, "(:A and 10 and protein) and not hydrogen");
        assert_eq!(layer.color, LayerColor::SiteScheme);
        assert_eq!(recording.schemes[0].atom_color(10), Color::rgb(0, 0, 255));
    }

    #[test]
    fn cleared_selection_removes_layer() {
        let (mut protein, shared) = controller();
        protein.load(1);
        let _ = protein.structure_loaded(1);
        protein.select_sites(vec![record(ProteinSite::Number(11), "A")]);
        protein.select_sites(Vec::new());
        assert_eq!(shared.borrow().selections.last(), Some(&None));
    }

    #[test]
    fn optional_layers_follow_display_flags() {
        let (mut protein, _) = controller();
        assert_eq!(
            protein.layers().iter().map(|l| l.name).collect::<Vec<_>>(),
            ["protein", "background"]
        );
        let mut config = protein.config().clone();
        config.options.show_glycans = true;
        config.options.show_nucleotides = true;
        config.options.show_non_carbon_hydrogens = true;
        protein.set_config(config);
        let layers = protein.layers();
        assert_eq!(layers.len(), 4);
        assert_eq!(layers[2].selection, "ligand");
        assert_eq!(layers[3].selection, "nucleic");
        assert_eq!(layers[1].selection, "not :A and not :C");
    }

    #[test]
    fn resize_and_export() {
        let (mut protein, shared) = controller();
        protein.resize(&ViewportLayout {
            window_height: 1000.0,
            header_height: 100.0,
            chart_height: 400.0,
        });
        protein.save_image();
        assert_eq!(shared.borrow().calls, ["protein.resize", "protein.save"]);
        assert_eq!(shared.borrow().exports, [ExportSettings::PROTEIN]);
    }

    #[test]
    fn one_letter_codes() {
        assert_eq!(one_letter_code("lys"), Some('K'));
        assert_eq!(one_letter_code("NAG"), None);
    }
}
