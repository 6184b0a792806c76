use serde::de::DeserializeOwned;
use serde_json::Value;

use super::display::{
    variant_name, BackgroundRepresentation, LigandRepresentation,
    ProteinRepresentation, SelectionRepresentation, SummaryKind,
};
use super::ToolConfig;
use crate::color::Color;
use crate::error::DmsVizError;

/// Which views an option change has to reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionScope {
    /// Changes the summarized data: chart and protein.
    Chart,
    /// Changes structure display only: protein.
    Protein,
}

/// Every scalar option a user can set by name.
///
/// Experiment, epitope, and filter choices are not here: their valid
/// values depend on the loaded dataset and they have dedicated handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionKey {
    /// How site values are aggregated (`summary`).
    Summary,
    /// Whether negative values are floored to zero (`floor`).
    Floor,
    /// Representation of the data chains.
    ProteinRepresentation,
    /// Representation of the selected sites.
    SelectionRepresentation,
    /// Representation of chains without data.
    BackgroundRepresentation,
    /// Representation of ligands.
    LigandRepresentation,
    /// Color of data chains at sites without a value.
    ProteinColor,
    /// Color of chains without data.
    BackgroundColor,
    /// Color of ligands.
    LigandColor,
    /// Opacity of the data chains.
    ProteinOpacity,
    /// Opacity of the selected sites.
    SelectionOpacity,
    /// Opacity of chains without data.
    BackgroundOpacity,
    /// Whether glycans are drawn.
    ShowGlycans,
    /// Whether nucleotides are drawn.
    ShowNucleotides,
    /// Whether polar hydrogens are drawn.
    ShowNonCarbonHydrogens,
}

/// A parsed option value, ready to store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ToolOption {
    /// Value for [`OptionKey::Summary`].
    Summary(SummaryKind),
    /// Value for [`OptionKey::Floor`].
    Floor(bool),
    /// Value for [`OptionKey::ProteinRepresentation`].
    ProteinRepresentation(ProteinRepresentation),
    /// Value for [`OptionKey::SelectionRepresentation`].
    SelectionRepresentation(SelectionRepresentation),
    /// Value for [`OptionKey::BackgroundRepresentation`].
    BackgroundRepresentation(BackgroundRepresentation),
    /// Value for [`OptionKey::LigandRepresentation`].
    LigandRepresentation(LigandRepresentation),
    /// Value for [`OptionKey::ProteinColor`].
    ProteinColor(Color),
    /// Value for [`OptionKey::BackgroundColor`].
    BackgroundColor(Color),
    /// Value for [`OptionKey::LigandColor`].
    LigandColor(Color),
    /// Value for [`OptionKey::ProteinOpacity`].
    ProteinOpacity(f64),
    /// Value for [`OptionKey::SelectionOpacity`].
    SelectionOpacity(f64),
    /// Value for [`OptionKey::BackgroundOpacity`].
    BackgroundOpacity(f64),
    /// Value for [`OptionKey::ShowGlycans`].
    ShowGlycans(bool),
    /// Value for [`OptionKey::ShowNucleotides`].
    ShowNucleotides(bool),
    /// Value for [`OptionKey::ShowNonCarbonHydrogens`].
    ShowNonCarbonHydrogens(bool),
}

impl OptionKey {
    /// All keys, in URL order.
    pub const ALL: [Self; 15] = [
        Self::Summary,
        Self::Floor,
        Self::ProteinRepresentation,
        Self::SelectionRepresentation,
        Self::BackgroundRepresentation,
        Self::LigandRepresentation,
        Self::ProteinColor,
        Self::BackgroundColor,
        Self::LigandColor,
        Self::ProteinOpacity,
        Self::SelectionOpacity,
        Self::BackgroundOpacity,
        Self::ShowGlycans,
        Self::ShowNucleotides,
        Self::ShowNonCarbonHydrogens,
    ];

    /// URL parameter / control name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Summary => "summary",
            Self::Floor => "floor",
            Self::ProteinRepresentation => "proteinRepresentation",
            Self::SelectionRepresentation => "selectionRepresentation",
            Self::BackgroundRepresentation => "backgroundRepresentation",
            Self::LigandRepresentation => "ligandRepresentation",
            Self::ProteinColor => "proteinColor",
            Self::BackgroundColor => "backgroundColor",
            Self::LigandColor => "ligandColor",
            Self::ProteinOpacity => "proteinOpacity",
            Self::SelectionOpacity => "selectionOpacity",
            Self::BackgroundOpacity => "backgroundOpacity",
            Self::ShowGlycans => "showGlycans",
            Self::ShowNucleotides => "showNucleotides",
            Self::ShowNonCarbonHydrogens => "showNonCarbonHydrogens",
        }
    }

    /// Look up a key by its name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.name() == name)
    }

    /// Views affected by this option.
    #[must_use]
    pub const fn scope(self) -> OptionScope {
        match self {
            Self::Summary | Self::Floor => OptionScope::Chart,
            _ => OptionScope::Protein,
        }
    }

    /// Parse a raw string (URL or control value) into a typed option.
    pub fn parse(self, raw: &str) -> Result<ToolOption, DmsVizError> {
        let value = match self {
            Self::Summary => ToolOption::Summary(self.parse_enum(raw)?),
            Self::Floor => ToolOption::Floor(self.parse_bool(raw)?),
            Self::ProteinRepresentation => {
                ToolOption::ProteinRepresentation(self.parse_enum(raw)?)
            }
            Self::SelectionRepresentation => {
                ToolOption::SelectionRepresentation(self.parse_enum(raw)?)
            }
            Self::BackgroundRepresentation => {
                ToolOption::BackgroundRepresentation(self.parse_enum(raw)?)
            }
            Self::LigandRepresentation => {
                ToolOption::LigandRepresentation(self.parse_enum(raw)?)
            }
            Self::ProteinColor => ToolOption::ProteinColor(self.parse_color(raw)?),
            Self::BackgroundColor => {
                ToolOption::BackgroundColor(self.parse_color(raw)?)
            }
            Self::LigandColor => ToolOption::LigandColor(self.parse_color(raw)?),
            Self::ProteinOpacity => {
                ToolOption::ProteinOpacity(self.parse_opacity(raw)?)
            }
            Self::SelectionOpacity => {
                ToolOption::SelectionOpacity(self.parse_opacity(raw)?)
            }
            Self::BackgroundOpacity => {
                ToolOption::BackgroundOpacity(self.parse_opacity(raw)?)
            }
            Self::ShowGlycans => ToolOption::ShowGlycans(self.parse_bool(raw)?),
            Self::ShowNucleotides => {
                ToolOption::ShowNucleotides(self.parse_bool(raw)?)
            }
            Self::ShowNonCarbonHydrogens => {
                ToolOption::ShowNonCarbonHydrogens(self.parse_bool(raw)?)
            }
        };
        Ok(value)
    }

    /// The current value in its string (URL) form.
    #[must_use]
    pub fn read(self, config: &ToolConfig) -> String {
        let p = &config.protein;
        match self {
            Self::Summary => variant_name(&config.summary),
            Self::Floor => config.floor.to_string(),
            Self::ProteinRepresentation => variant_name(&p.protein_representation),
            Self::SelectionRepresentation => {
                variant_name(&p.selection_representation)
            }
            Self::BackgroundRepresentation => {
                variant_name(&p.background_representation)
            }
            Self::LigandRepresentation => variant_name(&p.ligand_representation),
            Self::ProteinColor => p.protein_color.to_hex(),
            Self::BackgroundColor => p.background_color.to_hex(),
            Self::LigandColor => p.ligand_color.to_hex(),
            Self::ProteinOpacity => p.protein_opacity.to_string(),
            Self::SelectionOpacity => p.selection_opacity.to_string(),
            Self::BackgroundOpacity => p.background_opacity.to_string(),
            Self::ShowGlycans => p.show_glycans.to_string(),
            Self::ShowNucleotides => p.show_nucleotides.to_string(),
            Self::ShowNonCarbonHydrogens => p.show_non_carbon_hydrogens.to_string(),
        }
    }

    fn invalid(self, raw: &str) -> DmsVizError {
        DmsVizError::InvalidOption {
            key: self.name().to_owned(),
            value: raw.to_owned(),
        }
    }

    fn parse_enum<T: DeserializeOwned>(self, raw: &str) -> Result<T, DmsVizError> {
        serde_json::from_value(Value::String(raw.to_owned()))
            .map_err(|_| self.invalid(raw))
    }

    fn parse_bool(self, raw: &str) -> Result<bool, DmsVizError> {
        match raw {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(self.invalid(raw)),
        }
    }

    fn parse_color(self, raw: &str) -> Result<Color, DmsVizError> {
        raw.parse().map_err(|_| self.invalid(raw))
    }

    fn parse_opacity(self, raw: &str) -> Result<f64, DmsVizError> {
        match raw.trim().parse::<f64>() {
            Ok(v) if (0.0..=1.0).contains(&v) => Ok(v),
            _ => Err(self.invalid(raw)),
        }
    }
}

impl ToolOption {
    /// The key this value belongs to.
    #[must_use]
    pub const fn key(&self) -> OptionKey {
        match self {
            Self::Summary(_) => OptionKey::Summary,
            Self::Floor(_) => OptionKey::Floor,
            Self::ProteinRepresentation(_) => OptionKey::ProteinRepresentation,
            Self::SelectionRepresentation(_) => {
                OptionKey::SelectionRepresentation
            }
            Self::BackgroundRepresentation(_) => {
                OptionKey::BackgroundRepresentation
            }
            Self::LigandRepresentation(_) => OptionKey::LigandRepresentation,
            Self::ProteinColor(_) => OptionKey::ProteinColor,
            Self::BackgroundColor(_) => OptionKey::BackgroundColor,
            Self::LigandColor(_) => OptionKey::LigandColor,
            Self::ProteinOpacity(_) => OptionKey::ProteinOpacity,
            Self::SelectionOpacity(_) => OptionKey::SelectionOpacity,
            Self::BackgroundOpacity(_) => OptionKey::BackgroundOpacity,
            Self::ShowGlycans(_) => OptionKey::ShowGlycans,
            Self::ShowNucleotides(_) => OptionKey::ShowNucleotides,
            Self::ShowNonCarbonHydrogens(_) => OptionKey::ShowNonCarbonHydrogens,
        }
    }
}
