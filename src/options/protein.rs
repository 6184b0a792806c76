use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::display::{
    BackgroundRepresentation, LigandRepresentation, ProteinRepresentation,
    SelectionRepresentation,
};
use super::OptionKey;
use crate::color::Color;
use crate::error::DmsVizError;

/// Structure display options. These only ever affect the protein view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Protein", inline)]
#[serde(default, rename_all = "camelCase")]
pub struct ProteinOptions {
    /// Representation of chains that carry data.
    #[schemars(title = "Protein Representation")]
    pub protein_representation: ProteinRepresentation,
    /// Representation of the selected sites.
    #[schemars(title = "Selection Representation")]
    pub selection_representation: SelectionRepresentation,
    /// Representation of chains without data.
    #[schemars(title = "Background Representation")]
    pub background_representation: BackgroundRepresentation,
    /// Representation of ligands.
    #[schemars(title = "Ligand Representation")]
    pub ligand_representation: LigandRepresentation,
    /// Fallback color of data chains.
    #[schemars(title = "Protein Color", with = "String")]
    pub protein_color: Color,
    /// Color of chains without data.
    #[schemars(title = "Background Color", with = "String")]
    pub background_color: Color,
    /// Color of ligands.
    #[schemars(title = "Ligand Color", with = "String")]
    pub ligand_color: Color,
    /// Opacity of the data chains, in `[0, 1]`.
    #[schemars(title = "Protein Opacity", range(min = 0.0, max = 1.0), extend("step" = 0.1))]
    pub protein_opacity: f64,
    /// Opacity of the selection layer, in `[0, 1]`.
    #[schemars(title = "Selection Opacity", range(min = 0.0, max = 1.0), extend("step" = 0.1))]
    pub selection_opacity: f64,
    /// Opacity of chains without data, in `[0, 1]`.
    #[schemars(title = "Background Opacity", range(min = 0.0, max = 1.0), extend("step" = 0.1))]
    pub background_opacity: f64,
    /// Draw glycan residues.
    #[schemars(title = "Show Glycans")]
    pub show_glycans: bool,
    /// Draw nucleotide residues.
    #[schemars(title = "Show Nucleotides")]
    pub show_nucleotides: bool,
    /// Draw hydrogens bonded to non-carbon atoms.
    #[schemars(title = "Show Non-Carbon Hydrogens")]
    pub show_non_carbon_hydrogens: bool,
}

impl Default for ProteinOptions {
    fn default() -> Self {
        Self {
            protein_representation: ProteinRepresentation::Cartoon,
            selection_representation: SelectionRepresentation::Spacefill,
            background_representation: BackgroundRepresentation::Rope,
            ligand_representation: LigandRepresentation::Spacefill,
            protein_color: Color::LIGHT_GRAY,
            background_color: Color::LIGHT_GRAY,
            ligand_color: Color::LIGHT_GRAY,
            protein_opacity: 1.0,
            selection_opacity: 1.0,
            background_opacity: 1.0,
            show_glycans: false,
            show_nucleotides: false,
            show_non_carbon_hydrogens: false,
        }
    }
}

impl ProteinOptions {
    /// Parse a TOML preset. Missing fields keep their defaults; opacities
    /// outside `[0, 1]` are rejected the same way the URL rejects them.
    pub fn from_toml(text: &str) -> Result<Self, DmsVizError> {
        let options: Self = toml::from_str(text)
            .map_err(|e| DmsVizError::OptionsParse(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    fn validate(&self) -> Result<(), DmsVizError> {
        let opacities = [
            (OptionKey::ProteinOpacity, self.protein_opacity),
            (OptionKey::SelectionOpacity, self.selection_opacity),
            (OptionKey::BackgroundOpacity, self.background_opacity),
        ];
        match opacities
            .into_iter()
            .find(|(_, value)| !(0.0..=1.0).contains(value))
        {
            Some((key, value)) => Err(DmsVizError::InvalidOption {
                key: key.name().to_owned(),
                value: value.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Load a preset file.
    pub fn load(path: &Path) -> Result<Self, DmsVizError> {
        Self::from_toml(&std::fs::read_to_string(path)?)
    }

    /// The preset as TOML, holding only the fields that differ from the
    /// defaults.
    pub fn to_toml(&self) -> Result<String, DmsVizError> {
        let defaults = Self::default().to_table()?;
        let changed: toml::Table = self
            .to_table()?
            .into_iter()
            .filter(|(key, value)| defaults.get(key) != Some(value))
            .collect();
        toml::to_string_pretty(&changed)
            .map_err(|e| DmsVizError::OptionsParse(e.to_string()))
    }

    fn to_table(&self) -> Result<toml::Table, DmsVizError> {
        match toml::Value::try_from(self) {
            Ok(toml::Value::Table(table)) => Ok(table),
            Ok(other) => Err(DmsVizError::OptionsParse(format!(
                "expected a table, got {}",
                other.type_str()
            ))),
            Err(e) => Err(DmsVizError::OptionsParse(e.to_string())),
        }
    }

    /// Write the preset to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), DmsVizError> {
        let content = self.to_toml()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Preset names (TOML file stems) in a directory, sorted. A missing
    /// directory has no presets.
    #[must_use]
    pub fn list_presets(dir: &Path) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "toml"))
            .filter_map(|path| path.file_stem()?.to_str().map(str::to_owned))
            .collect();
        names.sort_unstable();
        names
    }
}
