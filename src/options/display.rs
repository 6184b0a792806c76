use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// How per-site metric values are aggregated.
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Default,
    JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum SummaryKind {
    /// Sum over mutations at the site.
    #[default]
    Sum,
    /// Mean over mutations at the site.
    Mean,
    /// Largest value at the site.
    Max,
    /// Smallest value at the site.
    Min,
}

/// Representation of the data chains.
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Default,
    JsonSchema,
)]
pub enum ProteinRepresentation {
    /// Secondary-structure cartoon.
    #[default]
    #[serde(rename = "cartoon")]
    Cartoon,
    /// Backbone trace.
    #[serde(rename = "rope")]
    Rope,
    /// Atoms and bonds.
    #[serde(rename = "ball+stick")]
    BallAndStick,
}

/// Representation of the currently selected sites.
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Default,
    JsonSchema,
)]
pub enum SelectionRepresentation {
    /// Van der Waals spheres.
    #[default]
    #[serde(rename = "spacefill")]
    Spacefill,
    /// Molecular surface.
    #[serde(rename = "surface")]
    Surface,
}

/// Representation of non-data chains.
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Default,
    JsonSchema,
)]
pub enum BackgroundRepresentation {
    /// Backbone trace.
    #[default]
    #[serde(rename = "rope")]
    Rope,
    /// Secondary-structure cartoon.
    #[serde(rename = "cartoon")]
    Cartoon,
    /// Atoms and bonds.
    #[serde(rename = "ball+stick")]
    BallAndStick,
}

/// Representation of glycans and other ligands.
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Default,
    JsonSchema,
)]
pub enum LigandRepresentation {
    /// Van der Waals spheres.
    #[default]
    #[serde(rename = "spacefill")]
    Spacefill,
    /// Atoms and bonds.
    #[serde(rename = "ball+stick")]
    BallAndStick,
}

/// Wire name of a unit enum, as serde writes it.
pub(crate) fn variant_name<T: Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(name)) => name,
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names() {
        assert_eq!(variant_name(&SummaryKind::Mean), "mean");
        assert_eq!(variant_name(&ProteinRepresentation::BallAndStick), "ball+stick");
        assert_eq!(variant_name(&BackgroundRepresentation::default()), "rope");
        let parsed: LigandRepresentation =
            serde_json::from_str("\"ball+stick\"").unwrap();
        assert_eq!(parsed, LigandRepresentation::BallAndStick);
    }
}
