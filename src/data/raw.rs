//! Input dataset shapes as they arrive from JSON.

use std::fmt;

use rustc_hash::FxHashMap;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use super::OrderedMap;

// ---------------------------------------------------------------------------
// Chains
// ---------------------------------------------------------------------------

/// Either a single keyword (`"polymer"`, `"none"`) or an explicit list of
/// chain ids. Lists may also be written as one space-separated string.
#[derive(Deserialize)]
#[serde(untagged)]
enum ChainList {
    Word(String),
    List(Vec<String>),
}

impl ChainList {
    /// Resolve to an explicit chain list, or `None` when the input is the
    /// given keyword.
    fn resolve(self, keyword: &str) -> Option<Vec<String>> {
        match self {
            Self::Word(w) if w.trim() == keyword => None,
            Self::Word(w) => {
                Some(w.split_whitespace().map(str::to_owned).collect())
            }
            Self::List(list) => Some(list),
        }
    }
}

/// Chains of the structure that carry mutation data.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ChainSpec {
    /// Every polymer chain carries data; there is no background.
    #[default]
    Polymer,
    /// Only these chains carry data.
    Chains(Vec<String>),
}

impl<'de> Deserialize<'de> for ChainSpec {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        Ok(ChainList::deserialize(d)?
            .resolve("polymer")
            .map_or(Self::Polymer, Self::Chains))
    }
}

impl Serialize for ChainSpec {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Polymer => s.serialize_str("polymer"),
            Self::Chains(chains) => chains.serialize(s),
        }
    }
}

/// Chains hidden from the structure entirely.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ExcludeChains {
    /// Nothing is excluded.
    #[default]
    None,
    /// These chains are excluded from the background.
    Chains(Vec<String>),
}

impl<'de> Deserialize<'de> for ExcludeChains {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        Ok(ChainList::deserialize(d)?
            .resolve("none")
            .map_or(Self::None, Self::Chains))
    }
}

impl Serialize for ExcludeChains {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::None => s.serialize_str("none"),
            Self::Chains(chains) => chains.serialize(s),
        }
    }
}

// ---------------------------------------------------------------------------
// Sites
// ---------------------------------------------------------------------------

/// Residue label on the solved structure. Sites absent from the structure
/// are usually written as `"NA"` or `null`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum ProteinSite {
    /// Plain residue number.
    Number(i64),
    /// Free-form label, e.g. with an insertion code (`"214a"`).
    Label(String),
    /// No structure site.
    #[default]
    Missing,
}

impl ProteinSite {
    /// Residue number used for structure selections and coloring.
    ///
    /// Labels resolve to their leading integer (`"214a"` → 214); labels
    /// without one (`"NA"`) have no residue number.
    #[must_use]
    pub fn residue_number(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Label(label) => leading_int(label),
            Self::Missing => None,
        }
    }
}

/// Parse the leading (optionally signed) integer of a label.
fn leading_int(label: &str) -> Option<i64> {
    let trimmed = label.trim_start();
    let sign_len = usize::from(trimmed.starts_with(['-', '+']));
    let digits = trimmed[sign_len..]
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();
    if digits == 0 {
        return None;
    }
    trimmed[..sign_len + digits].parse().ok()
}

impl fmt::Display for ProteinSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Label(label) => f.write_str(label),
            Self::Missing => f.write_str("NA"),
        }
    }
}

impl<'de> Deserialize<'de> for ProteinSite {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        match Value::deserialize(d)? {
            Value::Null => Ok(Self::Missing),
            Value::Number(n) => Ok(integral(&n)
                .map_or_else(|| Self::Label(n.to_string()), Self::Number)),
            Value::String(s) => Ok(Self::Label(s)),
            other => Err(D::Error::custom(format!(
                "expected a protein site, found {other}"
            ))),
        }
    }
}

impl Serialize for ProteinSite {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Number(n) => s.serialize_i64(*n),
            Self::Label(label) => s.serialize_str(label),
            Self::Missing => s.serialize_none(),
        }
    }
}

/// Integral value of a JSON number (`331` and `331.0` both qualify).
fn integral(n: &serde_json::Number) -> Option<i64> {
    n.as_i64().or_else(|| {
        n.as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < 9.0e15)
            .map(|f| f as i64)
    })
}

/// Render a scalar JSON value as the string key JavaScript would use for
/// it.
fn scalar_label<E: serde::de::Error>(value: Value) -> Result<String, E> {
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => {
            Ok(integral(&n).map_or_else(|| n.to_string(), |i| i.to_string()))
        }
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(E::custom(format!("expected a label, found {other}"))),
    }
}

fn de_label<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    scalar_label(Value::deserialize(d)?)
}

fn de_labels<'de, D: Deserializer<'de>>(
    d: D,
) -> Result<Vec<String>, D::Error> {
    Vec::<Value>::deserialize(d)?
        .into_iter()
        .map(scalar_label)
        .collect()
}

fn de_chains<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match ChainList::deserialize(d)? {
        ChainList::Word(w) => {
            w.split_whitespace().collect::<Vec<_>>().join(" ")
        }
        ChainList::List(list) => list.join(" "),
    })
}

/// Where one reference site lives in the other numbering schemes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SiteMapEntry {
    /// Sequential (internal) site number.
    pub sequential_site: i64,
    /// Site label on the structure.
    #[serde(default)]
    pub protein_site: ProteinSite,
    /// Space-separated chains the site appears on.
    #[serde(deserialize_with = "de_chains", default = "polymer_chain")]
    pub chains: String,
}

fn polymer_chain() -> String {
    "polymer".to_owned()
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One per-mutation row of `mut_metric_df`, before site mapping.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MutationRecord {
    /// Site in reference numbering (key into the sitemap).
    #[serde(deserialize_with = "de_label")]
    pub reference_site: String,
    /// Epitope / condition the row belongs to.
    #[serde(deserialize_with = "de_label")]
    pub epitope: String,
    /// Every other column (metric, filter, and tooltip columns).
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Columns shown as tooltips, either as bare names or with labels.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ColumnLabels {
    /// Column → display label.
    Labeled(OrderedMap<String>),
    /// Columns labeled by their own names.
    List(Vec<String>),
}

impl ColumnLabels {
    /// Column → label pairs in declaration order.
    #[must_use]
    pub fn into_labeled(self) -> OrderedMap<String> {
        match self {
            Self::Labeled(map) => map,
            Self::List(cols) => {
                cols.into_iter().map(|c| (c.clone(), c)).collect()
            }
        }
    }
}

/// One experiment of an input dataset.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RawExperiment {
    /// Reference site → other numbering schemes.
    pub sitemap: FxHashMap<String, SiteMapEntry>,
    /// Per-mutation rows.
    pub mut_metric_df: Vec<MutationRecord>,
    /// Column of `mut_metric_df` holding the plotted metric.
    pub metric_col: String,
    /// Epitopes / conditions, in display order.
    #[serde(deserialize_with = "de_labels")]
    pub epitopes: Vec<String>,
    /// Epitope → CSS hex color.
    #[serde(default)]
    pub epitope_colors: FxHashMap<String, String>,
    /// Four-character structure id, or inline structure text.
    pub pdb: String,
    /// Chains carrying data.
    #[serde(default, rename = "dataChains")]
    pub data_chains: ChainSpec,
    /// Chains hidden from the background.
    #[serde(default, rename = "excludeChains")]
    pub exclude_chains: ExcludeChains,
    /// Filterable column → slider label.
    #[serde(default)]
    pub filter_cols: Option<OrderedMap<String>>,
    /// Columns shown in chart tooltips.
    #[serde(default)]
    pub tooltip_cols: Option<ColumnLabels>,
}
