use rustc_hash::FxHashMap;
use serde::Serialize;

use super::Color;
use crate::data::SiteSummary;

/// A value → color mapping derived from one epitope's summary values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ColorScale {
    /// `[-extent, 0, extent]` → `[negative, white, positive]`.
    Diverging {
        /// Largest absolute value.
        extent: f64,
        /// Color of `-extent` (the complement of `positive`).
        negative: Color,
        /// Color of `extent`.
        positive: Color,
    },
    /// `[0, max]` → `[white, positive]`; negative inputs act as zero.
    Sequential {
        /// Largest value after clamping negatives to zero.
        max: f64,
        /// Color of `max`.
        positive: Color,
    },
}

impl ColorScale {
    /// Scale domain breakpoints.
    #[must_use]
    pub fn domain(&self) -> Vec<f64> {
        match *self {
            Self::Diverging { extent, .. } => vec![-extent, 0.0, extent],
            Self::Sequential { max, .. } => vec![0.0, max],
        }
    }

    /// Color of `value`. Values outside the domain saturate; a degenerate
    /// (zero-width) domain maps everything to white.
    #[must_use]
    pub fn color_for(&self, value: f64) -> Color {
        match *self {
            Self::Diverging {
                extent,
                negative,
                positive,
            } => {
                if extent == 0.0 || !value.is_finite() {
                    return Color::WHITE;
                }
                let t = (value / extent).clamp(-1.0, 1.0);
                if t >= 0.0 {
                    Color::WHITE.lerp(positive, t)
                } else {
                    Color::WHITE.lerp(negative, -t)
                }
            }
            Self::Sequential { max, positive } => {
                if max == 0.0 || !value.is_finite() {
                    return Color::WHITE;
                }
                Color::WHITE.lerp(positive, value.max(0.0) / max)
            }
        }
    }
}

/// Structure residue number → resolved color.
pub type SiteColorMap = FxHashMap<i64, Color>;

/// Build the scale and site colors for one epitope.
///
/// Only rows of `epitope` contribute. Rows whose structure site is not
/// numeric are left out of the map (they cannot be drawn). The result
/// depends on nothing but the arguments.
#[must_use]
pub fn build_scale(
    rows: &[SiteSummary],
    epitope: &str,
    floor: bool,
    base: Color,
) -> (ColorScale, SiteColorMap) {
    let values = || {
        rows.iter()
            .filter(|row| row.epitope == epitope)
            .map(|row| row.value)
            .filter(|v| v.is_finite())
    };

    let scale = if floor {
        ColorScale::Sequential {
            max: values().map(|v| v.max(0.0)).fold(0.0, f64::max),
            positive: base,
        }
    } else {
        ColorScale::Diverging {
            extent: values().map(f64::abs).fold(0.0, f64::max),
            negative: base.invert(),
            positive: base,
        }
    };

    let mut colors = SiteColorMap::default();
    for row in rows.iter().filter(|row| row.epitope == epitope) {
        if let Some(resno) = row.site_protein.residue_number() {
            let _ = colors.insert(resno, scale.color_for(row.value));
        }
    }
    (scale, colors)
}

/// Per-residue coloring handed to the structure renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteColorScheme {
    /// Scale the colors were derived from.
    pub scale: ColorScale,
    /// Residue → color.
    pub colors: SiteColorMap,
    /// Color of residues absent from `colors`.
    pub fallback: Color,
}

impl SiteColorScheme {
    /// Color for an atom of residue `resno`.
    #[must_use]
    pub fn atom_color(&self, resno: i64) -> Color {
        self.colors.get(&resno).copied().unwrap_or(self.fallback)
    }
}
