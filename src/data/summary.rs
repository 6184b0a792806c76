//! Per-site aggregation of mutation metrics.

use rustc_hash::FxHashMap;
use serde::Serialize;

use super::raw::ProteinSite;
use super::site_map::NormalizedMutation;
use crate::options::SummaryKind;

/// Aggregates of the metric over one (site, epitope) group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SiteStats {
    /// Sum of the metric.
    pub sum: f64,
    /// Arithmetic mean of the metric.
    pub mean: f64,
    /// Largest metric value.
    pub max: f64,
    /// Smallest metric value.
    pub min: f64,
    /// Number of rows with a metric value.
    pub count: usize,
}

impl SiteStats {
    /// The aggregate selected by `kind`.
    #[must_use]
    pub fn get(&self, kind: SummaryKind) -> f64 {
        match kind {
            SummaryKind::Sum => self.sum,
            SummaryKind::Mean => self.mean,
            SummaryKind::Max => self.max,
            SummaryKind::Min => self.min,
        }
    }
}

/// One (site, epitope) row of a summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteSummary {
    /// Sequential site.
    pub site: i64,
    /// Site in reference numbering.
    pub site_reference: String,
    /// Site on the structure.
    pub site_protein: ProteinSite,
    /// Chains the site appears on.
    pub site_chain: String,
    /// Epitope / condition.
    pub epitope: String,
    /// All aggregates.
    #[serde(flatten)]
    pub stats: SiteStats,
    /// The aggregate selected when the summary was built.
    pub value: f64,
}

struct Group<'a> {
    first: &'a NormalizedMutation,
    sum: f64,
    max: f64,
    min: f64,
    count: usize,
}

/// Summarize rows per (site, epitope).
///
/// Rows without a metric value are ignored; groups left with no values are
/// omitted, so no aggregate is ever `NaN`. Output follows the order in
/// which each group key was first seen.
pub fn summarize<'a, I>(rows: I, kind: SummaryKind) -> Vec<SiteSummary>
where
    I: IntoIterator<Item = &'a NormalizedMutation>,
{
    let mut index: FxHashMap<(i64, &str), usize> = FxHashMap::default();
    let mut groups: Vec<Group<'a>> = Vec::new();

    for row in rows {
        let Some(metric) = row.metric.filter(|m| m.is_finite()) else {
            continue;
        };
        let key = (row.site, row.epitope.as_str());
        if let Some(&slot) = index.get(&key) {
            let group = &mut groups[slot];
            group.sum += metric;
            group.max = group.max.max(metric);
            group.min = group.min.min(metric);
            group.count += 1;
        } else {
            let _ = index.insert(key, groups.len());
            groups.push(Group {
                first: row,
                sum: metric,
                max: metric,
                min: metric,
                count: 1,
            });
        }
    }

    groups
        .into_iter()
        .map(|g| {
            let stats = SiteStats {
                sum: g.sum,
                mean: g.sum / g.count as f64,
                max: g.max,
                min: g.min,
                count: g.count,
            };
            SiteSummary {
                site: g.first.site,
                site_reference: g.first.site_reference.clone(),
                site_protein: g.first.site_protein.clone(),
                site_chain: g.first.site_chain.clone(),
                epitope: g.first.epitope.clone(),
                stats,
                value: stats.get(kind),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::Map;

    use super::*;

    fn row(site: i64, epitope: &str, metric: Option<f64>) -> NormalizedMutation {
        NormalizedMutation {
            site,
            site_reference: site.to_string(),
            site_protein: ProteinSite::Number(site + 330),
            site_chain: "A".to_owned(),
            metric,
            epitope: epitope.to_owned(),
            fields: Map::new(),
        }
    }

    fn values(summary: &[SiteSummary]) -> Vec<(i64, f64)> {
        summary.iter().map(|s| (s.site, s.value)).collect()
    }

    #[test]
    fn sum_and_max_per_site() {
        let rows = [
            row(1, "A", Some(2.0)),
            row(1, "A", Some(4.0)),
            row(2, "A", Some(-1.0)),
        ];
        assert_eq!(
            values(&summarize(&rows, SummaryKind::Sum)),
            [(1, 6.0), (2, -1.0)]
        );
        assert_eq!(
            values(&summarize(&rows, SummaryKind::Max)),
            [(1, 4.0), (2, -1.0)]
        );
        assert_eq!(
            values(&summarize(&rows, SummaryKind::Min)),
            [(1, 2.0), (2, -1.0)]
        );
        assert_eq!(
            values(&summarize(&rows, SummaryKind::Mean)),
            [(1, 3.0), (2, -1.0)]
        );
    }

    #[test]
    fn groups_split_by_epitope_in_first_seen_order() {
        let rows = [
            row(5, "B", Some(1.0)),
            row(3, "A", Some(1.0)),
            row(5, "A", Some(2.0)),
            row(5, "B", Some(3.0)),
        ];
        let summary = summarize(&rows, SummaryKind::Sum);
        let keys: Vec<(i64, &str, f64)> = summary
            .iter()
            .map(|s| (s.site, s.epitope.as_str(), s.value))
            .collect();
        assert_eq!(keys, [(5, "B", 4.0), (3, "A", 1.0), (5, "A", 2.0)]);
        assert_eq!(summary[0].stats.count, 2);
        assert_eq!(summary[0].site_protein, ProteinSite::Number(335));
    }

    #[test]
    fn groups_without_values_are_omitted() {
        let rows = [row(1, "A", None), row(2, "A", Some(f64::NAN)), row(3, "A", Some(1.0))];
        let summary = summarize(&rows, SummaryKind::Mean);
        assert_eq!(values(&summary), [(3, 1.0)]);
        assert!(summary.iter().all(|s| !s.value.is_nan()));
    }
}
