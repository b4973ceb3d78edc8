//! Aggregation of stored records into what the dashboard displays.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::config::RankBy;
use crate::models::{DailyCount, RepoRecord, RunSummary};

const TOP_N: usize = 10;

/// One color per chart series, indexed by rank.
pub const SERIES_COLORS: [&str; TOP_N] = [
    "#3b82f6", "#ef4444", "#10b981", "#f59e0b", "#8b5cf6", "#ec4899", "#06b6d4", "#84cc16",
    "#f97316", "#6366f1",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoTotals {
    pub name: String,
    pub owner: String,
    pub description: Option<String>,
    pub total_views: u64,
    pub unique_views: u64,
    pub total_clones: u64,
    pub unique_clones: u64,
    pub days_tracked: usize,
    pub stars: u64,
    pub forks: u64,
}

impl RepoTotals {
    pub fn from_record(record: &RepoRecord) -> Self {
        let sum = |days: &BTreeMap<String, DailyCount>, f: fn(&DailyCount) -> u64| -> u64 {
            days.values().map(f).sum()
        };

        Self {
            name: record.repo.clone(),
            owner: record.owner.clone(),
            description: record.description.clone(),
            total_views: sum(&record.views, |d| d.count),
            unique_views: sum(&record.views, |d| d.uniques),
            total_clones: sum(&record.clones, |d| d.count),
            unique_clones: sum(&record.clones, |d| d.uniques),
            days_tracked: record.views.len(),
            stars: record.stars,
            forks: record.forks,
        }
    }

    pub fn rank_value(&self, rank_by: RankBy) -> u64 {
        match rank_by {
            RankBy::Uniques => self.unique_views,
            RankBy::Views => self.total_views,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GlobalTotals {
    pub total_views: u64,
    pub unique_views: u64,
    pub total_clones: u64,
    pub unique_clones: u64,
    pub total_stars: u64,
    pub repos_tracked: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartSeries {
    pub label: String,
    pub data: Vec<u64>,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dashboard {
    /// Account shown in the title, taken from the records.
    pub owner: Option<String>,
    pub rank_by: RankBy,
    pub totals: GlobalTotals,
    /// All repositories, ranked.
    pub repos: Vec<RepoTotals>,
    pub chart_labels: Vec<String>,
    pub chart_series: Vec<ChartSeries>,
    pub top_referrers: Vec<(String, u64)>,
    pub top_starred: Vec<(String, u64)>,
    /// `YYYY-MM-DD` of the latest collection run, if one is recorded.
    pub last_run: Option<String>,
    pub built_at: DateTime<Utc>,
}

impl Dashboard {
    pub fn build(
        records: &[RepoRecord],
        summary: Option<&RunSummary>,
        rank_by: RankBy,
        built_at: DateTime<Utc>,
    ) -> Self {
        let mut ranked: Vec<(RepoTotals, &RepoRecord)> = records
            .iter()
            .map(|r| (RepoTotals::from_record(r), r))
            .collect();
        ranked.sort_by(|(a, _), (b, _)| {
            b.rank_value(rank_by)
                .cmp(&a.rank_value(rank_by))
                .then_with(|| a.name.cmp(&b.name))
        });

        let top: Vec<&RepoRecord> = ranked.iter().take(TOP_N).map(|(_, r)| *r).collect();
        let (chart_labels, chart_series) = top_series(&top, rank_by);
        let repos: Vec<RepoTotals> = ranked.into_iter().map(|(t, _)| t).collect();

        let totals = repos.iter().fold(
            GlobalTotals {
                repos_tracked: repos.len(),
                ..GlobalTotals::default()
            },
            |mut acc, r| {
                acc.total_views += r.total_views;
                acc.unique_views += r.unique_views;
                acc.total_clones += r.total_clones;
                acc.unique_clones += r.unique_clones;
                acc.total_stars += r.stars;
                acc
            },
        );

        let owner = records
            .iter()
            .map(|r| r.owner.as_str())
            .find(|o| !o.is_empty())
            .map(str::to_string);

        let last_run = summary
            .map(|s| s.collected_at.chars().take(10).collect::<String>())
            .filter(|d| !d.is_empty());

        Self {
            owner,
            rank_by,
            totals,
            chart_labels,
            chart_series,
            top_referrers: top_referrers(records),
            top_starred: top_starred(&repos),
            repos,
            last_run,
            built_at,
        }
    }
}

/// Daily series of the top ranked repositories over the union of their
/// tracked dates. Dates a repository has no entry for count as zero.
fn top_series(top: &[&RepoRecord], rank_by: RankBy) -> (Vec<String>, Vec<ChartSeries>) {
    let labels: Vec<String> = top
        .iter()
        .flat_map(|r| r.views.keys().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let series = top
        .iter()
        .enumerate()
        .map(|(idx, record)| ChartSeries {
            label: record.repo.clone(),
            data: labels
                .iter()
                .map(|date| {
                    record.views.get(date).map_or(0, |d| match rank_by {
                        RankBy::Uniques => d.uniques,
                        RankBy::Views => d.count,
                    })
                })
                .collect(),
            color: SERIES_COLORS[idx % SERIES_COLORS.len()],
        })
        .collect();

    (labels, series)
}

fn top_referrers(records: &[RepoRecord]) -> Vec<(String, u64)> {
    let mut sums: HashMap<&str, u64> = HashMap::new();
    for referrer in records.iter().flat_map(|r| &r.referrers) {
        *sums.entry(referrer.referrer.as_str()).or_default() += referrer.count;
    }

    let mut ranked: Vec<(String, u64)> = sums
        .into_iter()
        .map(|(name, count)| (name.to_string(), count))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(TOP_N);
    ranked
}

fn top_starred(repos: &[RepoTotals]) -> Vec<(String, u64)> {
    let mut starred: Vec<(String, u64)> = repos
        .iter()
        .filter(|r| r.stars > 0)
        .map(|r| (r.name.clone(), r.stars))
        .collect();
    starred.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    starred.truncate(TOP_N);
    starred
}
