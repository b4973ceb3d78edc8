use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::merge;

/// Repository entry from `GET /users/{owner}/repos`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RepoSummary {
    pub name: String,
    #[serde(default)]
    pub fork: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
}

/// One day of a views or clones response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficEntry {
    pub timestamp: String,
    pub count: u64,
    pub uniques: u64,
}

impl TrafficEntry {
    /// Calendar date (`YYYY-MM-DD`) of the entry's timestamp.
    pub fn date(&self) -> &str {
        self.timestamp.get(..10).unwrap_or(&self.timestamp)
    }
}

/// Response body of `traffic/views` and `traffic/clones`.
///
/// Both endpoints share the same shape apart from the name of the daily list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TrafficSeries {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub uniques: u64,
    #[serde(default, rename = "views", alias = "clones")]
    pub entries: Vec<TrafficEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Referrer {
    pub referrer: String,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub uniques: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopularPath {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub uniques: u64,
}

/// Everything fetched for a single repository in one collection run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoTraffic {
    pub views: TrafficSeries,
    pub clones: TrafficSeries,
    pub referrers: Vec<Referrer>,
    pub paths: Vec<PopularPath>,
}

impl RepoTraffic {
    pub fn has_traffic(&self) -> bool {
        !self.views.entries.is_empty() || !self.clones.entries.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCount {
    pub count: u64,
    pub uniques: u64,
}

/// Persisted history of a single repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoRecord {
    pub repo: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub last_updated: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub stars: u64,
    #[serde(default)]
    pub forks: u64,
    #[serde(default)]
    pub views: BTreeMap<String, DailyCount>,
    #[serde(default)]
    pub clones: BTreeMap<String, DailyCount>,
    #[serde(default)]
    pub referrers: Vec<Referrer>,
    #[serde(default)]
    pub paths: Vec<PopularPath>,
}

impl RepoRecord {
    pub fn new(repo: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            ..Self::default()
        }
    }

    /// Folds a fresh observation into the stored history and stamps it.
    pub fn merge_traffic(
        &mut self,
        owner: &str,
        snapshot: &RepoSummary,
        traffic: &RepoTraffic,
        collected_at: &str,
    ) {
        self.repo = snapshot.name.clone();
        self.owner = owner.to_string();
        self.last_updated = collected_at.to_string();
        self.description = snapshot.description.clone();
        self.stars = snapshot.stargazers_count;
        self.forks = snapshot.forks_count;

        merge::merge_daily(&mut self.views, &traffic.views.entries);
        merge::merge_daily(&mut self.clones, &traffic.clones.entries);
        merge::merge_ranked(&mut self.referrers, &traffic.referrers);
        merge::merge_ranked(&mut self.paths, &traffic.paths);
    }
}

/// Outcome of the latest collection run, overwritten every run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub collected_at: String,
    #[serde(default)]
    pub repos_checked: usize,
    #[serde(default)]
    pub repos_with_traffic: usize,
    #[serde(default)]
    pub repos_with_traffic_names: Vec<String>,
}
