//! Idempotent merging of freshly fetched traffic into stored history.
//!
//! The API only reports a rolling 14-day window, so every merge overwrites
//! the values it has seen again and keeps everything else untouched.

use std::collections::BTreeMap;

use crate::models::{DailyCount, PopularPath, Referrer, TrafficEntry};

/// An entry of a "top N" list, unique by name and ranked by count.
pub trait RankedEntry: Clone {
    fn key(&self) -> &str;
    fn count(&self) -> u64;
}

impl RankedEntry for Referrer {
    fn key(&self) -> &str {
        &self.referrer
    }

    fn count(&self) -> u64 {
        self.count
    }
}

impl RankedEntry for PopularPath {
    fn key(&self) -> &str {
        &self.path
    }

    fn count(&self) -> u64 {
        self.count
    }
}

/// Overwrites the stored value for every date present in `entries`.
pub fn merge_daily(history: &mut BTreeMap<String, DailyCount>, entries: &[TrafficEntry]) {
    for entry in entries {
        history.insert(
            entry.date().to_string(),
            DailyCount {
                count: entry.count,
                uniques: entry.uniques,
            },
        );
    }
}

/// Replaces entries by name with their latest observation, then re-ranks by
/// count descending. Names repeated in `history` collapse to their last
/// occurrence. The sort is stable, so equal counts keep first-seen order.
pub fn merge_ranked<T: RankedEntry>(history: &mut Vec<T>, latest: &[T]) {
    let mut merged: Vec<T> = Vec::with_capacity(history.len() + latest.len());
    for entry in history.drain(..).chain(latest.iter().cloned()) {
        match merged.iter().position(|e| e.key() == entry.key()) {
            Some(idx) => merged[idx] = entry,
            None => merged.push(entry),
        }
    }

    merged.sort_by(|a, b| b.count().cmp(&a.count()));
    *history = merged;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(date: &str, count: u64, uniques: u64) -> TrafficEntry {
        TrafficEntry {
            timestamp: format!("{}T00:00:00Z", date),
            count,
            uniques,
        }
    }

    fn referrer(name: &str, count: u64, uniques: u64) -> Referrer {
        Referrer {
            referrer: name.to_string(),
            count,
            uniques,
        }
    }

    #[test]
    fn test_merge_daily_is_idempotent() {
        let mut history = BTreeMap::new();
        let batch = vec![entry("2024-01-01", 5, 2), entry("2024-01-02", 3, 1)];

        merge_daily(&mut history, &batch);
        let first = history.clone();
        merge_daily(&mut history, &batch);

        assert_eq!(history, first);
    }

    #[test]
    fn test_merge_daily_overwrites_instead_of_summing() {
        let mut history = BTreeMap::new();
        history.insert("2024-01-01".to_string(), DailyCount { count: 5, uniques: 2 });

        merge_daily(&mut history, &[entry("2024-01-01", 9, 3)]);

        assert_eq!(history.len(), 1);
        assert_eq!(history["2024-01-01"], DailyCount { count: 9, uniques: 3 });
    }

    #[test]
    fn test_merge_daily_keeps_dates_sorted() {
        let mut history = BTreeMap::new();
        history.insert("2024-01-05".to_string(), DailyCount { count: 1, uniques: 1 });

        merge_daily(
            &mut history,
            &[entry("2024-01-09", 2, 1), entry("2023-12-31", 4, 2)],
        );

        let dates: Vec<&str> = history.keys().map(String::as_str).collect();
        assert_eq!(dates, vec!["2023-12-31", "2024-01-05", "2024-01-09"]);

        let json = serde_json::to_string(&history).unwrap();
        assert!(json.find("2023-12-31").unwrap() < json.find("2024-01-09").unwrap());
    }

    #[test]
    fn test_merge_daily_preserves_dates_outside_window() {
        let mut history = BTreeMap::new();
        history.insert("2023-06-01".to_string(), DailyCount { count: 40, uniques: 10 });

        merge_daily(&mut history, &[entry("2024-01-01", 1, 1)]);

        assert_eq!(history["2023-06-01"].count, 40);
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_merge_referrers_dedups_and_keeps_latest() {
        let mut history = vec![referrer("google.com", 10, 4), referrer("github.com", 3, 2)];

        merge_ranked(
            &mut history,
            &[referrer("github.com", 25, 8), referrer("news.ycombinator.com", 5, 5)],
        );

        assert_eq!(history.len(), 3);
        assert_eq!(history[0], referrer("github.com", 25, 8));
        assert_eq!(history[1], referrer("google.com", 10, 4));
        assert_eq!(history[2], referrer("news.ycombinator.com", 5, 5));
    }

    #[test]
    fn test_merge_referrers_latest_can_lower_count() {
        let mut history = vec![referrer("google.com", 10, 4)];

        merge_ranked(&mut history, &[referrer("google.com", 2, 1)]);

        assert_eq!(history, vec![referrer("google.com", 2, 1)]);
    }

    #[test]
    fn test_merge_paths_sorted_by_count() {
        let path = |p: &str, count: u64| PopularPath {
            path: p.to_string(),
            title: None,
            count,
            uniques: 1,
        };
        let mut history = vec![path("/owner/repo", 4)];

        merge_ranked(
            &mut history,
            &[path("/owner/repo/blob/main/README.md", 12), path("/owner/repo", 6)],
        );

        let order: Vec<&str> = history.iter().map(|p| p.path.as_str()).collect();
        assert_eq!(order, vec!["/owner/repo/blob/main/README.md", "/owner/repo"]);
        assert_eq!(history[1].count, 6);
    }

    #[test]
    fn test_merge_referrers_collapses_stored_duplicates() {
        let mut history = vec![
            referrer("google.com", 10, 4),
            referrer("github.com", 3, 2),
            referrer("google.com", 7, 3),
        ];

        merge_ranked(&mut history, &[referrer("bing.com", 1, 1)]);

        assert_eq!(
            history,
            vec![
                referrer("google.com", 7, 3),
                referrer("github.com", 3, 2),
                referrer("bing.com", 1, 1),
            ]
        );
    }
}
