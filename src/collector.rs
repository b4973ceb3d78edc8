use anyhow::Result;
use chrono::Utc;
use std::io::Write;
use tracing::{error, info};

use crate::github::GithubClient;
use crate::models::RunSummary;
use crate::store::RecordStore;

/// Result of a collection run.
#[derive(Debug, Clone, Default)]
pub struct CollectionReport {
    pub summary: RunSummary,
    pub failed_writes: usize,
}

pub struct Collector {
    client: GithubClient,
    store: RecordStore,
    owner: String,
    dry_run: bool,
}

impl Collector {
    pub fn new(client: GithubClient, store: RecordStore, owner: String, dry_run: bool) -> Self {
        Self {
            client,
            store,
            owner,
            dry_run,
        }
    }

    /// Collects traffic for every public repository of the owner, writing
    /// progress lines to `out`. In dry-run mode nothing is persisted.
    pub async fn run<W: Write>(&self, out: &mut W) -> Result<CollectionReport> {
        writeln!(out, "Collecting traffic stats for {}...", self.owner)?;
        let repos = self.client.list_public_repos(&self.owner).await;
        writeln!(out, "Found {} public repos (excluding forks)", repos.len())?;

        let collected_at = Utc::now().to_rfc3339();
        let total = repos.len();
        let mut report = CollectionReport {
            summary: RunSummary {
                collected_at: collected_at.clone(),
                repos_checked: total,
                ..RunSummary::default()
            },
            failed_writes: 0,
        };

        for (idx, repo) in repos.iter().enumerate() {
            let traffic = self.client.fetch_traffic(&self.owner, &repo.name).await;

            if !traffic.has_traffic() {
                writeln!(out, "  [{}/{}] {} - no traffic", idx + 1, total, repo.name)?;
                continue;
            }

            report.summary.repos_with_traffic += 1;
            report.summary.repos_with_traffic_names.push(repo.name.clone());
            writeln!(
                out,
                "  [{}/{}] {} - views: {}, clones: {}",
                idx + 1,
                total,
                repo.name,
                traffic.views.count,
                traffic.clones.count
            )?;

            if self.dry_run {
                continue;
            }

            let mut record = self.store.load_record(&repo.name);
            record.merge_traffic(&self.owner, repo, &traffic, &collected_at);
            if let Err(e) = self.store.save_record(&record) {
                error!(repo = %repo.name, error = %format!("{:#}", e), "Failed to save record");
                report.failed_writes += 1;
            }
        }

        if !self.dry_run {
            let path = self.store.save_summary(&report.summary)?;
            info!("Run summary written to {}", path.display());
        }

        writeln!(out)?;
        writeln!(
            out,
            "Done. {}/{} repos had traffic.",
            report.summary.repos_with_traffic, total
        )?;
        if self.dry_run {
            writeln!(out, "(dry run - no files written)")?;
        }

        Ok(report)
    }
}
