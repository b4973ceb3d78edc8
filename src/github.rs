use anyhow::{Context, Result};
use octocrab::Octocrab;
use octocrab::service::middleware::retry::RetryConfig;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::FetchError;
use crate::models::{PopularPath, Referrer, RepoSummary, RepoTraffic, TrafficSeries};

const PAGE_SIZE: usize = 100;

#[derive(Serialize)]
struct ListReposParams {
    r#type: &'static str,
    per_page: usize,
    page: u32,
}

pub struct GithubClient {
    client: Octocrab,
    request_timeout: u64,
}

impl GithubClient {
    pub fn new(token: &str, api_url: &str, request_timeout: u64) -> Result<Self> {
        info!("Initializing GitHub client with API URL: {}", api_url);

        // The weekly schedule is the retry mechanism; failed calls are not repeated.
        let client = Octocrab::builder()
            .personal_token(token.to_string())
            .base_uri(api_url)
            .context("Failed to parse GitHub API URL")?
            .add_retry_config(RetryConfig::None)
            .build()
            .context("Failed to build GitHub client")?;

        Ok(Self {
            client,
            request_timeout,
        })
    }

    /// Public, non-fork repositories of `owner`, sorted by name. A page that
    /// fails ends the listing with the repositories gathered so far.
    pub async fn list_public_repos(&self, owner: &str) -> Vec<RepoSummary> {
        let route = format!("/users/{}/repos", owner);
        let mut repos = Vec::new();
        let mut page = 1u32;

        loop {
            debug!("Fetching repositories page {} for owner: {}", page, owner);

            let params = ListReposParams {
                r#type: "public",
                per_page: PAGE_SIZE,
                page,
            };
            let items: Vec<RepoSummary> = match self.get_json(&route, Some(&params)).await {
                Ok(items) => items,
                Err(e) => {
                    warn!(
                        owner = %owner,
                        page = page,
                        error = %e,
                        "Failed to list repositories, continuing with {} found so far",
                        repos.len()
                    );
                    break;
                }
            };

            let fetched = items.len();
            repos.extend(items.into_iter().filter(|r| !r.fork));

            if fetched < PAGE_SIZE {
                break;
            }
            page += 1;
        }

        repos.sort_by(|a, b| a.name.cmp(&b.name));
        repos
    }

    /// Fetches the four traffic resources of a repository. A resource that
    /// fails is logged and treated as empty.
    pub async fn fetch_traffic(&self, owner: &str, repo: &str) -> RepoTraffic {
        let base = format!("/repos/{}/{}/traffic", owner, repo);

        let views: TrafficSeries = self.fetch_or_default(repo, &format!("{}/views", base)).await;
        let clones: TrafficSeries = self.fetch_or_default(repo, &format!("{}/clones", base)).await;
        let referrers: Vec<Referrer> = self
            .fetch_or_default(repo, &format!("{}/popular/referrers", base))
            .await;
        let paths: Vec<PopularPath> = self
            .fetch_or_default(repo, &format!("{}/popular/paths", base))
            .await;

        RepoTraffic {
            views,
            clones,
            referrers,
            paths,
        }
    }

    async fn fetch_or_default<T: DeserializeOwned + Default>(&self, repo: &str, route: &str) -> T {
        match self.get_json::<T, ()>(route, None).await {
            Ok(value) => value,
            Err(e) if e.is_expected() => {
                debug!(repo = %repo, route = %route, "No traffic recorded");
                T::default()
            }
            Err(e @ FetchError::RateLimited { .. }) => {
                warn!(repo = %repo, route = %route, error = %e, "Rate limited");
                T::default()
            }
            Err(e) => {
                warn!(repo = %repo, route = %route, error = %e, "Failed to fetch resource");
                T::default()
            }
        }
    }

    async fn get_json<T, P>(&self, route: &str, params: Option<&P>) -> Result<T, FetchError>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        match tokio::time::timeout(
            Duration::from_secs(self.request_timeout),
            self.client.get::<T, _, P>(route, params),
        )
        .await
        {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(FetchError::from(e)),
            Err(_) => Err(FetchError::Timeout {
                secs: self.request_timeout,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn repo_json(name: &str, fork: bool) -> serde_json::Value {
        json!({
            "name": name,
            "fork": fork,
            "description": null,
            "stargazers_count": 1,
            "forks_count": 0
        })
    }

    fn not_found() -> ResponseTemplate {
        ResponseTemplate::new(404).set_body_json(json!({
            "message": "Not Found",
            "documentation_url": "https://docs.github.com/rest"
        }))
    }

    #[tokio::test]
    async fn test_list_public_repos_paginates_and_skips_forks() {
        let server = MockServer::start().await;

        let first_page: Vec<_> = (0..100)
            .map(|i| repo_json(&format!("repo-{:03}", i), i % 10 == 0))
            .collect();
        Mock::given(method("GET"))
            .and(path("/users/octo/repos"))
            .and(query_param("page", "1"))
            .and(query_param("per_page", "100"))
            .and(query_param("type", "public"))
            .respond_with(ResponseTemplate::new(200).set_body_json(first_page))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/users/octo/repos"))
            .and(query_param("page", "2"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([repo_json("aaa-last", false)])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = GithubClient::new("test-token", &server.uri(), 5).unwrap();
        let repos = client.list_public_repos("octo").await;

        assert_eq!(repos.len(), 91);
        assert_eq!(repos[0].name, "aaa-last");
        assert!(repos.iter().all(|r| !r.fork));
    }

    #[tokio::test]
    async fn test_list_public_repos_empty_account() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/nobody/repos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let client = GithubClient::new("test-token", &server.uri(), 5).unwrap();
        let repos = client.list_public_repos("nobody").await;

        assert!(repos.is_empty());
    }

    #[tokio::test]
    async fn test_list_public_repos_first_page_failure_yields_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/ghost/repos"))
            .respond_with(not_found())
            .expect(1)
            .mount(&server)
            .await;

        let client = GithubClient::new("test-token", &server.uri(), 5).unwrap();
        let repos = client.list_public_repos("ghost").await;

        assert!(repos.is_empty());
    }

    #[tokio::test]
    async fn test_list_public_repos_keeps_pages_before_failure() {
        let server = MockServer::start().await;

        let first_page: Vec<_> = (0..100)
            .map(|i| repo_json(&format!("repo-{:03}", i), false))
            .collect();
        Mock::given(method("GET"))
            .and(path("/users/octo/repos"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(first_page))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/users/octo/repos"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "message": "Server Error"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = GithubClient::new("test-token", &server.uri(), 5).unwrap();
        let repos = client.list_public_repos("octo").await;

        assert_eq!(repos.len(), 100);
        assert_eq!(repos[0].name, "repo-000");
        assert_eq!(repos[99].name, "repo-099");
    }

    #[tokio::test]
    async fn test_fetch_traffic_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/tool/traffic/views"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "count": 3,
                "uniques": 2,
                "views": [{"timestamp": "2024-01-01T00:00:00Z", "count": 3, "uniques": 2}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = GithubClient::new("test-token", &server.uri(), 5).unwrap();
        let traffic = client.fetch_traffic("octo", "tool").await;

        assert_eq!(traffic.views.count, 3);
        assert!(traffic.has_traffic());
    }

    #[tokio::test]
    async fn test_fetch_traffic_degrades_failures_to_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/quiet/traffic/views"))
            .respond_with(not_found())
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/quiet/traffic/clones"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "message": "API rate limit exceeded for user ID 1.",
                "documentation_url": "https://docs.github.com/rest/overview/rate-limits-for-the-rest-api"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/quiet/traffic/popular/referrers"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "message": "Server Error"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/quiet/traffic/popular/paths"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"path": "/octo/quiet", "title": "quiet", "count": 2, "uniques": 1}
            ])))
            .mount(&server)
            .await;

        let client = GithubClient::new("test-token", &server.uri(), 5).unwrap();
        let traffic = client.fetch_traffic("octo", "quiet").await;

        assert!(!traffic.has_traffic());
        assert!(traffic.referrers.is_empty());
        assert_eq!(traffic.paths.len(), 1);
        assert_eq!(traffic.paths[0].title.as_deref(), Some("quiet"));
    }
}
