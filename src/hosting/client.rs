// file: src/hosting/client.rs
// description: minimal hosting api client for token and repository status checks
// reference: https://docs.rs/reqwest

use crate::error::{AggregatorError, Result};
use crate::repository::naming::owner_and_name;
use futures::stream::{self, StreamExt};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

const USER_AGENT: &str = concat!("template_aggregator/", env!("CARGO_PKG_VERSION"));
const STATUS_CONCURRENCY: usize = 8;

#[derive(Debug, Clone)]
pub struct HostingClient {
    client: reqwest::Client,
    api_url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    login: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RepoStatus {
    pub full_name: String,
    #[serde(default)]
    pub archived: bool,
}

impl HostingClient {
    pub fn new(api_url: impl Into<String>, token: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}{}", self.api_url, path))
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
    }

    /// Returns the login the token belongs to. A rejected token is a
    /// [`AggregatorError::Credential`]; anything else is a hosting error.
    pub async fn verify_token(&self) -> Result<String> {
        let response = self.get("/user").send().await?;

        match response.status() {
            status if status.is_success() => {
                let user: UserResponse = response.json().await?;
                Ok(user.login)
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(AggregatorError::Credential(
                format!("token rejected by hosting API ({})", response.status()),
            )),
            status => Err(AggregatorError::Hosting(format!(
                "unexpected status {} from /user",
                status
            ))),
        }
    }

    /// `Ok(None)` when the URL has no owner/name layout.
    pub async fn repository_status(&self, repo_url: &str) -> Result<Option<RepoStatus>> {
        let Some((owner, name)) = owner_and_name(repo_url) else {
            return Ok(None);
        };

        let response = self.get(&format!("/repos/{}/{}", owner, name)).send().await?;
        if !response.status().is_success() {
            return Err(AggregatorError::Hosting(format!(
                "status {} for {}/{}",
                response.status(),
                owner,
                name
            )));
        }

        Ok(Some(response.json().await?))
    }

    /// Logs a warning for every archived repository. Lookup failures are
    /// logged and otherwise ignored. Returns the archived URLs.
    pub async fn report_archived(&self, repositories: &[String]) -> Vec<String> {
        let statuses = stream::iter(repositories.iter().map(|url| async move {
            (url, self.repository_status(url).await)
        }))
        .buffered(STATUS_CONCURRENCY)
        .collect::<Vec<_>>()
        .await;

        let mut archived = Vec::new();
        for (url, status) in statuses {
            match status {
                Ok(Some(status)) if status.archived => {
                    warn!("Repository {} is archived, syncing anyway", status.full_name);
                    archived.push(url.clone());
                }
                Ok(_) => {}
                Err(e) => debug!("Could not check status of {}: {}", url, e),
            }
        }

        info!(
            "{} of {} repositories are archived",
            archived.len(),
            repositories.len()
        );
        archived
    }
}
