pub mod template;
pub mod types;

pub use types::{Project, PullRequestRef, RepoUrl};

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::{Config, Protocol, DEFAULT_HOST};

const USER_AGENT: &str = "pr-checkout";

#[derive(Debug, Error)]
pub enum PrError {
    #[error("GitHub API request failed: {0}")]
    ApiRequest(#[from] reqwest::Error),

    #[error("Invalid GitHub URL: {0}")]
    InvalidUrl(String),

    #[error("Pull request #{number} not found in {repo}")]
    NotFound { repo: String, number: u64 },

    #[error("GitHub API returned {status} for {repo}#{number}")]
    Api {
        status: u16,
        repo: String,
        number: u64,
    },
}

/// Parse a URL pointing somewhere inside a GitHub repository.
///
/// Accepts http(s), git and ssh URLs on any of `known_hosts`. The path must
/// start with `<owner>/<repo>`; whatever follows becomes `project_path`.
pub fn parse_url(url: &str, known_hosts: &[String]) -> Result<RepoUrl, PrError> {
    let invalid = || PrError::InvalidUrl(url.to_string());
    let parsed = reqwest::Url::parse(url).map_err(|_| invalid())?;

    let protocol = match parsed.scheme() {
        "http" | "https" => Protocol::Https,
        "ssh" => Protocol::Ssh,
        "git" => Protocol::Git,
        _ => return Err(invalid()),
    };

    let host = parsed.host_str().ok_or_else(invalid)?.to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host).to_string();
    if !known_hosts.iter().any(|known| *known == host) {
        return Err(invalid());
    }

    let segments: Vec<&str> = parsed
        .path_segments()
        .ok_or_else(invalid)?
        .filter(|segment| !segment.is_empty())
        .collect();

    let (owner, name, rest) = match segments.as_slice() {
        [owner, name, rest @ ..] => (*owner, *name, rest),
        _ => return Err(invalid()),
    };
    let name = name.strip_suffix(".git").unwrap_or(name);

    Ok(RepoUrl {
        project: Project {
            host,
            owner: owner.to_string(),
            name: name.to_string(),
            protocol,
        },
        project_path: rest.join("/"),
    })
}

/// Pull request number if `project_path` is exactly `pull/<digits>`.
pub fn pull_request_number(project_path: &str) -> Option<u64> {
    let digits = project_path.strip_prefix("pull/")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Source of pull request metadata.
#[async_trait]
pub trait PullRequestSource: Send + Sync {
    async fn pull_request(&self, project: &Project, number: u64) -> Result<PullRequestRef, PrError>;
}

/// `PullRequestSource` backed by the GitHub REST API.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    token: Option<String>,
    api_url: Option<String>,
}

impl GitHubClient {
    pub fn new(config: &Config) -> Self {
        GitHubClient {
            http: reqwest::Client::new(),
            token: config.github.token.clone(),
            api_url: config.github.api_url.clone(),
        }
    }

    /// REST API root for `host`. Enterprise installs serve it under /api/v3.
    fn api_base(&self, host: &str) -> String {
        if let Some(url) = &self.api_url {
            return url.trim_end_matches('/').to_string();
        }
        if host == DEFAULT_HOST {
            "https://api.github.com".to_string()
        } else {
            format!("https://{}/api/v3", host)
        }
    }
}

#[async_trait]
impl PullRequestSource for GitHubClient {
    #[instrument(skip(self, project), fields(repo = %project.full_name(), host = %project.host))]
    async fn pull_request(&self, project: &Project, number: u64) -> Result<PullRequestRef, PrError> {
        let url = format!(
            "{}/repos/{}/{}/pulls/{}",
            self.api_base(&project.host),
            project.owner,
            project.name,
            number
        );

        debug!(%url, "fetching pull request");
        let mut request = self
            .http
            .get(&url)
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(PrError::NotFound {
                repo: project.full_name(),
                number,
            });
        }
        if !status.is_success() {
            return Err(PrError::Api {
                status: status.as_u16(),
                repo: project.full_name(),
                number,
            });
        }

        let pull_request = response.json::<PullRequestRef>().await?;
        debug!(head = %pull_request.head.branch, fork_available = pull_request.head.repo.is_some(), "received pull request");
        Ok(pull_request)
    }
}
