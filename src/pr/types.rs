use serde::Deserialize;

use crate::config::Protocol;

/// A GitHub repository URL split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoUrl {
    pub project: Project,
    /// Path after `<owner>/<repo>`, e.g. `pull/73`
    pub project_path: String,
}

/// A repository on a particular GitHub host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub host: String,
    pub owner: String,
    pub name: String,
    /// Protocol the URL was written with
    pub protocol: Protocol,
}

impl Project {
    /// `owner/name`
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    /// Clone URL for `owner/name` on this project's host.
    ///
    /// `preferred` wins over the protocol the project was parsed from.
    /// Private repositories fall back to SSH unless HTTPS is in effect.
    pub fn git_url(&self, name: &str, owner: &str, private: bool, preferred: Option<Protocol>) -> String {
        match preferred.unwrap_or(self.protocol) {
            Protocol::Https => format!("https://{}/{}/{}.git", self.host, owner, name),
            Protocol::Ssh => format!("git@{}:{}/{}.git", self.host, owner, name),
            Protocol::Git if private => format!("git@{}:{}/{}.git", self.host, owner, name),
            Protocol::Git => format!("git://{}/{}/{}.git", self.host, owner, name),
        }
    }
}

/// The head side of a pull request.
/// Deserialized straight from the `pulls/{number}` REST response.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestRef {
    pub head: PullRequestHead,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestHead {
    /// Head branch name
    #[serde(rename = "ref")]
    pub branch: String,
    /// None when the fork has been deleted
    pub repo: Option<HeadRepo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HeadRepo {
    pub name: String,
    pub owner: Owner,
    #[serde(default)]
    pub private: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Owner {
    pub login: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(protocol: Protocol) -> Project {
        Project {
            host: "github.com".to_string(),
            owner: "jingweno".to_string(),
            name: "gh".to_string(),
            protocol,
        }
    }

    #[test]
    fn test_git_url_follows_protocol() {
        let p = project(Protocol::Https);
        assert_eq!(p.git_url("gh", "mislav", false, None), "https://github.com/mislav/gh.git");
        assert_eq!(p.git_url("gh", "mislav", true, None), "https://github.com/mislav/gh.git");
        assert_eq!(
            p.git_url("gh", "mislav", false, Some(Protocol::Ssh)),
            "git@github.com:mislav/gh.git"
        );
    }

    #[test]
    fn test_git_url_private_uses_ssh_over_git_protocol() {
        let p = project(Protocol::Git);
        assert_eq!(p.git_url("gh", "mislav", false, None), "git://github.com/mislav/gh.git");
        assert_eq!(p.git_url("gh", "mislav", true, None), "git@github.com:mislav/gh.git");
    }

    #[test]
    fn test_deserialize_pull_request() {
        let json = r#"{
            "number": 73,
            "head": {
                "ref": "feature",
                "repo": {"name": "gh", "private": false, "owner": {"login": "mislav"}}
            }
        }"#;
        let pr: PullRequestRef = serde_json::from_str(json).unwrap();
        assert_eq!(pr.head.branch, "feature");
        let repo = pr.head.repo.unwrap();
        assert_eq!(repo.owner.login, "mislav");
        assert!(!repo.private);
    }

    #[test]
    fn test_deserialize_deleted_fork() {
        let json = r#"{"head": {"ref": "feature", "repo": null}}"#;
        let pr: PullRequestRef = serde_json::from_str(json).unwrap();
        assert!(pr.head.repo.is_none());
    }
}
