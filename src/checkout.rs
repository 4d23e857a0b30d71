use thiserror::Error;
use tracing::{debug, info};

use crate::args::Invocation;
use crate::config::{Config, Protocol};
use crate::git::{Git, GitError};
use crate::pr::{self, PrError, PullRequestSource};

/// Flags that create a branch of their own and so clash with the rewrite.
const CONFLICTING_FLAGS: [&str; 2] = ["-b", "--orphan"];

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Unsupported flag {0} when checking out pull request")]
    UnsupportedFlag(&'static str),

    #[error(transparent)]
    Retrieval(#[from] PrError),

    #[error("that fork is not available anymore")]
    ForkUnavailable,

    #[error(transparent)]
    Git(#[from] GitError),
}

/// Result of running an invocation through the rewriter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Not a pull request URL; run the invocation as typed.
    NotApplicable,
    /// Run this instead, queued commands first.
    Rewritten(Invocation),
}

/// Turns `checkout <PULLREQ-URL> [<BRANCH>]` into remote setup plus a
/// tracking checkout of the pull request's head branch.
pub struct CheckoutRewriter<'a> {
    git: &'a Git,
    source: &'a dyn PullRequestSource,
    known_hosts: Vec<String>,
    protocol: Option<Protocol>,
}

impl<'a> CheckoutRewriter<'a> {
    pub fn new(git: &'a Git, source: &'a dyn PullRequestSource, config: &Config) -> Self {
        CheckoutRewriter {
            git,
            source,
            known_hosts: config.known_hosts(),
            protocol: config.github.protocol,
        }
    }

    /// Rewrite `invocation` if its first positional parameter is a pull
    /// request URL. On error the caller's invocation is left untouched and
    /// nothing has been queued.
    pub async fn rewrite(&self, invocation: &Invocation) -> Result<Outcome, CheckoutError> {
        if invocation.is_empty() {
            return Ok(Outcome::NotApplicable);
        }

        let words = invocation.positional();
        let Some(checkout_url) = words.first().map(|w| w.to_string()) else {
            return Ok(Outcome::NotApplicable);
        };
        let requested_branch = words.get(1).map(|w| w.to_string());

        let url = match pr::parse_url(&checkout_url, &self.known_hosts) {
            Ok(url) => url,
            Err(err) => {
                debug!(%err, "not a GitHub URL, passing through");
                return Ok(Outcome::NotApplicable);
            }
        };

        let Some(number) = pr::pull_request_number(&url.project_path) else {
            debug!(path = %url.project_path, "not a pull request URL, passing through");
            return Ok(Outcome::NotApplicable);
        };

        sanitize_flags(invocation)?;

        let pull_request = self.source.pull_request(&url.project, number).await?;

        let mut rewritten = invocation.clone();
        if let Some(name) = &requested_branch {
            if let Some(idx) = rewritten.index_of(name) {
                rewritten.remove_at(idx);
            }
        }

        let branch = &pull_request.head.branch;
        let head_repo = pull_request
            .head
            .repo
            .as_ref()
            .ok_or(CheckoutError::ForkUnavailable)?;
        let user = &head_repo.owner.login;

        let new_branch = requested_branch.unwrap_or_else(|| format!("{}-{}", user, branch));

        if self.git.has_remote(user)? {
            debug!(remote = %user, "remote exists, adding branch to it");
            rewritten.queue_before(["remote", "set-branches", "--add", user.as_str(), branch.as_str()]);
            let refspec = format!("+refs/heads/{}:refs/remotes/{}/{}", branch, user, branch);
            rewritten.queue_before(["fetch", user.as_str(), refspec.as_str()]);
        } else {
            let remote_url = url
                .project
                .git_url(&head_repo.name, user, head_repo.private, self.protocol);
            debug!(remote = %user, url = %remote_url, "adding remote");
            rewritten.queue_before([
                "remote",
                "add",
                "-f",
                "--no-tags",
                "-t",
                branch.as_str(),
                user.as_str(),
                remote_url.as_str(),
            ]);
        }

        let remote_branch = format!("{}/{}", user, branch);
        if let Some(idx) = rewritten.index_of(&checkout_url) {
            rewritten.remove_at(idx);
            rewritten.insert_at(idx, ["--track", "-B", new_branch.as_str(), remote_branch.as_str()]);
        }

        info!(pr = number, branch = %new_branch, tracking = %remote_branch, "rewrote pull request checkout");
        Ok(Outcome::Rewritten(rewritten))
    }
}

fn sanitize_flags(invocation: &Invocation) -> Result<(), CheckoutError> {
    for flag in CONFLICTING_FLAGS {
        if invocation.index_of(flag).is_some() {
            return Err(CheckoutError::UnsupportedFlag(flag));
        }
    }
    Ok(())
}
