pub mod client;
pub mod error;
pub mod memory;

pub use client::GithubClient;
pub use error::RemoteError;
pub use memory::MemoryHost;

use serde::{Deserialize, Serialize};

/// Transient reference to a repository owned by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoHandle {
    pub name: String,
    pub html_url: String,
    pub default_branch: String,
}

/// What an upsert ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Created,
    Updated,
}

/// Operations against the repository platform, scoped to one account.
///
/// Implementations hold only their credential and connection pool, so a single
/// instance is shared across concurrent requests.
pub trait RepoHost: Send + Sync {
    /// Account every repository lookup is scoped to.
    fn username(&self) -> &str;

    fn get_repo(&self, name: &str) -> Result<RepoHandle, RemoteError>;

    /// Create a public, empty repository.
    fn create_repo(&self, name: &str, description: &str) -> Result<RepoHandle, RemoteError>;

    /// Version tag of `path`, or `None` when the file does not exist.
    fn file_version(&self, repo: &RepoHandle, path: &str) -> Result<Option<String>, RemoteError>;

    /// Create `path` (no `version`) or update it against `version`.
    /// A stale version is reported as [`RemoteError::Conflict`].
    fn put_file(
        &self,
        repo: &RepoHandle,
        path: &str,
        content: &str,
        message: &str,
        version: Option<&str>,
    ) -> Result<(), RemoteError>;

    /// Ask the platform to publish `branch` as a static site.
    fn request_pages(&self, repo: &RepoHandle, branch: &str) -> Result<(), RemoteError>;

    fn latest_commit_sha(&self, repo: &RepoHandle) -> Result<String, RemoteError>;

    /// Look `name` up and create it when absent. Only "not found" falls
    /// through to creation.
    fn get_or_create(&self, name: &str, description: &str) -> Result<RepoHandle, RemoteError> {
        match self.get_repo(name) {
            Ok(repo) => {
                tracing::info!(repo = name, "reusing existing repository");
                Ok(repo)
            }
            Err(RemoteError::NotFound(_)) => {
                tracing::info!(repo = name, "creating repository");
                self.create_repo(name, description)
            }
            Err(e) => Err(e),
        }
    }

    /// Upsert. The version tag is read right before writing so the update
    /// never goes out against a tag fetched earlier in the request.
    fn write_file(
        &self,
        repo: &RepoHandle,
        path: &str,
        content: &str,
        message: &str,
    ) -> Result<WriteOutcome, RemoteError> {
        match self.file_version(repo, path)? {
            Some(version) => {
                self.put_file(repo, path, content, message, Some(&version))?;
                Ok(WriteOutcome::Updated)
            }
            None => {
                self.put_file(repo, path, content, message, None)?;
                Ok(WriteOutcome::Created)
            }
        }
    }

    /// Advisory form of [`RepoHost::request_pages`]: failures, including
    /// "already enabled", are logged and dropped.
    fn enable_pages(&self, repo: &RepoHandle, branch: &str) {
        match self.request_pages(repo, branch) {
            Ok(()) => tracing::info!(repo = %repo.name, branch, "pages enabled"),
            Err(e) => tracing::warn!(repo = %repo.name, branch, error = %e, "pages not enabled"),
        }
    }
}
