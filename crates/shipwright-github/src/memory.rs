use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use crate::{RemoteError, RepoHandle, RepoHost};

/// In-memory platform for tests, with switchable failures.
///
/// Every file write produces one commit, and version tags are derived from a
/// global write counter so a tag from an earlier write is always stale.
pub struct MemoryHost {
    username: String,
    state: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    repos: BTreeMap<String, MemoryRepo>,
    calls: Vec<String>,
    writes: u64,
    failing_paths: BTreeSet<String>,
    pages_fail: bool,
    unavailable: bool,
}

struct MemoryRepo {
    handle: RepoHandle,
    files: BTreeMap<String, (String, String)>,
    commits: Vec<String>,
    pages_branch: Option<String>,
}

impl MemoryHost {
    pub fn new(username: &str) -> Self {
        Self {
            username: username.to_string(),
            state: Mutex::new(MemoryState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn handle_for(&self, name: &str) -> RepoHandle {
        RepoHandle {
            name: name.to_string(),
            html_url: format!("https://github.com/{}/{}", self.username, name),
            default_branch: "main".to_string(),
        }
    }

    // ── Setup ──

    /// Create an empty repository without recording a call.
    pub fn seed_repo(&self, name: &str) -> RepoHandle {
        let handle = self.handle_for(name);
        self.lock().repos.insert(
            name.to_string(),
            MemoryRepo {
                handle: handle.clone(),
                files: BTreeMap::new(),
                commits: Vec::new(),
                pages_branch: None,
            },
        );
        handle
    }

    /// Make every write to `path` fail with a conflict.
    pub fn fail_writes_to(&self, path: &str) {
        self.lock().failing_paths.insert(path.to_string());
    }

    pub fn fail_pages(&self, fail: bool) {
        self.lock().pages_fail = fail;
    }

    /// Make every call fail as if the platform were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    // ── Inspection ──

    /// Calls made so far, as `op:repo[:path]` strings.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn repo_exists(&self, name: &str) -> bool {
        self.lock().repos.contains_key(name)
    }

    pub fn file(&self, repo: &str, path: &str) -> Option<String> {
        self.lock()
            .repos
            .get(repo)
            .and_then(|r| r.files.get(path))
            .map(|(content, _)| content.clone())
    }

    pub fn paths(&self, repo: &str) -> Vec<String> {
        self.lock()
            .repos
            .get(repo)
            .map(|r| r.files.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn commit_count(&self, repo: &str) -> usize {
        self.lock().repos.get(repo).map_or(0, |r| r.commits.len())
    }

    pub fn pages_branch(&self, repo: &str) -> Option<String> {
        self.lock()
            .repos
            .get(repo)
            .and_then(|r| r.pages_branch.clone())
    }

    fn enter(&self, call: String) -> Result<MutexGuard<'_, MemoryState>, RemoteError> {
        let mut state = self.lock();
        state.calls.push(call);
        if state.unavailable {
            return Err(RemoteError::Unavailable("memory host offline".to_string()));
        }
        Ok(state)
    }
}

impl RepoHost for MemoryHost {
    fn username(&self) -> &str {
        &self.username
    }

    fn get_repo(&self, name: &str) -> Result<RepoHandle, RemoteError> {
        let state = self.enter(format!("get_repo:{name}"))?;
        state
            .repos
            .get(name)
            .map(|r| r.handle.clone())
            .ok_or_else(|| RemoteError::NotFound(format!("repository {}/{}", self.username, name)))
    }

    fn create_repo(&self, name: &str, _description: &str) -> Result<RepoHandle, RemoteError> {
        let mut state = self.enter(format!("create_repo:{name}"))?;
        if state.repos.contains_key(name) {
            return Err(RemoteError::Conflict {
                what: format!("new repository {name}"),
                message: "name already exists on this account".to_string(),
            });
        }
        let handle = self.handle_for(name);
        state.repos.insert(
            name.to_string(),
            MemoryRepo {
                handle: handle.clone(),
                files: BTreeMap::new(),
                commits: Vec::new(),
                pages_branch: None,
            },
        );
        Ok(handle)
    }

    fn file_version(&self, repo: &RepoHandle, path: &str) -> Result<Option<String>, RemoteError> {
        let state = self.enter(format!("file_version:{}:{}", repo.name, path))?;
        let r = state
            .repos
            .get(&repo.name)
            .ok_or_else(|| RemoteError::NotFound(format!("repository {}", repo.name)))?;
        Ok(r.files.get(path).map(|(_, sha)| sha.clone()))
    }

    fn put_file(
        &self,
        repo: &RepoHandle,
        path: &str,
        content: &str,
        _message: &str,
        version: Option<&str>,
    ) -> Result<(), RemoteError> {
        let mut state = self.enter(format!("put_file:{}:{}", repo.name, path))?;
        let what = format!("{}:{}", repo.name, path);
        if state.failing_paths.contains(path) {
            return Err(RemoteError::Conflict {
                what,
                message: "injected write failure".to_string(),
            });
        }
        state.writes += 1;
        let sha = format!("{:040x}", state.writes);
        let r = state
            .repos
            .get_mut(&repo.name)
            .ok_or_else(|| RemoteError::NotFound(format!("repository {}", repo.name)))?;
        let current = r.files.get(path).map(|(_, sha)| sha.as_str());
        if current != version {
            let message = match (current, version) {
                (Some(_), None) => "file exists and no sha was supplied",
                _ => "sha does not match",
            };
            return Err(RemoteError::Conflict {
                what,
                message: message.to_string(),
            });
        }
        r.files
            .insert(path.to_string(), (content.to_string(), sha.clone()));
        r.commits.push(sha);
        Ok(())
    }

    fn request_pages(&self, repo: &RepoHandle, branch: &str) -> Result<(), RemoteError> {
        let mut state = self.enter(format!("request_pages:{}", repo.name))?;
        if state.pages_fail {
            return Err(RemoteError::Conflict {
                what: format!("pages for {}", repo.name),
                message: "GitHub Pages is already enabled".to_string(),
            });
        }
        let r = state
            .repos
            .get_mut(&repo.name)
            .ok_or_else(|| RemoteError::NotFound(format!("repository {}", repo.name)))?;
        r.pages_branch = Some(branch.to_string());
        Ok(())
    }

    fn latest_commit_sha(&self, repo: &RepoHandle) -> Result<String, RemoteError> {
        let state = self.enter(format!("latest_commit_sha:{}", repo.name))?;
        let r = state
            .repos
            .get(&repo.name)
            .ok_or_else(|| RemoteError::NotFound(format!("repository {}", repo.name)))?;
        r.commits
            .last()
            .cloned()
            .ok_or_else(|| RemoteError::EmptyRepository(repo.name.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_version_conflicts() {
        let host = MemoryHost::new("octo");
        let repo = host.seed_repo("demo");
        host.put_file(&repo, "a.txt", "one", "add", None).unwrap();
        let v1 = host.file_version(&repo, "a.txt").unwrap().unwrap();
        host.put_file(&repo, "a.txt", "two", "update", Some(&v1))
            .unwrap();

        let err = host
            .put_file(&repo, "a.txt", "three", "update", Some(&v1))
            .unwrap_err();
        assert!(matches!(err, RemoteError::Conflict { .. }));
        assert_eq!(host.file("demo", "a.txt").as_deref(), Some("two"));
    }

    #[test]
    fn create_over_existing_file_conflicts() {
        let host = MemoryHost::new("octo");
        let repo = host.seed_repo("demo");
        host.put_file(&repo, "a.txt", "one", "add", None).unwrap();
        let err = host
            .put_file(&repo, "a.txt", "again", "add", None)
            .unwrap_err();
        assert!(matches!(err, RemoteError::Conflict { .. }));
    }

    #[test]
    fn empty_repository_has_no_commit() {
        let host = MemoryHost::new("octo");
        let repo = host.seed_repo("demo");
        let err = host.latest_commit_sha(&repo).unwrap_err();
        assert!(matches!(err, RemoteError::EmptyRepository(_)));

        host.put_file(&repo, "a.txt", "one", "add", None).unwrap();
        let sha = host.latest_commit_sha(&repo).unwrap();
        assert_eq!(sha.len(), 40);
    }

    #[test]
    fn calls_are_recorded() {
        let host = MemoryHost::new("octo");
        let _ = host.get_repo("missing");
        let repo = host.create_repo("demo", "").unwrap();
        host.enable_pages(&repo, "main");
        assert_eq!(
            host.calls(),
            vec![
                "get_repo:missing".to_string(),
                "create_repo:demo".to_string(),
                "request_pages:demo".to_string(),
            ]
        );
        assert_eq!(host.pages_branch("demo").as_deref(), Some("main"));
    }
}
