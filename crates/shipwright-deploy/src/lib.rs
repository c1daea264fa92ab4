use std::sync::Arc;

use shipwright_core::templates::{self, default_create_brief, default_update_brief};
use shipwright_core::{pages_url, DeployError, DeploymentResult, NotificationPayload, TaskRequest};
use shipwright_github::{RepoHandle, RepoHost};
use shipwright_notify::{EvaluatorNotifier, NotifyOutcome};

/// Outcome of one task, as reported back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployment {
    pub result: DeploymentResult,
    pub commit_sha: String,
    /// `None` when the request carried no evaluation URL.
    pub notified: Option<NotifyOutcome>,
}

/// Drives one task through the create or update flow and reports the result
/// to the evaluator.
pub struct Orchestrator {
    host: Arc<dyn RepoHost>,
    notifier: Arc<EvaluatorNotifier>,
}

impl Orchestrator {
    pub fn new(host: Arc<dyn RepoHost>, notifier: Arc<EvaluatorNotifier>) -> Self {
        Self { host, notifier }
    }

    pub fn run(&self, request: &TaskRequest) -> Result<Deployment, DeployError> {
        tracing::info!(task = %request.task, round = request.round, "deployment started");

        let result = if request.is_initial_round() {
            self.create(request)?
        } else {
            self.update(request)?
        };

        let repo = self.host.get_repo(&request.task)?;
        let commit_sha = self.host.latest_commit_sha(&repo)?;

        let notified = match request.evaluation_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => {
                let payload = NotificationPayload::new(request, &result, &commit_sha);
                Some(self.notifier.notify(&payload, url))
            }
            _ => {
                tracing::warn!(task = %request.task, "no evaluation_url, skipping notification");
                None
            }
        };

        tracing::info!(
            task = %request.task,
            round = request.round,
            commit = %commit_sha,
            "deployment finished"
        );
        Ok(Deployment {
            result,
            commit_sha,
            notified,
        })
    }

    // ── Round 1 ──

    fn create(&self, request: &TaskRequest) -> Result<DeploymentResult, DeployError> {
        let task = &request.task;
        let brief = request
            .brief
            .clone()
            .unwrap_or_else(|| default_create_brief(task));

        let repo = self.host.get_or_create(task, &brief)?;

        // Every file gets its chance; the first failure is reported afterwards.
        let mut first_failure = None;
        for file in templates::initial_files(task, &brief) {
            let message = format!("Publish {}", file.path);
            match self
                .host
                .write_file(&repo, &file.path, &file.content, &message)
            {
                Ok(outcome) => {
                    tracing::info!(repo = %repo.name, path = %file.path, ?outcome, "file written")
                }
                Err(e) => {
                    tracing::warn!(repo = %repo.name, path = %file.path, error = %e, "file write failed");
                    if first_failure.is_none() {
                        first_failure = Some(e);
                    }
                }
            }
        }
        if let Some(e) = first_failure {
            return Err(e.into());
        }

        self.host.enable_pages(&repo, &repo.default_branch);
        Ok(self.result_for(&repo, task))
    }

    // ── Round 2+ ──

    fn update(&self, request: &TaskRequest) -> Result<DeploymentResult, DeployError> {
        let task = &request.task;
        let brief = request
            .brief
            .clone()
            .unwrap_or_else(|| default_update_brief(task));

        let repo = self.host.get_repo(task)?;

        for file in templates::round_files(task, &brief, request.round) {
            let message = format!("Round {} update {}", request.round, file.path);
            match self
                .host
                .write_file(&repo, &file.path, &file.content, &message)
            {
                Ok(outcome) => {
                    tracing::info!(repo = %repo.name, path = %file.path, ?outcome, "file written")
                }
                Err(e) => tracing::warn!(
                    repo = %repo.name,
                    path = %file.path,
                    error = %e,
                    "could not update file, continuing"
                ),
            }
        }

        Ok(self.result_for(&repo, task))
    }

    /// Pages URL is derived from the requested task name, not the host's
    /// spelling of the repository name.
    fn result_for(&self, repo: &RepoHandle, task: &str) -> DeploymentResult {
        DeploymentResult {
            repo_url: repo.html_url.clone(),
            pages_url: pages_url(self.host.username(), task),
        }
    }
}
