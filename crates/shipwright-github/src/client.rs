use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use serde::Deserialize;
use serde_json::json;

use shipwright_core::config::Config;

use crate::{RemoteError, RepoHandle, RepoHost};

const TIMEOUT: Duration = Duration::from_secs(30);
const API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = concat!("shipwright/", env!("CARGO_PKG_VERSION"));

// ── Wire types ──

#[derive(Deserialize)]
struct RepoJson {
    name: String,
    html_url: String,
    #[serde(default)]
    default_branch: Option<String>,
}

impl From<RepoJson> for RepoHandle {
    fn from(r: RepoJson) -> Self {
        Self {
            name: r.name,
            html_url: r.html_url,
            default_branch: r.default_branch.unwrap_or_else(|| "main".to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ContentJson {
    sha: String,
}

#[derive(Deserialize)]
struct CommitJson {
    sha: String,
}

struct Reply {
    status: u16,
    body: String,
}

impl Reply {
    fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    fn json<T: serde::de::DeserializeOwned>(&self, what: &str) -> Result<T, RemoteError> {
        serde_json::from_str(&self.body).map_err(|e| RemoteError::Decode {
            what: what.to_string(),
            message: e.to_string(),
        })
    }

    fn into_error(self, what: &str) -> RemoteError {
        RemoteError::from_status(self.status, what, &self.body)
    }
}

enum Verb {
    Post,
    Put,
}

// ── Client ──

/// GitHub REST client authenticated with a bearer token.
pub struct GithubClient {
    agent: ureq::Agent,
    api_url: String,
    token: String,
    username: String,
}

impl GithubClient {
    pub fn new(api_url: &str, token: &str, username: &str) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(TIMEOUT))
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self::with_agent(agent, api_url, token, username)
    }

    fn with_agent(agent: ureq::Agent, api_url: &str, token: &str, username: &str) -> Self {
        Self {
            agent,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            username: username.to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.github_api_url,
            &config.github_token,
            &config.github_username,
        )
    }

    fn repo_path(&self, name: &str) -> String {
        format!("/repos/{}/{}", self.username, name)
    }

    fn get(&self, path: &str) -> Result<Reply, RemoteError> {
        let url = format!("{}{}", self.api_url, path);
        tracing::debug!(%url, "GET");
        let resp = self
            .agent
            .get(&url)
            .header("Authorization", &format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
            .header("User-Agent", USER_AGENT)
            .call();
        read_reply(resp)
    }

    fn send(
        &self,
        method: Verb,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<Reply, RemoteError> {
        let url = format!("{}{}", self.api_url, path);
        let builder = match method {
            Verb::Post => {
                tracing::debug!(%url, "POST");
                self.agent.post(&url)
            }
            Verb::Put => {
                tracing::debug!(%url, "PUT");
                self.agent.put(&url)
            }
        };
        let resp = builder
            .header("Authorization", &format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
            .header("User-Agent", USER_AGENT)
            .header("Content-Type", "application/json")
            .send(body.to_string());
        read_reply(resp)
    }
}

fn read_reply(
    resp: Result<ureq::http::Response<ureq::Body>, ureq::Error>,
) -> Result<Reply, RemoteError> {
    let mut resp = resp.map_err(|e| RemoteError::Unavailable(e.to_string()))?;
    let status = resp.status().as_u16();
    let body = resp
        .body_mut()
        .read_to_string()
        .map_err(|e| RemoteError::Unavailable(e.to_string()))?;
    Ok(Reply { status, body })
}

impl RepoHost for GithubClient {
    fn username(&self) -> &str {
        &self.username
    }

    fn get_repo(&self, name: &str) -> Result<RepoHandle, RemoteError> {
        let what = format!("repository {}/{}", self.username, name);
        let reply = self.get(&self.repo_path(name))?;
        if !reply.is_success() {
            return Err(reply.into_error(&what));
        }
        Ok(reply.json::<RepoJson>(&what)?.into())
    }

    fn create_repo(&self, name: &str, description: &str) -> Result<RepoHandle, RemoteError> {
        let what = format!("new repository {name}");
        let body = json!({
            "name": name,
            "description": description,
            "private": false,
            "auto_init": false,
        });
        let reply = self.send(Verb::Post, "/user/repos", &body)?;
        if !reply.is_success() {
            return Err(reply.into_error(&what));
        }
        Ok(reply.json::<RepoJson>(&what)?.into())
    }

    fn file_version(&self, repo: &RepoHandle, path: &str) -> Result<Option<String>, RemoteError> {
        let what = format!("{}:{}", repo.name, path);
        let reply = self.get(&format!(
            "{}/contents/{}?ref={}",
            self.repo_path(&repo.name),
            path,
            repo.default_branch
        ))?;
        match reply.status {
            404 => Ok(None),
            s if (200..300).contains(&s) => Ok(Some(reply.json::<ContentJson>(&what)?.sha)),
            _ => Err(reply.into_error(&what)),
        }
    }

    fn put_file(
        &self,
        repo: &RepoHandle,
        path: &str,
        content: &str,
        message: &str,
        version: Option<&str>,
    ) -> Result<(), RemoteError> {
        let what = format!("{}:{}", repo.name, path);
        let mut body = json!({
            "message": message,
            "content": BASE64_STANDARD.encode(content.as_bytes()),
            "branch": repo.default_branch,
        });
        if let Some(sha) = version {
            body["sha"] = json!(sha);
        }
        let reply = self.send(
            Verb::Put,
            &format!("{}/contents/{}", self.repo_path(&repo.name), path),
            &body,
        )?;
        if !reply.is_success() {
            return Err(reply.into_error(&what));
        }
        Ok(())
    }

    fn request_pages(&self, repo: &RepoHandle, branch: &str) -> Result<(), RemoteError> {
        let what = format!("pages for {}", repo.name);
        let body = json!({ "source": { "branch": branch, "path": "/" } });
        let reply = self.send(
            Verb::Post,
            &format!("{}/pages", self.repo_path(&repo.name)),
            &body,
        )?;
        if !reply.is_success() {
            return Err(reply.into_error(&what));
        }
        Ok(())
    }

    fn latest_commit_sha(&self, repo: &RepoHandle) -> Result<String, RemoteError> {
        let what = format!("commits of {}", repo.name);
        let reply = self.get(&format!(
            "{}/commits?sha={}&per_page=1",
            self.repo_path(&repo.name),
            repo.default_branch
        ))?;
        // GitHub answers 409 "Git Repository is empty." before the first commit.
        if reply.status == 409 {
            return Err(RemoteError::EmptyRepository(repo.name.clone()));
        }
        if !reply.is_success() {
            return Err(reply.into_error(&what));
        }
        reply
            .json::<Vec<CommitJson>>(&what)?
            .into_iter()
            .next()
            .map(|c| c.sha)
            .ok_or_else(|| RemoteError::EmptyRepository(repo.name.clone()))
    }
}
