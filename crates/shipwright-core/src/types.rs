use serde::Serialize;
use serde_json::Value;

use crate::error::DeployError;

/// Round assumed when the request omits `round`.
pub const DEFAULT_ROUND: u32 = 1;

// ── Task Request ──

/// An inbound deployment task. Lives for the duration of one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskRequest {
    /// Repository name. Trimmed, non-empty, GitHub-safe characters only.
    pub task: String,
    pub round: u32,
    pub brief: Option<String>,
    pub email: Option<String>,
    pub nonce: Option<String>,
    pub evaluation_url: Option<String>,
}

impl TaskRequest {
    /// Minimal request for `task` at round 1 with every optional field unset.
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            round: DEFAULT_ROUND,
            brief: None,
            email: None,
            nonce: None,
            evaluation_url: None,
        }
    }

    /// Parse and validate a raw request body.
    pub fn from_slice(body: &[u8]) -> Result<Self, DeployError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| DeployError::Validation(format!("body is not valid JSON: {e}")))?;
        Self::from_value(&value)
    }

    /// Validate an already-decoded JSON document.
    pub fn from_value(value: &Value) -> Result<Self, DeployError> {
        let obj = value
            .as_object()
            .ok_or_else(|| DeployError::Validation("body must be a JSON object".to_string()))?;

        let task = match obj.get("task") {
            Some(Value::String(s)) => s.trim().to_string(),
            Some(Value::Null) | None => {
                return Err(DeployError::Validation("missing task field".to_string()))
            }
            Some(_) => {
                return Err(DeployError::Validation(
                    "field `task` must be a string".to_string(),
                ))
            }
        };
        validate_repo_name(&task)?;

        Ok(Self {
            task,
            round: parse_round(obj.get("round"))?,
            brief: optional_string(obj, "brief")?,
            email: optional_string(obj, "email")?,
            nonce: optional_string(obj, "nonce")?,
            evaluation_url: optional_string(obj, "evaluation_url")?,
        })
    }

    pub fn is_initial_round(&self) -> bool {
        self.round == DEFAULT_ROUND
    }
}

const MAX_REPO_NAME_LEN: usize = 100;

/// Repository names end up in URL paths, so only the characters GitHub itself
/// accepts are allowed through.
fn validate_repo_name(name: &str) -> Result<(), DeployError> {
    if name.is_empty() {
        return Err(DeployError::Validation(
            "field `task` must not be empty".to_string(),
        ));
    }
    if name.len() > MAX_REPO_NAME_LEN {
        return Err(DeployError::Validation(format!(
            "repository name is longer than {MAX_REPO_NAME_LEN} characters"
        )));
    }
    if name == "." || name == ".." {
        return Err(DeployError::Validation(format!(
            "`{name}` is not a valid repository name"
        )));
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err(DeployError::Validation(format!(
            "repository name `{name}` contains invalid character {c:?}"
        )));
    }
    Ok(())
}

fn parse_round(value: Option<&Value>) -> Result<u32, DeployError> {
    let round = match value {
        None | Some(Value::Null) => return Ok(DEFAULT_ROUND),
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        Some(_) => None,
    };
    match round.and_then(|r| u32::try_from(r).ok()) {
        Some(r) if r >= 1 => Ok(r),
        _ => Err(DeployError::Validation(
            "field `round` must be a positive integer".to_string(),
        )),
    }
}

fn optional_string(
    obj: &serde_json::Map<String, Value>,
    key: &str,
) -> Result<Option<String>, DeployError> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(DeployError::Validation(format!(
            "field `{key}` must be a string"
        ))),
    }
}

// ── Files ──

/// One tracked file of the published site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: String,
    pub content: String,
}

impl FileEntry {
    pub fn new(path: &str, content: String) -> Self {
        Self {
            path: path.to_string(),
            content,
        }
    }
}

// ── Results ──

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentResult {
    pub repo_url: String,
    pub pages_url: String,
}

/// Public Pages address for a repository. Derived from the names alone, so it
/// is reported even when publication could not be enabled.
pub fn pages_url(username: &str, task: &str) -> String {
    format!("https://{username}.github.io/{task}/")
}

/// Body posted to the evaluator. Built once; retries resend it unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationPayload {
    pub email: Option<String>,
    pub task: String,
    pub round: u32,
    pub nonce: Option<String>,
    pub repo_url: String,
    pub commit_sha: String,
    pub pages_url: String,
}

impl NotificationPayload {
    pub fn new(request: &TaskRequest, result: &DeploymentResult, commit_sha: &str) -> Self {
        Self {
            email: request.email.clone(),
            task: request.task.clone(),
            round: request.round,
            nonce: request.nonce.clone(),
            repo_url: result.repo_url.clone(),
            commit_sha: commit_sha.to_string(),
            pages_url: result.pages_url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn parses_full_request() {
        let body = br#"{"task":"demo1","round":1,"brief":"Hello","evaluation_url":"https://eval.example/cb","email":"a@b.com","nonce":"n1"}"#;
        let req = TaskRequest::from_slice(body).unwrap();
        assert_eq!(req.task, "demo1");
        assert_eq!(req.round, 1);
        assert_eq!(req.brief.as_deref(), Some("Hello"));
        assert_eq!(req.email.as_deref(), Some("a@b.com"));
        assert_eq!(req.nonce.as_deref(), Some("n1"));
        assert_eq!(
            req.evaluation_url.as_deref(),
            Some("https://eval.example/cb")
        );
    }

    #[test]
    fn round_defaults_to_one() {
        let req = TaskRequest::from_slice(br#"{"task":"demo"}"#).unwrap();
        assert_eq!(req.round, 1);
        assert!(req.is_initial_round());
        assert!(req.brief.is_none());
    }

    #[test]
    fn round_accepts_numeric_string() {
        let req = TaskRequest::from_slice(br#"{"task":"demo","round":"3"}"#).unwrap();
        assert_eq!(req.round, 3);
        assert!(!req.is_initial_round());
    }

    #[test]
    fn task_is_trimmed() {
        let req = TaskRequest::from_slice(br#"{"task":"  demo-app  "}"#).unwrap();
        assert_eq!(req.task, "demo-app");
    }

    #[test]
    fn overlong_task_is_validation_error() {
        let at_limit = "a".repeat(100);
        let req = TaskRequest::from_value(&serde_json::json!({ "task": at_limit })).unwrap();
        assert_eq!(req.task.len(), 100);

        let err = TaskRequest::from_value(&serde_json::json!({ "task": "a".repeat(101) }))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("longer than 100"));
    }

    #[test]
    fn missing_task_is_validation_error() {
        let err = TaskRequest::from_slice(br#"{"round":1}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("missing task"));
    }

    #[test]
    fn rejects_bad_bodies() {
        let cases: &[&[u8]] = &[
            b"not json",
            br#"["task"]"#,
            br#"{"task":""}"#,
            br#"{"task":"   "}"#,
            br#"{"task":42}"#,
            br#"{"task":"a/b"}"#,
            br#"{"task":".."}"#,
            br#"{"task":"demo","round":0}"#,
            br#"{"task":"demo","round":-1}"#,
            br#"{"task":"demo","round":1.5}"#,
            br#"{"task":"demo","round":"two"}"#,
            br#"{"task":"demo","email":7}"#,
        ];
        for body in cases {
            let err = TaskRequest::from_slice(body).unwrap_err();
            assert_eq!(
                err.kind(),
                ErrorKind::Validation,
                "{}",
                String::from_utf8_lossy(body)
            );
        }
    }

    #[test]
    fn pages_url_shape() {
        assert_eq!(pages_url("octo", "demo1"), "https://octo.github.io/demo1/");
    }

    #[test]
    fn payload_carries_request_and_result() {
        let mut req = TaskRequest::new("demo");
        req.round = 2;
        req.email = Some("a@b.com".into());
        req.nonce = Some("n1".into());
        let result = DeploymentResult {
            repo_url: "https://github.com/octo/demo".into(),
            pages_url: pages_url("octo", "demo"),
        };
        let payload = NotificationPayload::new(&req, &result, "abc123");
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["email"], "a@b.com");
        assert_eq!(json["task"], "demo");
        assert_eq!(json["round"], 2);
        assert_eq!(json["nonce"], "n1");
        assert_eq!(json["commit_sha"], "abc123");
        assert_eq!(json["pages_url"], "https://octo.github.io/demo/");
    }
}
