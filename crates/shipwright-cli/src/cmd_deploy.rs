use std::io::Read;
use std::path::Path;

use shipwright_core::config::Config;
use shipwright_core::TaskRequest;
use shipwright_deploy::Deployment;
use shipwright_notify::NotifyOutcome;

pub fn execute(config: &Config, task_file: &str) -> anyhow::Result<()> {
    let request = read_task(task_file)?;
    let orchestrator = crate::build_orchestrator(config);
    let deployment = orchestrator.run(&request)?;
    println!("{}", serde_json::to_string_pretty(&render(&request, &deployment))?);
    Ok(())
}

/// Load a task from `path`, or from stdin when `path` is `-`.
fn read_task(path: &str) -> anyhow::Result<TaskRequest> {
    let raw = if path == "-" {
        let mut buf = Vec::new();
        std::io::stdin().read_to_end(&mut buf)?;
        buf
    } else {
        std::fs::read(Path::new(path))
            .map_err(|e| anyhow::anyhow!("cannot read task file {path}: {e}"))?
    };
    Ok(TaskRequest::from_slice(&raw)?)
}

fn render(request: &TaskRequest, deployment: &Deployment) -> serde_json::Value {
    let notified = match deployment.notified {
        Some(NotifyOutcome::Delivered { attempts }) => {
            serde_json::json!({ "delivered": true, "attempts": attempts })
        }
        Some(NotifyOutcome::Exhausted { attempts }) => {
            serde_json::json!({ "delivered": false, "attempts": attempts })
        }
        None => serde_json::Value::Null,
    };
    serde_json::json!({
        "task": request.task,
        "round": request.round,
        "repo_url": deployment.result.repo_url,
        "pages_url": deployment.result.pages_url,
        "commit_sha": deployment.commit_sha,
        "notification": notified,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use shipwright_core::DeploymentResult;

    #[test]
    fn reads_task_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("task.json");
        std::fs::write(&path, r#"{"task":"demo1","round":"2","brief":"Hi"}"#).unwrap();

        let req = read_task(path.to_str().unwrap()).unwrap();
        assert_eq!(req.task, "demo1");
        assert_eq!(req.round, 2);
    }

    #[test]
    fn invalid_task_file_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("task.json");
        std::fs::write(&path, r#"{"round":1}"#).unwrap();
        let err = read_task(path.to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("missing task"));

        let missing = tmp.path().join("nope.json");
        assert!(read_task(missing.to_str().unwrap()).is_err());
    }

    #[test]
    fn render_reports_notification() {
        let request = TaskRequest::new("demo1");
        let deployment = Deployment {
            result: DeploymentResult {
                repo_url: "https://github.com/octo/demo1".into(),
                pages_url: "https://octo.github.io/demo1/".into(),
            },
            commit_sha: "abc".into(),
            notified: Some(NotifyOutcome::Exhausted { attempts: 5 }),
        };
        let json = render(&request, &deployment);
        assert_eq!(json["commit_sha"], "abc");
        assert_eq!(json["notification"]["delivered"], false);
        assert_eq!(json["notification"]["attempts"], 5);

        let skipped = Deployment {
            notified: None,
            ..deployment
        };
        assert!(render(&request, &skipped)["notification"].is_null());
    }
}
