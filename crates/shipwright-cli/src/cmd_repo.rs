use shipwright_core::config::Config;
use shipwright_core::TaskRequest;
use shipwright_github::{GithubClient, RepoHost};

pub fn create(config: &Config, name: &str, description: &str) -> anyhow::Result<()> {
    // Same naming rules as tasks arriving over HTTP.
    let name = TaskRequest::from_value(&serde_json::json!({ "task": name }))?.task;
    let client = GithubClient::from_config(config);
    let repo = client.create_repo(&name, description)?;
    println!("Repository created: {}", repo.html_url);
    Ok(())
}
