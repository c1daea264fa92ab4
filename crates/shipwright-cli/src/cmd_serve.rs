use shipwright_core::config::Config;
use shipwright_serve::ServeConfig;

pub fn execute(config: &Config, bind: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    let serve_config = ServeConfig {
        bind: bind.unwrap_or_else(|| config.bind.clone()),
        port: port.unwrap_or(config.port),
    };
    let orchestrator = crate::build_orchestrator(config);
    tokio::runtime::Runtime::new()?.block_on(shipwright_serve::serve(orchestrator, serve_config))
}
