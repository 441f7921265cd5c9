//! `pxagent run` – run the agent in the foreground.

use anyhow::{Context, Result};
use pxagent_core::agent::{runner, Agent};
use pxagent_core::config::AgentConfig;
use pxagent_core::remote::CurlCatalog;
use pxagent_core::report::Severity;
use pxagent_core::translator::TaskTranslator;
use std::path::Path;

pub async fn run_agent(
    cfg: AgentConfig,
    home: &Path,
    converter: Option<String>,
    kill_jobs: bool,
) -> Result<()> {
    let translator = converter
        .map(|c| TaskTranslator::new(c))
        .unwrap_or_default();
    let mut agent = Agent::new(cfg, home, Box::new(CurlCatalog::default()), translator);

    let pid = agent
        .start()
        .with_context(|| format!("cannot start agent in {}", home.display()))?;
    println!(
        "pxagent running with PID {} (home {}); `pxagent stop` to shut down",
        pid,
        home.display()
    );

    let agent = runner::run(agent, kill_jobs).await?;
    print!("{}", agent.report().show(Severity::Warning));
    Ok(())
}
