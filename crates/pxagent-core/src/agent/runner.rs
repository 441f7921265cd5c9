//! Poll loop: run a cycle on the blocking pool, sleep, repeat until a STOP
//! file appears or Ctrl-C is pressed.

use std::time::Duration;

use anyhow::Context;

use super::Agent;

/// Drive `agent` until asked to stop, then shut it down. Running jobs are
/// terminated only when `kill_jobs` is set. Returns the stopped agent so
/// the caller can print its final state.
pub async fn run(mut agent: Agent, kill_jobs: bool) -> anyhow::Result<Agent> {
    let sleep = Duration::from_secs(agent.config().sleep_interval);
    let heartbeat = Duration::from_secs(agent.config().heartbeat_interval);
    let mut slept = Duration::ZERO;
    let mut n_cycles: u64 = 0;

    loop {
        agent = tokio::task::spawn_blocking(move || {
            agent.cycle();
            agent
        })
        .await
        .context("poll cycle panicked")?;
        n_cycles += 1;

        tokio::select! {
            _ = tokio::time::sleep(sleep) => {}
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted; stopping");
                break;
            }
        }

        slept += sleep;
        if slept >= heartbeat {
            tracing::info!(
                n_cycles,
                running_jobs = agent.scheduler().control().n_running_jobs(),
                "Agent is alive"
            );
            slept = Duration::ZERO;
        }

        if agent.stop_requested() {
            tracing::info!("STOP file found; stopping");
            break;
        }
    }

    let agent = tokio::task::spawn_blocking(move || {
        agent.stop(kill_jobs);
        agent
    })
    .await
    .context("shutdown panicked")?;
    Ok(agent)
}
