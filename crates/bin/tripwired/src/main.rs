use std::time::Duration;

use anyhow::Context;
use tokio::time::MissedTickBehavior;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tripwire_app::clock::SystemClock;
use tripwired::config::Config;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .init();

    let runtime = tripwired::bootstrap(&config, SystemClock)?;
    info!(
        scenarios = runtime.scenarios().len(),
        tick_ms = config.scheduler.tick_ms,
        "tripwired started"
    );

    let mut interval = tokio::time::interval(Duration::from_millis(config.scheduler.tick_ms));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                runtime.tick();
            }
            result = &mut shutdown => {
                result.context("failed to listen for shutdown signal")?;
                info!("shutting down");
                break;
            }
        }
    }
    Ok(())
}
