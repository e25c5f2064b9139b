//! Refocus Collector - monitoring collector agent
//!
//! Usage:
//! - `refocus-collector`        run the heartbeat loop
//! - `refocus-collector once`   run a single heartbeat and print the payload
//! - `refocus-collector setup`  interactive first-time configuration

mod wizard;

use anyhow::{Context, Result};
use refocus_collector::{
    CollectorConfig, CycleReport, HttpTransport, MetadataCollector, Reconciler, ResponseOutcome,
};
use std::future::Future;
use std::time::Duration;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Main agent state
struct Agent {
    reconciler: Reconciler<HttpTransport>,
    metadata: MetadataCollector,
    heartbeat_interval: Duration,
}

impl Agent {
    /// Create new agent instance
    fn new(config: CollectorConfig) -> Result<Self> {
        let transport = HttpTransport::new(config.request_timeout())
            .context("Failed to build controller transport")?;

        let metadata = MetadataCollector::new();
        let identity = metadata.identity();
        info!(
            "Collector '{}' on {} ({} {}), generators in {}",
            config.name.as_deref().unwrap_or("<unnamed>"),
            identity.hostname,
            identity.os,
            identity.architecture,
            config.generators_dir.display()
        );

        let heartbeat_interval = config.heartbeat_interval();

        Ok(Self {
            reconciler: Reconciler::new(config, transport),
            metadata,
            heartbeat_interval,
        })
    }

    /// Run heartbeats until Ctrl-C
    async fn run(&mut self) -> Result<()> {
        self.run_until(tokio::signal::ctrl_c()).await
    }

    /// Run heartbeats until `shutdown` resolves. A cycle always completes
    /// before the next tick is taken; a shutdown signalled during a cycle
    /// stops the loop once the cycle is done.
    async fn run_until<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = std::io::Result<()>>,
    {
        info!(
            "Starting heartbeat loop every {}s",
            self.heartbeat_interval.as_secs_f64()
        );

        let mut timer = Self::timer(self.heartbeat_interval);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;

                result = &mut shutdown => {
                    result.context("Failed to listen for shutdown signal")?;
                    info!("Shutdown requested, stopping heartbeat loop");
                    return Ok(());
                }

                _ = timer.tick() => {
                    if let Some(report) = self.heartbeat().await {
                        if let Some(requested) = report.outcome.heartbeat_interval() {
                            if requested != self.heartbeat_interval {
                                info!(
                                    "Controller changed heartbeat interval to {}s",
                                    requested.as_secs_f64()
                                );
                                self.heartbeat_interval = requested;
                                timer = Self::timer(requested);
                                // the fresh interval fires immediately
                                timer.tick().await;
                            }
                        }
                    }
                }
            }
        }
    }

    /// One heartbeat cycle; failures are logged and the loop carries on
    async fn heartbeat(&mut self) -> Option<CycleReport> {
        let snapshot = self.metadata.collect();

        match self.reconciler.run_cycle(&snapshot).await {
            Ok(report) => {
                if let ResponseOutcome::Failed(e) = &report.outcome {
                    warn!("Heartbeat {} not delivered: {}", report.cycle_id, e);
                } else {
                    debug!("Heartbeat {} complete", report.cycle_id);
                }
                Some(report)
            }
            Err(e) if e.is_validation() => {
                error!("Heartbeat aborted: {}", e);
                None
            }
            Err(e) => {
                error!("Heartbeat failed: {}", e);
                None
            }
        }
    }

    fn timer(period: Duration) -> Interval {
        let mut timer = interval(period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        timer
    }
}

/// Fail when the controller never acknowledged the heartbeat
fn ensure_delivered(report: CycleReport) -> Result<()> {
    match report.outcome {
        ResponseOutcome::Applied { .. } => Ok(()),
        ResponseOutcome::Failed(e) => {
            anyhow::bail!("Heartbeat {} not delivered to the controller: {}", report.cycle_id, e)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("refocus_collector=info")),
        )
        .init();

    let command = std::env::args().nth(1);

    if command.as_deref() == Some("setup") {
        return wizard::SetupWizard::run().await;
    }

    let config = CollectorConfig::load()
        .await
        .context("Failed to load collector configuration")?;

    if config.name.is_none() && CollectorConfig::is_first_time_setup() {
        warn!("No configuration found; run `refocus-collector setup` to create one");
    }

    let mut agent = Agent::new(config).context("Failed to create agent")?;

    match command.as_deref() {
        Some("once") => {
            let report = agent
                .heartbeat()
                .await
                .context("Heartbeat aborted before sending, see the log above")?;
            println!("{}", serde_json::to_string_pretty(&report.payload)?);
            ensure_delivered(report)
        }
        Some(other) => anyhow::bail!("Unknown command: {other} (expected `once` or `setup`)"),
        None => agent.run().await.context("Agent execution failed"),
    }
}
