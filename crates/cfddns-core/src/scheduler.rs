//! Cycle scheduler
//!
//! Drives a [`DdnsEngine`] on a fixed timer: one cycle immediately at
//! startup, then one per poll interval until shutdown is requested.
//!
//! Shutdown is only observed between cycles. A cycle that has started always
//! runs to completion, after which pending notifications get the configured
//! grace period.

use crate::engine::{DdnsEngine, EngineEvent};
use crate::error::Result;
use std::future::Future;
use tokio::time::MissedTickBehavior;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::IntervalStream;
use tracing::{debug, info, warn};

/// Periodic driver for the reconciliation engine
pub struct Scheduler {
    engine: DdnsEngine,
}

impl Scheduler {
    pub fn new(engine: DdnsEngine) -> Self {
        Self { engine }
    }

    /// The engine being driven
    pub fn engine(&self) -> &DdnsEngine {
        &self.engine
    }

    /// Run until `shutdown` completes
    ///
    /// Initializes every resolver first; an initialization failure is
    /// returned before any cycle runs. On a clean stop the engine is handed
    /// back so its final state can be inspected.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<DdnsEngine>
    where
        F: Future<Output = ()>,
    {
        self.engine.initialize().await?;

        let interval = self.engine.poll_interval();
        info!(
            "Starting scheduler: {} host(s), {} resolver(s), checking every {:?}",
            self.engine.hostnames().len(),
            self.engine.roster_len(),
            interval
        );
        self.engine.emit_event(EngineEvent::Started {
            hosts_count: self.engine.hostnames().len(),
            resolvers_count: self.engine.roster_len(),
            interval,
        });

        // the first tick completes immediately
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ticks = IntervalStream::new(ticker);

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }

                Some(_) = ticks.next() => {
                    self.tick().await;
                }
            }
        }

        let grace = self.engine.shutdown_grace();
        self.engine.drain_notifications(grace).await;

        self.engine.emit_event(EngineEvent::Stopped {
            reason: "Shutdown requested".to_string(),
        });
        info!("Scheduler stopped");

        Ok(self.engine)
    }

    async fn tick(&mut self) {
        match self.engine.run_cycle().await {
            Ok(report) => debug!(
                "Cycle finished at {} ({} write(s))",
                report.finished_at,
                report.writes()
            ),
            Err(e) => warn!("Cycle abandoned: {}", e),
        }
    }
}
