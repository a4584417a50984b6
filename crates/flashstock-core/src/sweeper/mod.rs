//! Background task reclaiming expired reservations.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{HotStore, Keys};
use crate::config::ReservationConfig;
use crate::reservation::ReservationEngine;

/// Polls the expiry index on a fixed cadence and finalises due
/// reservations. Modeled on this codebase's job-scheduler loop shape —
/// `tokio::spawn` plus `tokio::time::sleep` — rather than its generic job
/// machinery, since the sweeper has one fixed responsibility.
pub struct ExpirySweeper {
    store: HotStore,
    engine: Arc<ReservationEngine>,
    config: ReservationConfig,
}

impl ExpirySweeper {
    pub fn new(store: HotStore, engine: Arc<ReservationEngine>, config: ReservationConfig) -> Self {
        Self { store, engine, config }
    }

    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(&self) {
        let interval = Duration::from_secs(self.config.sweeper_interval_seconds);
        info!(interval_secs = self.config.sweeper_interval_seconds, "expiry sweeper started");

        loop {
            if let Err(e) = self.tick().await {
                warn!(error = %e, "sweeper tick failed");
            }
            tokio::time::sleep(interval).await;
        }
    }

    async fn tick(&self) -> crate::error::Result<()> {
        let now = Utc::now().timestamp() as f64;
        let due = self
            .store
            .zrangebyscore_limit(Keys::expiring_reservations(), now, self.config.sweeper_batch_size)
            .await?;

        if due.is_empty() {
            return Ok(());
        }

        debug!(count = due.len(), "sweeping due reservations");
        for reservation_id in due {
            match self.engine.expire(&reservation_id).await {
                Ok(Some(_)) => {}
                Ok(None) => {
                    debug!(reservation_id, "already terminal, skipped");
                }
                Err(e) => {
                    warn!(error = %e, reservation_id, "failed to expire reservation");
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_batch_size_is_positive() {
        assert!(ReservationConfig::default().sweeper_batch_size > 0);
    }
}
