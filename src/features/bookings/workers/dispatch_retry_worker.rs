use std::sync::Arc;
use std::time::Duration;

use tokio::time::interval;

use crate::core::error::Result;
use crate::features::bookings::services::BookingService;

/// Claims touched more recently than this are not reconciled
const CLAIM_GRACE_SECS: i64 = 60;

/// Background worker that re-matches REQUESTED bookings and repairs claims
/// left behind by failed releases
pub struct DispatchRetryWorker {
    service: Arc<BookingService>,
    interval: Duration,
    batch_size: i64,
}

impl DispatchRetryWorker {
    pub fn new(service: Arc<BookingService>, interval: Duration, batch_size: usize) -> Self {
        Self {
            service,
            interval,
            batch_size: batch_size as i64,
        }
    }

    /// Run the worker in a background loop
    pub async fn run(&self) {
        tracing::info!(
            "Starting dispatch retry worker (every {:?}, batch {})",
            self.interval,
            self.batch_size
        );

        let mut interval = interval(self.interval);

        loop {
            interval.tick().await;

            if let Err(e) = self.process_batch().await {
                tracing::error!("Error processing dispatch retry batch: {:?}", e);
            }
        }
    }

    async fn process_batch(&self) -> Result<()> {
        let assigned = self.service.assign_requested_batch(self.batch_size).await?;
        if assigned > 0 {
            tracing::info!("Dispatch retry assigned {} pending bookings", assigned);
        }

        let released = self
            .service
            .reconcile_claims(chrono::Duration::seconds(CLAIM_GRACE_SECS))
            .await?;
        if released > 0 {
            tracing::warn!("Dispatch retry released {} stale claims", released);
        }

        Ok(())
    }
}
