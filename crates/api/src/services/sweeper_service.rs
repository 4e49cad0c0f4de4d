use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{error, info};

use crate::domains::lifecycle::service as lifecycle;
use crate::error::AppError;
use crate::AppState;

/// Time-driven booking transitions: lapsed holds expire, bookings whose
/// end has passed are fulfilled. Safe to run in several workers at once.
pub struct BookingSweeper {
    state: AppState,
    interval: Interval,
}

impl BookingSweeper {
    pub fn new(state: AppState, period: Duration) -> Self {
        let mut interval = interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Self { state, interval }
    }

    pub async fn run(&mut self) {
        info!("Starting booking sweeper");

        loop {
            self.interval.tick().await;

            if let Err(e) = self.sweep().await {
                error!("Error sweeping bookings: {}", e);
            }
        }
    }

    /// One pass. Both steps read the same clock.
    pub async fn sweep(&self) -> Result<(), AppError> {
        let clock = self.state.clock();

        lifecycle::expire_stale_bookings(&self.state.db, &clock).await?;
        let fulfilled = lifecycle::fulfil_ended_bookings(&self.state.db, &clock).await?;
        if !fulfilled.is_empty() {
            info!(count = fulfilled.len(), "Fulfilled ended bookings");
        }

        Ok(())
    }
}

pub fn spawn_booking_sweeper(state: AppState) -> JoinHandle<()> {
    let period = state.config().sweep_interval;
    tokio::spawn(async move {
        let mut sweeper = BookingSweeper::new(state, period);
        sweeper.run().await;
    })
}
