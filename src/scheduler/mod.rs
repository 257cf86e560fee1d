/// Status reconciliation sweeper.
/// The persisted status column is a cache of the pure time-derived status;
/// bidding decisions never read it, but list views and external consumers
/// do, so a periodic task keeps it converged: SCHEDULED rows whose window
/// has opened become ACTIVE, and rows past their end time are finalized
/// through the same idempotent path the finalize endpoint uses.
// region:    --- Imports
use crate::auction::{lifecycle, store};
use crate::database::DatabaseManager;
use crate::ledger::PostgresBidLedger;
use chrono::Utc;
use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{debug, error};

// endregion: --- Imports

// region:    --- Auction Scheduler

pub struct AuctionScheduler {
    db: Arc<DatabaseManager>,
    ledger: Arc<PostgresBidLedger>,
}

impl AuctionScheduler {
    pub fn new(db: Arc<DatabaseManager>, ledger: Arc<PostgresBidLedger>) -> Self {
        Self { db, ledger }
    }

    /// Spawns the sweep loop; runs once a second.
    pub async fn start(&self) {
        let db = Arc::clone(&self.db);
        let ledger = Arc::clone(&self.ledger);
        tokio::spawn(async move {
            let mut interval = interval(Duration::from_secs(1));
            loop {
                interval.tick().await;
                if let Err(e) = Self::sweep(&db, &ledger).await {
                    error!("{:<12} --> status sweep failed: {:?}", "Scheduler", e);
                }
            }
        });
    }

    async fn sweep(
        db: &DatabaseManager,
        ledger: &PostgresBidLedger,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let now = Utc::now();

        let activated = store::activate_due_auctions(db.pool(), now).await?;
        if activated > 0 {
            debug!("{:<12} --> {} auction(s) activated", "Scheduler", activated);
        }

        // One bad row must not hold up reconciliation of the rest; it gets
        // another chance on the next tick.
        for auction_id in store::auctions_past_end(db.pool(), now).await? {
            if let Err(e) = lifecycle::finalize(db, ledger, auction_id).await {
                error!(
                    "{:<12} --> finalize of auction {} failed: {:?}",
                    "Scheduler", auction_id, e
                );
            }
        }

        Ok(())
    }
}

// endregion: --- Auction Scheduler
