/// The bid ledger: durable, append-only record of accepted bids and the
/// source of truth the auction's cached highest is derived from. Amounts are
/// strictly increasing per auction, so "highest amount" and "most recent"
/// name the same row.
// region:    --- Imports
use crate::bidding::model::{Bid, BidDraft};
use crate::database::DatabaseManager;
use crate::error::EngineError;
use async_trait::async_trait;
use serde::Serialize;
use sqlx::{Postgres, Transaction};
use std::sync::Arc;
use uuid::Uuid;

// endregion: --- Imports

// region:    --- Queries

const BID_COLUMNS: &str = "bid_id, auction_id, bidder_id, amount, placed_at";

const INSERT_BID: &str = "INSERT INTO bids (auction_id, bidder_id, amount, placed_at)
     VALUES ($1, $2, $3, $4)
     RETURNING bid_id, auction_id, bidder_id, amount, placed_at";

const CURRENT_HIGHEST: &str = "SELECT bid_id, bidder_id, amount FROM bids
      WHERE auction_id = $1 ORDER BY amount DESC LIMIT 1";

// endregion: --- Queries

// region:    --- Ledger Trait

/// Top of the ledger for one auction.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct HighestBid {
    pub bid_id: Uuid,
    pub bidder_id: Uuid,
    pub amount: i64,
}

#[async_trait]
pub trait BidLedger {
    /// Maximum-amount bid for the auction, `None` while no bid exists.
    async fn current_highest(&self, auction_id: Uuid) -> Result<Option<HighestBid>, EngineError>;

    /// Same read, but inside a caller-owned transaction. Finalize uses this
    /// so the winner it snapshots cannot include a bid committed after the
    /// transaction's view of the ledger.
    async fn highest_in_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        auction_id: Uuid,
    ) -> Result<Option<HighestBid>, EngineError>;

    /// Appends an immutable bid row. Must only be called from within the
    /// concurrency gate's critical section; nothing here re-checks ordering.
    async fn append(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        draft: &BidDraft,
    ) -> Result<Bid, EngineError>;

    /// Full bid history for an auction, highest amount first.
    async fn history(&self, auction_id: Uuid) -> Result<Vec<Bid>, EngineError>;
}

// endregion: --- Ledger Trait

// region:    --- Postgres Ledger

pub struct PostgresBidLedger {
    db: Arc<DatabaseManager>,
}

impl PostgresBidLedger {
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl BidLedger for PostgresBidLedger {
    async fn current_highest(&self, auction_id: Uuid) -> Result<Option<HighestBid>, EngineError> {
        let highest = sqlx::query_as::<_, HighestBid>(CURRENT_HIGHEST)
            .bind(auction_id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(highest)
    }

    async fn highest_in_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        auction_id: Uuid,
    ) -> Result<Option<HighestBid>, EngineError> {
        let highest = sqlx::query_as::<_, HighestBid>(CURRENT_HIGHEST)
            .bind(auction_id)
            .fetch_optional(&mut **tx)
            .await?;
        Ok(highest)
    }

    async fn append(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        draft: &BidDraft,
    ) -> Result<Bid, EngineError> {
        let bid = sqlx::query_as::<_, Bid>(INSERT_BID)
            .bind(draft.auction_id)
            .bind(draft.bidder_id)
            .bind(draft.amount)
            .bind(draft.placed_at)
            .fetch_one(&mut **tx)
            .await?;
        Ok(bid)
    }

    async fn history(&self, auction_id: Uuid) -> Result<Vec<Bid>, EngineError> {
        let sql = format!(
            "SELECT {BID_COLUMNS} FROM bids WHERE auction_id = $1 ORDER BY amount DESC"
        );
        let bids = sqlx::query_as::<_, Bid>(&sql)
            .bind(auction_id)
            .fetch_all(self.db.pool())
            .await?;
        Ok(bids)
    }
}

// endregion: --- Postgres Ledger
