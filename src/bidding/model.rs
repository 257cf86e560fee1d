use crate::error::BidRejection;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An accepted bid as stored in the ledger. Rows are immutable: no update or
/// delete path exists anywhere in the engine.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Bid {
    pub bid_id: Uuid,
    pub auction_id: Uuid,
    pub bidder_id: Uuid,
    /// Integer minor-currency units (cents).
    pub amount: i64,
    pub placed_at: DateTime<Utc>,
}

/// A validated bid that has not been appended yet. Produced by the validator,
/// consumed by the ledger inside the concurrency gate's transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BidDraft {
    pub auction_id: Uuid,
    pub bidder_id: Uuid,
    pub amount: i64,
    pub placed_at: DateTime<Utc>,
}

/// Bid placement command. `bidder_id` comes from the identity collaborator
/// and is trusted as given.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceBidCommand {
    pub auction_id: Uuid,
    pub bidder_id: Uuid,
    pub amount: i64,
}

/// A committed bid together with the auction snapshot it produced.
#[derive(Debug, Clone, Serialize)]
pub struct AcceptedBid {
    pub bid: Bid,
    pub current_highest_amount: i64,
    pub current_highest_bidder: Uuid,
}

/// Outcome of `place_bid`. Rejections are expected results, not errors;
/// engine failures travel separately as `EngineError`.
#[derive(Debug)]
pub enum PlaceBidOutcome {
    Accepted(AcceptedBid),
    Rejected(BidRejection),
}
