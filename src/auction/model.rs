use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// region:    --- Auction Status

/// Lifecycle of a forward auction. The persisted `status` column is only a
/// cache of this; every bidding decision recomputes it from the timestamps
/// via `lifecycle::effective_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuctionStatus {
    #[serde(rename = "SCHEDULED")]
    Scheduled,
    #[serde(rename = "ACTIVE")]
    Active,
    #[serde(rename = "ENDED")]
    Ended,
}

impl AuctionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuctionStatus::Scheduled => "SCHEDULED",
            AuctionStatus::Active => "ACTIVE",
            AuctionStatus::Ended => "ENDED",
        }
    }
}

// endregion: --- Auction Status

// region:    --- Auction

/// Auction row. `current_highest_amount` / `current_highest_bidder` cache the
/// top of the bid ledger and are only ever written in the same transaction as
/// the ledger append; `version` is the optimistic-concurrency counter every
/// such write is conditioned on.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Auction {
    pub auction_id: Uuid,
    pub item_id: Uuid,
    pub seller_id: Uuid,
    pub auction_type: String,
    pub starting_price: i64,
    pub min_increment: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Persisted status cache, reconciled by the scheduler.
    pub status: String,
    pub current_highest_amount: Option<i64>,
    pub current_highest_bidder: Option<Uuid>,
    pub winning_bid_id: Option<Uuid>,
    pub winning_bidder_id: Option<Uuid>,
    pub winning_amount: Option<i64>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

/// Auction creation command, supplied by the catalogue collaborator when a
/// seller lists an item. Prices are integer minor-currency units (cents).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAuctionCommand {
    pub item_id: Uuid,
    pub seller_id: Uuid,
    pub starting_price: i64,
    pub min_increment: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// Result of a successful finalize. This tuple is the contract with the
/// order service; `winner_id` is `None` when the auction ended without bids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizedAuction {
    pub auction_id: Uuid,
    pub winning_bid_id: Option<Uuid>,
    pub winner_id: Option<Uuid>,
    pub winning_amount: Option<i64>,
}

// endregion: --- Auction

// region:    --- Auction State View

/// Read-model returned by the status endpoints: the raw row plus the values
/// a client actually bids against.
#[derive(Debug, Serialize)]
pub struct AuctionStateView {
    #[serde(flatten)]
    pub auction: Auction,
    pub effective_status: AuctionStatus,
    pub remaining_time_seconds: Option<i64>,
    pub min_acceptable_bid: i64,
}

// endregion: --- Auction State View
