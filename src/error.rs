// region:    --- Imports
use serde::Serialize;
use uuid::Uuid;

// endregion: --- Imports

// region:    --- Bid Rejection

/// Expected outcomes of bid validation. These are returned as values, not
/// raised as errors: the HTTP layer turns them into 400 responses carrying
/// the stable `code` below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "code")]
pub enum BidRejection {
    /// The auction's start time is still in the future.
    #[serde(rename = "NOT_STARTED")]
    NotYetStarted,
    /// The auction's end time has passed (bids at exactly the end time are
    /// already too late).
    #[serde(rename = "ALREADY_ENDED")]
    AlreadyEnded,
    /// The bidder is the auction's seller.
    #[serde(rename = "SELF_BID")]
    SelfBidNotAllowed,
    /// The amount is not a positive minor-currency value.
    #[serde(rename = "INVALID_AMOUNT")]
    InvalidAmount,
    /// The amount is below the current floor. Carries the exact minimum a
    /// retry would need, so callers never have to guess.
    #[serde(rename = "BID_TOO_LOW")]
    BidTooLow { min_acceptable: i64 },
}

impl BidRejection {
    pub fn code(&self) -> &'static str {
        match self {
            BidRejection::NotYetStarted => "NOT_STARTED",
            BidRejection::AlreadyEnded => "ALREADY_ENDED",
            BidRejection::SelfBidNotAllowed => "SELF_BID",
            BidRejection::InvalidAmount => "INVALID_AMOUNT",
            BidRejection::BidTooLow { .. } => "BID_TOO_LOW",
        }
    }

    pub fn message(&self) -> String {
        match self {
            BidRejection::NotYetStarted => "auction has not started yet".to_string(),
            BidRejection::AlreadyEnded => "auction has already ended".to_string(),
            BidRejection::SelfBidNotAllowed => "sellers cannot bid on their own auction".to_string(),
            BidRejection::InvalidAmount => "bid amount must be a positive amount in minor currency units".to_string(),
            BidRejection::BidTooLow { min_acceptable } => {
                format!("bid is below the minimum acceptable amount of {min_acceptable}")
            }
        }
    }
}

// endregion: --- Bid Rejection

// region:    --- Engine Error

/// Failures of the engine itself, as opposed to rejected-but-well-formed
/// bids. `ConcurrencyConflict` is only surfaced once the bounded retry loop
/// in the bid/finalize paths has been exhausted.
#[derive(Debug)]
pub enum EngineError {
    AuctionNotFound(Uuid),
    /// Auction parameters that violate a structural invariant at creation.
    InvalidAuction(&'static str),
    /// An operation called in a state it is not defined for, e.g. finalize
    /// before the end time.
    InvalidState(&'static str),
    ConcurrencyConflict { auction_id: Uuid, retries: u32 },
    Database(sqlx::Error),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::AuctionNotFound(id) => write!(f, "auction {id} not found"),
            EngineError::InvalidAuction(msg) => write!(f, "invalid auction: {msg}"),
            EngineError::InvalidState(msg) => write!(f, "invalid state: {msg}"),
            EngineError::ConcurrencyConflict { auction_id, retries } => write!(
                f,
                "lost the optimistic-concurrency race on auction {auction_id} {retries} times"
            ),
            EngineError::Database(e) => write!(f, "database error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Database(e) => Some(e),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for EngineError {
    fn from(e: sqlx::Error) -> Self {
        EngineError::Database(e)
    }
}

// endregion: --- Engine Error

// endregion: --- Tests
