/// Bid validation. Pure: every decision is a function of the auction
/// snapshot, the clock instant, the bidder, and the amount, which keeps the
/// whole rule set unit-testable without a database.
// region:    --- Imports
use crate::auction::lifecycle;
use crate::auction::model::{Auction, AuctionStatus};
use crate::bidding::model::BidDraft;
use crate::error::BidRejection;
use chrono::{DateTime, Utc};
use uuid::Uuid;

// endregion: --- Imports

// region:    --- Validator

/// Decides whether a proposed bid is acceptable against the given auction
/// snapshot. Check order, which fixes the reported reason when several rules
/// fail at once: time window, self-bid, positive amount, increment floor.
pub fn validate(
    auction: &Auction,
    now: DateTime<Utc>,
    bidder_id: Uuid,
    amount: i64,
) -> Result<BidDraft, BidRejection> {
    match lifecycle::effective_status(auction, now) {
        AuctionStatus::Scheduled => return Err(BidRejection::NotYetStarted),
        AuctionStatus::Ended => return Err(BidRejection::AlreadyEnded),
        AuctionStatus::Active => {}
    }

    if bidder_id == auction.seller_id {
        return Err(BidRejection::SelfBidNotAllowed);
    }

    if amount <= 0 {
        return Err(BidRejection::InvalidAmount);
    }

    let min_acceptable = min_acceptable(auction);
    if amount < min_acceptable {
        return Err(BidRejection::BidTooLow { min_acceptable });
    }

    Ok(BidDraft {
        auction_id: auction.auction_id,
        bidder_id,
        amount,
        placed_at: now,
    })
}

/// The floor a new bid must reach: the starting price while the ledger is
/// empty, then strictly `highest + min_increment`. Saturates so a highest
/// near `i64::MAX` cannot wrap the floor negative and let a tiny bid through.
pub fn min_acceptable(auction: &Auction) -> i64 {
    match auction.current_highest_amount {
        Some(highest) => highest.saturating_add(auction.min_increment),
        None => auction.starting_price,
    }
}

// endregion: --- Validator

// endregion: --- Tests
