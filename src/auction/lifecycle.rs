/// Auction lifecycle management.
/// Status is a pure function of (now, start_time, end_time); the persisted
/// column is a cache and is never trusted when deciding bid eligibility.
// region:    --- Imports
use crate::auction::model::{Auction, AuctionStatus, CreateAuctionCommand, FinalizedAuction};
use crate::auction::store;
use crate::database::DatabaseManager;
use crate::error::EngineError;
use crate::ledger::BidLedger;
use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

// endregion: --- Imports

// region:    --- Effective Status

/// ENDED at and after the end time, SCHEDULED strictly before the start
/// time, ACTIVE in between. The bidding window is inclusive of the start
/// instant and exclusive of the end instant.
pub fn effective_status(auction: &Auction, now: DateTime<Utc>) -> AuctionStatus {
    if now >= auction.end_time {
        AuctionStatus::Ended
    } else if now < auction.start_time {
        AuctionStatus::Scheduled
    } else {
        AuctionStatus::Active
    }
}

/// Whole seconds until the end time, `None` once the auction is no longer
/// active.
pub fn remaining_seconds(auction: &Auction, now: DateTime<Utc>) -> Option<i64> {
    match effective_status(auction, now) {
        AuctionStatus::Active => Some((auction.end_time - now).num_seconds()),
        _ => None,
    }
}

// endregion: --- Effective Status

// region:    --- Create

/// Validates the structural invariants of a new auction and persists it with
/// the status its time window already implies: an auction whose start time
/// has passed is created ACTIVE, one whose end time has passed is created
/// ENDED.
pub async fn create_auction(
    db: &DatabaseManager,
    cmd: CreateAuctionCommand,
) -> Result<Auction, EngineError> {
    check_invariants(&cmd)?;

    let now = Utc::now();
    let status = initial_status(&cmd, now);
    let auction = store::insert_auction(db, &cmd, status).await?;
    info!(
        "{:<12} --> auction {} created ({}, floor {}, increment {})",
        "Lifecycle",
        auction.auction_id,
        status.as_str(),
        auction.starting_price,
        auction.min_increment
    );
    Ok(auction)
}

/// Structural invariants every auction row must satisfy.
fn check_invariants(cmd: &CreateAuctionCommand) -> Result<(), EngineError> {
    if cmd.starting_price <= 0 {
        return Err(EngineError::InvalidAuction("starting price must be positive"));
    }
    if cmd.min_increment <= 0 {
        return Err(EngineError::InvalidAuction("minimum increment must be positive"));
    }
    if cmd.start_time >= cmd.end_time {
        return Err(EngineError::InvalidAuction("start time must precede end time"));
    }
    Ok(())
}

fn initial_status(cmd: &CreateAuctionCommand, now: DateTime<Utc>) -> AuctionStatus {
    if now >= cmd.end_time {
        AuctionStatus::Ended
    } else if now >= cmd.start_time {
        AuctionStatus::Active
    } else {
        AuctionStatus::Scheduled
    }
}

// endregion: --- Create

// region:    --- Finalize

const MAX_RETRIES: u32 = 100;

/// Closes an auction past its end time and commits the winner snapshot.
///
/// Idempotent: once the row is ENDED, every further call returns the same
/// snapshot and writes nothing. The winner is read from the bid ledger inside
/// the same transaction that flips the status, conditioned on the auction's
/// version counter, so a bid racing the end-time boundary either lands before
/// the snapshot (and is included) or bumps the version (and the finalize
/// retries against the new top of the ledger).
pub async fn finalize(
    db: &DatabaseManager,
    ledger: &impl BidLedger,
    auction_id: Uuid,
) -> Result<FinalizedAuction, EngineError> {
    let mut retries = 0;
    while retries < MAX_RETRIES {
        let auction = store::get_auction(db, auction_id)
            .await?
            .ok_or(EngineError::AuctionNotFound(auction_id))?;

        // Already finalized, or created directly in the ENDED state.
        if auction.status == AuctionStatus::Ended.as_str() {
            return Ok(FinalizedAuction {
                auction_id,
                winning_bid_id: auction.winning_bid_id,
                winner_id: auction.winning_bidder_id,
                winning_amount: auction.winning_amount,
            });
        }

        let now = Utc::now();
        if now < auction.end_time {
            return Err(EngineError::InvalidState(
                "cannot finalize an auction before its end time",
            ));
        }

        let mut tx = db.pool().begin().await?;
        let winning = ledger.highest_in_tx(&mut tx, auction_id).await?;
        let (bid_id, bidder_id, amount) = match &winning {
            Some(bid) => (Some(bid.bid_id), Some(bid.bidder_id), Some(bid.amount)),
            None => (None, None, None),
        };
        let applied =
            store::finalize_auction(&mut tx, auction_id, auction.version, bid_id, bidder_id, amount)
                .await?;
        if !applied {
            // Lost the version race to a concurrent bid or finalize.
            tx.rollback().await?;
            retries += 1;
            warn!(
                "{:<12} --> finalize of auction {} lost a version race, retrying",
                "Lifecycle", auction_id
            );
            continue;
        }
        tx.commit().await?;

        info!(
            "{:<12} --> auction {} finalized, winner: {:?}, amount: {:?}",
            "Lifecycle", auction_id, bidder_id, amount
        );
        return Ok(FinalizedAuction {
            auction_id,
            winning_bid_id: bid_id,
            winner_id: bidder_id,
            winning_amount: amount,
        });
    }

    Err(EngineError::ConcurrencyConflict { auction_id, retries })
}

// endregion: --- Finalize

// region:    --- Tests
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn auction(start_offset_secs: i64, end_offset_secs: i64, now: DateTime<Utc>) -> Auction {
        Auction {
            auction_id: Uuid::new_v4(),
            item_id: Uuid::new_v4(),
            seller_id: Uuid::new_v4(),
            auction_type: "FORWARD".to_string(),
            starting_price: 5000,
            min_increment: 100,
            start_time: now + Duration::seconds(start_offset_secs),
            end_time: now + Duration::seconds(end_offset_secs),
            status: "SCHEDULED".to_string(),
            current_highest_amount: None,
            current_highest_bidder: None,
            winning_bid_id: None,
            winning_bidder_id: None,
            winning_amount: None,
            version: 0,
            created_at: now,
        }
    }

    #[test]
    fn scheduled_before_start() {
        let now = Utc::now();
        let a = auction(10, 60, now);
        assert_eq!(effective_status(&a, now), AuctionStatus::Scheduled);
    }

    #[test]
    fn active_at_exactly_the_start_instant() {
        let now = Utc::now();
        let a = auction(0, 60, now);
        assert_eq!(effective_status(&a, now), AuctionStatus::Active);
    }

    #[test]
    fn ended_at_exactly_the_end_instant() {
        let now = Utc::now();
        let a = auction(-60, 0, now);
        assert_eq!(effective_status(&a, now), AuctionStatus::Ended);
    }

    #[test]
    fn stale_persisted_status_is_ignored() {
        let now = Utc::now();
        let mut a = auction(-120, -60, now);
        a.status = "ACTIVE".to_string();
        assert_eq!(effective_status(&a, now), AuctionStatus::Ended);
    }

    #[test]
    fn remaining_seconds_only_while_active() {
        let now = Utc::now();
        assert_eq!(remaining_seconds(&auction(-1, 90, now), now), Some(90));
        assert_eq!(remaining_seconds(&auction(10, 90, now), now), None);
        assert_eq!(remaining_seconds(&auction(-90, -1, now), now), None);
    }

    #[test]
    fn initial_status_follows_the_time_window() {
        let now = Utc::now();
        let cmd = |s: i64, e: i64| CreateAuctionCommand {
            item_id: Uuid::new_v4(),
            seller_id: Uuid::new_v4(),
            starting_price: 5000,
            min_increment: 100,
            start_time: now + Duration::seconds(s),
            end_time: now + Duration::seconds(e),
        };
        assert_eq!(initial_status(&cmd(10, 60), now), AuctionStatus::Scheduled);
        assert_eq!(initial_status(&cmd(-10, 60), now), AuctionStatus::Active);
        assert_eq!(initial_status(&cmd(-60, -10), now), AuctionStatus::Ended);
    }

    #[test]
    fn creation_invariants_are_enforced() {
        let now = Utc::now();
        let valid = CreateAuctionCommand {
            item_id: Uuid::new_v4(),
            seller_id: Uuid::new_v4(),
            starting_price: 5000,
            min_increment: 100,
            start_time: now,
            end_time: now + Duration::hours(1),
        };
        assert!(check_invariants(&valid).is_ok());

        let mut cmd = valid.clone();
        cmd.starting_price = 0;
        assert!(matches!(
            check_invariants(&cmd),
            Err(EngineError::InvalidAuction("starting price must be positive"))
        ));

        let mut cmd = valid.clone();
        cmd.min_increment = -1;
        assert!(matches!(
            check_invariants(&cmd),
            Err(EngineError::InvalidAuction("minimum increment must be positive"))
        ));

        // Equal start and end is an empty window, so it is rejected too.
        let mut cmd = valid.clone();
        cmd.end_time = cmd.start_time;
        assert!(matches!(
            check_invariants(&cmd),
            Err(EngineError::InvalidAuction("start time must precede end time"))
        ));
    }
}
// endregion: --- Tests
