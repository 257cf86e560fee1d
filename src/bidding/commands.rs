/// Bid placement: the concurrency gate around "read highest, validate,
/// append".
///
/// The gate is an optimistic-concurrency retry loop keyed on the auction
/// row's `version` counter rather than an in-process lock, so multiple
/// service instances can bid against the same database safely. Each pass
/// validates against a consistent snapshot; the cached-highest update is
/// conditioned on the snapshot's version and committed in the same
/// transaction as the ledger append. A concurrent accepted bid bumps the
/// version, the conditional update applies zero rows, and the loop re-reads
/// and re-validates, so the snapshot check is authoritative whenever the
/// write goes through.
// region:    --- Imports
use crate::auction::store;
use crate::bidding::model::{AcceptedBid, PlaceBidCommand, PlaceBidOutcome};
use crate::bidding::validator;
use crate::database::DatabaseManager;
use crate::error::EngineError;
use crate::ledger::BidLedger;
use chrono::Utc;
use tracing::{info, warn};

// endregion: --- Imports

// region:    --- Place Bid

const MAX_RETRIES: u32 = 100;

/// Accepts or rejects a bid. Rejections carry no side effects: nothing is
/// appended and the auction row is untouched. Only exhausted retries and
/// database failures surface as errors.
pub async fn handle_place_bid(
    cmd: PlaceBidCommand,
    ledger: &impl BidLedger,
    db: &DatabaseManager,
) -> Result<PlaceBidOutcome, EngineError> {
    info!(
        "{:<12} --> bid of {} on auction {} by {}",
        "Command", cmd.amount, cmd.auction_id, cmd.bidder_id
    );

    let mut retries = 0;
    while retries < MAX_RETRIES {
        let auction = store::get_auction(db, cmd.auction_id)
            .await?
            .ok_or(EngineError::AuctionNotFound(cmd.auction_id))?;

        let now = Utc::now();
        let draft = match validator::validate(&auction, now, cmd.bidder_id, cmd.amount) {
            Ok(draft) => draft,
            Err(rejection) => {
                info!(
                    "{:<12} --> bid on auction {} rejected: {}",
                    "Command",
                    cmd.auction_id,
                    rejection.code()
                );
                return Ok(PlaceBidOutcome::Rejected(rejection));
            }
        };

        // Critical section: cache CAS and ledger append commit or roll back
        // together, so the cache can never diverge from the ledger maximum.
        let mut tx = db.pool().begin().await?;
        let applied = store::accept_bid_cas(
            &mut tx,
            auction.auction_id,
            auction.version,
            draft.amount,
            draft.bidder_id,
        )
        .await?;
        if !applied {
            tx.rollback().await?;
            retries += 1;
            warn!(
                "{:<12} --> version conflict on auction {}, retrying ({}/{})",
                "Command", cmd.auction_id, retries, MAX_RETRIES
            );
            continue;
        }
        let bid = ledger.append(&mut tx, &draft).await?;
        tx.commit().await?;

        info!(
            "{:<12} --> bid {} accepted, auction {} highest is now {}",
            "Command", bid.bid_id, bid.auction_id, bid.amount
        );
        return Ok(PlaceBidOutcome::Accepted(AcceptedBid {
            current_highest_amount: bid.amount,
            current_highest_bidder: bid.bidder_id,
            bid,
        }));
    }

    Err(EngineError::ConcurrencyConflict {
        auction_id: cmd.auction_id,
        retries,
    })
}

// endregion: --- Place Bid
