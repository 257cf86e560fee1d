/// Persistence for auction rows. All writes that could race a concurrent
/// bid are conditioned on the row's `version` counter and report whether
/// they applied, so callers can drive the optimistic retry loop.
// region:    --- Imports
use crate::auction::model::{Auction, AuctionStatus, CreateAuctionCommand};
use crate::database::DatabaseManager;
use crate::error::EngineError;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

// endregion: --- Imports

// region:    --- Queries

const AUCTION_COLUMNS: &str = "auction_id, item_id, seller_id, auction_type, starting_price, \
     min_increment, start_time, end_time, status, current_highest_amount, current_highest_bidder, \
     winning_bid_id, winning_bidder_id, winning_amount, version, created_at";

/// Conditional update of the cached highest bid. Applies only if the version
/// still matches the snapshot the bid was validated against; any concurrently
/// accepted bid bumps the version and voids the condition. Also repairs a
/// stale SCHEDULED status cache, since an accepted bid proves the auction is
/// active.
const ACCEPT_BID_CAS: &str = "UPDATE auctions
        SET current_highest_amount = $1,
            current_highest_bidder = $2,
            status = 'ACTIVE',
            version = version + 1
      WHERE auction_id = $3 AND version = $4";

const FINALIZE_CAS: &str = "UPDATE auctions
        SET status = 'ENDED',
            winning_bid_id = $1,
            winning_bidder_id = $2,
            winning_amount = $3,
            version = version + 1
      WHERE auction_id = $4 AND version = $5";

const ACTIVATE_DUE: &str = "UPDATE auctions SET status = 'ACTIVE'
      WHERE status = 'SCHEDULED' AND start_time <= $1 AND end_time > $1";

const PAST_END: &str =
    "SELECT auction_id FROM auctions WHERE status != 'ENDED' AND end_time <= $1";

// endregion: --- Queries

// region:    --- Store

pub async fn insert_auction(
    db: &DatabaseManager,
    cmd: &CreateAuctionCommand,
    status: AuctionStatus,
) -> Result<Auction, EngineError> {
    let sql = format!(
        "INSERT INTO auctions (item_id, seller_id, auction_type, starting_price, min_increment, \
         start_time, end_time, status) \
         VALUES ($1, $2, 'FORWARD', $3, $4, $5, $6, $7) \
         RETURNING {AUCTION_COLUMNS}"
    );
    let auction = sqlx::query_as::<_, Auction>(&sql)
        .bind(cmd.item_id)
        .bind(cmd.seller_id)
        .bind(cmd.starting_price)
        .bind(cmd.min_increment)
        .bind(cmd.start_time)
        .bind(cmd.end_time)
        .bind(status.as_str())
        .fetch_one(db.pool())
        .await?;
    Ok(auction)
}

pub async fn get_auction(
    db: &DatabaseManager,
    auction_id: Uuid,
) -> Result<Option<Auction>, EngineError> {
    let sql = format!("SELECT {AUCTION_COLUMNS} FROM auctions WHERE auction_id = $1");
    let auction = sqlx::query_as::<_, Auction>(&sql)
        .bind(auction_id)
        .fetch_optional(db.pool())
        .await?;
    Ok(auction)
}

pub async fn list_auctions(db: &DatabaseManager) -> Result<Vec<Auction>, EngineError> {
    let sql = format!("SELECT {AUCTION_COLUMNS} FROM auctions ORDER BY created_at DESC");
    let auctions = sqlx::query_as::<_, Auction>(&sql)
        .fetch_all(db.pool())
        .await?;
    Ok(auctions)
}

/// Returns `true` if the cached-highest update applied, `false` if the
/// version moved on and the caller must re-read and re-validate.
pub async fn accept_bid_cas(
    tx: &mut Transaction<'_, Postgres>,
    auction_id: Uuid,
    expected_version: i64,
    amount: i64,
    bidder_id: Uuid,
) -> Result<bool, EngineError> {
    let result = sqlx::query(ACCEPT_BID_CAS)
        .bind(amount)
        .bind(bidder_id)
        .bind(auction_id)
        .bind(expected_version)
        .execute(&mut **tx)
        .await?;
    Ok(result.rows_affected() == 1)
}

/// Returns `true` if the ENDED transition and winner snapshot applied.
pub async fn finalize_auction(
    tx: &mut Transaction<'_, Postgres>,
    auction_id: Uuid,
    expected_version: i64,
    winning_bid_id: Option<Uuid>,
    winning_bidder_id: Option<Uuid>,
    winning_amount: Option<i64>,
) -> Result<bool, EngineError> {
    let result = sqlx::query(FINALIZE_CAS)
        .bind(winning_bid_id)
        .bind(winning_bidder_id)
        .bind(winning_amount)
        .bind(auction_id)
        .bind(expected_version)
        .execute(&mut **tx)
        .await?;
    Ok(result.rows_affected() == 1)
}

/// Promotes every SCHEDULED row whose window has opened. Used by the
/// reconciliation sweeper; the status column is only a cache, so this is
/// convergence, not correctness.
pub async fn activate_due_auctions(pool: &PgPool, now: DateTime<Utc>) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(ACTIVATE_DUE).bind(now).execute(pool).await?;
    Ok(result.rows_affected())
}

/// Auctions whose end time has passed but whose row has not been finalized.
pub async fn auctions_past_end(
    pool: &PgPool,
    now: DateTime<Utc>,
) -> Result<Vec<Uuid>, sqlx::Error> {
    sqlx::query_scalar::<_, Uuid>(PAST_END)
        .bind(now)
        .fetch_all(pool)
        .await
}

// endregion: --- Store
