// region:    --- Imports
use crate::auction::lifecycle;
use crate::auction::model::{AuctionStateView, CreateAuctionCommand};
use crate::auction::store;
use crate::bidding::commands::handle_place_bid;
use crate::bidding::model::{PlaceBidCommand, PlaceBidOutcome};
use crate::bidding::validator;
use crate::database::DatabaseManager;
use crate::error::EngineError;
use crate::ledger::{BidLedger, PostgresBidLedger};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

// endregion: --- Imports

pub type AppState = (Arc<DatabaseManager>, Arc<PostgresBidLedger>);

// region:    --- Error Mapping

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            EngineError::AuctionNotFound(_) => (StatusCode::NOT_FOUND, "AUCTION_NOT_FOUND"),
            EngineError::InvalidAuction(_) => (StatusCode::BAD_REQUEST, "INVALID_AUCTION"),
            EngineError::InvalidState(_) => (StatusCode::CONFLICT, "INVALID_STATE"),
            EngineError::ConcurrencyConflict { .. } => {
                (StatusCode::SERVICE_UNAVAILABLE, "RETRY_EXHAUSTED")
            }
            EngineError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
        };
        (
            status,
            Json(serde_json::json!({ "error": self.to_string(), "code": code })),
        )
            .into_response()
    }
}

// endregion: --- Error Mapping

// region:    --- Command Handlers

/// Bid placement endpoint.
pub async fn handle_bid(
    State((db, ledger)): State<AppState>,
    Json(cmd): Json<PlaceBidCommand>,
) -> Response {
    match handle_place_bid(cmd, ledger.as_ref(), &db).await {
        Ok(PlaceBidOutcome::Accepted(accepted)) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "message": "bid accepted",
                "bid": accepted.bid,
                "current_highest_amount": accepted.current_highest_amount,
                "current_highest_bidder": accepted.current_highest_bidder,
            })),
        )
            .into_response(),
        Ok(PlaceBidOutcome::Rejected(rejection)) => {
            // Flatten the rejection into the body so clients see the `code`
            // (and `min_acceptable` for BID_TOO_LOW) at the top level.
            let mut body = serde_json::json!({ "error": rejection.message() });
            if let (Some(object), serde_json::Value::Object(fields)) = (
                body.as_object_mut(),
                serde_json::to_value(rejection).unwrap_or_default(),
            ) {
                object.extend(fields);
            }
            (StatusCode::BAD_REQUEST, Json(body)).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Auction creation, invoked by the catalogue collaborator when a seller
/// lists an item.
pub async fn handle_create_auction(
    State((db, _)): State<AppState>,
    Json(cmd): Json<CreateAuctionCommand>,
) -> Response {
    match lifecycle::create_auction(&db, cmd).await {
        Ok(auction) => (StatusCode::CREATED, Json(auction)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Closes an auction past its end time. Idempotent; the response is the
/// (auction_id, winner_id, winning_amount) hand-off to the order service.
pub async fn handle_finalize_auction(
    State((db, ledger)): State<AppState>,
    Path(auction_id): Path<Uuid>,
) -> Response {
    match lifecycle::finalize(&db, ledger.as_ref(), auction_id).await {
        Ok(finalized) => (StatusCode::OK, Json(finalized)).into_response(),
        Err(e) => e.into_response(),
    }
}

// endregion: --- Command Handlers

// region:    --- Query Handlers

/// Auction state, with the status recomputed from the clock and the floor
/// the next bid has to clear.
pub async fn handle_get_auction(
    State((db, _)): State<AppState>,
    Path(auction_id): Path<Uuid>,
) -> Response {
    info!("{:<12} --> auction state for {}", "HandlerQuery", auction_id);
    let auction = match store::get_auction(&db, auction_id).await {
        Ok(Some(auction)) => auction,
        Ok(None) => return EngineError::AuctionNotFound(auction_id).into_response(),
        Err(e) => return e.into_response(),
    };
    let now = Utc::now();
    let view = AuctionStateView {
        effective_status: lifecycle::effective_status(&auction, now),
        remaining_time_seconds: lifecycle::remaining_seconds(&auction, now),
        min_acceptable_bid: validator::min_acceptable(&auction),
        auction,
    };
    Json(view).into_response()
}

/// All auctions, newest first.
pub async fn handle_list_auctions(State((db, _)): State<AppState>) -> Response {
    info!("{:<12} --> list auctions", "HandlerQuery");
    match store::list_auctions(&db).await {
        Ok(auctions) => Json(auctions).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Top of the bid ledger for one auction.
pub async fn handle_get_highest_bid(
    State((_, ledger)): State<AppState>,
    Path(auction_id): Path<Uuid>,
) -> Response {
    info!("{:<12} --> highest bid for {}", "HandlerQuery", auction_id);
    match ledger.current_highest(auction_id).await {
        Ok(highest) => Json(highest).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Bid history, highest first.
pub async fn handle_get_bid_history(
    State((_, ledger)): State<AppState>,
    Path(auction_id): Path<Uuid>,
) -> Response {
    info!("{:<12} --> bid history for {}", "HandlerQuery", auction_id);
    match ledger.history(auction_id).await {
        Ok(bids) => Json(bids).into_response(),
        Err(e) => e.into_response(),
    }
}

// endregion: --- Query Handlers
