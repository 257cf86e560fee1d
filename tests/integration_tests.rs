//! End-to-end tests against a running service instance.
//!
//! These need `DATABASE_URL` pointing at a Postgres the service has
//! initialized, plus the server itself on `localhost:3000`, so they are
//! `#[ignore]`d by default:
//!
//! ```sh
//! cargo run &
//! cargo test -- --ignored
//! ```

use bidding_engine::database::DatabaseManager;
use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

const BASE_URL: &str = "http://localhost:3000";

async fn setup() -> Arc<DatabaseManager> {
    Arc::new(DatabaseManager::new().await)
}

/// Creates an auction through the API and returns its id.
async fn create_auction(
    client: &Client,
    seller_id: Uuid,
    starting_price: i64,
    min_increment: i64,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
) -> Value {
    let body = json!({
        "item_id": Uuid::new_v4(),
        "seller_id": seller_id,
        "starting_price": starting_price,
        "min_increment": min_increment,
        "start_time": start_time,
        "end_time": end_time,
    });
    let response = client
        .post(format!("{BASE_URL}/auctions"))
        .json(&body)
        .send()
        .await
        .expect("failed to create auction");
    assert_eq!(response.status(), StatusCode::CREATED);
    response.json().await.expect("invalid auction body")
}

async fn place_bid(client: &Client, auction_id: &str, bidder_id: Uuid, amount: i64) -> (StatusCode, Value) {
    let response = client
        .post(format!("{BASE_URL}/bid"))
        .json(&json!({
            "auction_id": auction_id,
            "bidder_id": bidder_id,
            "amount": amount,
        }))
        .send()
        .await
        .expect("failed to send bid");
    let status = response.status();
    let body = response.json().await.expect("invalid bid response body");
    (status, body)
}

#[tokio::test]
#[ignore = "requires a running Postgres and service instance"]
async fn end_to_end_forward_auction() {
    let client = Client::new();
    let seller = Uuid::new_v4();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();

    let now = Utc::now();
    let auction = create_auction(&client, seller, 5000, 100, now, now + Duration::seconds(5)).await;
    let auction_id = auction["auction_id"].as_str().unwrap().to_string();

    // First bid at the starting price is accepted.
    let (status, body) = place_bid(&client, &auction_id, alice, 5000).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["current_highest_amount"], 5000);

    // One increment short: rejected with the exact minimum to retry with.
    let (status, body) = place_bid(&client, &auction_id, bob, 5050).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BID_TOO_LOW");
    assert_eq!(body["min_acceptable"], 5100);

    // Exactly the increment: accepted.
    let (status, body) = place_bid(&client, &auction_id, bob, 5100).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["current_highest_amount"], 5100);

    // The ledger agrees with the bid response.
    let highest: Value = client
        .get(format!("{BASE_URL}/auctions/{auction_id}/highest-bid"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(highest["amount"], 5100);
    assert_eq!(highest["bidder_id"].as_str().unwrap(), bob.to_string());

    // Sellers never bid, whatever the amount.
    let (status, body) = place_bid(&client, &auction_id, seller, 100_000).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "SELF_BID");

    // Wait out the auction, then bid past the end time.
    tokio::time::sleep(std::time::Duration::from_secs(6)).await;
    let (status, body) = place_bid(&client, &auction_id, alice, 6000).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "ALREADY_ENDED");

    // Finalize resolves the highest bid as the winner.
    let response = client
        .post(format!("{BASE_URL}/auctions/{auction_id}/finalize"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let finalized: Value = response.json().await.unwrap();
    assert_eq!(finalized["winner_id"].as_str().unwrap(), bob.to_string());
    assert_eq!(finalized["winning_amount"], 5100);

    // Finalize is idempotent: same result, no new side effects.
    let response = client
        .post(format!("{BASE_URL}/auctions/{auction_id}/finalize"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let again: Value = response.json().await.unwrap();
    assert_eq!(again, finalized);
}

#[tokio::test]
#[ignore = "requires a running Postgres and service instance"]
async fn bid_before_the_start_time_is_rejected() {
    let client = Client::new();
    let now = Utc::now();
    let auction = create_auction(
        &client,
        Uuid::new_v4(),
        5000,
        100,
        now + Duration::hours(1),
        now + Duration::hours(2),
    )
    .await;
    assert_eq!(auction["status"], "SCHEDULED");

    let auction_id = auction["auction_id"].as_str().unwrap();
    let (status, body) = place_bid(&client, auction_id, Uuid::new_v4(), 5000).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "NOT_STARTED");
}

#[tokio::test]
#[ignore = "requires a running Postgres and service instance"]
async fn finalize_without_bids_yields_no_winner() {
    let client = Client::new();
    let now = Utc::now();
    let auction = create_auction(
        &client,
        Uuid::new_v4(),
        5000,
        100,
        now,
        now + Duration::seconds(2),
    )
    .await;
    let auction_id = auction["auction_id"].as_str().unwrap();

    tokio::time::sleep(std::time::Duration::from_secs(3)).await;

    let response = client
        .post(format!("{BASE_URL}/auctions/{auction_id}/finalize"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let finalized: Value = response.json().await.unwrap();
    assert!(finalized["winner_id"].is_null());
    assert!(finalized["winning_bid_id"].is_null());
    assert!(finalized["winning_amount"].is_null());
}

#[tokio::test]
#[ignore = "requires a running Postgres and service instance"]
async fn finalize_before_the_end_time_is_an_invalid_state() {
    let client = Client::new();
    let now = Utc::now();
    let auction = create_auction(
        &client,
        Uuid::new_v4(),
        5000,
        100,
        now,
        now + Duration::hours(1),
    )
    .await;
    let auction_id = auction["auction_id"].as_str().unwrap();

    let response = client
        .post(format!("{BASE_URL}/auctions/{auction_id}/finalize"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

/// Under concurrent bidding the accepted sequence is strictly increasing,
/// the cached highest equals the ledger maximum, and the retry loop never
/// leaks a conflict to callers.
#[tokio::test]
#[ignore = "requires a running Postgres and service instance"]
async fn concurrent_bids_stay_strictly_ordered() {
    let db = setup().await;
    let client = Client::new();
    let now = Utc::now();
    let auction = create_auction(
        &client,
        Uuid::new_v4(),
        10_000,
        100,
        now,
        now + Duration::hours(1),
    )
    .await;
    let auction_id = auction["auction_id"].as_str().unwrap().to_string();

    let mut handles = vec![];
    for i in 1..=50i64 {
        let auction_id = auction_id.clone();
        let handle = tokio::spawn(async move {
            let client = Client::new();
            let response = client
                .post(format!("{BASE_URL}/bid"))
                .json(&json!({
                    "auction_id": auction_id,
                    "bidder_id": Uuid::new_v4(),
                    "amount": 10_000 + i * 100,
                }))
                .send()
                .await
                .unwrap();
            let status = response.status();
            let body: Value = response.json().await.unwrap();
            (status, body)
        });
        handles.push(handle);
    }

    let mut accepted: usize = 0;
    let mut rejected: usize = 0;
    for handle in handles {
        let (status, body) = handle.await.unwrap();
        match status {
            StatusCode::OK => accepted += 1,
            StatusCode::BAD_REQUEST => {
                assert_eq!(body["code"], "BID_TOO_LOW");
                rejected += 1;
            }
            other => panic!("unexpected status {other}: {body}"),
        }
    }
    assert!(accepted >= 1);
    assert_eq!(accepted + rejected, 50);

    // The ledger must be strictly decreasing when read highest-first.
    let bids: Vec<Value> = client
        .get(format!("{BASE_URL}/auctions/{auction_id}/bids"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(bids.len(), accepted);
    let amounts: Vec<i64> = bids.iter().map(|b| b["amount"].as_i64().unwrap()).collect();
    assert!(amounts.windows(2).all(|w| w[0] > w[1]));

    // The cached highest on the auction row equals the ledger maximum.
    let auction_uuid: Uuid = auction_id.parse().unwrap();
    let cached: Option<i64> = db
        .transaction(|tx| {
            Box::pin(async move {
                sqlx::query_scalar::<_, Option<i64>>(
                    "SELECT current_highest_amount FROM auctions WHERE auction_id = $1",
                )
                .bind(auction_uuid)
                .fetch_one(&mut **tx)
                .await
            })
        })
        .await
        .unwrap();
    assert_eq!(cached, amounts.first().copied());
}
