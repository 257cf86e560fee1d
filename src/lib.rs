pub mod auction;
pub mod bidding;
pub mod database;
pub mod error;
pub mod handlers;
pub mod ledger;
pub mod scheduler;
