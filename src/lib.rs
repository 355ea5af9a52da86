pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod filter;
pub mod models;
pub mod service;
pub mod state;
pub mod validation;

#[cfg(test)]
pub mod tests;

pub use api::error::ApiError;
pub use api::route::create_router;
pub use filter::{ListingQuery, Pagination};
pub use state::AppState;
