//! Storefront Cache - product catalog and checkout server for a headless store
//!
//! Fronts a commerce backend with a time-bounded, request-deduplicating fetch
//! cache and keeps cart session state.

pub mod api;
pub mod backend;
pub mod cache;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod error;
pub mod models;

pub use api::AppState;
pub use cache::FetchCache;
pub use catalog::Catalog;
pub use config::Config;
