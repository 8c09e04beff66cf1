//! API Module
//!
//! HTTP handlers and routing for the storefront REST API.
//!
//! # Endpoints
//! - `GET /products` - Product listing, cached for the listing ttl
//! - `GET /products/:id` - One product, cached for the product ttl
//! - `POST /payments/create-session` - Payment session for a cart
//! - `GET /cart`, `DELETE /cart` - Session cart
//! - `POST /cart/line-items`, `POST|DELETE /cart/line-items/:item_id` - Line items
//! - `GET /cache/stats` - Cache statistics
//! - `DELETE /cache/:key` - Invalidate a cached value
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
