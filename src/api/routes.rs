//! API Routes
//!
//! Configures the Axum router with all storefront endpoints.

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    add_item_handler, cart_handler, clear_cart_handler, create_session_handler, health_handler,
    invalidate_handler, product_handler, products_handler, remove_item_handler, stats_handler,
    update_item_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /products` - Cached product listing
/// - `GET /products/:id` - Cached single product
/// - `POST /payments/create-session` - Open a payment session for a cart
/// - `GET /cart`, `DELETE /cart` - The session's cart
/// - `POST /cart/line-items` - Add a variant to the session's cart
/// - `POST|DELETE /cart/line-items/:item_id` - Change or drop a line item
/// - `GET /cache/stats` - Cache counters
/// - `DELETE /cache/:key` - Drop one cached value
/// - `GET /health` - Health check endpoint
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/products", get(products_handler))
        .route("/products/:id", get(product_handler))
        .route("/payments/create-session", post(create_session_handler))
        .route("/cart", get(cart_handler).delete(clear_cart_handler))
        .route("/cart/line-items", post(add_item_handler))
        .route(
            "/cart/line-items/:item_id",
            post(update_item_handler).delete(remove_item_handler),
        )
        .route("/cache/stats", get(stats_handler))
        .route("/cache/:key", delete(invalidate_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
