//! API Handlers
//!
//! HTTP request handlers for the storefront endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::{error, info};

use crate::backend::{CommerceBackend, HttpBackend};
use crate::cache::{CacheOptions, FetchCache, SystemClock};
use crate::cart::{CartSession, FileIdentifierStore};
use crate::catalog::Catalog;
use crate::config::Config;
use crate::error::{AppError, BackendError, Result};
use crate::models::{
    AddItemRequest, CartResponse, CreateSessionRequest, HealthResponse, InvalidateResponse,
    PaymentSessionResponse, ProductResponse, ProductsResponse, StatsResponse, UpdateItemRequest,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Catalog,
    pub cart: Arc<CartSession>,
}

impl AppState {
    pub fn new(catalog: Catalog, cart: Arc<CartSession>) -> Self {
        Self { catalog, cart }
    }

    /// Builds the HTTP backend, the catalog cache and the cart session from
    /// configuration. The cart id is kept in the file at `cart_store_path`.
    ///
    /// Fails when the backend URL or publishable key is missing.
    pub fn from_config(config: &Config) -> Result<Self> {
        let settings = config.backend_settings()?;
        let backend = HttpBackend::new(&settings)
            .map_err(|err| AppError::Configuration(err.to_string()))?;
        let cache = FetchCache::with_options(
            Arc::new(SystemClock),
            CacheOptions {
                loader_timeout: config.loader_timeout(),
                max_entries: config.max_entries(),
            },
        );
        let backend: Arc<dyn CommerceBackend> = Arc::new(backend);
        let ids = Arc::new(FileIdentifierStore::new(&config.cart_store_path));
        let cart = Arc::new(CartSession::new(Arc::clone(&backend), ids));
        let catalog = Catalog::new(
            cache,
            backend,
            config.products_ttl(),
            config.product_ttl(),
        );
        Ok(Self::new(catalog, cart))
    }
}

/// Handler for GET /products
pub async fn products_handler(State(state): State<AppState>) -> Result<Json<ProductsResponse>> {
    let page = state.catalog.product_page().await.map_err(|err| {
        error!(error = %err, "Error fetching products");
        AppError::Internal("Failed to fetch products from backend".to_string())
    })?;

    Ok(Json(ProductsResponse::from(page)))
}

/// Handler for GET /products/:id
///
/// Only a backend 404 becomes a 404 here; a success without a product
/// answers `{"product": null}`.
pub async fn product_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProductResponse>> {
    match state.catalog.product(&id).await {
        Ok(product) => Ok(Json(ProductResponse { product })),
        Err(err) if err.is_not_found() => Err(AppError::NotFound("Product not found".to_string())),
        Err(err) => {
            error!(product_id = %id, error = %err, "Error fetching product");
            Err(AppError::Internal(
                "Failed to fetch product from backend".to_string(),
            ))
        }
    }
}

/// Handler for POST /payments/create-session
///
/// A failure the backend answered with a status is forwarded with that status.
pub async fn create_session_handler(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<Json<PaymentSessionResponse>> {
    let cart_id = req.validate().map_err(AppError::InvalidRequest)?;

    let session = state
        .catalog
        .backend()
        .create_payment_session(cart_id)
        .await
        .map_err(|err| {
            error!(cart_id, error = %err, "Error creating payment session");
            payment_error(err)
        })?;

    info!(cart_id, payment_collection_id = %session.payment_collection_id, "Payment session created");
    Ok(Json(PaymentSessionResponse::from(session)))
}

fn payment_error(err: BackendError) -> AppError {
    let status = err
        .status()
        .and_then(|code| StatusCode::from_u16(code).ok());
    match (status, err) {
        (Some(status), BackendError::Status { message, .. }) => {
            AppError::Upstream { status, message }
        }
        (Some(status), _) => AppError::Upstream {
            status,
            message: "Failed to create payment session".to_string(),
        },
        (None, BackendError::Other(message)) => AppError::Internal(message),
        (None, _) => AppError::Internal("Failed to create payment session".to_string()),
    }
}

/// Handler for GET /cart
pub async fn cart_handler(State(state): State<AppState>) -> Json<CartResponse> {
    Json(CartResponse::from(state.cart.as_ref()))
}

/// Handler for POST /cart/line-items
///
/// Creates a cart first when the session has none.
pub async fn add_item_handler(
    State(state): State<AppState>,
    Json(req): Json<AddItemRequest>,
) -> Result<Json<CartResponse>> {
    let variant_id = req.validate().map_err(AppError::InvalidRequest)?;
    state.cart.add_item(variant_id, req.quantity).await?;
    Ok(Json(CartResponse::from(state.cart.as_ref())))
}

/// Handler for POST /cart/line-items/:item_id
pub async fn update_item_handler(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
    Json(req): Json<UpdateItemRequest>,
) -> Result<Json<CartResponse>> {
    state.cart.update_quantity(&item_id, req.quantity).await?;
    Ok(Json(CartResponse::from(state.cart.as_ref())))
}

/// Handler for DELETE /cart/line-items/:item_id
pub async fn remove_item_handler(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
) -> Result<Json<CartResponse>> {
    state.cart.remove_item(&item_id).await?;
    Ok(Json(CartResponse::from(state.cart.as_ref())))
}

/// Handler for DELETE /cart
///
/// Forgets the session's cart; the next added item starts a new one.
pub async fn clear_cart_handler(State(state): State<AppState>) -> Result<Json<CartResponse>> {
    state.cart.clear().await?;
    info!("Cart cleared");
    Ok(Json(CartResponse::from(state.cart.as_ref())))
}

/// Handler for GET /cache/stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::from(state.catalog.cache().stats()))
}

/// Handler for DELETE /cache/:key
///
/// Drops the cached value so the next lookup refetches it.
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<InvalidateResponse>> {
    if !state.catalog.cache().invalidate(&key) {
        return Err(AppError::NotFound(format!("Key '{}' not cached", key)));
    }
    info!(key = %key, "Cache entry invalidated");
    Ok(Json(InvalidateResponse::new(key)))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::backend::{MemoryBackend, Product};
    use crate::cache::ManualClock;
    use crate::cart::MemoryIdentifierStore;

    fn test_state() -> (Arc<MemoryBackend>, AppState) {
        let backend = Arc::new(MemoryBackend::with_products(vec![
            Product::new("prod_1", "Nocturne"),
            Product::new("prod_2", "Aubade"),
        ]));
        backend.set_price("variant_1", 15.0);
        let catalog = Catalog::new(
            FetchCache::new(Arc::new(ManualClock::default())),
            backend.clone(),
            Duration::from_secs(300),
            Duration::from_secs(600),
        );
        let cart = CartSession::new(backend.clone(), Arc::new(MemoryIdentifierStore::new()));
        (backend, AppState::new(catalog, Arc::new(cart)))
    }

    #[tokio::test]
    async fn test_products_handler() {
        let (backend, state) = test_state();

        let response = products_handler(State(state.clone())).await.unwrap();
        assert_eq!(response.count, 2);

        products_handler(State(state)).await.unwrap();
        assert_eq!(backend.product_list_calls(), 1);
    }

    #[tokio::test]
    async fn test_products_handler_backend_down() {
        let (backend, state) = test_state();
        backend.fail_with(503);

        let err = products_handler(State(state)).await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to fetch products from backend");
    }

    #[tokio::test]
    async fn test_product_handler_not_found() {
        let (_, state) = test_state();

        let err = product_handler(State(state), Path("missing".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(err.to_string(), "Product not found");
    }

    #[tokio::test]
    async fn test_create_session_requires_cart_id() {
        let (_, state) = test_state();

        let err = create_session_handler(State(state), Json(CreateSessionRequest::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_create_session_forwards_status() {
        let (backend, state) = test_state();
        backend.fail_with(422);

        let req = CreateSessionRequest {
            cart_id: Some("cart_1".to_string()),
        };
        let err = create_session_handler(State(state), Json(req))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Upstream { status, .. } if status == StatusCode::UNPROCESSABLE_ENTITY
        ));
    }

    #[tokio::test]
    async fn test_invalidate_handler() {
        let (backend, state) = test_state();
        products_handler(State(state.clone())).await.unwrap();

        invalidate_handler(State(state.clone()), Path("products-list".to_string()))
            .await
            .unwrap();
        products_handler(State(state.clone())).await.unwrap();
        assert_eq!(backend.product_list_calls(), 2);

        let err = invalidate_handler(State(state), Path("product-none".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_stats_handler() {
        let (_, state) = test_state();
        products_handler(State(state.clone())).await.unwrap();
        products_handler(State(state.clone())).await.unwrap();

        let response = stats_handler(State(state)).await;
        assert_eq!(response.misses, 1);
        assert_eq!(response.hits, 1);
        assert_eq!(response.total_entries, 1);
    }

    #[tokio::test]
    async fn test_cart_handlers() {
        let (_, state) = test_state();
        assert!(cart_handler(State(state.clone())).await.cart.is_none());

        let req = AddItemRequest {
            variant_id: "variant_1".to_string(),
            quantity: 2,
        };
        let response = add_item_handler(State(state.clone()), Json(req)).await.unwrap();
        assert!(response.cart_id.is_some());
        assert_eq!(response.item_count, 1);
        assert_eq!(response.total, 30.0);

        let item_id = response.cart.as_ref().unwrap().items[0].id.clone();
        let response = update_item_handler(
            State(state.clone()),
            Path(item_id.clone()),
            Json(UpdateItemRequest { quantity: 4 }),
        )
        .await
        .unwrap();
        assert_eq!(response.total, 60.0);

        let response = remove_item_handler(State(state.clone()), Path(item_id))
            .await
            .unwrap();
        assert_eq!(response.item_count, 0);

        let response = clear_cart_handler(State(state)).await.unwrap();
        assert!(response.cart_id.is_none());
    }

    #[tokio::test]
    async fn test_add_item_rejects_zero_quantity() {
        let (_, state) = test_state();
        let req = AddItemRequest {
            variant_id: "variant_1".to_string(),
            quantity: 0,
        };

        let err = add_item_handler(State(state), Json(req)).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));
    }

    #[test]
    fn test_from_config_requires_backend() {
        assert!(matches!(
            AppState::from_config(&Config::default()),
            Err(AppError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }
}
