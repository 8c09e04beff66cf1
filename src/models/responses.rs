//! Response DTOs for the storefront API

use serde::Serialize;

use crate::backend::{Cart, PaymentSession, Product, ProductPage};
use crate::cache::CacheStats;
use crate::cart::CartSession;

/// Response body for GET /products
#[derive(Debug, Clone, Serialize)]
pub struct ProductsResponse {
    pub products: Vec<Product>,
    pub count: u64,
}

impl From<ProductPage> for ProductsResponse {
    fn from(page: ProductPage) -> Self {
        Self {
            products: page.products,
            count: page.count,
        }
    }
}

/// Response body for GET /products/:id
///
/// `product` is `null` when the backend answered without one.
#[derive(Debug, Clone, Serialize)]
pub struct ProductResponse {
    pub product: Option<Product>,
}

/// Response body for POST /payments/create-session
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSessionResponse {
    pub client_secret: String,
    pub payment_session_id: Option<String>,
    pub payment_collection_id: String,
}

impl From<PaymentSession> for PaymentSessionResponse {
    fn from(session: PaymentSession) -> Self {
        Self {
            client_secret: session.client_secret,
            payment_session_id: session.payment_session_id,
            payment_collection_id: session.payment_collection_id,
        }
    }
}

/// Response body for every cart endpoint: the session's cart after the call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartResponse {
    pub cart_id: Option<String>,
    pub cart: Option<Cart>,
    pub item_count: usize,
    pub total: f64,
}

impl From<&CartSession> for CartResponse {
    fn from(session: &CartSession) -> Self {
        Self {
            cart_id: session.cart_id(),
            cart: session.cart(),
            item_count: session.item_count(),
            total: session.total(),
        }
    }
}

/// Response body for GET /cache/stats
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub hits: u64,
    pub misses: u64,
    pub joins: u64,
    pub fetches: u64,
    pub failures: u64,
    pub evictions: u64,
    pub total_entries: usize,
    pub in_flight: usize,
    /// Share of lookups served without a new fetch
    pub hit_rate: f64,
}

impl From<CacheStats> for StatsResponse {
    fn from(stats: CacheStats) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            hits: stats.hits,
            misses: stats.misses,
            joins: stats.joins,
            fetches: stats.fetches,
            failures: stats.failures,
            evictions: stats.evictions,
            total_entries: stats.total_entries,
            in_flight: stats.in_flight,
        }
    }
}

/// Response body for GET /health
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Response body for DELETE /cache/:key
#[derive(Debug, Clone, Serialize)]
pub struct InvalidateResponse {
    pub message: String,
    pub key: String,
}

impl InvalidateResponse {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' invalidated", key),
            key,
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_session_response_is_camel_case() {
        let resp = PaymentSessionResponse::from(PaymentSession {
            client_secret: "pi_secret".to_string(),
            payment_session_id: Some("payses_1".to_string()),
            payment_collection_id: "paycol_1".to_string(),
        });
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["clientSecret"], "pi_secret");
        assert_eq!(json["paymentSessionId"], "payses_1");
        assert_eq!(json["paymentCollectionId"], "paycol_1");
    }

    #[test]
    fn test_products_response_from_page() {
        let resp = ProductsResponse::from(ProductPage {
            products: vec![Product::new("prod_1", "Nocturne")],
            count: 7,
        });
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["count"], 7);
        assert_eq!(json["products"][0]["id"], "prod_1");
    }

    #[test]
    fn test_product_response_without_product_is_null() {
        let json = serde_json::to_string(&ProductResponse { product: None }).unwrap();
        assert_eq!(json, r#"{"product":null}"#);
    }

    #[test]
    fn test_stats_response_hit_rate() {
        let mut stats = CacheStats::new();
        for _ in 0..3 {
            stats.record_hit();
        }
        stats.record_miss();
        let resp = StatsResponse::from(stats);
        assert!((resp.hit_rate - 0.75).abs() < 0.001);
    }

    #[test]
    fn test_health_response_serialize() {
        let json = serde_json::to_string(&HealthResponse::healthy()).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
    }

    #[test]
    fn test_error_response_serialize() {
        let json = serde_json::to_string(&ErrorResponse::new("Product not found")).unwrap();
        assert_eq!(json, r#"{"error":"Product not found"}"#);
    }
}
