//! Backend Module
//!
//! The commerce backend as seen by this server: the payloads it returns and
//! the operations the catalog, cart and payment paths call.
//!
//! # Implementations
//! - [`HttpBackend`] - Store API over HTTP
//! - [`MemoryBackend`] - in-process catalog and carts

mod http;
mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::BackendError;

pub use http::HttpBackend;
pub use memory::MemoryBackend;

// == Domain Payloads ==
/// A product. Only `id` and `title` are interpreted; the rest is passed through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Product {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: Some(title.into()),
            extra: Map::new(),
        }
    }
}

/// One page of the product listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductPage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub products: Vec<Product>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<String>,
    #[serde(default)]
    pub quantity: u32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<LineItem>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// What checkout needs to hand the payment form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentSession {
    pub client_secret: String,
    pub payment_session_id: Option<String>,
    pub payment_collection_id: String,
}

/// Treats an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// == Commerce Backend ==
/// Operations this server needs from the commerce backend.
///
/// Every method fails with [`BackendError::NotFound`] on a 404 and
/// [`BackendError::Status`] on any other non-success answer.
#[async_trait]
pub trait CommerceBackend: Send + Sync {
    /// Lists products.
    async fn fetch_product_list(&self) -> Result<ProductPage, BackendError>;

    /// Looks up one product; `None` when the backend answers without one.
    async fn fetch_product(&self, id: &str) -> Result<Option<Product>, BackendError>;

    /// Opens a payment session for a cart and returns its client secret.
    async fn create_payment_session(&self, cart_id: &str) -> Result<PaymentSession, BackendError>;

    async fn create_cart(&self) -> Result<Cart, BackendError>;

    async fn retrieve_cart(&self, cart_id: &str) -> Result<Cart, BackendError>;

    async fn add_line_item(
        &self,
        cart_id: &str,
        variant_id: &str,
        quantity: u32,
    ) -> Result<Cart, BackendError>;

    async fn update_line_item(
        &self,
        cart_id: &str,
        item_id: &str,
        quantity: u32,
    ) -> Result<Cart, BackendError>;

    async fn remove_line_item(&self, cart_id: &str, item_id: &str) -> Result<Cart, BackendError>;
}
