//! HTTP Backend
//!
//! Store API client over reqwest. Every request carries the publishable key.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error};

use super::{Cart, CommerceBackend, PaymentSession, Product, ProductPage};
use crate::config::BackendSettings;
use crate::error::BackendError;

const PUBLISHABLE_KEY_HEADER: &str = "x-publishable-api-key";
const PAYMENT_PROVIDER: &str = "stripe";

#[derive(Debug, Deserialize)]
struct ProductEnvelope {
    #[serde(default)]
    product: Option<Product>,
}

#[derive(Debug, Deserialize)]
struct CartEnvelope {
    // line item deletion answers with the cart under `parent`
    #[serde(alias = "parent")]
    cart: Cart,
}

#[derive(Debug, Default, Deserialize)]
struct SessionEnvelope {
    #[serde(default)]
    payment_session: Option<SessionBody>,
}

#[derive(Debug, Default, Deserialize)]
struct SessionBody {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    payment_collection_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CollectionEnvelope {
    #[serde(default)]
    payment_collection: Option<CollectionBody>,
}

#[derive(Debug, Default, Deserialize)]
struct CollectionBody {
    #[serde(default)]
    data: Option<CollectionData>,
}

#[derive(Debug, Default, Deserialize)]
struct CollectionData {
    #[serde(default)]
    client_secret: Option<String>,
}

// == HTTP Backend ==
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base: Url,
    publishable_key: String,
}

impl HttpBackend {
    pub fn new(settings: &BackendSettings) -> Result<Self, BackendError> {
        let base = Url::parse(&settings.base_url)
            .map_err(|e| BackendError::Other(format!("Invalid backend URL: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(BackendError::Other(format!(
                "Invalid backend URL: {}",
                settings.base_url
            )));
        }
        let client = Client::builder().user_agent(Self::user_agent()).build()?;
        Ok(Self {
            client,
            base,
            publishable_key: settings.publishable_key.clone(),
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("storefront_cache/", env!("CARGO_PKG_VERSION"))
    }

    /// Joins path segments onto the base URL, escaping each one.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        self.client
            .request(method, self.url(segments))
            .header(PUBLISHABLE_KEY_HEADER, &self.publishable_key)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        resource: &str,
    ) -> Result<T, BackendError> {
        let resp = request.send().await?;
        Self::handle(resp, resource).await
    }

    async fn handle<T: DeserializeOwned>(resp: Response, resource: &str) -> Result<T, BackendError> {
        let status = resp.status();
        let bytes = resp.bytes().await?;
        if status == StatusCode::NOT_FOUND {
            return Err(BackendError::NotFound(resource.to_string()));
        }
        if !status.is_success() {
            let text = String::from_utf8_lossy(&bytes).into_owned();
            return Err(BackendError::Status {
                status: status.as_u16(),
                message: text,
            });
        }
        serde_json::from_slice(&bytes).map_err(|e| BackendError::Decode(e.to_string()))
    }
}

/// Keeps the status of a failed payment call but replaces the body with `message`.
fn payment_failure(err: BackendError, message: &str) -> BackendError {
    match err.status() {
        Some(status) => {
            error!(status, error = %err, "{}", message);
            BackendError::Status {
                status,
                message: message.to_string(),
            }
        }
        None => err,
    }
}

#[async_trait]
impl CommerceBackend for HttpBackend {
    async fn fetch_product_list(&self) -> Result<ProductPage, BackendError> {
        debug!("Fetching product list");
        self.send(self.request(Method::GET, &["store", "products"]), "products")
            .await
    }

    async fn fetch_product(&self, id: &str) -> Result<Option<Product>, BackendError> {
        debug!(product_id = id, "Fetching product");
        let envelope: ProductEnvelope = self
            .send(self.request(Method::GET, &["store", "products", id]), "product")
            .await?;
        Ok(envelope.product)
    }

    async fn create_payment_session(&self, cart_id: &str) -> Result<PaymentSession, BackendError> {
        debug!(cart_id, "Creating payment session");
        let request = self
            .request(Method::POST, &["store", "payment-sessions"])
            .json(&json!({ "cart_id": cart_id, "provider_id": PAYMENT_PROVIDER }));
        let session: SessionEnvelope = self
            .send(request, "payment session")
            .await
            .map_err(|e| payment_failure(e, "Failed to create payment session"))?;

        let session = session.payment_session.unwrap_or_default();
        let collection_id = session.payment_collection_id.ok_or_else(|| {
            error!(cart_id, "No payment collection id in payment session response");
            BackendError::Other("Invalid payment session response".to_string())
        })?;

        debug!(payment_collection_id = %collection_id, "Retrieving payment collection");
        let collection: CollectionEnvelope = self
            .send(
                self.request(Method::GET, &["store", "payment-collections", collection_id.as_str()]),
                "payment collection",
            )
            .await
            .map_err(|e| payment_failure(e, "Failed to retrieve payment collection"))?;

        let client_secret = collection
            .payment_collection
            .and_then(|c| c.data)
            .and_then(|d| d.client_secret)
            .ok_or_else(|| {
                error!(payment_collection_id = %collection_id, "No client secret in payment collection");
                BackendError::Other("Client secret not available".to_string())
            })?;

        Ok(PaymentSession {
            client_secret,
            payment_session_id: session.id,
            payment_collection_id: collection_id,
        })
    }

    async fn create_cart(&self) -> Result<Cart, BackendError> {
        let request = self.request(Method::POST, &["store", "carts"]).json(&json!({}));
        let envelope: CartEnvelope = self.send(request, "cart").await?;
        Ok(envelope.cart)
    }

    async fn retrieve_cart(&self, cart_id: &str) -> Result<Cart, BackendError> {
        let envelope: CartEnvelope = self
            .send(self.request(Method::GET, &["store", "carts", cart_id]), "cart")
            .await?;
        Ok(envelope.cart)
    }

    async fn add_line_item(
        &self,
        cart_id: &str,
        variant_id: &str,
        quantity: u32,
    ) -> Result<Cart, BackendError> {
        let request = self
            .request(Method::POST, &["store", "carts", cart_id, "line-items"])
            .json(&json!({ "variant_id": variant_id, "quantity": quantity }));
        let envelope: CartEnvelope = self.send(request, "cart").await?;
        Ok(envelope.cart)
    }

    async fn update_line_item(
        &self,
        cart_id: &str,
        item_id: &str,
        quantity: u32,
    ) -> Result<Cart, BackendError> {
        let request = self
            .request(Method::POST, &["store", "carts", cart_id, "line-items", item_id])
            .json(&json!({ "quantity": quantity }));
        let envelope: CartEnvelope = self.send(request, "line item").await?;
        Ok(envelope.cart)
    }

    async fn remove_line_item(&self, cart_id: &str, item_id: &str) -> Result<Cart, BackendError> {
        let envelope: CartEnvelope = self
            .send(
                self.request(Method::DELETE, &["store", "carts", cart_id, "line-items", item_id]),
                "line item",
            )
            .await?;
        Ok(envelope.cart)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(base_url: &str) -> HttpBackend {
        HttpBackend::new(&BackendSettings {
            base_url: base_url.to_string(),
            publishable_key: "pk_test".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_url_joins_segments() {
        let backend = backend("http://localhost:9000");
        assert_eq!(
            backend.url(&["store", "products"]).as_str(),
            "http://localhost:9000/store/products"
        );
    }

    #[test]
    fn test_url_keeps_base_path() {
        let backend = backend("http://localhost:9000/medusa");
        assert_eq!(
            backend.url(&["store", "products", "prod_1"]).as_str(),
            "http://localhost:9000/medusa/store/products/prod_1"
        );
    }

    #[test]
    fn test_url_escapes_ids() {
        let backend = backend("http://localhost:9000");
        let url = backend.url(&["store", "products", "a/b c"]);
        assert_eq!(url.as_str(), "http://localhost:9000/store/products/a%2Fb%20c");
    }

    #[test]
    fn test_invalid_base_url() {
        let result = HttpBackend::new(&BackendSettings {
            base_url: "not a url".to_string(),
            publishable_key: "pk".to_string(),
        });
        assert!(matches!(result, Err(BackendError::Other(_))));
    }

    #[test]
    fn test_payment_failure_keeps_status() {
        let err = payment_failure(
            BackendError::Status {
                status: 402,
                message: "raw body".into(),
            },
            "Failed to create payment session",
        );
        match err {
            BackendError::Status { status, message } => {
                assert_eq!(status, 402);
                assert_eq!(message, "Failed to create payment session");
            }
            other => panic!("unexpected {other:?}"),
        }

        let err = payment_failure(BackendError::Decode("bad".into()), "ignored");
        assert!(matches!(err, BackendError::Decode(_)));
    }

    #[test]
    fn test_user_agent() {
        assert!(HttpBackend::user_agent().starts_with("storefront_cache/"));
    }
}
