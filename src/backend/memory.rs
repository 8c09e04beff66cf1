//! In-memory Backend
//!
//! A self-contained catalog and cart store with call counters and switchable
//! failures. Test support for the cache, catalog, cart and router; the server
//! binary always talks to the HTTP backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Map;

use super::{Cart, CommerceBackend, LineItem, PaymentSession, Product, ProductPage};
use crate::error::BackendError;

#[derive(Debug, Default)]
struct Catalog {
    products: Vec<Product>,
    carts: HashMap<String, Cart>,
    /// Variant id to unit price
    prices: HashMap<String, f64>,
    /// Answer every call with this status while set
    outage: Option<u16>,
}

#[derive(Debug, Default)]
pub struct MemoryBackend {
    catalog: RwLock<Catalog>,
    next_id: AtomicU64,
    product_list_calls: AtomicUsize,
    product_calls: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_products(products: Vec<Product>) -> Self {
        let backend = Self::new();
        backend.catalog.write().products = products;
        backend
    }

    pub fn set_products(&self, products: Vec<Product>) {
        self.catalog.write().products = products;
    }

    pub fn set_price(&self, variant_id: &str, unit_price: f64) {
        self.catalog
            .write()
            .prices
            .insert(variant_id.to_string(), unit_price);
    }

    /// Makes every call fail with `status` until [`restore`](Self::restore).
    pub fn fail_with(&self, status: u16) {
        self.catalog.write().outage = Some(status);
    }

    pub fn restore(&self) {
        self.catalog.write().outage = None;
    }

    pub fn product_list_calls(&self) -> usize {
        self.product_list_calls.load(Ordering::SeqCst)
    }

    pub fn product_calls(&self) -> usize {
        self.product_calls.load(Ordering::SeqCst)
    }

    pub fn cart_exists(&self, cart_id: &str) -> bool {
        self.catalog.read().carts.contains_key(cart_id)
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{}_{}", prefix, self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn check_outage(catalog: &Catalog) -> Result<(), BackendError> {
        match catalog.outage {
            Some(status) => Err(BackendError::Status {
                status,
                message: "Backend unavailable".to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Applies `change` to a stored cart and recomputes its total.
    fn mutate_cart(
        &self,
        cart_id: &str,
        change: impl FnOnce(&mut Cart) -> Result<(), BackendError>,
    ) -> Result<Cart, BackendError> {
        let mut guard = self.catalog.write();
        let catalog = &mut *guard;
        Self::check_outage(catalog)?;
        let cart = catalog
            .carts
            .get_mut(cart_id)
            .ok_or_else(|| BackendError::NotFound("cart".to_string()))?;
        change(cart)?;
        cart.total = cart
            .items
            .iter()
            .map(|item| {
                let price = item
                    .variant_id
                    .as_ref()
                    .and_then(|v| catalog.prices.get(v))
                    .copied()
                    .unwrap_or(0.0);
                price * f64::from(item.quantity)
            })
            .sum();
        Ok(cart.clone())
    }
}

#[async_trait]
impl CommerceBackend for MemoryBackend {
    async fn fetch_product_list(&self) -> Result<ProductPage, BackendError> {
        self.product_list_calls.fetch_add(1, Ordering::SeqCst);
        let catalog = self.catalog.read();
        Self::check_outage(&catalog)?;
        Ok(ProductPage {
            products: catalog.products.clone(),
            count: catalog.products.len() as u64,
        })
    }

    async fn fetch_product(&self, id: &str) -> Result<Option<Product>, BackendError> {
        self.product_calls.fetch_add(1, Ordering::SeqCst);
        let catalog = self.catalog.read();
        Self::check_outage(&catalog)?;
        catalog
            .products
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .map(Some)
            .ok_or_else(|| BackendError::NotFound("product".to_string()))
    }

    async fn create_payment_session(&self, cart_id: &str) -> Result<PaymentSession, BackendError> {
        let catalog = self.catalog.read();
        Self::check_outage(&catalog)?;
        if !catalog.carts.contains_key(cart_id) {
            return Err(BackendError::NotFound("cart".to_string()));
        }
        drop(catalog);
        Ok(PaymentSession {
            client_secret: format!("secret_{}", cart_id),
            payment_session_id: Some(self.next_id("payses")),
            payment_collection_id: self.next_id("paycol"),
        })
    }

    async fn create_cart(&self) -> Result<Cart, BackendError> {
        let cart = Cart {
            id: self.next_id("cart"),
            items: Vec::new(),
            total: 0.0,
            extra: Map::new(),
        };
        let mut catalog = self.catalog.write();
        Self::check_outage(&catalog)?;
        catalog.carts.insert(cart.id.clone(), cart.clone());
        Ok(cart)
    }

    async fn retrieve_cart(&self, cart_id: &str) -> Result<Cart, BackendError> {
        let catalog = self.catalog.read();
        Self::check_outage(&catalog)?;
        catalog
            .carts
            .get(cart_id)
            .cloned()
            .ok_or_else(|| BackendError::NotFound("cart".to_string()))
    }

    async fn add_line_item(
        &self,
        cart_id: &str,
        variant_id: &str,
        quantity: u32,
    ) -> Result<Cart, BackendError> {
        let item_id = self.next_id("item");
        self.mutate_cart(cart_id, |cart| {
            match cart
                .items
                .iter_mut()
                .find(|item| item.variant_id.as_deref() == Some(variant_id))
            {
                Some(item) => item.quantity += quantity,
                None => cart.items.push(LineItem {
                    id: item_id,
                    variant_id: Some(variant_id.to_string()),
                    quantity,
                    extra: Map::new(),
                }),
            }
            Ok(())
        })
    }

    async fn update_line_item(
        &self,
        cart_id: &str,
        item_id: &str,
        quantity: u32,
    ) -> Result<Cart, BackendError> {
        self.mutate_cart(cart_id, |cart| {
            let item = cart
                .items
                .iter_mut()
                .find(|item| item.id == item_id)
                .ok_or_else(|| BackendError::NotFound("line item".to_string()))?;
            item.quantity = quantity;
            Ok(())
        })
    }

    async fn remove_line_item(&self, cart_id: &str, item_id: &str) -> Result<Cart, BackendError> {
        self.mutate_cart(cart_id, |cart| {
            let before = cart.items.len();
            cart.items.retain(|item| item.id != item_id);
            if cart.items.len() == before {
                return Err(BackendError::NotFound("line item".to_string()));
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_product_lookup() {
        let backend = MemoryBackend::with_products(vec![Product::new("prod_1", "Nocturne")]);

        let product = backend.fetch_product("prod_1").await.unwrap();
        assert_eq!(product.unwrap().id, "prod_1");
        assert!(matches!(
            backend.fetch_product("prod_2").await,
            Err(BackendError::NotFound(_))
        ));
        assert_eq!(backend.product_calls(), 2);
    }

    #[tokio::test]
    async fn test_outage() {
        let backend = MemoryBackend::new();
        backend.fail_with(503);
        assert!(matches!(
            backend.fetch_product_list().await,
            Err(BackendError::Status { status: 503, .. })
        ));

        backend.restore();
        assert!(backend.fetch_product_list().await.is_ok());
    }

    #[tokio::test]
    async fn test_cart_totals() {
        let backend = MemoryBackend::new();
        backend.set_price("variant_1", 25.0);
        let cart = backend.create_cart().await.unwrap();

        let cart = backend.add_line_item(&cart.id, "variant_1", 2).await.unwrap();
        assert_eq!(cart.total, 50.0);

        let cart = backend.add_line_item(&cart.id, "variant_1", 1).await.unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.total, 75.0);

        let item_id = cart.items[0].id.clone();
        let cart = backend.remove_line_item(&cart.id, &item_id).await.unwrap();
        assert!(cart.items.is_empty());
        assert_eq!(cart.total, 0.0);
    }
}
