//! Catalog Module
//!
//! Cached product retrieval on top of the fetch cache: the product listing
//! under one key, each product under its own key.

use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use tracing::warn;

use crate::backend::{CommerceBackend, Product, ProductPage};
use crate::cache::{FetchCache, WatchedInputs};
use crate::error::{BackendError, FetchError};

/// Cache key of the product listing.
pub const PRODUCTS_KEY: &str = "products-list";

/// Cache key of a single product.
pub fn product_key(id: &str) -> String {
    format!("product-{}", id)
}

/// Values stored in the catalog cache.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogPayload {
    Listing(ProductPage),
    Product(Option<Product>),
}

impl CatalogPayload {
    fn into_listing(self: Arc<Self>) -> ProductPage {
        match &*self {
            CatalogPayload::Listing(page) => page.clone(),
            CatalogPayload::Product(_) => {
                warn!(key = PRODUCTS_KEY, "Listing key holds a product payload, serving empty listing");
                ProductPage::default()
            }
        }
    }

    fn into_product(self: Arc<Self>) -> Option<Product> {
        match &*self {
            CatalogPayload::Product(product) => product.clone(),
            CatalogPayload::Listing(_) => {
                warn!("Product key holds a listing payload, serving no product");
                None
            }
        }
    }
}

// == Catalog ==
#[derive(Clone)]
pub struct Catalog {
    cache: FetchCache<CatalogPayload>,
    backend: Arc<dyn CommerceBackend>,
    products_ttl: Duration,
    product_ttl: Duration,
}

impl Catalog {
    pub fn new(
        cache: FetchCache<CatalogPayload>,
        backend: Arc<dyn CommerceBackend>,
        products_ttl: Duration,
        product_ttl: Duration,
    ) -> Self {
        Self {
            cache,
            backend,
            products_ttl,
            product_ttl,
        }
    }

    pub fn cache(&self) -> &FetchCache<CatalogPayload> {
        &self.cache
    }

    pub fn backend(&self) -> &Arc<dyn CommerceBackend> {
        &self.backend
    }

    fn list_loader(
        &self,
    ) -> impl FnOnce() -> BoxFuture<'static, Result<CatalogPayload, BackendError>> {
        let backend = Arc::clone(&self.backend);
        move || {
            async move {
                backend
                    .fetch_product_list()
                    .await
                    .map(CatalogPayload::Listing)
            }
            .boxed()
        }
    }

    fn product_loader(
        &self,
        id: &str,
    ) -> impl FnOnce() -> BoxFuture<'static, Result<CatalogPayload, BackendError>> {
        let backend = Arc::clone(&self.backend);
        let id = id.to_string();
        move || {
            async move {
                backend
                    .fetch_product(&id)
                    .await
                    .map(CatalogPayload::Product)
            }
            .boxed()
        }
    }

    // == Product Listing ==
    /// The product listing, served from cache while younger than the listing ttl.
    pub async fn product_page(&self) -> Result<ProductPage, FetchError> {
        self.cache
            .get_or_fetch(PRODUCTS_KEY, self.products_ttl, self.list_loader())
            .await
            .map(CatalogPayload::into_listing)
    }

    pub async fn refresh_product_page(&self) -> Result<ProductPage, FetchError> {
        self.cache
            .refresh(PRODUCTS_KEY, self.list_loader())
            .await
            .map(CatalogPayload::into_listing)
    }

    // == Product Detail ==
    /// One product, served from cache while younger than the product ttl.
    pub async fn product(&self, id: &str) -> Result<Option<Product>, FetchError> {
        if id.is_empty() {
            return Err(FetchError::InvalidKey);
        }
        self.cache
            .get_or_fetch(&product_key(id), self.product_ttl, self.product_loader(id))
            .await
            .map(CatalogPayload::into_product)
    }

    pub async fn refresh_product(&self, id: &str) -> Result<Option<Product>, FetchError> {
        if id.is_empty() {
            return Err(FetchError::InvalidKey);
        }
        self.cache
            .refresh(&product_key(id), self.product_loader(id))
            .await
            .map(CatalogPayload::into_product)
    }

    pub fn listing(&self) -> ProductListing {
        ProductListing {
            catalog: self.clone(),
        }
    }

    pub fn detail(&self) -> ProductDetail {
        ProductDetail {
            catalog: self.clone(),
            watch: WatchedInputs::new(),
            id: None,
        }
    }
}

// == Views ==
/// Listing as a page sees it: last good snapshot plus fetch status.
#[derive(Debug, Clone, Default)]
pub struct ProductsView {
    pub items: Vec<Product>,
    pub count: u64,
    pub pending: bool,
    pub error: Option<FetchError>,
}

/// One product as a page sees it.
#[derive(Debug, Clone, Default)]
pub struct ProductView {
    pub item: Option<Product>,
    pub pending: bool,
    pub error: Option<FetchError>,
}

// == Product Listing ==
/// Subscriber to the product listing. Loads never fail; failures land in
/// the view's `error` next to the last good snapshot.
#[derive(Clone)]
pub struct ProductListing {
    catalog: Catalog,
}

impl ProductListing {
    pub async fn load(&self) -> ProductsView {
        if let Err(err) = self.catalog.product_page().await {
            warn!(error = %err, "Product listing unavailable");
        }
        self.view()
    }

    pub async fn refresh(&self) -> ProductsView {
        if let Err(err) = self.catalog.refresh_product_page().await {
            warn!(error = %err, "Product listing refresh failed");
        }
        self.view()
    }

    /// Current state without suspending.
    pub fn view(&self) -> ProductsView {
        let state = self.catalog.cache.state(PRODUCTS_KEY);
        let page = state.value.map(CatalogPayload::into_listing).unwrap_or_default();
        ProductsView {
            items: page.products,
            count: page.count,
            pending: state.pending,
            error: state.error,
        }
    }
}

// == Product Detail ==
/// Subscriber to one product at a time. Switching to another id forces a
/// fetch of that product even if it is cached and fresh.
pub struct ProductDetail {
    catalog: Catalog,
    watch: WatchedInputs<String>,
    id: Option<String>,
}

impl ProductDetail {
    pub async fn load(&mut self, id: &str) -> ProductView {
        self.id = Some(id.to_string());
        // an empty id still counts as a switch for the next load
        let inputs = [id.to_string()];
        if id.is_empty() {
            self.watch.observe(&inputs);
            return ProductView {
                error: Some(FetchError::InvalidKey),
                ..ProductView::default()
            };
        }

        let loader = self.catalog.product_loader(id);
        let result = self
            .catalog
            .cache
            .get_or_fetch_watched(
                &mut self.watch,
                &product_key(id),
                self.catalog.product_ttl,
                &inputs,
                loader,
            )
            .await;
        if let Err(err) = result {
            warn!(product_id = id, error = %err, "Product unavailable");
        }
        self.view()
    }

    /// Refetches the tracked product. Without one, returns the empty view.
    pub async fn refresh(&mut self) -> ProductView {
        let Some(id) = self.id.clone() else {
            return ProductView::default();
        };
        if let Err(err) = self.catalog.refresh_product(&id).await {
            warn!(product_id = %id, error = %err, "Product refresh failed");
        }
        self.view()
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn view(&self) -> ProductView {
        let Some(id) = self.id.as_deref() else {
            return ProductView::default();
        };
        if id.is_empty() {
            return ProductView {
                error: Some(FetchError::InvalidKey),
                ..ProductView::default()
            };
        }
        let state = self.catalog.cache.state(&product_key(id));
        ProductView {
            item: state.value.and_then(CatalogPayload::into_product),
            pending: state.pending,
            error: state.error,
        }
    }
}
