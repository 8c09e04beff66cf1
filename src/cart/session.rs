//! Cart Session
//!
//! Holds the active cart and forwards line-item mutations to the backend.
//! The cart id is remembered in an [`IdentifierStore`] so a restarted
//! session picks the same cart back up.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use super::IdentifierStore;
use crate::backend::{Cart, CommerceBackend};
use crate::error::{BackendError, CartError};

/// Name the active cart id is stored under.
pub const CART_ID_KEY: &str = "cart_id";

#[derive(Debug, Default)]
struct CartState {
    cart_id: Option<String>,
    cart: Option<Cart>,
}

/// Clears the loading flag when an operation ends, however it ends.
struct LoadingGuard<'a>(&'a AtomicBool);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

// == Cart Session ==
pub struct CartSession {
    backend: Arc<dyn CommerceBackend>,
    ids: Arc<dyn IdentifierStore>,
    state: RwLock<CartState>,
    /// Serializes mutations
    ops: Mutex<()>,
    loading: AtomicBool,
}

impl CartSession {
    pub fn new(backend: Arc<dyn CommerceBackend>, ids: Arc<dyn IdentifierStore>) -> Self {
        Self {
            backend,
            ids,
            state: RwLock::new(CartState::default()),
            ops: Mutex::new(()),
            loading: AtomicBool::new(false),
        }
    }

    fn begin(&self) -> LoadingGuard<'_> {
        self.loading.store(true, Ordering::SeqCst);
        LoadingGuard(&self.loading)
    }

    fn adopt(&self, cart: Cart) {
        let mut state = self.state.write();
        state.cart_id = Some(cart.id.clone());
        state.cart = Some(cart);
    }

    fn current_id(&self) -> Option<String> {
        self.state.read().cart_id.clone()
    }

    // == Initialize ==
    /// Resumes the stored cart, or creates one.
    ///
    /// A stored id the backend no longer knows is discarded and replaced.
    pub async fn initialize(&self) -> Result<(), CartError> {
        let _op = self.ops.lock().await;
        let _loading = self.begin();

        let Some(saved) = self.ids.get(CART_ID_KEY)? else {
            self.create_locked().await?;
            return Ok(());
        };

        match self.backend.retrieve_cart(&saved).await {
            Ok(cart) => {
                info!(cart_id = %cart.id, "Resumed stored cart");
                self.adopt(cart);
                Ok(())
            }
            Err(BackendError::NotFound(_)) => {
                warn!(cart_id = %saved, "Invalid cart, creating new one");
                self.ids.remove(CART_ID_KEY)?;
                self.create_locked().await?;
                Ok(())
            }
            Err(err) => {
                error!(cart_id = %saved, error = %err, "Failed to validate stored cart");
                Err(err.into())
            }
        }
    }

    // == Create Cart ==
    pub async fn create_cart(&self) -> Result<Cart, CartError> {
        let _op = self.ops.lock().await;
        let _loading = self.begin();
        self.create_locked().await
    }

    async fn create_locked(&self) -> Result<Cart, CartError> {
        let cart = self.backend.create_cart().await.map_err(|err| {
            error!(error = %err, "Failed to create cart");
            err
        })?;
        self.ids.set(CART_ID_KEY, &cart.id)?;
        info!(cart_id = %cart.id, "Created cart");
        self.adopt(cart.clone());
        Ok(cart)
    }

    // == Line Items ==
    /// Adds `quantity` of a variant, creating a cart first if there is none.
    pub async fn add_item(&self, variant_id: &str, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }
        let _op = self.ops.lock().await;
        let _loading = self.begin();

        let cart_id = match self.current_id() {
            Some(id) => id,
            None => self.create_locked().await?.id,
        };
        let cart = self
            .backend
            .add_line_item(&cart_id, variant_id, quantity)
            .await
            .map_err(|err| {
                error!(cart_id = %cart_id, variant_id, error = %err, "Failed to add item to cart");
                err
            })?;
        self.adopt(cart);
        Ok(())
    }

    /// Removes a line item. Without an active cart this does nothing.
    pub async fn remove_item(&self, item_id: &str) -> Result<(), CartError> {
        let _op = self.ops.lock().await;
        let Some(cart_id) = self.current_id() else {
            return Ok(());
        };
        let _loading = self.begin();

        let cart = self
            .backend
            .remove_line_item(&cart_id, item_id)
            .await
            .map_err(|err| {
                error!(cart_id = %cart_id, item_id, error = %err, "Failed to remove item from cart");
                err
            })?;
        self.adopt(cart);
        Ok(())
    }

    /// Sets the quantity of a line item. Without an active cart this does nothing.
    pub async fn update_quantity(&self, item_id: &str, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }
        let _op = self.ops.lock().await;
        let Some(cart_id) = self.current_id() else {
            return Ok(());
        };
        let _loading = self.begin();

        let cart = self
            .backend
            .update_line_item(&cart_id, item_id, quantity)
            .await
            .map_err(|err| {
                error!(cart_id = %cart_id, item_id, error = %err, "Failed to update quantity");
                err
            })?;
        self.adopt(cart);
        Ok(())
    }

    // == Clear ==
    /// Forgets the active cart here and in the identifier store.
    pub async fn clear(&self) -> Result<(), CartError> {
        let _op = self.ops.lock().await;
        *self.state.write() = CartState::default();
        self.ids.remove(CART_ID_KEY)
    }

    // == Accessors ==
    pub fn cart_id(&self) -> Option<String> {
        self.current_id()
    }

    pub fn cart(&self) -> Option<Cart> {
        self.state.read().cart.clone()
    }

    pub fn item_count(&self) -> usize {
        self.state
            .read()
            .cart
            .as_ref()
            .map_or(0, |cart| cart.items.len())
    }

    pub fn total(&self) -> f64 {
        self.state.read().cart.as_ref().map_or(0.0, |cart| cart.total)
    }

    /// True while a backend call for this session is in progress.
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::cart::MemoryIdentifierStore;

    fn setup() -> (Arc<MemoryBackend>, Arc<MemoryIdentifierStore>, CartSession) {
        let backend = Arc::new(MemoryBackend::new());
        backend.set_price("variant_1", 30.0);
        backend.set_price("variant_2", 12.5);
        let ids = Arc::new(MemoryIdentifierStore::new());
        let session = CartSession::new(backend.clone(), ids.clone());
        (backend, ids, session)
    }

    #[tokio::test]
    async fn test_initialize_creates_and_persists_cart() {
        let (backend, ids, session) = setup();

        session.initialize().await.unwrap();

        let cart_id = session.cart_id().unwrap();
        assert!(backend.cart_exists(&cart_id));
        assert_eq!(ids.get(CART_ID_KEY).unwrap(), Some(cart_id));
        assert_eq!(session.item_count(), 0);
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn test_initialize_resumes_stored_cart() {
        let (backend, ids, session) = setup();
        session.add_item("variant_1", 1).await.unwrap();
        let cart_id = session.cart_id().unwrap();

        let resumed = CartSession::new(backend.clone(), ids.clone());
        resumed.initialize().await.unwrap();

        assert_eq!(resumed.cart_id(), Some(cart_id));
        assert_eq!(resumed.item_count(), 1);
    }

    #[tokio::test]
    async fn test_initialize_replaces_unknown_cart() {
        let (_, ids, session) = setup();
        ids.set(CART_ID_KEY, "cart_gone").unwrap();

        session.initialize().await.unwrap();

        let cart_id = session.cart_id().unwrap();
        assert_ne!(cart_id, "cart_gone");
        assert_eq!(ids.get(CART_ID_KEY).unwrap(), Some(cart_id));
    }

    #[tokio::test]
    async fn test_initialize_propagates_outage() {
        let (backend, ids, session) = setup();
        ids.set(CART_ID_KEY, "cart_1").unwrap();
        backend.fail_with(503);

        let result = session.initialize().await;

        assert!(matches!(result, Err(CartError::Backend(_))));
        // the stored id is kept for the next attempt
        assert_eq!(ids.get(CART_ID_KEY).unwrap().as_deref(), Some("cart_1"));
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn test_add_item_creates_cart_first() {
        let (_, ids, session) = setup();

        session.add_item("variant_1", 2).await.unwrap();

        assert!(ids.get(CART_ID_KEY).unwrap().is_some());
        assert_eq!(session.item_count(), 1);
        assert_eq!(session.total(), 60.0);
    }

    #[tokio::test]
    async fn test_update_and_remove_items() {
        let (_, _, session) = setup();
        session.add_item("variant_1", 1).await.unwrap();
        session.add_item("variant_2", 2).await.unwrap();
        assert_eq!(session.total(), 55.0);

        let cart = session.cart().unwrap();
        let first = cart.items[0].id.clone();
        session.update_quantity(&first, 3).await.unwrap();
        assert_eq!(session.total(), 115.0);

        session.remove_item(&first).await.unwrap();
        assert_eq!(session.item_count(), 1);
        assert_eq!(session.total(), 25.0);
    }

    #[tokio::test]
    async fn test_mutations_without_cart_are_noops() {
        let (_, ids, session) = setup();

        session.remove_item("item_1").await.unwrap();
        session.update_quantity("item_1", 2).await.unwrap();

        assert!(session.cart_id().is_none());
        assert!(ids.get(CART_ID_KEY).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_zero_quantity_rejected() {
        let (_, _, session) = setup();
        assert!(matches!(
            session.add_item("variant_1", 0).await,
            Err(CartError::InvalidQuantity)
        ));
        assert!(matches!(
            session.update_quantity("item_1", 0).await,
            Err(CartError::InvalidQuantity)
        ));
    }

    #[tokio::test]
    async fn test_clear_forgets_cart() {
        let (_, ids, session) = setup();
        session.add_item("variant_1", 1).await.unwrap();

        session.clear().await.unwrap();

        assert!(session.cart_id().is_none());
        assert!(session.cart().is_none());
        assert_eq!(session.item_count(), 0);
        assert_eq!(session.total(), 0.0);
        assert!(ids.get(CART_ID_KEY).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_mutation_keeps_cart() {
        let (backend, _, session) = setup();
        session.add_item("variant_1", 1).await.unwrap();
        backend.fail_with(500);

        let result = session.add_item("variant_2", 1).await;

        assert!(matches!(result, Err(CartError::Backend(_))));
        assert_eq!(session.item_count(), 1);
        assert!(!session.is_loading());
    }
}
