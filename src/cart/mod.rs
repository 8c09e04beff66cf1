//! Cart Module
//!
//! Cart session state and the durable store that remembers the active cart.

mod identifier;
mod session;

pub use identifier::{FileIdentifierStore, IdentifierStore, MemoryIdentifierStore};
pub use session::{CartSession, CART_ID_KEY};
