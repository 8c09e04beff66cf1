//! Request and Response models for the storefront API
//!
//! DTOs used for serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

pub use requests::{AddItemRequest, CreateSessionRequest, UpdateItemRequest};
pub use responses::{
    CartResponse, ErrorResponse, HealthResponse, InvalidateResponse, PaymentSessionResponse,
    ProductResponse, ProductsResponse, StatsResponse,
};
