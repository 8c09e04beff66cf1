//! Request DTOs for the storefront API

use serde::Deserialize;

/// Request body for POST /payments/create-session
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateSessionRequest {
    #[serde(rename = "cartId", default)]
    pub cart_id: Option<String>,
}

impl CreateSessionRequest {
    /// Returns the cart id, or the validation message when it is missing or blank.
    pub fn validate(&self) -> Result<&str, String> {
        match self.cart_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => Ok(id),
            _ => Err("Cart ID is required".to_string()),
        }
    }
}

fn default_quantity() -> u32 {
    1
}

/// Request body for POST /cart/line-items
#[derive(Debug, Clone, Deserialize)]
pub struct AddItemRequest {
    #[serde(rename = "variantId", default)]
    pub variant_id: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

impl AddItemRequest {
    pub fn validate(&self) -> Result<&str, String> {
        match self.variant_id.trim() {
            "" => Err("Variant ID is required".to_string()),
            id => Ok(id),
        }
    }
}

/// Request body for POST /cart/line-items/:item_id
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_session_request_deserialize() {
        let req: CreateSessionRequest = serde_json::from_str(r#"{"cartId": "cart_01"}"#).unwrap();
        assert_eq!(req.validate(), Ok("cart_01"));
    }

    #[test]
    fn test_missing_cart_id() {
        let req: CreateSessionRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req.validate().unwrap_err(), "Cart ID is required");
    }

    #[test]
    fn test_add_item_request_defaults_to_one() {
        let req: AddItemRequest = serde_json::from_str(r#"{"variantId": "variant_1"}"#).unwrap();
        assert_eq!(req.quantity, 1);
        assert_eq!(req.validate(), Ok("variant_1"));

        let req: AddItemRequest = serde_json::from_str(r#"{"quantity": 2}"#).unwrap();
        assert_eq!(req.validate().unwrap_err(), "Variant ID is required");
    }

    #[test]
    fn test_blank_cart_id() {
        let req = CreateSessionRequest {
            cart_id: Some("  ".to_string()),
        };
        assert!(req.validate().is_err());
    }
}
