use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Product;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub id: i64,
    #[serde(default)]
    pub items: Vec<CartItem>,
    /// Computed by the server, sent as a JSON number
    #[serde(deserialize_with = "super::decimal::string_or_number")]
    pub total: String,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Cart {
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: i64,
    pub product: Product,
    pub quantity: u32,
    /// Decimal string
    pub subtotal: String,
    pub added_at: Option<DateTime<Utc>>,
}

/// Body of `POST /cart/items/`
#[derive(Debug, Clone, Serialize)]
pub struct NewCartItem {
    pub product_id: i64,
    pub quantity: u32,
}

/// Body of `PATCH /cart/items/{id}/`
#[derive(Debug, Clone, Serialize)]
pub struct CartItemUpdate {
    pub quantity: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cart() {
        let json = r#"{"id": 7, "total": 19.8, "updated_at": "2024-05-01T10:00:00Z", "items": [
            {"id": 11, "quantity": 2, "subtotal": "19.80", "added_at": "2024-05-01T09:00:00Z",
             "product": {"id": 3, "name": "Mug", "price": "9.90", "stock": 4}}
        ]}"#;
        let cart: Cart = serde_json::from_str(json).unwrap();
        assert_eq!(cart.item_count(), 2);
        assert!(!cart.is_empty());
        assert_eq!(cart.items[0].product.name, "Mug");
        assert_eq!(cart.total, "19.8");
        assert_eq!(cart.items[0].subtotal, "19.80");
    }

    #[test]
    fn test_cart_total_as_string() {
        let cart: Cart = serde_json::from_str(r#"{"id": 1, "total": "0.00", "items": [], "updated_at": null}"#).unwrap();
        assert_eq!(cart.total, "0.00");
        assert!(cart.is_empty());
    }
}
