use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Decimal string as sent by the server, e.g. `"12.50"`
    pub price: String,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub image_url: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_active() -> bool {
    true
}

impl Product {
    pub fn in_stock(&self) -> bool {
        self.is_active && self.stock > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_product() {
        let json = r#"{"id": 3, "name": "Mug", "description": "", "price": "9.90", "stock": 4, "image_url": "", "is_active": true, "created_at": "2024-05-01T10:00:00Z", "updated_at": "2024-05-02T10:00:00.123456Z"}"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.id, 3);
        assert_eq!(product.price, "9.90");
        assert!(product.in_stock());
        assert!(product.created_at.is_some());
    }

    #[test]
    fn test_out_of_stock() {
        let json = r#"{"id": 1, "name": "Lamp", "price": "20.00", "stock": 0}"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert!(!product.in_stock());
    }
}
