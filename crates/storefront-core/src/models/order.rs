use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Product;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Paid,
    Prepared,
    ReadyToShip,
    Shipped,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl OrderStatus {
    pub fn display_name(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Paid => "Paid",
            OrderStatus::Prepared => "Prepared",
            OrderStatus::ReadyToShip => "Ready to ship",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Cancelled => "Cancelled",
            OrderStatus::Unknown => "Unknown",
        }
    }

    /// Only pending orders can be paid
    pub fn is_payable(&self) -> bool {
        matches!(self, OrderStatus::Pending)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderOwner {
    pub id: i64,
    pub username: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub user: Option<OrderOwner>,
    pub status: OrderStatus,
    /// Decimal string
    pub total_amount: String,
    pub placed_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub product: Product,
    pub quantity: u32,
    #[serde(default)]
    pub prepared_quantity: u32,
    /// Decimal string
    pub unit_price: String,
    /// Computed by the server, sent as a JSON number
    #[serde(deserialize_with = "super::decimal::string_or_number")]
    pub subtotal: String,
}
