//! Order and customer records

use serde::{Deserialize, Serialize};

/// Line item of an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub item_name: String,
    pub quantity: i64,
    pub price: f64,
}

/// Order creation payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreate {
    pub order_id: String,
    pub customer_id: String,
    pub product_name: String,
    #[serde(default)]
    pub product_model: Option<String>,
    pub order_date: String,
    pub status: String,
    pub total_amount: f64,
    #[serde(default)]
    pub items: Vec<OrderItem>,
}

/// Stored order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_id: String,
    pub customer_id: String,
    pub product_name: String,
    pub product_model: Option<String>,
    pub order_date: String,
    pub status: String,
    pub total_amount: Option<f64>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub items: Vec<OrderItem>,
}

/// Customer creation payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerCreate {
    pub customer_id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Stored customer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: i64,
    pub customer_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: String,
}
