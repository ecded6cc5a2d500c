//! Relational store trait for order and customer records

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Customer, CustomerCreate, Order, OrderCreate, Row};

/// Structured order store
///
/// Implementations:
/// - `SqliteOrderStore`: bundled SQLite
#[async_trait]
pub trait RelationalStore: Send + Sync {
    /// Run one read-only statement, returning rows as column-name maps
    async fn execute_read(&self, sql: &str) -> Result<Vec<Row>>;

    /// Insert an order and its items atomically
    async fn create_order(&self, order: &OrderCreate) -> Result<Order>;

    /// Look up an order by its public id
    async fn get_order(&self, order_id: &str) -> Result<Option<Order>>;

    /// All orders of a customer, newest first
    async fn orders_for_customer(&self, customer_id: &str) -> Result<Vec<Order>>;

    /// Insert a customer
    async fn create_customer(&self, customer: &CustomerCreate) -> Result<Customer>;

    /// Look up a customer by public id
    async fn get_customer(&self, customer_id: &str) -> Result<Option<Customer>>;

    /// Schema summary given to the model for query synthesis
    fn schema_description(&self) -> &str;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
