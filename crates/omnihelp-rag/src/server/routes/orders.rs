//! Order and customer records

use axum::{
    extract::{Path, State},
    Json,
};

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{Customer, CustomerCreate, Order, OrderCreate};

/// POST /api/v1/orders
pub async fn create_order(
    State(state): State<AppState>,
    Json(order): Json<OrderCreate>,
) -> Result<Json<Order>> {
    if order.order_id.trim().is_empty() || order.customer_id.trim().is_empty() {
        return Err(Error::InvalidQuery(
            "order_id and customer_id are required".to_string(),
        ));
    }

    let created = state.store().create_order(&order).await?;
    tracing::info!("Created order {} ({} items)", created.order_id, created.items.len());
    Ok(Json(created))
}

/// GET /api/v1/orders/:order_id
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Json<Order>> {
    state
        .store()
        .get_order(&order_id)
        .await?
        .map(Json)
        .ok_or_else(|| Error::NotFound(format!("Order {}", order_id)))
}

/// POST /api/v1/customers
pub async fn create_customer(
    State(state): State<AppState>,
    Json(customer): Json<CustomerCreate>,
) -> Result<Json<Customer>> {
    if customer.customer_id.trim().is_empty() {
        return Err(Error::InvalidQuery("customer_id is required".to_string()));
    }

    let created = state.store().create_customer(&customer).await?;
    tracing::info!("Created customer {}", created.customer_id);
    Ok(Json(created))
}

/// GET /api/v1/customers/:customer_id
pub async fn get_customer(
    State(state): State<AppState>,
    Path(customer_id): Path<String>,
) -> Result<Json<Customer>> {
    state
        .store()
        .get_customer(&customer_id)
        .await?
        .map(Json)
        .ok_or_else(|| Error::NotFound(format!("Customer {}", customer_id)))
}

/// GET /api/v1/customers/:customer_id/orders - Newest first
pub async fn customer_orders(
    State(state): State<AppState>,
    Path(customer_id): Path<String>,
) -> Result<Json<Vec<Order>>> {
    let orders = state.store().orders_for_customer(&customer_id).await?;
    Ok(Json(orders))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::testing::test_state;
    use crate::types::OrderItem;

    fn order(order_id: &str, order_date: &str) -> OrderCreate {
        OrderCreate {
            order_id: order_id.to_string(),
            customer_id: "C1".to_string(),
            product_name: "Switch S8".to_string(),
            product_model: None,
            order_date: order_date.to_string(),
            status: "processing".to_string(),
            total_amount: 49.5,
            items: vec![OrderItem {
                item_name: "Switch S8".to_string(),
                quantity: 1,
                price: 49.5,
            }],
        }
    }

    #[tokio::test]
    async fn test_create_and_fetch_order() {
        let state = test_state();

        let Json(created) = create_order(State(state.clone()), Json(order("A-1", "2024-06-01")))
            .await
            .unwrap();
        assert_eq!(created.items.len(), 1);

        let Json(fetched) = get_order(State(state), Path("A-1".to_string()))
            .await
            .unwrap();
        assert_eq!(fetched.status, "processing");
        assert_eq!(fetched.total_amount, Some(49.5));
    }

    #[tokio::test]
    async fn test_duplicate_order_conflicts() {
        let state = test_state();
        let err = create_order(State(state), Json(order("12345", "2024-06-01")))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn test_missing_order_is_not_found() {
        let err = get_order(State(test_state()), Path("nope".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Order nope not found");
    }

    #[tokio::test]
    async fn test_customer_orders_newest_first() {
        let state = test_state();
        let Json(created) = create_order(State(state.clone()), Json(order("A-2", "2024-07-01")))
            .await
            .unwrap();
        assert_eq!(created.customer_id, "C1");

        let Json(orders) = customer_orders(State(state), Path("C1".to_string()))
            .await
            .unwrap();
        let ids: Vec<&str> = orders.iter().map(|o| o.order_id.as_str()).collect();
        assert_eq!(ids, vec!["A-2", "12345"]);
    }

    #[tokio::test]
    async fn test_customer_round_trip() {
        let state = test_state();
        let customer = CustomerCreate {
            customer_id: "C9".to_string(),
            name: "Dana".to_string(),
            email: Some("dana@example.com".to_string()),
            phone: None,
        };

        let Json(created) = create_customer(State(state.clone()), Json(customer.clone()))
            .await
            .unwrap();
        assert_eq!(created.name, "Dana");
        let Json(fetched) = get_customer(State(state.clone()), Path("C9".to_string()))
            .await
            .unwrap();
        assert_eq!(fetched.email.as_deref(), Some("dana@example.com"));

        let err = create_customer(State(state), Json(customer)).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }
}
