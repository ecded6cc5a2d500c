//! SQLite database for orders, order items, and customers

use parking_lot::Mutex;
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::types::{Customer, CustomerCreate, Order, OrderCreate, OrderItem, Row};

/// Schema summary handed to the model when it writes SQL
pub const SCHEMA_DESCRIPTION: &str = "\
Database Schema (SQLite):
- orders: id, order_id (unique), customer_id, product_name, product_model, order_date, status, total_amount, created_at, updated_at
- order_items: id, order_id (references orders.order_id), item_name, quantity, price
- customers: id, customer_id (unique), name, email, phone, created_at";

/// Virtual machine steps between deadline checks
const PROGRESS_STEPS: i32 = 1000;

const ORDER_COLUMNS: &str = "id, order_id, customer_id, product_name, product_model, \
                             order_date, status, total_amount, created_at, updated_at";

/// SQLite-backed order database
pub struct OrderDb {
    conn: Arc<Mutex<Connection>>,
}

impl OrderDb {
    /// Create or open the database at the given path
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)
            .map_err(|e| Error::Database(format!("Failed to open database: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.migrate()?;
        Ok(db)
    }

    /// Create an in-memory database
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::Database(format!("Failed to open in-memory database: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.migrate()?;
        Ok(db)
    }

    /// Run database migrations
    fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            PRAGMA foreign_keys=ON;
        "#,
        )
        .map_err(|e| Error::Database(format!("Failed to set pragmas: {}", e)))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS orders (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                order_id TEXT UNIQUE NOT NULL,
                customer_id TEXT NOT NULL,
                product_name TEXT NOT NULL,
                product_model TEXT,
                order_date TEXT NOT NULL,
                status TEXT NOT NULL,
                total_amount REAL,
                created_at TEXT DEFAULT CURRENT_TIMESTAMP,
                updated_at TEXT DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_orders_customer_id ON orders(customer_id);

            CREATE TABLE IF NOT EXISTS order_items (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                order_id TEXT NOT NULL,
                item_name TEXT NOT NULL,
                quantity INTEGER NOT NULL,
                price REAL NOT NULL,
                FOREIGN KEY (order_id) REFERENCES orders(order_id)
            );

            CREATE INDEX IF NOT EXISTS idx_order_items_order_id ON order_items(order_id);

            CREATE TABLE IF NOT EXISTS customers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                customer_id TEXT UNIQUE NOT NULL,
                name TEXT NOT NULL,
                email TEXT,
                phone TEXT,
                created_at TEXT DEFAULT CURRENT_TIMESTAMP
            );
        "#,
        )
        .map_err(|e| Error::Database(format!("Failed to create tables: {}", e)))?;

        Ok(())
    }

    /// Execute one read-only statement, returning at most `max_rows` rows as
    /// column maps. SQLite aborts the statement once `deadline` has elapsed,
    /// so a runaway query releases the connection on its own.
    pub fn execute_read(
        &self,
        sql: &str,
        deadline: Duration,
        max_rows: usize,
    ) -> Result<Vec<Row>> {
        let conn = self.conn.lock();

        let started = Instant::now();
        conn.progress_handler(PROGRESS_STEPS, Some(move || started.elapsed() >= deadline));
        let rows = Self::collect_rows(&conn, sql, max_rows, deadline);
        conn.progress_handler(PROGRESS_STEPS, None::<fn() -> bool>);

        rows
    }

    fn collect_rows(
        conn: &Connection,
        sql: &str,
        max_rows: usize,
        deadline: Duration,
    ) -> Result<Vec<Row>> {
        let mut stmt = conn.prepare(sql)?;

        if !stmt.readonly() {
            return Err(Error::UnsafeQuery(sql.to_string()));
        }

        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let mut rows = stmt
            .query_map([], |row| {
                let mut map = Row::new();
                for (i, name) in names.iter().enumerate() {
                    map.insert(name.clone(), value_to_json(row.get_ref(i)?));
                }
                Ok(map)
            })?
            .take(max_rows.saturating_add(1))
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| match e.sqlite_error_code() {
                Some(ErrorCode::OperationInterrupted) => {
                    Error::Database(format!("Query interrupted after {:?}", deadline))
                }
                _ => Error::from(e),
            })?;

        if rows.len() > max_rows {
            tracing::debug!("Query returned more than {} rows, truncating", max_rows);
            rows.truncate(max_rows);
        }
        Ok(rows)
    }

    /// Insert an order and its items in one transaction
    pub fn create_order(&self, order: &OrderCreate) -> Result<Order> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO orders (order_id, customer_id, product_name, product_model, \
             order_date, status, total_amount) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                order.order_id,
                order.customer_id,
                order.product_name,
                order.product_model,
                order.order_date,
                order.status,
                order.total_amount,
            ],
        )?;

        for item in &order.items {
            tx.execute(
                "INSERT INTO order_items (order_id, item_name, quantity, price) \
                 VALUES (?1, ?2, ?3, ?4)",
                params![order.order_id, item.item_name, item.quantity, item.price],
            )?;
        }

        tx.commit()?;

        Self::fetch_order(&conn, &order.order_id)?
            .ok_or_else(|| Error::Internal(format!("Order {} vanished after insert", order.order_id)))
    }

    /// Get order by public id
    pub fn get_order(&self, order_id: &str) -> Result<Option<Order>> {
        let conn = self.conn.lock();
        Self::fetch_order(&conn, order_id)
    }

    /// All orders of a customer, newest order date first
    pub fn orders_for_customer(&self, customer_id: &str) -> Result<Vec<Order>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM orders WHERE customer_id = ?1 ORDER BY order_date DESC",
            ORDER_COLUMNS
        ))?;

        let orders = stmt
            .query_map(params![customer_id], Self::row_to_order)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        orders
            .into_iter()
            .map(|mut order| {
                order.items = Self::fetch_items(&conn, &order.order_id)?;
                Ok(order)
            })
            .collect()
    }

    /// Insert a customer
    pub fn create_customer(&self, customer: &CustomerCreate) -> Result<Customer> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO customers (customer_id, name, email, phone) VALUES (?1, ?2, ?3, ?4)",
            params![customer.customer_id, customer.name, customer.email, customer.phone],
        )?;

        Self::fetch_customer(&conn, &customer.customer_id)?.ok_or_else(|| {
            Error::Internal(format!("Customer {} vanished after insert", customer.customer_id))
        })
    }

    /// Get customer by public id
    pub fn get_customer(&self, customer_id: &str) -> Result<Option<Customer>> {
        let conn = self.conn.lock();
        Self::fetch_customer(&conn, customer_id)
    }

    fn fetch_order(conn: &Connection, order_id: &str) -> Result<Option<Order>> {
        let order = conn
            .query_row(
                &format!("SELECT {} FROM orders WHERE order_id = ?1", ORDER_COLUMNS),
                params![order_id],
                Self::row_to_order,
            )
            .optional()?;

        match order {
            Some(mut order) => {
                order.items = Self::fetch_items(conn, order_id)?;
                Ok(Some(order))
            }
            None => Ok(None),
        }
    }

    fn fetch_items(conn: &Connection, order_id: &str) -> Result<Vec<OrderItem>> {
        let mut stmt = conn.prepare(
            "SELECT item_name, quantity, price FROM order_items WHERE order_id = ?1 ORDER BY id",
        )?;
        let items = stmt
            .query_map(params![order_id], |row| {
                Ok(OrderItem {
                    item_name: row.get(0)?,
                    quantity: row.get(1)?,
                    price: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(items)
    }

    fn fetch_customer(conn: &Connection, customer_id: &str) -> Result<Option<Customer>> {
        let customer = conn
            .query_row(
                "SELECT id, customer_id, name, email, phone, created_at \
                 FROM customers WHERE customer_id = ?1",
                params![customer_id],
                |row| {
                    Ok(Customer {
                        id: row.get(0)?,
                        customer_id: row.get(1)?,
                        name: row.get(2)?,
                        email: row.get(3)?,
                        phone: row.get(4)?,
                        created_at: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
                    })
                },
            )
            .optional()?;
        Ok(customer)
    }

    fn row_to_order(row: &rusqlite::Row<'_>) -> rusqlite::Result<Order> {
        Ok(Order {
            id: row.get(0)?,
            order_id: row.get(1)?,
            customer_id: row.get(2)?,
            product_name: row.get(3)?,
            product_model: row.get(4)?,
            order_date: row.get(5)?,
            status: row.get(6)?,
            total_amount: row.get(7)?,
            created_at: row.get::<_, Option<String>>(8)?.unwrap_or_default(),
            updated_at: row.get::<_, Option<String>>(9)?.unwrap_or_default(),
            items: Vec::new(),
        })
    }
}

fn value_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::String(hex::encode(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUDGET: Duration = Duration::from_secs(5);

    /// Counts forever unless interrupted
    const RUNAWAY: &str = "WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c) \
                           SELECT count(*) FROM c";

    fn sample_order(order_id: &str, customer_id: &str, date: &str) -> OrderCreate {
        OrderCreate {
            order_id: order_id.to_string(),
            customer_id: customer_id.to_string(),
            product_name: "Router X200".to_string(),
            product_model: Some("X200".to_string()),
            order_date: date.to_string(),
            status: "shipped".to_string(),
            total_amount: 129.99,
            items: vec![OrderItem {
                item_name: "Router X200".to_string(),
                quantity: 1,
                price: 129.99,
            }],
        }
    }

    #[test]
    fn test_create_and_get_order() {
        let db = OrderDb::in_memory().unwrap();
        let created = db.create_order(&sample_order("12345", "C1", "2024-05-01")).unwrap();

        assert_eq!(created.order_id, "12345");
        assert_eq!(created.items.len(), 1);
        assert!(!created.created_at.is_empty());

        let fetched = db.get_order("12345").unwrap().unwrap();
        assert_eq!(fetched.status, "shipped");
        assert_eq!(fetched.total_amount, Some(129.99));
        assert!(db.get_order("missing").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_order_is_conflict() {
        let db = OrderDb::in_memory().unwrap();
        db.create_order(&sample_order("1", "C1", "2024-01-01")).unwrap();

        let err = db.create_order(&sample_order("1", "C1", "2024-01-02")).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[test]
    fn test_orders_for_customer_newest_first() {
        let db = OrderDb::in_memory().unwrap();
        db.create_order(&sample_order("A", "C1", "2024-01-01")).unwrap();
        db.create_order(&sample_order("B", "C1", "2024-03-01")).unwrap();
        db.create_order(&sample_order("C", "C2", "2024-02-01")).unwrap();

        let orders = db.orders_for_customer("C1").unwrap();
        let ids: Vec<&str> = orders.iter().map(|o| o.order_id.as_str()).collect();
        assert_eq!(ids, vec!["B", "A"]);
    }

    #[test]
    fn test_customers() {
        let db = OrderDb::in_memory().unwrap();
        let customer = CustomerCreate {
            customer_id: "C1".to_string(),
            name: "Ada".to_string(),
            email: Some("ada@example.com".to_string()),
            phone: None,
        };

        let created = db.create_customer(&customer).unwrap();
        assert_eq!(created.name, "Ada");
        assert!(matches!(db.create_customer(&customer), Err(Error::Conflict(_))));
        assert_eq!(db.get_customer("C1").unwrap().unwrap().email.as_deref(), Some("ada@example.com"));
    }

    #[test]
    fn test_execute_read_returns_column_maps() {
        let db = OrderDb::in_memory().unwrap();
        db.create_order(&sample_order("12345", "C1", "2024-05-01")).unwrap();

        let rows = db
            .execute_read(
                "SELECT order_id, status, total_amount, product_model FROM orders",
                BUDGET,
                100,
            )
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["order_id"], "12345");
        assert_eq!(rows[0]["status"], "shipped");
        assert_eq!(rows[0]["total_amount"], 129.99);
    }

    #[test]
    fn test_execute_read_refuses_writes() {
        let db = OrderDb::in_memory().unwrap();
        let err = db.execute_read("DELETE FROM orders", BUDGET, 100).unwrap_err();
        assert!(matches!(err, Error::UnsafeQuery(_)));
    }

    #[test]
    fn test_execute_read_reports_sqlite_message() {
        let db = OrderDb::in_memory().unwrap();
        let err = db.execute_read("SELECT * FROM shipments", BUDGET, 100).unwrap_err();
        assert!(err.to_string().contains("no such table: shipments"));
    }

    #[test]
    fn test_execute_read_caps_rows() {
        let db = OrderDb::in_memory().unwrap();
        let rows = db
            .execute_read(
                "WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c LIMIT 1000) \
                 SELECT x FROM c",
                BUDGET,
                10,
            )
            .unwrap();

        assert_eq!(rows.len(), 10);
        assert_eq!(rows[9]["x"], 10);
    }

    #[test]
    fn test_runaway_read_is_interrupted() {
        let db = OrderDb::in_memory().unwrap();

        let started = Instant::now();
        let err = db
            .execute_read(RUNAWAY, Duration::from_millis(50), 100)
            .unwrap_err();
        assert!(err.to_string().contains("interrupted"), "{}", err);
        assert!(started.elapsed() < BUDGET);

        // The connection is free again and the deadline no longer applies
        db.create_order(&sample_order("12345", "C1", "2024-05-01")).unwrap();
        let rows = db
            .execute_read("SELECT order_id FROM orders", BUDGET, 100)
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_file_backed_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("orders.db");

        {
            let db = OrderDb::new(&path).unwrap();
            db.create_order(&sample_order("9", "C9", "2024-09-09")).unwrap();
        }

        let db = OrderDb::new(&path).unwrap();
        assert!(db.get_order("9").unwrap().is_some());
    }
}
