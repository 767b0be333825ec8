//! # Stock Ledger
//!
//! Guarded stock mutation plus the append-only inventory audit trail.
//!
//! ## The Guarded Decrement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Two sales race for the last 3 units:                                   │
//! │                                                                         │
//! │  Sale A: UPDATE products SET stock = stock - 3                          │
//! │          WHERE id = ? AND stock >= 3        → 1 row, commits            │
//! │                                                                         │
//! │  Sale B: UPDATE products SET stock = stock - 3                          │
//! │          WHERE id = ? AND stock >= 3        → 0 rows                    │
//! │          └── rolls back with InsufficientStock (fresh available count)  │
//! │                                                                         │
//! │  SQLite serializes the writers; the WHERE clause makes the check and    │
//! │  the decrement one atomic statement. CHECK (stock >= 0) backstops it.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every mutation appends an `inventory_log` row in the same transaction:
//! signed delta, reason tag, and the invoice that caused it.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use dokan_core::{CoreError, MovementReason, Product, StockMovement};

/// Read access to stock levels and the movement history.
#[derive(Debug, Clone)]
pub struct StockLedger {
    pool: SqlitePool,
}

impl StockLedger {
    /// Creates a new StockLedger.
    pub fn new(pool: SqlitePool) -> Self {
        StockLedger { pool }
    }

    /// Current on-hand quantity for a product.
    pub async fn on_hand(&self, product_id: i64) -> DbResult<i64> {
        let stock: Option<i64> = sqlx::query_scalar("SELECT stock FROM products WHERE id = ?1")
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await?;

        stock.ok_or_else(|| CoreError::ProductNotFound(product_id).into())
    }

    /// Movement history for a product, newest first.
    pub async fn movements(&self, product_id: i64, limit: i64) -> DbResult<Vec<StockMovement>> {
        let movements: Vec<StockMovement> = sqlx::query_as(
            r#"
            SELECT id, product_id, change_qty, reason, reference, created_at
            FROM inventory_log
            WHERE product_id = ?1
            ORDER BY created_at DESC, id DESC
            LIMIT ?2
            "#,
        )
        .bind(product_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }
}

// =============================================================================
// In-Transaction Helpers
// =============================================================================
// The sale/purchase ledgers call these inside their own transactions so the
// stock change commits or rolls back with the rest of the operation.

/// Fetches a product row or fails with a business error.
pub(crate) async fn fetch_product(
    conn: &mut SqliteConnection,
    product_id: i64,
) -> DbResult<Product> {
    let product: Option<Product> = sqlx::query_as(
        r#"
        SELECT id, name, price_cents, stock, is_active, created_at, updated_at
        FROM products
        WHERE id = ?1
        "#,
    )
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?;

    product.ok_or_else(|| CoreError::ProductNotFound(product_id).into())
}

/// Removes stock with the guarded conditional decrement and logs the
/// movement as a negative delta.
///
/// ## Errors
/// `InsufficientStock` (with a fresh available count) when the guard fails;
/// the surrounding transaction must roll back.
pub(crate) async fn remove_stock(
    conn: &mut SqliteConnection,
    product: &Product,
    quantity: i64,
    reference: &str,
    at: DateTime<Utc>,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE products
        SET stock = stock - ?1, updated_at = ?2
        WHERE id = ?3 AND stock >= ?1
        "#,
    )
    .bind(quantity)
    .bind(at)
    .bind(product.id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        // Guard failed: re-read for an accurate error message.
        let available: i64 = sqlx::query_scalar("SELECT stock FROM products WHERE id = ?1")
            .bind(product.id)
            .fetch_one(&mut *conn)
            .await?;

        return Err(CoreError::InsufficientStock {
            name: product.name.clone(),
            available,
            requested: quantity,
        }
        .into());
    }

    debug!(product_id = product.id, quantity, reference, "Stock removed");

    log_movement(conn, product.id, -quantity, MovementReason::Sale, reference, at).await
}

/// Adds stock and logs the movement as a positive delta.
pub(crate) async fn add_stock(
    conn: &mut SqliteConnection,
    product_id: i64,
    quantity: i64,
    reference: &str,
    at: DateTime<Utc>,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE products
        SET stock = stock + ?1, updated_at = ?2
        WHERE id = ?3
        "#,
    )
    .bind(quantity)
    .bind(at)
    .bind(product_id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::from(CoreError::ProductNotFound(product_id)));
    }

    debug!(product_id, quantity, reference, "Stock added");

    log_movement(conn, product_id, quantity, MovementReason::Purchase, reference, at).await
}

/// Appends an inventory log row.
async fn log_movement(
    conn: &mut SqliteConnection,
    product_id: i64,
    change_qty: i64,
    reason: MovementReason,
    reference: &str,
    at: DateTime<Utc>,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO inventory_log (product_id, change_qty, reason, reference, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(product_id)
    .bind(change_qty)
    .bind(reason)
    .bind(reference)
    .bind(at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::testutil::*;
    use dokan_core::PaymentMethod;

    #[tokio::test]
    async fn test_on_hand_unknown_product() {
        let db = test_db().await;
        let err = db.stock().on_hand(42).await.unwrap_err();
        assert!(matches!(
            err.as_core(),
            Some(CoreError::ProductNotFound(42))
        ));
    }

    #[tokio::test]
    async fn test_movement_history_newest_first() {
        let db = test_db().await;
        let user_id = seed_user(&db).await;
        let supplier_id = seed_supplier(&db, "City Traders").await;
        let product_id = seed_product(&db, "Soap", 500, 0).await;

        db.purchases()
            .create(purchase_draft(
                supplier_id,
                user_id,
                vec![line(product_id, 10, 300)],
                3000,
                PaymentMethod::Cash,
            ))
            .await
            .unwrap();
        db.sales()
            .create(sale_draft(
                None,
                user_id,
                vec![line(product_id, 2, 500)],
                1000,
                PaymentMethod::Cash,
            ))
            .await
            .unwrap();

        let movements = db.stock().movements(product_id, 10).await.unwrap();
        assert_eq!(movements.len(), 2);
        // Newest first: the sale, then the purchase.
        assert_eq!(movements[0].change_qty, -2);
        assert_eq!(movements[0].reason, MovementReason::Sale);
        assert_eq!(movements[1].change_qty, 10);
        assert_eq!(movements[1].reason, MovementReason::Purchase);

        // Signed deltas sum to the on-hand quantity.
        let net: i64 = movements.iter().map(|m| m.change_qty).sum();
        assert_eq!(net, db.stock().on_hand(product_id).await.unwrap());
    }
}
