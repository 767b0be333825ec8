//! # FIFO Cost Tracker
//!
//! Cost-of-goods-sold reporting over a date window.
//!
//! ## Two Paths To The Same Number
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  FAST PATH: sum the cost snapshots                                      │
//! │    SELECT SUM(quantity * unit_cost_cents) FROM sale_cogs                │
//! │    JOIN sales ... WHERE completed AND created_at IN [from, to]          │
//! │    └── one query; used whenever snapshots exist in the window           │
//! │                                                                         │
//! │  FALLBACK: full FIFO replay (dokan_core::fifo)                          │
//! │    load ALL purchase lines (price > 0) and ALL completed sale lines     │
//! │    up to `to`, replay through per-product lot queues, accumulate        │
//! │    in-window sale costs                                                 │
//! │    └── exact lot-level costing; covers sales recorded before the        │
//! │        snapshot column existed                                          │
//! │                                                                         │
//! │  Event order: (created_at ASC, line id ASC), purchases before sales     │
//! │  at the same instant. Deterministic for a given database state.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use dokan_core::fifo::{fifo_cost_of_goods, CogsSummary, CostEvent};
use dokan_core::{Money, SaleStatus};

/// Cost-of-goods-sold reporting.
#[derive(Debug, Clone)]
pub struct CogsTracker {
    pool: SqlitePool,
}

impl CogsTracker {
    /// Creates a new CogsTracker.
    pub fn new(pool: SqlitePool) -> Self {
        CogsTracker { pool }
    }

    /// Cost of goods sold for completed sales inside `[from, to]`.
    ///
    /// Uses the per-sale cost snapshots when present, otherwise replays the
    /// full event history through the FIFO lot queues.
    pub async fn cost_of_goods_sold(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<CogsSummary> {
        let (cost, units): (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COALESCE(SUM(c.quantity * c.unit_cost_cents), 0),
                COALESCE(SUM(c.quantity), 0)
            FROM sale_cogs c
            JOIN sales s ON s.id = c.sale_id
            WHERE s.status = ?1 AND s.created_at >= ?2 AND s.created_at <= ?3
            "#,
        )
        .bind(SaleStatus::Completed)
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        if cost > 0 {
            return Ok(CogsSummary {
                total_cost: Money::from_minor(cost),
                units_sold: units,
            });
        }

        debug!("No cost snapshots in window, replaying event history");
        self.replay(from, to).await
    }

    /// Full FIFO replay: loads every priced purchase line and every completed
    /// sale line up to `to` and feeds them through the lot queues.
    async fn replay(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> DbResult<CogsSummary> {
        // Zero-priced purchase lines open no lot (no cost information).
        let purchase_rows: Vec<(i64, i64, Money, DateTime<Utc>)> = sqlx::query_as(
            r#"
            SELECT pi.product_id, pi.quantity, pi.price_cents, p.created_at
            FROM purchase_items pi
            JOIN purchases p ON p.id = pi.purchase_id
            WHERE pi.price_cents > 0 AND p.created_at <= ?1
            ORDER BY p.created_at ASC, pi.id ASC
            "#,
        )
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        let sale_rows: Vec<(i64, i64, DateTime<Utc>)> = sqlx::query_as(
            r#"
            SELECT si.product_id, si.quantity, s.created_at
            FROM sale_items si
            JOIN sales s ON s.id = si.sale_id
            WHERE s.status = ?1 AND s.created_at <= ?2
            ORDER BY s.created_at ASC, si.id ASC
            "#,
        )
        .bind(SaleStatus::Completed)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        let mut events = Vec::with_capacity(purchase_rows.len() + sale_rows.len());
        for (product_id, quantity, unit_cost, at) in purchase_rows {
            events.push(CostEvent::Purchase {
                product_id,
                quantity,
                unit_cost,
                at,
            });
        }
        for (product_id, quantity, at) in sale_rows {
            events.push(CostEvent::Sale {
                product_id,
                quantity,
                at,
            });
        }

        Ok(fifo_cost_of_goods(events, from, to))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::testutil::*;
    use chrono::Duration;
    use dokan_core::PaymentMethod;

    fn window() -> (DateTime<Utc>, DateTime<Utc>) {
        let now = Utc::now();
        (now - Duration::days(1), now + Duration::days(1))
    }

    #[tokio::test]
    async fn test_fast_path_sums_cost_snapshots() {
        let db = test_db().await;
        let user_id = seed_user(&db).await;
        let supplier_id = seed_supplier(&db, "City Traders").await;
        let product_id = seed_product(&db, "Rice 5kg", 10000, 0).await;

        // 10 units in at 80.00 each, 4 sold.
        db.purchases()
            .create(purchase_draft(
                supplier_id,
                user_id,
                vec![line(product_id, 10, 8000)],
                80000,
                PaymentMethod::Cash,
            ))
            .await
            .unwrap();
        db.sales()
            .create(sale_draft(
                None,
                user_id,
                vec![line(product_id, 4, 10000)],
                40000,
                PaymentMethod::Cash,
            ))
            .await
            .unwrap();

        let (from, to) = window();
        let summary = db.cogs().cost_of_goods_sold(from, to).await.unwrap();
        assert_eq!(summary.total_cost.minor(), 4 * 8000);
        assert_eq!(summary.units_sold, 4);
    }

    #[tokio::test]
    async fn test_replay_fallback_matches_lot_costs() {
        let db = test_db().await;
        let user_id = seed_user(&db).await;
        let supplier_id = seed_supplier(&db, "City Traders").await;
        let product_id = seed_product(&db, "Rice 5kg", 10000, 0).await;

        // Two lots at different costs, then a sale spanning both.
        for cost in [8000, 10000] {
            db.purchases()
                .create(purchase_draft(
                    supplier_id,
                    user_id,
                    vec![line(product_id, 10, cost)],
                    0,
                    PaymentMethod::Due,
                ))
                .await
                .unwrap();
        }
        db.sales()
            .create(sale_draft(
                None,
                user_id,
                vec![line(product_id, 15, 12000)],
                180000,
                PaymentMethod::Cash,
            ))
            .await
            .unwrap();

        // Drop the snapshots to force the replay path.
        sqlx::query("DELETE FROM sale_cogs")
            .execute(db.pool())
            .await
            .unwrap();

        let (from, to) = window();
        let summary = db.cogs().cost_of_goods_sold(from, to).await.unwrap();
        // FIFO: all of the 80.00 lot plus 5 units of the 100.00 lot.
        assert_eq!(summary.total_cost.minor(), 10 * 8000 + 5 * 10000);
        assert_eq!(summary.units_sold, 15);
    }

    #[tokio::test]
    async fn test_pending_sales_excluded() {
        let db = test_db().await;
        let user_id = seed_user(&db).await;
        let supplier_id = seed_supplier(&db, "City Traders").await;
        let customer_id = seed_customer(&db, "Rahim").await;
        let product_id = seed_product(&db, "Rice 5kg", 10000, 0).await;

        db.purchases()
            .create(purchase_draft(
                supplier_id,
                user_id,
                vec![line(product_id, 10, 8000)],
                80000,
                PaymentMethod::Cash,
            ))
            .await
            .unwrap();

        let mut draft = sale_draft(
            Some(customer_id),
            user_id,
            vec![line(product_id, 4, 10000)],
            0,
            PaymentMethod::Cash,
        );
        draft.pending = true;
        db.sales().create(draft).await.unwrap();

        let (from, to) = window();
        let summary = db.cogs().cost_of_goods_sold(from, to).await.unwrap();
        assert!(summary.total_cost.is_zero());
        assert_eq!(summary.units_sold, 0);
    }

    #[tokio::test]
    async fn test_empty_window_is_zero() {
        let db = test_db().await;
        let now = Utc::now();
        let summary = db
            .cogs()
            .cost_of_goods_sold(now - Duration::days(2), now - Duration::days(1))
            .await
            .unwrap();
        assert!(summary.total_cost.is_zero());
        assert_eq!(summary.units_sold, 0);
    }
}
