//! # Sale Ledger
//!
//! Sale recording and the pending-sale reconciler.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                     │
//! │                                                                         │
//! │  1. CREATE (completed)                                                  │
//! │     └── create(draft) → header + lines + ALL side effects:              │
//! │         stock decrement, inventory log, cost snapshot, payment row,     │
//! │         obligation + customer debt (if due > 0), customer stats         │
//! │                                                                         │
//! │  1'. CREATE (pending)                                                   │
//! │     └── create(draft { pending: true }) → header + lines ONLY           │
//! │         paid = due = 0, stock untouched, no ledger rows                 │
//! │                                                                         │
//! │  2. RECONCILE                                                           │
//! │     └── complete_pending(id, paid, method)                              │
//! │         totals recomputed from the persisted lines (authoritative),     │
//! │         then the exact side effects of step 1 run, priced at            │
//! │         completion-time stock and cost                                  │
//! │                                                                         │
//! │  One transaction per step: a stock shortfall during reconciliation      │
//! │  leaves the sale pending and untouched.                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::ledger::{sale_invoice_no, stock};
use dokan_core::validation::{self, PaymentSplit};
use dokan_core::{
    CoreError, LineItem, Money, PartyKind, PaymentMethod, PaymentType, Sale, SaleDraft, SaleLine,
    SaleReceipt, SaleStatus, ValidationError,
};

/// Ledger manager for sales.
#[derive(Debug, Clone)]
pub struct SaleLedger {
    pool: SqlitePool,
}

impl SaleLedger {
    /// Creates a new SaleLedger.
    pub fn new(pool: SqlitePool) -> Self {
        SaleLedger { pool }
    }

    /// Records a sale.
    ///
    /// ## What This Does
    /// 1. Recomputes totals from the lines and verifies the client's numbers
    /// 2. Inserts the header and backfills the invoice number from the row id
    /// 3. Inserts the line items
    /// 4. For non-pending sales, applies all completion effects (stock,
    ///    inventory log, cost snapshot, payment, obligation, customer stats)
    ///
    /// All inside one transaction; any failure rolls the whole sale back.
    pub async fn create(&self, draft: SaleDraft) -> DbResult<SaleReceipt> {
        let totals = validation::compute_totals(&draft.lines, draft.tax, draft.discount)?;
        validation::verify_client_totals(&totals, draft.client_subtotal, draft.client_total)?;
        let split = validation::split_payment(totals.total, draft.paid, draft.payment_method);

        // Credit needs someone to owe it.
        if !draft.pending && split.due.is_positive() && draft.customer_id.is_none() {
            return Err(CoreError::from(ValidationError::Required {
                field: "customer_id",
            })
            .into());
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        // Fail on unknown products before writing anything.
        for line in &draft.lines {
            stock::fetch_product(&mut tx, line.product_id).await?;
        }

        let status = if draft.pending {
            SaleStatus::Pending
        } else {
            SaleStatus::Completed
        };
        // Pending sales carry their totals but no money has moved yet.
        let (paid, due) = if draft.pending {
            (Money::zero(), Money::zero())
        } else {
            (split.paid, split.due)
        };

        let result = sqlx::query(
            r#"
            INSERT INTO sales (
                customer_id, user_id,
                subtotal_cents, tax_cents, discount_cents, total_cents,
                paid_cents, due_cents,
                status, payment_method, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(draft.customer_id)
        .bind(draft.user_id)
        .bind(totals.subtotal)
        .bind(totals.tax)
        .bind(totals.discount)
        .bind(totals.total)
        .bind(paid)
        .bind(due)
        .bind(status)
        .bind(draft.payment_method)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let sale_id = result.last_insert_rowid();
        let invoice_no = sale_invoice_no(sale_id);

        sqlx::query("UPDATE sales SET invoice_no = ?1 WHERE id = ?2")
            .bind(&invoice_no)
            .bind(sale_id)
            .execute(&mut *tx)
            .await?;

        insert_lines(&mut tx, sale_id, &draft.lines).await?;

        if !draft.pending {
            apply_completion_effects(
                &mut tx,
                &Completion {
                    sale_id,
                    invoice_no: &invoice_no,
                    customer_id: draft.customer_id,
                    user_id: draft.user_id,
                    lines: &draft.lines,
                    split,
                    method: draft.payment_method,
                    at: now,
                },
            )
            .await?;
        }

        tx.commit().await?;

        info!(
            sale_id,
            invoice_no = %invoice_no,
            total = %totals.total,
            status = status.as_str(),
            "Sale recorded"
        );

        Ok(SaleReceipt {
            sale_id,
            invoice_no,
            subtotal: totals.subtotal,
            tax: totals.tax,
            discount: totals.discount,
            total: totals.total,
            paid,
            due,
            status,
        })
    }

    /// Completes a pending sale (the reconciler).
    ///
    /// Totals are recomputed from the **persisted** lines; whatever the
    /// client claimed at creation time has no bearing here. Side effects run
    /// against completion-time stock, so a shortfall surfaces as
    /// `InsufficientStock` and the sale stays pending.
    pub async fn complete_pending(
        &self,
        sale_id: i64,
        paid: Money,
        payment_method: PaymentMethod,
    ) -> DbResult<SaleReceipt> {
        let mut tx = self.pool.begin().await?;

        let sale: Sale = fetch_sale(&mut tx, sale_id)
            .await?
            .ok_or(CoreError::SaleNotFound(sale_id))?;

        if sale.status != SaleStatus::Pending {
            return Err(CoreError::InvalidSaleStatus {
                sale_id,
                current_status: sale.status.as_str().to_string(),
            }
            .into());
        }

        let rows = fetch_lines(&mut tx, sale_id).await?;
        let lines: Vec<LineItem> = rows
            .iter()
            .map(|row| LineItem {
                product_id: row.product_id,
                quantity: row.quantity,
                price: row.price_cents,
            })
            .collect();

        let totals = validation::compute_totals(&lines, sale.tax_cents, sale.discount_cents)?;
        let split = validation::split_payment(totals.total, paid, payment_method);

        if split.due.is_positive() && sale.customer_id.is_none() {
            return Err(CoreError::from(ValidationError::Required {
                field: "customer_id",
            })
            .into());
        }

        let now = Utc::now();

        // The status predicate guards against a racing double-completion.
        let result = sqlx::query(
            r#"
            UPDATE sales SET
                subtotal_cents = ?1,
                total_cents = ?2,
                paid_cents = ?3,
                due_cents = ?4,
                status = ?5,
                payment_method = ?6
            WHERE id = ?7 AND status = ?8
            "#,
        )
        .bind(totals.subtotal)
        .bind(totals.total)
        .bind(split.paid)
        .bind(split.due)
        .bind(SaleStatus::Completed)
        .bind(payment_method)
        .bind(sale_id)
        .bind(SaleStatus::Pending)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::InvalidSaleStatus {
                sale_id,
                current_status: SaleStatus::Completed.as_str().to_string(),
            }
            .into());
        }

        let invoice_no = sale
            .invoice_no
            .clone()
            .unwrap_or_else(|| sale_invoice_no(sale_id));

        apply_completion_effects(
            &mut tx,
            &Completion {
                sale_id,
                invoice_no: &invoice_no,
                customer_id: sale.customer_id,
                user_id: sale.user_id,
                lines: &lines,
                split,
                method: payment_method,
                at: now,
            },
        )
        .await?;

        tx.commit().await?;

        info!(
            sale_id,
            invoice_no = %invoice_no,
            total = %totals.total,
            "Pending sale completed"
        );

        Ok(SaleReceipt {
            sale_id,
            invoice_no,
            subtotal: totals.subtotal,
            tax: totals.tax,
            discount: totals.discount,
            total: totals.total,
            paid: split.paid,
            due: split.due,
            status: SaleStatus::Completed,
        })
    }

    /// Gets a sale by id.
    pub async fn get(&self, sale_id: i64) -> DbResult<Sale> {
        let mut conn = self.pool.acquire().await?;
        fetch_sale(&mut conn, sale_id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(sale_id).into())
    }

    /// Gets the line items of a sale.
    pub async fn lines(&self, sale_id: i64) -> DbResult<Vec<SaleLine>> {
        let mut conn = self.pool.acquire().await?;
        fetch_lines(&mut conn, sale_id).await
    }

    /// Lists pending sales, oldest first (the reconciler's worklist).
    pub async fn list_pending(&self) -> DbResult<Vec<Sale>> {
        let sales: Vec<Sale> = sqlx::query_as(
            r#"
            SELECT id, invoice_no, customer_id, user_id,
                   subtotal_cents, tax_cents, discount_cents, total_cents,
                   paid_cents, due_cents, status, payment_method, created_at
            FROM sales
            WHERE status = ?1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(SaleStatus::Pending)
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }
}

// =============================================================================
// In-Transaction Helpers
// =============================================================================

/// Everything the completion effects need, whether they run at creation
/// time or from the reconciler.
struct Completion<'a> {
    sale_id: i64,
    invoice_no: &'a str,
    customer_id: Option<i64>,
    user_id: i64,
    lines: &'a [LineItem],
    split: PaymentSplit,
    method: PaymentMethod,
    at: DateTime<Utc>,
}

/// Applies the side effects of a completed sale.
///
/// ## Effects, In Order
/// 1. Per line: guarded stock decrement + inventory log + cost snapshot
/// 2. Payment row for the paid portion (if any)
/// 3. Obligation row + customer debt mirror for the due portion (if any)
/// 4. Customer stats (order_count, last_purchased)
async fn apply_completion_effects(
    conn: &mut SqliteConnection,
    c: &Completion<'_>,
) -> DbResult<()> {
    for line in c.lines {
        let product = stock::fetch_product(conn, line.product_id).await?;
        stock::remove_stock(conn, &product, line.quantity, c.invoice_no, c.at).await?;

        // Snapshot the cost at the average historical purchase price; the
        // cost tracker's fast path sums these instead of replaying history.
        let unit_cost = average_purchase_cost(conn, line.product_id).await?;
        sqlx::query(
            r#"
            INSERT INTO sale_cogs (sale_id, product_id, quantity, unit_cost_cents, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(c.sale_id)
        .bind(line.product_id)
        .bind(line.quantity)
        .bind(unit_cost)
        .bind(c.at)
        .execute(&mut *conn)
        .await?;
    }

    if c.split.paid.is_positive() {
        sqlx::query(
            r#"
            INSERT INTO payments (
                party_kind, party_id, txn_id, amount_cents,
                payment_type, direction, method, user_id, reference_no, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(PartyKind::Customer)
        .bind(c.customer_id)
        .bind(c.sale_id)
        .bind(c.split.paid)
        .bind(PaymentType::Payment)
        .bind(PartyKind::Customer.payment_direction())
        .bind(c.method)
        .bind(c.user_id)
        .bind(c.invoice_no)
        .bind(c.at)
        .execute(&mut *conn)
        .await?;
    }

    if c.split.due.is_positive() {
        // Guaranteed Some by the caller's validation.
        let customer_id = c
            .customer_id
            .ok_or(CoreError::from(ValidationError::Required {
                field: "customer_id",
            }))?;

        sqlx::query(
            r#"
            INSERT INTO obligations (party_kind, party_id, txn_id, due_cents, status, created_at)
            VALUES (?1, ?2, ?3, ?4, 'open', ?5)
            "#,
        )
        .bind(PartyKind::Customer)
        .bind(customer_id)
        .bind(c.sale_id)
        .bind(c.split.due)
        .bind(c.at)
        .execute(&mut *conn)
        .await?;

        let result =
            sqlx::query("UPDATE customers SET debt_cents = debt_cents + ?1 WHERE id = ?2")
                .bind(c.split.due)
                .bind(customer_id)
                .execute(&mut *conn)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", customer_id));
        }

        debug!(customer_id, due = %c.split.due, "Customer debt increased");
    }

    if let Some(customer_id) = c.customer_id {
        sqlx::query(
            r#"
            UPDATE customers
            SET order_count = order_count + 1, last_purchased = ?1
            WHERE id = ?2
            "#,
        )
        .bind(c.at)
        .bind(customer_id)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

/// Average historical purchase cost of a product in minor units.
///
/// Zero-priced purchase lines (promo stock, opening balances entered without
/// cost) are excluded. Returns zero when the product has never been
/// purchased at a price.
async fn average_purchase_cost(
    conn: &mut SqliteConnection,
    product_id: i64,
) -> DbResult<Money> {
    let avg: i64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(price_cents * quantity) / NULLIF(SUM(quantity), 0), 0)
        FROM purchase_items
        WHERE product_id = ?1 AND price_cents > 0
        "#,
    )
    .bind(product_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(Money::from_minor(avg))
}

async fn insert_lines(
    conn: &mut SqliteConnection,
    sale_id: i64,
    lines: &[LineItem],
) -> DbResult<()> {
    for line in lines {
        sqlx::query(
            r#"
            INSERT INTO sale_items (sale_id, product_id, quantity, price_cents, subtotal_cents)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(sale_id)
        .bind(line.product_id)
        .bind(line.quantity)
        .bind(line.price)
        .bind(line.subtotal())
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

async fn fetch_sale(conn: &mut SqliteConnection, sale_id: i64) -> DbResult<Option<Sale>> {
    let sale: Option<Sale> = sqlx::query_as(
        r#"
        SELECT id, invoice_no, customer_id, user_id,
               subtotal_cents, tax_cents, discount_cents, total_cents,
               paid_cents, due_cents, status, payment_method, created_at
        FROM sales
        WHERE id = ?1
        "#,
    )
    .bind(sale_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(sale)
}

async fn fetch_lines(conn: &mut SqliteConnection, sale_id: i64) -> DbResult<Vec<SaleLine>> {
    let lines: Vec<SaleLine> = sqlx::query_as(
        r#"
        SELECT id, sale_id, product_id, quantity, price_cents, subtotal_cents
        FROM sale_items
        WHERE sale_id = ?1
        ORDER BY id ASC
        "#,
    )
    .bind(sale_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(lines)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::testutil::*;
    use dokan_core::{ObligationStatus, PartyRef};

    #[tokio::test]
    async fn test_cash_sale_moves_stock_and_logs() {
        let db = test_db().await;
        let user_id = seed_user(&db).await;
        let product_id = seed_product(&db, "Fresh Milk 1L", 5000, 10).await;

        let receipt = db
            .sales()
            .create(sale_draft(
                None,
                user_id,
                vec![line(product_id, 2, 5000)],
                10000,
                PaymentMethod::Cash,
            ))
            .await
            .unwrap();

        assert_eq!(receipt.invoice_no, "INV-S000001");
        assert_eq!(receipt.total.minor(), 10000);
        assert!(receipt.due.is_zero());
        assert_eq!(receipt.status, SaleStatus::Completed);

        assert_eq!(db.stock().on_hand(product_id).await.unwrap(), 8);

        let movements = db.stock().movements(product_id, 10).await.unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].change_qty, -2);
        assert_eq!(movements[0].reference, receipt.invoice_no);
    }

    #[tokio::test]
    async fn test_partial_payment_creates_obligation_and_debt() {
        let db = test_db().await;
        let user_id = seed_user(&db).await;
        let customer_id = seed_customer(&db, "Rahim").await;
        let product_id = seed_product(&db, "Rice 5kg", 10000, 20).await;

        // Total 10000, tendered 9500 → due 500.
        let receipt = db
            .sales()
            .create(sale_draft(
                Some(customer_id),
                user_id,
                vec![line(product_id, 1, 10000)],
                9500,
                PaymentMethod::Cash,
            ))
            .await
            .unwrap();

        assert_eq!(receipt.paid.minor(), 9500);
        assert_eq!(receipt.due.minor(), 500);

        let balance = db
            .payments()
            .balance(PartyRef::customer(customer_id))
            .await
            .unwrap();
        assert_eq!(balance.minor(), 500);

        let (due, status): (i64, ObligationStatus) = sqlx::query_as(
            "SELECT due_cents, status FROM obligations WHERE txn_id = ?1",
        )
        .bind(receipt.sale_id)
        .fetch_one(db.pool())
        .await
        .unwrap();
        assert_eq!(due, 500);
        assert_eq!(status, ObligationStatus::Open);
    }

    #[tokio::test]
    async fn test_insufficient_stock_rolls_back_everything() {
        let db = test_db().await;
        let user_id = seed_user(&db).await;
        let product_id = seed_product(&db, "Eggs (dozen)", 1500, 1).await;

        let err = db
            .sales()
            .create(sale_draft(
                None,
                user_id,
                vec![line(product_id, 3, 1500)],
                4500,
                PaymentMethod::Cash,
            ))
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_core(),
            Some(CoreError::InsufficientStock {
                available: 1,
                requested: 3,
                ..
            })
        ));

        // Nothing persisted: no header, no lines, no movements, stock intact.
        let sales: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(sales, 0);
        let items: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sale_items")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(items, 0);
        assert_eq!(db.stock().on_hand(product_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_stale_client_total_rejected() {
        let db = test_db().await;
        let user_id = seed_user(&db).await;
        let product_id = seed_product(&db, "Soap", 500, 10).await;

        let mut draft = sale_draft(
            None,
            user_id,
            vec![line(product_id, 2, 500)],
            1000,
            PaymentMethod::Cash,
        );
        draft.client_total = Some(Money::from_minor(999));

        let err = db.sales().create(draft).await.unwrap_err();
        assert!(matches!(
            err.as_core(),
            Some(CoreError::TotalsMismatch { .. })
        ));
        assert_eq!(
            err.as_core().unwrap().to_string(),
            "Total amount mismatch. Please refresh cart."
        );
    }

    #[tokio::test]
    async fn test_credit_sale_requires_customer() {
        let db = test_db().await;
        let user_id = seed_user(&db).await;
        let product_id = seed_product(&db, "Soap", 500, 10).await;

        let err = db
            .sales()
            .create(sale_draft(
                None,
                user_id,
                vec![line(product_id, 1, 500)],
                0,
                PaymentMethod::Due,
            ))
            .await
            .unwrap_err();

        assert!(matches!(err.as_core(), Some(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_due_method_forces_full_due() {
        let db = test_db().await;
        let user_id = seed_user(&db).await;
        let customer_id = seed_customer(&db, "Karim").await;
        let product_id = seed_product(&db, "Oil 1L", 18000, 10).await;

        // Tendered amount is ignored for explicit credit sales.
        let receipt = db
            .sales()
            .create(sale_draft(
                Some(customer_id),
                user_id,
                vec![line(product_id, 1, 18000)],
                18000,
                PaymentMethod::Due,
            ))
            .await
            .unwrap();

        assert!(receipt.paid.is_zero());
        assert_eq!(receipt.due.minor(), 18000);
    }

    #[tokio::test]
    async fn test_pending_sale_defers_all_effects() {
        let db = test_db().await;
        let user_id = seed_user(&db).await;
        let customer_id = seed_customer(&db, "Salma").await;
        let product_id = seed_product(&db, "Sugar 1kg", 12000, 10).await;

        let mut draft = sale_draft(
            Some(customer_id),
            user_id,
            vec![line(product_id, 2, 12000)],
            24000,
            PaymentMethod::Cash,
        );
        draft.pending = true;

        let receipt = db.sales().create(draft).await.unwrap();

        assert_eq!(receipt.status, SaleStatus::Pending);
        assert!(receipt.paid.is_zero());
        assert!(receipt.due.is_zero());
        assert_eq!(receipt.total.minor(), 24000);

        // Lines persisted, but no stock or ledger effects.
        assert_eq!(db.sales().lines(receipt.sale_id).await.unwrap().len(), 1);
        assert_eq!(db.stock().on_hand(product_id).await.unwrap(), 10);
        let movements: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM inventory_log")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(movements, 0);

        let pending = db.sales().list_pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, receipt.sale_id);
    }

    #[tokio::test]
    async fn test_complete_pending_applies_effects() {
        let db = test_db().await;
        let user_id = seed_user(&db).await;
        let customer_id = seed_customer(&db, "Salma").await;
        let product_id = seed_product(&db, "Sugar 1kg", 12000, 10).await;

        let mut draft = sale_draft(
            Some(customer_id),
            user_id,
            vec![line(product_id, 2, 12000)],
            0,
            PaymentMethod::Cash,
        );
        draft.pending = true;
        let pending = db.sales().create(draft).await.unwrap();

        let receipt = db
            .sales()
            .complete_pending(pending.sale_id, Money::from_minor(20000), PaymentMethod::Cash)
            .await
            .unwrap();

        assert_eq!(receipt.status, SaleStatus::Completed);
        assert_eq!(receipt.paid.minor(), 20000);
        assert_eq!(receipt.due.minor(), 4000);
        assert_eq!(db.stock().on_hand(product_id).await.unwrap(), 8);

        // Completing twice is a status violation.
        let err = db
            .sales()
            .complete_pending(pending.sale_id, Money::zero(), PaymentMethod::Cash)
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_core(),
            Some(CoreError::InvalidSaleStatus { .. })
        ));
    }

    #[tokio::test]
    async fn test_reconcile_fails_when_stock_dropped() {
        let db = test_db().await;
        let user_id = seed_user(&db).await;
        let customer_id = seed_customer(&db, "Salma").await;
        let product_id = seed_product(&db, "Sugar 1kg", 12000, 10).await;

        let mut draft = sale_draft(
            Some(customer_id),
            user_id,
            vec![line(product_id, 5, 12000)],
            0,
            PaymentMethod::Cash,
        );
        draft.pending = true;
        let pending = db.sales().create(draft).await.unwrap();

        // Another sale takes 8 of the 10 units in the interim.
        db.sales()
            .create(sale_draft(
                None,
                user_id,
                vec![line(product_id, 8, 12000)],
                96000,
                PaymentMethod::Cash,
            ))
            .await
            .unwrap();

        let err = db
            .sales()
            .complete_pending(pending.sale_id, Money::from_minor(60000), PaymentMethod::Cash)
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_core(),
            Some(CoreError::InsufficientStock { .. })
        ));

        // The reconciliation rolled back: the sale is still pending.
        let sale = db.sales().get(pending.sale_id).await.unwrap();
        assert_eq!(sale.status, SaleStatus::Pending);
        assert_eq!(db.stock().on_hand(product_id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_customer_stats_updated() {
        let db = test_db().await;
        let user_id = seed_user(&db).await;
        let customer_id = seed_customer(&db, "Rahim").await;
        let product_id = seed_product(&db, "Soap", 500, 50).await;

        for _ in 0..3 {
            db.sales()
                .create(sale_draft(
                    Some(customer_id),
                    user_id,
                    vec![line(product_id, 1, 500)],
                    500,
                    PaymentMethod::Cash,
                ))
                .await
                .unwrap();
        }

        let (orders, last): (i64, Option<String>) = sqlx::query_as(
            "SELECT order_count, last_purchased FROM customers WHERE id = ?1",
        )
        .bind(customer_id)
        .fetch_one(db.pool())
        .await
        .unwrap();
        assert_eq!(orders, 3);
        assert!(last.is_some());
    }

    #[tokio::test]
    async fn test_unknown_product_rejected() {
        let db = test_db().await;
        let user_id = seed_user(&db).await;

        let err = db
            .sales()
            .create(sale_draft(
                None,
                user_id,
                vec![line(999, 1, 500)],
                500,
                PaymentMethod::Cash,
            ))
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_core(),
            Some(CoreError::ProductNotFound(999))
        ));
    }
}
