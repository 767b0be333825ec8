//! # Purchase Ledger
//!
//! Purchase recording: inbound stock from a supplier.
//!
//! ## A Purchase Is A Mirrored Sale
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  Sale                     Purchase                       │
//! │  stock           decrement (guarded)      increment (no guard needed)   │
//! │  money           flows in                 flows out                     │
//! │  due > 0         customer owes store      store owes supplier           │
//! │  balance mirror  customers.debt_cents     suppliers.payable_cents       │
//! │  lot effect      consumes lots            OPENS a lot (price > 0)       │
//! │                                                                         │
//! │  No pending state: goods on the receiving dock are already here.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each purchase line with a nonzero price becomes a FIFO lot for the cost
//! tracker; the unit price recorded here is the lot's acquisition cost.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

use crate::error::{DbError, DbResult};
use crate::ledger::{purchase_invoice_no, stock};
use dokan_core::validation;
use dokan_core::{
    PartyKind, PaymentType, Purchase, PurchaseDraft, PurchaseLine, PurchaseReceipt,
};

/// Ledger manager for purchases.
#[derive(Debug, Clone)]
pub struct PurchaseLedger {
    pool: SqlitePool,
}

impl PurchaseLedger {
    /// Creates a new PurchaseLedger.
    pub fn new(pool: SqlitePool) -> Self {
        PurchaseLedger { pool }
    }

    /// Records a purchase.
    ///
    /// ## What This Does
    /// 1. Recomputes totals from the lines and verifies the client's numbers
    /// 2. Inserts the header and backfills the invoice number from the row id
    /// 3. Inserts the line items and increments stock (+ inventory log)
    /// 4. Records the paid portion as an outbound payment
    /// 5. Records the due portion as a supplier obligation + payable mirror
    ///
    /// The `due` payment method forces paid = 0 (fully-on-credit delivery).
    pub async fn create(&self, draft: PurchaseDraft) -> DbResult<PurchaseReceipt> {
        let totals = validation::compute_totals(&draft.lines, draft.tax, draft.discount)?;
        validation::verify_client_totals(&totals, draft.client_subtotal, draft.client_total)?;
        let split = validation::split_payment(totals.total, draft.paid, draft.payment_method);

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        ensure_supplier(&mut tx, draft.supplier_id).await?;
        for line in &draft.lines {
            stock::fetch_product(&mut tx, line.product_id).await?;
        }

        let result = sqlx::query(
            r#"
            INSERT INTO purchases (
                supplier_id, user_id,
                subtotal_cents, tax_cents, discount_cents, total_cents,
                paid_cents, due_cents,
                payment_method, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(draft.supplier_id)
        .bind(draft.user_id)
        .bind(totals.subtotal)
        .bind(totals.tax)
        .bind(totals.discount)
        .bind(totals.total)
        .bind(split.paid)
        .bind(split.due)
        .bind(draft.payment_method)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let purchase_id = result.last_insert_rowid();
        let invoice_no = purchase_invoice_no(purchase_id);

        sqlx::query("UPDATE purchases SET invoice_no = ?1 WHERE id = ?2")
            .bind(&invoice_no)
            .bind(purchase_id)
            .execute(&mut *tx)
            .await?;

        for line in &draft.lines {
            sqlx::query(
                r#"
                INSERT INTO purchase_items (purchase_id, product_id, quantity, price_cents, subtotal_cents)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(purchase_id)
            .bind(line.product_id)
            .bind(line.quantity)
            .bind(line.price)
            .bind(line.subtotal())
            .execute(&mut *tx)
            .await?;

            stock::add_stock(&mut tx, line.product_id, line.quantity, &invoice_no, now).await?;
        }

        if split.paid.is_positive() {
            sqlx::query(
                r#"
                INSERT INTO payments (
                    party_kind, party_id, txn_id, amount_cents,
                    payment_type, direction, method, user_id, reference_no, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
            )
            .bind(PartyKind::Supplier)
            .bind(draft.supplier_id)
            .bind(purchase_id)
            .bind(split.paid)
            .bind(PaymentType::Payment)
            .bind(PartyKind::Supplier.payment_direction())
            .bind(draft.payment_method)
            .bind(draft.user_id)
            .bind(&invoice_no)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        if split.due.is_positive() {
            sqlx::query(
                r#"
                INSERT INTO obligations (party_kind, party_id, txn_id, due_cents, status, created_at)
                VALUES (?1, ?2, ?3, ?4, 'open', ?5)
                "#,
            )
            .bind(PartyKind::Supplier)
            .bind(draft.supplier_id)
            .bind(purchase_id)
            .bind(split.due)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            sqlx::query("UPDATE suppliers SET payable_cents = payable_cents + ?1 WHERE id = ?2")
                .bind(split.due)
                .bind(draft.supplier_id)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query("UPDATE suppliers SET last_transaction = ?1 WHERE id = ?2")
            .bind(now)
            .bind(draft.supplier_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(
            purchase_id,
            invoice_no = %invoice_no,
            total = %totals.total,
            "Purchase recorded"
        );

        Ok(PurchaseReceipt {
            purchase_id,
            invoice_no,
            subtotal: totals.subtotal,
            tax: totals.tax,
            discount: totals.discount,
            total: totals.total,
            paid: split.paid,
            due: split.due,
        })
    }

    /// Gets a purchase by id.
    pub async fn get(&self, purchase_id: i64) -> DbResult<Purchase> {
        let purchase: Option<Purchase> = sqlx::query_as(
            r#"
            SELECT id, invoice_no, supplier_id, user_id,
                   subtotal_cents, tax_cents, discount_cents, total_cents,
                   paid_cents, due_cents, payment_method, created_at
            FROM purchases
            WHERE id = ?1
            "#,
        )
        .bind(purchase_id)
        .fetch_optional(&self.pool)
        .await?;

        purchase.ok_or_else(|| DbError::not_found("Purchase", purchase_id))
    }

    /// Gets the line items of a purchase.
    pub async fn lines(&self, purchase_id: i64) -> DbResult<Vec<PurchaseLine>> {
        let lines: Vec<PurchaseLine> = sqlx::query_as(
            r#"
            SELECT id, purchase_id, product_id, quantity, price_cents, subtotal_cents
            FROM purchase_items
            WHERE purchase_id = ?1
            ORDER BY id ASC
            "#,
        )
        .bind(purchase_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }
}

async fn ensure_supplier(conn: &mut SqliteConnection, supplier_id: i64) -> DbResult<()> {
    let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM suppliers WHERE id = ?1")
        .bind(supplier_id)
        .fetch_optional(&mut *conn)
        .await?;

    match exists {
        Some(_) => Ok(()),
        None => Err(DbError::not_found("Supplier", supplier_id)),
    }
}

// =============================================================================
// Tests
// =============================================================================
