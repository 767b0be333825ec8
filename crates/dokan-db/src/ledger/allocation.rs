//! # Due/Advance Allocation Engine
//!
//! Settles a lump payment against a party's open obligations, oldest first.
//!
//! ## The Allocation Walk
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Customer owes 80.00 across three sales; pays 100.00:                   │
//! │                                                                         │
//! │  Obligations (created_at ASC, id ASC):                                  │
//! │    #12  due 30.00  ──► apply 30.00 ──► paid      (due_payment 30.00)    │
//! │    #15  due 25.00  ──► apply 25.00 ──► paid      (due_payment 25.00)    │
//! │    #19  due 25.00  ──► apply 25.00 ──► paid      (due_payment 25.00)    │
//! │                                          │                              │
//! │  Residual 20.00 ─────────────────────────┴────► advance row (txn NULL)  │
//! │                                                                         │
//! │  debt_cents: 80.00 − 80.00 = 0   (mirror reduced by the APPLIED sum,    │
//! │                                   never by the advance)                 │
//! │                                                                         │
//! │  Before commit: assert balance == SUM(open dues). A mismatch means      │
//! │  some code path mutated the mirror directly; roll back, surface it.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each application also moves the amount from due to paid on the sale or
//! purchase header that owns the obligation, so receipts reprinted later
//! reflect what has actually been settled.
//!
//! The same walk serves both sides of the ledger: customer payments reduce
//! `debt_cents` (money in), supplier payments reduce `payable_cents`
//! (money out). [`PartyRef`] picks the side.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use dokan_core::{
    Allocation, CoreError, Money, Obligation, ObligationStatus, PartyKind, PartyRef,
    PaymentMethod, PaymentRecord, PaymentType,
};

/// Ledger manager for due/advance payment allocation.
#[derive(Debug, Clone)]
pub struct AllocationLedger {
    pool: SqlitePool,
}

impl AllocationLedger {
    /// Creates a new AllocationLedger.
    pub fn new(pool: SqlitePool) -> Self {
        AllocationLedger { pool }
    }

    /// Settles `amount` against the party's open obligations, oldest first.
    ///
    /// ## Errors
    /// - `InvalidPaymentAmount` for zero or negative amounts
    /// - `NotFound` when the party does not exist
    /// - `NoOpenObligations` when there is nothing to settle
    /// - `BalanceMismatch` when the aggregate mirror disagrees with the
    ///   obligation sum (checked before commit; nothing is persisted)
    pub async fn settle(
        &self,
        party: PartyRef,
        amount: Money,
        method: PaymentMethod,
        user_id: i64,
        note: Option<String>,
    ) -> DbResult<Allocation> {
        if !amount.is_positive() {
            return Err(CoreError::InvalidPaymentAmount {
                reason: format!("amount must be positive, got {amount}"),
            }
            .into());
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        // Existence check doubles as the balance read.
        let _balance = fetch_balance(&mut tx, party).await?;

        let obligations: Vec<Obligation> = sqlx::query_as(
            r#"
            SELECT id, party_kind, party_id, txn_id, due_cents, status, created_at
            FROM obligations
            WHERE party_kind = ?1 AND party_id = ?2 AND status = ?3 AND due_cents > 0
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(party.kind)
        .bind(party.id)
        .bind(ObligationStatus::Open)
        .fetch_all(&mut *tx)
        .await?;

        if obligations.is_empty() {
            return Err(CoreError::NoOpenObligations {
                party_kind: party.kind.noun(),
            }
            .into());
        }

        let mut remaining = amount;
        let mut applied_total = Money::zero();

        for obligation in &obligations {
            if !remaining.is_positive() {
                break;
            }

            let applied = remaining.min(obligation.due_cents);
            let new_due = obligation.due_cents - applied;
            let new_status = if new_due.is_zero() {
                ObligationStatus::Paid
            } else {
                ObligationStatus::Open
            };

            sqlx::query("UPDATE obligations SET due_cents = ?1, status = ?2 WHERE id = ?3")
                .bind(new_due)
                .bind(new_status)
                .bind(obligation.id)
                .execute(&mut *tx)
                .await?;

            // The owning header carries its own paid/due; keep it in step
            // with the obligation so `paid + due == total` stays true.
            mirror_txn_header(&mut tx, party.kind, obligation.txn_id, applied).await?;

            let reference_no = txn_invoice(&mut tx, party.kind, obligation.txn_id).await?;

            sqlx::query(
                r#"
                INSERT INTO payments (
                    party_kind, party_id, txn_id, amount_cents,
                    payment_type, direction, method, user_id, reference_no, note, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                "#,
            )
            .bind(party.kind)
            .bind(party.id)
            .bind(obligation.txn_id)
            .bind(applied)
            .bind(PaymentType::DuePayment)
            .bind(party.kind.payment_direction())
            .bind(method)
            .bind(user_id)
            .bind(reference_no)
            .bind(note.as_deref())
            .bind(now)
            .execute(&mut *tx)
            .await?;

            debug!(
                obligation_id = obligation.id,
                txn_id = obligation.txn_id,
                applied = %applied,
                "Obligation settled"
            );

            remaining -= applied;
            applied_total += applied;
        }

        // The mirror moves by the applied sum only; an advance is a credit
        // on the payment ledger, not a negative balance.
        if applied_total.is_positive() {
            adjust_balance(&mut tx, party, applied_total).await?;
        }

        let advance = remaining;
        if advance.is_positive() {
            sqlx::query(
                r#"
                INSERT INTO payments (
                    party_kind, party_id, txn_id, amount_cents,
                    payment_type, direction, method, user_id, note, created_at
                ) VALUES (?1, ?2, NULL, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )
            .bind(party.kind)
            .bind(party.id)
            .bind(advance)
            .bind(PaymentType::Advance)
            .bind(party.kind.payment_direction())
            .bind(method)
            .bind(user_id)
            .bind(note.as_deref())
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        verify_balance_invariant(&mut tx, party).await?;

        tx.commit().await?;

        info!(
            party_kind = party.kind.noun(),
            party_id = party.id,
            applied = %applied_total,
            advance = %advance,
            "Payment allocated"
        );

        Ok(Allocation {
            applied_amount: applied_total,
            advance_amount: advance,
        })
    }

    /// Payment history for a party, newest first.
    pub async fn history(&self, party: PartyRef, limit: i64) -> DbResult<Vec<PaymentRecord>> {
        let payments: Vec<PaymentRecord> = sqlx::query_as(
            r#"
            SELECT id, party_kind, party_id, txn_id, amount_cents,
                   payment_type, direction, method, user_id, reference_no, note, created_at
            FROM payments
            WHERE party_kind = ?1 AND party_id = ?2
            ORDER BY created_at DESC, id DESC
            LIMIT ?3
            "#,
        )
        .bind(party.kind)
        .bind(party.id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }

    /// Current aggregate balance for a party (customer debt or supplier
    /// payable).
    pub async fn balance(&self, party: PartyRef) -> DbResult<Money> {
        let mut conn = self.pool.acquire().await?;
        fetch_balance(&mut conn, party).await
    }
}

// =============================================================================
// In-Transaction Helpers
// =============================================================================

async fn fetch_balance(conn: &mut SqliteConnection, party: PartyRef) -> DbResult<Money> {
    let sql = match party.kind {
        PartyKind::Customer => "SELECT debt_cents FROM customers WHERE id = ?1",
        PartyKind::Supplier => "SELECT payable_cents FROM suppliers WHERE id = ?1",
    };

    let balance: Option<Money> = sqlx::query_scalar(sql)
        .bind(party.id)
        .fetch_optional(&mut *conn)
        .await?;

    balance.ok_or_else(|| {
        let entity = match party.kind {
            PartyKind::Customer => "Customer",
            PartyKind::Supplier => "Supplier",
        };
        DbError::not_found(entity, party.id)
    })
}

async fn adjust_balance(
    conn: &mut SqliteConnection,
    party: PartyRef,
    applied: Money,
) -> DbResult<()> {
    let sql = match party.kind {
        PartyKind::Customer => "UPDATE customers SET debt_cents = debt_cents - ?1 WHERE id = ?2",
        PartyKind::Supplier => {
            "UPDATE suppliers SET payable_cents = payable_cents - ?1 WHERE id = ?2"
        }
    };

    sqlx::query(sql)
        .bind(applied)
        .bind(party.id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Asserts `balance == SUM(open dues)` after the walk, pre-commit.
async fn verify_balance_invariant(conn: &mut SqliteConnection, party: PartyRef) -> DbResult<()> {
    let balance = fetch_balance(&mut *conn, party).await?;

    let open_dues: i64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(due_cents), 0)
        FROM obligations
        WHERE party_kind = ?1 AND party_id = ?2 AND status = ?3
        "#,
    )
    .bind(party.kind)
    .bind(party.id)
    .bind(ObligationStatus::Open)
    .fetch_one(&mut *conn)
    .await?;
    let open_dues = Money::from_minor(open_dues);

    if balance != open_dues {
        return Err(CoreError::BalanceMismatch {
            party_kind: party.kind.noun(),
            party_id: party.id,
            balance,
            open_dues,
        }
        .into());
    }

    Ok(())
}

/// Moves the applied amount from due to paid on the sale/purchase header
/// that owns the obligation.
async fn mirror_txn_header(
    conn: &mut SqliteConnection,
    kind: PartyKind,
    txn_id: i64,
    applied: Money,
) -> DbResult<()> {
    let sql = match kind {
        PartyKind::Customer => {
            "UPDATE sales SET paid_cents = paid_cents + ?1, due_cents = due_cents - ?1 WHERE id = ?2"
        }
        PartyKind::Supplier => {
            "UPDATE purchases SET paid_cents = paid_cents + ?1, due_cents = due_cents - ?1 WHERE id = ?2"
        }
    };

    sqlx::query(sql)
        .bind(applied)
        .bind(txn_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Invoice number of the sale/purchase behind an obligation.
async fn txn_invoice(
    conn: &mut SqliteConnection,
    kind: PartyKind,
    txn_id: i64,
) -> DbResult<Option<String>> {
    let sql = match kind {
        PartyKind::Customer => "SELECT invoice_no FROM sales WHERE id = ?1",
        PartyKind::Supplier => "SELECT invoice_no FROM purchases WHERE id = ?1",
    };

    let invoice: Option<Option<String>> = sqlx::query_scalar(sql)
        .bind(txn_id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(invoice.flatten())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::testutil::*;
    use crate::pool::Database;
    use dokan_core::PaymentDirection;

    /// Records a credit sale of `due_minor` for the customer and returns the
    /// sale id (one open obligation per call).
    async fn credit_sale(
        db: &Database,
        customer_id: i64,
        user_id: i64,
        product_id: i64,
        due_minor: i64,
    ) -> i64 {
        let receipt = db
            .sales()
            .create(sale_draft(
                Some(customer_id),
                user_id,
                vec![line(product_id, 1, due_minor)],
                0,
                PaymentMethod::Due,
            ))
            .await
            .unwrap();
        assert_eq!(receipt.due.minor(), due_minor);
        receipt.sale_id
    }

    #[tokio::test]
    async fn test_allocation_settles_oldest_first() {
        let db = test_db().await;
        let user_id = seed_user(&db).await;
        let customer_id = seed_customer(&db, "Rahim").await;
        let product_id = seed_product(&db, "Misc", 0, 100).await;

        let first = credit_sale(&db, customer_id, user_id, product_id, 3000).await;
        let second = credit_sale(&db, customer_id, user_id, product_id, 2500).await;

        // 40.00 covers the first obligation and 10.00 of the second.
        let allocation = db
            .payments()
            .settle(
                PartyRef::customer(customer_id),
                Money::from_minor(4000),
                PaymentMethod::Cash,
                user_id,
                None,
            )
            .await
            .unwrap();

        assert_eq!(allocation.applied_amount.minor(), 4000);
        assert!(allocation.advance_amount.is_zero());

        let (first_due, first_status): (i64, ObligationStatus) =
            sqlx::query_as("SELECT due_cents, status FROM obligations WHERE txn_id = ?1")
                .bind(first)
                .fetch_one(db.pool())
                .await
                .unwrap();
        assert_eq!(first_due, 0);
        assert_eq!(first_status, ObligationStatus::Paid);

        let (second_due, second_status): (i64, ObligationStatus) =
            sqlx::query_as("SELECT due_cents, status FROM obligations WHERE txn_id = ?1")
                .bind(second)
                .fetch_one(db.pool())
                .await
                .unwrap();
        assert_eq!(second_due, 1500);
        assert_eq!(second_status, ObligationStatus::Open);

        // The sale headers mirror the applications: fully settled first
        // sale, partially settled second, paid + due == total on both.
        let first_sale = db.sales().get(first).await.unwrap();
        assert_eq!(first_sale.paid_cents.minor(), 3000);
        assert!(first_sale.due_cents.is_zero());
        let second_sale = db.sales().get(second).await.unwrap();
        assert_eq!(second_sale.paid_cents.minor(), 1000);
        assert_eq!(second_sale.due_cents.minor(), 1500);
        assert_eq!(
            second_sale.paid_cents + second_sale.due_cents,
            second_sale.total_cents
        );

        let balance = db
            .payments()
            .balance(PartyRef::customer(customer_id))
            .await
            .unwrap();
        assert_eq!(balance.minor(), 1500);
    }

    #[tokio::test]
    async fn test_overpayment_becomes_advance() {
        let db = test_db().await;
        let user_id = seed_user(&db).await;
        let customer_id = seed_customer(&db, "Karim").await;
        let product_id = seed_product(&db, "Misc", 0, 100).await;

        credit_sale(&db, customer_id, user_id, product_id, 3000).await;

        let allocation = db
            .payments()
            .settle(
                PartyRef::customer(customer_id),
                Money::from_minor(5000),
                PaymentMethod::Bkash,
                user_id,
                Some("cleared in full".to_string()),
            )
            .await
            .unwrap();

        assert_eq!(allocation.applied_amount.minor(), 3000);
        assert_eq!(allocation.advance_amount.minor(), 2000);

        // The advance is a ledger credit, not a negative balance.
        let balance = db
            .payments()
            .balance(PartyRef::customer(customer_id))
            .await
            .unwrap();
        assert!(balance.is_zero());

        let history = db
            .payments()
            .history(PartyRef::customer(customer_id), 10)
            .await
            .unwrap();
        let advance = history
            .iter()
            .find(|p| p.payment_type == PaymentType::Advance)
            .expect("advance row recorded");
        assert_eq!(advance.amount_cents.minor(), 2000);
        assert!(advance.txn_id.is_none());
    }

    #[tokio::test]
    async fn test_due_payment_rows_reference_invoices() {
        let db = test_db().await;
        let user_id = seed_user(&db).await;
        let customer_id = seed_customer(&db, "Salma").await;
        let product_id = seed_product(&db, "Misc", 0, 100).await;

        credit_sale(&db, customer_id, user_id, product_id, 3000).await;
        credit_sale(&db, customer_id, user_id, product_id, 2500).await;

        db.payments()
            .settle(
                PartyRef::customer(customer_id),
                Money::from_minor(5500),
                PaymentMethod::Cash,
                user_id,
                None,
            )
            .await
            .unwrap();

        let history = db
            .payments()
            .history(PartyRef::customer(customer_id), 10)
            .await
            .unwrap();
        let due_payments: Vec<_> = history
            .iter()
            .filter(|p| p.payment_type == PaymentType::DuePayment)
            .collect();
        assert_eq!(due_payments.len(), 2);
        for payment in due_payments {
            assert!(payment.reference_no.as_deref().unwrap().starts_with("INV-S"));
            assert_eq!(payment.direction, PaymentDirection::In);
        }
    }

    #[tokio::test]
    async fn test_supplier_side_allocation() {
        let db = test_db().await;
        let user_id = seed_user(&db).await;
        let supplier_id = seed_supplier(&db, "City Traders").await;
        let product_id = seed_product(&db, "Oil 1L", 18000, 0).await;

        let purchase_id = db
            .purchases()
            .create(purchase_draft(
                supplier_id,
                user_id,
                vec![line(product_id, 10, 15000)],
                0,
                PaymentMethod::Due,
            ))
            .await
            .unwrap()
            .purchase_id;

        let allocation = db
            .payments()
            .settle(
                PartyRef::supplier(supplier_id),
                Money::from_minor(100000),
                PaymentMethod::Cash,
                user_id,
                None,
            )
            .await
            .unwrap();

        assert_eq!(allocation.applied_amount.minor(), 100000);
        assert!(allocation.advance_amount.is_zero());

        let balance = db
            .payments()
            .balance(PartyRef::supplier(supplier_id))
            .await
            .unwrap();
        assert_eq!(balance.minor(), 50000);

        // The purchase header mirrors the application.
        let purchase = db.purchases().get(purchase_id).await.unwrap();
        assert_eq!(purchase.paid_cents.minor(), 100000);
        assert_eq!(purchase.due_cents.minor(), 50000);

        let history = db
            .payments()
            .history(PartyRef::supplier(supplier_id), 10)
            .await
            .unwrap();
        let due_payment = history
            .iter()
            .find(|p| p.payment_type == PaymentType::DuePayment)
            .unwrap();
        assert_eq!(due_payment.direction, PaymentDirection::Out);
    }

    #[tokio::test]
    async fn test_no_open_obligations_rejected() {
        let db = test_db().await;
        let user_id = seed_user(&db).await;
        let customer_id = seed_customer(&db, "Rahim").await;

        let err = db
            .payments()
            .settle(
                PartyRef::customer(customer_id),
                Money::from_minor(1000),
                PaymentMethod::Cash,
                user_id,
                None,
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_core(),
            Some(CoreError::NoOpenObligations {
                party_kind: "customer"
            })
        ));
    }

    #[tokio::test]
    async fn test_non_positive_amount_rejected() {
        let db = test_db().await;
        let user_id = seed_user(&db).await;
        let customer_id = seed_customer(&db, "Rahim").await;

        for amount in [0, -500] {
            let err = db
                .payments()
                .settle(
                    PartyRef::customer(customer_id),
                    Money::from_minor(amount),
                    PaymentMethod::Cash,
                    user_id,
                    None,
                )
                .await
                .unwrap_err();
            assert!(matches!(
                err.as_core(),
                Some(CoreError::InvalidPaymentAmount { .. })
            ));
        }
    }

    #[tokio::test]
    async fn test_unknown_party_rejected() {
        let db = test_db().await;
        let user_id = seed_user(&db).await;

        let err = db
            .payments()
            .settle(
                PartyRef::customer(999),
                Money::from_minor(1000),
                PaymentMethod::Cash,
                user_id,
                None,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_balance_mirror_matches_open_dues_after_each_settle() {
        let db = test_db().await;
        let user_id = seed_user(&db).await;
        let customer_id = seed_customer(&db, "Rahim").await;
        let product_id = seed_product(&db, "Misc", 0, 100).await;

        for due in [3000, 2500, 2500] {
            credit_sale(&db, customer_id, user_id, product_id, due).await;
        }

        for amount in [1000, 4000, 2000] {
            db.payments()
                .settle(
                    PartyRef::customer(customer_id),
                    Money::from_minor(amount),
                    PaymentMethod::Cash,
                    user_id,
                    None,
                )
                .await
                .unwrap();

            let balance = db
                .payments()
                .balance(PartyRef::customer(customer_id))
                .await
                .unwrap();
            let open: i64 = sqlx::query_scalar(
                "SELECT COALESCE(SUM(due_cents), 0) FROM obligations \
                 WHERE party_kind = 'customer' AND party_id = ?1 AND status = 'open'",
            )
            .bind(customer_id)
            .fetch_one(db.pool())
            .await
            .unwrap();
            assert_eq!(balance.minor(), open);
        }

        // 7000 paid of 8000 owed.
        let balance = db
            .payments()
            .balance(PartyRef::customer(customer_id))
            .await
            .unwrap();
        assert_eq!(balance.minor(), 1000);
    }
}
