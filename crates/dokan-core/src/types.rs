//! # Domain Types
//!
//! Core domain types for the Dokan ledger engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Sale       │   │   Obligation    │   │  PaymentRecord  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  invoice_no     │   │  party_kind/id  │   │  payment_type   │       │
//! │  │  total/paid/due │   │  due_cents      │   │  direction      │       │
//! │  │  status         │   │  open | paid    │   │  amount_cents   │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   SaleStatus    │   │  PaymentMethod  │   │  StockMovement  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  Pending        │   │  Cash Card Due  │   │  signed delta   │       │
//! │  │  Completed      │   │  Bkash Nagad    │   │  SALE/PURCHASE  │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Row structs map 1:1 onto tables (`*_cents` columns carry [`Money`]);
//! draft/receipt structs are the request-layer contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Sale Status
// =============================================================================

/// Lifecycle status of a sale.
///
/// A `pending` sale has a header and lines but **no** stock or ledger side
/// effects; those are applied when the reconciler completes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    /// Reserved but uncommitted; paid = due = 0, stock untouched.
    Pending,
    /// Fully recorded: stock moved, balances and obligations updated.
    Completed,
}

impl SaleStatus {
    /// Text form as stored in the `sales.status` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Pending => "pending",
            SaleStatus::Completed => "completed",
        }
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// How a payment was tendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Physical cash.
    Cash,
    /// Card on an external terminal.
    Card,
    /// bKash mobile banking.
    Bkash,
    /// Nagad mobile banking.
    Nagad,
    /// Explicit credit sale: forces paid = 0, whole total becomes due.
    Due,
}

// =============================================================================
// Payment Type & Direction
// =============================================================================

/// What a payment ledger entry represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    /// Money received/sent at transaction time.
    Payment,
    /// Money applied against an existing obligation.
    DuePayment,
    /// Residual beyond all open obligations, held as a future credit.
    Advance,
}

/// Direction of money movement relative to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum PaymentDirection {
    /// Inbound (customer pays the store).
    In,
    /// Outbound (store pays a supplier).
    Out,
}

// =============================================================================
// Stock Movement Reason
// =============================================================================

/// Reason tag on an inventory log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
pub enum MovementReason {
    /// Outbound stock (negative delta), referenced by the sale invoice.
    Sale,
    /// Inbound stock (positive delta), referenced by the purchase invoice.
    Purchase,
}

// =============================================================================
// Party Kind
// =============================================================================

/// Which side of the ledger a party sits on.
///
/// Customers owe the store (`debt`); the store owes suppliers (`payable`).
/// The allocation engine is generic over both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum PartyKind {
    Customer,
    Supplier,
}

impl PartyKind {
    /// Noun for error messages ("No open dues found for this customer").
    pub fn noun(&self) -> &'static str {
        match self {
            PartyKind::Customer => "customer",
            PartyKind::Supplier => "supplier",
        }
    }

    /// Direction of a due/advance payment for this party kind.
    pub fn payment_direction(&self) -> PaymentDirection {
        match self {
            PartyKind::Customer => PaymentDirection::In,
            PartyKind::Supplier => PaymentDirection::Out,
        }
    }
}

/// A party reference: kind + id, as used by the allocation engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyRef {
    pub kind: PartyKind,
    pub id: i64,
}

impl PartyRef {
    pub fn customer(id: i64) -> Self {
        PartyRef {
            kind: PartyKind::Customer,
            id,
        }
    }

    pub fn supplier(id: i64) -> Self {
        PartyRef {
            kind: PartyKind::Supplier,
            id,
        }
    }
}

// =============================================================================
// Obligation Status
// =============================================================================

/// Status of an obligation (a per-transaction open balance).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum ObligationStatus {
    /// Carries a nonzero remaining due amount.
    Open,
    /// Fully settled by the allocation engine.
    Paid,
}

// =============================================================================
// Row Types
// =============================================================================

/// A product row, as far as the ledger engine is concerned.
///
/// Master-data CRUD lives elsewhere; the ledger only reads price/stock and
/// mutates stock through the Stock Ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price_cents: Money,
    /// On-hand quantity. Never negative; enforced by a guarded decrement
    /// plus a CHECK constraint.
    pub stock: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A sale header row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    pub id: i64,
    /// Assigned after insert; embeds the sequential row id (`INV-S000042`).
    pub invoice_no: Option<String>,
    pub customer_id: Option<i64>,
    pub user_id: i64,
    pub subtotal_cents: Money,
    pub tax_cents: Money,
    pub discount_cents: Money,
    pub total_cents: Money,
    pub paid_cents: Money,
    pub due_cents: Money,
    pub status: SaleStatus,
    pub payment_method: PaymentMethod,
    pub created_at: DateTime<Utc>,
}

/// A sale line item. Created once, immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleLine {
    pub id: i64,
    pub sale_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    pub price_cents: Money,
    /// quantity × price, frozen at sale time.
    pub subtotal_cents: Money,
}

/// A purchase header row (inbound stock from a supplier).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Purchase {
    pub id: i64,
    pub invoice_no: Option<String>,
    pub supplier_id: i64,
    pub user_id: i64,
    pub subtotal_cents: Money,
    pub tax_cents: Money,
    pub discount_cents: Money,
    pub total_cents: Money,
    pub paid_cents: Money,
    pub due_cents: Money,
    pub payment_method: PaymentMethod,
    pub created_at: DateTime<Utc>,
}

/// A purchase line item.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PurchaseLine {
    pub id: i64,
    pub purchase_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    pub price_cents: Money,
    pub subtotal_cents: Money,
}

/// An open (or settled) balance tied to exactly one sale or purchase.
///
/// Created when a transaction completes with `due > 0`; mutated only by the
/// allocation engine, which reduces `due_cents` and flips the status to
/// `paid` at zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Obligation {
    pub id: i64,
    pub party_kind: PartyKind,
    pub party_id: i64,
    /// The owning sale id (customer) or purchase id (supplier).
    pub txn_id: i64,
    pub due_cents: Money,
    pub status: ObligationStatus,
    pub created_at: DateTime<Utc>,
}

/// An immutable payment ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PaymentRecord {
    pub id: i64,
    pub party_kind: PartyKind,
    /// `None` for sale-time payments by walk-in customers.
    pub party_id: Option<i64>,
    /// Owning sale/purchase for `payment` and `due_payment` entries;
    /// `None` for advances (held against future obligations).
    pub txn_id: Option<i64>,
    pub amount_cents: Money,
    pub payment_type: PaymentType,
    pub direction: PaymentDirection,
    pub method: PaymentMethod,
    pub user_id: i64,
    /// Invoice number of the referenced transaction.
    pub reference_no: Option<String>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An append-only inventory log entry (the stock audit trail).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockMovement {
    pub id: i64,
    pub product_id: i64,
    /// Signed: negative for sales, positive for purchases.
    pub change_qty: i64,
    pub reason: MovementReason,
    /// Invoice number of the transaction that caused the movement.
    pub reference: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Request / Response Types
// =============================================================================

/// One `{product, quantity, unit price}` line as submitted by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: i64,
    pub quantity: i64,
    pub price: Money,
}

impl LineItem {
    /// Line subtotal (quantity × price).
    pub fn subtotal(&self) -> Money {
        self.price.multiply_quantity(self.quantity)
    }
}

/// Everything the request layer supplies to create a sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleDraft {
    pub customer_id: Option<i64>,
    /// Cashier recording the sale.
    pub user_id: i64,
    pub lines: Vec<LineItem>,
    /// Client-proposed subtotal; verified against the server recompute.
    pub client_subtotal: Option<Money>,
    pub tax: Money,
    pub discount: Money,
    /// Client-proposed total; verified against the server recompute.
    pub client_total: Option<Money>,
    /// Amount tendered at sale time.
    pub paid: Money,
    pub payment_method: PaymentMethod,
    /// Create as `pending`: header + lines only, all side effects deferred.
    pub pending: bool,
}

/// Everything the request layer supplies to create a purchase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseDraft {
    pub supplier_id: i64,
    pub user_id: i64,
    pub lines: Vec<LineItem>,
    pub client_subtotal: Option<Money>,
    pub tax: Money,
    pub discount: Money,
    pub client_total: Option<Money>,
    pub paid: Money,
    pub payment_method: PaymentMethod,
}

/// Result of a recorded sale, echoed back to the request layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleReceipt {
    pub sale_id: i64,
    pub invoice_no: String,
    pub subtotal: Money,
    pub tax: Money,
    pub discount: Money,
    pub total: Money,
    pub paid: Money,
    pub due: Money,
    pub status: SaleStatus,
}

/// Result of a recorded purchase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseReceipt {
    pub purchase_id: i64,
    pub invoice_no: String,
    pub subtotal: Money,
    pub tax: Money,
    pub discount: Money,
    pub total: Money,
    pub paid: Money,
    pub due: Money,
}

/// Outcome of a due/advance allocation: how much settled obligations and
/// how much was carried forward as a credit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub applied_amount: Money,
    pub advance_amount: Money,
}

// =============================================================================
// Unit Tests
// =============================================================================
