//! # Error Types
//!
//! Domain-specific error types for dokan-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  dokan-core errors (this file)                                          │
//! │  ├── CoreError        - Business rule violations                        │
//! │  └── ValidationError  - Input validation failures                       │
//! │                                                                         │
//! │  dokan-db errors (separate crate)                                       │
//! │  └── DbError          - Database/transaction failures                   │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → request layer            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (product name, amounts, etc.)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a user-facing message

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations detected by the ledger
/// engine. They fall into three of the four ledger error classes:
/// validation (caller fixes input and retries), conflict (surfaced to the
/// user, never retried automatically) and integrity (caller misuse).
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product referenced by a line item does not exist.
    #[error("Product not found: {0}")]
    ProductNotFound(i64),

    /// Insufficient stock to complete a sale line.
    ///
    /// ## When This Occurs
    /// - A completed sale asks for more units than are on hand
    /// - A pending sale is reconciled after stock dropped in the interim
    ///
    /// Conflict error: the second of two racing sales of the last unit
    /// lands here after the first one commits.
    #[error("Not enough stock for {name}: available {available}, requested {requested}")]
    InsufficientStock {
        name: String,
        available: i64,
        requested: i64,
    },

    /// Sale not found.
    #[error("Sale not found: {0}")]
    SaleNotFound(i64),

    /// Sale is not in a state that allows the requested operation.
    ///
    /// ## When This Occurs
    /// - Reconciling a sale that is already completed
    #[error("Sale {sale_id} is {current_status}, cannot perform operation")]
    InvalidSaleStatus { sale_id: i64, current_status: String },

    /// Client-proposed totals disagree with the server-side recomputation.
    ///
    /// The cart raced a price change; the caller should refresh and resubmit.
    #[error("{field} mismatch. Please refresh cart.")]
    TotalsMismatch {
        field: &'static str,
        client: Money,
        server: Money,
    },

    /// A payment was offered against a party with no open obligations.
    #[error("No open dues found for this {party_kind}")]
    NoOpenObligations { party_kind: &'static str },

    /// Payment amount is invalid (zero, negative, or otherwise unusable).
    #[error("Invalid payment amount: {reason}")]
    InvalidPaymentAmount { reason: String },

    /// A party's aggregate balance drifted from the sum of its open
    /// obligations. The allocation engine checks this before every commit;
    /// seeing it means some code path mutated the balance directly.
    #[error("Balance mismatch for {party_kind} {party_id}: balance {balance}, open dues {open_dues}")]
    BalanceMismatch {
        party_kind: &'static str,
        party_id: i64,
        balance: Money,
        open_dues: Money,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller input doesn't meet requirements.
/// Used for early validation before any row is touched.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: &'static str },

    /// A line item quantity is zero or negative.
    #[error("Invalid item quantity: {quantity}")]
    InvalidQuantity { quantity: i64 },

    /// A line item price is negative.
    #[error("Invalid item price: {price}")]
    InvalidPrice { price: Money },

    /// Quantity exceeds the per-line maximum.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// Too many line items in one transaction.
    #[error("Transaction cannot have more than {max} line items")]
    TooManyLines { max: usize },

    /// Computed total would be negative (discount exceeds subtotal + tax).
    #[error("Total cannot be negative: {total}")]
    NegativeTotal { total: Money },

    /// Amount must be strictly positive.
    #[error("{field} must be positive")]
    MustBePositive { field: &'static str },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
