//! # Validation Module
//!
//! Server-side totals recomputation and payment splitting.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Request layer (out of scope)                                  │
//! │  ├── Shape/type validation, auth                                        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                   │
//! │  ├── Line items: positive quantity, non-negative price                  │
//! │  ├── Subtotal recomputed from lines (server truth)                      │
//! │  ├── Client-proposed totals verified exactly ("stale cart" guard)       │
//! │  └── paid/due split: paid = min(offered, total), `due` method → 0       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                             │
//! │  ├── CHECK(stock >= 0), NOT NULL, foreign keys                          │
//! │                                                                         │
//! │  Defense in depth: a cart racing a price change is caught in layer 2,   │
//! │  a racing stock change in layer 3's transaction.                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{LineItem, PaymentMethod};
use crate::{MAX_LINE_QUANTITY, MAX_TXN_LINES};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Totals
// =============================================================================

/// Server-recomputed transaction totals.
///
/// Invariant: `total = subtotal + tax - discount`, exactly, in minor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Totals {
    pub subtotal: Money,
    pub tax: Money,
    pub discount: Money,
    pub total: Money,
}

/// The paid/due split of a transaction total.
///
/// Invariant: `paid + due = total` and `due >= 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentSplit {
    pub paid: Money,
    pub due: Money,
}

// =============================================================================
// Line Validation
// =============================================================================

/// Validates the line items of a sale or purchase.
///
/// ## Rules
/// - At least one line
/// - Quantity strictly positive and within the per-line maximum
/// - Price non-negative (free giveaways are legal, negative prices are not)
///
/// ## Example
/// ```rust
/// use dokan_core::money::Money;
/// use dokan_core::types::LineItem;
/// use dokan_core::validation::validate_lines;
///
/// let lines = vec![LineItem { product_id: 1, quantity: 2, price: Money::from_minor(5000) }];
/// assert!(validate_lines(&lines).is_ok());
/// ```
pub fn validate_lines(lines: &[LineItem]) -> ValidationResult<()> {
    if lines.is_empty() {
        return Err(ValidationError::Required { field: "items" });
    }

    if lines.len() > MAX_TXN_LINES {
        return Err(ValidationError::TooManyLines { max: MAX_TXN_LINES });
    }

    for line in lines {
        if line.quantity <= 0 {
            return Err(ValidationError::InvalidQuantity {
                quantity: line.quantity,
            });
        }
        if line.quantity > MAX_LINE_QUANTITY {
            return Err(ValidationError::QuantityTooLarge {
                requested: line.quantity,
                max: MAX_LINE_QUANTITY,
            });
        }
        if line.price.is_negative() {
            return Err(ValidationError::InvalidPrice { price: line.price });
        }
    }

    Ok(())
}

// =============================================================================
// Totals Recomputation
// =============================================================================

/// Recomputes transaction totals from line items (server truth).
///
/// The caller's own subtotal/total are never trusted; this recompute is the
/// single source of the persisted numbers. Minor-unit integers make the
/// "round to currency precision" step of the contract a no-op.
///
/// ## Errors
/// - Line validation failures
/// - Negative tax or discount
/// - A discount large enough to push the total below zero
pub fn compute_totals(lines: &[LineItem], tax: Money, discount: Money) -> CoreResult<Totals> {
    validate_lines(lines)?;

    if tax.is_negative() {
        return Err(ValidationError::MustBePositive { field: "tax" }.into());
    }
    if discount.is_negative() {
        return Err(ValidationError::MustBePositive { field: "discount" }.into());
    }

    let subtotal: Money = lines.iter().map(LineItem::subtotal).sum();
    let total = subtotal + tax - discount;

    if total.is_negative() {
        return Err(ValidationError::NegativeTotal { total }.into());
    }

    Ok(Totals {
        subtotal,
        tax,
        discount,
        total,
    })
}

/// Verifies client-proposed totals against the server recomputation.
///
/// A mismatch means the cart raced a price change; the caller gets a
/// retriable "refresh cart" error rather than a silently adjusted sale.
pub fn verify_client_totals(
    totals: &Totals,
    client_subtotal: Option<Money>,
    client_total: Option<Money>,
) -> CoreResult<()> {
    if let Some(client) = client_subtotal {
        if client != totals.subtotal {
            return Err(CoreError::TotalsMismatch {
                field: "Subtotal",
                client,
                server: totals.subtotal,
            });
        }
    }

    if let Some(client) = client_total {
        if client != totals.total {
            return Err(CoreError::TotalsMismatch {
                field: "Total amount",
                client,
                server: totals.total,
            });
        }
    }

    Ok(())
}

// =============================================================================
// Payment Splitting
// =============================================================================

/// Splits a transaction total into paid and due amounts.
///
/// ## Rules
/// - `due` method: nothing is tendered, the whole total becomes due
/// - otherwise `paid = min(offered, total)` - overpayment at sale time is
///   truncated (standing credit goes through the allocation engine instead)
/// - `due = total - paid`, never negative
///
/// ## Example
/// ```rust
/// use dokan_core::money::Money;
/// use dokan_core::types::PaymentMethod;
/// use dokan_core::validation::split_payment;
///
/// let split = split_payment(Money::from_minor(10500), Money::from_minor(10000), PaymentMethod::Cash);
/// assert_eq!(split.paid.minor(), 10000);
/// assert_eq!(split.due.minor(), 500);
/// ```
pub fn split_payment(total: Money, offered: Money, method: PaymentMethod) -> PaymentSplit {
    let paid = if method == PaymentMethod::Due {
        Money::zero()
    } else {
        offered.clamp_non_negative().min(total)
    };

    PaymentSplit {
        paid,
        due: total - paid,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
