//! # dokan-core: Pure Business Logic for the Dokan Ledger Engine
//!
//! This crate is the **heart** of the Dokan POS backend. It contains all
//! business logic as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Dokan Ledger Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     Request Layer (out of scope)                │   │
//! │  │   create_sale ──► due_payment ──► create_purchase ──► reports   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ dokan-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐   │   │
//! │  │   │   types   │  │   money   │  │ validation│  │   fifo    │   │   │
//! │  │   │   Sale    │  │   Money   │  │  totals   │  │ lot queues│   │   │
//! │  │   │ Obligation│  │ paid/due  │  │  checks   │  │ cost replay│  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘   │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    dokan-db (Ledger Layer)                      │   │
//! │  │       SQLite transactions, migrations, ledger managers          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Sale, Purchase, Obligation, Payment, etc.)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Domain error types
//! - [`validation`] - Totals recomputation and payment splitting
//! - [`fifo`] - FIFO lot cost tracker (pure replay over the event history)
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in minor units (i64)
//! 4. **Explicit Errors**: All errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod fifo;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use dokan_core::Money` instead of
// `use dokan_core::money::Money`

pub use error::{CoreError, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum line items allowed in a single sale or purchase.
///
/// ## Business Reason
/// Prevents runaway carts and keeps transactions (and their row locks) short.
pub const MAX_TXN_LINES: usize = 100;

/// Maximum quantity of a single line item.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
pub const MAX_LINE_QUANTITY: i64 = 999;

/// Zero-padded width of the sequential part of an invoice number.
///
/// `INV-S000042` / `INV-P000007` - the sequence embeds the assigned row id,
/// so the invoice can only be derived after the header row exists.
pub const INVOICE_PAD_WIDTH: usize = 6;
