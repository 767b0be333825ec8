//! # Ledger Managers
//!
//! Each submodule owns one transactional concern:
//!
//! - [`sale`] - Sale recording and the pending-sale reconciler
//! - [`purchase`] - Purchase recording (inbound stock)
//! - [`allocation`] - Due/advance payment allocation against open obligations
//! - [`stock`] - Guarded stock mutation and the inventory audit trail
//! - [`cogs`] - FIFO cost-of-goods-sold reporting
//!
//! ## Transaction Discipline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Every multi-row operation runs inside ONE SQLite transaction:          │
//! │                                                                         │
//! │    begin ── validate ── write header ── write lines ── side effects     │
//! │      │                                                      │           │
//! │      │                 any error ───────────────────► rollback          │
//! │      └──────────────────────────────────────────────► commit            │
//! │                                                                         │
//! │  A failed sale leaves no header, no lines, no stock change, no          │
//! │  obligation and no payment row. Idempotent retries come for free.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod allocation;
pub mod cogs;
pub mod purchase;
pub mod sale;
pub mod stock;

use dokan_core::INVOICE_PAD_WIDTH;

/// Formats a sale invoice number from the assigned row id: `INV-S000042`.
pub(crate) fn sale_invoice_no(sale_id: i64) -> String {
    format!("INV-S{:0width$}", sale_id, width = INVOICE_PAD_WIDTH)
}

/// Formats a purchase invoice number: `INV-P000007`.
pub(crate) fn purchase_invoice_no(purchase_id: i64) -> String {
    format!("INV-P{:0width$}", purchase_id, width = INVOICE_PAD_WIDTH)
}


// =============================================================================
// Test Fixtures
// =============================================================================
