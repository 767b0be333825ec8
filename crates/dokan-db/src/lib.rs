//! # dokan-db: Ledger Layer for the Dokan POS Backend
//!
//! This crate owns all persistence for the ledger engine. It uses SQLite
//! for storage with sqlx for async operations; every ledger operation runs
//! inside a single transaction.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Dokan Ledger Data Flow                            │
//! │                                                                         │
//! │  Request layer (create_sale, due_payment, ...)                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     dokan-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐   │   │
//! │  │   │   Database    │    │    Ledgers    │    │  Migrations  │   │   │
//! │  │   │   (pool.rs)   │    │  (ledger/*)   │    │  (embedded)  │   │   │
//! │  │   │               │    │               │    │              │   │   │
//! │  │   │ SqlitePool    │    │ SaleLedger    │    │ 001_init.sql │   │   │
//! │  │   │ Connection    │◄───│ PurchaseLedger│    │ ...          │   │   │
//! │  │   │ Management    │    │ AllocationLdgr│    │              │   │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘   │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database (WAL mode, single writer)                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`ledger`] - Ledger managers (sale, purchase, allocation, stock, cogs)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dokan_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/dokan.db")).await?;
//!
//! // Record a sale (validates, writes, applies side effects, commits)
//! let receipt = db.sales().create(draft).await?;
//!
//! // Settle a customer's dues oldest-first
//! let allocation = db
//!     .payments()
//!     .settle(PartyRef::customer(7), amount, PaymentMethod::Cash, user_id, None)
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod ledger;
pub mod migrations;
pub mod pool;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Ledger manager re-exports for convenience
pub use ledger::allocation::AllocationLedger;
pub use ledger::cogs::CogsTracker;
pub use ledger::purchase::PurchaseLedger;
pub use ledger::sale::SaleLedger;
pub use ledger::stock::StockLedger;
