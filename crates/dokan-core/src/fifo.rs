//! # FIFO Lot Cost Tracker
//!
//! Computes cost of goods sold by replaying the full purchase/sale event
//! history through per-product lot queues.
//!
//! ## The Replay Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      FIFO Cost Replay                                    │
//! │                                                                         │
//! │  Event history (all time, ordered):                                     │
//! │    P: +10 @ 8.00    P: +5 @ 9.00    S: -12    S: -2                     │
//! │         │                │              │         │                     │
//! │         ▼                ▼              ▼         ▼                     │
//! │  Lot queue (per product, oldest first):                                 │
//! │    [10 @ 8.00] ──► [10 @ 8.00][5 @ 9.00] ──► [3 @ 9.00] ──► [1 @ 9.00]  │
//! │                                                                         │
//! │  Sale of 12 consumes 10 @ 8.00 + 2 @ 9.00 = 98.00 cost.                 │
//! │                                                                         │
//! │  The replay always starts at the beginning of history (lot state        │
//! │  depends on everything before the reporting window); only sales whose   │
//! │  timestamp falls inside [from, to] contribute to the totals.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ordering
//! Events are replayed in `(timestamp, kind)` order with purchases before
//! sales at the same instant, so a delivery booked in the same second as a
//! sale is on the shelf first. Ties beyond that keep input order (stable
//! sort), which callers make deterministic by feeding events in id order.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};

use crate::money::Money;

// =============================================================================
// Event Types
// =============================================================================

/// A single inventory cost event in the replay stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CostEvent {
    /// Units received at a known unit cost. Opens a new lot.
    Purchase {
        product_id: i64,
        quantity: i64,
        unit_cost: Money,
        at: DateTime<Utc>,
    },
    /// Units sold. Consumes lots oldest-first.
    Sale {
        product_id: i64,
        quantity: i64,
        at: DateTime<Utc>,
    },
}

impl CostEvent {
    fn at(&self) -> DateTime<Utc> {
        match self {
            CostEvent::Purchase { at, .. } | CostEvent::Sale { at, .. } => *at,
        }
    }

    /// Sort rank within a single instant: purchases land before sales.
    fn instant_rank(&self) -> u8 {
        match self {
            CostEvent::Purchase { .. } => 0,
            CostEvent::Sale { .. } => 1,
        }
    }
}

/// Aggregate result of a cost replay over a reporting window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CogsSummary {
    /// Total cost of goods sold inside the window.
    pub total_cost: Money,
    /// Total units sold inside the window.
    pub units_sold: i64,
}

// =============================================================================
// Per-Product Lot State
// =============================================================================

/// An open purchase lot: remaining units at their acquisition cost.
#[derive(Debug, Clone, Copy)]
struct Lot {
    quantity: i64,
    unit_cost: Money,
}

/// Lot queue plus the running purchase aggregates used for the
/// shortfall fallback.
#[derive(Debug, Default)]
struct ProductLots {
    lots: VecDeque<Lot>,
    purchased_units: i64,
    purchased_cost: Money,
}

impl ProductLots {
    fn receive(&mut self, quantity: i64, unit_cost: Money) {
        self.lots.push_back(Lot {
            quantity,
            unit_cost,
        });
        self.purchased_units += quantity;
        self.purchased_cost += unit_cost * quantity;
    }

    /// Consumes `quantity` units oldest-first and returns their cost.
    ///
    /// If the queue runs dry (sales recorded before any priced purchase, or
    /// stock adjusted outside the ledger), the uncovered remainder is priced
    /// at the average historical purchase cost for the product. With no
    /// purchase history at all it costs zero rather than failing the report.
    fn consume(&mut self, quantity: i64) -> Money {
        let mut remaining = quantity;
        let mut cost = Money::zero();

        while remaining > 0 {
            let Some(front) = self.lots.front_mut() else {
                break;
            };
            let take = front.quantity.min(remaining);
            cost += front.unit_cost * take;
            front.quantity -= take;
            remaining -= take;
            if front.quantity == 0 {
                self.lots.pop_front();
            }
        }

        if remaining > 0 && self.purchased_units > 0 {
            let avg = Money::from_minor(self.purchased_cost.minor() / self.purchased_units);
            cost += avg * remaining;
        }

        cost
    }
}

// =============================================================================
// Replay
// =============================================================================

/// Replays the full event history and returns the cost of goods sold for
/// sales inside `[from, to]` (inclusive).
///
/// The event vector must cover all history up to `to`; lot state at the
/// start of the window cannot be reconstructed from the window alone.
///
/// ## Example
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use dokan_core::fifo::{fifo_cost_of_goods, CostEvent};
/// use dokan_core::money::Money;
///
/// let t = |s| Utc.timestamp_opt(s, 0).unwrap();
/// let events = vec![
///     CostEvent::Purchase { product_id: 1, quantity: 10, unit_cost: Money::from_minor(800), at: t(0) },
///     CostEvent::Sale { product_id: 1, quantity: 4, at: t(10) },
/// ];
/// let summary = fifo_cost_of_goods(events, t(0), t(100));
/// assert_eq!(summary.total_cost.minor(), 3200);
/// assert_eq!(summary.units_sold, 4);
/// ```
pub fn fifo_cost_of_goods(
    mut events: Vec<CostEvent>,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> CogsSummary {
    // Stable: equal keys keep caller order (id ASC).
    events.sort_by_key(|e| (e.at(), e.instant_rank()));

    let mut products: HashMap<i64, ProductLots> = HashMap::new();
    let mut summary = CogsSummary::default();

    for event in events {
        match event {
            CostEvent::Purchase {
                product_id,
                quantity,
                unit_cost,
                at: _,
            } => {
                products.entry(product_id).or_default().receive(quantity, unit_cost);
            }
            CostEvent::Sale {
                product_id,
                quantity,
                at,
            } => {
                let cost = products.entry(product_id).or_default().consume(quantity);
                if at >= from && at <= to {
                    summary.total_cost += cost;
                    summary.units_sold += quantity;
                }
            }
        }
    }

    summary
}

// =============================================================================
// Unit Tests
// =============================================================================
