// src/model/ledger.rs

use crate::model::SHELF_LIFE_DAYS;
use serde::{Deserialize, Serialize};

/// Outcome of serving one period's demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fulfillment {
    pub served: u32,
    pub shortage: u32,
}

/// On-hand stock partitioned by age in days.
///
/// Bucket 0 holds units delivered this step, bucket `SHELF_LIFE_DAYS - 1`
/// holds units that expire unless they are consumed before the next aging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InventoryLedger {
    buckets: [u32; SHELF_LIFE_DAYS],
}

impl InventoryLedger {
    pub fn new(buckets: [u32; SHELF_LIFE_DAYS]) -> Self {
        Self { buckets }
    }

    pub fn buckets(&self) -> [u32; SHELF_LIFE_DAYS] {
        self.buckets
    }

    /// Total units on the shelf. Saturates instead of overflowing.
    pub fn on_hand(&self) -> u32 {
        self.buckets
            .iter()
            .fold(0u32, |total, &units| total.saturating_add(units))
    }

    /// Step 1: Deliveries land in the freshest bucket.
    pub fn receive(&mut self, quantity: u32) {
        self.buckets[0] = self.buckets[0].saturating_add(quantity);
    }

    /// Step 3: Serve demand first-expiring-first-out.
    ///
    /// Oldest stock is drained first so that fresh units survive longer.
    pub fn fulfill(&mut self, demand: u32) -> Fulfillment {
        let mut remaining = demand;
        for bucket in self.buckets.iter_mut().rev() {
            if remaining == 0 {
                break;
            }
            let used = (*bucket).min(remaining);
            *bucket -= used;
            remaining -= used;
        }

        Fulfillment {
            served: demand - remaining,
            shortage: remaining,
        }
    }

    /// Step 4: Advance every bucket by one day.
    ///
    /// Returns the units that were still in the oldest bucket, i.e. the waste.
    pub fn age(&mut self) -> u32 {
        let expired = self.buckets[SHELF_LIFE_DAYS - 1];
        self.buckets.copy_within(0..SHELF_LIFE_DAYS - 1, 1);
        self.buckets[0] = 0;
        expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fulfill_consumes_oldest_first() {
        let mut ledger = InventoryLedger::new([5, 0, 0, 3, 0, 0, 4]);
        let result = ledger.fulfill(6);
        assert_eq!(result, Fulfillment { served: 6, shortage: 0 });
        assert_eq!(ledger.buckets(), [5, 0, 0, 1, 0, 0, 0]);
    }

    #[test]
    fn fulfill_reports_shortage_when_stock_runs_out() {
        let mut ledger = InventoryLedger::new([2, 0, 0, 0, 0, 0, 1]);
        let result = ledger.fulfill(10);
        assert_eq!(result, Fulfillment { served: 3, shortage: 7 });
        assert_eq!(ledger.on_hand(), 0);
    }

    #[test]
    fn aging_shifts_buckets_and_expires_oldest() {
        let mut ledger = InventoryLedger::new([1, 2, 3, 4, 5, 6, 7]);
        let waste = ledger.age();
        assert_eq!(waste, 7);
        assert_eq!(ledger.buckets(), [0, 1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn received_units_expire_after_shelf_life() {
        let mut ledger = InventoryLedger::default();
        ledger.receive(9);
        let mut waste = Vec::new();
        for _ in 0..SHELF_LIFE_DAYS {
            waste.push(ledger.age());
        }
        assert_eq!(waste, vec![0, 0, 0, 0, 0, 0, 9]);
        assert_eq!(ledger.on_hand(), 0);
    }

    #[test]
    fn huge_buckets_do_not_overflow() {
        let mut ledger = InventoryLedger::new([u32::MAX / 2; SHELF_LIFE_DAYS]);
        assert_eq!(ledger.on_hand(), u32::MAX);
        ledger.receive(u32::MAX);
        assert_eq!(ledger.buckets()[0], u32::MAX);
    }
}
