//! Physical note inventory held by the ATM.

use parking_lot::Mutex;
use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};

use cashpoint_common::{AtmError, CashBundle, Denomination, NoteCount, Result};

use crate::config::InventoryConfig;

/// Notes of one denomination currently in the machine.
#[derive(Debug, Clone, Copy)]
struct Slot {
    denomination: Denomination,
    count: u32,
}

/// Note counts per denomination, largest face value first.
///
/// `allocate` and `refund` hold the inventory lock for their whole span, so
/// the total-cash check and the per-slot decrements are one atomic step for
/// concurrent callers.
pub struct DenominationInventory {
    slots: Mutex<Vec<Slot>>,
    smallest: Denomination,
}

impl DenominationInventory {
    /// Load the inventory from cassette configuration.
    pub fn new(config: &InventoryConfig) -> Result<Self> {
        config.validate().map_err(AtmError::ConfigurationError)?;

        let mut slots = config
            .cassettes
            .iter()
            .map(|c| {
                Denomination::new(c.face_value)
                    .map(|denomination| Slot {
                        denomination,
                        count: c.count,
                    })
                    .ok_or_else(|| AtmError::ConfigurationError("Face value cannot be 0".into()))
            })
            .collect::<Result<Vec<_>>>()?;
        slots.sort_by(|a, b| b.denomination.cmp(&a.denomination));

        let smallest = slots
            .last()
            .map(|s| s.denomination)
            .ok_or_else(|| AtmError::ConfigurationError("No cassettes loaded".into()))?;

        let inventory = Self {
            slots: Mutex::new(slots),
            smallest,
        };

        info!(
            levels = %inventory.levels(),
            total = inventory.total_cash(),
            "Initializing cash inventory"
        );

        Ok(inventory)
    }

    /// Take notes worth exactly `amount` out of the inventory.
    ///
    /// Walks denominations from largest to smallest taking as many notes of
    /// each as fit. Every visited denomination appears in the bundle, with a
    /// zero count when none were taken. On any failure the inventory is left
    /// untouched.
    pub fn allocate(&self, amount: u32) -> Result<CashBundle> {
        if amount == 0 {
            return Err(AtmError::InvalidAmount {
                amount: Decimal::ZERO,
                reason: "amount must be positive".to_string(),
            });
        }

        if amount % self.smallest.value() != 0 {
            return Err(AtmError::AmountNotDispensable {
                amount,
                smallest: self.smallest.value(),
            });
        }

        let mut slots = self.slots.lock();

        let available = total_of(&slots);
        if u64::from(amount) > available {
            return Err(AtmError::InsufficientInventory {
                requested: amount,
                available: saturate(available),
            });
        }

        let mut remaining = amount;
        let mut taken = Vec::with_capacity(slots.len());
        for slot in slots.iter() {
            let notes = (remaining / slot.denomination.value()).min(slot.count);
            debug!(
                denomination = %slot.denomination,
                on_hand = slot.count,
                notes,
                "Taking notes"
            );
            remaining -= notes * slot.denomination.value();
            taken.push(notes);
            if remaining == 0 {
                break;
            }
        }

        if remaining != 0 {
            warn!(
                amount,
                shortfall = remaining,
                "Note mix cannot cover amount"
            );
            return Err(AtmError::InsufficientInventory {
                requested: amount,
                available: saturate(available),
            });
        }

        let mut bundle = CashBundle::new();
        for (slot, notes) in slots.iter_mut().zip(taken) {
            slot.count -= notes;
            bundle.push(slot.denomination, notes);
        }

        info!(amount, notes = %bundle, "Cash allocated");
        Ok(bundle)
    }

    /// Put previously allocated notes back.
    ///
    /// Entries for denominations this inventory does not hold are skipped.
    pub fn refund(&self, bundle: &CashBundle) {
        let mut slots = self.slots.lock();

        for entry in bundle.iter() {
            match slots
                .iter_mut()
                .find(|s| s.denomination == entry.denomination)
            {
                Some(slot) => {
                    debug!(denomination = %entry.denomination, notes = entry.count, "Refunding notes");
                    slot.count = match slot.count.checked_add(entry.count) {
                        Some(count) => count,
                        None => {
                            error!(
                                denomination = %entry.denomination,
                                on_hand = slot.count,
                                notes = entry.count,
                                lost = entry.count - (u32::MAX - slot.count),
                                "Refund overflows cassette count, notes not recorded"
                            );
                            u32::MAX
                        }
                    };
                }
                None => {
                    warn!(denomination = %entry.denomination, notes = entry.count, "Refund for unknown denomination ignored");
                }
            }
        }

        info!(notes = %bundle, total = bundle.total(), "Cash refunded");
    }

    /// Value of all notes on hand.
    pub fn total_cash(&self) -> u64 {
        total_of(&self.slots.lock())
    }

    /// Current note count per denomination, largest first.
    pub fn levels(&self) -> CashBundle {
        self.slots
            .lock()
            .iter()
            .map(|s| NoteCount::new(s.denomination, s.count))
            .collect::<Vec<_>>()
            .into()
    }

    /// Smallest face value held.
    pub fn smallest_denomination(&self) -> Denomination {
        self.smallest
    }
}

fn total_of(slots: &[Slot]) -> u64 {
    slots
        .iter()
        .map(|s| u64::from(s.denomination.value()) * u64::from(s.count))
        .sum()
}

fn saturate(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CassetteConfig;
    use cashpoint_common::ErrorKind;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn create_test_inventory() -> DenominationInventory {
        DenominationInventory::new(&InventoryConfig::default()).unwrap()
    }

    fn pairs(bundle: &CashBundle) -> Vec<(u32, u32)> {
        bundle
            .iter()
            .map(|n| (n.denomination.value(), n.count))
            .collect()
    }

    #[test]
    fn test_fresh_inventory_holds_1500() {
        let inventory = create_test_inventory();
        assert_eq!(inventory.total_cash(), 1500);
        assert_eq!(inventory.smallest_denomination(), Denomination::FIVE);
    }

    #[test]
    fn test_allocate_1410() {
        let inventory = create_test_inventory();

        let bundle = inventory.allocate(1410).unwrap();

        assert_eq!(pairs(&bundle), vec![(50, 10), (20, 30), (10, 30), (5, 2)]);
        assert_eq!(bundle.total(), 1410);
        assert_eq!(inventory.total_cash(), 90);
    }

    #[test]
    fn test_allocate_everything() {
        let inventory = create_test_inventory();

        let bundle = inventory.allocate(1500).unwrap();

        assert_eq!(pairs(&bundle), vec![(50, 10), (20, 30), (10, 30), (5, 20)]);
        assert_eq!(inventory.total_cash(), 0);
    }

    #[test]
    fn test_allocate_stops_when_covered() {
        let inventory = create_test_inventory();

        let bundle = inventory.allocate(600).unwrap();

        assert_eq!(pairs(&bundle), vec![(50, 10), (20, 5)]);
        assert_eq!(inventory.total_cash(), 900);
    }

    #[test]
    fn test_allocate_keeps_zero_entries() {
        let inventory = create_test_inventory();

        let bundle = inventory.allocate(245).unwrap();

        assert_eq!(pairs(&bundle), vec![(50, 4), (20, 2), (10, 0), (5, 1)]);
        assert_eq!(inventory.total_cash(), 1255);
    }

    #[test]
    fn test_non_multiple_is_rejected() {
        let inventory = create_test_inventory();

        let err = inventory.allocate(143).unwrap_err();

        assert!(matches!(err, AtmError::AmountNotDispensable { amount: 143, smallest: 5 }));
        assert_eq!(err.kind(), ErrorKind::Rejected);
        assert_eq!(inventory.total_cash(), 1500);
    }

    #[test]
    fn test_overdraw_is_rejected() {
        let inventory = create_test_inventory();

        let err = inventory.allocate(2000).unwrap_err();

        assert!(matches!(
            err,
            AtmError::InsufficientInventory { requested: 2000, available: 1500 }
        ));
        assert_eq!(err.kind(), ErrorKind::Rejected);
        assert_eq!(inventory.total_cash(), 1500);
    }

    #[test]
    fn test_zero_is_rejected() {
        let inventory = create_test_inventory();
        let err = inventory.allocate(0).unwrap_err();
        assert!(matches!(err, AtmError::InvalidAmount { .. }));
        assert_eq!(inventory.total_cash(), 1500);
    }

    #[test]
    fn test_wrong_note_mix_rolls_back() {
        // 60 is three twenties, but greedy takes the fifty first and strands 10.
        let config = InventoryConfig {
            cassettes: vec![
                CassetteConfig::new(50, 1),
                CassetteConfig::new(20, 3),
                CassetteConfig::new(10, 0),
            ],
        };
        let inventory = DenominationInventory::new(&config).unwrap();
        let before = inventory.levels();

        let err = inventory.allocate(60).unwrap_err();

        assert!(matches!(err, AtmError::InsufficientInventory { requested: 60, .. }));
        assert_eq!(inventory.levels(), before);
        assert_eq!(inventory.total_cash(), 110);
    }

    #[test]
    fn test_faces_must_share_the_smallest_unit() {
        // 70 is one fifty and one twenty, which a multiple-of-20 check would refuse.
        let config = InventoryConfig {
            cassettes: vec![CassetteConfig::new(50, 10), CassetteConfig::new(20, 10)],
        };

        let err = DenominationInventory::new(&config).err().unwrap();

        assert!(matches!(err, AtmError::ConfigurationError(_)));
    }

    #[test]
    fn test_refund_restores_counts() {
        let inventory = create_test_inventory();
        let before = inventory.levels();

        let bundle = inventory.allocate(1410).unwrap();
        inventory.refund(&bundle);

        assert_eq!(inventory.levels(), before);
        assert_eq!(inventory.total_cash(), 1500);
    }

    #[test]
    fn test_refund_ignores_unknown_denomination() {
        let inventory = create_test_inventory();
        let bundle = CashBundle::from(vec![
            NoteCount::new(Denomination::new(100).unwrap(), 2),
            NoteCount::new(Denomination::TEN, 1),
        ]);

        inventory.refund(&bundle);

        assert_eq!(inventory.total_cash(), 1510);
    }

    #[test]
    fn test_refund_overflow_caps_count() {
        let config = InventoryConfig {
            cassettes: vec![CassetteConfig::new(5, u32::MAX - 1)],
        };
        let inventory = DenominationInventory::new(&config).unwrap();

        inventory.refund(&CashBundle::from(vec![NoteCount::new(Denomination::FIVE, 3)]));

        assert_eq!(pairs(&inventory.levels()), vec![(5, u32::MAX)]);
    }

    #[test]
    fn test_unsorted_config_is_ordered_largest_first() {
        let config = InventoryConfig {
            cassettes: vec![
                CassetteConfig::new(5, 1),
                CassetteConfig::new(50, 1),
                CassetteConfig::new(20, 1),
            ],
        };
        let inventory = DenominationInventory::new(&config).unwrap();

        let faces: Vec<u32> = inventory.levels().iter().map(|n| n.denomination.value()).collect();
        assert_eq!(faces, vec![50, 20, 5]);
    }

    #[test]
    fn test_concurrent_allocations_never_overdraw() {
        let inventory = Arc::new(create_test_inventory());

        let handles: Vec<_> = (0..40)
            .map(|_| {
                let inventory = inventory.clone();
                std::thread::spawn(move || inventory.allocate(50).is_ok())
            })
            .collect();
        let succeeded = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(succeeded, 30);
        assert_eq!(inventory.total_cash(), 0);
    }

    proptest! {
        #[test]
        fn prop_cash_is_conserved(ops in prop::collection::vec((1u32..=80, any::<bool>()), 1..40)) {
            let inventory = create_test_inventory();
            let mut kept: u64 = 0;

            for (units, refund) in ops {
                let amount = units * 5;
                if let Ok(bundle) = inventory.allocate(amount) {
                    prop_assert_eq!(bundle.total(), u64::from(amount));
                    if refund {
                        inventory.refund(&bundle);
                    } else {
                        kept += bundle.total();
                    }
                }
                prop_assert_eq!(inventory.total_cash(), 1500 - kept);
            }
        }
    }
}
