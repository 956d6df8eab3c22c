//! Property tests for default-address planning.
//!
//! Drives an in-memory address book through random create/update/delete
//! sequences, applying each plan the way the repository does (clear flags,
//! then write the target), and checks the default count after every step.

use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;

use vitrina_core::AddressId;
use vitrina_core::address_book::{
    AddressSlot, default_count, next_default, plan_create, plan_delete, plan_update,
};

#[derive(Debug, Clone)]
enum Op {
    Create { default: bool },
    Update { pick: usize, default: Option<bool> },
    Delete { pick: usize },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        any::<bool>().prop_map(|default| Op::Create { default }),
        (any::<usize>(), proptest::option::of(any::<bool>()))
            .prop_map(|(pick, default)| Op::Update { pick, default }),
        any::<usize>().prop_map(|pick| Op::Delete { pick }),
    ]
}

/// In-memory stand-in for one user's rows.
struct Book {
    slots: Vec<AddressSlot>,
    next_id: i32,
    clock: i64,
}

impl Book {
    fn new() -> Self {
        Self {
            slots: Vec::new(),
            next_id: 1,
            clock: 0,
        }
    }

    fn now(&mut self) -> DateTime<Utc> {
        // Advance in steps of 0 or 1 second so equal timestamps happen.
        self.clock += i64::from(self.next_id % 2);
        Utc.timestamp_opt(1_700_000_000 + self.clock, 0)
            .single()
            .expect("valid timestamp")
    }

    fn clear(&mut self, ids: &[AddressId]) {
        for slot in &mut self.slots {
            if ids.contains(&slot.id) {
                slot.is_default = false;
            }
        }
    }

    fn apply(&mut self, op: &Op) {
        match *op {
            Op::Create { default } => {
                let plan = plan_create(&self.slots, default);
                self.clear(&plan.clear_defaults);
                let created_at = self.now();
                self.slots.push(AddressSlot {
                    id: AddressId::new(self.next_id),
                    is_default: plan.is_default,
                    created_at,
                });
                self.next_id += 1;
            }
            Op::Update { pick, default } => {
                if self.slots.is_empty() {
                    return;
                }
                let target = self.slots[pick % self.slots.len()].id;
                let plan = plan_update(&self.slots, target, default).expect("target exists");
                self.clear(&plan.clear_defaults);
                for slot in &mut self.slots {
                    if slot.id == target {
                        slot.is_default = plan.is_default;
                    }
                }
            }
            Op::Delete { pick } => {
                if self.slots.is_empty() {
                    return;
                }
                let target = self.slots[pick % self.slots.len()].id;
                let plan = plan_delete(&self.slots, target).expect("target exists");
                if let Some(promote) = plan.promote {
                    for slot in &mut self.slots {
                        if slot.id == promote {
                            slot.is_default = true;
                        }
                    }
                }
                self.slots.retain(|slot| slot.id != target);
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// After every operation the book has exactly min(1, len) defaults.
    #[test]
    fn prop_exactly_one_default_when_non_empty(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let mut book = Book::new();
        for op in &ops {
            book.apply(op);
            prop_assert_eq!(
                default_count(&book.slots),
                book.slots.len().min(1),
                "after {:?}: {:?}", op, book.slots
            );
        }
    }

    /// Deleting the default promotes the earliest-created remaining address.
    #[test]
    fn prop_delete_default_promotes_oldest(creates in 2usize..10) {
        let mut book = Book::new();
        for _ in 0..creates {
            book.apply(&Op::Create { default: true });
        }
        let current = book.slots.iter().find(|s| s.is_default).map(|s| s.id).expect("has default");
        let remaining: Vec<AddressSlot> =
            book.slots.iter().copied().filter(|s| s.id != current).collect();
        let expected = next_default(&remaining);

        let pick = book.slots.iter().position(|s| s.id == current).expect("present");
        book.apply(&Op::Delete { pick });

        let now_default = book.slots.iter().find(|s| s.is_default).map(|s| s.id);
        prop_assert_eq!(now_default, expected);
    }

    /// Creating with the default flag always makes the new address the
    /// only default.
    #[test]
    fn prop_create_default_takes_over(ops in prop::collection::vec(op_strategy(), 0..30)) {
        let mut book = Book::new();
        for op in &ops {
            book.apply(op);
        }
        book.apply(&Op::Create { default: true });
        let newest = book.slots.last().expect("just created");
        prop_assert!(newest.is_default);
        prop_assert_eq!(default_count(&book.slots), 1);
    }
}
