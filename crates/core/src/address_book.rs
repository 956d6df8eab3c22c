//! Default-address planning.
//!
//! A user's address book keeps one invariant: if the user has at least one
//! address, exactly one of them is the default; with no addresses there is no
//! default. The functions here look at a snapshot of the user's addresses
//! (taken under a row lock by the repository) and decide which flags to flip.
//! They never touch storage, so the repository can run the plan inside its
//! transaction and tests can check the invariant over arbitrary sequences.
//!
//! The replacement default after a delete is the oldest remaining address by
//! `created_at`; equal timestamps fall back to the lower ID.

use chrono::{DateTime, Utc};

use crate::AddressId;

/// The part of an address row that matters for default bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressSlot {
    pub id: AddressId,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

/// The target address is not in the user's address book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("address {0} not found in address book")]
pub struct NotInAddressBook(pub AddressId);

/// Flag changes for inserting a new address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePlan {
    /// Existing addresses whose default flag must be cleared first.
    pub clear_defaults: Vec<AddressId>,
    /// Default flag to insert the new address with.
    pub is_default: bool,
}

/// Flag changes for updating an existing address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatePlan {
    /// Other addresses whose default flag must be cleared first.
    pub clear_defaults: Vec<AddressId>,
    /// Default flag the target ends up with.
    pub is_default: bool,
}

/// Flag changes for deleting an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeletePlan {
    /// Remaining address to mark as default before the delete, if any.
    pub promote: Option<AddressId>,
}

/// Plan the insert of a new address.
///
/// The new address is the default when the caller asked for it, when it is
/// the user's first address, or when the book has (abnormally) no default.
#[must_use]
pub fn plan_create(existing: &[AddressSlot], requested_default: bool) -> CreatePlan {
    let has_default = existing.iter().any(|slot| slot.is_default);
    let is_default = requested_default || !has_default;

    let clear_defaults = if is_default {
        defaults_except(existing, None)
    } else {
        Vec::new()
    };

    CreatePlan {
        clear_defaults,
        is_default,
    }
}

/// Plan an update of `target`.
///
/// `requested_default` is the flag from the request body, `None` when the
/// body did not mention it. Asking to clear the flag on the current default
/// is ignored: the default only moves by promoting another address.
///
/// # Errors
///
/// Returns [`NotInAddressBook`] if `target` is not among `existing`.
pub fn plan_update(
    existing: &[AddressSlot],
    target: AddressId,
    requested_default: Option<bool>,
) -> Result<UpdatePlan, NotInAddressBook> {
    let slot = find(existing, target)?;
    let has_default = existing.iter().any(|s| s.is_default);

    let is_default = requested_default == Some(true) || slot.is_default || !has_default;

    let clear_defaults = if is_default {
        defaults_except(existing, Some(target))
    } else {
        Vec::new()
    };

    Ok(UpdatePlan {
        clear_defaults,
        is_default,
    })
}

/// Plan the delete of `target`.
///
/// If no remaining address would be the default, the oldest remaining one is
/// promoted. Deleting the last address promotes nothing.
///
/// # Errors
///
/// Returns [`NotInAddressBook`] if `target` is not among `existing`.
pub fn plan_delete(
    existing: &[AddressSlot],
    target: AddressId,
) -> Result<DeletePlan, NotInAddressBook> {
    find(existing, target)?;

    let remaining: Vec<AddressSlot> = existing
        .iter()
        .copied()
        .filter(|slot| slot.id != target)
        .collect();

    let promote = if remaining.iter().any(|slot| slot.is_default) {
        None
    } else {
        next_default(&remaining)
    };

    Ok(DeletePlan { promote })
}

/// Oldest address by creation time, ties broken by the lower ID.
#[must_use]
pub fn next_default(candidates: &[AddressSlot]) -> Option<AddressId> {
    candidates
        .iter()
        .min_by_key(|slot| (slot.created_at, slot.id))
        .map(|slot| slot.id)
}

/// Number of addresses flagged default.
#[must_use]
pub fn default_count(slots: &[AddressSlot]) -> usize {
    slots.iter().filter(|slot| slot.is_default).count()
}

fn find(existing: &[AddressSlot], target: AddressId) -> Result<&AddressSlot, NotInAddressBook> {
    existing
        .iter()
        .find(|slot| slot.id == target)
        .ok_or(NotInAddressBook(target))
}

fn defaults_except(existing: &[AddressSlot], keep: Option<AddressId>) -> Vec<AddressId> {
    existing
        .iter()
        .filter(|slot| slot.is_default && Some(slot.id) != keep)
        .map(|slot| slot.id)
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn slot(id: i32, is_default: bool, created: i64) -> AddressSlot {
        AddressSlot {
            id: AddressId::new(id),
            is_default,
            created_at: at(created),
        }
    }

    #[test]
    fn first_address_becomes_default_without_asking() {
        let plan = plan_create(&[], false);
        assert!(plan.is_default);
        assert!(plan.clear_defaults.is_empty());
    }

    #[test]
    fn creating_default_clears_current_default() {
        let existing = [slot(1, false, 0), slot(2, true, 10)];
        let plan = plan_create(&existing, true);
        assert!(plan.is_default);
        assert_eq!(plan.clear_defaults, vec![AddressId::new(2)]);
    }

    #[test]
    fn creating_non_default_leaves_flags_alone() {
        let existing = [slot(1, true, 0)];
        let plan = plan_create(&existing, false);
        assert!(!plan.is_default);
        assert!(plan.clear_defaults.is_empty());
    }

    #[test]
    fn update_to_default_clears_others_only() {
        let existing = [slot(1, true, 0), slot(2, false, 10)];
        let plan = plan_update(&existing, AddressId::new(2), Some(true)).unwrap();
        assert!(plan.is_default);
        assert_eq!(plan.clear_defaults, vec![AddressId::new(1)]);
    }

    #[test]
    fn update_clearing_current_default_is_ignored() {
        let existing = [slot(1, true, 0), slot(2, false, 10)];
        let plan = plan_update(&existing, AddressId::new(1), Some(false)).unwrap();
        assert!(plan.is_default);
        assert!(plan.clear_defaults.is_empty());
    }

    #[test]
    fn update_unknown_address_is_not_found() {
        let existing = [slot(1, true, 0)];
        let err = plan_update(&existing, AddressId::new(9), Some(true)).unwrap_err();
        assert_eq!(err, NotInAddressBook(AddressId::new(9)));
    }

    #[test]
    fn deleting_default_promotes_oldest_remaining() {
        // A (default, t1), B (t2 > t1), C (t3 > t2): delete A -> B.
        let existing = [slot(1, true, 0), slot(3, false, 20), slot(2, false, 10)];
        let plan = plan_delete(&existing, AddressId::new(1)).unwrap();
        assert_eq!(plan.promote, Some(AddressId::new(2)));
    }

    #[test]
    fn deleting_only_address_promotes_nothing() {
        let existing = [slot(1, true, 0)];
        let plan = plan_delete(&existing, AddressId::new(1)).unwrap();
        assert_eq!(plan.promote, None);
    }

    #[test]
    fn deleting_non_default_keeps_default() {
        let existing = [slot(1, true, 0), slot(2, false, 10)];
        let plan = plan_delete(&existing, AddressId::new(2)).unwrap();
        assert_eq!(plan.promote, None);
    }

    #[test]
    fn equal_timestamps_break_ties_by_id() {
        let candidates = [slot(7, false, 5), slot(4, false, 5), slot(9, false, 5)];
        assert_eq!(next_default(&candidates), Some(AddressId::new(4)));
    }

    #[test]
    fn deleting_unknown_address_is_not_found() {
        assert!(plan_delete(&[], AddressId::new(1)).is_err());
    }
}
