use super::units_used;
use crate::calculator::FeeCalculator;
use crate::registry::PROLONGED_ADDON_MAX_UNITS;
use feeplan_types::BillingEntry;
use serde::Serialize;

/// Result of an add-on redistribution run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddonOutcome {
    /// Input entries in input order, add-on units and fees updated
    pub entries: Vec<BillingEntry>,
    /// Add-on units placed by this run
    pub added_units: u32,
    /// Unbilled units no eligible entry had room for
    pub unbillable_units: u32,
    /// Units the entries already consumed beyond the budget
    pub overbooked_units: u32,
}

/// Spread unbilled time over eligible entries as prolonged add-on units
///
/// Eligible entries are consults and repeat consults whose code carries an
/// add-on. Each pass gives every eligible entry below the cap one unit, in
/// input order, until the time runs out or a pass places nothing.
///
/// # Examples
///
/// ```
/// use feeplan_core::allocator::redistribute_addon_units;
/// use feeplan_core::{FeeCalculator, FeeSchedule};
///
/// let calc = FeeCalculator::new(FeeSchedule::Nephrology);
/// let consult = calc.compute("03.08A", 30, false, None).unwrap().into_entry(None);
///
/// // 2 base units used, 3 left over
/// let outcome = redistribute_addon_units(&calc, vec![consult], 5);
/// assert_eq!(outcome.entries[0].addon_units, 3);
/// assert_eq!(outcome.unbillable_units, 0);
/// ```
pub fn redistribute_addon_units(
    calculator: &FeeCalculator,
    mut entries: Vec<BillingEntry>,
    available_units: u32,
) -> AddonOutcome {
    let used = units_used(&entries);
    let unbilled = available_units.saturating_sub(used);
    let overbooked = used.saturating_sub(available_units);

    let (Ok(in_person_rate), Ok(virtual_rate)) =
        (calculator.addon_fee(1, false), calculator.addon_fee(1, true))
    else {
        tracing::warn!(
            schedule = %calculator.schedule(),
            "Schedule has no prolonged add-on; leaving time unbilled"
        );
        return AddonOutcome {
            entries,
            added_units: 0,
            unbillable_units: unbilled,
            overbooked_units: overbooked,
        };
    };

    let registry = calculator.registry();
    let eligible: Vec<usize> = entries
        .iter()
        .enumerate()
        .filter(|(_, e)| e.category.is_addon_eligible())
        .filter(|(_, e)| {
            registry
                .lookup(&e.code)
                .is_ok_and(|def| def.addon_code.is_some())
        })
        .map(|(i, _)| i)
        .collect();

    let mut remaining = unbilled;
    let mut added = 0u32;
    let mut passes = 0u32;
    while remaining > 0 {
        let mut placed = 0u32;
        for &i in &eligible {
            if remaining == 0 {
                break;
            }
            let entry = &mut entries[i];
            if entry.addon_units >= PROLONGED_ADDON_MAX_UNITS {
                continue;
            }
            entry.addon_units += 1;
            entry.fee += if entry.virtual_care {
                virtual_rate
            } else {
                in_person_rate
            };
            remaining -= 1;
            placed += 1;
        }
        if placed == 0 {
            break;
        }
        added += placed;
        passes += 1;
        tracing::debug!(pass = passes, placed, remaining, "Add-on pass");
    }

    if remaining > 0 {
        tracing::warn!(
            unbillable = remaining,
            eligible = eligible.len(),
            "Eligible encounters are at the add-on cap; time left unbilled"
        );
    }
    tracing::info!(
        available = available_units,
        used,
        added,
        unbillable = remaining,
        "Add-on redistribution complete"
    );

    AddonOutcome {
        entries,
        added_units: added,
        unbillable_units: remaining,
        overbooked_units: overbooked,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::FeeSchedule;
    use feeplan_types::{CodeCategory, EntrySource};
    use rust_decimal_macros::dec;

    fn calc() -> FeeCalculator {
        FeeCalculator::new(FeeSchedule::Nephrology)
    }

    fn entry(code: &str, virtual_care: bool) -> BillingEntry {
        let calc = calc();
        let def = calc.registry().lookup(code).unwrap();
        calc.compute(code, def.included_minutes, virtual_care, None)
            .unwrap()
            .into_entry(None)
    }

    #[test]
    fn test_round_robin_alternates() {
        // Two repeat consults use 2 units; 10 left to place
        let entries = vec![entry("03.07B", false), entry("03.07B", false)];
        let outcome = redistribute_addon_units(&calc(), entries, 12);
        assert_eq!(outcome.entries[0].addon_units, 5);
        assert_eq!(outcome.entries[1].addon_units, 5);
        assert_eq!(outcome.added_units, 10);
        assert_eq!(outcome.unbillable_units, 0);
        // 141.08 + 5 * 54.81
        assert_eq!(outcome.entries[0].fee, dec!(415.13));
    }

    #[test]
    fn test_odd_leftover_favours_input_order() {
        let entries = vec![entry("03.07B", false), entry("03.07B", false)];
        let outcome = redistribute_addon_units(&calc(), entries, 5);
        assert_eq!(outcome.entries[0].addon_units, 2);
        assert_eq!(outcome.entries[1].addon_units, 1);
    }

    #[test]
    fn test_cap_reports_unbillable() {
        let entries = vec![entry("03.08A", false)];
        let outcome = redistribute_addon_units(&calc(), entries, 20);
        assert_eq!(outcome.entries[0].addon_units, 6);
        assert_eq!(outcome.added_units, 6);
        assert_eq!(outcome.unbillable_units, 12);
    }

    #[test]
    fn test_ineligible_entries_untouched() {
        let entries = vec![
            entry("03.03F", false),
            entry("03.03A", false),
            entry("13.99OA", false),
        ];
        let before = entries.clone();
        let outcome = redistribute_addon_units(&calc(), entries, 40);
        assert_eq!(outcome.entries, before);
        assert_eq!(outcome.added_units, 0);
        assert_eq!(outcome.unbillable_units, 38);
    }

    #[test]
    fn test_virtual_rate_inherited() {
        let entries = vec![entry("03.08CV", true)];
        let outcome = redistribute_addon_units(&calc(), entries, 3);
        assert_eq!(outcome.entries[0].addon_units, 1);
        assert_eq!(outcome.entries[0].fee, dec!(211.62) + dec!(65.77));
    }

    #[test]
    fn test_overbooked_budget() {
        let entries = vec![entry("03.08A", false), entry("03.08A", false)];
        let outcome = redistribute_addon_units(&calc(), entries, 3);
        assert_eq!(outcome.added_units, 0);
        assert_eq!(outcome.unbillable_units, 0);
        assert_eq!(outcome.overbooked_units, 1);
    }

    #[test]
    fn test_existing_addon_units_count_toward_cap() {
        let mut consult = entry("03.08A", false);
        consult.addon_units = 5;
        let outcome = redistribute_addon_units(&calc(), vec![consult], 20);
        assert_eq!(outcome.entries[0].addon_units, 6);
        assert_eq!(outcome.added_units, 1);
        assert_eq!(outcome.unbillable_units, 12);
    }

    #[test]
    fn test_unknown_code_is_not_eligible() {
        let stray = BillingEntry {
            code: "99.99Z".to_string(),
            category: CodeCategory::Consult,
            modifiers: vec![],
            units: 0,
            addon_units: 0,
            calls: 1,
            fee: dec!(10),
            virtual_care: false,
            time_block: None,
            source: EntrySource::Original,
        };
        let outcome = redistribute_addon_units(&calc(), vec![stray], 4);
        assert_eq!(outcome.added_units, 0);
        assert_eq!(outcome.unbillable_units, 4);
    }

    #[test]
    fn test_empty_input() {
        let outcome = redistribute_addon_units(&calc(), Vec::new(), 8);
        assert!(outcome.entries.is_empty());
        assert_eq!(outcome.unbillable_units, 8);
    }
}
