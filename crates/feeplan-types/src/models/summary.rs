use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::entry::{BillingEntry, EntrySource};
use super::time_block::TimeBlock;

/// Grouping key for summary rows
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SummaryKey {
    pub time_block: Option<TimeBlock>,
    pub code: String,
    pub source: EntrySource,
}

/// Calls, units and fee accumulated for one group
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryTotals {
    pub calls: u32,
    /// Base plus add-on units
    pub units: u32,
    pub fee: Decimal,
}

impl SummaryTotals {
    /// Counts saturate rather than wrap on untrusted input
    pub fn add_entry(&mut self, entry: &BillingEntry) {
        self.calls = self.calls.saturating_add(entry.calls);
        self.units = self.units.saturating_add(entry.total_units());
        self.fee = self.fee.saturating_add(entry.fee);
    }

    pub fn add(&mut self, other: &SummaryTotals) {
        self.calls = self.calls.saturating_add(other.calls);
        self.units = self.units.saturating_add(other.units);
        self.fee = self.fee.saturating_add(other.fee);
    }

    pub fn is_empty(&self) -> bool {
        self.calls == 0 && self.units == 0 && self.fee.is_zero()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub key: SummaryKey,
    pub totals: SummaryTotals,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::code::CodeCategory;
    use rust_decimal_macros::dec;

    #[test]
    fn test_totals_accumulate_addon_units() {
        let entry = BillingEntry {
            code: "03.07B".to_string(),
            category: CodeCategory::RepeatConsult,
            modifiers: vec![],
            units: 1,
            addon_units: 2,
            calls: 1,
            fee: dec!(250.70),
            virtual_care: false,
            time_block: None,
            source: EntrySource::Original,
        };

        let mut totals = SummaryTotals::default();
        assert!(totals.is_empty());
        totals.add_entry(&entry);
        totals.add_entry(&entry);
        assert_eq!(totals.calls, 2);
        assert_eq!(totals.units, 6);
        assert_eq!(totals.fee, dec!(501.40));

        let mut merged = SummaryTotals::default();
        merged.add(&totals);
        assert_eq!(merged, totals);
    }

    #[test]
    fn test_totals_saturate_on_huge_units() {
        let huge = BillingEntry {
            code: "03.05A".to_string(),
            category: CodeCategory::TimedVisit,
            modifiers: vec![],
            units: u32::MAX,
            addon_units: 3,
            calls: 1,
            fee: dec!(58.32),
            virtual_care: false,
            time_block: None,
            source: EntrySource::Original,
        };
        assert_eq!(huge.total_units(), u32::MAX);

        let mut totals = SummaryTotals::default();
        totals.add_entry(&huge);
        totals.add_entry(&BillingEntry { units: 1, ..huge.clone() });
        assert_eq!(totals.units, u32::MAX);
        assert_eq!(totals.calls, 2);
        assert_eq!(totals.fee, dec!(116.64));
    }
}
