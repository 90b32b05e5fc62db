//! Billing summaries
//!
//! Read-only reduction of an entry list into `{calls, units, fee}` totals,
//! grouped by (time block, code, source) and along each of those axes.

use crate::error::{RecordError, SummaryReport};
use feeplan_types::{BillingEntry, EntrySource, SummaryKey, SummaryRow, SummaryTotals, TimeBlock};
use serde::Serialize;
use std::collections::BTreeMap;

/// Totals for one value of a grouping axis
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Grouped<K> {
    pub key: K,
    pub totals: SummaryTotals,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BillingSummary {
    /// One row per (time block, code, source), chronological
    pub rows: Vec<SummaryRow>,
    pub by_block: Vec<Grouped<Option<TimeBlock>>>,
    pub by_code: Vec<Grouped<String>>,
    pub by_source: Vec<Grouped<EntrySource>>,
    pub overall: SummaryTotals,
    pub available_units: u32,
    /// Billed units as a share of available units, 0 when none are available
    pub utilization_pct: f64,
}

impl BillingSummary {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Totals for entries added by the block filler
    pub fn filler_totals(&self) -> SummaryTotals {
        self.by_source
            .iter()
            .find(|g| g.key == EntrySource::Filler)
            .map(|g| g.totals)
            .unwrap_or_default()
    }
}

/// Summarise `entries` against `available_units` of worked time
pub fn summarize(entries: &[BillingEntry], available_units: u32) -> BillingSummary {
    let mut rows: BTreeMap<SummaryKey, SummaryTotals> = BTreeMap::new();
    let mut by_block: BTreeMap<Option<TimeBlock>, SummaryTotals> = BTreeMap::new();
    let mut by_code: BTreeMap<String, SummaryTotals> = BTreeMap::new();
    let mut by_source: BTreeMap<EntrySource, SummaryTotals> = BTreeMap::new();
    let mut overall = SummaryTotals::default();

    for entry in entries {
        let key = SummaryKey {
            time_block: entry.time_block,
            code: entry.code.clone(),
            source: entry.source,
        };
        rows.entry(key).or_default().add_entry(entry);
        by_block.entry(entry.time_block).or_default().add_entry(entry);
        by_code.entry(entry.code.clone()).or_default().add_entry(entry);
        by_source.entry(entry.source).or_default().add_entry(entry);
        overall.add_entry(entry);
    }

    let utilization_pct = if available_units == 0 {
        0.0
    } else {
        f64::from(overall.units) / f64::from(available_units) * 100.0
    };

    BillingSummary {
        rows: rows
            .into_iter()
            .map(|(key, totals)| SummaryRow { key, totals })
            .collect(),
        by_block: grouped(by_block),
        by_code: grouped(by_code),
        by_source: grouped(by_source),
        overall,
        available_units,
        utilization_pct,
    }
}

fn grouped<K>(map: BTreeMap<K, SummaryTotals>) -> Vec<Grouped<K>> {
    map.into_iter()
        .map(|(key, totals)| Grouped { key, totals })
        .collect()
}

/// Summarise untyped records, skipping any that are not valid entries
///
/// Skipped records are listed in the returned report; the rest of the batch
/// is summarised as usual.
pub fn summarize_records(
    records: &[serde_json::Value],
    available_units: u32,
) -> (BillingSummary, SummaryReport) {
    let mut report = SummaryReport::new();
    let mut entries = Vec::with_capacity(records.len());

    for (i, record) in records.iter().enumerate() {
        report.records_scanned += 1;
        let source = format!("record {}", i + 1);
        match serde_json::from_value::<BillingEntry>(record.clone()) {
            Ok(entry) if entry.calls == 0 => {
                report.skip(
                    RecordError::new(source, "calls must be at least 1")
                        .with_suggestion("Omit \"calls\" to count the record once"),
                );
            }
            Ok(entry) => entries.push(entry),
            Err(err) => {
                report.skip(
                    RecordError::new(source, err.to_string()).with_suggestion(
                        "Each record needs code, category, units and fee (fee as a string, e.g. \"58.32\")",
                    ),
                );
            }
        }
    }

    if report.records_skipped > 0 {
        tracing::warn!(
            skipped = report.records_skipped,
            scanned = report.records_scanned,
            "Skipped malformed billing records"
        );
    }

    (summarize(&entries, available_units), report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use feeplan_types::CodeCategory;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn entry(code: &str, units: u32, fee: Decimal, block: TimeBlock, source: EntrySource) -> BillingEntry {
        BillingEntry {
            code: code.to_string(),
            category: CodeCategory::TimedVisit,
            modifiers: vec![],
            units,
            addon_units: 0,
            calls: 1,
            fee,
            virtual_care: false,
            time_block: Some(block),
            source,
        }
    }

    #[test]
    fn test_empty_input_is_all_zero() {
        let summary = summarize(&[], 0);
        assert!(summary.is_empty());
        assert!(summary.overall.is_empty());
        assert_eq!(summary.utilization_pct, 0.0);
    }

    #[test]
    fn test_grouping_and_order() {
        let entries = vec![
            entry("03.05A", 1, dec!(58.32), TimeBlock::LateEvening, EntrySource::Filler),
            entry("03.05A", 2, dec!(116.64), TimeBlock::Overnight, EntrySource::Original),
            entry("03.05A", 1, dec!(58.32), TimeBlock::LateEvening, EntrySource::Filler),
            entry("03.05A", 1, dec!(58.32), TimeBlock::LateEvening, EntrySource::Original),
        ];
        let summary = summarize(&entries, 10);

        assert_eq!(summary.rows.len(), 3);
        assert_eq!(summary.rows[0].key.time_block, Some(TimeBlock::Overnight));
        let filler_row = &summary.rows[2];
        assert_eq!(filler_row.key.source, EntrySource::Filler);
        assert_eq!(filler_row.totals.calls, 2);
        assert_eq!(filler_row.totals.fee, dec!(116.64));

        assert_eq!(summary.by_block.len(), 2);
        assert_eq!(summary.by_block[1].totals.units, 3);
        assert_eq!(summary.by_code.len(), 1);
        assert_eq!(summary.filler_totals().units, 2);

        assert_eq!(summary.overall.units, 5);
        assert_eq!(summary.overall.fee, dec!(291.60));
        assert_eq!(summary.utilization_pct, 50.0);
    }

    #[test]
    fn test_summarize_records_skips_bad_rows() {
        let records = vec![
            json!({"code": "03.05A", "category": "timed_visit", "units": 1, "fee": "58.32"}),
            json!({"code": "03.05A", "units": "two"}),
            json!({"code": "03.05N", "category": "callback", "units": 1, "fee": "75.97", "calls": 0}),
            json!({"code": "03.07B", "category": "repeat_consult", "units": 1, "addon_units": 2, "fee": "250.70"}),
        ];
        let (summary, report) = summarize_records(&records, 8);
        assert_eq!(report.records_scanned, 4);
        assert_eq!(report.records_skipped, 2);
        assert_eq!(report.errors.len(), 2);
        assert_eq!(report.errors[0].source, "record 2");
        assert!(report.errors[0].suggestion.is_some());

        assert_eq!(summary.overall.calls, 2);
        assert_eq!(summary.overall.units, 4);
        assert_eq!(summary.overall.fee, dec!(309.02));
        assert_eq!(summary.utilization_pct, 50.0);
    }

    #[test]
    fn test_summarize_records_with_huge_units_does_not_overflow() {
        let records = vec![
            json!({"code": "03.05A", "category": "timed_visit", "units": 4294967295u32, "fee": "58.32"}),
            json!({"code": "03.05A", "category": "timed_visit", "units": 1, "fee": "58.32"}),
        ];
        let (summary, report) = summarize_records(&records, 4);
        assert_eq!(report.records_skipped, 0);
        assert_eq!(summary.overall.calls, 2);
        assert_eq!(summary.overall.units, u32::MAX);
        assert_eq!(summary.overall.fee, dec!(116.64));
        assert_eq!(summary.by_code[0].totals.units, u32::MAX);
    }
}
