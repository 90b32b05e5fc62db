//! Billed encounters and fee calculation results

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::code::CodeCategory;
use super::time_block::TimeBlock;

/// Who created a billing entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntrySource {
    /// Entered from the clinician's encounter counts
    #[default]
    Original,
    /// Added by the block filler to consume unbilled time
    Filler,
}

impl fmt::Display for EntrySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Original => f.write_str("original"),
            Self::Filler => f.write_str("filler"),
        }
    }
}

/// One billed line: a service code with its modifiers, units and fee
///
/// Unit counts are carried as integers from the moment the entry is
/// created; nothing downstream reconstructs them from display text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingEntry {
    pub code: String,
    pub category: CodeCategory,
    /// Modifiers actually applied, in application order
    #[serde(default)]
    pub modifiers: Vec<String>,
    /// Base 15-minute units the service consumes
    pub units: u32,
    /// Prolonged-service add-on units billed on top of the base code
    #[serde(default)]
    pub addon_units: u32,
    #[serde(default = "default_calls")]
    pub calls: u32,
    /// Total fee for the line in dollars
    pub fee: Decimal,
    #[serde(default)]
    pub virtual_care: bool,
    #[serde(default)]
    pub time_block: Option<TimeBlock>,
    #[serde(default)]
    pub source: EntrySource,
}

fn default_calls() -> u32 {
    1
}

impl BillingEntry {
    /// Base units plus add-on units, saturating at `u32::MAX`
    pub fn total_units(&self) -> u32 {
        self.units.saturating_add(self.addon_units)
    }

    pub fn is_filler(&self) -> bool {
        self.source == EntrySource::Filler
    }
}

/// Add-on code billed alongside a base code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddOnLine {
    pub code: String,
    pub units: u32,
    pub fee: Decimal,
}

impl fmt::Display for AddOnLine {
    /// "03.08I (2 units)"
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plural = if self.units == 1 { "" } else { "s" };
        write!(f, "{} ({} unit{})", self.code, self.units, plural)
    }
}

/// Output of pricing a single encounter by duration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingResult {
    pub base_code: String,
    pub category: CodeCategory,
    pub modifiers_applied: Vec<String>,
    pub add_on_codes: Vec<AddOnLine>,
    /// Base code fee after modifiers, rounded to cents
    pub base_fee: Decimal,
    /// Sum of add-on fees, each rounded to cents
    pub addon_fee: Decimal,
    pub total_fee: Decimal,
    /// Base time units consumed by the encounter
    pub units: u32,
    pub virtual_care: bool,
}

impl BillingResult {
    pub fn addon_units(&self) -> u32 {
        self.add_on_codes.iter().map(|a| a.units).sum()
    }

    /// Convert into an entry for allocation and summary
    pub fn into_entry(self, time_block: Option<TimeBlock>) -> BillingEntry {
        let addon_units = self.addon_units();
        BillingEntry {
            code: self.base_code,
            category: self.category,
            modifiers: self.modifiers_applied,
            units: self.units,
            addon_units,
            calls: 1,
            fee: self.total_fee,
            virtual_care: self.virtual_care,
            time_block,
            source: EntrySource::Original,
        }
    }
}
