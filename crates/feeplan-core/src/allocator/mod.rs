//! Unbilled-time allocators
//!
//! Two greedy passes turn leftover clinician time into billable units:
//!
//! - [`redistribute_addon_units`] (flat time budget): spreads prolonged
//!   add-on units round-robin over consults and repeat consults
//! - [`BlockFiller`] (per-block capacity): appends one-unit ICU visits to
//!   blocks that saw active care, in filler priority order
//!
//! Both take ownership of the entry list and hand back a new one plus the
//! count of units they could not place. Neither fails; shortfalls are data.

mod addon;
mod filler;

pub use addon::{redistribute_addon_units, AddonOutcome};
pub use filler::{AllocationWarning, BlockFiller, FillOutcome, FILLER_CODE};

use feeplan_types::BillingEntry;

/// Whole 15-minute units in `hours`; negative or non-finite hours are zero
pub fn hours_to_units(hours: f64) -> u32 {
    if hours.is_finite() && hours > 0.0 {
        (hours * 4.0).floor() as u32
    } else {
        0
    }
}

/// Base plus add-on units already consumed by `entries`
pub fn units_used(entries: &[BillingEntry]) -> u32 {
    entries
        .iter()
        .map(BillingEntry::total_units)
        .fold(0, u32::saturating_add)
}
