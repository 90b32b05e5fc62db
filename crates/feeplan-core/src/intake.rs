//! Encounter intake planners
//!
//! Turn raw encounter counts into priced entries and run the matching
//! allocator:
//!
//! - [`plan_clinic`]: an office clinic with a flat time budget (add-on
//!   redistribution)
//! - [`plan_shift`]: a critical care shift with per-block counts (block
//!   filler)

use crate::allocator::{
    hours_to_units, redistribute_addon_units, AllocationWarning, BlockFiller,
};
use crate::calculator::FeeCalculator;
use crate::capacity::CapacityModel;
use crate::error::{FeeError, FeeResult};
use crate::money::round_cents;
use crate::summary::{summarize, BillingSummary};
use feeplan_types::{
    BillingEntry, BlockUsage, EntrySource, ScheduleMode, TimeBlock, TimeOfDay,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Rural, remote, northern program uplift (+19.98%)
pub const DEFAULT_RRNP_UPLIFT: Decimal = dec!(1.1998);

// ===================
// Clinic
// ===================

/// One office clinic: how long it ran and who was seen
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClinicSession {
    pub clinic_minutes: u32,
    #[serde(default)]
    pub new_consults: u32,
    #[serde(default)]
    pub repeat_consults: u32,
    #[serde(default)]
    pub follow_ups: u32,
    /// Every visit delivered by phone or video
    #[serde(default)]
    pub virtual_care: bool,
    /// After-hours code for repeat consults
    #[serde(default)]
    pub time_of_day: Option<TimeOfDay>,
    /// Apply the RRNP uplift to final fees
    #[serde(default)]
    pub rrnp: bool,
}

impl ClinicSession {
    pub fn patients(&self) -> u32 {
        self.new_consults + self.repeat_consults + self.follow_ups
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClinicPlan {
    pub entries: Vec<BillingEntry>,
    pub average_minutes: u32,
    pub available_units: u32,
    pub added_units: u32,
    pub unbillable_units: u32,
    pub overbooked_units: u32,
    pub rrnp_applied: bool,
    pub summary: BillingSummary,
}

/// Price a clinic and spread its leftover time as prolonged add-ons
///
/// Every patient is priced at the clinic's average minutes per patient.
/// Fails with [`FeeError::InvalidSession`] when nobody was seen.
pub fn plan_clinic(
    calculator: &FeeCalculator,
    session: &ClinicSession,
    rrnp_uplift: Decimal,
) -> FeeResult<ClinicPlan> {
    let patients = session.patients();
    if patients == 0 {
        return Err(FeeError::InvalidSession {
            message: "total patient count must be greater than 0".to_string(),
        });
    }

    let average_minutes = session.clinic_minutes / patients;
    let available_units = session.clinic_minutes / 15;
    let virtual_care = session.virtual_care;

    let (consult_code, follow_up_code) = if virtual_care {
        ("03.08CV", "03.03FV")
    } else {
        ("03.08A", "03.03F")
    };

    let mut entries = Vec::with_capacity(patients as usize);
    let mut priced = |code: &str, count: u32, tod: Option<TimeOfDay>| -> FeeResult<()> {
        for _ in 0..count {
            let result = calculator.compute(code, average_minutes, virtual_care, tod)?;
            entries.push(result.into_entry(None));
        }
        Ok(())
    };
    priced(consult_code, session.new_consults, None)?;
    priced("03.07B", session.repeat_consults, session.time_of_day)?;
    priced(follow_up_code, session.follow_ups, None)?;

    let outcome = redistribute_addon_units(calculator, entries, available_units);
    let mut entries = outcome.entries;

    if session.rrnp {
        for entry in &mut entries {
            entry.fee = round_cents(entry.fee * rrnp_uplift);
        }
    }

    let summary = summarize(&entries, available_units);
    tracing::info!(
        patients,
        average_minutes,
        total = %summary.overall.fee,
        "Clinic planned"
    );

    Ok(ClinicPlan {
        entries,
        average_minutes,
        available_units,
        added_units: outcome.added_units,
        unbillable_units: outcome.unbillable_units,
        overbooked_units: outcome.overbooked_units,
        rrnp_applied: session.rrnp,
        summary,
    })
}

// ===================
// Shift
// ===================

/// Encounters seen during one time block of a shift
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockEncounters {
    pub block: TimeBlock,
    pub consults: u32,
    pub repeat_consults: u32,
    /// One-unit ICU visits
    pub icu_visits: u32,
    /// Return visits of 24 minutes or less
    pub short_returns: u32,
    /// Return visits of 25 minutes or more
    pub long_returns: u32,
    pub ventilations: u32,
    pub resuscitations: u32,
    pub secondary_resuscitations: u32,
    /// Extra callbacks billed as entered, outside the short-return cap
    pub callbacks: u32,
    pub intubations: u32,
    pub central_lines: u32,
    pub arterial_lines: u32,
    pub peripheral_lines: u32,
    pub bronchoscopies: u32,
    pub family_conferences: u32,
    pub team_conferences: u32,
    pub multidisciplinary_conferences: u32,
}

impl Default for BlockEncounters {
    fn default() -> Self {
        Self::new(TimeBlock::Daytime)
    }
}

impl BlockEncounters {
    pub fn new(block: TimeBlock) -> Self {
        Self {
            block,
            consults: 0,
            repeat_consults: 0,
            icu_visits: 0,
            short_returns: 0,
            long_returns: 0,
            ventilations: 0,
            resuscitations: 0,
            secondary_resuscitations: 0,
            callbacks: 0,
            intubations: 0,
            central_lines: 0,
            arterial_lines: 0,
            peripheral_lines: 0,
            bronchoscopies: 0,
            family_conferences: 0,
            team_conferences: 0,
            multidisciplinary_conferences: 0,
        }
    }
}

/// A 24-hour critical care shift
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShiftInput {
    /// Weekend or stat holiday
    #[serde(default)]
    pub weekend: bool,
    /// Total hours worked across the day
    pub hours: f64,
    #[serde(default)]
    pub blocks: Vec<BlockEncounters>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShiftPlan {
    pub mode: ScheduleMode,
    pub available_units: u32,
    pub entries: Vec<BillingEntry>,
    pub filler_units: u32,
    pub unbillable_units: u32,
    pub block_usage: Vec<BlockUsage>,
    pub warnings: Vec<AllocationWarning>,
    pub summary: BillingSummary,
}

/// Short returns billable as callbacks in one block before they become ICU visits
pub fn callback_cap(callback_code: &str) -> u32 {
    match callback_code {
        "03.05N" | "03.05P" | "03.05R" => 5,
        "03.05QA" => 2,
        "03.05QB" => 7,
        _ => 0,
    }
}

/// Price a shift's encounters block by block, then fill leftover time
pub fn plan_shift(
    calculator: &FeeCalculator,
    capacity: &CapacityModel,
    input: &ShiftInput,
) -> FeeResult<ShiftPlan> {
    let mode = ScheduleMode::from_weekend_flag(input.weekend);
    let filler = BlockFiller::new(*calculator, capacity.clone())?;

    let mut blocks: Vec<&BlockEncounters> = input.blocks.iter().collect();
    blocks.sort_by_key(|b| mode.normalize(b.block));

    let mut entries = Vec::new();
    for counts in blocks {
        price_block(calculator, mode, counts, &mut entries)?;
    }

    let available_units = hours_to_units(input.hours);
    let fill = filler.fill(entries, input.hours, mode);
    // Utilisation is measured against what the blocks could hold, not hours worked
    let summary = summarize(&fill.entries, capacity.total_capacity(mode));

    Ok(ShiftPlan {
        mode,
        available_units,
        entries: fill.entries,
        filler_units: fill.filler_units,
        unbillable_units: fill.unbillable_units,
        block_usage: fill.block_usage,
        warnings: fill.warnings,
        summary,
    })
}

fn price_block(
    calculator: &FeeCalculator,
    mode: ScheduleMode,
    counts: &BlockEncounters,
    entries: &mut Vec<BillingEntry>,
) -> FeeResult<()> {
    let block = mode.normalize(counts.block);
    let callback = block.callback_code(mode);

    // Codes that do not allow the surcharge drop it in the modifier engine
    let after_hours: Vec<&str> = block.after_hours(mode).map(TimeOfDay::code).into_iter().collect();
    let mut consult_mods = vec!["CRCM", "CMXC30"];
    consult_mods.extend(after_hours.iter().copied());

    let mut push = |code: &str, units: u32, mods: &[&str], count: u32| -> FeeResult<()> {
        for _ in 0..count {
            entries.push(calculator.bill(code, units, mods, Some(block), EntrySource::Original)?);
        }
        Ok(())
    };

    let cap = callback_cap(callback);
    let short_callbacks = counts.short_returns.min(cap);
    let short_visits = counts.short_returns - short_callbacks;

    push("03.08A", 0, &consult_mods, counts.consults)?;
    push("03.07B", 0, &after_hours, counts.repeat_consults)?;
    push("03.05A", 1, &after_hours, counts.icu_visits)?;
    push(callback, 0, &after_hours, short_callbacks)?;
    push("03.05A", 1, &after_hours, short_visits)?;
    push("03.05A", 2, &after_hours, counts.long_returns)?;
    push("13.62A", 0, &after_hours, counts.ventilations)?;
    push("13.99E", 0, &after_hours, counts.resuscitations)?;
    push("13.99EC", 0, &after_hours, counts.secondary_resuscitations)?;
    push(callback, 0, &after_hours, counts.callbacks)?;
    push("10.04B", 0, &after_hours, counts.intubations)?;
    push("50.94D", 0, &after_hours, counts.central_lines)?;
    push("50.91D", 0, &after_hours, counts.arterial_lines)?;
    push("50.94E", 0, &after_hours, counts.peripheral_lines)?;
    push("01.09", 0, &after_hours, counts.bronchoscopies)?;
    push("03.05JC", 1, &after_hours, counts.family_conferences)?;
    push("03.05K", 0, &after_hours, counts.team_conferences)?;
    push("03.05JA", 0, &after_hours, counts.multidisciplinary_conferences)?;

    if short_visits > 0 {
        tracing::debug!(%block, callback, short_visits, "Short returns past callback cap billed as ICU visits");
    }
    Ok(())
}
