//! Fee calculator
//!
//! Prices a single encounter from its code and duration. Time past the
//! code's included duration first qualifies a complexity tier, then is
//! billed as prolonged add-on units (capped per encounter; anything past the
//! cap is left for the allocator).
//!
//! Base fee and add-on fee are each rounded to cents before they are summed.

use crate::error::{FeeError, FeeResult};
use crate::modifiers::{self, VIRTUAL_CARE};
use crate::money::round_cents;
use crate::registry::{CodeRegistry, FeeSchedule, PROLONGED_ADDON_CODE, PROLONGED_ADDON_MAX_UNITS};
use feeplan_types::{
    AddOnLine, BillingEntry, BillingResult, EntrySource, ServiceCodeDefinition, TimeBlock,
    TimeOfDay, UnitBasis,
};
use rust_decimal::Decimal;

/// Prices encounters against one fee schedule
#[derive(Debug, Clone, Copy)]
pub struct FeeCalculator {
    registry: &'static CodeRegistry,
}

impl FeeCalculator {
    pub fn new(schedule: FeeSchedule) -> Self {
        Self {
            registry: schedule.registry(),
        }
    }

    pub fn registry(&self) -> &'static CodeRegistry {
        self.registry
    }

    pub fn schedule(&self) -> FeeSchedule {
        self.registry.schedule()
    }

    /// Price one encounter of `duration_minutes`
    ///
    /// # Examples
    ///
    /// ```
    /// use feeplan_core::{FeeCalculator, FeeSchedule};
    /// use rust_decimal_macros::dec;
    ///
    /// let calc = FeeCalculator::new(FeeSchedule::Nephrology);
    /// let result = calc.compute("03.08A", 45, false, None).unwrap();
    /// assert_eq!(result.base_fee, dec!(211.62));
    /// assert_eq!(result.addon_fee, dec!(54.81));
    /// assert_eq!(result.total_fee, dec!(266.43));
    /// ```
    pub fn compute(
        &self,
        code: &str,
        duration_minutes: u32,
        virtual_care: bool,
        time_of_day: Option<TimeOfDay>,
    ) -> FeeResult<BillingResult> {
        let def = self.registry.lookup(code)?;
        let extra = duration_minutes.saturating_sub(def.included_minutes);

        let mut requested: Vec<&str> = Vec::with_capacity(3);
        if let Some(tier) = modifiers::qualifying_complexity(def, extra) {
            requested.push(tier.code.as_str());
        }
        if virtual_care {
            requested.push(VIRTUAL_CARE);
        }
        if let Some(tod) = time_of_day {
            requested.push(tod.code());
        }

        let outcome = modifiers::apply(def.base_fee, def, &requested);

        let (base_fee, units) = match def.unit_basis {
            UnitBasis::PerCall => (outcome.fee, def.base_units),
            UnitBasis::PerUnit => {
                let units = (duration_minutes / def.unit_minutes).max(1);
                check_units(def, units)?;
                (round_cents(outcome.fee * Decimal::from(units)), units)
            }
        };

        let mut add_on_codes = Vec::new();
        if def.unit_basis == UnitBasis::PerCall {
            if let Some(addon_code) = def.addon_code.as_deref() {
                let extra_units = extra / def.unit_minutes;
                if extra_units > 0 {
                    let addon_def = self.registry.lookup(addon_code)?;
                    let cap = addon_def
                        .max_units_per_encounter
                        .unwrap_or(PROLONGED_ADDON_MAX_UNITS);
                    let billed = extra_units.min(cap);
                    if billed < extra_units {
                        tracing::debug!(
                            code = %def.code,
                            extra_units,
                            cap,
                            "Prolonged time past add-on cap left for allocation"
                        );
                    }
                    add_on_codes.push(AddOnLine {
                        code: addon_def.code.clone(),
                        units: billed,
                        fee: addon_charge(addon_def, billed, virtual_care)?,
                    });
                }
            }
        }

        let addon_fee: Decimal = add_on_codes.iter().map(|a| a.fee).sum();

        Ok(BillingResult {
            base_code: def.code.clone(),
            category: def.category,
            modifiers_applied: outcome.applied,
            add_on_codes,
            base_fee,
            addon_fee,
            total_fee: round_cents(base_fee + addon_fee),
            units,
            virtual_care,
        })
    }

    /// Fee for `units` prolonged add-on units, uplifted when virtual
    ///
    /// Fails with [`FeeError::InvalidUnits`] outside `[1, 6]`.
    pub fn addon_fee(&self, units: u32, virtual_care: bool) -> FeeResult<Decimal> {
        let addon_def = self.registry.lookup(PROLONGED_ADDON_CODE)?;
        addon_charge(addon_def, units, virtual_care)
    }

    /// Price an encounter from an explicit modifier list
    ///
    /// `units` counts 15-minute units for per-unit codes (at least one is
    /// billed); per-call codes always consume their own base units.
    pub fn bill<S: AsRef<str>>(
        &self,
        code: &str,
        units: u32,
        modifiers: &[S],
        time_block: Option<TimeBlock>,
        source: EntrySource,
    ) -> FeeResult<BillingEntry> {
        let def = self.registry.lookup(code)?;
        let outcome = modifiers::apply(def.base_fee, def, modifiers);

        let (fee, units) = match def.unit_basis {
            UnitBasis::PerCall => (outcome.fee, def.base_units),
            UnitBasis::PerUnit => {
                let units = units.max(1);
                check_units(def, units)?;
                (round_cents(outcome.fee * Decimal::from(units)), units)
            }
        };
        let virtual_care = outcome.applied.iter().any(|m| m == VIRTUAL_CARE);

        Ok(BillingEntry {
            code: def.code.clone(),
            category: def.category,
            modifiers: outcome.applied,
            units,
            addon_units: 0,
            calls: 1,
            fee,
            virtual_care,
            time_block,
            source,
        })
    }
}

fn check_units(def: &ServiceCodeDefinition, units: u32) -> FeeResult<()> {
    match def.max_units_per_encounter {
        Some(max) if units == 0 || units > max => Err(FeeError::InvalidUnits {
            code: def.code.clone(),
            requested: units,
            max,
        }),
        _ => Ok(()),
    }
}

fn addon_charge(
    addon_def: &ServiceCodeDefinition,
    units: u32,
    virtual_care: bool,
) -> FeeResult<Decimal> {
    let max = addon_def
        .max_units_per_encounter
        .unwrap_or(PROLONGED_ADDON_MAX_UNITS);
    if units == 0 || units > max {
        return Err(FeeError::InvalidUnits {
            code: addon_def.code.clone(),
            requested: units,
            max,
        });
    }

    let gross = addon_def.base_fee * Decimal::from(units);
    let requested: &[&str] = if virtual_care { &[VIRTUAL_CARE] } else { &[] };
    Ok(modifiers::apply(gross, addon_def, requested).fee)
}
