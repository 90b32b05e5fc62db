//! Modifier catalog and stacking rules
//!
//! Requested modifiers are filtered against the code's legal set, then
//! applied one stage at a time in [`ModifierStage`] order:
//!
//! 1. **Skill**: replaces the running fee (CRCM)
//! 2. **Complexity**: one tier only, the highest threshold requested
//! 3. **Body mass**: a share of the original base fee
//! 4. **Virtual**: multiplies everything above, then rounds to cents
//! 5. **After hours**: one flat time-of-day surcharge, never uplifted
//!
//! # Examples
//!
//! ```
//! use feeplan_core::modifiers::apply;
//! use feeplan_core::registry::FeeSchedule;
//! use rust_decimal_macros::dec;
//!
//! let def = FeeSchedule::Nephrology.registry().lookup("03.07B").unwrap();
//! let outcome = apply(def.base_fee, def, &["TELES", "NTAM"]);
//! // 141.08 * 1.20 = 169.296 -> 169.30, + 117.41
//! assert_eq!(outcome.fee, dec!(286.71));
//! assert_eq!(outcome.applied, vec!["TELES", "NTAM"]);
//! ```

use crate::money::round_cents;
use feeplan_types::{Modifier, ModifierKind, ModifierStage, ServiceCodeDefinition, TimeOfDay};
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;

/// Virtual-care modifier code
pub const VIRTUAL_CARE: &str = "TELES";

/// Every modifier feeplan knows, keyed by code
static MODIFIERS: Lazy<HashMap<&'static str, Modifier>> = Lazy::new(|| {
    let mut m = HashMap::new();

    let mut insert = |code: &'static str,
                      description: &str,
                      stage: ModifierStage,
                      kind: ModifierKind,
                      threshold_minutes: Option<u32>| {
        m.insert(
            code,
            Modifier {
                code: code.to_string(),
                description: description.to_string(),
                stage,
                kind,
                threshold_minutes,
            },
        );
    };

    insert(
        "CRCM",
        "Critical care medicine specialist consult",
        ModifierStage::Skill,
        ModifierKind::Replacement(dec!(202.94)),
        None,
    );

    // Complexity tiers; thresholds are minutes beyond the included duration
    insert(
        "CMXC30",
        "Complex consult, 30+ extra minutes",
        ModifierStage::Complexity,
        ModifierKind::Additive(dec!(31.59)),
        Some(30),
    );
    insert(
        "CMXV15",
        "Complex visit, 15+ extra minutes",
        ModifierStage::Complexity,
        ModifierKind::Additive(dec!(15.78)),
        Some(15),
    );
    insert(
        "CMXV30",
        "Complex visit, 30+ extra minutes",
        ModifierStage::Complexity,
        ModifierKind::Additive(dec!(31.59)),
        Some(30),
    );

    insert(
        "BMINW",
        "Body mass index 40-49.9",
        ModifierStage::BodyMass,
        ModifierKind::PercentOfBase(dec!(0.25)),
        None,
    );
    insert(
        "BMIOB",
        "Body mass index 50+",
        ModifierStage::BodyMass,
        ModifierKind::PercentOfBase(dec!(0.25)),
        None,
    );

    insert(
        VIRTUAL_CARE,
        "Virtual care (telephone or secure video)",
        ModifierStage::Virtual,
        ModifierKind::Multiplier(dec!(1.20)),
        None,
    );

    insert(
        "EV",
        "Weekday evening 17:00-22:00",
        ModifierStage::AfterHours,
        ModifierKind::Additive(dec!(48.94)),
        None,
    );
    insert(
        "WK",
        "Weekend or stat holiday 07:00-22:00",
        ModifierStage::AfterHours,
        ModifierKind::Additive(dec!(48.94)),
        None,
    );
    insert(
        "NTPM",
        "Night 22:00-24:00",
        ModifierStage::AfterHours,
        ModifierKind::Additive(dec!(117.41)),
        None,
    );
    insert(
        "NTAM",
        "Night 00:00-07:00",
        ModifierStage::AfterHours,
        ModifierKind::Additive(dec!(117.41)),
        None,
    );

    m
});

/// Modifier definition for `code`, if feeplan knows it
pub fn lookup(code: &str) -> Option<&'static Modifier> {
    MODIFIERS.get(code.trim().to_ascii_uppercase().as_str())
}

/// Modifier billed for an after-hours time-of-day
pub fn after_hours(tod: TimeOfDay) -> &'static Modifier {
    // The catalog covers all four codes
    &MODIFIERS[tod.code()]
}

/// All modifiers, sorted by stage then code
pub fn catalog() -> Vec<&'static Modifier> {
    let mut all: Vec<&Modifier> = MODIFIERS.values().collect();
    all.sort_by(|a, b| a.stage.cmp(&b.stage).then_with(|| a.code.cmp(&b.code)));
    all
}

/// Fee after modifiers plus the codes that actually applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifierOutcome {
    /// Rounded to cents
    pub fee: Decimal,
    /// Application order, no duplicates
    pub applied: Vec<String>,
}

/// Apply `requested` modifiers to `base_fee` under `definition`'s legal set
///
/// Unknown or illegal modifiers are skipped, never an error.
pub fn apply<S: AsRef<str>>(
    base_fee: Decimal,
    definition: &ServiceCodeDefinition,
    requested: &[S],
) -> ModifierOutcome {
    let mut accepted: Vec<&'static Modifier> = Vec::new();
    for raw in requested {
        let code = raw.as_ref().trim().to_ascii_uppercase();
        let Some(modifier) = MODIFIERS.get(code.as_str()) else {
            tracing::debug!(code = %definition.code, modifier = %code, "Ignoring unknown modifier");
            continue;
        };
        if !definition.allows(&code) {
            tracing::debug!(code = %definition.code, modifier = %code, "Ignoring modifier not legal for code");
            continue;
        }
        if accepted.iter().any(|m| m.code == modifier.code) {
            continue;
        }
        accepted.push(modifier);
    }

    let chosen = [
        ModifierStage::Skill,
        ModifierStage::Complexity,
        ModifierStage::BodyMass,
        ModifierStage::Virtual,
        ModifierStage::AfterHours,
    ]
    .into_iter()
    .filter_map(|stage| pick(stage, &accepted));

    let mut running = base_fee;
    let mut applied = Vec::new();
    for modifier in chosen {
        running = match modifier.kind {
            ModifierKind::Replacement(amount) => amount,
            ModifierKind::Additive(amount) => running + amount,
            ModifierKind::PercentOfBase(share) => running + base_fee * share,
            ModifierKind::Multiplier(factor) => round_cents(running * factor),
        };
        applied.push(modifier.code.clone());
    }

    ModifierOutcome {
        fee: round_cents(running),
        applied,
    }
}

/// One modifier per stage; complexity keeps the highest tier, the rest keep the first requested
fn pick(stage: ModifierStage, accepted: &[&'static Modifier]) -> Option<&'static Modifier> {
    let mut in_stage = accepted.iter().copied().filter(|m| m.stage == stage);
    if stage == ModifierStage::Complexity {
        // max_by_key keeps the last maximum; reverse so ties go to the first requested
        let tiers: Vec<_> = in_stage.collect();
        tiers
            .into_iter()
            .rev()
            .max_by_key(|m| (m.threshold_minutes.unwrap_or(0), additive_amount(m)))
    } else {
        in_stage.next()
    }
}

fn additive_amount(modifier: &Modifier) -> Decimal {
    match modifier.kind {
        ModifierKind::Additive(amount) => amount,
        _ => Decimal::ZERO,
    }
}

/// Highest complexity tier legal for `definition` that `extra_minutes` qualifies for
pub fn qualifying_complexity(
    definition: &ServiceCodeDefinition,
    extra_minutes: u32,
) -> Option<&'static Modifier> {
    definition
        .allowed_modifiers
        .iter()
        .filter_map(|code| lookup(code))
        .filter(|m| m.stage == ModifierStage::Complexity)
        .filter(|m| m.threshold_minutes.is_some_and(|t| extra_minutes >= t))
        .max_by_key(|m| m.threshold_minutes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::FeeSchedule;

    fn neph(code: &str) -> &'static ServiceCodeDefinition {
        FeeSchedule::Nephrology.registry().lookup(code).unwrap()
    }

    fn ccm(code: &str) -> &'static ServiceCodeDefinition {
        FeeSchedule::CriticalCare.registry().lookup(code).unwrap()
    }

    #[test]
    fn test_no_modifiers_keeps_base() {
        let def = neph("03.08A");
        let outcome = apply::<&str>(def.base_fee, def, &[]);
        assert_eq!(outcome.fee, dec!(211.62));
        assert!(outcome.applied.is_empty());
    }

    #[test]
    fn test_illegal_and_unknown_modifiers_are_ignored() {
        let def = neph("03.08A");
        let outcome = apply(def.base_fee, def, &["NTAM", "XYZ", "CRCM"]);
        assert_eq!(outcome.fee, dec!(211.62));
        assert!(outcome.applied.is_empty());
    }

    #[test]
    fn test_skill_replaces_then_additives_stack() {
        let def = ccm("03.08A");
        let outcome = apply(def.base_fee, def, &["CMXC30", "CRCM", "NTPM"]);
        // 202.94 + 31.59 + 117.41
        assert_eq!(outcome.fee, dec!(351.94));
        assert_eq!(outcome.applied, vec!["CRCM", "CMXC30", "NTPM"]);
    }

    #[test]
    fn test_complexity_tiers_are_exclusive() {
        let def = neph("03.07B");
        let outcome = apply(def.base_fee, def, &["CMXV15", "CMXV30"]);
        assert_eq!(outcome.fee, dec!(172.67));
        assert_eq!(outcome.applied, vec!["CMXV30"]);
    }

    #[test]
    fn test_virtual_multiplies_after_complexity() {
        let def = neph("03.07B");
        let outcome = apply(def.base_fee, def, &["TELES", "cmxv15"]);
        // (141.08 + 15.78) * 1.2 = 188.232
        assert_eq!(outcome.fee, dec!(188.23));
        assert_eq!(outcome.applied, vec!["CMXV15", "TELES"]);
    }

    #[test]
    fn test_after_hours_never_stack() {
        let def = neph("03.07B");
        let outcome = apply(def.base_fee, def, &["EV", "NTAM", "WK"]);
        assert_eq!(outcome.fee, dec!(190.02));
        assert_eq!(outcome.applied, vec!["EV"]);
    }

    #[test]
    fn test_body_mass_uses_original_base() {
        let def = ccm("03.08A");
        let outcome = apply(def.base_fee, def, &["CRCM", "BMIOB", "BMINW"]);
        // 202.94 + 25% of 80.00
        assert_eq!(outcome.fee, dec!(222.94));
        assert_eq!(outcome.applied, vec!["CRCM", "BMIOB"]);
    }

    #[test]
    fn test_duplicates_collapse() {
        let def = neph("03.07B");
        let outcome = apply(def.base_fee, def, &["TELES", "teles", " TELES "]);
        assert_eq!(outcome.applied, vec!["TELES"]);
        assert_eq!(outcome.fee, dec!(169.30));
    }

    #[test]
    fn test_qualifying_complexity() {
        let def = neph("03.07B");
        assert!(qualifying_complexity(def, 0).is_none());
        assert!(qualifying_complexity(def, 14).is_none());
        assert_eq!(qualifying_complexity(def, 15).unwrap().code, "CMXV15");
        assert_eq!(qualifying_complexity(def, 29).unwrap().code, "CMXV15");
        assert_eq!(qualifying_complexity(def, 45).unwrap().code, "CMXV30");

        let consult = neph("03.08A");
        assert!(qualifying_complexity(consult, 15).is_none());
        assert_eq!(qualifying_complexity(consult, 30).unwrap().code, "CMXC30");

        assert!(qualifying_complexity(ccm("03.05N"), 120).is_none());
    }

    #[test]
    fn test_catalog_and_after_hours_lookup() {
        let all = catalog();
        assert_eq!(all.first().unwrap().code, "CRCM");
        assert!(all.windows(2).all(|w| w[0].stage <= w[1].stage));
        assert_eq!(after_hours(TimeOfDay::NightPm).kind, ModifierKind::Additive(dec!(117.41)));
        assert_eq!(after_hours(TimeOfDay::Weekend).kind, ModifierKind::Additive(dec!(48.94)));
        assert!(lookup("teles").is_some());
        assert!(lookup("NOPE").is_none());
    }
}
