//! Health service code registry
//!
//! Two specialty fee schedules ship with feeplan. Their code identifiers
//! overlap (both bill 03.08A and 03.07B) at different rates, so a registry
//! is always selected through a [`FeeSchedule`].
//!
//! # Examples
//!
//! ```
//! use feeplan_core::registry::FeeSchedule;
//! use rust_decimal_macros::dec;
//!
//! let registry = FeeSchedule::Nephrology.registry();
//! let consult = registry.lookup("03.08A").unwrap();
//! assert_eq!(consult.base_fee, dec!(211.62));
//!
//! let icu = FeeSchedule::CriticalCare.registry();
//! assert_eq!(icu.lookup("03.08A").unwrap().base_fee, dec!(80.00));
//! ```

use crate::error::{FeeError, FeeResult};
use feeplan_types::{CodeCategory, ServiceCodeDefinition, UnitBasis};
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Prolonged consultation add-on, billed per 15 minutes
pub const PROLONGED_ADDON_CODE: &str = "03.08I";

/// Maximum prolonged add-on units on one encounter
pub const PROLONGED_ADDON_MAX_UNITS: u32 = 6;

const AFTER_HOURS: [&str; 4] = ["EV", "WK", "NTAM", "NTPM"];
const BODY_MASS: [&str; 2] = ["BMINW", "BMIOB"];

/// Specialty fee schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeSchedule {
    /// Nephrology clinic billing (NEPH)
    #[default]
    Nephrology,
    /// Critical care medicine shift billing (CCM)
    CriticalCare,
}

impl FeeSchedule {
    /// Static registry for this schedule
    pub fn registry(self) -> &'static CodeRegistry {
        match self {
            Self::Nephrology => &NEPHROLOGY,
            Self::CriticalCare => &CRITICAL_CARE,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Nephrology => "Nephrology",
            Self::CriticalCare => "Critical Care Medicine",
        }
    }
}

impl fmt::Display for FeeSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nephrology => f.write_str("nephrology"),
            Self::CriticalCare => f.write_str("critical-care"),
        }
    }
}

impl FromStr for FeeSchedule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "nephrology" | "neph" => Ok(Self::Nephrology),
            "critical-care" | "ccm" | "icu" => Ok(Self::CriticalCare),
            other => Err(format!(
                "unknown fee schedule '{}' (expected nephrology or critical-care)",
                other
            )),
        }
    }
}

/// Read-only table of service code definitions
#[derive(Debug)]
pub struct CodeRegistry {
    schedule: FeeSchedule,
    definitions: Vec<ServiceCodeDefinition>,
    index: HashMap<String, usize>,
}

impl CodeRegistry {
    fn new(schedule: FeeSchedule, definitions: Vec<ServiceCodeDefinition>) -> Self {
        let index = definitions
            .iter()
            .enumerate()
            .map(|(i, def)| (def.code.clone(), i))
            .collect();
        Self {
            schedule,
            definitions,
            index,
        }
    }

    pub fn schedule(&self) -> FeeSchedule {
        self.schedule
    }

    /// Look up a code (case-insensitive, surrounding whitespace ignored)
    pub fn lookup(&self, code: &str) -> FeeResult<&ServiceCodeDefinition> {
        let key = code.trim().to_ascii_uppercase();
        self.index
            .get(&key)
            .and_then(|&i| self.definitions.get(i))
            .ok_or_else(|| FeeError::unknown_code(code.trim()))
    }

    pub fn contains(&self, code: &str) -> bool {
        self.lookup(code).is_ok()
    }

    /// Modifiers legal for `code`
    pub fn legal_modifiers(&self, code: &str) -> FeeResult<&[String]> {
        self.lookup(code).map(|def| def.allowed_modifiers.as_slice())
    }

    pub fn category(&self, code: &str) -> FeeResult<CodeCategory> {
        self.lookup(code).map(|def| def.category)
    }

    /// All definitions in schedule order
    pub fn codes(&self) -> impl Iterator<Item = &ServiceCodeDefinition> {
        self.definitions.iter()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

/// Small builder so the tables below read one code per statement
struct Def(ServiceCodeDefinition);

impl Def {
    fn per_call(code: &str, description: &str, category: CodeCategory, base_fee: Decimal) -> Self {
        Def(ServiceCodeDefinition {
            code: code.to_string(),
            description: description.to_string(),
            category,
            base_fee,
            unit_minutes: 15,
            included_minutes: 0,
            base_units: 0,
            unit_basis: UnitBasis::PerCall,
            allowed_modifiers: Vec::new(),
            max_units_per_encounter: None,
            addon_code: None,
        })
    }

    fn per_unit(code: &str, description: &str, category: CodeCategory, base_fee: Decimal) -> Self {
        let mut def = Self::per_call(code, description, category, base_fee);
        def.0.unit_basis = UnitBasis::PerUnit;
        def.0.included_minutes = 15;
        def.0.base_units = 1;
        def
    }

    /// Minutes covered by the base fee; base units follow from them
    fn covers(mut self, minutes: u32) -> Self {
        self.0.included_minutes = minutes;
        self.0.base_units = minutes / self.0.unit_minutes;
        self
    }

    fn units(mut self, units: u32) -> Self {
        self.0.base_units = units;
        self
    }

    fn modifiers(mut self, codes: &[&str]) -> Self {
        self.0
            .allowed_modifiers
            .extend(codes.iter().map(|c| c.to_string()));
        self
    }

    fn prolonged_addon(mut self) -> Self {
        self.0.addon_code = Some(PROLONGED_ADDON_CODE.to_string());
        self
    }

    fn max_units(mut self, units: u32) -> Self {
        self.0.max_units_per_encounter = Some(units);
        self
    }

    fn build(self) -> ServiceCodeDefinition {
        self.0
    }
}

fn prolonged_addon() -> ServiceCodeDefinition {
    Def::per_unit(
        PROLONGED_ADDON_CODE,
        "Prolonged consultation (per 15 minutes)",
        CodeCategory::AddOn,
        dec!(54.81),
    )
    .modifiers(&["TELES"])
    .max_units(PROLONGED_ADDON_MAX_UNITS)
    .build()
}

/// Nephrology (NEPH) clinic schedule
static NEPHROLOGY: Lazy<CodeRegistry> = Lazy::new(|| {
    use CodeCategory::*;

    let complexity_v = ["CMXV15", "CMXV30"];

    let codes = vec![
        Def::per_call("03.08A", "Comprehensive consultation - in office", Consult, dec!(211.62))
            .covers(30)
            .modifiers(&["CMXC30"])
            .prolonged_addon()
            .build(),
        Def::per_call(
            "03.08CV",
            "Comprehensive consultation - telephone or secure video",
            Consult,
            dec!(211.62),
        )
        .covers(30)
        .modifiers(&["CMXC30"])
        .prolonged_addon()
        .build(),
        Def::per_call("03.07B", "Repeat consultation (referred)", RepeatConsult, dec!(141.08))
            .covers(15)
            .modifiers(&complexity_v)
            .modifiers(&["TELES"])
            .modifiers(&AFTER_HOURS)
            .prolonged_addon()
            .build(),
        Def::per_call("03.03F", "Repeat office visit (referred)", FollowUp, dec!(87.88))
            .covers(15)
            .modifiers(&complexity_v)
            .modifiers(&["TELES"])
            .prolonged_addon()
            .build(),
        // Virtual uplift is built into the rate, TELES is not legal
        Def::per_call("03.03FV", "Follow-up virtual visit", FollowUp, dec!(82.00))
            .covers(15)
            .modifiers(&complexity_v)
            .prolonged_addon()
            .build(),
        Def::per_call("03.03A", "Limited assessment - in office", FollowUp, dec!(82.22))
            .covers(15)
            .modifiers(&complexity_v)
            .modifiers(&["TELES"])
            .build(),
        prolonged_addon(),
        Def::per_call(
            "13.99OA",
            "Weekly management of chronic dialysis",
            Management,
            dec!(50.84),
        )
        .build(),
    ];

    CodeRegistry::new(FeeSchedule::Nephrology, codes)
});

/// Critical care medicine (CCM) shift schedule
static CRITICAL_CARE: Lazy<CodeRegistry> = Lazy::new(|| {
    use CodeCategory::*;

    let callback = |code: &str, description: &str, fee: Decimal| {
        Def::per_call(code, description, Callback, fee).units(1).build()
    };
    let procedure = |code: &str, description: &str, fee: Decimal| {
        Def::per_call(code, description, Procedure, fee)
            .modifiers(&AFTER_HOURS)
            .build()
    };

    let codes = vec![
        Def::per_call("03.08A", "Comprehensive consultation", Consult, dec!(80.00))
            .covers(30)
            .modifiers(&["CRCM", "CMXC30"])
            .modifiers(&BODY_MASS)
            .modifiers(&AFTER_HOURS)
            .prolonged_addon()
            .build(),
        Def::per_call(
            "03.07B",
            "Repeat consultation / transfer of care",
            RepeatConsult,
            dec!(158.29),
        )
        .covers(15)
        .modifiers(&BODY_MASS)
        .modifiers(&AFTER_HOURS)
        .prolonged_addon()
        .build(),
        Def::per_unit("03.05A", "ICU visit per 15 minutes", TimedVisit, dec!(58.32))
            .modifiers(&BODY_MASS)
            .modifiers(&AFTER_HOURS)
            .build(),
        callback("03.05N", "Callback - weekday 07:00-17:00", dec!(75.97)),
        callback("03.05P", "Callback - weekday evening 17:00-22:00", dec!(113.94)),
        callback("03.05R", "Callback - weekend/stat 07:00-22:00", dec!(113.94)),
        callback("03.05QA", "Callback - night 22:00-24:00", dec!(151.92)),
        callback("03.05QB", "Callback - night 00:00-07:00", dec!(151.92)),
        Def::per_call("13.62A", "Ventilation / CPAP / BiPAP management", Procedure, dec!(41.09))
            .build(),
        procedure("10.04B", "Emergency intubation", dec!(106.61)),
        procedure("50.91D", "Radial arterial line", dec!(54.54)),
        procedure("50.94D", "Central venous catheter", dec!(67.83)),
        procedure("50.94E", "Peripheral vein catheter (ultrasound-guided)", dec!(68.20)),
        procedure("01.09", "Nonoperative bronchoscopy", dec!(132.62)),
        Def::per_call("13.99E", "Resuscitation (primary)", Procedure, dec!(96.52))
            .units(1)
            .modifiers(&AFTER_HOURS)
            .build(),
        Def::per_call("13.99EC", "Resuscitation (secondary physician)", Procedure, dec!(87.70))
            .units(1)
            .modifiers(&AFTER_HOURS)
            .build(),
        Def::per_unit("03.05JC", "Family conference (per 15 minutes)", Conference, dec!(58.32))
            .build(),
        Def::per_call("03.05K", "Team/family conference (30 minutes)", Conference, dec!(116.64))
            .covers(30)
            .build(),
        Def::per_call("03.05JA", "Multidisciplinary conference", Conference, dec!(44.92))
            .covers(15)
            .build(),
        prolonged_addon(),
    ];

    CodeRegistry::new(FeeSchedule::CriticalCare, codes)
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_code() {
        let registry = FeeSchedule::Nephrology.registry();
        let def = registry.lookup("03.07B").unwrap();
        assert_eq!(def.base_fee, dec!(141.08));
        assert_eq!(def.category, CodeCategory::RepeatConsult);
        assert_eq!(def.included_minutes, 15);
        assert_eq!(def.base_units, 1);
        assert_eq!(def.addon_code.as_deref(), Some(PROLONGED_ADDON_CODE));
    }

    #[test]
    fn test_lookup_normalizes_case_and_whitespace() {
        let registry = FeeSchedule::Nephrology.registry();
        assert_eq!(registry.lookup(" 03.03fv ").unwrap().code, "03.03FV");
    }

    #[test]
    fn test_unknown_code() {
        let registry = FeeSchedule::Nephrology.registry();
        let err = registry.lookup("03.05A").unwrap_err();
        assert!(matches!(err, FeeError::UnknownCode { ref code } if code == "03.05A"));
        assert!(!registry.contains("99.99Z"));
    }

    #[test]
    fn test_schedules_disagree_on_shared_codes() {
        let neph = FeeSchedule::Nephrology.registry();
        let ccm = FeeSchedule::CriticalCare.registry();
        assert_ne!(
            neph.lookup("03.07B").unwrap().base_fee,
            ccm.lookup("03.07B").unwrap().base_fee
        );
        assert!(ccm.legal_modifiers("03.08A").unwrap().contains(&"CRCM".to_string()));
        assert!(!neph.legal_modifiers("03.08A").unwrap().contains(&"CRCM".to_string()));
    }

    #[test]
    fn test_prolonged_addon_definition() {
        for schedule in [FeeSchedule::Nephrology, FeeSchedule::CriticalCare] {
            let addon = schedule.registry().lookup(PROLONGED_ADDON_CODE).unwrap();
            assert_eq!(addon.base_fee, dec!(54.81));
            assert_eq!(addon.unit_basis, UnitBasis::PerUnit);
            assert_eq!(addon.max_units_per_encounter, Some(6));
        }
    }

    #[test]
    fn test_codes_are_unique_and_ordered() {
        for schedule in [FeeSchedule::Nephrology, FeeSchedule::CriticalCare] {
            let registry = schedule.registry();
            let mut seen = std::collections::HashSet::new();
            for def in registry.codes() {
                assert!(seen.insert(def.code.clone()), "duplicate {}", def.code);
                assert_eq!(def.unit_minutes, 15);
            }
            assert_eq!(seen.len(), registry.len());
        }
        assert_eq!(
            FeeSchedule::CriticalCare.registry().codes().next().unwrap().code,
            "03.08A"
        );
    }

    #[test]
    fn test_unit_semantics() {
        let ccm = FeeSchedule::CriticalCare.registry();
        assert_eq!(ccm.lookup("03.08A").unwrap().base_units, 2);
        assert_eq!(ccm.lookup("03.05K").unwrap().base_units, 2);
        assert_eq!(ccm.lookup("03.05QB").unwrap().base_units, 1);
        assert_eq!(ccm.lookup("10.04B").unwrap().base_units, 0);
        assert_eq!(ccm.lookup("13.99E").unwrap().base_units, 1);
        assert_eq!(ccm.category("13.62A").unwrap(), CodeCategory::Procedure);
    }

    #[test]
    fn test_schedule_parse() {
        assert_eq!("critical_care".parse::<FeeSchedule>().unwrap(), FeeSchedule::CriticalCare);
        assert_eq!("CCM".parse::<FeeSchedule>().unwrap(), FeeSchedule::CriticalCare);
        assert_eq!("neph".parse::<FeeSchedule>().unwrap(), FeeSchedule::Nephrology);
        assert!("dermatology".parse::<FeeSchedule>().is_err());
        assert_eq!(FeeSchedule::CriticalCare.to_string(), "critical-care");
    }
}
