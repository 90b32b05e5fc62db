//! Service code definitions (one row of a fee schedule)

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Billing category of a health service code
///
/// The category decides which allocator passes may touch an entry:
/// prolonged add-ons only go to consults and repeat consults, and block
/// filler only goes to blocks with active care.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeCategory {
    /// New (comprehensive) consultation
    Consult,
    /// Repeat consultation or transfer of care
    RepeatConsult,
    /// Follow-up or repeat office visit
    FollowUp,
    /// Visit billed per 15 minutes of bedside time (ICU visit)
    TimedVisit,
    /// Procedure billed per call, consumes no time units
    Procedure,
    /// Family, team or multidisciplinary conference
    Conference,
    /// After-hours callback
    Callback,
    /// Periodic management fee not tied to an encounter
    Management,
    /// Supplementary code billed on top of a base code
    AddOn,
}

impl CodeCategory {
    /// Whether the prolonged-service add-on may be redistributed onto this category
    pub fn is_addon_eligible(self) -> bool {
        matches!(self, Self::Consult | Self::RepeatConsult)
    }

    /// Whether an encounter of this category marks its time block as active care
    pub fn is_active_care(self) -> bool {
        matches!(self, Self::Consult | Self::RepeatConsult | Self::TimedVisit)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Consult => "Consult",
            Self::RepeatConsult => "Repeat consult",
            Self::FollowUp => "Follow-up",
            Self::TimedVisit => "Timed visit",
            Self::Procedure => "Procedure",
            Self::Conference => "Conference",
            Self::Callback => "Callback",
            Self::Management => "Management",
            Self::AddOn => "Add-on",
        }
    }
}

/// How the base fee relates to billed units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitBasis {
    /// Fee is charged once per call regardless of units
    PerCall,
    /// Fee is charged for every 15-minute unit
    PerUnit,
}

/// Immutable definition of one billable service code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceCodeDefinition {
    /// Health service code, e.g. "03.08A"
    pub code: String,
    pub description: String,
    pub category: CodeCategory,
    /// Base fee in dollars (2dp)
    pub base_fee: Decimal,
    /// Minutes per billable unit (15 for every current code)
    pub unit_minutes: u32,
    /// Minutes of care covered by the base fee
    pub included_minutes: u32,
    /// Time units one call consumes (consult = 2, repeat = 1, procedure = 0)
    pub base_units: u32,
    pub unit_basis: UnitBasis,
    /// Modifier codes legal for this service code
    pub allowed_modifiers: Vec<String>,
    /// Upper bound on units per encounter (prolonged add-on: 6)
    pub max_units_per_encounter: Option<u32>,
    /// Prolonged-service add-on code billable on top of this code
    pub addon_code: Option<String>,
}

impl ServiceCodeDefinition {
    /// Whether `modifier` is in this code's legal set (case-insensitive)
    pub fn allows(&self, modifier: &str) -> bool {
        self.allowed_modifiers
            .iter()
            .any(|m| m.eq_ignore_ascii_case(modifier))
    }
}
