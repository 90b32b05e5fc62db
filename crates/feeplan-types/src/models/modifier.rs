//! Fee modifiers and after-hours time-of-day codes

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Evaluation stage of a modifier
///
/// Variants are declared in application order; the derived `Ord` is the
/// order the modifier engine walks them in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierStage {
    /// Skill designation replacing the base fee
    Skill,
    /// Time/complexity tier (mutually exclusive tiers)
    Complexity,
    /// Body-mass surcharge, a share of the original base fee
    BodyMass,
    /// Virtual-care uplift
    Virtual,
    /// Evening, weekend or night surcharge
    AfterHours,
}

/// How a modifier changes the running fee
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ModifierKind {
    /// Running fee becomes this amount
    Replacement(Decimal),
    /// Fixed dollar amount added to the running fee
    Additive(Decimal),
    /// Fraction of the original base fee added to the running fee
    PercentOfBase(Decimal),
    /// Running fee multiplied by this factor
    Multiplier(Decimal),
}

/// A named fee adjustment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifier {
    pub code: String,
    pub description: String,
    pub stage: ModifierStage,
    pub kind: ModifierKind,
    /// Minutes beyond the included duration needed before a complexity tier qualifies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold_minutes: Option<u32>,
}

/// After-hours time-of-day code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TimeOfDay {
    /// Weekday evening 17:00-22:00
    #[serde(rename = "EV")]
    Evening,
    /// Weekend or stat holiday 07:00-22:00
    #[serde(rename = "WK")]
    Weekend,
    /// Night 00:00-07:00
    #[serde(rename = "NTAM")]
    NightAm,
    /// Night 22:00-24:00
    #[serde(rename = "NTPM")]
    NightPm,
}

impl TimeOfDay {
    /// Modifier code as it appears on a claim
    pub fn code(self) -> &'static str {
        match self {
            Self::Evening => "EV",
            Self::Weekend => "WK",
            Self::NightAm => "NTAM",
            Self::NightPm => "NTPM",
        }
    }

    pub fn all() -> [TimeOfDay; 4] {
        [Self::Evening, Self::Weekend, Self::NightAm, Self::NightPm]
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for TimeOfDay {
    type Err = String;

    /// Parse "EV", "WK", "NTAM" or "NTPM" (any case)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EV" => Ok(Self::Evening),
            "WK" => Ok(Self::Weekend),
            "NTAM" => Ok(Self::NightAm),
            "NTPM" => Ok(Self::NightPm),
            other => Err(format!(
                "unknown time-of-day code '{}' (expected EV, WK, NTAM or NTPM)",
                other
            )),
        }
    }
}
