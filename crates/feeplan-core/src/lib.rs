//! feeplan-core - Fee engine and time allocators for feeplan
//!
//! Prices encounters against a specialty fee schedule, then turns leftover
//! clinician time into billable units without breaking per-block capacity.

pub mod allocator;
pub mod calculator;
pub mod capacity;
pub mod config;
pub mod error;
pub mod intake;
pub mod modifiers;
pub mod money;
pub mod registry;
pub mod summary;

pub use allocator::{
    redistribute_addon_units, AddonOutcome, AllocationWarning, BlockFiller, FillOutcome,
};
pub use calculator::FeeCalculator;
pub use capacity::CapacityModel;
pub use config::FeeplanConfig;
pub use error::{FeeError, FeeResult, RecordError, SummaryReport};
pub use intake::{plan_clinic, plan_shift, BlockEncounters, ClinicPlan, ClinicSession, ShiftInput, ShiftPlan};
pub use modifiers::ModifierOutcome;
pub use registry::{CodeRegistry, FeeSchedule};
pub use summary::{summarize, summarize_records, BillingSummary};
