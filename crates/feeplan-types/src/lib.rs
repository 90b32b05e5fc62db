//! feeplan-types - Shared data types for feeplan
//!
//! This crate contains pure data structures without heavy dependencies.
//! No config loading, no CLI - just serde-serializable types.
//!
//! Used by:
//! - feeplan-core (fee engine and allocators)
//! - feeplan (command-line front end)

pub mod models;

// Re-export model types
pub use models::{
    AddOnLine, BillingEntry, BillingResult, BlockCapacity, BlockUsage, CodeCategory, EntrySource,
    Modifier, ModifierKind, ModifierStage, ScheduleMode, ServiceCodeDefinition, SummaryKey,
    SummaryRow, SummaryTotals, TimeBlock, TimeOfDay, UnitBasis,
};
