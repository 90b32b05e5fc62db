//! Data models for feeplan

pub mod code;
pub mod entry;
pub mod modifier;
pub mod summary;
pub mod time_block;

pub use code::{CodeCategory, ServiceCodeDefinition, UnitBasis};
pub use entry::{AddOnLine, BillingEntry, BillingResult, EntrySource};
pub use modifier::{Modifier, ModifierKind, ModifierStage, TimeOfDay};
pub use summary::{SummaryKey, SummaryRow, SummaryTotals};
pub use time_block::{BlockCapacity, BlockUsage, ScheduleMode, TimeBlock};
