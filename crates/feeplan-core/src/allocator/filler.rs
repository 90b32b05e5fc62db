use super::{hours_to_units, units_used};
use crate::calculator::FeeCalculator;
use crate::capacity::CapacityModel;
use crate::error::FeeResult;
use feeplan_types::{BillingEntry, BlockUsage, EntrySource, ScheduleMode, TimeBlock};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Code billed for each filler unit (ICU visit, one 15-minute unit)
pub const FILLER_CODE: &str = "03.05A";

/// Something the caller should tell the clinician about a fill run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AllocationWarning {
    /// Time that could not be placed in any eligible block
    Unbillable { units: u32 },
    /// Hours worked exceed what the whole schedule can hold
    ExceedsScheduleCapacity { requested: u32, capacity: u32 },
    /// Block filled to capacity with time still left over
    BlockSaturated { block: TimeBlock },
    /// Manually entered encounters already exceed the block's capacity
    OverCapacity {
        block: TimeBlock,
        used: u32,
        capacity: u32,
    },
    /// Overnight saw care but is never auto-filled
    OvernightManualEntry { used: u32 },
}

impl fmt::Display for AllocationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unbillable { units } => write!(
                f,
                "{} units ({} minutes) of working time could not be billed",
                units,
                units * 15
            ),
            Self::ExceedsScheduleCapacity {
                requested,
                capacity,
            } => write!(
                f,
                "{} units requested but time blocks only hold {}",
                requested, capacity
            ),
            Self::BlockSaturated { block } => write!(f, "{} block is at capacity", block),
            Self::OverCapacity {
                block,
                used,
                capacity,
            } => write!(
                f,
                "{} block has {} units entered, over its capacity of {}",
                block, used, capacity
            ),
            Self::OvernightManualEntry { used } => write!(
                f,
                "overnight block ({} units) is never auto-filled; enter overnight calls manually",
                used
            ),
        }
    }
}

/// Result of a block fill run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FillOutcome {
    /// Input entries followed by the filler entries
    pub entries: Vec<BillingEntry>,
    pub filler_units: u32,
    pub unbillable_units: u32,
    /// Usage per block after filling, chronological
    pub block_usage: Vec<BlockUsage>,
    pub warnings: Vec<AllocationWarning>,
}

/// Fills unbilled time into active time blocks
#[derive(Debug, Clone)]
pub struct BlockFiller {
    capacity: CapacityModel,
    template: BillingEntry,
}

impl BlockFiller {
    /// Fails with `UnknownCode` when the schedule has no ICU visit code
    pub fn new(calculator: FeeCalculator, capacity: CapacityModel) -> FeeResult<Self> {
        let template = calculator.bill::<&str>(FILLER_CODE, 1, &[], None, EntrySource::Filler)?;
        Ok(Self { capacity, template })
    }

    pub fn capacity(&self) -> &CapacityModel {
        &self.capacity
    }

    /// Fill `total_hours` of worked time around the given entries
    ///
    /// Negative or non-finite hours count as no time worked.
    pub fn fill(
        &self,
        mut entries: Vec<BillingEntry>,
        total_hours: f64,
        mode: ScheduleMode,
    ) -> FillOutcome {
        let allowed = hours_to_units(total_hours);
        let used = units_used(&entries);
        let mut remaining = allowed.saturating_sub(used);

        let mut block_used: BTreeMap<TimeBlock, u32> = BTreeMap::new();
        let mut active: BTreeSet<TimeBlock> = BTreeSet::new();
        for entry in &entries {
            let Some(block) = entry.time_block else {
                continue;
            };
            let block = mode.normalize(block);
            let used_here = block_used.entry(block).or_default();
            *used_here = used_here.saturating_add(entry.total_units());
            if entry.category.is_active_care() {
                active.insert(block);
            }
        }

        let mut warnings = Vec::new();
        for cap in self.capacity.blocks(mode) {
            let used_here = block_used.get(&cap.block).copied().unwrap_or(0);
            if used_here > cap.units {
                warnings.push(AllocationWarning::OverCapacity {
                    block: cap.block,
                    used: used_here,
                    capacity: cap.units,
                });
            }
        }
        if active.contains(&TimeBlock::Overnight) {
            warnings.push(AllocationWarning::OvernightManualEntry {
                used: block_used.get(&TimeBlock::Overnight).copied().unwrap_or(0),
            });
        }
        let schedule_capacity = self.capacity.total_capacity(mode);
        if allowed > schedule_capacity {
            warnings.push(AllocationWarning::ExceedsScheduleCapacity {
                requested: allowed,
                capacity: schedule_capacity,
            });
        }

        let mut filler_units = 0u32;
        for &block in CapacityModel::filler_order(mode) {
            if remaining == 0 {
                break;
            }
            if !active.contains(&block) {
                tracing::debug!(%block, "Skipping idle block");
                continue;
            }
            let capacity = self.capacity.capacity(mode, block);
            let used_here = block_used.entry(block).or_default();
            let added = remaining.min(capacity.saturating_sub(*used_here));

            entries.extend((0..added).map(|_| BillingEntry {
                time_block: Some(block),
                ..self.template.clone()
            }));
            *used_here += added;
            remaining -= added;
            filler_units += added;
            tracing::debug!(%block, added, remaining, "Filled block");

            if remaining > 0 {
                warnings.push(AllocationWarning::BlockSaturated { block });
            }
        }

        if remaining > 0 {
            tracing::warn!(units = remaining, "Working time left unbilled after filling");
            warnings.push(AllocationWarning::Unbillable { units: remaining });
        }

        let block_usage = self
            .capacity
            .blocks(mode)
            .iter()
            .map(|cap| BlockUsage {
                block: cap.block,
                used: block_used.get(&cap.block).copied().unwrap_or(0),
                capacity: cap.units,
            })
            .collect();

        tracing::info!(
            allowed,
            used,
            filler_units,
            unbillable = remaining,
            "Block fill complete"
        );

        FillOutcome {
            entries,
            filler_units,
            unbillable_units: remaining,
            block_usage,
            warnings,
        }
    }
}
