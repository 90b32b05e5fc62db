//! Per-block unit capacities
//!
//! A block can hold at most four 15-minute units per clock hour it spans.
//! Weekday and weekend/stat tables are kept separately; on weekends the
//! evening block does not exist (it is part of daytime).

use crate::error::{FeeError, FeeResult};
use feeplan_types::{BlockCapacity, ScheduleMode, TimeBlock};

const WEEKDAY_FILL: [TimeBlock; 3] = [TimeBlock::LateEvening, TimeBlock::Evening, TimeBlock::Daytime];
const WEEKEND_FILL: [TimeBlock; 2] = [TimeBlock::LateEvening, TimeBlock::Daytime];

/// Capacity tables for both schedule modes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapacityModel {
    weekday: Vec<BlockCapacity>,
    weekend: Vec<BlockCapacity>,
}

impl Default for CapacityModel {
    fn default() -> Self {
        Self::standard()
    }
}

impl CapacityModel {
    /// Full-time capacity of every block (4 units per clock hour)
    pub fn standard() -> Self {
        let full = |mode: ScheduleMode| -> Vec<BlockCapacity> {
            expected_blocks(mode)
                .iter()
                .map(|&block| BlockCapacity {
                    block,
                    units: block.span_hours(mode) * 4,
                })
                .collect()
        };
        Self {
            weekday: full(ScheduleMode::Weekday),
            weekend: full(ScheduleMode::WeekendOrStat),
        }
    }

    /// Build from explicit tables, validating each one
    pub fn from_tables(
        weekday: Vec<BlockCapacity>,
        weekend: Vec<BlockCapacity>,
    ) -> FeeResult<Self> {
        Ok(Self {
            weekday: validate(ScheduleMode::Weekday, weekday)?,
            weekend: validate(ScheduleMode::WeekendOrStat, weekend)?,
        })
    }

    /// Blocks in capacity order: overnight first, then backwards from
    /// late evening to daytime
    pub fn blocks(&self, mode: ScheduleMode) -> &[BlockCapacity] {
        match mode {
            ScheduleMode::Weekday => &self.weekday,
            ScheduleMode::WeekendOrStat => &self.weekend,
        }
    }

    /// Capacity of `block` after mapping it onto `mode`
    pub fn capacity(&self, mode: ScheduleMode, block: TimeBlock) -> u32 {
        let block = mode.normalize(block);
        self.blocks(mode)
            .iter()
            .find(|c| c.block == block)
            .map_or(0, |c| c.units)
    }

    pub fn total_capacity(&self, mode: ScheduleMode) -> u32 {
        self.blocks(mode).iter().map(|c| c.units).sum()
    }

    /// Order the block filler visits blocks in; overnight is never filled
    pub fn filler_order(mode: ScheduleMode) -> &'static [TimeBlock] {
        match mode {
            ScheduleMode::Weekday => &WEEKDAY_FILL,
            ScheduleMode::WeekendOrStat => &WEEKEND_FILL,
        }
    }
}

fn expected_blocks(mode: ScheduleMode) -> &'static [TimeBlock] {
    match mode {
        ScheduleMode::Weekday => &[
            TimeBlock::Overnight,
            TimeBlock::LateEvening,
            TimeBlock::Evening,
            TimeBlock::Daytime,
        ],
        ScheduleMode::WeekendOrStat => {
            &[TimeBlock::Overnight, TimeBlock::LateEvening, TimeBlock::Daytime]
        }
    }
}

fn validate(mode: ScheduleMode, mut table: Vec<BlockCapacity>) -> FeeResult<Vec<BlockCapacity>> {
    let label = if mode.is_weekend() { "weekend" } else { "weekday" };
    let expected = expected_blocks(mode);

    for (i, entry) in table.iter().enumerate() {
        if !expected.contains(&entry.block) {
            return Err(FeeError::configuration(format!(
                "{} capacity lists '{}', which does not exist on {}s",
                label, entry.block, label
            )));
        }
        if table[..i].iter().any(|c| c.block == entry.block) {
            return Err(FeeError::configuration(format!(
                "{} capacity lists '{}' more than once",
                label, entry.block
            )));
        }
        let ceiling = entry.block.span_hours(mode) * 4;
        if entry.units == 0 || entry.units > ceiling {
            return Err(FeeError::configuration(format!(
                "{} capacity for '{}' must be between 1 and {} units, got {}",
                label, entry.block, ceiling, entry.units
            )));
        }
    }

    if let Some(missing) = expected
        .iter()
        .find(|block| !table.iter().any(|c| c.block == **block))
    {
        return Err(FeeError::configuration(format!(
            "{} capacity is missing '{}'",
            label, missing
        )));
    }

    table.sort_by_key(|c| expected.iter().position(|b| *b == c.block));
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cap(block: TimeBlock, units: u32) -> BlockCapacity {
        BlockCapacity { block, units }
    }

    #[test]
    fn test_standard_weekday() {
        let model = CapacityModel::standard();
        let wd = ScheduleMode::Weekday;
        assert_eq!(model.capacity(wd, TimeBlock::Overnight), 28);
        assert_eq!(model.capacity(wd, TimeBlock::Daytime), 40);
        assert_eq!(model.capacity(wd, TimeBlock::Evening), 20);
        assert_eq!(model.capacity(wd, TimeBlock::LateEvening), 8);
        assert_eq!(model.total_capacity(wd), 96);
    }

    #[test]
    fn test_standard_weekend_collapses_evening() {
        let model = CapacityModel::standard();
        let we = ScheduleMode::WeekendOrStat;
        assert_eq!(model.blocks(we).len(), 3);
        assert_eq!(model.capacity(we, TimeBlock::Daytime), 60);
        assert_eq!(model.capacity(we, TimeBlock::Evening), 60);
        assert_eq!(model.total_capacity(we), 96);
    }

    fn order(model: &CapacityModel, mode: ScheduleMode) -> Vec<TimeBlock> {
        model.blocks(mode).iter().map(|c| c.block).collect()
    }

    #[test]
    fn test_blocks_start_overnight_then_run_backwards() {
        let model = CapacityModel::standard();
        assert_eq!(
            order(&model, ScheduleMode::Weekday),
            vec![
                TimeBlock::Overnight,
                TimeBlock::LateEvening,
                TimeBlock::Evening,
                TimeBlock::Daytime
            ]
        );
        assert_eq!(
            order(&model, ScheduleMode::WeekendOrStat),
            vec![
                TimeBlock::Overnight,
                TimeBlock::LateEvening,
                TimeBlock::Daytime
            ]
        );
    }

    #[test]
    fn test_filler_order_skips_overnight() {
        for mode in [ScheduleMode::Weekday, ScheduleMode::WeekendOrStat] {
            let order = CapacityModel::filler_order(mode);
            assert!(!order.contains(&TimeBlock::Overnight));
            assert_eq!(order[0], TimeBlock::LateEvening);
            assert_eq!(*order.last().unwrap(), TimeBlock::Daytime);
        }
    }

    #[test]
    fn test_from_tables_accepts_reduced_capacity_in_any_order() {
        let model = CapacityModel::from_tables(
            vec![
                cap(TimeBlock::Daytime, 32),
                cap(TimeBlock::LateEvening, 4),
                cap(TimeBlock::Overnight, 28),
                cap(TimeBlock::Evening, 12),
            ],
            vec![
                cap(TimeBlock::Overnight, 20),
                cap(TimeBlock::Daytime, 48),
                cap(TimeBlock::LateEvening, 8),
            ],
        )
        .unwrap();
        assert_eq!(model.capacity(ScheduleMode::Weekday, TimeBlock::Daytime), 32);
        assert_eq!(
            order(&model, ScheduleMode::Weekday),
            order(&CapacityModel::standard(), ScheduleMode::Weekday)
        );
        assert_eq!(
            order(&model, ScheduleMode::WeekendOrStat),
            order(&CapacityModel::standard(), ScheduleMode::WeekendOrStat)
        );
        assert_eq!(model.total_capacity(ScheduleMode::WeekendOrStat), 76);
    }

    #[test]
    fn test_from_tables_rejects_malformed() {
        let weekend = CapacityModel::standard().weekend.clone();
        let weekday = CapacityModel::standard().weekday.clone();

        let missing = vec![cap(TimeBlock::Daytime, 40)];
        let err = CapacityModel::from_tables(missing, weekend.clone()).unwrap_err();
        assert!(err.to_string().contains("missing"));

        let mut duplicated = weekday.clone();
        duplicated.push(cap(TimeBlock::Daytime, 10));
        let err = CapacityModel::from_tables(duplicated, weekend.clone()).unwrap_err();
        assert!(err.to_string().contains("more than once"));

        let mut with_evening = weekend.clone();
        with_evening.push(cap(TimeBlock::Evening, 4));
        let err = CapacityModel::from_tables(weekday.clone(), with_evening).unwrap_err();
        assert!(err.to_string().contains("does not exist"));

        let mut too_big = weekday.clone();
        too_big[1].units = 9;
        assert!(matches!(
            CapacityModel::from_tables(too_big, weekend.clone()),
            Err(FeeError::Configuration { .. })
        ));

        let mut zero = weekday;
        zero[0].units = 0;
        assert!(CapacityModel::from_tables(zero, weekend).is_err());
    }
}
