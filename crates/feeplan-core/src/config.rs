//! feeplan configuration file
//!
//! ```toml
//! schedule = "critical_care"
//! rrnp_uplift = 1.1998
//!
//! [capacity]
//! weekday = [
//!     { block = "overnight", units = 28 },
//!     { block = "daytime", units = 32 },
//!     { block = "evening", units = 20 },
//!     { block = "late_evening", units = 8 },
//! ]
//! ```
//!
//! A missing file means defaults. A capacity list that is left out keeps
//! the standard table for that mode.

use crate::capacity::CapacityModel;
use crate::error::{FeeError, FeeResult};
use crate::intake::DEFAULT_RRNP_UPLIFT;
use crate::registry::FeeSchedule;
use feeplan_types::{BlockCapacity, ScheduleMode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeplanConfig {
    pub schedule: FeeSchedule,
    /// Multiplier applied to clinic fees when RRNP is requested
    pub rrnp_uplift: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<CapacityConfig>,
}

impl Default for FeeplanConfig {
    fn default() -> Self {
        Self {
            schedule: FeeSchedule::default(),
            rrnp_uplift: DEFAULT_RRNP_UPLIFT,
            capacity: None,
        }
    }
}

/// Per-mode capacity overrides
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityConfig {
    #[serde(default)]
    pub weekday: Option<Vec<BlockCapacity>>,
    #[serde(default)]
    pub weekend: Option<Vec<BlockCapacity>>,
}

impl FeeplanConfig {
    /// `<config_dir>/feeplan/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("feeplan").join("config.toml"))
    }

    /// Load and validate `path`; a missing file gives defaults
    pub fn load(path: &Path) -> FeeResult<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| FeeError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| FeeError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;

        tracing::info!(path = %path.display(), schedule = %config.schedule, "Loaded config");
        Ok(config)
    }

    /// Load from the default location, or defaults when there is none
    pub fn load_default() -> FeeResult<Self> {
        match Self::default_path() {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> FeeResult<()> {
        if self.rrnp_uplift < Decimal::ONE {
            return Err(FeeError::configuration(format!(
                "rrnp_uplift must be at least 1, got {}",
                self.rrnp_uplift
            )));
        }
        self.capacity_model().map(|_| ())
    }

    /// Standard capacities with any configured overrides applied
    pub fn capacity_model(&self) -> FeeResult<CapacityModel> {
        let Some(overrides) = &self.capacity else {
            return Ok(CapacityModel::standard());
        };
        let standard = CapacityModel::standard();
        let table = |custom: &Option<Vec<BlockCapacity>>, mode: ScheduleMode| {
            custom
                .clone()
                .unwrap_or_else(|| standard.blocks(mode).to_vec())
        };
        CapacityModel::from_tables(
            table(&overrides.weekday, ScheduleMode::Weekday),
            table(&overrides.weekend, ScheduleMode::WeekendOrStat),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feeplan_types::TimeBlock;
    use rust_decimal_macros::dec;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = FeeplanConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, FeeplanConfig::default());
        assert_eq!(config.rrnp_uplift, dec!(1.1998));
        assert_eq!(config.schedule, FeeSchedule::Nephrology);
        assert_eq!(config.capacity_model().unwrap(), CapacityModel::standard());
    }

    #[test]
    fn test_load_schedule_and_partial_capacity() {
        let file = write_config(
            r#"
schedule = "critical_care"
rrnp_uplift = 1.25

[capacity]
weekday = [
    { block = "late_evening", units = 4 },
    { block = "overnight", units = 28 },
    { block = "daytime", units = 32 },
    { block = "evening", units = 12 },
]
"#,
        );
        let config = FeeplanConfig::load(file.path()).unwrap();
        assert_eq!(config.schedule, FeeSchedule::CriticalCare);
        assert_eq!(config.rrnp_uplift, dec!(1.25));

        let model = config.capacity_model().unwrap();
        assert_eq!(model.capacity(ScheduleMode::Weekday, TimeBlock::LateEvening), 4);
        assert_eq!(model.capacity(ScheduleMode::WeekendOrStat, TimeBlock::Daytime), 60);
    }

    #[test]
    fn test_parse_error_keeps_path() {
        let file = write_config("schedule = [not toml");
        let err = FeeplanConfig::load(file.path()).unwrap_err();
        match err {
            FeeError::ConfigParse { path, .. } => assert_eq!(path, file.path()),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_schedule_is_parse_error() {
        let file = write_config("schedule = \"dermatology\"");
        assert!(matches!(
            FeeplanConfig::load(file.path()),
            Err(FeeError::ConfigParse { .. })
        ));
    }

    #[test]
    fn test_invalid_capacity_is_configuration_error() {
        let file = write_config(
            r#"
[capacity]
weekend = [
    { block = "overnight", units = 28 },
    { block = "daytime", units = 60 },
    { block = "evening", units = 20 },
    { block = "late_evening", units = 8 },
]
"#,
        );
        assert!(matches!(
            FeeplanConfig::load(file.path()),
            Err(FeeError::Configuration { .. })
        ));
    }

    #[test]
    fn test_uplift_below_one_rejected() {
        let file = write_config("rrnp_uplift = 0.5");
        let err = FeeplanConfig::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("rrnp_uplift"));
    }
}
