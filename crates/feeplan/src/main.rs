//! feeplan - Fee schedule billing calculator and time optimizer

mod cli;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use feeplan_core::{
    plan_clinic, plan_shift, summarize_records, ClinicSession, FeeCalculator, FeeSchedule,
    FeeplanConfig, ShiftInput,
};
use feeplan_types::TimeOfDay;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(
    name = "feeplan",
    version,
    about = "Fee schedule billing calculator and clinician time optimizer",
    long_about = "Prices medical service encounters against a specialty fee schedule and\n\
                  turns leftover clinician time into billable units without breaking\n\
                  per-block capacity limits.\n\
                  \n\
                  Examples:\n\
                    feeplan fee --code 03.08A --minutes 45\n\
                    feeplan fee --code 03.07B --minutes 15 --virtual --time-of-day NTAM\n\
                    feeplan clinic --hours 8 --new 5 --repeat 5 --follow-ups 10 --rrnp\n\
                    feeplan shift shift.toml\n\
                    feeplan summarize entries.json --available-units 32\n\
                    feeplan --schedule critical-care codes\n\
                  \n\
                  Environment Variables:\n\
                    FEEPLAN_CONFIG                   # Config file path\n\
                    FEEPLAN_FORMAT                   # Output format: json|table\n\
                    RUST_LOG                         # Log filter (logs go to stderr)"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Fee schedule for `fee` and `codes` (nephrology|critical-care)
    #[arg(long, global = true)]
    schedule: Option<FeeSchedule>,

    /// Config file (default: <config dir>/feeplan/config.toml)
    #[arg(long, env = "FEEPLAN_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Output format (json|table)
    #[arg(long, env = "FEEPLAN_FORMAT", value_parser = ["json", "table"], default_value = "table", global = true)]
    format: String,

    /// More logging (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Price a single encounter by duration
    Fee {
        /// Health service code, e.g. 03.08A
        #[arg(long)]
        code: String,
        /// Minutes spent with the patient
        #[arg(long, default_value_t = 0)]
        minutes: u32,
        /// Telephone or video visit
        #[arg(long = "virtual")]
        virtual_care: bool,
        /// After-hours code: EV, WK, NTAM or NTPM
        #[arg(long)]
        time_of_day: Option<TimeOfDay>,
    },
    /// Plan a nephrology clinic and redistribute leftover time as add-ons
    Clinic {
        /// Clinic length in hours
        #[arg(long)]
        hours: f64,
        /// New consults seen
        #[arg(long = "new", default_value_t = 0)]
        new_consults: u32,
        /// Repeat consults seen
        #[arg(long = "repeat", default_value_t = 0)]
        repeat_consults: u32,
        /// Follow-up visits seen
        #[arg(long, default_value_t = 0)]
        follow_ups: u32,
        /// All visits were virtual
        #[arg(long = "virtual")]
        virtual_care: bool,
        /// After-hours code for repeat consults
        #[arg(long)]
        time_of_day: Option<TimeOfDay>,
        /// Apply the RRNP uplift
        #[arg(long)]
        rrnp: bool,
    },
    /// Plan a critical care shift from a JSON or TOML encounter file
    Shift {
        /// Shift input (.json or .toml)
        input: PathBuf,
    },
    /// Summarise a JSON array of billing entries
    Summarize {
        /// Entries file (.json)
        input: PathBuf,
        /// 15-minute units of time worked
        #[arg(long)]
        available_units: u32,
    },
    /// List service codes in the fee schedule
    Codes,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => FeeplanConfig::load(path),
        None => FeeplanConfig::load_default(),
    }
    .context("Failed to load configuration")?;

    let json = cli.format == "json";
    let schedule = cli.schedule.unwrap_or(config.schedule);
    tracing::debug!(%schedule, rrnp_uplift = %config.rrnp_uplift, "Configuration loaded");

    let output = match cli.command {
        Command::Fee {
            code,
            minutes,
            virtual_care,
            time_of_day,
        } => {
            let calc = FeeCalculator::new(schedule);
            let result = calc
                .compute(&code, minutes, virtual_care, time_of_day)
                .with_context(|| format!("Failed to price {} ({})", code, schedule))?;
            cli::format_fee(&result, json)?
        }
        Command::Clinic {
            hours,
            new_consults,
            repeat_consults,
            follow_ups,
            virtual_care,
            time_of_day,
            rrnp,
        } => {
            let session = ClinicSession {
                clinic_minutes: clinic_minutes(hours)?,
                new_consults,
                repeat_consults,
                follow_ups,
                virtual_care,
                time_of_day,
                rrnp,
            };
            let calc = FeeCalculator::new(FeeSchedule::Nephrology);
            let plan = plan_clinic(&calc, &session, config.rrnp_uplift)
                .context("Failed to plan clinic")?;
            cli::format_clinic(&plan, json)?
        }
        Command::Shift { input } => {
            let shift = read_shift(&input)?;
            let calc = FeeCalculator::new(FeeSchedule::CriticalCare);
            let capacity = config.capacity_model()?;
            let plan = plan_shift(&calc, &capacity, &shift).context("Failed to plan shift")?;
            cli::format_shift(&plan, json)?
        }
        Command::Summarize {
            input,
            available_units,
        } => {
            let content = std::fs::read_to_string(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let records: Vec<serde_json::Value> = serde_json::from_str(&content)
                .with_context(|| format!("{} is not a JSON array", input.display()))?;
            let (summary, report) = summarize_records(&records, available_units);
            cli::format_summary_report(&summary, &report, json)?
        }
        Command::Codes => cli::format_codes(schedule.registry(), json)?,
    };

    println!("{}", output);
    Ok(())
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("feeplan={0},feeplan_core={0}", level).into());

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

fn clinic_minutes(hours: f64) -> Result<u32> {
    if !hours.is_finite() || hours <= 0.0 || hours > 24.0 {
        anyhow::bail!("Clinic hours must be between 0 and 24, got {}", hours);
    }
    Ok((hours * 60.0).round() as u32)
}

fn read_shift(path: &Path) -> Result<ShiftInput> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

    if is_toml {
        toml::from_str(&content).with_context(|| format!("Invalid shift file {}", path.display()))
    } else {
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid shift file {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_fee_command() {
        let cli = Cli::try_parse_from([
            "feeplan",
            "--schedule",
            "critical-care",
            "fee",
            "--code",
            "03.05A",
            "--minutes",
            "45",
            "--time-of-day",
            "ntam",
        ])
        .unwrap();
        assert_eq!(cli.schedule, Some(FeeSchedule::CriticalCare));
        match cli.command {
            Command::Fee {
                code,
                minutes,
                virtual_care,
                time_of_day,
            } => {
                assert_eq!(code, "03.05A");
                assert_eq!(minutes, 45);
                assert!(!virtual_care);
                assert_eq!(time_of_day, Some(TimeOfDay::NightAm));
            }
            _ => panic!("Expected fee command"),
        }
    }

    #[test]
    fn test_rejects_bad_time_of_day() {
        let result = Cli::try_parse_from([
            "feeplan",
            "fee",
            "--code",
            "03.07B",
            "--time-of-day",
            "noon",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_clinic_minutes() {
        assert_eq!(clinic_minutes(8.0).unwrap(), 480);
        assert_eq!(clinic_minutes(7.5).unwrap(), 450);
        assert!(clinic_minutes(0.0).is_err());
        assert!(clinic_minutes(f64::NAN).is_err());
        assert!(clinic_minutes(25.0).is_err());
    }

    #[test]
    fn test_read_shift_toml_and_json() {
        let dir = tempfile::tempdir().unwrap();

        let toml_path = dir.path().join("shift.toml");
        std::fs::write(
            &toml_path,
            "weekend = true\nhours = 6.0\n\n[[blocks]]\nblock = \"late_evening\"\nconsults = 1\n",
        )
        .unwrap();
        let shift = read_shift(&toml_path).unwrap();
        assert!(shift.weekend);
        assert_eq!(shift.blocks[0].consults, 1);

        let json_path = dir.path().join("shift.json");
        std::fs::write(&json_path, r#"{"hours": 4, "blocks": []}"#).unwrap();
        let shift = read_shift(&json_path).unwrap();
        assert_eq!(shift.hours, 4.0);
    }
}
