#![deny(warnings)]

//! TORSO simulation driver: loads the position and personnel datasets, runs
//! the monthly tick loop and writes one JSON metrics line per tick.

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use torso_core::{GradeSchedule, Policy, SimConfig};
use torso_runtime::Clock;

const USAGE: &str = "\
torso: Total Organizational Requirements Simulating Optimizer

Simulates enlisted manpower month by month: recruiting, advancement,
distribution to billets, separation and retirement.

USAGE:
    torso [OPTIONS]

OPTIONS:
    --positions <FILE>               Position dataset [default: positions.csv]
    --personnel <FILE>               Personnel dataset [default: personnel.csv]
    --ticks <N>                      Months to simulate [default: 6]
    -s, --seed <N>                   Random seed [default: 19920813]
    --output <FILE>                  Metrics as JSON lines [default: stdout]
    --policy <FILE>                  YAML policy file
    --min-tig <N>                    Minimum time in grade, all paygrades
    --promotion-cutoff <SCORE>       Minimum performance to compete for promotion
    --intake-cap <N>                 Maximum accessions per month
    --min-tour <N>                   Minimum tour length
    --retirement-eligibility <N>     Time in service at which retirement opens
    --training-lag <N>               Months a recruit spends in training
    --start <YYYY-MM>                Calendar month of the first tick
    --final-personnel <FILE>         Write the final ledger as a personnel dataset
    -d, --detail                     Log each engine's work every tick
    -h, --help                       Print this help
    -V, --version                    Print version information
";

#[derive(Debug, PartialEq)]
struct Args {
    positions: PathBuf,
    personnel: PathBuf,
    ticks: i64,
    seed: u64,
    output: Option<PathBuf>,
    policy: Option<PathBuf>,
    min_tig: Option<u32>,
    promotion_cutoff: Option<Decimal>,
    intake_cap: Option<u32>,
    min_tour: Option<u32>,
    retirement_eligibility: Option<u32>,
    training_lag: Option<u32>,
    start: Option<NaiveDate>,
    final_personnel: Option<PathBuf>,
    detail: bool,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            positions: PathBuf::from("positions.csv"),
            personnel: PathBuf::from("personnel.csv"),
            ticks: 6,
            seed: 19920813,
            output: None,
            policy: None,
            min_tig: None,
            promotion_cutoff: None,
            intake_cap: None,
            min_tour: None,
            retirement_eligibility: None,
            training_lag: None,
            start: None,
            final_personnel: None,
            detail: false,
        }
    }
}

#[derive(Debug, PartialEq)]
enum Invocation {
    Help,
    Version,
    Run(Args),
}

fn value<I: Iterator<Item = String>>(it: &mut I, flag: &str) -> Result<String> {
    it.next().ok_or_else(|| anyhow!("{flag} needs a value"))
}

fn number<T, I>(it: &mut I, flag: &str) -> Result<T>
where
    I: Iterator<Item = String>,
    T: std::str::FromStr,
{
    let raw = value(it, flag)?;
    raw.parse()
        .map_err(|_| anyhow!("invalid value for {flag}: {raw:?} is not an integer"))
}

fn month(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{raw}-15"), "%Y-%m-%d")
        .with_context(|| format!("invalid value for --start: {raw:?} is not YYYY-MM"))
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<Invocation> {
    let mut a = Args::default();
    let mut it = args.into_iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(Invocation::Help),
            "-V" | "--version" => return Ok(Invocation::Version),
            "--positions" => a.positions = value(&mut it, &arg)?.into(),
            "--personnel" => a.personnel = value(&mut it, &arg)?.into(),
            "--ticks" => a.ticks = number(&mut it, &arg)?,
            "-s" | "--seed" => a.seed = number(&mut it, &arg)?,
            "--output" => a.output = Some(value(&mut it, &arg)?.into()),
            "--policy" => a.policy = Some(value(&mut it, &arg)?.into()),
            "--min-tig" => a.min_tig = Some(number(&mut it, &arg)?),
            "--promotion-cutoff" => {
                let raw = value(&mut it, &arg)?;
                let score = raw
                    .parse()
                    .map_err(|_| anyhow!("invalid value for {arg}: {raw:?} is not a number"))?;
                a.promotion_cutoff = Some(score);
            }
            "--intake-cap" => a.intake_cap = Some(number(&mut it, &arg)?),
            "--min-tour" => a.min_tour = Some(number(&mut it, &arg)?),
            "--retirement-eligibility" => a.retirement_eligibility = Some(number(&mut it, &arg)?),
            "--training-lag" => a.training_lag = Some(number(&mut it, &arg)?),
            "--start" => a.start = Some(month(&value(&mut it, &arg)?)?),
            "--final-personnel" => a.final_personnel = Some(value(&mut it, &arg)?.into()),
            "-d" | "--detail" => a.detail = true,
            other => bail!("unknown option {other:?} (see --help)"),
        }
    }
    Ok(Invocation::Run(a))
}

impl Args {
    /// Policy file (or defaults) with command-line overrides applied on top.
    fn policy(&self) -> Result<Policy> {
        let mut policy = match &self.policy {
            Some(path) => torso_data::load_policy(path)?,
            None => Policy::default(),
        };
        if let Some(v) = self.min_tig {
            policy.min_time_in_grade = GradeSchedule::uniform(v);
        }
        if let Some(v) = self.promotion_cutoff {
            policy.promotion_cutoff = v;
        }
        if let Some(v) = self.intake_cap {
            policy.intake_cap = v;
        }
        if let Some(v) = self.min_tour {
            policy.min_tour_length = v;
            policy.rotation_tour_length = policy.rotation_tour_length.max(v);
        }
        if let Some(v) = self.retirement_eligibility {
            policy.retirement_eligibility = v;
        }
        if let Some(v) = self.training_lag {
            policy.training_lag = v;
        }
        policy.validate()?;
        Ok(policy)
    }

    fn config(&self) -> SimConfig {
        let mut config = SimConfig::new(self.ticks, self.seed);
        if let Some(start) = self.start {
            config.start_month = start;
        }
        config
    }
}

fn version() -> String {
    format!("torso {} ({})", env!("CARGO_PKG_VERSION"), env!("TORSO_REVISION"))
}

fn main() -> Result<()> {
    let args = match parse_args(std::env::args().skip(1))? {
        Invocation::Help => {
            print!("{USAGE}");
            return Ok(());
        }
        Invocation::Version => {
            println!("{}", version());
            return Ok(());
        }
        Invocation::Run(args) => args,
    };

    // Logs go to stderr so metrics can own stdout.
    let filter = EnvFilter::new(if args.detail { "debug" } else { "info" });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let policy = args.policy()?;
    let config = args.config();
    info!(
        positions = %args.positions.display(),
        personnel = %args.personnel.display(),
        ticks = args.ticks,
        seed = args.seed,
        "starting run"
    );

    let ledger = torso_data::load_ledger(&args.positions, &args.personnel)?;
    let outcome = Clock::new(ledger, policy, config)?.run()?;

    let mut sink: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("cannot create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    for m in &outcome.metrics {
        writeln!(sink, "{}", m.to_json_line()?)?;
    }
    sink.flush()?;

    if let Some(path) = &args.final_personnel {
        torso_data::write_people_path(path, outcome.ledger.people())?;
        info!(path = %path.display(), "final personnel written");
    }

    let s = outcome.summary();
    info!(
        ticks = s.ticks,
        accessions = s.accessions,
        promotions = s.promotions,
        assignments = s.assignments,
        separations = s.separations,
        retirements = s.retirements,
        roster = s.final_roster,
        vacancies = s.final_vacancies,
        "run complete"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Invocation> {
        parse_args(args.iter().map(|s| s.to_string()))
    }

    fn run_args(args: &[&str]) -> Args {
        match parse(args).unwrap() {
            Invocation::Run(a) => a,
            other => panic!("expected a run, got {other:?}"),
        }
    }

    #[test]
    fn defaults_without_arguments() {
        assert_eq!(run_args(&[]), Args::default());
    }

    #[test]
    fn help_and_version_short_circuit() {
        assert_eq!(parse(&["--ticks", "3", "--help"]).unwrap(), Invocation::Help);
        assert_eq!(parse(&["-V"]).unwrap(), Invocation::Version);
    }

    #[test]
    fn options_are_applied_to_policy_and_config() {
        let a = run_args(&[
            "--ticks", "24", "--seed", "42", "--min-tig", "6", "--intake-cap", "5",
            "--promotion-cutoff", "3.25", "--min-tour", "12", "--training-lag", "2",
            "--retirement-eligibility", "200", "--start", "2025-03", "-d",
        ]);
        assert!(a.detail);
        let policy = a.policy().unwrap();
        assert_eq!(policy.min_time_in_grade, GradeSchedule::uniform(6));
        assert_eq!(policy.intake_cap, 5);
        assert_eq!(policy.promotion_cutoff, Decimal::new(325, 2));
        assert_eq!(policy.min_tour_length, 12);
        assert_eq!(policy.training_lag, 2);
        assert_eq!(policy.retirement_eligibility, 200);
        let config = a.config();
        assert_eq!(config.tick_count().unwrap(), 24);
        assert_eq!(config.rng_seed, 42);
        assert_eq!(config.start_month, NaiveDate::from_ymd_opt(2025, 3, 15).unwrap());
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(parse(&["--seed", "forty-two"]).is_err());
        assert!(parse(&["--seed", "1.5"]).is_err());
        assert!(parse(&["--ticks"]).is_err());
        assert!(parse(&["--start", "2025-13"]).is_err());
        assert!(parse(&["--frobnicate"]).is_err());
        assert!(run_args(&["--promotion-cutoff", "5.5"]).policy().is_err());
    }

    #[test]
    fn version_names_package_and_revision() {
        let v = version();
        assert!(v.starts_with(&format!("torso {} (", env!("CARGO_PKG_VERSION"))), "{v}");
        assert!(v.ends_with(')'), "{v}");
    }

    #[test]
    fn negative_tick_count_parses_but_fails_configuration() {
        let a = run_args(&["--ticks", "-3"]);
        assert!(a.config().tick_count().is_err());
    }
}
