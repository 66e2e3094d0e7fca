#![deny(warnings)]

//! Writes a synthetic personnel dataset, optionally seated against an
//! existing position dataset.

use anyhow::{anyhow, bail, Result};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use torso_data::Synth;

const USAGE: &str = "\
gen-personnel: generate a synthetic personnel dataset

Without --positions, draws --count unassigned people from the rating and
paygrade tables. With --positions, seats one person in each position with
probability --filled-pct and adds --count unassigned people whose ratings
and paygrades follow the positions' demand.

USAGE:
    gen-personnel [OPTIONS]

OPTIONS:
    -c, --count <N>         Unassigned people to draw [default: 10, or 0 with --positions]
    -s, --seed <N>          Random seed [default: 19920813]
    -o, --output <FILE>     Output file [default: personnel.csv]
    -b, --positions <FILE>  Position dataset to staff
    -f, --filled-pct <N>    Chance in percent that a position is filled [default: 100]
    -h, --help              Print this help
";

#[derive(Debug, PartialEq)]
struct Args {
    count: Option<usize>,
    seed: u64,
    output: PathBuf,
    positions: Option<PathBuf>,
    filled_pct: u32,
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<Option<Args>> {
    let mut a = Args {
        count: None,
        seed: 19920813,
        output: PathBuf::from("personnel.csv"),
        positions: None,
        filled_pct: 100,
    };
    let mut it = args.into_iter();
    while let Some(arg) = it.next() {
        let mut value = || it.next().ok_or_else(|| anyhow!("{arg} needs a value"));
        match arg.as_str() {
            "-h" | "--help" => return Ok(None),
            "-c" | "--count" => {
                let raw = value()?;
                a.count = Some(raw.parse().map_err(|_| anyhow!("invalid count {raw:?}"))?);
            }
            "-s" | "--seed" => {
                let raw = value()?;
                a.seed = raw.parse().map_err(|_| anyhow!("invalid seed {raw:?}: not an integer"))?;
            }
            "-o" | "--output" => a.output = value()?.into(),
            "-b" | "--positions" => a.positions = Some(value()?.into()),
            "-f" | "--filled-pct" => {
                let raw = value()?;
                let pct: u32 = raw.parse().map_err(|_| anyhow!("invalid --filled-pct {raw:?}"))?;
                if pct > 100 {
                    bail!("invalid --filled-pct {pct}, must be between 0-100");
                }
                a.filled_pct = pct;
            }
            other => bail!("unknown option {other:?} (see --help)"),
        }
    }
    if a.positions.as_ref() == Some(&a.output) {
        bail!("the position dataset and the personnel output must be different files");
    }
    Ok(Some(a))
}

fn main() -> Result<()> {
    let Some(args) = parse_args(std::env::args().skip(1))? else {
        print!("{USAGE}");
        return Ok(());
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("info"))
        .with_writer(std::io::stderr)
        .init();

    let mut synth = Synth::new(args.seed)?;
    let people = match &args.positions {
        Some(path) => {
            let positions = torso_data::read_positions_path(path)?;
            if positions.is_empty() {
                bail!("position dataset {} is empty", path.display());
            }
            info!(count = positions.len(), filled_pct = args.filled_pct, "staffing positions");
            let mut people = synth.staff(&positions, args.filled_pct)?;
            people.extend(synth.toward_demand(&positions, args.count.unwrap_or(0))?);
            people
        }
        None => synth.people(args.count.unwrap_or(10))?,
    };
    torso_data::write_people_path(&args.output, &people)?;
    info!(count = people.len(), output = %args.output.display(), seed = args.seed, "personnel written");
    Ok(())
}
