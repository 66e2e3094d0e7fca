#![deny(warnings)]

//! Writes a synthetic position dataset for the TORSO driver.

use anyhow::{anyhow, bail, Result};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use torso_data::Synth;

const USAGE: &str = "\
gen-positions: generate a synthetic position (billet) dataset

USAGE:
    gen-positions [OPTIONS]

OPTIONS:
    -c, --count <N>      Number of positions [default: 10]
    -s, --seed <N>       Random seed [default: 19920813]
    -o, --output <FILE>  Output file [default: positions.csv]
    -h, --help           Print this help
";

#[derive(Debug, PartialEq)]
struct Args {
    count: usize,
    seed: u64,
    output: PathBuf,
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<Option<Args>> {
    let mut a = Args {
        count: 10,
        seed: 19920813,
        output: PathBuf::from("positions.csv"),
    };
    let mut it = args.into_iter();
    while let Some(arg) = it.next() {
        let mut value = || it.next().ok_or_else(|| anyhow!("{arg} needs a value"));
        match arg.as_str() {
            "-h" | "--help" => return Ok(None),
            "-c" | "--count" => {
                let raw = value()?;
                a.count = raw.parse().map_err(|_| anyhow!("invalid count {raw:?}"))?;
            }
            "-s" | "--seed" => {
                let raw = value()?;
                a.seed = raw.parse().map_err(|_| anyhow!("invalid seed {raw:?}: not an integer"))?;
            }
            "-o" | "--output" => a.output = value()?.into(),
            other => bail!("unknown option {other:?} (see --help)"),
        }
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

    let positions = Synth::new(args.seed)?.positions(args.count)?;
    torso_data::write_positions_path(&args.output, &positions)?;
    info!(count = positions.len(), output = %args.output.display(), seed = args.seed, "positions written");
    Ok(())
}
