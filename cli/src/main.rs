use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing::{event, Level};
use tracing_subscriber::prelude::*;

use cpu::{CpuModel, Machine, MachineConfig, MemoryConfiguration, StopReason};

mod image;
mod report;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Model {
    /// KA10: protection/relocation registers, single precision
    /// floating point, up to 256K words.
    Ka,
    /// KI10: pager, doubleword instructions, up to 4096K words.
    Ki,
}

impl From<Model> for CpuModel {
    fn from(model: Model) -> CpuModel {
        match model {
            Model::Ka => CpuModel::Ka,
            Model::Ki => CpuModel::Ki,
        }
    }
}

fn octal(s: &str) -> Result<u64, String> {
    u64::from_str_radix(s, 8).map_err(|e| format!("{s} is not an octal number: {e}"))
}

#[derive(Debug, Parser)]
#[command(name = "pdp10", about = "Simulate the DEC PDP-10 processors")]
struct Args {
    /// Processor model to simulate
    #[arg(long, value_enum, default_value_t = Model::Ka)]
    model: Model,

    /// Memory size in units of 1024 words, in 16K steps
    #[arg(long, default_value_t = 256)]
    memory: u64,

    /// Keep the last N instructions and list them in the run report
    #[arg(long, default_value_t = 0)]
    history: usize,

    /// Give up after this many instructions
    #[arg(long, default_value_t = 10_000_000)]
    max_steps: u64,

    /// Octal start address; defaults to the first address in the image
    #[arg(long, value_parser = octal)]
    start: Option<u64>,

    /// Memory image file: octal "address value" pairs, one per line,
    /// with `;` comments
    image: PathBuf,
}

fn run_simulator() -> Result<i32, Box<dyn std::error::Error>> {
    let args = Args::parse();

    // See
    // https://docs.rs/tracing-subscriber/latest/tracing_subscriber/fmt/index.html#filtering-events-with-environment-variables
    // for instructions on how to select which trace messages get
    // printed.
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);
    let filter_layer = match tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("info"))
    {
        Err(e) => {
            return Err(Box::new(e));
        }
        Ok(layer) => layer,
    };

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();

    let config = MachineConfig {
        model: args.model.into(),
        memory: MemoryConfiguration {
            k_words: args.memory,
        },
        history_size: args.history,
        two_segment: true,
    };
    let mut machine = Machine::new(&config)?;

    let words = image::load_file(&args.image)?;
    let start = match args.start.or_else(|| words.first().map(|w| w.0)) {
        Some(addr) => addr,
        None => {
            return Err(Box::from(format!(
                "{} holds no words and no --start was given",
                args.image.display()
            )));
        }
    };
    for (addr, value) in &words {
        machine.deposit(*addr, *value)?;
    }
    event!(
        Level::INFO,
        "loaded {} words from {}, starting at {:06o}",
        words.len(),
        args.image.display(),
        start
    );

    machine.set_pc(start);
    let stop = machine.run(args.max_steps);
    report::print(&machine, &stop)?;

    Ok(match stop {
        StopReason::Halted { .. } => 0,
        _ => 2,
    })
}

fn main() {
    match run_simulator() {
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
        Ok(code) => {
            std::process::exit(code);
        }
    }
}
