//! The end-of-run report: stop reason, registers, flags and the
//! instruction history, colored when stdout is a terminal.
use std::io::{self, Write};

use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use cpu::flags;
use cpu::{HistoryEntry, Machine, StopReason};

fn get_colour_choice() -> ColorChoice {
    if atty::is(atty::Stream::Stdout) {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    }
}

fn stop_colour(stop: &StopReason) -> Color {
    match stop {
        StopReason::Halted { .. } => Color::Green,
        StopReason::Breakpoint { .. } => Color::Yellow,
        StopReason::StepLimit { .. } => Color::Red,
    }
}

pub fn print(machine: &Machine, stop: &StopReason) -> io::Result<()> {
    let mut out = StandardStream::stdout(get_colour_choice());

    out.set_color(ColorSpec::new().set_fg(Some(stop_colour(stop))).set_bold(true))?;
    write!(out, "{stop}")?;
    out.reset()?;
    writeln!(out, "  PC={:06o}", machine.pc())?;

    // Accumulators, four per line.
    for row in 0..4 {
        for col in 0..4 {
            let ac = row * 4 + col;
            let value = machine.examine(ac).unwrap_or(0);
            write!(out, "{ac:2o}: {value:012o}   ")?;
        }
        writeln!(out)?;
    }

    let f = machine.flags();
    if f.is_clear() {
        writeln!(out, "flags: none")?;
    } else {
        writeln!(out, "flags: {}", flags::describe(f.bits()))?;
    }

    let history = machine.history();
    if history.is_enabled() && !history.is_empty() {
        writeln!(out)?;
        writeln!(out, "{}", HistoryEntry::HEADER)?;
        for entry in history.iter() {
            writeln!(out, "{}", entry.listing())?;
        }
    }
    Ok(())
}
