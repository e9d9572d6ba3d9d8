//! `pio-monitor`: interactive shell over the PIO emulator.

use std::env;
use std::ffi::OsString;
use std::io::{self, BufRead, Write};

use log as _;
use pio_core::EmulatorConfig;
use pio_monitor::{Monitor, Outcome};
#[cfg(test)]
use tempfile as _;
use thiserror as _;

const USAGE_TEXT: &str = "\
Usage: pio-monitor [--trace] [--poll-us <microseconds>]

Reads one command per line from standard input; `help` lists them.

Options:
  --trace              log every executed instruction (with RUST_LOG=trace)
  --poll-us <n>        maximum sleep between re-checks while waiting
  -h, --help           show this help";

#[derive(Debug, PartialEq, Eq)]
enum ParseResult {
    Run(EmulatorConfig),
    Help,
}

fn parse_args(mut args: impl Iterator<Item = OsString>) -> Result<ParseResult, String> {
    let mut config = EmulatorConfig::default();
    while let Some(arg) = args.next() {
        match arg.to_str() {
            Some("-h" | "--help") => return Ok(ParseResult::Help),
            Some("--trace") => config.trace_instructions = true,
            Some("--poll-us") => {
                let value = args
                    .next()
                    .ok_or_else(|| "--poll-us needs a value".to_string())?;
                let text = value.to_string_lossy();
                config.wait_poll_interval_us = text
                    .parse()
                    .map_err(|_| format!("invalid --poll-us value `{text}`"))?;
            }
            _ => return Err(format!("unknown option `{}`", arg.to_string_lossy())),
        }
    }
    Ok(ParseResult::Run(config))
}

fn run(config: EmulatorConfig) -> Result<(), i32> {
    let monitor = Monitor::new(config);
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut lines = stdin.lock().lines();
    loop {
        print!("pio> ");
        if stdout.flush().is_err() {
            return Err(1);
        }
        let line = match lines.next() {
            Some(Ok(line)) => line,
            Some(Err(e)) => {
                eprintln!("error: {e}");
                return Err(1);
            }
            None => return Ok(()),
        };
        match monitor.execute_line(&line) {
            Ok(Outcome::Print(text)) => println!("{text}"),
            Ok(Outcome::Done) => {}
            Ok(Outcome::Quit) => return Ok(()),
            Err(e) => eprintln!("error: {e}"),
        }
    }
}

fn main() {
    env_logger::init();
    let exit_code = match parse_args(env::args_os().skip(1)) {
        Ok(ParseResult::Help) => {
            println!("{USAGE_TEXT}");
            0
        }
        Ok(ParseResult::Run(config)) => match run(config) {
            Ok(()) => 0,
            Err(code) => code,
        },
        Err(error) => {
            eprintln!("error: {error}");
            eprintln!("{USAGE_TEXT}");
            1
        }
    };

    std::process::exit(exit_code);
}
