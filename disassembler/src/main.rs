mod listing;
mod trace;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser as ClapParser, Subcommand};
use rsaga_script::{EntryPoint, VmConfig};

use crate::listing::Disassembler;
use crate::trace::TraceOptions;

/// Inspect and trace rsaga script bytecode
#[derive(ClapParser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a YAML listing of a raw bytecode file.
    Disasm {
        #[arg(short, long, required = true)]
        input: PathBuf,

        /// Listing path; stdout when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Entry point as `OFFSET[:NAME]`, offset in decimal or 0x-prefixed hex.
        #[arg(short, long = "entry", value_parser = parse_entry)]
        entries: Vec<EntryPoint>,
    },

    /// Run one entry point with a logging host and print the final thread state.
    Trace {
        #[arg(short, long, required = true)]
        input: PathBuf,

        #[arg(short, long = "entry", value_parser = parse_entry)]
        entries: Vec<EntryPoint>,

        /// Index of the entry point to run.
        #[arg(short, long, default_value_t = 0)]
        run: usize,

        #[arg(long, default_value_t = 100)]
        ticks: u32,

        #[arg(long, default_value_t = 16)]
        delta_ms: u32,

        /// VM configuration (JSON).
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Execute one instruction per tick and log each one.
        #[arg(long)]
        step: bool,
    },
}

fn parse_entry(s: &str) -> Result<EntryPoint, String> {
    let (offset, name) = match s.split_once(':') {
        Some((offset, name)) => (offset, Some(name)),
        None => (s, None),
    };
    let offset = match offset.strip_prefix("0x").or_else(|| offset.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => offset.parse::<u16>(),
    }
    .map_err(|e| format!("bad entry offset {:?}: {}", offset, e))?;
    let name = name
        .map(str::to_string)
        .unwrap_or_else(|| format!("ep_{offset:04X}"));
    Ok(EntryPoint { name, offset })
}

fn with_default_entry(entries: Vec<EntryPoint>) -> Vec<EntryPoint> {
    if entries.is_empty() {
        vec![EntryPoint {
            name: "main".to_string(),
            offset: 0,
        }]
    } else {
        entries
    }
}

fn main() -> Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
    let args = Args::parse();

    match args.command {
        Command::Disasm {
            input,
            output,
            entries,
        } => {
            let mut disassembler = Disassembler::open(input, entries)?;
            disassembler.disassemble()?;
            match output {
                Some(path) => disassembler.write_insts(path)?,
                None => print!("{}", disassembler.to_yaml()?),
            }
        }
        Command::Trace {
            input,
            entries,
            run,
            ticks,
            delta_ms,
            config,
            step,
        } => {
            let config = match config {
                Some(path) => VmConfig::load(path)?,
                None => VmConfig::default(),
            }
            .with_env_overrides();
            let code = std::fs::read(&input).with_context(|| format!("read {:?}", input))?;
            let opts = TraceOptions {
                entry: run,
                ticks,
                delta_ms,
                single_step: step,
                config,
            };
            let report = trace::run(code, with_default_entry(entries), &opts)?;
            print!("{}", serde_yaml::to_string(&report)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn entry_argument_forms() {
        assert_eq!(
            parse_entry("0x1A:intro").unwrap(),
            EntryPoint {
                name: "intro".into(),
                offset: 0x1A
            }
        );
        assert_eq!(parse_entry("12").unwrap().name, "ep_000C");
        assert!(parse_entry("0xZZ").is_err());
        assert!(parse_entry("70000").is_err());
    }

    #[test]
    fn cli_parses_trace() {
        let args = Args::try_parse_from([
            "disassembler",
            "trace",
            "-i",
            "script.bin",
            "-e",
            "0",
            "-e",
            "0x10:talk",
            "--run",
            "1",
            "--step",
        ])
        .unwrap();
        match args.command {
            Command::Trace {
                entries, run, step, ..
            } => {
                assert_eq!(entries.len(), 2);
                assert_eq!(run, 1);
                assert!(step);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
