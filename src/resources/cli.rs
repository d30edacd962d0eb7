use bevy::prelude::*;
use std::path::PathBuf;

/// Command-line arguments parsed at startup by the headless demo.
#[derive(Debug, Default, Clone)]
pub struct CliArgs {
    /// Config file overriding the user config directory.
    /// Usage: `cargo run -- --config <path>`
    pub config: Option<PathBuf>,

    /// Number of fixed ticks to simulate before exiting.
    /// Usage: `cargo run -- --ticks 3600`
    pub ticks: Option<u64>,

    /// Overrides the config's RNG seed.
    /// Usage: `cargo run -- --seed 7`
    pub seed: Option<u64>,
}

impl CliArgs {
    /// Parse the process's command-line arguments.
    pub fn parse() -> Self {
        Self::parse_from(std::env::args().skip(1))
    }

    /// Parse arguments (program name excluded).
    /// Supports:
    /// - `--config <path>`: Load the autopilot config from this file
    /// - `--ticks <n>`: Simulate `n` ticks
    /// - `--seed <n>`: Seed the sector RNG
    pub fn parse_from(args: impl IntoIterator<Item = String>) -> Self {
        let args: Vec<String> = args.into_iter().collect();
        let mut cli = CliArgs::default();

        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                flag @ ("--config" | "--ticks" | "--seed") => {
                    let Some(value) = args.get(i + 1) else {
                        warn!("CLI: {} requires an argument", flag);
                        i += 1;
                        continue;
                    };
                    match flag {
                        "--config" => cli.config = Some(PathBuf::from(value)),
                        "--ticks" => match value.parse() {
                            Ok(n) => cli.ticks = Some(n),
                            Err(_) => warn!("CLI: invalid tick count '{}'", value),
                        },
                        _ => match value.parse() {
                            Ok(n) => cli.seed = Some(n),
                            Err(_) => warn!("CLI: invalid seed '{}'", value),
                        },
                    }
                    i += 2;
                }
                arg => {
                    if arg.starts_with('-') {
                        warn!("CLI: Unknown argument '{}'", arg);
                    }
                    i += 1;
                }
            }
        }

        cli
    }
}
