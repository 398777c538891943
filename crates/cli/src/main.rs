//! `fieldcrypt` operator binary entry point.
//!
//! Startup sequence:
//! 1. Parse arguments. `generate-key` runs here and needs no configuration.
//! 2. Load and validate [`Config`] from environment variables.
//! 3. Initialise the tracing subscriber.
//! 4. Resolve [`KeyMaterial`] and build the [`FieldCodec`].
//! 5. Dispatch the subcommand.
//!
//! Exit codes: 0 on success, 78 for configuration errors, 65 for decryption
//! errors in strict mode, 1 otherwise.

mod cli;
mod commands;
mod telemetry;

use std::fs;
use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use common::protocol::SealManifest;
use common::FieldError;
use fieldcrypt::{Config, FieldCodec, KeyMaterial, RecordFields};
use tracing::{error, info};

use cli::{Cli, Command};

const EXIT_CONFIG: u8 = 78;
const EXIT_FAILURE: u8 = 1;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Command::GenerateKey = cli.command {
        return match commands::generate_key(&mut io::stdout().lock()) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("ERROR: {e:#}");
                ExitCode::from(EXIT_FAILURE)
            }
        };
    }

    // -----------------------------------------------------------------------
    // Configuration
    // -----------------------------------------------------------------------
    let cfg = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            // Telemetry is not yet up; write to stderr directly.
            eprintln!("ERROR: configuration invalid: {e:#}");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    // -----------------------------------------------------------------------
    // Telemetry
    // -----------------------------------------------------------------------
    if let Err(e) = telemetry::init_telemetry(&cfg.log_level) {
        eprintln!("ERROR: {e:#}");
        return ExitCode::from(EXIT_FAILURE);
    }

    match run(cli.command, &cfg) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let message = format!("{e:#}");
            error!(error = %message, "command failed");
            ExitCode::from(exit_code(&e))
        }
    }
}

fn run(command: Command, cfg: &Config) -> Result<()> {
    let keys = KeyMaterial::from_config(cfg).map_err(FieldError::from)?;
    let codec = FieldCodec::new(&keys).map_err(FieldError::from)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match command {
        Command::GenerateKey => commands::generate_key(&mut out)?,
        Command::Seal { field, value } => {
            commands::seal(&codec, &field.to_spec(), &value, &mut out)?;
        }
        Command::Open { field, strict, stored } => {
            commands::open(&codec, &field.to_spec(), &stored, strict, &mut out)?;
        }
        Command::Hash { value } => commands::hash(&codec, &value, &mut out)?,
        Command::Batch { manifest, mode } => {
            let raw = fs::read_to_string(&manifest)
                .with_context(|| format!("failed to read manifest {}", manifest.display()))?;
            let manifest: SealManifest =
                serde_json::from_str(&raw).context("failed to parse manifest")?;
            let fields = RecordFields::from_manifest(&manifest);
            info!(fields = fields.len(), mode = ?mode, "batch started");

            let summary = commands::batch(&codec, &fields, mode, io::stdin().lock(), &mut out)?;
            info!(
                summary = %serde_json::to_string(&summary)?,
                records = summary.records,
                fields = summary.fields,
                "batch finished"
            );
        }
    }

    out.flush()?;
    Ok(())
}

fn exit_code(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<FieldError>()
        .map_or(EXIT_FAILURE, FieldError::exit_code)
}
