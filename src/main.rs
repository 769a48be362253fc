use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use dime::{codec, query, Config, DicomEntry, QueryError, StoreError};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Parser)]
#[command(name = "dime", version, about = "Store DICOM files and query their attributes")]
struct Cli {
    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Decode DICOM files and add them to the store; `-` reads standard input
    Store {
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },
    /// List stored DICOMs
    List,
    /// Show the identifiers of one stored DICOM
    Show { id: String },
    /// Look up attributes by tag, e.g. --tag "(0010,0010)"
    Attributes {
        id: String,
        #[arg(long = "tag", value_name = "TAG", required = true)]
        tags: Vec<String>,
    },
    /// Write the PNG preview of a stored DICOM
    Image {
        id: String,
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error("failed to write output: {0}")]
    Output(#[from] serde_json::Error),
    #[error("{}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
}

impl CliError {
    fn exit_code(&self) -> ExitCode {
        match self {
            CliError::Store(err) if err.is_not_found() => ExitCode::from(2),
            _ => ExitCode::FAILURE,
        }
    }
}

pub fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env = env_logger::Env::default().default_filter_or(default_level);
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp_secs()
        .try_init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            err.exit_code()
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let store = cli.config.open_store()?;

    match cli.command {
        Command::Store { files } => {
            let mut saved = Vec::with_capacity(files.len());
            for path in files {
                let object = if path.as_os_str() == "-" {
                    log::info!("Loading DICOM from standard input");
                    codec::read_stream(io::stdin().lock(), "<stdin>")?
                } else {
                    log::info!("Loading DICOM file: {}", path.display());
                    codec::open(&path)?
                };
                let entry = DicomEntry::from_object(object).map_err(StoreError::from)?;
                let id = entry.id().to_string();
                store.create(entry)?;
                saved.push(store.read(&id)?);
            }
            print_json(&saved)
        }
        Command::List => print_json(&store.list()?),
        Command::Show { id } => print_json(&store.read(&id)?),
        Command::Attributes { id, tags } => {
            let entry = store.read(&id)?;
            print_json(&query::resolve(&entry, tags.as_slice())?)
        }
        Command::Image { id, output } => {
            let png = store.get_image(&id)?;
            std::fs::write(&output, png).map_err(|source| CliError::Io {
                path: output.clone(),
                source,
            })?;
            log::info!("Wrote preview of {id} to {}", output.display());
            Ok(())
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout).map_err(|source| CliError::Io {
        path: PathBuf::from("<stdout>"),
        source,
    })
}
