//! Command-line driver for the VM-to-assembly translator.

use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use thiserror::Error;

use hackvm::{Generator, TranslateError, parse};

#[derive(Parser, Debug)]
#[command(
    name = "hackvm",
    version,
    about = "Translate stack VM units into Hack assembly",
    long_about = "Translates one or more VM source files into a single assembly \
program. Files are translated in the order given; the order matters, because \
all files share one physical static segment. The generated preamble calls the \
entry function, which must be defined in one of the inputs."
)]
struct Cli {
    /// VM source files, translated in the given order.
    #[arg(required = true, value_name = "FILE")]
    inputs: Vec<PathBuf>,

    /// Output assembly file.
    #[arg(short, long, value_name = "FILE")]
    output: PathBuf,

    /// Entry function called by the boot preamble.
    #[arg(long, default_value = "Main.main", value_name = "FUNCTION")]
    entry: String,

    /// Per-unit translation arena capacity in bytes.
    #[arg(long, value_name = "BYTES")]
    arena_size: Option<usize>,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("failed reading {path}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("failed creating {path}")]
    Create {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("input {0} has no usable file name")]
    BadStem(String),
    #[error(transparent)]
    Translate(#[from] TranslateError),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            let mut cause = std::error::Error::source(&err);
            while let Some(err) = cause {
                eprintln!("  caused by: {err}");
                cause = err.source();
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), CliError> {
    // Read everything up front; command sequences borrow the source text
    // for the whole session.
    let mut units = Vec::with_capacity(cli.inputs.len());
    for path in &cli.inputs {
        let display = path.display().to_string();
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .map(str::to_owned)
            .ok_or_else(|| CliError::BadStem(display.clone()))?;
        let text = fs::read_to_string(path).map_err(|source| CliError::Read {
            path: display,
            source,
        })?;
        units.push((name, text));
    }

    let output = File::create(&cli.output).map_err(|source| CliError::Create {
        path: cli.output.display().to_string(),
        source,
    })?;

    let mut generator = match cli.arena_size {
        Some(capacity) => Generator::with_arena_capacity(BufWriter::new(output), capacity),
        None => Generator::new(BufWriter::new(output)),
    };
    generator
        .emit_preamble(&cli.entry)
        .map_err(TranslateError::Gen)?;

    for (name, text) in &units {
        let commands = parse(text).map_err(|errors| TranslateError::Parse {
            file: name.clone(),
            errors,
        })?;
        generator.generate(&commands, name).map_err(TranslateError::Gen)?;
    }
    generator.finish().map_err(TranslateError::Gen)?;
    Ok(())
}
