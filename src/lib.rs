//! A one-pass translator from a stack-based VM instruction set to the
//! assembly language of a simple 16-bit machine.
//!
//! The pipeline: [`parse`] turns VM source text into a command sequence,
//! and a [`Generator`] session turns command sequences into assembly
//! text on an output sink — a boot preamble first, then each unit in
//! caller order. Units share one physical static segment, so the order
//! units are generated in is part of the program's meaning.
//!
//! # Example
//!
//! ```
//! let source = "\
//!     function Main.main 0
//!     push constant 7
//!     push constant 8
//!     add
//!     return
//! ";
//!
//! let sink = hackvm::translate_source(&[("main", source)], "Main.main", Vec::new()).unwrap();
//! let asm = String::from_utf8(sink).unwrap();
//! assert!(asm.starts_with("@256\n"));
//! assert!(asm.contains("(Main.main)\n"));
//! ```

use std::io::Write;

use thiserror::Error;

pub use hackvm_codegen::{Comp, Dest, GenError, Generator, Jump, Label, Mnemonic, render};
pub use hackvm_core::{ArenaExhausted, ArenaStr, Command, Segment, StackArena, mem};
pub use hackvm_parser::{ParseError, ParseErrorKind, ParseErrors, parse};

/// Errors from the parse-and-translate convenience entry points.
#[derive(Debug, Error)]
pub enum TranslateError {
    /// A source unit failed to parse.
    #[error("{file}: {errors}")]
    Parse {
        /// Name of the offending unit.
        file: String,
        /// Everything wrong with it.
        errors: ParseErrors,
    },
    /// Generation failed.
    #[error(transparent)]
    Gen(#[from] GenError),
}

/// Translate already-parsed units, in order, into one assembly stream.
///
/// Emits the boot preamble (calling `entry`), then each `(name, commands)`
/// unit. Returns the sink on success.
pub fn translate_units<W: Write>(
    units: &[(&str, &[Command<'_>])],
    entry: &str,
    sink: W,
) -> Result<W, GenError> {
    let mut generator = Generator::new(sink);
    generator.emit_preamble(entry)?;
    for (name, commands) in units {
        generator.generate(commands, name)?;
    }
    generator.finish()
}

/// Parse and translate source units, in order, into one assembly stream.
pub fn translate_source<W: Write>(
    sources: &[(&str, &str)],
    entry: &str,
    sink: W,
) -> Result<W, TranslateError> {
    let mut generator = Generator::new(sink);
    generator.emit_preamble(entry)?;
    for (name, text) in sources {
        let commands = parse(text).map_err(|errors| TranslateError::Parse {
            file: (*name).to_owned(),
            errors,
        })?;
        generator.generate(&commands, name)?;
    }
    Ok(generator.finish()?)
}
