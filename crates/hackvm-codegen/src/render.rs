//! Serialization of mnemonic sequences to assembly text.
//!
//! Each mnemonic becomes one newline-terminated line appended to the
//! generation arena, so a rendered sequence is a single contiguous block
//! that can be handed to the output sink without further copying. Lines
//! are written under a mark and rolled back on exhaustion; a failed
//! render never leaves a partial line behind.

use std::fmt::Write as _;

use hackvm_core::{ArenaExhausted, ArenaStr, StackArena};

use crate::asm::{Label, Mnemonic};
use crate::error::GenError;

/// Render a mnemonic sequence into the arena.
///
/// Returns the contiguous region holding the rendered text. On failure
/// the arena is restored to its starting position.
pub fn render(mnemonics: &[Mnemonic<'_>], arena: &mut StackArena) -> Result<ArenaStr, GenError> {
    let start = arena.position();
    for mnemonic in mnemonics {
        if let Err(err) = render_line(mnemonic, arena) {
            arena.pop(arena.position() - start);
            return Err(err.into());
        }
    }
    Ok(arena.region_from(start))
}

fn render_line(mnemonic: &Mnemonic<'_>, arena: &mut StackArena) -> Result<(), ArenaExhausted> {
    match *mnemonic {
        Mnemonic::AddressNumber(number) => {
            let mut w = arena.writer();
            let _ = writeln!(w, "@{number}");
            w.finish()?;
        }
        Mnemonic::AddressSymbol(label) => wrap_label(arena, "@", label, "\n")?,
        Mnemonic::Compute { dest, comp } => {
            let mut w = arena.writer();
            let _ = writeln!(w, "{}={}", dest.text(), comp.text());
            w.finish()?;
        }
        Mnemonic::Jump { comp, jump } => {
            let mut w = arena.writer();
            let _ = writeln!(w, "{};{}", comp.text(), jump.text());
            w.finish()?;
        }
        Mnemonic::LabelDef(label) => wrap_label(arena, "(", label, ")\n")?,
    }
    Ok(())
}

/// Write `open`, the label text, then `close`, atomically.
fn wrap_label(
    arena: &mut StackArena,
    open: &str,
    label: Label<'_>,
    close: &str,
) -> Result<(), ArenaExhausted> {
    let mark = arena.position();
    let result: Result<(), ArenaExhausted> = (|| {
        arena.push_bytes(open.as_bytes())?;
        match label {
            Label::Text(text) => arena.push_bytes(text.as_bytes())?,
            // Label text already in the arena is copied onto the top;
            // the source region sits below the current position and
            // stays valid.
            Label::Arena(src) => arena.push_copy_within(src)?,
        };
        arena.push_bytes(close.as_bytes())?;
        Ok(())
    })();
    if result.is_err() {
        arena.pop(arena.position() - mark);
    }
    result
}
