//! Per-category translation of VM commands into mnemonic sequences.
//!
//! One routine per command category, all with the same contract: consume
//! one command, append its mnemonics to the caller's buffer, synthesize
//! any label text into the arena. A routine handed a command outside its
//! category fails with [`GenError::InvalidOperation`] without touching
//! the buffer or the arena.
//!
//! The stack convention throughout: the stack pointer register holds the
//! address of the current top-of-stack cell, so a push increments first
//! and a pop reads before decrementing.

use std::fmt::Write as _;

use hackvm_core::{ArenaStr, Command, Segment, StackArena, mem};

use crate::asm::{Comp, Dest, Jump, Mnemonic};
use crate::error::GenError;

/// Session-owned label counters.
///
/// The comparison counter is global to a session so resume labels stay
/// unique across every unit; it refuses to wrap. The call-site counter
/// restarts at each function definition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LabelCounters {
    comparisons: u16,
    call_sites: u16,
}

impl LabelCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Synthesize the unique resume label for one comparison site:
    /// `<filename>.op.<hex counter>`.
    fn comparison_label(
        &mut self,
        arena: &mut StackArena,
        filename: &str,
    ) -> Result<ArenaStr, GenError> {
        if self.comparisons == u16::MAX {
            return Err(GenError::CounterOverflow);
        }
        let ordinal = self.comparisons;
        self.comparisons += 1;

        let mut w = arena.writer();
        let _ = write!(w, "{filename}.op.{ordinal:x}");
        Ok(w.finish()?)
    }

    /// Ordinal of the next call site within the current function.
    pub fn next_call_site(&mut self) -> u16 {
        let ordinal = self.call_sites;
        self.call_sites = self.call_sites.wrapping_add(1);
        ordinal
    }

    /// Restart call-site numbering; called at each function definition.
    pub fn reset_call_sites(&mut self) {
        self.call_sites = 0;
    }
}

/// Per-unit static-segment layout.
///
/// Units share one physical static segment; each unit's indices are
/// offset by the slot count of every unit generated before it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StaticLayout {
    base: u32,
    count: u32,
}

impl StaticLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the base past the previous unit's statics.
    pub fn begin_unit(&mut self) {
        self.base += self.count;
        self.count = 0;
    }

    /// Offset applied to the current unit's static indices.
    pub fn base(&self) -> u32 {
        self.base
    }

    /// Static slots used by the current unit so far.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Absolute address of a static slot, recording the unit's slot
    /// count as it grows.
    fn address(&mut self, index: u16) -> u16 {
        self.count = self.count.max(u32::from(index) + 1);
        (u32::from(mem::STATIC_BASE) + u32::from(index) + self.base) as u16
    }
}

/// Translate an arithmetic, bitwise or comparison command.
pub fn translate_logical<'a>(
    arena: &mut StackArena,
    command: &Command<'a>,
    filename: &str,
    counters: &mut LabelCounters,
    out: &mut Vec<Mnemonic<'a>>,
) -> Result<(), GenError> {
    match *command {
        Command::Neg => unary(Comp::NegM, out),
        Command::Not => unary(Comp::NotM, out),
        Command::Add => binary(Comp::DPlusM, out),
        Command::Sub => binary(Comp::DMinusM, out),
        Command::And => binary(Comp::DAndM, out),
        Command::Or => binary(Comp::DOrM, out),
        Command::Lt => comparison(Jump::Jlt, arena, filename, counters, out)?,
        Command::Gt => comparison(Jump::Jgt, arena, filename, counters, out)?,
        Command::Eq => comparison(Jump::Jeq, arena, filename, counters, out)?,
        _ => {
            return Err(GenError::InvalidOperation {
                keyword: command.keyword(),
                category: "logical",
            });
        }
    }
    Ok(())
}

/// Operate on the top-of-stack cell in place.
fn unary(op: Comp, out: &mut Vec<Mnemonic<'_>>) {
    out.extend([
        Mnemonic::at(mem::SP),
        Mnemonic::compute(Dest::A, Comp::M),
        Mnemonic::compute(Dest::M, op),
    ]);
}

/// Pull the top into D, drop the stack pointer onto the second operand,
/// combine in place.
fn binary(op: Comp, out: &mut Vec<Mnemonic<'_>>) {
    out.extend([
        Mnemonic::at(mem::SP),
        Mnemonic::compute(Dest::A, Comp::M),
        Mnemonic::compute(Dest::D, Comp::M),
        Mnemonic::at(mem::SP),
        Mnemonic::compute(Dest::AM, Comp::MMinusOne),
        Mnemonic::compute(Dest::M, op),
    ]);
}

/// Compute (top − second) into the new top cell and branch to the shared
/// boolean routines, which overwrite that cell and resume at a unique
/// label defined here.
fn comparison(
    condition: Jump,
    arena: &mut StackArena,
    filename: &str,
    counters: &mut LabelCounters,
    out: &mut Vec<Mnemonic<'_>>,
) -> Result<(), GenError> {
    let resume = counters.comparison_label(arena, filename)?;
    out.extend([
        // The resume address must be parked in R13 before the difference
        // lands in D.
        Mnemonic::at(resume),
        Mnemonic::compute(Dest::D, Comp::A),
        Mnemonic::at(mem::R13),
        Mnemonic::compute(Dest::M, Comp::D),
        Mnemonic::at(mem::SP),
        Mnemonic::compute(Dest::A, Comp::M),
        Mnemonic::compute(Dest::D, Comp::M),
        Mnemonic::at(mem::SP),
        Mnemonic::compute(Dest::AM, Comp::MMinusOne),
        Mnemonic::compute(Dest::MD, Comp::DMinusM),
        Mnemonic::at(mem::RT_TRUE),
        Mnemonic::jump(Comp::D, condition),
        Mnemonic::at(mem::RT_FALSE),
        Mnemonic::jump(Comp::Zero, Jump::Jmp),
        Mnemonic::label(resume),
    ]);
    Ok(())
}

/// Translate a push command.
pub fn translate_push<'a>(
    command: &Command<'a>,
    statics: &mut StaticLayout,
    out: &mut Vec<Mnemonic<'a>>,
) -> Result<(), GenError> {
    let Command::Push { segment, index } = *command else {
        return Err(GenError::InvalidOperation {
            keyword: command.keyword(),
            category: "push",
        });
    };

    match segment {
        Segment::Argument => out.push(Mnemonic::at(mem::ARG)),
        Segment::Local => out.push(Mnemonic::at(mem::LCL)),
        Segment::This => out.push(Mnemonic::at(mem::THIS)),
        Segment::That => out.push(Mnemonic::at(mem::THAT)),
        Segment::Pointer => out.extend([
            Mnemonic::at(if index == 0 { mem::THIS } else { mem::THAT }),
            Mnemonic::compute(Dest::D, Comp::M),
        ]),
        Segment::Constant => out.extend([
            Mnemonic::at_number(index),
            Mnemonic::compute(Dest::D, Comp::A),
        ]),
        Segment::Static => out.extend([
            Mnemonic::at_number(statics.address(index)),
            Mnemonic::compute(Dest::D, Comp::M),
        ]),
        Segment::Temp => out.extend([
            Mnemonic::at_number(mem::TEMP_BASE + index),
            Mnemonic::compute(Dest::D, Comp::M),
        ]),
    }

    // The four indirect segments share the dereference-through-base tail.
    if segment.base_register().is_some() {
        if index == 0 {
            out.extend([
                Mnemonic::compute(Dest::A, Comp::M),
                Mnemonic::compute(Dest::D, Comp::M),
            ]);
        } else {
            out.extend([
                Mnemonic::compute(Dest::D, Comp::M),
                Mnemonic::at_number(index),
                Mnemonic::compute(Dest::A, Comp::DPlusA),
                Mnemonic::compute(Dest::D, Comp::M),
            ]);
        }
    }

    // Advance the stack pointer and store the value at the new top.
    out.extend([
        Mnemonic::at(mem::SP),
        Mnemonic::compute(Dest::AM, Comp::MPlusOne),
        Mnemonic::compute(Dest::M, Comp::D),
    ]);
    Ok(())
}

/// Translate a pop command.
pub fn translate_pop<'a>(
    command: &Command<'a>,
    statics: &mut StaticLayout,
    out: &mut Vec<Mnemonic<'a>>,
) -> Result<(), GenError> {
    let Command::Pop { segment, index } = *command else {
        return Err(GenError::InvalidOperation {
            keyword: command.keyword(),
            category: "pop",
        });
    };
    if segment == Segment::Constant {
        return Err(GenError::InvalidSegment {
            segment: segment.keyword(),
            operation: command.keyword(),
        });
    }

    // Read the top into D, then drop the stack pointer.
    out.extend([
        Mnemonic::at(mem::SP),
        Mnemonic::compute(Dest::A, Comp::M),
        Mnemonic::compute(Dest::D, Comp::M),
        Mnemonic::at(mem::SP),
        Mnemonic::compute(Dest::M, Comp::MMinusOne),
    ]);

    let indirect = segment.base_register().is_some();

    // When the destination address itself must be computed, the popped
    // value has to survive the address arithmetic; stage it in R13.
    if indirect && index > 1 {
        out.extend([Mnemonic::at(mem::R13), Mnemonic::compute(Dest::M, Comp::D)]);
    }

    match segment {
        Segment::Argument => out.push(Mnemonic::at(mem::ARG)),
        Segment::Local => out.push(Mnemonic::at(mem::LCL)),
        Segment::This => out.push(Mnemonic::at(mem::THIS)),
        Segment::That => out.push(Mnemonic::at(mem::THAT)),
        Segment::Pointer => {
            out.push(Mnemonic::at(if index == 0 { mem::THIS } else { mem::THAT }))
        }
        Segment::Temp => out.push(Mnemonic::at_number(mem::TEMP_BASE + index)),
        Segment::Static => out.push(Mnemonic::at_number(statics.address(index))),
        Segment::Constant => unreachable!(),
    }

    if indirect && index == 1 {
        out.extend([
            Mnemonic::compute(Dest::A, Comp::MPlusOne),
            Mnemonic::compute(Dest::M, Comp::D),
        ]);
    } else if indirect && index > 1 {
        out.extend([
            // Destination address into R14, then recover the value.
            Mnemonic::compute(Dest::D, Comp::M),
            Mnemonic::at_number(index),
            Mnemonic::compute(Dest::D, Comp::DPlusA),
            Mnemonic::at(mem::R14),
            Mnemonic::compute(Dest::M, Comp::D),
            Mnemonic::at(mem::R13),
            Mnemonic::compute(Dest::D, Comp::M),
            Mnemonic::at(mem::R14),
            Mnemonic::compute(Dest::A, Comp::M),
            Mnemonic::compute(Dest::M, Comp::D),
        ]);
    } else if indirect {
        out.extend([
            Mnemonic::compute(Dest::A, Comp::M),
            Mnemonic::compute(Dest::M, Comp::D),
        ]);
    } else {
        // Pointer, temp and static destinations are already in A.
        out.push(Mnemonic::compute(Dest::M, Comp::D));
    }
    Ok(())
}

/// Translate a flow-control command.
///
/// `call_site` is the ordinal of this call within the enclosing function;
/// it is ignored for every operation other than `call`.
pub fn translate_flow<'a>(
    arena: &mut StackArena,
    command: &Command<'a>,
    filename: &str,
    call_site: u16,
    out: &mut Vec<Mnemonic<'a>>,
) -> Result<(), GenError> {
    match *command {
        Command::Label(name) => out.push(Mnemonic::label(name)),
        Command::Goto(name) => out.extend([
            Mnemonic::at(name),
            Mnemonic::jump(Comp::Zero, Jump::Jmp),
        ]),
        Command::IfGoto(name) => out.extend([
            // Drop the stack pointer, read the popped cell one above it,
            // branch on non-zero.
            Mnemonic::at(mem::SP),
            Mnemonic::compute(Dest::MD, Comp::MMinusOne),
            Mnemonic::compute(Dest::A, Comp::DPlusOne),
            Mnemonic::compute(Dest::D, Comp::M),
            Mnemonic::at(name),
            Mnemonic::jump(Comp::D, Jump::Jne),
        ]),
        Command::Function { name, locals } => out.extend([
            Mnemonic::label(name),
            // Local segment starts one above the current top; the local
            // slots are reserved by arithmetic alone, their cells are
            // always written before being read.
            Mnemonic::at(mem::SP),
            Mnemonic::compute(Dest::D, Comp::M),
            Mnemonic::at(mem::LCL),
            Mnemonic::compute(Dest::M, Comp::DPlusOne),
            Mnemonic::at_number(locals),
            Mnemonic::compute(Dest::D, Comp::DPlusA),
            Mnemonic::at(mem::SP),
            Mnemonic::compute(Dest::M, Comp::D),
        ]),
        Command::Call { function, args } => {
            let resume = return_label(arena, filename, function, call_site)?;
            out.extend([
                // Save the caller's ARG above the arguments.
                Mnemonic::at(mem::ARG),
                Mnemonic::compute(Dest::D, Comp::M),
                Mnemonic::at(mem::SP),
                Mnemonic::compute(Dest::AM, Comp::MPlusOne),
                Mnemonic::compute(Dest::M, Comp::D),
                // New ARG sits args + 3 below the top the frame will
                // reach once its three saved words are in place.
                Mnemonic::at_number(args),
                Mnemonic::compute(Dest::D, Comp::APlusOne),
                Mnemonic::at(mem::SP),
                Mnemonic::compute(Dest::D, Comp::MMinusD),
                Mnemonic::at(mem::ARG),
                Mnemonic::compute(Dest::M, Comp::D),
                // Save the caller's LCL.
                Mnemonic::at(mem::LCL),
                Mnemonic::compute(Dest::D, Comp::M),
                Mnemonic::at(mem::SP),
                Mnemonic::compute(Dest::AM, Comp::MPlusOne),
                Mnemonic::compute(Dest::M, Comp::D),
                // Push the return address and transfer.
                Mnemonic::at(resume),
                Mnemonic::compute(Dest::D, Comp::A),
                Mnemonic::at(mem::SP),
                Mnemonic::compute(Dest::AM, Comp::MPlusOne),
                Mnemonic::compute(Dest::M, Comp::D),
                Mnemonic::at(function),
                Mnemonic::jump(Comp::Zero, Jump::Jmp),
                Mnemonic::label(resume),
            ]);
        }
        Command::Return => out.extend([
            // Capture the return value from the top of the stack.
            Mnemonic::at(mem::SP),
            Mnemonic::compute(Dest::A, Comp::M),
            Mnemonic::compute(Dest::D, Comp::M),
            Mnemonic::at(mem::R13),
            Mnemonic::compute(Dest::M, Comp::D),
            // The return address sits one below the local segment.
            Mnemonic::at(mem::LCL),
            Mnemonic::compute(Dest::D, Comp::MMinusOne),
            Mnemonic::at(mem::SP),
            Mnemonic::compute(Dest::AM, Comp::D),
            Mnemonic::compute(Dest::D, Comp::M),
            Mnemonic::at(mem::R14),
            Mnemonic::compute(Dest::M, Comp::D),
            // Restore the caller's LCL, stage the caller's ARG.
            Mnemonic::at(mem::SP),
            Mnemonic::compute(Dest::AM, Comp::MMinusOne),
            Mnemonic::compute(Dest::D, Comp::M),
            Mnemonic::at(mem::LCL),
            Mnemonic::compute(Dest::M, Comp::D),
            Mnemonic::at(mem::SP),
            Mnemonic::compute(Dest::AM, Comp::MMinusOne),
            Mnemonic::compute(Dest::D, Comp::M),
            Mnemonic::at(mem::R15),
            Mnemonic::compute(Dest::M, Comp::D),
            // Drop the frame: the stack pointer lands one below ARG so
            // the pushed return value replaces the caller's arguments.
            Mnemonic::at(mem::ARG),
            Mnemonic::compute(Dest::D, Comp::MMinusOne),
            Mnemonic::at(mem::SP),
            Mnemonic::compute(Dest::M, Comp::D),
            Mnemonic::at(mem::R15),
            Mnemonic::compute(Dest::D, Comp::M),
            Mnemonic::at(mem::ARG),
            Mnemonic::compute(Dest::M, Comp::D),
            // Deliver the return value.
            Mnemonic::at(mem::R13),
            Mnemonic::compute(Dest::D, Comp::M),
            Mnemonic::at(mem::SP),
            Mnemonic::compute(Dest::AM, Comp::MPlusOne),
            Mnemonic::compute(Dest::M, Comp::D),
            // Resume the caller.
            Mnemonic::at(mem::R14),
            Mnemonic::compute(Dest::A, Comp::M),
            Mnemonic::jump(Comp::Zero, Jump::Jmp),
        ]),
        _ => {
            return Err(GenError::InvalidOperation {
                keyword: command.keyword(),
                category: "flow",
            });
        }
    }
    Ok(())
}

/// Return-address label for one call site:
/// `<filename>.<callee>.<hex call-site ordinal>`.
fn return_label(
    arena: &mut StackArena,
    filename: &str,
    function: &str,
    call_site: u16,
) -> Result<ArenaStr, GenError> {
    let mut w = arena.writer();
    let _ = write!(w, "{filename}.{function}.{call_site:x}");
    Ok(w.finish()?)
}
