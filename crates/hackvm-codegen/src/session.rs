//! The generation session.
//!
//! A [`Generator`] owns the output sink and all cross-command state: the
//! comparison-label counter, the per-function call-site counter and the
//! static-segment layout carried across units. Usage is strictly
//! sequential: emit the preamble once, generate each unit in the caller's
//! order (static addressing depends on it), then finish.
//!
//! Output is append-only. Every command's rendered block is written and
//! flushed before the next command is translated; a failure mid-unit
//! leaves the already-flushed prefix in place and poisons the session.

use std::io::Write;

use hackvm_core::{Category, Command, StackArena, mem};

use crate::asm::{Comp, Dest, Jump, Mnemonic};
use crate::error::GenError;
use crate::render::render;
use crate::translate::{
    LabelCounters, StaticLayout, translate_flow, translate_logical, translate_pop, translate_push,
};

/// Arena capacity for translating one unit, reset after every command.
const UNIT_ARENA_CAPACITY: usize = 4096;
/// Arena capacity for the boot preamble.
const PREAMBLE_ARENA_CAPACITY: usize = 1024;
/// Label-qualifying name used for the synthesized boot call.
const PREAMBLE_NAME: &str = "preamble";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Ready,
    Failed,
}

/// Translates command sequences into assembly text on an output sink.
pub struct Generator<W: Write> {
    sink: W,
    state: State,
    counters: LabelCounters,
    statics: StaticLayout,
    arena_capacity: usize,
}

impl<W: Write> Generator<W> {
    /// Create a session writing to `sink`.
    pub fn new(sink: W) -> Self {
        Self::with_arena_capacity(sink, UNIT_ARENA_CAPACITY)
    }

    /// Create a session with an explicit per-unit arena capacity.
    pub fn with_arena_capacity(sink: W, arena_capacity: usize) -> Self {
        Self {
            sink,
            state: State::Idle,
            counters: LabelCounters::new(),
            statics: StaticLayout::new(),
            arena_capacity,
        }
    }

    /// Emit the boot preamble: register setup, a call to `entry`, the
    /// halt spin, and the shared boolean routines referenced by every
    /// comparison site.
    ///
    /// Must be called exactly once, before any unit.
    ///
    /// # Panics
    ///
    /// Panics if the preamble was already emitted or the session failed.
    pub fn emit_preamble(&mut self, entry: &str) -> Result<(), GenError> {
        assert!(
            self.state == State::Idle,
            "the preamble is emitted exactly once, before any unit"
        );
        match self.preamble(entry) {
            Ok(()) => {
                self.state = State::Ready;
                Ok(())
            }
            Err(err) => {
                self.state = State::Failed;
                Err(err)
            }
        }
    }

    /// Generate one unit's commands in order, appending to the sink.
    ///
    /// `filename` qualifies every synthesized label of the unit. Units
    /// must be generated in a fixed caller-determined order: each unit's
    /// static indices are offset by the slot counts of the units before
    /// it.
    ///
    /// # Panics
    ///
    /// Panics if the preamble has not been emitted, if the session has
    /// failed, or if `commands` does not start with a function
    /// definition — the parser never produces such a unit.
    pub fn generate(&mut self, commands: &[Command<'_>], filename: &str) -> Result<(), GenError> {
        assert!(
            self.state == State::Ready,
            "units are generated after the preamble, on a healthy session"
        );
        assert!(
            matches!(commands.first(), Some(Command::Function { .. })),
            "a unit is non-empty and starts with a function definition"
        );
        match self.unit(commands, filename) {
            Ok(()) => Ok(()),
            Err(err) => {
                self.state = State::Failed;
                Err(err)
            }
        }
    }

    /// Flush and return the sink.
    ///
    /// # Panics
    ///
    /// Panics if the session failed or never emitted its preamble.
    pub fn finish(mut self) -> Result<W, GenError> {
        assert!(
            self.state == State::Ready,
            "only a healthy session can be finished"
        );
        self.sink.flush()?;
        Ok(self.sink)
    }

    fn preamble(&mut self, entry: &str) -> Result<(), GenError> {
        let mut arena = StackArena::with_capacity(PREAMBLE_ARENA_CAPACITY);
        let mut buf: Vec<Mnemonic<'_>> = Vec::with_capacity(24);

        // Seat SP, ARG and LCL at the stack base and the object base
        // registers at the scratch origin.
        buf.extend([
            Mnemonic::at_number(mem::STACK_BASE),
            Mnemonic::compute(Dest::D, Comp::A),
            Mnemonic::at(mem::SP),
            Mnemonic::compute(Dest::M, Comp::D),
            Mnemonic::at(mem::ARG),
            Mnemonic::compute(Dest::M, Comp::D),
            Mnemonic::at(mem::LCL),
            Mnemonic::compute(Dest::M, Comp::D),
            Mnemonic::at_number(mem::HEAP_BASE),
            Mnemonic::compute(Dest::D, Comp::A),
            Mnemonic::at(mem::THIS),
            Mnemonic::compute(Dest::M, Comp::D),
            Mnemonic::at(mem::THAT),
            Mnemonic::compute(Dest::M, Comp::D),
        ]);
        self.flush_block(&buf, &mut arena)?;

        // Hand control to the entry function through the regular calling
        // convention.
        let boot_call = Command::Call {
            function: entry,
            args: 0,
        };
        buf.clear();
        let site = self.counters.next_call_site();
        translate_flow(&mut arena, &boot_call, PREAMBLE_NAME, site, &mut buf)?;
        self.flush_block(&buf, &mut arena)?;

        // Halt spin reached when the entry function returns, then the
        // shared boolean routines. True is all ones, built without a
        // negative literal; both routines store at the stack top and
        // resume through R13.
        buf.clear();
        buf.extend([
            Mnemonic::at(mem::RT_HALT),
            Mnemonic::label(mem::RT_HALT),
            Mnemonic::jump(Comp::Zero, Jump::Jmp),
            Mnemonic::label(mem::RT_RESUME),
            Mnemonic::at(mem::SP),
            Mnemonic::compute(Dest::A, Comp::M),
            Mnemonic::compute(Dest::M, Comp::D),
            Mnemonic::at(mem::R13),
            Mnemonic::compute(Dest::A, Comp::M),
            Mnemonic::jump(Comp::Zero, Jump::Jmp),
            Mnemonic::label(mem::RT_TRUE),
            Mnemonic::at_number(0x7fff),
            Mnemonic::compute(Dest::D, Comp::APlusOne),
            Mnemonic::compute(Dest::D, Comp::DPlusA),
            Mnemonic::at(mem::RT_RESUME),
            Mnemonic::jump(Comp::Zero, Jump::Jmp),
            Mnemonic::label(mem::RT_FALSE),
            Mnemonic::at_number(0),
            Mnemonic::compute(Dest::D, Comp::A),
            Mnemonic::at(mem::RT_RESUME),
            Mnemonic::jump(Comp::Zero, Jump::Jmp),
        ]);
        self.flush_block(&buf, &mut arena)?;
        Ok(())
    }

    fn unit(&mut self, commands: &[Command<'_>], filename: &str) -> Result<(), GenError> {
        self.statics.begin_unit();

        let mut arena = StackArena::with_capacity(self.arena_capacity);
        let mut buf: Vec<Mnemonic<'_>> = Vec::with_capacity(40);

        for command in commands {
            buf.clear();
            self.translate(&mut arena, command, filename, &mut buf)?;
            self.flush_block(&buf, &mut arena)?;
            arena.pop(arena.position());
        }
        Ok(())
    }

    fn translate<'a>(
        &mut self,
        arena: &mut StackArena,
        command: &Command<'a>,
        filename: &str,
        out: &mut Vec<Mnemonic<'a>>,
    ) -> Result<(), GenError> {
        match command.category() {
            Category::Logical => {
                translate_logical(arena, command, filename, &mut self.counters, out)
            }
            Category::Memory => match command {
                Command::Push { .. } => translate_push(command, &mut self.statics, out),
                _ => translate_pop(command, &mut self.statics, out),
            },
            Category::Flow => {
                if matches!(command, Command::Function { .. }) {
                    self.counters.reset_call_sites();
                }
                let site = match command {
                    Command::Call { .. } => self.counters.next_call_site(),
                    _ => 0,
                };
                translate_flow(arena, command, filename, site, out)
            }
        }
    }

    /// Render a block, write it whole and flush.
    fn flush_block(
        &mut self,
        mnemonics: &[Mnemonic<'_>],
        arena: &mut StackArena,
    ) -> Result<(), GenError> {
        let block = render(mnemonics, arena)?;
        self.sink.write_all(arena.bytes_at(block))?;
        self.sink.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hackvm_core::Segment;

    fn output(generator: Generator<Vec<u8>>) -> String {
        String::from_utf8(generator.finish().unwrap()).unwrap()
    }

    fn count(haystack: &str, needle: &str) -> usize {
        haystack.matches(needle).count()
    }

    #[test]
    fn preamble_boots_registers_and_calls_the_entry() {
        let mut generator = Generator::new(Vec::new());
        generator.emit_preamble("Sys.init").unwrap();
        let text = output(generator);

        assert!(text.starts_with("@256\nD=A\n@SP\nM=D\n@ARG\nM=D\n@LCL\nM=D\n"));
        assert!(text.contains("@2048\nD=A\n@THIS\nM=D\n@THAT\nM=D\n"));
        assert!(text.contains("@Sys.init\n0;JMP\n(preamble.Sys.init.0)\n"));
    }

    #[test]
    fn preamble_emits_shared_routines_once() {
        let mut generator = Generator::new(Vec::new());
        generator.emit_preamble("main").unwrap();
        let text = output(generator);

        assert_eq!(count(&text, "($rt.true)"), 1);
        assert_eq!(count(&text, "($rt.false)"), 1);
        assert_eq!(count(&text, "($rt.resume)"), 1);
        assert_eq!(count(&text, "($rt.halt)"), 1);
        // True is all ones, built from the positive half-range.
        assert!(text.contains("($rt.true)\n@32767\nD=A+1\nD=D+A\n"));
    }

    #[test]
    fn comparison_sites_reference_the_shared_routines() {
        let commands = [
            Command::Function {
                name: "Main.main",
                locals: 0,
            },
            Command::Push {
                segment: Segment::Constant,
                index: 1,
            },
            Command::Push {
                segment: Segment::Constant,
                index: 2,
            },
            Command::Lt,
            Command::Push {
                segment: Segment::Constant,
                index: 3,
            },
            Command::Eq,
            Command::Return,
        ];
        let mut generator = Generator::new(Vec::new());
        generator.emit_preamble("Main.main").unwrap();
        generator.generate(&commands, "main").unwrap();
        let text = output(generator);

        assert_eq!(count(&text, "($rt.true)"), 1);
        assert_eq!(count(&text, "@$rt.true"), 2);
        assert!(text.contains("(main.op.0)"));
        assert!(text.contains("(main.op.1)"));
    }

    #[test]
    fn static_base_carries_between_units() {
        let first = [
            Command::Function {
                name: "Alpha.init",
                locals: 0,
            },
            Command::Push {
                segment: Segment::Constant,
                index: 5,
            },
            Command::Pop {
                segment: Segment::Static,
                index: 2,
            },
            Command::Return,
        ];
        let second = [
            Command::Function {
                name: "Beta.init",
                locals: 0,
            },
            Command::Push {
                segment: Segment::Static,
                index: 0,
            },
            Command::Return,
        ];
        let mut generator = Generator::new(Vec::new());
        generator.emit_preamble("Alpha.init").unwrap();
        generator.generate(&first, "alpha").unwrap();
        generator.generate(&second, "beta").unwrap();
        let text = output(generator);

        // alpha's static 2 lands at 18; alpha used slots 0..=2, so
        // beta's static 0 resolves past them.
        assert!(text.contains("@18\nM=D\n"));
        assert!(text.contains("@19\nD=M\n"));
    }

    #[test]
    fn call_sites_are_unique_within_a_function_and_reset() {
        let commands = [
            Command::Function {
                name: "Main.main",
                locals: 0,
            },
            Command::Call {
                function: "Main.f",
                args: 0,
            },
            Command::Call {
                function: "Main.f",
                args: 0,
            },
            Command::Return,
            Command::Function {
                name: "Main.other",
                locals: 0,
            },
            Command::Call {
                function: "Main.g",
                args: 0,
            },
            Command::Return,
        ];
        let mut generator = Generator::new(Vec::new());
        generator.emit_preamble("Main.main").unwrap();
        generator.generate(&commands, "main").unwrap();
        let text = output(generator);

        assert!(text.contains("(main.Main.f.0)"));
        assert!(text.contains("(main.Main.f.1)"));
        assert!(text.contains("(main.Main.g.0)"));
    }

    #[test]
    fn pop_constant_fails_the_session() {
        let commands = [
            Command::Function {
                name: "Main.main",
                locals: 0,
            },
            Command::Pop {
                segment: Segment::Constant,
                index: 0,
            },
        ];
        let mut generator = Generator::new(Vec::new());
        generator.emit_preamble("Main.main").unwrap();
        let err = generator.generate(&commands, "main").unwrap_err();
        assert!(matches!(err, GenError::InvalidSegment { .. }));
    }

    #[test]
    fn exhausted_arena_fails_the_session() {
        let commands = [Command::Function {
            name: "Main.main",
            locals: 0,
        }];
        let mut generator = Generator::with_arena_capacity(Vec::new(), 8);
        generator.emit_preamble("Main.main").unwrap();
        let err = generator.generate(&commands, "main").unwrap_err();
        assert!(matches!(err, GenError::Arena(_)));
    }

    #[test]
    #[should_panic(expected = "preamble")]
    fn generating_before_the_preamble_is_a_contract_violation() {
        let commands = [Command::Function {
            name: "Main.main",
            locals: 0,
        }];
        let mut generator = Generator::new(Vec::new());
        let _ = generator.generate(&commands, "main");
    }

    #[test]
    #[should_panic(expected = "healthy")]
    fn a_failed_session_stays_failed() {
        let commands = [
            Command::Function {
                name: "Main.main",
                locals: 0,
            },
            Command::Pop {
                segment: Segment::Constant,
                index: 0,
            },
        ];
        let mut generator = Generator::new(Vec::new());
        generator.emit_preamble("Main.main").unwrap();
        let _ = generator.generate(&commands, "main");
        let _ = generator.generate(&commands, "main");
    }

    #[test]
    #[should_panic(expected = "function definition")]
    fn units_must_start_with_a_function() {
        let commands = [Command::Add];
        let mut generator = Generator::new(Vec::new());
        generator.emit_preamble("Main.main").unwrap();
        let _ = generator.generate(&commands, "main");
    }
}
