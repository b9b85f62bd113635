//! Fixed memory map of the target machine.
//!
//! The target is a flat 16-bit address space with a handful of named
//! registers in low memory. Generated code addresses the registers by
//! their predefined symbols and the fixed segments by absolute address.

/// Stack pointer register.
pub const SP: &str = "SP";
/// Argument-segment base register.
pub const ARG: &str = "ARG";
/// Local-segment base register.
pub const LCL: &str = "LCL";
/// This-segment base register.
pub const THIS: &str = "THIS";
/// That-segment base register.
pub const THAT: &str = "THAT";
/// First general scratch register.
pub const R13: &str = "R13";
/// Second general scratch register.
pub const R14: &str = "R14";
/// Third general scratch register.
pub const R15: &str = "R15";

/// First address of the working stack.
pub const STACK_BASE: u16 = 256;
/// First address of the shared static segment.
pub const STATIC_BASE: u16 = 16;
/// First address of the temp segment.
pub const TEMP_BASE: u16 = 5;
/// Scratch origin used to seat THIS/THAT at boot.
pub const HEAP_BASE: u16 = 2048;

/// Shared routine that writes boolean true at the stack top.
///
/// The `$rt.` prefix is reserved for generated runtime symbols; source
/// labels must not use it.
pub const RT_TRUE: &str = "$rt.true";
/// Shared routine that writes boolean false at the stack top.
pub const RT_FALSE: &str = "$rt.false";
/// Shared trampoline that stores the boolean and resumes the caller.
pub const RT_RESUME: &str = "$rt.resume";
/// Spin label reached when the entry function returns.
pub const RT_HALT: &str = "$rt.halt";
