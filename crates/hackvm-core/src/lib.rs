//! Shared leaf types for the VM-to-assembly translator.
//!
//! This crate carries everything both the source parser and the code
//! generator need:
//! - [`arena`]: the fixed-capacity, stack-disciplined allocator backing
//!   all generated text
//! - [`command`]: the VM instruction model
//! - [`mem`]: the target machine's fixed memory map and reserved symbols

pub mod arena;
pub mod command;
pub mod mem;

pub use arena::{ArenaExhausted, ArenaStr, ArenaWriter, StackArena};
pub use command::{Category, Command, Segment};
