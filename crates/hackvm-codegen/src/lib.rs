//! Code generation for the VM-to-assembly translator.
//!
//! The pipeline per command is translate → render → flush:
//! - [`asm`]: the target instruction model (`Mnemonic` and its fields)
//! - [`translate`]: per-category translation of commands into mnemonics
//! - [`render`]: serialization of mnemonic sequences to assembly text
//! - [`session`]: the [`Generator`] driving whole units against a sink
//!
//! All transient generation data lives in a `StackArena`; the generator
//! resets it after every command, so memory use is bounded by the largest
//! single translation regardless of program size.

pub mod asm;
mod error;
pub mod render;
pub mod session;
pub mod translate;

pub use asm::{Comp, Dest, Jump, Label, Mnemonic};
pub use error::GenError;
pub use render::render;
pub use session::Generator;
pub use translate::{LabelCounters, StaticLayout};
