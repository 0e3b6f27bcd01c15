//! One-pass assembler for Zilog Z80 code.
//!
//! Source is read once. Forward references get a zero placeholder and a fixup, which is patched
//! as soon as the missing name is defined. The result is a 64 KiB image that can be written as a
//! raw binary, Intel HEX, or a C header, plus an optional listing with a cross reference.
//!
//! ```
//! use z80asm::{assemble, Config};
//!
//! let assembly = assemble(" org $100\n jp start\nstart: ret\n", &Config::default()).unwrap();
//!
//! assert_eq!(assembly.memory.slice(0x100, 0x103), &[0xc3, 0x03, 0x01, 0xc9]);
//! ```

// Error kinds and the line they happened on.
pub mod error;

// Record encoder for Intel HEX.
pub mod ihex;

// The annotated listing and cross reference.
pub mod listing;

// Binary, Intel HEX and C array writers.
pub mod output;

// Handles strings and characters going into assembly.
pub mod text;

// The Z80 compilation engine.
pub mod z80;

pub use error::{AsmError, LineError};
pub use z80::{assemble, Assembly, Config, Severity};
