//! Two-pass 6502 cross-assembler with debug-symbol output and an optional
//! human-readable listing (feature: "listing").
//!
//! ## Features
//! - **Two passes**: label addresses from pass 1 are checked against pass 2,
//!   so forward references never change instruction sizes.
//! - **Expressions** over 16-bit values with `+ - * / %`, relational
//!   operators, `<`/`>` low/high byte and `*` for the program counter.
//!   Literals: `42`, `$2A`, `%101010`, `@52`, `'*'`.
//! - **Directives** (case-insensitive):
//!   - `.org e` set the program counter, `name = e` / `name .equ e` assign.
//!   - `.byte`, `.word`, `.ds n[,fill]` emit data.
//!   - `.inc`/`.lib`/`.fil "file"` include source, `.bin`/`.incbin "file"`
//!     include raw bytes.
//!   - `.if`/`.else`/`.endif` conditional assembly.
//!   - `.assert e[, "msg"]` checked in pass 2.
//!   - `.on`/`.off` toggle byte output.
//!   - `.dbg "template"` emits one debug record per label, e.g.
//!     `"al {V} .{L}"`. `{V-8000}` offsets the value, `{C}` is the comment
//!     written above or beside the label.
//! - **Zero page** forms are picked automatically when the operand is
//!   known to fit in one byte.
//!
//! ## Optional Features
//! - `listing`: collects an address / bytes / source listing in
//!   [`Output::listing`].
//!
//! ## Basic Usage
//! ```rust
//! fn main() -> Result<(), pop65::AsmError> {
//!     let out = pop65::assemble_str(r#"
//!         .org $0800
//!         lda #$42
//!         sta $0200
//!     "#)?;
//!
//!     assert_eq!(out.bytes, vec![0xA9, 0x42, 0x8D, 0x00, 0x02]);
//!     Ok(())
//! }
//! ```
//!
//! Files named by `.inc` and `.bin` are read through a [`FileResolver`].
//! [`Assembler::new`] uses the filesystem; [`MemResolver`] serves tests and
//! embedders.
//!
//! ## License
//! This project is released under [The Unlicense](https://unlicense.org/).
//! You are free to use it for any purpose, without restriction.

mod addressing;
mod assembler;
mod cond;
mod debug;
mod encoder;
mod error;
mod eval;
#[cfg(feature = "listing")]
mod listing;
mod opcodes;
pub mod parser;
mod source;
mod symbol;

// Public exports
pub use assembler::{AsmConfig, Assembler, Output, DEFAULT_MAX_INCLUDE_DEPTH};
pub use debug::DebugTemplate;
pub use error::{AsmError, ErrorKind, Location, Result};
#[cfg(feature = "listing")]
pub use listing::{Listing, ListingLine};
pub use source::{FileResolver, FsResolver, MemResolver, SourceFile};
pub use symbol::{Symbol, SymbolOrigin, SymbolTable};

/// Assemble source text with the default configuration.
pub fn assemble_str(src: &str) -> Result<Output> {
    Assembler::default().assemble_str("<input>", src)
}
