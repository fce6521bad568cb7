//! The compiler core: a lexer, symbol table, globals/arrays module,
//! backpatch table, dead-function map, memory arena, and output assembler
//! shared by the 16-bit and 32-bit bytecode targets.
//!
//! Object/property emission, grammar tables, dictionary and string
//! compression, and the expression/statement compiler live outside this
//! crate's scope; the types here are the substrate those passes are built
//! on top of.

pub mod arena;
pub mod backpatch;
pub mod config;
pub mod context;
pub mod deadcode;
pub mod diagnostics;
pub mod globals;
pub mod lexer;
pub mod output;
pub mod source;
pub mod symbol;
pub mod target;

pub use backpatch::{BackpatchEntry, BackpatchTable, Marker, TargetArea, Width};
pub use config::Config;
pub use context::CompilationContext;
pub use deadcode::{DeadFunctionMap, FunctionId};
pub use diagnostics::{Diagnostic, DiagnosticSink, Severity};
pub use globals::{ArrayShape, ArrayValue, GlobalsAndArrays};
pub use lexer::{Lexer, Token, TokenKind};
pub use symbol::{Symbol, SymbolTable, SymbolType};
pub use target::Target;
