//! The `CompilationContext` (§10.2 ambient): the one struct that owns every
//! pass's state for a single compilation and tears it down via `Drop`
//! instead of the source's explicit arena-free call.

use crate::arena::NameStore;
use crate::backpatch::BackpatchTable;
use crate::config::Config;
use crate::deadcode::DeadFunctionMap;
use crate::diagnostics::DiagnosticSink;
use crate::globals::GlobalsAndArrays;
use crate::lexer::Lexer;
use crate::source::FileTable;
use crate::symbol::SymbolTable;
use crate::target::Target;

/// Bundles every module's state for one compilation run.
///
/// The source frees its global arena explicitly at the end of `main`; here
/// every field is owned directly, so the context's `Drop` glue is simply the
/// fields' own destructors running in declaration order. No explicit
/// teardown method is needed or provided.
pub struct CompilationContext {
    pub target: Target,
    pub config: Config,
    pub names: NameStore,
    pub files: FileTable,
    pub lexer: Lexer,
    pub symbols: SymbolTable,
    pub globals: GlobalsAndArrays,
    pub backpatch: BackpatchTable,
    pub dead_functions: DeadFunctionMap,
    pub diagnostics: DiagnosticSink,
}

impl CompilationContext {
    pub fn new(config: Config) -> Self {
        let target = config.target;
        let slot_count = target.default_global_slots();
        let max_dynamic_area_size = config
            .memory_setting("MAX_ARRAYS")
            .map(|v| v as u32)
            .unwrap_or(0x10000);
        let strip = config.strip_unreachable_functions;

        CompilationContext {
            target,
            names: NameStore::new(),
            files: FileTable::new(),
            lexer: Lexer::new(target),
            symbols: SymbolTable::new(target),
            globals: GlobalsAndArrays::new(target, slot_count, max_dynamic_area_size),
            backpatch: BackpatchTable::new(),
            dead_functions: DeadFunctionMap::new(strip),
            diagnostics: DiagnosticSink::new(),
            config,
        }
    }

    /// Inject `--define` values queued on [`Config`] into the symbol table,
    /// reporting any conflicting redefinitions.
    pub fn apply_defines(&mut self) {
        for (name, value) in self.config.defines.clone() {
            self.symbols.queue_predefined_value(name, value);
        }
        for message in self.symbols.inject_predefined_values() {
            self.diagnostics.error(message, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_wires_defines_into_the_symbol_table() {
        let mut config = Config::new(Target::Glulx);
        config.add_define("FOO", 42);
        let mut ctx = CompilationContext::new(config);
        ctx.apply_defines();
        assert!(!ctx.diagnostics.has_errors());
        let index = ctx.symbols.index_of("FOO").unwrap();
        assert_eq!(ctx.symbols.get(index).value, 42);
    }
}
