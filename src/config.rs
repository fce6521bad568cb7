//! Compilation configuration (§12 ambient): target selection, memory
//! settings, size presets, `--define` values, and output paths.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::diagnostics::DiagnosticSink;
use crate::target::Target;

/// A `MEMORY_SIZE`-style size preset, each expanding to a bundle of memory
/// setting defaults before any explicit `--memory NAME=VALUE` override is
/// applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizePreset {
    Small,
    Large,
    Huge,
}

impl SizePreset {
    fn defaults(self) -> &'static [(&'static str, i64)] {
        match self {
            SizePreset::Small => &[("MAX_SYMBOLS", 6000), ("MAX_DYNAMIC_STRINGS", 1000)],
            SizePreset::Large => &[("MAX_SYMBOLS", 30000), ("MAX_DYNAMIC_STRINGS", 4000)],
            SizePreset::Huge => &[("MAX_SYMBOLS", 90000), ("MAX_DYNAMIC_STRINGS", 10000)],
        }
    }
}

/// Setting names the source once accepted but has since withdrawn; using one
/// produces an [`crate::diagnostics::Severity::Obsolete`] diagnostic and is
/// otherwise ignored, per §7.
const OBSOLETE_MEMORY_SETTINGS: &[&str] = &["MAX_OLDSYMBOLS", "SMALL_RAM_FLAG", "MAX_LOW_STRINGS"];

/// The ±(10^9 - 1) clamp applied to every memory setting value (§12).
const MEMORY_SETTING_LIMIT: i64 = 999_999_999;

#[derive(Debug, Clone)]
pub struct Config {
    pub target: Target,
    memory_settings: HashMap<String, i64>,
    pub defines: Vec<(String, i64)>,
    pub story_file_path: Option<PathBuf>,
    pub transcript_path: Option<PathBuf>,
    pub debug_info_path: Option<PathBuf>,
    /// Emit an unresolved module file rather than a final story file.
    pub module_mode: bool,
    pub strip_unreachable_functions: bool,
}

impl Config {
    pub fn new(target: Target) -> Self {
        Config {
            target,
            memory_settings: HashMap::new(),
            defines: Vec::new(),
            story_file_path: None,
            transcript_path: None,
            debug_info_path: None,
            module_mode: false,
            strip_unreachable_functions: true,
        }
    }

    pub fn apply_size_preset(&mut self, preset: SizePreset) {
        for &(name, value) in preset.defaults() {
            self.memory_settings.insert(name.to_string(), value);
        }
    }

    /// `--memory NAME=VALUE`. Obsolete names are reported and ignored;
    /// out-of-range values are clamped with a warning rather than rejected
    /// outright, per §12.
    pub fn set_memory(&mut self, name: &str, value: i64, diagnostics: &mut DiagnosticSink) {
        let upper = name.to_ascii_uppercase();
        if OBSOLETE_MEMORY_SETTINGS.contains(&upper.as_str()) {
            diagnostics.obsolete(format!("the memory setting '{name}' is obsolete and has no effect"));
            return;
        }
        let clamped = value.clamp(-MEMORY_SETTING_LIMIT, MEMORY_SETTING_LIMIT);
        if clamped != value {
            diagnostics.warning(
                format!("memory setting '{name}' value {value} out of range; clamped to {clamped}"),
                None,
            );
        }
        self.memory_settings.insert(upper, clamped);
    }

    pub fn memory_setting(&self, name: &str) -> Option<i64> {
        self.memory_settings.get(&name.to_ascii_uppercase()).copied()
    }

    /// `--define NAME[=VALUE]`, queued for injection into the symbol table
    /// once it is built.
    pub fn add_define(&mut self, name: impl Into<String>, value: i64) {
        self.defines.push((name.into(), value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_preset_seeds_memory_settings() {
        let mut cfg = Config::new(Target::Glulx);
        cfg.apply_size_preset(SizePreset::Large);
        assert_eq!(cfg.memory_setting("MAX_SYMBOLS"), Some(30000));
    }

    #[test]
    fn explicit_memory_setting_overrides_preset() {
        let mut cfg = Config::new(Target::Glulx);
        let mut diags = DiagnosticSink::new();
        cfg.apply_size_preset(SizePreset::Small);
        cfg.set_memory("MAX_SYMBOLS", 12345, &mut diags);
        assert_eq!(cfg.memory_setting("MAX_SYMBOLS"), Some(12345));
    }

    #[test]
    fn obsolete_setting_name_is_reported_and_ignored() {
        let mut cfg = Config::new(Target::Glulx);
        let mut diags = DiagnosticSink::new();
        cfg.set_memory("MAX_OLDSYMBOLS", 10, &mut diags);
        assert_eq!(diags.warning_count(), 1);
        assert_eq!(cfg.memory_setting("MAX_OLDSYMBOLS"), None);
    }

    #[test]
    fn out_of_range_value_is_clamped_with_a_warning() {
        let mut cfg = Config::new(Target::Glulx);
        let mut diags = DiagnosticSink::new();
        cfg.set_memory("MAX_SYMBOLS", 5_000_000_000, &mut diags);
        assert_eq!(diags.warning_count(), 1);
        assert_eq!(cfg.memory_setting("MAX_SYMBOLS"), Some(MEMORY_SETTING_LIMIT));
    }
}
