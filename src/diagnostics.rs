//! Error handling design (§7), ambient Rust encoding (§11).
//!
//! Modelled on the teacher's `crates/rewrite/src/error.rs`: a manual
//! `enum`-backed `Error`/`Display`/`std::error::Error` triple rather than a
//! derive-macro error crate, since that is the only error-handling pattern
//! the teacher corpus actually uses.

use std::fmt;

use crate::source::SourceLocation;

/// The five severities from §7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Indicates a bug in the compiler itself.
    InternalError,
    /// Unrecoverable: I/O failure, memory-setting overflow, ring overflow.
    Fatal,
    /// Recoverable: diagnostic is emitted and compilation continues.
    Error,
    Warning,
    /// A used-but-withdrawn setting; printed, then ignored.
    Obsolete,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::InternalError => "internal compiler error",
            Severity::Fatal => "fatal error",
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Obsolete => "obsolete",
        };
        f.write_str(s)
    }
}

/// One diagnostic: a severity, a message, and (for anything tied to source)
/// a location.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub location: Option<SourceLocation>,
}

impl Diagnostic {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Diagnostic {
            severity,
            message: message.into(),
            location: None,
        }
    }

    pub fn at(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(loc) => write!(f, "{}: {} ({})", self.severity, self.message, loc),
            None => write!(f, "{}: {}", self.severity, self.message),
        }
    }
}

impl std::error::Error for Diagnostic {}

/// Accumulates diagnostics across a whole compilation, per the §7
/// "accumulated into a per-pass counter" propagation policy.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    diagnostics: Vec<Diagnostic>,
    error_count: usize,
    warning_count: usize,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        DiagnosticSink::default()
    }

    /// Record a non-fatal diagnostic and keep going.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Error | Severity::InternalError | Severity::Fatal => {
                self.error_count += 1;
            }
            Severity::Warning | Severity::Obsolete => {
                self.warning_count += 1;
            }
        }
        log::debug!("{diagnostic}");
        self.diagnostics.push(diagnostic);
    }

    pub fn error(&mut self, message: impl Into<String>, location: Option<SourceLocation>) {
        let mut d = Diagnostic::new(Severity::Error, message);
        if let Some(loc) = location {
            d = d.at(loc);
        }
        self.push(d);
    }

    pub fn warning(&mut self, message: impl Into<String>, location: Option<SourceLocation>) {
        let mut d = Diagnostic::new(Severity::Warning, message);
        if let Some(loc) = location {
            d = d.at(loc);
        }
        self.push(d);
    }

    pub fn obsolete(&mut self, message: impl Into<String>) {
        self.push(Diagnostic::new(Severity::Obsolete, message));
    }

    /// Build a fatal diagnostic to be returned via `Err(..)`, per §5's
    /// "propagate as an abort-valued result" note — no longjmp is used here.
    pub fn fatal(message: impl Into<String>) -> Diagnostic {
        Diagnostic::new(Severity::Fatal, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Diagnostic {
        Diagnostic::new(Severity::InternalError, message)
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn warning_count(&self) -> usize {
        self.warning_count
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

/// The `Result` alias used throughout the core for fallible operations that
/// can produce a fatal/internal diagnostic, matching the teacher's
/// `pub type Result<T> = std::result::Result<T, Error>;` pattern.
pub type Result<T> = std::result::Result<T, Diagnostic>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sink_distinguishes_errors_from_warnings() {
        let mut sink = DiagnosticSink::new();
        sink.warning("obsolete setting ignored", None);
        assert!(!sink.has_errors());
        sink.error("symbol already defined", None);
        assert!(sink.has_errors());
        assert_eq!(sink.error_count(), 1);
        assert_eq!(sink.warning_count(), 1);
    }
}
