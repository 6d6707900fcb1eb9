//! Diagnostics and compiler errors.
//!
//! Two channels are kept apart:
//! - [`Diagnostic`]: problems with the author's markup. Collected, ordered,
//!   and returned alongside (or instead of) generated code.
//! - [`CompileError`]: the compiler itself is broken or misconfigured.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// DIAGNOSTIC CODES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticCode {
    MalformedMarkup,
    MissingRootTemplate,
    InvalidDirectiveUsage,
    DuplicateSlotName,
    ReservedTagName,
    ReservedAttributeName,
    InvalidExpression,
    DeprecatedDirective,
    MissingIterationKey,
    UnknownHtmlElement,
}

impl DiagnosticCode {
    /// One-line remedy shown next to the message by tooling.
    pub fn hint(self) -> &'static str {
        match self {
            DiagnosticCode::MalformedMarkup => {
                "Every element must be closed, and end tags must match the open element."
            }
            DiagnosticCode::MissingRootTemplate => {
                "A template file contains exactly one root <template> element."
            }
            DiagnosticCode::InvalidDirectiveUsage => {
                "Directives are only valid on the element forms that accept them."
            }
            DiagnosticCode::DuplicateSlotName => "Each slot name may appear once per template.",
            DiagnosticCode::ReservedTagName => {
                "This hyphenated name is reserved by the platform and cannot be a component."
            }
            DiagnosticCode::ReservedAttributeName => {
                "This attribute is managed by the runtime and cannot be set here."
            }
            DiagnosticCode::InvalidExpression => {
                "Bindings accept identifiers, member access, literals and template strings."
            }
            DiagnosticCode::DeprecatedDirective => "Use lwc:if / lwc:elseif / lwc:else instead.",
            DiagnosticCode::MissingIterationKey => {
                "Give elements rendered by for:each a key={...} bound to a stable value."
            }
            DiagnosticCode::UnknownHtmlElement => {
                "Custom elements need a hyphenated name, e.g. <x-foo>."
            }
        }
    }

    pub fn default_severity(self) -> Severity {
        match self {
            DiagnosticCode::DeprecatedDirective
            | DiagnosticCode::MissingIterationKey
            | DiagnosticCode::UnknownHtmlElement => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// 1-based line and column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DIAGNOSTIC
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub severity: Severity,
    pub message: String,
    pub location: SourceLocation,
}

impl Diagnostic {
    pub fn new(code: DiagnosticCode, message: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            code,
            severity: code.default_severity(),
            message: message.into(),
            location,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}[{}] {} at {}", level, self.code, self.message, self.location)
    }
}

/// Ordered diagnostic sink for a single compile.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }

    pub fn report(&mut self, code: DiagnosticCode, message: impl Into<String>, location: SourceLocation) {
        self.push(Diagnostic::new(code, message, location));
    }

    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(Diagnostic::is_error)
    }

    pub fn error_count(&self) -> usize {
        self.entries.iter().filter(|d| d.is_error()).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILER ERROR
// ═══════════════════════════════════════════════════════════════════════════════

/// Failures that are not the author's fault.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("internal compiler error in {pass}: {message}")]
    Internal { pass: &'static str, message: String },
    #[error("invalid compile configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl CompileError {
    pub fn internal(pass: &'static str, message: impl Into<String>) -> Self {
        CompileError::Internal {
            pass,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warnings_do_not_count_as_errors() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.report(
            DiagnosticCode::DeprecatedDirective,
            "if:true is deprecated",
            SourceLocation::new(1, 11),
        );
        assert!(!diagnostics.has_errors());

        diagnostics.report(
            DiagnosticCode::DuplicateSlotName,
            "duplicate slot \"a\"",
            SourceLocation::new(2, 3),
        );
        assert!(diagnostics.has_errors());
        assert_eq!(diagnostics.error_count(), 1);
        assert_eq!(diagnostics.len(), 2);
    }

    #[test]
    fn diagnostics_serialize_with_lowercase_severity() {
        let diagnostic = Diagnostic::new(
            DiagnosticCode::InvalidExpression,
            "bad",
            SourceLocation::new(3, 4),
        );
        let json = serde_json::to_value(&diagnostic).unwrap();
        assert_eq!(json["code"], "InvalidExpression");
        assert_eq!(json["severity"], "error");
        assert_eq!(json["location"]["line"], 3);
    }

    #[test]
    fn internal_error_names_the_pass() {
        let err = CompileError::internal("codegen", "no analysis for node 4");
        assert_eq!(
            err.to_string(),
            "internal compiler error in codegen: no analysis for node 4"
        );
    }
}
