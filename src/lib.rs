//! # Template Compiler
//!
//! Compiles a declarative markup template into an ES module exporting a
//! render function for the component runtime.
//!
//! ## Pipeline
//!
//! 1. **Parse** (`parse`): markup → document tree, or one `MalformedMarkup`
//!    diagnostic.
//! 2. **Build** (`builder`): document tree → typed IR, validating directives,
//!    slots, reserved names and bindings.
//! 3. **Analyze** (`analyze`): keys in pre-order, flag masks, staticness and
//!    static fragments.
//! 4. **Resolve scoping** (`scope`): scoped-id attributes and child component
//!    imports.
//! 5. **Generate** (`codegen`): the module text.
//!
//! Every compile owns its [`CompileContext`]; nothing is global, so templates
//! may be compiled concurrently (see [`compile_many`]).
//!
//! ## Output Contract
//!
//! `code` is present iff no error diagnostic was recorded. Warnings never
//! block generation. A compiler defect is returned as [`CompileError`] and is
//! never folded into the diagnostics list.

#[cfg(feature = "napi")]
use napi_derive::napi;

mod analyze;
mod builder;
mod codegen;
mod compile;
mod config;
mod context;
mod diagnostics;
mod expression;
mod ir;
mod js;
mod parse;
mod scope;

#[cfg(test)]
mod analyze_tests;
#[cfg(test)]
mod builder_tests;

pub use analyze::{analyze, flags, Analysis, NodeAnalysis};
pub use builder::build_ir;
pub use codegen::{generate, RuntimeHelper};
pub use compile::{compile_many, compile_template, stylesheet_token, CompileOutput, TemplateSource};
pub use config::{CompileConfig, Namespace, RenderMode};
pub use context::CompileContext;
pub use diagnostics::{CompileError, Diagnostic, DiagnosticCode, Diagnostics, Severity, SourceLocation};
pub use expression::{parse_expression, Expr};
pub use ir::{walk, IrNode, NodeId, NodeKind, NodeTable};
pub use parse::{parse_markup, DocNode};
pub use scope::{resolve_scoping, ImportEntry};

/// Node entry point: `config_json` is the camelCase [`CompileConfig`].
#[cfg(feature = "napi")]
#[napi]
pub fn compile_template_native(source: String, config_json: Option<String>) -> napi::Result<serde_json::Value> {
    let config = match config_json {
        Some(json) => CompileConfig::from_json(&json)
            .map_err(|e| napi::Error::from_reason(format!("Invalid config: {}", e)))?,
        None => CompileConfig::default(),
    };
    let output = compile_template(&source, &config).map_err(|e| napi::Error::from_reason(e.to_string()))?;
    serde_json::to_value(output).map_err(|e| napi::Error::from_reason(format!("Serialize error: {}", e)))
}
