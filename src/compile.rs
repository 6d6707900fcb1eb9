//! Compile driver.
//!
//! Runs the passes in order over a fresh [`CompileContext`] and packages the
//! generated module together with its diagnostics and metadata.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, error, instrument, warn};

use crate::analyze::analyze;
use crate::builder::build_ir;
use crate::codegen::generate;
use crate::config::CompileConfig;
use crate::context::CompileContext;
use crate::diagnostics::{CompileError, Diagnostic};
use crate::parse::parse_markup;
use crate::scope::{resolve_scoping, ImportEntry};

/// A named template for batch compiles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateSource {
    pub name: String,
    pub source: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileOutput {
    /// Generated module, absent when any error diagnostic was reported.
    pub code: Option<String>,
    pub diagnostics: Vec<Diagnostic>,
    pub slots: Vec<String>,
    pub stylesheets: Vec<String>,
    pub imports: Vec<ImportEntry>,
    pub scoped_ids: Vec<String>,
    pub stylesheet_token: Option<String>,
}

impl CompileOutput {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

/// Compile one template.
///
/// Markup problems are reported as diagnostics in the output; only compiler
/// defects and configuration problems are returned as `Err`.
#[instrument(skip_all, fields(bytes = source.len(), component = ?config.component_name))]
pub fn compile_template(source: &str, config: &CompileConfig) -> Result<CompileOutput, CompileError> {
    let mut ctx = CompileContext::new(config);

    let document = match parse_markup(source) {
        Ok(document) => document,
        Err(diagnostic) => {
            warn!(%diagnostic, "markup could not be parsed");
            return Ok(CompileOutput {
                diagnostics: vec![diagnostic],
                stylesheets: config.stylesheets.clone(),
                ..CompileOutput::default()
            });
        }
    };

    let mut nodes = build_ir(document, &mut ctx);
    let analysis = analyze(&nodes, &ctx);

    if ctx.diagnostics.has_errors() {
        warn!(
            errors = ctx.diagnostics.error_count(),
            "code generation skipped"
        );
        return Ok(finish(ctx, None, None));
    }

    resolve_scoping(&mut nodes, &mut ctx);

    let token = ctx
        .config
        .scoped_styles
        .then(|| stylesheet_token(ctx.config.component_name.as_deref(), source));
    let code = generate(&nodes, &analysis, &mut ctx, token.as_deref()).map_err(|err| {
        error!(%err, "compile aborted");
        err
    })?;

    debug!(
        bytes = code.len(),
        diagnostics = ctx.diagnostics.len(),
        "template compiled"
    );
    Ok(finish(ctx, Some(code), token))
}

/// Compile independent templates in parallel. Results keep input order.
pub fn compile_many(
    inputs: &[TemplateSource],
    config: &CompileConfig,
) -> Vec<Result<CompileOutput, CompileError>> {
    inputs
        .par_iter()
        .map(|input| {
            let span = tracing::debug_span!("template", name = %input.name);
            let _guard = span.enter();
            compile_template(&input.source, config)
        })
        .collect()
}

fn finish(ctx: CompileContext, code: Option<String>, stylesheet_token: Option<String>) -> CompileOutput {
    CompileOutput {
        code,
        slots: ctx.slots,
        stylesheets: ctx.config.stylesheets,
        imports: ctx.imports.iter().cloned().collect(),
        scoped_ids: ctx.scoped_ids.tokens(),
        diagnostics: ctx.diagnostics.into_vec(),
        stylesheet_token,
    }
}

/// Stable token used by scoped stylesheets: the component name (or `tmpl`)
/// followed by the first 8 hex digits of a SHA-256 over the name or source.
pub fn stylesheet_token(component_name: Option<&str>, source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(component_name.unwrap_or(source).as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    let prefix: String = component_name
        .unwrap_or("tmpl")
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    format!("{}-{}", prefix, &digest[..8])
}
