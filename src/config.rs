//! Compile configuration.
//!
//! Deserialized from the camelCase JSON handed over by the bundler
//! integration. Every field has a default so `{}` is a valid config.

use serde::{Deserialize, Serialize};

use crate::diagnostics::CompileError;

/// Namespace hint for top-level elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Namespace {
    #[default]
    Native,
    /// Top-level elements are created in the SVG namespace (templates used
    /// as the body of an `<svg>` host).
    SvgHint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    #[default]
    Shadow,
    Light,
}

impl RenderMode {
    pub fn from_attr(value: &str) -> Option<Self> {
        match value {
            "shadow" => Some(RenderMode::Shadow),
            "light" => Some(RenderMode::Light),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompileConfig {
    pub namespace: Namespace,
    pub preserve_comments: bool,
    pub render_mode: RenderMode,
    pub scoped_styles: bool,
    /// Used to derive the scoped stylesheet token. Falls back to the source.
    pub component_name: Option<String>,
    /// Stylesheet module references produced by the style compiler.
    pub stylesheets: Vec<String>,
    pub runtime_module: String,
    pub enable_static_content_optimization: bool,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            namespace: Namespace::Native,
            preserve_comments: false,
            render_mode: RenderMode::Shadow,
            scoped_styles: false,
            component_name: None,
            stylesheets: Vec::new(),
            runtime_module: "lwc".to_string(),
            enable_static_content_optimization: true,
        }
    }
}

impl CompileConfig {
    pub fn from_json(json: &str) -> Result<Self, CompileError> {
        Ok(serde_json::from_str(json)?)
    }
}
