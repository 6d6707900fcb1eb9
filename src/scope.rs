//! Scoping resolver.
//!
//! Two concerns, both recorded per compile:
//! - which attributes must be routed through the runtime's scoped-id helpers
//!   (`id`, id references and same-document fragment URLs),
//! - one import binding per child component tag.

use indexmap::IndexMap;
use oxc_syntax::identifier::is_identifier_name;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::config::RenderMode;
use crate::context::CompileContext;
use crate::ir::{AttrValue, Attribute, IrNode, NodeKind, ScopedKind};

/// Attributes whose value is a reference to an element id.
const ID_REFERENCE_ATTRS: &[&str] = &[
    "for",
    "aria-activedescendant",
    "aria-controls",
    "aria-describedby",
    "aria-details",
    "aria-errormessage",
    "aria-flowto",
    "aria-labelledby",
    "aria-owns",
];

const URL_ATTRS: &[&str] = &["href", "xlink:href", "src"];

/// How `attr` must be scoped, ignoring render mode.
pub fn scoped_kind(attr: &Attribute) -> Option<ScopedKind> {
    let name = attr.name.as_str();
    match &attr.value {
        AttrValue::Boolean(_) => None,
        AttrValue::Literal(value) if value.is_empty() => None,
        _ if name == "id" || ID_REFERENCE_ATTRS.contains(&name) => Some(ScopedKind::Id),
        AttrValue::Literal(value) if URL_ATTRS.contains(&name) => {
            (value.len() > 1 && value.starts_with('#')).then_some(ScopedKind::Fragment)
        }
        AttrValue::Expression(_) if URL_ATTRS.contains(&name) => Some(ScopedKind::Fragment),
        _ => None,
    }
}

pub fn needs_scoping(attr: &Attribute, mode: RenderMode) -> bool {
    mode == RenderMode::Shadow && scoped_kind(attr).is_some()
}

// ═══════════════════════════════════════════════════════════════════════════════
// SCOPED ID TABLE
// ═══════════════════════════════════════════════════════════════════════════════

/// Raw literal id tokens in first-seen order. `href="#foo"` and `id="foo"`
/// share the token `foo`.
#[derive(Debug, Default, Clone)]
pub struct ScopedIdTable {
    tokens: IndexMap<String, usize>,
}

impl ScopedIdTable {
    pub fn slot(&mut self, raw: &str) -> usize {
        let next = self.tokens.len();
        *self.tokens.entry(raw.to_string()).or_insert(next)
    }

    pub fn get(&self, raw: &str) -> Option<usize> {
        self.tokens.get(raw).copied()
    }

    pub fn tokens(&self) -> Vec<String> {
        self.tokens.keys().cloned().collect()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// IMPORT TABLE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportEntry {
    pub tag: String,
    pub local: String,
    pub path: String,
}

#[derive(Debug, Default, Clone)]
pub struct ImportTable {
    entries: IndexMap<String, ImportEntry>,
}

impl ImportTable {
    pub fn register(&mut self, tag: &str) -> &ImportEntry {
        if !self.entries.contains_key(tag) {
            let base = local_binding(tag);
            let mut local = base.clone();
            let mut suffix = 1;
            while self.entries.values().any(|entry| entry.local == local) {
                local = format!("{}{}", base, suffix);
                suffix += 1;
            }
            let entry = ImportEntry {
                tag: tag.to_string(),
                local,
                path: module_path(tag),
            };
            self.entries.insert(tag.to_string(), entry);
        }
        &self.entries[tag]
    }

    pub fn local_for(&self, tag: &str) -> Option<&str> {
        self.entries.get(tag).map(|entry| entry.local.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImportEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub fn camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if c == '-' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// `x-foo-bar` → `x/fooBar`
fn module_path(tag: &str) -> String {
    match tag.split_once('-') {
        Some((namespace, name)) => format!("{}/{}", namespace, camel_case(name)),
        None => tag.to_string(),
    }
}

/// `x-foo-bar` → `_xFooBar`
fn local_binding(tag: &str) -> String {
    let candidate = format!("_{}", camel_case(tag));
    if is_identifier_name(&candidate) {
        return candidate;
    }
    candidate
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '$' { c } else { '_' })
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════════
// RESOLVER
// ═══════════════════════════════════════════════════════════════════════════════

#[instrument(skip_all)]
pub fn resolve_scoping(nodes: &mut [IrNode], ctx: &mut CompileContext) {
    let mode = ctx.config.render_mode;
    resolve_nodes(nodes, ctx, mode);
    debug!(
        imports = ctx.imports.len(),
        scoped_ids = ctx.scoped_ids.tokens().len(),
        "scoping resolved"
    );
}

fn resolve_nodes(nodes: &mut [IrNode], ctx: &mut CompileContext, mode: RenderMode) {
    for node in nodes {
        if let NodeKind::Component(el) = &node.kind {
            ctx.imports.register(&el.tag);
        }
        match &mut node.kind {
            NodeKind::Element(el) | NodeKind::Component(el) => {
                resolve_attrs(&mut el.attrs, ctx, mode);
                resolve_id_props(&mut el.props, ctx, mode);
            }
            NodeKind::Dynamic(dynamic) => {
                resolve_attrs(&mut dynamic.element.attrs, ctx, mode);
                resolve_id_props(&mut dynamic.element.props, ctx, mode);
            }
            NodeKind::Slot(slot) => resolve_attrs(&mut slot.attrs, ctx, mode),
            _ => {}
        }
        for list in node.child_lists_mut() {
            resolve_nodes(list, ctx, mode);
        }
    }
}

fn resolve_attrs(attrs: &mut [Attribute], ctx: &mut CompileContext, mode: RenderMode) {
    for attr in attrs {
        if !needs_scoping(attr, mode) {
            continue;
        }
        attr.scoping = scoped_kind(attr);
        if let AttrValue::Literal(value) = &attr.value {
            match attr.scoping {
                Some(ScopedKind::Fragment) => {
                    ctx.scoped_ids.slot(value.trim_start_matches('#'));
                }
                Some(ScopedKind::Id) => {
                    for token in value.split_whitespace() {
                        ctx.scoped_ids.slot(token);
                    }
                }
                None => {}
            }
        }
    }
}

/// Custom elements receive `id` as a property.
fn resolve_id_props(props: &mut [Attribute], ctx: &mut CompileContext, mode: RenderMode) {
    for prop in props.iter_mut().filter(|p| p.name == "id") {
        if needs_scoping(prop, mode) {
            prop.scoping = Some(ScopedKind::Id);
            if let AttrValue::Literal(value) = &prop.value {
                ctx.scoped_ids.slot(value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::SourceLocation;
    use crate::expression::Expr;

    fn attr(name: &str, value: AttrValue) -> Attribute {
        Attribute::new(name, value, SourceLocation::new(1, 1))
    }

    #[test]
    fn test_scoped_kinds() {
        let lit = |v: &str| AttrValue::Literal(v.to_string());
        let expr = AttrValue::Expression(Expr::Identifier("target".to_string()));
        assert_eq!(scoped_kind(&attr("id", lit("a"))), Some(ScopedKind::Id));
        assert_eq!(scoped_kind(&attr("aria-labelledby", lit("a b"))), Some(ScopedKind::Id));
        assert_eq!(scoped_kind(&attr("href", lit("#a"))), Some(ScopedKind::Fragment));
        assert_eq!(scoped_kind(&attr("href", lit("/a#b"))), None);
        assert_eq!(scoped_kind(&attr("href", lit("#"))), None);
        assert_eq!(scoped_kind(&attr("href", expr.clone())), Some(ScopedKind::Fragment));
        assert_eq!(scoped_kind(&attr("src", expr)), Some(ScopedKind::Fragment));
        assert_eq!(scoped_kind(&attr("title", lit("#a"))), None);
    }

    #[test]
    fn test_light_mode_disables_scoping() {
        let a = attr("id", AttrValue::Literal("a".to_string()));
        assert!(needs_scoping(&a, RenderMode::Shadow));
        assert!(!needs_scoping(&a, RenderMode::Light));
    }

    #[test]
    fn test_scoped_id_slots_are_stable() {
        let mut table = ScopedIdTable::default();
        assert_eq!(table.slot("kansai-airport"), 0);
        assert_eq!(table.slot("narita"), 1);
        assert_eq!(table.slot("kansai-airport"), 0);
        assert_eq!(table.tokens(), vec!["kansai-airport", "narita"]);
    }

    #[test]
    fn test_import_bindings() {
        let mut imports = ImportTable::default();
        let entry = imports.register("x-foo-bar").clone();
        assert_eq!(entry.local, "_xFooBar");
        assert_eq!(entry.path, "x/fooBar");
        imports.register("x-foo");
        imports.register("x-foo-bar");
        let tags: Vec<&str> = imports.iter().map(|e| e.tag.as_str()).collect();
        assert_eq!(tags, vec!["x-foo-bar", "x-foo"]);
    }

    #[test]
    fn test_colliding_bindings_get_a_suffix() {
        let mut imports = ImportTable::default();
        imports.register("x-foo-bar");
        let entry = imports.register("x-foo--bar").clone();
        assert_eq!(entry.local, "_xFooBar1");
    }
}
