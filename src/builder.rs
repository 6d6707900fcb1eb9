//! IR builder and semantic validator.
//!
//! Walks the document tree once, producing [`IrNode`]s and reporting every
//! rule violation it finds. Errors never stop the walk; the caller decides
//! whether generation runs.

use lazy_static::lazy_static;
use oxc_syntax::identifier::is_identifier_name;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use tracing::{debug, instrument};

use crate::config::{Namespace, RenderMode};
use crate::context::CompileContext;
use crate::diagnostics::{DiagnosticCode, SourceLocation};
use crate::expression::{binding_body, is_binding, parse_expression, split_text, Expr};
use crate::ir::{
    AttrValue, Attribute, ClassBinding, DynamicData, ElementData, ElementNamespace, ForData,
    IfBranch, IfData, IrNode, Listener, NodeId, NodeKind, SlotData, StyleBinding, StyleDecl,
};
use crate::parse::{DocAttr, DocElement, DocNode, DocText};
use crate::scope::camel_case;

// ═══════════════════════════════════════════════════════════════════════════════
// NAME TABLES
// ═══════════════════════════════════════════════════════════════════════════════

/// Hyphenated names the platform already owns.
pub const RESERVED_TAG_NAMES: &[&str] = &[
    "annotation-xml",
    "color-profile",
    "font-face",
    "font-face-src",
    "font-face-uri",
    "font-face-format",
    "font-face-name",
    "missing-glyph",
];

/// Parent-table label of iteration wrappers.
pub const FOR_EACH_LABEL: &str = "for:each";

lazy_static! {
    static ref KNOWN_HTML_ELEMENTS: HashSet<&'static str> = [
        "a", "abbr", "address", "area", "article", "aside", "audio", "b", "base", "bdi", "bdo",
        "blockquote", "body", "br", "button", "canvas", "caption", "cite", "code", "col",
        "colgroup", "data", "datalist", "dd", "del", "details", "dfn", "dialog", "div", "dl", "dt",
        "em", "embed", "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3",
        "h4", "h5", "h6", "head", "header", "hgroup", "hr", "html", "i", "iframe", "img", "input",
        "ins", "kbd", "label", "legend", "li", "link", "main", "map", "mark", "math", "menu",
        "meta", "meter", "nav", "noscript", "object", "ol", "optgroup", "option", "output", "p",
        "param", "picture", "pre", "progress", "q", "rp", "rt", "ruby", "s", "samp", "script",
        "search", "section", "select", "slot", "small", "source", "span", "strong", "style",
        "sub", "summary", "sup", "svg", "table", "tbody", "td", "template", "textarea", "tfoot",
        "th", "thead", "time", "title", "tr", "track", "u", "ul", "var", "video", "wbr",
    ]
    .into_iter()
    .collect();

    static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").unwrap();
}

/// Native elements whose form state is set as a property.
fn is_native_prop(tag: &str, name: &str) -> bool {
    matches!(
        (tag, name),
        ("input", "value") | ("input", "checked") | ("textarea", "value") | ("select", "value")
    )
}

/// Whitespace policy for text content: whitespace-only text disappears, other
/// runs collapse to a single space. `preserve` (inside `<pre>`/`<textarea>`)
/// keeps the text verbatim.
pub fn normalize_whitespace(text: &str, preserve: bool) -> Option<String> {
    if preserve {
        return (!text.is_empty()).then(|| text.to_string());
    }
    if text.trim().is_empty() {
        return None;
    }
    Some(WHITESPACE_RUN.replace_all(text, " ").into_owned())
}

/// `color: red; margin: 0 !important` → declarations in source order.
pub fn parse_style_declarations(style: &str) -> Vec<StyleDecl> {
    style
        .split(';')
        .filter_map(|decl| {
            let (property, value) = decl.split_once(':')?;
            let property = property.trim().to_ascii_lowercase();
            let mut value = value.trim();
            let mut important = false;
            let cut = value.len().saturating_sub(10);
            if value.get(cut..).is_some_and(|tail| tail.eq_ignore_ascii_case("!important")) {
                value = value[..cut].trim_end();
                important = true;
            }
            if property.is_empty() || value.is_empty() {
                return None;
            }
            Some(StyleDecl {
                property,
                value: value.to_string(),
                important,
            })
        })
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════════
// BUILDER STATE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy)]
struct Scope {
    parent: Option<NodeId>,
    in_iteration: bool,
    /// Nodes built here are rendered once per iteration item.
    iteration_direct: bool,
    svg: bool,
    preserve_whitespace: bool,
}

impl Scope {
    fn child_of(self, id: NodeId) -> Self {
        Scope {
            parent: Some(id),
            iteration_direct: false,
            ..self
        }
    }

    /// Directive wrappers are transparent for iteration keys.
    fn wrapped_by(self, id: NodeId) -> Self {
        Scope {
            parent: Some(id),
            ..self
        }
    }

    fn iteration(self, id: NodeId) -> Self {
        Scope {
            parent: Some(id),
            in_iteration: true,
            iteration_direct: true,
            ..self
        }
    }
}

enum Conditional {
    /// `if:true` / `if:false`
    Legacy { test: Expr, negate: bool },
    If(Expr),
    ElseIf(Expr),
    Else,
}

struct Iteration {
    iterable: Expr,
    item: String,
    index: Option<String>,
}

#[derive(Default)]
struct Directives {
    conditional: Option<Conditional>,
    iteration: Option<Iteration>,
    key: Option<Expr>,
    dynamic: Option<Expr>,
}

struct Builder<'c> {
    ctx: &'c mut CompileContext,
    slot_names: HashMap<String, SourceLocation>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENTRY POINT
// ═══════════════════════════════════════════════════════════════════════════════

/// Build the IR for the children of the root `<template>`.
#[instrument(skip_all)]
pub fn build_ir(document: Vec<DocNode>, ctx: &mut CompileContext) -> Vec<IrNode> {
    let mut significant = document.into_iter().filter(|node| match node {
        DocNode::Text(text) => !text.text.trim().is_empty(),
        DocNode::Comment(_) => false,
        DocNode::Element(_) => true,
    });

    let root = match (significant.next(), significant.next()) {
        (Some(DocNode::Element(root)), None) if root.tag == "template" => root,
        (first, second) => {
            let location = second
                .or(first)
                .map_or(SourceLocation::new(1, 1), |node| node.location());
            ctx.diagnostics.report(
                DiagnosticCode::MissingRootTemplate,
                "expected a single root <template> element",
                location,
            );
            return Vec::new();
        }
    };

    let mut builder = Builder {
        ctx,
        slot_names: HashMap::new(),
    };
    builder.apply_root_attributes(&root.attrs);

    let scope = Scope {
        parent: None,
        in_iteration: false,
        iteration_direct: false,
        svg: builder.ctx.config.namespace == Namespace::SvgHint,
        preserve_whitespace: false,
    };
    let nodes = builder.build_children(root.children, scope);
    debug!(
        nodes = builder.ctx.nodes.len(),
        slots = builder.ctx.slots.len(),
        diagnostics = builder.ctx.diagnostics.len(),
        "ir built"
    );
    nodes
}

impl<'c> Builder<'c> {
    fn error(&mut self, code: DiagnosticCode, message: impl Into<String>, location: SourceLocation) {
        self.ctx.diagnostics.report(code, message, location);
    }

    fn allocate(&mut self, parent: Option<NodeId>, label: impl Into<String>, location: SourceLocation) -> NodeId {
        self.ctx.nodes.allocate(parent, label, location)
    }

    fn apply_root_attributes(&mut self, attrs: &[DocAttr]) {
        for attr in attrs {
            match attr.name.as_str() {
                "lwc:render-mode" => match RenderMode::from_attr(&attr.value) {
                    Some(mode) if attr.quoted || !is_binding(&attr.value) => {
                        self.ctx.config.render_mode = mode;
                    }
                    _ => self.error(
                        DiagnosticCode::InvalidDirectiveUsage,
                        format!("lwc:render-mode must be \"light\" or \"shadow\", got \"{}\"", attr.value),
                        attr.location,
                    ),
                },
                "lwc:preserve-comments" if !attr.has_value => {
                    self.ctx.config.preserve_comments = true;
                }
                name => self.error(
                    DiagnosticCode::InvalidDirectiveUsage,
                    format!("`{}` is not allowed on the root <template>", name),
                    attr.location,
                ),
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // CHILD LISTS
    // ═══════════════════════════════════════════════════════════════════════════

    fn build_children(&mut self, nodes: Vec<DocNode>, scope: Scope) -> Vec<IrNode> {
        let mut out: Vec<IrNode> = Vec::new();
        // Index in `out` of an lwc:if chain that can still take elseif/else.
        let mut open_chain: Option<usize> = None;

        for node in nodes {
            match node {
                DocNode::Text(text) => {
                    if let Some(node) = self.build_text(text, scope) {
                        out.push(node);
                        open_chain = None;
                    }
                }
                DocNode::Comment(comment) => {
                    if self.ctx.config.preserve_comments {
                        let id = self.allocate(scope.parent, "#comment", comment.location);
                        out.push(IrNode {
                            id,
                            location: comment.location,
                            kind: NodeKind::Comment(comment.text),
                        });
                        open_chain = None;
                    }
                }
                DocNode::Element(mut el) => {
                    let mut directives = self.take_directives(&mut el, scope);
                    match directives.conditional.take() {
                        Some(Conditional::If(test)) => {
                            let location = el.location;
                            let id = self.allocate(scope.parent, "lwc:if", location);
                            let children = self.build_content(el, directives, true, scope.wrapped_by(id));
                            out.push(IrNode {
                                id,
                                location,
                                kind: NodeKind::If(IfData {
                                    branches: vec![IfBranch {
                                        test,
                                        negate: false,
                                        children,
                                    }],
                                    otherwise: None,
                                }),
                            });
                            open_chain = Some(out.len() - 1);
                        }
                        Some(branch @ (Conditional::ElseIf(_) | Conditional::Else)) => {
                            let chain = open_chain.map(|i| (i, out[i].id));
                            let is_else = matches!(branch, Conditional::Else);
                            let Some((index, chain_id)) = chain else {
                                let directive = if is_else { "lwc:else" } else { "lwc:elseif" };
                                self.error(
                                    DiagnosticCode::InvalidDirectiveUsage,
                                    format!("{} must immediately follow an lwc:if or lwc:elseif sibling", directive),
                                    el.location,
                                );
                                self.build_content(el, directives, true, scope);
                                continue;
                            };
                            let children = self.build_content(el, directives, true, scope.wrapped_by(chain_id));
                            if let NodeKind::If(data) = &mut out[index].kind {
                                match branch {
                                    Conditional::ElseIf(test) => data.branches.push(IfBranch {
                                        test,
                                        negate: false,
                                        children,
                                    }),
                                    _ => data.otherwise = Some(children),
                                }
                            }
                            if is_else {
                                open_chain = None;
                            }
                        }
                        legacy => {
                            let directed = directives.iteration.is_some() || legacy.is_some();
                            directives.conditional = legacy;
                            out.extend(self.build_content(el, directives, directed, scope));
                            open_chain = None;
                        }
                    }
                }
            }
        }
        out
    }

    fn build_text(&mut self, text: DocText, scope: Scope) -> Option<IrNode> {
        let normalized = normalize_whitespace(&text.text, scope.preserve_whitespace)?;
        let parts = match split_text(&normalized) {
            Ok(parts) => parts,
            Err((_, message)) => {
                self.error(DiagnosticCode::InvalidExpression, message, text.location);
                return None;
            }
        };
        let id = self.allocate(scope.parent, "#text", text.location);
        Some(IrNode {
            id,
            location: text.location,
            kind: NodeKind::Text(parts),
        })
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // DIRECTIVES
    // ═══════════════════════════════════════════════════════════════════════════

    fn binding(&mut self, attr: &DocAttr) -> Option<Expr> {
        if attr.quoted || !is_binding(&attr.value) {
            self.error(
                DiagnosticCode::InvalidExpression,
                format!("`{}` expects an unquoted binding such as {}={{value}}", attr.name, attr.name),
                attr.location,
            );
            return None;
        }
        self.parse_binding(attr)
    }

    fn parse_binding(&mut self, attr: &DocAttr) -> Option<Expr> {
        match parse_expression(binding_body(&attr.value)) {
            Ok(expr) => Some(expr),
            Err(message) => {
                self.error(
                    DiagnosticCode::InvalidExpression,
                    format!("invalid binding for `{}`: {}", attr.name, message),
                    attr.location,
                );
                None
            }
        }
    }

    fn identifier_name(&mut self, attr: &DocAttr) -> Option<String> {
        let name = attr.value.trim();
        if attr.has_value && is_identifier_name(name) {
            Some(name.to_string())
        } else {
            self.error(
                DiagnosticCode::InvalidDirectiveUsage,
                format!("`{}` must name a variable, got \"{}\"", attr.name, attr.value),
                attr.location,
            );
            None
        }
    }

    fn set_conditional(&mut self, directives: &mut Directives, conditional: Conditional, attr: &DocAttr) {
        if directives.conditional.is_some() {
            self.error(
                DiagnosticCode::InvalidDirectiveUsage,
                format!("`{}` conflicts with another conditional directive on the same element", attr.name),
                attr.location,
            );
        } else {
            directives.conditional = Some(conditional);
        }
    }

    /// Strip directive attributes from `el`, validating each.
    fn take_directives(&mut self, el: &mut DocElement, scope: Scope) -> Directives {
        let mut directives = Directives::default();
        let mut each: Option<(Expr, SourceLocation)> = None;
        let mut item: Option<(String, SourceLocation)> = None;
        let mut index: Option<(String, SourceLocation)> = None;
        let mut key: Option<&DocAttr> = None;
        let mut rest = Vec::with_capacity(el.attrs.len());
        let attrs = std::mem::take(&mut el.attrs);

        for attr in &attrs {
            let name = attr.name.as_str();
            match name {
                "if:true" | "if:false" => {
                    self.error(
                        DiagnosticCode::DeprecatedDirective,
                        format!("`{}` is deprecated", name),
                        attr.location,
                    );
                    if let Some(test) = self.binding(attr) {
                        let negate = name == "if:false";
                        self.set_conditional(&mut directives, Conditional::Legacy { test, negate }, attr);
                    }
                }
                "lwc:if" | "lwc:elseif" => {
                    if let Some(test) = self.binding(attr) {
                        let conditional = if name == "lwc:if" {
                            Conditional::If(test)
                        } else {
                            Conditional::ElseIf(test)
                        };
                        self.set_conditional(&mut directives, conditional, attr);
                    }
                }
                "lwc:else" => {
                    if attr.has_value {
                        self.error(
                            DiagnosticCode::InvalidDirectiveUsage,
                            "lwc:else does not take a value",
                            attr.location,
                        );
                    }
                    self.set_conditional(&mut directives, Conditional::Else, attr);
                }
                "for:each" => {
                    if let Some(expr) = self.binding(attr) {
                        each = Some((expr, attr.location));
                    }
                }
                "for:item" => item = self.identifier_name(attr).map(|n| (n, attr.location)),
                "for:index" => index = self.identifier_name(attr).map(|n| (n, attr.location)),
                "key" => key = Some(attr),
                "lwc:dynamic" => directives.dynamic = self.binding(attr),
                "lwc:render-mode" | "lwc:preserve-comments" => self.error(
                    DiagnosticCode::InvalidDirectiveUsage,
                    format!("`{}` is only allowed on the root <template>", name),
                    attr.location,
                ),
                _ if name.starts_with("lwc:") || name.starts_with("if:") || name.starts_with("for:") => {
                    self.error(
                        DiagnosticCode::InvalidDirectiveUsage,
                        format!("unknown directive `{}`", name),
                        attr.location,
                    )
                }
                _ => rest.push(attr.clone()),
            }
        }

        match (each, item) {
            (Some((iterable, _)), Some((item, _))) => {
                directives.iteration = Some(Iteration {
                    iterable,
                    item,
                    index: index.take().map(|(n, _)| n),
                });
            }
            (Some((_, location)), None) => self.error(
                DiagnosticCode::InvalidDirectiveUsage,
                "for:each requires a for:item name",
                location,
            ),
            (None, Some((_, location))) => self.error(
                DiagnosticCode::InvalidDirectiveUsage,
                "for:item is only valid next to for:each",
                location,
            ),
            (None, None) => {}
        }
        if let (None, Some((_, location))) = (&directives.iteration, &index) {
            self.error(
                DiagnosticCode::InvalidDirectiveUsage,
                "for:index is only valid next to for:each",
                *location,
            );
        }

        if let Some(attr) = key {
            if !scope.in_iteration && directives.iteration.is_none() {
                self.error(
                    DiagnosticCode::ReservedAttributeName,
                    "`key` is reserved for elements rendered by an iteration",
                    attr.location,
                );
            } else if attr.quoted || !is_binding(&attr.value) {
                self.error(
                    DiagnosticCode::InvalidExpression,
                    "`key` must be a binding to a value unique per item",
                    attr.location,
                );
            } else {
                directives.key = self.parse_binding(attr);
            }
        }

        el.attrs = rest;
        directives
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // ELEMENTS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Apply iteration and legacy conditionals around the element or the
    /// body of a nested `<template>`.
    fn build_content(&mut self, el: DocElement, mut directives: Directives, directed: bool, scope: Scope) -> Vec<IrNode> {
        if let Some(iteration) = directives.iteration.take() {
            let location = el.location;
            let id = self.allocate(scope.parent, FOR_EACH_LABEL, location);
            let children = self.build_content(el, directives, true, scope.iteration(id));
            return vec![IrNode {
                id,
                location,
                kind: NodeKind::For(ForData {
                    iterable: iteration.iterable,
                    item: iteration.item,
                    index: iteration.index,
                    children,
                }),
            }];
        }

        if let Some(Conditional::Legacy { test, negate }) = directives.conditional.take() {
            let location = el.location;
            let label = if negate { "if:false" } else { "if:true" };
            let id = self.allocate(scope.parent, label, location);
            let children = self.build_content(el, directives, true, scope.wrapped_by(id));
            return vec![IrNode {
                id,
                location,
                kind: NodeKind::If(IfData {
                    branches: vec![IfBranch { test, negate, children }],
                    otherwise: None,
                }),
            }];
        }

        if el.tag == "template" {
            return self.build_template_body(el, directives, directed, scope);
        }
        vec![self.build_tag(el, directives.key, directives.dynamic, scope)]
    }

    fn build_template_body(&mut self, el: DocElement, directives: Directives, directed: bool, scope: Scope) -> Vec<IrNode> {
        if !directed {
            self.error(
                DiagnosticCode::InvalidDirectiveUsage,
                "nested <template> elements need an if, lwc:if or for:each directive",
                el.location,
            );
        }
        if directives.key.is_some() {
            self.error(
                DiagnosticCode::InvalidDirectiveUsage,
                "`key` belongs on the element rendered per item, not on <template>",
                el.location,
            );
        }
        if directives.dynamic.is_some() {
            self.error(
                DiagnosticCode::InvalidDirectiveUsage,
                "lwc:dynamic is only valid on custom elements",
                el.location,
            );
        }
        for attr in &el.attrs {
            self.error(
                DiagnosticCode::InvalidDirectiveUsage,
                format!("<template> only accepts directives, found `{}`", attr.name),
                attr.location,
            );
        }
        self.build_children(el.children, scope)
    }

    fn build_tag(&mut self, el: DocElement, key: Option<Expr>, dynamic: Option<Expr>, scope: Scope) -> IrNode {
        let location = el.location;
        let id = self.allocate(scope.parent, format!("<{}>", el.tag), location);
        if el.tag == "slot" {
            return self.build_slot(el, id, key, dynamic, scope);
        }

        let custom = el.tag.contains('-');
        if custom && RESERVED_TAG_NAMES.contains(&el.tag.as_str()) {
            self.error(
                DiagnosticCode::ReservedTagName,
                format!("<{}> is a reserved element name and cannot be used as a component", el.tag),
                location,
            );
        }
        let namespace = if el.tag == "svg" || scope.svg {
            ElementNamespace::Svg
        } else {
            ElementNamespace::Html
        };
        if !custom && namespace == ElementNamespace::Html && !KNOWN_HTML_ELEMENTS.contains(el.tag.as_str()) {
            self.error(
                DiagnosticCode::UnknownHtmlElement,
                format!("<{}> is not a known HTML element", el.tag),
                location,
            );
        }
        if dynamic.is_some() && !custom {
            self.error(
                DiagnosticCode::InvalidDirectiveUsage,
                format!("lwc:dynamic is only valid on custom elements, not <{}>", el.tag),
                location,
            );
        }
        if scope.iteration_direct && key.is_none() {
            self.error(
                DiagnosticCode::MissingIterationKey,
                format!("<{}> is rendered per item but has no key", el.tag),
                location,
            );
        }

        let mut data = ElementData::new(el.tag.as_str(), namespace);
        data.key = key;
        for attr in el.attrs {
            self.add_attribute(&mut data, attr, custom);
        }

        let child_scope = Scope {
            svg: namespace == ElementNamespace::Svg && data.tag != "foreignObject",
            preserve_whitespace: scope.preserve_whitespace || data.tag == "pre" || data.tag == "textarea",
            ..scope.child_of(id)
        };
        data.children = self.build_children(el.children, child_scope);

        let kind = match dynamic {
            Some(constructor) if custom => NodeKind::Dynamic(DynamicData {
                constructor,
                element: data,
            }),
            _ if custom => NodeKind::Component(data),
            _ => NodeKind::Element(data),
        };
        IrNode { id, location, kind }
    }

    fn build_slot(&mut self, el: DocElement, id: NodeId, key: Option<Expr>, dynamic: Option<Expr>, scope: Scope) -> IrNode {
        let location = el.location;
        let iteration = self
            .ctx
            .nodes
            .ancestors(id)
            .find(|&ancestor| self.ctx.nodes.label(ancestor) == FOR_EACH_LABEL)
            .and_then(|ancestor| self.ctx.nodes.get(ancestor))
            .map(|meta| meta.location);
        if let Some(at) = iteration {
            self.error(
                DiagnosticCode::InvalidDirectiveUsage,
                format!("<slot> cannot be rendered inside the for:each at {}", at),
                location,
            );
        }
        if key.is_some() || dynamic.is_some() {
            self.error(
                DiagnosticCode::InvalidDirectiveUsage,
                "<slot> only accepts the name attribute and conditional directives",
                location,
            );
        }

        let mut name = String::new();
        let mut attrs = Vec::new();
        for attr in el.attrs {
            if attr.name == "name" {
                if is_binding(&attr.value) {
                    self.error(
                        DiagnosticCode::InvalidDirectiveUsage,
                        "slot names must be literal strings",
                        attr.location,
                    );
                } else {
                    name = attr.value.trim().to_string();
                }
                continue;
            }
            if let Some(value) = self.attribute_value(&attr) {
                attrs.push(Attribute::new(attr.name, value, attr.location));
            }
        }

        if let Some(&first) = self.slot_names.get(&name) {
            let shown = if name.is_empty() { "default" } else { name.as_str() };
            let message = format!("duplicate slot name \"{}\", first declared at {}", shown, first);
            self.error(DiagnosticCode::DuplicateSlotName, message, location);
        } else {
            self.slot_names.insert(name.clone(), location);
            self.ctx.slots.push(name.clone());
        }

        let children = self.build_children(el.children, scope.child_of(id));
        IrNode {
            id,
            location,
            kind: NodeKind::Slot(SlotData { name, attrs, children }),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // ATTRIBUTES
    // ═══════════════════════════════════════════════════════════════════════════

    fn attribute_value(&mut self, attr: &DocAttr) -> Option<AttrValue> {
        if is_binding(&attr.value) {
            if attr.quoted {
                self.error(
                    DiagnosticCode::InvalidExpression,
                    format!("binding for `{}` must not be quoted", attr.name),
                    attr.location,
                );
                return None;
            }
            return self.parse_binding(attr).map(AttrValue::Expression);
        }
        if attr.has_value {
            Some(AttrValue::Literal(attr.value.clone()))
        } else {
            Some(AttrValue::Boolean(true))
        }
    }

    fn add_attribute(&mut self, data: &mut ElementData, attr: DocAttr, custom: bool) {
        let Some(value) = self.attribute_value(&attr) else {
            return;
        };
        let name = attr.name.as_str();

        if name == "is" {
            self.error(
                DiagnosticCode::ReservedAttributeName,
                "`is` is reserved; use a custom element tag instead",
                attr.location,
            );
            return;
        }

        if name.len() > 2 && name.starts_with("on") {
            match value {
                AttrValue::Expression(handler) => data.listeners.push(Listener {
                    event: name[2..].to_string(),
                    handler,
                    location: attr.location,
                }),
                _ => self.error(
                    DiagnosticCode::InvalidExpression,
                    format!("event handler `{}` must be a binding such as {}={{handleEvent}}", name, name),
                    attr.location,
                ),
            }
            return;
        }

        match (name, value) {
            ("class", AttrValue::Literal(classes)) => {
                let mut seen = Vec::new();
                for class in classes.split_whitespace() {
                    if !seen.iter().any(|c| c == class) {
                        seen.push(class.to_string());
                    }
                }
                if !seen.is_empty() {
                    data.class = Some(ClassBinding::Static(seen));
                }
            }
            ("class", AttrValue::Expression(expr)) => data.class = Some(ClassBinding::Dynamic(expr)),
            ("style", AttrValue::Literal(style)) => {
                let decls = parse_style_declarations(&style);
                if !decls.is_empty() {
                    data.style = Some(StyleBinding::Static(decls));
                }
            }
            ("style", AttrValue::Expression(expr)) => data.style = Some(StyleBinding::Dynamic(expr)),
            ("class" | "style", AttrValue::Boolean(_)) => {}
            (_, value) if custom => {
                if name.starts_with("data-") || name == "slot" {
                    data.attrs.push(Attribute::new(name, value, attr.location));
                } else {
                    let value = match (name, value) {
                        ("spellcheck", AttrValue::Literal(v)) => AttrValue::Boolean(!v.eq_ignore_ascii_case("false")),
                        (_, value) => value,
                    };
                    data.props.push(Attribute::new(camel_case(name), value, attr.location));
                }
            }
            (_, value) if is_native_prop(&data.tag, name) => {
                data.props.push(Attribute::new(name, value, attr.location));
            }
            (_, value) => data.attrs.push(Attribute::new(name, value, attr.location)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whitespace_policy() {
        assert_eq!(normalize_whitespace("\n   \t", false), None);
        assert_eq!(normalize_whitespace("\n  Hello \n  world  ", false).as_deref(), Some(" Hello world "));
        assert_eq!(normalize_whitespace("  a\n  b", true).as_deref(), Some("  a\n  b"));
    }

    #[test]
    fn test_style_declarations() {
        let decls = parse_style_declarations("color: red; Margin:0 !important;;bogus");
        assert_eq!(
            decls,
            vec![
                StyleDecl {
                    property: "color".to_string(),
                    value: "red".to_string(),
                    important: false,
                },
                StyleDecl {
                    property: "margin".to_string(),
                    value: "0".to_string(),
                    important: true,
                },
            ]
        );
    }

    #[test]
    fn test_style_values_ending_in_multibyte_chars() {
        let decls = parse_style_declarations("font-family: ééééééa; content: 'ü' !IMPORTANT");
        assert_eq!(decls.len(), 2);
        assert_eq!(decls[0].value, "ééééééa");
        assert!(!decls[0].important);
        assert_eq!(decls[1].value, "'ü'");
        assert!(decls[1].important);
    }

    #[test]
    fn test_native_props() {
        assert!(is_native_prop("input", "value"));
        assert!(is_native_prop("input", "checked"));
        assert!(!is_native_prop("input", "type"));
        assert!(!is_native_prop("div", "value"));
    }
}
