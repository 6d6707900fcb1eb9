//! Code generator.
//!
//! Turns the analyzed IR into an ES module exporting a registered render
//! function:
//!
//! ```text
//! import _xFoo from "x/foo";
//! import { parseFragment, registerTemplate } from "lwc";
//! const $fragment1 = parseFragment`<p>static</p>`;
//! const stc0 = { key: 1 };
//! function tmpl($api, $cmp, $slotset, $ctx) {
//!   const { st: api_static_fragment, c: api_custom_element } = $api;
//!   return [api_static_fragment($fragment1(), 0, 64), api_custom_element("x-foo", _xFoo, stc0, undefined, 0)];
//! }
//! export default registerTemplate(tmpl);
//! tmpl.stylesheets = [];
//! ```

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, error, instrument};

use crate::analyze::{Analysis, NodeAnalysis};
use crate::builder::FOR_EACH_LABEL;
use crate::config::RenderMode;
use crate::context::{CompileContext, HoistKind};
use crate::diagnostics::CompileError;
use crate::expression::{quote, Expr, TextPart};
use crate::ir::{
    AttrValue, Attribute, ClassBinding, ElementData, ElementNamespace, IfData, IrNode, NodeId,
    NodeKind, ScopedKind, StyleBinding,
};
use crate::js::{escape_template_literal, Js};
use crate::parse::is_void_element;

const PASS: &str = "codegen";

// ═══════════════════════════════════════════════════════════════════════════════
// RUNTIME API SURFACE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeHelper {
    Element,
    Text,
    DynamicText,
    CustomElement,
    DynamicComponent,
    Slot,
    StaticFragment,
    ScopedId,
    ScopedFragId,
    NormalizeClassName,
    Bind,
    Key,
    Iterator,
    Flatten,
    Comment,
}

impl RuntimeHelper {
    /// Property name on the `$api` argument.
    pub fn short_name(self) -> &'static str {
        match self {
            RuntimeHelper::Element => "h",
            RuntimeHelper::Text => "t",
            RuntimeHelper::DynamicText => "d",
            RuntimeHelper::CustomElement => "c",
            RuntimeHelper::DynamicComponent => "dc",
            RuntimeHelper::Slot => "s",
            RuntimeHelper::StaticFragment => "st",
            RuntimeHelper::ScopedId => "gid",
            RuntimeHelper::ScopedFragId => "fid",
            RuntimeHelper::NormalizeClassName => "ncls",
            RuntimeHelper::Bind => "b",
            RuntimeHelper::Key => "k",
            RuntimeHelper::Iterator => "i",
            RuntimeHelper::Flatten => "f",
            RuntimeHelper::Comment => "co",
        }
    }

    pub fn local_name(self) -> &'static str {
        match self {
            RuntimeHelper::Element => "api_element",
            RuntimeHelper::Text => "api_text",
            RuntimeHelper::DynamicText => "api_dynamic_text",
            RuntimeHelper::CustomElement => "api_custom_element",
            RuntimeHelper::DynamicComponent => "api_dynamic_component",
            RuntimeHelper::Slot => "api_slot",
            RuntimeHelper::StaticFragment => "api_static_fragment",
            RuntimeHelper::ScopedId => "api_scoped_id",
            RuntimeHelper::ScopedFragId => "api_scoped_frag_id",
            RuntimeHelper::NormalizeClassName => "api_normalize_class_name",
            RuntimeHelper::Bind => "api_bind",
            RuntimeHelper::Key => "api_key",
            RuntimeHelper::Iterator => "api_iterator",
            RuntimeHelper::Flatten => "api_flatten",
            RuntimeHelper::Comment => "api_comment",
        }
    }

    pub fn arity(self) -> usize {
        match self {
            RuntimeHelper::Element => 4,
            RuntimeHelper::CustomElement | RuntimeHelper::DynamicComponent | RuntimeHelper::Slot => 5,
            RuntimeHelper::StaticFragment => 3,
            RuntimeHelper::Key | RuntimeHelper::Iterator => 2,
            RuntimeHelper::Text
            | RuntimeHelper::DynamicText
            | RuntimeHelper::ScopedId
            | RuntimeHelper::ScopedFragId
            | RuntimeHelper::NormalizeClassName
            | RuntimeHelper::Bind
            | RuntimeHelper::Flatten
            | RuntimeHelper::Comment => 1,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// GENERATOR
// ═══════════════════════════════════════════════════════════════════════════════

struct Generator<'a> {
    ctx: &'a mut CompileContext,
    analysis: &'a Analysis,
    helpers: IndexSet<RuntimeHelper>,
    memos: Vec<String>,
    /// Names bound by enclosing iterations.
    locals: Vec<String>,
}

/// Emit the module for an analyzed template.
#[instrument(skip_all)]
pub fn generate(
    nodes: &[IrNode],
    analysis: &Analysis,
    ctx: &mut CompileContext,
    stylesheet_token: Option<&str>,
) -> Result<String, CompileError> {
    let mut generator = Generator {
        ctx,
        analysis,
        helpers: IndexSet::new(),
        memos: Vec::new(),
        locals: Vec::new(),
    };
    let body = generator.list(nodes).map_err(|err| {
        error!(%err, "code generation failed");
        err
    })?;
    let code = generator.module(body, stylesheet_token);
    debug!(
        helpers = generator.helpers.len(),
        hoists = generator.ctx.hoists.len(),
        bytes = code.len(),
        "module generated"
    );
    Ok(code)
}

impl<'a> Generator<'a> {
    fn use_helper(&mut self, helper: RuntimeHelper) {
        self.helpers.insert(helper);
    }

    fn call(&mut self, helper: RuntimeHelper, args: Vec<Js>) -> Result<Js, CompileError> {
        if args.len() != helper.arity() {
            return Err(CompileError::internal(
                PASS,
                format!(
                    "{} expects {} arguments, got {}",
                    helper.local_name(),
                    helper.arity(),
                    args.len()
                ),
            ));
        }
        self.use_helper(helper);
        Ok(Js::call(helper.local_name(), args))
    }

    fn info(&self, node: &IrNode) -> Result<NodeAnalysis, CompileError> {
        self.analysis.get(node.id).copied().ok_or_else(|| {
            CompileError::internal(
                PASS,
                format!("{} node {} reached codegen without analysis", node.kind.name(), node.id),
            )
        })
    }

    fn key(&self, node: &IrNode, info: &NodeAnalysis) -> Result<u32, CompileError> {
        info.key.ok_or_else(|| {
            CompileError::internal(PASS, format!("{} node {} has no key", node.kind.name(), node.id))
        })
    }

    fn expr(&self, expr: &Expr) -> Js {
        Js::Raw(expr.to_js(&self.locals))
    }

    fn in_iteration(&self, id: NodeId) -> bool {
        self.ctx
            .nodes
            .ancestors(id)
            .any(|ancestor| self.ctx.nodes.label(ancestor) == FOR_EACH_LABEL)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // NODES
    // ═══════════════════════════════════════════════════════════════════════════

    fn list<'n>(&mut self, nodes: impl IntoIterator<Item = &'n IrNode>) -> Result<Js, CompileError> {
        let nodes: Vec<&IrNode> = nodes.into_iter().collect();
        let needs_flatten = nodes
            .iter()
            .any(|node| matches!(node.kind, NodeKind::If(_) | NodeKind::For(_)));
        if needs_flatten {
            self.use_helper(RuntimeHelper::Flatten);
        }
        let mut items = Vec::with_capacity(nodes.len());
        for node in nodes {
            items.push(self.node(node)?);
        }
        if needs_flatten {
            return self.call(RuntimeHelper::Flatten, vec![Js::Array(items)]);
        }
        Ok(Js::Array(items))
    }

    fn node(&mut self, node: &IrNode) -> Result<Js, CompileError> {
        let info = self.info(node)?;
        if info.fragment_root {
            return self.fragment(node, &info);
        }
        let flags = Js::Number(info.flags);

        match &node.kind {
            NodeKind::Element(el) => {
                self.use_helper(RuntimeHelper::Element);
                let data = self.options(node, el, &info)?;
                let children = self.list(&el.children)?;
                self.call(RuntimeHelper::Element, vec![Js::Str(el.tag.clone()), data, children, flags])
            }
            NodeKind::Component(el) => {
                self.use_helper(RuntimeHelper::CustomElement);
                let constructor = self.ctx.imports.local_for(&el.tag).map(Js::raw).ok_or_else(|| {
                    CompileError::internal(PASS, format!("<{}> has no import binding", el.tag))
                })?;
                let data = self.options(node, el, &info)?;
                let slotted = self.slotted(&el.children)?;
                self.call(
                    RuntimeHelper::CustomElement,
                    vec![Js::Str(el.tag.clone()), constructor, data, slotted, flags],
                )
            }
            NodeKind::Dynamic(dynamic) => {
                self.use_helper(RuntimeHelper::DynamicComponent);
                let el = &dynamic.element;
                let constructor = self.expr(&dynamic.constructor);
                let data = self.options(node, el, &info)?;
                let slotted = self.slotted(&el.children)?;
                self.call(
                    RuntimeHelper::DynamicComponent,
                    vec![Js::Str(el.tag.clone()), constructor, data, slotted, flags],
                )
            }
            NodeKind::Slot(slot) => {
                self.use_helper(RuntimeHelper::Slot);
                let mut entries = Vec::new();
                if !slot.attrs.is_empty() {
                    entries.push(("attrs".to_string(), self.attr_bag(&slot.attrs, false)?));
                }
                entries.push(("key".to_string(), Js::Number(self.key(node, &info)?)));
                let data = self.hoist_options(entries);
                let fallback = self.list(&slot.children)?;
                self.call(
                    RuntimeHelper::Slot,
                    vec![Js::Str(slot.name.clone()), data, fallback, Js::raw("$slotset"), flags],
                )
            }
            NodeKind::Text(parts) => self.text(parts),
            NodeKind::Comment(text) => self.call(RuntimeHelper::Comment, vec![Js::Str(text.clone())]),
            NodeKind::If(data) => self.conditional(data),
            NodeKind::For(data) => {
                self.use_helper(RuntimeHelper::Iterator);
                let iterable = self.expr(&data.iterable);
                let mut params = vec![data.item.clone()];
                params.extend(data.index.clone());
                let pushed = params.len();
                self.locals.extend(params.iter().cloned());
                let body = self.list(&data.children);
                self.locals.truncate(self.locals.len() - pushed);
                let body = body?;
                self.call(
                    RuntimeHelper::Iterator,
                    vec![iterable, Js::Function { params, body: Box::new(body) }],
                )
            }
        }
    }

    fn conditional(&mut self, data: &IfData) -> Result<Js, CompileError> {
        let mut branches = Vec::with_capacity(data.branches.len());
        for branch in &data.branches {
            let test = branch.test.to_js(&self.locals);
            let test = if branch.negate { format!("!{}", test) } else { test };
            branches.push((test, self.list(&branch.children)?));
        }
        let mut alternate = match &data.otherwise {
            Some(children) => self.list(children)?,
            None => Js::Array(Vec::new()),
        };
        for (test, consequent) in branches.into_iter().rev() {
            alternate = Js::Conditional(Box::new(Js::Raw(test)), Box::new(consequent), Box::new(alternate));
        }
        Ok(alternate)
    }

    fn text(&mut self, parts: &[TextPart]) -> Result<Js, CompileError> {
        self.use_helper(RuntimeHelper::Text);
        let mut pieces = Vec::with_capacity(parts.len());
        for part in parts {
            pieces.push(match part {
                TextPart::Literal(text) => Js::Str(text.clone()),
                TextPart::Expression(expr) => {
                    let value = self.expr(expr);
                    self.call(RuntimeHelper::DynamicText, vec![value])?
                }
            });
        }
        let content = match pieces.len() {
            1 => pieces.remove(0),
            _ => Js::Concat(pieces),
        };
        self.call(RuntimeHelper::Text, vec![content])
    }

    /// Children of a component grouped by target slot, each behind a generator.
    fn slotted(&mut self, children: &[IrNode]) -> Result<Js, CompileError> {
        if children.is_empty() {
            return Ok(Js::Undefined);
        }
        let mut groups: IndexMap<String, Vec<&IrNode>> = IndexMap::new();
        for child in children {
            groups.entry(projected_slot(child).to_string()).or_default().push(child);
        }
        let mut entries = Vec::with_capacity(groups.len());
        for (name, nodes) in groups {
            let content = self.list(nodes)?;
            entries.push((name, Js::Arrow(Box::new(content))));
        }
        Ok(Js::Object(entries))
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // OPTIONS OBJECTS
    // ═══════════════════════════════════════════════════════════════════════════

    fn options(&mut self, node: &IrNode, el: &ElementData, info: &NodeAnalysis) -> Result<Js, CompileError> {
        let mut entries: Vec<(String, Js)> = Vec::new();
        if !el.attrs.is_empty() {
            entries.push(("attrs".to_string(), self.attr_bag(&el.attrs, false)?));
        }
        if !el.props.is_empty() {
            entries.push(("props".to_string(), self.attr_bag(&el.props, true)?));
        }
        match &el.class {
            Some(ClassBinding::Static(classes)) => {
                let map = classes.iter().map(|c| (c.clone(), Js::Bool(true))).collect();
                entries.push(("classMap".to_string(), Js::Object(map)));
            }
            Some(ClassBinding::Dynamic(expr)) => {
                let value = self.expr(expr);
                let normalized = self.call(RuntimeHelper::NormalizeClassName, vec![value])?;
                entries.push(("className".to_string(), normalized));
            }
            None => {}
        }
        match &el.style {
            Some(StyleBinding::Static(decls)) => {
                let decls = decls
                    .iter()
                    .map(|d| {
                        Js::Array(vec![
                            Js::Str(d.property.clone()),
                            Js::Str(d.value.clone()),
                            Js::Bool(d.important),
                        ])
                    })
                    .collect();
                entries.push(("styleDecls".to_string(), Js::Array(decls)));
            }
            Some(StyleBinding::Dynamic(expr)) => entries.push(("style".to_string(), self.expr(expr))),
            None => {}
        }
        if el.namespace == ElementNamespace::Svg {
            entries.push(("svg".to_string(), Js::Bool(true)));
        }

        let key = Js::Number(self.key(node, info)?);
        let key = match &el.key {
            Some(expr) => {
                let value = self.expr(expr);
                self.call(RuntimeHelper::Key, vec![key, value])?
            }
            None => key,
        };
        entries.push(("key".to_string(), key));

        if !el.listeners.is_empty() {
            let memoize = !self.in_iteration(node.id);
            let mut handlers = Vec::with_capacity(el.listeners.len());
            for listener in &el.listeners {
                let handler = self.expr(&listener.handler);
                let bound = self.call(RuntimeHelper::Bind, vec![handler])?;
                let value = if memoize {
                    let name = format!("_m{}", self.memos.len());
                    let memoized = format!("{} || ($ctx.{} = {})", name, name, bound);
                    self.memos.push(name);
                    Js::Raw(memoized)
                } else {
                    bound
                };
                handlers.push((listener.event.clone(), value));
            }
            entries.push(("on".to_string(), Js::Object(handlers)));
        }

        Ok(self.hoist_options(entries))
    }

    /// Hoist the whole options object when it is literal, otherwise hoist
    /// each literal bag on its own.
    fn hoist_options(&mut self, mut entries: Vec<(String, Js)>) -> Js {
        let object = Js::Object(entries.clone());
        if object.is_literal() {
            return Js::Raw(self.ctx.hoists.object(object.to_string()));
        }
        for (name, value) in entries.iter_mut() {
            let bag = matches!(name.as_str(), "attrs" | "props" | "classMap" | "styleDecls");
            if bag && value.is_literal() && !value.is_empty_container() {
                *value = Js::Raw(self.ctx.hoists.object(value.to_string()));
            }
        }
        Js::Object(entries)
    }

    fn attr_bag(&mut self, attrs: &[Attribute], as_props: bool) -> Result<Js, CompileError> {
        let mut entries = Vec::with_capacity(attrs.len());
        for attr in attrs {
            let value = match &attr.value {
                AttrValue::Literal(value) => Js::Str(value.clone()),
                AttrValue::Boolean(true) if !as_props => Js::Str(String::new()),
                AttrValue::Boolean(b) => Js::Bool(*b),
                AttrValue::Expression(expr) => self.expr(expr),
            };
            let value = match attr.scoping {
                Some(ScopedKind::Id) => self.call(RuntimeHelper::ScopedId, vec![value])?,
                Some(ScopedKind::Fragment) => self.call(RuntimeHelper::ScopedFragId, vec![value])?,
                None => value,
            };
            entries.push((attr.name.clone(), value));
        }
        Ok(Js::Object(entries))
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // STATIC FRAGMENTS
    // ═══════════════════════════════════════════════════════════════════════════

    fn fragment(&mut self, node: &IrNode, info: &NodeAnalysis) -> Result<Js, CompileError> {
        self.use_helper(RuntimeHelper::StaticFragment);
        let mut html = String::new();
        serialize_static(node, &mut html)?;
        let name = self.ctx.hoists.fragment(html);
        let key = self.key(node, info)?;
        self.call(
            RuntimeHelper::StaticFragment,
            vec![Js::Raw(format!("{}()", name)), Js::Number(key), Js::Number(info.flags)],
        )
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // MODULE
    // ═══════════════════════════════════════════════════════════════════════════

    fn module(&self, body: Js, stylesheet_token: Option<&str>) -> String {
        let config = &self.ctx.config;
        let mut out = String::new();

        for import in self.ctx.imports.iter() {
            out.push_str(&format!("import {} from {};\n", import.local, quote(&import.path)));
        }
        for (i, sheet) in config.stylesheets.iter().enumerate() {
            out.push_str(&format!("import _stylesheet{} from {};\n", i, quote(sheet)));
        }
        let runtime_imports = if self.ctx.hoists.has_fragments() {
            "parseFragment, registerTemplate"
        } else {
            "registerTemplate"
        };
        out.push_str(&format!(
            "import {{ {} }} from {};\n",
            runtime_imports,
            quote(&config.runtime_module)
        ));

        for (kind, content, name) in self.ctx.hoists.iter() {
            match kind {
                HoistKind::Object => out.push_str(&format!("const {} = {};\n", name, content)),
                HoistKind::Fragment => out.push_str(&format!(
                    "const {} = parseFragment`{}`;\n",
                    name,
                    escape_template_literal(content)
                )),
            }
        }

        out.push_str("function tmpl($api, $cmp, $slotset, $ctx) {\n");
        if !self.helpers.is_empty() {
            let bindings: Vec<String> = self
                .helpers
                .iter()
                .map(|h| format!("{}: {}", h.short_name(), h.local_name()))
                .collect();
            out.push_str(&format!("  const {{ {} }} = $api;\n", bindings.join(", ")));
        }
        if !self.memos.is_empty() {
            out.push_str(&format!("  const {{ {} }} = $ctx;\n", self.memos.join(", ")));
        }
        out.push_str(&format!("  return {};\n", body));
        out.push_str("}\n");

        out.push_str("export default registerTemplate(tmpl);\n");
        if !self.ctx.slots.is_empty() {
            let slots: Vec<String> = self.ctx.slots.iter().map(|s| quote(s)).collect();
            out.push_str(&format!("tmpl.slots = [{}];\n", slots.join(", ")));
        }
        let sheets: Vec<String> = (0..config.stylesheets.len())
            .map(|i| format!("_stylesheet{}", i))
            .collect();
        out.push_str(&format!("tmpl.stylesheets = [{}];\n", sheets.join(", ")));
        if config.render_mode == RenderMode::Light {
            out.push_str("tmpl.renderMode = \"light\";\n");
        }
        if let Some(token) = stylesheet_token {
            out.push_str(&format!("tmpl.stylesheetToken = {};\n", quote(token)));
        }
        out
    }
}

/// Slot a child of a component is projected into. Directive wrappers take
/// the target of their first rendered element.
fn projected_slot(node: &IrNode) -> &str {
    match &node.kind {
        NodeKind::Element(el) | NodeKind::Component(el) => el.slot_target().unwrap_or(""),
        NodeKind::Dynamic(dynamic) => dynamic.element.slot_target().unwrap_or(""),
        NodeKind::Slot(slot) => slot
            .attrs
            .iter()
            .find_map(|a| match (&a.name[..], &a.value) {
                ("slot", AttrValue::Literal(name)) => Some(name.as_str()),
                _ => None,
            })
            .unwrap_or(""),
        NodeKind::If(_) | NodeKind::For(_) => node
            .child_lists()
            .into_iter()
            .flatten()
            .next()
            .map_or("", projected_slot),
        NodeKind::Text(_) | NodeKind::Comment(_) => "",
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HTML SERIALIZATION
// ═══════════════════════════════════════════════════════════════════════════════

fn escape_html(text: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' if attribute => out.push_str("&quot;"),
            '<' if !attribute => out.push_str("&lt;"),
            '>' if !attribute => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

fn serialize_static(node: &IrNode, out: &mut String) -> Result<(), CompileError> {
    match &node.kind {
        NodeKind::Element(el) => {
            out.push('<');
            out.push_str(&el.tag);
            for attr in &el.attrs {
                match &attr.value {
                    AttrValue::Literal(value) => {
                        out.push_str(&format!(" {}=\"{}\"", attr.name, escape_html(value, true)))
                    }
                    AttrValue::Boolean(true) => out.push_str(&format!(" {}", attr.name)),
                    AttrValue::Boolean(false) => {}
                    AttrValue::Expression(_) => {
                        return Err(CompileError::internal(
                            PASS,
                            format!("bound attribute `{}` inside a static fragment", attr.name),
                        ))
                    }
                }
            }
            if let Some(ClassBinding::Static(classes)) = &el.class {
                out.push_str(&format!(" class=\"{}\"", escape_html(&classes.join(" "), true)));
            }
            if let Some(StyleBinding::Static(decls)) = &el.style {
                let style: Vec<String> = decls
                    .iter()
                    .map(|d| {
                        let important = if d.important { " !important" } else { "" };
                        format!("{}: {}{};", d.property, d.value, important)
                    })
                    .collect();
                out.push_str(&format!(" style=\"{}\"", escape_html(&style.join(" "), true)));
            }
            out.push('>');
            if is_void_element(&el.tag) {
                return Ok(());
            }
            for child in &el.children {
                serialize_static(child, out)?;
            }
            out.push_str(&format!("</{}>", el.tag));
            Ok(())
        }
        NodeKind::Text(parts) => {
            for part in parts {
                match part {
                    TextPart::Literal(text) => out.push_str(&escape_html(text, false)),
                    TextPart::Expression(_) => {
                        return Err(CompileError::internal(PASS, "bound text inside a static fragment"))
                    }
                }
            }
            Ok(())
        }
        NodeKind::Comment(text) => {
            out.push_str(&format!("<!--{}-->", text));
            Ok(())
        }
        other => Err(CompileError::internal(
            PASS,
            format!("{} node {} inside a static fragment", other.name(), node.id),
        )),
    }
}
