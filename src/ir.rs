//! Template intermediate representation.
//!
//! The tree owns its children. Parent links live outside the tree in
//! [`NodeTable`], indexed by [`NodeId`].

use crate::diagnostics::SourceLocation;
use crate::expression::{Expr, TextPart};

pub type NodeId = usize;

#[derive(Debug, Clone, PartialEq)]
pub struct IrNode {
    pub id: NodeId,
    pub location: SourceLocation,
    pub kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Element(ElementData),
    Component(ElementData),
    Slot(SlotData),
    Text(Vec<TextPart>),
    Comment(String),
    If(IfData),
    For(ForData),
    Dynamic(DynamicData),
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Element(_) => "Element",
            NodeKind::Component(_) => "Component",
            NodeKind::Slot(_) => "Slot",
            NodeKind::Text(_) => "Text",
            NodeKind::Comment(_) => "Comment",
            NodeKind::If(_) => "If",
            NodeKind::For(_) => "For",
            NodeKind::Dynamic(_) => "Dynamic",
        }
    }
}

impl IrNode {
    /// Every child list of this node, in document order.
    pub fn child_lists(&self) -> Vec<&Vec<IrNode>> {
        match &self.kind {
            NodeKind::Element(el) | NodeKind::Component(el) => vec![&el.children],
            NodeKind::Dynamic(dynamic) => vec![&dynamic.element.children],
            NodeKind::Slot(slot) => vec![&slot.children],
            NodeKind::If(data) => {
                let mut lists: Vec<&Vec<IrNode>> = data.branches.iter().map(|b| &b.children).collect();
                if let Some(otherwise) = &data.otherwise {
                    lists.push(otherwise);
                }
                lists
            }
            NodeKind::For(data) => vec![&data.children],
            NodeKind::Text(_) | NodeKind::Comment(_) => Vec::new(),
        }
    }

    pub fn child_lists_mut(&mut self) -> Vec<&mut Vec<IrNode>> {
        match &mut self.kind {
            NodeKind::Element(el) | NodeKind::Component(el) => vec![&mut el.children],
            NodeKind::Dynamic(dynamic) => vec![&mut dynamic.element.children],
            NodeKind::Slot(slot) => vec![&mut slot.children],
            NodeKind::If(data) => {
                let mut lists: Vec<&mut Vec<IrNode>> =
                    data.branches.iter_mut().map(|b| &mut b.children).collect();
                if let Some(otherwise) = &mut data.otherwise {
                    lists.push(otherwise);
                }
                lists
            }
            NodeKind::For(data) => vec![&mut data.children],
            NodeKind::Text(_) | NodeKind::Comment(_) => Vec::new(),
        }
    }

    pub fn element(&self) -> Option<&ElementData> {
        match &self.kind {
            NodeKind::Element(el) | NodeKind::Component(el) => Some(el),
            NodeKind::Dynamic(dynamic) => Some(&dynamic.element),
            _ => None,
        }
    }

    /// Nodes that receive a reconciliation key.
    pub fn is_keyed(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Element(_) | NodeKind::Component(_) | NodeKind::Slot(_) | NodeKind::Dynamic(_)
        )
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ELEMENT DATA
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementNamespace {
    Html,
    Svg,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElementData {
    pub tag: String,
    pub namespace: ElementNamespace,
    pub attrs: Vec<Attribute>,
    pub props: Vec<Attribute>,
    pub class: Option<ClassBinding>,
    pub style: Option<StyleBinding>,
    pub listeners: Vec<Listener>,
    /// `key={...}` on a direct child of an iteration.
    pub key: Option<Expr>,
    pub children: Vec<IrNode>,
}

impl ElementData {
    pub fn new(tag: impl Into<String>, namespace: ElementNamespace) -> Self {
        Self {
            tag: tag.into(),
            namespace,
            attrs: Vec::new(),
            props: Vec::new(),
            class: None,
            style: None,
            listeners: Vec::new(),
            key: None,
            children: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&Attribute> {
        self.attrs.iter().find(|a| a.name == name)
    }

    /// Literal `slot="..."` naming the projection target in a parent component.
    pub fn slot_target(&self) -> Option<&str> {
        match self.attr("slot").map(|a| &a.value) {
            Some(AttrValue::Literal(name)) => Some(name),
            _ => None,
        }
    }

    pub fn has_bound_expression(&self) -> bool {
        self.attrs.iter().chain(self.props.iter()).any(|a| a.value.is_expression())
            || matches!(self.class, Some(ClassBinding::Dynamic(_)))
            || matches!(self.style, Some(StyleBinding::Dynamic(_)))
            || !self.listeners.is_empty()
            || self.key.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: AttrValue,
    pub location: SourceLocation,
    /// Filled in by the scoping resolver.
    pub scoping: Option<ScopedKind>,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: AttrValue, location: SourceLocation) -> Self {
        Self {
            name: name.into(),
            value,
            location,
            scoping: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Literal(String),
    Boolean(bool),
    Expression(Expr),
}

impl AttrValue {
    pub fn is_expression(&self) -> bool {
        matches!(self, AttrValue::Expression(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopedKind {
    /// `id` and id references (`for`, `aria-*`).
    Id,
    /// Same-document fragment URL (`href="#x"`).
    Fragment,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClassBinding {
    Static(Vec<String>),
    Dynamic(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StyleDecl {
    pub property: String,
    pub value: String,
    pub important: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StyleBinding {
    Static(Vec<StyleDecl>),
    Dynamic(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Listener {
    pub event: String,
    pub handler: Expr,
    pub location: SourceLocation,
}

// ═══════════════════════════════════════════════════════════════════════════════
// SLOTS & DIRECTIVES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub struct SlotData {
    /// `""` for the default slot.
    pub name: String,
    pub attrs: Vec<Attribute>,
    /// Fallback content.
    pub children: Vec<IrNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfBranch {
    pub test: Expr,
    /// `if:false`.
    pub negate: bool,
    pub children: Vec<IrNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfData {
    pub branches: Vec<IfBranch>,
    pub otherwise: Option<Vec<IrNode>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForData {
    pub iterable: Expr,
    pub item: String,
    pub index: Option<String>,
    pub children: Vec<IrNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DynamicData {
    pub constructor: Expr,
    pub element: ElementData,
}

// ═══════════════════════════════════════════════════════════════════════════════
// PARENT TABLE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct NodeMeta {
    pub parent: Option<NodeId>,
    /// Short description such as `<li>` or `for:each`, used in messages.
    pub label: String,
    pub location: SourceLocation,
}

/// Non-owning parent relation for every node of one template.
#[derive(Debug, Default, Clone)]
pub struct NodeTable {
    nodes: Vec<NodeMeta>,
}

impl NodeTable {
    pub fn allocate(&mut self, parent: Option<NodeId>, label: impl Into<String>, location: SourceLocation) -> NodeId {
        self.nodes.push(NodeMeta {
            parent,
            label: label.into(),
            location,
        });
        self.nodes.len() - 1
    }

    pub fn get(&self, id: NodeId) -> Option<&NodeMeta> {
        self.nodes.get(id)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|meta| meta.parent)
    }

    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&current| self.parent(current))
    }

    pub fn label(&self, id: NodeId) -> &str {
        self.nodes.get(id).map_or("<unknown>", |meta| meta.label.as_str())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Pre-order walk over a node list.
pub fn walk<'a>(nodes: &'a [IrNode], visit: &mut dyn FnMut(&'a IrNode)) {
    for node in nodes {
        visit(node);
        for list in node.child_lists() {
            walk(list, visit);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ancestors_walk_up_to_the_root() {
        let mut table = NodeTable::default();
        let loc = SourceLocation::new(1, 1);
        let root = table.allocate(None, "<ul>", loc);
        let each = table.allocate(Some(root), "for:each", loc);
        let li = table.allocate(Some(each), "<li>", loc);
        assert_eq!(table.ancestors(li).collect::<Vec<_>>(), vec![each, root]);
        assert_eq!(table.label(each), "for:each");
        assert_eq!(table.parent(root), None);
    }

    #[test]
    fn walk_is_pre_order() {
        let loc = SourceLocation::new(1, 1);
        let leaf = |id| IrNode {
            id,
            location: loc,
            kind: NodeKind::Comment(String::new()),
        };
        let mut parent = ElementData::new("div", ElementNamespace::Html);
        parent.children = vec![leaf(1), leaf(2)];
        let tree = vec![
            IrNode {
                id: 0,
                location: loc,
                kind: NodeKind::Element(parent),
            },
            leaf(3),
        ];
        let mut seen = Vec::new();
        walk(&tree, &mut |node| seen.push(node.id));
        assert_eq!(seen, vec![0, 1, 2, 3]);
    }
}
