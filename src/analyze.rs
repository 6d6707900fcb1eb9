//! Static analyzer.
//!
//! One depth-first traversal assigns keys on the way down (pre-order) and
//! computes flags and staticness on the way up. A second, top-down pass
//! picks the top-most static elements as static fragments.

use tracing::{debug, instrument};

use crate::context::CompileContext;
use crate::expression::TextPart;
use crate::ir::{ElementData, ElementNamespace, IrNode, NodeId, NodeKind};
use crate::scope::needs_scoping;

/// Render hints passed to the runtime as the trailing numeric argument.
pub mod flags {
    pub const HAS_ATTRS: u32 = 1;
    pub const HAS_CLASSES: u32 = 1 << 1;
    pub const HAS_STYLE: u32 = 1 << 2;
    pub const HAS_LISTENERS: u32 = 1 << 3;
    pub const HAS_SLOTS: u32 = 1 << 4;
    pub const IS_SVG: u32 = 1 << 5;
    pub const IS_STATIC: u32 = 1 << 6;
    pub const DESCENDANT_DYNAMIC: u32 = 1 << 7;
    pub const HAS_PROPS: u32 = 1 << 8;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeAnalysis {
    pub key: Option<u32>,
    pub flags: u32,
    pub is_static: bool,
    /// The node itself carries a binding, directive or slot.
    pub is_dynamic: bool,
    /// Rendered through a hoisted static fragment.
    pub fragment_root: bool,
}

impl NodeAnalysis {
    pub fn has(&self, flag: u32) -> bool {
        self.flags & flag != 0
    }
}

/// Analysis results indexed by [`NodeId`].
#[derive(Debug, Default)]
pub struct Analysis {
    nodes: Vec<Option<NodeAnalysis>>,
    key_count: u32,
}

impl Analysis {
    pub fn get(&self, id: NodeId) -> Option<&NodeAnalysis> {
        self.nodes.get(id).and_then(Option::as_ref)
    }

    pub fn key_count(&self) -> u32 {
        self.key_count
    }

    fn set(&mut self, id: NodeId, analysis: NodeAnalysis) {
        if self.nodes.len() <= id {
            self.nodes.resize(id + 1, None);
        }
        self.nodes[id] = Some(analysis);
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut NodeAnalysis> {
        self.nodes.get_mut(id).and_then(Option::as_mut)
    }
}

struct Subtree {
    is_static: bool,
    /// This node or any descendant is dynamic.
    dynamic_within: bool,
}

struct Analyzer<'c> {
    ctx: &'c CompileContext,
    result: Analysis,
}

#[instrument(skip_all)]
pub fn analyze(nodes: &[IrNode], ctx: &CompileContext) -> Analysis {
    let mut analyzer = Analyzer {
        ctx,
        result: Analysis::default(),
    };
    for node in nodes {
        analyzer.visit(node);
    }
    let mut result = analyzer.result;
    let mut fragments = 0;
    if ctx.config.enable_static_content_optimization {
        mark_fragments(nodes, &mut result, &mut fragments);
    }
    debug!(keys = result.key_count, fragments, "analysis complete");
    result
}

impl<'c> Analyzer<'c> {
    fn visit(&mut self, node: &IrNode) -> Subtree {
        let key = node.is_keyed().then(|| {
            let key = self.result.key_count;
            self.result.key_count += 1;
            key
        });

        let mut children_static = true;
        let mut descendant_dynamic = false;
        for list in node.child_lists() {
            for child in list {
                let summary = self.visit(child);
                children_static &= summary.is_static;
                descendant_dynamic |= summary.dynamic_within;
            }
        }

        let (mut node_flags, is_dynamic, scoped) = match &node.kind {
            NodeKind::Element(el) => (self.element_flags(el), el.has_bound_expression(), self.has_scoped_attr(el)),
            NodeKind::Component(el) => (self.component_flags(el), el.has_bound_expression(), false),
            NodeKind::Dynamic(dynamic) => (self.component_flags(&dynamic.element), true, false),
            NodeKind::Slot(slot) => {
                let attrs = if slot.attrs.is_empty() { 0 } else { flags::HAS_ATTRS };
                (flags::HAS_SLOTS | attrs, true, false)
            }
            NodeKind::Text(parts) => (
                0,
                parts.iter().any(|part| matches!(part, TextPart::Expression(_))),
                false,
            ),
            NodeKind::Comment(_) => (0, false, false),
            NodeKind::If(_) | NodeKind::For(_) => (0, true, false),
        };

        let is_static = matches!(
            node.kind,
            NodeKind::Element(_) | NodeKind::Text(_) | NodeKind::Comment(_)
        ) && !is_dynamic
            && !scoped
            && node_flags & flags::HAS_PROPS == 0
            && children_static;

        if descendant_dynamic {
            node_flags |= flags::DESCENDANT_DYNAMIC;
        }
        if is_static {
            node_flags |= flags::IS_STATIC;
        }

        self.result.set(
            node.id,
            NodeAnalysis {
                key,
                flags: node_flags,
                is_static,
                is_dynamic,
                fragment_root: false,
            },
        );
        Subtree {
            is_static,
            dynamic_within: is_dynamic || descendant_dynamic,
        }
    }

    fn element_flags(&self, el: &ElementData) -> u32 {
        let mut bits = 0;
        if !el.attrs.is_empty() {
            bits |= flags::HAS_ATTRS;
        }
        if !el.props.is_empty() {
            bits |= flags::HAS_PROPS;
        }
        if el.class.is_some() {
            bits |= flags::HAS_CLASSES;
        }
        if el.style.is_some() {
            bits |= flags::HAS_STYLE;
        }
        if !el.listeners.is_empty() {
            bits |= flags::HAS_LISTENERS;
        }
        if el.namespace == ElementNamespace::Svg {
            bits |= flags::IS_SVG;
        }
        bits
    }

    fn component_flags(&self, el: &ElementData) -> u32 {
        let mut bits = self.element_flags(el);
        if !el.children.is_empty() {
            bits |= flags::HAS_SLOTS;
        }
        bits
    }

    fn has_scoped_attr(&self, el: &ElementData) -> bool {
        let mode = self.ctx.config.render_mode;
        el.attrs.iter().any(|attr| needs_scoping(attr, mode))
    }
}

/// Top-most static HTML elements become fragment roots. SVG content is
/// excluded since a detached fragment would be parsed in the HTML namespace.
fn mark_fragments(nodes: &[IrNode], result: &mut Analysis, count: &mut usize) {
    for node in nodes {
        let eligible = match &node.kind {
            NodeKind::Element(el) => el.namespace == ElementNamespace::Html,
            _ => false,
        };
        if eligible {
            if let Some(info) = result.get_mut(node.id) {
                if info.is_static {
                    info.fragment_root = true;
                    *count += 1;
                    continue;
                }
            }
        }
        for list in node.child_lists() {
            mark_fragments(list, result, count);
        }
    }
}
