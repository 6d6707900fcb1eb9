//! Markup parser adapter.
//!
//! Drives the html5ever tokenizer and assembles a plain document tree from
//! its token stream. The HTML tree-construction algorithm is deliberately not
//! used: templates are fragments, and implicit element insertion or foster
//! parenting would silently rewrite what the author wrote. Instead every
//! element must be closed explicitly (or be void / self-closing), and any
//! tokenizer error aborts with a single `MalformedMarkup` diagnostic.

use html5ever::tokenizer::{
    BufferQueue, Tag, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};
use lazy_static::lazy_static;
use regex::Regex;
use tendril::StrTendril;
use tracing::{debug, instrument};

use crate::diagnostics::{Diagnostic, DiagnosticCode, SourceLocation};

// ═══════════════════════════════════════════════════════════════════════════════
// DOCUMENT TREE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub enum DocNode {
    Element(DocElement),
    Text(DocText),
    Comment(DocComment),
}

impl DocNode {
    pub fn location(&self) -> SourceLocation {
        match self {
            DocNode::Element(el) => el.location,
            DocNode::Text(text) => text.location,
            DocNode::Comment(comment) => comment.location,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocElement {
    pub tag: String,
    pub attrs: Vec<DocAttr>,
    pub children: Vec<DocNode>,
    /// Written as `<tag/>` rather than with an explicit end tag.
    pub self_closing: bool,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocAttr {
    pub name: String,
    pub value: String,
    /// `false` for bare attributes such as `<input disabled>`.
    pub has_value: bool,
    pub quoted: bool,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocText {
    pub text: String,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocComment {
    pub text: String,
    pub location: SourceLocation,
}

// ═══════════════════════════════════════════════════════════════════════════════
// TABLES
// ═══════════════════════════════════════════════════════════════════════════════

pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// SVG element names the tokenizer folds to lowercase.
const SVG_CAMEL_TAGS: &[&str] = &[
    "animateMotion",
    "animateTransform",
    "clipPath",
    "feBlend",
    "feColorMatrix",
    "feComposite",
    "feDropShadow",
    "feFlood",
    "feGaussianBlur",
    "feMerge",
    "feMergeNode",
    "feOffset",
    "feTurbulence",
    "foreignObject",
    "linearGradient",
    "radialGradient",
    "textPath",
];

/// SVG attribute names the tokenizer folds to lowercase.
const SVG_CAMEL_ATTRS: &[&str] = &[
    "attributeName",
    "baseFrequency",
    "calcMode",
    "clipPathUnits",
    "diffuseConstant",
    "edgeMode",
    "filterUnits",
    "gradientTransform",
    "gradientUnits",
    "kernelMatrix",
    "keyPoints",
    "keySplines",
    "keyTimes",
    "lengthAdjust",
    "markerHeight",
    "markerUnits",
    "markerWidth",
    "maskContentUnits",
    "maskUnits",
    "numOctaves",
    "pathLength",
    "patternContentUnits",
    "patternTransform",
    "patternUnits",
    "preserveAspectRatio",
    "primitiveUnits",
    "refX",
    "refY",
    "repeatCount",
    "spreadMethod",
    "startOffset",
    "stdDeviation",
    "surfaceScale",
    "textLength",
    "viewBox",
];

lazy_static! {
    /// Attribute scanner over the raw text of a start tag, used to recover
    /// what the tokenizer normalizes away (bare vs. valued, quoting, offsets).
    static ref RAW_ATTR_RE: Regex =
        Regex::new(r#"([^\s"'>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+)))?"#).unwrap();
}

pub fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

fn restore_case(name: &str, table: &[&'static str]) -> String {
    table
        .iter()
        .find(|candidate| candidate.eq_ignore_ascii_case(name))
        .map(|candidate| candidate.to_string())
        .unwrap_or_else(|| name.to_string())
}

// ═══════════════════════════════════════════════════════════════════════════════
// SOURCE POSITIONS
// ═══════════════════════════════════════════════════════════════════════════════

pub(crate) struct LineIndex<'s> {
    source: &'s str,
    starts: Vec<usize>,
}

impl<'s> LineIndex<'s> {
    pub(crate) fn new(source: &'s str) -> Self {
        let mut starts = vec![0];
        starts.extend(source.match_indices('\n').map(|(i, _)| i + 1));
        Self { source, starts }
    }

    pub(crate) fn location(&self, offset: usize) -> SourceLocation {
        let offset = offset.min(self.source.len());
        let line = self.starts.partition_point(|&start| start <= offset);
        let start = self.starts[line - 1];
        let column = self.source.get(start..offset).map_or(0, |s| s.chars().count()) + 1;
        SourceLocation::new(line as u32, column as u32)
    }
}

/// Byte offset just past the `>` closing the tag that starts at `start`,
/// skipping quoted attribute values.
fn tag_end(source: &str, start: usize) -> usize {
    let mut quote: Option<u8> = None;
    for (i, &b) in source.as_bytes().iter().enumerate().skip(start) {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'\'' => quote = Some(b),
            None if b == b'>' => return i + 1,
            None => {}
        }
    }
    source.len()
}

struct ScannedAttr {
    name: String,
    has_value: bool,
    quoted: bool,
    offset: usize,
    used: bool,
}

fn scan_attrs(source: &str, tag_start: usize, tag_end: usize, name_len: usize) -> Vec<ScannedAttr> {
    let body_start = (tag_start + 1 + name_len).min(tag_end);
    let body = &source[body_start..tag_end];
    RAW_ATTR_RE
        .captures_iter(body)
        .filter_map(|caps| {
            let name = caps.get(1)?;
            Some(ScannedAttr {
                name: name.as_str().to_ascii_lowercase(),
                has_value: caps.get(2).is_some() || caps.get(3).is_some() || caps.get(4).is_some(),
                quoted: caps.get(2).is_some() || caps.get(3).is_some(),
                offset: body_start + name.start(),
                used: false,
            })
        })
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════════
// TOKEN SINK
// ═══════════════════════════════════════════════════════════════════════════════

struct DocumentBuilder<'s> {
    source: &'s str,
    lowered: String,
    lines: LineIndex<'s>,
    cursor: usize,
    stack: Vec<DocElement>,
    roots: Vec<DocNode>,
    pending_text: Option<DocText>,
    error: Option<Diagnostic>,
}

impl<'s> DocumentBuilder<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            source,
            lowered: source.to_ascii_lowercase(),
            lines: LineIndex::new(source),
            cursor: 0,
            stack: Vec::new(),
            roots: Vec::new(),
            pending_text: None,
            error: None,
        }
    }

    fn fail(&mut self, message: String, location: SourceLocation) {
        if self.error.is_none() {
            self.error = Some(Diagnostic::new(DiagnosticCode::MalformedMarkup, message, location));
        }
    }

    fn find_from_cursor(&self, needle: &str) -> usize {
        self.lowered
            .get(self.cursor..)
            .and_then(|rest| rest.find(needle))
            .map_or(self.cursor, |i| self.cursor + i)
    }

    fn attach(&mut self, node: DocNode) {
        match self.stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => self.roots.push(node),
        }
    }

    fn flush_text(&mut self) {
        if let Some(text) = self.pending_text.take() {
            self.attach(DocNode::Text(text));
        }
    }

    fn in_svg(&self) -> bool {
        self.stack.iter().any(|el| el.tag == "svg")
    }

    fn start_tag(&mut self, tag: Tag) {
        let name = tag.name.to_string();
        let start = self.find_from_cursor(&format!("<{}", name));
        let end = tag_end(self.source, start);
        self.cursor = end;

        let svg = name == "svg" || self.in_svg();
        let mut scanned = scan_attrs(self.source, start, end, name.len());
        let mut self_closing = tag.self_closing;
        let mut attrs = Vec::with_capacity(tag.attrs.len());

        for attr in tag.attrs {
            let raw_name = attr.name.local.to_string();
            let mut value = attr.value.to_string();
            let info = scanned.iter_mut().find(|s| !s.used && s.name == raw_name);
            let (has_value, quoted, offset) = match info {
                Some(info) => {
                    info.used = true;
                    (info.has_value, info.quoted, info.offset)
                }
                None => (!value.is_empty(), false, start),
            };
            // `<x-foo value={bar}/>`: the tokenizer keeps the slash in the value.
            if !quoted && value.starts_with('{') && value.ends_with("}/") {
                value.pop();
                self_closing = true;
            }
            let name = if svg {
                restore_case(&raw_name, SVG_CAMEL_ATTRS)
            } else {
                raw_name
            };
            attrs.push(DocAttr {
                name,
                value,
                has_value,
                quoted,
                location: self.lines.location(offset),
            });
        }

        let element = DocElement {
            tag: if svg { restore_case(&name, SVG_CAMEL_TAGS) } else { name.clone() },
            attrs,
            children: Vec::new(),
            self_closing,
            location: self.lines.location(start),
        };

        if self_closing || is_void_element(&name) {
            self.attach(DocNode::Element(element));
        } else {
            self.stack.push(element);
        }
    }

    fn end_tag(&mut self, tag: Tag) {
        let name = tag.name.to_string();
        let start = self.find_from_cursor(&format!("</{}", name));
        self.cursor = tag_end(self.source, start);
        let location = self.lines.location(start);

        if is_void_element(&name) {
            self.fail(format!("</{}> is not allowed: <{}> is a void element", name, name), location);
            return;
        }

        match self.stack.last() {
            Some(open) if open.tag.eq_ignore_ascii_case(&name) => {
                if let Some(element) = self.stack.pop() {
                    self.attach(DocNode::Element(element));
                }
            }
            Some(open) => {
                let message = if self.stack.iter().any(|el| el.tag.eq_ignore_ascii_case(&name)) {
                    format!("<{}> must be closed before </{}>", open.tag, name)
                } else {
                    format!("unexpected </{}>: the open element is <{}>", name, open.tag)
                };
                self.fail(message, location);
            }
            None => self.fail(format!("unexpected </{}> with no open element", name), location),
        }
    }

    fn comment(&mut self, text: StrTendril) {
        let start = self.find_from_cursor("<!--");
        let end = self
            .source
            .get(start..)
            .and_then(|rest| rest.find("-->"))
            .map_or(self.source.len(), |i| start + i + 3);
        self.cursor = end;
        let location = self.lines.location(start);
        self.attach(DocNode::Comment(DocComment {
            text: text.to_string(),
            location,
        }));
    }

    fn characters(&mut self, text: &str) {
        match self.pending_text.as_mut() {
            Some(pending) => pending.text.push_str(text),
            None => {
                let location = self.lines.location(self.cursor);
                self.pending_text = Some(DocText {
                    text: text.to_string(),
                    location,
                });
            }
        }
    }

    fn finish(mut self) -> Result<Vec<DocNode>, Diagnostic> {
        self.flush_text();
        if let Some(error) = self.error {
            return Err(error);
        }
        if let Some(open) = self.stack.last() {
            return Err(Diagnostic::new(
                DiagnosticCode::MalformedMarkup,
                format!("<{}> is never closed", open.tag),
                open.location,
            ));
        }
        Ok(self.roots)
    }
}

impl<'s> TokenSink for DocumentBuilder<'s> {
    type Handle = ();

    fn process_token(&mut self, token: Token, _line_number: u64) -> TokenSinkResult<()> {
        if self.error.is_some() {
            return TokenSinkResult::Continue;
        }
        match token {
            Token::CharacterTokens(text) => self.characters(&text),
            Token::TagToken(tag) => {
                self.flush_text();
                match tag.kind {
                    TagKind::StartTag => self.start_tag(tag),
                    TagKind::EndTag => self.end_tag(tag),
                }
            }
            Token::CommentToken(text) => {
                self.flush_text();
                self.comment(text);
            }
            Token::DoctypeToken(_) => {
                let start = self.find_from_cursor("<!");
                self.cursor = tag_end(self.source, start);
            }
            Token::ParseError(message) => {
                let location = self.lines.location(self.cursor);
                self.fail(message.to_string(), location);
            }
            Token::NullCharacterToken | Token::EOFToken => {}
        }
        TokenSinkResult::Continue
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PUBLIC API
// ═══════════════════════════════════════════════════════════════════════════════

/// Parse a markup document into its top-level nodes.
#[instrument(skip_all, fields(len = source.len()))]
pub fn parse_markup(source: &str) -> Result<Vec<DocNode>, Diagnostic> {
    let mut queue = BufferQueue::default();
    queue.push_back(StrTendril::from_slice(source));

    let mut tokenizer = Tokenizer::new(
        DocumentBuilder::new(source),
        TokenizerOpts {
            exact_errors: true,
            ..Default::default()
        },
    );
    let _ = tokenizer.feed(&mut queue);
    tokenizer.end();

    let result = tokenizer.sink.finish();
    match &result {
        Ok(nodes) => debug!(roots = nodes.len(), "markup parsed"),
        Err(diagnostic) => debug!(location = %diagnostic.location, "markup rejected"),
    }
    result
}
