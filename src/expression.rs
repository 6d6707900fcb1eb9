//! Binding expressions.
//!
//! `{...}` bindings are parsed with oxc and immediately lowered into the
//! owned [`Expr`] tree, which only admits the template sub-language:
//! identifiers, member access, literals, parentheses and template strings.

use oxc_allocator::Allocator;
use oxc_ast::ast::{Expression, TemplateLiteral};
use oxc_parser::Parser;
use oxc_span::SourceType;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Identifier(String),
    Member {
        object: Box<Expr>,
        property: MemberProperty,
    },
    Literal(Literal),
    Paren(Box<Expr>),
    Template {
        /// Raw quasis; always one more than `expressions`.
        quasis: Vec<String>,
        expressions: Vec<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum MemberProperty {
    Static(String),
    Computed(Literal),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    /// Kept as JS source text so emission is exact.
    Number(String),
    Boolean(bool),
    Null,
}

impl Literal {
    pub fn to_js(&self) -> String {
        match self {
            Literal::String(s) => quote(s),
            Literal::Number(n) => n.clone(),
            Literal::Boolean(b) => b.to_string(),
            Literal::Null => "null".to_string(),
        }
    }
}

/// JSON string quoting, which is valid JS string syntax.
pub fn quote(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{}\"", value))
}

fn number_source(value: f64) -> String {
    if value.fract() == 0.0 && value.is_finite() && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PARSING
// ═══════════════════════════════════════════════════════════════════════════════

/// Parse the inside of a `{...}` binding.
pub fn parse_expression(code: &str) -> Result<Expr, String> {
    if code.trim().is_empty() {
        return Err("empty binding".to_string());
    }
    let allocator = Allocator::default();
    let source_type = SourceType::default().with_module(true);
    let ret = Parser::new(&allocator, code, source_type).parse_expression();
    match ret {
        Ok(expr) => lower(&expr),
        Err(errors) => Err(match errors.first() {
            Some(error) => format!("cannot parse `{}`: {}", code.trim(), error),
            None => format!("cannot parse `{}`", code.trim()),
        }),
    }
}

fn lower(expr: &Expression) -> Result<Expr, String> {
    match expr {
        Expression::Identifier(ident) => Ok(Expr::Identifier(ident.name.to_string())),
        Expression::StaticMemberExpression(member) => {
            if member.optional {
                return Err("optional chaining is not supported in bindings".to_string());
            }
            Ok(Expr::Member {
                object: Box::new(lower(&member.object)?),
                property: MemberProperty::Static(member.property.name.to_string()),
            })
        }
        Expression::ComputedMemberExpression(member) => {
            if member.optional {
                return Err("optional chaining is not supported in bindings".to_string());
            }
            let key = match lower(&member.expression)? {
                Expr::Literal(literal) => literal,
                _ => return Err("computed member keys must be literals".to_string()),
            };
            Ok(Expr::Member {
                object: Box::new(lower(&member.object)?),
                property: MemberProperty::Computed(key),
            })
        }
        Expression::StringLiteral(lit) => Ok(Expr::Literal(Literal::String(lit.value.to_string()))),
        Expression::NumericLiteral(lit) => Ok(Expr::Literal(Literal::Number(number_source(lit.value)))),
        Expression::BooleanLiteral(lit) => Ok(Expr::Literal(Literal::Boolean(lit.value))),
        Expression::NullLiteral(_) => Ok(Expr::Literal(Literal::Null)),
        Expression::ParenthesizedExpression(paren) => {
            Ok(Expr::Paren(Box::new(lower(&paren.expression)?)))
        }
        Expression::TemplateLiteral(tpl) => lower_template(tpl),
        Expression::ThisExpression(_) => {
            Err("`this` is implicit in bindings; reference the field directly".to_string())
        }
        Expression::CallExpression(_) => Err("function calls are not allowed in bindings".to_string()),
        _ => Err("only identifiers, member access, literals and template strings are allowed".to_string()),
    }
}

fn lower_template(tpl: &TemplateLiteral) -> Result<Expr, String> {
    let quasis = tpl.quasis.iter().map(|q| q.value.raw.to_string()).collect();
    let expressions = tpl
        .expressions
        .iter()
        .map(lower)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Expr::Template { quasis, expressions })
}

// ═══════════════════════════════════════════════════════════════════════════════
// QUERIES & EMISSION
// ═══════════════════════════════════════════════════════════════════════════════

impl Expr {
    pub fn is_literal(&self) -> bool {
        match self {
            Expr::Literal(_) => true,
            Expr::Paren(inner) => inner.is_literal(),
            _ => false,
        }
    }

    /// Leftmost identifier of a member chain.
    pub fn root_identifier(&self) -> Option<&str> {
        match self {
            Expr::Identifier(name) => Some(name),
            Expr::Member { object, .. } => object.root_identifier(),
            Expr::Paren(inner) => inner.root_identifier(),
            _ => None,
        }
    }

    fn is_number(&self) -> bool {
        match self {
            Expr::Literal(Literal::Number(_)) => true,
            Expr::Paren(inner) => inner.is_number(),
            _ => false,
        }
    }

    /// Render as JS. Root identifiers not in `locals` are read off `$cmp`.
    pub fn to_js(&self, locals: &[String]) -> String {
        match self {
            Expr::Identifier(name) => {
                if locals.iter().any(|local| local == name) {
                    name.clone()
                } else {
                    format!("$cmp.{}", name)
                }
            }
            Expr::Member { object, property } => {
                let object = if object.is_number() {
                    // `1.toFixed` does not parse.
                    format!("({})", object.to_js(locals))
                } else {
                    object.to_js(locals)
                };
                match property {
                    MemberProperty::Static(name) => format!("{}.{}", object, name),
                    MemberProperty::Computed(key) => format!("{}[{}]", object, key.to_js()),
                }
            }
            Expr::Literal(literal) => literal.to_js(),
            Expr::Paren(inner) => inner.to_js(locals),
            Expr::Template { quasis, expressions } => {
                let mut out = String::from("`");
                for (i, quasi) in quasis.iter().enumerate() {
                    out.push_str(quasi);
                    if let Some(expr) = expressions.get(i) {
                        out.push_str("${");
                        out.push_str(&expr.to_js(locals));
                        out.push('}');
                    }
                }
                out.push('`');
                out
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MARKUP HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

/// `{...}` spanning the whole value.
pub fn is_binding(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.len() >= 2
        && trimmed.starts_with('{')
        && find_balanced_brace_end(trimmed, 0) == Some(trimmed.len())
}

pub fn binding_body(value: &str) -> &str {
    let trimmed = value.trim();
    &trimmed[1..trimmed.len() - 1]
}

/// Byte index just past the brace closing the one at `start`. Braces inside
/// strings and template literals are ignored. `None` when unbalanced.
pub fn find_balanced_brace_end(source: &str, start: usize) -> Option<usize> {
    let bytes = source.as_bytes();
    let mut depth = 0usize;
    let mut string_quote: Option<u8> = None;
    // Brace depth at which each open template literal resumes.
    let mut templates: Vec<usize> = Vec::new();
    let mut i = start;

    while i < bytes.len() {
        let b = bytes[i];
        if b == b'\\' {
            i += 2;
            continue;
        }
        if let Some(q) = string_quote {
            if b == q {
                string_quote = None;
            }
            i += 1;
            continue;
        }
        if templates.last() == Some(&depth) {
            match b {
                b'`' => {
                    templates.pop();
                }
                b'$' if bytes.get(i + 1) == Some(&b'{') => {
                    depth += 1;
                    i += 2;
                    continue;
                }
                _ => {}
            }
            i += 1;
            continue;
        }
        match b {
            b'"' | b'\'' => string_quote = Some(b),
            b'`' => templates.push(depth),
            b'{' => depth += 1,
            b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

#[derive(Debug, Clone, PartialEq)]
pub enum TextPart {
    Literal(String),
    Expression(Expr),
}

/// Split text content into literal runs and `{...}` bindings.
/// Errors carry the byte offset of the offending brace.
pub fn split_text(text: &str) -> Result<Vec<TextPart>, (usize, String)> {
    let mut parts = Vec::new();
    let mut literal_start = 0;
    let mut i = 0;

    while let Some(rel) = text[i..].find('{') {
        let open = i + rel;
        let close = find_balanced_brace_end(text, open)
            .ok_or_else(|| (open, "unterminated `{` in text".to_string()))?;
        if open > literal_start {
            parts.push(TextPart::Literal(text[literal_start..open].to_string()));
        }
        let expr = parse_expression(&text[open + 1..close - 1]).map_err(|msg| (open, msg))?;
        parts.push(TextPart::Expression(expr));
        literal_start = close;
        i = close;
    }
    if literal_start < text.len() {
        parts.push(TextPart::Literal(text[literal_start..].to_string()));
    }
    Ok(parts)
}
