//! Minimal JavaScript value model for the code generator.
//!
//! Only the shapes a render function needs. Printing is deterministic:
//! objects keep insertion order and everything except statements is
//! printed on one line.

use oxc_syntax::identifier::is_identifier_name;
use std::fmt::{self, Write};

use crate::expression::quote;

#[derive(Debug, Clone, PartialEq)]
pub enum Js {
    Str(String),
    Number(u32),
    Bool(bool),
    Undefined,
    /// Identifier or already-rendered expression source.
    Raw(String),
    Array(Vec<Js>),
    Object(Vec<(String, Js)>),
    Call(String, Vec<Js>),
    Function { params: Vec<String>, body: Box<Js> },
    Arrow(Box<Js>),
    Conditional(Box<Js>, Box<Js>, Box<Js>),
    /// String concatenation with `+`.
    Concat(Vec<Js>),
}

impl Js {
    pub fn raw(source: impl Into<String>) -> Self {
        Js::Raw(source.into())
    }

    pub fn call(callee: impl Into<String>, args: Vec<Js>) -> Self {
        Js::Call(callee.into(), args)
    }

    /// Built only from literals, so it can be hoisted to module scope.
    pub fn is_literal(&self) -> bool {
        match self {
            Js::Str(_) | Js::Number(_) | Js::Bool(_) => true,
            Js::Array(items) => items.iter().all(Js::is_literal),
            Js::Object(entries) => entries.iter().all(|(_, value)| value.is_literal()),
            _ => false,
        }
    }

    pub fn is_empty_container(&self) -> bool {
        match self {
            Js::Array(items) => items.is_empty(),
            Js::Object(entries) => entries.is_empty(),
            _ => false,
        }
    }
}

fn write_key(f: &mut fmt::Formatter<'_>, key: &str) -> fmt::Result {
    if is_identifier_name(key) {
        f.write_str(key)
    } else {
        f.write_str(&quote(key))
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Js], separator: &str) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(separator)?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for Js {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Js::Str(value) => f.write_str(&quote(value)),
            Js::Number(n) => write!(f, "{}", n),
            Js::Bool(b) => write!(f, "{}", b),
            Js::Undefined => f.write_str("undefined"),
            Js::Raw(source) => f.write_str(source),
            Js::Array(items) => {
                f.write_char('[')?;
                write_list(f, items, ", ")?;
                f.write_char(']')
            }
            Js::Object(entries) => {
                if entries.is_empty() {
                    return f.write_str("{}");
                }
                f.write_str("{ ")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write_key(f, key)?;
                    write!(f, ": {}", value)?;
                }
                f.write_str(" }")
            }
            Js::Call(callee, args) => {
                write!(f, "{}(", callee)?;
                write_list(f, args, ", ")?;
                f.write_char(')')
            }
            Js::Function { params, body } => {
                write!(f, "function ({}) {{ return {}; }}", params.join(", "), body)
            }
            Js::Arrow(body) => write!(f, "() => {}", body),
            Js::Conditional(test, consequent, alternate) => {
                write!(f, "{} ? {} : {}", test, consequent, alternate)
            }
            Js::Concat(parts) => write_list(f, parts, " + "),
        }
    }
}

/// Escape text for the body of a template literal.
pub fn escape_template_literal(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('`', "\\`")
        .replace("${", "\\${")
}
