//! Per-compile state.
//!
//! Every table and counter a pass needs lives here and is created fresh by
//! [`CompileContext::new`]. Nothing is shared between compiles, so any number
//! of templates can be compiled concurrently.

use indexmap::IndexMap;

use crate::config::CompileConfig;
use crate::diagnostics::Diagnostics;
use crate::ir::NodeTable;
use crate::scope::{ImportTable, ScopedIdTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HoistKind {
    /// `const stcN = {...};`
    Object,
    /// ``const $fragmentN = parseFragment`...`;``
    Fragment,
}

/// Content-deduplicated module-level declarations, in first-use order.
#[derive(Debug, Default)]
pub struct HoistTable {
    entries: IndexMap<(HoistKind, String), String>,
    objects: usize,
    fragments: usize,
}

impl HoistTable {
    /// Binding for a literal object, declaring it on first use.
    pub fn object(&mut self, literal: String) -> String {
        let next = &mut self.objects;
        self.entries
            .entry((HoistKind::Object, literal))
            .or_insert_with(|| {
                let name = format!("stc{}", *next);
                *next += 1;
                name
            })
            .clone()
    }

    /// Binding for a static fragment's markup, declaring it on first use.
    pub fn fragment(&mut self, html: String) -> String {
        let next = &mut self.fragments;
        self.entries
            .entry((HoistKind::Fragment, html))
            .or_insert_with(|| {
                *next += 1;
                format!("$fragment{}", *next)
            })
            .clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = (HoistKind, &str, &str)> {
        self.entries
            .iter()
            .map(|((kind, content), name)| (*kind, content.as_str(), name.as_str()))
    }

    pub fn has_fragments(&self) -> bool {
        self.fragments > 0
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub struct CompileContext {
    /// Effective configuration, including overrides from the root `<template>`.
    pub config: CompileConfig,
    pub diagnostics: Diagnostics,
    pub nodes: NodeTable,
    pub imports: ImportTable,
    pub scoped_ids: ScopedIdTable,
    pub hoists: HoistTable,
    /// Declared slot names in document order.
    pub slots: Vec<String>,
}

impl CompileContext {
    pub fn new(config: &CompileConfig) -> Self {
        Self {
            config: config.clone(),
            diagnostics: Diagnostics::new(),
            nodes: NodeTable::default(),
            imports: ImportTable::default(),
            scoped_ids: ScopedIdTable::default(),
            hoists: HoistTable::default(),
            slots: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_objects_share_one_declaration() {
        let mut hoists = HoistTable::default();
        assert_eq!(hoists.object("{ key: 0 }".to_string()), "stc0");
        assert_eq!(hoists.object("{ key: 1 }".to_string()), "stc1");
        assert_eq!(hoists.object("{ key: 0 }".to_string()), "stc0");
        assert_eq!(hoists.len(), 2);
    }

    #[test]
    fn fragments_and_objects_interleave_in_first_use_order() {
        let mut hoists = HoistTable::default();
        hoists.object("{ a: 1 }".to_string());
        assert_eq!(hoists.fragment("<p>x</p>".to_string()), "$fragment1");
        assert_eq!(hoists.fragment("<p>x</p>".to_string()), "$fragment1");
        let names: Vec<&str> = hoists.iter().map(|(_, _, name)| name).collect();
        assert_eq!(names, vec!["stc0", "$fragment1"]);
        assert!(hoists.has_fragments());
    }
}
