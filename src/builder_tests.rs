//! IR builder and validator tests.
//!
//! Each test runs the real parser first, so the rules are exercised on the
//! same attribute forms authors write.

#[cfg(test)]
mod tests {
    use crate::builder::{build_ir, FOR_EACH_LABEL};
    use crate::config::{CompileConfig, RenderMode};
    use crate::context::CompileContext;
    use crate::diagnostics::{DiagnosticCode, Severity};
    use crate::expression::{Expr, TextPart};
    use crate::ir::{walk, AttrValue, ClassBinding, ElementNamespace, IrNode, NodeKind, StyleBinding};
    use crate::parse::parse_markup;

    fn build_with(source: &str, config: &CompileConfig) -> (Vec<IrNode>, CompileContext) {
        let mut ctx = CompileContext::new(config);
        let document = parse_markup(source).unwrap();
        let nodes = build_ir(document, &mut ctx);
        (nodes, ctx)
    }

    fn build(source: &str) -> (Vec<IrNode>, CompileContext) {
        build_with(source, &CompileConfig::default())
    }

    fn codes(ctx: &CompileContext) -> Vec<DiagnosticCode> {
        ctx.diagnostics.iter().map(|d| d.code).collect()
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // ROOT
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_root_must_be_a_single_template() {
        let (nodes, ctx) = build("<div></div>");
        assert!(nodes.is_empty());
        assert_eq!(codes(&ctx), vec![DiagnosticCode::MissingRootTemplate]);

        let (_, ctx) = build("<template></template><template></template>");
        assert_eq!(codes(&ctx), vec![DiagnosticCode::MissingRootTemplate]);

        let (nodes, ctx) = build("<!-- header -->\n<template><p>hi</p></template>\n");
        assert!(ctx.diagnostics.is_empty());
        assert_eq!(nodes.len(), 1);
    }

    #[test]
    fn test_root_attributes_override_config() {
        let (_, ctx) = build("<template lwc:render-mode=\"light\" lwc:preserve-comments><!-- kept --></template>");
        assert!(ctx.diagnostics.is_empty());
        assert_eq!(ctx.config.render_mode, RenderMode::Light);
        assert!(ctx.config.preserve_comments);

        let (_, ctx) = build("<template lwc:render-mode=\"dark\"></template>");
        assert_eq!(codes(&ctx), vec![DiagnosticCode::InvalidDirectiveUsage]);
    }

    #[test]
    fn test_comments_dropped_unless_preserved() {
        let (nodes, _) = build("<template><!-- a --><p></p></template>");
        assert_eq!(nodes.len(), 1);

        let config = CompileConfig {
            preserve_comments: true,
            ..CompileConfig::default()
        };
        let (nodes, _) = build_with("<template><!-- a --><p></p></template>", &config);
        assert_eq!(nodes.len(), 2);
        assert!(matches!(&nodes[0].kind, NodeKind::Comment(text) if text == " a "));
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // DIRECTIVES
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_lwc_if_chain_becomes_one_node() {
        let source = "<template>\n  <p lwc:if={a}>1</p>\n  <p lwc:elseif={b}>2</p>\n  <p lwc:else>3</p>\n</template>";
        let (nodes, ctx) = build(source);
        assert!(ctx.diagnostics.is_empty());
        assert_eq!(nodes.len(), 1);
        let NodeKind::If(data) = &nodes[0].kind else {
            panic!("expected If, got {}", nodes[0].kind.name());
        };
        assert_eq!(data.branches.len(), 2);
        assert_eq!(data.branches[0].test, Expr::Identifier("a".to_string()));
        assert_eq!(data.branches[1].test, Expr::Identifier("b".to_string()));
        assert_eq!(data.otherwise.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn test_else_without_if_is_rejected() {
        let (_, ctx) = build("<template><p lwc:else>3</p></template>");
        assert_eq!(codes(&ctx), vec![DiagnosticCode::InvalidDirectiveUsage]);

        let (_, ctx) = build("<template><p lwc:if={a}></p>text<p lwc:elseif={b}></p></template>");
        assert_eq!(codes(&ctx), vec![DiagnosticCode::InvalidDirectiveUsage]);
    }

    #[test]
    fn test_legacy_if_is_deprecated_but_built() {
        let (nodes, ctx) = build("<template><p if:false={hidden}>x</p></template>");
        let diagnostic = ctx.diagnostics.iter().next().unwrap();
        assert_eq!(diagnostic.code, DiagnosticCode::DeprecatedDirective);
        assert_eq!(diagnostic.severity, Severity::Warning);
        assert!(!ctx.diagnostics.has_errors());
        let NodeKind::If(data) = &nodes[0].kind else {
            panic!("expected If");
        };
        assert!(data.branches[0].negate);
    }

    #[test]
    fn test_conflicting_conditionals() {
        let (_, ctx) = build("<template><p if:true={a} lwc:if={b}></p></template>");
        assert!(codes(&ctx).contains(&DiagnosticCode::InvalidDirectiveUsage));
    }

    #[test]
    fn test_iteration() {
        let source = r#"<template><template for:each={items} for:item="item" for:index="i"><li key={item.id}>{item.name}</li></template></template>"#;
        let (nodes, ctx) = build(source);
        assert!(ctx.diagnostics.is_empty(), "{:?}", codes(&ctx));
        let NodeKind::For(data) = &nodes[0].kind else {
            panic!("expected For");
        };
        assert_eq!(data.item, "item");
        assert_eq!(data.index.as_deref(), Some("i"));
        let li = data.children[0].element().unwrap();
        assert!(li.key.is_some());
        assert_eq!(ctx.nodes.label(nodes[0].id), FOR_EACH_LABEL);

        let text = &li.children[0];
        assert!(ctx.nodes.ancestors(text.id).any(|id| id == nodes[0].id));
    }

    #[test]
    fn test_iteration_key_rules() {
        let (_, ctx) = build(r#"<template><template for:each={items} for:item="item"><li></li></template></template>"#);
        assert_eq!(codes(&ctx), vec![DiagnosticCode::MissingIterationKey]);
        assert!(!ctx.diagnostics.has_errors());

        let (_, ctx) = build("<template><li key={id}></li></template>");
        assert_eq!(codes(&ctx), vec![DiagnosticCode::ReservedAttributeName]);

        let (_, ctx) = build(r#"<template><template for:each={items} for:item="item"><li key="1"></li></template></template>"#);
        assert_eq!(
            codes(&ctx),
            vec![DiagnosticCode::InvalidExpression, DiagnosticCode::MissingIterationKey]
        );
    }

    #[test]
    fn test_iteration_needs_item() {
        let (_, ctx) = build("<template><li for:each={items} key={x}></li></template>");
        assert!(codes(&ctx).contains(&DiagnosticCode::InvalidDirectiveUsage));

        let (_, ctx) = build(r#"<template><li for:item="x"></li></template>"#);
        assert_eq!(codes(&ctx), vec![DiagnosticCode::InvalidDirectiveUsage]);
    }

    #[test]
    fn test_nested_template_requires_directive() {
        let (_, ctx) = build("<template><template><p></p></template></template>");
        assert_eq!(codes(&ctx), vec![DiagnosticCode::InvalidDirectiveUsage]);
    }

    #[test]
    fn test_unknown_directive() {
        let (_, ctx) = build("<template><p lwc:bogus></p></template>");
        assert_eq!(codes(&ctx), vec![DiagnosticCode::InvalidDirectiveUsage]);
    }

    #[test]
    fn test_dynamic_component() {
        let (nodes, ctx) = build("<template><x-host lwc:dynamic={ctor}></x-host></template>");
        assert!(ctx.diagnostics.is_empty());
        assert!(matches!(&nodes[0].kind, NodeKind::Dynamic(d) if d.constructor == Expr::Identifier("ctor".to_string())));

        let (_, ctx) = build("<template><div lwc:dynamic={ctor}></div></template>");
        assert_eq!(codes(&ctx), vec![DiagnosticCode::InvalidDirectiveUsage]);
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // SLOTS & NAMES
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_slot_names_are_unique() {
        let (_, ctx) = build(r#"<template><slot></slot><slot name="header"></slot><slot name="header"></slot><slot></slot></template>"#);
        assert_eq!(
            codes(&ctx),
            vec![DiagnosticCode::DuplicateSlotName, DiagnosticCode::DuplicateSlotName]
        );
        assert_eq!(ctx.slots, vec!["".to_string(), "header".to_string()]);
    }

    #[test]
    fn test_slot_inside_iteration() {
        let (_, ctx) = build(r#"<template><template for:each={items} for:item="item"><slot></slot></template></template>"#);
        assert!(codes(&ctx).contains(&DiagnosticCode::InvalidDirectiveUsage));
    }

    #[test]
    fn test_slot_name_must_be_literal() {
        let (_, ctx) = build("<template><slot name={dynamic}></slot></template>");
        assert_eq!(codes(&ctx), vec![DiagnosticCode::InvalidDirectiveUsage]);
    }

    #[test]
    fn test_reserved_names() {
        let (_, ctx) = build("<template><font-face></font-face></template>");
        assert_eq!(codes(&ctx), vec![DiagnosticCode::ReservedTagName]);

        let (_, ctx) = build(r#"<template><button is="fancy-button"></button></template>"#);
        assert_eq!(codes(&ctx), vec![DiagnosticCode::ReservedAttributeName]);
    }

    #[test]
    fn test_unknown_element_is_a_warning() {
        let (nodes, ctx) = build("<template><blink>old</blink></template>");
        assert_eq!(codes(&ctx), vec![DiagnosticCode::UnknownHtmlElement]);
        assert!(!ctx.diagnostics.has_errors());
        assert!(matches!(nodes[0].kind, NodeKind::Element(_)));
    }

    #[test]
    fn test_errors_accumulate() {
        let source = r#"<template><font-face></font-face><p title="{x}"></p><slot></slot><slot></slot></template>"#;
        let (_, ctx) = build(source);
        assert_eq!(
            codes(&ctx),
            vec![
                DiagnosticCode::ReservedTagName,
                DiagnosticCode::InvalidExpression,
                DiagnosticCode::DuplicateSlotName,
            ]
        );
        assert_eq!(ctx.diagnostics.error_count(), 3);
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // ATTRIBUTES & TEXT
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_custom_element_attributes_become_props() {
        let source = r#"<template><x-foo data-id="1" max-length="3" spellcheck="false" required></x-foo></template>"#;
        let (nodes, ctx) = build(source);
        assert!(ctx.diagnostics.is_empty());
        let NodeKind::Component(el) = &nodes[0].kind else {
            panic!("expected Component");
        };
        let attrs: Vec<&str> = el.attrs.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(attrs, vec!["data-id"]);
        let props: Vec<(&str, &AttrValue)> = el.props.iter().map(|p| (p.name.as_str(), &p.value)).collect();
        assert_eq!(
            props,
            vec![
                ("maxLength", &AttrValue::Literal("3".to_string())),
                ("spellcheck", &AttrValue::Boolean(false)),
                ("required", &AttrValue::Boolean(true)),
            ]
        );
    }

    #[test]
    fn test_native_form_props() {
        let (nodes, _) = build(r#"<template><input type="text" value={name}></template>"#);
        let el = nodes[0].element().unwrap();
        assert_eq!(el.attrs.len(), 1);
        assert_eq!(el.props[0].name, "value");
    }

    #[test]
    fn test_class_and_style() {
        let source = r#"<template><p class="a b a" style="color: red"></p><p class={cls} style={css}></p></template>"#;
        let (nodes, _) = build(source);
        let first = nodes[0].element().unwrap();
        assert_eq!(first.class, Some(ClassBinding::Static(vec!["a".to_string(), "b".to_string()])));
        assert!(matches!(&first.style, Some(StyleBinding::Static(decls)) if decls.len() == 1));
        let second = nodes[1].element().unwrap();
        assert!(matches!(second.class, Some(ClassBinding::Dynamic(_))));
        assert!(matches!(second.style, Some(StyleBinding::Dynamic(_))));
    }

    #[test]
    fn test_listeners() {
        let (nodes, ctx) = build("<template><button onclick={handleClick}></button></template>");
        let el = nodes[0].element().unwrap();
        assert_eq!(el.listeners[0].event, "click");
        assert!(el.attrs.is_empty());
        assert!(ctx.diagnostics.is_empty());

        let (_, ctx) = build(r#"<template><button onclick="alert(1)"></button></template>"#);
        assert_eq!(codes(&ctx), vec![DiagnosticCode::InvalidExpression]);
    }

    #[test]
    fn test_invalid_binding_expression() {
        let (_, ctx) = build("<template><p title={a.b()}></p></template>");
        assert_eq!(codes(&ctx), vec![DiagnosticCode::InvalidExpression]);
    }

    #[test]
    fn test_text_parts_and_whitespace() {
        let (nodes, _) = build("<template>\n  <p>\n    Hello {name}!\n  </p>\n</template>");
        assert_eq!(nodes.len(), 1);
        let p = nodes[0].element().unwrap();
        let NodeKind::Text(parts) = &p.children[0].kind else {
            panic!("expected Text");
        };
        assert_eq!(
            parts,
            &vec![
                TextPart::Literal(" Hello ".to_string()),
                TextPart::Expression(Expr::Identifier("name".to_string())),
                TextPart::Literal("! ".to_string()),
            ]
        );
    }

    #[test]
    fn test_svg_namespace() {
        let (nodes, _) = build(r#"<template><svg viewBox="0 0 1 1"><path d="M0"></path></svg></template>"#);
        let svg = nodes[0].element().unwrap();
        assert_eq!(svg.namespace, ElementNamespace::Svg);
        assert_eq!(svg.children[0].element().unwrap().namespace, ElementNamespace::Svg);
        assert_eq!(svg.attrs[0].name, "viewBox");
    }

    #[test]
    fn test_node_ids_are_unique() {
        let (nodes, ctx) = build("<template><div><p>a</p><p>b</p></div><span></span></template>");
        let mut ids = Vec::new();
        walk(&nodes, &mut |node| ids.push(node.id));
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(ids.len(), sorted.len());
        assert_eq!(ids.len(), ctx.nodes.len());
    }
}
