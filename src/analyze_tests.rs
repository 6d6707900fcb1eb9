#[cfg(test)]
mod tests {
    use crate::analyze::{analyze, flags, Analysis, NodeAnalysis};
    use crate::builder::build_ir;
    use crate::config::{CompileConfig, RenderMode};
    use crate::context::CompileContext;
    use crate::ir::{walk, IrNode, NodeKind};
    use crate::parse::parse_markup;

    fn run_with(source: &str, config: &CompileConfig) -> (Vec<IrNode>, Analysis) {
        let mut ctx = CompileContext::new(config);
        let nodes = build_ir(parse_markup(source).unwrap(), &mut ctx);
        assert!(!ctx.diagnostics.has_errors(), "{:?}", ctx.diagnostics);
        let analysis = analyze(&nodes, &ctx);
        (nodes, analysis)
    }

    fn run(source: &str) -> (Vec<IrNode>, Analysis) {
        run_with(source, &CompileConfig::default())
    }

    fn info<'a>(analysis: &'a Analysis, node: &IrNode) -> &'a NodeAnalysis {
        analysis.get(node.id).unwrap()
    }

    fn keys(nodes: &[IrNode], analysis: &Analysis) -> Vec<Option<u32>> {
        let mut out = Vec::new();
        walk(nodes, &mut |node| out.push(analysis.get(node.id).and_then(|a| a.key)));
        out
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // KEYS
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_keys_follow_pre_order() {
        let (nodes, analysis) = run("<template><div><p>a</p><x-foo></x-foo></div><slot></slot></template>");
        // div, p, "a", x-foo, slot
        assert_eq!(keys(&nodes, &analysis), vec![Some(0), Some(1), None, Some(2), Some(3)]);
        assert_eq!(analysis.key_count(), 4);
    }

    #[test]
    fn test_keys_ignore_attribute_values() {
        let (a_nodes, a) = run(r#"<template><div title="one"><span>x</span></div><p></p></template>"#);
        let (b_nodes, b) = run(r#"<template><div title="two" class="c"><span>y</span></div><p></p></template>"#);
        assert_eq!(keys(&a_nodes, &a), keys(&b_nodes, &b));
    }

    #[test]
    fn test_keys_are_deterministic() {
        let source = r#"<template><template for:each={items} for:item="item"><li key={item.id}>{item}</li></template><x-foo></x-foo></template>"#;
        let (first_nodes, first) = run(source);
        let (second_nodes, second) = run(source);
        assert_eq!(keys(&first_nodes, &first), keys(&second_nodes, &second));
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // FLAGS & STATICNESS
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_literal_subtree_is_static() {
        let (nodes, analysis) = run("<template><section><p>text</p></section></template>");
        let section = info(&analysis, &nodes[0]);
        assert!(section.is_static);
        assert!(section.has(flags::IS_STATIC));
        assert!(!section.has(flags::DESCENDANT_DYNAMIC));
        assert!(section.fragment_root);

        let p = &nodes[0].element().unwrap().children[0];
        assert!(info(&analysis, p).is_static);
        assert!(!info(&analysis, p).fragment_root);
    }

    #[test]
    fn test_descendant_dynamic_rolls_up() {
        let (nodes, analysis) = run("<template><div><p>{name}</p></div></template>");
        let div = info(&analysis, &nodes[0]);
        assert!(div.has(flags::DESCENDANT_DYNAMIC));
        assert!(!div.is_static);
        assert!(!div.is_dynamic);

        let p = &nodes[0].element().unwrap().children[0];
        let p_info = info(&analysis, p);
        assert!(p_info.has(flags::DESCENDANT_DYNAMIC));
        assert!(!p_info.is_dynamic);

        let text = &p.element().unwrap().children[0];
        let text_info = info(&analysis, text);
        assert!(text_info.is_dynamic);
        assert!(!text_info.has(flags::DESCENDANT_DYNAMIC));
    }

    #[test]
    fn test_own_binding_is_not_a_descendant() {
        let (nodes, analysis) = run("<template><section style={customStyle}/></template>");
        let section = info(&analysis, &nodes[0]);
        assert_eq!(section.flags, flags::HAS_STYLE);
        assert_eq!(section.key, Some(0));
        assert!(section.is_dynamic);
        assert!(!section.fragment_root);
    }

    #[test]
    fn test_scoped_ids_prevent_lifting() {
        let source = r##"<template><a href="#kansai-airport">KIX</a><h1 id="kansai-airport">Hi</h1></template>"##;
        let (nodes, analysis) = run(source);
        for node in &nodes {
            let node_info = info(&analysis, node);
            assert_eq!(node_info.flags, flags::HAS_ATTRS);
            assert!(!node_info.fragment_root);
        }

        let light = CompileConfig {
            render_mode: RenderMode::Light,
            ..CompileConfig::default()
        };
        let (nodes, analysis) = run_with(source, &light);
        assert!(nodes.iter().all(|node| info(&analysis, node).fragment_root));
    }

    #[test]
    fn test_optimization_can_be_disabled() {
        let config = CompileConfig {
            enable_static_content_optimization: false,
            ..CompileConfig::default()
        };
        let (nodes, analysis) = run_with("<template><p>text</p></template>", &config);
        let p = info(&analysis, &nodes[0]);
        assert!(p.is_static);
        assert!(!p.fragment_root);
    }

    #[test]
    fn test_svg_is_never_lifted() {
        let (nodes, analysis) = run(r#"<template><svg><path d="M0"></path></svg></template>"#);
        let svg = info(&analysis, &nodes[0]);
        assert!(svg.is_static);
        assert!(svg.has(flags::IS_SVG));
        assert!(!svg.fragment_root);
        let path = &nodes[0].element().unwrap().children[0];
        assert!(!info(&analysis, path).fragment_root);
    }

    #[test]
    fn test_slots_and_components() {
        let (nodes, analysis) = run("<template><div><slot></slot></div><x-card><p>body</p></x-card><x-empty></x-empty></template>");
        let div = info(&analysis, &nodes[0]);
        assert!(div.has(flags::DESCENDANT_DYNAMIC));
        let slot = &nodes[0].element().unwrap().children[0];
        assert!(info(&analysis, slot).has(flags::HAS_SLOTS));
        assert!(info(&analysis, slot).is_dynamic);

        let card = info(&analysis, &nodes[1]);
        assert!(card.has(flags::HAS_SLOTS));
        assert!(!card.is_static);
        assert!(!card.has(flags::DESCENDANT_DYNAMIC));
        let body = &nodes[1].element().unwrap().children[0];
        assert!(info(&analysis, body).fragment_root);

        assert_eq!(info(&analysis, &nodes[2]).flags, 0);
    }

    #[test]
    fn test_props_and_listeners() {
        let (nodes, analysis) = run(r#"<template><input value="x"><button onclick={go}>Go</button></template>"#);
        let input = info(&analysis, &nodes[0]);
        assert!(input.has(flags::HAS_PROPS));
        assert!(!input.is_static);
        let button = info(&analysis, &nodes[1]);
        assert_eq!(button.flags, flags::HAS_LISTENERS);
        assert!(button.is_dynamic);
    }

    #[test]
    fn test_directives_are_dynamic() {
        let (nodes, analysis) = run("<template><div><p lwc:if={ok}>yes</p></div></template>");
        let div = info(&analysis, &nodes[0]);
        assert!(div.has(flags::DESCENDANT_DYNAMIC));
        let wrapper = &nodes[0].element().unwrap().children[0];
        assert!(matches!(wrapper.kind, NodeKind::If(_)));
        let wrapper_info = info(&analysis, wrapper);
        assert!(wrapper_info.is_dynamic);
        assert_eq!(wrapper_info.key, None);
        // The branch body is still literal and lifts on its own.
        let NodeKind::If(data) = &wrapper.kind else { unreachable!() };
        assert!(info(&analysis, &data.branches[0].children[0]).fragment_root);
    }
}
