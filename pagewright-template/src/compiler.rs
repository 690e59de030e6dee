//! Template Compiler - Token Stream to Node Tree
//!
//! Compilation happens once per template; application happens once per data
//! bag. Bulk regeneration relies on this split to compile a template a single
//! time and apply it across every area that uses it.
//!
//! # Semantics
//!
//! - `{{#key}}...{{/key}}` repeats its body once per element when `key`
//!   resolves to a list. Inside, `{{this}}` is the element.
//! - When `key` is absent or not a list the block is dead: its markers are
//!   emitted as literal text and its body is rendered with the usual rules.
//! - `{{key}}` / `{{a.b.c}}` render the leaf: scalars verbatim, lists joined
//!   with `", "`, nested bags and missing keys as the empty string.
//! - Substituted values are never rescanned for tags.

use crate::scanner::Scanner;
use crate::token::{TagKind, Token};
use pagewright_core::value::PATH_SEPARATOR;
use pagewright_core::{DataBag, TemplateError};
use std::collections::BTreeSet;

/// Maximum block nesting depth accepted by [`compile`].
pub const MAX_NESTING_DEPTH: usize = 32;

/// Name bound to the current element inside a live list block.
pub const THIS_KEY: &str = "this";

// ============================================================================
// NODE TREE
// ============================================================================

/// A compiled template node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Literal text copied to the output unchanged.
    Text(String),
    /// Simple or dotted substitution.
    Var(String),
    /// List block with its original markers kept for the dead-block case.
    Block {
        name: String,
        open_marker: String,
        close_marker: String,
        body: Vec<Node>,
    },
}

/// A parsed template ready to be applied to data bags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledTemplate {
    nodes: Vec<Node>,
    source_len: usize,
}

struct OpenFrame {
    name: String,
    open_marker: String,
    offset: usize,
    body: Vec<Node>,
}

// ============================================================================
// PASS 1: BALANCED BLOCK MATCHING
// ============================================================================

/// Compile template source into a reusable [`CompiledTemplate`].
///
/// Fails only on structure: an unclosed block, a stray close tag, or nesting
/// deeper than [`MAX_NESTING_DEPTH`].
pub fn compile(source: &str) -> Result<CompiledTemplate, TemplateError> {
    let mut root: Vec<Node> = Vec::new();
    let mut stack: Vec<OpenFrame> = Vec::new();

    for token in Scanner::new(source).tokenize() {
        match token {
            Token::Text(span) => {
                current_body(&mut root, &mut stack).push(Node::Text(span.slice(source).to_string()));
            }
            Token::Tag(tag) => match tag.kind {
                TagKind::Var => {
                    current_body(&mut root, &mut stack).push(Node::Var(tag.name));
                }
                TagKind::Open => {
                    if stack.len() >= MAX_NESTING_DEPTH {
                        return Err(TemplateError::NestingTooDeep {
                            max: MAX_NESTING_DEPTH,
                            offset: tag.span.start,
                        });
                    }
                    stack.push(OpenFrame {
                        open_marker: tag.span.slice(source).to_string(),
                        name: tag.name,
                        offset: tag.span.start,
                        body: Vec::new(),
                    });
                }
                TagKind::Close => {
                    let frame = match stack.pop() {
                        Some(frame) if frame.name == tag.name => frame,
                        // Interleaved blocks: the inner one was never closed.
                        Some(frame) if stack.iter().any(|f| f.name == tag.name) => {
                            return Err(TemplateError::UnclosedBlock {
                                name: frame.name,
                                offset: frame.offset,
                            });
                        }
                        _ => {
                            return Err(TemplateError::UnexpectedClose {
                                name: tag.name,
                                offset: tag.span.start,
                            });
                        }
                    };
                    let node = Node::Block {
                        name: frame.name,
                        open_marker: frame.open_marker,
                        close_marker: tag.span.slice(source).to_string(),
                        body: frame.body,
                    };
                    current_body(&mut root, &mut stack).push(node);
                }
            },
        }
    }

    if let Some(frame) = stack.pop() {
        return Err(TemplateError::UnclosedBlock {
            name: frame.name,
            offset: frame.offset,
        });
    }

    Ok(CompiledTemplate {
        nodes: root,
        source_len: source.len(),
    })
}

fn current_body<'s>(root: &'s mut Vec<Node>, stack: &'s mut [OpenFrame]) -> &'s mut Vec<Node> {
    match stack.last_mut() {
        Some(frame) => &mut frame.body,
        None => root,
    }
}

/// Compile and apply in one step.
pub fn render(source: &str, data: &DataBag) -> Result<String, TemplateError> {
    Ok(compile(source)?.apply(data))
}

// ============================================================================
// PASS 2: SUBSTITUTION
// ============================================================================

impl CompiledTemplate {
    /// Apply the template to a data bag. Never fails.
    pub fn apply(&self, data: &DataBag) -> String {
        let mut out = String::with_capacity(self.source_len + self.source_len / 2);
        render_nodes(&self.nodes, data, None, &mut out);
        out
    }

    /// Top-level nodes of the compiled tree.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Distinct root keys the template reads, sorted. `{{this}}` inside a
    /// block is an element reference, not a key, and is left out.
    pub fn referenced_keys(&self) -> Vec<String> {
        let mut keys = BTreeSet::new();
        collect_keys(&self.nodes, false, &mut keys);
        keys.into_iter().collect()
    }

    /// Names of every list block in the template, sorted and deduplicated.
    pub fn block_names(&self) -> Vec<String> {
        let mut names = BTreeSet::new();
        collect_blocks(&self.nodes, &mut names);
        names.into_iter().collect()
    }
}

fn render_nodes(nodes: &[Node], data: &DataBag, element: Option<&str>, out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Var(name) => match element {
                Some(item) if name == THIS_KEY => out.push_str(item),
                _ => {
                    if let Some(value) = data.get_path(name) {
                        out.push_str(&value.render_leaf());
                    }
                }
            },
            Node::Block {
                name,
                open_marker,
                close_marker,
                body,
            } => match data.get_path(name).and_then(|v| v.as_list()) {
                Some(items) => {
                    for item in items {
                        render_nodes(body, data, Some(item.as_str()), out);
                    }
                }
                None => {
                    out.push_str(open_marker);
                    render_nodes(body, data, element, out);
                    out.push_str(close_marker);
                }
            },
        }
    }
}

fn root_key(name: &str) -> &str {
    name.split(PATH_SEPARATOR).next().unwrap_or(name)
}

fn collect_keys(nodes: &[Node], in_block: bool, keys: &mut BTreeSet<String>) {
    for node in nodes {
        match node {
            Node::Text(_) => {}
            Node::Var(name) => {
                if !(in_block && name == THIS_KEY) {
                    keys.insert(root_key(name).to_string());
                }
            }
            Node::Block { name, body, .. } => {
                keys.insert(root_key(name).to_string());
                collect_keys(body, true, keys);
            }
        }
    }
}

fn collect_blocks(nodes: &[Node], names: &mut BTreeSet<String>) {
    for node in nodes {
        if let Node::Block { name, body, .. } = node {
            names.insert(name.clone());
            collect_blocks(body, names);
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn bag() -> DataBag {
        let mut company = DataBag::new();
        company.insert("phone", "(504) 555-0100");

        let mut data = DataBag::new();
        data.insert("service_name", "Roof Repair");
        data.insert("starting_price", "$1,500");
        data.insert("items", vec!["a".to_string(), "b".to_string()]);
        data.insert(
            "local_benefits",
            vec!["Fast response".to_string(), "Licensed techs".to_string()],
        );
        data.insert("company", company);
        data
    }

    #[test]
    fn test_simple_substitution() {
        let out = render("<h1>{{service_name}}</h1><p>From {{starting_price}}</p>", &bag()).unwrap();
        assert_eq!(out, "<h1>Roof Repair</h1><p>From $1,500</p>");
    }

    #[test]
    fn test_block_expands_before_simple_substitution() {
        let out = render("{{#items}}{{this}}{{/items}}|{{items}}", &bag()).unwrap();
        assert_eq!(out, "ab|a, b");
    }

    #[test]
    fn test_list_block_renders_each_element() {
        let out = render(
            "<ul>{{#local_benefits}}<li>{{this}}</li>{{/local_benefits}}</ul>",
            &bag(),
        )
        .unwrap();
        assert_eq!(out, "<ul><li>Fast response</li><li>Licensed techs</li></ul>");
    }

    #[test]
    fn test_missing_key_renders_empty() {
        assert_eq!(render("[{{nope}}]", &bag()).unwrap(), "[]");
        assert_eq!(render("[{{company.nope}}]", &bag()).unwrap(), "[]");
    }

    #[test]
    fn test_dotted_key_walks_nested_bag() {
        assert_eq!(render("{{company.phone}}", &bag()).unwrap(), "(504) 555-0100");
        assert_eq!(render("[{{company}}]", &bag()).unwrap(), "[]");
    }

    #[test]
    fn test_dead_block_keeps_markers() {
        let out = render("{{#service_name}}x{{starting_price}}{{/service_name}}", &bag()).unwrap();
        assert_eq!(out, "{{#service_name}}x$1,500{{/service_name}}");

        let out = render("{{# missing }}{{this}}{{/missing}}", &bag()).unwrap();
        assert_eq!(out, "{{# missing }}{{/missing}}");
    }

    #[test]
    fn test_this_outside_block_is_ordinary_key() {
        let mut data = DataBag::new();
        data.insert("this", "top");
        assert_eq!(render("{{this}}", &data).unwrap(), "top");
    }

    #[test]
    fn test_nested_blocks_bind_innermost_element() {
        let mut data = DataBag::new();
        data.insert("outer", vec!["1".to_string(), "2".to_string()]);
        data.insert("inner", vec!["x".to_string(), "y".to_string()]);
        let out = render("{{#outer}}[{{this}}:{{#inner}}{{this}}{{/inner}}]{{/outer}}", &data).unwrap();
        assert_eq!(out, "[1:xy][2:xy]");
    }

    #[test]
    fn test_same_name_nesting_is_balanced() {
        let compiled = compile("{{#a}}{{#a}}{{this}}{{/a}}{{/a}}").unwrap();
        assert_eq!(compiled.nodes().len(), 1);
        let mut data = DataBag::new();
        data.insert("a", vec!["p".to_string(), "q".to_string()]);
        assert_eq!(compiled.apply(&data), "pqpq");
    }

    #[test]
    fn test_values_are_not_rescanned() {
        let mut data = DataBag::new();
        data.insert("a", "{{b}}");
        data.insert("b", "nope");
        data.insert("list", vec!["{{b}}".to_string()]);
        assert_eq!(render("{{a}}", &data).unwrap(), "{{b}}");
        assert_eq!(render("{{#list}}{{this}}{{/list}}", &data).unwrap(), "{{b}}");
    }

    #[test]
    fn test_unclosed_block_is_error() {
        let err = compile("<ul>{{#items}}<li>").unwrap_err();
        assert_eq!(
            err,
            TemplateError::UnclosedBlock {
                name: "items".to_string(),
                offset: 4
            }
        );
    }

    #[test]
    fn test_unexpected_close_is_error() {
        let err = compile("text{{/items}}").unwrap_err();
        assert!(matches!(err, TemplateError::UnexpectedClose { ref name, offset: 4 } if name == "items"));
    }

    #[test]
    fn test_interleaved_blocks_report_inner_unclosed() {
        let err = compile("{{#a}}{{#b}}{{/a}}{{/b}}").unwrap_err();
        assert!(matches!(err, TemplateError::UnclosedBlock { ref name, .. } if name == "b"));
    }

    #[test]
    fn test_nesting_limit() {
        let deep_ok = "{{#k}}".repeat(MAX_NESTING_DEPTH) + &"{{/k}}".repeat(MAX_NESTING_DEPTH);
        assert!(compile(&deep_ok).is_ok());

        let too_deep =
            "{{#k}}".repeat(MAX_NESTING_DEPTH + 1) + &"{{/k}}".repeat(MAX_NESTING_DEPTH + 1);
        assert!(matches!(
            compile(&too_deep),
            Err(TemplateError::NestingTooDeep { max: MAX_NESTING_DEPTH, .. })
        ));
    }

    #[test]
    fn test_referenced_keys() {
        let compiled = compile(
            "{{business_name}} {{company.phone}} {{#local_benefits}}{{this}} {{city}}{{/local_benefits}} {{this}}",
        )
        .unwrap();
        assert_eq!(
            compiled.referenced_keys(),
            vec!["business_name", "city", "company", "local_benefits", "this"]
        );
        assert_eq!(compiled.block_names(), vec!["local_benefits"]);
    }

    #[test]
    fn test_compile_once_apply_many() {
        let compiled = compile("<h1>{{city}}</h1>").unwrap();
        let cities = ["Metairie", "Kenner", "Slidell"];
        for city in cities {
            let mut data = DataBag::new();
            data.insert("city", city);
            assert_eq!(compiled.apply(&data), format!("<h1>{}</h1>", city));
        }
    }
}

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    fn arb_bag() -> impl Strategy<Value = DataBag> {
        (
            "[a-z ]{0,12}",
            prop::collection::vec("[a-z]{0,6}", 0..5),
            "[a-z{}#/]{0,10}",
        )
            .prop_map(|(name, items, noisy)| {
                let mut data = DataBag::new();
                data.insert("name", name);
                data.insert("items", items);
                data.insert("noisy", noisy);
                data
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Applying the same template to the same bag twice yields the same
        /// string.
        #[test]
        fn prop_apply_is_deterministic(source in "[a-z<>{}#/ ]{0,60}", data in arb_bag()) {
            if let Ok(compiled) = compile(&source) {
                prop_assert_eq!(compiled.apply(&data), compiled.apply(&data));
                prop_assert_eq!(compiled.apply(&data), render(&source, &data).unwrap());
            }
        }

        /// Text without any `{{` passes through untouched.
        #[test]
        fn prop_plain_text_is_identity(source in "[^{]{0,80}", data in arb_bag()) {
            prop_assert_eq!(render(&source, &data).unwrap(), source);
        }

        /// A list block always renders each element exactly once, in order.
        #[test]
        fn prop_block_concatenates_elements(data in arb_bag()) {
            let out = render("{{#items}}{{this}}{{/items}}", &data).unwrap();
            let expected: String = data
                .get("items")
                .and_then(|v| v.as_list())
                .map(|items| items.concat())
                .unwrap_or_default();
            prop_assert_eq!(out, expected);
        }

        /// Unknown keys never fail and never leave the tag behind.
        #[test]
        fn prop_unknown_key_renders_empty(key in "zz_[a-z_]{1,10}", data in arb_bag()) {
            let source = format!("<{{{{{}}}}}>", key);
            prop_assert_eq!(render(&source, &data).unwrap(), "<>");
        }
    }
}
