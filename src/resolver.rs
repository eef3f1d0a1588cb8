//! Method name resolver: matches contract endpoints to generated client
//! methods by textual heuristics over the client's declaration source.
//!
//! A client method implements an endpoint when its body carries the HTTP
//! method as a string literal and a comment attached to the declaration
//! mentions the endpoint path in quotes, the shape NSwag emits for every
//! operation.

use std::collections::HashSet;

use crate::{caseless_eq, CoverageError, Endpoint, MethodBinding};

/// Normalize an endpoint path into the quoted token searched for in the
/// client's comments: strip one leading and one trailing '/', then wrap in
/// quotes. A path that already carries quotes was normalized twice.
fn normalize_path(path: &str) -> Result<String, CoverageError> {
    let p = path.strip_prefix('/').unwrap_or(path);
    let p = p.strip_suffix('/').unwrap_or(p);
    if p.starts_with('"') || p.ends_with('"') {
        return Err(CoverageError::MalformedPath { path: p.to_string() });
    }
    Ok(format!("\"{p}\""))
}

fn node_text<'a>(node: tree_sitter::Node, source: &'a [u8]) -> &'a str {
    node.utf8_text(source).unwrap_or("")
}

fn collect_nodes_by_kind<'a>(
    node: tree_sitter::Node<'a>,
    kind: &str,
    out: &mut Vec<tree_sitter::Node<'a>>,
) {
    if node.kind() == kind {
        out.push(node);
    }
    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            collect_nodes_by_kind(child, kind, out);
        }
    }
}

/// Inner text of a string literal node, without the surrounding quotes
/// (handles regular and verbatim literals).
fn literal_value<'a>(node: tree_sitter::Node, source: &'a [u8]) -> &'a str {
    let text = node_text(node, source);
    let text = text.strip_prefix('@').unwrap_or(text);
    text.trim_matches('"')
}

/// Does the method body contain a string literal equal (case-insensitively)
/// to the HTTP method name?
fn body_contains_method_literal(
    method_node: tree_sitter::Node,
    source: &[u8],
    http_method: &str,
) -> bool {
    let body = method_node
        .child_by_field_name("body")
        .or_else(|| find_child_by_kind(method_node, "arrow_expression_clause"));
    let Some(body) = body else {
        return false;
    };

    let mut literals = Vec::new();
    collect_nodes_by_kind(body, "string_literal", &mut literals);
    collect_nodes_by_kind(body, "verbatim_string_literal", &mut literals);
    literals
        .iter()
        .any(|lit| caseless_eq(literal_value(*lit, source), http_method))
}

/// Does any comment attached to the declaration mention the quoted path?
/// "Attached" covers the doc-comment block immediately preceding the
/// declaration and every comment inside it.
fn comments_contain_path(method_node: tree_sitter::Node, source: &[u8], token: &str) -> bool {
    let needle = token.to_lowercase();

    let mut comments = Vec::new();
    collect_nodes_by_kind(method_node, "comment", &mut comments);

    let mut prev = method_node.prev_sibling();
    while let Some(node) = prev {
        if node.kind() != "comment" {
            break;
        }
        comments.push(node);
        prev = node.prev_sibling();
    }

    comments
        .iter()
        .any(|c| node_text(*c, source).to_lowercase().contains(&needle))
}

fn find_child_by_kind<'a>(node: tree_sitter::Node<'a>, kind: &str) -> Option<tree_sitter::Node<'a>> {
    for i in 0..node.child_count() {
        let child = node.child(i)?;
        if child.kind() == kind {
            return Some(child);
        }
    }
    None
}

/// Find the single client method implementing `method` + `path` in the
/// parsed client source. Zero candidates and multiple distinct candidates
/// are both errors; one declaration matching several literals is fine.
pub fn find_method_name(
    parser: &mut tree_sitter::Parser,
    client_source: &str,
    http_method: &str,
    path: &str,
) -> Result<String, CoverageError> {
    let token = normalize_path(path)?;

    let tree = parser.parse(client_source, None).ok_or_else(|| {
        CoverageError::Workspace("tree-sitter failed to parse the generated client".to_string())
    })?;
    let source = client_source.as_bytes();

    let mut methods = Vec::new();
    collect_nodes_by_kind(tree.root_node(), "method_declaration", &mut methods);

    let mut candidates: Vec<String> = Vec::new();
    for method_node in methods {
        if body_contains_method_literal(method_node, source, http_method)
            && comments_contain_path(method_node, source, &token)
        {
            if let Some(name) = method_node.child_by_field_name("name") {
                candidates.push(node_text(name, source).to_string());
            }
        }
    }

    match candidates.len() {
        0 => Err(CoverageError::NotFound {
            method: http_method.to_string(),
            path: token,
        }),
        1 => Ok(candidates.remove(0)),
        _ => Err(CoverageError::AmbiguousMatch {
            method: http_method.to_string(),
            path: token,
            candidates,
        }),
    }
}

/// Resolve every endpoint against the client source and assemble the
/// injective endpoint → method-name binding.
///
/// Endpoints are processed in sorted order so error reporting is
/// deterministic regardless of catalog iteration order.
pub fn build_binding(
    client_source: &str,
    endpoints: &HashSet<Endpoint>,
) -> Result<MethodBinding, CoverageError> {
    let mut sorted: Vec<&Endpoint> = endpoints.iter().collect();
    sorted.sort_by(|a, b| a.method.cmp(&b.method).then_with(|| a.path.cmp(&b.path)));

    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(&tree_sitter_c_sharp::LANGUAGE.into())
        .expect("Error loading C# grammar");

    let mut entries = Vec::with_capacity(sorted.len());
    for endpoint in sorted {
        let name = find_method_name(&mut parser, client_source, &endpoint.method, &endpoint.path)?;
        entries.push((endpoint.clone(), name));
    }
    MethodBinding::new(entries)
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;
