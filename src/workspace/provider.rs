//! Source analysis provider: call-expression enumeration and symbol
//! resolution over a workspace of C# documents, backed by tree-sitter.
//!
//! Opening a workspace runs a declaration pass that indexes every method
//! declaration by simple name; per-document call-site extraction happens on
//! demand so the collector can parallelize it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use ignore::WalkBuilder;
use tracing::debug;

use crate::{clean_path, read_file_lossy, CoverageError};

// ─── Provider contract ──────────────────────────────────────────────

/// A call expression found in a workspace document, with its syntactic
/// location and the context needed to resolve it.
#[derive(Debug, Clone)]
pub struct CallSite {
    /// Simple name of the invoked method, generic arguments stripped.
    pub simple_name: String,
    pub file_path: String,
    /// 1-based line of the call expression.
    pub line: u32,
    /// 1-based column of the call expression.
    pub column: u32,
    /// Nearest enclosing type declaration, if any.
    pub enclosing_type: Option<String>,
    /// Receiver type inferred at the call site (field/local/parameter types,
    /// `this`, or a static type name). `None` for plain `Foo()` calls.
    pub receiver_type: Option<String>,
}

/// A statically resolved call target.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSymbol {
    pub simple_name: String,
    /// `None` when the declaration has no source in the workspace.
    pub declaration_file_path: Option<String>,
    /// `None` when the declaring type cannot be determined.
    pub declaring_type_name: Option<String>,
}

/// Black-box symbol-resolution facility over a workspace of source
/// documents. The collector and filters only ever talk to this trait, so
/// they stay provider-agnostic and mock-testable.
pub trait SourceAnalysisProvider: Sync {
    /// Every document in the workspace, in enumeration order.
    fn documents(&self) -> &[String];

    /// All call expressions in one document. Failure to read or parse a
    /// document is fatal for the whole scan.
    fn call_sites(&self, document: &str) -> Result<Vec<CallSite>, CoverageError>;

    /// Resolve a call to its target declaration. `None` when the target
    /// cannot be determined statically, an expected gap rather than an error.
    fn resolve(&self, call: &CallSite) -> Option<ResolvedSymbol>;
}

// ─── C# workspace ───────────────────────────────────────────────────

/// Where one method declaration lives.
#[derive(Debug, Clone, PartialEq)]
struct MethodDecl {
    file_path: String,
    containing_type: Option<String>,
}

/// Tree-sitter-backed provider for a directory of C# sources.
#[derive(Debug)]
pub struct CsWorkspace {
    documents: Vec<String>,
    /// Simple method name → every declaration across the workspace.
    declarations: HashMap<String, Vec<MethodDecl>>,
}

impl CsWorkspace {
    /// Walk `root` for `.cs` files and build the workspace-wide declaration
    /// index. Read and parse failures are fatal here, matching the
    /// "cannot open the workspace" contract.
    pub fn open(root: &Path, threads: usize) -> Result<Self, CoverageError> {
        let root = std::fs::canonicalize(root).unwrap_or_else(|_| PathBuf::from(root));
        if !root.is_dir() {
            return Err(CoverageError::Workspace(format!(
                "workspace directory does not exist: {}",
                root.display()
            )));
        }

        let mut documents = Vec::new();
        let mut walker = WalkBuilder::new(&root);
        walker.hidden(false).git_ignore(true);
        for entry in walker.build() {
            let entry = entry
                .map_err(|e| CoverageError::Workspace(format!("workspace walk failed: {e}")))?;
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }
            let path = entry.path();
            if path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("cs"))
            {
                documents.push(clean_path(&path.to_string_lossy()));
            }
        }
        // Deterministic document order regardless of filesystem enumeration
        documents.sort();

        let declarations = index_declarations(&documents, threads)?;
        debug!(
            documents = documents.len(),
            method_names = declarations.len(),
            "workspace declaration index built"
        );

        Ok(Self { documents, declarations })
    }

    #[cfg(test)]
    pub(crate) fn declared_method_names(&self) -> Vec<&str> {
        self.declarations.keys().map(String::as_str).collect()
    }
}

impl SourceAnalysisProvider for CsWorkspace {
    fn documents(&self) -> &[String] {
        &self.documents
    }

    fn call_sites(&self, document: &str) -> Result<Vec<CallSite>, CoverageError> {
        let (source, _) = read_file_lossy(Path::new(document)).map_err(|e| {
            CoverageError::Workspace(format!("failed to read document {document}: {e}"))
        })?;
        let mut parser = csharp_parser();
        let tree = parser.parse(&source, None).ok_or_else(|| {
            CoverageError::Workspace(format!("tree-sitter failed to parse {document}"))
        })?;

        let analysis = analyze_document(tree.root_node(), source.as_bytes(), document);
        Ok(analysis.calls)
    }

    fn resolve(&self, call: &CallSite) -> Option<ResolvedSymbol> {
        let symbol_for = |decl: &MethodDecl| ResolvedSymbol {
            simple_name: call.simple_name.clone(),
            declaration_file_path: Some(decl.file_path.clone()),
            declaring_type_name: decl.containing_type.clone(),
        };

        match self.declarations.get(&call.simple_name) {
            Some(decls) if decls.len() == 1 => Some(symbol_for(&decls[0])),
            Some(decls) => {
                // Several declarations share the simple name. A receiver
                // type hint picks the declaring type; a receiverless call
                // targets the enclosing type (self-call). No single match
                // means the target cannot be determined statically.
                let hint = call
                    .receiver_type
                    .as_deref()
                    .or(call.enclosing_type.as_deref())?;
                let mut matched = decls
                    .iter()
                    .filter(|d| d.containing_type.as_deref() == Some(hint));
                let first = matched.next()?;
                if matched.next().is_some() {
                    return None;
                }
                Some(symbol_for(first))
            }
            None => {
                // Not declared anywhere in the workspace: an external
                // symbol. Resolvable only when the receiver names a type;
                // a receiverless call to an unknown name stays unresolved.
                let receiver = call.receiver_type.clone()?;
                Some(ResolvedSymbol {
                    simple_name: call.simple_name.clone(),
                    declaration_file_path: None,
                    declaring_type_name: Some(receiver),
                })
            }
        }
    }
}

fn csharp_parser() -> tree_sitter::Parser {
    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(&tree_sitter_c_sharp::LANGUAGE.into())
        .expect("Error loading C# grammar");
    parser
}

// ─── Declaration pass ───────────────────────────────────────────────

/// Parse every document and merge their method declarations into one
/// name-keyed index. Parsing fans out over scoped threads, one parser per
/// worker; the first fatal error aborts the remaining chunks.
fn index_declarations(
    documents: &[String],
    threads: usize,
) -> Result<HashMap<String, Vec<MethodDecl>>, CoverageError> {
    let num_threads = effective_threads(threads);
    let chunk_size = documents.len().div_ceil(num_threads).max(1);
    let abort = AtomicBool::new(false);

    let thread_results: Vec<Result<Vec<(String, MethodDecl)>, CoverageError>> =
        std::thread::scope(|s| {
            let handles: Vec<_> = documents
                .chunks(chunk_size)
                .map(|chunk| {
                    let abort = &abort;
                    s.spawn(move || {
                        let mut parser = csharp_parser();
                        let mut decls = Vec::new();
                        for document in chunk {
                            if abort.load(Ordering::Relaxed) {
                                break;
                            }
                            match declarations_in(&mut parser, document) {
                                Ok(found) => decls.extend(found),
                                Err(e) => {
                                    abort.store(true, Ordering::Relaxed);
                                    return Err(e);
                                }
                            }
                        }
                        Ok(decls)
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(|h| {
                    h.join().unwrap_or_else(|_| {
                        Err(CoverageError::Workspace(
                            "worker thread panicked during declaration indexing".to_string(),
                        ))
                    })
                })
                .collect()
        });

    let mut declarations: HashMap<String, Vec<MethodDecl>> = HashMap::new();
    for result in thread_results {
        for (name, decl) in result? {
            declarations.entry(name).or_default().push(decl);
        }
    }
    Ok(declarations)
}

fn declarations_in(
    parser: &mut tree_sitter::Parser,
    document: &str,
) -> Result<Vec<(String, MethodDecl)>, CoverageError> {
    let (source, _) = read_file_lossy(Path::new(document)).map_err(|e| {
        CoverageError::Workspace(format!("failed to read document {document}: {e}"))
    })?;
    let tree = parser.parse(&source, None).ok_or_else(|| {
        CoverageError::Workspace(format!("tree-sitter failed to parse {document}"))
    })?;

    let analysis = analyze_document(tree.root_node(), source.as_bytes(), document);
    Ok(analysis.method_decls)
}

pub(super) fn effective_threads(threads: usize) -> usize {
    if threads > 0 {
        threads
    } else {
        std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
    }
}

// ─── Document analysis ──────────────────────────────────────────────

struct DocumentAnalysis {
    method_decls: Vec<(String, MethodDecl)>,
    calls: Vec<CallSite>,
}

const TYPE_DECLARATION_KINDS: &[&str] = &[
    "class_declaration",
    "struct_declaration",
    "record_declaration",
    "interface_declaration",
];

/// Single entry point for both passes: collects method declarations, builds
/// per-type member type maps, then walks the whole tree for invocations so
/// call sites outside method bodies (field initializers, top-level
/// statements) are seen too.
fn analyze_document(root: tree_sitter::Node, source: &[u8], file_path: &str) -> DocumentAnalysis {
    let mut member_types: HashMap<String, HashMap<String, String>> = HashMap::new();
    let mut method_decls = Vec::new();
    collect_declarations(root, source, file_path, &mut Vec::new(), &mut member_types, &mut method_decls);

    let mut calls = Vec::new();
    let mut type_stack: Vec<String> = Vec::new();
    let mut scopes: Vec<HashMap<String, String>> = Vec::new();
    collect_invocations(
        root,
        source,
        file_path,
        &member_types,
        &mut type_stack,
        &mut scopes,
        &mut calls,
    );

    DocumentAnalysis { method_decls, calls }
}

fn node_text<'a>(node: tree_sitter::Node, source: &'a [u8]) -> &'a str {
    node.utf8_text(source).unwrap_or("")
}

/// Base type name: generic arguments, nullability marker, and namespace
/// qualifiers stripped. `Task<List<Pet>>?` → `Task`, `Api.PetClient` →
/// `PetClient`.
fn base_type_name(type_text: &str) -> Option<String> {
    let base = type_text.split('<').next().unwrap_or(type_text);
    let base = base.trim().trim_end_matches('?');
    let base = base.rsplit('.').next().unwrap_or(base).trim();
    if base.is_empty() { None } else { Some(base.to_string()) }
}

fn declared_type_name(node: tree_sitter::Node, source: &[u8]) -> Option<String> {
    node.child_by_field_name("name")
        .map(|n| node_text(n, source).to_string())
        .filter(|n| !n.is_empty())
}

/// First pass: method declarations plus field/property/parameter types per
/// containing type (the receiver-inference table).
fn collect_declarations(
    node: tree_sitter::Node,
    source: &[u8],
    file_path: &str,
    type_stack: &mut Vec<String>,
    member_types: &mut HashMap<String, HashMap<String, String>>,
    method_decls: &mut Vec<(String, MethodDecl)>,
) {
    let kind = node.kind();

    if TYPE_DECLARATION_KINDS.contains(&kind) {
        if let Some(name) = declared_type_name(node, source) {
            type_stack.push(name);
            for i in 0..node.child_count() {
                if let Some(child) = node.child(i) {
                    collect_declarations(child, source, file_path, type_stack, member_types, method_decls);
                }
            }
            type_stack.pop();
            return;
        }
    }

    match kind {
        "method_declaration" => {
            if let Some(name) = declared_type_name(node, source) {
                method_decls.push((
                    name,
                    MethodDecl {
                        file_path: file_path.to_string(),
                        containing_type: type_stack.last().cloned(),
                    },
                ));
            }
        }
        "field_declaration" => {
            if let Some(owner) = type_stack.last() {
                if let Some(var_decl) = find_child_by_kind(node, "variable_declaration") {
                    record_variable_declaration(
                        var_decl,
                        source,
                        member_types.entry(owner.clone()).or_default(),
                    );
                }
            }
        }
        "property_declaration" => {
            if let Some(owner) = type_stack.last() {
                let type_node = node.child_by_field_name("type");
                let name = declared_type_name(node, source);
                if let (Some(t), Some(name)) = (type_node, name) {
                    if let Some(base) = base_type_name(node_text(t, source)) {
                        member_types.entry(owner.clone()).or_default().insert(name, base);
                    }
                }
            }
        }
        _ => {}
    }

    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            collect_declarations(child, source, file_path, type_stack, member_types, method_decls);
        }
    }
}

/// Record `Type name` pairs from a `variable_declaration` node, inferring
/// `var x = new Foo()` through the initializer.
fn record_variable_declaration(
    var_decl: tree_sitter::Node,
    source: &[u8],
    out: &mut HashMap<String, String>,
) {
    let Some(type_node) = var_decl.child(0) else {
        return;
    };
    let type_text = node_text(type_node, source).trim().to_string();
    let is_var = type_text == "var" || type_text == "dynamic";
    let explicit_base = if is_var { None } else { base_type_name(&type_text) };

    for i in 0..var_decl.child_count() {
        let Some(child) = var_decl.child(i) else { continue };
        if child.kind() != "variable_declarator" {
            continue;
        }
        let name_node = child.child_by_field_name("name").or_else(|| child.child(0));
        let Some(name_node) = name_node else { continue };
        if name_node.kind() != "identifier" {
            continue;
        }
        let name = node_text(name_node, source).trim().to_string();
        if name.is_empty() {
            continue;
        }

        if let Some(base) = &explicit_base {
            out.insert(name, base.clone());
        } else if let Some(creation) = find_descendant_by_kind(child, "object_creation_expression") {
            if let Some(type_node) = creation.child_by_field_name("type") {
                if let Some(base) = base_type_name(node_text(type_node, source)) {
                    out.insert(name, base);
                }
            }
        }
    }
}

/// Second pass: every invocation expression in the document, resolved
/// against the scope stack for receiver hints.
fn collect_invocations(
    node: tree_sitter::Node,
    source: &[u8],
    file_path: &str,
    member_types: &HashMap<String, HashMap<String, String>>,
    type_stack: &mut Vec<String>,
    scopes: &mut Vec<HashMap<String, String>>,
    calls: &mut Vec<CallSite>,
) {
    let kind = node.kind();

    if TYPE_DECLARATION_KINDS.contains(&kind) {
        if let Some(name) = declared_type_name(node, source) {
            type_stack.push(name);
            for i in 0..node.child_count() {
                if let Some(child) = node.child(i) {
                    collect_invocations(child, source, file_path, member_types, type_stack, scopes, calls);
                }
            }
            type_stack.pop();
            return;
        }
    }

    match kind {
        "method_declaration" | "constructor_declaration" | "local_function_statement" => {
            // Fresh scope seeded with the containing type's members plus
            // the declaration's own parameter types.
            let mut scope = type_stack
                .last()
                .and_then(|t| member_types.get(t))
                .cloned()
                .unwrap_or_default();
            collect_parameter_types(node, source, &mut scope);
            scopes.push(scope);
            for i in 0..node.child_count() {
                if let Some(child) = node.child(i) {
                    collect_invocations(child, source, file_path, member_types, type_stack, scopes, calls);
                }
            }
            scopes.pop();
            return;
        }
        "local_declaration_statement" => {
            if let (Some(var_decl), Some(scope)) =
                (find_child_by_kind(node, "variable_declaration"), scopes.last_mut())
            {
                record_variable_declaration(var_decl, source, scope);
            }
        }
        "invocation_expression" => {
            if let Some(call) = extract_invocation(node, source, file_path, type_stack, scopes) {
                calls.push(call);
            }
            // Recurse into all children: the expression child may contain
            // nested invocations for chained calls, and so may arguments.
        }
        "conditional_access_expression" => {
            if let Some(call) = extract_conditional_access(node, source, file_path, type_stack, scopes) {
                calls.push(call);
            }
        }
        _ => {}
    }

    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            collect_invocations(child, source, file_path, member_types, type_stack, scopes, calls);
        }
    }
}

fn collect_parameter_types(decl: tree_sitter::Node, source: &[u8], scope: &mut HashMap<String, String>) {
    let Some(params) = find_child_by_kind(decl, "parameter_list") else {
        return;
    };
    for i in 0..params.child_count() {
        let Some(param) = params.child(i) else { continue };
        if param.kind() != "parameter" {
            continue;
        }
        let type_node = param.child_by_field_name("type");
        let name_node = param.child_by_field_name("name");
        if let (Some(t), Some(n)) = (type_node, name_node) {
            if let Some(base) = base_type_name(node_text(t, source)) {
                scope.insert(node_text(n, source).to_string(), base);
            }
        }
    }
}

fn make_call_site(
    node: tree_sitter::Node,
    simple_name: String,
    file_path: &str,
    type_stack: &[String],
    receiver_type: Option<String>,
) -> CallSite {
    let pos = node.start_position();
    CallSite {
        simple_name,
        file_path: file_path.to_string(),
        line: pos.row as u32 + 1,
        column: pos.column as u32 + 1,
        enclosing_type: type_stack.last().cloned(),
        receiver_type,
    }
}

/// Method name from an `identifier` or `generic_name` node
/// (`Method<T>` → `Method`).
fn simple_name_of(name_node: tree_sitter::Node, source: &[u8]) -> String {
    if name_node.kind() == "generic_name" {
        if let Some(id) = name_node.child(0) {
            if id.kind() == "identifier" {
                return node_text(id, source).to_string();
            }
        }
        let text = node_text(name_node, source);
        return text.split('<').next().unwrap_or(text).to_string();
    }
    node_text(name_node, source).to_string()
}

fn extract_invocation(
    node: tree_sitter::Node,
    source: &[u8],
    file_path: &str,
    type_stack: &[String],
    scopes: &[HashMap<String, String>],
) -> Option<CallSite> {
    let expr = node.child(0)?;
    match expr.kind() {
        "identifier" | "generic_name" => {
            let name = simple_name_of(expr, source);
            if name.is_empty() {
                return None;
            }
            Some(make_call_site(node, name, file_path, type_stack, None))
        }
        "member_access_expression" => {
            let name_node = expr.child_by_field_name("name")?;
            let name = simple_name_of(name_node, source);
            if name.is_empty() {
                return None;
            }
            let receiver = expr
                .child_by_field_name("expression")
                .or_else(|| expr.child(0))
                .and_then(|r| receiver_hint(r, source, type_stack, scopes));
            Some(make_call_site(node, name, file_path, type_stack, receiver))
        }
        _ => None,
    }
}

/// `x?.Foo()`: the invocation lives under a `member_binding_expression`
/// inside the conditional access.
fn extract_conditional_access(
    node: tree_sitter::Node,
    source: &[u8],
    file_path: &str,
    type_stack: &[String],
    scopes: &[HashMap<String, String>],
) -> Option<CallSite> {
    let mut binding = None;
    for i in 0..node.child_count() {
        let child = node.child(i)?;
        if child.kind() == "invocation_expression" {
            if let Some(inner) = child.child(0) {
                if inner.kind() == "member_binding_expression" {
                    binding = Some((child, inner));
                    break;
                }
            }
        }
        if child.kind() == "member_binding_expression" {
            // member binding directly followed by an argument list
            binding = Some((node, child));
            break;
        }
    }
    let (call_node, binding) = binding?;
    if find_child_by_kind(call_node, "argument_list").is_none()
        && call_node.kind() != "invocation_expression"
    {
        return None;
    }

    let name_node = binding
        .child_by_field_name("name")
        .or_else(|| binding.child(binding.child_count().saturating_sub(1)))?;
    let name = simple_name_of(name_node, source);
    if name.is_empty() {
        return None;
    }
    let receiver = node
        .child(0)
        .and_then(|r| receiver_hint(r, source, type_stack, scopes));
    Some(make_call_site(node, name, file_path, type_stack, receiver))
}

/// Infer the receiver's type name at a call site. Checks the scope stack
/// (locals, parameters, fields) first, then falls back to treating a
/// PascalCase identifier as a static type reference.
fn receiver_hint(
    receiver: tree_sitter::Node,
    source: &[u8],
    type_stack: &[String],
    scopes: &[HashMap<String, String>],
) -> Option<String> {
    match receiver.kind() {
        "identifier" => {
            let name = node_text(receiver, source).trim();
            for scope in scopes.iter().rev() {
                if let Some(t) = scope.get(name) {
                    return Some(t.clone());
                }
            }
            if name.chars().next().is_some_and(|c| c.is_uppercase()) {
                return Some(name.to_string());
            }
            None
        }
        "this_expression" => type_stack.last().cloned(),
        "object_creation_expression" => receiver
            .child_by_field_name("type")
            .and_then(|t| base_type_name(node_text(t, source))),
        "member_access_expression" => {
            // Chained access: resolve the last member through the scope
            // stack, else take a PascalCase segment as a type name.
            let name_node = receiver.child_by_field_name("name")?;
            let name = node_text(name_node, source).trim();
            for scope in scopes.iter().rev() {
                if let Some(t) = scope.get(name) {
                    return Some(t.clone());
                }
            }
            if name.chars().next().is_some_and(|c| c.is_uppercase()) {
                return Some(name.to_string());
            }
            None
        }
        _ => None,
    }
}

fn find_child_by_kind<'a>(node: tree_sitter::Node<'a>, kind: &str) -> Option<tree_sitter::Node<'a>> {
    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            if child.kind() == kind {
                return Some(child);
            }
        }
    }
    None
}

fn find_descendant_by_kind<'a>(node: tree_sitter::Node<'a>, kind: &str) -> Option<tree_sitter::Node<'a>> {
    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            if child.kind() == kind {
                return Some(child);
            }
            if let Some(found) = find_descendant_by_kind(child, kind) {
                return Some(found);
            }
        }
    }
    None
}
