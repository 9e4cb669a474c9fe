//! Lightweight, language-agnostic workspace scanner backing the Context
//! Assembler's L11 export map and L12 architecture graph (spec §4.8, §6).
//!
//! Deliberately shallow: this is pattern matching over source text, not a
//! real parser. It is good enough to answer "what does this directory
//! export" and "who imports whom", not to replace an AST tool.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use ignore::WalkBuilder;
use regex::Regex;

const SOURCE_EXTENSIONS: &[&str] = &["rs", "ts", "tsx", "js", "jsx", "py", "go"];
const MAX_SCANNED_FILES: usize = 2000;

static EXPORT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"^\s*pub\s+(?:async\s+)?(?:fn|struct|enum|trait|const|static)\s+(\w+)").unwrap(),
        Regex::new(r"^\s*export\s+(?:default\s+)?(?:async\s+)?(?:function|class|const|let|interface|type)\s+(\w+)")
            .unwrap(),
        Regex::new(r"^(?:def|class)\s+(\w+)").unwrap(),
        Regex::new(r"^func\s+([A-Z]\w*)").unwrap(),
    ]
});

static IMPORT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r#"use\s+crate::([\w:]+)"#).unwrap(),
        Regex::new(r#"from\s+['"]\.{1,2}/([\w\-/]+)['"]"#).unwrap(),
        Regex::new(r#"from\s+([\w.]+)\s+import"#).unwrap(),
        Regex::new(r#"import\s+(?:\(|")?([\w./\-]+)"#).unwrap(),
    ]
});

static ENDPOINT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r#"#\[(get|post|put|delete|patch)\(\s*"([^"]+)"#).unwrap(),
        Regex::new(r#"\.route\(\s*"([^"]+)"\s*,"#).unwrap(),
        Regex::new(r#"app\.(get|post|put|delete|patch)\(\s*['"]([^'"]+)"#).unwrap(),
        Regex::new(r#"@app\.route\(\s*['"]([^'"]+)"#).unwrap(),
    ]
});

fn is_source_file(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()).map(|e| SOURCE_EXTENSIONS.contains(&e)).unwrap_or(false)
}

fn relative_dir(workspace_root: &Path, file: &Path) -> String {
    file.strip_prefix(workspace_root)
        .unwrap_or(file)
        .parent()
        .map(|p| p.to_string_lossy().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| ".".to_string())
}

fn walk_source_files(workspace_root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in WalkBuilder::new(workspace_root).hidden(false).build().flatten() {
        if files.len() >= MAX_SCANNED_FILES {
            break;
        }
        let path = entry.path();
        if path.is_file() && is_source_file(path) {
            files.push(path.to_path_buf());
        }
    }
    files
}

/// Every directory (relative to `workspace_root`) that contains at least one
/// recognized source file. Used by the Context Assembler's knowledge-gap
/// section to find directories with no item coverage.
pub fn list_source_dirs(workspace_root: &Path) -> HashSet<String> {
    walk_source_files(workspace_root).iter().map(|f| relative_dir(workspace_root, f)).collect()
}

/// Per-directory export digest: `relative directory -> exported symbol names`.
/// Directories with no recognized export are omitted.
pub fn scan_exports(workspace_root: &Path) -> BTreeMap<String, Vec<String>> {
    let mut exports: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for file in walk_source_files(workspace_root) {
        let Ok(content) = std::fs::read_to_string(&file) else { continue };
        let dir = relative_dir(workspace_root, &file);

        for line in content.lines() {
            for pattern in EXPORT_PATTERNS.iter() {
                if let Some(caps) = pattern.captures(line) {
                    if let Some(name) = caps.get(1) {
                        exports.entry(dir.clone()).or_default().push(name.as_str().to_string());
                    }
                }
            }
        }
    }

    for symbols in exports.values_mut() {
        symbols.sort();
        symbols.dedup();
    }
    exports
}

/// Summary of the architecture graph inferred from local import statements
/// (spec §4.8 L12).
#[derive(Debug, Clone, Default)]
pub struct ArchitectureGraph {
    /// Directories with no local importers, outermost-first.
    pub entry_points: Vec<String>,
    /// Directories that import nothing else locally.
    pub leaf_nodes: Vec<String>,
    /// Directory pairs that import each other, directly or transitively.
    pub circular_deps: Vec<(String, String)>,
    /// Route strings recognized from common web-framework attribute/call
    /// patterns.
    pub api_endpoints: Vec<String>,
}

fn extract_imported_dirs(content: &str, own_dir: &str, known_dirs: &HashSet<String>) -> HashSet<String> {
    let mut imported = HashSet::new();
    for line in content.lines() {
        for pattern in IMPORT_PATTERNS.iter() {
            if let Some(caps) = pattern.captures(line) {
                let Some(raw) = caps.get(1) else { continue };
                let normalized = raw.as_str().replace("::", "/").replace('.', "/");
                // Accept any known directory that the import path mentions,
                // so `crate::memory::Item` resolves to the `memory` module
                // dir even though the captured path is fully qualified.
                for dir in known_dirs {
                    if dir != own_dir && !dir.is_empty() && normalized.contains(dir.as_str()) {
                        imported.insert(dir.clone());
                    }
                }
            }
        }
    }
    imported
}

fn has_cycle_from(start: &str, graph: &HashMap<String, HashSet<String>>) -> Option<String> {
    let mut stack = vec![start.to_string()];
    let mut visited = HashSet::new();
    while let Some(node) = stack.pop() {
        if let Some(neighbors) = graph.get(&node) {
            for next in neighbors {
                if next == start {
                    return Some(node);
                }
                if visited.insert(next.clone()) {
                    stack.push(next.clone());
                }
            }
        }
    }
    None
}

/// Infer a coarse directory-level dependency graph and flag cycles /
/// entry-and-leaf directories. Also collects any recognizable API route
/// strings encountered along the way.
pub fn detect_architecture(workspace_root: &Path) -> ArchitectureGraph {
    let files = walk_source_files(workspace_root);
    let known_dirs: HashSet<String> = files.iter().map(|f| relative_dir(workspace_root, f)).collect();

    let mut graph: HashMap<String, HashSet<String>> = HashMap::new();
    let mut incoming: HashMap<String, usize> = HashMap::new();
    let mut api_endpoints = Vec::new();

    for dir in &known_dirs {
        graph.entry(dir.clone()).or_default();
        incoming.entry(dir.clone()).or_insert(0);
    }

    for file in &files {
        let Ok(content) = std::fs::read_to_string(file) else { continue };
        let dir = relative_dir(workspace_root, file);

        let imported = extract_imported_dirs(&content, &dir, &known_dirs);
        for target in &imported {
            if graph.entry(dir.clone()).or_default().insert(target.clone()) {
                *incoming.entry(target.clone()).or_insert(0) += 1;
            }
        }

        for pattern in ENDPOINT_PATTERNS.iter() {
            for caps in pattern.captures_iter(&content) {
                let route = caps.iter().skip(1).flatten().last().map(|m| m.as_str().to_string());
                if let Some(route) = route {
                    api_endpoints.push(route);
                }
            }
        }
    }

    let mut entry_points: Vec<String> =
        known_dirs.iter().filter(|d| incoming.get(*d).copied().unwrap_or(0) == 0).cloned().collect();
    entry_points.sort();

    let mut leaf_nodes: Vec<String> =
        known_dirs.iter().filter(|d| graph.get(*d).map(|s| s.is_empty()).unwrap_or(true)).cloned().collect();
    leaf_nodes.sort();

    let mut circular_deps = Vec::new();
    let mut seen_pairs = HashSet::new();
    for dir in &known_dirs {
        if let Some(other) = has_cycle_from(dir, &graph) {
            let pair = if dir < &other { (dir.clone(), other.clone()) } else { (other.clone(), dir.clone()) };
            if seen_pairs.insert(pair.clone()) {
                circular_deps.push(pair);
            }
        }
    }

    api_endpoints.sort();
    api_endpoints.dedup();

    ArchitectureGraph { entry_points, leaf_nodes, circular_deps, api_endpoints }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn scans_rust_exports_from_a_temp_workspace() {
        let dir = tempfile::tempdir().expect("tempdir");
        let src_dir = dir.path().join("src");
        std::fs::create_dir_all(&src_dir).expect("mkdir");
        let mut file = std::fs::File::create(src_dir.join("lib.rs")).expect("create");
        writeln!(file, "pub fn hello() {{}}\npub struct Thing;\nfn private_fn() {{}}").expect("write");

        let exports = scan_exports(dir.path());
        let symbols = exports.get("src").expect("src dir scanned");
        assert!(symbols.contains(&"hello".to_string()));
        assert!(symbols.contains(&"Thing".to_string()));
        assert!(!symbols.contains(&"private_fn".to_string()));
    }
}
