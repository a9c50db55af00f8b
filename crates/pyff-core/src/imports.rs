//! Import extraction and the local-name -> canonical-name binding table
//!
//! Every other comparison stage needs to know what a bare identifier or
//! attribute chain *really* refers to, independent of whatever alias the
//! source happened to spell it with. [`ImportedNames`] is that table.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use ruff_python_ast::{ModModule, Stmt};

use crate::render::{hlistify, pluralize};

/// A single local binding introduced by an import statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedName {
    /// The identifier bound into the module's namespace
    pub local_name: String,
    /// The fully-qualified dotted path the local name refers to
    pub canonical_name: String,
    /// `canonical_name` split on `.`, cached for AST reconstruction
    pub canonical_parts: Vec<String>,
}

impl ImportedName {
    fn new(local_name: String, canonical_name: String) -> Self {
        let canonical_parts = canonical_name.split('.').map(str::to_string).collect();
        Self {
            local_name,
            canonical_name,
            canonical_parts,
        }
    }
}

/// The set of local names a module binds via `import`/`from ... import ...`,
/// keyed by local name and in source order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportedNames(IndexMap<String, ImportedName>);

impl ImportedNames {
    /// Walk a module's top-level statements and collect its import bindings
    ///
    /// Star imports (`from x import *`) introduce no local name we can track
    /// and are intentionally skipped; any usage they might enable can never
    /// be canonicalized, so it is reported, conservatively, as relevant.
    pub fn extract(module: &ModModule) -> Self {
        let mut names = IndexMap::new();
        for stmt in &module.body {
            match stmt {
                Stmt::Import(import) => {
                    for alias in &import.names {
                        let canonical = alias.name.to_string();
                        let local = alias
                            .asname
                            .as_ref()
                            .map(|a| a.to_string())
                            .unwrap_or_else(|| {
                                canonical.split('.').next().unwrap_or(&canonical).to_string()
                            });
                        // `import a.b.c` (no alias) binds `a`, not `a.b.c`, but references
                        // through that local name can reach the whole dotted path, so the
                        // canonical name stays the full path exactly as written.
                        names.insert(local.clone(), ImportedName::new(local, canonical));
                    }
                }
                Stmt::ImportFrom(import_from) => {
                    let module_path = import_from.module.as_ref().map(|m| m.to_string());
                    for alias in &import_from.names {
                        if alias.name.as_str() == "*" {
                            continue;
                        }
                        let local = alias
                            .asname
                            .as_ref()
                            .map(|a| a.to_string())
                            .unwrap_or_else(|| alias.name.to_string());
                        let canonical = match &module_path {
                            Some(m) => format!("{m}.{}", alias.name.as_str()),
                            None => alias.name.to_string(),
                        };
                        names.insert(local.clone(), ImportedName::new(local, canonical));
                    }
                }
                _ => {}
            }
        }
        Self(names)
    }

    /// Look up a local name's binding, if any
    pub fn get(&self, local_name: &str) -> Option<&ImportedName> {
        self.0.get(local_name)
    }

    /// The canonical dotted path a local name resolves to, if imported
    pub fn canonical_of(&self, local_name: &str) -> Option<&str> {
        self.0.get(local_name).map(|n| n.canonical_name.as_str())
    }

    /// Whether `local_name` is bound by an import
    pub fn contains(&self, local_name: &str) -> bool {
        self.0.contains_key(local_name)
    }

    fn local_names(&self) -> BTreeSet<String> {
        self.0.keys().cloned().collect()
    }
}

/// Difference between the import bindings of two versions of a module
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportsDiff {
    /// Local names bound in `old` but not in `new`
    pub removed: BTreeSet<String>,
    /// Local names bound in `new` but not in `old`
    pub new: BTreeSet<String>,
}

impl ImportsDiff {
    fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.new.is_empty()
    }
}

impl std::fmt::Display for ImportsDiff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut lines = Vec::new();
        if !self.removed.is_empty() {
            lines.push(format!(
                "Removed {} {}",
                pluralize("import", self.removed.len()),
                hlistify(&self.removed)
            ));
        }
        if !self.new.is_empty() {
            lines.push(format!(
                "New {} {}",
                pluralize("import", self.new.len()),
                hlistify(&self.new)
            ));
        }
        write!(f, "{}", lines.join("\n"))
    }
}

/// Compare the import bindings of two modules, keyed by local name
///
/// Reports on the local names actually available to the rest of the module,
/// not the canonical targets they resolve to: renaming an alias without
/// changing what it points at is still a visible change to every statement
/// that used the old local name.
pub fn pyff_imports(old: &ImportedNames, new: &ImportedNames) -> Option<ImportsDiff> {
    let old_names = old.local_names();
    let new_names = new.local_names();
    let diff = ImportsDiff {
        removed: old_names.difference(&new_names).cloned().collect(),
        new: new_names.difference(&old_names).cloned().collect(),
    };
    if diff.is_empty() {
        None
    } else {
        Some(diff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ruff_python_parser::parse_module;

    fn extract(src: &str) -> ImportedNames {
        let module = parse_module(src).unwrap().into_syntax();
        ImportedNames::extract(&module)
    }

    #[test]
    fn plain_import_binds_top_level_name() {
        let names = extract("import os\n");
        let binding = names.get("os").unwrap();
        assert_eq!(binding.canonical_name, "os");
    }

    #[test]
    fn dotted_import_binds_first_component_with_full_canonical() {
        let names = extract("import os.path\n");
        let binding = names.get("os").unwrap();
        assert_eq!(binding.canonical_name, "os.path");
        assert_eq!(binding.canonical_parts, vec!["os", "path"]);
    }

    #[test]
    fn aliased_import_binds_alias() {
        let names = extract("import numpy as np\n");
        assert!(names.get("numpy").is_none());
        assert_eq!(names.get("np").unwrap().canonical_name, "numpy");
    }

    #[test]
    fn from_import_joins_module_and_name() {
        let names = extract("from os.path import join\n");
        assert_eq!(names.get("join").unwrap().canonical_name, "os.path.join");
    }

    #[test]
    fn from_import_with_alias() {
        let names = extract("from os.path import join as j\n");
        let binding = names.get("j").unwrap();
        assert_eq!(binding.canonical_name, "os.path.join");
    }

    #[test]
    fn star_import_binds_nothing() {
        let names = extract("from os import *\n");
        assert!(names.get("*").is_none());
    }

    #[test]
    fn pyff_imports_reports_local_name_set_difference() {
        let old = extract("import os\n");
        let new = extract("from os.path import join\n");
        let diff = pyff_imports(&old, &new).unwrap();
        assert!(diff.removed.contains("os"));
        assert!(diff.new.contains("join"));
    }

    #[test]
    fn pyff_imports_is_none_when_unchanged() {
        let old = extract("import os\n");
        let new = extract("import os\n");
        assert!(pyff_imports(&old, &new).is_none());
    }
}
