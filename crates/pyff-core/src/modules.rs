//! Module-level comparison: the top of the diff cascade
//!
//! `pyff_module` threads one shared [`ImportedNames`] table per side
//! through the class and function comparators, then folds the three
//! sub-diffs into a single [`ModuleDiff`].

use std::collections::BTreeSet;
use std::path::Path;

use ruff_python_ast::{Expr, ModModule, Stmt};
use ruff_python_parser::parse_module;

use crate::classes::{pyff_classes, ClassesDiff};
use crate::error::{PyffError, Result};
use crate::functions::{pyff_functions, Context, FunctionsDiff};
use crate::imports::{pyff_imports, ImportedNames, ImportsDiff};
use crate::render::{hlistify, pluralize};

/// Top-level assignment targets added or removed between two modules
///
/// The source this engine is modeled on never diffs module-level
/// assignments beyond reporting that *something* changed; here we go one
/// step further and name the bound identifiers, since the AST already
/// hands them to us for free.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OtherDiff {
    pub new: BTreeSet<String>,
    pub removed: BTreeSet<String>,
}

impl OtherDiff {
    fn is_empty(&self) -> bool {
        self.new.is_empty() && self.removed.is_empty()
    }
}

impl std::fmt::Display for OtherDiff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut lines = Vec::new();
        if !self.new.is_empty() {
            lines.push(format!(
                "New {} {}",
                pluralize("variable", self.new.len()),
                hlistify(&self.new)
            ));
        }
        if !self.removed.is_empty() {
            lines.push(format!(
                "Removed {} {}",
                pluralize("variable", self.removed.len()),
                hlistify(&self.removed)
            ));
        }
        write!(f, "{}", lines.join("\n"))
    }
}

fn assign_targets(expr: &Expr) -> Vec<String> {
    match expr {
        Expr::Name(n) => vec![n.id.to_string()],
        Expr::Tuple(t) => t.elts.iter().flat_map(assign_targets).collect(),
        Expr::List(l) => l.elts.iter().flat_map(assign_targets).collect(),
        _ => Vec::new(),
    }
}

/// Top-level variable names bound by plain or annotated assignment
///
/// Only simple `Name` targets are tracked: attribute/subscript targets
/// bind nothing new into the module namespace and are ignored.
fn top_level_variables(body: &[Stmt]) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    for stmt in body {
        match stmt {
            Stmt::Assign(assign) => {
                for target in &assign.targets {
                    names.extend(assign_targets(target));
                }
            }
            Stmt::AnnAssign(ann) => {
                names.extend(assign_targets(&ann.target));
            }
            _ => {}
        }
    }
    names
}

fn pyff_other(old_body: &[Stmt], new_body: &[Stmt]) -> Option<OtherDiff> {
    let old_vars = top_level_variables(old_body);
    let new_vars = top_level_variables(new_body);
    let diff = OtherDiff {
        new: new_vars.difference(&old_vars).cloned().collect(),
        removed: old_vars.difference(&new_vars).cloned().collect(),
    };
    if diff.is_empty() {
        None
    } else {
        Some(diff)
    }
}

/// Summary of a module, enough to identify it in a package-level diff
#[derive(Debug, Clone)]
pub struct ModuleSummary {
    pub name: String,
    pub module: ModModule,
}

impl ModuleSummary {
    pub fn from_source(name: impl Into<String>, source: &str) -> Result<Self> {
        let parsed = parse_module(source).map_err(|e| PyffError::parse_error(e.to_string()))?;
        Ok(Self {
            name: name.into(),
            module: parsed.into_syntax(),
        })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Self::from_source(name, &source)
    }
}

/// Everything that changed between two versions of a module, or `None` if
/// they are semantically identical
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModuleDiff {
    pub imports: Option<ImportsDiff>,
    pub classes: Option<ClassesDiff>,
    pub functions: Option<FunctionsDiff>,
    pub other: Option<OtherDiff>,
}

impl ModuleDiff {
    fn is_empty(&self) -> bool {
        self.imports.is_none() && self.classes.is_none() && self.functions.is_none() && self.other.is_none()
    }
}

impl std::fmt::Display for ModuleDiff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = [
            self.imports.as_ref().map(ToString::to_string),
            self.classes.as_ref().map(ToString::to_string),
            self.functions.as_ref().map(ToString::to_string),
            self.other.as_ref().map(ToString::to_string),
        ]
        .into_iter()
        .flatten()
        .collect();
        write!(f, "{}", parts.join("\n"))
    }
}

/// Compare two versions of a module, returning `None` if they are
/// semantically identical
pub fn pyff_module(old: &ModuleSummary, new: &ModuleSummary) -> Option<ModuleDiff> {
    let old_imports = ImportedNames::extract(&old.module);
    let new_imports = ImportedNames::extract(&new.module);

    let imports = pyff_imports(&old_imports, &new_imports);
    let classes = pyff_classes(&old.module.body, &new.module.body, &old_imports, &new_imports);
    let functions = pyff_functions(
        &old.module.body,
        &new.module.body,
        &old_imports,
        &new_imports,
        Context::Function,
    );
    let other = pyff_other(&old.module.body, &new.module.body);

    let diff = ModuleDiff {
        imports,
        classes,
        functions,
        other,
    };

    if diff.is_empty() {
        None
    } else {
        Some(diff)
    }
}

/// Parse and compare two module files on disk
pub fn pyff_module_path(old: &Path, new: &Path) -> Result<Option<ModuleDiff>> {
    let old_summary = ModuleSummary::from_path(old)?;
    let new_summary = ModuleSummary::from_path(new)?;
    Ok(pyff_module(&old_summary, &new_summary))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(src: &str) -> ModuleSummary {
        ModuleSummary::from_source("m.py", src).unwrap()
    }

    #[test]
    fn identical_modules_have_no_diff() {
        let src = "import os\n\ndef f(x):\n    return os.path.join('a', x)\n";
        assert!(pyff_module(&module(src), &module(src)).is_none());
    }

    #[test]
    fn import_alias_equivalence_yields_only_imports_diff() {
        let old = module("import os\n\ndef f(x):\n    return os.path.join(\"a\", x)\n");
        let new = module("from os.path import join\n\ndef f(x):\n    return join(\"a\", x)\n");
        let diff = pyff_module(&old, &new).unwrap();
        assert!(diff.imports.is_some());
        assert!(diff.functions.is_none());
        assert!(diff.classes.is_none());
    }

    #[test]
    fn added_module_variable_is_reported_as_other() {
        let old = module("def f():\n    return 1\n");
        let new = module("MODULE_LEVEL_VARIABLE = 123\n\n\ndef f():\n    return 1\n");
        let diff = pyff_module(&old, &new).unwrap();
        assert!(diff.functions.is_none());
        assert!(diff.classes.is_none());
        assert!(diff.imports.is_none());
        assert!(diff.other.as_ref().unwrap().new.contains("MODULE_LEVEL_VARIABLE"));
    }

    #[test]
    fn changed_class_method_surfaces_only_classes() {
        let old = module("class MyClass:\n    def method_one(self):\n        return self.value\n");
        let new = module("class MyClass:\n    def method_one(self):\n        return self.value * 2\n");
        let diff = pyff_module(&old, &new).unwrap();
        assert!(diff.functions.is_none());
        assert!(diff.imports.is_none());
        let classes = diff.classes.unwrap();
        assert!(classes.changed.contains_key("MyClass"));
    }
}
