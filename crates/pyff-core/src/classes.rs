//! Class-level semantic comparison
//!
//! A class is diffed as its method set (delegated to [`crate::functions`]
//! with the method noun) plus a structural comparison of its base-class
//! list. Nested class bodies and decorators beyond base classes are out of
//! scope, matching the function comparator's own scope decisions.

use std::collections::BTreeSet;

use ruff_python_ast::{comparable::ComparableExpr, Stmt, StmtClassDef};

use crate::functions::{pyff_functions, Context, FunctionsDiff};
use crate::imports::ImportedNames;
use crate::render::{hl, hlistify};

/// Summary of a class definition, enough to report it as purely added or
/// removed
///
/// Ordered and compared by `name` alone, so a `BTreeSet<ClassSummary>` can be
/// looked up by plain class name via its `Borrow<str>` impl.
#[derive(Debug, Clone)]
pub struct ClassSummary {
    pub name: String,
}

impl ClassSummary {
    pub fn from_def(def: &StmtClassDef) -> Self {
        Self {
            name: def.name.to_string(),
        }
    }
}

impl PartialEq for ClassSummary {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}
impl Eq for ClassSummary {}
impl PartialOrd for ClassSummary {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for ClassSummary {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.name.cmp(&other.name)
    }
}
impl std::borrow::Borrow<str> for ClassSummary {
    fn borrow(&self) -> &str {
        &self.name
    }
}

fn base_exprs(def: &StmtClassDef) -> Vec<&ruff_python_ast::Expr> {
    def.arguments
        .as_ref()
        .map(|a| a.args.iter().collect())
        .unwrap_or_default()
}

fn bases_equal(old: &StmtClassDef, new: &StmtClassDef) -> bool {
    let old_bases = base_exprs(old);
    let new_bases = base_exprs(new);
    old_bases.len() == new_bases.len()
        && old_bases
            .iter()
            .zip(new_bases.iter())
            .all(|(a, b)| ComparableExpr::from(*a) == ComparableExpr::from(*b))
}

/// Everything that changed about one class between two versions of a
/// module, or `None` if it is semantically identical
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDiff {
    pub methods: Option<FunctionsDiff>,
    pub bases_changed: bool,
}

impl ClassDiff {
    fn build(methods: Option<FunctionsDiff>, bases_changed: bool) -> Option<Self> {
        if methods.is_none() && !bases_changed {
            None
        } else {
            Some(Self {
                methods,
                bases_changed,
            })
        }
    }
}

impl std::fmt::Display for ClassDiff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut lines = Vec::new();
        if self.bases_changed {
            lines.push("base classes changed".to_string());
        }
        if let Some(methods) = &self.methods {
            lines.push(methods.to_string());
        }
        write!(f, "{}", lines.join("\n"))
    }
}

/// Compare a same-named pair of classes
pub fn pyff_class(
    old: &StmtClassDef,
    new: &StmtClassDef,
    old_imports: &ImportedNames,
    new_imports: &ImportedNames,
) -> Option<ClassDiff> {
    let bases_changed = !bases_equal(old, new);
    let methods = pyff_functions(&old.body, &new.body, old_imports, new_imports, Context::Method);
    ClassDiff::build(methods, bases_changed)
}

/// Difference between the classes defined directly in a module
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClassesDiff {
    pub new: BTreeSet<ClassSummary>,
    pub removed: BTreeSet<ClassSummary>,
    pub changed: std::collections::BTreeMap<String, ClassDiff>,
}

impl ClassesDiff {
    fn is_empty(&self) -> bool {
        self.new.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

impl std::fmt::Display for ClassesDiff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut lines = Vec::new();
        if !self.new.is_empty() {
            lines.push(format!(
                "New classes {}",
                hlistify(self.new.iter().map(|c| &c.name))
            ));
        }
        if !self.removed.is_empty() {
            lines.push(format!(
                "Removed classes {}",
                hlistify(self.removed.iter().map(|c| &c.name))
            ));
        }
        for (name, diff) in &self.changed {
            lines.push(format!(
                "Class {} changed:\n  {}",
                hl(name),
                diff.to_string().replace('\n', "\n  ")
            ));
        }
        write!(f, "{}", lines.join("\n"))
    }
}

/// Extract top-level class definitions from a statement list, without
/// recursing into nested classes or functions
fn extract_classes(body: &[Stmt]) -> Vec<&StmtClassDef> {
    body.iter()
        .filter_map(|stmt| match stmt {
            Stmt::ClassDef(c) => Some(c),
            _ => None,
        })
        .collect()
}

/// Compare the classes defined in two module bodies, matching by name
pub fn pyff_classes(
    old_body: &[Stmt],
    new_body: &[Stmt],
    old_imports: &ImportedNames,
    new_imports: &ImportedNames,
) -> Option<ClassesDiff> {
    let old_classes = extract_classes(old_body);
    let new_classes = extract_classes(new_body);

    let old_names: BTreeSet<&str> = old_classes.iter().map(|c| c.name.as_str()).collect();
    let new_names: BTreeSet<&str> = new_classes.iter().map(|c| c.name.as_str()).collect();

    let mut diff = ClassesDiff {
        new: new_classes
            .iter()
            .filter(|c| !old_names.contains(c.name.as_str()))
            .map(|c| ClassSummary::from_def(c))
            .collect(),
        removed: old_classes
            .iter()
            .filter(|c| !new_names.contains(c.name.as_str()))
            .map(|c| ClassSummary::from_def(c))
            .collect(),
        ..Default::default()
    };

    for name in old_names.intersection(&new_names) {
        let old_def = old_classes.iter().find(|c| c.name.as_str() == *name).unwrap();
        let new_def = new_classes.iter().find(|c| c.name.as_str() == *name).unwrap();
        if let Some(cd) = pyff_class(old_def, new_def, old_imports, new_imports) {
            diff.changed.insert(name.to_string(), cd);
        }
    }

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

    fn parse_body(src: &str) -> Vec<Stmt> {
        parse_module(src).unwrap().into_syntax().body
    }

    #[test]
    fn identical_classes_have_no_diff() {
        let empty = ImportedNames::default();
        let old = parse_body("class Foo:\n    def bar(self):\n        return 1\n");
        let new = parse_body("class Foo:\n    def bar(self):\n        return 1\n");
        assert!(pyff_classes(&old, &new, &empty, &empty).is_none());
    }

    #[test]
    fn changed_method_surfaces_under_changed_class() {
        let empty = ImportedNames::default();
        let old = parse_body(
            "class MyClass:\n    def method_one(self):\n        return self.value\n",
        );
        let new = parse_body(
            "class MyClass:\n    def method_one(self):\n        return self.value * 2\n",
        );
        let diff = pyff_classes(&old, &new, &empty, &empty).unwrap();
        assert!(diff.new.is_empty());
        assert!(diff.removed.is_empty());
        let class_diff = diff.changed.get("MyClass").unwrap();
        assert!(!class_diff.bases_changed);
        let methods = class_diff.methods.as_ref().unwrap();
        assert!(methods.changed.contains_key("method_one"));
    }

    #[test]
    fn base_class_change_is_reported() {
        let empty = ImportedNames::default();
        let old = parse_body("class Foo(Base):\n    pass\n");
        let new = parse_body("class Foo(OtherBase):\n    pass\n");
        let diff = pyff_classes(&old, &new, &empty, &empty).unwrap();
        let class_diff = diff.changed.get("Foo").unwrap();
        assert!(class_diff.bases_changed);
        assert!(class_diff.methods.is_none());
    }

    #[test]
    fn pyff_classes_reports_added_and_removed() {
        let empty = ImportedNames::default();
        let old = parse_body("class Old:\n    pass\n");
        let new = parse_body("class New:\n    pass\n");
        let diff = pyff_classes(&old, &new, &empty, &empty).unwrap();
        assert!(diff.new.contains("New"));
        assert!(diff.removed.contains("Old"));
    }

    #[test]
    fn pyff_classes_does_not_recurse_into_nested_functions() {
        let empty = ImportedNames::default();
        let old = parse_body("def make():\n    class Inner:\n        pass\n    return Inner\n");
        let new = parse_body(
            "def make():\n    class Inner:\n        def extra(self):\n            pass\n    return Inner\n",
        );
        assert!(pyff_classes(&old, &new, &empty, &empty).is_none());
    }
}
