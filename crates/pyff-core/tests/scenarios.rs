//! End-to-end scenarios for the module-level diff cascade
//!
//! Each fixture pairs a base module with one deliberate change, mirroring
//! the kind of single-variable diffs a code reviewer would actually see.

use pyff_core::modules::{pyff_module, ModuleSummary};

const BASE: &str = r#"
import os
from sys import version_info

CONSTANT = "value"

def top_level_function(arg1, arg2="default"):
    """This is a function."""
    if version_info > (3, 0):
        print("Python 3")
    else:
        print("Python 2")
    return os.path.join(str(arg1), str(arg2))

class MyClass:
    """A class with methods."""
    def __init__(self, value):
        self.value = value

    def method_one(self):
        """A simple method."""
        return self.value

    def _private_method(self):
        """A private method."""
        return self.value + 1
"#;

fn module(src: &str) -> ModuleSummary {
    ModuleSummary::from_source("scenario.py", src).unwrap()
}

#[test]
fn no_change_is_null() {
    assert!(pyff_module(&module(BASE), &module(BASE)).is_none());
}

#[test]
fn added_function_is_reported() {
    let new = BASE.replace(
        "class MyClass:",
        "def new_function():\n    \"\"\"This is a new function.\"\"\"\n    return \"new\"\n\nclass MyClass:",
    );
    let diff = pyff_module(&module(BASE), &module(&new)).unwrap();
    let functions = diff.functions.unwrap();
    assert_eq!(functions.new.len(), 1);
    assert!(functions.new.contains("new_function"));
    assert!(functions.removed.is_empty());
    assert!(functions.changed.is_empty());
    assert!(diff.classes.is_none());
    assert!(diff.imports.is_none());
}

#[test]
fn removed_function_is_reported() {
    let new = BASE.replacen(
        "def top_level_function(arg1, arg2=\"default\"):\n    \"\"\"This is a function.\"\"\"\n    if version_info > (3, 0):\n        print(\"Python 3\")\n    else:\n        print(\"Python 2\")\n    return os.path.join(str(arg1), str(arg2))\n\n",
        "",
        1,
    );
    let diff = pyff_module(&module(BASE), &module(&new)).unwrap();
    let functions = diff.functions.unwrap();
    assert_eq!(functions.removed.len(), 1);
    assert!(functions.removed.contains("top_level_function"));
    assert!(functions.new.is_empty());
    assert!(functions.changed.is_empty());
    assert!(diff.classes.is_none());
    assert!(diff.imports.is_none());
}

#[test]
fn changed_function_body_is_reported() {
    let new = BASE.replace("version_info > (3, 0)", "version_info > (3, 6)");
    let diff = pyff_module(&module(BASE), &module(&new)).unwrap();
    let functions = diff.functions.unwrap();
    assert!(functions.changed.contains_key("top_level_function"));
    assert_eq!(functions.changed.len(), 1);
    assert!(functions.new.is_empty());
    assert!(functions.removed.is_empty());
    assert!(diff.classes.is_none());
    assert!(diff.imports.is_none());
    let change = &functions.changed["top_level_function"];
    assert!(!change.implementation.is_empty());
}

#[test]
fn added_class_is_reported() {
    let new = format!(
        "{BASE}\nclass NewClass:\n    \"\"\"A new class.\"\"\"\n    def method(self):\n        return 1\n"
    );
    let diff = pyff_module(&module(BASE), &module(&new)).unwrap();
    let classes = diff.classes.unwrap();
    assert_eq!(classes.new.len(), 1);
    assert!(classes.new.contains("NewClass"));
    assert!(classes.changed.is_empty());
    assert!(diff.functions.is_none());
    assert!(diff.imports.is_none());
}

#[test]
fn added_decorator_surfaces_both_new_function_and_changed_function() {
    let decorator = "def my_decorator(func):\n    \"\"\"A decorator.\"\"\"\n    def wrapper(*args, **kwargs):\n        func(*args, **kwargs)\n    return wrapper\n\n";
    let new = format!("{decorator}{}", BASE.replace(
        "def top_level_function(arg1, arg2=\"default\"):",
        "@my_decorator\ndef top_level_function(arg1, arg2=\"default\"):",
    ));
    let diff = pyff_module(&module(BASE), &module(&new)).unwrap();
    let functions = diff.functions.unwrap();
    assert_eq!(functions.new.len(), 1);
    assert!(functions.new.contains("my_decorator"));
    assert!(functions.changed.contains_key("top_level_function"));
    assert_eq!(functions.changed.len(), 1);
    assert!(functions.removed.is_empty());
    assert!(diff.classes.is_none());
    assert!(diff.imports.is_none());
}

#[test]
fn added_module_variable_yields_diff_without_other_sections() {
    let new = format!("{BASE}\nANOTHER_CONSTANT = 456\n");
    let diff = pyff_module(&module(BASE), &module(&new)).unwrap();
    assert!(diff.functions.is_none());
    assert!(diff.classes.is_none());
    assert!(diff.imports.is_none());
    assert!(diff.other.unwrap().new.contains("ANOTHER_CONSTANT"));
}

#[test]
fn changed_class_method_is_reported() {
    let new = BASE.replace(
        "    def method_one(self):\n        \"\"\"A simple method.\"\"\"\n        return self.value\n",
        "    def method_one(self):\n        \"\"\"A simple method.\"\"\"\n        return self.value * 2\n",
    );
    let diff = pyff_module(&module(BASE), &module(&new)).unwrap();
    let classes = diff.classes.unwrap();
    assert!(classes.changed.contains_key("MyClass"));
    assert_eq!(classes.changed.len(), 1);
    assert!(classes.new.is_empty());

    let class_change = &classes.changed["MyClass"];
    let methods = class_change.methods.as_ref().unwrap();
    assert!(methods.changed.contains_key("method_one"));
    assert_eq!(methods.changed.len(), 1);
    assert!(methods.new.is_empty());
    assert!(methods.removed.is_empty());

    assert!(diff.functions.is_none());
    assert!(diff.imports.is_none());
}

#[test]
fn import_alias_equivalence_yields_only_imports_diff() {
    let old = module("import os\n\ndef f(x):\n    return os.path.join(\"a\", x)\n");
    let new = module("from os.path import join\n\ndef f(x):\n    return join(\"a\", x)\n");
    let diff = pyff_module(&old, &new).unwrap();
    assert!(diff.imports.is_some());
    assert!(diff.functions.is_none());
    assert!(diff.classes.is_none());
    assert!(diff.other.is_none());
}

#[test]
fn docstring_only_change_yields_null() {
    let new = BASE.replace("\"\"\"This is a function.\"\"\"", "\"\"\"This is a different docstring.\"\"\"");
    assert!(pyff_module(&module(BASE), &module(&new)).is_none());
}

#[test]
fn pure_rename_shows_as_new_and_removed() {
    use pyff_core::functions::{pyff_functions, Context};
    use pyff_core::imports::ImportedNames;
    use ruff_python_ast::Stmt;
    use ruff_python_parser::parse_module;

    let old_body = parse_module("def foo(x):\n    return x + 1\n").unwrap().into_syntax().body;
    let new_body = parse_module("def bar(x):\n    return x + 1\n").unwrap().into_syntax().body;
    let empty = ImportedNames::default();

    // A pure rename is invisible to name-keyed matching: with no shared name,
    // the old name is reported removed and the new name added, not as a
    // single renamed entry. `pyff_function` itself is rename-aware (see its
    // own unit tests); `pyff_functions` only matches pairs by identical name.
    let diff = pyff_functions(&old_body, &new_body, &empty, &empty, Context::Function).unwrap();
    assert!(diff.new.contains("bar"));
    assert!(diff.removed.contains("foo"));

    let old_def = match &old_body[0] {
        Stmt::FunctionDef(f) => f,
        _ => unreachable!(),
    };
    let new_def = match &new_body[0] {
        Stmt::FunctionDef(f) => f,
        _ => unreachable!(),
    };
    let renamed = pyff_core::pyff_function(old_def, new_def, &empty, &empty, Default::default()).unwrap();
    assert_eq!(renamed.old_name.as_deref(), Some("foo"));
    assert!(renamed.implementation.is_empty());
}
