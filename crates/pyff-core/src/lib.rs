//! Semantic diff engine for Python source code
//!
//! The engine compares two versions of a Python module and produces a
//! [`modules::ModuleDiff`] describing what changed, ignoring surface
//! syntax differences (formatting, import aliasing) that do not alter
//! behavior. See [`modules::pyff_module`] for the entry point.

pub mod classes;
pub mod error;
pub mod functions;
pub mod imports;
pub mod modules;
pub mod render;
pub mod statements;

pub use classes::{pyff_class, pyff_classes, ClassDiff, ClassSummary, ClassesDiff};
pub use error::{PyffError, Result};
pub use functions::{pyff_function, pyff_functions, Context, FunctionDiff, FunctionSummary, FunctionsDiff};
pub use imports::{pyff_imports, ImportedName, ImportedNames, ImportsDiff};
pub use modules::{pyff_module, pyff_module_path, ModuleDiff, ModuleSummary, OtherDiff};
pub use render::{render, Style};
pub use statements::{pyff_statement, StatementDiff};
