//! Function-level semantic comparison

use std::collections::BTreeSet;

use ruff_python_ast::{self as ast, comparable::ComparableExpr, Expr, Stmt, StmtFunctionDef};

use crate::imports::ImportedNames;
use crate::render::{hl, hlistify};
use crate::statements::{pyff_statement, StatementDiff};

/// Where a [`FunctionDiff`] was found: directly in a module, or as a method
/// of a class. Only affects how the change is described to a reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Context {
    Function,
    Method,
}

impl Context {
    fn noun(self) -> &'static str {
        match self {
            Context::Function => "function",
            Context::Method => "method",
        }
    }
}

/// A function gained or lost access to one set of external names and gained
/// another, without its statements otherwise changing
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ExternalUsageChange {
    pub gone: BTreeSet<String>,
    pub appeared: BTreeSet<String>,
}

impl std::fmt::Display for ExternalUsageChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts = Vec::new();
        if !self.gone.is_empty() {
            parts.push(format!(
                "no longer uses {}",
                self.gone.iter().map(hl).collect::<Vec<_>>().join(", ")
            ));
        }
        if !self.appeared.is_empty() {
            parts.push(format!(
                "now uses {}",
                self.appeared.iter().map(hl).collect::<Vec<_>>().join(", ")
            ));
        }
        write!(f, "{}", parts.join("; "))
    }
}

/// The closed set of ways a function's implementation can differ
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum ImplementationChange {
    /// A decorator, signature, or return annotation changed and we don't
    /// try to say more about it than that
    GenericChange,
    /// The body referred to a different set of external names, but each
    /// body statement is otherwise identical
    ExternalUsageChange(ExternalUsageChange),
    /// A specific body statement changed in a way we could not resolve to a
    /// cosmetic import-aliasing difference
    StatementChange(StatementDiffKey),
}

impl std::fmt::Display for ImplementationChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImplementationChange::GenericChange => write!(f, "implementation changed"),
            ImplementationChange::ExternalUsageChange(c) => write!(f, "{c}"),
            ImplementationChange::StatementChange(s) => write!(f, "{}", s.0),
        }
    }
}

/// Wraps a [`StatementDiff`] so that multiple distinct body-statement
/// changes can coexist in the same ordered set instead of collapsing into
/// one another
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementDiffKey(pub StatementDiff);

impl PartialOrd for StatementDiffKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for StatementDiffKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.to_string().cmp(&other.0.to_string())
    }
}

/// Everything that changed about one function between two versions of a
/// module, or `None` if it is semantically identical
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionDiff {
    pub old_name: Option<String>,
    pub implementation: BTreeSet<ImplementationChange>,
}

impl FunctionDiff {
    fn build(old_name: Option<String>, implementation: BTreeSet<ImplementationChange>) -> Option<Self> {
        if old_name.is_none() && implementation.is_empty() {
            None
        } else {
            Some(Self {
                old_name,
                implementation,
            })
        }
    }
}

impl std::fmt::Display for FunctionDiff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut lines = Vec::new();
        if let Some(old) = &self.old_name {
            lines.push(format!("renamed from {}", hl(old)));
        }
        for change in &self.implementation {
            lines.push(change.to_string());
        }
        write!(f, "{}", lines.join("; "))
    }
}

/// Summary of a function definition, enough to report it as purely added
/// or removed
///
/// Ordered and compared by `name` alone, matching how the source's own
/// `FunctionSummary.__eq__` treats two summaries as the same function
/// regardless of any other field.
#[derive(Debug, Clone)]
pub struct FunctionSummary {
    pub name: String,
    pub is_property: bool,
}

impl FunctionSummary {
    pub fn from_def(def: &StmtFunctionDef) -> Self {
        Self {
            name: def.name.to_string(),
            is_property: def.decorator_list.iter().any(is_property_decorator),
        }
    }

    fn describe(&self) -> String {
        if self.is_property {
            format!("property {}", self.name)
        } else {
            self.name.clone()
        }
    }
}

impl PartialEq for FunctionSummary {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}
impl Eq for FunctionSummary {}
impl PartialOrd for FunctionSummary {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for FunctionSummary {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.name.cmp(&other.name)
    }
}
impl std::borrow::Borrow<str> for FunctionSummary {
    fn borrow(&self) -> &str {
        &self.name
    }
}

fn is_property_decorator(decorator: &ast::Decorator) -> bool {
    matches!(&decorator.expression, Expr::Name(n) if n.id.as_str() == "property")
}

fn exprs_equal(a: &Expr, b: &Expr) -> bool {
    ComparableExpr::from(a) == ComparableExpr::from(b)
}

fn decorators_equal(a: &[ast::Decorator], b: &[ast::Decorator]) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b)
            .all(|(x, y)| exprs_equal(&x.expression, &y.expression))
}

fn returns_equal(a: Option<&Expr>, b: Option<&Expr>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(x), Some(y)) => exprs_equal(x, y),
        _ => false,
    }
}

fn params_equal(a: &ast::Parameters, b: &ast::Parameters) -> bool {
    fn annotation(p: &ast::ParameterWithDefault) -> Option<&Expr> {
        p.parameter.annotation.as_deref()
    }
    fn list_equal(a: &[ast::ParameterWithDefault], b: &[ast::ParameterWithDefault]) -> bool {
        a.len() == b.len()
            && a.iter()
                .zip(b)
                .all(|(x, y)| x.parameter.name.as_str() == y.parameter.name.as_str() && returns_equal(annotation(x), annotation(y)))
    }
    list_equal(&a.posonlyargs, &b.posonlyargs)
        && list_equal(&a.args, &b.args)
        && list_equal(&a.kwonlyargs, &b.kwonlyargs)
        && a.vararg.as_ref().map(|v| v.name.as_str()) == b.vararg.as_ref().map(|v| v.name.as_str())
        && a.kwarg.as_ref().map(|v| v.name.as_str()) == b.kwarg.as_ref().map(|v| v.name.as_str())
}

/// Recursively resolve an expression to the fully-qualified import path it
/// denotes, if it is a `Name`/`Attribute` chain rooted in an import
fn resolve_chain(expr: &Expr, imports: &ImportedNames) -> Option<String> {
    match expr {
        Expr::Name(n) => imports.canonical_of(n.id.as_str()).map(str::to_string),
        Expr::Attribute(a) => {
            resolve_chain(&a.value, imports).map(|base| format!("{base}.{}", a.attr.as_str()))
        }
        _ => None,
    }
}

/// Walk every expression position in `expr`, recording the maximal
/// canonical path reached at each independent usage site
fn collect_usages_expr(expr: &Expr, imports: &ImportedNames, out: &mut BTreeSet<String>) {
    if let Some(canonical) = resolve_chain(expr, imports) {
        out.insert(canonical);
        return;
    }
    match expr {
        Expr::Call(c) => {
            collect_usages_expr(&c.func, imports, out);
            for a in &c.arguments.args {
                collect_usages_expr(a, imports, out);
            }
            for k in &c.arguments.keywords {
                collect_usages_expr(&k.value, imports, out);
            }
        }
        Expr::BinOp(b) => {
            collect_usages_expr(&b.left, imports, out);
            collect_usages_expr(&b.right, imports, out);
        }
        Expr::BoolOp(b) => {
            for v in &b.values {
                collect_usages_expr(v, imports, out);
            }
        }
        Expr::UnaryOp(u) => collect_usages_expr(&u.operand, imports, out),
        Expr::Compare(c) => {
            collect_usages_expr(&c.left, imports, out);
            for comparator in &c.comparators {
                collect_usages_expr(comparator, imports, out);
            }
        }
        Expr::Tuple(t) => {
            for e in &t.elts {
                collect_usages_expr(e, imports, out);
            }
        }
        Expr::List(l) => {
            for e in &l.elts {
                collect_usages_expr(e, imports, out);
            }
        }
        Expr::Set(s) => {
            for e in &s.elts {
                collect_usages_expr(e, imports, out);
            }
        }
        Expr::Starred(s) => collect_usages_expr(&s.value, imports, out),
        Expr::Await(a) => collect_usages_expr(&a.value, imports, out),
        Expr::Yield(y) => {
            if let Some(v) = &y.value {
                collect_usages_expr(v, imports, out);
            }
        }
        Expr::YieldFrom(y) => collect_usages_expr(&y.value, imports, out),
        Expr::If(i) => {
            collect_usages_expr(&i.test, imports, out);
            collect_usages_expr(&i.body, imports, out);
            collect_usages_expr(&i.orelse, imports, out);
        }
        Expr::Subscript(s) => {
            collect_usages_expr(&s.value, imports, out);
            collect_usages_expr(&s.slice, imports, out);
        }
        _ => {}
    }
}

fn collect_usages_stmt(stmt: &Stmt, imports: &ImportedNames, out: &mut BTreeSet<String>) {
    match stmt {
        Stmt::Expr(e) => collect_usages_expr(&e.value, imports, out),
        Stmt::Return(r) => {
            if let Some(v) = &r.value {
                collect_usages_expr(v, imports, out);
            }
        }
        Stmt::Assign(a) => {
            for t in &a.targets {
                collect_usages_expr(t, imports, out);
            }
            collect_usages_expr(&a.value, imports, out);
        }
        Stmt::AugAssign(a) => {
            collect_usages_expr(&a.target, imports, out);
            collect_usages_expr(&a.value, imports, out);
        }
        Stmt::AnnAssign(a) => {
            collect_usages_expr(&a.target, imports, out);
            collect_usages_expr(&a.annotation, imports, out);
            if let Some(v) = &a.value {
                collect_usages_expr(v, imports, out);
            }
        }
        Stmt::Delete(d) => {
            for t in &d.targets {
                collect_usages_expr(t, imports, out);
            }
        }
        Stmt::Assert(a) => {
            collect_usages_expr(&a.test, imports, out);
            if let Some(m) = &a.msg {
                collect_usages_expr(m, imports, out);
            }
        }
        Stmt::Raise(r) => {
            if let Some(e) = &r.exc {
                collect_usages_expr(e, imports, out);
            }
            if let Some(c) = &r.cause {
                collect_usages_expr(c, imports, out);
            }
        }
        Stmt::If(i) => {
            collect_usages_expr(&i.test, imports, out);
            for s in &i.body {
                collect_usages_stmt(s, imports, out);
            }
            for clause in &i.elif_else_clauses {
                if let Some(t) = &clause.test {
                    collect_usages_expr(t, imports, out);
                }
                for s in &clause.body {
                    collect_usages_stmt(s, imports, out);
                }
            }
        }
        Stmt::While(w) => {
            collect_usages_expr(&w.test, imports, out);
            for s in w.body.iter().chain(w.orelse.iter()) {
                collect_usages_stmt(s, imports, out);
            }
        }
        Stmt::For(for_stmt) => {
            collect_usages_expr(&for_stmt.target, imports, out);
            collect_usages_expr(&for_stmt.iter, imports, out);
            for s in for_stmt.body.iter().chain(for_stmt.orelse.iter()) {
                collect_usages_stmt(s, imports, out);
            }
        }
        Stmt::With(w) => {
            for item in &w.items {
                collect_usages_expr(&item.context_expr, imports, out);
                if let Some(v) = &item.optional_vars {
                    collect_usages_expr(v, imports, out);
                }
            }
            for s in &w.body {
                collect_usages_stmt(s, imports, out);
            }
        }
        Stmt::FunctionDef(fd) => {
            for s in &fd.body {
                collect_usages_stmt(s, imports, out);
            }
        }
        Stmt::ClassDef(cd) => {
            for s in &cd.body {
                collect_usages_stmt(s, imports, out);
            }
        }
        _ => {}
    }
}

/// Compare which external names a function body touches, ignoring local
/// aliasing: this matches usage against *canonical* names so renaming an
/// import without changing what is called reports no change here.
fn compare_import_usage(
    old_body: &[Stmt],
    new_body: &[Stmt],
    old_imports: &ImportedNames,
    new_imports: &ImportedNames,
) -> Option<ExternalUsageChange> {
    let mut old_usages = BTreeSet::new();
    for s in old_body {
        collect_usages_stmt(s, old_imports, &mut old_usages);
    }
    let mut new_usages = BTreeSet::new();
    for s in new_body {
        collect_usages_stmt(s, new_imports, &mut new_usages);
    }
    let gone: BTreeSet<String> = old_usages.difference(&new_usages).cloned().collect();
    let appeared: BTreeSet<String> = new_usages.difference(&old_usages).cloned().collect();
    if gone.is_empty() && appeared.is_empty() {
        None
    } else {
        Some(ExternalUsageChange { gone, appeared })
    }
}

/// Options controlling how strictly [`pyff_function`] treats signature and
/// docstring differences
#[derive(Debug, Clone, Copy)]
pub struct FunctionOptions {
    pub check_typing: bool,
    pub check_docstrings: bool,
}

impl Default for FunctionOptions {
    fn default() -> Self {
        Self {
            check_typing: true,
            check_docstrings: false,
        }
    }
}

fn strip_docstring(body: &[Stmt]) -> &[Stmt] {
    match body.first() {
        Some(Stmt::Expr(e)) if matches!(&*e.value, Expr::StringLiteral(_)) => &body[1..],
        _ => body,
    }
}

/// Compare a renamed-or-not pair of functions, given the name each was
/// found under. A difference in `old.name`/`new.name` is recorded as a
/// rename; callers that only match functions up by identical name will
/// never trigger this path themselves, but it stays correct for a future
/// caller that fuzzy-matches across a rename.
pub fn pyff_function(
    old: &StmtFunctionDef,
    new: &StmtFunctionDef,
    old_imports: &ImportedNames,
    new_imports: &ImportedNames,
    options: FunctionOptions,
) -> Option<FunctionDiff> {
    let name_changed = if old.name.as_str() != new.name.as_str() {
        Some(old.name.to_string())
    } else {
        None
    };
    let mut implementation = BTreeSet::new();

    if !decorators_equal(&old.decorator_list, &new.decorator_list) {
        implementation.insert(ImplementationChange::GenericChange);
    }
    if options.check_typing {
        if !params_equal(&old.parameters, &new.parameters)
            || !returns_equal(old.returns.as_deref(), new.returns.as_deref())
        {
            implementation.insert(ImplementationChange::GenericChange);
        }
    }

    let old_body: &[Stmt] = if options.check_docstrings {
        &old.body
    } else {
        strip_docstring(&old.body)
    };
    let new_body: &[Stmt] = if options.check_docstrings {
        &new.body
    } else {
        strip_docstring(&new.body)
    };

    let mut old_iter = old_body.iter();
    let mut new_iter = new_body.iter();
    loop {
        match (old_iter.next(), new_iter.next()) {
            (None, None) => break,
            (Some(a), Some(b)) => {
                if let Some(diff) = pyff_statement(a, b, old_imports, new_imports) {
                    if diff.is_specific() {
                        if diff.semantically_different() {
                            implementation.insert(ImplementationChange::StatementChange(StatementDiffKey(diff)));
                        }
                        // identified-but-cosmetic differences are not recorded:
                        // an import-alias-only rewrite must not surface as a change
                    } else {
                        implementation.insert(ImplementationChange::GenericChange);
                    }
                }
            }
            _ => {
                implementation.insert(ImplementationChange::GenericChange);
                break;
            }
        }
    }

    if let Some(usage) = compare_import_usage(&old.body, &new.body, old_imports, new_imports) {
        implementation.insert(ImplementationChange::ExternalUsageChange(usage));
    }

    FunctionDiff::build(name_changed, implementation)
}

/// Difference between the functions defined directly in a module or class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionsDiff {
    pub context: Context,
    pub new: BTreeSet<FunctionSummary>,
    pub removed: BTreeSet<FunctionSummary>,
    pub changed: std::collections::BTreeMap<String, FunctionDiff>,
}

impl FunctionsDiff {
    fn empty(context: Context) -> Self {
        Self {
            context,
            new: Default::default(),
            removed: Default::default(),
            changed: Default::default(),
        }
    }

    fn is_empty(&self) -> bool {
        self.new.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

impl std::fmt::Display for FunctionsDiff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let noun = self.context.noun();
        let mut lines = Vec::new();
        if !self.new.is_empty() {
            lines.push(format!(
                "New {}s {}",
                noun,
                hlistify(self.new.iter().map(FunctionSummary::describe))
            ));
        }
        if !self.removed.is_empty() {
            lines.push(format!(
                "Removed {}s {}",
                noun,
                hlistify(self.removed.iter().map(FunctionSummary::describe))
            ));
        }
        for (name, diff) in &self.changed {
            lines.push(format!(
                "{}{} {} changed: {diff}",
                noun[..1].to_uppercase(),
                &noun[1..],
                hl(name)
            ));
        }
        write!(f, "{}", lines.join("\n"))
    }
}

/// Extract top-level function definitions from a statement list, without
/// recursing into nested classes (a class's own methods are compared
/// separately, by [`crate::classes::pyff_classes`])
pub fn extract_functions(body: &[Stmt]) -> Vec<&StmtFunctionDef> {
    body.iter()
        .filter_map(|stmt| match stmt {
            Stmt::FunctionDef(f) => Some(f),
            _ => None,
        })
        .collect()
}

/// Compare the functions defined in two statement lists (a module body or a
/// class body), matching by name
pub fn pyff_functions(
    old_body: &[Stmt],
    new_body: &[Stmt],
    old_imports: &ImportedNames,
    new_imports: &ImportedNames,
    context: Context,
) -> Option<FunctionsDiff> {
    let old_funcs = extract_functions(old_body);
    let new_funcs = extract_functions(new_body);

    let old_names: BTreeSet<&str> = old_funcs.iter().map(|f| f.name.as_str()).collect();
    let new_names: BTreeSet<&str> = new_funcs.iter().map(|f| f.name.as_str()).collect();

    let mut diff = FunctionsDiff::empty(context);
    diff.new = new_funcs
        .iter()
        .filter(|f| !old_names.contains(f.name.as_str()))
        .map(|f| FunctionSummary::from_def(f))
        .collect();
    diff.removed = old_funcs
        .iter()
        .filter(|f| !new_names.contains(f.name.as_str()))
        .map(|f| FunctionSummary::from_def(f))
        .collect();

    for name in old_names.intersection(&new_names) {
        let old_def = old_funcs.iter().find(|f| f.name.as_str() == *name).unwrap();
        let new_def = new_funcs.iter().find(|f| f.name.as_str() == *name).unwrap();
        if let Some(fd) = pyff_function(old_def, new_def, old_imports, new_imports, FunctionOptions::default()) {
            diff.changed.insert(name.to_string(), fd);
        }
    }

    if diff.is_empty() {
        None
    } else {
        Some(diff)
    }
}
