//! Statement-level semantic comparison
//!
//! A single statement is "the same" if its syntax tree is identical once
//! both sides are rewritten to name every external symbol by its fully
//! qualified path. [`Qualifier`] performs that rewrite; [`pyff_statement`]
//! uses it to tell a genuine behavioral change from a merely cosmetic one.

use std::collections::BTreeSet;

use ruff_python_ast::{self as ast, comparable::ComparableStmt, Expr, Stmt};

use crate::imports::ImportedNames;
use crate::render::hl;

/// One local name that was replaced by its canonical path on one side of a
/// comparison, matched against the other side's own replacement
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SingleExternalNameUsageChange {
    /// The name as written on the old side
    pub old: String,
    /// The name as written on the new side
    pub new: String,
}

impl std::fmt::Display for SingleExternalNameUsageChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} is now referred to as {}", hl(&self.old), hl(&self.new))
    }
}

/// A statement refers to the same external symbols on both sides, just
/// through different local aliases
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ExternalNameUsageChange {
    pub changes: BTreeSet<SingleExternalNameUsageChange>,
}

impl std::fmt::Display for ExternalNameUsageChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rendered: Vec<String> = self.changes.iter().map(|c| c.to_string()).collect();
        write!(f, "{}", rendered.join("; "))
    }
}

/// The closed set of reasons a statement can differ without being a
/// behavioral change
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum StatementChangeKind {
    ExternalNameUsage(ExternalNameUsageChange),
}

impl std::fmt::Display for StatementChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatementChangeKind::ExternalNameUsage(c) => write!(f, "{c}"),
        }
    }
}

/// Difference between two (already known to be textually different)
/// statements
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatementDiff {
    /// Changes that alter behavior; currently never populated, since every
    /// recognized difference in this engine happens to be cosmetic, but the
    /// type exists so a future comparator has somewhere to put one
    pub semantically_relevant: BTreeSet<StatementChangeKind>,
    /// Changes identified as purely cosmetic
    pub semantically_irrelevant: BTreeSet<StatementChangeKind>,
}

impl StatementDiff {
    /// A difference is behavioral unless every observed change has been
    /// positively identified as cosmetic. An empty, unidentified difference
    /// is treated as behavioral by default — we never claim "no change" for
    /// a statement we don't understand.
    pub fn semantically_different(&self) -> bool {
        !self.semantically_relevant.is_empty() || self.semantically_irrelevant.is_empty()
    }

    /// Whether at least one change was positively identified
    pub fn is_specific(&self) -> bool {
        !self.semantically_relevant.is_empty() || !self.semantically_irrelevant.is_empty()
    }
}

impl std::fmt::Display for StatementDiff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts: Vec<String> = self
            .semantically_relevant
            .iter()
            .chain(self.semantically_irrelevant.iter())
            .map(|c| c.to_string())
            .collect();
        parts.sort();
        write!(f, "{}", parts.join("; "))
    }
}

/// Rewrites an expression tree so that every reference resolvable through
/// the import table is replaced by its fully qualified form, tracking the
/// substitutions it made along the way.
///
/// Recursion is scoped to the expression and statement kinds that commonly
/// carry external references (calls, operators, containers, control flow).
/// Anything outside that set — lambdas, comprehensions, f-strings, walrus
/// assignments — is left untouched and compared structurally as-is, which
/// can only make the comparison *more* conservative, never produce a false
/// equivalence.
pub struct Qualifier<'a> {
    imports: &'a ImportedNames,
    /// local name -> canonical name, recorded wherever a substitution happened
    pub substitutions: std::collections::BTreeMap<String, String>,
    /// canonical name -> the name (local or already-canonical) it was reached through
    pub references: std::collections::BTreeMap<String, String>,
}

impl<'a> Qualifier<'a> {
    pub fn new(imports: &'a ImportedNames) -> Self {
        Self {
            imports,
            substitutions: Default::default(),
            references: Default::default(),
        }
    }

    /// Qualify a single expression, returning the rewritten expression and,
    /// if the expression resolves to an imported symbol, the canonical name
    /// it now denotes (so an enclosing `Attribute` can extend it further).
    pub fn qualify_expr(&mut self, expr: &Expr) -> (Expr, Option<String>) {
        match expr {
            Expr::Name(name) => self.qualify_name(name),
            Expr::Attribute(attr) => self.qualify_attribute(attr),
            Expr::Call(call) => {
                let (func, _) = self.qualify_expr(&call.func);
                let args: Vec<Expr> = call.arguments.args.iter().map(|a| self.qualify_expr(a).0).collect();
                let keywords: Vec<ast::Keyword> = call
                    .arguments
                    .keywords
                    .iter()
                    .map(|k| ast::Keyword {
                        value: self.qualify_expr(&k.value).0,
                        ..k.clone()
                    })
                    .collect();
                let new = ast::ExprCall {
                    func: Box::new(func),
                    arguments: ast::Arguments {
                        args: args.into_boxed_slice(),
                        keywords: keywords.into_boxed_slice(),
                        ..call.arguments.clone()
                    },
                    ..call.clone()
                };
                (Expr::Call(new), None)
            }
            Expr::BinOp(b) => {
                let (left, _) = self.qualify_expr(&b.left);
                let (right, _) = self.qualify_expr(&b.right);
                (
                    Expr::BinOp(ast::ExprBinOp {
                        left: Box::new(left),
                        right: Box::new(right),
                        ..b.clone()
                    }),
                    None,
                )
            }
            Expr::BoolOp(b) => {
                let values: Vec<Expr> = b.values.iter().map(|v| self.qualify_expr(v).0).collect();
                (Expr::BoolOp(ast::ExprBoolOp { values, ..b.clone() }), None)
            }
            Expr::UnaryOp(u) => {
                let (operand, _) = self.qualify_expr(&u.operand);
                (
                    Expr::UnaryOp(ast::ExprUnaryOp {
                        operand: Box::new(operand),
                        ..u.clone()
                    }),
                    None,
                )
            }
            Expr::Compare(c) => {
                let (left, _) = self.qualify_expr(&c.left);
                let comparators: Vec<Expr> =
                    c.comparators.iter().map(|e| self.qualify_expr(e).0).collect();
                (
                    Expr::Compare(ast::ExprCompare {
                        left: Box::new(left),
                        comparators: comparators.into_boxed_slice(),
                        ..c.clone()
                    }),
                    None,
                )
            }
            Expr::Tuple(t) => {
                let elts: Vec<Expr> = t.elts.iter().map(|e| self.qualify_expr(e).0).collect();
                (Expr::Tuple(ast::ExprTuple { elts, ..t.clone() }), None)
            }
            Expr::List(l) => {
                let elts: Vec<Expr> = l.elts.iter().map(|e| self.qualify_expr(e).0).collect();
                (Expr::List(ast::ExprList { elts, ..l.clone() }), None)
            }
            Expr::Set(s) => {
                let elts: Vec<Expr> = s.elts.iter().map(|e| self.qualify_expr(e).0).collect();
                (Expr::Set(ast::ExprSet { elts, ..s.clone() }), None)
            }
            Expr::Starred(s) => {
                let (value, _) = self.qualify_expr(&s.value);
                (
                    Expr::Starred(ast::ExprStarred {
                        value: Box::new(value),
                        ..s.clone()
                    }),
                    None,
                )
            }
            Expr::Await(a) => {
                let (value, _) = self.qualify_expr(&a.value);
                (
                    Expr::Await(ast::ExprAwait {
                        value: Box::new(value),
                        ..a.clone()
                    }),
                    None,
                )
            }
            Expr::Yield(y) => {
                let value = y.value.as_ref().map(|v| Box::new(self.qualify_expr(v).0));
                (Expr::Yield(ast::ExprYield { value, ..y.clone() }), None)
            }
            Expr::YieldFrom(y) => {
                let (value, _) = self.qualify_expr(&y.value);
                (
                    Expr::YieldFrom(ast::ExprYieldFrom {
                        value: Box::new(value),
                        ..y.clone()
                    }),
                    None,
                )
            }
            Expr::If(i) => {
                let (test, _) = self.qualify_expr(&i.test);
                let (body, _) = self.qualify_expr(&i.body);
                let (orelse, _) = self.qualify_expr(&i.orelse);
                (
                    Expr::If(ast::ExprIf {
                        test: Box::new(test),
                        body: Box::new(body),
                        orelse: Box::new(orelse),
                        ..i.clone()
                    }),
                    None,
                )
            }
            Expr::Subscript(s) => {
                let (value, _) = self.qualify_expr(&s.value);
                let (slice, _) = self.qualify_expr(&s.slice);
                (
                    Expr::Subscript(ast::ExprSubscript {
                        value: Box::new(value),
                        slice: Box::new(slice),
                        ..s.clone()
                    }),
                    None,
                )
            }
            other => (other.clone(), None),
        }
    }

    fn qualify_name(&mut self, name: &ast::ExprName) -> (Expr, Option<String>) {
        let id = name.id.as_str();
        let Some(imported) = self.imports.get(id) else {
            return (Expr::Name(name.clone()), None);
        };
        let canonical = imported.canonical_name.clone();
        self.references.insert(canonical.clone(), id.to_string());
        if id == canonical {
            return (Expr::Name(name.clone()), Some(canonical));
        }
        self.substitutions.insert(id.to_string(), canonical.clone());
        (canonical_ast(&imported.canonical_parts), Some(canonical))
    }

    fn qualify_attribute(&mut self, attr: &ast::ExprAttribute) -> (Expr, Option<String>) {
        let (value, current) = self.qualify_expr(&attr.value);
        let rebuilt = Expr::Attribute(ast::ExprAttribute {
            value: Box::new(value),
            ..attr.clone()
        });
        let Some(prefix) = current else {
            return (rebuilt, None);
        };
        let key = self.references.get(&prefix).cloned().unwrap_or(prefix.clone());
        let extended = format!("{prefix}.{}", attr.attr.as_str());
        self.references
            .insert(extended.clone(), format!("{key}.{}", attr.attr.as_str()));
        (rebuilt, Some(extended))
    }

    /// Qualify a single statement, rewriting every expression it directly
    /// carries. Nested compound-statement bodies recurse transparently.
    pub fn qualify_stmt(&mut self, stmt: &Stmt) -> Stmt {
        match stmt {
            Stmt::Expr(e) => Stmt::Expr(ast::StmtExpr {
                value: Box::new(self.qualify_expr(&e.value).0),
                ..e.clone()
            }),
            Stmt::Return(r) => Stmt::Return(ast::StmtReturn {
                value: r.value.as_ref().map(|v| Box::new(self.qualify_expr(v).0)),
                ..r.clone()
            }),
            Stmt::Assign(a) => Stmt::Assign(ast::StmtAssign {
                targets: a.targets.iter().map(|t| self.qualify_expr(t).0).collect(),
                value: Box::new(self.qualify_expr(&a.value).0),
                ..a.clone()
            }),
            Stmt::AugAssign(a) => Stmt::AugAssign(ast::StmtAugAssign {
                target: Box::new(self.qualify_expr(&a.target).0),
                value: Box::new(self.qualify_expr(&a.value).0),
                ..a.clone()
            }),
            Stmt::AnnAssign(a) => Stmt::AnnAssign(ast::StmtAnnAssign {
                target: Box::new(self.qualify_expr(&a.target).0),
                annotation: Box::new(self.qualify_expr(&a.annotation).0),
                value: a.value.as_ref().map(|v| Box::new(self.qualify_expr(v).0)),
                ..a.clone()
            }),
            Stmt::Delete(d) => Stmt::Delete(ast::StmtDelete {
                targets: d.targets.iter().map(|t| self.qualify_expr(t).0).collect(),
                ..d.clone()
            }),
            Stmt::Assert(a) => Stmt::Assert(ast::StmtAssert {
                test: Box::new(self.qualify_expr(&a.test).0),
                msg: a.msg.as_ref().map(|m| Box::new(self.qualify_expr(m).0)),
                ..a.clone()
            }),
            Stmt::Raise(r) => Stmt::Raise(ast::StmtRaise {
                exc: r.exc.as_ref().map(|e| Box::new(self.qualify_expr(e).0)),
                cause: r.cause.as_ref().map(|c| Box::new(self.qualify_expr(c).0)),
                ..r.clone()
            }),
            Stmt::If(i) => Stmt::If(ast::StmtIf {
                test: Box::new(self.qualify_expr(&i.test).0),
                body: i.body.iter().map(|s| self.qualify_stmt(s)).collect(),
                elif_else_clauses: i
                    .elif_else_clauses
                    .iter()
                    .map(|c| ast::ElifElseClause {
                        test: c.test.as_ref().map(|t| self.qualify_expr(t).0),
                        body: c.body.iter().map(|s| self.qualify_stmt(s)).collect(),
                        ..c.clone()
                    })
                    .collect(),
                ..i.clone()
            }),
            Stmt::While(w) => Stmt::While(ast::StmtWhile {
                test: Box::new(self.qualify_expr(&w.test).0),
                body: w.body.iter().map(|s| self.qualify_stmt(s)).collect(),
                orelse: w.orelse.iter().map(|s| self.qualify_stmt(s)).collect(),
                ..w.clone()
            }),
            Stmt::For(f) => Stmt::For(ast::StmtFor {
                target: Box::new(self.qualify_expr(&f.target).0),
                iter: Box::new(self.qualify_expr(&f.iter).0),
                body: f.body.iter().map(|s| self.qualify_stmt(s)).collect(),
                orelse: f.orelse.iter().map(|s| self.qualify_stmt(s)).collect(),
                ..f.clone()
            }),
            Stmt::With(w) => Stmt::With(ast::StmtWith {
                items: w
                    .items
                    .iter()
                    .map(|item| ast::WithItem {
                        context_expr: self.qualify_expr(&item.context_expr).0,
                        optional_vars: item
                            .optional_vars
                            .as_ref()
                            .map(|v| Box::new(self.qualify_expr(v).0)),
                        ..item.clone()
                    })
                    .collect(),
                body: w.body.iter().map(|s| self.qualify_stmt(s)).collect(),
                ..w.clone()
            }),
            Stmt::FunctionDef(fd) => Stmt::FunctionDef(ast::StmtFunctionDef {
                body: fd.body.iter().map(|s| self.qualify_stmt(s)).collect(),
                ..fd.clone()
            }),
            Stmt::ClassDef(cd) => Stmt::ClassDef(ast::StmtClassDef {
                body: cd.body.iter().map(|s| self.qualify_stmt(s)).collect(),
                ..cd.clone()
            }),
            // Try/except handler shapes vary enough across parser versions that
            // rewriting them is not worth the risk; compared structurally as-is.
            other => other.clone(),
        }
    }
}

/// Build the attribute-chain AST denoting a dotted canonical path, e.g.
/// `["os", "path", "join"]` becomes the expression for `os.path.join`
fn canonical_ast(parts: &[String]) -> Expr {
    let mut iter = parts.iter();
    let first = iter.next().cloned().unwrap_or_default();
    let mut expr = Expr::Name(ast::ExprName {
        id: ast::name::Name::new(first),
        ctx: ast::ExprContext::Load,
        range: Default::default(),
        node_index: ast::AtomicNodeIndex::dummy(),
    });
    for part in iter {
        expr = Expr::Attribute(ast::ExprAttribute {
            value: Box::new(expr),
            attr: ast::Identifier::new(part, Default::default()),
            ctx: ast::ExprContext::Load,
            range: Default::default(),
            node_index: ast::AtomicNodeIndex::dummy(),
        });
    }
    expr
}

/// Look for a reassignment of import aliases that fully explains the
/// textual difference between two statements
pub fn find_external_name_matches(
    old: &Stmt,
    new: &Stmt,
    old_imports: &ImportedNames,
    new_imports: &ImportedNames,
) -> Option<ExternalNameUsageChange> {
    if ComparableStmt::from(old) == ComparableStmt::from(new) {
        return None;
    }
    let mut old_q = Qualifier::new(old_imports);
    let fq_old = old_q.qualify_stmt(old);
    let mut new_q = Qualifier::new(new_imports);
    let fq_new = new_q.qualify_stmt(new);

    if ComparableStmt::from(&fq_old) != ComparableStmt::from(&fq_new) {
        return None;
    }

    let mut changes = BTreeSet::new();
    for (local, canonical) in &old_q.substitutions {
        if let Some(new_local) = new_q.references.get(canonical) {
            changes.insert(SingleExternalNameUsageChange {
                old: local.clone(),
                new: new_local.clone(),
            });
        }
    }
    for (local, canonical) in &new_q.substitutions {
        if let Some(old_local) = old_q.references.get(canonical) {
            changes.insert(SingleExternalNameUsageChange {
                old: old_local.clone(),
                new: local.clone(),
            });
        }
    }

    if changes.is_empty() {
        None
    } else {
        Some(ExternalNameUsageChange { changes })
    }
}

/// Compare two statements, returning `None` if they are identical and a
/// [`StatementDiff`] describing the difference otherwise
pub fn pyff_statement(
    old: &Stmt,
    new: &Stmt,
    old_imports: &ImportedNames,
    new_imports: &ImportedNames,
) -> Option<StatementDiff> {
    if ComparableStmt::from(old) == ComparableStmt::from(new) {
        return None;
    }

    let mut diff = StatementDiff::default();
    if let Some(change) = find_external_name_matches(old, new, old_imports, new_imports) {
        diff.semantically_irrelevant
            .insert(StatementChangeKind::ExternalNameUsage(change));
    }
    Some(diff)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ruff_python_parser::parse_module;

    fn parse_one(src: &str) -> Stmt {
        parse_module(src).unwrap().into_syntax().body.remove(0)
    }

    fn imports(src: &str) -> ImportedNames {
        ImportedNames::extract(&parse_module(src).unwrap().into_syntax())
    }

    #[test]
    fn identical_statements_have_no_diff() {
        let old = parse_one("return os.path.join(a, b)\n");
        let new = parse_one("return os.path.join(a, b)\n");
        let empty = ImportedNames::default();
        assert!(pyff_statement(&old, &new, &empty, &empty).is_none());
    }

    #[test]
    fn import_alias_change_is_irrelevant() {
        let old_imp = imports("import os\n");
        let new_imp = imports("from os.path import join\n");
        let old = parse_one("return os.path.join(\"a\", x)\n");
        let new = parse_one("return join(\"a\", x)\n");

        let diff = pyff_statement(&old, &new, &old_imp, &new_imp).unwrap();
        assert!(diff.is_specific());
        assert!(!diff.semantically_different());
    }

    #[test]
    fn genuinely_different_body_is_relevant() {
        let old = parse_one("return a + b\n");
        let new = parse_one("return a - b\n");
        let empty = ImportedNames::default();
        let diff = pyff_statement(&old, &new, &empty, &empty).unwrap();
        assert!(!diff.is_specific());
        assert!(diff.semantically_different());
    }
}
