//! Semantic Analysis for the Rill Scripting Language
//!
//! A lexical-scope walk over the parsed tree, run between parsing and
//! evaluation. The analyzer maintains a stack of scopes (innermost at the
//! top) mapping names to symbols and reports three kinds of problems:
//!
//! - **Undefined name**: a variable reference or assignment target that
//!   resolves through no scope in the chain.
//! - **Duplicate definition**: a name defined twice in the same scope.
//! - **Assignment to a constant**: function and class names are constant
//!   bindings and cannot be assignment targets.
//!
//! The pass is non-fatal: it reports through the shared diagnostic sink and
//! always completes the full walk. The tree is never modified.

use std::collections::HashMap;

use crate::ast::{Expression, FunctionDecl, Program, Statement};
use crate::diagnostics::Reporter;

/// What a name is bound to, as far as scope checking is concerned.
///
/// The kind is advisory (it shapes diagnostic messages); only the name and
/// constness carry semantic weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Variable,
    Function,
    Class,
}

impl SymbolKind {
    fn describe(self) -> &'static str {
        match self {
            SymbolKind::Variable => "variable",
            SymbolKind::Function => "function",
            SymbolKind::Class => "class",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub kind: SymbolKind,
    pub is_const: bool,
}

/// Stack of lexical scopes; lookups walk from the innermost scope outwards.
#[derive(Debug)]
struct SymbolTable {
    scopes: Vec<HashMap<String, Symbol>>,
}

impl SymbolTable {
    fn new() -> Self {
        Self {
            scopes: vec![HashMap::new()],
        }
    }

    fn enter_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn exit_scope(&mut self) {
        self.scopes.pop();
    }

    /// Defines a name in the innermost scope. Returns `false` when the name
    /// already exists there (shadowing an outer scope is fine).
    fn define(&mut self, name: &str, symbol: Symbol) -> bool {
        let scope = self
            .scopes
            .last_mut()
            .expect("symbol table always has a scope");
        if scope.contains_key(name) {
            return false;
        }
        scope.insert(name.to_string(), symbol);
        true
    }

    /// Resolves a name through the scope chain, innermost first.
    fn resolve(&self, name: &str) -> Option<&Symbol> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }
}

/// The scope-consistency pass.
pub struct Analyzer<'a> {
    reporter: &'a mut Reporter,
    table: SymbolTable,
}

impl<'a> Analyzer<'a> {
    pub fn new(reporter: &'a mut Reporter) -> Self {
        Self {
            reporter,
            table: SymbolTable::new(),
        }
    }

    /// Walks the whole program, reporting every scope problem it finds.
    pub fn analyze(&mut self, program: &Program) {
        for declaration in &program.declarations {
            self.visit_statement(declaration);
        }
    }

    fn visit_statement(&mut self, statement: &Statement) {
        match statement {
            Statement::Expression(expr) | Statement::Print(expr) => {
                self.visit_expression(expr);
            }
            Statement::Var { name, initializer } => {
                // The initializer is resolved before the name exists, so
                // `let a = a;` refers to an outer `a` or is an error.
                if let Some(init) = initializer {
                    self.visit_expression(init);
                }
                let symbol = Symbol {
                    kind: SymbolKind::Variable,
                    is_const: false,
                };
                if !self.table.define(&name.lexeme, symbol) {
                    self.reporter.report(
                        name.line,
                        &format!("duplicate definition of '{}'", name.lexeme),
                    );
                }
            }
            Statement::Block(statements) => {
                self.table.enter_scope();
                for statement in statements {
                    self.visit_statement(statement);
                }
                self.table.exit_scope();
            }
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.visit_expression(condition);
                self.visit_statement(then_branch);
                if let Some(else_branch) = else_branch {
                    self.visit_statement(else_branch);
                }
            }
            Statement::While { condition, body } => {
                self.visit_expression(condition);
                self.visit_statement(body);
            }
            Statement::Function(decl) => {
                self.define_callable(&decl.name, decl.line, SymbolKind::Function);
                self.visit_function(decl);
            }
            Statement::Class { name, methods } => {
                self.define_callable(&name.lexeme, name.line, SymbolKind::Class);
                // Methods live in a fresh scope rooted at the enclosing one;
                // the class name itself is already visible to them.
                self.table.enter_scope();
                for method in methods {
                    self.define_callable(&method.name, method.line, SymbolKind::Function);
                    self.visit_function(method);
                }
                self.table.exit_scope();
            }
        }
    }

    /// Defines a function or class name as a constant binding.
    fn define_callable(&mut self, name: &str, line: usize, kind: SymbolKind) {
        let symbol = Symbol {
            kind,
            is_const: true,
        };
        if !self.table.define(name, symbol) {
            self.reporter
                .report(line, &format!("duplicate definition of '{}'", name));
        }
    }

    /// Visits a function body with its parameters in a fresh child scope.
    fn visit_function(&mut self, decl: &FunctionDecl) {
        self.table.enter_scope();
        for param in &decl.params {
            let symbol = Symbol {
                kind: SymbolKind::Variable,
                is_const: false,
            };
            if !self.table.define(&param.lexeme, symbol) {
                self.reporter.report(
                    param.line,
                    &format!("duplicate parameter '{}'", param.lexeme),
                );
            }
        }
        for statement in &decl.body {
            self.visit_statement(statement);
        }
        self.table.exit_scope();
    }

    fn visit_expression(&mut self, expression: &Expression) {
        match expression {
            Expression::Literal(_) => {}
            Expression::Variable(name) => {
                if self.table.resolve(&name.lexeme).is_none() {
                    self.reporter
                        .report(name.line, &format!("undefined name '{}'", name.lexeme));
                }
            }
            Expression::Assign { name, value } => {
                self.visit_expression(value);
                match self.table.resolve(&name.lexeme) {
                    None => {
                        self.reporter
                            .report(name.line, &format!("undefined name '{}'", name.lexeme));
                    }
                    Some(symbol) if symbol.is_const => {
                        let kind = symbol.kind.describe();
                        self.reporter.report(
                            name.line,
                            &format!("cannot assign to {} '{}'", kind, name.lexeme),
                        );
                    }
                    Some(_) => {}
                }
            }
            Expression::Binary { left, right, .. } => {
                self.visit_expression(left);
                self.visit_expression(right);
            }
            Expression::Call {
                callee, arguments, ..
            } => {
                self.visit_expression(callee);
                for argument in arguments {
                    self.visit_expression(argument);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn analyze_source(source: &str) -> Reporter {
        let mut reporter = Reporter::new();
        let program = Parser::new(Lexer::new(source), &mut reporter).parse();
        assert_eq!(reporter.count(), 0, "expected a clean parse");
        Analyzer::new(&mut reporter).analyze(&program);
        reporter
    }

    #[test]
    fn clean_program_reports_nothing() {
        let reporter = analyze_source("let x = 1; { let y = x; print y; } print x;");
        assert_eq!(reporter.count(), 0);
    }

    #[test]
    fn duplicate_definition_in_same_scope() {
        let reporter = analyze_source("let x = 1; let x = 2;");
        assert_eq!(reporter.count(), 1);
        assert!(reporter.messages()[0].contains("duplicate definition of 'x'"));
    }

    #[test]
    fn shadowing_in_inner_scope_is_allowed() {
        let reporter = analyze_source("let x = 1; { let x = 2; print x; }");
        assert_eq!(reporter.count(), 0);
    }

    #[test]
    fn undefined_variable_reference() {
        let reporter = analyze_source("print ghost;");
        assert_eq!(reporter.count(), 1);
        assert!(reporter.messages()[0].contains("undefined name 'ghost'"));
    }

    #[test]
    fn assignment_to_undefined_name() {
        let reporter = analyze_source("x = 1;");
        assert_eq!(reporter.count(), 1);
        assert!(reporter.messages()[0].contains("undefined name 'x'"));
    }

    #[test]
    fn initializer_resolves_before_the_name_exists() {
        let reporter = analyze_source("let a = a;");
        assert_eq!(reporter.count(), 1);
        assert!(reporter.messages()[0].contains("undefined name 'a'"));
    }

    #[test]
    fn function_name_is_constant() {
        let reporter = analyze_source("fn f() {} f = 1;");
        assert_eq!(reporter.count(), 1);
        assert!(reporter.messages()[0].contains("cannot assign to function 'f'"));
    }

    #[test]
    fn class_name_is_constant() {
        let reporter = analyze_source("class C {} C = 1;");
        assert_eq!(reporter.count(), 1);
        assert!(reporter.messages()[0].contains("cannot assign to class 'C'"));
    }

    #[test]
    fn function_may_reference_itself() {
        let reporter = analyze_source("fn f() { f(); } f();");
        assert_eq!(reporter.count(), 0);
    }

    #[test]
    fn parameters_are_visible_in_the_body_only() {
        let reporter = analyze_source("fn f(a) { print a; } print a;");
        assert_eq!(reporter.count(), 1);
        assert!(reporter.messages()[0].contains("undefined name 'a'"));
    }

    #[test]
    fn duplicate_parameters_are_reported() {
        let reporter = analyze_source("fn f(a, a) {}");
        assert_eq!(reporter.count(), 1);
        assert!(reporter.messages()[0].contains("duplicate parameter 'a'"));
    }

    #[test]
    fn block_scope_is_discarded_on_exit() {
        let reporter = analyze_source("{ let inner = 1; } print inner;");
        assert_eq!(reporter.count(), 1);
        assert!(reporter.messages()[0].contains("undefined name 'inner'"));
    }

    #[test]
    fn methods_may_reference_the_class_name() {
        let reporter = analyze_source("class C { fn init() { print C; } } C();");
        assert_eq!(reporter.count(), 0);
    }

    #[test]
    fn closures_see_enclosing_function_locals() {
        let reporter =
            analyze_source("let x = 10; fn outer() { let y = 20; fn inner() { print x + y; } inner(); } outer();");
        assert_eq!(reporter.count(), 0);
    }
}
