//! Parser for the Rill Scripting Language
//!
//! This module implements a recursive descent parser with one token of
//! lookahead, pulling tokens from the lexer on demand and building the tree
//! in `ast`. Expressions use precedence climbing:
//!
//! ```text
//! Precedence Levels (lowest to highest):
//! 1. Assignment (=)            - right-associative
//! 2. Equality (==, !=)         - left-associative
//! 3. Comparison (<, <=, >, >=) - left-associative
//! 4. Addition (+, -)           - left-associative
//! 5. Multiplication (*, /)     - left-associative
//! 6. Call (callee(args))       - postfix, chains
//! 7. Primary (literals, identifiers, parentheses)
//! ```
//!
//! ## Error Recovery
//!
//! The parser never aborts. Every syntax error is reported through the
//! diagnostic sink at the point of detection, then the parser synchronizes:
//! it discards tokens until it consumes a `;` or sees a token that can begin
//! a declaration (`class`, `fn`, `let`, `if`, `while`, `print`), and resumes
//! at the top of `declaration`. The resulting `Program` contains every
//! declaration that parsed cleanly.
//!
//! ## Class Bodies
//!
//! Inside a class body only `fn` introductions contribute methods; any other
//! token (including the reserved `virtual` and `override` modifiers) is
//! skipped with a single advance. Classes are method-only.

use std::rc::Rc;

use log::trace;

use crate::ast::{Expression, FunctionDecl, Program, Statement};
use crate::diagnostics::Reporter;
use crate::error::{Result, RillError};
use crate::lexer::{Lexer, Token, TokenKind};

/// Recursive descent parser over a pull-style token source.
///
/// Holds the lexer it pulls from, the current lookahead token, the most
/// recently consumed token, and the diagnostic sink.
pub struct Parser<'a> {
    lexer: Lexer,
    reporter: &'a mut Reporter,
    current: Token,
    previous: Token,
}

impl<'a> Parser<'a> {
    /// Creates a parser and pulls the first token.
    pub fn new(mut lexer: Lexer, reporter: &'a mut Reporter) -> Self {
        let current = lexer.next_token();
        Self {
            lexer,
            reporter,
            current,
            previous: Token {
                kind: TokenKind::Eof,
                lexeme: String::new(),
                line: 1,
            },
        }
    }

    /// Parses the whole token stream into a `Program`.
    ///
    /// Always returns a program, even when some declarations were malformed;
    /// those are reported and skipped.
    pub fn parse(mut self) -> Program {
        let mut declarations = Vec::new();

        while !self.check(TokenKind::Eof) {
            if let Some(declaration) = self.declaration() {
                declarations.push(declaration);
            }
        }

        Program { declarations }
    }

    /// Parses one declaration, recovering on error.
    ///
    /// ```text
    /// declaration → class_declaration | fn_declaration | var_declaration | statement
    /// ```
    fn declaration(&mut self) -> Option<Statement> {
        let result = if self.matches(&[TokenKind::Class]) {
            self.class_declaration()
        } else if self.matches(&[TokenKind::Fn]) {
            self.function_declaration().map(Statement::Function)
        } else if self.matches(&[TokenKind::Let]) {
            self.var_declaration()
        } else {
            self.statement()
        };

        match result {
            Ok(declaration) => Some(declaration),
            Err(_) => {
                self.synchronize();
                None
            }
        }
    }

    /// Parses a class declaration; the `class` keyword has been consumed.
    ///
    /// ```text
    /// class_declaration → "class" IDENTIFIER "{" (fn_declaration | any_token)* "}"
    /// ```
    fn class_declaration(&mut self) -> Result<Statement> {
        let name = self.consume(TokenKind::Identifier, "expected class name")?;
        self.consume(TokenKind::LeftBrace, "expected '{' after class name")?;

        let mut methods = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.check(TokenKind::Eof) {
            if self.matches(&[TokenKind::Fn]) {
                methods.push(self.function_declaration()?);
            } else {
                // Method-only classes: anything else in the body is skipped,
                // which is also where the reserved `virtual` and `override`
                // modifiers land.
                self.advance();
            }
        }

        self.consume(TokenKind::RightBrace, "expected '}' after class body")?;
        Ok(Statement::Class { name, methods })
    }

    /// Parses a function declaration; the `fn` keyword has been consumed.
    ///
    /// ```text
    /// fn_declaration → "fn" IDENTIFIER "(" parameters? ")" block
    /// parameters     → IDENTIFIER ("," IDENTIFIER)*
    /// ```
    fn function_declaration(&mut self) -> Result<Rc<FunctionDecl>> {
        let name = self.consume(TokenKind::Identifier, "expected function name")?;
        self.consume(TokenKind::LeftParen, "expected '(' after function name")?;

        let mut params = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                params.push(self.consume(TokenKind::Identifier, "expected parameter name")?);
                if !self.matches(&[TokenKind::Comma]) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "expected ')' after parameters")?;

        self.consume(TokenKind::LeftBrace, "expected '{' before function body")?;
        let body = self.block_statements()?;

        Ok(Rc::new(FunctionDecl {
            name: name.lexeme,
            line: name.line,
            params,
            body,
        }))
    }

    /// Parses a variable declaration; the `let` keyword has been consumed.
    ///
    /// ```text
    /// var_declaration → "let" IDENTIFIER ("=" expression)? ";"
    /// ```
    fn var_declaration(&mut self) -> Result<Statement> {
        let name = self.consume(TokenKind::Identifier, "expected variable name")?;

        let initializer = if self.matches(&[TokenKind::Equal]) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(
            TokenKind::Semicolon,
            "expected ';' after variable declaration",
        )?;
        Ok(Statement::Var { name, initializer })
    }

    /// ```text
    /// statement → if_statement | while_statement | print_statement | block | expression_statement
    /// ```
    fn statement(&mut self) -> Result<Statement> {
        if self.matches(&[TokenKind::If]) {
            self.if_statement()
        } else if self.matches(&[TokenKind::While]) {
            self.while_statement()
        } else if self.matches(&[TokenKind::Print]) {
            self.print_statement()
        } else if self.matches(&[TokenKind::LeftBrace]) {
            Ok(Statement::Block(self.block_statements()?))
        } else {
            self.expression_statement()
        }
    }

    /// ```text
    /// if_statement → "if" "(" expression ")" statement ("else" statement)?
    /// ```
    fn if_statement(&mut self) -> Result<Statement> {
        self.consume(TokenKind::LeftParen, "expected '(' after 'if'")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RightParen, "expected ')' after condition")?;

        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.matches(&[TokenKind::Else]) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Statement::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    /// ```text
    /// while_statement → "while" "(" expression ")" statement
    /// ```
    fn while_statement(&mut self) -> Result<Statement> {
        self.consume(TokenKind::LeftParen, "expected '(' after 'while'")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RightParen, "expected ')' after condition")?;

        let body = Box::new(self.statement()?);
        Ok(Statement::While { condition, body })
    }

    /// ```text
    /// print_statement → "print" expression ";"
    /// ```
    fn print_statement(&mut self) -> Result<Statement> {
        let value = self.expression()?;
        self.consume(TokenKind::Semicolon, "expected ';' after value")?;
        Ok(Statement::Print(value))
    }

    /// Parses the declarations of a block; the `{` has been consumed.
    fn block_statements(&mut self) -> Result<Vec<Statement>> {
        let mut statements = Vec::new();

        while !self.check(TokenKind::RightBrace) && !self.check(TokenKind::Eof) {
            if let Some(declaration) = self.declaration() {
                statements.push(declaration);
            }
        }

        self.consume(TokenKind::RightBrace, "expected '}' after block")?;
        Ok(statements)
    }

    fn expression_statement(&mut self) -> Result<Statement> {
        let expr = self.expression()?;
        self.consume(TokenKind::Semicolon, "expected ';' after expression")?;
        Ok(Statement::Expression(expr))
    }

    fn expression(&mut self) -> Result<Expression> {
        self.assignment()
    }

    /// Parses assignment (right-associative, lowest precedence).
    ///
    /// A LHS that is not a plain variable is reported as an invalid
    /// assignment target but does not abort the parse; the RHS is still
    /// consumed and the LHS expression is returned.
    fn assignment(&mut self) -> Result<Expression> {
        let expr = self.equality()?;

        if self.matches(&[TokenKind::Equal]) {
            let equals_line = self.previous.line;
            let value = self.assignment()?;

            return match expr {
                Expression::Variable(name) => Ok(Expression::Assign {
                    name,
                    value: Box::new(value),
                }),
                other => {
                    self.reporter.report(equals_line, "invalid assignment target");
                    Ok(other)
                }
            };
        }

        Ok(expr)
    }

    /// ```text
    /// equality → comparison (("==" | "!=") comparison)*
    /// ```
    fn equality(&mut self) -> Result<Expression> {
        let mut expr = self.comparison()?;

        while self.matches(&[TokenKind::EqualEqual, TokenKind::BangEqual]) {
            let operator = self.previous.clone();
            let right = self.comparison()?;
            expr = Expression::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    /// ```text
    /// comparison → term (("<" | "<=" | ">" | ">=") term)*
    /// ```
    fn comparison(&mut self) -> Result<Expression> {
        let mut expr = self.term()?;

        while self.matches(&[
            TokenKind::Less,
            TokenKind::LessEqual,
            TokenKind::Greater,
            TokenKind::GreaterEqual,
        ]) {
            let operator = self.previous.clone();
            let right = self.term()?;
            expr = Expression::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    /// ```text
    /// term → factor (("+" | "-") factor)*
    /// ```
    fn term(&mut self) -> Result<Expression> {
        let mut expr = self.factor()?;

        while self.matches(&[TokenKind::Plus, TokenKind::Minus]) {
            let operator = self.previous.clone();
            let right = self.factor()?;
            expr = Expression::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    /// ```text
    /// factor → unary (("*" | "/") unary)*
    /// ```
    fn factor(&mut self) -> Result<Expression> {
        let mut expr = self.unary()?;

        while self.matches(&[TokenKind::Star, TokenKind::Slash]) {
            let operator = self.previous.clone();
            let right = self.unary()?;
            expr = Expression::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    /// Placeholder level that delegates to call expressions. Prefix
    /// operators would slot in here.
    fn unary(&mut self) -> Result<Expression> {
        self.call()
    }

    /// ```text
    /// call      → primary ("(" arguments? ")")*
    /// arguments → expression ("," expression)*
    /// ```
    fn call(&mut self) -> Result<Expression> {
        let mut expr = self.primary()?;

        while self.matches(&[TokenKind::LeftParen]) {
            let paren = self.previous.clone();

            let mut arguments = Vec::new();
            if !self.check(TokenKind::RightParen) {
                loop {
                    arguments.push(self.expression()?);
                    if !self.matches(&[TokenKind::Comma]) {
                        break;
                    }
                }
            }
            self.consume(TokenKind::RightParen, "expected ')' after arguments")?;

            expr = Expression::Call {
                callee: Box::new(expr),
                paren,
                arguments,
            };
        }

        Ok(expr)
    }

    /// ```text
    /// primary → NUMBER | STRING | IDENTIFIER | "(" expression ")"
    /// ```
    fn primary(&mut self) -> Result<Expression> {
        if self.matches(&[TokenKind::Number, TokenKind::String]) {
            return Ok(Expression::Literal(self.previous.clone()));
        }

        if self.matches(&[TokenKind::Identifier]) {
            return Ok(Expression::Variable(self.previous.clone()));
        }

        if self.matches(&[TokenKind::LeftParen]) {
            let expr = self.expression()?;
            self.consume(TokenKind::RightParen, "expected ')' after expression")?;
            return Ok(expr);
        }

        let found = self.current.clone();
        Err(self.error(&found, &format!("expected expression, found {}", found)))
    }

    /// Discards tokens until a likely statement boundary.
    ///
    /// Stops after consuming a `;`, or before a token that can begin a
    /// declaration. Parsing resumes at `declaration`.
    fn synchronize(&mut self) {
        trace!(
            "synchronizing after parse error near line {}",
            self.current.line
        );

        while !self.check(TokenKind::Eof) {
            match self.current.kind {
                TokenKind::Class
                | TokenKind::Fn
                | TokenKind::Let
                | TokenKind::If
                | TokenKind::While
                | TokenKind::Print => return,
                TokenKind::Semicolon => {
                    self.advance();
                    return;
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    /// Consumes the current token if it has the expected kind, or reports a
    /// parse error naming what was expected and what was found.
    fn consume(&mut self, kind: TokenKind, message: &str) -> Result<Token> {
        if self.check(kind) {
            return Ok(self.advance());
        }

        let found = self.current.clone();
        Err(self.error(&found, &format!("{}, found {}", message, found)))
    }

    /// Reports a parse error at the given token and returns the unwinding
    /// signal for the caller to propagate.
    fn error(&mut self, token: &Token, message: &str) -> RillError {
        self.reporter.report(token.line, message);
        RillError::Parse(message.to_string())
    }

    /// Consumes the current token if it matches any of the given kinds.
    fn matches(&mut self, kinds: &[TokenKind]) -> bool {
        if kinds.iter().any(|kind| self.check(*kind)) {
            self.advance();
            return true;
        }
        false
    }

    /// Tests the current token without consuming it.
    fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    /// Pulls the next token; returns the one just consumed.
    fn advance(&mut self) -> Token {
        self.previous = std::mem::replace(&mut self.current, self.lexer.next_token());
        self.previous.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_source(source: &str) -> (Program, Reporter) {
        let mut reporter = Reporter::new();
        let program = Parser::new(Lexer::new(source), &mut reporter).parse();
        (program, reporter)
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let (program, reporter) = parse_source("1 + 2 * 3;");
        assert_eq!(reporter.count(), 0);

        let Statement::Expression(Expression::Binary {
            operator, right, ..
        }) = &program.declarations[0]
        else {
            panic!("expected binary expression statement");
        };
        assert_eq!(operator.lexeme, "+");
        let Expression::Binary { operator, .. } = right.as_ref() else {
            panic!("expected nested binary on the right");
        };
        assert_eq!(operator.lexeme, "*");
    }

    #[test]
    fn binary_operators_fold_left() {
        let (program, _) = parse_source("1 - 2 - 3;");

        let Statement::Expression(Expression::Binary { left, .. }) = &program.declarations[0]
        else {
            panic!("expected binary expression statement");
        };
        // (1 - 2) - 3: the left child is itself a subtraction.
        assert!(matches!(left.as_ref(), Expression::Binary { .. }));
    }

    #[test]
    fn assignment_is_right_associative() {
        let (program, reporter) = parse_source("a = b = 1;");
        assert_eq!(reporter.count(), 0);

        let Statement::Expression(Expression::Assign { name, value }) = &program.declarations[0]
        else {
            panic!("expected assignment");
        };
        assert_eq!(name.lexeme, "a");
        assert!(matches!(value.as_ref(), Expression::Assign { .. }));
    }

    #[test]
    fn invalid_assignment_target_is_reported_not_fatal() {
        let (program, reporter) = parse_source("1 = 2;");
        assert_eq!(reporter.count(), 1);
        assert!(reporter.messages()[0].contains("invalid assignment target"));
        // The statement still parses (as its LHS expression).
        assert_eq!(program.declarations.len(), 1);
    }

    #[test]
    fn comparison_and_equality_operators_parse() {
        let (program, reporter) = parse_source("a < 1; a <= 1; a > 1; a >= 1; a == 1; a != 1;");
        assert_eq!(reporter.count(), 0);
        assert_eq!(program.declarations.len(), 6);
    }

    #[test]
    fn parses_function_with_parameters() {
        let (program, reporter) = parse_source("fn add(a, b) { print a + b; }");
        assert_eq!(reporter.count(), 0);

        let Statement::Function(decl) = &program.declarations[0] else {
            panic!("expected function declaration");
        };
        assert_eq!(decl.name, "add");
        let params: Vec<&str> = decl.params.iter().map(|p| p.lexeme.as_str()).collect();
        assert_eq!(params, vec!["a", "b"]);
        assert_eq!(decl.body.len(), 1);
    }

    #[test]
    fn call_chains_parse() {
        let (program, reporter) = parse_source("f(1)(2, 3);");
        assert_eq!(reporter.count(), 0);

        let Statement::Expression(Expression::Call {
            callee, arguments, ..
        }) = &program.declarations[0]
        else {
            panic!("expected call expression");
        };
        assert_eq!(arguments.len(), 2);
        assert!(matches!(callee.as_ref(), Expression::Call { .. }));
    }

    #[test]
    fn class_body_keeps_methods_and_skips_everything_else() {
        let (program, reporter) =
            parse_source("class C { virtual fn a() {} override fn b() {} stray }");
        assert_eq!(reporter.count(), 0);

        let Statement::Class { name, methods } = &program.declarations[0] else {
            panic!("expected class declaration");
        };
        assert_eq!(name.lexeme, "C");
        let names: Vec<&str> = methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn if_else_attaches_to_nearest_if() {
        let (program, reporter) = parse_source("if (a) print 1; else print 2;");
        assert_eq!(reporter.count(), 0);

        let Statement::If { else_branch, .. } = &program.declarations[0] else {
            panic!("expected if statement");
        };
        assert!(else_branch.is_some());
    }

    #[test]
    fn recovers_after_malformed_statement() {
        let (program, reporter) = parse_source("print ;\nlet x = 1;\nprint x;");
        assert_eq!(reporter.count(), 1);
        assert_eq!(program.declarations.len(), 2);
        assert!(matches!(program.declarations[0], Statement::Var { .. }));
        assert!(matches!(program.declarations[1], Statement::Print(_)));
    }

    #[test]
    fn recovery_stops_before_declaration_keywords() {
        let (program, reporter) = parse_source("let = 5 let y = 2; print y;");
        assert!(reporter.has_errors());
        // `let y = 2;` and `print y;` both survive the bad declaration.
        assert_eq!(program.declarations.len(), 2);
    }

    #[test]
    fn recovers_inside_blocks() {
        let (program, reporter) = parse_source("{ print ; let a = 1; }");
        assert_eq!(reporter.count(), 1);

        let Statement::Block(statements) = &program.declarations[0] else {
            panic!("expected block");
        };
        assert_eq!(statements.len(), 1);
    }

    #[test]
    fn unknown_token_is_reported_where_encountered() {
        let (program, reporter) = parse_source("print @;");
        assert_eq!(reporter.count(), 1);
        assert!(reporter.messages()[0].contains("expected expression"));
        assert_eq!(program.declarations.len(), 0);
    }

    #[test]
    fn always_returns_a_program() {
        for source in ["", "@@@@", "class", "fn f( {", "((((("] {
            let (_, _) = parse_source(source);
        }
    }
}
