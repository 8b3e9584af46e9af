//! Interpreter for the Rill Scripting Language
//!
//! This module implements the execution engine that walks the parsed tree
//! and evaluates it against a chain of environments. It is responsible for:
//!
//! ### Expression Evaluation
//! - **Arithmetic**: `+ - * /` over numbers, `+` over strings, with type
//!   checking and a division-by-zero check
//! - **Comparison and Equality**: boolean results; equality is strict per
//!   value kind (functions, classes, and instances compare by identity)
//! - **Calls**: user functions with lexical closures, and classes as
//!   constructors producing instances
//!
//! ### Statement Execution
//! - **Variable Management**: declarations define in the innermost scope;
//!   assignments update the innermost existing binding and never create one
//! - **Control Flow**: `if`/`else` and `while` with truthiness (only `nil`
//!   and `false` are falsy)
//! - **Output**: `print` renders the canonical stringification of a value,
//!   followed by a newline, to the output sink
//!
//! ### Environment Model
//!
//! Environments form a shared chain (`Rc<RefCell<_>>`): each block and each
//! call pushes a fresh environment enclosing its parent and pops it on exit,
//! including when an error unwinds. Function values keep their defining
//! environment alive for as long as the function itself is reachable, and
//! they share it rather than copy it, so mutations of captured variables are
//! visible across calls and across closures.
//!
//! A class value would complete an ownership cycle if its methods held their
//! defining environment strongly (environment → class → method closure →
//! environment), so classes hold that environment through a non-owning
//! handle instead and upgrade it when a method actually runs.
//!
//! ## Error Handling
//!
//! Runtime errors (`UndefinedVariable`, `TypeMismatch`, `DivisionByZero`,
//! `ArityMismatch`, `NotCallable`) unwind to the caller of `interpret`; the
//! environment stack is restored on the way out.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::rc::{Rc, Weak};

use log::trace;

use crate::ast::{Expression, FunctionDecl, Program, Statement};
use crate::error::{Result, RillError};
use crate::lexer::{Token, TokenKind};

/// A runtime value.
#[derive(Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    Str(String),
    Function(Rc<FunctionValue>),
    Class(Rc<ClassValue>),
    Instance(Rc<InstanceValue>),
}

/// A user function: its declaration plus the environment captured at its
/// point of declaration. The closure is held strongly; it must stay alive
/// for as long as the function value is reachable.
pub struct FunctionValue {
    pub declaration: Rc<FunctionDecl>,
    pub closure: Rc<RefCell<Environment>>,
}

/// A class: its name, its methods by name, and a non-owning handle to the
/// environment it was declared in (see the module docs for why this edge
/// must not own).
pub struct ClassValue {
    pub name: String,
    pub methods: HashMap<String, Rc<FunctionDecl>>,
    closure: Weak<RefCell<Environment>>,
}

impl ClassValue {
    /// Arity of construction: the arity of `init` if present, else 0.
    pub fn arity(&self) -> usize {
        self.methods.get("init").map_or(0, |m| m.params.len())
    }
}

/// An instance: its class and its fields.
pub struct InstanceValue {
    pub class: Rc<ClassValue>,
    fields: RefCell<HashMap<String, Value>>,
}

impl InstanceValue {
    fn new(class: Rc<ClassValue>) -> Self {
        Self {
            class,
            fields: RefCell::new(HashMap::new()),
        }
    }
}

impl fmt::Debug for InstanceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceValue")
            .field("class", &self.class.name)
            .field("fields", &self.fields.borrow().keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Value {
    /// The kind of value, as diagnostics name it.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Function(_) => "function",
            Value::Class(_) => "class",
            Value::Instance(_) => "instance",
        }
    }

    /// Truthiness: everything is truthy except `nil` and `false`.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }
}

impl PartialEq for Value {
    /// Strict equality per kind; functions, classes, and instances compare
    /// by identity, and values of different kinds are never equal.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    /// The canonical stringification used by `print`.
    ///
    /// Numbers render in decimal with no trailing fractional zeros and no
    /// bare trailing point (`3.0` prints as `3`, `3.5` as `3.5`).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "{}", s),
            Value::Function(fun) => write!(f, "<fn {}>", fun.declaration.name),
            Value::Class(class) => write!(f, "<class {}>", class.name),
            Value::Instance(instance) => {
                write!(f, "<instance of <class {}>>", instance.class.name)
            }
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

/// Runtime environment: a name→value map plus an optional enclosing
/// environment, forming the chain that realizes lexical scope at runtime.
#[derive(Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enclosing(enclosing: Rc<RefCell<Environment>>) -> Self {
        Self {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Inserts or overwrites a binding in this environment.
    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// Looks a name up, innermost scope first.
    pub fn get(&self, name: &str) -> Result<Value> {
        if let Some(value) = self.values.get(name) {
            return Ok(value.clone());
        }
        match &self.enclosing {
            Some(parent) => parent.borrow().get(name),
            None => Err(RillError::UndefinedVariable(name.to_string())),
        }
    }

    /// Updates the innermost existing binding. Never creates one: assigning
    /// to an unbound name is an error.
    pub fn assign(&mut self, name: &str, value: Value) -> Result<()> {
        if let Some(slot) = self.values.get_mut(name) {
            *slot = value;
            return Ok(());
        }
        match &self.enclosing {
            Some(parent) => parent.borrow_mut().assign(name, value),
            None => Err(RillError::UndefinedVariable(name.to_string())),
        }
    }
}

/// The tree-walking evaluator.
///
/// Holds the current environment handle and the output sink, which is
/// borrowed for the duration of evaluation; `print` writes to it.
pub struct Interpreter<W: Write> {
    environment: Rc<RefCell<Environment>>,
    out: W,
}

impl<W: Write> Interpreter<W> {
    pub fn new(out: W) -> Self {
        Self {
            environment: Rc::new(RefCell::new(Environment::new())),
            out,
        }
    }

    /// Evaluates a whole program, top-level declaration by declaration.
    ///
    /// The first runtime error unwinds out of evaluation; the caller reports
    /// it.
    pub fn interpret(&mut self, program: &Program) -> Result<()> {
        for declaration in &program.declarations {
            self.execute_statement(declaration)?;
        }
        Ok(())
    }

    fn execute_statement(&mut self, statement: &Statement) -> Result<()> {
        match statement {
            Statement::Expression(expr) => {
                self.evaluate_expression(expr)?;
                Ok(())
            }
            Statement::Print(expr) => {
                let value = self.evaluate_expression(expr)?;
                writeln!(self.out, "{}", value)?;
                Ok(())
            }
            Statement::Var { name, initializer } => {
                let value = match initializer {
                    Some(init) => self.evaluate_expression(init)?,
                    None => Value::Nil,
                };
                self.environment.borrow_mut().define(&name.lexeme, value);
                Ok(())
            }
            Statement::Block(statements) => {
                let environment = Environment::with_enclosing(Rc::clone(&self.environment));
                self.execute_block(statements, environment)
            }
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate_expression(condition)?.is_truthy() {
                    self.execute_statement(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute_statement(else_branch)
                } else {
                    Ok(())
                }
            }
            Statement::While { condition, body } => {
                while self.evaluate_expression(condition)?.is_truthy() {
                    self.execute_statement(body)?;
                }
                Ok(())
            }
            Statement::Function(decl) => {
                let function = Value::Function(Rc::new(FunctionValue {
                    declaration: Rc::clone(decl),
                    closure: Rc::clone(&self.environment),
                }));
                self.environment.borrow_mut().define(&decl.name, function);
                Ok(())
            }
            Statement::Class { name, methods } => {
                // Forward declaration: the name is bound to nil first so the
                // class value's methods can resolve it by name once built.
                self.environment
                    .borrow_mut()
                    .define(&name.lexeme, Value::Nil);

                let mut method_map = HashMap::new();
                for method in methods {
                    method_map.insert(method.name.clone(), Rc::clone(method));
                }
                let class = Value::Class(Rc::new(ClassValue {
                    name: name.lexeme.clone(),
                    methods: method_map,
                    closure: Rc::downgrade(&self.environment),
                }));

                self.environment.borrow_mut().assign(&name.lexeme, class)
            }
        }
    }

    /// Runs statements inside the given environment, restoring the previous
    /// one afterwards, also when a statement raised.
    fn execute_block(&mut self, statements: &[Statement], environment: Environment) -> Result<()> {
        let previous = Rc::clone(&self.environment);
        self.environment = Rc::new(RefCell::new(environment));

        let result = statements
            .iter()
            .try_for_each(|statement| self.execute_statement(statement));

        self.environment = previous;
        result
    }

    fn evaluate_expression(&mut self, expression: &Expression) -> Result<Value> {
        match expression {
            Expression::Literal(token) => self.evaluate_literal(token),
            Expression::Variable(name) => self.environment.borrow().get(&name.lexeme),
            Expression::Assign { name, value } => {
                let value = self.evaluate_expression(value)?;
                self.environment
                    .borrow_mut()
                    .assign(&name.lexeme, value.clone())?;
                Ok(value)
            }
            Expression::Binary {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate_expression(left)?;
                let right = self.evaluate_expression(right)?;
                self.evaluate_binary(left, operator, right)
            }
            Expression::Call {
                callee,
                paren,
                arguments,
            } => {
                trace!("evaluating call at line {}", paren.line);

                let callee = self.evaluate_expression(callee)?;
                let mut args = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    args.push(self.evaluate_expression(argument)?);
                }

                match callee {
                    Value::Function(function) => self.call_function(&function, args),
                    Value::Class(class) => self.instantiate_class(&class, args),
                    other => Err(RillError::NotCallable(other.type_name().to_string())),
                }
            }
        }
    }

    fn evaluate_literal(&self, token: &Token) -> Result<Value> {
        match token.kind {
            TokenKind::Number => {
                let number = token.lexeme.parse::<f64>().map_err(|_| {
                    RillError::Runtime(format!("invalid number literal '{}'", token.lexeme))
                })?;
                Ok(Value::Number(number))
            }
            TokenKind::String => Ok(Value::Str(token.lexeme.clone())),
            _ => Ok(Value::Nil),
        }
    }

    fn evaluate_binary(&self, left: Value, operator: &Token, right: Value) -> Result<Value> {
        match operator.kind {
            TokenKind::Plus => match (left, right) {
                (Value::Number(l), Value::Number(r)) => Ok(Value::Number(l + r)),
                (Value::Str(l), Value::Str(r)) => Ok(Value::Str(l + &r)),
                (l, r) => Err(RillError::TypeMismatch(format!(
                    "cannot add {} and {}",
                    l.type_name(),
                    r.type_name()
                ))),
            },
            TokenKind::Minus => {
                let (l, r) = Self::numeric_operands(left, right, "-")?;
                Ok(Value::Number(l - r))
            }
            TokenKind::Star => {
                let (l, r) = Self::numeric_operands(left, right, "*")?;
                Ok(Value::Number(l * r))
            }
            TokenKind::Slash => {
                let (l, r) = Self::numeric_operands(left, right, "/")?;
                if r == 0.0 {
                    return Err(RillError::DivisionByZero);
                }
                Ok(Value::Number(l / r))
            }
            TokenKind::EqualEqual => Ok(Value::Bool(left == right)),
            TokenKind::BangEqual => Ok(Value::Bool(left != right)),
            TokenKind::Less => {
                let (l, r) = Self::numeric_operands(left, right, "<")?;
                Ok(Value::Bool(l < r))
            }
            TokenKind::LessEqual => {
                let (l, r) = Self::numeric_operands(left, right, "<=")?;
                Ok(Value::Bool(l <= r))
            }
            TokenKind::Greater => {
                let (l, r) = Self::numeric_operands(left, right, ">")?;
                Ok(Value::Bool(l > r))
            }
            TokenKind::GreaterEqual => {
                let (l, r) = Self::numeric_operands(left, right, ">=")?;
                Ok(Value::Bool(l >= r))
            }
            _ => Err(RillError::Runtime(format!(
                "unsupported operator '{}'",
                operator.lexeme
            ))),
        }
    }

    /// Both operands must be numbers for the given operator.
    fn numeric_operands(left: Value, right: Value, operator: &str) -> Result<(f64, f64)> {
        match (left, right) {
            (Value::Number(l), Value::Number(r)) => Ok((l, r)),
            (l, r) => Err(RillError::TypeMismatch(format!(
                "operator '{}' expects numbers, got {} and {}",
                operator,
                l.type_name(),
                r.type_name()
            ))),
        }
    }

    /// Calls a user function: arity check, fresh environment enclosing the
    /// captured closure, positional parameter binding, body execution. Calls
    /// produce nil; there is no explicit return.
    fn call_function(&mut self, function: &FunctionValue, arguments: Vec<Value>) -> Result<Value> {
        let declaration = &function.declaration;
        if arguments.len() != declaration.params.len() {
            return Err(RillError::ArityMismatch {
                expected: declaration.params.len(),
                found: arguments.len(),
            });
        }

        trace!(
            "calling <fn {}> with {} argument(s)",
            declaration.name,
            arguments.len()
        );

        self.execute_callable(declaration, Rc::clone(&function.closure), arguments)
    }

    /// Instantiates a class: arity check against `init`, fresh instance,
    /// `init` invoked for its side effects when present.
    fn instantiate_class(&mut self, class: &Rc<ClassValue>, arguments: Vec<Value>) -> Result<Value> {
        if arguments.len() != class.arity() {
            return Err(RillError::ArityMismatch {
                expected: class.arity(),
                found: arguments.len(),
            });
        }

        let instance = Value::Instance(Rc::new(InstanceValue::new(Rc::clone(class))));

        if let Some(init) = class.methods.get("init") {
            let closure = class.closure.upgrade().ok_or_else(|| {
                RillError::Runtime(format!("class '{}' outlived its defining scope", class.name))
            })?;
            self.execute_callable(init, closure, arguments)?;
        }

        Ok(instance)
    }

    /// Shared tail of function calls and `init` invocations: binds the
    /// parameters in a fresh environment enclosing the closure and runs the
    /// body. The environment stack unwinds to the caller's environment
    /// unconditionally, including on error.
    fn execute_callable(
        &mut self,
        declaration: &Rc<FunctionDecl>,
        closure: Rc<RefCell<Environment>>,
        arguments: Vec<Value>,
    ) -> Result<Value> {
        let mut environment = Environment::with_enclosing(closure);
        for (param, argument) in declaration.params.iter().zip(arguments) {
            environment.define(&param.lexeme, argument);
        }

        self.execute_block(&declaration.body, environment)?;
        Ok(Value::Nil)
    }
}
