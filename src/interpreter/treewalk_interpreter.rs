use std::collections::HashMap;
use std::rc::Rc;

use itertools::Itertools;
use tracing::{debug, trace};

use super::util;
use crate::builtins;
use crate::config::Config;
use crate::error::RuntimeError;
use crate::expr::{
    BinaryOp, BinaryOpTy, ClassDecl, Expr, ExprId, LogicalOp, Stmt, Symbol, Token, UnaryOp,
    UnaryOpTy,
};
use crate::gc::{Heap, HeapId};
use crate::stack::ensure_sufficient_stack;
use crate::value::{
    Call, Callable, Class, Environment, Function, Instance, NativeFn, NativeFunction, Value,
};

/// Outcome of executing a statement. `Return` travels up to the nearest
/// function call, which turns it into the call's result.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Normal,
    Return(Value),
}

pub struct Interpreter {
    pub heap: Heap,
    pub globals: HeapId,
    pub env: HeapId,
    pub backtrace: Vec<(usize, String)>,
    locals: HashMap<ExprId, usize>,
    output: Vec<String>,
    config: Config,
}

impl Default for Interpreter {
    fn default() -> Interpreter {
        Interpreter::with_config(Config::default())
    }
}

impl Interpreter {
    pub fn new() -> Interpreter {
        Interpreter::default()
    }

    pub fn with_config(config: Config) -> Interpreter {
        let mut heap = Heap::new(config.gc_trigger);
        let globals = heap.manage_env(Environment::default());
        let mut interp = Interpreter {
            heap,
            globals,
            env: globals,
            backtrace: vec![(0, "script".to_string())],
            locals: HashMap::new(),
            output: Vec::new(),
            config,
        };
        interp.define_native("clock", 0, builtins::clock);
        debug!(config = ?interp.config, "created interpreter");
        interp
    }

    /// Binds a host function in the global frame.
    pub fn define_native(&mut self, name: &str, arity: usize, callable: NativeFn) {
        let native = NativeFunction {
            name: name.to_string(),
            arity,
            callable,
        };
        self.heap
            .define(self.globals, name, Value::Callable(Callable::Native(native)));
    }

    /// Records the lexical distance the resolver computed for a variable use.
    /// Uses without an entry are looked up in the global frame.
    pub fn resolve(&mut self, id: ExprId, depth: usize) {
        self.locals.insert(id, depth);
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Lines printed so far when `capture_output` is set.
    pub fn output(&self) -> &[String] {
        &self.output
    }

    #[tracing::instrument(level = "debug", skip_all, fields(statements = stmts.len()))]
    pub fn interpret(&mut self, stmts: &[Stmt]) -> Result<(), RuntimeError> {
        self.backtrace.truncate(1);
        self.env = self.globals;

        for stmt in stmts {
            let flow = match self.execute(stmt) {
                Ok(flow) => flow,
                Err(err) => {
                    debug!(error = %err, "aborting run");
                    return Err(err);
                }
            };
            if self.heap.should_collect() {
                self.collect_garbage();
            }
            if let Flow::Return(_) = flow {
                debug!("return at top level ends the script");
                break;
            }
        }

        Ok(())
    }

    /// Frees every heap value not reachable from the global frame or the
    /// current environment. Only safe between top-level statements.
    pub fn collect_garbage(&mut self) {
        let roots = [self.globals, self.env];
        self.heap.collect(&roots);
    }

    pub fn execute(&mut self, stmt: &Stmt) -> Result<Flow, RuntimeError> {
        ensure_sufficient_stack(|| self.execute_inner(stmt))
    }

    fn execute_inner(&mut self, stmt: &Stmt) -> Result<Flow, RuntimeError> {
        match stmt {
            Stmt::Expr(e) => {
                self.interpret_expr(e)?;
                Ok(Flow::Normal)
            }
            Stmt::Print(e) => {
                let val = self.interpret_expr(e)?;
                let text = self.format_val(&val);
                self.print(text);
                Ok(Flow::Normal)
            }
            Stmt::VarDecl(name, maybe_expr) => {
                let val = match maybe_expr {
                    Some(expr) => self.interpret_expr(expr)?,
                    None => Value::Nil,
                };
                self.heap.define(self.env, &name.lexeme, val);
                Ok(Flow::Normal)
            }
            Stmt::FunDecl(decl) => {
                let function_id = self.heap.manage_function(Function {
                    decl: Rc::clone(decl),
                    closure: self.env,
                    is_initializer: false,
                });
                debug!(name = %decl.name.lexeme, "declared function");
                self.heap.define(
                    self.env,
                    &decl.name.lexeme,
                    Value::Callable(Callable::Function(function_id)),
                );
                Ok(Flow::Normal)
            }
            Stmt::ClassDecl(class_decl) => {
                self.declare_class(class_decl);
                Ok(Flow::Normal)
            }
            Stmt::If(cond, if_true, maybe_if_false) => {
                if self.interpret_expr(cond)?.is_truthy() {
                    self.execute(if_true)
                } else if let Some(if_false) = maybe_if_false {
                    self.execute(if_false)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::Block(stmts) => {
                let env = self.heap.manage_env(Environment::with_enclosing(self.env));
                self.execute_block(stmts, env)
            }
            Stmt::While(cond, body) => {
                while self.interpret_expr(cond)?.is_truthy() {
                    if let Flow::Return(val) = self.execute(body)? {
                        return Ok(Flow::Return(val));
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::Return(_, maybe_res) => {
                let val = match maybe_res {
                    Some(res) => self.interpret_expr(res)?,
                    None => Value::Nil,
                };
                Ok(Flow::Return(val))
            }
        }
    }

    /// Runs `stmts` with `env` as the current environment. The previous
    /// environment is restored however the block exits.
    pub fn execute_block(&mut self, stmts: &[Stmt], env: HeapId) -> Result<Flow, RuntimeError> {
        let previous = std::mem::replace(&mut self.env, env);
        trace!(env, previous, "entering scope");
        let result = self.execute_stmts(stmts);
        self.env = previous;
        result
    }

    fn execute_stmts(&mut self, stmts: &[Stmt]) -> Result<Flow, RuntimeError> {
        for stmt in stmts {
            if let Flow::Return(val) = self.execute(stmt)? {
                return Ok(Flow::Return(val));
            }
        }
        Ok(Flow::Normal)
    }

    fn declare_class(&mut self, class_decl: &ClassDecl) {
        let mut methods = HashMap::new();
        for method in class_decl.methods.iter() {
            let function_id = self.heap.manage_function(Function {
                decl: Rc::clone(method),
                closure: self.env,
                is_initializer: method.name.lexeme == "init",
            });
            methods.insert(method.name.lexeme.clone(), function_id);
        }

        let class_id = self.heap.manage_class(Class {
            name: class_decl.name.lexeme.clone(),
            methods,
        });
        debug!(name = %class_decl.name.lexeme, "declared class");
        self.heap.define(
            self.env,
            &class_decl.name.lexeme,
            Value::Callable(Callable::Class(class_id)),
        );
    }

    pub fn interpret_expr(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        ensure_sufficient_stack(|| self.interpret_expr_inner(expr))
    }

    fn interpret_expr_inner(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Literal(lit) => Ok(Value::from(lit)),
            Expr::Grouping(e) => self.interpret_expr(e),
            Expr::This(sym) | Expr::Variable(sym) => self.lookup_variable(sym),
            Expr::Assign(sym, val_expr) => {
                let val = self.interpret_expr(val_expr)?;
                match self.locals.get(&sym.id).copied() {
                    Some(distance) => {
                        self.heap
                            .assign_at(self.env, distance, &sym.name, val.clone())?
                    }
                    None => self.heap.assign(self.globals, &sym.name, val.clone())?,
                }
                Ok(val)
            }
            Expr::Logical(left_expr, LogicalOp::Or, right_expr) => {
                let left = self.interpret_expr(left_expr)?;
                if left.is_truthy() {
                    Ok(left)
                } else {
                    self.interpret_expr(right_expr)
                }
            }
            Expr::Logical(left_expr, LogicalOp::And, right_expr) => {
                let left = self.interpret_expr(left_expr)?;
                if !left.is_truthy() {
                    Ok(left)
                } else {
                    self.interpret_expr(right_expr)
                }
            }
            Expr::Unary(op, e) => self.interpret_unary(op, e),
            Expr::Binary(lhs, op, rhs) => self.interpret_binary(lhs, op, rhs),
            Expr::Call(callee, paren, args) => self.interpret_call(callee, paren, args),
            Expr::Get(lhs, attr) => match self.interpret_expr(lhs)? {
                Value::Instance(instance_id) => Instance::getattr(&mut self.heap, instance_id, attr),
                _ => Err(RuntimeError::type_error(
                    attr,
                    "Only instances have properties.",
                )),
            },
            Expr::Set(lhs, attr, rhs) => match self.interpret_expr(lhs)? {
                Value::Instance(instance_id) => {
                    let val = self.interpret_expr(rhs)?;
                    Instance::setattr(&mut self.heap, instance_id, attr, val.clone());
                    Ok(val)
                }
                _ => Err(RuntimeError::type_error(attr, "Only instances have fields.")),
            },
        }
    }

    fn lookup_variable(&self, sym: &Symbol) -> Result<Value, RuntimeError> {
        match self.locals.get(&sym.id) {
            Some(distance) => self.heap.get_at(self.env, *distance, &sym.name),
            None => self.heap.get(self.globals, &sym.name),
        }
    }

    fn interpret_unary(&mut self, op: &UnaryOp, e: &Expr) -> Result<Value, RuntimeError> {
        let val = self.interpret_expr(e)?;

        match op.ty {
            UnaryOpTy::Minus => Ok(Value::Number(-util::check_number_operand(&op.token, &val)?)),
            UnaryOpTy::Bang => Ok(Value::Bool(!val.is_truthy())),
        }
    }

    fn interpret_binary(
        &mut self,
        lhs: &Expr,
        op: &BinaryOp,
        rhs: &Expr,
    ) -> Result<Value, RuntimeError> {
        let left = self.interpret_expr(lhs)?;
        let right = self.interpret_expr(rhs)?;

        match op.ty {
            BinaryOpTy::EqualEqual => Ok(Value::Bool(left == right)),
            BinaryOpTy::NotEqual => Ok(Value::Bool(left != right)),
            BinaryOpTy::Plus => match (left, right) {
                (Value::Number(l), Value::Number(r)) => Ok(Value::Number(l + r)),
                (Value::String(l), Value::String(r)) => Ok(Value::String(l + &r)),
                _ => Err(RuntimeError::type_error(
                    &op.token,
                    "Operands must be two numbers or two strings.",
                )),
            },
            BinaryOpTy::Less => {
                let (l, r) = util::check_number_operands(&op.token, &left, &right)?;
                Ok(Value::Bool(l < r))
            }
            BinaryOpTy::LessEqual => {
                let (l, r) = util::check_number_operands(&op.token, &left, &right)?;
                Ok(Value::Bool(l <= r))
            }
            BinaryOpTy::Greater => {
                let (l, r) = util::check_number_operands(&op.token, &left, &right)?;
                Ok(Value::Bool(l > r))
            }
            BinaryOpTy::GreaterEqual => {
                let (l, r) = util::check_number_operands(&op.token, &left, &right)?;
                Ok(Value::Bool(l >= r))
            }
            BinaryOpTy::Minus => {
                let (l, r) = util::check_number_operands(&op.token, &left, &right)?;
                Ok(Value::Number(l - r))
            }
            BinaryOpTy::Star => {
                let (l, r) = util::check_number_operands(&op.token, &left, &right)?;
                Ok(Value::Number(l * r))
            }
            BinaryOpTy::Slash => {
                let (l, r) = util::check_number_operands(&op.token, &left, &right)?;
                Ok(Value::Number(l / r))
            }
        }
    }

    fn interpret_call(
        &mut self,
        callee_expr: &Expr,
        paren: &Token,
        arg_exprs: &[Expr],
    ) -> Result<Value, RuntimeError> {
        let callee = self.interpret_expr(callee_expr)?;
        let args = arg_exprs
            .iter()
            .map(|arg| self.interpret_expr(arg))
            .collect::<Result<Vec<_>, _>>()?;

        let callable = match callee {
            Value::Callable(callable) => callable,
            _ => {
                return Err(RuntimeError::type_error(
                    paren,
                    "Can only call functions and classes.",
                ))
            }
        };

        let expected = callable.arity(self);
        if args.len() != expected {
            return Err(RuntimeError::Arity {
                token: paren.clone(),
                expected,
                found: args.len(),
            });
        }

        self.call_value(&callable, paren, &args)
    }

    fn call_value(
        &mut self,
        callable: &Callable,
        paren: &Token,
        args: &[Value],
    ) -> Result<Value, RuntimeError> {
        if self.backtrace.len() > self.config.max_call_depth {
            return Err(RuntimeError::StackOverflow {
                token: paren.clone(),
            });
        }

        let name = self.callable_name(callable);
        trace!(name = %name, line = paren.line, "call");
        // Frames stay on the backtrace when a fault unwinds through them so
        // the driver can report where the run died.
        self.backtrace.push((paren.line, name));
        let res = callable.call(self, args)?;
        self.backtrace.pop();
        Ok(res)
    }

    fn callable_name(&self, callable: &Callable) -> String {
        match callable {
            Callable::Native(native) => native.name.clone(),
            Callable::Function(id) => self.heap.get_function(*id).name().to_string(),
            Callable::Class(id) => self.heap.get_class(*id).name.clone(),
        }
    }

    pub fn format_val(&self, val: &Value) -> String {
        match val {
            Value::Number(n) => util::format_number(*n),
            Value::String(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::Nil => "nil".to_string(),
            Value::Callable(Callable::Native(_)) => "<native fn>".to_string(),
            Value::Callable(Callable::Function(id)) => {
                format!("<fn {}>", self.heap.get_function(*id).name())
            }
            Value::Callable(Callable::Class(id)) => self.heap.get_class(*id).name.clone(),
            Value::Instance(id) => {
                let instance = self.heap.get_instance(*id);
                format!("{} instance", self.heap.get_class(instance.class_id).name)
            }
        }
    }

    fn print(&mut self, text: String) {
        if self.config.capture_output {
            self.output.push(text);
        } else {
            println!("{}", text);
        }
    }

    pub fn format_backtrace(&self) -> String {
        let lines = self
            .backtrace
            .iter()
            .map(|(line, funname)| {
                if *line == 0 {
                    format!("in {}", funname)
                } else {
                    format!("[line {}] in {}", line, funname)
                }
            })
            .join("\n");
        format!("Backtrace (most recent call last):\n\n{}", lines)
    }
}
