//! Tree-walking interpreter: scope stack, calling convention, built-in
//! dispatch, subproject isolation.
//!
//! Evaluation is single-threaded and cooperative:
//! `eval_expr`/`eval_statement`/`eval_block` are written as ordinary
//! methods returning a boxed future rather than `async fn` because
//! they're mutually recursive (a binary expression evaluates its own
//! operands, `subproject()` re-enters the whole statement evaluator);
//! `async fn`'s compiler-generated state machine can't be recursive
//! without this indirection. Only the handful of builtins that touch a
//! real suspension point (dependency resolution, `configure_file`'s
//! file read) actually await anything — the rest of the chain is
//! synchronous work wrapped in an already-ready future.

pub mod argschema;
pub mod builtins;
pub mod scope;
pub mod types;

pub use types::{Flow, InterpreterError};

use crate::ast::{
    Arg, AugmentedOp, Expr, ForeachVars, Identifier, LiteralValue, Position, Program, Statement, StringPart,
};
use crate::environment::{Environment, MachineKind};
use crate::graph::BuildObjectGraph;
use crate::options::OptionStore;
use crate::resolver::Resolver;
use crate::value::Value;
use indexmap::IndexMap;
use scope::Scope;
use std::future::Future;
use std::pin::Pin;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Everything a full interpretation pass threads through: scopes keyed
/// by subproject nesting, the graph being built, the option store, the
/// environment (machine + compiler) model, and the dependency
/// resolver. `languages` tracks what's been declared via `project()`/
/// `add_languages()` so compiler discovery only ever runs for what the
/// project actually asked for.
pub struct Interpreter {
    scopes: Vec<Scope>,
    pub graph: BuildObjectGraph,
    pub options: OptionStore,
    pub environment: Environment,
    pub resolver: Resolver,
    pub languages: Vec<String>,
    pub warnings: Vec<String>,
    pub source_root: std::path::PathBuf,
    current_subproject: String,
    subproject_stack: Vec<String>,
    entered_subprojects: IndexMap<String, bool>,
    /// Captured top-level scope of every subproject that finished
    /// evaluating successfully, keyed by subproject name, for
    /// `subproject(...).get_variable(...)` and fallback dependency
    /// lookups.
    subproject_exports: IndexMap<String, IndexMap<String, Value>>,
}

impl Interpreter {
    pub fn new(options: OptionStore, environment: Environment, source_root: impl Into<std::path::PathBuf>) -> Self {
        Self {
            scopes: vec![Scope::new()],
            graph: BuildObjectGraph::default(),
            options,
            environment,
            resolver: Resolver::new(),
            languages: Vec::new(),
            warnings: Vec::new(),
            source_root: source_root.into(),
            current_subproject: String::new(),
            subproject_stack: Vec::new(),
            entered_subprojects: IndexMap::new(),
            subproject_exports: IndexMap::new(),
        }
    }

    fn scope(&self) -> &Scope {
        self.scopes.last().expect("at least one scope")
    }

    fn scope_mut(&mut self) -> &mut Scope {
        self.scopes.last_mut().expect("at least one scope")
    }

    pub fn current_subproject(&self) -> &str {
        &self.current_subproject
    }

    /// Top-level entry point: interpret a whole program. If its first
    /// statement is `project(...)`, languages named there are
    /// discovered up front (real meson behavior: compiler discovery
    /// happens once, at the very start of `project()`, not lazily on
    /// first use).
    pub async fn run(&mut self, program: &Program) -> Result<(), InterpreterError> {
        if let Some(Statement::Expr(stmt)) = program.statements.first() {
            if let Expr::FunctionCall(call) = &stmt.expr {
                if call.name == "project" {
                    let langs = self.extract_project_languages(call)?;
                    self.discover_languages(&langs).await?;
                }
            }
        }
        self.eval_block(&program.statements).await?;
        Ok(())
    }

    /// `project(name, lang1, lang2, ..., version: ..., default_options: ...)`
    /// — every positional argument after the first (the project name)
    /// names a language.
    fn extract_project_languages(&self, call: &crate::ast::FunctionCallExpr) -> Result<Vec<String>, InterpreterError> {
        let mut positionals = call.args.iter().filter_map(|arg| match arg {
            Arg::Positional(Expr::Literal(lit)) => match &lit.value {
                LiteralValue::Str(parts) => match parts.as_slice() {
                    [StringPart::Literal(s)] => Some(s.clone()),
                    _ => None,
                },
                _ => None,
            },
            _ => None,
        });
        positionals.next(); // project name
        Ok(positionals.collect())
    }

    async fn discover_languages(&mut self, langs: &[String]) -> Result<(), InterpreterError> {
        let path_dirs: Vec<String> = std::env::var("PATH").unwrap_or_default().split(':').map(|s| s.to_string()).collect();
        for lang in langs {
            if self.languages.contains(lang) {
                continue;
            }
            let candidates = candidate_compilers(lang);
            if candidates.is_empty() {
                self.languages.push(lang.clone());
                continue;
            }
            match self.environment.discover_compiler(MachineKind::Host, lang, &candidates, &path_dirs).await {
                Ok(_) => {}
                Err(e) => self.warnings.push(format!("compiler discovery for '{lang}' failed: {e}")),
            }
            self.languages.push(lang.clone());
        }
        Ok(())
    }

    fn eval_block<'a>(&'a mut self, statements: &'a [Statement]) -> BoxFuture<'a, Result<Flow, InterpreterError>> {
        Box::pin(async move {
            for statement in statements {
                let flow = self.eval_statement(statement).await?;
                if flow != Flow::Normal {
                    return Ok(flow);
                }
            }
            Ok(Flow::Normal)
        })
    }

    fn eval_statement<'a>(&'a mut self, statement: &'a Statement) -> BoxFuture<'a, Result<Flow, InterpreterError>> {
        Box::pin(async move {
            match statement {
                Statement::Empty(_) => Ok(Flow::Normal),
                Statement::Expr(stmt) => {
                    self.eval_expr(&stmt.expr).await?;
                    Ok(Flow::Normal)
                }
                Statement::Assignment(stmt) => {
                    let value = self.eval_expr(&stmt.value).await?;
                    self.scope_mut().set(stmt.target.name.clone(), value);
                    Ok(Flow::Normal)
                }
                Statement::AugmentedAssignment(stmt) => {
                    let rhs = self.eval_expr(&stmt.value).await?;
                    let current = self
                        .scope()
                        .get(&stmt.target.name)
                        .cloned()
                        .ok_or_else(|| InterpreterError::UnknownVariable { name: stmt.target.name.clone(), pos: stmt.span.start })?;
                    if current.is_disabler() || rhs.is_disabler() {
                        self.scope_mut().set(stmt.target.name.clone(), Value::Disabler);
                        return Ok(Flow::Normal);
                    }
                    let AugmentedOp::Add = stmt.op;
                    let combined = current.checked_add(&rhs).ok_or_else(|| InterpreterError::BadOperandTypes {
                        op: "+=".to_string(),
                        left: current.type_name().to_string(),
                        right: rhs.type_name().to_string(),
                        pos: stmt.span.start,
                    })?;
                    self.scope_mut().set(stmt.target.name.clone(), combined);
                    Ok(Flow::Normal)
                }
                Statement::If(stmt) => {
                    for clause in &stmt.clauses {
                        let cond = self.eval_expr(&clause.condition).await?;
                        if cond.is_disabler() {
                            return Ok(Flow::Normal);
                        }
                        match cond.as_bool() {
                            Some(true) => return self.eval_block(&clause.body).await,
                            Some(false) => continue,
                            None => {
                                return Err(InterpreterError::NonBooleanCondition {
                                    got: cond.type_name().to_string(),
                                    pos: clause.condition.span().start,
                                })
                            }
                        }
                    }
                    if let Some(else_body) = &stmt.else_body {
                        return self.eval_block(else_body).await;
                    }
                    Ok(Flow::Normal)
                }
                Statement::Foreach(stmt) => {
                    let iterable = self.eval_expr(&stmt.iterable).await?;
                    if iterable.is_disabler() {
                        return Ok(Flow::Normal);
                    }
                    match (&stmt.vars, &iterable) {
                        (ForeachVars::One(var), Value::List(items)) => {
                            for item in items.clone() {
                                self.scope_mut().set(var.clone(), item);
                                match self.eval_block(&stmt.body).await? {
                                    Flow::Break => break,
                                    Flow::Continue | Flow::Normal => {}
                                }
                            }
                        }
                        (ForeachVars::Two(kvar, vvar), Value::Dict(entries)) => {
                            for (k, v) in entries.clone() {
                                self.scope_mut().set(kvar.clone(), Value::Str(k));
                                self.scope_mut().set(vvar.clone(), v);
                                match self.eval_block(&stmt.body).await? {
                                    Flow::Break => break,
                                    Flow::Continue | Flow::Normal => {}
                                }
                            }
                        }
                        _ => {
                            return Err(InterpreterError::BadOperandTypes {
                                op: "foreach".to_string(),
                                left: iterable.type_name().to_string(),
                                right: String::new(),
                                pos: stmt.span.start,
                            })
                        }
                    }
                    Ok(Flow::Normal)
                }
                Statement::Continue(span) => {
                    let _ = span;
                    Ok(Flow::Continue)
                }
                Statement::Break(span) => {
                    let _ = span;
                    Ok(Flow::Break)
                }
            }
        })
    }

    fn eval_expr<'a>(&'a mut self, expr: &'a Expr) -> BoxFuture<'a, Result<Value, InterpreterError>> {
        Box::pin(async move {
            match expr {
                Expr::Literal(lit) => Ok(self.eval_literal(&lit.value)),
                Expr::Identifier(ident) => self
                    .scope()
                    .get(&ident.name)
                    .cloned()
                    .ok_or_else(|| InterpreterError::UnknownVariable { name: ident.name.clone(), pos: ident.span.start }),
                Expr::Unary(u) => {
                    let operand = self.eval_expr(&u.operand).await?;
                    if operand.is_disabler() {
                        return Ok(Value::Disabler);
                    }
                    use crate::ast::UnaryOp;
                    match (u.op, &operand) {
                        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
                        (UnaryOp::Neg, Value::Int(n)) => Ok(Value::Int(-n)),
                        _ => Err(InterpreterError::BadOperandTypes {
                            op: format!("{:?}", u.op),
                            left: operand.type_name().to_string(),
                            right: String::new(),
                            pos: u.span.start,
                        }),
                    }
                }
                Expr::Binary(b) => self.eval_binary(b).await,
                Expr::Ternary(t) => {
                    let cond = self.eval_expr(&t.condition).await?;
                    if cond.is_disabler() {
                        return Ok(Value::Disabler);
                    }
                    match cond.as_bool() {
                        Some(true) => self.eval_expr(&t.consequent).await,
                        Some(false) => self.eval_expr(&t.alternate).await,
                        None => Err(InterpreterError::NonBooleanCondition { got: cond.type_name().to_string(), pos: t.span.start }),
                    }
                }
                Expr::Index(idx) => {
                    let object = self.eval_expr(&idx.object).await?;
                    let index = self.eval_expr(&idx.index).await?;
                    if object.is_disabler() || index.is_disabler() {
                        return Ok(Value::Disabler);
                    }
                    self.eval_index(&object, &index, idx.span.start)
                }
                Expr::ArrayLiteral(arr) => {
                    let mut items = Vec::with_capacity(arr.items.len());
                    for item in &arr.items {
                        let v = self.eval_expr(item).await?;
                        if v.is_disabler() {
                            return Ok(Value::Disabler);
                        }
                        items.push(v);
                    }
                    Ok(Value::List(items))
                }
                Expr::DictLiteral(dict) => {
                    let mut entries = IndexMap::new();
                    for (key, value_expr) in &dict.entries {
                        let v = self.eval_expr(value_expr).await?;
                        if v.is_disabler() {
                            return Ok(Value::Disabler);
                        }
                        entries.insert(key.clone(), v);
                    }
                    Ok(Value::Dict(entries))
                }
                Expr::MethodCall(call) => self.eval_method_call(call).await,
                Expr::FunctionCall(call) => self.eval_function_call(call).await,
            }
        })
    }

    fn eval_literal(&self, value: &LiteralValue) -> Value {
        match value {
            LiteralValue::Bool(b) => Value::Bool(*b),
            LiteralValue::Int(n) => Value::Int(*n),
            LiteralValue::Str(parts) => {
                let mut out = String::new();
                for part in parts {
                    match part {
                        StringPart::Literal(s) => out.push_str(s),
                        StringPart::Placeholder(name) => {
                            if let Some(v) = self.scope().get(name) {
                                out.push_str(&v.to_string());
                            }
                        }
                    }
                }
                Value::Str(out)
            }
        }
    }

    async fn eval_binary(&mut self, b: &crate::ast::BinaryExpr) -> Result<Value, InterpreterError> {
        use crate::ast::BinaryOp;

        // `and`/`or` short-circuit and must not evaluate the right
        // operand when the left side already determines the result.
        if b.op == BinaryOp::And || b.op == BinaryOp::Or {
            let left = self.eval_expr(&b.left).await?;
            if left.is_disabler() {
                return Ok(Value::Disabler);
            }
            let left_bool = left
                .as_bool()
                .ok_or_else(|| InterpreterError::NonBooleanCondition { got: left.type_name().to_string(), pos: b.span.start })?;
            if b.op == BinaryOp::And && !left_bool {
                return Ok(Value::Bool(false));
            }
            if b.op == BinaryOp::Or && left_bool {
                return Ok(Value::Bool(true));
            }
            let right = self.eval_expr(&b.right).await?;
            if right.is_disabler() {
                return Ok(Value::Disabler);
            }
            let right_bool = right
                .as_bool()
                .ok_or_else(|| InterpreterError::NonBooleanCondition { got: right.type_name().to_string(), pos: b.span.start })?;
            return Ok(Value::Bool(right_bool));
        }

        let left = self.eval_expr(&b.left).await?;
        let right = self.eval_expr(&b.right).await?;
        if left.is_disabler() || right.is_disabler() {
            return Ok(Value::Disabler);
        }

        let bad = |op: &str| InterpreterError::BadOperandTypes {
            op: op.to_string(),
            left: left.type_name().to_string(),
            right: right.type_name().to_string(),
            pos: b.span.start,
        };

        match b.op {
            BinaryOp::Add => left.checked_add(&right).ok_or_else(|| bad("+")),
            BinaryOp::Sub => match (&left, &right) {
                (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a - b)),
                _ => Err(bad("-")),
            },
            BinaryOp::Mul => match (&left, &right) {
                (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a * b)),
                _ => Err(bad("*")),
            },
            BinaryOp::Div => match (&left, &right) {
                (Value::Int(a), Value::Int(b)) if *b != 0 => Ok(Value::Int(a / b)),
                (Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{a}/{b}"))),
                _ => Err(bad("/")),
            },
            BinaryOp::Mod => match (&left, &right) {
                (Value::Int(a), Value::Int(b)) if *b != 0 => Ok(Value::Int(a % b)),
                _ => Err(bad("%")),
            },
            BinaryOp::Eq => Ok(Value::Bool(left == right)),
            BinaryOp::Ne => Ok(Value::Bool(left != right)),
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                let (a, b2) = match (&left, &right) {
                    (Value::Int(a), Value::Int(b)) => (*a, *b),
                    _ => return Err(bad("comparison")),
                };
                Ok(Value::Bool(match b.op {
                    BinaryOp::Lt => a < b2,
                    BinaryOp::Le => a <= b2,
                    BinaryOp::Gt => a > b2,
                    BinaryOp::Ge => a >= b2,
                    _ => unreachable!(),
                }))
            }
            BinaryOp::In | BinaryOp::NotIn => {
                let found = match &right {
                    Value::List(items) => items.contains(&left),
                    Value::Dict(entries) => left.as_str().is_some_and(|k| entries.contains_key(k)),
                    Value::Str(s) => left.as_str().is_some_and(|needle| s.contains(needle)),
                    _ => return Err(bad("in")),
                };
                Ok(Value::Bool(if b.op == BinaryOp::In { found } else { !found }))
            }
            BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
        }
    }

    fn eval_index(&self, object: &Value, index: &Value, pos: Position) -> Result<Value, InterpreterError> {
        match (object, index) {
            (Value::List(items), Value::Int(i)) => {
                let idx = normalize_index(*i, items.len());
                items.get(idx).cloned().ok_or_else(|| InterpreterError::Value {
                    message: format!("list index {i} out of range"),
                    pos,
                })
            }
            (Value::Dict(entries), Value::Str(key)) => {
                entries.get(key.as_str()).cloned().ok_or_else(|| InterpreterError::Value { message: format!("no such key '{key}'"), pos })
            }
            _ => Err(InterpreterError::BadOperandTypes {
                op: "[]".to_string(),
                left: object.type_name().to_string(),
                right: index.type_name().to_string(),
                pos,
            }),
        }
    }

    async fn eval_method_call(&mut self, call: &crate::ast::MethodCallExpr) -> Result<Value, InterpreterError> {
        if let Expr::Identifier(Identifier { name, .. }) = &call.object {
            if name == "meson" {
                return self.eval_meson_module_call(call).await;
            }
        }

        let object = self.eval_expr(&call.object).await?;
        if object.is_disabler() {
            return Ok(Value::Disabler);
        }
        let (positional, named) = self.eval_args(&call.args).await?;
        if argschema::any_disabler(&positional, &named) {
            return Ok(Value::Disabler);
        }
        let holder = object.as_holder().ok_or_else(|| InterpreterError::UnknownMethod {
            method: call.method.clone(),
            type_name: object.type_name().to_string(),
            pos: call.span.start,
        })?;
        holder
            .call_method(&call.method, &positional, &named)
            .map_err(|e| InterpreterError::MethodError(e.to_string(), call.span.start))
    }

    async fn eval_function_call(&mut self, call: &crate::ast::FunctionCallExpr) -> Result<Value, InterpreterError> {
        let (positional, named) = self.eval_args(&call.args).await?;
        if argschema::any_disabler(&positional, &named) {
            return Ok(Value::Disabler);
        }
        self.call_builtin(&call.name, positional, named, call.span.start).await
    }

    async fn eval_args(&mut self, args: &[Arg]) -> Result<(Vec<Value>, IndexMap<String, Value>), InterpreterError> {
        let mut positional = Vec::new();
        let mut named = IndexMap::new();
        for arg in args {
            match arg {
                Arg::Positional(expr) => positional.push(self.eval_expr(expr).await?),
                Arg::Named(name, expr) => {
                    named.insert(name.clone(), self.eval_expr(expr).await?);
                }
            }
        }
        Ok((positional, named))
    }

    fn push_subproject_scope(&mut self, name: &str) {
        self.subproject_stack.push(self.current_subproject.clone());
        self.current_subproject = name.to_string();
        self.scopes.push(Scope::new());
    }

    fn pop_subproject_scope(&mut self) -> Scope {
        self.current_subproject = self.subproject_stack.pop().unwrap_or_default();
        self.scopes.pop().expect("pushed scope")
    }
}

fn normalize_index(i: i64, len: usize) -> usize {
    if i < 0 {
        (len as i64 + i).max(0) as usize
    } else {
        i as usize
    }
}

fn candidate_compilers(language: &str) -> Vec<&'static str> {
    match language {
        "c" => vec!["cc", "gcc", "clang"],
        "cpp" => vec!["c++", "g++", "clang++"],
        "rust" => vec!["rustc"],
        _ => Vec::new(),
    }
}
