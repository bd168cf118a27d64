//! Evaluator for parsed literals
//!
//! Runs an [`Expr`] in an isolated scope: the only names visible from the top
//! level are the globals `undefined`, `NaN`, `Infinity`, `Symbol`, `Number`,
//! `String` and `Boolean`. Parsed programs are cached by source text.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use tracing::trace;

use crate::ast::{BinaryOp, Expr, FunctionBody, LogicalOp, Stmt, UnaryOp};
use crate::error::RevalueError;
use crate::limits::ResourceLimits;
use crate::parser::parse_expression;
use crate::patterns::{JS_DECIMAL, JS_HEX};
use crate::value::{format_number, Function, Lambda, Native, Object, Symbol, Value};

/// Cached programs are dropped wholesale once the cache reaches this size
const CACHE_CAPACITY: usize = 512;

/// Sources longer than this (bytes) are parsed every time instead of cached
const MAX_CACHED_SOURCE_LEN: usize = 4 * 1024;

static DEFAULT_EVALUATOR: Lazy<Evaluator> = Lazy::new(Evaluator::new);

/// Shared evaluator with default limits, used by the coercion functions
pub fn default_evaluator() -> &'static Evaluator {
    &DEFAULT_EVALUATOR
}

/// Call `function` through the shared evaluator
pub fn call_function(function: &Function, args: &[Value]) -> Result<Value, RevalueError> {
    default_evaluator().call(function, args)
}

// ============================================================================
// SCOPE
// ============================================================================

/// Persistent chain of bindings. Closures capture it by cloning the head.
#[derive(Clone, Default)]
pub struct Scope(Option<Arc<Binding>>);

struct Binding {
    name: String,
    value: Value,
    next: Scope,
}

impl Scope {
    /// New scope with `name` bound on top of `self`
    pub fn bind(&self, name: impl Into<String>, value: Value) -> Scope {
        Scope(Some(Arc::new(Binding {
            name: name.into(),
            value,
            next: self.clone(),
        })))
    }

    /// Innermost binding for `name`
    pub fn lookup(&self, name: &str) -> Option<Value> {
        let mut current = self.0.as_ref();
        while let Some(binding) = current {
            if binding.name == name {
                return Some(binding.value.clone());
            }
            current = binding.next.0.as_ref();
        }
        None
    }

    fn names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        let mut current = self.0.as_ref();
        while let Some(binding) = current {
            names.push(binding.name.as_str());
            current = binding.next.0.as_ref();
        }
        names
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Scope").field(&self.names()).finish()
    }
}

fn global(name: &str) -> Option<Value> {
    let value = match name {
        "undefined" => Value::Undefined,
        "NaN" => Value::Number(f64::NAN),
        "Infinity" => Value::Number(f64::INFINITY),
        "Symbol" => Value::Function(Function::Native(Native::Symbol)),
        "Number" => Value::Function(Function::Native(Native::Number)),
        "String" => Value::Function(Function::Native(Native::String)),
        "Boolean" => Value::Function(Function::Native(Native::Boolean)),
        _ => return None,
    };
    Some(value)
}

// ============================================================================
// EVALUATOR
// ============================================================================

/// Parses and evaluates literal source under a set of [`ResourceLimits`]
pub struct Evaluator {
    limits: ResourceLimits,
    cache: DashMap<String, Arc<Expr>>,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluator {
    pub fn new() -> Self {
        Self::with_limits(ResourceLimits::default())
    }

    pub fn with_limits(limits: ResourceLimits) -> Self {
        Self {
            limits,
            cache: DashMap::new(),
        }
    }

    pub fn limits(&self) -> &ResourceLimits {
        &self.limits
    }

    /// Parse `source` (with caching)
    pub fn parse(&self, source: &str) -> Result<Arc<Expr>, RevalueError> {
        if let Some(cached) = self.cache.get(source) {
            return Ok(Arc::clone(&cached));
        }

        let expr = Arc::new(parse_expression(source, &self.limits)?);
        if source.len() > MAX_CACHED_SOURCE_LEN {
            return Ok(expr);
        }
        if self.cache.len() >= CACHE_CAPACITY {
            trace!(capacity = CACHE_CAPACITY, "program cache full, clearing");
            self.cache.clear();
        }
        self.cache.insert(source.to_string(), Arc::clone(&expr));
        Ok(expr)
    }

    /// Evaluate `source` as an expression in the isolated global scope
    pub fn eval_str(&self, source: &str) -> Result<Value, RevalueError> {
        let expr = self.parse(source)?;
        Interpreter::new(&self.limits).eval(&expr, &Scope::default())
    }

    /// Call a function value with positional arguments
    pub fn call(&self, function: &Function, args: &[Value]) -> Result<Value, RevalueError> {
        Interpreter::new(&self.limits).call_function(function, args)
    }

    pub fn cached_programs(&self) -> usize {
        self.cache.len()
    }
}

struct Interpreter<'l> {
    limits: &'l ResourceLimits,
    call_depth: usize,
}

impl<'l> Interpreter<'l> {
    fn new(limits: &'l ResourceLimits) -> Self {
        Self {
            limits,
            call_depth: 0,
        }
    }

    fn lookup(&self, name: &str, scope: &Scope) -> Result<Value, RevalueError> {
        scope
            .lookup(name)
            .or_else(|| global(name))
            .ok_or_else(|| RevalueError::Reference {
                name: name.to_string(),
            })
    }

    fn eval(&mut self, expr: &Expr, scope: &Scope) -> Result<Value, RevalueError> {
        match expr {
            Expr::Null => Ok(Value::Null),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Str(s) => Ok(Value::String(s.clone())),
            Expr::Ident(name) => self.lookup(name, scope),
            Expr::Array(items) => items
                .iter()
                .map(|item| self.eval(item, scope))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Expr::Object(entries) => {
                let mut object = Object::new();
                for (key, value) in entries {
                    object.insert(key.clone(), self.eval(value, scope)?);
                }
                Ok(Value::Object(object))
            }
            Expr::Function(def) => Ok(Value::Function(Function::Lambda(Arc::new(Lambda {
                def: Arc::clone(def),
                scope: scope.clone(),
            })))),
            Expr::Unary { op, operand } => self.unary(*op, operand, scope),
            Expr::Binary { op, left, right } => {
                let left = self.eval(left, scope)?;
                let right = self.eval(right, scope)?;
                binary(*op, &left, &right)
            }
            Expr::Logical { op, left, right } => {
                let left = self.eval(left, scope)?;
                let short_circuit = match op {
                    LogicalOp::And => !left.truthy(),
                    LogicalOp::Or => left.truthy(),
                    LogicalOp::Nullish => !matches!(left, Value::Null | Value::Undefined),
                };
                if short_circuit {
                    Ok(left)
                } else {
                    self.eval(right, scope)
                }
            }
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if self.eval(test, scope)?.truthy() {
                    self.eval(consequent, scope)
                } else {
                    self.eval(alternate, scope)
                }
            }
            Expr::Member { object, property } => {
                let object = self.eval(object, scope)?;
                let property = self.eval(property, scope)?;
                get_property(&object, &property)
            }
            Expr::Call { callee, args } => {
                let callee = self.eval(callee, scope)?;
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg, scope))
                    .collect::<Result<Vec<_>, _>>()?;
                match &callee {
                    Value::Function(function) => self.call_function(function, &args),
                    other => Err(RevalueError::type_error(format!(
                        "{} is not a function",
                        other
                    ))),
                }
            }
        }
    }

    fn unary(&mut self, op: UnaryOp, operand: &Expr, scope: &Scope) -> Result<Value, RevalueError> {
        if op == UnaryOp::TypeOf {
            // typeof on an undeclared name is "undefined", not a ReferenceError
            if let Expr::Ident(name) = operand {
                if scope.lookup(name).is_none() && global(name).is_none() {
                    return Ok(Value::from("undefined"));
                }
            }
        }

        let value = self.eval(operand, scope)?;
        Ok(match op {
            UnaryOp::Neg => Value::Number(-to_number(&value)?),
            UnaryOp::Plus => Value::Number(to_number(&value)?),
            UnaryOp::Not => Value::Bool(!value.truthy()),
            UnaryOp::TypeOf => Value::from(value.type_of()),
        })
    }

    fn call_function(&mut self, function: &Function, args: &[Value]) -> Result<Value, RevalueError> {
        match function {
            Function::Native(native) => call_native(*native, args),
            Function::Lambda(lambda) => {
                if self.call_depth >= self.limits.max_call_depth {
                    return Err(RevalueError::LimitExceeded {
                        what: "call depth",
                        limit: self.limits.max_call_depth,
                    });
                }
                self.call_depth += 1;
                let result = self.call_lambda(lambda, args);
                self.call_depth -= 1;
                result
            }
        }
    }

    fn call_lambda(&mut self, lambda: &Arc<Lambda>, args: &[Value]) -> Result<Value, RevalueError> {
        let mut scope = lambda.scope.clone();
        if let Some(name) = &lambda.def.name {
            scope = scope.bind(name.as_str(), Value::Function(Function::Lambda(Arc::clone(lambda))));
        }
        for (i, param) in lambda.def.params.iter().enumerate() {
            scope = scope.bind(param.as_str(), args.get(i).cloned().unwrap_or_default());
        }

        match &lambda.def.body {
            FunctionBody::Expr(expr) => self.eval(expr, &scope),
            FunctionBody::Block(stmts) => Ok(self.exec_block(stmts, scope)?.unwrap_or_default()),
        }
    }

    /// Returns `Some(value)` when a `return` statement ran
    fn exec_block(&mut self, stmts: &[Stmt], scope: Scope) -> Result<Option<Value>, RevalueError> {
        let mut scope = scope;
        for stmt in stmts {
            match stmt {
                Stmt::Let { name, init } => {
                    let value = match init {
                        Some(expr) => self.eval(expr, &scope)?,
                        None => Value::Undefined,
                    };
                    scope = scope.bind(name.as_str(), value);
                }
                Stmt::Return(expr) => {
                    let value = match expr {
                        Some(expr) => self.eval(expr, &scope)?,
                        None => Value::Undefined,
                    };
                    return Ok(Some(value));
                }
                Stmt::If {
                    test,
                    consequent,
                    alternate,
                } => {
                    let branch = if self.eval(test, &scope)?.truthy() {
                        Some(consequent)
                    } else {
                        alternate.as_ref()
                    };
                    if let Some(branch) = branch {
                        let returned =
                            self.exec_block(std::slice::from_ref(&**branch), scope.clone())?;
                        if returned.is_some() {
                            return Ok(returned);
                        }
                    }
                }
                Stmt::Block(inner) => {
                    let returned = self.exec_block(inner, scope.clone())?;
                    if returned.is_some() {
                        return Ok(returned);
                    }
                }
                Stmt::Expr(expr) => {
                    self.eval(expr, &scope)?;
                }
            }
        }
        Ok(None)
    }
}

// ============================================================================
// CONVERSIONS & OPERATORS
// ============================================================================

fn call_native(native: Native, args: &[Value]) -> Result<Value, RevalueError> {
    let first = args.first();
    Ok(match native {
        Native::Symbol => {
            let description = match first {
                None | Some(Value::Undefined) => None,
                Some(value) => Some(to_js_string(value)?),
            };
            Value::Symbol(Symbol::new(description.as_deref()))
        }
        Native::Number => Value::Number(match first {
            Some(value) => to_number(value)?,
            None => 0.0,
        }),
        Native::String => Value::String(match first {
            Some(Value::Symbol(sym)) => sym.to_string(),
            Some(value) => to_js_string(value)?,
            None => String::new(),
        }),
        Native::Boolean => Value::Bool(first.is_some_and(Value::truthy)),
    })
}

/// JS `ToString`
pub fn to_js_string(value: &Value) -> Result<String, RevalueError> {
    Ok(match value {
        Value::Undefined => "undefined".to_string(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => format_number(*n),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Undefined | Value::Null => Ok(String::new()),
                other => to_js_string(other),
            })
            .collect::<Result<Vec<_>, _>>()?
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
        Value::Function(function) => function.source(),
        Value::Symbol(_) => {
            return Err(RevalueError::type_error(
                "Cannot convert a Symbol value to a string",
            ))
        }
    })
}

/// JS `ToNumber`
pub fn to_number(value: &Value) -> Result<f64, RevalueError> {
    Ok(match value {
        Value::Undefined => f64::NAN,
        Value::Null => 0.0,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Number(n) => *n,
        Value::String(s) => string_to_number(s),
        Value::Symbol(_) => {
            return Err(RevalueError::type_error(
                "Cannot convert a Symbol value to a number",
            ))
        }
        other => string_to_number(&to_js_string(other)?),
    })
}

fn string_to_number(s: &str) -> f64 {
    let s = s.trim();
    if s.is_empty() {
        return 0.0;
    }
    match s {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    if JS_DECIMAL.is_match(s) {
        return s.parse().unwrap_or(f64::NAN);
    }
    if JS_HEX.is_match(s) {
        return s[2..]
            .chars()
            .filter_map(|c| c.to_digit(16))
            .fold(0.0, |acc, digit| acc * 16.0 + f64::from(digit));
    }
    f64::NAN
}

fn to_primitive(value: &Value) -> Result<Value, RevalueError> {
    Ok(match value {
        Value::Array(_) | Value::Object(_) | Value::Function(_) => {
            Value::String(to_js_string(value)?)
        }
        other => other.clone(),
    })
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, RevalueError> {
    let numeric = |f: fn(f64, f64) -> f64| -> Result<Value, RevalueError> {
        Ok(Value::Number(f(to_number(left)?, to_number(right)?)))
    };

    match op {
        BinaryOp::Add => {
            let left = to_primitive(left)?;
            let right = to_primitive(right)?;
            if matches!(left, Value::String(_)) || matches!(right, Value::String(_)) {
                Ok(Value::String(to_js_string(&left)? + &to_js_string(&right)?))
            } else {
                Ok(Value::Number(to_number(&left)? + to_number(&right)?))
            }
        }
        BinaryOp::Sub => numeric(|a, b| a - b),
        BinaryOp::Mul => numeric(|a, b| a * b),
        BinaryOp::Div => numeric(|a, b| a / b),
        BinaryOp::Rem => numeric(|a, b| a % b),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let left = to_primitive(left)?;
            let right = to_primitive(right)?;
            let ordering = match (&left, &right) {
                (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
                _ => to_number(&left)?.partial_cmp(&to_number(&right)?),
            };
            let Some(ordering) = ordering else {
                return Ok(Value::Bool(false));
            };
            Ok(Value::Bool(match op {
                BinaryOp::Lt => ordering.is_lt(),
                BinaryOp::Le => ordering.is_le(),
                BinaryOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            }))
        }
        BinaryOp::StrictEq => Ok(Value::Bool(left == right)),
        BinaryOp::StrictNe => Ok(Value::Bool(left != right)),
        BinaryOp::LooseEq => Ok(Value::Bool(loose_equals(left, right)?)),
        BinaryOp::LooseNe => Ok(Value::Bool(!loose_equals(left, right)?)),
    }
}

fn loose_equals(left: &Value, right: &Value) -> Result<bool, RevalueError> {
    let as_number = |b: bool| Value::Number(f64::from(u8::from(b)));
    Ok(match (left, right) {
        (Value::Undefined | Value::Null, Value::Undefined | Value::Null) => true,
        (Value::Undefined | Value::Null, _) | (_, Value::Undefined | Value::Null) => false,
        (Value::Number(_), Value::String(_)) | (Value::String(_), Value::Number(_)) => {
            to_number(left)? == to_number(right)?
        }
        (Value::Bool(b), other) => loose_equals(&as_number(*b), other)?,
        (other, Value::Bool(b)) => loose_equals(other, &as_number(*b))?,
        (
            Value::Array(_) | Value::Object(_) | Value::Function(_),
            Value::Number(_) | Value::String(_),
        ) => loose_equals(&to_primitive(left)?, right)?,
        (
            Value::Number(_) | Value::String(_),
            Value::Array(_) | Value::Object(_) | Value::Function(_),
        ) => loose_equals(left, &to_primitive(right)?)?,
        _ => left == right,
    })
}

fn get_property(object: &Value, key: &Value) -> Result<Value, RevalueError> {
    if matches!(object, Value::Undefined | Value::Null) {
        return Err(RevalueError::type_error(format!(
            "Cannot read properties of {} (reading '{}')",
            object,
            match key {
                Value::Symbol(sym) => sym.to_string(),
                other => to_js_string(other)?,
            }
        )));
    }
    if matches!(key, Value::Symbol(_)) {
        return Ok(Value::Undefined);
    }
    let key = to_js_string(key)?;
    let index = key
        .parse::<usize>()
        .ok()
        .filter(|i| i.to_string() == key);

    Ok(match object {
        Value::String(s) => {
            let units: Vec<u16> = s.encode_utf16().collect();
            match (key.as_str(), index) {
                ("length", _) => Value::Number(units.len() as f64),
                (_, Some(i)) if i < units.len() => {
                    Value::String(String::from_utf16_lossy(&units[i..=i]))
                }
                _ => Value::Undefined,
            }
        }
        Value::Array(items) => match (key.as_str(), index) {
            ("length", _) => Value::Number(items.len() as f64),
            (_, Some(i)) => items.get(i).cloned().unwrap_or_default(),
            _ => Value::Undefined,
        },
        Value::Object(object) => object.get(&key).cloned().unwrap_or_default(),
        Value::Function(function) => match (key.as_str(), function) {
            ("name", Function::Lambda(lambda)) => Value::from(lambda.name().unwrap_or("")),
            ("name", Function::Native(native)) => Value::from(native.name()),
            ("length", Function::Lambda(lambda)) => Value::Number(lambda.params().len() as f64),
            ("length", Function::Native(_)) => Value::Number(1.0),
            _ => Value::Undefined,
        },
        _ => Value::Undefined,
    })
}
