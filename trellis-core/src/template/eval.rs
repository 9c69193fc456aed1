//! Expression Evaluation
//!
//! Evaluates an [`Expr`] against a [`Scope`] and an [`Ambient`] whitelist.
//! Evaluation is pure apart from whatever registered helpers do.

use serde_json::{Map, Value};
use thiserror::Error;

use super::expr::{BinaryOp, Expr, UnaryOp};
use super::scope::{Ambient, Scope};
use super::value;

/// Errors raised while evaluating an expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// A name resolved neither in the scope chain nor in the ambient
    /// whitelist.
    #[error("unresolved identifier `{0}`")]
    Unresolved(String),

    /// A call whose callee is not a registered helper.
    #[error("`{0}` is not a callable helper")]
    NotCallable(String),

    /// A lambda used where a value is required.
    #[error("a function cannot be used as a value")]
    FunctionValue,
}

/// Evaluates expressions in one scope.
#[derive(Debug, Clone, Copy)]
pub struct Evaluator<'a> {
    scope: &'a Scope,
    ambient: &'a Ambient,
}

impl<'a> Evaluator<'a> {
    pub fn new(scope: &'a Scope, ambient: &'a Ambient) -> Self {
        Self { scope, ambient }
    }

    /// Whether every free identifier of `expr` resolves here.
    ///
    /// Returns the first unresolved name otherwise.
    pub fn check_resolved(&self, expr: &Expr) -> Result<(), EvalError> {
        for name in expr.free_identifiers() {
            if self.scope.lookup(&name).is_none() && !self.ambient.contains(&name) {
                return Err(EvalError::Unresolved(name));
            }
        }
        Ok(())
    }

    pub fn eval(&self, expr: &Expr) -> Result<Value, EvalError> {
        match expr {
            Expr::Literal(v) => Ok(v.clone()),
            Expr::Ident(name) => self.resolve(name),
            Expr::Array(items) => items
                .iter()
                .map(|item| self.eval(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Expr::Object(entries) => {
                let mut map = Map::new();
                for (key, value) in entries {
                    map.insert(key.clone(), self.eval(value)?);
                }
                Ok(Value::Object(map))
            }
            Expr::Member { object, property } => {
                Ok(value::member(&self.eval(object)?, property))
            }
            Expr::Index { object, index } => {
                let object = self.eval(object)?;
                let index = self.eval(index)?;
                Ok(value::index(&object, &index))
            }
            Expr::Call { callee, args } => self.call(callee, args),
            Expr::Unary { op, operand } => {
                let operand = self.eval(operand)?;
                Ok(match op {
                    UnaryOp::Not => Value::Bool(!value::truthy(&operand)),
                    UnaryOp::Neg => {
                        value::number(-value::to_number(&operand).unwrap_or(f64::NAN))
                    }
                    UnaryOp::Plus => value::number(value::to_number(&operand).unwrap_or(f64::NAN)),
                })
            }
            Expr::Binary { op, left, right } => self.binary(*op, left, right),
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if value::truthy(&self.eval(test)?) {
                    self.eval(consequent)
                } else {
                    self.eval(alternate)
                }
            }
            Expr::Lambda { .. } => Err(EvalError::FunctionValue),
            Expr::Block(statements) => {
                let mut last = Value::Null;
                for statement in statements {
                    last = self.eval(statement)?;
                }
                Ok(last)
            }
        }
    }

    fn resolve(&self, name: &str) -> Result<Value, EvalError> {
        self.scope
            .lookup(name)
            .or_else(|| self.ambient.value(name))
            .cloned()
            .ok_or_else(|| EvalError::Unresolved(name.to_string()))
    }

    fn call(&self, callee: &Expr, args: &[Expr]) -> Result<Value, EvalError> {
        let name = match callee {
            Expr::Ident(name) => name,
            Expr::Lambda { params, body } => {
                // Immediately invoked lambda.
                let values = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                return self.apply(params, body, values);
            }
            other => return Err(EvalError::NotCallable(describe(other))),
        };
        let helper = match self.ambient.helper(name) {
            Some(helper) => helper,
            None if self.scope.lookup(name).is_some() || self.ambient.value(name).is_some() => {
                return Err(EvalError::NotCallable(name.clone()))
            }
            None => return Err(EvalError::Unresolved(name.clone())),
        };
        let values = args
            .iter()
            .map(|arg| self.eval(arg))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(helper(&values))
    }

    /// Evaluate a lambda body with its parameters bound to `args`.
    ///
    /// Missing arguments bind to `null`.
    pub fn apply(&self, params: &[String], body: &Expr, args: Vec<Value>) -> Result<Value, EvalError> {
        let mut args = args.into_iter();
        let bindings: Vec<(String, Value)> = params
            .iter()
            .map(|p| (p.clone(), args.next().unwrap_or(Value::Null)))
            .collect();
        let scope = self.scope.child(bindings);
        Evaluator::new(&scope, self.ambient).eval(body)
    }

    fn binary(&self, op: BinaryOp, left: &Expr, right: &Expr) -> Result<Value, EvalError> {
        let lhs = self.eval(left)?;
        match op {
            BinaryOp::And => {
                return if value::truthy(&lhs) {
                    self.eval(right)
                } else {
                    Ok(lhs)
                };
            }
            BinaryOp::Or => {
                return if value::truthy(&lhs) {
                    Ok(lhs)
                } else {
                    self.eval(right)
                };
            }
            _ => {}
        }

        let rhs = self.eval(right)?;
        let arith = |f: fn(f64, f64) -> f64| {
            match (value::to_number(&lhs), value::to_number(&rhs)) {
                (Some(a), Some(b)) => value::number(f(a, b)),
                _ => Value::Null,
            }
        };
        let ordered = |accept: fn(std::cmp::Ordering) -> bool| {
            Value::Bool(value::compare(&lhs, &rhs).map(accept).unwrap_or(false))
        };

        Ok(match op {
            BinaryOp::Add => {
                if lhs.is_string() || rhs.is_string() {
                    let mut joined = value::to_display(&lhs);
                    joined.push_str(&value::to_display(&rhs));
                    Value::String(joined)
                } else {
                    arith(|a, b| a + b)
                }
            }
            BinaryOp::Sub => arith(|a, b| a - b),
            BinaryOp::Mul => arith(|a, b| a * b),
            BinaryOp::Div => arith(|a, b| a / b),
            BinaryOp::Rem => arith(|a, b| a % b),
            BinaryOp::Eq => Value::Bool(value::equals(&lhs, &rhs)),
            BinaryOp::NotEq => Value::Bool(!value::equals(&lhs, &rhs)),
            BinaryOp::Lt => ordered(|o| o.is_lt()),
            BinaryOp::Le => ordered(|o| o.is_le()),
            BinaryOp::Gt => ordered(|o| o.is_gt()),
            BinaryOp::Ge => ordered(|o| o.is_ge()),
            BinaryOp::And | BinaryOp::Or => unreachable!("short-circuit operators handled above"),
        })
    }
}

fn describe(expr: &Expr) -> String {
    match expr {
        Expr::Member { property, .. } => format!(".{property}"),
        Expr::Ident(name) => name.clone(),
        _ => "expression".to_string(),
    }
}
