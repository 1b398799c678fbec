//! AST evaluation (§4.1, §4.2).
//!
//! Mirrors the teacher's depth-tracked, short-circuiting evaluator
//! (`eval::Evaluator::eval_with_depth`/`eval_binary_op`), adapted from
//! `nebula_value::Value` onto this crate's tagged union and from a flat
//! `Variable`/`PropertyAccess`/`IndexAccess` node set onto the structured
//! `Expr::Path{root, segments}` node §4.2 specifies.

use crate::ast::{BinaryOp, Expr};
use crate::builtins::BuiltinRegistry;
use crate::context::{resolve_identifier, EvaluationContext};
use crate::error::ExpressionError;
use prana_value::{access, Value};
use std::sync::Arc;

const MAX_RECURSION_DEPTH: usize = 100;

pub struct Evaluator {
    builtins: Arc<BuiltinRegistry>,
}

impl Evaluator {
    #[must_use]
    pub fn new(builtins: Arc<BuiltinRegistry>) -> Self {
        Self { builtins }
    }

    pub fn eval(&self, expr: &Expr, ctx: &EvaluationContext) -> Result<Value, ExpressionError> {
        self.eval_depth(expr, ctx, 0)
    }

    fn eval_depth(&self, expr: &Expr, ctx: &EvaluationContext, depth: usize) -> Result<Value, ExpressionError> {
        if depth > MAX_RECURSION_DEPTH {
            return Err(ExpressionError::RecursionLimitExceeded { limit: MAX_RECURSION_DEPTH });
        }

        match expr {
            Expr::Literal(v) => Ok(v.clone()),

            Expr::Path { root, segments } => {
                let base = ctx.root(*root);
                access::get_path(base, segments).map_err(ExpressionError::from)
            }

            Expr::Identifier(segments) => Ok(resolve_identifier(ctx, segments)),

            Expr::Not(inner) => {
                let v = self.eval_depth(inner, ctx, depth + 1)?;
                Ok(Value::Bool(!v.is_truthy()))
            }

            Expr::Negate(inner) => {
                let v = self.eval_depth(inner, ctx, depth + 1)?;
                match v {
                    Value::Int(i) => Ok(Value::Int(-i)),
                    Value::Float(f) => Ok(Value::Float(-f)),
                    other => Err(ExpressionError::TypeMismatch {
                        op: "negate".into(),
                        message: format!("expected a number, found {}", other.type_name()),
                    }),
                }
            }

            Expr::Binary { op, left, right } => self.eval_binary(*op, left, right, ctx, depth),

            Expr::Call { name, args } => {
                let mut values = Vec::with_capacity(args.len());
                for a in args {
                    values.push(self.eval_depth(a, ctx, depth + 1)?);
                }
                self.builtins.call(name, &values).map_err(|e| ExpressionError::TypeMismatch {
                    op: name.clone(),
                    message: e,
                })
            }

            // The parser always rewrites `Pipe` via `desugar_pipes` before
            // evaluation ever sees an AST, but evaluating one defensively
            // (e.g. a hand-built AST in a test) just falls back to
            // desugaring on the spot.
            Expr::Pipe { .. } => self.eval_depth(&expr.clone().desugar_pipes(), ctx, depth + 1),

            Expr::Grouped(inner) => self.eval_depth(inner, ctx, depth + 1),
        }
    }

    fn eval_binary(
        &self,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
        ctx: &EvaluationContext,
        depth: usize,
    ) -> Result<Value, ExpressionError> {
        if op == BinaryOp::And {
            let l = self.eval_depth(left, ctx, depth + 1)?;
            if !l.is_truthy() {
                return Ok(Value::Bool(false));
            }
            let r = self.eval_depth(right, ctx, depth + 1)?;
            return Ok(Value::Bool(r.is_truthy()));
        }
        if op == BinaryOp::Or {
            let l = self.eval_depth(left, ctx, depth + 1)?;
            if l.is_truthy() {
                return Ok(Value::Bool(true));
            }
            let r = self.eval_depth(right, ctx, depth + 1)?;
            return Ok(Value::Bool(r.is_truthy()));
        }

        let l = self.eval_depth(left, ctx, depth + 1)?;
        let r = self.eval_depth(right, ctx, depth + 1)?;

        match op {
            BinaryOp::Add => prana_value::add(&l, &r).map_err(|e| arith_err("+", e)),
            BinaryOp::Sub => prana_value::subtract(&l, &r).map_err(|e| arith_err("-", e)),
            BinaryOp::Mul => prana_value::multiply(&l, &r).map_err(|e| arith_err("*", e)),
            BinaryOp::Div => prana_value::divide(&l, &r).map_err(|e| arith_err("/", e)),
            BinaryOp::Eq => Ok(Value::Bool(l == r)),
            BinaryOp::NotEq => Ok(Value::Bool(l != r)),
            BinaryOp::Lt => compare(&l, &r, "<", |o| o.is_lt()),
            BinaryOp::LtEq => compare(&l, &r, "<=", |o| o.is_le()),
            BinaryOp::Gt => compare(&l, &r, ">", |o| o.is_gt()),
            BinaryOp::GtEq => compare(&l, &r, ">=", |o| o.is_ge()),
            BinaryOp::Concat => concat(&l, &r),
            BinaryOp::Difference => difference(&l, &r),
            BinaryOp::In => Ok(Value::Bool(membership(&l, &r))),
            BinaryOp::And | BinaryOp::Or => unreachable!("short-circuited above"),
        }
    }
}

fn arith_err(op: &str, e: prana_value::ArithError) -> ExpressionError {
    ExpressionError::TypeMismatch { op: op.to_string(), message: e.to_string() }
}

fn compare(l: &Value, r: &Value, op: &str, accept: impl Fn(std::cmp::Ordering) -> bool) -> Result<Value, ExpressionError> {
    let ordering = match (l, r) {
        (Value::Int(a), Value::Int(b)) => a.cmp(b),
        (Value::Float(_) | Value::Int(_), Value::Float(_) | Value::Int(_)) => {
            let a = l.as_f64().unwrap();
            let b = r.as_f64().unwrap();
            a.partial_cmp(&b).ok_or_else(|| ExpressionError::TypeMismatch {
                op: op.to_string(),
                message: "NaN is not orderable".into(),
            })?
        }
        (Value::String(a), Value::String(b)) => a.cmp(b),
        _ => {
            return Err(ExpressionError::TypeMismatch {
                op: op.to_string(),
                message: format!("cannot compare {} and {}", l.type_name(), r.type_name()),
            });
        }
    };
    Ok(Value::Bool(accept(ordering)))
}

/// `a ++ b`: list concatenation (see DESIGN.md — Elixir-sourced operator).
fn concat(l: &Value, r: &Value) -> Result<Value, ExpressionError> {
    match (l, r) {
        (Value::List(a), Value::List(b)) => {
            let mut out = a.clone();
            out.extend(b.clone());
            Ok(Value::List(out))
        }
        _ => Err(ExpressionError::TypeMismatch {
            op: "++".into(),
            message: format!("expected two lists, found {} and {}", l.type_name(), r.type_name()),
        }),
    }
}

/// `a -- b`: elements of `a` not present in `b`.
fn difference(l: &Value, r: &Value) -> Result<Value, ExpressionError> {
    match (l, r) {
        (Value::List(a), Value::List(b)) => Ok(Value::List(a.iter().filter(|x| !b.contains(x)).cloned().collect())),
        _ => Err(ExpressionError::TypeMismatch {
            op: "--".into(),
            message: format!("expected two lists, found {} and {}", l.type_name(), r.type_name()),
        }),
    }
}

fn membership(needle: &Value, haystack: &Value) -> bool {
    match haystack {
        Value::List(items) => items.contains(needle),
        Value::String(s) => needle.as_str().is_some_and(|n| s.contains(n)),
        Value::Map(m) => needle.as_str().is_some_and(|k| m.contains_key(k)),
        _ => false,
    }
}
