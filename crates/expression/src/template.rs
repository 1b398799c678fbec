//! The template engine (§4.2).
//!
//! Parsing is a two-phase process mirroring the teacher's `template.rs`
//! char-by-char, position-tracked scan: a flat pass turns the source into
//! `Literal`/`Expr`/`Tag` tokens, then a small recursive-descent pass folds
//! `{% if/elsif/else/endif %}` and `{% for/endfor %}` tokens into a tree
//! (absent from the teacher's version, which only ever produces a flat
//! `Static`/`Expression` part list).

use crate::context::EvaluationContext;
use crate::error::ExpressionError;
use crate::eval::Evaluator;
use prana_value::Value;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorMode {
    /// Any undefined variable or type error aborts rendering.
    Strict,
    /// Missing variables render empty; type coercion is attempted.
    Graceful,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemplateEngineConfig {
    pub max_template_size: usize,
    pub max_nesting_depth: usize,
    pub max_loop_iterations: usize,
    pub max_recursion_depth: usize,
    pub error_mode: ErrorMode,
}

impl Default for TemplateEngineConfig {
    fn default() -> Self {
        Self {
            max_template_size: 64 * 1024,
            max_nesting_depth: 32,
            max_loop_iterations: 10_000,
            max_recursion_depth: 100,
            error_mode: ErrorMode::Strict,
        }
    }
}

impl TemplateEngineConfig {
    #[must_use]
    pub fn graceful() -> Self {
        Self { error_mode: ErrorMode::Graceful, ..Self::default() }
    }
}

/// A parsed, renderable template tree.
#[derive(Debug, Clone, PartialEq)]
enum Node {
    Text(String),
    Expr(String),
    If { branches: Vec<(String, Vec<Node>)>, else_branch: Option<Vec<Node>> },
    For { var: String, iter_src: String, body: Vec<Node> },
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Text(String),
    Expr(String),
    If(String),
    Elsif(String),
    Else,
    EndIf,
    For(String, String),
    EndFor,
}

pub struct Template {
    nodes: Vec<Node>,
    /// Set iff the entire source is a single `{{ expr }}` block with no
    /// surrounding literal text (§4.2 "Special-case behavior (critical)").
    single_expression: Option<String>,
}

impl Template {
    pub fn parse(source: &str, config: &TemplateEngineConfig) -> Result<Self, ExpressionError> {
        if source.len() > config.max_template_size {
            return Err(ExpressionError::TemplateTooLarge { limit: config.max_template_size });
        }
        let tokens = tokenize(source)?;
        let single_expression = match tokens.as_slice() {
            [Tok::Expr(e)] => Some(e.clone()),
            _ => None,
        };
        let mut pos = 0;
        let nodes = parse_nodes(&tokens, &mut pos, 0, config.max_nesting_depth)?;
        if pos != tokens.len() {
            return Err(ExpressionError::UnexpectedTag { tag: format!("{:?}", tokens[pos]) });
        }
        Ok(Self { nodes, single_expression })
    }

    /// Renders the template. When the source is a single `{{ expr }}` block,
    /// returns the expression's original typed value; otherwise always
    /// returns `Value::String`.
    pub fn render(&self, evaluator: &Evaluator, ctx: &EvaluationContext, config: &TemplateEngineConfig) -> Result<Value, ExpressionError> {
        if let Some(expr_src) = &self.single_expression {
            return eval_expr(evaluator, expr_src, ctx, config);
        }
        let mut out = String::new();
        let mut loop_budget = config.max_loop_iterations;
        render_nodes(&self.nodes, evaluator, ctx, config, &mut out, &mut loop_budget)?;
        Ok(Value::String(out))
    }
}

fn eval_expr(evaluator: &Evaluator, src: &str, ctx: &EvaluationContext, config: &TemplateEngineConfig) -> Result<Value, ExpressionError> {
    let expr = crate::parser::parse(src)?;
    match evaluator.eval(&expr, ctx) {
        Ok(v) => Ok(v),
        Err(ExpressionError::Path(prana_value::PathError::NotFound { path })) if config.error_mode == ErrorMode::Graceful => {
            let _ = path;
            Ok(Value::Null)
        }
        Err(e) => Err(e),
    }
}

fn render_nodes(
    nodes: &[Node],
    evaluator: &Evaluator,
    ctx: &EvaluationContext,
    config: &TemplateEngineConfig,
    out: &mut String,
    loop_budget: &mut usize,
) -> Result<(), ExpressionError> {
    for node in nodes {
        match node {
            Node::Text(t) => out.push_str(t),
            Node::Expr(src) => {
                let v = eval_expr(evaluator, src, ctx, config)?;
                out.push_str(&v.render_to_string());
            }
            Node::If { branches, else_branch } => {
                let mut matched = false;
                for (cond_src, body) in branches {
                    let cond = crate::parser::parse(cond_src)?;
                    if evaluator.eval(&cond, ctx)?.is_truthy() {
                        render_nodes(body, evaluator, ctx, config, out, loop_budget)?;
                        matched = true;
                        break;
                    }
                }
                if !matched {
                    if let Some(body) = else_branch {
                        render_nodes(body, evaluator, ctx, config, out, loop_budget)?;
                    }
                }
            }
            Node::For { var, iter_src, body } => {
                let iter_expr = crate::parser::parse(iter_src)?;
                let iterable = evaluator.eval(&iter_expr, ctx)?;
                let Value::List(items) = iterable else {
                    return Err(ExpressionError::TypeMismatch {
                        op: "for".into(),
                        message: format!("expected a list, found {}", iterable.type_name()),
                    });
                };
                for item in items {
                    if *loop_budget == 0 {
                        return Err(ExpressionError::LoopLimitExceeded { limit: config.max_loop_iterations });
                    }
                    *loop_budget -= 1;
                    let mut loop_ctx = ctx.clone();
                    loop_ctx.vars = insert_loop_var(&loop_ctx.vars, var, item);
                    render_nodes(body, evaluator, &loop_ctx, config, out, loop_budget)?;
                }
            }
        }
    }
    Ok(())
}

fn insert_loop_var(vars: &Value, name: &str, value: Value) -> Value {
    let mut map = vars.as_map().cloned().unwrap_or_default();
    map.insert(name.to_string(), value);
    Value::Map(map)
}

fn parse_nodes(tokens: &[Tok], pos: &mut usize, depth: usize, max_depth: usize) -> Result<Vec<Node>, ExpressionError> {
    if depth > max_depth {
        return Err(ExpressionError::NestingLimitExceeded { limit: max_depth });
    }
    let mut nodes = Vec::new();
    while *pos < tokens.len() {
        match &tokens[*pos] {
            Tok::Text(t) => {
                nodes.push(Node::Text(t.clone()));
                *pos += 1;
            }
            Tok::Expr(e) => {
                nodes.push(Node::Expr(e.clone()));
                *pos += 1;
            }
            Tok::If(cond) => {
                let cond = cond.clone();
                *pos += 1;
                let mut branches = vec![(cond, parse_nodes(tokens, pos, depth + 1, max_depth)?)];
                let mut else_branch = None;
                loop {
                    match tokens.get(*pos) {
                        Some(Tok::Elsif(cond)) => {
                            let cond = cond.clone();
                            *pos += 1;
                            branches.push((cond, parse_nodes(tokens, pos, depth + 1, max_depth)?));
                        }
                        Some(Tok::Else) => {
                            *pos += 1;
                            else_branch = Some(parse_nodes(tokens, pos, depth + 1, max_depth)?);
                        }
                        Some(Tok::EndIf) => {
                            *pos += 1;
                            break;
                        }
                        _ => return Err(ExpressionError::UnclosedTag { tag: "if".into() }),
                    }
                }
                nodes.push(Node::If { branches, else_branch });
            }
            Tok::For(var, iter_src) => {
                let var = var.clone();
                let iter_src = iter_src.clone();
                *pos += 1;
                let body = parse_nodes(tokens, pos, depth + 1, max_depth)?;
                match tokens.get(*pos) {
                    Some(Tok::EndFor) => *pos += 1,
                    _ => return Err(ExpressionError::UnclosedTag { tag: "for".into() }),
                }
                nodes.push(Node::For { var, iter_src, body });
            }
            Tok::Elsif(_) | Tok::Else | Tok::EndIf | Tok::EndFor => break,
        }
    }
    Ok(nodes)
}

fn tokenize(source: &str) -> Result<Vec<Tok>, ExpressionError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    let mut text = String::new();

    while i < chars.len() {
        if starts_with(&chars, i, "{{") {
            flush_text(&mut tokens, &mut text);
            let (content, next) = read_until(&chars, i + 2, "}}")?;
            tokens.push(Tok::Expr(content.trim().to_string()));
            i = next;
        } else if starts_with(&chars, i, "{#") {
            flush_text(&mut tokens, &mut text);
            let (_, next) = read_until(&chars, i + 2, "#}")?;
            i = next;
        } else if starts_with(&chars, i, "{%") {
            flush_text(&mut tokens, &mut text);
            let (content, next) = read_until(&chars, i + 2, "%}")?;
            tokens.push(parse_tag(content.trim())?);
            i = next;
        } else {
            text.push(chars[i]);
            i += 1;
        }
    }
    flush_text(&mut tokens, &mut text);
    Ok(tokens)
}

fn flush_text(tokens: &mut Vec<Tok>, text: &mut String) {
    if !text.is_empty() {
        tokens.push(Tok::Text(std::mem::take(text)));
    }
}

fn starts_with(chars: &[char], i: usize, pat: &str) -> bool {
    let pat: Vec<char> = pat.chars().collect();
    chars.len() >= i + pat.len() && chars[i..i + pat.len()] == pat[..]
}

fn read_until(chars: &[char], start: usize, close: &str) -> Result<(String, usize), ExpressionError> {
    let close_chars: Vec<char> = close.chars().collect();
    let mut i = start;
    while i < chars.len() {
        if chars.len() >= i + close_chars.len() && chars[i..i + close_chars.len()] == close_chars[..] {
            let content: String = chars[start..i].iter().collect();
            return Ok((content, i + close_chars.len()));
        }
        i += 1;
    }
    Err(ExpressionError::UnclosedTag { tag: close.to_string() })
}

fn parse_tag(content: &str) -> Result<Tok, ExpressionError> {
    if let Some(rest) = content.strip_prefix("if ") {
        return Ok(Tok::If(rest.trim().to_string()));
    }
    if let Some(rest) = content.strip_prefix("elsif ") {
        return Ok(Tok::Elsif(rest.trim().to_string()));
    }
    if content == "else" {
        return Ok(Tok::Else);
    }
    if content == "endif" {
        return Ok(Tok::EndIf);
    }
    if let Some(rest) = content.strip_prefix("for ") {
        let (var, iter_src) = rest.split_once(" in ").ok_or_else(|| ExpressionError::UnexpectedTag { tag: content.to_string() })?;
        return Ok(Tok::For(var.trim().to_string(), iter_src.trim().to_string()));
    }
    if content == "endfor" {
        return Ok(Tok::EndFor);
    }
    Err(ExpressionError::UnexpectedTag { tag: content.to_string() })
}

#[must_use]
pub fn default_evaluator() -> Evaluator {
    Evaluator::new(Arc::new(crate::builtins::BuiltinRegistry::standard()))
}
